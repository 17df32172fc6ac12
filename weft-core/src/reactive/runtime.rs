//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects: it owns the scheduler's pending queue and the active-tracker
//! stack. Unlike a global singleton, each `Runtime` is an independent
//! instance with its own lifecycle — create one per logical UI tree (or per
//! test) and inject it into every primitive at creation. Instances never
//! share state.
//!
//! # Scheduling model
//!
//! A signal write does not re-run subscribers synchronously. It enqueues
//! them and returns; the actual re-runs happen when the embedder drives the
//! deferred tick by calling [`Runtime::flush`]. Multiple writes within one
//! turn therefore coalesce into a single re-run per affected subscriber.
//!
//! The queue is a set keyed by subscriber ID: contexts run in the order they
//! were first added, duplicate scheduling collapses to that first position,
//! and contexts scheduled *during* a flush are still processed before the
//! flush returns. No topological ordering between dependents is promised.
//!
//! # Tracking model
//!
//! While a reactive context executes, it sits on top of the tracker stack;
//! any signal or memo read during that window subscribes the context. The
//! stack (not a single slot) is what makes nested effect creation safe: an
//! inner effect's tracking cannot corrupt the outer context's subscriptions.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::subscriber::{SourceId, SubscriberId, SubscriberSet, TaskRef};

/// A source a running context subscribed to, recorded so disposal can
/// unsubscribe from it later.
pub(crate) struct SourceBinding {
    pub(crate) source: SourceId,
    pub(crate) subscribers: SubscriberSet,
}

/// One level of the tracker stack.
///
/// `subscriber` is `None` for untracked scopes: reads inside them register
/// nothing, and the scope exists only to shadow any outer tracking context.
struct TrackerFrame {
    subscriber: Option<(SubscriberId, TaskRef)>,
    sources: Vec<SourceBinding>,
}

struct RuntimeInner {
    tracker: Mutex<Vec<TrackerFrame>>,
    queue: Mutex<IndexMap<SubscriberId, TaskRef>>,
    flush_scheduled: AtomicBool,
    flushing: AtomicBool,
}

/// The per-instance reactive runtime (scheduler + tracker).
///
/// Cloning is cheap and shares state; primitives hold a clone of the
/// runtime they were created with.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a new, independent runtime instance.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                tracker: Mutex::new(Vec::new()),
                queue: Mutex::new(IndexMap::new()),
                flush_scheduled: AtomicBool::new(false),
                flushing: AtomicBool::new(false),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Enter a tracking frame for the given context.
    ///
    /// Paired with [`Runtime::exit`]; the effect run loop guarantees the
    /// pair even when the context's body panics.
    pub(crate) fn enter(&self, id: SubscriberId, task: TaskRef) {
        self.inner.tracker.lock().push(TrackerFrame {
            subscriber: Some((id, task)),
            sources: Vec::new(),
        });
    }

    /// Exit the current tracking frame, returning the sources the context
    /// subscribed to during this run.
    pub(crate) fn exit(&self, id: SubscriberId) -> Vec<SourceBinding> {
        let frame = self.inner.tracker.lock().pop();
        match frame {
            Some(frame) => {
                if let Some((frame_id, _)) = &frame.subscriber {
                    debug_assert_eq!(
                        *frame_id, id,
                        "tracker stack mismatch: expected {:?}, got {:?}",
                        id, frame_id
                    );
                }
                frame.sources
            }
            None => {
                debug_assert!(false, "tracker stack underflow");
                Vec::new()
            }
        }
    }

    /// Run `f` with tracking suppressed: reads inside it register no
    /// subscriptions, even when an outer context is executing.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Guard<'a>(&'a RuntimeInner);
        impl Drop for Guard<'_> {
            fn drop(&mut self) {
                self.0.tracker.lock().pop();
            }
        }

        self.inner.tracker.lock().push(TrackerFrame {
            subscriber: None,
            sources: Vec::new(),
        });
        let _guard = Guard(&self.inner);
        f()
    }

    /// Record that the current context (if any) read the given source.
    ///
    /// Adds the context to the source's subscriber set and remembers the
    /// binding in the current frame for disposal-time unsubscription.
    pub(crate) fn track_read(&self, source: SourceId, set: &SubscriberSet) {
        let mut tracker = self.inner.tracker.lock();
        if let Some(frame) = tracker.last_mut() {
            if let Some((id, task)) = &frame.subscriber {
                set.insert(*id, task.clone());
                if !frame.sources.iter().any(|b| b.source == source) {
                    frame.sources.push(SourceBinding {
                        source,
                        subscribers: set.clone(),
                    });
                }
            }
        }
    }

    /// Check whether any tracking context is currently executing.
    pub fn is_tracking(&self) -> bool {
        self.inner
            .tracker
            .lock()
            .last()
            .map(|frame| frame.subscriber.is_some())
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Add a context to the pending queue and mark a flush as wanted.
    ///
    /// Duplicate scheduling of a context already in the queue keeps its
    /// first-add position.
    pub(crate) fn schedule(&self, id: SubscriberId, task: TaskRef) {
        if task.strong_count() == 0 {
            return;
        }
        self.inner.queue.lock().entry(id).or_insert(task);
        self.inner.flush_scheduled.store(true, Ordering::SeqCst);
    }

    /// Schedule every live subscriber of a source, in subscription order.
    pub(crate) fn schedule_set(&self, set: &SubscriberSet) {
        for (id, task) in set.snapshot() {
            self.schedule(id, task);
        }
    }

    /// Whether a flush has been requested and not yet performed.
    pub fn is_flush_scheduled(&self) -> bool {
        self.inner.flush_scheduled.load(Ordering::SeqCst)
    }

    /// Number of contexts currently waiting in the pending queue.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Drain the pending queue, running each context once.
    ///
    /// Contexts scheduled while the flush is in progress are processed
    /// before it returns. A context that panics is caught and logged; the
    /// remaining contexts still run. Re-entrant calls (from inside a
    /// running context) are no-ops.
    pub fn flush(&self) {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut ran = 0usize;
        loop {
            let next = {
                let mut queue = self.inner.queue.lock();
                queue.shift_remove_index(0)
            };
            let Some((id, task)) = next else { break };

            if let Some(context) = task.upgrade() {
                // Disposed between scheduling and the flush: the pending
                // entry is harmless.
                if context.is_disposed() {
                    continue;
                }
                ran += 1;
                // `Reactive::run` implementations isolate their own panics;
                // this boundary covers foreign implementations too.
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| context.run())) {
                    tracing::error!(
                        target: "weft::reactive",
                        subscriber = id.raw(),
                        "reactive context panicked during flush: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        self.inner.flush_scheduled.store(false, Ordering::SeqCst);
        self.inner.flushing.store(false, Ordering::SeqCst);
        tracing::trace!(target: "weft::reactive", contexts = ran, "flush complete");
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("pending", &self.pending_count())
            .field("flush_scheduled", &self.is_flush_scheduled())
            .finish()
    }
}

/// Render a panic payload for logging.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::subscriber::Reactive;
    use std::sync::atomic::AtomicI32;
    use std::sync::Mutex as StdMutex;

    struct RecordingTask {
        id: SubscriberId,
        log: Arc<StdMutex<Vec<u64>>>,
        runs: AtomicI32,
        panic_on_run: bool,
    }

    impl RecordingTask {
        fn new(log: Arc<StdMutex<Vec<u64>>>) -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                log,
                runs: AtomicI32::new(0),
                panic_on_run: false,
            })
        }

        fn panicking(log: Arc<StdMutex<Vec<u64>>>) -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                log,
                runs: AtomicI32::new(0),
                panic_on_run: true,
            })
        }

    }

    fn task_ref(task: &Arc<RecordingTask>) -> TaskRef {
        let task: Arc<dyn Reactive + Send + Sync> = task.clone();
        Arc::downgrade(&task)
    }

    impl Reactive for RecordingTask {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.id.raw());
            if self.panic_on_run {
                panic!("task failure");
            }
        }

        fn is_disposed(&self) -> bool {
            false
        }
    }

    #[test]
    fn flush_runs_in_first_add_order() {
        let runtime = Runtime::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let a = RecordingTask::new(log.clone());
        let b = RecordingTask::new(log.clone());

        runtime.schedule(a.id, task_ref(&a));
        runtime.schedule(b.id, task_ref(&b));
        // Duplicate collapses to the first-add position.
        runtime.schedule(a.id, task_ref(&a));

        assert_eq!(runtime.pending_count(), 2);
        runtime.flush();

        assert_eq!(*log.lock().unwrap(), vec![a.id.raw(), b.id.raw()]);
        assert_eq!(runtime.pending_count(), 0);
        assert!(!runtime.is_flush_scheduled());
    }

    #[test]
    fn panicking_context_does_not_abort_flush() {
        let runtime = Runtime::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let bad = RecordingTask::panicking(log.clone());
        let good = RecordingTask::new(log.clone());

        runtime.schedule(bad.id, task_ref(&bad));
        runtime.schedule(good.id, task_ref(&good));
        runtime.flush();

        assert_eq!(good.runs.load(Ordering::SeqCst), 1);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn dropped_task_is_skipped() {
        let runtime = Runtime::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let a = RecordingTask::new(log.clone());
        let weak = task_ref(&a);
        let id = a.id;
        runtime.schedule(id, weak);
        drop(a);

        runtime.flush();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn runtimes_are_isolated() {
        let first = Runtime::new();
        let second = Runtime::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let task = RecordingTask::new(log);
        first.schedule(task.id, task_ref(&task));

        assert_eq!(first.pending_count(), 1);
        assert_eq!(second.pending_count(), 0);

        second.flush();
        assert_eq!(task.runs.load(Ordering::SeqCst), 0);

        first.flush();
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn untracked_suppresses_tracking() {
        let runtime = Runtime::new();
        let set = SubscriberSet::new();
        let source = SourceId::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let task = RecordingTask::new(log);

        runtime.enter(task.id, task_ref(&task));
        runtime.untracked(|| {
            runtime.track_read(source, &set);
        });
        runtime.track_read(source, &set);
        let sources = runtime.exit(task.id);

        // Only the tracked read registered.
        assert_eq!(set.len(), 1);
        assert_eq!(sources.len(), 1);
    }
}
