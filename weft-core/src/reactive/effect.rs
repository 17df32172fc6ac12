//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever any
//! signal or memo it read during its last execution changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When a dependency changes, the effect is enqueued on the runtime and
//!    re-runs at the next flush.
//!
//! 3. Sources accumulate until disposal: re-running does not unsubscribe
//!    from previously-read sources, and disposal is the single point where
//!    every subscription is released.
//!
//! # Cleanup
//!
//! An effect may carry one cleanup callback (see [`Effect::set_cleanup`]),
//! invoked exactly once when the effect is disposed. The reconciler uses
//! this to tear down the attribute state a binding effect owns.
//!
//! # Failure isolation
//!
//! A panic in the effect body (during the initial run or any re-run) or in
//! the cleanup callback is caught and logged; it never propagates to
//! sibling effects or aborts a flush.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::runtime::{panic_message, Runtime, SourceBinding};
use super::subscriber::{Reactive, SubscriberId, TaskRef};

pub(crate) struct EffectInner {
    /// The subscriber ID used for dependency tracking and scheduling.
    id: SubscriberId,

    /// The effect function.
    f: Box<dyn Fn() + Send + Sync>,

    /// Whether the effect has been disposed.
    disposed: AtomicBool,

    /// Number of times the effect has run.
    run_count: AtomicUsize,

    /// Every source this effect subscribed to, for disposal-time
    /// unsubscription.
    sources: Mutex<Vec<SourceBinding>>,

    /// Optional cleanup callback, taken and invoked on disposal.
    cleanup: Mutex<Option<Box<dyn FnOnce() + Send + Sync>>>,

    /// Weak self-reference handed to sources and the scheduler.
    self_task: Weak<EffectInner>,

    /// The runtime this effect tracks and schedules through.
    runtime: Runtime,
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let task: TaskRef = self.self_task.clone();
        self.runtime.enter(self.id, task);
        let result = catch_unwind(AssertUnwindSafe(|| (self.f)()));
        let new_sources = self.runtime.exit(self.id);

        {
            let mut sources = self.sources.lock();
            for binding in new_sources {
                if !sources.iter().any(|b| b.source == binding.source) {
                    sources.push(binding);
                }
            }
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);

        if let Err(payload) = result {
            tracing::error!(
                target: "weft::reactive",
                subscriber = self.id.raw(),
                "effect panicked during run: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn run(&self) {
        self.execute();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// A disposable, re-running reactive computation.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 0);
///
/// let count_clone = count.clone();
/// let effect = Effect::new(&runtime, move || {
///     println!("Count is: {}", count_clone.get());
/// });
///
/// count.set(5);
/// runtime.flush(); // Prints: "Count is: 5"
/// effect.dispose();
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a new effect. The function runs synchronously once to
    /// establish initial dependencies.
    pub fn new<F>(runtime: &Runtime, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<EffectInner>| EffectInner {
            id: SubscriberId::new(),
            f: Box::new(f),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
            sources: Mutex::new(Vec::new()),
            cleanup: Mutex::new(None),
            self_task: weak.clone(),
            runtime: runtime.clone(),
        });

        // Run immediately to establish dependencies.
        inner.execute();

        Self { inner }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Register the cleanup callback invoked on disposal.
    ///
    /// Replaces any previously-registered callback. Setting a cleanup on an
    /// already-disposed effect drops it without running it.
    pub fn set_cleanup<F>(&self, f: F)
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return;
        }
        *self.inner.cleanup.lock() = Some(Box::new(f));
    }

    /// Dispose of the effect.
    ///
    /// Makes any already-pending scheduled run a no-op, unsubscribes from
    /// every source the effect was added to, and runs the cleanup callback.
    /// Calling `dispose` again has no further effect.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        for binding in self.inner.sources.lock().drain(..) {
            binding.subscribers.remove(self.inner.id);
        }

        let cleanup = self.inner.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(move || cleanup())) {
                tracing::error!(
                    target: "weft::reactive",
                    subscriber = self.inner.id.raw(),
                    "effect cleanup panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of distinct sources this effect is subscribed to.
    pub fn source_count(&self) -> usize {
        self.inner.sources.lock().len()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("source_count", &self.source_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
