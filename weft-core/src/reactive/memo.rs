//! Memo Implementation
//!
//! A Memo is a cached derived value that recomputes only when one of its
//! dependencies has changed, and lazily at that.
//!
//! # How Memos Work
//!
//! 1. Creation runs the computation once (tracked) and caches the result.
//!
//! 2. When a dependency changes, the memo's internal effect re-runs in the
//!    same flush: it re-tracks dependencies, marks the memo dirty, and
//!    schedules the memo's own subscribers. Dependents re-running later in
//!    that flush therefore never observe a stale value.
//!
//! 3. `get` recomputes at most once per dirty period no matter how many
//!    times it is called, and registers an active caller as a subscriber of
//!    the memo (not of the memo's inputs).
//!
//! # Differences from Effect
//!
//! - Memos return a value; effects do not.
//! - Memos are lazy (recompute on access); effects are eager (run on flush).
//! - Memos are themselves readable and trackable sources.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::effect::Effect;
use super::runtime::Runtime;
use super::subscriber::{SourceId, SubscriberSet};

struct MemoInner<T> {
    /// Unique source identifier for this memo.
    id: SourceId,

    /// The computation function.
    compute: Arc<dyn Fn() -> T + Send + Sync>,

    /// The cached value (None only before the first successful compute).
    value: RwLock<Option<T>>,

    /// Whether the cache is stale.
    dirty: AtomicBool,

    /// Contexts that read this memo while tracking.
    subscribers: SubscriberSet,

    /// The internal effect that re-tracks dependencies and invalidates.
    tracker: Mutex<Option<Effect>>,

    /// Whether the memo has been disposed.
    disposed: AtomicBool,

    runtime: Runtime,
}

/// A cached derived reactive value.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 2);
///
/// let count_clone = count.clone();
/// let doubled = Memo::new(&runtime, move || count_clone.get() * 2);
/// assert_eq!(doubled.get(), 4);
/// ```
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new memo. The computation runs once, synchronously, to
    /// establish dependencies and cache the initial value.
    pub fn new<F>(runtime: &Runtime, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(MemoInner {
            id: SourceId::new(),
            compute: Arc::new(compute),
            value: RwLock::new(None),
            dirty: AtomicBool::new(false),
            subscribers: SubscriberSet::new(),
            tracker: Mutex::new(None),
            disposed: AtomicBool::new(false),
            runtime: runtime.clone(),
        });

        // The internal effect runs the computation under tracking. Its
        // first run caches the result; every later run only re-tracks
        // dependencies, marks the memo dirty, and wakes the memo's own
        // subscribers within the current flush.
        let weak = Arc::downgrade(&inner);
        let tracker = Effect::new(runtime, move || {
            let Some(inner) = weak.upgrade() else { return };
            let next = (inner.compute)();
            let mut value = inner.value.write();
            if value.is_none() {
                *value = Some(next);
            } else {
                drop(value);
                inner.dirty.store(true, Ordering::SeqCst);
                inner.runtime.schedule_set(&inner.subscribers);
            }
        });
        *inner.tracker.lock() = Some(tracker);

        Self { inner }
    }

    /// Get the memo's unique source ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value, recomputing at most once per dirty period.
    ///
    /// If called while a reactive context is executing, registers that
    /// context as a subscriber of the memo. The recompute itself runs
    /// untracked: the caller depends on the memo, not on its inputs.
    pub fn get(&self) -> T {
        let needs_compute =
            self.inner.dirty.swap(false, Ordering::SeqCst) || self.inner.value.read().is_none();
        if needs_compute {
            let inner = &self.inner;
            let next = inner.runtime.untracked(|| (inner.compute)());
            *inner.value.write() = Some(next);
        }

        self.inner.runtime.track_read(self.inner.id, &self.inner.subscribers);
        self.inner
            .value
            .read()
            .clone()
            .expect("memo value present after recompute")
    }

    /// Whether the cached value is currently stale.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Dispose of the memo: release the internal effect and clear the
    /// subscriber set. Reads keep returning the last computed value.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let tracker = self.inner.tracker.lock().take();
        if let Some(tracker) = tracker {
            tracker.dispose();
        }
        self.inner.subscribers.clear();
    }

    /// Check if the memo has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id)
            .field("dirty", &self.is_dirty())
            .field("subscriber_count", &self.subscriber_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn memo_computes_once_at_creation() {
        let runtime = Runtime::new();
        let compute_count = Arc::new(AtomicI32::new(0));

        let compute_clone = compute_count.clone();
        let memo = Memo::new(&runtime, move || {
            compute_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(compute_count.load(Ordering::SeqCst), 1);

        // Reads before any invalidation return the cached value without a
        // further compute call.
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(compute_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn memo_recomputes_once_per_dirty_period() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);
        let compute_count = Arc::new(AtomicI32::new(0));

        let signal_clone = signal.clone();
        let compute_clone = compute_count.clone();
        let memo = Memo::new(&runtime, move || {
            compute_clone.fetch_add(1, Ordering::SeqCst);
            signal_clone.get() * 10
        });
        assert_eq!(memo.get(), 10);
        assert_eq!(compute_count.load(Ordering::SeqCst), 1);

        signal.set(2);
        runtime.flush();
        // One tracking run inside the flush...
        assert_eq!(compute_count.load(Ordering::SeqCst), 2);
        assert!(memo.is_dirty());

        // ...and exactly one lazy recompute no matter how often we read.
        assert_eq!(memo.get(), 20);
        assert_eq!(memo.get(), 20);
        assert_eq!(memo.get(), 20);
        assert_eq!(compute_count.load(Ordering::SeqCst), 3);
        assert!(!memo.is_dirty());
    }

    #[test]
    fn memo_schedules_dependent_effects() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);
        let observed = Arc::new(AtomicI32::new(0));

        let signal_clone = signal.clone();
        let memo = Memo::new(&runtime, move || signal_clone.get() + 100);

        let memo_clone = memo.clone();
        let observed_clone = observed.clone();
        let _effect = crate::reactive::Effect::new(&runtime, move || {
            observed_clone.store(memo_clone.get(), Ordering::SeqCst);
        });
        assert_eq!(observed.load(Ordering::SeqCst), 101);

        signal.set(5);
        runtime.flush();
        assert_eq!(observed.load(Ordering::SeqCst), 105);
    }

    #[test]
    fn memo_depends_on_memo() {
        let runtime = Runtime::new();
        let base = Signal::new(&runtime, 5);

        let base_clone = base.clone();
        let doubled = Memo::new(&runtime, move || base_clone.get() * 2);

        let doubled_clone = doubled.clone();
        let plus_ten = Memo::new(&runtime, move || doubled_clone.get() + 10);

        assert_eq!(doubled.get(), 10);
        assert_eq!(plus_ten.get(), 20);

        base.set(10);
        runtime.flush();

        assert_eq!(doubled.get(), 20);
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn disposed_memo_keeps_last_value() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);

        let signal_clone = signal.clone();
        let memo = Memo::new(&runtime, move || signal_clone.get() * 3);
        assert_eq!(memo.get(), 3);

        memo.dispose();
        assert!(memo.is_disposed());

        signal.set(10);
        runtime.flush();

        // No longer tracking; the last computed value stays readable.
        assert_eq!(memo.get(), 3);
    }

    #[test]
    fn dispose_is_idempotent() {
        let runtime = Runtime::new();
        let memo = Memo::new(&runtime, || 1);
        memo.dispose();
        memo.dispose();
        assert!(memo.is_disposed());
    }
}
