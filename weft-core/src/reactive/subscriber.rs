//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values: an
//! effect, a memo's internal tracker, or anything else implementing
//! [`Reactive`]. Sources (signals and memos) keep a [`SubscriberSet`] of the
//! contexts that read them, and notify that set when they change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

/// Unique identifier for a subscriber.
///
/// Each reactive context (effect or memo tracker) gets a unique ID when
/// created. The ID keys the scheduler's pending queue, so duplicate
/// scheduling of one context collapses to a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a source (a signal or a memo).
///
/// Subscribers record the sources they were added to under this ID so that
/// disposal can unsubscribe exactly once per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation the scheduler can re-run when a dependency changes.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive context.
    fn subscriber_id(&self) -> SubscriberId;

    /// Execute the context. Implementations must tolerate being called
    /// after disposal (and do nothing in that case).
    fn run(&self);

    /// Check whether the context has been disposed.
    fn is_disposed(&self) -> bool;
}

/// Weak handle to a reactive context.
///
/// Sources and the scheduler hold subscribers weakly so that a dropped
/// context cannot be kept alive by the signals it once read.
pub type TaskRef = Weak<dyn Reactive + Send + Sync>;

/// The set of contexts subscribed to one source.
///
/// Insertion-ordered: notification (and therefore flush) order is
/// first-subscribe order. Only disposal removes entries; writes never clear
/// the set.
#[derive(Clone, Default)]
pub struct SubscriberSet {
    inner: Arc<RwLock<IndexMap<SubscriberId, TaskRef>>>,
}

impl SubscriberSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Re-adding an existing ID keeps its original
    /// position.
    pub fn insert(&self, id: SubscriberId, task: TaskRef) {
        self.inner.write().entry(id).or_insert(task);
    }

    /// Remove a subscriber.
    pub fn remove(&self, id: SubscriberId) {
        self.inner.write().shift_remove(&id);
    }

    /// Remove every subscriber.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Snapshot the live subscribers in order, pruning entries whose
    /// context has been dropped without disposal.
    pub fn snapshot(&self) -> Vec<(SubscriberId, TaskRef)> {
        let mut set = self.inner.write();
        set.retain(|_, task| task.strong_count() > 0);
        set.iter()
            .map(|(id, task)| (*id, task.clone()))
            .collect()
    }

    /// Number of subscribers currently in the set.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct MockReactive {
        id: SubscriberId,
        disposed: AtomicBool,
    }

    impl MockReactive {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                disposed: AtomicBool::new(false),
            })
        }
    }

    impl Reactive for MockReactive {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn run(&self) {}

        fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::SeqCst)
        }
    }

    fn task_ref(arc: &Arc<MockReactive>) -> TaskRef {
        let arc: Arc<dyn Reactive + Send + Sync> = arc.clone();
        Arc::downgrade(&arc)
    }

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn set_preserves_first_add_order() {
        let set = SubscriberSet::new();
        let a = MockReactive::new();
        let b = MockReactive::new();

        set.insert(a.id, task_ref(&a));
        set.insert(b.id, task_ref(&b));
        // Re-adding keeps the original position.
        set.insert(a.id, task_ref(&a));

        let order: Vec<SubscriberId> =
            set.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a.id, b.id]);
    }

    #[test]
    fn snapshot_prunes_dropped_subscribers() {
        let set = SubscriberSet::new();
        let a = MockReactive::new();
        let b = MockReactive::new();

        set.insert(a.id, task_ref(&a));
        set.insert(b.id, task_ref(&b));
        assert_eq!(set.len(), 2);

        drop(a);
        let live = set.snapshot();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, b.id);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_deletes_entry() {
        let set = SubscriberSet::new();
        let a = MockReactive::new();

        set.insert(a.id, task_ref(&a));
        assert!(!set.is_empty());

        set.remove(a.id);
        assert!(set.is_empty());
    }
}
