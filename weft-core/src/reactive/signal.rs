//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal's value changes, all subscribers are enqueued on the
//!    runtime's scheduler; they re-run at the next flush.
//!
//! 3. Writing a value equal to the current one is a no-op: nothing is
//!    stored and nothing is scheduled.
//!
//! Subscriber bookkeeping only ever shrinks through disposal — a write
//! never clears the set.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::Runtime;
use super::subscriber::{SourceId, SubscriberSet};

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (schedules subscribers)
/// count.set(5);
/// runtime.flush();
/// ```
pub struct Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: SourceId,

    /// The current value.
    value: Arc<RwLock<T>>,

    /// The contexts that have read this signal while tracking.
    subscribers: SubscriberSet,

    /// The runtime this signal schedules into.
    runtime: Runtime,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            id: SourceId::new(),
            value: Arc::new(RwLock::new(value)),
            subscribers: SubscriberSet::new(),
            runtime: runtime.clone(),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Get the current value.
    ///
    /// If called while a reactive context is executing, registers that
    /// context as a subscriber.
    pub fn get(&self) -> T {
        self.runtime.track_read(self.id, &self.subscribers);
        self.value.read().clone()
    }

    /// Get the current value without tracking a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and schedule subscribers.
    ///
    /// If the new value equals the current one, nothing happens: idempotent
    /// writes schedule zero subscribers.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.value.write();
            if *guard == value {
                return;
            }
            *guard = value;
        }
        self.runtime.schedule_set(&self.subscribers);
    }

    /// Update the value using a function of the previous value.
    ///
    /// The same equality gate as [`Signal::set`] applies to the resolved
    /// value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(next);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            subscribers: self.subscribers.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn signal_get_and_set() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn equal_write_schedules_nothing() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 7);

        let signal_clone = signal.clone();
        let _effect = Effect::new(&runtime, move || {
            signal_clone.get();
        });

        signal.set(7);
        assert_eq!(runtime.pending_count(), 0);
        assert!(!runtime.is_flush_scheduled());

        signal.set(8);
        assert_eq!(runtime.pending_count(), 1);
    }

    #[test]
    fn writes_coalesce_into_one_rerun() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0);
        let observed = Arc::new(AtomicI32::new(-1));
        let runs = Arc::new(AtomicI32::new(0));

        let signal_clone = signal.clone();
        let observed_clone = observed.clone();
        let runs_clone = runs.clone();
        let _effect = Effect::new(&runtime, move || {
            observed_clone.store(signal_clone.get(), Ordering::SeqCst);
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        signal.set(1);
        signal.set(2);
        signal.set(3);
        runtime.flush();

        // One re-run, observing only the final value.
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(observed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn untracked_read_does_not_subscribe() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0);

        let signal_clone = signal.clone();
        let _effect = Effect::new(&runtime, move || {
            signal_clone.get_untracked();
        });

        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn signal_clone_shares_state() {
        let runtime = Runtime::new();
        let signal1 = Signal::new(&runtime, 0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
    }

    #[test]
    fn signal_ids_are_unique() {
        let runtime = Runtime::new();
        let s1 = Signal::new(&runtime, 0);
        let s2 = Signal::new(&runtime, 0);

        assert_ne!(s1.id(), s2.id());
    }
}
