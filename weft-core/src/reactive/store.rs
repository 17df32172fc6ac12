//! Store Implementation
//!
//! A Store is a single-signal state container for application state shared
//! across the UI: a snapshot accessor, commit operations, memo-backed
//! selectors, and effect-backed change subscriptions. It adds no tracking
//! machinery of its own; everything is built from [`Signal`], [`Memo`], and
//! [`Effect`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::effect::Effect;
use super::memo::Memo;
use super::runtime::Runtime;
use super::signal::Signal;

/// A derived view of store state, backed by a memo.
///
/// Obtained from [`Store::select`]; recomputes only when the store commits
/// a change, at most once per commit regardless of read count.
pub struct Selector<S>
where
    S: Clone + Send + Sync + 'static,
{
    memo: Memo<S>,
}

impl<S> Selector<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Read the selected value, registering an active reactive context as
    /// a subscriber.
    pub fn get(&self) -> S {
        self.memo.get()
    }

    /// Stop recomputing. Reads keep returning the last value.
    pub fn dispose(&self) {
        self.memo.dispose();
    }
}

impl<S> Clone for Selector<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            memo: self.memo.clone(),
        }
    }
}

/// A change subscription handle returned by [`Store::subscribe`].
pub struct Subscription {
    effect: Effect,
}

impl Subscription {
    /// Stop receiving change notifications.
    pub fn unsubscribe(&self) {
        self.effect.dispose();
    }
}

struct StoreInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    state: Signal<T>,
    runtime: Runtime,
    /// Subscription effects, kept so destroy can stop them all.
    subscriptions: Mutex<Vec<Effect>>,
    /// Selector disposers, kept so destroy can release their memos.
    selectors: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
    destroyed: AtomicBool,
}

/// A reactive state container over a single state value.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let store = Store::new(&runtime, Theme { dark: false, toggles: 0 });
///
/// let dark = store.select(|t| t.dark);
/// store.update(|t| t.toggles += 1);
/// runtime.flush();
/// ```
pub struct Store<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<StoreInner<T>>,
}

impl<T> Store<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a store with the given initial state.
    pub fn new(runtime: &Runtime, initial: T) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Signal::new(runtime, initial),
                runtime: runtime.clone(),
                subscriptions: Mutex::new(Vec::new()),
                selectors: Mutex::new(Vec::new()),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Snapshot the current state, registering an active reactive context
    /// as a subscriber.
    pub fn state(&self) -> T {
        self.inner.state.get()
    }

    /// Snapshot the current state without tracking.
    pub fn state_untracked(&self) -> T {
        self.inner.state.get_untracked()
    }

    /// Replace the state. Commits (and notifies) only when the new state
    /// differs from the current one.
    pub fn set(&self, value: T) {
        self.inner.state.set(value);
    }

    /// Patch the state in place. Commits only when the patched state
    /// differs from the previous one.
    pub fn update<F>(&self, patch: F)
    where
        F: FnOnce(&mut T),
    {
        self.inner.state.update(|prev| {
            let mut next = prev.clone();
            patch(&mut next);
            next
        });
    }

    /// Derive a memo-backed view of the state.
    ///
    /// The selector recomputes at most once per committed change. The
    /// returned [`Selector`] can be disposed individually; [`Store::destroy`]
    /// disposes every selector still alive.
    pub fn select<S, F>(&self, selector: F) -> Selector<S>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        let state = self.inner.state.clone();
        let memo = Memo::new(&self.inner.runtime, move || selector(&state.get()));

        let handle = memo.clone();
        self.inner
            .selectors
            .lock()
            .push(Box::new(move || handle.dispose()));

        Selector { memo }
    }

    /// Subscribe to committed state changes.
    ///
    /// The listener runs once immediately with the current state, then once
    /// per flush that observes a committed change, until unsubscribed or the
    /// store is destroyed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let state = self.inner.state.clone();
        let effect = Effect::new(&self.inner.runtime, move || {
            let snapshot = state.get();
            listener(&snapshot);
        });

        self.inner.subscriptions.lock().push(effect.clone());
        Subscription { effect }
    }

    /// Stop every subscription and selector. Idempotent; the state itself
    /// stays readable.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        for effect in self.inner.subscriptions.lock().drain(..) {
            effect.dispose();
        }
        for dispose in self.inner.selectors.lock().drain(..) {
            dispose();
        }
    }

    /// Check whether the store has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }
}

impl<T> Clone for Store<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[derive(Clone, PartialEq, Debug)]
    struct ThemeState {
        dark: bool,
        toggles: i32,
    }

    #[test]
    fn update_commits_and_notifies() {
        let runtime = Runtime::new();
        let store = Store::new(
            &runtime,
            ThemeState {
                dark: false,
                toggles: 0,
            },
        );

        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();
        let _sub = store.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });
        // Listener ran immediately with the current state.
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        store.update(|state| {
            state.dark = true;
            state.toggles += 1;
        });
        runtime.flush();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(store.state_untracked().dark);
    }

    #[test]
    fn identical_patch_does_not_notify() {
        let runtime = Runtime::new();
        let store = Store::new(
            &runtime,
            ThemeState {
                dark: false,
                toggles: 0,
            },
        );

        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();
        let _sub = store.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.update(|_| {});
        runtime.flush();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn selector_recomputes_once_per_commit() {
        let runtime = Runtime::new();
        let store = Store::new(
            &runtime,
            ThemeState {
                dark: false,
                toggles: 0,
            },
        );

        let computes = Arc::new(AtomicI32::new(0));
        let computes_clone = computes.clone();
        let toggles = store.select(move |state| {
            computes_clone.fetch_add(1, Ordering::SeqCst);
            state.toggles
        });
        assert_eq!(toggles.get(), 0);
        assert_eq!(computes.load(Ordering::SeqCst), 1);

        store.update(|state| state.toggles += 1);
        runtime.flush();
        assert_eq!(toggles.get(), 1);
        assert_eq!(toggles.get(), 1);
        // One tracking recompute in the flush plus one lazy read.
        assert_eq!(computes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let runtime = Runtime::new();
        let store = Store::new(
            &runtime,
            ThemeState {
                dark: false,
                toggles: 0,
            },
        );

        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();
        let sub = store.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        store.update(|state| state.toggles += 1);
        runtime.flush();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_stops_everything_and_is_idempotent() {
        let runtime = Runtime::new();
        let store = Store::new(
            &runtime,
            ThemeState {
                dark: false,
                toggles: 0,
            },
        );

        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();
        let _sub = store.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });
        let toggles = store.select(|state| state.toggles);

        store.destroy();
        store.destroy();

        store.update(|state| state.toggles += 1);
        runtime.flush();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        // Disposed selector keeps its last value.
        assert_eq!(toggles.get(), 0);
        assert!(store.is_destroyed());
    }
}
