//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, effects,
//! and the runtime that schedules them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (a memo or effect), the signal automatically
//! registers that context as a subscriber. When the value changes, all
//! subscribers are scheduled for the next flush.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result and recomputes lazily,
//! at most once per invalidation. Memos are themselves readable, trackable
//! sources.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that re-runs whenever its
//! dependencies change. Effects synchronize reactive state with external
//! systems — in this crate, chiefly the document tree.
//!
//! ## The Runtime
//!
//! Dependency detection works through the runtime's tracker stack: while a
//! computation runs, it sits on top of the stack and every source read
//! during that window registers it. The same runtime owns the batched
//! scheduler: writes enqueue subscribers, and [`Runtime::flush`] runs each
//! pending context exactly once per tick.
//!
//! Each [`Runtime`] is an explicit, independent instance injected into the
//! primitives at creation. This approach ("automatic dependency tracking")
//! is the one used by SolidJS, Vue 3, and Leptos.

mod effect;
mod memo;
mod runtime;
mod signal;
mod store;
mod subscriber;

pub use effect::Effect;
pub use memo::Memo;
pub use runtime::Runtime;
pub use signal::Signal;
pub use store::{Selector, Store, Subscription};
pub use subscriber::{Reactive, SourceId, SubscriberId, SubscriberSet, TaskRef};
