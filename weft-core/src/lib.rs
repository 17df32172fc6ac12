//! Weft Core
//!
//! This crate provides the core runtime for the Weft reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects) with a batched,
//!   ordering-safe scheduler
//! - A node description model and the reconciler that mounts and
//!   incrementally patches a live document tree
//! - The mount/root registry and the host-document boundary
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: dependency tracking, scheduling, and the reactive
//!   primitives built on them
//! - `dom`: node descriptions, the host boundary, the reconciler, and the
//!   root registry
//!
//! Surrounding tooling (template transpilers, routers, build plugins) stays
//! outside: it builds descriptions and calls [`Renderer::render_to`], and
//! the core neither knows nor cares who produced the tree.
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::{dynamic, el, MemoryHost, Renderer, Runtime, Signal};
//!
//! let runtime = Runtime::new();
//! let (host, container) = MemoryHost::with_container();
//! let renderer = Renderer::new(&runtime, host.clone());
//!
//! let count = Signal::new(&runtime, 0);
//! let view = {
//!     let count = count.clone();
//!     el("div").child(el("span").child(dynamic(move || count.get().to_string())))
//! };
//!
//! renderer.render_to(container, view);
//! count.set(1);
//! runtime.flush(); // The span now reads "1".
//! ```

pub mod dom;
pub mod reactive;

pub use dom::{
    dynamic, el, guard, AttrValue, Branch, Cond, DocumentHost, Event, EventHandler, HostError,
    ListenerId, MemoryHost, NodeId, OpCounts, PropValue, Renderer, SharedHost, VElement, VNode,
};
pub use reactive::{Effect, Memo, Runtime, Selector, Signal, Store, Subscription};
