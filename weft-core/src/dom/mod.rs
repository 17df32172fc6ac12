//! Document Runtime
//!
//! This module turns node descriptions into live document state and keeps
//! the two in sync:
//!
//! - [`node`]: the immutable description model ([`VNode`], [`VElement`],
//!   prop values, dynamic children).
//! - [`host`]: the boundary trait a live document tree implements, plus the
//!   opaque handles and event types that cross it.
//! - [`memory`]: an arena-backed reference host with operation counters.
//! - [`control`]: conditional description building ([`guard`]).
//! - The reconciler and root registry: mounting, positional diffing with
//!   key-gated in-place patching, and depth-first disposal, reached through
//!   [`Renderer`].
//!
//! The reconciler owns every effect and listener it attaches; disposing an
//! instance (or clearing a root) releases all of them before the owned
//! nodes leave the document.

pub mod control;
pub mod host;
pub mod memory;
pub mod node;

mod instance;
mod patch;
mod root;

pub use control::{guard, Branch, Cond};
pub use host::{DocumentHost, Event, EventHandler, HostError, ListenerId, NodeId, SharedHost};
pub use memory::{MemoryHost, OpCounts};
pub use node::{dynamic, el, AccessorFn, AttrValue, DynamicFn, PropValue, VElement, VNode};
pub use root::Renderer;
