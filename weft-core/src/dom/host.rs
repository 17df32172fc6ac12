//! Host Document Boundary
//!
//! The reconciler never talks to a concrete DOM. It drives a
//! [`DocumentHost`]: the minimal capability set a live document tree must
//! offer — node creation, attribute and text writes, listener management,
//! and tree surgery — expressed over opaque [`NodeId`] handles minted by the
//! host. Anything that can satisfy this trait (a browser bridge, a test
//! arena, a headless renderer) can back the runtime.

use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;
use thiserror::Error;

/// Opaque handle to a live node owned by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Build a handle from a raw host-assigned value.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Opaque handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Build a handle from a raw host-assigned value.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// An event delivered to listeners registered through the host.
#[derive(Debug, Clone)]
pub struct Event {
    /// The event name the listener was registered under (e.g. `click`).
    pub name: String,
    /// The node the event was dispatched to.
    pub target: NodeId,
}

/// Callback attached to an element for a named event.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// The capability set the reconciler needs from a live document tree.
///
/// Mutating methods are infallible: hosts are expected to ignore operations
/// on handles they no longer know (the renderer must stay resilient, one
/// bad leaf must not take down the tree).
pub trait DocumentHost: Send + Sync {
    /// Create a detached element node.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Create a detached comment node (used as a region anchor).
    fn create_comment(&mut self, label: &str) -> NodeId;

    /// Set an attribute on an element.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Remove an attribute from an element.
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Attach an event listener, returning a handle for later removal.
    fn add_listener(&mut self, node: NodeId, event: &str, handler: EventHandler) -> ListenerId;

    /// Detach a previously-registered event listener.
    fn remove_listener(&mut self, node: NodeId, event: &str, listener: ListenerId);

    /// Insert `node` under `parent`, before `reference` (append when
    /// `reference` is `None`). Detaches `node` from any previous parent.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    /// Detach a node from its parent. The node itself stays valid.
    fn remove(&mut self, node: NodeId);

    /// Overwrite the content of a text node.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Read the content of a text node.
    fn text(&self, node: NodeId) -> Option<String>;

    /// Get a node's parent, if attached.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Snapshot a node's children in document order.
    fn children(&self, node: NodeId) -> SmallVec<[NodeId; 8]>;
}

/// Shared, lock-guarded handle to a host.
///
/// The reconciler locks per operation, never across a nested mount, so
/// effects created while building a subtree can reach the host themselves.
pub type SharedHost = Arc<RwLock<dyn DocumentHost>>;

/// Errors at the host boundary.
///
/// Only the host's own entry points (such as event dispatch) are fallible;
/// the reconciler-facing trait is not.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    /// The referenced node does not exist in this host.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// The referenced node exists but is not an element.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
}
