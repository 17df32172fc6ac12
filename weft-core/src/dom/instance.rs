//! Instance Tree
//!
//! The live, mutable counterpart of a node description. Every node the
//! reconciler produces belongs to exactly one instance, and the instance
//! carries all of its bookkeeping directly: applied static attributes,
//! per-attribute reactive bindings, attached listeners, region children.
//! There is no external side-table keyed by node identity.
//!
//! Disposal is depth-first: stop owned effects, detach listeners, dispose
//! children, then detach the owned node. A failing disposer is logged and
//! never blocks the rest of the teardown.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::reactive::Effect;

use super::host::{EventHandler, ListenerId, NodeId, SharedHost};
use super::node::{AccessorFn, AttrValue, DynamicFn};

/// Reactive binding driving one function-valued prop.
pub(crate) struct AttributeBinding {
    /// The accessor identity, compared on patch to keep live bindings.
    pub(crate) accessor: AccessorFn,
    /// The effect re-applying the attribute; its cleanup removes it.
    pub(crate) effect: Effect,
}

/// One attached event listener.
pub(crate) struct ListenerEntry {
    /// The handler identity, compared on patch.
    pub(crate) handler: EventHandler,
    /// Host-side registration handle.
    pub(crate) id: ListenerId,
    /// Derived event name (prop name minus the `on` prefix, lowercased).
    pub(crate) event: String,
}

/// Live element: node, applied props, children.
pub(crate) struct ElementInstance {
    pub(crate) node: NodeId,
    pub(crate) tag: String,
    pub(crate) key: Option<String>,
    /// Applied static prop values, by prop name.
    pub(crate) attributes: IndexMap<String, AttrValue>,
    /// Active reactive bindings, by prop name.
    pub(crate) bindings: IndexMap<String, AttributeBinding>,
    /// Attached listeners, by prop name.
    pub(crate) listeners: IndexMap<String, ListenerEntry>,
    pub(crate) children: Vec<Instance>,
}

/// Live text node and its last-written content.
pub(crate) struct TextInstance {
    pub(crate) node: NodeId,
    pub(crate) text: String,
}

/// Live dynamic region: a comment anchor marking the position, the driving
/// effect, and the instances currently occupying the region (inserted
/// before the anchor).
pub(crate) struct DynamicInstance {
    pub(crate) anchor: NodeId,
    /// The producer identity, compared on patch to keep live regions.
    pub(crate) producer: DynamicFn,
    /// Shared with the driving effect, which rewrites it on every run.
    pub(crate) children: Arc<RwLock<Vec<Instance>>>,
    pub(crate) effect: Effect,
}

/// The live counterpart of one (normalized) node description.
pub(crate) enum Instance {
    Element(ElementInstance),
    Text(TextInstance),
    Dynamic(DynamicInstance),
}

impl Instance {
    /// The first live node this instance occupies in the document, used as
    /// the insertion reference when replacing it.
    ///
    /// A dynamic region's content precedes its anchor, so the region's
    /// first node is its first child's — or the anchor itself when the
    /// region is currently empty.
    pub(crate) fn first_node(&self) -> NodeId {
        match self {
            Instance::Element(element) => element.node,
            Instance::Text(text) => text.node,
            Instance::Dynamic(dynamic) => {
                let children = dynamic.children.read();
                match children.first() {
                    Some(child) => child.first_node(),
                    None => dynamic.anchor,
                }
            }
        }
    }

    /// Tear down this instance and everything it owns, then detach its
    /// node(s) from the document.
    pub(crate) fn dispose(self, host: &SharedHost) {
        match self {
            Instance::Element(element) => {
                for (_, binding) in element.bindings {
                    // Effect disposal runs the binding's cleanup behind its
                    // own panic boundary.
                    binding.effect.dispose();
                }
                for (_, listener) in element.listeners {
                    host.write()
                        .remove_listener(element.node, &listener.event, listener.id);
                }
                for child in element.children {
                    child.dispose(host);
                }
                host.write().remove(element.node);
            }
            Instance::Text(text) => {
                host.write().remove(text.node);
            }
            Instance::Dynamic(dynamic) => {
                // Stop the effect first so an already-pending re-run cannot
                // repopulate the region mid-teardown.
                dynamic.effect.dispose();
                let children = std::mem::take(&mut *dynamic.children.write());
                for child in children {
                    child.dispose(host);
                }
                host.write().remove(dynamic.anchor);
            }
        }
    }
}
