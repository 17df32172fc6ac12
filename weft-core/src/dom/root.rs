//! Root Mount and Update
//!
//! A [`Renderer`] associates container nodes with their current instance
//! trees, so rendering the same description root twice patches the live
//! tree instead of rebuilding it. One renderer serves one host; each
//! container it has rendered into is a registered root until cleared or
//! unmounted.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::reactive::Runtime;

use super::host::{NodeId, SharedHost};
use super::instance::Instance;
use super::node::{normalize_node, VNode};
use super::patch::Reconciler;

/// Owns the per-container root registry and the reconciler driving it.
pub struct Renderer {
    reconciler: Reconciler,
    roots: Mutex<HashMap<NodeId, Vec<Instance>>>,
}

impl Renderer {
    /// Create a renderer over the given runtime and host.
    pub fn new(runtime: &Runtime, host: SharedHost) -> Self {
        Self {
            reconciler: Reconciler::new(runtime.clone(), host),
            roots: Mutex::new(HashMap::new()),
        }
    }

    /// The runtime this renderer creates effects in.
    pub fn runtime(&self) -> &Runtime {
        &self.reconciler.runtime
    }

    /// The host this renderer mutates.
    pub fn host(&self) -> &SharedHost {
        &self.reconciler.host
    }

    /// Whether the container currently has a registered root.
    pub fn is_mounted(&self, container: NodeId) -> bool {
        self.roots.lock().contains_key(&container)
    }

    /// Render a description into a container.
    ///
    /// The first render into a container removes any pre-existing children,
    /// builds a fresh instance tree, and registers the root. Subsequent
    /// renders patch the registered instances in place; a description that
    /// resolves to nothing leaves the container empty (still registered).
    pub fn render_to(&self, container: NodeId, description: impl Into<VNode>) {
        let incoming = normalize_node(description.into());
        let mut roots = self.roots.lock();
        match roots.entry(container) {
            Entry::Occupied(mut entry) => {
                self.reconciler
                    .diff_children(container, entry.get_mut(), incoming, None);
            }
            Entry::Vacant(entry) => {
                let stray = self.reconciler.host.read().children(container);
                for child in stray {
                    self.reconciler.host.write().remove(child);
                }
                tracing::trace!(
                    target: "weft::dom",
                    container = container.raw(),
                    "mounting root"
                );

                let instances = entry.insert(Vec::new());
                self.reconciler
                    .diff_children(container, instances, incoming, None);
            }
        }
    }

    /// Dispose the container's registered root (if any) and remove every
    /// remaining child. Disposal runs the full protocol on everything
    /// removed.
    pub fn clear(&self, container: NodeId) {
        let instances = self.roots.lock().remove(&container);
        if let Some(instances) = instances {
            for instance in instances {
                instance.dispose(&self.reconciler.host);
            }
        }

        let leftovers = self.reconciler.host.read().children(container);
        for child in leftovers {
            self.reconciler.host.write().remove(child);
        }
    }

    /// Dispose a registered root's subtree and detach the node itself from
    /// its parent if it is still attached.
    pub fn unmount(&self, node: NodeId) {
        let instances = self.roots.lock().remove(&node);
        if let Some(instances) = instances {
            for instance in instances {
                instance.dispose(&self.reconciler.host);
            }
        }

        let attached = self.reconciler.host.read().parent(node).is_some();
        if attached {
            self.reconciler.host.write().remove(node);
        }
    }
}
