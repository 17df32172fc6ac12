//! In-Memory Host
//!
//! An arena-backed [`DocumentHost`] used as the reference implementation
//! and as the instrumented stub the crate's tests patch against: every
//! attribute write, text write, insertion, and removal is counted, so a
//! test can assert that a patch touched nothing it should not have.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::host::{DocumentHost, Event, EventHandler, HostError, ListenerId, NodeId};

enum NodeKind {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        listeners: IndexMap<ListenerId, (String, EventHandler)>,
    },
    Text(String),
    Comment(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Operation counters for patch-minimality assertions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpCounts {
    /// Calls to `set_attribute`.
    pub attribute_writes: usize,
    /// Calls to `remove_attribute` that removed something.
    pub attribute_removals: usize,
    /// Calls to `set_text`.
    pub text_writes: usize,
    /// Calls to `insert_before`.
    pub inserts: usize,
    /// Calls to `remove` that detached a node.
    pub removals: usize,
}

/// Arena-backed reference host.
pub struct MemoryHost {
    nodes: HashMap<NodeId, NodeData>,
    next_node: u64,
    next_listener: u64,
    counts: OpCounts,
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_node: 0,
            next_listener: 0,
            counts: OpCounts::default(),
        }
    }

    /// Create an empty host plus a root container node to mount into.
    pub fn with_container() -> (Arc<RwLock<MemoryHost>>, NodeId) {
        let mut host = Self::new();
        let container = host.create_element("root");
        (Arc::new(RwLock::new(host)), container)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from_raw(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            NodeData {
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes.get(&node).and_then(|data| data.parent) else {
            return false;
        };
        if let Some(parent_data) = self.nodes.get_mut(&parent) {
            parent_data.children.retain(|child| *child != node);
        }
        if let Some(data) = self.nodes.get_mut(&node) {
            data.parent = None;
        }
        true
    }

    // ------------------------------------------------------------------
    // Queries (test and embedder conveniences, not part of the trait)
    // ------------------------------------------------------------------

    /// Snapshot of the operation counters.
    pub fn counts(&self) -> OpCounts {
        self.counts
    }

    /// Reset the operation counters to zero.
    pub fn reset_counts(&mut self) {
        self.counts = OpCounts::default();
    }

    /// Whether the host knows this node.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Tag of an element node.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.nodes.get(&node)?.kind {
            NodeKind::Element { ref tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Current value of an attribute.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match self.nodes.get(&node)?.kind {
            NodeKind::Element { ref attributes, .. } => {
                attributes.get(name).map(String::as_str)
            }
            _ => None,
        }
    }

    /// Number of listeners currently attached to a node.
    pub fn listener_count(&self, node: NodeId) -> usize {
        match self.nodes.get(&node) {
            Some(NodeData {
                kind: NodeKind::Element { listeners, .. },
                ..
            }) => listeners.len(),
            _ => 0,
        }
    }

    /// Concatenated text content of a subtree, in document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(data) = self.nodes.get(&node) else {
            return String::new();
        };
        match &data.kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Comment(_) => String::new(),
            NodeKind::Element { .. } => data
                .children
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
        }
    }

    /// Children of `node` that are elements with the given tag.
    pub fn children_with_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|child| self.tag(*child) == Some(tag))
            .collect()
    }

    /// Dispatch a synthetic event to the listeners registered on `target`.
    ///
    /// Handlers are cloned out before invocation, so a handler is free to
    /// write signals or mutate the tree through the shared host. Returns
    /// the number of handlers invoked.
    pub fn dispatch(
        host: &Arc<RwLock<MemoryHost>>,
        target: NodeId,
        event: &str,
    ) -> Result<usize, HostError> {
        let handlers: Vec<EventHandler> = {
            let guard = host.read();
            let data = guard
                .nodes
                .get(&target)
                .ok_or(HostError::UnknownNode(target))?;
            match &data.kind {
                NodeKind::Element { listeners, .. } => listeners
                    .values()
                    .filter(|(name, _)| name == event)
                    .map(|(_, handler)| handler.clone())
                    .collect(),
                _ => return Err(HostError::NotAnElement(target)),
            }
        };

        let event = Event {
            name: event.to_string(),
            target,
        };
        for handler in &handlers {
            handler(&event);
        }
        Ok(handlers.len())
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentHost for MemoryHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            listeners: IndexMap::new(),
        })
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn create_comment(&mut self, label: &str) -> NodeId {
        self.alloc(NodeKind::Comment(label.to_string()))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.counts.attribute_writes += 1;
        if let Some(NodeData {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(&node)
        {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(NodeData {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(&node)
        {
            if attributes.shift_remove(name).is_some() {
                self.counts.attribute_removals += 1;
            }
        }
    }

    fn add_listener(&mut self, node: NodeId, event: &str, handler: EventHandler) -> ListenerId {
        let id = ListenerId::from_raw(self.next_listener);
        self.next_listener += 1;
        if let Some(NodeData {
            kind: NodeKind::Element { listeners, .. },
            ..
        }) = self.nodes.get_mut(&node)
        {
            listeners.insert(id, (event.to_string(), handler));
        }
        id
    }

    fn remove_listener(&mut self, node: NodeId, _event: &str, listener: ListenerId) {
        if let Some(NodeData {
            kind: NodeKind::Element { listeners, .. },
            ..
        }) = self.nodes.get_mut(&node)
        {
            listeners.shift_remove(&listener);
        }
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&node) {
            return;
        }
        self.detach(node);
        self.counts.inserts += 1;

        let Some(parent_data) = self.nodes.get_mut(&parent) else {
            return;
        };
        let position = reference
            .and_then(|reference| {
                parent_data
                    .children
                    .iter()
                    .position(|child| *child == reference)
            })
            .unwrap_or(parent_data.children.len());
        parent_data.children.insert(position, node);

        if let Some(data) = self.nodes.get_mut(&node) {
            data.parent = Some(parent);
        }
    }

    fn remove(&mut self, node: NodeId) {
        if self.detach(node) {
            self.counts.removals += 1;
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.counts.text_writes += 1;
        if let Some(data) = self.nodes.get_mut(&node) {
            match &mut data.kind {
                NodeKind::Text(content) | NodeKind::Comment(content) => {
                    *content = text.to_string();
                }
                NodeKind::Element { .. } => {}
            }
        }
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Text(content) | NodeKind::Comment(content) => Some(content.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn children(&self, node: NodeId) -> SmallVec<[NodeId; 8]> {
        self.nodes
            .get(&node)
            .map(|data| data.children.iter().copied().collect())
            .unwrap_or_default()
    }
}
