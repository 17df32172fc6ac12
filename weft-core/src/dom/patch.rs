//! Reconciler
//!
//! Turns node descriptions into live instances on mount and patches
//! existing instances against new descriptions on re-render. All recursion
//! is explicit: every call receives the parent node and the insertion
//! reference as plain parameters.
//!
//! # Diffing policy
//!
//! Children are compared positionally, index by index. A `key` prop only
//! gates whether the element at the *same index* may be patched in place;
//! there is no cross-index move detection. Replacements insert the new
//! nodes before the old instance's current position and dispose the old
//! instance afterwards, so sibling order never wobbles.
//!
//! # Ownership of reactivity
//!
//! The reconciler creates one effect per function-valued prop and one per
//! dynamic child region, and records each on the owning instance. Patching
//! keeps a live effect whenever the callable identity is unchanged; only
//! disposal tears effects down.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::reactive::{Effect, Runtime};

use super::host::{NodeId, SharedHost};
use super::instance::{
    AttributeBinding, DynamicInstance, ElementInstance, Instance, ListenerEntry, TextInstance,
};
use super::node::{
    normalize_children, normalize_node, AttrValue, DynamicFn, PropValue, VElement, VNode,
};

/// Map the conventional prop-name aliases onto their document attributes.
fn attribute_name(prop: &str) -> &str {
    match prop {
        "className" => "class",
        "htmlFor" => "for",
        other => other,
    }
}

/// Derive the listener event name from an `on`-prefixed prop name.
fn event_name(prop: &str) -> Option<String> {
    match prop.strip_prefix("on") {
        Some(event) if !event.is_empty() => Some(event.to_ascii_lowercase()),
        _ => None,
    }
}

/// Write or remove one resolved attribute value.
fn apply_attribute(host: &SharedHost, node: NodeId, attr: &str, value: &AttrValue) {
    match value {
        AttrValue::Text(text) => host.write().set_attribute(node, attr, text),
        AttrValue::Bool(true) => host.write().set_attribute(node, attr, ""),
        AttrValue::Bool(false) => host.write().remove_attribute(node, attr),
    }
}

/// The mount/patch engine: a runtime to create effects in and a host to
/// mutate. Cheap to clone; dynamic-region effects carry their own copy.
#[derive(Clone)]
pub(crate) struct Reconciler {
    pub(crate) runtime: Runtime,
    pub(crate) host: SharedHost,
}

impl Reconciler {
    pub(crate) fn new(runtime: Runtime, host: SharedHost) -> Self {
        Self { runtime, host }
    }

    // ------------------------------------------------------------------
    // Mount
    // ------------------------------------------------------------------

    /// Create the live instance for one normalized description, inserted
    /// under `parent` before `reference` (appended when `None`).
    ///
    /// `Empty` and `Fragment` never reach this point: normalization drops
    /// the former and splices the latter into siblings. A stray one renders
    /// nothing.
    pub(crate) fn create_instance(
        &self,
        node: VNode,
        parent: NodeId,
        reference: Option<NodeId>,
    ) -> Option<Instance> {
        match node {
            VNode::Element(element) => Some(self.create_element(element, parent, reference)),
            VNode::Text(text) => Some(self.create_text(text, parent, reference)),
            VNode::Dynamic(producer) => Some(self.create_dynamic(producer, parent, reference)),
            VNode::Fragment(_) | VNode::Empty => None,
        }
    }

    fn create_text(&self, text: String, parent: NodeId, reference: Option<NodeId>) -> Instance {
        let node = self.host.write().create_text(&text);
        self.host.write().insert_before(parent, node, reference);
        Instance::Text(TextInstance { node, text })
    }

    fn create_element(
        &self,
        description: VElement,
        parent: NodeId,
        reference: Option<NodeId>,
    ) -> Instance {
        let VElement {
            tag,
            props,
            children,
        } = description;

        let node = self.host.write().create_element(&tag);
        let mut element = ElementInstance {
            node,
            tag,
            key: None,
            attributes: Default::default(),
            bindings: Default::default(),
            listeners: Default::default(),
            children: Vec::new(),
        };

        for (name, value) in props {
            self.mount_prop(&mut element, &name, value);
        }

        for child in normalize_children(children) {
            if let Some(instance) = self.create_instance(child, node, None) {
                element.children.push(instance);
            }
        }

        self.host.write().insert_before(parent, node, reference);
        Instance::Element(element)
    }

    fn create_dynamic(
        &self,
        producer: DynamicFn,
        parent: NodeId,
        reference: Option<NodeId>,
    ) -> Instance {
        let anchor = self.host.write().create_comment("weft-dyn");
        self.host.write().insert_before(parent, anchor, reference);

        let children: Arc<RwLock<Vec<Instance>>> = Arc::new(RwLock::new(Vec::new()));

        // The region's effect: evaluate the producer (tracked), then patch
        // the region's instances against the result, anchored before the
        // comment node. New nodes land before the anchor; the region list
        // is rewritten in place.
        let reconciler = self.clone();
        let region = Arc::clone(&children);
        let evaluate = Arc::clone(&producer);
        let effect = Effect::new(&self.runtime, move || {
            let incoming = normalize_node(evaluate());
            let mut current = region.write();
            reconciler.diff_children(parent, &mut current, incoming, Some(anchor));
        });

        Instance::Dynamic(DynamicInstance {
            anchor,
            producer,
            children,
            effect,
        })
    }

    // ------------------------------------------------------------------
    // Props
    // ------------------------------------------------------------------

    fn mount_prop(&self, element: &mut ElementInstance, name: &str, value: PropValue) {
        if name == "key" {
            if let PropValue::Static(AttrValue::Text(key)) = value {
                element.key = Some(key);
            }
            return;
        }

        match value {
            PropValue::Static(value) => {
                apply_attribute(&self.host, element.node, attribute_name(name), &value);
                element.attributes.insert(name.to_string(), value);
            }
            PropValue::Accessor(accessor) => {
                let binding = self.create_binding(element.node, name, accessor);
                element.bindings.insert(name.to_string(), binding);
            }
            PropValue::Handler(handler) => {
                let Some(event) = event_name(name) else {
                    // A callable under a non-event name has no meaning;
                    // contribute nothing.
                    return;
                };
                let id = self
                    .host
                    .write()
                    .add_listener(element.node, &event, Arc::clone(&handler));
                element
                    .listeners
                    .insert(name.to_string(), ListenerEntry { handler, id, event });
            }
        }
    }

    fn create_binding(
        &self,
        node: NodeId,
        name: &str,
        accessor: super::node::AccessorFn,
    ) -> AttributeBinding {
        let attr = attribute_name(name).to_string();

        let host = Arc::clone(&self.host);
        let resolve = Arc::clone(&accessor);
        let effect = Effect::new(&self.runtime, {
            let attr = attr.clone();
            move || {
                let value = resolve();
                apply_attribute(&host, node, &attr, &value);
            }
        });

        let host = Arc::clone(&self.host);
        effect.set_cleanup(move || {
            host.write().remove_attribute(node, &attr);
        });

        AttributeBinding { accessor, effect }
    }

    fn patch_prop(&self, element: &mut ElementInstance, name: &str, value: PropValue) {
        match value {
            PropValue::Static(next) => {
                if let Some(binding) = element.bindings.shift_remove(name) {
                    binding.effect.dispose();
                }
                if let Some(listener) = element.listeners.shift_remove(name) {
                    self.host
                        .write()
                        .remove_listener(element.node, &listener.event, listener.id);
                }
                // Unchanged value: keep the live attribute, write nothing.
                if element.attributes.get(name) == Some(&next) {
                    return;
                }
                apply_attribute(&self.host, element.node, attribute_name(name), &next);
                element.attributes.insert(name.to_string(), next);
            }
            PropValue::Accessor(accessor) => {
                if let Some(existing) = element.bindings.get(name) {
                    // Same callable: the live subscription stays.
                    if Arc::ptr_eq(&existing.accessor, &accessor) {
                        return;
                    }
                }
                if let Some(binding) = element.bindings.shift_remove(name) {
                    binding.effect.dispose();
                }
                if let Some(listener) = element.listeners.shift_remove(name) {
                    self.host
                        .write()
                        .remove_listener(element.node, &listener.event, listener.id);
                }
                element.attributes.shift_remove(name);
                let binding = self.create_binding(element.node, name, accessor);
                element.bindings.insert(name.to_string(), binding);
            }
            PropValue::Handler(handler) => {
                let Some(event) = event_name(name) else {
                    return;
                };
                if let Some(existing) = element.listeners.get(name) {
                    // Same callable: keep the attached listener.
                    if Arc::ptr_eq(&existing.handler, &handler) {
                        return;
                    }
                }
                if let Some(listener) = element.listeners.shift_remove(name) {
                    self.host
                        .write()
                        .remove_listener(element.node, &listener.event, listener.id);
                }
                if let Some(binding) = element.bindings.shift_remove(name) {
                    binding.effect.dispose();
                }
                element.attributes.shift_remove(name);
                let id = self
                    .host
                    .write()
                    .add_listener(element.node, &event, Arc::clone(&handler));
                element
                    .listeners
                    .insert(name.to_string(), ListenerEntry { handler, id, event });
            }
        }
    }

    // ------------------------------------------------------------------
    // Patch
    // ------------------------------------------------------------------

    fn patch_element(&self, element: &mut ElementInstance, description: VElement) {
        let VElement {
            props, children, ..
        } = description;

        // Props present before but absent now are removed first.
        let removed_attributes: Vec<String> = element
            .attributes
            .keys()
            .filter(|name| !props.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in removed_attributes {
            element.attributes.shift_remove(&name);
            self.host
                .write()
                .remove_attribute(element.node, attribute_name(&name));
        }

        let removed_bindings: Vec<String> = element
            .bindings
            .keys()
            .filter(|name| !props.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in removed_bindings {
            if let Some(binding) = element.bindings.shift_remove(&name) {
                // The binding's cleanup removes the attribute it applied.
                binding.effect.dispose();
            }
        }

        let removed_listeners: Vec<String> = element
            .listeners
            .keys()
            .filter(|name| !props.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in removed_listeners {
            if let Some(listener) = element.listeners.shift_remove(&name) {
                self.host
                    .write()
                    .remove_listener(element.node, &listener.event, listener.id);
            }
        }

        for (name, value) in props {
            if name == "key" {
                continue;
            }
            self.patch_prop(element, &name, value);
        }

        let incoming = normalize_children(children);
        let node = element.node;
        self.diff_children(node, &mut element.children, incoming, None);
    }

    /// Patch the instance at one slot against its new description.
    fn patch_slot(&self, parent: NodeId, slot: &mut Instance, description: VNode) {
        let in_place = match (&*slot, &description) {
            (Instance::Text(_), VNode::Text(_)) => true,
            // Same tag (case-insensitive) and same key may patch in place.
            (Instance::Element(element), VNode::Element(next)) => {
                element.tag.eq_ignore_ascii_case(&next.tag) && element.key == next.resolved_key()
            }
            // An identical producer keeps the whole region: its own effect
            // keeps it current.
            (Instance::Dynamic(dynamic), VNode::Dynamic(producer)) => {
                Arc::ptr_eq(&dynamic.producer, producer)
            }
            _ => false,
        };

        if !in_place {
            // Build the replacement at the old instance's current position,
            // then dispose the old instance — insertion first, so sibling
            // order never gaps.
            let position = slot.first_node();
            if let Some(replacement) = self.create_instance(description, parent, Some(position)) {
                let old = std::mem::replace(slot, replacement);
                old.dispose(&self.host);
            }
            return;
        }

        match (slot, description) {
            // Text over text: only a changed string touches the document.
            (Instance::Text(text), VNode::Text(next)) => {
                if text.text != next {
                    self.host.write().set_text(text.node, &next);
                    text.text = next;
                }
            }
            (Instance::Element(element), VNode::Element(next)) => {
                self.patch_element(element, next);
            }
            (Instance::Dynamic(_), VNode::Dynamic(_)) => {}
            _ => {}
        }
    }

    /// Positionally diff a slot list against its new (normalized)
    /// descriptions. `tail` is the insertion reference for appended slots —
    /// the region anchor inside a dynamic region, `None` (append) under an
    /// element or root.
    pub(crate) fn diff_children(
        &self,
        parent: NodeId,
        existing: &mut Vec<Instance>,
        incoming: Vec<VNode>,
        tail: Option<NodeId>,
    ) {
        let retained = incoming.len().min(existing.len());
        let mut incoming = incoming.into_iter();

        for index in 0..retained {
            if let Some(description) = incoming.next() {
                self.patch_slot(parent, &mut existing[index], description);
            }
        }

        // Old list longer: dispose the surplus slots.
        if existing.len() > retained {
            for instance in existing.drain(retained..) {
                instance.dispose(&self.host);
            }
        }

        // New list longer: create fresh instances before the tail anchor.
        for description in incoming {
            if let Some(instance) = self.create_instance(description, parent, tail) {
                existing.push(instance);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_aliases_remap() {
        assert_eq!(attribute_name("className"), "class");
        assert_eq!(attribute_name("htmlFor"), "for");
        assert_eq!(attribute_name("value"), "value");
    }

    #[test]
    fn event_names_strip_prefix_and_lowercase() {
        assert_eq!(event_name("onClick"), Some("click".to_string()));
        assert_eq!(event_name("onclick"), Some("click".to_string()));
        assert_eq!(event_name("onKeyDown"), Some("keydown".to_string()));
        assert_eq!(event_name("on"), None);
        assert_eq!(event_name("click"), None);
    }
}
