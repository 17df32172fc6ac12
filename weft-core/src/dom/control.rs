//! Conditional Description Building
//!
//! [`guard`] picks the first branch whose condition holds and resolves it
//! into a normalized description. Conditions and branch values may both be
//! lazy, so transpiled or hand-written view code can defer building a
//! branch until it is actually taken.

use std::sync::Arc;

use super::node::{normalize_node, VNode};

/// A guard condition: either a settled boolean or a closure evaluated at
/// selection time.
#[derive(Clone)]
pub enum Cond {
    Value(bool),
    Lazy(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Cond {
    /// A settled condition.
    pub fn value(value: bool) -> Self {
        Self::Value(value)
    }

    /// A condition evaluated when the guard is resolved.
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(f))
    }

    fn holds(&self) -> bool {
        match self {
            Self::Value(value) => *value,
            Self::Lazy(f) => f(),
        }
    }
}

impl From<bool> for Cond {
    fn from(value: bool) -> Self {
        Self::Value(value)
    }
}

/// A branch value: a settled description or a thunk producing a further
/// branch. Thunks may nest; the chain is resolved only when the branch is
/// taken.
#[derive(Clone)]
pub enum Branch {
    Node(VNode),
    Lazy(Arc<dyn Fn() -> Branch + Send + Sync>),
}

impl Branch {
    /// A settled branch value.
    pub fn node(node: impl Into<VNode>) -> Self {
        Self::Node(node.into())
    }

    /// A branch built only when taken.
    pub fn lazy<F, B>(f: F) -> Self
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: Into<Branch>,
    {
        Self::Lazy(Arc::new(move || f().into()))
    }

    fn resolve(self) -> VNode {
        let mut current = self;
        loop {
            match current {
                Self::Node(node) => return node,
                Self::Lazy(f) => current = f(),
            }
        }
    }
}

impl From<VNode> for Branch {
    fn from(node: VNode) -> Self {
        Self::Node(node)
    }
}

impl From<super::node::VElement> for Branch {
    fn from(element: super::node::VElement) -> Self {
        Self::Node(element.into())
    }
}

impl From<&str> for Branch {
    fn from(text: &str) -> Self {
        Self::Node(text.into())
    }
}

impl From<String> for Branch {
    fn from(text: String) -> Self {
        Self::Node(text.into())
    }
}

/// Resolve the first case whose condition holds, falling back to
/// `fallback`, or to nothing.
///
/// The chosen branch is resolved through any chain of thunks and
/// normalized: nested sequences flatten, empties drop out. Branches not
/// taken are never evaluated.
pub fn guard<I>(cases: I, fallback: Option<Branch>) -> VNode
where
    I: IntoIterator<Item = (Cond, Branch)>,
{
    for (condition, branch) in cases {
        if condition.holds() {
            return normalized(branch.resolve());
        }
    }

    match fallback {
        Some(branch) => normalized(branch.resolve()),
        None => VNode::Empty,
    }
}

fn normalized(node: VNode) -> VNode {
    let mut flat = normalize_node(node);
    match flat.len() {
        0 => VNode::Empty,
        1 => flat.remove(0),
        _ => VNode::Fragment(flat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::el;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn first_matching_branch_wins() {
        let chosen = guard(
            vec![
                (Cond::value(false), Branch::node("no")),
                (Cond::lazy(|| true), Branch::lazy(|| "yep")),
                (Cond::value(true), Branch::node("shadowed")),
            ],
            None,
        );
        assert!(matches!(chosen, VNode::Text(ref t) if t == "yep"));
    }

    #[test]
    fn fallback_applies_when_nothing_matches() {
        let chosen = guard(Vec::new(), Some(Branch::lazy(|| "fallback")));
        assert!(matches!(chosen, VNode::Text(ref t) if t == "fallback"));

        let none = guard(vec![(Cond::value(false), Branch::node("no"))], None);
        assert!(matches!(none, VNode::Empty));
    }

    #[test]
    fn untaken_branches_are_not_evaluated() {
        let evaluations = Arc::new(AtomicUsize::new(0));

        let counted = evaluations.clone();
        let chosen = guard(
            vec![
                (
                    Cond::value(true),
                    Branch::node("taken"),
                ),
                (
                    Cond::value(false),
                    Branch::lazy(move || {
                        counted.fetch_add(1, Ordering::SeqCst);
                        "expensive"
                    }),
                ),
            ],
            None,
        );

        assert!(matches!(chosen, VNode::Text(ref t) if t == "taken"));
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn chosen_branch_is_normalized() {
        let chosen = guard(
            vec![(
                Cond::value(true),
                Branch::lazy(|| {
                    VNode::Fragment(vec![
                        el("span").child("first").into(),
                        VNode::Empty,
                        VNode::Fragment(vec![el("span").child("second").into()]),
                    ])
                }),
            )],
            None,
        );

        let VNode::Fragment(children) = chosen else {
            panic!("expected a flattened fragment");
        };
        assert_eq!(children.len(), 2);
    }
}
