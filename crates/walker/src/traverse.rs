//! Depth-first, pre-order traversal of a node graph.
//!
//! Every node is visited at most once per [`Walker`], keyed by [`NodeId`], so the
//! walk terminates on cyclic graphs and visits shared subgraphs once. References
//! are reported to [`Visitor::visit_reference`] and then replaced by their target;
//! a reference itself is never marked visited. Children are visited in document
//! order.

use std::collections::HashSet;

use geofes_core::{Feature, Geometry, NodeId, NodeRef, Reference, TypedNode};
use tracing::trace;

/// Callbacks of a traversal. Each returns whether to descend into the node.
pub trait Visitor {
    fn visit_feature(&mut self, _id: NodeId, _feature: &Feature) -> bool {
        true
    }

    fn visit_geometry(&mut self, _id: NodeId, _geometry: &Geometry) -> bool {
        true
    }

    /// Feature collections, time objects and generic elements.
    fn visit_object(&mut self, _id: NodeId, _node: &TypedNode) -> bool {
        true
    }

    /// Returning false leaves the reference unfollowed.
    fn visit_reference(&mut self, _id: NodeId, _reference: &Reference) -> bool {
        true
    }
}

/// Traversal state that can span several roots of the same graph.
#[derive(Debug, Default)]
pub struct Walker {
    visited: HashSet<NodeId>,
}

impl Walker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn walk(&mut self, root: NodeRef<'_>, visitor: &mut dyn Visitor) {
        let mut stack: Vec<NodeRef<'_>> = vec![root];
        while let Some(node) = stack.pop() {
            let id = node.id();
            let node = match node.node() {
                TypedNode::Reference(r) => {
                    if !visitor.visit_reference(id, r) {
                        continue;
                    }
                    match node.resolve() {
                        Some(target) => target,
                        None => {
                            trace!(href = %r.href, "reference not followed: unresolved");
                            continue;
                        }
                    }
                }
                _ => node,
            };
            let id = node.id();
            if !self.visited.insert(id) {
                trace!(node = %id, "already visited");
                continue;
            }

            let typed = node.node();
            let descend = match typed {
                TypedNode::Feature(f) => visitor.visit_feature(id, f),
                TypedNode::Geometry(g) => visitor.visit_geometry(id, g),
                TypedNode::FeatureCollection(_) | TypedNode::Time(_) | TypedNode::Element(_) => {
                    visitor.visit_object(id, typed)
                }
                TypedNode::Reference(_) => unreachable!("references are resolved before dispatch"),
            };
            if descend {
                for child in typed.child_ids().into_iter().rev() {
                    stack.push(node.at(child));
                }
            }
        }
    }

    pub fn visited(&self, id: NodeId) -> bool {
        self.visited.contains(&id)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Walk the graph reachable from `root`.
pub fn traverse(root: NodeRef<'_>, visitor: &mut dyn Visitor) {
    Walker::new().walk(root, visitor);
}

/// Walk several roots with one visited set, so nodes shared between the roots
/// are visited once.
pub fn traverse_roots<'g>(roots: impl IntoIterator<Item = NodeRef<'g>>, visitor: &mut dyn Visitor) {
    let mut walker = Walker::new();
    for root in roots {
        walker.walk(root, visitor);
    }
}
