//! Property extraction: resolving a [`PropertyPath`] against a node.

use geofes_core::{
    ElementContent, NodeRef, PropertyPath, PropertyValue, QName, Step, TypedNode, TypedValue,
};
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq)]
pub enum Match<'g> {
    Value(TypedValue),
    /// A nilled property, with its `nilReason` if any.
    Nil { reason: Option<String> },
    Node(NodeRef<'g>),
}

/// Matches of one path. Most properties are single-valued.
pub type Matches<'g> = SmallVec<[Match<'g>; 1]>;

/// Locates property values for the evaluator.
///
/// Returned nodes must belong to the same graph as `target`.
pub trait PropertyExtractor {
    fn extract<'g>(&self, target: NodeRef<'g>, path: &PropertyPath) -> Matches<'g>;
}

/// Extractor over the [`geofes_core::NodeGraph`] model.
///
/// Steps select feature properties by name, feature collection members by
/// feature type name and generic element children by element name (or by type
/// name when the child is a feature). Resolved references are followed, unresolved
/// references yield nothing. A final attribute step reads element attributes and
/// `gml:id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphExtractor;

impl PropertyExtractor for GraphExtractor {
    fn extract<'g>(&self, target: NodeRef<'g>, path: &PropertyPath) -> Matches<'g> {
        let Some(start) = target.resolve() else {
            return Matches::new();
        };
        let mut current: Matches<'g> = smallvec::smallvec![Match::Node(start)];
        for step in &path.steps {
            let mut next = Matches::new();
            for m in current {
                if let Match::Node(node) = m {
                    select_step(node, step, &mut next);
                }
            }
            current = next;
        }
        match &path.attribute {
            None => current,
            Some(attr) => current
                .into_iter()
                .filter_map(|m| match m {
                    Match::Node(node) => attribute(node, attr).map(Match::Value),
                    _ => None,
                })
                .collect(),
        }
    }
}

fn select_step<'g>(node: NodeRef<'g>, step: &Step, out: &mut Matches<'g>) {
    let mut found: Matches<'g> = Matches::new();
    match node.node() {
        TypedNode::Feature(f) => {
            for p in f.properties.iter().filter(|p| step.name.matches(&p.name)) {
                match &p.value {
                    PropertyValue::Value(v) => found.push(Match::Value(v.clone())),
                    PropertyValue::Nil { reason } => found.push(Match::Nil { reason: reason.clone() }),
                    PropertyValue::Node(id) => {
                        if let Some(target) = node.at(*id).resolve() {
                            found.push(Match::Node(target));
                        }
                    }
                }
            }
        }
        TypedNode::FeatureCollection(c) => {
            for member in c.members.iter().filter_map(|id| node.at(*id).resolve()) {
                if element_name(member).is_some_and(|name| step.name.matches(name)) {
                    found.push(Match::Node(member));
                }
            }
        }
        TypedNode::Element(e) => {
            for child in &e.children {
                let ElementContent::Node(id) = child else { continue };
                if let Some(child) = node.at(*id).resolve()
                    && element_name(child).is_some_and(|name| step.name.matches(name))
                {
                    found.push(Match::Node(child));
                }
            }
        }
        TypedNode::Geometry(_) | TypedNode::Time(_) | TypedNode::Reference(_) => {}
    }

    match step.index {
        None => out.extend(found),
        Some(i) => out.extend(found.into_iter().nth(i.get() - 1)),
    }
}

fn element_name(node: NodeRef<'_>) -> Option<&QName> {
    match node.node() {
        TypedNode::Feature(f) => Some(&f.type_name),
        TypedNode::Element(e) => Some(&e.name),
        _ => None,
    }
}

fn attribute(node: NodeRef<'_>, name: &QName) -> Option<TypedValue> {
    if name.matches(&QName::gml("id"))
        && let Some(id) = node.gml_id()
    {
        return Some(TypedValue::text(id));
    }
    match node.node() {
        TypedNode::Element(e) => e.attributes.iter().find(|(n, _)| name.matches(n)).map(|(_, v)| v.clone()),
        _ => None,
    }
}
