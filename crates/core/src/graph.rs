//! Arena-backed GML object graph.
//!
//! Nodes are addressed by [`NodeId`], an index into the owning [`NodeGraph`].
//! Identity is the index, not the content: two structurally equal features are
//! distinct nodes. Containment edges (collection members, property values,
//! geometry parts, element children) form a DAG; back-references are expressed
//! with [`Reference`] nodes that the builder resolves to their local target.
//!
//! A graph is built once with [`GraphBuilder`] and read-only afterwards.

use compact_str::CompactString;
use core::fmt;
use std::collections::HashMap;
use tracing::debug;

use crate::name::QName;
use crate::time::TimePrimitive;
use crate::value::TypedValue;

/// Value of a `gml:id` attribute.
pub type GmlId = CompactString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedNode {
    FeatureCollection(FeatureCollection),
    Feature(Feature),
    Geometry(Geometry),
    Time(TimeObject),
    Reference(Reference),
    Element(GenericElement),
}

impl TypedNode {
    pub fn gml_id(&self) -> Option<&str> {
        match self {
            TypedNode::FeatureCollection(c) => c.id.as_deref(),
            TypedNode::Feature(f) => f.id.as_deref(),
            TypedNode::Geometry(g) => g.id.as_deref(),
            TypedNode::Time(t) => t.id.as_deref(),
            TypedNode::Element(e) => e.id.as_deref(),
            TypedNode::Reference(_) => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypedNode::FeatureCollection(_) => "FeatureCollection",
            TypedNode::Feature(_) => "Feature",
            TypedNode::Geometry(_) => "Geometry",
            TypedNode::Time(_) => "TimeObject",
            TypedNode::Reference(_) => "Reference",
            TypedNode::Element(_) => "GenericElement",
        }
    }

    /// Ids this node links to, in document order: collection members, property
    /// values, geometry parts (exterior before interiors), element children and
    /// the target of a resolved reference.
    pub fn child_ids(&self) -> Vec<NodeId> {
        match self {
            TypedNode::FeatureCollection(c) => c.members.clone(),
            TypedNode::Feature(f) => f
                .properties
                .iter()
                .filter_map(|p| match p.value {
                    PropertyValue::Node(id) => Some(id),
                    _ => None,
                })
                .collect(),
            TypedNode::Geometry(g) => g.parts.node_ids().collect(),
            TypedNode::Time(_) => Vec::new(),
            TypedNode::Reference(r) => r.target.into_iter().collect(),
            TypedNode::Element(e) => e
                .children
                .iter()
                .filter_map(|c| match c {
                    ElementContent::Node(id) => Some(*id),
                    ElementContent::Text(_) => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub id: Option<GmlId>,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<GmlId>,
    pub type_name: QName,
    pub properties: Vec<Property>,
}

impl Feature {
    pub fn new(type_name: impl Into<QName>) -> Self {
        Self { id: None, type_name: type_name.into(), properties: Vec::new() }
    }

    pub fn with_id(mut self, id: impl Into<GmlId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn property(mut self, name: impl Into<QName>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(Property { name: name.into(), value: value.into() });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: QName,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Value(TypedValue),
    Node(NodeId),
    /// `xsi:nil="true"` with an optional `nilReason`.
    Nil { reason: Option<String> },
}

impl From<TypedValue> for PropertyValue {
    fn from(v: TypedValue) -> Self {
        PropertyValue::Value(v)
    }
}

impl From<NodeId> for PropertyValue {
    fn from(id: NodeId) -> Self {
        PropertyValue::Node(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    LinearRing,
    Curve,
    Polygon,
    Surface,
    Solid,
    CompositeCurve,
    CompositeSurface,
    CompositeSolid,
    GeometricComplex,
    MultiPoint,
    MultiCurve,
    MultiSurface,
    MultiSolid,
    MultiGeometry,
}

impl GeometryKind {
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            GeometryKind::MultiPoint
                | GeometryKind::MultiCurve
                | GeometryKind::MultiSurface
                | GeometryKind::MultiSolid
                | GeometryKind::MultiGeometry
        )
    }

    pub fn is_composite(self) -> bool {
        matches!(
            self,
            GeometryKind::CompositeCurve
                | GeometryKind::CompositeSurface
                | GeometryKind::CompositeSolid
                | GeometryKind::GeometricComplex
        )
    }
}

/// Sub-structure of a geometry that is itself made of geometry nodes.
/// Coordinates are not part of the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GeometryParts {
    #[default]
    Leaf,
    /// Polygon rings or solid shells: exterior first, then interiors.
    Boundary { exterior: Option<NodeId>, interiors: Vec<NodeId> },
    /// Members of composite and multi geometries.
    Members(Vec<NodeId>),
}

impl GeometryParts {
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        let (head, tail): (Option<NodeId>, &[NodeId]) = match self {
            GeometryParts::Leaf => (None, &[]),
            GeometryParts::Boundary { exterior, interiors } => (*exterior, interiors),
            GeometryParts::Members(members) => (None, members),
        };
        head.into_iter().chain(tail.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub id: Option<GmlId>,
    pub kind: GeometryKind,
    pub srs_name: Option<String>,
    pub parts: GeometryParts,
}

impl Geometry {
    pub fn leaf(kind: GeometryKind) -> Self {
        Self { id: None, kind, srs_name: None, parts: GeometryParts::Leaf }
    }

    pub fn polygon(exterior: NodeId, interiors: Vec<NodeId>) -> Self {
        Self {
            id: None,
            kind: GeometryKind::Polygon,
            srs_name: None,
            parts: GeometryParts::Boundary { exterior: Some(exterior), interiors },
        }
    }

    pub fn aggregate(kind: GeometryKind, members: Vec<NodeId>) -> Self {
        Self { id: None, kind, srs_name: None, parts: GeometryParts::Members(members) }
    }

    pub fn with_id(mut self, id: impl Into<GmlId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_srs(mut self, srs: impl Into<String>) -> Self {
        self.srs_name = Some(srs.into());
        self
    }
}

/// `gml:TimeInstant` / `gml:TimePeriod` object.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeObject {
    pub id: Option<GmlId>,
    pub primitive: TimePrimitive,
}

/// `xlink:href` reference. `target` is `None` while unresolved (remote or
/// dangling hrefs stay unresolved).
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub href: CompactString,
    pub target: Option<NodeId>,
}

impl Reference {
    pub fn new(href: impl Into<CompactString>) -> Self {
        Self { href: href.into(), target: None }
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }

    /// The local id named by the href: `#id` or a bare id. Hrefs pointing into
    /// another document have none.
    pub fn local_id(&self) -> Option<&str> {
        if let Some(fragment) = self.href.strip_prefix('#') {
            return Some(fragment);
        }
        if self.href.contains(['#', '/', ':']) { None } else { Some(&self.href) }
    }
}

/// Content of an element the schema does not map to a feature or geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericElement {
    pub id: Option<GmlId>,
    pub name: QName,
    pub attributes: Vec<(QName, TypedValue)>,
    pub children: Vec<ElementContent>,
}

impl GenericElement {
    pub fn new(name: impl Into<QName>) -> Self {
        Self { id: None, name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    pub fn with_id(mut self, id: impl Into<GmlId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<QName>, value: TypedValue) -> Self {
        self.attributes.push((name.into(), value));
        self
    }

    pub fn text(mut self, value: TypedValue) -> Self {
        self.children.push(ElementContent::Text(value));
        self
    }

    pub fn child(mut self, id: NodeId) -> Self {
        self.children.push(ElementContent::Node(id));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    Text(TypedValue),
    Node(NodeId),
}

macro_rules! impl_into_node {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for TypedNode {
            fn from(n: $ty) -> Self {
                TypedNode::$variant(n)
            }
        })*
    };
}

impl_into_node!(
    FeatureCollection => FeatureCollection,
    Feature => Feature,
    Geometry => Geometry,
    TimeObject => Time,
    Reference => Reference,
    GenericElement => Element,
);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node {owner} links to {target}, which is not part of the graph")]
    DanglingNode { owner: NodeId, target: NodeId },
}

/// Immutable node arena plus the `gml:id` index.
#[derive(Debug, Default)]
pub struct NodeGraph {
    nodes: Vec<TypedNode>,
    ids: HashMap<GmlId, NodeId>,
}

impl NodeGraph {
    /// Node stored under `id`.
    ///
    /// # Panics
    /// When `id` was not issued for this graph. Ids only come from the builder of
    /// this graph, so a miss is a broken invariant upstream.
    pub fn node(&self, id: NodeId) -> &TypedNode {
        match self.nodes.get(id.index()) {
            Some(node) => node,
            None => panic!("node id {id} is not part of this graph ({} nodes)", self.nodes.len()),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&TypedNode> {
        self.nodes.get(id.index())
    }

    pub fn node_ref(&self, id: NodeId) -> NodeRef<'_> {
        // validate eagerly so a bad id fails where it was introduced
        let _ = self.node(id);
        NodeRef { graph: self, id }
    }

    /// First node carrying the given `gml:id`.
    pub fn by_gml_id(&self, id: &str) -> Option<NodeRef<'_>> {
        self.ids.get(id).map(|&id| NodeRef { graph: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (0..self.nodes.len()).map(move |i| NodeRef { graph: self, id: NodeId(index_u32(i)) })
    }
}

fn index_u32(i: usize) -> u32 {
    match u32::try_from(i) {
        Ok(v) => v,
        Err(_) => panic!("node graph exceeds {} nodes", u32::MAX),
    }
}

/// Borrowed handle on a node of a graph.
#[derive(Clone, Copy)]
pub struct NodeRef<'g> {
    graph: &'g NodeGraph,
    id: NodeId,
}

impl<'g> NodeRef<'g> {
    pub fn id(self) -> NodeId {
        self.id
    }

    pub fn graph(self) -> &'g NodeGraph {
        self.graph
    }

    pub fn node(self) -> &'g TypedNode {
        self.graph.node(self.id)
    }

    pub fn gml_id(self) -> Option<&'g str> {
        self.node().gml_id()
    }

    /// Handle on another node of the same graph.
    pub fn at(self, id: NodeId) -> NodeRef<'g> {
        self.graph.node_ref(id)
    }

    /// Follow resolved references until a non-reference node is reached.
    /// Returns `None` for unresolved references and reference loops.
    pub fn resolve(self) -> Option<NodeRef<'g>> {
        let mut current = self;
        for _ in 0..=self.graph.len() {
            match current.node() {
                TypedNode::Reference(r) => current = current.at(r.target?),
                _ => return Some(current),
            }
        }
        None
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.graph, other.graph) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.node().kind_name())
            .field("gml_id", &self.gml_id())
            .finish()
    }
}

/// Collects nodes, then resolves local references on [`GraphBuilder::build`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<TypedNode>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: impl Into<TypedNode>) -> NodeId {
        let id = NodeId(index_u32(self.nodes.len()));
        self.nodes.push(node.into());
        id
    }

    /// Shorthand for adding an unresolved reference node.
    pub fn reference(&mut self, href: impl Into<CompactString>) -> NodeId {
        self.add(Reference::new(href))
    }

    /// Validates every link, indexes `gml:id`s (the first occurrence wins) and
    /// resolves references whose href names a local id.
    pub fn build(mut self) -> Result<NodeGraph, GraphError> {
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(target) = node.child_ids().into_iter().find(|t| t.index() >= len) {
                return Err(GraphError::DanglingNode { owner: NodeId(index_u32(i)), target });
            }
        }

        let mut ids: HashMap<GmlId, NodeId> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(gml_id) = node.gml_id() {
                ids.entry(GmlId::from(gml_id)).or_insert(NodeId(index_u32(i)));
            }
        }

        let mut unresolved = 0usize;
        for node in &mut self.nodes {
            if let TypedNode::Reference(r) = node
                && r.target.is_none()
            {
                r.target = r.local_id().and_then(|local| ids.get(local).copied());
                if r.target.is_none() {
                    unresolved += 1;
                    debug!(href = %r.href, "reference left unresolved");
                }
            }
        }
        debug!(nodes = len, ids = ids.len(), unresolved, "built node graph");

        Ok(NodeGraph { nodes: self.nodes, ids })
    }
}
