//! Stock visitors.

use compact_str::CompactString;
use std::collections::HashMap;

use geofes_core::{Feature, Geometry, GmlId, NodeId, Reference, TypedNode};
use tracing::warn;

use crate::traverse::Visitor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate gml:id '{id}' on {second}, first used on {first}")]
pub struct DuplicateId {
    pub id: GmlId,
    pub first: NodeId,
    pub second: NodeId,
}

/// Validates `gml:id` uniqueness in traversal order and records references that
/// could not be resolved.
#[derive(Debug, Default)]
pub struct IdChecker {
    seen: HashMap<GmlId, NodeId>,
    duplicates: Vec<DuplicateId>,
    unresolved: Vec<CompactString>,
}

impl IdChecker {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, node: NodeId, gml_id: Option<&str>) {
        let Some(gml_id) = gml_id else { return };
        match self.seen.get(gml_id) {
            Some(&first) => {
                warn!(id = gml_id, %first, second = %node, "duplicate gml:id");
                self.duplicates.push(DuplicateId { id: gml_id.into(), first, second: node });
            }
            None => {
                self.seen.insert(gml_id.into(), node);
            }
        }
    }

    pub fn ids_seen(&self) -> usize {
        self.seen.len()
    }

    pub fn duplicates(&self) -> &[DuplicateId] {
        &self.duplicates
    }

    pub fn unresolved(&self) -> &[CompactString] {
        &self.unresolved
    }

    /// The first duplicate in traversal order, if any.
    pub fn into_result(self) -> Result<(), DuplicateId> {
        match self.duplicates.into_iter().next() {
            Some(dup) => Err(dup),
            None => Ok(()),
        }
    }
}

impl Visitor for IdChecker {
    fn visit_feature(&mut self, id: NodeId, feature: &Feature) -> bool {
        self.record(id, feature.id.as_deref());
        true
    }

    fn visit_geometry(&mut self, id: NodeId, geometry: &Geometry) -> bool {
        self.record(id, geometry.id.as_deref());
        true
    }

    fn visit_object(&mut self, id: NodeId, node: &TypedNode) -> bool {
        self.record(id, node.gml_id());
        true
    }

    fn visit_reference(&mut self, _id: NodeId, reference: &Reference) -> bool {
        if !reference.is_resolved() {
            self.unresolved.push(reference.href.clone());
        }
        true
    }
}

/// Collects features in traversal order.
#[derive(Debug, Default)]
pub struct FeatureCollector {
    pub features: Vec<NodeId>,
}

impl Visitor for FeatureCollector {
    fn visit_feature(&mut self, id: NodeId, _feature: &Feature) -> bool {
        self.features.push(id);
        true
    }
}
