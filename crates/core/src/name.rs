use compact_str::CompactString;
use core::fmt;
use std::collections::HashMap;

/// Namespace of GML 3.2 (`gml:id`, time primitives, geometries).
pub const GML_NS: &str = "http://www.opengis.net/gml/3.2";

/// Namespace-qualified name with the prefix already resolved by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub ns_uri: Option<CompactString>,
    pub local: CompactString,
}

impl QName {
    pub fn new(ns_uri: impl Into<CompactString>, local: impl Into<CompactString>) -> Self {
        Self { ns_uri: Some(ns_uri.into()), local: local.into() }
    }

    pub fn local(local: impl Into<CompactString>) -> Self {
        Self { ns_uri: None, local: local.into() }
    }

    pub fn gml(local: impl Into<CompactString>) -> Self {
        Self::new(GML_NS, local)
    }

    /// Name test used by property paths. A test without namespace matches on the
    /// local part only; a qualified test requires both parts to be equal.
    pub fn matches(&self, candidate: &QName) -> bool {
        self.local == candidate.local
            && (self.ns_uri.is_none() || self.ns_uri == candidate.ns_uri)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl From<&str> for QName {
    fn from(local: &str) -> Self {
        QName::local(local)
    }
}

/// Prefix to namespace URI bindings used when parsing property paths.
#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    prefixes: HashMap<CompactString, CompactString>,
}

impl NamespaceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prefix: impl Into<CompactString>, uri: impl Into<CompactString>) -> Self {
        self.bind(prefix, uri);
        self
    }

    pub fn bind(&mut self, prefix: impl Into<CompactString>, uri: impl Into<CompactString>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(CompactString::as_str)
    }
}
