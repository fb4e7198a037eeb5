//! Property paths (`ValueReference` in FES 2.0), a restricted XPath subset:
//! child steps with an optional 1-based position predicate and an optional
//! final attribute step.

use core::fmt;
use core::num::NonZeroUsize;
use core::str::FromStr;
use itertools::Itertools;
use pest::Parser;
use pest::iterators::Pair;

use crate::name::{NamespaceBindings, QName};

#[derive(pest_derive::Parser)]
#[grammar = "path.pest"]
struct PathParser;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    pub name: QName,
    /// 1-based position among same-named siblings.
    pub index: Option<NonZeroUsize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    pub steps: Vec<Step>,
    pub attribute: Option<QName>,
}

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("invalid property path: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("namespace prefix '{0}' is not bound")]
    UnboundPrefix(String),
}

impl PropertyPath {
    /// Single unqualified step, the common case of `<ValueReference>name</ValueReference>`.
    pub fn name(local: &str) -> Self {
        Self { steps: vec![Step { name: QName::local(local), index: None }], attribute: None }
    }

    pub fn parse(input: &str, namespaces: &NamespaceBindings) -> Result<Self, PathError> {
        let mut pairs = PathParser::parse(Rule::path, input.trim()).map_err(Box::new)?;
        let Some(root) = pairs.next() else {
            return Ok(Self { steps: Vec::new(), attribute: None });
        };

        let mut steps = Vec::new();
        let mut attribute = None;
        for pair in root.into_inner() {
            match pair.as_rule() {
                Rule::step => {
                    let mut name = None;
                    let mut index = None;
                    for part in pair.into_inner() {
                        match part.as_rule() {
                            Rule::qname => name = Some(build_qname(part, namespaces)?),
                            // grammar guarantees a non-zero digit string; overflow saturates
                            Rule::index => {
                                index = Some(part.as_str().parse().unwrap_or(NonZeroUsize::MAX));
                            }
                            _ => {}
                        }
                    }
                    if let Some(name) = name {
                        steps.push(Step { name, index });
                    }
                }
                Rule::attribute_step => {
                    if let Some(q) = pair.into_inner().next() {
                        attribute = Some(build_qname(q, namespaces)?);
                    }
                }
                _ => {}
            }
        }
        Ok(Self { steps, attribute })
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute.is_some()
    }
}

fn build_qname(pair: Pair<'_, Rule>, namespaces: &NamespaceBindings) -> Result<QName, PathError> {
    let mut prefix = None;
    let mut local = "";
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::prefix => prefix = Some(part.as_str()),
            Rule::local => local = part.as_str(),
            _ => {}
        }
    }
    match prefix {
        None => Ok(QName::local(local)),
        Some(p) => namespaces
            .resolve(p)
            .map(|ns| QName::new(ns, local))
            .ok_or_else(|| PathError::UnboundPrefix(p.to_string())),
    }
}

impl FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, &NamespaceBindings::default())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(i) = self.index {
            write!(f, "[{i}]")?;
        }
        Ok(())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps = self.steps.iter().join("/");
        match &self.attribute {
            Some(attr) if steps.is_empty() => write!(f, "@{attr}"),
            Some(attr) => write!(f, "{steps}/@{attr}"),
            None => f.write_str(&steps),
        }
    }
}
