use geofes_core::ValueError;

use crate::model::ComparisonKind;
use crate::temporal::{NotImplemented, TemporalKind};

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("{0} is not supported for the given operands")]
    Unsupported(ComparisonKind),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("temporal operator {0} is not implemented")]
    TemporalNotImplemented(TemporalKind),
    #[error("invalid like pattern '{pattern}': {reason}")]
    InvalidLikePattern { pattern: String, reason: &'static str },
    #[error("like pattern '{pattern}' failed")]
    Regex {
        pattern: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },
}

impl EvalError {
    /// Conditions a service should report as "operation not implemented" rather
    /// than as an empty result.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, EvalError::Unsupported(_) | EvalError::TemporalNotImplemented(_))
    }
}

impl From<NotImplemented> for EvalError {
    fn from(e: NotImplemented) -> Self {
        EvalError::TemporalNotImplemented(e.0)
    }
}
