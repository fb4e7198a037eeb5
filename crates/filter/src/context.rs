use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

use crate::bridge::CompareOptions;
use crate::temporal::TimeAnchor;

/// What a comparison does when its operands cannot be bridged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueErrorPolicy {
    /// Surface the [`geofes_core::ValueError`] to the caller.
    #[default]
    Propagate,
    /// Treat the comparison as not matching.
    FailClosed,
}

#[derive(Debug, Clone)]
pub struct EvalContext {
    pub implicit_timezone: FixedOffset,
    /// Fixed instant for the indeterminate position `now`; the wall clock when unset.
    pub now: Option<DateTime<FixedOffset>>,
    pub value_errors: ValueErrorPolicy,
    /// Compiled `PropertyIsLike` patterns kept per evaluator.
    pub like_cache_capacity: usize,
}

pub const DEFAULT_LIKE_CACHE_CAPACITY: usize = 64;

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            implicit_timezone: Utc.fix(),
            now: None,
            value_errors: ValueErrorPolicy::default(),
            like_cache_capacity: DEFAULT_LIKE_CACHE_CAPACITY,
        }
    }
}

impl EvalContext {
    pub(crate) fn compare_options(&self, match_case: bool) -> CompareOptions {
        CompareOptions { match_case, implicit_timezone: self.implicit_timezone }
    }

    pub(crate) fn time_anchor(&self) -> TimeAnchor {
        let now = self.now.unwrap_or_else(|| Local::now().fixed_offset());
        TimeAnchor { implicit_timezone: self.implicit_timezone, now }
    }
}

#[derive(Debug, Default)]
pub struct EvalContextBuilder {
    ctx: EvalContext,
}

impl EvalContextBuilder {
    pub fn new() -> Self {
        Self { ctx: EvalContext::default() }
    }

    /// Fix the instant used for `now`, for deterministic evaluation.
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.ctx.now = Some(now);
        self
    }

    /// Implicit timezone as an offset from UTC in minutes. Out-of-range offsets
    /// are ignored.
    pub fn with_timezone(mut self, offset_minutes: i32) -> Self {
        if let Some(tz) = offset_minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            self.ctx.implicit_timezone = tz;
        }
        self
    }

    pub fn with_value_errors(mut self, policy: ValueErrorPolicy) -> Self {
        self.ctx.value_errors = policy;
        self
    }

    pub fn with_like_cache_capacity(mut self, capacity: usize) -> Self {
        self.ctx.like_cache_capacity = capacity;
        self
    }

    pub fn build(self) -> EvalContext {
        self.ctx
    }
}
