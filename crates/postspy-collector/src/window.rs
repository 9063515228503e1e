//! Per-channel window controller: decides KEEP / SKIP / STOP for each message
//! on a newest-first stream and computes how many messages to request.

use chrono::NaiveDateTime;
use postspy_core::{BoundaryPolicy, TimeWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// At or after the window's upper bound.
    TooNew,
    /// Before the lower bound under [`BoundaryPolicy::Skip`].
    TooOld,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Before the lower bound under [`BoundaryPolicy::Stop`].
    BeforeWindow,
    /// The per-channel limit was already met.
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Skip(SkipReason),
    Stop(StopReason),
}

/// Page-budget knobs. The budget is a safety net against runaway traversals,
/// not a correctness bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBudget {
    /// Requested messages per wanted record when a count limit is set.
    pub oversample: usize,
    pub count_ceiling: usize,
    /// Budget when a lower bound exists and the boundary policy is STOP.
    pub stop_ceiling: usize,
    /// Budget when a lower bound exists under SKIP and no count limit is set.
    pub window_ceiling: usize,
    /// Budget with neither a lower bound nor a count limit.
    pub unbounded_ceiling: usize,
}

impl Default for PageBudget {
    fn default() -> Self {
        Self {
            oversample: 3,
            count_ceiling: 1000,
            stop_ceiling: 5000,
            window_ceiling: 1000,
            unbounded_ceiling: 500,
        }
    }
}

/// Stateful per-channel controller. Create one per channel traversal.
#[derive(Debug, Clone)]
pub struct WindowController {
    window: TimeWindow,
    policy: BoundaryPolicy,
    limit: Option<usize>,
    collected: usize,
}

impl WindowController {
    #[must_use]
    pub fn new(window: TimeWindow, policy: BoundaryPolicy, limit: Option<usize>) -> Self {
        Self {
            window,
            policy,
            limit: limit.filter(|l| *l > 0),
            collected: 0,
        }
    }

    /// Classify a message timestamp against the window and the running count.
    #[must_use]
    pub fn decide(&self, t: NaiveDateTime) -> Decision {
        if self.limit_reached() {
            return Decision::Stop(StopReason::LimitReached);
        }
        if self.window.is_at_or_after_end(t) {
            return Decision::Skip(SkipReason::TooNew);
        }
        if self.window.is_before_start(t) {
            return match self.policy {
                BoundaryPolicy::Stop => Decision::Stop(StopReason::BeforeWindow),
                BoundaryPolicy::Skip => Decision::Skip(SkipReason::TooOld),
            };
        }
        Decision::Keep
    }

    /// Count one message that survived filtering and extraction.
    pub fn record_accepted(&mut self) {
        self.collected += 1;
    }

    #[must_use]
    pub fn collected(&self) -> usize {
        self.collected
    }

    #[must_use]
    pub fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|l| self.collected >= l)
    }

    /// How many messages to ask the feed for.
    #[must_use]
    pub fn page_budget(&self, budget: &PageBudget) -> usize {
        let has_lower_bound = self.window.start.is_some();
        if has_lower_bound && self.policy == BoundaryPolicy::Stop {
            budget.stop_ceiling
        } else if let Some(limit) = self.limit {
            limit
                .saturating_mul(budget.oversample)
                .min(budget.count_ceiling)
                .max(limit)
        } else if has_lower_bound {
            budget.window_ceiling
        } else {
            budget.unbounded_ceiling
        }
    }
}
