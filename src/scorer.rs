use tracing::info;

use crate::ownership_checker::OwnershipReport;
use crate::route::Route;
use crate::shared::{OwnershipVerdict, ScorePolicy, DEFAULT_SCORE_INCREMENT};

/// Adds a fixed increment to routes selected by the ownership verdict.
#[derive(Debug, Clone, Copy)]
pub struct LegitimacyScorer {
    pub increment: u32,
    pub policy: ScorePolicy,
}

impl LegitimacyScorer {
    pub fn new(increment: u32, policy: ScorePolicy) -> Self {
        LegitimacyScorer { increment, policy }
    }

    fn rewarded_verdict(&self) -> OwnershipVerdict {
        match self.policy {
            ScorePolicy::RewardUnmatched => OwnershipVerdict::NoMatch,
            ScorePolicy::RewardMatched => OwnershipVerdict::Matched,
        }
    }

    /// Returns the number of routes whose score changed.
    pub fn score(&self, routes: &mut [Route], report: &OwnershipReport) -> usize {
        let rewarded = self.rewarded_verdict();
        let mut scored = 0;

        for route in routes.iter_mut() {
            if report.verdict_for(route) == Some(rewarded) {
                route.reward(self.increment);
                scored += 1;
            }
        }

        info!(
            "Scored {} of {} routes (+{} for {}, policy {})",
            scored,
            routes.len(),
            self.increment,
            rewarded,
            self.policy
        );
        scored
    }
}

impl Default for LegitimacyScorer {
    fn default() -> Self {
        Self::new(DEFAULT_SCORE_INCREMENT, ScorePolicy::default())
    }
}
