//! Per-stage time budgets for a quote request.
//!
//! A request runs `Fetch` then `Persist`. Each stage has its own budget and the
//! `DeadlinePolicy` decides which instant that budget is counted from.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_FETCH_BUDGET: Duration = Duration::from_millis(200);
pub const DEFAULT_PERSIST_BUDGET: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Persist,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Stage::Fetch => "fetch",
                Stage::Persist => "persist",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlinePolicy {
    /// Budget counted from the moment the stage starts.
    #[default]
    PerStage,
    /// Budget counted from request arrival for every stage.
    Anchored,
    /// Stage k must finish by arrival + sum of budgets 1..=k.
    Chained,
}

impl FromStr for DeadlinePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_stage" => Ok(DeadlinePolicy::PerStage),
            "anchored" => Ok(DeadlinePolicy::Anchored),
            "chained" => Ok(DeadlinePolicy::Chained),
            _ => Err(anyhow::anyhow!("Invalid deadline policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBudgets {
    pub fetch: Duration,
    pub persist: Duration,
    pub policy: DeadlinePolicy,
}

impl Default for StageBudgets {
    fn default() -> Self {
        StageBudgets {
            fetch: DEFAULT_FETCH_BUDGET,
            persist: DEFAULT_PERSIST_BUDGET,
            policy: DeadlinePolicy::default(),
        }
    }
}

impl StageBudgets {
    pub fn budget(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Fetch => self.fetch,
            Stage::Persist => self.persist,
        }
    }

    /// Absolute deadline for `stage` of a request that arrived at `arrival`
    /// and entered this stage at `stage_start`.
    pub fn deadline(&self, stage: Stage, arrival: Instant, stage_start: Instant) -> Instant {
        match self.policy {
            DeadlinePolicy::PerStage => stage_start + self.budget(stage),
            DeadlinePolicy::Anchored => arrival + self.budget(stage),
            DeadlinePolicy::Chained => match stage {
                Stage::Fetch => arrival + self.fetch,
                Stage::Persist => arrival + self.fetch + self.persist,
            },
        }
    }
}
