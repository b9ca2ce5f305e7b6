use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::OptimizationLevel;

/// Defaults handed to the thumbnail and ad optimizers for one optimization level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerProfile {
    pub thumbnail_style: String,
    pub ad_audience: String,
    pub ad_goal: String,
    #[serde(default)]
    pub ad_tone: Option<String>,
}

/// Tunables for the orchestration pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on a single optimizer call.
    pub optimizer_timeout_secs: u64,
    /// Upper bound on a single post or schedule call.
    pub distribution_timeout_secs: u64,
    /// How many platform postings may be in flight at once.
    pub max_concurrent_posts: usize,
    /// Niche sent to the thumbnail generator when the content declares none.
    pub default_niche: String,
    /// Timezone sent to the scheduler when the content declares none.
    pub default_timezone: String,
    pub basic: OptimizerProfile,
    pub aggressive: OptimizerProfile,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            optimizer_timeout_secs: 60,
            distribution_timeout_secs: 30,
            max_concurrent_posts: 4,
            default_niche: "general".to_string(),
            default_timezone: "UTC".to_string(),
            basic: OptimizerProfile {
                thumbnail_style: "clean".to_string(),
                ad_audience: "general audience".to_string(),
                ad_goal: "awareness".to_string(),
                ad_tone: Some("friendly".to_string()),
            },
            aggressive: OptimizerProfile {
                thumbnail_style: "bold".to_string(),
                ad_audience: "general audience".to_string(),
                ad_goal: "conversions".to_string(),
                ad_tone: Some("urgent".to_string()),
            },
        }
    }
}

impl OrchestratorConfig {
    pub fn optimizer_timeout(&self) -> Duration {
        Duration::from_secs(self.optimizer_timeout_secs)
    }

    pub fn distribution_timeout(&self) -> Duration {
        Duration::from_secs(self.distribution_timeout_secs)
    }

    /// Profile for the given level. `None` has no profile: no optimizer runs at that level.
    pub fn profile(&self, level: OptimizationLevel) -> Option<&OptimizerProfile> {
        match level {
            OptimizationLevel::None => None,
            OptimizationLevel::Basic => Some(&self.basic),
            OptimizationLevel::Aggressive => Some(&self.aggressive),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            optimizer_timeout_secs = self.optimizer_timeout_secs,
            distribution_timeout_secs = self.distribution_timeout_secs,
            max_concurrent_posts = self.max_concurrent_posts,
            "Loaded OrchestratorConfig"
        );
        debug!(?self, "OrchestratorConfig loaded (full debug)");
    }
}
