//! # contract: collaborator interfaces consumed by the orchestrator
//!
//! Every external service the pipeline talks to is a narrow async trait here: three optimizers
//! (viral analysis, thumbnails, ads), two distribution services (multi-platform poster,
//! scheduler) and the ledger store. The orchestrator only ever holds `Arc<dyn Trait>`, so real
//! HTTP clients, cached wrappers and test doubles substitute freely.
//!
//! ## Mocking & Testing
//! - Each trait is annotated for `mockall`; the mocks are exported under the
//!   `test-export-mocks` feature so downstream crates can use them in their own tests.
//!
//! ## Error contract
//! - Collaborators return [`CollaboratorError`] (a boxed error). The orchestrator treats any
//!   collaborator error as an isolated failure of that one call.
//! - The ledger returns [`LedgerError`]; a ledger error inside the pipeline is fatal for the run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mockall::automock;

use crate::error::{CollaboratorError, LedgerError};
use crate::model::{
    ContentStatus, GeneratedAd, GeneratedThumbnail, MediaKind, OptimizationHistory,
    OrchestrationRun, Platform, PlatformAdaptation, UnifiedContent, ViralAnalysis,
};

/// Input for the viral optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViralRequest {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration_secs: Option<u32>,
    /// First requested target platform.
    pub platform: Platform,
    pub content_kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailRequest {
    pub title: String,
    pub niche: String,
    pub style: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdRequest {
    /// The content title, pitched as the product.
    pub product: String,
    pub audience: String,
    pub goal: String,
    pub description: Option<String>,
    pub tone: Option<String>,
}

/// One posting request. The orchestrator sends one request per platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRequest {
    pub platforms: Vec<Platform>,
    pub content_kind: MediaKind,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub media_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPostOutcome {
    pub platform: Platform,
    pub success: bool,
    #[serde(default)]
    pub platform_post_id: Option<String>,
    #[serde(default)]
    pub platform_post_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub platforms: Vec<Platform>,
    pub scheduled_for: DateTime<Utc>,
    pub timezone: String,
    pub content: ScheduledContent,
}

/// The content payload handed to the scheduler: everything it needs to post later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledContent {
    pub content_id: String,
    pub content_kind: MediaKind,
    pub adaptations: Vec<PlatformAdaptation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReceipt {
    pub schedule_id: String,
    pub scheduled_for: DateTime<Utc>,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ViralOptimizer: Send + Sync {
    /// Score the content for virality and suggest an optimized title, description and tags.
    async fn analyze(&self, req: ViralRequest) -> Result<ViralAnalysis, CollaboratorError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(&self, req: ThumbnailRequest)
        -> Result<GeneratedThumbnail, CollaboratorError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AdGenerator: Send + Sync {
    async fn generate(&self, req: AdRequest) -> Result<GeneratedAd, CollaboratorError>;
}

/// Posts content to one or more platforms, reporting an outcome per platform.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MultiPlatformPoster: Send + Sync {
    async fn post(&self, req: PostRequest) -> Result<Vec<PlatformPostOutcome>, CollaboratorError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule(&self, req: ScheduleRequest) -> Result<ScheduleReceipt, CollaboratorError>;
}

/// Durable storage for content, runs, adaptations and optimization history.
///
/// All arguments and return values are typed; an implementor may serialize nested structures
/// however it likes, but must hand them back deserialized.
///
/// Read accessors return `Ok(None)` / an empty `Vec` for unknown ids.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Stores new content together with its first run. Either both rows land or neither does.
    async fn insert_submission(
        &self,
        content: &UnifiedContent,
        run: &OrchestrationRun,
    ) -> Result<(), LedgerError>;

    /// Stores a follow-up run and points its content at it, back in `optimizing`, as one step.
    async fn start_rerun(&self, run: &OrchestrationRun) -> Result<(), LedgerError>;

    async fn insert_adaptations(
        &self,
        run_id: &str,
        adaptations: &[PlatformAdaptation],
    ) -> Result<(), LedgerError>;

    async fn insert_history(&self, history: &OptimizationHistory) -> Result<(), LedgerError>;

    /// Stores the settled run and the content status as one atomic step.
    ///
    /// Fails with [`LedgerError::Conflict`] if the stored run is no longer `running`.
    async fn finalize_run(
        &self,
        run: &OrchestrationRun,
        content_status: ContentStatus,
    ) -> Result<(), LedgerError>;

    async fn get_content(&self, content_id: &str) -> Result<Option<UnifiedContent>, LedgerError>;

    async fn get_run(&self, run_id: &str) -> Result<Option<OrchestrationRun>, LedgerError>;

    /// All content for an owner, oldest first.
    async fn list_content_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<UnifiedContent>, LedgerError>;

    async fn list_runs_for_content(
        &self,
        content_id: &str,
    ) -> Result<Vec<OrchestrationRun>, LedgerError>;

    async fn list_adaptations(&self, run_id: &str)
        -> Result<Vec<PlatformAdaptation>, LedgerError>;

    async fn get_history(&self, run_id: &str) -> Result<Option<OptimizationHistory>, LedgerError>;

    /// Runs still `running` that started before `started_before`.
    async fn list_running_since(
        &self,
        started_before: DateTime<Utc>,
    ) -> Result<Vec<OrchestrationRun>, LedgerError>;
}
