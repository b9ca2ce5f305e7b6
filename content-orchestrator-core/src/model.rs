//! Data model: submissions, runs, adaptations and optimization history.
//!
//! Everything here is plain typed data. Nested structures (summaries, asset lists, adaptation
//! sets) stay typed in memory; only the ledger turns them into text.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, ValidationError};

/// A destination platform. Unknown identifiers are kept verbatim as [`Platform::Other`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    YouTube,
    TikTok,
    Instagram,
    Twitter,
    Facebook,
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Other(id) => id.as_str(),
        }
    }
}

impl From<&str> for Platform {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Platform::YouTube,
            "tiktok" => Platform::TikTok,
            "instagram" => Platform::Instagram,
            "twitter" | "x" => Platform::Twitter,
            "facebook" => Platform::Facebook,
            other => Platform::Other(other.to_string()),
        }
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        Platform::from(s.as_str())
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Audio,
    Text,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStrategy {
    Immediate,
    Scheduled,
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    None,
    #[default]
    Basic,
    Aggressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptimizationFlags {
    #[serde(default)]
    pub level: OptimizationLevel,
    #[serde(default)]
    pub generate_thumbnail: bool,
    #[serde(default)]
    pub generate_ad: bool,
    #[serde(default)]
    pub run_viral_analysis: bool,
}

/// Lifecycle of a [`UnifiedContent`] item.
///
/// `optimizing → { ready | scheduled | published | failed }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Optimizing,
    Ready,
    Scheduled,
    Published,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// A submission as handed to the orchestrator by the host application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationInput {
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_kind: Option<MediaKind>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub niche: Option<String>,
    pub target_platforms: Vec<Platform>,
    pub publish_strategy: PublishStrategy,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub optimization: OptimizationFlags,
}

impl OrchestrationInput {
    /// Checks the submission preconditions against the given clock.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.target_platforms.is_empty() {
            return Err(ValidationError::NoTargetPlatforms);
        }
        let mut seen = std::collections::BTreeSet::new();
        for platform in &self.target_platforms {
            if platform.as_str().is_empty() {
                return Err(ValidationError::BlankPlatform);
            }
            if !seen.insert(platform) {
                return Err(ValidationError::DuplicatePlatform(platform.to_string()));
            }
        }
        match (self.publish_strategy, self.scheduled_for) {
            (PublishStrategy::Scheduled, None) => Err(ValidationError::MissingScheduleTime),
            (PublishStrategy::Scheduled, Some(at)) if at <= now => {
                Err(ValidationError::ScheduleInPast(at.to_rfc3339()))
            }
            (PublishStrategy::Scheduled, Some(_)) | (_, None) => Ok(()),
            (_, Some(_)) => Err(ValidationError::UnexpectedScheduleTime),
        }
    }

    /// Media kind used when talking to optimizers and the poster.
    pub fn content_kind(&self) -> MediaKind {
        resolve_kind(self.media_kind, self.media_url.is_some())
    }
}

// Media without a declared kind is treated as video; no media at all is a text post.
fn resolve_kind(declared: Option<MediaKind>, has_media: bool) -> MediaKind {
    declared.unwrap_or(if has_media {
        MediaKind::Video
    } else {
        MediaKind::Text
    })
}

/// The canonical stored submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedContent {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub duration_secs: Option<u32>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub niche: Option<String>,
    pub target_platforms: Vec<Platform>,
    pub publish_strategy: PublishStrategy,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub optimization: OptimizationFlags,
    pub status: ContentStatus,
    pub orchestration_run_id: String,
    pub created_at: DateTime<Utc>,
}

impl UnifiedContent {
    pub fn from_input(
        id: String,
        run_id: String,
        input: OrchestrationInput,
        created_at: DateTime<Utc>,
    ) -> Self {
        UnifiedContent {
            id,
            owner_id: input.owner_id,
            title: input.title,
            description: input.description,
            media_url: input.media_url,
            media_kind: input.media_kind,
            duration_secs: input.duration_secs,
            tags: input.tags,
            category: input.category,
            niche: input.niche,
            target_platforms: input.target_platforms,
            publish_strategy: input.publish_strategy,
            scheduled_for: input.scheduled_for,
            timezone: input.timezone,
            optimization: input.optimization,
            status: ContentStatus::Optimizing,
            orchestration_run_id: run_id,
            created_at,
        }
    }

    /// Rebuilds the submission that produced this content, for re-runs.
    pub fn to_input(&self) -> OrchestrationInput {
        OrchestrationInput {
            owner_id: self.owner_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            media_url: self.media_url.clone(),
            media_kind: self.media_kind,
            duration_secs: self.duration_secs,
            tags: self.tags.clone(),
            category: self.category.clone(),
            niche: self.niche.clone(),
            target_platforms: self.target_platforms.clone(),
            publish_strategy: self.publish_strategy,
            scheduled_for: self.scheduled_for,
            timezone: self.timezone.clone(),
            optimization: self.optimization,
        }
    }

    pub fn content_kind(&self) -> MediaKind {
        resolve_kind(self.media_kind, self.media_url.is_some())
    }
}

/// Result of the viral optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViralAnalysis {
    pub analysis_id: String,
    pub score: f64,
    #[serde(default)]
    pub hooks: Vec<String>,
    pub optimized_title: String,
    #[serde(default)]
    pub optimized_description: Option<String>,
    #[serde(default)]
    pub optimized_tags: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedThumbnail {
    pub analysis_id: String,
    pub image_url: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAd {
    pub analysis_id: String,
    pub image_url: String,
    pub headline: String,
    pub score: f64,
}

/// Outputs of the fan-out stage. Each field is present only if that optimizer ran and succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResults {
    pub viral: Option<ViralAnalysis>,
    pub thumbnail: Option<GeneratedThumbnail>,
    pub ad: Option<GeneratedAd>,
}

/// Compact per-run digest of what the optimizers said.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub viral_score: Option<f64>,
    pub thumbnail_score: Option<f64>,
    pub ad_score: Option<f64>,
    pub hooks: Vec<String>,
    pub recommendations: Vec<String>,
}

impl From<&OptimizationResults> for OptimizationSummary {
    fn from(results: &OptimizationResults) -> Self {
        OptimizationSummary {
            viral_score: results.viral.as_ref().map(|v| v.score),
            thumbnail_score: results.thumbnail.as_ref().map(|t| t.score),
            ad_score: results.ad.as_ref().map(|a| a.score),
            hooks: results
                .viral
                .as_ref()
                .map(|v| v.hooks.clone())
                .unwrap_or_default(),
            recommendations: results
                .viral
                .as_ref()
                .map(|v| v.recommendations.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAssets {
    pub thumbnails: Vec<String>,
    pub ad_creatives: Vec<String>,
    /// Original media reference per target platform.
    pub platform_media: BTreeMap<Platform, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAdaptation {
    pub platform: Platform,
    pub title: String,
    pub description: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Vec<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationHistory {
    pub run_id: String,
    pub content_id: String,
    pub original_title: String,
    pub original_description: Option<String>,
    pub original_tags: Vec<String>,
    pub optimized_title: String,
    pub optimized_description: Option<String>,
    pub optimized_tags: Vec<String>,
    pub change_summary: String,
    pub improvement_score: f64,
    pub created_at: DateTime<Utc>,
}

/// What the distribution router did with the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DistributionResults {
    /// Immediate posting: successes keyed by platform, failures kept apart.
    Published {
        platform_post_ids: BTreeMap<Platform, String>,
        urls: BTreeMap<Platform, String>,
        failures: BTreeMap<Platform, String>,
    },
    Scheduled {
        schedule_id: String,
        scheduled_for: DateTime<Utc>,
    },
    /// The scheduler rejected the request; the content stays `ready`.
    Unscheduled { error: String },
}

/// One execution of the pipeline for a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationRun {
    pub id: String,
    pub content_id: String,
    pub owner_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub viral_analysis_id: Option<String>,
    pub thumbnail_analysis_id: Option<String>,
    pub ad_analysis_id: Option<String>,
    pub optimization_summary: Option<OptimizationSummary>,
    pub generated_assets: Option<GeneratedAssets>,
    pub platform_adaptations: Option<BTreeMap<Platform, PlatformAdaptation>>,
    pub distribution: Option<DistributionResults>,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
}

impl OrchestrationRun {
    pub fn start(id: String, content_id: String, owner_id: String, now: DateTime<Utc>) -> Self {
        OrchestrationRun {
            id,
            content_id,
            owner_id,
            status: RunStatus::Running,
            started_at: now,
            completed_at: None,
            duration_ms: None,
            viral_analysis_id: None,
            thumbnail_analysis_id: None,
            ad_analysis_id: None,
            optimization_summary: None,
            generated_assets: None,
            platform_adaptations: None,
            distribution: None,
            error: None,
            failure_kind: None,
        }
    }

    fn settle(&mut self, status: RunStatus, now: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(now);
        let elapsed = (now - self.started_at).num_milliseconds().max(0);
        self.duration_ms = Some(elapsed as u64);
    }

    /// Marks the run completed with everything the pipeline produced.
    pub fn complete(
        mut self,
        optimization: &OptimizationResults,
        assets: GeneratedAssets,
        adaptations: BTreeMap<Platform, PlatformAdaptation>,
        distribution: Option<DistributionResults>,
        now: DateTime<Utc>,
    ) -> Self {
        self.viral_analysis_id = optimization.viral.as_ref().map(|v| v.analysis_id.clone());
        self.thumbnail_analysis_id = optimization
            .thumbnail
            .as_ref()
            .map(|t| t.analysis_id.clone());
        self.ad_analysis_id = optimization.ad.as_ref().map(|a| a.analysis_id.clone());
        self.optimization_summary = Some(OptimizationSummary::from(optimization));
        self.generated_assets = Some(assets);
        self.platform_adaptations = Some(adaptations);
        self.distribution = distribution;
        self.settle(RunStatus::Completed, now);
        self
    }

    /// Marks the run failed. Partial stage outputs are never attached to a failed run.
    pub fn fail(mut self, kind: FailureKind, error: String, now: DateTime<Utc>) -> Self {
        self.error = Some(error);
        self.failure_kind = Some(kind);
        self.settle(RunStatus::Failed, now);
        self
    }
}

/// What the orchestrator hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub content_id: String,
    pub run_id: String,
    pub status: ContentStatus,
    pub optimization: OptimizationResults,
    pub generated_assets: GeneratedAssets,
    pub platform_adaptations: BTreeMap<Platform, PlatformAdaptation>,
    pub distribution_results: Option<DistributionResults>,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
}

impl OrchestrationResult {
    pub fn failed(content_id: String, run_id: String, kind: FailureKind, error: String) -> Self {
        OrchestrationResult {
            content_id,
            run_id,
            status: ContentStatus::Failed,
            optimization: OptimizationResults::default(),
            generated_assets: GeneratedAssets::default(),
            platform_adaptations: BTreeMap::new(),
            distribution_results: None,
            error: Some(error),
            failure_kind: Some(kind),
        }
    }
}
