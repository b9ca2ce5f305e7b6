//! Distribution router: picks immediate, scheduled or draft handling for adapted content.
//!
//! Router transitions for `UnifiedContent.status`:
//! - `immediate` → `published` once every platform has been attempted
//! - `scheduled` → `scheduled` (or `ready` if the scheduler rejects the request)
//! - `draft`     → `ready`, no collaborator call
//!
//! Distribution failures are isolated. A platform whose post fails is recorded under `failures`
//! and left out of `platform_post_ids`/`urls`; it never fails the run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::config::OrchestratorConfig;
use crate::contract::{
    MultiPlatformPoster, PostRequest, ScheduleRequest, ScheduledContent, Scheduler,
};
use crate::model::{
    ContentStatus, DistributionResults, MediaKind, Platform, PlatformAdaptation, PublishStrategy,
    UnifiedContent,
};

/// The two distribution collaborators.
#[derive(Clone)]
pub struct Distributors {
    pub poster: Arc<dyn MultiPlatformPoster>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Where the router left the content.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedDistribution {
    pub status: ContentStatus,
    pub results: Option<DistributionResults>,
}

struct Posted {
    post_id: String,
    url: Option<String>,
}

fn post_request(adaptation: &PlatformAdaptation, kind: MediaKind) -> PostRequest {
    let caption = adaptation
        .caption
        .clone()
        .unwrap_or_else(|| adaptation.title.clone());
    let media_urls = adaptation
        .media_url
        .iter()
        .chain(adaptation.thumbnail_url.iter())
        .cloned()
        .collect();
    PostRequest {
        platforms: vec![adaptation.platform.clone()],
        content_kind: kind,
        caption,
        hashtags: adaptation.hashtags.clone(),
        media_urls,
    }
}

async fn post_one(
    poster: &dyn MultiPlatformPoster,
    adaptation: &PlatformAdaptation,
    kind: MediaKind,
    timeout: Duration,
) -> (Platform, Result<Posted, String>) {
    let platform = adaptation.platform.clone();
    let req = post_request(adaptation, kind);

    let outcome = match tokio::time::timeout(timeout, poster.post(req)).await {
        Err(_) => Err(format!("post timed out after {}ms", timeout.as_millis())),
        Ok(Err(e)) => Err(e.to_string()),
        Ok(Ok(outcomes)) => match outcomes.into_iter().find(|o| o.platform == platform) {
            None => Err("poster returned no outcome for platform".to_string()),
            Some(o) if !o.success => {
                Err(o.error.unwrap_or_else(|| "post rejected".to_string()))
            }
            Some(o) => match o.platform_post_id {
                Some(post_id) => Ok(Posted {
                    post_id,
                    url: o.platform_post_url,
                }),
                None => Err("poster reported success without a post id".to_string()),
            },
        },
    };

    match &outcome {
        Ok(posted) => {
            info!(platform = %platform, post_id = %posted.post_id, "[DISTRIBUTE] posted")
        }
        Err(e) => warn!(platform = %platform, error = %e, "[DISTRIBUTE] post failed; skipping platform"),
    }
    (platform, outcome)
}

/// Posts every adaptation independently with bounded concurrency.
pub async fn publish_now(
    poster: &dyn MultiPlatformPoster,
    adaptations: &BTreeMap<Platform, PlatformAdaptation>,
    kind: MediaKind,
    config: &OrchestratorConfig,
) -> DistributionResults {
    let timeout = config.distribution_timeout();
    let outcomes: Vec<(Platform, Result<Posted, String>)> = stream::iter(adaptations.values())
        .map(|adaptation| post_one(poster, adaptation, kind, timeout))
        .buffer_unordered(config.max_concurrent_posts.max(1))
        .collect()
        .await;

    let mut platform_post_ids = BTreeMap::new();
    let mut urls = BTreeMap::new();
    let mut failures = BTreeMap::new();
    for (platform, outcome) in outcomes {
        match outcome {
            Ok(posted) => {
                if let Some(url) = posted.url {
                    urls.insert(platform.clone(), url);
                }
                platform_post_ids.insert(platform, posted.post_id);
            }
            Err(e) => {
                failures.insert(platform, e);
            }
        }
    }

    DistributionResults::Published {
        platform_post_ids,
        urls,
        failures,
    }
}

async fn schedule_later(
    scheduler: &dyn Scheduler,
    content: &UnifiedContent,
    adaptations: &BTreeMap<Platform, PlatformAdaptation>,
    config: &OrchestratorConfig,
) -> RoutedDistribution {
    let Some(scheduled_for) = content.scheduled_for else {
        error!(content_id = %content.id, "[DISTRIBUTE] scheduled content has no schedule time");
        return RoutedDistribution {
            status: ContentStatus::Ready,
            results: Some(DistributionResults::Unscheduled {
                error: "missing schedule time".to_string(),
            }),
        };
    };

    let req = ScheduleRequest {
        platforms: content.target_platforms.clone(),
        scheduled_for,
        timezone: content
            .timezone
            .clone()
            .unwrap_or_else(|| config.default_timezone.clone()),
        content: ScheduledContent {
            content_id: content.id.clone(),
            content_kind: content.content_kind(),
            adaptations: adaptations.values().cloned().collect(),
        },
    };

    let timeout = config.distribution_timeout();
    let outcome = match tokio::time::timeout(timeout, scheduler.schedule(req)).await {
        Err(_) => Err(format!("schedule timed out after {}ms", timeout.as_millis())),
        Ok(Err(e)) => Err(e.to_string()),
        Ok(Ok(receipt)) => Ok(receipt),
    };

    match outcome {
        Ok(receipt) => {
            info!(
                content_id = %content.id,
                schedule_id = %receipt.schedule_id,
                scheduled_for = %receipt.scheduled_for,
                "[DISTRIBUTE] scheduled"
            );
            RoutedDistribution {
                status: ContentStatus::Scheduled,
                results: Some(DistributionResults::Scheduled {
                    schedule_id: receipt.schedule_id,
                    scheduled_for: receipt.scheduled_for,
                }),
            }
        }
        Err(e) => {
            warn!(content_id = %content.id, error = %e, "[DISTRIBUTE] scheduling failed; content left ready");
            RoutedDistribution {
                status: ContentStatus::Ready,
                results: Some(DistributionResults::Unscheduled { error: e }),
            }
        }
    }
}

/// Routes adapted content according to its publish strategy.
pub async fn route(
    distributors: &Distributors,
    content: &UnifiedContent,
    adaptations: &BTreeMap<Platform, PlatformAdaptation>,
    config: &OrchestratorConfig,
) -> RoutedDistribution {
    info!(
        content_id = %content.id,
        strategy = ?content.publish_strategy,
        platforms = adaptations.len(),
        "[DISTRIBUTE] routing content"
    );
    match content.publish_strategy {
        PublishStrategy::Draft => RoutedDistribution {
            status: ContentStatus::Ready,
            results: None,
        },
        PublishStrategy::Immediate => {
            let results = publish_now(
                distributors.poster.as_ref(),
                adaptations,
                content.content_kind(),
                config,
            )
            .await;
            RoutedDistribution {
                status: ContentStatus::Published,
                results: Some(results),
            }
        }
        PublishStrategy::Scheduled => {
            schedule_later(distributors.scheduler.as_ref(), content, adaptations, config).await
        }
    }
}
