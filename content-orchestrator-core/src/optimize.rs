//! Optimization fan-out: runs every enabled optimizer concurrently and joins them all.
//!
//! Each optimizer call sits behind its own failure boundary ([`guarded`]). An error or a timeout
//! is logged and leaves that one field of [`OptimizationResults`] empty; siblings keep running and
//! the stage itself never fails.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::OrchestratorConfig;
use crate::contract::{
    AdGenerator, AdRequest, ThumbnailGenerator, ThumbnailRequest, ViralOptimizer, ViralRequest,
};
use crate::error::CollaboratorError;
use crate::model::{MediaKind, OptimizationResults, UnifiedContent};

/// The three optimizer collaborators.
#[derive(Clone)]
pub struct Optimizers {
    pub viral: Arc<dyn ViralOptimizer>,
    pub thumbnails: Arc<dyn ThumbnailGenerator>,
    pub ads: Arc<dyn AdGenerator>,
}

/// Requests for the optimizers enabled for one content item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutPlan {
    pub viral: Option<ViralRequest>,
    pub thumbnail: Option<ThumbnailRequest>,
    pub ad: Option<AdRequest>,
}

impl FanOutPlan {
    /// Derives the enabled optimizer set from the content's flags and media kind.
    pub fn for_content(content: &UnifiedContent, config: &OrchestratorConfig) -> Self {
        let Some(profile) = config.profile(content.optimization.level) else {
            return FanOutPlan::default();
        };
        let Some(platform) = content.target_platforms.first().cloned() else {
            return FanOutPlan::default();
        };
        let flags = content.optimization;
        let kind = content.content_kind();

        let viral = flags.run_viral_analysis.then(|| ViralRequest {
            title: content.title.clone(),
            description: content.description.clone(),
            tags: content.tags.clone(),
            duration_secs: content.duration_secs,
            platform: platform.clone(),
            content_kind: kind,
        });

        let thumbnail = (flags.generate_thumbnail && kind != MediaKind::Audio).then(|| {
            ThumbnailRequest {
                title: content.title.clone(),
                niche: content
                    .niche
                    .clone()
                    .or_else(|| content.category.clone())
                    .unwrap_or_else(|| config.default_niche.clone()),
                style: profile.thumbnail_style.clone(),
                platform: platform.clone(),
            }
        });

        let ad = flags.generate_ad.then(|| AdRequest {
            product: content.title.clone(),
            audience: profile.ad_audience.clone(),
            goal: profile.ad_goal.clone(),
            description: content.description.clone(),
            tone: profile.ad_tone.clone(),
        });

        FanOutPlan {
            viral,
            thumbnail,
            ad,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.viral.is_none() && self.thumbnail.is_none() && self.ad.is_none()
    }
}

/// Runs a single collaborator call under a timeout, turning every failure into `None`.
pub async fn guarded<T, F>(name: &'static str, timeout: Duration, call: F) -> Option<T>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => {
            info!(optimizer = name, "[FANOUT] optimizer succeeded");
            Some(value)
        }
        Ok(Err(e)) => {
            warn!(optimizer = name, error = %e, "[FANOUT] optimizer failed; continuing without it");
            None
        }
        Err(_) => {
            warn!(
                optimizer = name,
                timeout_ms = timeout.as_millis() as u64,
                "[FANOUT] optimizer timed out; continuing without it"
            );
            None
        }
    }
}

/// Fan out to every optimizer in the plan and wait for all of them to settle.
pub async fn run_optimizers(
    optimizers: &Optimizers,
    plan: FanOutPlan,
    timeout: Duration,
) -> OptimizationResults {
    info!(
        viral = plan.viral.is_some(),
        thumbnail = plan.thumbnail.is_some(),
        ad = plan.ad.is_some(),
        "[FANOUT] starting optimizer fan-out"
    );

    let FanOutPlan {
        viral: viral_req,
        thumbnail: thumbnail_req,
        ad: ad_req,
    } = plan;

    let viral = async move {
        match viral_req {
            Some(req) => guarded("viral", timeout, optimizers.viral.analyze(req)).await,
            None => None,
        }
    };
    let thumbnail = async move {
        match thumbnail_req {
            Some(req) => guarded("thumbnail", timeout, optimizers.thumbnails.generate(req)).await,
            None => None,
        }
    };
    let ad = async move {
        match ad_req {
            Some(req) => guarded("ad", timeout, optimizers.ads.generate(req)).await,
            None => None,
        }
    };

    let (viral, thumbnail, ad) = tokio::join!(viral, thumbnail, ad);
    OptimizationResults {
        viral,
        thumbnail,
        ad,
    }
}
