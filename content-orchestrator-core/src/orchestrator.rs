//! # orchestrator: the pipeline entry point
//!
//! [`Orchestrator`] wires the stages together for one submission:
//!
//! 1. validate the input and write the content row (`optimizing`) and run row (`running`);
//! 2. fan out to the enabled optimizers ([`crate::optimize`]);
//! 3. aggregate assets ([`crate::assets`]) and adapt per platform ([`crate::adapt`]);
//! 4. record adaptations and, when the viral optimizer answered, the optimization history;
//! 5. route distribution ([`crate::distribute`]);
//! 6. finalize run and content status in one ledger step.
//!
//! Optimizer and distribution failures never fail a run. A ledger error in steps 4-6 or a
//! cancellation does: the run and content end `failed` and the caller gets a failed
//! [`OrchestrationResult`] with no partial stage data. Only a failure to write the initial rows
//! is returned as [`OrchestrationError::Pipeline`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapt::{adapt_all, AdaptationInput};
use crate::assets::aggregate_assets;
use crate::config::OrchestratorConfig;
use crate::contract::{
    AdGenerator, LedgerStore, MultiPlatformPoster, Scheduler, ThumbnailGenerator, ViralOptimizer,
};
use crate::distribute::{route, Distributors, RoutedDistribution};
use crate::error::{FailureKind, LedgerError, OrchestrationError};
use crate::history::build_history;
use crate::model::{
    ContentStatus, GeneratedAssets, OptimizationResults, OrchestrationInput, OrchestrationResult,
    OrchestrationRun, Platform, PlatformAdaptation, RunStatus, UnifiedContent,
};
use crate::optimize::{run_optimizers, FanOutPlan, Optimizers};

/// The five external services a pipeline run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub viral: Arc<dyn ViralOptimizer>,
    pub thumbnails: Arc<dyn ThumbnailGenerator>,
    pub ads: Arc<dyn AdGenerator>,
    pub poster: Arc<dyn MultiPlatformPoster>,
    pub scheduler: Arc<dyn Scheduler>,
}

// Everything the stages produced for a run that made it to distribution.
struct Staged {
    optimization: OptimizationResults,
    assets: GeneratedAssets,
    adaptations: BTreeMap<Platform, PlatformAdaptation>,
    routed: RoutedDistribution,
}

pub struct Orchestrator {
    optimizers: Optimizers,
    distributors: Distributors,
    ledger: Arc<dyn LedgerStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        collaborators: Collaborators,
        ledger: Arc<dyn LedgerStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let Collaborators {
            viral,
            thumbnails,
            ads,
            poster,
            scheduler,
        } = collaborators;
        Orchestrator {
            optimizers: Optimizers {
                viral,
                thumbnails,
                ads,
            },
            distributors: Distributors { poster, scheduler },
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs the whole pipeline for a new submission.
    pub async fn orchestrate(
        &self,
        input: OrchestrationInput,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        self.orchestrate_with_cancellation(input, CancellationToken::new())
            .await
    }

    /// Like [`Orchestrator::orchestrate`], but stops awaiting collaborators once `cancel` fires
    /// and records the run as failed with [`FailureKind::Cancelled`].
    pub async fn orchestrate_with_cancellation(
        &self,
        input: OrchestrationInput,
        cancel: CancellationToken,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let now = Utc::now();
        if let Err(e) = input.validate(now) {
            warn!(owner_id = %input.owner_id, error = %e, "[ORCH] submission rejected");
            return Err(e.into());
        }

        let content_id = Uuid::new_v4().to_string();
        let run_id = Uuid::new_v4().to_string();
        let content = UnifiedContent::from_input(content_id, run_id.clone(), input, now);
        let run = OrchestrationRun::start(
            run_id,
            content.id.clone(),
            content.owner_id.clone(),
            now,
        );

        info!(
            content_id = %content.id,
            run_id = %run.id,
            owner_id = %content.owner_id,
            platforms = content.target_platforms.len(),
            strategy = ?content.publish_strategy,
            "[ORCH] starting orchestration"
        );

        self.ledger
            .insert_submission(&content, &run)
            .await
            .map_err(|e| record_error("content", &content.id, e))?;

        Ok(self.drive(content, run, cancel).await)
    }

    /// Re-executes the pipeline for stored content under a fresh run.
    ///
    /// Returns `Ok(None)` for an unknown content id.
    pub async fn rerun(
        &self,
        content_id: &str,
    ) -> Result<Option<OrchestrationResult>, OrchestrationError> {
        let Some(content) = self.ledger.get_content(content_id).await? else {
            info!(content_id, "[ORCH] rerun requested for unknown content");
            return Ok(None);
        };

        if let Some(current) = self.ledger.get_run(&content.orchestration_run_id).await? {
            if current.status == RunStatus::Running {
                return Err(OrchestrationError::Conflict(format!(
                    "content {} is still being orchestrated by run {}",
                    content.id, current.id
                )));
            }
        }

        let now = Utc::now();
        content.to_input().validate(now)?;

        let run_id = Uuid::new_v4().to_string();
        let run = OrchestrationRun::start(
            run_id.clone(),
            content.id.clone(),
            content.owner_id.clone(),
            now,
        );
        self.ledger
            .start_rerun(&run)
            .await
            .map_err(|e| record_error("run", &run.id, e))?;

        info!(
            content_id = %content.id,
            run_id = %run_id,
            previous_run_id = %content.orchestration_run_id,
            "[ORCH] re-running orchestration"
        );

        let content = UnifiedContent {
            status: ContentStatus::Optimizing,
            orchestration_run_id: run_id,
            ..content
        };
        Ok(Some(self.drive(content, run, CancellationToken::new()).await))
    }

    pub async fn get_content(
        &self,
        content_id: &str,
    ) -> Result<Option<UnifiedContent>, OrchestrationError> {
        Ok(self.ledger.get_content(content_id).await?)
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<OrchestrationRun>, OrchestrationError> {
        Ok(self.ledger.get_run(run_id).await?)
    }

    /// All content for an owner, oldest first.
    pub async fn list_content_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<UnifiedContent>, OrchestrationError> {
        Ok(self.ledger.list_content_for_owner(owner_id).await?)
    }

    pub async fn list_runs_for_content(
        &self,
        content_id: &str,
    ) -> Result<Vec<OrchestrationRun>, OrchestrationError> {
        Ok(self.ledger.list_runs_for_content(content_id).await?)
    }

    /// Fails every run still `running` after `stale_after`, returning their ids.
    ///
    /// A run that settles while the sweep is in progress is skipped.
    pub async fn sweep_stale_runs(
        &self,
        stale_after: Duration,
    ) -> Result<Vec<String>, OrchestrationError> {
        let now = Utc::now();
        let window = chrono::Duration::from_std(stale_after)
            .map_err(|e| OrchestrationError::Pipeline(format!("invalid stale window: {e}")))?;
        let stuck = self.ledger.list_running_since(now - window).await?;
        info!(
            candidates = stuck.len(),
            stale_after_secs = stale_after.as_secs(),
            "[ORCH] sweeping stale runs"
        );

        let mut swept = Vec::with_capacity(stuck.len());
        for run in stuck {
            let run_id = run.id.clone();
            let failed = run.fail(
                FailureKind::Stale,
                format!("run still running after {}s", stale_after.as_secs()),
                now,
            );
            match self.ledger.finalize_run(&failed, ContentStatus::Failed).await {
                Ok(()) => {
                    warn!(run_id = %run_id, content_id = %failed.content_id, "[ORCH] stale run failed");
                    swept.push(run_id);
                }
                Err(LedgerError::Conflict(reason)) => {
                    info!(run_id = %run_id, %reason, "[ORCH] run settled during sweep; skipped");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(swept)
    }

    async fn drive(
        &self,
        content: UnifiedContent,
        run: OrchestrationRun,
        cancel: CancellationToken,
    ) -> OrchestrationResult {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err((FailureKind::Cancelled, "orchestration cancelled".to_string())),
            staged = self.stages(&content, &run.id) => {
                staged.map_err(|e| (FailureKind::Pipeline, e.to_string()))
            }
        };

        match outcome {
            Ok(staged) => self.settle(&content, run, staged).await,
            Err((kind, message)) => self.fail(&content, run, kind, message).await,
        }
    }

    async fn stages(
        &self,
        content: &UnifiedContent,
        run_id: &str,
    ) -> Result<Staged, LedgerError> {
        let plan = FanOutPlan::for_content(content, &self.config);
        let optimization =
            run_optimizers(&self.optimizers, plan, self.config.optimizer_timeout()).await;

        let assets = aggregate_assets(
            &optimization,
            content.media_url.as_deref(),
            &content.target_platforms,
        );
        let adaptation_input = AdaptationInput::resolve(content, &optimization, &assets);
        let adaptations = adapt_all(&content.target_platforms, &adaptation_input);

        let rows: Vec<PlatformAdaptation> = adaptations.values().cloned().collect();
        self.ledger.insert_adaptations(run_id, &rows).await?;

        if let Some(viral) = &optimization.viral {
            let history = build_history(run_id, content, viral, Utc::now());
            self.ledger.insert_history(&history).await?;
        }

        let routed = route(&self.distributors, content, &adaptations, &self.config).await;

        Ok(Staged {
            optimization,
            assets,
            adaptations,
            routed,
        })
    }

    async fn settle(
        &self,
        content: &UnifiedContent,
        run: OrchestrationRun,
        staged: Staged,
    ) -> OrchestrationResult {
        let Staged {
            optimization,
            assets,
            adaptations,
            routed,
        } = staged;

        let completed = run.clone().complete(
            &optimization,
            assets.clone(),
            adaptations.clone(),
            routed.results.clone(),
            Utc::now(),
        );
        if let Err(e) = self.ledger.finalize_run(&completed, routed.status).await {
            error!(run_id = %run.id, error = %e, "[ORCH] could not finalize completed run");
            return self
                .fail(content, run, FailureKind::Pipeline, format!("finalizing run: {e}"))
                .await;
        }

        info!(
            content_id = %content.id,
            run_id = %completed.id,
            status = ?routed.status,
            duration_ms = completed.duration_ms.unwrap_or_default(),
            "[ORCH] orchestration completed"
        );

        OrchestrationResult {
            content_id: content.id.clone(),
            run_id: completed.id,
            status: routed.status,
            optimization,
            generated_assets: assets,
            platform_adaptations: adaptations,
            distribution_results: routed.results,
            error: None,
            failure_kind: None,
        }
    }

    async fn fail(
        &self,
        content: &UnifiedContent,
        run: OrchestrationRun,
        kind: FailureKind,
        message: String,
    ) -> OrchestrationResult {
        error!(
            content_id = %content.id,
            run_id = %run.id,
            failure_kind = %kind,
            error = %message,
            "[ORCH] orchestration failed"
        );
        let failed = run.fail(kind, message.clone(), Utc::now());
        if let Err(e) = self.ledger.finalize_run(&failed, ContentStatus::Failed).await {
            error!(run_id = %failed.id, error = %e, "[ORCH] could not record run failure");
        }
        OrchestrationResult::failed(content.id.clone(), failed.id, kind, message)
    }
}

fn record_error(what: &str, id: &str, e: LedgerError) -> OrchestrationError {
    error!(record = what, id, error = %e, "[ORCH] could not create initial record");
    OrchestrationError::Pipeline(format!("creating {what} {id}: {e}"))
}
