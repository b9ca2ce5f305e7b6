//! # ledger: the run & content ledger
//!
//! [`JsonLedger`] is the bundled [`LedgerStore`]. It keeps rows in memory and, when opened on a
//! path, rewrites a JSON snapshot of every table after each successful write.
//!
//! Rows are the storage representation: nested structures (tags, platform sets, optimization
//! summaries, asset lists, adaptation maps, metadata bags) are JSON text columns. This module is
//! the only place that encodes or decodes them; everything crossing the [`LedgerStore`] boundary
//! is typed.
//!
//! Every write is applied to a copy of the tables, persisted, and only then swapped in, so a
//! failed write (including a failed snapshot) leaves the ledger unchanged. Content and its first run
//! are inserted together, a re-run's run row and the content relink land together, and
//! `finalize_run` updates the run and its content status in that single step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::contract::LedgerStore;
use crate::error::{FailureKind, LedgerError};
use crate::model::{
    ContentStatus, MediaKind, OptimizationHistory, OrchestrationRun, PlatformAdaptation,
    PublishStrategy, RunStatus, UnifiedContent,
};

fn to_text<T: Serialize + ?Sized>(value: &T) -> Result<String, LedgerError> {
    Ok(serde_json::to_string(value)?)
}

fn from_text<T: DeserializeOwned>(text: &str) -> Result<T, LedgerError> {
    Ok(serde_json::from_str(text)?)
}

fn opt_to_text<T: Serialize>(value: &Option<T>) -> Result<Option<String>, LedgerError> {
    value.as_ref().map(to_text).transpose()
}

fn opt_from_text<T: DeserializeOwned>(text: &Option<String>) -> Result<Option<T>, LedgerError> {
    text.as_deref().map(from_text).transpose()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentRow {
    seq: u64,
    id: String,
    owner_id: String,
    title: String,
    description: Option<String>,
    media_url: Option<String>,
    media_kind: Option<MediaKind>,
    duration_secs: Option<u32>,
    tags: String,
    category: Option<String>,
    niche: Option<String>,
    target_platforms: String,
    publish_strategy: PublishStrategy,
    scheduled_for: Option<DateTime<Utc>>,
    timezone: Option<String>,
    optimization: String,
    status: ContentStatus,
    orchestration_run_id: String,
    created_at: DateTime<Utc>,
}

impl ContentRow {
    fn encode(seq: u64, c: &UnifiedContent) -> Result<Self, LedgerError> {
        Ok(ContentRow {
            seq,
            id: c.id.clone(),
            owner_id: c.owner_id.clone(),
            title: c.title.clone(),
            description: c.description.clone(),
            media_url: c.media_url.clone(),
            media_kind: c.media_kind,
            duration_secs: c.duration_secs,
            tags: to_text(&c.tags)?,
            category: c.category.clone(),
            niche: c.niche.clone(),
            target_platforms: to_text(&c.target_platforms)?,
            publish_strategy: c.publish_strategy,
            scheduled_for: c.scheduled_for,
            timezone: c.timezone.clone(),
            optimization: to_text(&c.optimization)?,
            status: c.status,
            orchestration_run_id: c.orchestration_run_id.clone(),
            created_at: c.created_at,
        })
    }

    fn decode(&self) -> Result<UnifiedContent, LedgerError> {
        Ok(UnifiedContent {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            media_url: self.media_url.clone(),
            media_kind: self.media_kind,
            duration_secs: self.duration_secs,
            tags: from_text(&self.tags)?,
            category: self.category.clone(),
            niche: self.niche.clone(),
            target_platforms: from_text(&self.target_platforms)?,
            publish_strategy: self.publish_strategy,
            scheduled_for: self.scheduled_for,
            timezone: self.timezone.clone(),
            optimization: from_text(&self.optimization)?,
            status: self.status,
            orchestration_run_id: self.orchestration_run_id.clone(),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunRow {
    id: String,
    content_id: String,
    owner_id: String,
    status: RunStatus,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    duration_ms: Option<u64>,
    viral_analysis_id: Option<String>,
    thumbnail_analysis_id: Option<String>,
    ad_analysis_id: Option<String>,
    optimization_summary: Option<String>,
    generated_assets: Option<String>,
    platform_adaptations: Option<String>,
    distribution: Option<String>,
    error: Option<String>,
    failure_kind: Option<FailureKind>,
}

impl RunRow {
    fn encode(r: &OrchestrationRun) -> Result<Self, LedgerError> {
        Ok(RunRow {
            id: r.id.clone(),
            content_id: r.content_id.clone(),
            owner_id: r.owner_id.clone(),
            status: r.status,
            started_at: r.started_at,
            completed_at: r.completed_at,
            duration_ms: r.duration_ms,
            viral_analysis_id: r.viral_analysis_id.clone(),
            thumbnail_analysis_id: r.thumbnail_analysis_id.clone(),
            ad_analysis_id: r.ad_analysis_id.clone(),
            optimization_summary: opt_to_text(&r.optimization_summary)?,
            generated_assets: opt_to_text(&r.generated_assets)?,
            platform_adaptations: opt_to_text(&r.platform_adaptations)?,
            distribution: opt_to_text(&r.distribution)?,
            error: r.error.clone(),
            failure_kind: r.failure_kind,
        })
    }

    fn decode(&self) -> Result<OrchestrationRun, LedgerError> {
        Ok(OrchestrationRun {
            id: self.id.clone(),
            content_id: self.content_id.clone(),
            owner_id: self.owner_id.clone(),
            status: self.status,
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration_ms: self.duration_ms,
            viral_analysis_id: self.viral_analysis_id.clone(),
            thumbnail_analysis_id: self.thumbnail_analysis_id.clone(),
            ad_analysis_id: self.ad_analysis_id.clone(),
            optimization_summary: opt_from_text(&self.optimization_summary)?,
            generated_assets: opt_from_text(&self.generated_assets)?,
            platform_adaptations: opt_from_text(&self.platform_adaptations)?,
            distribution: opt_from_text(&self.distribution)?,
            error: self.error.clone(),
            failure_kind: self.failure_kind,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AdaptationRow {
    platform: String,
    title: String,
    description: Option<String>,
    caption: Option<String>,
    hashtags: String,
    media_url: Option<String>,
    thumbnail_url: Option<String>,
    metadata: String,
}

impl AdaptationRow {
    fn encode(a: &PlatformAdaptation) -> Result<Self, LedgerError> {
        Ok(AdaptationRow {
            platform: a.platform.to_string(),
            title: a.title.clone(),
            description: a.description.clone(),
            caption: a.caption.clone(),
            hashtags: to_text(&a.hashtags)?,
            media_url: a.media_url.clone(),
            thumbnail_url: a.thumbnail_url.clone(),
            metadata: to_text(&a.metadata)?,
        })
    }

    fn decode(&self) -> Result<PlatformAdaptation, LedgerError> {
        Ok(PlatformAdaptation {
            platform: self.platform.as_str().into(),
            title: self.title.clone(),
            description: self.description.clone(),
            caption: self.caption.clone(),
            hashtags: from_text(&self.hashtags)?,
            media_url: self.media_url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            metadata: from_text(&self.metadata)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryRow {
    run_id: String,
    content_id: String,
    original_title: String,
    original_description: Option<String>,
    original_tags: String,
    optimized_title: String,
    optimized_description: Option<String>,
    optimized_tags: String,
    change_summary: String,
    improvement_score: f64,
    created_at: DateTime<Utc>,
}

impl HistoryRow {
    fn encode(h: &OptimizationHistory) -> Result<Self, LedgerError> {
        Ok(HistoryRow {
            run_id: h.run_id.clone(),
            content_id: h.content_id.clone(),
            original_title: h.original_title.clone(),
            original_description: h.original_description.clone(),
            original_tags: to_text(&h.original_tags)?,
            optimized_title: h.optimized_title.clone(),
            optimized_description: h.optimized_description.clone(),
            optimized_tags: to_text(&h.optimized_tags)?,
            change_summary: h.change_summary.clone(),
            improvement_score: h.improvement_score,
            created_at: h.created_at,
        })
    }

    fn decode(&self) -> Result<OptimizationHistory, LedgerError> {
        Ok(OptimizationHistory {
            run_id: self.run_id.clone(),
            content_id: self.content_id.clone(),
            original_title: self.original_title.clone(),
            original_description: self.original_description.clone(),
            original_tags: from_text(&self.original_tags)?,
            optimized_title: self.optimized_title.clone(),
            optimized_description: self.optimized_description.clone(),
            optimized_tags: from_text(&self.optimized_tags)?,
            change_summary: self.change_summary.clone(),
            improvement_score: self.improvement_score,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    next_seq: u64,
    contents: BTreeMap<String, ContentRow>,
    runs: BTreeMap<String, RunRow>,
    adaptations: BTreeMap<String, Vec<AdaptationRow>>,
    histories: BTreeMap<String, HistoryRow>,
}

/// In-memory ledger with an optional JSON snapshot file.
pub struct JsonLedger {
    tables: Mutex<Tables>,
    snapshot: Option<PathBuf>,
}

impl JsonLedger {
    pub fn in_memory() -> Self {
        JsonLedger {
            tables: Mutex::new(Tables::default()),
            snapshot: None,
        }
    }

    /// Opens a ledger backed by a snapshot file, loading it if it exists.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let tables: Tables = from_text(&text)?;
                info!(
                    path = %path.display(),
                    contents = tables.contents.len(),
                    runs = tables.runs.len(),
                    "[LEDGER] loaded snapshot"
                );
                tables
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "[LEDGER] no snapshot yet; starting empty");
                Tables::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(JsonLedger {
            tables: Mutex::new(tables),
            snapshot: Some(path),
        })
    }

    async fn persist(&self, tables: &Tables) -> Result<(), LedgerError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(tables)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "[LEDGER] snapshot written");
        Ok(())
    }

    /// Applies `change` to a copy of the tables, persists it, then swaps it in.
    async fn write<F>(&self, change: F) -> Result<(), LedgerError>
    where
        F: FnOnce(&mut Tables) -> Result<(), LedgerError> + Send,
    {
        let mut tables = self.tables.lock().await;
        let mut next = tables.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *tables = next;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for JsonLedger {
    async fn insert_submission(
        &self,
        content: &UnifiedContent,
        run: &OrchestrationRun,
    ) -> Result<(), LedgerError> {
        self.write(|t| {
            if run.content_id != content.id {
                return Err(LedgerError::Conflict(format!(
                    "run {} belongs to content {}, not {}",
                    run.id, run.content_id, content.id
                )));
            }
            if t.contents.contains_key(&content.id) {
                return Err(LedgerError::Conflict(format!(
                    "content {} already exists",
                    content.id
                )));
            }
            if t.runs.contains_key(&run.id) {
                return Err(LedgerError::Conflict(format!("run {} already exists", run.id)));
            }
            let content_row = ContentRow::encode(t.next_seq, content)?;
            let run_row = RunRow::encode(run)?;
            t.next_seq += 1;
            t.contents.insert(content.id.clone(), content_row);
            t.runs.insert(run.id.clone(), run_row);
            Ok(())
        })
        .await
    }

    async fn start_rerun(&self, run: &OrchestrationRun) -> Result<(), LedgerError> {
        self.write(|t| {
            if t.runs.contains_key(&run.id) {
                return Err(LedgerError::Conflict(format!("run {} already exists", run.id)));
            }
            let run_row = RunRow::encode(run)?;
            let content = t
                .contents
                .get_mut(&run.content_id)
                .ok_or_else(|| LedgerError::NotFound(format!("content {}", run.content_id)))?;
            content.status = ContentStatus::Optimizing;
            content.orchestration_run_id = run.id.clone();
            t.runs.insert(run.id.clone(), run_row);
            Ok(())
        })
        .await
    }

    async fn insert_adaptations(
        &self,
        run_id: &str,
        adaptations: &[PlatformAdaptation],
    ) -> Result<(), LedgerError> {
        self.write(|t| {
            if !t.runs.contains_key(run_id) {
                return Err(LedgerError::NotFound(format!("run {run_id}")));
            }
            if t.adaptations.contains_key(run_id) {
                return Err(LedgerError::Conflict(format!(
                    "adaptations for run {run_id} already recorded"
                )));
            }
            let rows = adaptations
                .iter()
                .map(AdaptationRow::encode)
                .collect::<Result<Vec<_>, _>>()?;
            t.adaptations.insert(run_id.to_string(), rows);
            Ok(())
        })
        .await
    }

    async fn insert_history(&self, history: &OptimizationHistory) -> Result<(), LedgerError> {
        self.write(|t| {
            if t.histories.contains_key(&history.run_id) {
                return Err(LedgerError::Conflict(format!(
                    "history for run {} already recorded",
                    history.run_id
                )));
            }
            t.histories
                .insert(history.run_id.clone(), HistoryRow::encode(history)?);
            Ok(())
        })
        .await
    }

    async fn finalize_run(
        &self,
        run: &OrchestrationRun,
        content_status: ContentStatus,
    ) -> Result<(), LedgerError> {
        self.write(|t| {
            match t.runs.get(&run.id) {
                None => return Err(LedgerError::NotFound(format!("run {}", run.id))),
                Some(stored) if stored.status != RunStatus::Running => {
                    return Err(LedgerError::Conflict(format!(
                        "run {} already finalized as {:?}",
                        run.id, stored.status
                    )))
                }
                Some(_) => {}
            }
            let row = RunRow::encode(run)?;
            let content = t
                .contents
                .get_mut(&run.content_id)
                .ok_or_else(|| LedgerError::NotFound(format!("content {}", run.content_id)))?;
            content.status = content_status;
            t.runs.insert(run.id.clone(), row);
            Ok(())
        })
        .await?;
        info!(
            run_id = %run.id,
            run_status = ?run.status,
            content_status = ?content_status,
            "[LEDGER] run finalized"
        );
        Ok(())
    }

    async fn get_content(&self, content_id: &str) -> Result<Option<UnifiedContent>, LedgerError> {
        let tables = self.tables.lock().await;
        tables.contents.get(content_id).map(ContentRow::decode).transpose()
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<OrchestrationRun>, LedgerError> {
        let tables = self.tables.lock().await;
        tables.runs.get(run_id).map(RunRow::decode).transpose()
    }

    async fn list_content_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<UnifiedContent>, LedgerError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<&ContentRow> = tables
            .contents
            .values()
            .filter(|r| r.owner_id == owner_id)
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.seq));
        rows.into_iter().map(ContentRow::decode).collect()
    }

    async fn list_runs_for_content(
        &self,
        content_id: &str,
    ) -> Result<Vec<OrchestrationRun>, LedgerError> {
        let tables = self.tables.lock().await;
        let mut runs = tables
            .runs
            .values()
            .filter(|r| r.content_id == content_id)
            .map(RunRow::decode)
            .collect::<Result<Vec<_>, _>>()?;
        runs.sort_by_key(|r| r.started_at);
        Ok(runs)
    }

    async fn list_adaptations(
        &self,
        run_id: &str,
    ) -> Result<Vec<PlatformAdaptation>, LedgerError> {
        let tables = self.tables.lock().await;
        match tables.adaptations.get(run_id) {
            Some(rows) => rows.iter().map(AdaptationRow::decode).collect(),
            None => Ok(Vec::new()),
        }
    }

    async fn get_history(&self, run_id: &str) -> Result<Option<OptimizationHistory>, LedgerError> {
        let tables = self.tables.lock().await;
        tables.histories.get(run_id).map(HistoryRow::decode).transpose()
    }

    async fn list_running_since(
        &self,
        started_before: DateTime<Utc>,
    ) -> Result<Vec<OrchestrationRun>, LedgerError> {
        let tables = self.tables.lock().await;
        tables
            .runs
            .values()
            .filter(|r| r.status == RunStatus::Running && r.started_at < started_before)
            .map(RunRow::decode)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        GeneratedAssets, OptimizationFlags, OptimizationResults, Platform, ViralAnalysis,
    };
    use chrono::Duration;

    fn content(id: &str, owner: &str, created_at: DateTime<Utc>) -> UnifiedContent {
        UnifiedContent {
            id: id.into(),
            owner_id: owner.into(),
            title: format!("Title {id}"),
            description: None,
            media_url: None,
            media_kind: None,
            duration_secs: None,
            tags: vec!["a".into(), "b".into()],
            category: None,
            niche: None,
            target_platforms: vec![Platform::YouTube, Platform::from("mastodon")],
            publish_strategy: PublishStrategy::Draft,
            scheduled_for: None,
            timezone: None,
            optimization: OptimizationFlags::default(),
            status: ContentStatus::Optimizing,
            orchestration_run_id: format!("run-{id}"),
            created_at,
        }
    }

    fn completed(run: OrchestrationRun) -> OrchestrationRun {
        let results = OptimizationResults {
            viral: Some(ViralAnalysis {
                analysis_id: "v-9".into(),
                score: 77.0,
                hooks: vec!["Wait for it".into()],
                optimized_title: "Better".into(),
                optimized_description: None,
                optimized_tags: vec![],
                recommendations: vec![],
            }),
            thumbnail: None,
            ad: None,
        };
        let now = run.started_at + Duration::seconds(2);
        run.complete(&results, GeneratedAssets::default(), BTreeMap::new(), None, now)
    }

    async fn submit(
        ledger: &JsonLedger,
        id: &str,
        owner: &str,
        at: DateTime<Utc>,
    ) -> OrchestrationRun {
        let c = content(id, owner, at);
        let run = OrchestrationRun::start(c.orchestration_run_id.clone(), c.id.clone(), owner.into(), at);
        ledger.insert_submission(&c, &run).await.unwrap();
        run
    }

    #[tokio::test]
    async fn unknown_ids_read_as_absent() {
        let ledger = JsonLedger::in_memory();
        assert!(ledger.get_content("nope").await.unwrap().is_none());
        assert!(ledger.get_run("nope").await.unwrap().is_none());
        assert!(ledger.list_content_for_owner("nobody").await.unwrap().is_empty());
        assert!(ledger.list_adaptations("nope").await.unwrap().is_empty());
        assert!(ledger.get_history("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn owner_listing_is_ordered_by_creation_time() {
        let ledger = JsonLedger::in_memory();
        let t0 = Utc::now();
        submit(&ledger, "late", "o1", t0 + Duration::seconds(10)).await;
        submit(&ledger, "early", "o1", t0).await;
        submit(&ledger, "other", "o2", t0).await;

        let listed = ledger.list_content_for_owner("o1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(listed[0].target_platforms[1], Platform::Other("mastodon".into()));
    }

    #[tokio::test]
    async fn finalize_is_atomic_and_only_once() {
        let ledger = JsonLedger::in_memory();
        let t0 = Utc::now();
        let run = submit(&ledger, "c1", "o1", t0).await;

        let done = completed(run.clone());
        ledger.finalize_run(&done, ContentStatus::Ready).await.unwrap();

        let stored = ledger.get_run("run-c1").await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Completed);
        assert_eq!(stored.optimization_summary.unwrap().viral_score, Some(77.0));
        assert_eq!(stored.viral_analysis_id.as_deref(), Some("v-9"));
        let content = ledger.get_content("c1").await.unwrap().unwrap();
        assert_eq!(content.status, ContentStatus::Ready);

        let again = run.fail(FailureKind::Pipeline, "late failure".into(), Utc::now());
        let err = ledger
            .finalize_run(&again, ContentStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        let content = ledger.get_content("c1").await.unwrap().unwrap();
        assert_eq!(content.status, ContentStatus::Ready);
    }

    #[tokio::test]
    async fn adaptations_are_write_once() {
        let ledger = JsonLedger::in_memory();
        let t0 = Utc::now();
        let run = submit(&ledger, "c1", "o1", t0).await;

        let adaptation = PlatformAdaptation {
            platform: Platform::TikTok,
            title: "t".into(),
            description: None,
            caption: Some("t #a".into()),
            hashtags: vec!["#a".into()],
            media_url: None,
            thumbnail_url: None,
            metadata: BTreeMap::from([("title_truncated".to_string(), serde_json::Value::Bool(false))]),
        };
        ledger.insert_adaptations(&run.id, &[adaptation.clone()]).await.unwrap();
        assert_eq!(ledger.list_adaptations(&run.id).await.unwrap(), vec![adaptation.clone()]);
        assert!(matches!(
            ledger.insert_adaptations(&run.id, &[adaptation]).await,
            Err(LedgerError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let t0 = Utc::now();
        {
            let ledger = JsonLedger::open(&path).await.unwrap();
            let run = submit(&ledger, "c1", "o1", t0).await;
            ledger
                .finalize_run(&completed(run), ContentStatus::Published)
                .await
                .unwrap();
        }

        let reopened = JsonLedger::open(&path).await.unwrap();
        let c = reopened.get_content("c1").await.unwrap().unwrap();
        assert_eq!(c.status, ContentStatus::Published);
        assert_eq!(c.tags, vec!["a".to_string(), "b".to_string()]);
        let run = reopened.get_run("run-c1").await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.platform_adaptations, Some(BTreeMap::new()));
    }

    #[tokio::test]
    async fn stale_running_runs_are_listed() {
        let ledger = JsonLedger::in_memory();
        let t0 = Utc::now() - Duration::hours(3);
        submit(&ledger, "c1", "o1", t0).await;

        let stale = ledger
            .list_running_since(Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert!(ledger
            .list_running_since(t0 - Duration::hours(1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn rejected_submission_writes_neither_row() {
        let ledger = JsonLedger::in_memory();
        let t0 = Utc::now();
        let first = submit(&ledger, "c1", "o1", t0).await;

        // Fresh content, but its run id collides with an existing run.
        let c2 = content("c2", "o1", t0);
        let clash = OrchestrationRun::start(first.id.clone(), "c2".into(), "o1".into(), t0);
        let err = ledger.insert_submission(&c2, &clash).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert!(ledger.get_content("c2").await.unwrap().is_none());
        assert_eq!(ledger.list_content_for_owner("o1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rerun_start_relinks_content_in_one_step() {
        let ledger = JsonLedger::in_memory();
        let t0 = Utc::now();
        let first = submit(&ledger, "c1", "o1", t0).await;
        ledger
            .finalize_run(&completed(first), ContentStatus::Ready)
            .await
            .unwrap();

        let second = OrchestrationRun::start("run-c1-b".into(), "c1".into(), "o1".into(), Utc::now());
        ledger.start_rerun(&second).await.unwrap();
        let c = ledger.get_content("c1").await.unwrap().unwrap();
        assert_eq!(c.status, ContentStatus::Optimizing);
        assert_eq!(c.orchestration_run_id, "run-c1-b");
        assert_eq!(ledger.list_runs_for_content("c1").await.unwrap().len(), 2);

        let orphan = OrchestrationRun::start("run-x".into(), "missing".into(), "o1".into(), t0);
        assert!(matches!(
            ledger.start_rerun(&orphan).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(ledger.get_run("run-x").await.unwrap().is_none());
    }
}
