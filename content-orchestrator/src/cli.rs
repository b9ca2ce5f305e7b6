/// # content-orchestrator CLI
///
/// Command parsing and glue around [`content_orchestrator_core`]: every subcommand loads the YAML
/// config, wires HTTP collaborators and a [`JsonLedger`] into an [`Orchestrator`], performs one
/// operation and prints the outcome as pretty JSON on stdout. Logs go to stderr.
///
/// For programmatic or integration use, call [`run`] with a constructed [`Cli`].
use crate::client::HttpCollaborators;
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use content_orchestrator_core::contract::LedgerStore;
use content_orchestrator_core::model::{ContentStatus, OrchestrationInput};
use content_orchestrator_core::{JsonLedger, Orchestrator};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// CLI for content-orchestrator: optimize, adapt and distribute content across platforms.
#[derive(Parser)]
#[clap(
    name = "content-orchestrator",
    version,
    about = "Optimize, adapt and distribute one piece of content to many platforms"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline for a submission read from a YAML file
    Orchestrate {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Path to the YAML submission
        #[clap(long)]
        input: PathBuf,
    },
    /// Re-run the pipeline for stored content under a new run
    Rerun {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        content_id: String,
    },
    /// Print a stored content item
    ShowContent {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        id: String,
    },
    /// Print a stored orchestration run
    ShowRun {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        id: String,
    },
    /// List an owner's content, oldest first
    ListContent {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        owner: String,
    },
    /// Fail runs that have been running for longer than the given number of seconds
    Sweep {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        stale_after_secs: u64,
    },
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Orchestrate { config, input } => {
            let orchestrator = build_orchestrator(&config).await?;
            let submission = load_submission(&input)?;
            tracing::info!(command = "orchestrate", owner_id = %submission.owner_id, "Starting orchestration");
            let result = orchestrator
                .orchestrate(submission)
                .await
                .context("Orchestration was rejected")?;
            if result.status == ContentStatus::Failed {
                tracing::warn!(command = "orchestrate", run_id = %result.run_id, error = ?result.error, "Run failed");
            }
            print_json(&result)
        }
        Commands::Rerun { config, content_id } => {
            let orchestrator = build_orchestrator(&config).await?;
            tracing::info!(command = "rerun", %content_id, "Re-running orchestration");
            match orchestrator
                .rerun(&content_id)
                .await
                .context("Re-run was rejected")?
            {
                Some(result) => print_json(&result),
                None => not_found(),
            }
        }
        Commands::ShowContent { config, id } => {
            let orchestrator = build_orchestrator(&config).await?;
            match orchestrator.get_content(&id).await? {
                Some(content) => print_json(&content),
                None => not_found(),
            }
        }
        Commands::ShowRun { config, id } => {
            let orchestrator = build_orchestrator(&config).await?;
            match orchestrator.get_run(&id).await? {
                Some(run) => print_json(&run),
                None => not_found(),
            }
        }
        Commands::ListContent { config, owner } => {
            let orchestrator = build_orchestrator(&config).await?;
            let contents = orchestrator.list_content_for_owner(&owner).await?;
            print_json(&contents)
        }
        Commands::Sweep {
            config,
            stale_after_secs,
        } => {
            let orchestrator = build_orchestrator(&config).await?;
            let swept = orchestrator
                .sweep_stale_runs(Duration::from_secs(stale_after_secs))
                .await?;
            tracing::info!(command = "sweep", swept = swept.len(), "Sweep complete");
            print_json(&swept)
        }
    }
}

async fn build_orchestrator(config_path: &Path) -> Result<Orchestrator> {
    let config = load_config(config_path)?;

    let ledger: Arc<dyn LedgerStore> = match &config.ledger.path {
        Some(path) => Arc::new(
            JsonLedger::open(path)
                .await
                .with_context(|| format!("Failed to open ledger at {path:?}"))?,
        ),
        None => {
            tracing::warn!("No ledger path configured; records will not outlive this process");
            Arc::new(JsonLedger::in_memory())
        }
    };

    let collaborators = HttpCollaborators::new(config.collaborators, config.api_key)
        .map_err(|e| anyhow::anyhow!("Failed to build collaborator clients: {e}"))?
        .into_collaborators();

    Ok(Orchestrator::new(collaborators, ledger, config.orchestrator))
}

fn load_submission(path: &Path) -> Result<OrchestrationInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read submission file {path:?}"))?;
    serde_yaml::from_str(&text).with_context(|| format!("Failed to parse submission YAML {path:?}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn not_found() -> Result<()> {
    println!("not found");
    Ok(())
}
