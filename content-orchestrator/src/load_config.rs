/// `load_config` module: loads the static YAML config and injects secrets from the environment.
///
/// This is the only place where untrusted YAML is parsed into typed structures: the pipeline
/// tunables ([`OrchestratorConfig`]), the collaborator endpoints and the ledger location.
///
/// # Secrets
/// The YAML never carries credentials. The collaborator API key comes from the
/// `COLLABORATOR_API_KEY` environment variable (a `.env` file is honoured via `dotenvy`).
///
/// # Errors
/// Every failure is an `anyhow::Error` with the offending path in the message, surfaced at the
/// CLI boundary.
use anyhow::Result;
use content_orchestrator_core::OrchestratorConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const API_KEY_ENV: &str = "COLLABORATOR_API_KEY";

#[derive(Debug)]
pub struct CliConfig {
    pub orchestrator: OrchestratorConfig,
    pub collaborators: CollaboratorEndpoints,
    pub ledger: LedgerSection,
    /// Injected from [`API_KEY_ENV`]; absent means requests go out unauthenticated.
    pub api_key: Option<String>,
}

/// Base URLs of the five collaborator services. Each receives JSON via `POST`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorEndpoints {
    pub viral_url: String,
    pub thumbnail_url: String,
    pub ad_url: String,
    pub poster_url: String,
    pub scheduler_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    90
}

#[derive(Debug, Default, Deserialize)]
pub struct LedgerSection {
    /// JSON snapshot file. Without one the ledger lives only for this process.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    #[derive(Debug, Deserialize)]
    struct RawConfig {
        #[serde(default)]
        orchestrator: OrchestratorConfig,
        collaborators: CollaboratorEndpoints,
        #[serde(default)]
        ledger: LedgerSection,
    }

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.orchestrator.max_concurrent_posts == 0 {
        warn!("max_concurrent_posts is 0; postings will run one at a time");
    }
    raw.orchestrator.trace_loaded();

    let api_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty());
    info!(api_key_set = api_key.is_some(), "Collaborator credentials resolved");

    Ok(CliConfig {
        orchestrator: raw.orchestrator,
        collaborators: raw.collaborators,
        ledger: raw.ledger,
        api_key,
    })
}
