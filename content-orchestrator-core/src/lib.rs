#![doc = "content-orchestrator-core: the content orchestration pipeline."]

//! One submission goes in; the pipeline fans out to optimizer services, aggregates the generated
//! assets, adapts the content to each target platform, records optimization history and routes
//! distribution (immediate, scheduled or draft), keeping a ledger of every run.
//!
//! External services are traits in [`contract`]; the host wires concrete implementations into an
//! [`orchestrator::Orchestrator`].
//!
//! # Usage
//! Add this as a dependency for the pipeline, its data model and the bundled [`ledger::JsonLedger`].

pub mod adapt;
pub mod assets;
pub mod config;
pub mod contract;
pub mod distribute;
pub mod error;
pub mod history;
pub mod ledger;
pub mod model;
pub mod optimize;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::{FailureKind, LedgerError, OrchestrationError, ValidationError};
pub use ledger::JsonLedger;
pub use orchestrator::{Collaborators, Orchestrator};
