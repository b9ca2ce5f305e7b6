#![doc = "HTTP collaborators: the CLI's concrete optimizer, poster and scheduler clients."]
//
//! # Collaborator clients
//!
//! [`HttpCollaborators`] implements every collaborator trait from
//! [`content_orchestrator_core::contract`] by POSTing the request as JSON to the configured
//! endpoint and decoding the JSON response.
//!
//! - A non-success HTTP status is a collaborator error carrying status and body.
//! - When an API key is configured it is sent as a bearer token on every request.
//! - Timeouts here are transport-level; the orchestrator applies its own per-call bounds on top.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use content_orchestrator_core::contract::{
    AdGenerator, AdRequest, MultiPlatformPoster, PlatformPostOutcome, PostRequest,
    ScheduleReceipt, ScheduleRequest, Scheduler, ThumbnailGenerator, ThumbnailRequest,
    ViralOptimizer, ViralRequest,
};
use content_orchestrator_core::error::CollaboratorError;
use content_orchestrator_core::model::{GeneratedAd, GeneratedThumbnail, ViralAnalysis};
use content_orchestrator_core::Collaborators;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::load_config::CollaboratorEndpoints;

pub struct HttpCollaborators {
    http: reqwest::Client,
    endpoints: CollaboratorEndpoints,
    api_key: Option<String>,
}

impl HttpCollaborators {
    pub fn new(
        endpoints: CollaboratorEndpoints,
        api_key: Option<String>,
    ) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoints.request_timeout_secs))
            .build()
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to build HTTP client");
                e
            })?;
        tracing::info!(
            api_key_set = api_key.is_some(),
            timeout_secs = endpoints.request_timeout_secs,
            "Initialized HttpCollaborators"
        );
        Ok(HttpCollaborators {
            http,
            endpoints,
            api_key,
        })
    }

    /// Shares one client across all five collaborator slots.
    pub fn into_collaborators(self) -> Collaborators {
        let shared = Arc::new(self);
        Collaborators {
            viral: shared.clone(),
            thumbnails: shared.clone(),
            ads: shared.clone(),
            poster: shared.clone(),
            scheduler: shared,
        }
    }

    async fn post_json<B, R>(
        &self,
        collaborator: &'static str,
        url: &str,
        body: &B,
    ) -> Result<R, CollaboratorError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        tracing::debug!(collaborator, url, "Calling collaborator");
        let mut request = self.http.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(collaborator, error = ?e, "Collaborator request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(collaborator, %status, body = %text, "Collaborator returned an error status");
            return Err(format!("{collaborator} returned {status}: {text}").into());
        }

        let decoded = response.json::<R>().await.map_err(|e| {
            tracing::error!(collaborator, error = ?e, "Failed to decode collaborator response");
            e
        })?;
        tracing::info!(collaborator, "Collaborator call succeeded");
        Ok(decoded)
    }
}

#[async_trait]
impl ViralOptimizer for HttpCollaborators {
    async fn analyze(&self, req: ViralRequest) -> Result<ViralAnalysis, CollaboratorError> {
        self.post_json("viral", &self.endpoints.viral_url, &req).await
    }
}

#[async_trait]
impl ThumbnailGenerator for HttpCollaborators {
    async fn generate(
        &self,
        req: ThumbnailRequest,
    ) -> Result<GeneratedThumbnail, CollaboratorError> {
        self.post_json("thumbnail", &self.endpoints.thumbnail_url, &req)
            .await
    }
}

#[async_trait]
impl AdGenerator for HttpCollaborators {
    async fn generate(&self, req: AdRequest) -> Result<GeneratedAd, CollaboratorError> {
        self.post_json("ad", &self.endpoints.ad_url, &req).await
    }
}

#[async_trait]
impl MultiPlatformPoster for HttpCollaborators {
    async fn post(&self, req: PostRequest) -> Result<Vec<PlatformPostOutcome>, CollaboratorError> {
        self.post_json("poster", &self.endpoints.poster_url, &req).await
    }
}

#[async_trait]
impl Scheduler for HttpCollaborators {
    async fn schedule(&self, req: ScheduleRequest) -> Result<ScheduleReceipt, CollaboratorError> {
        self.post_json("scheduler", &self.endpoints.scheduler_url, &req)
            .await
    }
}
