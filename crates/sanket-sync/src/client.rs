//! HTTP client for the swarm backend.
//!
//! Thin JSON request/response wrapper over `reqwest`. Clone is cheap
//! (the inner client is reference counted).

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use sanket_core::types::DashboardStats;
use sanket_core::SyncConfig;

use crate::error::{Endpoint, RequestError};
use crate::source::{AgentsResponse, AnalysisResponse, CommsResponse, DashboardSource, PatternDetection};

const AGENTS_PATH: &str = "/api/v1/swarm/agents";
const INSIGHTS_PATH: &str = "/api/v1/quantum/insights";
const STATS_PATH: &str = "/api/v1/analytics/dashboard";
const COMMS_PATH: &str = "/api/v1/swarm/communications";
const ANALYZE_PATH: &str = "/api/v1/quantum/analyze";

/// Error bodies are truncated to this many bytes before being logged.
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    analysis_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &SyncConfig) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            analysis_timeout: config.analysis_timeout(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RequestError> {
        let start = Instant::now();
        let response = request.send().await?;
        let body = read_success_body(response).await?;

        tracing::trace!(
            endpoint = %endpoint,
            bytes = body.len(),
            duration_ms = start.elapsed().as_millis(),
            "Backend response received"
        );

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Return the body of a 2xx response, or the status and a truncated body otherwise.
async fn read_success_body(response: reqwest::Response) -> Result<Vec<u8>, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.bytes().await?.to_vec());
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(RequestError::Status {
        status: status.as_u16(),
        body,
    })
}

impl DashboardSource for ApiClient {
    async fn agents(&self) -> Result<AgentsResponse, RequestError> {
        let request = self.http.get(self.url(AGENTS_PATH));
        self.get_json(Endpoint::Agents, request).await
    }

    async fn quantum_insights(&self) -> Result<PatternDetection, RequestError> {
        let request = self.http.get(self.url(INSIGHTS_PATH));
        self.get_json(Endpoint::QuantumInsights, request).await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, RequestError> {
        let request = self.http.get(self.url(STATS_PATH));
        self.get_json(Endpoint::DashboardStats, request).await
    }

    async fn communications(&self, limit: u32) -> Result<CommsResponse, RequestError> {
        let request = self
            .http
            .get(self.url(COMMS_PATH))
            .query(&[("limit", limit)]);
        self.get_json(Endpoint::Communications, request).await
    }

    async fn analyze(&self) -> Result<AnalysisResponse, RequestError> {
        let request = self
            .http
            .post(self.url(ANALYZE_PATH))
            .timeout(self.analysis_timeout)
            .json(&serde_json::json!({}));
        self.get_json(Endpoint::Analysis, request).await
    }
}
