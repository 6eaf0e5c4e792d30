//! Error types for the sanket-sync crate.

use std::fmt;

use thiserror::Error;

use crate::guard::GuardPhase;

/// The remote endpoint a request was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Agents,
    QuantumInsights,
    DashboardStats,
    Communications,
    Analysis,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::QuantumInsights => "quantum_insights",
            Self::DashboardStats => "dashboard_stats",
            Self::Communications => "communications",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request to the swarm backend failed.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One of the read sources failed, so the whole cycle produced nothing.
#[derive(Error, Debug)]
#[error("Failed to fetch {endpoint}: {cause}")]
pub struct FetchError {
    pub endpoint: Endpoint,
    #[source]
    pub cause: RequestError,
}

impl FetchError {
    pub fn new(endpoint: Endpoint, cause: RequestError) -> Self {
        Self { endpoint, cause }
    }
}

/// A manually triggered analysis could not produce a result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis already running (guard is {phase})")]
    AlreadyRunning { phase: GuardPhase },

    #[error("Analysis request failed: {0}")]
    Request(#[from] RequestError),
}

pub type Result<T> = std::result::Result<T, FetchError>;
