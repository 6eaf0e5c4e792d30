//! Source aggregation: fetch the four read sources for one cycle.
//!
//! The reads are issued concurrently and joined all-or-nothing. The first
//! failure fails the cycle and the other in-flight reads are dropped, so a
//! cycle never yields partial data. There is no retry here; the next
//! poll tick is the retry.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use sanket_core::types::{CommMessage, DashboardState, DashboardStats, QuantumInsight, Swarm};

use crate::derive::derive_alerts;
use crate::error::{Endpoint, FetchError, Result};
use crate::source::DashboardSource;

/// Normalized output of one successful fetch.
#[derive(Debug, Clone, Default)]
pub struct RawBundle {
    pub swarm: Swarm,
    pub quantum: QuantumInsight,
    pub stats: DashboardStats,
    pub comms: Vec<CommMessage>,
}

impl RawBundle {
    /// Join the bundle with freshly derived alerts into a complete state.
    pub fn into_state(self, dispatched: &HashSet<String>, synced_at: DateTime<Utc>) -> DashboardState {
        let alerts = derive_alerts(&self.swarm, dispatched);
        DashboardState {
            stats: self.stats,
            swarm: self.swarm,
            alerts,
            quantum: self.quantum,
            comms: self.comms,
            synced_at: Some(synced_at),
        }
    }
}

/// Fetch agents, quantum insight, stats and the latest `comms_limit` messages.
pub async fn fetch_all<S: DashboardSource>(source: &S, comms_limit: u32) -> Result<RawBundle> {
    let agents = async {
        source
            .agents()
            .await
            .map_err(|e| FetchError::new(Endpoint::Agents, e))
    };
    let insights = async {
        source
            .quantum_insights()
            .await
            .map_err(|e| FetchError::new(Endpoint::QuantumInsights, e))
    };
    let stats = async {
        source
            .dashboard_stats()
            .await
            .map_err(|e| FetchError::new(Endpoint::DashboardStats, e))
    };
    let comms = async {
        source
            .communications(comms_limit)
            .await
            .map_err(|e| FetchError::new(Endpoint::Communications, e))
    };

    let (agents, insights, stats, comms) = tokio::try_join!(agents, insights, stats, comms)?;

    let mut comms = comms.communications;
    // History arrives oldest first; a backend that ignores `limit` must
    // still leave us with the newest messages.
    let excess = comms.len().saturating_sub(comms_limit as usize);
    comms.drain(..excess);

    Ok(RawBundle {
        swarm: agents.into_swarm(),
        quantum: insights.to_insight(),
        stats,
        comms,
    })
}
