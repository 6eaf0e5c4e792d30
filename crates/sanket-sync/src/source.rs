//! Remote read sources and their wire formats.
//!
//! [`DashboardSource`] is the seam between the engine and the swarm
//! backend: the HTTP [`ApiClient`](crate::client::ApiClient) implements it in
//! production, in-memory fakes implement it in tests.

use std::future::Future;

use serde::Deserialize;

use sanket_core::types::{CommMessage, DashboardStats, QuantumInsight, ResourceAllocation, Swarm};

use crate::error::RequestError;

/// The five backend calls the engine depends on.
pub trait DashboardSource: Send + Sync + 'static {
    /// `GET /api/v1/swarm/agents`
    fn agents(&self) -> impl Future<Output = Result<AgentsResponse, RequestError>> + Send;

    /// `GET /api/v1/quantum/insights`
    fn quantum_insights(
        &self,
    ) -> impl Future<Output = Result<PatternDetection, RequestError>> + Send;

    /// `GET /api/v1/analytics/dashboard`
    fn dashboard_stats(&self) -> impl Future<Output = Result<DashboardStats, RequestError>> + Send;

    /// `GET /api/v1/swarm/communications?limit={limit}`
    fn communications(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<CommsResponse, RequestError>> + Send;

    /// `POST /api/v1/quantum/analyze` with an empty JSON object.
    fn analyze(&self) -> impl Future<Output = Result<AnalysisResponse, RequestError>> + Send;
}

/// Body of the agents listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentsResponse {
    #[serde(default)]
    pub agents: Swarm,
    #[serde(default)]
    pub total_agents: Option<u32>,
}

impl AgentsResponse {
    /// Key every agent by the id it was listed under.
    pub fn into_swarm(self) -> Swarm {
        let mut agents = self.agents;
        for (id, agent) in agents.iter_mut() {
            agent.id.clone_from(id);
        }
        agents
    }
}

/// Correlations arrive either as the list itself or as a bare count.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HiddenCorrelations {
    Count(u32),
    Items(Vec<serde_json::Value>),
}

impl HiddenCorrelations {
    pub fn count(&self) -> u32 {
        match self {
            Self::Count(n) => *n,
            Self::Items(items) => u32::try_from(items.len()).unwrap_or(u32::MAX),
        }
    }
}

/// Pattern-detection fields, shared by the insights read and the analysis result.
///
/// Every field is optional: the insights read falls back to zero values,
/// the analysis merge keeps whatever the dashboard already showed.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PatternDetection {
    #[serde(default)]
    pub outbreak_probability: Option<f64>,
    #[serde(default)]
    pub hidden_correlations: Option<HiddenCorrelations>,
    #[serde(default)]
    pub high_risk_villages: Option<Vec<String>>,
}

impl PatternDetection {
    /// Build a complete insight, defaulting absent fields.
    pub fn to_insight(&self) -> QuantumInsight {
        let mut insight = QuantumInsight::default();
        self.merge_into(&mut insight);
        insight
    }

    /// Overwrite only the fields present in this payload.
    pub fn merge_into(&self, insight: &mut QuantumInsight) {
        if let Some(p) = self.outbreak_probability {
            insight.outbreak_probability = p;
        }
        if let Some(c) = &self.hidden_correlations {
            insight.hidden_correlation_count = c.count();
        }
        if let Some(villages) = &self.high_risk_villages {
            insight.affected_villages.clone_from(villages);
        }
    }
}

/// Body of the communications listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommsResponse {
    #[serde(default)]
    pub communications: Vec<CommMessage>,
}

/// Body returned by the analysis trigger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub pattern_detection: Option<PatternDetection>,
    #[serde(default)]
    pub resource_allocation: Vec<ResourceAllocation>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanket_core::types::RiskLevel;

    #[test]
    fn agents_are_keyed_by_listing_id() {
        let json = r#"{
            "total_agents": 2,
            "agents": {
                "v2": {"name": "Thane", "risk_level": "low", "outbreak_belief": 0.1, "symptom_count": 0},
                "v1": {"name": "Kalyan", "risk_level": "critical", "outbreak_belief": 0.92,
                       "symptom_count": 11, "location": {"lat": 19.2, "lon": 73.1}, "neighbors": ["v2"]}
            }
        }"#;
        let resp: AgentsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.total_agents, Some(2));

        let swarm = resp.into_swarm();
        let ids: Vec<_> = swarm.keys().cloned().collect();
        assert_eq!(ids, vec!["v1", "v2"]);
        assert_eq!(swarm["v1"].id, "v1");
        assert_eq!(swarm["v1"].risk_level, RiskLevel::Critical);
        assert_eq!(swarm["v1"].neighbors, vec!["v2"]);
        assert_eq!(swarm["v2"].id, "v2");
    }

    #[test]
    fn nameless_agent_does_not_fail_the_listing() {
        let json = r#"{"agents": {
            "v1": {"risk_level": "high", "outbreak_belief": 0.8, "symptom_count": 4},
            "v2": {"name": "Thane", "risk_level": "low"}
        }}"#;
        let swarm = serde_json::from_str::<AgentsResponse>(json).unwrap().into_swarm();
        assert_eq!(swarm.len(), 2);
        assert_eq!(swarm["v1"].name, "");
        assert_eq!(swarm["v1"].risk_level, RiskLevel::High);
        assert_eq!(swarm["v2"].name, "Thane");
    }

    #[test]
    fn hidden_correlations_accept_count_or_list() {
        let as_list: PatternDetection = serde_json::from_str(
            r#"{"hidden_correlations": [{"village1": "A", "village2": "B"}, {}, {}]}"#,
        )
        .unwrap();
        assert_eq!(as_list.to_insight().hidden_correlation_count, 3);

        let as_count: PatternDetection =
            serde_json::from_str(r#"{"hidden_correlations": 7}"#).unwrap();
        assert_eq!(as_count.to_insight().hidden_correlation_count, 7);
    }

    #[test]
    fn empty_insight_defaults_to_zero() {
        let p: PatternDetection = serde_json::from_str("{}").unwrap();
        assert_eq!(p.to_insight(), QuantumInsight::default());
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut insight = QuantumInsight {
            outbreak_probability: 0.4,
            hidden_correlation_count: 2,
            affected_villages: vec!["Kalyan".to_string()],
        };
        let partial: PatternDetection =
            serde_json::from_str(r#"{"outbreak_probability": 0.81}"#).unwrap();
        partial.merge_into(&mut insight);

        assert_eq!(insight.outbreak_probability, 0.81);
        assert_eq!(insight.hidden_correlation_count, 2);
        assert_eq!(insight.affected_villages, vec!["Kalyan"]);
    }

    #[test]
    fn analysis_response_with_allocation() {
        let json = r#"{
            "pattern_detection": {"outbreak_probability": 0.66, "hidden_correlations": 1},
            "resource_allocation": [
                {"village": "Dharavi", "priority_score": 0.6, "quantum_score": 0.5,
                 "ors_packets": 600, "medical_staff": 30, "test_kits": 300}
            ],
            "timestamp": "2025-01-10T09:30:00"
        }"#;
        let resp: AnalysisResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.resource_allocation.len(), 1);
        assert_eq!(resp.resource_allocation[0].ors_packets, 600);
        let pattern = resp.pattern_detection.unwrap();
        assert_eq!(pattern.outbreak_probability, Some(0.66));
        assert!(pattern.high_risk_villages.is_none());
    }
}
