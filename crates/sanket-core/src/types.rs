//! Core domain types for the Sanket outbreak dashboard.
//!
//! These mirror the JSON bodies served by the swarm backend and the
//! aggregate view the sync engine hands to the presentation layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alerts whose confidence exceeds this are flagged as quantum-corroborated.
pub const QUANTUM_CONFIDENCE_THRESHOLD: f64 = 0.7;

// ── Agents ────────────────────────────────────────────────────────

/// Risk classification reported by a village agent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Normal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Whether this level warrants an actionable alert.
    pub fn is_alerting(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// One monitored village node as reported in a single cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSnapshot {
    /// Stable key. Filled from the agents mapping key, not the body.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub outbreak_belief: f64,
    #[serde(default)]
    pub symptom_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<serde_json::Value>,
    #[serde(default)]
    pub neighbors: Vec<String>,
}

/// Agents keyed by id. Ordered so derived alerts are deterministic.
pub type Swarm = BTreeMap<String, AgentSnapshot>;

// ── Alerts ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Dispatch state of an alert. `Dispatched` is terminal for a session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Pending,
    Dispatched,
}

/// An actionable record derived from agent risk data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub village: String,
    pub description: String,
    pub confidence: f64,
    pub quantum: bool,
    pub status: AlertStatus,
}

impl Alert {
    pub fn is_dispatched(&self) -> bool {
        self.status == AlertStatus::Dispatched
    }

    /// Move to `Dispatched`. Never moves back.
    pub fn mark_dispatched(&mut self) {
        self.status = AlertStatus::Dispatched;
    }
}

// ── Quantum insight ───────────────────────────────────────────────

/// Pattern-detection summary shown on the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuantumInsight {
    pub outbreak_probability: f64,
    pub hidden_correlation_count: u32,
    /// Highest risk first, in the order the backend ranked them.
    pub affected_villages: Vec<String>,
}

/// One line of the resource plan returned by a deep analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceAllocation {
    pub village: String,
    #[serde(default)]
    pub priority_score: f64,
    #[serde(default)]
    pub quantum_score: f64,
    #[serde(default)]
    pub ors_packets: u32,
    #[serde(default)]
    pub medical_staff: u32,
    #[serde(default)]
    pub test_kits: u32,
}

// ── Stats & comms ─────────────────────────────────────────────────

/// Headline counters from the analytics endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    #[serde(default)]
    pub active_villages: u32,
    #[serde(default)]
    pub total_reports: u32,
    #[serde(default)]
    pub high_risk_villages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_outbreak_belief: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_status: Option<String>,
}

/// A message exchanged between village agents.
///
/// The timestamp is kept verbatim: the swarm emits naive ISO-8601 local times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommMessage {
    pub timestamp: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

// ── Aggregate ─────────────────────────────────────────────────────

/// The single consistent view handed to the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardState {
    pub stats: DashboardStats,
    pub swarm: Swarm,
    pub alerts: Vec<Alert>,
    pub quantum: QuantumInsight,
    pub comms: Vec<CommMessage>,
    /// When the last poll cycle replaced this state. `None` until the first one.
    pub synced_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    /// Alerts still awaiting dispatch.
    pub fn pending_alert_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.is_dispatched()).count()
    }

    pub fn alert(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    pub fn alert_mut(&mut self, id: &str) -> Option<&mut Alert> {
        self.alerts.iter_mut().find(|a| a.id == id)
    }
}
