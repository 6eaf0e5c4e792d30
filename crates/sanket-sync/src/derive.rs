//! Alert derivation: turn raw agent risk data into actionable alerts.

use std::collections::HashSet;

use sanket_core::types::{
    AgentSnapshot, Alert, AlertStatus, RiskLevel, Severity, Swarm, QUANTUM_CONFIDENCE_THRESHOLD,
};

/// Id of the alert shown when no agent is at high or critical risk.
pub const PLACEHOLDER_ALERT_ID: &str = "mock-dharavi";

/// Derive the alert list for one cycle.
///
/// Selects agents at `high` or `critical` risk, in the mapping's iteration
/// order. Ids present in `dispatched` always come out `Dispatched`. If no
/// agent qualifies, a single placeholder alert is returned instead of an
/// empty list.
pub fn derive_alerts(agents: &Swarm, dispatched: &HashSet<String>) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = agents
        .iter()
        .filter(|(_, agent)| agent.risk_level.is_alerting())
        .map(|(id, agent)| alert_for_agent(id, agent))
        .collect();

    if alerts.is_empty() {
        alerts.push(placeholder_alert());
    }

    for alert in &mut alerts {
        if dispatched.contains(&alert.id) {
            alert.mark_dispatched();
        }
    }

    alerts
}

fn alert_for_agent(id: &str, agent: &AgentSnapshot) -> Alert {
    let severity = match agent.risk_level {
        RiskLevel::Critical => Severity::Critical,
        _ => Severity::High,
    };
    let confidence = agent.outbreak_belief;

    Alert {
        id: id.to_string(),
        severity,
        village: agent.name.clone(),
        description: format!(
            "{} active symptom clusters reported via swarm consensus.",
            agent.symptom_count
        ),
        confidence,
        quantum: confidence > QUANTUM_CONFIDENCE_THRESHOLD,
        status: AlertStatus::Pending,
    }
}

fn placeholder_alert() -> Alert {
    let confidence = 0.78;
    Alert {
        id: PLACEHOLDER_ALERT_ID.to_string(),
        severity: Severity::High,
        village: "Dharavi".to_string(),
        description: "6 symptoms reported".to_string(),
        confidence,
        quantum: confidence > QUANTUM_CONFIDENCE_THRESHOLD,
        status: AlertStatus::Pending,
    }
}
