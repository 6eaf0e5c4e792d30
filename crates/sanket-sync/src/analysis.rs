//! Manual deep analysis: the user-triggered, long-running counterpart to polling.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sanket_core::types::{QuantumInsight, ResourceAllocation};

use crate::error::AnalysisError;
use crate::guard::GuardPhase;
use crate::source::{AnalysisResponse, DashboardSource};
use crate::SyncEngine;

/// What a completed analysis hands back for presentation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalysisOutcome {
    /// The dashboard's quantum insight after the merge.
    pub quantum: QuantumInsight,
    /// Resource plan, highest priority first.
    pub resource_allocation: Vec<ResourceAllocation>,
    pub completed_at: DateTime<Utc>,
}

/// Fold an analysis response into `current`, keeping fields the response omits.
pub fn merge_analysis(current: &mut QuantumInsight, response: &AnalysisResponse) {
    if let Some(pattern) = &response.pattern_detection {
        pattern.merge_into(current);
    }
}

fn sort_by_priority(plan: &mut [ResourceAllocation]) {
    plan.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
}

impl<S: DashboardSource> SyncEngine<S> {
    /// Run one deep analysis.
    ///
    /// Rejected immediately, without any request, unless the guard is idle.
    /// Otherwise the guard is held for the duration of the call and enters
    /// its cooldown afterwards regardless of the result, keeping the poller
    /// from overwriting the merged insight straight away.
    pub async fn run_analysis(&self) -> Result<AnalysisOutcome, AnalysisError> {
        let lease = self
            .guard()
            .try_acquire()
            .map_err(|phase: GuardPhase| {
                tracing::info!(guard = %phase, "Analysis rejected, guard busy");
                AnalysisError::AlreadyRunning { phase }
            })?;

        tracing::info!("Manual analysis started");
        let start = std::time::Instant::now();
        let response = self.source().analyze().await;

        let result = match response {
            Ok(response) => {
                let quantum = self.store().modify(|state| {
                    merge_analysis(&mut state.quantum, &response);
                    state.quantum.clone()
                });
                let mut resource_allocation = response.resource_allocation;
                sort_by_priority(&mut resource_allocation);

                tracing::info!(
                    outbreak_probability = quantum.outbreak_probability,
                    hidden_correlations = quantum.hidden_correlation_count,
                    allocations = resource_allocation.len(),
                    duration_ms = start.elapsed().as_millis(),
                    "Manual analysis complete"
                );
                Ok(AnalysisOutcome {
                    quantum,
                    resource_allocation,
                    completed_at: Utc::now(),
                })
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    duration_ms = start.elapsed().as_millis(),
                    "Manual analysis failed"
                );
                Err(AnalysisError::Request(e))
            }
        };

        drop(lease);
        result
    }
}
