//! sanket-core: Shared types, configuration, and error handling for the Sanket dashboard.
//!
//! This crate provides the foundational types used by the sync engine and its consumers:
//! - Agent snapshots reported by the village swarm
//! - Derived alerts and their dispatch status
//! - Quantum insight and the aggregate dashboard state
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::SyncConfig;
pub use error::SanketError;
pub use types::{
    AgentSnapshot, Alert, AlertStatus, CommMessage, DashboardState, DashboardStats,
    QuantumInsight, ResourceAllocation, RiskLevel, Severity, Swarm,
};
