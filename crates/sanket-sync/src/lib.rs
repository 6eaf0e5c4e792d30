//! sanket-sync: Dashboard synchronization and alert reconciliation for Sanket.
//!
//! Periodically pulls agent, insight, stats and communication data from the
//! swarm backend, derives actionable alerts, and keeps the single dashboard
//! state consistent against a manually triggered deep analysis.

pub mod aggregator;
pub mod analysis;
pub mod client;
pub mod derive;
pub mod engine;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod poller;
pub mod source;
pub mod store;

pub use analysis::AnalysisOutcome;
pub use client::ApiClient;
pub use engine::{CycleOutcome, SyncEngine};
pub use error::{AnalysisError, FetchError, RequestError};
pub use guard::GuardPhase;
pub use poller::PollerHandle;
pub use source::DashboardSource;
