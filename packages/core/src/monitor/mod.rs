//! Integration Monitor Module
//!
//! Tracks the health of a fixed set of external integrations and drives
//! single retries and bulk checks against them.

pub mod clock;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod transition;
pub mod types;

pub use clock::{Clock, TokioClock};
pub use config::MonitorConfig;
pub use error::MonitorError;
pub use orchestrator::{IntegrationMonitor, MonitorBuilder};
pub use probe::{HealthProbe, ServiceProbe, SimulatedProbe};
pub use types::*;
