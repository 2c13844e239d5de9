//! Error types for integration monitor operations

use thiserror::Error;

use crate::monitor::types::IntegrationStatus;

/// Errors returned by the monitor and its record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Unknown integration: {name}")]
    NotFound { name: String },

    #[error("Cannot apply {trigger} to integration '{name}' while it is {from}")]
    InvalidTransition {
        name: String,
        from: IntegrationStatus,
        trigger: &'static str,
    },

    #[error("A bulk check is already in progress")]
    AlreadyInFlight,

    #[error("Duplicate integration name: {name}")]
    DuplicateName { name: String },
}

impl MonitorError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn invalid_transition(
        name: impl Into<String>,
        from: IntegrationStatus,
        trigger: &'static str,
    ) -> Self {
        Self::InvalidTransition {
            name: name.into(),
            from,
            trigger,
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
