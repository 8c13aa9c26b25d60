//! Plan-limits error types

use clinova_shared::ResourceKind;
use thiserror::Error;

/// Plan-limits specific errors
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Organization not found: {0}")]
    OrgNotFound(String),

    #[error("Invalid {resource} count from backend: {value}")]
    InvalidCount {
        resource: ResourceKind,
        value: i64,
    },

    #[error("Plan limit reached for {resource} (cap {max})")]
    QuotaExceeded {
        resource: ResourceKind,
        max: u32,
    },
}

impl From<sqlx::Error> for PlanError {
    fn from(err: sqlx::Error) -> Self {
        PlanError::Database(err.to_string())
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
