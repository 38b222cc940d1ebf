//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these. `Clone` because a single
//! batch failure fans out to every key that shared the batch.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl DomainError {
    pub fn expense_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "expense",
            id,
        }
    }

    pub fn collective_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "collective",
            id,
        }
    }

    pub fn host_not_found(id: i64) -> Self {
        Self::NotFound { entity: "host", id }
    }
}
