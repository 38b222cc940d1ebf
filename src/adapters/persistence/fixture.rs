//! JSON fixture format for seeding a store.
//!
//! Mirrors the four tables the evaluator reads. Missing sections default to empty.

use crate::domain::{Collective, DomainError, Expense, LegalDocument, RequiredLegalDocument};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub collectives: Vec<Collective>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub required_legal_documents: Vec<RequiredLegalDocument>,
    #[serde(default)]
    pub legal_documents: Vec<LegalDocument>,
}

impl Fixture {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Input(format!("read {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw).map_err(|e| DomainError::Input(format!("fixture: {}", e)))
    }
}
