//! Application configuration. Data directory and document thresholds.

use crate::domain::{DEFAULT_US_TAX_FORM_THRESHOLD_CENTS, DocumentPolicy, DomainError};
use serde::Deserialize;

/// Default directory for `compliance.db`.
pub const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding the SQLite database. Read from PAYOUT_GATE_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Yearly invoiced total (cents) from which a US tax form is required.
    /// Read from PAYOUT_GATE_TAX_FORM_THRESHOLD_CENTS.
    #[serde(default)]
    pub tax_form_threshold_cents: Option<i64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("PAYOUT_GATE").try_parsing(true));
        if let Ok(path) = std::env::var("PAYOUT_GATE_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Returns the data directory. Defaults to `./data`.
    pub fn data_dir_or_default(&self) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
    }

    /// Builds the evaluator policy. Rejects non-positive thresholds.
    pub fn document_policy(&self) -> Result<DocumentPolicy, DomainError> {
        let threshold = self
            .tax_form_threshold_cents
            .unwrap_or(DEFAULT_US_TAX_FORM_THRESHOLD_CENTS);
        if threshold <= 0 {
            return Err(DomainError::Config(format!(
                "tax_form_threshold_cents must be positive, got {}",
                threshold
            )));
        }
        Ok(DocumentPolicy {
            us_tax_form_threshold_cents: threshold,
        })
    }
}
