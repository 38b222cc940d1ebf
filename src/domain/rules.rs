//! Business rules for legal-document requirements.
//!
//! Every closed enum is matched exhaustively here; adding a variant fails to
//! compile until it is given a rule.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use super::entities::{DocumentType, ExpenseStatus, ExpenseType, LegalDocumentStatus};

/// US tax form threshold: 600.00 in the host currency, in cents.
pub const DEFAULT_US_TAX_FORM_THRESHOLD_CENTS: i64 = 600_00;

/// Thresholds applied by the evaluator. Built from configuration at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPolicy {
    pub us_tax_form_threshold_cents: i64,
}

impl Default for DocumentPolicy {
    fn default() -> Self {
        Self {
            us_tax_form_threshold_cents: DEFAULT_US_TAX_FORM_THRESHOLD_CENTS,
        }
    }
}

impl DocumentPolicy {
    /// Yearly invoiced total (inclusive) from which `document_type` becomes required.
    pub fn threshold_for(&self, document_type: DocumentType) -> i64 {
        match document_type {
            DocumentType::UsTaxForm => self.us_tax_form_threshold_cents,
        }
    }
}

impl ExpenseType {
    /// Reimbursement receipts are not taxable invoiced income.
    pub fn is_subject_to_legal_documents(&self) -> bool {
        match self {
            ExpenseType::Invoice
            | ExpenseType::Unclassified
            | ExpenseType::FundingRequest
            | ExpenseType::Grant => true,
            ExpenseType::Receipt => false,
        }
    }

    /// Types excluded from the yearly aggregate.
    pub fn excluded_from_aggregate() -> Vec<ExpenseType> {
        ExpenseType::ALL
            .iter()
            .copied()
            .filter(|t| !t.is_subject_to_legal_documents())
            .collect()
    }
}

impl ExpenseStatus {
    /// Whether an expense in this status counts toward another expense's aggregate.
    pub fn counts_toward_aggregate(&self) -> bool {
        match self {
            ExpenseStatus::Pending
            | ExpenseStatus::Approved
            | ExpenseStatus::ScheduledForPayment
            | ExpenseStatus::Processing
            | ExpenseStatus::Paid => true,
            ExpenseStatus::Draft
            | ExpenseStatus::Unverified
            | ExpenseStatus::Rejected
            | ExpenseStatus::Error
            | ExpenseStatus::Spam
            | ExpenseStatus::Canceled => false,
        }
    }

    pub fn excluded_from_aggregate() -> Vec<ExpenseStatus> {
        ExpenseStatus::ALL
            .iter()
            .copied()
            .filter(|s| !s.counts_toward_aggregate())
            .collect()
    }
}

impl LegalDocumentStatus {
    pub fn fulfils_requirement(&self) -> bool {
        match self {
            LegalDocumentStatus::Received => true,
            LegalDocumentStatus::Requested
            | LegalDocumentStatus::Error
            | LegalDocumentStatus::Invalid
            | LegalDocumentStatus::Expired => false,
        }
    }

    /// Statuses a store must match when looking up documents on file.
    pub fn fulfilling() -> Vec<LegalDocumentStatus> {
        Self::ALL
            .iter()
            .copied()
            .filter(|s| s.fulfils_requirement())
            .collect()
    }
}

/// Calendar year of the timestamp, in UTC.
pub fn fiscal_year(incurred_at: &DateTime<Utc>) -> i32 {
    incurred_at.year()
}

/// Half-open range `[year-01-01, (year+1)-01-01)` in UTC.
pub fn fiscal_year_range(year: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    (year_start(year), year_start(year + 1))
}

fn year_start(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
