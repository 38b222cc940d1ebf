//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod rules;

pub use entities::{
    Collective, CollectiveId, DocumentType, Expense, ExpenseId, ExpenseRecord, ExpenseStatus,
    ExpenseType, LegalDocument, LegalDocumentKey, LegalDocumentStatus, RequiredLegalDocument,
};
pub use errors::DomainError;
pub use rules::{DEFAULT_US_TAX_FORM_THRESHOLD_CENTS, DocumentPolicy, fiscal_year, fiscal_year_range};
