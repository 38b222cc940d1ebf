//! Application use cases. Orchestrate domain logic via ports.

pub mod legal_documents;
pub mod loader;
pub mod report_service;

pub use legal_documents::{AggregateKey, LegalDocumentEvaluator, RequestScope};
pub use loader::Coalescer;
pub use report_service::{ReportRow, ReportService};
