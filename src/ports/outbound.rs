//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    CollectiveId, DocumentType, DomainError, ExpenseId, ExpenseRecord, ExpenseStatus, ExpenseType,
    LegalDocumentKey,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Filter for the yearly invoiced total of one submitter toward one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    pub host_id: CollectiveId,
    pub from_collective_id: CollectiveId,
    /// Inclusive lower bound of `incurred_at`.
    pub from: DateTime<Utc>,
    /// Exclusive upper bound of `incurred_at`.
    pub until: DateTime<Utc>,
    pub excluded_types: Vec<ExpenseType>,
    pub excluded_statuses: Vec<ExpenseStatus>,
}

/// Read-side persistence for compliance decisions.
#[async_trait::async_trait]
pub trait ComplianceRepoPort: Send + Sync {
    /// Fetch expenses with their target collective, submitter and host.
    /// Unknown ids are simply absent from the result.
    async fn get_expenses(&self, ids: &[ExpenseId]) -> Result<Vec<ExpenseRecord>, DomainError>;

    /// Required document types per host. Hosts without configuration are absent.
    async fn get_required_legal_documents(
        &self,
        host_ids: &[CollectiveId],
    ) -> Result<HashMap<CollectiveId, Vec<DocumentType>>, DomainError>;

    /// Sum of `amount` (cents) over non-deleted expenses matching the query.
    async fn sum_expenses(&self, query: &AggregateQuery) -> Result<i64, DomainError>;

    /// Subset of `keys` for which a RECEIVED legal document exists.
    async fn find_received_legal_documents(
        &self,
        keys: &[LegalDocumentKey],
    ) -> Result<HashSet<LegalDocumentKey>, DomainError>;

    /// Ids of non-deleted expenses incurred in `year` against collectives of `host_id`.
    async fn list_host_expense_ids(
        &self,
        host_id: CollectiveId,
        year: i32,
    ) -> Result<Vec<ExpenseId>, DomainError>;
}
