//! In-memory repository. Implements ComplianceRepoPort over plain vectors.
//!
//! Used by tests and dry runs. Counts calls per operation so batching is observable.

use crate::domain::{
    Collective, CollectiveId, DocumentType, DomainError, Expense, ExpenseId, ExpenseRecord,
    LegalDocument, LegalDocumentKey, RequiredLegalDocument, fiscal_year,
};
use crate::ports::{AggregateQuery, ComplianceRepoPort};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Snapshot of how often each port operation ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_expenses: usize,
    pub get_required_legal_documents: usize,
    pub sum_expenses: usize,
    pub find_received_legal_documents: usize,
}

#[derive(Default)]
struct Counters {
    get_expenses: AtomicUsize,
    get_required_legal_documents: AtomicUsize,
    sum_expenses: AtomicUsize,
    find_received_legal_documents: AtomicUsize,
}

#[derive(Default)]
pub struct InMemoryRepo {
    collectives: HashMap<CollectiveId, Collective>,
    expenses: Vec<Expense>,
    requirements: Vec<RequiredLegalDocument>,
    documents: Vec<LegalDocument>,
    /// Submitters whose aggregate query fails (simulated connection loss).
    failing_submitters: HashSet<CollectiveId>,
    counters: Counters,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collective(mut self, id: CollectiveId, host_id: Option<CollectiveId>) -> Self {
        self.collectives.insert(id, Collective { id, host_id });
        self
    }

    pub fn with_expense(mut self, expense: Expense) -> Self {
        self.expenses.push(expense);
        self
    }

    pub fn with_requirement(mut self, host_id: CollectiveId, document_type: DocumentType) -> Self {
        self.requirements.push(RequiredLegalDocument {
            host_id,
            document_type,
        });
        self
    }

    pub fn with_document(mut self, document: LegalDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn with_failing_aggregate(mut self, from_collective_id: CollectiveId) -> Self {
        self.failing_submitters.insert(from_collective_id);
        self
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            get_expenses: self.counters.get_expenses.load(Ordering::SeqCst),
            get_required_legal_documents: self
                .counters
                .get_required_legal_documents
                .load(Ordering::SeqCst),
            sum_expenses: self.counters.sum_expenses.load(Ordering::SeqCst),
            find_received_legal_documents: self
                .counters
                .find_received_legal_documents
                .load(Ordering::SeqCst),
        }
    }

    fn host_of(&self, collective_id: CollectiveId) -> Option<CollectiveId> {
        self.collectives
            .get(&collective_id)
            .and_then(|c| c.host_id)
    }
}

#[async_trait::async_trait]
impl ComplianceRepoPort for InMemoryRepo {
    async fn get_expenses(&self, ids: &[ExpenseId]) -> Result<Vec<ExpenseRecord>, DomainError> {
        self.counters.get_expenses.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .expenses
            .iter()
            .filter(|e| ids.contains(&e.id))
            .map(|e| {
                let collective = self.collectives.get(&e.collective_id).cloned();
                let host = collective
                    .as_ref()
                    .and_then(|c| c.host_id)
                    .and_then(|h| self.collectives.get(&h).cloned());
                ExpenseRecord {
                    expense: e.clone(),
                    collective,
                    from_collective: self.collectives.get(&e.from_collective_id).cloned(),
                    host,
                }
            })
            .collect())
    }

    async fn get_required_legal_documents(
        &self,
        host_ids: &[CollectiveId],
    ) -> Result<HashMap<CollectiveId, Vec<DocumentType>>, DomainError> {
        self.counters
            .get_required_legal_documents
            .fetch_add(1, Ordering::SeqCst);
        let mut out: HashMap<CollectiveId, Vec<DocumentType>> = HashMap::new();
        for r in self
            .requirements
            .iter()
            .filter(|r| host_ids.contains(&r.host_id))
        {
            out.entry(r.host_id).or_default().push(r.document_type);
        }
        Ok(out)
    }

    async fn sum_expenses(&self, query: &AggregateQuery) -> Result<i64, DomainError> {
        self.counters.sum_expenses.fetch_add(1, Ordering::SeqCst);
        if self.failing_submitters.contains(&query.from_collective_id) {
            return Err(DomainError::Query("connection lost".into()));
        }
        Ok(self
            .expenses
            .iter()
            .filter(|e| e.from_collective_id == query.from_collective_id)
            .filter(|e| e.deleted_at.is_none())
            .filter(|e| self.host_of(e.collective_id) == Some(query.host_id))
            .filter(|e| e.incurred_at >= query.from && e.incurred_at < query.until)
            .filter(|e| !query.excluded_types.contains(&e.expense_type))
            .filter(|e| !query.excluded_statuses.contains(&e.status))
            .map(|e| e.amount)
            .sum())
    }

    async fn find_received_legal_documents(
        &self,
        keys: &[LegalDocumentKey],
    ) -> Result<HashSet<LegalDocumentKey>, DomainError> {
        self.counters
            .find_received_legal_documents
            .fetch_add(1, Ordering::SeqCst);
        Ok(self
            .documents
            .iter()
            .filter(|d| d.request_status.fulfils_requirement())
            .map(|d| LegalDocumentKey {
                collective_id: d.collective_id,
                year: d.year,
                document_type: d.document_type,
            })
            .filter(|k| keys.contains(k))
            .collect())
    }

    async fn list_host_expense_ids(
        &self,
        host_id: CollectiveId,
        year: i32,
    ) -> Result<Vec<ExpenseId>, DomainError> {
        let mut ids: Vec<ExpenseId> = self
            .expenses
            .iter()
            .filter(|e| e.deleted_at.is_none())
            .filter(|e| self.host_of(e.collective_id) == Some(host_id))
            .filter(|e| fiscal_year(&e.incurred_at) == year)
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
