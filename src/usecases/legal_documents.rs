//! Legal-document requirement evaluator.
//!
//! Decides, per expense, which tax documents the submitter still owes before
//! the expense can be paid:
//! - resolve the host and fiscal year of each expense
//! - skip receipts, unhosted and self-hosted payees, hosts without requirements
//! - sum the submitter's invoiced total toward the host for the year
//! - compare against each document threshold, then drop documents already received
//!
//! All lookups go through a [`RequestScope`] so identical sub-queries within one
//! request run once. Nothing is cached across scopes.

use crate::domain::{
    CollectiveId, DocumentPolicy, DocumentType, DomainError, ExpenseId, ExpenseRecord,
    ExpenseStatus, ExpenseType, LegalDocumentKey, fiscal_year, fiscal_year_range,
};
use crate::ports::{AggregateQuery, ComplianceRepoPort};
use crate::usecases::loader::Coalescer;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Grouping key for the yearly aggregate: (host, submitter, fiscal year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub host_id: CollectiveId,
    pub from_collective_id: CollectiveId,
    pub year: i32,
}

/// Process-wide evaluator. Hands out one [`RequestScope`] per logical request.
pub struct LegalDocumentEvaluator {
    repo: Arc<dyn ComplianceRepoPort>,
    policy: DocumentPolicy,
}

impl LegalDocumentEvaluator {
    pub fn new(repo: Arc<dyn ComplianceRepoPort>, policy: DocumentPolicy) -> Self {
        Self { repo, policy }
    }

    /// Start a request. Drop the scope when the request ends.
    pub fn scope(&self) -> RequestScope {
        RequestScope {
            repo: Arc::clone(&self.repo),
            policy: self.policy.clone(),
            expenses: Coalescer::new("expenses")
                .with_missing(|id: &ExpenseId| DomainError::expense_not_found(*id)),
            host_requirements: Coalescer::new("host_requirements")
                .with_missing(|id: &CollectiveId| DomainError::host_not_found(*id)),
            aggregates: Coalescer::new("aggregates"),
            received: Coalescer::new("received_documents"),
        }
    }
}

/// Per-request batching context. Owns every coalescing cache for one request.
pub struct RequestScope {
    repo: Arc<dyn ComplianceRepoPort>,
    policy: DocumentPolicy,
    expenses: Coalescer<ExpenseId, ExpenseRecord>,
    host_requirements: Coalescer<CollectiveId, Vec<DocumentType>>,
    aggregates: Coalescer<AggregateKey, i64>,
    received: Coalescer<LegalDocumentKey, bool>,
}

/// Expense that passed the cheap checks and needs host configuration.
struct Candidate {
    index: usize,
    key: AggregateKey,
    amount: i64,
    /// Whether the expense is already part of the repository aggregate.
    counted: bool,
}

type Decision = Result<Vec<DocumentType>, DomainError>;

impl RequestScope {
    /// Whether a legal document must be collected before paying `expense_id`.
    pub async fn is_legal_document_required_before_payment(
        &self,
        expense_id: ExpenseId,
    ) -> Result<bool, DomainError> {
        self.required_legal_document_types(expense_id)
            .await
            .map(|types| !types.is_empty())
    }

    pub async fn is_legal_document_required_before_payment_many(
        &self,
        expense_ids: &[ExpenseId],
    ) -> Vec<Result<bool, DomainError>> {
        self.required_legal_document_types_many(expense_ids)
            .await
            .into_iter()
            .map(|res| res.map(|types| !types.is_empty()))
            .collect()
    }

    /// Document types still outstanding for `expense_id`. Empty when none is due.
    pub async fn required_legal_document_types(
        &self,
        expense_id: ExpenseId,
    ) -> Result<Vec<DocumentType>, DomainError> {
        self.required_legal_document_types_many(&[expense_id])
            .await
            .pop()
            .unwrap_or_else(|| Err(DomainError::expense_not_found(expense_id)))
    }

    /// Batched form. One result per id, in input order; a failure affects only its own id.
    pub async fn required_legal_document_types_many(
        &self,
        expense_ids: &[ExpenseId],
    ) -> Vec<Decision> {
        let records = self.expense_records(expense_ids).await;

        let mut decisions: Vec<Option<Decision>> = vec![None; expense_ids.len()];
        let mut candidates = Vec::new();
        for (index, record) in records.into_iter().enumerate() {
            match record.and_then(|r| self.screen(&r)) {
                Ok(Some((key, amount, counted))) => candidates.push(Candidate {
                    index,
                    key,
                    amount,
                    counted,
                }),
                Ok(None) => decisions[index] = Some(Ok(Vec::new())),
                Err(e) => decisions[index] = Some(Err(e)),
            }
        }

        let requirements = self.load_host_requirements(&candidates).await;
        let mut due: Vec<(usize, AggregateKey, Vec<DocumentType>)> = Vec::new();
        let mut pending = Vec::new();
        for candidate in candidates {
            match requirements.get(&candidate.key.host_id) {
                Some(Ok(types)) if types.is_empty() => {
                    decisions[candidate.index] = Some(Ok(Vec::new()))
                }
                Some(Ok(types)) => pending.push((candidate, types.clone())),
                Some(Err(e)) => decisions[candidate.index] = Some(Err(e.clone())),
                None => {
                    decisions[candidate.index] =
                        Some(Err(DomainError::host_not_found(candidate.key.host_id)))
                }
            }
        }

        let totals = self.load_aggregates(&pending).await;
        for (candidate, types) in pending {
            match totals.get(&candidate.key) {
                Some(Ok(sum)) => {
                    let total = if candidate.counted {
                        *sum
                    } else {
                        sum + candidate.amount
                    };
                    let over: Vec<DocumentType> = types
                        .into_iter()
                        .filter(|t| total >= self.policy.threshold_for(*t))
                        .collect();
                    debug!(
                        expense_index = candidate.index,
                        host_id = candidate.key.host_id,
                        from_collective_id = candidate.key.from_collective_id,
                        year = candidate.key.year,
                        total,
                        "aggregate resolved"
                    );
                    if over.is_empty() {
                        decisions[candidate.index] = Some(Ok(Vec::new()));
                    } else {
                        due.push((candidate.index, candidate.key, over));
                    }
                }
                Some(Err(e)) => decisions[candidate.index] = Some(Err(e.clone())),
                None => {
                    decisions[candidate.index] = Some(Err(DomainError::Query(
                        "aggregate missing from batch".into(),
                    )))
                }
            }
        }

        let received = self.load_received(&due).await;
        for (index, key, types) in due {
            let mut outstanding = BTreeSet::new();
            let mut failure = None;
            for document_type in types {
                let doc_key = LegalDocumentKey {
                    collective_id: key.from_collective_id,
                    year: key.year,
                    document_type,
                };
                match received.get(&doc_key) {
                    Some(Ok(true)) => {}
                    Some(Ok(false)) => {
                        outstanding.insert(document_type);
                    }
                    Some(Err(e)) => failure = Some(e.clone()),
                    None => {
                        failure = Some(DomainError::Query("document lookup missing".into()))
                    }
                }
            }
            decisions[index] = Some(match failure {
                Some(e) => Err(e),
                None => Ok(outstanding.into_iter().collect()),
            });
        }

        decisions
            .into_iter()
            .zip(expense_ids)
            .map(|(decision, id)| {
                decision.unwrap_or_else(|| Err(DomainError::expense_not_found(*id)))
            })
            .collect()
    }

    /// Validate relations and apply the checks that need no further queries.
    ///
    /// Returns the aggregate key, the expense amount and whether the repository
    /// aggregate already includes it, or `None` when no document can be required.
    fn screen(
        &self,
        record: &ExpenseRecord,
    ) -> Result<Option<(AggregateKey, i64, bool)>, DomainError> {
        let expense = &record.expense;
        let collective = record
            .collective
            .as_ref()
            .ok_or_else(|| DomainError::collective_not_found(expense.collective_id))?;
        let from_collective = record
            .from_collective
            .as_ref()
            .ok_or_else(|| DomainError::collective_not_found(expense.from_collective_id))?;
        let Some(host_id) = collective.host_id else {
            return Ok(None);
        };
        if record.host.is_none() {
            return Err(DomainError::host_not_found(host_id));
        }
        if !expense.expense_type.is_subject_to_legal_documents() {
            return Ok(None);
        }
        if from_collective.id == host_id || from_collective.host_id == Some(host_id) {
            return Ok(None);
        }

        let key = AggregateKey {
            host_id,
            from_collective_id: expense.from_collective_id,
            year: fiscal_year(&expense.incurred_at),
        };
        let counted = expense.deleted_at.is_none() && expense.status.counts_toward_aggregate();
        Ok(Some((key, expense.amount, counted)))
    }

    /// Expense rows for `ids`, shared with the evaluation cache of this scope.
    pub async fn expense_records(
        &self,
        ids: &[ExpenseId],
    ) -> Vec<Result<ExpenseRecord, DomainError>> {
        let repo = Arc::clone(&self.repo);
        self.expenses
            .load_many(ids, move |keys| async move {
                let rows = repo.get_expenses(&keys).await?;
                Ok::<_, DomainError>(
                    rows.into_iter()
                        .map(|r| (r.expense.id, r))
                        .collect::<HashMap<_, _>>(),
                )
            })
            .await
    }

    async fn load_host_requirements(
        &self,
        candidates: &[Candidate],
    ) -> HashMap<CollectiveId, Result<Vec<DocumentType>, DomainError>> {
        let mut hosts: Vec<CollectiveId> = candidates.iter().map(|c| c.key.host_id).collect();
        hosts.sort_unstable();
        hosts.dedup();
        if hosts.is_empty() {
            return HashMap::new();
        }

        let repo = Arc::clone(&self.repo);
        let results = self
            .host_requirements
            .load_many(&hosts, move |keys| async move {
                let mut found = repo.get_required_legal_documents(&keys).await?;
                for key in keys {
                    let types = found.entry(key).or_default();
                    types.sort_unstable();
                    types.dedup();
                }
                Ok::<_, DomainError>(found)
            })
            .await;
        hosts.into_iter().zip(results).collect()
    }

    /// One aggregate query per distinct group, issued concurrently.
    async fn load_aggregates(
        &self,
        pending: &[(Candidate, Vec<DocumentType>)],
    ) -> HashMap<AggregateKey, Result<i64, DomainError>> {
        let groups: HashSet<AggregateKey> = pending.iter().map(|(c, _)| c.key).collect();
        let groups: Vec<AggregateKey> = groups.into_iter().collect();
        debug!(groups = groups.len(), "resolving aggregates");

        let loads = groups.iter().map(|key| {
            let repo = Arc::clone(&self.repo);
            self.aggregates.load(*key, move |key| async move {
                let (from, until) = fiscal_year_range(key.year);
                let query = AggregateQuery {
                    host_id: key.host_id,
                    from_collective_id: key.from_collective_id,
                    from,
                    until,
                    excluded_types: ExpenseType::excluded_from_aggregate(),
                    excluded_statuses: ExpenseStatus::excluded_from_aggregate(),
                };
                repo.sum_expenses(&query).await
            })
        });
        let totals = join_all(loads).await;
        groups.into_iter().zip(totals).collect()
    }

    async fn load_received(
        &self,
        due: &[(usize, AggregateKey, Vec<DocumentType>)],
    ) -> HashMap<LegalDocumentKey, Result<bool, DomainError>> {
        let mut keys: Vec<LegalDocumentKey> = due
            .iter()
            .flat_map(|(_, key, types)| {
                types.iter().map(move |t| LegalDocumentKey {
                    collective_id: key.from_collective_id,
                    year: key.year,
                    document_type: *t,
                })
            })
            .collect();
        keys.sort_unstable();
        keys.dedup();
        if keys.is_empty() {
            return HashMap::new();
        }

        let repo = Arc::clone(&self.repo);
        let results = self
            .received
            .load_many(&keys, move |keys| async move {
                let found = repo.find_received_legal_documents(&keys).await?;
                Ok::<_, DomainError>(
                    keys.into_iter()
                        .map(|k| (k, found.contains(&k)))
                        .collect::<HashMap<_, _>>(),
                )
            })
            .await;
        keys.into_iter().zip(results).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::memory_repo::InMemoryRepo;
    use crate::domain::{Expense, LegalDocument, LegalDocumentStatus};
    use chrono::{DateTime, TimeZone, Utc};

    const HOST: CollectiveId = 1;
    const OTHER_HOST: CollectiveId = 2;
    const COLLECTIVE: CollectiveId = 10;
    const SIBLING_COLLECTIVE: CollectiveId = 11;
    const UNCONFIGURED_COLLECTIVE: CollectiveId = 20;
    const PAYEE: CollectiveId = 100;
    const OTHER_PAYEE: CollectiveId = 101;
    const THRESHOLD: i64 = 600_00;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn expense(
        id: ExpenseId,
        collective_id: CollectiveId,
        from: CollectiveId,
        amount: i64,
        expense_type: ExpenseType,
        incurred_at: DateTime<Utc>,
    ) -> Expense {
        Expense {
            id,
            collective_id,
            from_collective_id: from,
            amount,
            expense_type,
            status: ExpenseStatus::Pending,
            incurred_at,
            deleted_at: None,
        }
    }

    fn invoice(id: ExpenseId, from: CollectiveId, amount: i64, when: DateTime<Utc>) -> Expense {
        expense(id, COLLECTIVE, from, amount, ExpenseType::Invoice, when)
    }

    fn received(collective_id: CollectiveId, year: i32) -> LegalDocument {
        LegalDocument {
            collective_id,
            year,
            document_type: DocumentType::UsTaxForm,
            request_status: LegalDocumentStatus::Received,
        }
    }

    /// Host 1 requires US tax forms; host 2 has no configuration.
    fn base_repo() -> InMemoryRepo {
        InMemoryRepo::new()
            .with_collective(HOST, Some(HOST))
            .with_collective(OTHER_HOST, Some(OTHER_HOST))
            .with_collective(COLLECTIVE, Some(HOST))
            .with_collective(SIBLING_COLLECTIVE, Some(HOST))
            .with_collective(UNCONFIGURED_COLLECTIVE, Some(OTHER_HOST))
            .with_collective(PAYEE, None)
            .with_collective(OTHER_PAYEE, None)
            .with_requirement(HOST, DocumentType::UsTaxForm)
    }

    fn evaluator(repo: Arc<InMemoryRepo>) -> LegalDocumentEvaluator {
        LegalDocumentEvaluator::new(repo, DocumentPolicy::default())
    }

    #[tokio::test]
    async fn test_host_without_configuration_never_requires() {
        let repo = Arc::new(base_repo().with_expense(expense(
            1,
            UNCONFIGURED_COLLECTIVE,
            PAYEE,
            10 * THRESHOLD,
            ExpenseType::Invoice,
            at(2023, 5, 1),
        )));
        let scope = evaluator(Arc::clone(&repo)).scope();
        assert_eq!(
            scope.is_legal_document_required_before_payment(1).await,
            Ok(false)
        );
        assert_eq!(repo.calls().sum_expenses, 0);
    }

    #[tokio::test]
    async fn test_receipt_never_requires() {
        let repo = Arc::new(base_repo().with_expense(expense(
            1,
            COLLECTIVE,
            PAYEE,
            10 * THRESHOLD,
            ExpenseType::Receipt,
            at(2023, 5, 1),
        )));
        let scope = evaluator(Arc::clone(&repo)).scope();
        assert_eq!(scope.required_legal_document_types(1).await, Ok(vec![]));
        assert_eq!(repo.calls().sum_expenses, 0);
    }

    #[tokio::test]
    async fn test_receipts_do_not_count_toward_threshold() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD - 100, at(2023, 2, 1)))
                .with_expense(expense(
                    2,
                    COLLECTIVE,
                    PAYEE,
                    5_000,
                    ExpenseType::Receipt,
                    at(2023, 3, 1),
                )),
        );
        let scope = evaluator(repo).scope();
        assert_eq!(
            scope.is_legal_document_required_before_payment(1).await,
            Ok(false)
        );
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD - 1, at(2023, 5, 1)))
                .with_expense(invoice(2, OTHER_PAYEE, THRESHOLD, at(2023, 5, 1))),
        );
        let scope = evaluator(repo).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        assert_eq!(results, vec![Ok(false), Ok(true)]);
    }

    #[tokio::test]
    async fn test_split_expenses_sum_to_threshold() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD - 100, at(2023, 2, 1)))
                .with_expense(expense(
                    2,
                    SIBLING_COLLECTIVE,
                    PAYEE,
                    200,
                    ExpenseType::Invoice,
                    at(2023, 9, 1),
                )),
        );
        let scope = evaluator(repo).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        assert_eq!(results, vec![Ok(true), Ok(true)]);
    }

    #[tokio::test]
    async fn test_unclassified_and_funding_request_count_like_invoices() {
        let repo = Arc::new(
            base_repo()
                .with_expense(expense(
                    1,
                    COLLECTIVE,
                    PAYEE,
                    THRESHOLD / 2,
                    ExpenseType::Unclassified,
                    at(2023, 2, 1),
                ))
                .with_expense(expense(
                    2,
                    COLLECTIVE,
                    PAYEE,
                    THRESHOLD / 2,
                    ExpenseType::FundingRequest,
                    at(2023, 3, 1),
                )),
        );
        let scope = evaluator(repo).scope();
        assert_eq!(
            scope.required_legal_document_types_many(&[1, 2]).await,
            vec![
                Ok(vec![DocumentType::UsTaxForm]),
                Ok(vec![DocumentType::UsTaxForm])
            ]
        );
    }

    #[tokio::test]
    async fn test_document_for_later_year_does_not_satisfy() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD + 1, at(2023, 6, 1)))
                .with_expense(invoice(2, PAYEE, THRESHOLD + 1, at(2024, 6, 1)))
                .with_document(received(PAYEE, 2024)),
        );
        let scope = evaluator(repo).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        assert_eq!(results, vec![Ok(true), Ok(false)]);
    }

    #[tokio::test]
    async fn test_year_boundary_splits_aggregate() {
        let dec_31 = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let jan_1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD - 100, dec_31))
                .with_expense(invoice(2, PAYEE, THRESHOLD - 100, jan_1)),
        );
        let scope = evaluator(Arc::clone(&repo)).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        assert_eq!(results, vec![Ok(false), Ok(false)]);
        assert_eq!(repo.calls().sum_expenses, 2);
    }

    #[tokio::test]
    async fn test_received_document_satisfies_whole_year() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD, at(2023, 2, 1)))
                .with_expense(invoice(2, PAYEE, 500, at(2023, 8, 1)))
                .with_document(received(PAYEE, 2023)),
        );
        let scope = evaluator(repo).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        assert_eq!(results, vec![Ok(false), Ok(false)]);
    }

    #[tokio::test]
    async fn test_requested_document_does_not_satisfy() {
        let mut doc = received(PAYEE, 2023);
        doc.request_status = LegalDocumentStatus::Requested;
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD, at(2023, 2, 1)))
                .with_document(doc),
        );
        let scope = evaluator(repo).scope();
        assert_eq!(
            scope.is_legal_document_required_before_payment(1).await,
            Ok(true)
        );
    }

    #[tokio::test]
    async fn test_batch_results_stay_isolated() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD - 100, at(2023, 2, 1)))
                .with_expense(invoice(2, PAYEE, 200, at(2023, 3, 1)))
                .with_expense(expense(
                    3,
                    UNCONFIGURED_COLLECTIVE,
                    PAYEE,
                    THRESHOLD * 3,
                    ExpenseType::Invoice,
                    at(2023, 4, 1),
                )),
        );
        let scope = evaluator(Arc::clone(&repo)).scope();
        let results = scope.required_legal_document_types_many(&[1, 2, 3]).await;
        assert_eq!(
            results,
            vec![
                Ok(vec![DocumentType::UsTaxForm]),
                Ok(vec![DocumentType::UsTaxForm]),
                Ok(vec![]),
            ]
        );

        let calls = repo.calls();
        assert_eq!(calls.get_expenses, 1);
        assert_eq!(calls.get_required_legal_documents, 1);
        assert_eq!(calls.sum_expenses, 1);
        assert_eq!(calls.find_received_legal_documents, 1);
    }

    #[tokio::test]
    async fn test_submitters_do_not_share_aggregates() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD, at(2023, 2, 1)))
                .with_expense(invoice(2, OTHER_PAYEE, 100, at(2023, 2, 1))),
        );
        let scope = evaluator(Arc::clone(&repo)).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        assert_eq!(results, vec![Ok(true), Ok(false)]);
        assert_eq!(repo.calls().sum_expenses, 2);
    }

    #[tokio::test]
    async fn test_duplicate_ids_yield_identical_results() {
        let repo =
            Arc::new(base_repo().with_expense(invoice(1, PAYEE, THRESHOLD, at(2023, 2, 1))));
        let scope = evaluator(Arc::clone(&repo)).scope();
        let results = scope.required_legal_document_types_many(&[1, 1]).await;
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], Ok(vec![DocumentType::UsTaxForm]));

        // Second lookup within the same scope is served from the cache.
        assert_eq!(
            scope.is_legal_document_required_before_payment(1).await,
            Ok(true)
        );
        let calls = repo.calls();
        assert_eq!(calls.get_expenses, 1);
        assert_eq!(calls.sum_expenses, 1);
    }

    #[tokio::test]
    async fn test_new_scope_does_not_reuse_previous_results() {
        let repo =
            Arc::new(base_repo().with_expense(invoice(1, PAYEE, THRESHOLD, at(2023, 2, 1))));
        let evaluator = evaluator(Arc::clone(&repo));
        for _ in 0..2 {
            let scope = evaluator.scope();
            assert_eq!(
                scope.is_legal_document_required_before_payment(1).await,
                Ok(true)
            );
        }
        assert_eq!(repo.calls().get_expenses, 2);
        assert_eq!(repo.calls().sum_expenses, 2);
    }

    #[tokio::test]
    async fn test_unknown_expense_fails_alone() {
        let repo =
            Arc::new(base_repo().with_expense(invoice(1, PAYEE, THRESHOLD, at(2023, 2, 1))));
        let scope = evaluator(repo).scope();
        let results = scope.required_legal_document_types_many(&[1, 999]).await;
        assert_eq!(results[0], Ok(vec![DocumentType::UsTaxForm]));
        assert_eq!(results[1], Err(DomainError::expense_not_found(999)));
    }

    #[tokio::test]
    async fn test_missing_host_row_is_not_found() {
        let repo = Arc::new(
            base_repo()
                .with_collective(30, Some(77))
                .with_expense(expense(
                    1,
                    30,
                    PAYEE,
                    THRESHOLD,
                    ExpenseType::Invoice,
                    at(2023, 2, 1),
                )),
        );
        let scope = evaluator(repo).scope();
        assert_eq!(
            scope.is_legal_document_required_before_payment(1).await,
            Err(DomainError::host_not_found(77))
        );
    }

    #[tokio::test]
    async fn test_missing_collective_is_not_found() {
        let repo = Arc::new(base_repo().with_expense(expense(
            1,
            COLLECTIVE,
            555,
            THRESHOLD,
            ExpenseType::Invoice,
            at(2023, 2, 1),
        )));
        let scope = evaluator(repo).scope();
        assert_eq!(
            scope.is_legal_document_required_before_payment(1).await,
            Err(DomainError::collective_not_found(555))
        );
    }

    #[tokio::test]
    async fn test_query_failure_surfaces_for_its_key_only() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, PAYEE, THRESHOLD, at(2023, 2, 1)))
                .with_expense(invoice(2, OTHER_PAYEE, THRESHOLD, at(2023, 2, 1)))
                .with_failing_aggregate(PAYEE),
        );
        let scope = evaluator(repo).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        assert_eq!(
            results,
            vec![Err(DomainError::Query("connection lost".into())), Ok(true)]
        );
    }

    #[tokio::test]
    async fn test_hosted_payees_are_exempt() {
        let repo = Arc::new(
            base_repo()
                .with_expense(invoice(1, HOST, THRESHOLD * 2, at(2023, 2, 1)))
                .with_expense(invoice(2, SIBLING_COLLECTIVE, THRESHOLD * 2, at(2023, 2, 1))),
        );
        let scope = evaluator(repo).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        assert_eq!(results, vec![Ok(false), Ok(false)]);
    }

    #[tokio::test]
    async fn test_expense_under_evaluation_counts_whatever_its_status() {
        let mut rejected = invoice(1, PAYEE, THRESHOLD - 1_000, at(2023, 2, 1));
        rejected.status = ExpenseStatus::Rejected;
        let repo = Arc::new(
            base_repo()
                .with_expense(rejected)
                .with_expense(invoice(2, PAYEE, 1_000, at(2023, 3, 1))),
        );
        let scope = evaluator(repo).scope();
        let results = scope
            .is_legal_document_required_before_payment_many(&[1, 2])
            .await;
        // The rejected expense is left out of expense 2's total, but not its own.
        assert_eq!(results, vec![Ok(true), Ok(false)]);
    }

    #[tokio::test]
    async fn test_configured_threshold_is_used() {
        let repo = Arc::new(base_repo().with_expense(invoice(1, PAYEE, 10_000, at(2023, 2, 1))));
        let policy = DocumentPolicy {
            us_tax_form_threshold_cents: 10_000,
        };
        let scope = LegalDocumentEvaluator::new(repo, policy).scope();
        assert_eq!(
            scope.is_legal_document_required_before_payment(1).await,
            Ok(true)
        );
    }
}
