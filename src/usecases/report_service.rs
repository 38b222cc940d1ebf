//! Outstanding-document report for one host and fiscal year.
//!
//! Evaluates every expense of the host's collectives inside a single request
//! scope, so the whole report costs one query per distinct submitter.

use crate::domain::{CollectiveId, DocumentType, DomainError, ExpenseId, fiscal_year};
use crate::ports::ComplianceRepoPort;
use crate::usecases::LegalDocumentEvaluator;
use std::sync::Arc;
use tracing::{info, warn};

/// One report line. `outcome` holds the outstanding types or the evaluation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub expense_id: ExpenseId,
    pub from_collective_id: Option<CollectiveId>,
    pub year: i32,
    pub amount: Option<i64>,
    pub outcome: Result<Vec<DocumentType>, DomainError>,
}

impl ReportRow {
    pub fn is_blocked(&self) -> bool {
        matches!(&self.outcome, Ok(types) if !types.is_empty())
    }
}

pub struct ReportService {
    repo: Arc<dyn ComplianceRepoPort>,
    evaluator: Arc<LegalDocumentEvaluator>,
}

impl ReportService {
    pub fn new(repo: Arc<dyn ComplianceRepoPort>, evaluator: Arc<LegalDocumentEvaluator>) -> Self {
        Self { repo, evaluator }
    }

    /// Rows for every expense of `host_id` incurred in `year`, ordered by expense id.
    pub async fn outstanding_for_host(
        &self,
        host_id: CollectiveId,
        year: i32,
    ) -> Result<Vec<ReportRow>, DomainError> {
        let ids = self.repo.list_host_expense_ids(host_id, year).await?;
        if ids.is_empty() {
            info!(host_id, year, "no expenses for host in year");
            return Ok(Vec::new());
        }

        let scope = self.evaluator.scope();
        let outcomes = scope.required_legal_document_types_many(&ids).await;
        let records = scope.expense_records(&ids).await;

        let rows: Vec<ReportRow> = ids
            .into_iter()
            .zip(outcomes)
            .zip(records)
            .map(|((expense_id, outcome), record)| {
                let record = record.ok();
                ReportRow {
                    expense_id,
                    from_collective_id: record.as_ref().map(|r| r.expense.from_collective_id),
                    year: record
                        .as_ref()
                        .map(|r| fiscal_year(&r.expense.incurred_at))
                        .unwrap_or(year),
                    amount: record.as_ref().map(|r| r.expense.amount),
                    outcome,
                }
            })
            .collect();

        let blocked = rows.iter().filter(|r| r.is_blocked()).count();
        let failed = rows.iter().filter(|r| r.outcome.is_err()).count();
        if failed > 0 {
            warn!(host_id, year, failed, "some expenses could not be evaluated");
        }
        info!(
            host_id,
            year,
            expenses = rows.len(),
            blocked,
            "report generated"
        );
        Ok(rows)
    }
}
