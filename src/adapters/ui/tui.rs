//! Implements InputPort. Inquire-based interactive menu.
//!
//! Each menu action runs in its own request scope.

use crate::adapters::report::report_to_csv;
use crate::adapters::ui::output::{decision_lines, parse_expense_ids};
use crate::domain::{CollectiveId, DomainError};
use crate::ports::InputPort;
use crate::usecases::{LegalDocumentEvaluator, ReportService};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use inquire::{CustomType, Select, Text};
use std::sync::Arc;

const CHECK: &str = "Check expenses";
const REPORT: &str = "Host report";
const QUIT: &str = "Quit";

fn prompt_error(e: inquire::InquireError) -> DomainError {
    DomainError::Input(e.to_string())
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    evaluator: Arc<LegalDocumentEvaluator>,
    reports: Arc<ReportService>,
}

impl TuiInputPort {
    pub fn new(evaluator: Arc<LegalDocumentEvaluator>, reports: Arc<ReportService>) -> Self {
        Self { evaluator, reports }
    }

    async fn run_check(&self) -> Result<(), DomainError> {
        let raw = Text::new("Expense ids (comma separated):")
            .prompt()
            .map_err(prompt_error)?;
        let ids = parse_expense_ids(&raw)?;
        let scope = self.evaluator.scope();
        let outcomes = scope.required_legal_document_types_many(&ids).await;
        for line in decision_lines(&ids, &outcomes)? {
            println!("{}", line);
        }
        Ok(())
    }

    async fn run_report(&self) -> Result<(), DomainError> {
        let host_id = CustomType::<CollectiveId>::new("Host id:")
            .prompt()
            .map_err(prompt_error)?;
        let year = CustomType::<i32>::new("Fiscal year:")
            .with_default(Utc::now().year())
            .prompt()
            .map_err(prompt_error)?;
        let rows = self.reports.outstanding_for_host(host_id, year).await?;
        print!("{}", report_to_csv(&rows)?);
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let choice = Select::new("What do you want to do?", vec![CHECK, REPORT, QUIT])
                .prompt()
                .map_err(prompt_error)?;
            let result = match choice {
                CHECK => self.run_check().await,
                REPORT => self.run_report().await,
                _ => return Ok(()),
            };
            if let Err(e) = result {
                eprintln!("error: {}", e);
            }
        }
    }
}
