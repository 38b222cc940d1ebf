//! CSV export for outstanding-document reports. Uses the `csv` crate for quoting.
//!
//! Format: `ExpenseId;Submitter;Year;Amount;Required;Error` (semicolon-delimited).

use crate::domain::DomainError;
use crate::usecases::ReportRow;

/// Render report rows as CSV with a header row.
pub fn report_to_csv(rows: &[ReportRow]) -> Result<String, DomainError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(["ExpenseId", "Submitter", "Year", "Amount", "Required", "Error"])
        .map_err(export_error)?;

    for row in rows {
        let submitter = row
            .from_collective_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let amount = row.amount.map(format_cents).unwrap_or_default();
        let (required, error) = match &row.outcome {
            Ok(types) => (
                types
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                String::new(),
            ),
            Err(e) => (String::new(), e.to_string()),
        };

        wtr.write_record([
            row.expense_id.to_string(),
            submitter,
            row.year.to_string(),
            amount,
            required,
            error,
        ])
        .map_err(export_error)?;
    }

    wtr.flush().map_err(|e| DomainError::Export(e.to_string()))?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| DomainError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DomainError::Export(e.to_string()))
}

fn export_error(e: csv::Error) -> DomainError {
    DomainError::Export(e.to_string())
}

/// `123456` -> `1234.56`
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentType;

    fn row(expense_id: i64, outcome: Result<Vec<DocumentType>, DomainError>) -> ReportRow {
        ReportRow {
            expense_id,
            from_collective_id: Some(100),
            year: 2023,
            amount: Some(60_000),
            outcome,
        }
    }

    #[test]
    fn test_report_to_csv_basic() {
        let csv = report_to_csv(&[
            row(1, Ok(vec![DocumentType::UsTaxForm])),
            row(2, Ok(vec![])),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ExpenseId;Submitter;Year;Amount;Required;Error");
        assert_eq!(lines[1], "1;100;2023;600.00;US_TAX_FORM;");
        assert_eq!(lines[2], "2;100;2023;600.00;;");
    }

    #[test]
    fn test_report_to_csv_error_row() {
        let csv = report_to_csv(&[row(9, Err(DomainError::expense_not_found(9)))]).unwrap();
        assert!(csv.contains("expense 9 not found"));
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(60_000), "600.00");
        assert_eq!(format_cents(-1_234), "-12.34");
    }
}
