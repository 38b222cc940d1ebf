//! JSON-lines rendering of evaluation results for the terminal.

use crate::domain::{DocumentType, DomainError, ExpenseId};
use serde::Serialize;

/// One decision as printed by `check`.
#[derive(Debug, Serialize)]
pub struct DecisionLine {
    pub expense_id: ExpenseId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_types: Option<Vec<DocumentType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecisionLine {
    pub fn new(expense_id: ExpenseId, outcome: &Result<Vec<DocumentType>, DomainError>) -> Self {
        match outcome {
            Ok(types) => Self {
                expense_id,
                required: Some(!types.is_empty()),
                document_types: Some(types.clone()),
                error: None,
            },
            Err(e) => Self {
                expense_id,
                required: None,
                document_types: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Render one JSON object per expense, in input order.
pub fn decision_lines(
    ids: &[ExpenseId],
    outcomes: &[Result<Vec<DocumentType>, DomainError>],
) -> Result<Vec<String>, DomainError> {
    ids.iter()
        .zip(outcomes)
        .map(|(id, outcome)| {
            serde_json::to_string(&DecisionLine::new(*id, outcome))
                .map_err(|e| DomainError::Export(e.to_string()))
        })
        .collect()
}

/// Parse `"1, 2 3"` into expense ids. Accepts commas and whitespace as separators.
pub fn parse_expense_ids(raw: &str) -> Result<Vec<ExpenseId>, DomainError> {
    let ids: Vec<ExpenseId> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ExpenseId>()
                .map_err(|_| DomainError::Input(format!("invalid expense id '{}'", s)))
        })
        .collect::<Result<_, _>>()?;
    if ids.is_empty() {
        return Err(DomainError::Input("no expense ids given".into()));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expense_ids() {
        assert_eq!(parse_expense_ids("1, 2 3,,4").unwrap(), vec![1, 2, 3, 4]);
        assert!(matches!(parse_expense_ids("1, x"), Err(DomainError::Input(_))));
        assert!(matches!(parse_expense_ids("  "), Err(DomainError::Input(_))));
    }

    #[test]
    fn test_decision_lines() {
        let lines = decision_lines(
            &[1, 2],
            &[
                Ok(vec![DocumentType::UsTaxForm]),
                Err(DomainError::expense_not_found(2)),
            ],
        )
        .unwrap();
        assert_eq!(
            lines[0],
            r#"{"expense_id":1,"required":true,"document_types":["US_TAX_FORM"]}"#
        );
        assert_eq!(lines[1], r#"{"expense_id":2,"error":"expense 2 not found"}"#);
    }
}
