//! Domain entities. Pure data structures for the compliance core.
//!
//! No database types here — rows are mapped by the persistence adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::DomainError;

pub type ExpenseId = i64;
pub type CollectiveId = i64;

/// A fiscal entity. Hosts are collectives too; a host usually hosts itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collective {
    pub id: CollectiveId,
    /// Host administering this collective. `None` for unhosted collectives.
    #[serde(default)]
    pub host_id: Option<CollectiveId>,
}

/// A payment request submitted by `from_collective_id` against `collective_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub collective_id: CollectiveId,
    pub from_collective_id: CollectiveId,
    /// Amount in the smallest currency unit (cents).
    pub amount: i64,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub status: ExpenseStatus,
    pub incurred_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Expense joined with the collectives it references.
///
/// Each relation is optional so the evaluator can tell which entity is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRecord {
    pub expense: Expense,
    /// Target collective (`expense.collective_id`).
    pub collective: Option<Collective>,
    /// Submitting party (`expense.from_collective_id`).
    pub from_collective: Option<Collective>,
    /// Host of the target collective, when the collective names one.
    pub host: Option<Collective>,
}

/// Host configuration row: payees of this host's collectives must file `document_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredLegalDocument {
    pub host_id: CollectiveId,
    pub document_type: DocumentType,
}

/// A document filed by a submitting party for one fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalDocument {
    pub collective_id: CollectiveId,
    pub year: i32,
    pub document_type: DocumentType,
    pub request_status: LegalDocumentStatus,
}

/// Lookup key for a filed document: (submitter, fiscal year, type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LegalDocumentKey {
    pub collective_id: CollectiveId,
    pub year: i32,
    pub document_type: DocumentType,
}

/// Declares a closed string-backed enum with `as_str`, `FromStr`, `Display`
/// and an `ALL` table listing every variant.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::Input(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum! {
    pub enum ExpenseType {
        Invoice => "INVOICE",
        Receipt => "RECEIPT",
        Unclassified => "UNCLASSIFIED",
        FundingRequest => "FUNDING_REQUEST",
        Grant => "GRANT",
    }
}

named_enum! {
    pub enum ExpenseStatus {
        Draft => "DRAFT",
        Unverified => "UNVERIFIED",
        Pending => "PENDING",
        Approved => "APPROVED",
        ScheduledForPayment => "SCHEDULED_FOR_PAYMENT",
        Processing => "PROCESSING",
        Paid => "PAID",
        Rejected => "REJECTED",
        Error => "ERROR",
        Spam => "SPAM",
        Canceled => "CANCELED",
    }
}

named_enum! {
    /// Compliance document a host can require from payees.
    pub enum DocumentType {
        UsTaxForm => "US_TAX_FORM",
    }
}

named_enum! {
    pub enum LegalDocumentStatus {
        Requested => "REQUESTED",
        Received => "RECEIVED",
        Error => "ERROR",
        Invalid => "INVALID",
        Expired => "EXPIRED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_names_round_trip() {
        for t in ExpenseType::ALL {
            assert_eq!(t.as_str().parse::<ExpenseType>().unwrap(), *t);
        }
        for s in ExpenseStatus::ALL {
            assert_eq!(s.as_str().parse::<ExpenseStatus>().unwrap(), *s);
        }
        for d in DocumentType::ALL {
            assert_eq!(d.as_str().parse::<DocumentType>().unwrap(), *d);
        }
        for s in LegalDocumentStatus::ALL {
            assert_eq!(s.as_str().parse::<LegalDocumentStatus>().unwrap(), *s);
        }
    }

    #[test]
    fn test_unknown_name_is_input_error() {
        let err = "W9".parse::<DocumentType>().unwrap_err();
        assert!(matches!(err, DomainError::Input(_)));
    }

    #[test]
    fn test_serde_uses_database_names() {
        let json = serde_json::to_string(&ExpenseType::FundingRequest).unwrap();
        assert_eq!(json, "\"FUNDING_REQUEST\"");
        let doc: DocumentType = serde_json::from_str("\"US_TAX_FORM\"").unwrap();
        assert_eq!(doc, DocumentType::UsTaxForm);
    }
}
