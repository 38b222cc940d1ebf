//! SQLite-backed repository via libsql. Implements ComplianceRepoPort with
//! parameterized aggregate queries.
//!
//! One database file (compliance.db) holds collectives, expenses, host
//! requirements and filed legal documents. Timestamps are stored as Unix seconds
//! so fiscal-year ranges compare as integers.

use crate::adapters::persistence::fixture::Fixture;
use crate::domain::{
    Collective, CollectiveId, DocumentType, DomainError, Expense, ExpenseId, ExpenseRecord,
    LegalDocumentKey, LegalDocumentStatus, fiscal_year_range,
};
use crate::ports::{AggregateQuery, ComplianceRepoPort};
use chrono::{DateTime, Utc};
use libsql::params::Params;
use libsql::{Connection, Database, Row, Value, params};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COLLECTIVES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS collectives (
    id INTEGER PRIMARY KEY,
    host_collective_id INTEGER
)"#;

const EXPENSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
    id INTEGER PRIMARY KEY,
    collective_id INTEGER NOT NULL,
    from_collective_id INTEGER NOT NULL,
    amount INTEGER NOT NULL,
    type TEXT NOT NULL,
    status TEXT NOT NULL,
    incurred_at INTEGER NOT NULL,
    deleted_at INTEGER
)"#;
const EXPENSES_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_expenses_submitter_incurred ON expenses (from_collective_id, incurred_at)";

const REQUIRED_LEGAL_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS required_legal_documents (
    host_collective_id INTEGER NOT NULL,
    document_type TEXT NOT NULL,
    PRIMARY KEY (host_collective_id, document_type)
)"#;

const LEGAL_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS legal_documents (
    collective_id INTEGER NOT NULL,
    year INTEGER NOT NULL,
    document_type TEXT NOT NULL,
    request_status TEXT NOT NULL,
    PRIMARY KEY (collective_id, year, document_type)
)"#;

/// SQLite repository. Safe to share via Arc; each call opens its own connection.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
}

impl SqliteRepo {
    /// Connect to (or create) `compliance.db` in `base_dir` and ensure the schema exists.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Query(e.to_string()))?;
        let db_path = base.join("compliance.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(query_error)?;
        let conn = db.connect().map_err(query_error)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Query(format!("WAL pragma failed: {}", e)))?;
        while wal_rows.next().await.map_err(query_error)?.is_some() {}

        for ddl in [
            COLLECTIVES_TABLE,
            EXPENSES_TABLE,
            EXPENSES_INDEX,
            REQUIRED_LEGAL_DOCUMENTS_TABLE,
            LEGAL_DOCUMENTS_TABLE,
        ] {
            conn.execute(ddl, ()).await.map_err(query_error)?;
        }

        info!(path = %db_path.display(), "SQLite connected with WAL mode");

        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(query_error)
    }

    /// Upsert every row of the fixture in one transaction.
    pub async fn import(&self, fixture: &Fixture) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let tx = conn.transaction().await.map_err(query_error)?;

        for c in &fixture.collectives {
            tx.execute(
                r#"
                INSERT INTO collectives (id, host_collective_id) VALUES (?1, ?2)
                ON CONFLICT (id) DO UPDATE SET host_collective_id = excluded.host_collective_id
                "#,
                params![c.id, c.host_id],
            )
            .await
            .map_err(query_error)?;
        }

        for e in &fixture.expenses {
            tx.execute(
                r#"
                INSERT INTO expenses (id, collective_id, from_collective_id, amount, type, status, incurred_at, deleted_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT (id) DO UPDATE SET
                    collective_id = excluded.collective_id,
                    from_collective_id = excluded.from_collective_id,
                    amount = excluded.amount,
                    type = excluded.type,
                    status = excluded.status,
                    incurred_at = excluded.incurred_at,
                    deleted_at = excluded.deleted_at
                "#,
                params![
                    e.id,
                    e.collective_id,
                    e.from_collective_id,
                    e.amount,
                    e.expense_type.as_str(),
                    e.status.as_str(),
                    e.incurred_at.timestamp(),
                    e.deleted_at.map(|d| d.timestamp())
                ],
            )
            .await
            .map_err(query_error)?;
        }

        for r in &fixture.required_legal_documents {
            tx.execute(
                r#"
                INSERT INTO required_legal_documents (host_collective_id, document_type)
                VALUES (?1, ?2)
                ON CONFLICT (host_collective_id, document_type) DO NOTHING
                "#,
                params![r.host_id, r.document_type.as_str()],
            )
            .await
            .map_err(query_error)?;
        }

        for d in &fixture.legal_documents {
            tx.execute(
                r#"
                INSERT INTO legal_documents (collective_id, year, document_type, request_status)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (collective_id, year, document_type) DO UPDATE SET
                    request_status = excluded.request_status
                "#,
                params![
                    d.collective_id,
                    d.year,
                    d.document_type.as_str(),
                    d.request_status.as_str()
                ],
            )
            .await
            .map_err(query_error)?;
        }

        tx.commit().await.map_err(query_error)?;
        info!(
            collectives = fixture.collectives.len(),
            expenses = fixture.expenses.len(),
            required = fixture.required_legal_documents.len(),
            documents = fixture.legal_documents.len(),
            "fixture imported"
        );
        Ok(())
    }

    fn expense_from_row(row: &Row) -> Result<Expense, DomainError> {
        let expense_type: String = row.get(4).map_err(query_error)?;
        let status: String = row.get(5).map_err(query_error)?;
        Ok(Expense {
            id: row.get(0).map_err(query_error)?,
            collective_id: row.get(1).map_err(query_error)?,
            from_collective_id: row.get(2).map_err(query_error)?,
            amount: row.get(3).map_err(query_error)?,
            expense_type: expense_type.parse()?,
            status: status.parse()?,
            incurred_at: timestamp(row.get(6).map_err(query_error)?)?,
            deleted_at: opt_i64(row, 7)?.map(timestamp).transpose()?,
        })
    }

    /// Collective from an `(id, host_collective_id)` pair of LEFT JOIN columns.
    fn collective_from_row(row: &Row, idx: i32) -> Result<Option<Collective>, DomainError> {
        opt_i64(row, idx)?
            .map(|id| {
                Ok(Collective {
                    id,
                    host_id: opt_i64(row, idx + 1)?,
                })
            })
            .transpose()
    }
}

fn query_error(e: libsql::Error) -> DomainError {
    DomainError::Query(e.to_string())
}

fn opt_i64(row: &Row, idx: i32) -> Result<Option<i64>, DomainError> {
    match row.get_value(idx).map_err(query_error)? {
        Value::Null => Ok(None),
        Value::Integer(v) => Ok(Some(v)),
        other => Err(DomainError::Query(format!(
            "column {} is not an integer: {:?}",
            idx, other
        ))),
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| DomainError::Query(format!("invalid timestamp {}", secs)))
}

/// `?, ?, ?` for `n` positional parameters.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[async_trait::async_trait]
impl ComplianceRepoPort for SqliteRepo {
    async fn get_expenses(&self, ids: &[ExpenseId]) -> Result<Vec<ExpenseRecord>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT e.id, e.collective_id, e.from_collective_id, e.amount, e.type, e.status,
                   e.incurred_at, e.deleted_at,
                   c.id, c.host_collective_id,
                   f.id, f.host_collective_id,
                   h.id, h.host_collective_id
            FROM expenses e
            LEFT JOIN collectives c ON c.id = e.collective_id
            LEFT JOIN collectives f ON f.id = e.from_collective_id
            LEFT JOIN collectives h ON h.id = c.host_collective_id
            WHERE e.id IN ({})
            "#,
            placeholders(ids.len())
        );
        let values: Vec<Value> = ids.iter().map(|id| Value::Integer(*id)).collect();
        let conn = self.conn()?;
        let mut rows = conn
            .query(&sql, Params::Positional(values))
            .await
            .map_err(query_error)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_error)? {
            records.push(ExpenseRecord {
                expense: Self::expense_from_row(&row)?,
                collective: Self::collective_from_row(&row, 8)?,
                from_collective: Self::collective_from_row(&row, 10)?,
                host: Self::collective_from_row(&row, 12)?,
            });
        }
        debug!(requested = ids.len(), found = records.len(), "expenses loaded");
        Ok(records)
    }

    async fn get_required_legal_documents(
        &self,
        host_ids: &[CollectiveId],
    ) -> Result<HashMap<CollectiveId, Vec<DocumentType>>, DomainError> {
        if host_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT host_collective_id, document_type FROM required_legal_documents WHERE host_collective_id IN ({})",
            placeholders(host_ids.len())
        );
        let values: Vec<Value> = host_ids.iter().map(|id| Value::Integer(*id)).collect();
        let conn = self.conn()?;
        let mut rows = conn
            .query(&sql, Params::Positional(values))
            .await
            .map_err(query_error)?;

        let mut out: HashMap<CollectiveId, Vec<DocumentType>> = HashMap::new();
        while let Some(row) = rows.next().await.map_err(query_error)? {
            let host_id: i64 = row.get(0).map_err(query_error)?;
            let document_type: String = row.get(1).map_err(query_error)?;
            out.entry(host_id).or_default().push(document_type.parse()?);
        }
        Ok(out)
    }

    async fn sum_expenses(&self, query: &AggregateQuery) -> Result<i64, DomainError> {
        let mut sql = String::from(
            r#"
            SELECT COALESCE(SUM(e.amount), 0)
            FROM expenses e
            JOIN collectives c ON c.id = e.collective_id
            WHERE e.from_collective_id = ?
              AND c.host_collective_id = ?
              AND e.incurred_at >= ?
              AND e.incurred_at < ?
              AND e.deleted_at IS NULL
            "#,
        );
        let mut values = vec![
            Value::Integer(query.from_collective_id),
            Value::Integer(query.host_id),
            Value::Integer(query.from.timestamp()),
            Value::Integer(query.until.timestamp()),
        ];
        if !query.excluded_types.is_empty() {
            sql.push_str(&format!(
                " AND e.type NOT IN ({})",
                placeholders(query.excluded_types.len())
            ));
            values.extend(
                query
                    .excluded_types
                    .iter()
                    .map(|t| Value::Text(t.as_str().to_string())),
            );
        }
        if !query.excluded_statuses.is_empty() {
            sql.push_str(&format!(
                " AND e.status NOT IN ({})",
                placeholders(query.excluded_statuses.len())
            ));
            values.extend(
                query
                    .excluded_statuses
                    .iter()
                    .map(|s| Value::Text(s.as_str().to_string())),
            );
        }

        let conn = self.conn()?;
        let mut rows = conn
            .query(&sql, Params::Positional(values))
            .await
            .map_err(query_error)?;
        let total = match rows.next().await.map_err(query_error)? {
            Some(row) => row.get::<i64>(0).map_err(query_error)?,
            None => 0,
        };
        debug!(
            host_id = query.host_id,
            from_collective_id = query.from_collective_id,
            total,
            "aggregate computed"
        );
        Ok(total)
    }

    async fn find_received_legal_documents(
        &self,
        keys: &[LegalDocumentKey],
    ) -> Result<HashSet<LegalDocumentKey>, DomainError> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        let mut collectives: Vec<i64> = keys.iter().map(|k| k.collective_id).collect();
        collectives.sort_unstable();
        collectives.dedup();
        let statuses = LegalDocumentStatus::fulfilling();

        let sql = format!(
            r#"
            SELECT collective_id, year, document_type
            FROM legal_documents
            WHERE request_status IN ({}) AND collective_id IN ({})
            "#,
            placeholders(statuses.len()),
            placeholders(collectives.len())
        );
        let mut values: Vec<Value> = statuses
            .iter()
            .map(|s| Value::Text(s.as_str().to_string()))
            .collect();
        values.extend(collectives.iter().map(|id| Value::Integer(*id)));

        let conn = self.conn()?;
        let mut rows = conn
            .query(&sql, Params::Positional(values))
            .await
            .map_err(query_error)?;

        let wanted: HashSet<&LegalDocumentKey> = keys.iter().collect();
        let mut found = HashSet::new();
        while let Some(row) = rows.next().await.map_err(query_error)? {
            let document_type: String = row.get(2).map_err(query_error)?;
            let key = LegalDocumentKey {
                collective_id: row.get(0).map_err(query_error)?,
                year: row.get(1).map_err(query_error)?,
                document_type: document_type.parse()?,
            };
            if wanted.contains(&key) {
                found.insert(key);
            }
        }
        Ok(found)
    }

    async fn list_host_expense_ids(
        &self,
        host_id: CollectiveId,
        year: i32,
    ) -> Result<Vec<ExpenseId>, DomainError> {
        let (from, until) = fiscal_year_range(year);
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT e.id
                FROM expenses e
                JOIN collectives c ON c.id = e.collective_id
                WHERE c.host_collective_id = ?1
                  AND e.incurred_at >= ?2
                  AND e.incurred_at < ?3
                  AND e.deleted_at IS NULL
                ORDER BY e.id
                "#,
                params![host_id, from.timestamp(), until.timestamp()],
            )
            .await
            .map_err(query_error)?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_error)? {
            ids.push(row.get::<i64>(0).map_err(query_error)?);
        }
        Ok(ids)
    }
}
