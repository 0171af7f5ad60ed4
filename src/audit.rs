//! The audit trail of user actions.
//!
//! Every mutation records who did what. Recording is deliberately best
//! effort: a failed audit write is logged and swallowed so it can never fail
//! the mutation it describes.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{AppState, Error};

/// The number of audit entries returned when no limit is given.
const DEFAULT_AUDIT_LIMIT: u32 = 100;

// ============================================================================
// MODELS
// ============================================================================

/// What kind of mutation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// A transaction was created.
    Create,
    /// A transaction was replaced.
    Update,
    /// A transaction was deleted.
    Delete,
    /// A batch of transactions was imported.
    Import,
}

impl AuditAction {
    fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Import => "IMPORT",
        }
    }

    fn from_str(text: &str) -> Option<Self> {
        match text {
            "CREATE" => Some(AuditAction::Create),
            "UPDATE" => Some(AuditAction::Update),
            "DELETE" => Some(AuditAction::Delete),
            "IMPORT" => Some(AuditAction::Import),
            _ => None,
        }
    }
}

/// A single recorded action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// The ID of the audit entry.
    pub id: i64,
    /// The name of the user who performed the action.
    pub username: String,
    /// What kind of mutation this entry records.
    pub action: AuditAction,
    /// The ID of the affected transaction, where there is a single one.
    pub entity_id: Option<i64>,
    /// Action-specific details, e.g. the changed fields of an update.
    pub details: serde_json::Value,
    /// When the action happened, in UTC.
    pub timestamp: OffsetDateTime,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// The query parameters for the audit trail listing.
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    /// The maximum number of entries to return. Defaults to 100.
    pub limit: Option<u32>,
}

/// A route handler for listing the audit trail, newest first.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_audit_log_endpoint(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().unwrap();
    let entries = list_audit_entries(query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT), &connection)?;

    Ok(Json(entries))
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Record an action in the audit trail.
///
/// Never fails: if the write cannot be made the error is logged and the
/// caller's mutation stands.
pub fn record_audit(
    connection: &Connection,
    username: &str,
    action: AuditAction,
    entity_id: Option<i64>,
    details: serde_json::Value,
) {
    let result = connection.execute(
        "INSERT INTO audit_log (username, action, entity_id, details, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            username,
            action.as_str(),
            entity_id,
            details.to_string(),
            OffsetDateTime::now_utc(),
        ),
    );

    if let Err(error) = result {
        tracing::error!("failed to record {} audit entry: {error}", action.as_str());
    }
}

/// Retrieve up to `limit` audit entries, newest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_audit_entries(limit: u32, connection: &Connection) -> Result<Vec<AuditEntry>, Error> {
    connection
        .prepare(
            "SELECT id, username, action, entity_id, details, timestamp
             FROM audit_log ORDER BY id DESC LIMIT :limit",
        )?
        .query_map(&[(":limit", &limit)], map_audit_row)?
        .map(|entry_result| entry_result.map_err(Error::from))
        .collect()
}

/// Create the audit log table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_audit_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_id INTEGER,
                details TEXT NOT NULL DEFAULT '{}',
                timestamp TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to an AuditEntry.
fn map_audit_row(row: &Row) -> Result<AuditEntry, rusqlite::Error> {
    let action_text: String = row.get(2)?;
    let action = AuditAction::from_str(&action_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown audit action \"{action_text}\"").into(),
        )
    })?;

    let details_text: String = row.get(4)?;
    let details = serde_json::from_str(&details_text).unwrap_or(serde_json::Value::Null);

    Ok(AuditEntry {
        id: row.get(0)?,
        username: row.get(1)?,
        action,
        entity_id: row.get(3)?,
        details,
        timestamp: row.get(5)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod audit_tests {
    use rusqlite::Connection;
    use serde_json::json;

    use crate::db::initialize;

    use super::{AuditAction, list_audit_entries, record_audit};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn record_and_list_newest_first() {
        let conn = get_test_connection();
        record_audit(
            &conn,
            "Burimi",
            AuditAction::Create,
            Some(1),
            json!({"amount": 500.0}),
        );
        record_audit(&conn, "Skenderi", AuditAction::Delete, Some(1), json!({}));

        let entries = list_audit_entries(10, &conn).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Delete);
        assert_eq!(entries[0].username, "Skenderi");
        assert_eq!(entries[1].action, AuditAction::Create);
        assert_eq!(entries[1].details, json!({"amount": 500.0}));
    }

    #[test]
    fn list_respects_limit() {
        let conn = get_test_connection();
        for i in 0..5 {
            record_audit(&conn, "Burimi", AuditAction::Create, Some(i), json!({}));
        }

        let entries = list_audit_entries(3, &conn).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].entity_id, Some(4));
    }

    #[test]
    fn record_swallows_write_failure() {
        let conn = Connection::open_in_memory().unwrap();

        // No tables exist, so the insert fails. The call must not panic.
        record_audit(&conn, "Burimi", AuditAction::Create, None, json!({}));
    }
}
