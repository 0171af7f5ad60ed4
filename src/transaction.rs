//! Transaction management for the shared finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model, the closed `Category` set and input validation
//! - Database functions for storing, querying, and managing transactions
//! - Route handlers for the transaction endpoints
//!
//! Transfers between the two tracked parties are special: creating one leg
//! through the API atomically creates the mirror leg for the other party
//! with the amount negated, so the pair always sums to zero.

use std::{fmt, str::FromStr};

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error,
    actor::ActorContext,
    audit::{AuditAction, record_audit},
};

/// The subcategory marker for transactions belonging to the shared project.
pub(crate) const SHARED_PROJECT_MARKER: &str = "GINGER";

/// The subcategory marker for point-of-sale transactions.
pub(crate) const POS_MARKER: &str = "POS";

// ============================================================================
// MODELS
// ============================================================================

/// The kind of money movement a transaction records.
///
/// The category decides which aggregation bucket a transaction lands in; the
/// amount's sign is carried through as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
    /// Money moving between the two tracked parties.
    Transfer,
}

impl Category {
    /// The category's canonical text form, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Income => "Income",
            Category::Expense => "Expense",
            Category::Transfer => "Transfer",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "Income" => Ok(Category::Income),
            "Expense" => Ok(Category::Expense),
            "Transfer" => Ok(Category::Transfer),
            other => Err(Error::UnknownCategory(other.to_owned())),
        }
    }
}

/// A single entry in the shared ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: i64,
    /// When the transaction happened.
    pub date: Date,
    /// The account the money moved through.
    pub account: String,
    /// The kind of money movement.
    pub category: Category,
    /// Free-text grouping below the category. The markers `"GINGER"` and
    /// `"POS"` are recognized by the reports.
    pub subcategory: String,
    /// The person the transaction belongs to.
    pub party: String,
    /// The amount of money that moved. Never zero.
    pub amount: f64,
    /// Free-form notes.
    pub notes: String,
    /// A text description of what the transaction was for.
    pub description: String,
}

/// The JSON body for creating or replacing a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionInput {
    /// When the transaction happened.
    pub date: Date,
    /// The account the money moved through.
    pub account: String,
    /// The category name. Must be one of Income, Expense or Transfer.
    pub category: String,
    /// Free-text grouping below the category.
    #[serde(default)]
    pub subcategory: String,
    /// The person the transaction belongs to.
    pub party: String,
    /// The amount of money that moved.
    pub amount: f64,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
}

impl TransactionInput {
    /// Validate the input and produce the fields for a database write.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::MissingField] if the account or party is empty,
    /// - [Error::UnknownCategory] if the category is not one of the three
    ///   known categories,
    /// - or [Error::InvalidAmount] if the amount is zero or not finite.
    pub fn validate(self) -> Result<NewTransaction, Error> {
        if self.account.trim().is_empty() {
            return Err(Error::MissingField("account"));
        }

        if self.party.trim().is_empty() {
            return Err(Error::MissingField("party"));
        }

        let category = Category::from_str(&self.category)?;

        if self.amount == 0.0 || !self.amount.is_finite() {
            return Err(Error::InvalidAmount);
        }

        Ok(NewTransaction {
            date: self.date,
            account: self.account,
            category,
            subcategory: self.subcategory,
            party: self.party,
            amount: self.amount,
            notes: self.notes,
            description: self.description,
        })
    }
}

/// A validated transaction that has not been written to the database yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// When the transaction happened.
    pub date: Date,
    /// The account the money moved through.
    pub account: String,
    /// The kind of money movement.
    pub category: Category,
    /// Free-text grouping below the category.
    pub subcategory: String,
    /// The person the transaction belongs to.
    pub party: String,
    /// The amount of money that moved. Never zero.
    pub amount: f64,
    /// Free-form notes.
    pub notes: String,
    /// A text description of what the transaction was for.
    pub description: String,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler for creating a new transaction.
///
/// Transfers where the party is one of the two tracked parties also create
/// the mirror leg for the other party, atomically. The response carries the
/// requested leg.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(input): Json<TransactionInput>,
) -> Result<impl IntoResponse, Error> {
    let new_transaction = input.validate()?;

    let connection = state.db_connection.lock().unwrap();

    let transaction = match state.parties.counterpart(&new_transaction.party) {
        Some(counterpart) if new_transaction.category == Category::Transfer => {
            let counterpart = counterpart.to_owned();
            create_transfer_pair(new_transaction, &counterpart, &connection)?
        }
        _ => create_transaction(new_transaction, &connection)?,
    };

    record_audit(
        &connection,
        &actor.name,
        AuditAction::Create,
        Some(transaction.id),
        json!({
            "category": transaction.category,
            "party": transaction.party,
            "amount": transaction.amount,
        }),
    );

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// A route handler for listing transactions, most recent first.
///
/// Incoming mirror legs of transfers (negative amounts) are hidden so each
/// transfer shows up once. The reports consume the same feed.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn list_transactions_endpoint(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().unwrap();
    let transactions = get_display_transactions(&connection)?;

    Ok(Json(transactions))
}

/// A route handler for replacing a transaction by its database ID.
///
/// The mirror leg of a transfer is a separate transaction and is not kept in
/// sync; edit both legs to keep a transfer balanced.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_transaction_endpoint(
    State(state): State<AppState>,
    Path(transaction_id): Path<i64>,
    actor: ActorContext,
    Json(input): Json<TransactionInput>,
) -> Result<impl IntoResponse, Error> {
    let new_transaction = input.validate()?;

    let connection = state.db_connection.lock().unwrap();
    let before = get_transaction(transaction_id, &connection)?;
    let updated = update_transaction(transaction_id, new_transaction, &connection)?;

    record_audit(
        &connection,
        &actor.name,
        AuditAction::Update,
        Some(transaction_id),
        changed_fields(&before, &updated),
    );

    Ok(Json(updated))
}

/// A route handler for deleting a transaction by its database ID.
///
/// Only admins may delete. The mirror leg of a transfer is not deleted with
/// its counterpart.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    Path(transaction_id): Path<i64>,
    actor: ActorContext,
) -> Result<impl IntoResponse, Error> {
    if !actor.can_delete() {
        return Err(Error::Forbidden);
    }

    let connection = state.db_connection.lock().unwrap();
    let transaction = get_transaction(transaction_id, &connection)?;
    delete_transaction(transaction_id, &connection)?;

    record_audit(
        &connection,
        &actor.name,
        AuditAction::Delete,
        Some(transaction_id),
        json!({
            "category": transaction.category,
            "party": transaction.party,
            "amount": transaction.amount,
        }),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// The per-field differences between two versions of a transaction, for the
/// audit trail.
fn changed_fields(before: &Transaction, after: &Transaction) -> serde_json::Value {
    let mut changes = serde_json::Map::new();

    macro_rules! diff {
        ($field:ident) => {
            if before.$field != after.$field {
                changes.insert(
                    stringify!($field).to_owned(),
                    json!({ "from": before.$field, "to": after.$field }),
                );
            }
        };
    }

    diff!(date);
    diff!(account);
    diff!(category);
    diff!(subcategory);
    diff!(party);
    diff!(amount);
    diff!(notes);
    diff!(description);

    serde_json::Value::Object(changes)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\"
                (date, account, category, subcategory, party, amount, notes, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, date, account, category, subcategory, party, amount, notes, description",
        )?
        .query_row(
            (
                new_transaction.date,
                new_transaction.account,
                new_transaction.category.as_str(),
                new_transaction.subcategory,
                new_transaction.party,
                new_transaction.amount,
                new_transaction.notes,
                new_transaction.description,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Create both legs of a transfer between the two tracked parties.
///
/// The mirror leg copies the requested leg with the party swapped for
/// `counterpart` and the amount negated. Both inserts happen inside a single
/// SQL transaction, so either both legs exist or neither does.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
/// On error neither leg is written.
pub fn create_transfer_pair(
    new_transaction: NewTransaction,
    counterpart: &str,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let tx = connection.unchecked_transaction()?;

    let mirror = NewTransaction {
        party: counterpart.to_owned(),
        amount: -new_transaction.amount,
        ..new_transaction.clone()
    };

    let transaction = create_transaction(new_transaction, &tx)?;
    create_transaction(mirror, &tx)?;

    tx.commit()?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: i64, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, date, account, category, subcategory, party, amount, notes, description
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Replace the transaction with `id` in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: i64,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "UPDATE \"transaction\"
             SET date = ?1, account = ?2, category = ?3, subcategory = ?4,
                 party = ?5, amount = ?6, notes = ?7, description = ?8
             WHERE id = ?9
             RETURNING id, date, account, category, subcategory, party, amount, notes, description",
        )?
        .query_row(
            (
                new_transaction.date,
                new_transaction.account,
                new_transaction.category.as_str(),
                new_transaction.subcategory,
                new_transaction.party,
                new_transaction.amount,
                new_transaction.notes,
                new_transaction.description,
                id,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Delete the transaction with `id` from the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: i64, connection: &Connection) -> Result<(), Error> {
    let rows_deleted =
        connection.execute("DELETE FROM \"transaction\" WHERE id = :id", &[(":id", &id)])?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Retrieve the transactions to show in the ledger listing, most recent
/// first.
///
/// Incoming mirror legs of transfers are excluded so each transfer appears
/// once; the ledger listing and the reports both consume this feed. Rows
/// whose stored category no longer parses are logged and skipped rather
/// than failing the whole list.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_display_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    let mut statement = connection.prepare(
        "SELECT id, date, account, category, subcategory, party, amount, notes, description
         FROM \"transaction\"
         WHERE NOT (category = 'Transfer' AND amount < 0)
         ORDER BY date DESC, id DESC",
    )?;
    let rows = statement.query_map((), map_transaction_row)?;

    let mut transactions = Vec::new();

    for row_result in rows {
        match row_result {
            Ok(transaction) => transactions.push(transaction),
            Err(rusqlite::Error::FromSqlConversionFailure(index, _, error)) => {
                tracing::warn!("skipping transaction row (column {index}): {error}");
            }
            Err(error) => return Err(error.into()),
        }
    }

    Ok(transactions)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                account TEXT NOT NULL,
                category TEXT NOT NULL,
                subcategory TEXT NOT NULL DEFAULT '',
                party TEXT NOT NULL,
                amount REAL NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT ''
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let category_text: String = row.get(3)?;
    let category = Category::from_str(&category_text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        account: row.get(2)?,
        category,
        subcategory: row.get(4)?,
        party: row.get(5)?,
        amount: row.get(6)?,
        notes: row.get(7)?,
        description: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod input_tests {
    use time::macros::date;

    use crate::Error;

    use super::{Category, TransactionInput};

    fn test_input() -> TransactionInput {
        TransactionInput {
            date: date!(2025 - 01 - 15),
            account: "Cash".to_owned(),
            category: "Expense".to_owned(),
            subcategory: "Groceries".to_owned(),
            party: "Burimi".to_owned(),
            amount: 120.0,
            notes: "".to_owned(),
            description: "Weekly shop".to_owned(),
        }
    }

    #[test]
    fn validate_succeeds() {
        let new_transaction = test_input().validate().unwrap();

        assert_eq!(new_transaction.category, Category::Expense);
        assert_eq!(new_transaction.amount, 120.0);
    }

    #[test]
    fn validate_rejects_zero_amount() {
        let input = TransactionInput {
            amount: 0.0,
            ..test_input()
        };

        assert_eq!(input.validate(), Err(Error::InvalidAmount));
    }

    #[test]
    fn validate_rejects_unknown_category() {
        let input = TransactionInput {
            category: "Loan".to_owned(),
            ..test_input()
        };

        assert_eq!(
            input.validate(),
            Err(Error::UnknownCategory("Loan".to_owned()))
        );
    }

    #[test]
    fn validate_rejects_empty_account() {
        let input = TransactionInput {
            account: " ".to_owned(),
            ..test_input()
        };

        assert_eq!(input.validate(), Err(Error::MissingField("account")));
    }

    #[test]
    fn validate_rejects_empty_party() {
        let input = TransactionInput {
            party: "".to_owned(),
            ..test_input()
        };

        assert_eq!(input.validate(), Err(Error::MissingField("party")));
    }
}
