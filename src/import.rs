//! Bulk import of transactions.
//!
//! The client splits its CSV export into rows and posts them as JSON; this
//! module validates each row independently and reports every failed row with
//! its reasons instead of aborting the batch. Imports never mirror
//! transfers, because an export already contains both legs of every pair.

use axum::{Json, extract::State, response::IntoResponse};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    actor::ActorContext,
    audit::{AuditAction, record_audit},
    party::PartyPair,
    transaction::{Category, NewTransaction},
};

/// Failed rows are numbered as in the spreadsheet the user exported: row 1
/// is the header, so the first data row is row 2.
const HEADER_ROW_OFFSET: usize = 2;

const ISO_DATE: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const SLASH_DATE: &[BorrowedFormatItem] = format_description!("[day]/[month]/[year]");

/// One candidate row of an import batch, as split from the client's CSV.
///
/// Every field is optional so a short row deserializes instead of failing
/// the whole batch; validation reports what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRow {
    /// The transaction date, `YYYY-MM-DD` or `DD/MM/YYYY`.
    #[serde(default)]
    pub date: Option<String>,
    /// The account the money moved through.
    #[serde(default)]
    pub account: Option<String>,
    /// The category name.
    #[serde(default)]
    pub category: Option<String>,
    /// Free-text grouping below the category.
    #[serde(default)]
    pub subcategory: Option<String>,
    /// The person the transaction belongs to. Must be a tracked party.
    #[serde(default)]
    pub party: Option<String>,
    /// The amount, as a number or a numeric string.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: Option<String>,
}

/// The reasons a single import row was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// The row's position in the exported spreadsheet, header included.
    pub row: usize,
    /// Everything wrong with the row.
    pub reasons: Vec<String>,
}

/// The outcome of an import batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    /// How many rows were inserted.
    pub success: usize,
    /// How many rows were rejected.
    pub failed: usize,
    /// The rejected rows with their reasons.
    pub errors: Vec<RowError>,
}

/// Validate one import row, collecting every failure reason rather than
/// stopping at the first.
fn validate_row(row: ImportRow, parties: &PartyPair) -> Result<NewTransaction, Vec<String>> {
    let mut reasons = Vec::new();

    let date = match row.date.as_deref().map(str::trim) {
        None | Some("") => {
            reasons.push("date is missing".to_owned());
            None
        }
        Some(text) => match parse_date(text) {
            Some(date) => Some(date),
            None => {
                reasons.push(Error::InvalidDateFormat(text.to_owned()).to_string());
                None
            }
        },
    };

    let account = match row.account.as_deref().map(str::trim) {
        None | Some("") => {
            reasons.push("account is missing".to_owned());
            None
        }
        Some(text) => Some(text.to_owned()),
    };

    let category = match row.category.as_deref().map(str::trim) {
        None | Some("") => {
            reasons.push("category is missing".to_owned());
            None
        }
        Some(text) => match text.parse::<Category>() {
            Ok(category) => Some(category),
            Err(error) => {
                reasons.push(error.to_string());
                None
            }
        },
    };

    let party = match row.party.as_deref().map(str::trim) {
        None | Some("") => {
            reasons.push("party is missing".to_owned());
            None
        }
        Some(text) if !parties.contains(text) => {
            reasons.push(Error::UnknownParty(text.to_owned()).to_string());
            None
        }
        Some(text) => Some(text.to_owned()),
    };

    let amount = match row.amount.as_ref().and_then(parse_amount) {
        Some(amount) if amount != 0.0 => Some(amount),
        _ => {
            reasons.push(Error::InvalidAmount.to_string());
            None
        }
    };

    if !reasons.is_empty() {
        return Err(reasons);
    }

    Ok(NewTransaction {
        date: date.unwrap(),
        account: account.unwrap(),
        category: category.unwrap(),
        subcategory: row.subcategory.unwrap_or_default(),
        party: party.unwrap(),
        amount: amount.unwrap(),
        notes: row.notes.unwrap_or_default(),
        description: row.description.unwrap_or_default(),
    })
}

/// Parse a date in ISO form, falling back to the `DD/MM/YYYY` form older
/// exports use.
fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text, ISO_DATE)
        .or_else(|_| Date::parse(text, SLASH_DATE))
        .ok()
}

fn parse_amount(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64().filter(|amount| amount.is_finite()),
        serde_json::Value::String(text) => {
            text.trim().parse::<f64>().ok().filter(|amount| amount.is_finite())
        }
        _ => None,
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler for importing a batch of transactions.
///
/// Rows that fail validation are reported back with their reasons; the rest
/// are inserted. Transfers are inserted as given and not mirrored, since the
/// batch carries both legs of a mirrored pair already.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn import_transactions_endpoint(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(rows): Json<Vec<ImportRow>>,
) -> Result<impl IntoResponse, Error> {
    let mut new_transactions = Vec::new();
    let mut errors = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        match validate_row(row, &state.parties) {
            Ok(new_transaction) => new_transactions.push(new_transaction),
            Err(reasons) => errors.push(RowError {
                row: index + HEADER_ROW_OFFSET,
                reasons,
            }),
        }
    }

    let connection = state.db_connection.lock().unwrap();
    let success = import_transactions(new_transactions, &connection)?;

    record_audit(
        &connection,
        &actor.name,
        AuditAction::Import,
        None,
        json!({ "success": success, "failed": errors.len() }),
    );

    tracing::info!(
        "imported {success} transactions, rejected {} rows",
        errors.len()
    );

    Ok(Json(ImportSummary {
        success,
        failed: errors.len(),
        errors,
    }))
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Insert a batch of validated transactions in one SQL transaction.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
/// On error nothing is inserted.
pub fn import_transactions(
    new_transactions: Vec<NewTransaction>,
    connection: &Connection,
) -> Result<usize, Error> {
    let tx = connection.unchecked_transaction()?;

    let mut statement = tx.prepare(
        "INSERT INTO \"transaction\"
            (date, account, category, subcategory, party, amount, notes, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    let count = new_transactions.len();

    for new_transaction in new_transactions {
        statement.execute((
            new_transaction.date,
            new_transaction.account,
            new_transaction.category.as_str(),
            new_transaction.subcategory,
            new_transaction.party,
            new_transaction.amount,
            new_transaction.notes,
            new_transaction.description,
        ))?;
    }

    drop(statement);
    tx.commit()?;

    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod validate_row_tests {
    use serde_json::json;
    use time::macros::date;

    use crate::party::PartyPair;

    use super::{ImportRow, validate_row};

    fn test_parties() -> PartyPair {
        PartyPair::new("Burimi", "Skenderi")
    }

    fn valid_row() -> ImportRow {
        ImportRow {
            date: Some("2025-01-15".to_owned()),
            account: Some("Cash".to_owned()),
            category: Some("Expense".to_owned()),
            subcategory: Some("Rroga".to_owned()),
            party: Some("Burimi".to_owned()),
            amount: Some(json!(120.5)),
            notes: None,
            description: None,
        }
    }

    #[test]
    fn valid_row_passes() {
        let new_transaction = validate_row(valid_row(), &test_parties()).unwrap();

        assert_eq!(new_transaction.date, date!(2025 - 01 - 15));
        assert_eq!(new_transaction.amount, 120.5);
        assert_eq!(new_transaction.notes, "");
    }

    #[test]
    fn accepts_slash_date_format() {
        let row = ImportRow {
            date: Some("15/01/2025".to_owned()),
            ..valid_row()
        };

        let new_transaction = validate_row(row, &test_parties()).unwrap();

        assert_eq!(new_transaction.date, date!(2025 - 01 - 15));
    }

    #[test]
    fn accepts_numeric_string_amount() {
        let row = ImportRow {
            amount: Some(json!("99.50")),
            ..valid_row()
        };

        let new_transaction = validate_row(row, &test_parties()).unwrap();

        assert_eq!(new_transaction.amount, 99.5);
    }

    #[test]
    fn collects_every_reason() {
        let row = ImportRow {
            date: None,
            account: Some("".to_owned()),
            category: Some("Loan".to_owned()),
            party: Some("Alice".to_owned()),
            amount: Some(json!(0)),
            ..Default::default()
        };

        let reasons = validate_row(row, &test_parties()).unwrap_err();

        assert_eq!(
            reasons,
            vec![
                "date is missing",
                "account is missing",
                "\"Loan\" is not a valid category",
                "\"Alice\" is not a tracked party",
                "amount must be a non-zero number",
            ]
        );
    }

    #[test]
    fn rejects_unparseable_date() {
        let row = ImportRow {
            date: Some("Jan 15".to_owned()),
            ..valid_row()
        };

        let reasons = validate_row(row, &test_parties()).unwrap_err();

        assert_eq!(reasons, vec!["\"Jan 15\" is not a valid date"]);
    }

    #[test]
    fn rejects_non_numeric_amount() {
        let row = ImportRow {
            amount: Some(json!("a lot")),
            ..valid_row()
        };

        let reasons = validate_row(row, &test_parties()).unwrap_err();

        assert_eq!(reasons, vec!["amount must be a non-zero number"]);
    }
}
