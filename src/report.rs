//! The aggregation engine.
//!
//! Pure, synchronous functions that turn the visible transaction feed into
//! the derived report views: the per-party monthly matrix, the cumulative
//! cash-flow series and the per-party balance sheet. Every report call
//! recomputes from a fresh snapshot of the ledger; nothing here caches or
//! mutates its input.

use axum::{Json, extract::State, response::IntoResponse};
use time::Date;

use crate::{
    AppState, Error,
    party::{PartyPair, PartySlot},
    transaction::{
        Category, POS_MARKER, SHARED_PROJECT_MARKER, Transaction, get_display_transactions,
    },
};

mod balance_sheet;
mod cash_flow;
mod monthly;

pub use balance_sheet::{PartyBalance, balance_sheet};
pub use cash_flow::{CashFlowPoint, cash_flow};
pub use monthly::{
    MonthlyReport, MonthlyStat, MonthlyTotals, PartyCells, YearSection, YearlyReport,
    monthly_report, yearly_report,
};

/// A transaction normalized for aggregation.
///
/// The party and the reserved subcategory markers are resolved once here so
/// the aggregation passes work over flags instead of repeating string
/// comparisons per cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    /// When the transaction happened.
    pub date: Date,
    /// Which tracked party the transaction belongs to, if either.
    pub slot: Option<PartySlot>,
    /// The kind of money movement.
    pub category: Category,
    /// Whether the transaction carries the shared-project marker.
    pub shared: bool,
    /// Whether the transaction carries the point-of-sale marker.
    pub pos: bool,
    /// The amount of money that moved.
    pub amount: f64,
}

/// Normalize `transactions` for aggregation against the tracked `parties`.
pub fn normalize(transactions: &[Transaction], parties: &PartyPair) -> Vec<Entry> {
    transactions
        .iter()
        .map(|transaction| Entry {
            date: transaction.date,
            slot: parties.slot_of(&transaction.party),
            category: transaction.category,
            shared: transaction.subcategory == SHARED_PROJECT_MARKER,
            pos: transaction.subcategory == POS_MARKER,
            amount: transaction.amount,
        })
        .collect()
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// The reports consume the same mirror-hidden feed as the ledger listing, so
/// a transfer is seen once, as the sender's leg. The receiving side enters
/// the aggregations through cross-assignment, never through the hidden leg.
fn load_entries(state: &AppState) -> Result<Vec<Entry>, Error> {
    let connection = state.db_connection.lock().unwrap();
    let transactions = get_display_transactions(&connection)?;

    Ok(normalize(&transactions, &state.parties))
}

/// A route handler for the monthly matrix report.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn monthly_report_endpoint(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let entries = load_entries(&state)?;

    Ok(Json(monthly_report(&entries, &state.parties)))
}

/// A route handler for the monthly matrix grouped by year, most recent year
/// first.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn yearly_report_endpoint(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let entries = load_entries(&state)?;

    Ok(Json(yearly_report(&entries, &state.parties)))
}

/// A route handler for the cumulative cash-flow series.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn cash_flow_endpoint(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let entries = load_entries(&state)?;

    Ok(Json(cash_flow(&entries)))
}

/// A route handler for the per-party balance sheet.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn balance_sheet_endpoint(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let entries = load_entries(&state)?;

    Ok(Json(balance_sheet(&entries, &state.parties)))
}

// ============================================================================
// TESTS
// ============================================================================
