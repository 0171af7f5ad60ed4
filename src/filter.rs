//! Ad hoc filtering over the ledger.
//!
//! A conjunction of optional exact predicates plus an inclusive date range,
//! applied in memory over the listed transactions. The filtered summary is a
//! flat sum; once filtered there is no "other party", so there is no
//! cross-term like the balance sheet has.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    transaction::{Category, Transaction, get_display_transactions},
};

/// The optional predicates narrowing a transaction set. Unset predicates
/// match everything; set predicates are ANDed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    /// Match this exact account name.
    pub account: Option<String>,
    /// Match this category.
    pub category: Option<Category>,
    /// Match this exact subcategory.
    pub subcategory: Option<String>,
    /// Match this exact party name.
    pub party: Option<String>,
    /// Match this exact amount.
    pub amount: Option<f64>,
    /// Match transactions in this calendar month (1 to 12).
    pub month: Option<u8>,
    /// Match transactions in this calendar year.
    pub year: Option<i32>,
    /// Match transactions on or after this date.
    pub start_date: Option<Date>,
    /// Match transactions on or before this date.
    pub end_date: Option<Date>,
}

impl TransactionFilter {
    /// Whether `transaction` satisfies every set predicate.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(account) = &self.account
            && transaction.account != *account
        {
            return false;
        }

        if let Some(category) = self.category
            && transaction.category != category
        {
            return false;
        }

        if let Some(subcategory) = &self.subcategory
            && transaction.subcategory != *subcategory
        {
            return false;
        }

        if let Some(party) = &self.party
            && transaction.party != *party
        {
            return false;
        }

        if let Some(amount) = self.amount
            && transaction.amount != amount
        {
            return false;
        }

        if let Some(month) = self.month
            && u8::from(transaction.date.month()) != month
        {
            return false;
        }

        if let Some(year) = self.year
            && transaction.date.year() != year
        {
            return false;
        }

        if let Some(start_date) = self.start_date
            && transaction.date < start_date
        {
            return false;
        }

        if let Some(end_date) = self.end_date
            && transaction.date > end_date
        {
            return false;
        }

        true
    }

    /// The subset of `transactions` satisfying every set predicate, in the
    /// given order.
    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|transaction| self.matches(transaction))
            .cloned()
            .collect()
    }
}

/// The flat totals of a filtered transaction set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FilterSummary {
    /// The summed amounts of Income transactions.
    pub income: f64,
    /// The summed amounts of Expense transactions.
    pub expenses: f64,
    /// The summed amounts of Transfer transactions.
    pub transfers: f64,
    /// `income - expenses - transfers`.
    pub total: f64,
    /// How many transactions matched.
    pub count: usize,
}

/// Compute the flat totals of `transactions`.
pub fn summarize(transactions: &[Transaction]) -> FilterSummary {
    let mut summary = FilterSummary {
        count: transactions.len(),
        ..Default::default()
    };

    for transaction in transactions {
        match transaction.category {
            Category::Income => summary.income += transaction.amount,
            Category::Expense => summary.expenses += transaction.amount,
            Category::Transfer => summary.transfers += transaction.amount,
        }
    }

    summary.total = summary.income - summary.expenses - summary.transfers;

    summary
}

/// The response body of the filtered summary endpoint.
#[derive(Debug, Serialize)]
pub struct FilteredSummary {
    /// The flat totals of the matching transactions.
    pub summary: FilterSummary,
    /// The matching transactions, most recent first.
    pub transactions: Vec<Transaction>,
}

/// A route handler for the filtered summary, with the predicates given as
/// query parameters.
///
/// Filters over the same listing the ledger view shows, so incoming mirror
/// legs of transfers are not part of the filtered set.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn filtered_summary_endpoint(
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().unwrap();
    let transactions = get_display_transactions(&connection)?;
    drop(connection);

    let matching = filter.apply(&transactions);
    let summary = summarize(&matching);

    Ok(Json(FilteredSummary {
        summary,
        transactions: matching,
    }))
}
