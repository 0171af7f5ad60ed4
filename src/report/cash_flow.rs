//! The cumulative cash-flow series.
//!
//! Income adds, expenses subtract and transfers are left out entirely: money
//! moving between the two tracked parties is not operating cash flow. The
//! series carries one point per distinct date, with the day's final balance.

use serde::Serialize;
use time::Date;

use crate::transaction::Category;

use super::Entry;

/// One point of the cumulative balance series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CashFlowPoint {
    /// The date the balance applies to.
    pub date: Date,
    /// The cumulative balance at the end of this date.
    pub balance: f64,
}

/// Build the cumulative cash-flow series from normalized `entries`.
///
/// The walk is date-ordered but stable: entries sharing a date keep their
/// original relative order, and only the last balance of each date is kept.
pub fn cash_flow(entries: &[Entry]) -> Vec<CashFlowPoint> {
    let mut ordered: Vec<&Entry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.date);

    let mut points: Vec<CashFlowPoint> = Vec::new();
    let mut balance = 0.0;

    for entry in ordered {
        match entry.category {
            Category::Income => balance += entry.amount,
            Category::Expense => balance -= entry.amount,
            Category::Transfer => continue,
        }

        match points.last_mut() {
            Some(point) if point.date == entry.date => point.balance = balance,
            _ => points.push(CashFlowPoint {
                date: entry.date,
                balance,
            }),
        }
    }

    points
}
