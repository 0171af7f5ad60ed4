//! The per-party monthly matrix.
//!
//! One row per calendar month with six accumulator cells per tracked party,
//! a global point-of-sale column and per-row totals. A party's total grows
//! from its own income and from the transfers the other party sent, and
//! shrinks from its own outgoing transfers and expenses.

use std::collections::HashMap;

use serde::Serialize;
use time::Month;

use crate::{
    party::{PartyPair, PartySlot},
    transaction::Category,
};

use super::Entry;

/// The six accumulator cells of one tracked party in one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PartyCells {
    /// Income carrying the shared-project marker.
    pub income_shared: f64,
    /// Expenses carrying the shared-project marker.
    pub expense_shared: f64,
    /// All transfers, regardless of the shared-project marker.
    pub transfer: f64,
    /// Income without the shared-project marker.
    pub income_other: f64,
    /// Expenses without the shared-project marker.
    pub expense_other: f64,
    /// The party's net total for the row.
    pub total: f64,
}

/// One row of the monthly matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStat {
    /// A display label such as `"Jan-25"`. The sort key is `(year, month)`,
    /// never this label.
    pub label: String,
    /// The calendar year.
    pub year: i32,
    /// The calendar month, 1 to 12.
    pub month: u8,
    /// The cells for the two tracked parties, in pair order.
    pub parties: [PartyCells; 2],
    /// The global point-of-sale accumulator, fed regardless of party.
    pub pos: f64,
    /// The sum of both parties' totals.
    pub grand_total: f64,
}

/// The column-wise sums over a set of matrix rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// The summed cells for the two tracked parties, in pair order.
    pub parties: [PartyCells; 2],
    /// The summed point-of-sale column.
    pub pos: f64,
    /// The summed grand-total column.
    pub grand_total: f64,
}

/// The monthly matrix, rows ascending by `(year, month)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    /// The names of the two tracked parties, in the order used by the
    /// `parties` arrays.
    pub party_names: [String; 2],
    /// The matrix rows, ascending by `(year, month)`.
    pub rows: Vec<MonthlyStat>,
    /// The column totals over all rows.
    pub totals: MonthlyTotals,
}

/// The rows of one calendar year within the grouped-by-year view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSection {
    /// The calendar year.
    pub year: i32,
    /// The year's rows, ascending by month.
    pub rows: Vec<MonthlyStat>,
    /// The column totals over this year only.
    pub totals: MonthlyTotals,
}

/// The monthly matrix grouped by year, most recent year first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyReport {
    /// The names of the two tracked parties, in the order used by the
    /// `parties` arrays.
    pub party_names: [String; 2],
    /// One section per year, descending by year.
    pub years: Vec<YearSection>,
}

/// Build the monthly matrix from normalized `entries`.
pub fn monthly_report(entries: &[Entry], parties: &PartyPair) -> MonthlyReport {
    let rows = build_rows(entries);
    let totals = column_totals(&rows);

    MonthlyReport {
        party_names: party_names(parties),
        rows,
        totals,
    }
}

/// Build the grouped-by-year view of the monthly matrix.
///
/// The same rows as [monthly_report], partitioned by year with per-year
/// column totals. Years are ordered most recent first while the rows inside
/// a year stay ascending by month.
pub fn yearly_report(entries: &[Entry], parties: &PartyPair) -> YearlyReport {
    let rows = build_rows(entries);

    let mut years: Vec<YearSection> = Vec::new();

    for row in rows {
        match years.last_mut() {
            Some(section) if section.year == row.year => section.rows.push(row),
            _ => years.push(YearSection {
                year: row.year,
                rows: vec![row],
                totals: MonthlyTotals::default(),
            }),
        }
    }

    for section in &mut years {
        section.totals = column_totals(&section.rows);
    }

    years.sort_by_key(|section| std::cmp::Reverse(section.year));

    YearlyReport {
        party_names: party_names(parties),
        years,
    }
}

fn party_names(parties: &PartyPair) -> [String; 2] {
    [
        parties.name(PartySlot::First).to_owned(),
        parties.name(PartySlot::Second).to_owned(),
    ]
}

fn build_rows(entries: &[Entry]) -> Vec<MonthlyStat> {
    let mut months: HashMap<(i32, u8), ([PartyCells; 2], f64)> = HashMap::new();

    for entry in entries {
        let key = (entry.date.year(), u8::from(entry.date.month()));
        let (cells, pos) = months.entry(key).or_default();

        if entry.pos {
            *pos += entry.amount;
        }

        let Some(slot) = entry.slot else {
            continue;
        };

        let cell = &mut cells[slot.index()];

        match (entry.category, entry.shared) {
            (Category::Income, true) => cell.income_shared += entry.amount,
            (Category::Income, false) => cell.income_other += entry.amount,
            (Category::Expense, true) => cell.expense_shared += entry.amount,
            (Category::Expense, false) => cell.expense_other += entry.amount,
            (Category::Transfer, _) => cell.transfer += entry.amount,
        }
    }

    let mut buckets: Vec<((i32, u8), ([PartyCells; 2], f64))> = months.into_iter().collect();
    buckets.sort_by_key(|(key, _)| *key);

    buckets
        .into_iter()
        .map(|((year, month), (mut cells, pos))| {
            for slot in [PartySlot::First, PartySlot::Second] {
                let own = cells[slot.index()];
                let other = cells[slot.other().index()];

                cells[slot.index()].total = own.income_shared + own.income_other + other.transfer
                    - own.transfer
                    - own.expense_shared
                    - own.expense_other;
            }

            let grand_total = cells[0].total + cells[1].total;

            MonthlyStat {
                label: month_label(year, month),
                year,
                month,
                parties: cells,
                pos,
                grand_total,
            }
        })
        .collect()
}

fn column_totals(rows: &[MonthlyStat]) -> MonthlyTotals {
    let mut totals = MonthlyTotals::default();

    for row in rows {
        for index in 0..2 {
            let cell = &mut totals.parties[index];
            let row_cell = row.parties[index];

            cell.income_shared += row_cell.income_shared;
            cell.expense_shared += row_cell.expense_shared;
            cell.transfer += row_cell.transfer;
            cell.income_other += row_cell.income_other;
            cell.expense_other += row_cell.expense_other;
            cell.total += row_cell.total;
        }

        totals.pos += row.pos;
        totals.grand_total += row.grand_total;
    }

    totals
}

/// A display label such as `"Jan-25"`.
fn month_label(year: i32, month: u8) -> String {
    let name = match Month::try_from(month) {
        Ok(Month::January) => "Jan",
        Ok(Month::February) => "Feb",
        Ok(Month::March) => "Mar",
        Ok(Month::April) => "Apr",
        Ok(Month::May) => "May",
        Ok(Month::June) => "Jun",
        Ok(Month::July) => "Jul",
        Ok(Month::August) => "Aug",
        Ok(Month::September) => "Sep",
        Ok(Month::October) => "Oct",
        Ok(Month::November) => "Nov",
        Ok(Month::December) => "Dec",
        Err(_) => "???",
    };

    format!("{}-{:02}", name, year.rem_euclid(100))
}
