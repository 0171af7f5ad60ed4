//! The per-party balance sheet.
//!
//! Unlike the monthly matrix this view does not split by the shared-project
//! marker. It is computed in two passes: first each party's own totals, then
//! the cross-assignment of incoming transfers, which are by definition the
//! other party's outgoing transfers.

use serde::Serialize;

use crate::{
    party::{PartyPair, PartySlot},
    transaction::Category,
};

use super::Entry;

/// The balance-sheet line of one tracked party.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartyBalance {
    /// The party's name.
    pub party: String,
    /// The party's total income.
    pub income: f64,
    /// The party's total expenses.
    pub expenses: f64,
    /// The sum of the party's own transfer legs.
    pub transfers_out: f64,
    /// The other party's `transfers_out`.
    pub transfers_in: f64,
    /// How many of the party's transactions were aggregated.
    pub transactions: usize,
    /// `income - expenses - transfers_out + transfers_in`.
    pub balance: f64,
}

/// Build the balance sheet for the two tracked parties from normalized
/// `entries`. Entries for untracked parties are ignored.
pub fn balance_sheet(entries: &[Entry], parties: &PartyPair) -> [PartyBalance; 2] {
    let mut balances: [PartyBalance; 2] = Default::default();

    for slot in [PartySlot::First, PartySlot::Second] {
        balances[slot.index()].party = parties.name(slot).to_owned();
    }

    for entry in entries {
        let Some(slot) = entry.slot else {
            continue;
        };

        let balance = &mut balances[slot.index()];
        balance.transactions += 1;

        match entry.category {
            Category::Income => balance.income += entry.amount,
            Category::Expense => balance.expenses += entry.amount,
            Category::Transfer => balance.transfers_out += entry.amount,
        }
    }

    for slot in [PartySlot::First, PartySlot::Second] {
        balances[slot.index()].transfers_in = balances[slot.other().index()].transfers_out;
    }

    for balance in &mut balances {
        balance.balance =
            balance.income - balance.expenses - balance.transfers_out + balance.transfers_in;
    }

    balances
}

#[cfg(test)]
mod balance_sheet_tests {
    use time::macros::date;

    use crate::{
        party::{PartyPair, PartySlot},
        report::Entry,
        transaction::Category,
    };

    use super::balance_sheet;

    fn entry(slot: Option<PartySlot>, category: Category, amount: f64) -> Entry {
        Entry {
            date: date!(2025 - 01 - 02),
            slot,
            category,
            shared: false,
            pos: false,
            amount,
        }
    }

    fn test_parties() -> PartyPair {
        PartyPair::new("Burimi", "Skenderi")
    }

    #[test]
    fn cross_assigns_transfers() {
        let entries = vec![
            entry(Some(PartySlot::First), Category::Income, 1500.0),
            entry(Some(PartySlot::First), Category::Transfer, 500.0),
            entry(Some(PartySlot::Second), Category::Expense, 300.0),
        ];

        let [first, second] = balance_sheet(&entries, &test_parties());

        assert_eq!(first.party, "Burimi");
        assert_eq!(first.income, 1500.0);
        assert_eq!(first.transfers_out, 500.0);
        assert_eq!(first.transfers_in, 0.0);
        assert_eq!(first.transactions, 2);
        assert_eq!(first.balance, 1000.0);

        assert_eq!(second.party, "Skenderi");
        assert_eq!(second.expenses, 300.0);
        assert_eq!(second.transfers_out, 0.0);
        assert_eq!(second.transfers_in, 500.0);
        assert_eq!(second.transactions, 1);
        assert_eq!(second.balance, 200.0);
    }

    #[test]
    fn transfers_in_mirrors_transfers_out() {
        let entries = vec![
            entry(Some(PartySlot::First), Category::Transfer, 250.0),
            entry(Some(PartySlot::Second), Category::Transfer, 100.0),
        ];

        let [first, second] = balance_sheet(&entries, &test_parties());

        assert_eq!(first.transfers_in, second.transfers_out);
        assert_eq!(second.transfers_in, first.transfers_out);
    }

    #[test]
    fn ignores_untracked_parties() {
        let entries = vec![
            entry(None, Category::Income, 1000.0),
            entry(Some(PartySlot::First), Category::Income, 10.0),
        ];

        let [first, second] = balance_sheet(&entries, &test_parties());

        assert_eq!(first.income, 10.0);
        assert_eq!(first.transactions, 1);
        assert_eq!(second.transactions, 0);
    }

    #[test]
    fn empty_input_produces_zeroed_sheet() {
        let [first, second] = balance_sheet(&[], &test_parties());

        assert_eq!(first.balance, 0.0);
        assert_eq!(second.balance, 0.0);
        assert_eq!(first.party, "Burimi");
        assert_eq!(second.party, "Skenderi");
    }
}
