//! The pair of tracked parties.
//!
//! The tracker follows the finances of exactly two people. Transfer
//! mirroring and the balance sheet are defined over "the other member of
//! the pair", so the pair is a hard constraint rather than a list of users.

/// The position of a tracked party within the configured pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartySlot {
    /// The first party of the pair.
    First,
    /// The second party of the pair.
    Second,
}

impl PartySlot {
    /// The counterpart slot in the fixed pair.
    pub fn other(self) -> Self {
        match self {
            PartySlot::First => PartySlot::Second,
            PartySlot::Second => PartySlot::First,
        }
    }

    /// The slot's position for indexing two-element arrays of per-party data.
    pub fn index(self) -> usize {
        match self {
            PartySlot::First => 0,
            PartySlot::Second => 1,
        }
    }
}

/// The two people whose transactions are split out in the per-party reports.
///
/// Transactions may name someone outside the pair; those are ignored by the
/// per-party aggregations but still count towards global filtered totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyPair {
    first: String,
    second: String,
}

impl PartyPair {
    /// Create a pair from the two configured party names.
    pub fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.to_owned(),
            second: second.to_owned(),
        }
    }

    /// The name of the party occupying `slot`.
    pub fn name(&self, slot: PartySlot) -> &str {
        match slot {
            PartySlot::First => &self.first,
            PartySlot::Second => &self.second,
        }
    }

    /// Which slot `name` occupies, or `None` if `name` is not a tracked party.
    pub fn slot_of(&self, name: &str) -> Option<PartySlot> {
        if name == self.first {
            Some(PartySlot::First)
        } else if name == self.second {
            Some(PartySlot::Second)
        } else {
            None
        }
    }

    /// Whether `name` is one of the two tracked parties.
    pub fn contains(&self, name: &str) -> bool {
        self.slot_of(name).is_some()
    }

    /// The name of the other tracked party, or `None` if `name` is untracked.
    pub fn counterpart(&self, name: &str) -> Option<&str> {
        self.slot_of(name).map(|slot| self.name(slot.other()))
    }
}

#[cfg(test)]
mod party_pair_tests {
    use super::{PartyPair, PartySlot};

    fn test_pair() -> PartyPair {
        PartyPair::new("Burimi", "Skenderi")
    }

    #[test]
    fn slot_of_recognizes_both_parties() {
        let pair = test_pair();

        assert_eq!(pair.slot_of("Burimi"), Some(PartySlot::First));
        assert_eq!(pair.slot_of("Skenderi"), Some(PartySlot::Second));
    }

    #[test]
    fn slot_of_rejects_untracked_name() {
        let pair = test_pair();

        assert_eq!(pair.slot_of("Alice"), None);
        assert!(!pair.contains("Alice"));
    }

    #[test]
    fn counterpart_is_the_other_party() {
        let pair = test_pair();

        assert_eq!(pair.counterpart("Burimi"), Some("Skenderi"));
        assert_eq!(pair.counterpart("Skenderi"), Some("Burimi"));
        assert_eq!(pair.counterpart("Alice"), None);
    }

    #[test]
    fn other_slot_round_trips() {
        assert_eq!(PartySlot::First.other(), PartySlot::Second);
        assert_eq!(PartySlot::Second.other().other(), PartySlot::Second);
    }
}
