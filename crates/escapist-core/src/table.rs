//! Lookup table from a first key to the keys that complete a combination.

use std::collections::{HashMap, HashSet};

/// First-key → set-of-second-keys, built once per setup.
///
/// Pairs are ordered: `('j', 'k')` does not imply `('k', 'j')`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinationTable {
    entries: HashMap<char, HashSet<char>>,
}

impl CombinationTable {
    /// Build a table from ordered `(first, second)` pairs. Duplicates collapse.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (char, char)>) -> Self {
        let mut entries: HashMap<char, HashSet<char>> = HashMap::new();
        for (first, second) in pairs {
            entries.entry(first).or_default().insert(second);
        }
        Self { entries }
    }

    /// Whether `key` can start a combination.
    pub fn is_first(&self, key: char) -> bool {
        self.entries.contains_key(&key)
    }

    /// Whether `second` typed after `first` completes a combination.
    pub fn completes(&self, first: char, second: char) -> bool {
        self.entries
            .get(&first)
            .is_some_and(|seconds| seconds.contains(&second))
    }

    /// Number of distinct `(first, second)` pairs.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_order_sensitive() {
        let table = CombinationTable::from_pairs([('j', 'k')]);
        assert!(table.completes('j', 'k'));
        assert!(!table.completes('k', 'j'));
        assert!(table.is_first('j'));
        assert!(!table.is_first('k'));
    }

    #[test]
    fn shared_first_key_collects_seconds() {
        let table = CombinationTable::from_pairs([('j', 'k'), ('j', 'j'), ('f', 'd')]);
        assert!(table.completes('j', 'k'));
        assert!(table.completes('j', 'j'));
        assert!(table.completes('f', 'd'));
        assert!(!table.completes('f', 'k'));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn duplicates_collapse() {
        let table = CombinationTable::from_pairs([('j', 'k'), ('j', 'k')]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn empty_table_matches_nothing() {
        let table = CombinationTable::default();
        assert!(table.is_empty());
        assert!(!table.is_first('j'));
        assert!(!table.completes('j', 'k'));
    }
}
