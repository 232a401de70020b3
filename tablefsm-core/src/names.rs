//! Slot-indexed name tables.

use std::collections::HashMap;

/// Optional names for a dense range of indices, with reverse lookup.
///
/// Slots start unset. The reverse map is rebuilt after every mutation and
/// resolves duplicate names to their lowest index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<Option<String>>,
    lookup: HashMap<String, usize>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table of `len` unset slots.
    pub fn with_len(len: usize) -> Self {
        Self {
            names: vec![None; len],
            lookup: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the name at `index`, if the slot exists and is set.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).and_then(|n| n.as_deref())
    }

    /// Names slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn set(&mut self, index: usize, name: impl Into<String>) {
        assert!(
            index < self.names.len(),
            "name index {} out of range (len {})",
            index,
            self.names.len()
        );
        self.names[index] = Some(name.into());
        self.rebuild();
    }

    /// Names consecutive slots starting at `start`, rebuilding the lookup
    /// once.
    ///
    /// # Panics
    ///
    /// Panics if the names run past the end of the table.
    pub fn set_from<I, S>(&mut self, start: usize, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (offset, name) in names.into_iter().enumerate() {
            let index = start + offset;
            assert!(
                index < self.names.len(),
                "name index {} out of range (len {})",
                index,
                self.names.len()
            );
            self.names[index] = Some(name.into());
        }
        self.rebuild();
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Truncates or pads with unset slots.
    pub fn resize(&mut self, len: usize) {
        self.names.resize(len, None);
        self.rebuild();
    }

    /// Removes slot `index`, shifting later slots down by one.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        let removed = self.names.remove(index);
        self.rebuild();
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.names.iter().map(|n| n.as_deref())
    }

    /// Index of the first unset slot.
    pub fn first_unset(&self) -> Option<usize> {
        self.names.iter().position(Option::is_none)
    }

    fn rebuild(&mut self) {
        self.lookup.clear();
        for (index, name) in self.names.iter().enumerate() {
            if let Some(name) = name {
                self.lookup.entry(name.clone()).or_insert(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_start_unset() {
        let table = NameTable::with_len(3);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), None);
        assert_eq!(table.first_unset(), Some(0));
        assert_eq!(table.index_of("idle"), None);
    }

    #[test]
    fn test_set_and_lookup() {
        let mut table = NameTable::with_len(2);
        table.set(1, "walk");
        assert_eq!(table.get(1), Some("walk"));
        assert_eq!(table.index_of("walk"), Some(1));

        table.set(1, "run");
        assert_eq!(table.index_of("walk"), None);
        assert_eq!(table.index_of("run"), Some(1));
    }

    #[test]
    fn test_duplicate_names_resolve_to_lowest_index() {
        let mut table = NameTable::with_len(3);
        table.set(2, "dup");
        table.set(0, "dup");
        assert_eq!(table.index_of("dup"), Some(0));
    }

    #[test]
    fn test_resize_and_remove_rebuild_lookup() {
        let mut table = NameTable::with_len(3);
        table.set(0, "a");
        table.set(1, "b");
        table.set(2, "c");

        assert_eq!(table.remove(0), Some("a".to_string()));
        assert_eq!(table.index_of("c"), Some(1));
        assert_eq!(table.index_of("a"), None);

        table.resize(1);
        assert_eq!(table.index_of("c"), None);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![Some("b")]);

        table.resize(2);
        assert_eq!(table.get(1), None);
    }

    #[test]
    fn test_set_from() {
        let mut table = NameTable::with_len(4);
        table.set_from(1, ["b", "c"]);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![None, Some("b"), Some("c"), None]);
        assert_eq!(table.index_of("c"), Some(2));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_set_out_of_range_panics() {
        NameTable::with_len(1).set(1, "x");
    }
}
