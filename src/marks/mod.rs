//! Stable position marks
//!
//! A mark is a raw byte address `{slab, offset}`, not a document offset —
//! resolving it means scanning the current piece chain for the piece that
//! still references that address (a Mark becomes
//! `{slab_index, byte_offset_in_slab}`, resolved via the piece chain").
//! Marks therefore survive edits and even undo/redo for free, since slab
//! bytes are never rewritten; they only go `Invalid` when the piece that
//! published their address is spliced out of the live chain.

use crate::buffer::PieceTable;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    slab: u32,
    offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    At(usize),
    Invalid,
}

/// Named mark registers for one document: `a`..`z` plus the well-known
/// names `<`, `>`, `"`, `.` used by selections, registers and inserts.
#[derive(Default)]
pub struct Marks {
    named: HashMap<char, Mark>,
}

impl Marks {
    #[must_use]
    pub fn new() -> Self {
        Self { named: HashMap::new() }
    }

    /// Create a mark at `pos` without naming it (`set`).
    #[must_use]
    pub fn set(table: &PieceTable, pos: usize) -> Option<Mark> {
        table.address_of(pos).map(|(slab, offset)| Mark { slab, offset })
    }

    /// Resolve a mark against the current chain (`get`).
    #[must_use]
    pub fn get(table: &PieceTable, mark: Mark) -> Resolved {
        match table.resolve_address(mark.slab, mark.offset) {
            Some(pos) => Resolved::At(pos),
            None => Resolved::Invalid,
        }
    }

    /// Set (or clear) a named mark register, e.g. `'a'`, `'<'`, `'"'`.
    pub fn name(&mut self, name: char, mark: Mark) {
        self.named.insert(name, mark);
    }

    pub fn unname(&mut self, name: char) {
        self.named.remove(&name);
    }

    #[must_use]
    pub fn named(&self, name: char) -> Option<Mark> {
        self.named.get(&name).copied()
    }

    /// Resolve the named mark register, if set.
    #[must_use]
    pub fn resolve_named(&self, table: &PieceTable, name: char) -> Option<Resolved> {
        self.named(name).map(|m| Self::get(table, m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PieceTable;

    #[test]
    fn mark_survives_edit_before_it() {
        let mut table = PieceTable::new();
        table.insert(0, b"hello world").unwrap();
        let m = Marks::set(&table, 6).unwrap();
        table.snapshot_boundary();
        table.insert(0, b"XXX").unwrap();
        assert_eq!(Marks::get(&table, m), Resolved::At(9));
    }

    #[test]
    fn mark_invalidated_by_covering_delete_then_revived_by_undo() {
        use crate::history::History;

        let mut table = PieceTable::new();
        let mut history = History::new();
        let change = table.insert(0, b"hello world").unwrap().unwrap();
        history.record(change, 1);
        history.snapshot();
        table.snapshot_boundary();

        let m = Marks::set(&table, 6).unwrap();

        let change = table.insert(0, b"XXX").unwrap().unwrap();
        history.record(change, 2);
        history.snapshot();
        table.snapshot_boundary();
        assert_eq!(Marks::get(&table, m), Resolved::At(9));

        let change = table.delete(9, 5).unwrap().unwrap();
        history.record(change, 3);
        history.snapshot();
        table.snapshot_boundary();
        assert_eq!(Marks::get(&table, m), Resolved::Invalid);

        history.undo(&mut table);
        assert_eq!(Marks::get(&table, m), Resolved::At(9));
    }

    #[test]
    fn named_mark_roundtrip() {
        let mut table = PieceTable::new();
        table.insert(0, b"abc").unwrap();
        let mut marks = Marks::new();
        let m = Marks::set(&table, 1).unwrap();
        marks.name('a', m);
        assert_eq!(marks.resolve_named(&table, 'a'), Some(Resolved::At(1)));
        marks.unname('a');
        assert_eq!(marks.resolve_named(&table, 'a'), None);
    }
}
