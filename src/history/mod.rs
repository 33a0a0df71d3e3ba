//! Undo/redo revision graph
//!
//! Actions form a tree, not a stack, but `earlier`/`later` walk the same
//! currently-threaded `current`/`redo_stack` path `undo`/`redo` do, `n`
//! steps at a time — never a separate timestamp-order walk over
//! `children`, which could name a different Action than `redo_stack`
//! holds once a node has more than one child. Represent as an arena of
//! `Action` with `parent: Option<ActionId>` and `children: Vec<ActionId>`,
//! navigated by id — never by pointer, carrying the piece table's
//! `buffer::Change` as the payload each `Action` undoes or redoes.

use crate::buffer::{Change, PieceTable};

pub const NIL: ActionId = ActionId(u32::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub u32);

impl ActionId {
    #[must_use]
    pub fn is_nil(self) -> bool {
        self == NIL
    }
}

/// A list of Changes produced between two snapshots, plus the wall-clock
/// time it closed. `timestamp` is supplied by the caller (library code
/// never reads the system clock, see `document::File::snapshot`).
#[derive(Debug, Clone)]
pub struct Action {
    pub changes: Vec<Change>,
    pub timestamp: u64,
    pub parent: Option<ActionId>,
    pub children: Vec<ActionId>,
}

impl Action {
    fn new(parent: Option<ActionId>, timestamp: u64) -> Self {
        Self { changes: Vec::new(), timestamp, parent, children: Vec::new() }
    }
}

/// One open-ended question this design answers explicitly (see DESIGN.md):
/// on a new edit after undo, should the abandoned redo branch be kept as a
/// sibling in the graph, or discarded? This implementation discards it,
/// matching the simpler of two equally defensible policies.
pub struct History {
    actions: Vec<Action>,
    /// Path from the root to the currently effective action, in order.
    /// Empty means "no action has ever been applied" (pristine document).
    current: Option<ActionId>,
    open: Option<ActionId>,
    /// Actions undone from `current`, most-recently-undone last, so a
    /// plain `redo()` pops from the back.
    redo_stack: Vec<ActionId>,
    saved_action_marker: Option<ActionId>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self { actions: Vec::new(), current: None, open: None, redo_stack: Vec::new(), saved_action_marker: None }
    }

    fn alloc_action(&mut self, parent: Option<ActionId>, timestamp: u64) -> ActionId {
        let id = ActionId(self.actions.len() as u32);
        self.actions.push(Action::new(parent, timestamp));
        if let Some(p) = parent {
            self.actions[p.0 as usize].children.push(id);
        }
        id
    }

    /// Record one Change against the currently-open Action, opening a new
    /// one (as a child of `current`) if none is open. `timestamp` is only
    /// used the first time this opens an action.
    pub fn record(&mut self, change: Change, timestamp: u64) {
        let action_id = match self.open {
            Some(id) => id,
            None => {
                let id = self.alloc_action(self.current, timestamp);
                self.open = Some(id);
                id
            }
        };
        self.actions[action_id.0 as usize].changes.push(change);
    }

    /// Close the current Action (`snapshot`). No-op if nothing
    /// is open. The piece table's CacheHint must be cleared by the caller
    /// (`buffer::PieceTable::snapshot_boundary`) alongside this call.
    pub fn snapshot(&mut self) {
        if let Some(id) = self.open.take() {
            self.current = Some(id);
            self.redo_stack.clear();
        }
    }

    /// Undo the current Action, applying its Changes in reverse onto
    /// `table`. Returns the position of the last reverted change.
    pub fn undo(&mut self, table: &mut PieceTable) -> Option<usize> {
        self.snapshot();
        let id = self.current?;
        let action = &self.actions[id.0 as usize];
        let mut last_pos = None;
        for change in action.changes.iter().rev() {
            last_pos = Some(change.position());
            table.apply_change(change, false);
        }
        self.current = action.parent;
        self.redo_stack.push(id);
        last_pos
    }

    /// Redo the most-recently-undone Action.
    pub fn redo(&mut self, table: &mut PieceTable) -> Option<usize> {
        let id = self.redo_stack.pop()?;
        let action = &self.actions[id.0 as usize];
        let mut last_pos = None;
        for change in &action.changes {
            last_pos = Some(change.position());
            table.apply_change(change, true);
        }
        self.current = Some(id);
        last_pos
    }

    /// Walk `n` Actions forward along `redo_stack`, exactly the path
    /// `n` calls to [`Self::redo`] would take. `later`/`earlier` must
    /// agree with `undo`/`redo` on which Action is "next", since a
    /// child-timestamp heuristic can name a different Action than the one
    /// `redo_stack` actually holds once a node has more than one child
    /// (e.g. an edit made after an undo, which creates a sibling of an
    /// already-undone Action without disturbing `redo_stack`).
    pub fn later(&mut self, n: usize, table: &mut PieceTable) -> Option<usize> {
        let mut last = None;
        for _ in 0..n {
            match self.redo(table) {
                Some(pos) => last = Some(pos),
                None => break,
            }
        }
        last
    }

    /// Walk `n` Actions backward, exactly the path `n` calls to
    /// [`Self::undo`] would take.
    pub fn earlier(&mut self, n: usize, table: &mut PieceTable) -> Option<usize> {
        let mut last = None;
        for _ in 0..n {
            match self.undo(table) {
                Some(pos) => last = Some(pos),
                None => break,
            }
        }
        last
    }

    /// Walk to the Action whose timestamp is closest to, and not
    /// exceeding, `timestamp`, along the currently-threaded `current`/
    /// `redo_stack` path (never by re-deriving a branch from `children`,
    /// for the same reason `later` doesn't).
    pub fn restore(&mut self, timestamp: u64, table: &mut PieceTable) {
        loop {
            let cur_ts = self.current.map(|id| self.actions[id.0 as usize].timestamp).unwrap_or(0);
            if cur_ts <= timestamp {
                break;
            }
            if self.undo(table).is_none() {
                break;
            }
        }
        loop {
            let Some(&next_id) = self.redo_stack.last() else { break };
            if self.actions[next_id.0 as usize].timestamp > timestamp {
                break;
            }
            self.redo(table);
        }
    }

    /// Timestamp of the currently effective Action, 0 if none.
    #[must_use]
    pub fn state(&self) -> u64 {
        self.current.map(|id| self.actions[id.0 as usize].timestamp).unwrap_or(0)
    }

    /// Mark the current Action as the last-saved one.
    pub fn mark_saved(&mut self) {
        self.saved_action_marker = self.current;
    }

    #[must_use]
    pub fn modified(&self) -> bool {
        self.saved_action_marker != self.current
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PieceTable;

    fn insert(history: &mut History, table: &mut PieceTable, pos: usize, bytes: &[u8], ts: u64) {
        let change = table.insert(pos, bytes).unwrap().unwrap();
        history.record(change, ts);
        history.snapshot();
        table.snapshot_boundary();
    }

    #[test]
    fn seven_undos_then_seven_redos_round_trip() {
        let mut table = PieceTable::new();
        let mut history = History::new();
        insert(&mut history, &mut table, 0, b"3", 1);
        insert(&mut history, &mut table, 0, b"1", 2);
        insert(&mut history, &mut table, 1, b"2", 3);
        insert(&mut history, &mut table, 3, b"46", 4);
        insert(&mut history, &mut table, 4, b"5", 5);
        insert(&mut history, &mut table, 6, b"789", 6);
        insert(&mut history, &mut table, 9, b"0", 7);
        assert_eq!(table.to_bytes(), b"1234567890");

        for _ in 0..7 {
            history.undo(&mut table);
        }
        assert_eq!(table.to_bytes(), b"");

        for _ in 0..7 {
            history.redo(&mut table);
        }
        assert_eq!(table.to_bytes(), b"1234567890");
    }

    #[test]
    fn undo_on_empty_document_is_noop() {
        let mut table = PieceTable::new();
        let mut history = History::new();
        assert_eq!(history.undo(&mut table), None);
    }

    #[test]
    fn edit_after_undo_discards_redo_branch() {
        let mut table = PieceTable::new();
        let mut history = History::new();
        insert(&mut history, &mut table, 0, b"a", 1);
        insert(&mut history, &mut table, 1, b"b", 2);
        history.undo(&mut table);
        assert_eq!(table.to_bytes(), b"a");
        insert(&mut history, &mut table, 1, b"c", 3);
        assert_eq!(table.to_bytes(), b"ac");
        assert_eq!(history.redo(&mut table), None);
    }

    #[test]
    fn later_after_branching_edit_follows_redo_stack_not_oldest_child() {
        let mut table = PieceTable::new();
        let mut history = History::new();
        insert(&mut history, &mut table, 0, b"a", 1);
        insert(&mut history, &mut table, 1, b"b", 2);
        history.undo(&mut table);
        assert_eq!(table.to_bytes(), b"a");
        // `a` now has two children: `b` (ts2) and `c` (ts3, created below).
        // `b` is older, but `c` is the branch actually threaded through
        // `current`/`redo_stack` since it was made most recently.
        insert(&mut history, &mut table, 1, b"c", 3);
        assert_eq!(table.to_bytes(), b"ac");
        history.undo(&mut table);
        assert_eq!(table.to_bytes(), b"a");
        history.later(1, &mut table);
        assert_eq!(table.to_bytes(), b"ac");
    }

    #[test]
    fn modified_tracks_saved_marker() {
        let mut table = PieceTable::new();
        let mut history = History::new();
        assert!(!history.modified());
        insert(&mut history, &mut table, 0, b"a", 1);
        assert!(history.modified());
        history.mark_saved();
        assert!(!history.modified());
    }
}
