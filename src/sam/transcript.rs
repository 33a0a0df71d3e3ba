//! The Transcript: the staged, not-yet-applied edit list a sam command
//! builds while walking its command tree, applied in one monotonic pass
//! once the whole tree has been evaluated without conflict.

use crate::buffer::PieceTable;
use crate::error::{EditorError, SamExecErrorKind};
use crate::history::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChange {
    pub kind: ChangeKind,
    pub start: usize,
    pub end: usize,
    pub data: Vec<u8>,
    /// The loop iteration that produced this change, for `count.mod`/bound
    /// bookkeeping by the caller; not consulted by the transcript itself.
    pub count: usize,
}

/// A sorted, pairwise non-overlapping set of staged edits for one
/// document. Insertion rejects anything that overlaps an existing entry
/// by flipping `conflict`, which the executor checks before applying.
#[derive(Default)]
pub struct Transcript {
    changes: Vec<StagedChange>,
    conflict: bool,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self { changes: Vec::new(), conflict: false }
    }

    #[must_use]
    pub fn has_conflict(&self) -> bool {
        self.conflict
    }

    #[must_use]
    pub fn entries(&self) -> &[StagedChange] {
        &self.changes
    }

    /// Stage one edit. Overlap with an already-staged edit (other than two
    /// zero-width edits at the same point, which compose harmlessly) sets
    /// the conflict flag instead of panicking, so the caller can surface
    /// `SamExecErrorKind::Conflict` after the whole tree has been walked.
    pub fn stage(&mut self, change: StagedChange) {
        let overlaps = self.changes.iter().any(|existing| ranges_overlap(existing, &change));
        if overlaps {
            self.conflict = true;
            return;
        }
        let idx = self.changes.partition_point(|c| c.start < change.start);
        self.changes.insert(idx, change);
    }

    /// Apply every staged change to `table`/`history` in position order,
    /// tracking a running byte delta so later ranges land correctly.
    /// Returns the byte delta of each applied change, in application
    /// order, for callers that need to reposition selections.
    pub fn apply(self, table: &mut PieceTable, history: &mut History, timestamp: u64) -> Result<Vec<i64>, EditorError> {
        if self.conflict {
            return Err(EditorError::SamExec(SamExecErrorKind::Conflict));
        }
        let mut delta: i64 = 0;
        let mut deltas = Vec::with_capacity(self.changes.len());
        for change in self.changes {
            let start = (change.start as i64 + delta).max(0) as usize;
            let end = (change.end as i64 + delta).max(0) as usize;
            let mut applied: i64 = 0;
            if end > start {
                if let Some(c) = table.delete(start, end - start)? {
                    applied += c.byte_delta();
                    history.record(c, timestamp);
                }
            }
            if !change.data.is_empty() {
                if let Some(c) = table.insert(start, &change.data)? {
                    applied += c.byte_delta();
                    history.record(c, timestamp);
                }
            }
            delta += applied;
            deltas.push(applied);
        }
        history.snapshot();
        table.snapshot_boundary();
        Ok(deltas)
    }
}

fn ranges_overlap(a: &StagedChange, b: &StagedChange) -> bool {
    if a.start == a.end && b.start == b.end {
        return false;
    }
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(start: usize, end: usize) -> StagedChange {
        StagedChange { kind: ChangeKind::Delete, start, end, data: Vec::new(), count: 0 }
    }

    #[test]
    fn overlapping_stages_set_conflict() {
        let mut t = Transcript::new();
        t.stage(change(0, 3));
        t.stage(change(2, 5));
        assert!(t.has_conflict());
    }

    #[test]
    fn disjoint_stages_remain_sorted() {
        let mut t = Transcript::new();
        t.stage(change(5, 8));
        t.stage(change(0, 3));
        assert!(!t.has_conflict());
        assert_eq!(t.entries()[0].start, 0);
        assert_eq!(t.entries()[1].start, 5);
    }

    #[test]
    fn apply_rejects_conflicted_transcript() {
        let mut table = PieceTable::new();
        table.insert(0, b"abcdef").unwrap();
        let mut history = History::new();
        let mut t = Transcript::new();
        t.stage(change(0, 2));
        t.stage(change(1, 3));
        let err = t.apply(&mut table, &mut history, 1).unwrap_err();
        assert!(matches!(err, EditorError::SamExec(SamExecErrorKind::Conflict)));
    }
}
