//! Piece table text buffer
//!
//! `PieceTable` owns the slab list and the piece arena/chain; every
//! mutation produces a `Change` that the caller (`document::File`, via
//! `history::History`) threads into the undo graph. The table never
//! mutates a published piece except through the CacheHint fast path,
//! and never frees a slab while the document is alive —
//! old pieces may still reference it after undo.

pub mod piece;
pub mod slab;

use crate::error::EditorError;
use piece::{Piece, PieceArena, PieceId};
use slab::Slab;

/// A swap of one span of the logical chain for another, or an in-place
/// length edit of a single piece (the CacheHint fast path).
#[derive(Debug, Clone)]
pub enum Change {
    Splice {
        position: usize,
        before: PieceId,
        after: PieceId,
        old: SpanRecord,
        new: SpanRecord,
        delta: i64,
    },
    Resize {
        position: usize,
        piece: PieceId,
        old_len: usize,
        new_len: usize,
    },
}

impl Change {
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Splice { position, .. } | Self::Resize { position, .. } => *position,
        }
    }

    #[must_use]
    pub fn byte_delta(&self) -> i64 {
        match self {
            Self::Splice { delta, .. } => *delta,
            Self::Resize { old_len, new_len, .. } => *new_len as i64 - *old_len as i64,
        }
    }
}

/// A contiguous run of pieces as `[start, end]` inclusive, or empty.
#[derive(Debug, Clone, Copy)]
pub struct SpanRecord(pub Option<(PieceId, PieceId)>);

impl SpanRecord {
    #[must_use]
    pub fn empty() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn single(id: PieceId) -> Self {
        Self(Some((id, id)))
    }

    #[must_use]
    pub fn range(start: PieceId, end: PieceId) -> Self {
        Self(Some((start, end)))
    }
}

struct CacheHint {
    piece: PieceId,
    slab: u32,
}

pub struct PieceTable {
    slabs: Vec<Slab>,
    arena: PieceArena,
    len: usize,
    cache_hint: Option<CacheHint>,
    /// Pieces with `id.0 >= action_piece_floor` were created by the
    /// currently-open Action and are eligible for the CacheHint fast path.
    action_piece_floor: u32,
}

enum Location {
    /// `pos` falls exactly between two pieces (or at chain head/tail).
    Boundary { before: PieceId, after: PieceId },
    /// `pos` falls strictly inside a piece.
    Inside {
        piece: PieceId,
        piece_start: usize,
        offset: usize,
    },
}

impl PieceTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slabs: Vec::new(),
            arena: PieceArena::new(),
            len: 0,
            cache_hint: None,
            action_piece_floor: 0,
        }
    }

    /// Build a table whose initial content is the given slab's full bytes
    /// (the loaded original file).
    #[must_use]
    pub fn from_original(original: Slab) -> Self {
        let mut table = Self::new();
        let len = original.len();
        table.slabs.push(original);
        if len > 0 {
            let id = table.arena.alloc(Piece { slab: 0, offset: 0, length: len });
            table.arena.splice(table.arena.begin, None, table.arena.end, Some((id, id)));
        }
        table.len = len;
        table.action_piece_floor = table.arena.len();
        table
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Called when a History Action closes (`history::History::snapshot`):
    /// the next mutation cannot extend pieces from the action that just
    /// closed.
    pub fn snapshot_boundary(&mut self) {
        self.cache_hint = None;
        self.action_piece_floor = self.arena.len();
    }

    fn locate(&self, pos: usize) -> Location {
        let mut cumulative = 0usize;
        let mut prev = self.arena.begin;
        for (id, piece) in self.arena.iter_chain() {
            let piece_start = cumulative;
            let piece_end = cumulative + piece.length;
            if pos == piece_start {
                return Location::Boundary { before: self.arena.prev(id), after: id };
            }
            if pos > piece_start && pos < piece_end {
                return Location::Inside { piece: id, piece_start, offset: pos - piece_start };
            }
            cumulative = piece_end;
            prev = id;
        }
        Location::Boundary { before: prev, after: self.arena.end }
    }

    fn heap_slab_for(&mut self, min_bytes: usize) -> u32 {
        if let Some(hint) = &self.cache_hint {
            if self.slabs[hint.slab as usize].remaining() >= min_bytes {
                return hint.slab;
            }
        }
        self.slabs.push(Slab::new_heap(min_bytes));
        (self.slabs.len() - 1) as u32
    }

    /// Insert `bytes` at `pos`. Zero-length is a no-op.
    pub fn insert(&mut self, pos: usize, bytes: &[u8]) -> Result<Option<Change>, EditorError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        if pos > self.len {
            return Err(EditorError::bad_position(pos, self.len));
        }

        match self.locate(pos) {
            Location::Boundary { before, after } => {
                if let Some(change) = self.try_fast_append(before, bytes) {
                    self.len += bytes.len();
                    return Ok(Some(change));
                }
                let slab_idx = self.heap_slab_for(bytes.len());
                let offset = self.slabs[slab_idx as usize].append(bytes)?;
                let id = self.arena.alloc(Piece { slab: slab_idx, offset, length: bytes.len() });
                self.arena.splice(before, None, after, Some((id, id)));
                self.cache_hint = Some(CacheHint { piece: id, slab: slab_idx });
                self.len += bytes.len();
                Ok(Some(Change::Splice {
                    position: pos,
                    before,
                    after,
                    old: SpanRecord::empty(),
                    new: SpanRecord::single(id),
                    delta: bytes.len() as i64,
                }))
            }
            Location::Inside { piece, piece_start: _, offset } => {
                let p = *self.arena.get(piece);
                let before = self.arena.prev(piece);
                let after = self.arena.next(piece);
                let pbefore = Piece { slab: p.slab, offset: p.offset, length: offset };
                let pafter = Piece { slab: p.slab, offset: p.offset + offset, length: p.length - offset };
                let id_before = self.arena.alloc(pbefore);
                let id_after = self.arena.alloc(pafter);
                let slab_idx = self.heap_slab_for(bytes.len());
                let new_offset = self.slabs[slab_idx as usize].append(bytes)?;
                let id_new = self.arena.alloc(Piece { slab: slab_idx, offset: new_offset, length: bytes.len() });
                self.arena.thread(&[id_before, id_new, id_after]);
                self.arena.splice(before, Some((piece, piece)), after, Some((id_before, id_after)));
                self.cache_hint = Some(CacheHint { piece: id_new, slab: slab_idx });
                self.len += bytes.len();
                Ok(Some(Change::Splice {
                    position: pos,
                    before,
                    after,
                    old: SpanRecord::single(piece),
                    new: SpanRecord::range(id_before, id_after),
                    delta: bytes.len() as i64,
                }))
            }
        }
    }

    /// Attempt the CacheHint fast path: `before` is the piece immediately
    /// preceding `pos`; if it's the most-recently-created piece of the
    /// open Action and its slab tail is still exactly at its end, grow it
    /// in place instead of allocating a new piece triple.
    fn try_fast_append(&mut self, before: PieceId, bytes: &[u8]) -> Option<Change> {
        let hint = self.cache_hint.as_ref()?;
        if hint.piece != before || before.0 < self.action_piece_floor {
            return None;
        }
        let piece = *self.arena.get(before);
        if piece.slab != hint.slab {
            return None;
        }
        let tail = piece.offset + piece.length;
        let slab = self.slabs.get_mut(piece.slab as usize)?;
        if slab.remaining() < bytes.len() {
            return None;
        }
        slab.extend_tail(tail, bytes).ok()?;
        let old_len = piece.length;
        let new_len = old_len + bytes.len();
        self.arena.set_length(before, new_len);
        Some(Change::Resize { position: tail, piece: before, old_len, new_len })
    }

    /// Delete `len` bytes starting at `pos`.
    pub fn delete(&mut self, pos: usize, len: usize) -> Result<Option<Change>, EditorError> {
        if len == 0 {
            return Ok(None);
        }
        if pos + len > self.len {
            return Err(EditorError::bad_position(pos + len, self.len));
        }

        let (first_piece, mut walk_start, offset_in_first) = match self.locate(pos) {
            Location::Boundary { after, .. } => (after, pos, 0usize),
            Location::Inside { piece, piece_start, offset } => (piece, piece_start, offset),
        };

        if let Some(hint) = &self.cache_hint {
            let piece = *self.arena.get(first_piece);
            let piece_end = walk_start + piece.length;
            if hint.piece == first_piece && first_piece.0 >= self.action_piece_floor && pos + len == piece_end {
                let old_len = piece.length;
                let new_len = old_len - len;
                self.arena.set_length(first_piece, new_len);
                self.len -= len;
                return Ok(Some(Change::Resize { position: pos, piece: first_piece, old_len, new_len }));
            }
        }

        let mut end_piece = first_piece;
        let offset_in_last;
        loop {
            let piece = *self.arena.get(end_piece);
            let piece_end = walk_start + piece.length;
            if pos + len <= piece_end {
                offset_in_last = pos + len - walk_start;
                break;
            }
            walk_start = piece_end;
            end_piece = self.arena.next(end_piece);
        }

        let first = *self.arena.get(first_piece);
        let last = *self.arena.get(end_piece);
        let before = self.arena.prev(first_piece);
        let after = self.arena.next(end_piece);

        let prefix_len = offset_in_first;
        let suffix_len = last.length - offset_in_last;

        let prefix_id =
            (prefix_len > 0).then(|| self.arena.alloc(Piece { slab: first.slab, offset: first.offset, length: prefix_len }));
        let suffix_id = (suffix_len > 0).then(|| {
            self.arena.alloc(Piece { slab: last.slab, offset: last.offset + offset_in_last, length: suffix_len })
        });
        let new_span = match (prefix_id, suffix_id) {
            (Some(a), Some(b)) => {
                self.arena.thread(&[a, b]);
                Some((a, b))
            }
            (Some(a), None) => Some((a, a)),
            (None, Some(b)) => Some((b, b)),
            (None, None) => None,
        };

        self.arena.splice(before, Some((first_piece, end_piece)), after, new_span);
        self.cache_hint = None;
        self.len -= len;

        Ok(Some(Change::Splice {
            position: pos,
            before,
            after,
            old: SpanRecord::range(first_piece, end_piece),
            new: new_span.map_or(SpanRecord::empty(), |(a, b)| SpanRecord::range(a, b)),
            delta: -(len as i64),
        }))
    }

    /// Apply (or reverse, if `forward` is false) a previously-produced
    /// Change. Used by `history::History` for undo/redo.
    pub fn apply_change(&mut self, change: &Change, forward: bool) {
        match change {
            Change::Splice { before, after, old, new, delta, .. } => {
                if forward {
                    self.arena.splice(*before, old.0, *after, new.0);
                    self.len = (self.len as i64 + delta) as usize;
                } else {
                    self.arena.splice(*before, new.0, *after, old.0);
                    self.len = (self.len as i64 - delta) as usize;
                }
            }
            Change::Resize { piece, old_len, new_len, .. } => {
                if forward {
                    self.arena.set_length(*piece, *new_len);
                    self.len = self.len + new_len - old_len;
                } else {
                    self.arena.set_length(*piece, *old_len);
                    self.len = self.len - new_len + old_len;
                }
            }
        }
        self.cache_hint = None;
    }

    /// Read `len` bytes starting at `pos` into `out`.
    pub fn read_into(&self, pos: usize, len: usize, out: &mut Vec<u8>) {
        if len == 0 || pos >= self.len {
            return;
        }
        let end = (pos + len).min(self.len);
        let mut cumulative = 0usize;
        for (_, piece) in self.arena.iter_chain() {
            let piece_start = cumulative;
            let piece_end = cumulative + piece.length;
            cumulative = piece_end;
            if piece_end <= pos || piece_start >= end {
                continue;
            }
            let lo = pos.max(piece_start) - piece_start;
            let hi = end.min(piece_end) - piece_start;
            let slab = &self.slabs[piece.slab as usize];
            out.extend_from_slice(&slab.data()[piece.offset + lo..piece.offset + hi]);
            if piece_end >= end {
                break;
            }
        }
    }

    #[must_use]
    pub fn read(&self, pos: usize, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len.min(self.len.saturating_sub(pos)));
        self.read_into(pos, len, &mut out);
        out
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.read(0, self.len)
    }

    #[must_use]
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        if pos >= self.len {
            return None;
        }
        let mut cumulative = 0usize;
        for (_, piece) in self.arena.iter_chain() {
            let piece_end = cumulative + piece.length;
            if pos < piece_end {
                let slab = &self.slabs[piece.slab as usize];
                return Some(slab.data()[piece.offset + (pos - cumulative)]);
            }
            cumulative = piece_end;
        }
        None
    }

    /// Resolve a byte address `(slab, offset)` to a global document offset,
    /// or `None` if no live piece currently covers it — used by
    /// `marks::Marks::get` to detect an invalidated mark.
    #[must_use]
    pub fn resolve_address(&self, slab: u32, addr_offset: usize) -> Option<usize> {
        let mut cumulative = 0usize;
        for (_, piece) in self.arena.iter_chain() {
            if piece.slab == slab && addr_offset >= piece.offset && addr_offset < piece.offset + piece.length {
                return Some(cumulative + (addr_offset - piece.offset));
            }
            cumulative += piece.length;
        }
        None
    }

    /// Address of the byte at `pos`, for `marks::Marks::set`.
    #[must_use]
    pub fn address_of(&self, pos: usize) -> Option<(u32, usize)> {
        let mut cumulative = 0usize;
        for (_, piece) in self.arena.iter_chain() {
            let piece_end = cumulative + piece.length;
            if pos < piece_end {
                return Some((piece.slab, piece.offset + (pos - cumulative)));
            }
            cumulative = piece_end;
        }
        None
    }
}

impl Default for PieceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_table() -> PieceTable {
        PieceTable::new()
    }

    #[test]
    fn insert_into_empty_then_read_back() {
        let mut t = empty_table();
        t.insert(0, b"hello").unwrap();
        assert_eq!(t.size(), 5);
        assert_eq!(t.to_bytes(), b"hello");
    }

    #[test]
    fn insert_at_middle_splits_piece() {
        let mut t = PieceTable::from_original(Slab::new_heap(0));
        t.insert(0, b"helloworld").unwrap();
        t.snapshot_boundary();
        t.insert(5, b" ").unwrap();
        assert_eq!(t.to_bytes(), b"hello world");
    }

    #[test]
    fn fast_path_extends_tail_without_new_piece() {
        let mut t = empty_table();
        t.insert(0, b"ab").unwrap();
        t.insert(2, b"cd").unwrap();
        assert_eq!(t.to_bytes(), b"abcd");
        assert_eq!(t.arena.iter_chain().count(), 1, "contiguous tail inserts should coalesce into one piece");
    }

    #[test]
    fn snapshot_boundary_prevents_coalescing_across_actions() {
        let mut t = empty_table();
        t.insert(0, b"ab").unwrap();
        t.snapshot_boundary();
        t.insert(2, b"cd").unwrap();
        assert_eq!(t.to_bytes(), b"abcd");
        assert_eq!(t.arena.iter_chain().count(), 2);
    }

    #[test]
    fn delete_zero_length_is_noop() {
        let mut t = empty_table();
        t.insert(0, b"abc").unwrap();
        let change = t.delete(1, 0).unwrap();
        assert!(change.is_none());
        assert_eq!(t.to_bytes(), b"abc");
    }

    #[test]
    fn delete_middle_range() {
        let mut t = empty_table();
        t.insert(0, b"hello world").unwrap();
        t.snapshot_boundary();
        t.delete(5, 6).unwrap();
        assert_eq!(t.to_bytes(), b"hello");
    }

    #[test]
    fn delete_spanning_multiple_pieces() {
        let mut t = empty_table();
        t.insert(0, b"aaa").unwrap();
        t.snapshot_boundary();
        t.insert(3, b"bbb").unwrap();
        t.snapshot_boundary();
        t.insert(6, b"ccc").unwrap();
        t.snapshot_boundary();
        t.delete(2, 4).unwrap();
        assert_eq!(t.to_bytes(), b"aacc");
    }

    #[test]
    fn apply_change_reverse_restores_content() {
        let mut t = empty_table();
        let change = t.insert(0, b"abc").unwrap().unwrap();
        assert_eq!(t.to_bytes(), b"abc");
        t.apply_change(&change, false);
        assert_eq!(t.to_bytes(), b"");
        t.apply_change(&change, true);
        assert_eq!(t.to_bytes(), b"abc");
    }

    #[test]
    fn out_of_bounds_insert_errors() {
        let mut t = empty_table();
        t.insert(0, b"abc").unwrap();
        assert!(t.insert(10, b"x").is_err());
    }

    #[test]
    fn out_of_bounds_delete_does_not_mutate() {
        let mut t = empty_table();
        t.insert(0, b"abc").unwrap();
        assert!(t.delete(1, 10).is_err());
        assert_eq!(t.to_bytes(), b"abc");
    }

    #[test]
    fn address_roundtrip_survives_split() {
        let mut t = empty_table();
        t.insert(0, b"helloworld").unwrap();
        let addr = t.address_of(6).unwrap();
        t.snapshot_boundary();
        t.insert(0, b"XXX").unwrap();
        let resolved = t.resolve_address(addr.0, addr.1).unwrap();
        assert_eq!(resolved, 9);
    }
}
