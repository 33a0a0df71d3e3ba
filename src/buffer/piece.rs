//! Piece arena and logical chain
//!
//! Pieces live in a flat arena (`Vec<PieceNode>`) addressed by `PieceId`
//! (a `u32` index); the logical chain is an intrusive doubly-linked list
//! over that arena (`prev`/`next` fields), bracketed by `begin`/`end`
//! sentinels that are never unlinked. This is the memory-safe rendering of
//! the design note's "arena of pieces with u32 indices for prev/next,
//! `None = u32::MAX`" — splicing a span in or out is two pointer (index)
//! rewrites, O(1) regardless of chain length.
//!
//! A piece is immutable once published except for its `prev`/`next` links;
//! `length` may only change through the CacheHint fast path while the
//! piece is still the most-recently-created one in the *open* Action (see
//! `buffer::PieceTable::insert`).

pub const NIL: PieceId = PieceId(u32::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceId(pub u32);

impl PieceId {
    #[must_use]
    pub fn is_nil(self) -> bool {
        self == NIL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub slab: u32,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PieceNode {
    pub piece: Piece,
    pub prev: PieceId,
    pub next: PieceId,
    /// Once a node is spliced out of the live chain it is kept in the
    /// allocation list (every piece ever created...
    /// freed on document teardown") but never revisited by chain walks.
    pub live: bool,
}

/// Arena of every piece ever created, plus the two sentinels bracketing the
/// logical chain. Old (spliced-out) nodes stay here so that undo can relink
/// them and so marks can still resolve addresses that fall inside them.
pub struct PieceArena {
    nodes: Vec<PieceNode>,
    pub begin: PieceId,
    pub end: PieceId,
}

impl PieceArena {
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::new();
        let begin = PieceId(0);
        let end = PieceId(1);
        nodes.push(PieceNode {
            piece: Piece { slab: 0, offset: 0, length: 0 },
            prev: NIL,
            next: end,
            live: true,
        });
        nodes.push(PieceNode {
            piece: Piece { slab: 0, offset: 0, length: 0 },
            prev: begin,
            next: NIL,
            live: true,
        });
        Self { nodes, begin, end }
    }

    pub fn alloc(&mut self, piece: Piece) -> PieceId {
        let id = PieceId(self.nodes.len() as u32);
        self.nodes.push(PieceNode {
            piece,
            prev: NIL,
            next: NIL,
            live: false,
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: PieceId) -> &Piece {
        &self.nodes[id.0 as usize].piece
    }

    pub fn set_length(&mut self, id: PieceId, length: usize) {
        self.nodes[id.0 as usize].piece.length = length;
    }

    #[must_use]
    pub fn prev(&self, id: PieceId) -> PieceId {
        self.nodes[id.0 as usize].prev
    }

    #[must_use]
    pub fn next(&self, id: PieceId) -> PieceId {
        self.nodes[id.0 as usize].next
    }

    #[must_use]
    pub fn is_sentinel(&self, id: PieceId) -> bool {
        id == self.begin || id == self.end
    }

    /// Swap the contiguous run `[old_start, old_end]` for the (possibly
    /// empty) run `[new_start, new_end]`. Only the two boundary links of
    /// the new run are touched here; its interior prev/next are assumed
    /// already threaded by the caller (see `thread`) when it spans more
    /// than one node — rewriting them here would clobber that threading.
    pub fn splice(
        &mut self,
        before: PieceId,
        old_span: Option<(PieceId, PieceId)>,
        after: PieceId,
        new_span: Option<(PieceId, PieceId)>,
    ) {
        if let Some((old_start, old_end)) = old_span {
            self.mark_spliced_out(old_start, old_end);
        }
        let (new_start, new_end) = match new_span {
            Some(pair) => pair,
            None => (after, NIL),
        };
        if new_span.is_some() {
            if !new_start.is_nil() {
                self.nodes[new_start.0 as usize].prev = before;
                self.nodes[new_start.0 as usize].live = true;
            }
            if !new_end.is_nil() {
                self.nodes[new_end.0 as usize].next = after;
                self.nodes[new_end.0 as usize].live = true;
            }
        }
        if !before.is_nil() {
            self.nodes[before.0 as usize].next = new_start;
        }
        if !after.is_nil() {
            self.nodes[after.0 as usize].prev = if new_span.is_some() { new_end } else { before };
        }
    }

    fn mark_spliced_out(&mut self, start: PieceId, end: PieceId) {
        let mut cur = start;
        loop {
            self.nodes[cur.0 as usize].live = false;
            if cur == end {
                break;
            }
            cur = self.nodes[cur.0 as usize].next;
        }
    }

    /// Thread a freshly-allocated contiguous run of ids into a private
    /// chain (each node's prev/next point at its neighbor within the run).
    pub fn thread(&mut self, ids: &[PieceId]) {
        for w in ids.windows(2) {
            self.nodes[w[0].0 as usize].next = w[1];
            self.nodes[w[1].0 as usize].prev = w[0];
        }
    }

    /// Walk from `begin.next` to `end` collecting pieces in chain order.
    pub fn iter_chain(&self) -> ChainIter<'_> {
        ChainIter { arena: self, cur: self.next(self.begin) }
    }

    /// Number of nodes ever allocated, including the two sentinels. A
    /// piece's id is stable for its lifetime, so this doubles as a
    /// monotonic watermark (`buffer::PieceTable::action_piece_floor`).
    #[must_use]
    pub fn len(&self) -> u32 {
        self.nodes.len() as u32
    }
}

impl Default for PieceArena {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ChainIter<'a> {
    arena: &'a PieceArena,
    cur: PieceId,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = (PieceId, &'a Piece);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur == self.arena.end || self.cur.is_nil() {
            return None;
        }
        let id = self.cur;
        self.cur = self.arena.next(id);
        Some((id, self.arena.get(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_arena_chain_is_empty() {
        let arena = PieceArena::new();
        assert_eq!(arena.iter_chain().count(), 0);
    }

    #[test]
    fn splice_insert_into_empty_chain() {
        let mut arena = PieceArena::new();
        let p = arena.alloc(Piece { slab: 0, offset: 0, length: 5 });
        arena.splice(arena.begin, None, arena.end, Some((p, p)));
        let collected: Vec<_> = arena.iter_chain().map(|(_, piece)| piece.length).collect();
        assert_eq!(collected, vec![5]);
    }

    #[test]
    fn splice_remove_restores_empty_chain() {
        let mut arena = PieceArena::new();
        let p = arena.alloc(Piece { slab: 0, offset: 0, length: 5 });
        arena.splice(arena.begin, None, arena.end, Some((p, p)));
        arena.splice(arena.begin, Some((p, p)), arena.end, None);
        assert_eq!(arena.iter_chain().count(), 0);
    }
}
