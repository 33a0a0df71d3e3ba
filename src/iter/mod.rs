//! Bidirectional cursor over the piece chain
//!
//! Built on top of `PieceTable::byte_at`/`size`, which already hide piece
//! boundaries, so this module only needs to add the codepoint/grapheme
//! stepping rules on top of a byte-indexed walk. Iterators are a view onto
//! the document at the moment they're created; any edit invalidates them
//! Cursors are invalidated by edits — callers re-fetch
//! rather than this module tracking generations.

use crate::buffer::PieceTable;

pub struct Cursor<'a> {
    table: &'a PieceTable,
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(table: &'a PieceTable, pos: usize) -> Self {
        Self { table, pos: pos.min(table.size()) }
    }

    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.table.byte_at(pos)
    }

    /// Advance by one byte. Returns `false` (and leaves `pos` pinned) at
    /// end of document.
    pub fn byte_next(&mut self) -> bool {
        if self.pos >= self.table.size() {
            return false;
        }
        self.pos += 1;
        true
    }

    /// Retreat by one byte. Returns `false` at the start of the document.
    pub fn byte_prev(&mut self) -> bool {
        if self.pos == 0 {
            return false;
        }
        self.pos -= 1;
        true
    }

    fn is_utf8_lead(byte: u8) -> bool {
        byte & 0b1100_0000 != 0b1000_0000
    }

    /// Advance to the next UTF-8 leading byte (the start of the next
    /// codepoint), skipping any continuation bytes.
    pub fn codepoint_next(&mut self) -> bool {
        if self.pos >= self.table.size() {
            return false;
        }
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.table.size() {
            match self.byte_at(self.pos) {
                Some(b) if !Self::is_utf8_lead(b) => self.pos += 1,
                _ => break,
            }
        }
        self.pos != start
    }

    /// Retreat to the previous UTF-8 leading byte.
    pub fn codepoint_prev(&mut self) -> bool {
        if self.pos == 0 {
            return false;
        }
        self.pos -= 1;
        while self.pos > 0 {
            match self.byte_at(self.pos) {
                Some(b) if !Self::is_utf8_lead(b) => self.pos -= 1,
                _ => break,
            }
        }
        true
    }

    /// Advance across a whole grapheme cluster: one base codepoint plus
    /// any following zero-width combining codepoints (using
    /// grapheme width=0 as the stop rule"). Combining marks are detected
    /// via `unicode_width`'s width-0 classification rather than a full
    /// Unicode grapheme-break table.
    pub fn char_next(&mut self) -> bool {
        if !self.codepoint_next() {
            return false;
        }
        loop {
            let before = self.pos;
            if !self.peek_is_zero_width() {
                break;
            }
            if !self.codepoint_next() {
                break;
            }
            if self.pos == before {
                break;
            }
        }
        true
    }

    /// Retreat across a whole grapheme cluster.
    pub fn char_prev(&mut self) -> bool {
        if !self.codepoint_prev() {
            return false;
        }
        while self.pos > 0 {
            let save = self.pos;
            if !self.codepoint_prev() {
                break;
            }
            if !self.peek_is_zero_width() {
                self.pos = save;
                break;
            }
        }
        true
    }

    fn peek_is_zero_width(&self) -> bool {
        let bytes = self.table.read(self.pos, 4);
        match std::str::from_utf8(&bytes).ok().and_then(|s| s.chars().next()) {
            Some(c) => unicode_width::UnicodeWidthChar::width(c).unwrap_or(1) == 0,
            None => false,
        }
    }

    /// Scan forward within the document for the next occurrence of `b`.
    pub fn byte_find_next(&self, b: u8) -> Option<usize> {
        let bytes = self.table.read(self.pos, self.table.size() - self.pos);
        memchr::memchr(b, &bytes).map(|i| self.pos + i)
    }

    /// Scan backward within the document for the previous occurrence of `b`.
    pub fn byte_find_prev(&self, b: u8) -> Option<usize> {
        let bytes = self.table.read(0, self.pos);
        memchr::memrchr(b, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_prev_pinned_at_zero() {
        let mut table = PieceTable::new();
        table.insert(0, b"abc").unwrap();
        let mut cur = Cursor::new(&table, 0);
        assert!(!cur.byte_prev());
        assert_eq!(cur.pos(), 0);
    }

    #[test]
    fn byte_next_pinned_at_end() {
        let mut table = PieceTable::new();
        table.insert(0, b"abc").unwrap();
        let mut cur = Cursor::new(&table, 3);
        assert!(!cur.byte_next());
        assert_eq!(cur.pos(), 3);
    }

    #[test]
    fn codepoint_next_skips_continuation_bytes() {
        let mut table = PieceTable::new();
        table.insert(0, "a\u{00e9}b".as_bytes()).unwrap(); // a, e-acute (2 bytes), b
        let mut cur = Cursor::new(&table, 0);
        assert!(cur.codepoint_next());
        assert_eq!(cur.pos(), 1);
        assert!(cur.codepoint_next());
        assert_eq!(cur.pos(), 3);
    }

    #[test]
    fn byte_find_next_locates_needle() {
        let mut table = PieceTable::new();
        table.insert(0, b"hello world").unwrap();
        let cur = Cursor::new(&table, 0);
        assert_eq!(cur.byte_find_next(b'w'), Some(6));
    }

    #[test]
    fn byte_find_prev_locates_needle() {
        let mut table = PieceTable::new();
        table.insert(0, b"hello world").unwrap();
        let cur = Cursor::new(&table, 11);
        assert_eq!(cur.byte_find_prev(b'o'), Some(7));
    }
}
