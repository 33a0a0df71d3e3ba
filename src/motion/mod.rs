//! Motions and text objects
//!
//! Built over `classify`'s whitespace/alphanumeric/symbol character
//! classes as pure `fn(context, byte_pos) -> byte_pos` functions over the
//! piece table, since the core has no line/column concept until the
//! `view` layer lays bytes onto a screen.

pub mod classify;

use crate::buffer::PieceTable;
use classify::{classify, CharClass};

/// Behavior descriptor bits. Plain `u8` flags rather than a
/// `bitflags`-crate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionFlags(pub u8);

impl MotionFlags {
    pub const LINEWISE: Self = Self(1 << 0);
    pub const CHARWISE: Self = Self(1 << 1);
    pub const INCLUSIVE: Self = Self(1 << 2);
    pub const IDEMPOTENT: Self = Self(1 << 3);
    pub const JUMP: Self = Self(1 << 4);
    pub const COUNT_EXACT: Self = Self(1 << 5);

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

pub struct MotionContext<'a> {
    pub table: &'a PieceTable,
}

impl<'a> MotionContext<'a> {
    #[must_use]
    pub fn new(table: &'a PieceTable) -> Self {
        Self { table }
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        let bytes = self.table.read(pos, 4);
        std::str::from_utf8(&bytes).ok().and_then(|s| s.chars().next())
    }

    fn class_at(&self, pos: usize) -> Option<CharClass> {
        self.char_at(pos).map(classify)
    }
}

/// `fn(context, pos) -> pos`, applied `count` times unless `Idempotent`.
pub type MotionFn = fn(&MotionContext, usize) -> Option<usize>;

pub struct Motion {
    pub flags: MotionFlags,
    pub apply: MotionFn,
}

impl Motion {
    /// Run the motion `count` times (or once, if `Idempotent` —
    /// "applying count N collapses to one application").
    #[must_use]
    pub fn run(&self, ctx: &MotionContext, pos: usize, count: usize) -> Option<usize> {
        let count = count.max(1);
        if self.flags.contains(MotionFlags::IDEMPOTENT) {
            return (self.apply)(ctx, pos);
        }
        let mut cur = pos;
        for i in 0..count {
            match (self.apply)(ctx, cur) {
                Some(next) => cur = next,
                None => {
                    if self.flags.contains(MotionFlags::COUNT_EXACT) && i + 1 < count {
                        return None;
                    }
                    break;
                }
            }
        }
        Some(cur)
    }
}

pub fn char_forward(ctx: &MotionContext, pos: usize) -> Option<usize> {
    (pos < ctx.table.size()).then_some(pos + 1)
}

pub fn char_backward(ctx: &MotionContext, pos: usize) -> Option<usize> {
    let _ = ctx;
    (pos > 0).then(|| pos - 1)
}

/// Word motions at a word boundary move into the next word, not within
/// it (tie-break rule).
pub fn word_forward(ctx: &MotionContext, pos: usize) -> Option<usize> {
    let size = ctx.table.size();
    if pos >= size {
        return None;
    }
    let start_class = ctx.class_at(pos);
    let mut p = pos;
    if let Some(c) = start_class {
        if c != CharClass::Whitespace {
            while p < size && ctx.class_at(p) == Some(c) {
                p += 1;
            }
        }
    }
    while p < size && ctx.class_at(p) == Some(CharClass::Whitespace) {
        p += 1;
    }
    Some(p)
}

pub fn word_backward(ctx: &MotionContext, pos: usize) -> Option<usize> {
    if pos == 0 {
        return None;
    }
    let mut p = pos - 1;
    while p > 0 && ctx.class_at(p) == Some(CharClass::Whitespace) {
        p -= 1;
    }
    let class = ctx.class_at(p);
    while p > 0 && ctx.class_at(p - 1) == class {
        p -= 1;
    }
    Some(p)
}

pub fn line_start(ctx: &MotionContext, pos: usize) -> Option<usize> {
    let mut cursor = crate::iter::Cursor::new(ctx.table, pos);
    match cursor.byte_find_prev(b'\n') {
        Some(nl) => Some(nl + 1),
        None => Some(0),
    }
}

pub fn line_end(ctx: &MotionContext, pos: usize) -> Option<usize> {
    let cursor = crate::iter::Cursor::new(ctx.table, pos);
    match cursor.byte_find_next(b'\n') {
        Some(nl) => Some(nl),
        None => Some(ctx.table.size()),
    }
}

/// First non-blank byte of the line containing `pos`.
pub fn line_first_nonblank(ctx: &MotionContext, pos: usize) -> Option<usize> {
    let start = line_start(ctx, pos)?;
    let end = line_end(ctx, pos)?;
    let mut p = start;
    while p < end && matches!(ctx.char_at(p), Some(c) if c.is_whitespace()) {
        p += 1;
    }
    Some(p)
}

/// Last non-blank byte of the line containing `pos`.
pub fn line_last_nonblank(ctx: &MotionContext, pos: usize) -> Option<usize> {
    let start = line_start(ctx, pos)?;
    let end = line_end(ctx, pos)?;
    if end == start {
        return Some(start);
    }
    let mut p = end - 1;
    while p > start && matches!(ctx.char_at(p), Some(c) if c.is_whitespace()) {
        p -= 1;
    }
    Some(p)
}

pub const MOTION_CHAR_FORWARD: Motion = Motion { flags: MotionFlags(MotionFlags::CHARWISE.0), apply: char_forward };
pub const MOTION_CHAR_BACKWARD: Motion = Motion { flags: MotionFlags(MotionFlags::CHARWISE.0), apply: char_backward };
pub const MOTION_WORD_FORWARD: Motion = Motion { flags: MotionFlags(MotionFlags::CHARWISE.0), apply: word_forward };
pub const MOTION_WORD_BACKWARD: Motion = Motion { flags: MotionFlags(MotionFlags::CHARWISE.0), apply: word_backward };
pub const MOTION_LINE_START: Motion = Motion { flags: MotionFlags(MotionFlags::IDEMPOTENT.0), apply: line_start };
pub const MOTION_LINE_END: Motion =
    Motion { flags: MotionFlags(MotionFlags::IDEMPOTENT.0 | MotionFlags::INCLUSIVE.0), apply: line_end };
pub const MOTION_LINE_FIRST_NONBLANK: Motion = Motion { flags: MotionFlags(MotionFlags::IDEMPOTENT.0), apply: line_first_nonblank };
pub const MOTION_LINE_LAST_NONBLANK: Motion = Motion {
    flags: MotionFlags(MotionFlags::IDEMPOTENT.0 | MotionFlags::INCLUSIVE.0),
    apply: line_last_nonblank,
};

/// `fn(context, pos) -> Range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

pub type TextObjectFn = fn(&MotionContext, usize) -> Option<TextRange>;

fn word_bounds(ctx: &MotionContext, pos: usize, size: usize) -> Option<(usize, usize, CharClass)> {
    let class = ctx.class_at(pos)?;
    let mut start = pos;
    while start > 0 && ctx.class_at(start - 1) == Some(class) {
        start -= 1;
    }
    let mut end = pos;
    while end < size && ctx.class_at(end) == Some(class) {
        end += 1;
    }
    Some((start, end, class))
}

/// `iw` — inner word: just the run of like-classed characters under `pos`.
pub fn inner_word(ctx: &MotionContext, pos: usize) -> Option<TextRange> {
    let size = ctx.table.size();
    let (start, end, _) = word_bounds(ctx, pos, size)?;
    Some(TextRange { start, end })
}

/// `aw` — outer word: the word plus one run of trailing whitespace (or
/// leading, if there is none trailing).
pub fn outer_word(ctx: &MotionContext, pos: usize) -> Option<TextRange> {
    let size = ctx.table.size();
    let (start, mut end, class) = word_bounds(ctx, pos, size)?;
    if class != CharClass::Whitespace {
        let trail_start = end;
        while end < size && ctx.class_at(end) == Some(CharClass::Whitespace) {
            end += 1;
        }
        if end == trail_start {
            let mut s = start;
            while s > 0 && ctx.class_at(s - 1) == Some(CharClass::Whitespace) {
                s -= 1;
            }
            return Some(TextRange { start: s, end });
        }
    }
    Some(TextRange { start, end })
}

/// Whole line, including its trailing newline if present.
pub fn inner_line(ctx: &MotionContext, pos: usize) -> Option<TextRange> {
    let start = line_start(ctx, pos)?;
    let end_excl_nl = line_end(ctx, pos)?;
    let end = if end_excl_nl < ctx.table.size() { end_excl_nl + 1 } else { end_excl_nl };
    Some(TextRange { start, end })
}

pub fn whole_file(ctx: &MotionContext, _pos: usize) -> Option<TextRange> {
    Some(TextRange { start: 0, end: ctx.table.size() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(content: &[u8]) -> PieceTable {
        let mut t = PieceTable::new();
        t.insert(0, content).unwrap();
        t
    }

    #[test]
    fn word_forward_skips_to_next_word_from_boundary() {
        let t = table(b"foo bar");
        let ctx = MotionContext::new(&t);
        assert_eq!(MOTION_WORD_FORWARD.run(&ctx, 0, 1), Some(4));
    }

    #[test]
    fn idempotent_motion_ignores_count() {
        let t = table(b"hello\nworld");
        let ctx = MotionContext::new(&t);
        assert_eq!(MOTION_LINE_START.run(&ctx, 2, 1), MOTION_LINE_START.run(&ctx, 2, 9));
    }

    #[test]
    fn line_end_stops_before_newline() {
        let t = table(b"hello\nworld");
        let ctx = MotionContext::new(&t);
        assert_eq!(line_end(&ctx, 0), Some(5));
    }

    #[test]
    fn inner_word_selects_run() {
        let t = table(b"foo bar baz");
        let ctx = MotionContext::new(&t);
        assert_eq!(inner_word(&ctx, 5), Some(TextRange { start: 4, end: 7 }));
    }

    #[test]
    fn outer_word_includes_trailing_space() {
        let t = table(b"foo bar baz");
        let ctx = MotionContext::new(&t);
        assert_eq!(outer_word(&ctx, 0), Some(TextRange { start: 0, end: 4 }));
    }

    #[test]
    fn char_backward_pinned_at_zero() {
        let t = table(b"abc");
        let ctx = MotionContext::new(&t);
        assert_eq!(char_backward(&ctx, 0), None);
    }
}
