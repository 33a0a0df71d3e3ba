//! Address expressions: the part of a sam command before the command
//! letter, e.g. the `2,3` in `2,3 d` or the `,` in `,x/foo/ c/FOO/`.

use crate::buffer::PieceTable;
use crate::error::{EditorError, SamSyntaxErrorKind};
use crate::marks::Marks;

/// One address term. `Dollar`/`Dot`/`Percent` are zero-argument; the rest
/// carry the operand parsed out of the command text.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressAtom {
    /// `#N` — byte offset N, zero-width.
    Byte(usize),
    /// `N` — line N (1-indexed), spanning to the next line start.
    Line(usize),
    /// `'M` — named mark M.
    Mark(char),
    /// `/RE/` — next match of RE, searching forward from dot's end.
    Forward(String),
    /// `?RE/` — next match of RE, searching backward from dot's start.
    Backward(String),
    /// `$` — end of file, zero-width.
    Dollar,
    /// `.` — the current range (dot).
    Dot,
    /// `+` — start of the line following dot.
    Plus,
    /// `-` — start of the line preceding dot.
    Minus,
    /// `%` — the whole file.
    Percent,
}

/// A full address: a possibly-empty chain of atoms joined by `,` (union,
/// both sides evaluated from the original dot) or `;` (sequential, the
/// right side evaluated from the left side's result).
#[derive(Debug, Clone, PartialEq)]
pub enum Address {
    Atom(AddressAtom),
    Comma(Box<Address>, Box<Address>),
    Semi(Box<Address>, Box<Address>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrRange {
    pub start: usize,
    pub end: usize,
}

impl AddrRange {
    #[must_use]
    pub fn zero_width(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self { start: self.start.min(other.start), end: self.end.max(other.end) }
    }
}

pub struct EvalContext<'a> {
    pub table: &'a PieceTable,
    pub marks: &'a Marks,
}

fn line_start(table: &PieceTable, line: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut pos = 0usize;
    let mut seen = 0usize;
    let bytes = table.to_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' {
            seen += 1;
            if seen == line {
                pos = i + 1;
                break;
            }
        }
    }
    if seen < line { bytes.len() } else { pos }
}

fn line_containing(table: &PieceTable, pos: usize) -> usize {
    let bytes = table.to_bytes();
    bytes[..pos.min(bytes.len())].iter().filter(|b| **b == b'\n').count() + 1
}

fn find_forward(table: &PieceTable, pattern: &str, from: usize) -> Result<AddrRange, EditorError> {
    let bytes = table.to_bytes();
    let text = std::str::from_utf8(&bytes).map_err(|_| EditorError::Regex("document is not valid UTF-8".into()))?;
    let flags = monster_regex::Flags::default();
    let re = monster_regex::Regex::new(pattern, flags).map_err(|e| EditorError::Regex(format!("{e:?}")))?;
    let start = from.min(text.len());
    if let Some(m) = re.find(&text[start..]) {
        return Ok(AddrRange { start: start + m.start, end: start + m.end });
    }
    if let Some(m) = re.find(text) {
        return Ok(AddrRange { start: m.start, end: m.end });
    }
    Err(EditorError::Regex(format!("no match for /{pattern}/")))
}

fn find_backward(table: &PieceTable, pattern: &str, before: usize) -> Result<AddrRange, EditorError> {
    let bytes = table.to_bytes();
    let text = std::str::from_utf8(&bytes).map_err(|_| EditorError::Regex("document is not valid UTF-8".into()))?;
    let flags = monster_regex::Flags::default();
    let re = monster_regex::Regex::new(pattern, flags).map_err(|e| EditorError::Regex(format!("{e:?}")))?;
    let mut last = None;
    for m in re.find_all(text) {
        if m.start >= before {
            break;
        }
        last = Some(m);
    }
    match last {
        Some(m) => Ok(AddrRange { start: m.start, end: m.end }),
        None => Err(EditorError::Regex(format!("no match for ?{pattern}?"))),
    }
}

impl AddressAtom {
    fn eval(&self, ctx: &EvalContext, dot: AddrRange) -> Result<AddrRange, EditorError> {
        match self {
            Self::Byte(n) => Ok(AddrRange::zero_width((*n).min(ctx.table.size()))),
            Self::Line(n) => {
                let start = line_start(ctx.table, n.saturating_sub(1));
                let end = line_start(ctx.table, *n);
                Ok(AddrRange { start, end })
            }
            Self::Mark(name) => match ctx.marks.resolve_named(ctx.table, *name) {
                Some(crate::marks::Resolved::At(pos)) => Ok(AddrRange::zero_width(pos)),
                _ => Err(EditorError::sam_syntax(SamSyntaxErrorKind::InvalidMark, name.to_string())),
            },
            Self::Forward(pattern) => find_forward(ctx.table, pattern, dot.end),
            Self::Backward(pattern) => find_backward(ctx.table, pattern, dot.start),
            Self::Dollar => Ok(AddrRange::zero_width(ctx.table.size())),
            Self::Dot => Ok(dot),
            Self::Plus => {
                let line = line_containing(ctx.table, dot.end);
                let start = line_start(ctx.table, line);
                let end = line_start(ctx.table, line + 1);
                Ok(AddrRange { start, end })
            }
            Self::Minus => {
                let line = line_containing(ctx.table, dot.start);
                let prev = line.saturating_sub(1).max(1) - 1;
                let start = line_start(ctx.table, prev);
                let end = line_start(ctx.table, prev + 1);
                Ok(AddrRange { start, end })
            }
            Self::Percent => Ok(AddrRange { start: 0, end: ctx.table.size() }),
        }
    }
}

impl Address {
    /// Evaluate this address against `dot`, the range currently in scope.
    pub fn eval(&self, ctx: &EvalContext, dot: AddrRange) -> Result<AddrRange, EditorError> {
        match self {
            Self::Atom(atom) => atom.eval(ctx, dot),
            Self::Comma(a, b) => {
                let ra = a.eval(ctx, dot)?;
                let rb = b.eval(ctx, dot)?;
                Ok(ra.union(rb))
            }
            Self::Semi(a, b) => {
                let ra = a.eval(ctx, dot)?;
                b.eval(ctx, ra)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marks::Marks;

    fn table(bytes: &[u8]) -> PieceTable {
        let mut t = PieceTable::new();
        t.insert(0, bytes).unwrap();
        t
    }

    #[test]
    fn line_address_spans_to_next_line_start() {
        let t = table(b"a\nb\nc\n");
        let marks = Marks::new();
        let ctx = EvalContext { table: &t, marks: &marks };
        let addr = Address::Comma(
            Box::new(Address::Atom(AddressAtom::Line(2))),
            Box::new(Address::Atom(AddressAtom::Line(3))),
        );
        let r = addr.eval(&ctx, AddrRange::zero_width(0)).unwrap();
        assert_eq!(r, AddrRange { start: 2, end: 6 });
    }

    #[test]
    fn whole_file_spans_entire_document() {
        let t = table(b"hello");
        let marks = Marks::new();
        let ctx = EvalContext { table: &t, marks: &marks };
        let addr = Address::Atom(AddressAtom::Percent);
        assert_eq!(addr.eval(&ctx, AddrRange::zero_width(0)).unwrap(), AddrRange { start: 0, end: 5 });
    }

    #[test]
    fn semi_evaluates_right_relative_to_left() {
        let t = table(b"foo bar foo");
        let marks = Marks::new();
        let ctx = EvalContext { table: &t, marks: &marks };
        let addr = Address::Semi(
            Box::new(Address::Atom(AddressAtom::Forward("foo".into()))),
            Box::new(Address::Atom(AddressAtom::Forward("foo".into()))),
        );
        let r = addr.eval(&ctx, AddrRange::zero_width(0)).unwrap();
        assert_eq!(r, AddrRange { start: 8, end: 11 });
    }
}
