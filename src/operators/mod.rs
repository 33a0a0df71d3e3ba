//! Operators
//!
//! `Operator(op_ctx) -> new_pos | Dispose`. Operators are the only thing
//! that calls into `buffer::PieceTable::insert`/`delete` on behalf of a
//! dispatched action; everything upstream (motions, text objects) only
//! computes ranges. Each operator returns the buffer Changes it produced so
//! the caller (`modes::Dispatcher`) can thread them into `history::History`
//! and `registers::Registers`.

use crate::buffer::{Change, PieceTable};
use crate::motion::TextRange;
use crate::registers::{RegisterName, Registers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutPlacement {
    Before,
    After,
}

#[derive(Debug, Clone, Copy)]
pub enum OperatorArg {
    None,
    Put(PutPlacement),
    Replacement(char),
    JoinSeparator(&'static str),
}

pub struct OpContext {
    pub range: TextRange,
    pub pos: usize,
    pub count: usize,
    pub register: RegisterName,
    pub slot: usize,
    pub linewise: bool,
    pub arg: OperatorArg,
}

/// Outcome of an operator: either a new cursor position, or `Dispose`
/// (`Operator(op_ctx) -> new_pos | Dispose`) meaning the
/// selection that produced this range should be dropped (e.g. a pure
/// delete collapsing a visual-mode selection).
pub enum OpResult {
    Moved(usize),
    Dispose,
    /// `Cursor` replaces the selection that produced its range with one
    /// cursor per spawned position, rather than moving or dropping it.
    Spawn(Vec<usize>),
}

pub struct OpOutcome {
    pub result: OpResult,
    pub changes: Vec<Change>,
}

fn moved(pos: usize, changes: Vec<Change>) -> OpOutcome {
    OpOutcome { result: OpResult::Moved(pos), changes }
}

/// `Delete`: copy range into register, delete it; cursor lands at
/// `range.start` (clamped if linewise at EOF).
pub fn delete(table: &mut PieceTable, registers: &mut Registers, ctx: &OpContext) -> OpOutcome {
    let bytes = table.read(ctx.range.start, ctx.range.end - ctx.range.start);
    registers.put(ctx.register, ctx.slot, bytes, ctx.linewise, false);
    let mut changes = Vec::new();
    if let Some(change) = table.delete(ctx.range.start, ctx.range.end - ctx.range.start).ok().flatten() {
        changes.push(change);
    }
    let mut pos = ctx.range.start;
    if ctx.linewise && pos >= table.size() && pos > 0 {
        pos = table.size().saturating_sub(1);
    }
    moved(pos, changes)
}

/// `Change`: delete, then if linewise insert a newline to land the cursor
/// on a fresh empty line.
pub fn change(table: &mut PieceTable, registers: &mut Registers, ctx: &OpContext) -> OpOutcome {
    let mut outcome = delete(table, registers, ctx);
    if ctx.linewise {
        if let Ok(Some(c)) = table.insert(outcome_pos(&outcome), b"\n") {
            outcome.changes.push(c);
        }
    }
    outcome
}

fn outcome_pos(outcome: &OpOutcome) -> usize {
    match &outcome.result {
        OpResult::Moved(p) => *p,
        OpResult::Dispose => 0,
        OpResult::Spawn(positions) => positions.first().copied().unwrap_or(0),
    }
}

/// `Yank`: copy range into register without mutating the buffer.
pub fn yank(table: &PieceTable, registers: &mut Registers, ctx: &OpContext) -> OpOutcome {
    let bytes = table.read(ctx.range.start, ctx.range.end - ctx.range.start);
    registers.put(ctx.register, ctx.slot, bytes, ctx.linewise, false);
    let pos = if ctx.linewise { ctx.range.start } else { ctx.pos };
    moved(pos, Vec::new())
}

/// `Put`: insert register content `count` times at the placement given by
/// `arg`; if the selection is non-empty, delete it first.
pub fn put(table: &mut PieceTable, registers: &mut Registers, ctx: &OpContext) -> OpOutcome {
    let OperatorArg::Put(placement) = ctx.arg else {
        return moved(ctx.pos, Vec::new());
    };
    let mut changes = Vec::new();
    let mut at = ctx.pos;
    if ctx.range.end > ctx.range.start {
        if let Ok(Some(c)) = table.delete(ctx.range.start, ctx.range.end - ctx.range.start) {
            changes.push(c);
        }
        at = ctx.range.start;
    } else if placement == PutPlacement::After && at < table.size() {
        at += 1;
    }
    let content = registers.get(ctx.register, ctx.slot);
    let linewise = registers.linewise(ctx.register);
    let mut insert_at = at;
    if linewise && insert_at > 0 && table.byte_at(insert_at - 1) != Some(b'\n') {
        if let Ok(Some(c)) = table.insert(insert_at, b"\n") {
            changes.push(c);
            insert_at += 1;
        }
    }
    let start = insert_at;
    for _ in 0..ctx.count.max(1) {
        if let Ok(Some(c)) = table.insert(insert_at, &content) {
            insert_at += content.len();
            changes.push(c);
        }
    }
    let final_pos = match placement {
        PutPlacement::Before => start,
        PutPlacement::After => insert_at.saturating_sub(1).max(start),
    };
    moved(final_pos, changes)
}

fn indent_unit(tabwidth: usize, expandtab: bool) -> Vec<u8> {
    if expandtab {
        vec![b' '; tabwidth]
    } else {
        vec![b'\t']
    }
}

/// `ShiftRight`: prepend one indent unit to each line intersecting the
/// range.
pub fn shift_right(table: &mut PieceTable, ctx: &OpContext, tabwidth: usize, expandtab: bool) -> OpOutcome {
    let unit = indent_unit(tabwidth, expandtab);
    let mut changes = Vec::new();
    let mut delta = 0i64;
    for line_start in line_starts_in(table, ctx.range) {
        let at = (line_start as i64 + delta) as usize;
        if let Ok(Some(c)) = table.insert(at, &unit) {
            delta += unit.len() as i64;
            changes.push(c);
        }
    }
    moved(ctx.pos, changes)
}

/// `ShiftLeft`: strip up to one indent unit from each line intersecting
/// the range.
pub fn shift_left(table: &mut PieceTable, ctx: &OpContext, tabwidth: usize) -> OpOutcome {
    let mut changes = Vec::new();
    let mut delta = 0i64;
    for line_start in line_starts_in(table, ctx.range) {
        let at = (line_start as i64 + delta) as usize;
        let mut strip = 0usize;
        let mut width = 0usize;
        while width < tabwidth {
            match table.byte_at(at + strip) {
                Some(b' ') => {
                    strip += 1;
                    width += 1;
                }
                Some(b'\t') => {
                    strip += 1;
                    break;
                }
                _ => break,
            }
        }
        if strip > 0 {
            if let Ok(Some(c)) = table.delete(at, strip) {
                delta -= strip as i64;
                changes.push(c);
            }
        }
    }
    moved(ctx.pos, changes)
}

fn line_starts_in(table: &PieceTable, range: TextRange) -> Vec<usize> {
    let ctx = crate::motion::MotionContext::new(table);
    let mut starts = Vec::new();
    let mut pos = crate::motion::line_start(&ctx, range.start).unwrap_or(range.start);
    loop {
        starts.push(pos);
        let next_nl = crate::iter::Cursor::new(table, pos).byte_find_next(b'\n');
        match next_nl {
            Some(nl) if nl + 1 < range.end => pos = nl + 1,
            _ => break,
        }
    }
    starts
}

/// `Join`: replace each newline in the range with a separator, unless the
/// previous byte is whitespace or the next byte is a newline.
pub fn join(table: &mut PieceTable, ctx: &OpContext, separator: &str) -> OpOutcome {
    let mut changes = Vec::new();
    let mut delta = 0i64;
    let mut pos = ctx.range.start;
    while pos < ctx.range.end {
        let at = (pos as i64 + delta) as usize;
        if table.byte_at(at) == Some(b'\n') {
            let prev_ws = at > 0 && matches!(table.byte_at(at - 1), Some(b' ') | Some(b'\t'));
            let next_nl = table.byte_at(at + 1) == Some(b'\n');
            if !prev_ws && !next_nl {
                if let Ok(Some(c)) = table.delete(at, 1) {
                    changes.push(c);
                }
                if let Ok(Some(c)) = table.insert(at, separator.as_bytes()) {
                    changes.push(c);
                    delta += separator.len() as i64 - 1;
                }
            }
        }
        pos += 1;
    }
    moved(ctx.range.start, changes)
}

/// `Cursor` (sol/eol): spawn one position per line in the range, at
/// line-start or line-finish. The caller turns these into selections.
pub fn cursor_positions(table: &PieceTable, range: TextRange, at_end: bool) -> Vec<usize> {
    let ctx = crate::motion::MotionContext::new(table);
    line_starts_in(table, range)
        .into_iter()
        .map(|s| if at_end { crate::motion::line_last_nonblank(&ctx, s).unwrap_or(s) } else { s })
        .collect()
}

/// `Cursor` as an operator: produces no Changes, only a
/// [`OpResult::Spawn`] of the positions [`cursor_positions`] finds.
pub fn cursor(table: &PieceTable, ctx: &OpContext, at_end: bool) -> OpOutcome {
    OpOutcome { result: OpResult::Spawn(cursor_positions(table, ctx.range, at_end)), changes: Vec::new() }
}

/// `Replace`: overwrite each codepoint in the range with `arg.replacement`.
pub fn replace(table: &mut PieceTable, ctx: &OpContext) -> OpOutcome {
    let OperatorArg::Replacement(repl) = ctx.arg else {
        return moved(ctx.pos, Vec::new());
    };
    let mut buf = [0u8; 4];
    let repl_bytes = repl.encode_utf8(&mut buf).as_bytes();
    let len = ctx.range.end - ctx.range.start;
    let mut changes = Vec::new();
    if let Ok(Some(c)) = table.delete(ctx.range.start, len) {
        changes.push(c);
    }
    let mut at = ctx.range.start;
    for _ in 0..len.min(ctx.count.max(len)) {
        if let Ok(Some(c)) = table.insert(at, repl_bytes) {
            at += repl_bytes.len();
            changes.push(c);
        }
        if at - ctx.range.start >= len {
            break;
        }
    }
    moved(ctx.range.start, changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{ClipboardBackend, ClipboardVariant};

    struct NoClipboard;
    impl ClipboardBackend for NoClipboard {
        fn copy(&mut self, _v: ClipboardVariant, _b: &[u8]) -> std::io::Result<()> {
            Ok(())
        }
        fn paste(&mut self, _v: ClipboardVariant) -> std::io::Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn setup(content: &[u8]) -> (PieceTable, Registers) {
        let mut t = PieceTable::new();
        t.insert(0, content).unwrap();
        (t, Registers::new(Box::new(NoClipboard)))
    }

    #[test]
    fn delete_copies_to_register_and_removes_range() {
        let (mut t, mut r) = setup(b"hello world");
        let ctx = OpContext {
            range: TextRange { start: 0, end: 6 },
            pos: 0,
            count: 1,
            register: RegisterName::Unnamed,
            slot: 0,
            linewise: false,
            arg: OperatorArg::None,
        };
        delete(&mut t, &mut r, &ctx);
        assert_eq!(t.to_bytes(), b"world");
        assert_eq!(r.get(RegisterName::Unnamed, 0), b"hello ");
    }

    #[test]
    fn yank_does_not_mutate_buffer() {
        let (t, mut r) = setup(b"hello world");
        let ctx = OpContext {
            range: TextRange { start: 0, end: 5 },
            pos: 0,
            count: 1,
            register: RegisterName::Unnamed,
            slot: 0,
            linewise: false,
            arg: OperatorArg::None,
        };
        yank(&t, &mut r, &ctx);
        assert_eq!(t.to_bytes(), b"hello world");
        assert_eq!(r.get(RegisterName::Unnamed, 0), b"hello");
    }

    #[test]
    fn put_after_inserts_past_cursor() {
        let (mut t, mut r) = setup(b"ac");
        r.put(RegisterName::Unnamed, 0, b"b".to_vec(), false, false);
        let ctx = OpContext {
            range: TextRange { start: 0, end: 0 },
            pos: 0,
            count: 1,
            register: RegisterName::Unnamed,
            slot: 0,
            linewise: false,
            arg: OperatorArg::Put(PutPlacement::After),
        };
        put(&mut t, &mut r, &ctx);
        assert_eq!(t.to_bytes(), b"abc");
    }

    #[test]
    fn shift_right_prepends_indent_to_each_line() {
        let (mut t, _r) = setup(b"a\nb\n");
        let ctx = OpContext {
            range: TextRange { start: 0, end: 4 },
            pos: 0,
            count: 1,
            register: RegisterName::Unnamed,
            slot: 0,
            linewise: true,
            arg: OperatorArg::None,
        };
        shift_right(&mut t, &ctx, 2, true);
        assert_eq!(t.to_bytes(), b"  a\n  b\n");
    }

    #[test]
    fn join_inserts_separator_between_lines() {
        let (mut t, _r) = setup(b"foo\nbar");
        let ctx = OpContext {
            range: TextRange { start: 0, end: 7 },
            pos: 0,
            count: 1,
            register: RegisterName::Unnamed,
            slot: 0,
            linewise: false,
            arg: OperatorArg::JoinSeparator(" "),
        };
        join(&mut t, &ctx, " ");
        assert_eq!(t.to_bytes(), b"foo bar");
    }
}
