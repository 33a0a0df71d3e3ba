//! Mode tree and action dispatcher.
//!
//! Grounded on the old flat `KeyContext` trie (`keymap/trie.rs`): this
//! replaces the single-level context map with a tree that falls back to a
//! parent mode on a missed lookup, and replaces the trie's `Action`
//! payload (a single enum case) with an accumulator that fills in one
//! field of `Action` per keypress and dispatches once an operator has a
//! motion (or a motion fires alone in NORMAL, or an operator fires alone
//! in a visual mode).

use crate::buffer::PieceTable;
use crate::history::History;
use crate::key::Key;
use crate::marks::Marks;
use crate::motion::{self, MotionContext, TextRange};
use crate::operators::{self, OpContext, OperatorArg, OpResult, PutPlacement};
use crate::registers::{RegisterName, Registers};
use crate::view::{Selection, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeId {
    Basic,
    Readline,
    Prompt,
    InsertReg,
    Insert,
    Replace,
    Mark,
    MarkLine,
    Move,
    Operator,
    InnerTextObj,
    TextObj,
    Register,
    MarkSet,
    OperatorOption,
    Normal,
    Visual,
    VisualLine,
}

/// The tree's static edges (the `+`/double edges in the diagram are
/// runtime reparenting, tracked by [`Dispatcher`] instead).
#[must_use]
pub fn static_parent(mode: ModeId) -> Option<ModeId> {
    use ModeId::*;
    match mode {
        Basic => None,
        Readline => Some(Basic),
        Mark => Some(Basic),
        InsertReg => Some(Readline),
        Prompt => Some(Readline),
        Insert => Some(InsertReg),
        Replace => Some(Insert),
        MarkLine => Some(Mark),
        Move => Some(MarkLine),
        Operator => Some(Move),
        Register => Some(Operator),
        MarkSet => Some(Register),
        Normal => Some(MarkSet),
        InnerTextObj => Some(Move),
        TextObj => Some(InnerTextObj),
        OperatorOption => Some(TextObj),
        Visual => Some(OperatorOption),
        VisualLine => Some(Visual),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Delete,
    Change,
    Yank,
    ShiftRight,
    ShiftLeft,
    Join,
    Replace(char),
    Put(PutPlacement),
    /// Spawn one cursor per line in the range, at line-start (`false`) or
    /// line-finish (`true`).
    Cursor(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    CharForward,
    CharBackward,
    WordForward,
    WordBackward,
    LineStart,
    LineEnd,
    LineFirstNonBlank,
    LineLastNonBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObjectKind {
    InnerWord,
    OuterWord,
    InnerLine,
    WholeFile,
}

#[derive(Debug, Clone, Default)]
pub struct Action {
    pub count: Option<usize>,
    pub register: Option<char>,
    pub operator: Option<OperatorKind>,
    pub motion: Option<MotionKind>,
    pub textobject: Option<TextObjectKind>,
    pub mark: Option<char>,
    pub arg: Option<char>,
}

fn motion_of(kind: MotionKind) -> motion::Motion {
    match kind {
        MotionKind::CharForward => motion::MOTION_CHAR_FORWARD,
        MotionKind::CharBackward => motion::MOTION_CHAR_BACKWARD,
        MotionKind::WordForward => motion::MOTION_WORD_FORWARD,
        MotionKind::WordBackward => motion::MOTION_WORD_BACKWARD,
        MotionKind::LineStart => motion::MOTION_LINE_START,
        MotionKind::LineEnd => motion::MOTION_LINE_END,
        MotionKind::LineFirstNonBlank => motion::MOTION_LINE_FIRST_NONBLANK,
        MotionKind::LineLastNonBlank => motion::MOTION_LINE_LAST_NONBLANK,
    }
}

fn textobject_fn(kind: TextObjectKind) -> motion::TextObjectFn {
    match kind {
        TextObjectKind::InnerWord => motion::inner_word,
        TextObjectKind::OuterWord => motion::outer_word,
        TextObjectKind::InnerLine => motion::inner_line,
        TextObjectKind::WholeFile => motion::whole_file,
    }
}

/// Drives one view's mode state across keystrokes. Holds no reference to
/// the document — every dispatch call is handed the buffer, history,
/// registers and marks it needs, the way [`operators`] functions are.
pub struct Dispatcher {
    pub mode: ModeId,
    pending: Action,
    operator_pending: bool,
    textobj_prefix: Option<char>,
    pub jumplist: Vec<usize>,
    pub action_prev: Option<Action>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: ModeId::Normal,
            pending: Action::default(),
            operator_pending: false,
            textobj_prefix: None,
            jumplist: Vec::new(),
            action_prev: None,
        }
    }

    fn reset(&mut self) {
        let done = std::mem::take(&mut self.pending);
        self.operator_pending = false;
        self.action_prev = Some(done);
    }

    /// Feed one key in NORMAL/VISUAL/VISUAL-LINE. Returns `true` if a
    /// complete action was dispatched this call.
    pub fn feed_key(&mut self, key: Key, session: &mut Session) -> bool {
        if self.mode == ModeId::Insert {
            return self.feed_key_insert(key, session);
        }
        match key {
            Key::Escape => {
                self.mode = ModeId::Normal;
                self.pending = Action::default();
                self.operator_pending = false;
                return false;
            }
            Key::Char(c) if c.is_ascii_digit() && !(c == '0' && self.pending.count.is_none()) => {
                let d = c.to_digit(10).unwrap() as usize;
                self.pending.count = Some(self.pending.count.unwrap_or(0) * 10 + d);
                return false;
            }
            Key::Char('"') => {
                self.mode = ModeId::Register;
                return false;
            }
            _ => {}
        }

        if self.mode == ModeId::Register {
            if let Key::Char(c) = key {
                self.pending.register = Some(c);
            }
            self.mode = ModeId::Normal;
            return false;
        }

        if self.operator_pending {
            if let Key::Char(c) = key {
                if let Some(prefix) = self.textobj_prefix {
                    self.textobj_prefix = None;
                    if let Some(to) = textobject_for(prefix, c) {
                        self.pending.textobject = Some(to);
                        return self.dispatch(session);
                    }
                    return false;
                }
                if c == 'i' || c == 'a' {
                    self.textobj_prefix = Some(c);
                    self.mode = ModeId::InnerTextObj;
                    return false;
                }
            }
        }

        if let Key::Char(c) = key {
            if let Some(op) = operator_for(c) {
                self.pending.operator = Some(op);
                self.operator_pending = true;
                if self.mode_is_visual() {
                    return self.dispatch(session);
                }
                self.mode = ModeId::Operator;
                return false;
            }
            if let Some(mk) = motion_for(c) {
                self.pending.motion = Some(mk);
                return self.dispatch(session);
            }
            if c == 'v' {
                self.mode = if self.mode == ModeId::Visual { ModeId::Normal } else { ModeId::Visual };
                return false;
            }
            if c == 'V' {
                self.mode = if self.mode == ModeId::VisualLine { ModeId::Normal } else { ModeId::VisualLine };
                return false;
            }
            if c == 'u' {
                session.history.undo(session.table);
                return true;
            }
            if c == 'i' {
                self.mode = ModeId::Insert;
                return false;
            }
            if c == 'a' {
                for sel in &mut session.view.selections {
                    sel.head = (sel.head + 1).min(session.table.size());
                    sel.anchor = sel.head;
                }
                self.mode = ModeId::Insert;
                return false;
            }
        }
        if key == Key::Ctrl(b'r') {
            session.history.redo(session.table);
            return true;
        }
        false
    }

    /// Insert literal text at every selection, shifting later selections
    /// by the bytes already inserted ahead of them in the same keystroke.
    fn feed_key_insert(&mut self, key: Key, session: &mut Session) -> bool {
        match key {
            Key::Escape => {
                session.history.snapshot();
                session.table.snapshot_boundary();
                self.mode = ModeId::Normal;
                self.reset();
                false
            }
            Key::Char(c) => {
                let mut buf = [0u8; 4];
                let bytes = c.encode_utf8(&mut buf).as_bytes();
                let mut order: Vec<usize> = (0..session.view.selections.len()).collect();
                order.sort_by_key(|&i| session.view.selections[i].head);
                let mut shift = 0i64;
                let mut new_heads = vec![0usize; session.view.selections.len()];
                for i in order {
                    let pos = (session.view.selections[i].head as i64 + shift).max(0) as usize;
                    if let Ok(Some(change)) = session.table.insert(pos, bytes) {
                        session.history.record(change, session.timestamp);
                    }
                    shift += bytes.len() as i64;
                    new_heads[i] = pos + bytes.len();
                }
                for (sel, head) in session.view.selections.iter_mut().zip(new_heads) {
                    sel.head = head;
                    sel.anchor = head;
                }
                session.view.normalize();
                true
            }
            _ => false,
        }
    }

    fn mode_is_visual(&self) -> bool {
        matches!(self.mode, ModeId::Visual | ModeId::VisualLine)
    }

    fn dispatch(&mut self, session: &mut Session) -> bool {
        let count = self.pending.count.unwrap_or(1).max(1);
        let register = self.pending.register.map(RegisterName::parse).unwrap_or(RegisterName::Unnamed);

        // Earlier selections' edits shift every later selection's byte
        // offset; process head-ascending and carry that shift forward so
        // each selection still addresses its own original text.
        let mut sels = session.view.selections.clone();
        sels.sort_by_key(|s| s.head);

        let mut new_selections = Vec::with_capacity(sels.len());
        let mut dirty = false;
        let mut shift: i64 = 0;
        for sel in sels {
            let head = (sel.head as i64 + shift).max(0) as usize;
            let range = match (self.pending.operator, self.mode_is_visual()) {
                (_, true) => {
                    let (s, e) = sel.range();
                    let s = (s as i64 + shift).max(0) as usize;
                    let e = (e as i64 + shift).max(0) as usize;
                    TextRange { start: s, end: e.max(s) }
                }
                (Some(_), false) if self.pending.textobject.is_some() => {
                    let ctx = MotionContext::new(session.table);
                    let f = textobject_fn(self.pending.textobject.unwrap());
                    match f(&ctx, head) {
                        Some(r) => r,
                        None => continue,
                    }
                }
                (Some(_), false) => {
                    let ctx = MotionContext::new(session.table);
                    let Some(mk) = self.pending.motion else { continue };
                    let m = motion_of(mk);
                    match m.run(&ctx, head, count) {
                        Some(end) => TextRange { start: head.min(end), end: head.max(end) },
                        None => continue,
                    }
                }
                (None, false) => {
                    let ctx = MotionContext::new(session.table);
                    let Some(mk) = self.pending.motion else { continue };
                    let m = motion_of(mk);
                    match m.run(&ctx, head, count) {
                        Some(pos) => {
                            new_selections.push(Selection::cursor(pos));
                            continue;
                        }
                        None => continue,
                    }
                }
            };

            let Some(op) = self.pending.operator else { continue };
            let op_ctx = OpContext {
                range,
                pos: head,
                count,
                register,
                slot: 0,
                linewise: self.mode == ModeId::VisualLine,
                arg: match op {
                    OperatorKind::Put(p) => OperatorArg::Put(p),
                    OperatorKind::Replace(c) => OperatorArg::Replacement(c),
                    _ => OperatorArg::None,
                },
            };
            let before_len = session.table.size() as i64;
            let outcome = match op {
                OperatorKind::Delete => operators::delete(session.table, session.registers, &op_ctx),
                OperatorKind::Change => operators::change(session.table, session.registers, &op_ctx),
                OperatorKind::Yank => operators::yank(session.table, session.registers, &op_ctx),
                OperatorKind::ShiftRight => operators::shift_right(session.table, &op_ctx, session.tabwidth, session.expandtab),
                OperatorKind::ShiftLeft => operators::shift_left(session.table, &op_ctx, session.tabwidth),
                OperatorKind::Join => operators::join(session.table, &op_ctx, " "),
                OperatorKind::Replace(_) => operators::replace(session.table, &op_ctx),
                OperatorKind::Put(_) => operators::put(session.table, session.registers, &op_ctx),
                OperatorKind::Cursor(at_end) => operators::cursor(session.table, &op_ctx, at_end),
            };
            shift += session.table.size() as i64 - before_len;
            for change in outcome.changes {
                dirty = true;
                session.history.record(change, session.timestamp);
            }
            match outcome.result {
                OpResult::Moved(pos) => new_selections.push(Selection::cursor(pos)),
                OpResult::Dispose => {}
                OpResult::Spawn(positions) => new_selections.extend(positions.into_iter().map(Selection::cursor)),
            }
        }

        if new_selections.is_empty() {
            new_selections.push(Selection::cursor(0));
        }
        session.view.selections = new_selections;
        session.view.primary = session.view.selections.len() - 1;
        session.view.normalize();
        if dirty {
            session.history.snapshot();
            session.table.snapshot_boundary();
        }
        if let Some(op) = self.pending.operator {
            self.mode = if matches!(op, OperatorKind::Change) { ModeId::Insert } else { ModeId::Normal };
        }
        self.reset();
        true
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn operator_for(c: char) -> Option<OperatorKind> {
    match c {
        'd' => Some(OperatorKind::Delete),
        'c' => Some(OperatorKind::Change),
        'y' => Some(OperatorKind::Yank),
        '>' => Some(OperatorKind::ShiftRight),
        '<' => Some(OperatorKind::ShiftLeft),
        'J' => Some(OperatorKind::Join),
        'S' => Some(OperatorKind::Cursor(false)),
        'E' => Some(OperatorKind::Cursor(true)),
        _ => None,
    }
}

fn textobject_for(prefix: char, c: char) -> Option<TextObjectKind> {
    match (prefix, c) {
        ('i', 'w') => Some(TextObjectKind::InnerWord),
        ('a', 'w') => Some(TextObjectKind::OuterWord),
        ('i', 'l') | ('a', 'l') => Some(TextObjectKind::InnerLine),
        _ => None,
    }
}

fn motion_for(c: char) -> Option<MotionKind> {
    match c {
        'l' => Some(MotionKind::CharForward),
        'h' => Some(MotionKind::CharBackward),
        'w' => Some(MotionKind::WordForward),
        'b' => Some(MotionKind::WordBackward),
        '0' => Some(MotionKind::LineStart),
        '$' => Some(MotionKind::LineEnd),
        '^' => Some(MotionKind::LineFirstNonBlank),
        _ => None,
    }
}

/// Everything a dispatch call needs to mutate: the buffer it edits, the
/// view whose selections drive and receive the edit, the registers an
/// operator reads/writes, and the history every resulting change is
/// recorded into.
pub struct Session<'a> {
    pub table: &'a mut PieceTable,
    pub view: &'a mut View,
    pub registers: &'a mut Registers,
    pub history: &'a mut History,
    pub marks: &'a Marks,
    pub tabwidth: usize,
    pub expandtab: bool,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PieceTable;

    fn setup(content: &[u8]) -> (PieceTable, View, Registers, History, Marks) {
        let mut t = PieceTable::new();
        t.insert(0, content).unwrap();
        (t, View::new(80, 24, 8), Registers::new(Box::new(crate::registers::ShellClipboard)), History::new(), Marks::new())
    }

    #[test]
    fn dw_deletes_one_word() {
        let (mut t, mut v, mut r, mut h, m) = setup(b"hello world");
        let mut d = Dispatcher::new();
        let mut s = Session { table: &mut t, view: &mut v, registers: &mut r, history: &mut h, marks: &m, tabwidth: 8, expandtab: false, timestamp: 1 };
        d.feed_key(Key::Char('d'), &mut s);
        d.feed_key(Key::Char('w'), &mut s);
        assert_eq!(t.to_bytes(), b"world");
    }

    #[test]
    fn multi_cursor_delete_char_acts_on_every_selection() {
        let (mut t, mut v, mut r, mut h, m) = setup(b"abc abc");
        v.add_selection(crate::view::Selection::cursor(4));
        let mut d = Dispatcher::new();
        let mut s = Session { table: &mut t, view: &mut v, registers: &mut r, history: &mut h, marks: &m, tabwidth: 8, expandtab: false, timestamp: 1 };
        d.feed_key(Key::Char('d'), &mut s);
        d.feed_key(Key::Char('l'), &mut s);
        assert_eq!(t.to_bytes(), b"bc bc");
    }

    #[test]
    fn count_prefixed_motion_moves_cursor_by_n() {
        let (mut t, mut v, mut r, mut h, m) = setup(b"abcdef");
        let mut d = Dispatcher::new();
        let mut s = Session { table: &mut t, view: &mut v, registers: &mut r, history: &mut h, marks: &m, tabwidth: 8, expandtab: false, timestamp: 1 };
        d.feed_key(Key::Char('3'), &mut s);
        d.feed_key(Key::Char('l'), &mut s);
        assert_eq!(s.view.primary_selection().head, 3);
    }

    #[test]
    fn undo_after_delete_restores_content() {
        let (mut t, mut v, mut r, mut h, m) = setup(b"hello world");
        let mut d = Dispatcher::new();
        let mut s = Session { table: &mut t, view: &mut v, registers: &mut r, history: &mut h, marks: &m, tabwidth: 8, expandtab: false, timestamp: 1 };
        d.feed_key(Key::Char('d'), &mut s);
        d.feed_key(Key::Char('w'), &mut s);
        d.feed_key(Key::Char('u'), &mut s);
        assert_eq!(t.to_bytes(), b"hello world");
    }

    #[test]
    fn multi_cursor_change_to_line_end_then_insert_text() {
        let (mut t, mut v, mut r, mut h, m) = setup(b"aa\nbb\ncc\n");
        v.selections = vec![crate::view::Selection::cursor(0), crate::view::Selection::cursor(3), crate::view::Selection::cursor(6)];
        v.primary = 2;
        let mut d = Dispatcher::new();
        let mut s = Session { table: &mut t, view: &mut v, registers: &mut r, history: &mut h, marks: &m, tabwidth: 8, expandtab: false, timestamp: 1 };
        d.feed_key(Key::Char('c'), &mut s);
        d.feed_key(Key::Char('$'), &mut s);
        assert_eq!(d.mode, ModeId::Insert);
        d.feed_key(Key::Char('X'), &mut s);
        d.feed_key(Key::Escape, &mut s);
        let heads: Vec<usize> = s.view.selections.iter().map(|sel| sel.head).collect();
        assert_eq!(heads, vec![1, 3, 5]);
        assert_eq!(t.to_bytes(), b"X\nX\nX\n");
    }

    #[test]
    fn cursor_operator_spawns_one_selection_per_line_in_visual_range() {
        let (mut t, mut v, mut r, mut h, m) = setup(b"aa\nbb\ncc\n");
        v.selections = vec![Selection { anchor: 0, head: 7, anchored: true }];
        let mut d = Dispatcher::new();
        d.mode = ModeId::Visual;
        let mut s = Session { table: &mut t, view: &mut v, registers: &mut r, history: &mut h, marks: &m, tabwidth: 8, expandtab: false, timestamp: 1 };
        d.feed_key(Key::Char('S'), &mut s);
        assert_eq!(d.mode, ModeId::Normal);
        let heads: Vec<usize> = s.view.selections.iter().map(|sel| sel.head).collect();
        assert_eq!(heads, vec![0, 3, 6]);
    }

    #[test]
    fn diw_deletes_inner_word_under_cursor() {
        let (mut t, mut v, mut r, mut h, m) = setup(b"hello world");
        v.set_primary_head(7);
        let mut d = Dispatcher::new();
        let mut s = Session { table: &mut t, view: &mut v, registers: &mut r, history: &mut h, marks: &m, tabwidth: 8, expandtab: false, timestamp: 1 };
        d.feed_key(Key::Char('d'), &mut s);
        d.feed_key(Key::Char('i'), &mut s);
        d.feed_key(Key::Char('w'), &mut s);
        assert_eq!(t.to_bytes(), b"hello ");
    }
}
