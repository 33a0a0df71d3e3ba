//! Sam-style structural regex command language: a `2,3 d` or `,x/foo/
//! c/FOO/` line is parsed into an address + command tree, the tree is
//! walked to stage a `Transcript` of disjoint edits without mutating
//! anything, and only once the whole tree is staged conflict-free is the
//! transcript applied in one monotonic pass.

pub mod address;
pub mod parser;
pub mod transcript;

use crate::buffer::PieceTable;
use crate::error::{EditorError, SamExecErrorKind};
use crate::history::History;
use crate::marks::Marks;

use address::{AddrRange, EvalContext};
use parser::{AddressedCommand, CondKind, Command, LoopKind};
use transcript::{ChangeKind, StagedChange, Transcript};

/// Things the executor can't do itself (file I/O, running a subprocess
/// while ignoring the buffer) — returned to the caller instead of
/// performed inline, the way the command-line layer hands `Quit`/`Edit`
/// back to its host rather than calling `process::exit` itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Write { path: Option<String>, bangs: usize },
    Read { path: String },
    Edit { path: String, bangs: usize },
    Quit { bangs: usize },
    RunIgnoringBuffer { argv: String },
}

#[derive(Debug, Default)]
pub struct ExecReport {
    /// Ranges (post-stage, pre-apply coordinates) marked by `p`.
    pub prints: Vec<AddrRange>,
    pub effects: Vec<Effect>,
    pub staged_count: usize,
}

/// Run one sam command line (possibly several `;`-separated commands)
/// against `table`, recording every resulting edit into `history`.
pub fn run(
    src: &str,
    table: &mut PieceTable,
    history: &mut History,
    marks: &Marks,
    timestamp: u64,
) -> Result<ExecReport, EditorError> {
    run_with_shell(src, table, history, marks, timestamp, "/bin/sh")
}

/// Like [`run`], but `|`/`<`/`>` pipe commands are launched through `shell`
/// (the `:set shell` value) instead of the default.
pub fn run_with_shell(
    src: &str,
    table: &mut PieceTable,
    history: &mut History,
    marks: &Marks,
    timestamp: u64,
    shell: &str,
) -> Result<ExecReport, EditorError> {
    let program = parser::parse_program(src)?;
    for stmt in &program {
        validate_no_destructive(&stmt.command, false)?;
    }

    let mut transcript = Transcript::new();
    let mut prints = Vec::new();
    let mut effects = Vec::new();
    let ctx = EvalContext { table, marks };

    for stmt in &program {
        let dot = match &stmt.address {
            Some(addr) => addr.eval(&ctx, AddrRange::zero_width(0))?,
            None => AddrRange { start: 0, end: table.size() },
        };
        exec_command(&stmt.command, &ctx, dot, &mut transcript, &mut prints, &mut effects, shell)?;
    }

    if transcript.has_conflict() {
        return Err(EditorError::SamExec(SamExecErrorKind::Conflict));
    }
    let staged_count = transcript.entries().len();
    transcript.apply(table, history, timestamp)?;
    Ok(ExecReport { prints, effects, staged_count })
}

fn validate_no_destructive(cmd: &Command, nested: bool) -> Result<(), EditorError> {
    match cmd {
        Command::Quit { .. } | Command::Edit { .. } if nested => {
            Err(EditorError::SamExec(SamExecErrorKind::LoopDestructive))
        }
        Command::Loop { body, .. } | Command::Cond { body, .. } => validate_no_destructive(body, true),
        Command::Group(body) => {
            for c in body {
                validate_no_destructive(c, true)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn compile(pattern: &str) -> Result<monster_regex::Regex<monster_regex::engine::backtracking::BacktrackingRegexEngine>, EditorError> {
    monster_regex::Regex::new(pattern, monster_regex::Flags::default()).map_err(|e| EditorError::Regex(format!("{e:?}")))
}

fn resolve_ampersand(replacement: &str, matched: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'&') {
            chars.next();
            out.push('&');
        } else if c == '&' {
            out.push_str(matched);
        } else {
            out.push(c);
        }
    }
    out
}

fn exec_command(
    cmd: &Command,
    ctx: &EvalContext,
    dot: AddrRange,
    transcript: &mut Transcript,
    prints: &mut Vec<AddrRange>,
    effects: &mut Vec<Effect>,
    shell: &str,
) -> Result<(), EditorError> {
    match cmd {
        Command::Append { text } => {
            transcript.stage(StagedChange { kind: ChangeKind::Insert, start: dot.end, end: dot.end, data: text.clone(), count: 0 });
        }
        Command::Insert { text } => {
            transcript.stage(StagedChange { kind: ChangeKind::Insert, start: dot.start, end: dot.start, data: text.clone(), count: 0 });
        }
        Command::Change { text } => {
            transcript.stage(StagedChange { kind: ChangeKind::Change, start: dot.start, end: dot.end, data: text.clone(), count: 0 });
        }
        Command::Delete => {
            transcript.stage(StagedChange { kind: ChangeKind::Delete, start: dot.start, end: dot.end, data: Vec::new(), count: 0 });
        }
        Command::Print => prints.push(dot),
        Command::Loop { kind, pattern, bounds, body } => {
            let re = compile(pattern)?;
            let bytes = ctx.table.to_bytes();
            let text = std::str::from_utf8(&bytes).map_err(|_| EditorError::Regex("document is not valid UTF-8".into()))?;
            let window = &text[dot.start..dot.end];

            let mut raw_matches: Vec<(usize, usize)> =
                re.find_all(window).map(|m| (dot.start + m.start, dot.start + m.end)).collect();
            if let Some(last) = raw_matches.last() {
                if last.0 == last.1 && last.1 == dot.end {
                    raw_matches.pop();
                }
            }

            let segments: Vec<AddrRange> = match kind {
                LoopKind::EachMatch => raw_matches.into_iter().map(|(s, e)| AddrRange { start: s, end: e }).collect(),
                LoopKind::Between => {
                    let mut out = Vec::new();
                    let mut cursor = dot.start;
                    for (s, e) in &raw_matches {
                        out.push(AddrRange { start: cursor, end: *s });
                        cursor = *e;
                    }
                    out.push(AddrRange { start: cursor, end: dot.end });
                    out
                }
            };

            let total = segments.len() as i64;
            for (iter, seg) in segments.into_iter().enumerate() {
                let i = iter as i64;
                if let Some(m) = bounds.modulus {
                    if m != 0 && i % m as i64 != 0 {
                        continue;
                    }
                }
                let lo = bounds.lo.map(|n| if n < 0 { (total + n).max(0) } else { n });
                let hi = bounds.hi.map(|n| if n < 0 { (total + n).max(0) } else { n });
                if let Some(lo) = lo {
                    if i < lo {
                        continue;
                    }
                }
                if let Some(hi) = hi {
                    if i > hi {
                        continue;
                    }
                }
                exec_command(body, ctx, seg, transcript, prints, effects, shell)?;
            }
        }
        Command::Cond { kind, pattern, body } => {
            let re = compile(pattern)?;
            let bytes = ctx.table.to_bytes();
            let text = std::str::from_utf8(&bytes).map_err(|_| EditorError::Regex("document is not valid UTF-8".into()))?;
            let window = &text[dot.start..dot.end];
            let matches = re.find(window).is_some();
            let run = match kind {
                CondKind::Matches => matches,
                CondKind::NotMatches => !matches,
            };
            if run {
                exec_command(body, ctx, dot, transcript, prints, effects, shell)?;
            }
        }
        Command::Substitute { pattern, replacement } => {
            let re = compile(pattern)?;
            let bytes = ctx.table.to_bytes();
            let text = std::str::from_utf8(&bytes).map_err(|_| EditorError::Regex("document is not valid UTF-8".into()))?;
            let window = &text[dot.start..dot.end];
            if let Some(m) = re.find(window) {
                let matched = &window[m.start..m.end];
                let data = resolve_ampersand(replacement, matched).into_bytes();
                transcript.stage(StagedChange {
                    kind: ChangeKind::Change,
                    start: dot.start + m.start,
                    end: dot.start + m.end,
                    data,
                    count: 0,
                });
            }
        }
        Command::Pipe { argv } | Command::PipeIn { argv } => {
            let stdin = if matches!(cmd, Command::Pipe { .. }) { Some(ctx.table.read(dot.start, dot.end - dot.start)) } else { None };
            let stdout = run_shell(shell, argv, stdin.as_deref())?;
            transcript.stage(StagedChange { kind: ChangeKind::Change, start: dot.start, end: dot.end, data: stdout, count: 0 });
        }
        Command::PipeOut { argv } => {
            let stdin = ctx.table.read(dot.start, dot.end - dot.start);
            run_shell(shell, argv, Some(&stdin))?;
        }
        Command::Bang { argv, .. } => effects.push(Effect::RunIgnoringBuffer { argv: argv.clone() }),
        Command::Write { path, bangs } => effects.push(Effect::Write { path: path.clone(), bangs: *bangs }),
        Command::Read { path } => effects.push(Effect::Read { path: path.clone() }),
        Command::Edit { path, bangs } => effects.push(Effect::Edit { path: path.clone(), bangs: *bangs }),
        Command::Quit { bangs } => effects.push(Effect::Quit { bangs: *bangs }),
        Command::Group(body) => {
            for c in body {
                exec_command(c, ctx, dot, transcript, prints, effects, shell)?;
            }
        }
    }
    Ok(())
}

fn run_shell(shell: &str, argv: &str, stdin: Option<&[u8]>) -> Result<Vec<u8>, EditorError> {
    use std::io::Write;
    use std::process::{Command as Proc, Stdio};
    let mut child = Proc::new(shell)
        .arg("-c")
        .arg(argv)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(EditorError::from)?;
    if let Some(data) = stdin {
        child.stdin.take().unwrap().write_all(data).map_err(EditorError::from)?;
    } else {
        drop(child.stdin.take());
    }
    let output = child.wait_with_output().map_err(EditorError::from)?;
    if !output.status.success() {
        return Err(EditorError::SamExec(SamExecErrorKind::CommandFailed(output.status.code().unwrap_or(-1))));
    }
    Ok(output.stdout)
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
    fn x_loop_with_change_replaces_every_match() {
        let mut t = table(b"foo bar foo baz");
        let mut history = History::new();
        let marks = Marks::new();
        let report = run(",x/foo/ c/FOO/", &mut t, &mut history, &marks, 1).unwrap();
        assert_eq!(t.to_bytes(), b"FOO bar FOO baz");
        assert_eq!(report.staged_count, 2);
    }

    #[test]
    fn address_arithmetic_deletes_line_range() {
        let mut t = table(b"a\nb\nc\n");
        let mut history = History::new();
        let marks = Marks::new();
        run("2,3 d", &mut t, &mut history, &marks, 1).unwrap();
        assert_eq!(t.to_bytes(), b"a\n");
        history.undo(&mut t);
        assert_eq!(t.to_bytes(), b"a\nb\nc\n");
    }

    #[test]
    fn transcript_conflict_leaves_document_unchanged() {
        let mut t = table(b"abcdef");
        let mut history = History::new();
        let marks = Marks::new();
        let err = run("1,1 d ; 1,3 c/Z/", &mut t, &mut history, &marks, 1).unwrap_err();
        assert!(matches!(err, EditorError::SamExec(SamExecErrorKind::Conflict)));
        assert_eq!(t.to_bytes(), b"abcdef");
    }

    #[test]
    fn self_replacement_is_a_no_op() {
        let mut t = table(b"hello world");
        let mut history = History::new();
        let marks = Marks::new();
        run("x/.*/ c/&/", &mut t, &mut history, &marks, 1).unwrap();
        assert_eq!(t.to_bytes(), b"hello world");
    }

    #[test]
    fn destructive_command_inside_loop_is_rejected() {
        let mut t = table(b"abc");
        let mut history = History::new();
        let marks = Marks::new();
        let err = run(",x/a/ q", &mut t, &mut history, &marks, 1).unwrap_err();
        assert!(matches!(err, EditorError::SamExec(SamExecErrorKind::LoopDestructive)));
    }
}
