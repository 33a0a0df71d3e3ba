//! The headless editor core: a set of open files, the dispatcher driving
//! the active one, and the `:`-command surface wired together. Owns no
//! terminal or rendering state — that belongs to whatever front end
//! drives this core with key events, the way the old `Editor<T:
//! TerminalBackend>` owned the terminal but left key decoding to it.

use crate::cmdline::{self, settings::Options, ExCommand};
use crate::diagnostics::DiagnosticsSink;
use crate::document::{File, FileId};
use crate::error::manager::ErrorManager;
use crate::error::EditorError;
use crate::key::Key;
use crate::modes::{Dispatcher, Session};
use crate::registers::{Registers, ShellClipboard};
use crate::sam::{self, Effect};
use crate::view::View;

struct Window {
    file: File,
    view: View,
    dispatcher: Dispatcher,
}

pub struct Editor {
    windows: Vec<Window>,
    active: usize,
    registers: Registers,
    pub options: Options,
    next_id: FileId,
    pub should_quit: bool,
    errors: ErrorManager,
}

impl Editor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: vec![Window { file: File::scratch(0), view: View::new(80, 24, 8), dispatcher: Dispatcher::new() }],
            active: 0,
            registers: Registers::new(Box::new(ShellClipboard)),
            options: Options::default(),
            next_id: 1,
            should_quit: false,
            errors: ErrorManager::new(),
        }
    }

    /// Diagnostics accumulated from failed `:`-lines, for a front end's
    /// status line or a test to inspect after the fact.
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticsSink {
        self.errors.diagnostics()
    }

    /// Seed the currently active (scratch) buffer from bytes already read
    /// by the caller, for `-` on the command line.
    pub fn load_stdin(&mut self, bytes: &[u8]) -> Result<(), EditorError> {
        let win = self.active_window();
        win.file.newline = crate::document::NewlineConvention::detect(bytes);
        if let Some(change) = win.file.table.insert(0, bytes)? {
            win.file.history.record(change, 0);
        }
        win.file.history.snapshot();
        Ok(())
    }

    pub fn open_file(&mut self, path: &str) -> Result<(), EditorError> {
        let file = File::open(self.next_id, path, self.options.loadmethod)?;
        self.next_id += 1;
        self.windows.push(Window { file, view: View::new(80, 24, self.options.tabwidth), dispatcher: Dispatcher::new() });
        self.active = self.windows.len() - 1;
        Ok(())
    }

    fn active_window(&mut self) -> &mut Window {
        &mut self.windows[self.active]
    }

    #[must_use]
    pub fn current_file(&self) -> &File {
        &self.windows[self.active].file
    }

    pub fn feed_key(&mut self, key: Key, timestamp: u64) {
        let win = &mut self.windows[self.active];
        let mut session = Session {
            table: &mut win.file.table,
            view: &mut win.view,
            registers: &mut self.registers,
            history: &mut win.file.history,
            marks: &win.file.marks,
            tabwidth: self.options.tabwidth,
            expandtab: self.options.expandtab,
            timestamp,
        };
        win.dispatcher.feed_key(key, &mut session);
    }

    /// Run one `:`-line (without the leading `:`). Returns effects the
    /// front end must act on itself (quitting, opening another file).
    pub fn execute_line(&mut self, line: &str, timestamp: u64) -> Result<Vec<Effect>, EditorError> {
        let result = self.execute_line_inner(line, timestamp);
        if let Err(err) = &result {
            self.errors.handle(err.clone());
        }
        result
    }

    fn execute_line_inner(&mut self, line: &str, timestamp: u64) -> Result<Vec<Effect>, EditorError> {
        match cmdline::parse(line)? {
            ExCommand::Sam(src) => {
                let shell = self.options.shell.clone();
                let win = self.active_window();
                let report = sam::run_with_shell(&src, &mut win.file.table, &mut win.file.history, &win.file.marks, timestamp, &shell)?;
                Ok(report.effects)
            }
            ExCommand::Write { path, .. } => {
                self.active_window().file.save(path.as_deref().map(std::path::Path::new))?;
                Ok(Vec::new())
            }
            ExCommand::Wq { path, .. } => {
                self.active_window().file.save(path.as_deref().map(std::path::Path::new))?;
                self.should_quit = true;
                Ok(Vec::new())
            }
            ExCommand::Quit { .. } | ExCommand::QuitAll { .. } => {
                self.should_quit = true;
                Ok(Vec::new())
            }
            ExCommand::Edit { path: Some(path), .. } => {
                self.open_file(&path)?;
                Ok(Vec::new())
            }
            ExCommand::Open { paths } => {
                for p in &paths {
                    self.open_file(p)?;
                }
                Ok(Vec::new())
            }
            ExCommand::Set { name, value } => {
                crate::cmdline::settings::apply(&mut self.options, &name, value.as_deref())
                    .map_err(|e| EditorError::other("SET", e.to_string()))?;
                Ok(Vec::new())
            }
            ExCommand::ReadFile { path } => {
                let bytes = std::fs::read(&path)?;
                let win = self.active_window();
                let pos = win.view.primary_selection().head;
                if let Some(change) = win.file.table.insert(pos, &bytes)? {
                    win.file.history.record(change, timestamp);
                }
                Ok(Vec::new())
            }
            other => Ok(vec![unsupported_effect(other)]),
        }
    }

    /// `+cmd` from the command line: a leading `/` or `?` is a forward or
    /// backward search, otherwise an ordinary `:`-line.
    pub fn run_startup_command(&mut self, cmd: &str, timestamp: u64) -> Result<Vec<Effect>, EditorError> {
        if let Some(pattern) = cmd.strip_prefix('/').or_else(|| cmd.strip_prefix('?')) {
            self.execute_line(&format!("x/{pattern}/ p"), timestamp)
        } else {
            self.execute_line(cmd, timestamp)
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

fn unsupported_effect(cmd: ExCommand) -> Effect {
    match cmd {
        ExCommand::Split { path } | ExCommand::Vsplit { path } | ExCommand::NewWindow { path } | ExCommand::VnewWindow { path } => {
            Effect::Edit { path: path.unwrap_or_default(), bangs: 0 }
        }
        _ => Effect::RunIgnoringBuffer { argv: String::new() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_through_cmdline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut ed = Editor::new();
        ed.feed_key(Key::Char('i'), 1);
        ed.execute_line(&format!("write {}", path.display()), 1).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn sam_command_through_execute_line_edits_buffer() {
        let mut ed = Editor::new();
        ed.active_window().file.table.insert(0, b"foo bar foo").unwrap();
        ed.execute_line(",x/foo/ c/FOO/", 1).unwrap();
        assert_eq!(ed.current_file().table.to_bytes(), b"FOO bar FOO");
    }

    #[test]
    fn quit_sets_should_quit_flag() {
        let mut ed = Editor::new();
        ed.execute_line("q", 1).unwrap();
        assert!(ed.should_quit);
    }

    #[test]
    fn set_command_mutates_options() {
        let mut ed = Editor::new();
        ed.execute_line("set tabwidth 4", 1).unwrap();
        assert_eq!(ed.options.tabwidth, 4);
    }

    #[test]
    fn failed_command_is_recorded_in_diagnostics() {
        let mut ed = Editor::new();
        assert!(ed.execute_line("set bogus 1", 1).is_err());
        assert!(ed.diagnostics().last().is_some());
    }
}
