//! Register store
//!
//! Registers hold one byte string per "slot" (one slot per active
//! selection when multi-cursor). The special-register behavior (`"`, `0`,
//! `1`-`9`, `&`, `_`, `*`/`+`, `.`, `/`, `:`, `!`, `#`) is implemented as a
//! name→storage-policy mapping in `RegisterName::classify` rather than a
//! dozen hand-wired `if` branches.

use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Normal,
    Number,
    Blackhole,
    Clipboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardVariant {
    Primary,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterName {
    Named(char),
    Unnamed,
    LastYank,
    SubMatch(u8),
    WholeMatch,
    Blackhole,
    Clipboard(ClipboardVariant),
    LastInsert,
    LastSearch,
    LastExCommand,
    LastShellCommand,
    SlotNumber,
}

impl RegisterName {
    #[must_use]
    pub fn parse(c: char) -> Self {
        match c {
            '"' => Self::Unnamed,
            '0' => Self::LastYank,
            '1'..='9' => Self::SubMatch(c as u8 - b'0'),
            '&' => Self::WholeMatch,
            '_' => Self::Blackhole,
            '*' => Self::Clipboard(ClipboardVariant::Primary),
            '+' => Self::Clipboard(ClipboardVariant::System),
            '.' => Self::LastInsert,
            '/' => Self::LastSearch,
            ':' => Self::LastExCommand,
            '!' => Self::LastShellCommand,
            '#' => Self::SlotNumber,
            lower if lower.is_ascii_lowercase() => Self::Named(lower),
            upper if upper.is_ascii_uppercase() => Self::Named(upper.to_ascii_lowercase()),
            other => Self::Named(other),
        }
    }

    /// Uppercase register names append instead of overwrite.
    #[must_use]
    pub fn is_append(c: char) -> bool {
        c.is_ascii_uppercase()
    }

    #[must_use]
    pub fn kind(self) -> RegisterKind {
        match self {
            Self::Blackhole => RegisterKind::Blackhole,
            Self::Clipboard(_) => RegisterKind::Clipboard,
            Self::SubMatch(_) | Self::SlotNumber => RegisterKind::Number,
            _ => RegisterKind::Normal,
        }
    }
}

/// Abstraction over the clipboard shellout so tests can mock it instead
/// of shelling out for real.
pub trait ClipboardBackend {
    fn copy(&mut self, variant: ClipboardVariant, bytes: &[u8]) -> std::io::Result<()>;
    fn paste(&mut self, variant: ClipboardVariant) -> std::io::Result<Vec<u8>>;
}

/// Shells out to `vis-clipboard --copy|--paste`, the helper named in the
/// register table above.
pub struct ShellClipboard;

impl ClipboardBackend for ShellClipboard {
    fn copy(&mut self, variant: ClipboardVariant, bytes: &[u8]) -> std::io::Result<()> {
        use std::io::Write;
        let selection = match variant {
            ClipboardVariant::Primary => "primary",
            ClipboardVariant::System => "clipboard",
        };
        let mut child = Command::new("vis-clipboard")
            .arg("--copy")
            .arg("--selection")
            .arg(selection)
            .stdin(std::process::Stdio::piped())
            .spawn()?;
        child.stdin.take().unwrap().write_all(bytes)?;
        child.wait()?;
        Ok(())
    }

    fn paste(&mut self, variant: ClipboardVariant) -> std::io::Result<Vec<u8>> {
        let selection = match variant {
            ClipboardVariant::Primary => "primary",
            ClipboardVariant::System => "clipboard",
        };
        let output = Command::new("vis-clipboard").arg("--paste").arg("--selection").arg(selection).output()?;
        Ok(output.stdout)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterContent {
    pub slots: Vec<Vec<u8>>,
    pub linewise: bool,
}

pub struct Registers {
    named: std::collections::HashMap<char, RegisterContent>,
    clipboard: Box<dyn ClipboardBackend>,
}

impl Registers {
    #[must_use]
    pub fn new(clipboard: Box<dyn ClipboardBackend>) -> Self {
        Self { named: std::collections::HashMap::new(), clipboard }
    }

    fn key(name: RegisterName) -> Option<char> {
        match name {
            RegisterName::Named(c) => Some(c),
            RegisterName::Unnamed => Some('"'),
            RegisterName::LastYank => Some('0'),
            RegisterName::SubMatch(n) => Some((b'0' + n) as char),
            RegisterName::WholeMatch => Some('&'),
            RegisterName::LastInsert => Some('.'),
            RegisterName::LastSearch => Some('/'),
            RegisterName::LastExCommand => Some(':'),
            RegisterName::LastShellCommand => Some('!'),
            RegisterName::SlotNumber | RegisterName::Blackhole | RegisterName::Clipboard(_) => None,
        }
    }

    #[must_use]
    pub fn get(&mut self, name: RegisterName, slot: usize) -> Vec<u8> {
        match name {
            RegisterName::Blackhole => Vec::new(),
            RegisterName::Clipboard(v) => self.clipboard.paste(v).unwrap_or_default(),
            RegisterName::SlotNumber => slot.to_string().into_bytes(),
            other => Self::key(other)
                .and_then(|k| self.named.get(&k))
                .and_then(|c| c.slots.get(slot.min(c.slots.len().saturating_sub(1))))
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub fn put(&mut self, name: RegisterName, slot: usize, bytes: Vec<u8>, linewise: bool, append: bool) {
        match name {
            RegisterName::Blackhole => {}
            RegisterName::Clipboard(v) => {
                let _ = self.clipboard.copy(v, &bytes);
            }
            RegisterName::SlotNumber => {}
            other => {
                if let Some(key) = Self::key(other) {
                    let entry = self.named.entry(key).or_default();
                    entry.linewise = linewise;
                    while entry.slots.len() <= slot {
                        entry.slots.push(Vec::new());
                    }
                    if append {
                        entry.slots[slot].extend_from_slice(&bytes);
                    } else {
                        entry.slots[slot] = bytes;
                    }
                }
            }
        }
    }

    pub fn resize(&mut self, name: RegisterName, slot_count: usize) {
        if let Some(key) = Self::key(name) {
            let entry = self.named.entry(key).or_default();
            entry.slots.resize(slot_count, Vec::new());
        }
    }

    #[must_use]
    pub fn count(&self, name: RegisterName) -> usize {
        Self::key(name).and_then(|k| self.named.get(&k)).map_or(0, |c| c.slots.len())
    }

    #[must_use]
    pub fn linewise(&self, name: RegisterName) -> bool {
        Self::key(name).and_then(|k| self.named.get(&k)).is_some_and(|c| c.linewise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockClipboard {
        buf: std::cell::RefCell<Vec<u8>>,
    }

    impl ClipboardBackend for MockClipboard {
        fn copy(&mut self, _variant: ClipboardVariant, bytes: &[u8]) -> std::io::Result<()> {
            *self.buf.borrow_mut() = bytes.to_vec();
            Ok(())
        }
        fn paste(&mut self, _variant: ClipboardVariant) -> std::io::Result<Vec<u8>> {
            Ok(self.buf.borrow().clone())
        }
    }

    fn registers() -> Registers {
        Registers::new(Box::new(MockClipboard { buf: std::cell::RefCell::new(Vec::new()) }))
    }

    #[test]
    fn blackhole_discards_writes() {
        let mut r = registers();
        r.put(RegisterName::Blackhole, 0, b"x".to_vec(), false, false);
        assert_eq!(r.get(RegisterName::Blackhole, 0), Vec::<u8>::new());
    }

    #[test]
    fn uppercase_name_appends() {
        let mut r = registers();
        r.put(RegisterName::Named('a'), 0, b"foo".to_vec(), false, false);
        assert!(RegisterName::is_append('A'));
        r.put(RegisterName::Named('a'), 0, b"bar".to_vec(), false, true);
        assert_eq!(r.get(RegisterName::Named('a'), 0), b"foobar");
    }

    #[test]
    fn clipboard_roundtrips_through_backend() {
        let mut r = registers();
        r.put(RegisterName::Clipboard(ClipboardVariant::System), 0, b"clip".to_vec(), false, false);
        assert_eq!(r.get(RegisterName::Clipboard(ClipboardVariant::System), 0), b"clip");
    }

    #[test]
    fn slot_number_register_reports_index() {
        let mut r = registers();
        assert_eq!(r.get(RegisterName::SlotNumber, 2), b"2");
    }

    #[test]
    fn parse_maps_special_names() {
        assert_eq!(RegisterName::parse('"'), RegisterName::Unnamed);
        assert_eq!(RegisterName::parse('3'), RegisterName::SubMatch(3));
        assert_eq!(RegisterName::parse('*'), RegisterName::Clipboard(ClipboardVariant::Primary));
    }
}
