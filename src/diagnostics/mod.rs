//! Diagnostics sink
//! Centralized collection of user-visible, severity-tagged messages.
//!
//! The core never prints or logs directly: components push one-line
//! diagnostics here (the "info-show hook") and the host (a UI, a test,
//! `main.rs`) drains them. This keeps the library free of `println!`/`log`
//! side effects while still giving every failure a place to surface.

use crate::error::{EditorError, ErrorSeverity};

/// A single surfaced diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: ErrorSeverity,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(severity: ErrorSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Bounded ring of recent diagnostics. Bounding keeps a long session's
/// memory footprint flat; callers that need full history should persist
/// `Diagnostic`s themselves as they're pushed.
pub struct DiagnosticsSink {
    entries: Vec<Diagnostic>,
    capacity: usize,
}

const DEFAULT_CAPACITY: usize = 256;

impl DiagnosticsSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn push(&mut self, diag: Diagnostic) {
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(diag);
    }

    pub fn report(&mut self, err: &EditorError) {
        self.push(Diagnostic::new(err.severity(), err.to_string()));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::new(ErrorSeverity::Info, message));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::new(ErrorSeverity::Warning, message));
    }

    /// Most recent diagnostic, if any (what a status line would show)
    #[must_use]
    pub fn last(&self) -> Option<&Diagnostic> {
        self.entries.last()
    }

    #[must_use]
    pub fn all(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn clear_last(&mut self) {
        self.entries.pop();
    }
}

impl Default for DiagnosticsSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoErrorKind;

    #[test]
    fn report_uses_error_severity() {
        let mut sink = DiagnosticsSink::new();
        sink.report(&EditorError::io(IoErrorKind::NotFound, "x"));
        assert_eq!(sink.last().unwrap().severity, ErrorSeverity::Error);
    }

    #[test]
    fn ring_bounds_capacity() {
        let mut sink = DiagnosticsSink {
            entries: Vec::new(),
            capacity: 2,
        };
        sink.info("a");
        sink.info("b");
        sink.info("c");
        assert_eq!(sink.all().len(), 2);
        assert_eq!(sink.all()[0].message, "b");
    }
}
