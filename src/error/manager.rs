//! Error Manager
//! Centralizes error handling and diagnostic dispatch

use crate::diagnostics::DiagnosticsSink;
use crate::error::EditorError;

/// Manages errors and their presentation to the user
pub struct ErrorManager {
    /// Internal diagnostics sink for displaying errors
    diagnostics: DiagnosticsSink,
}

impl ErrorManager {
    /// Create a new error manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            diagnostics: DiagnosticsSink::new(),
        }
    }

    pub fn handle(&mut self, err: EditorError) {
        self.diagnostics.report(&err);
    }

    /// Get a reference to the diagnostics sink
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticsSink {
        &self.diagnostics
    }

    /// Get a mutable reference to the diagnostics sink
    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticsSink {
        &mut self.diagnostics
    }
}

impl Default for ErrorManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorSeverity, IoErrorKind};

    #[test]
    fn handle_routes_into_diagnostics() {
        let mut mgr = ErrorManager::new();
        mgr.handle(EditorError::io(IoErrorKind::Permission, "f"));
        assert_eq!(mgr.diagnostics().last().unwrap().severity, ErrorSeverity::Error);
    }
}
