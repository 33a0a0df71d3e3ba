//! Centralized error handling for the editor core
//! Defines the error taxonomy used by every component and the severity tag
//! used to route diagnostics to the info-show hook.

use std::fmt;
use std::io;

pub mod manager;

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational message (not really an error)
    Info,
    /// Warning - something might be wrong but operation can continue
    Warning,
    /// Standard error - operation failed but editor can continue
    Error,
    /// Critical error - may lead to data loss or require restart
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// I/O failure discrimination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoErrorKind {
    NotFound,
    Permission,
    IsDir,
    NotRegular,
    /// The mapped file was truncated or removed out from under a live mapping
    Truncated,
    Other(String),
}

impl fmt::Display for IoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Permission => write!(f, "permission denied"),
            Self::IsDir => write!(f, "is a directory"),
            Self::NotRegular => write!(f, "not a regular file"),
            Self::Truncated => write!(f, "file truncated while mapped"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

impl From<io::Error> for IoErrorKind {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Permission,
            _ => Self::Other(err.to_string()),
        }
    }
}

/// Sam parser failure discrimination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamSyntaxErrorKind {
    BadAddress,
    UnmatchedBrace,
    NewlineExpected,
    TextExpected,
    ShellExpected,
    UnknownCommand,
    InvalidMark,
    InvalidCount,
    NoAddressAllowed,
}

impl fmt::Display for SamSyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadAddress => "bad address",
            Self::UnmatchedBrace => "unmatched brace",
            Self::NewlineExpected => "newline expected",
            Self::TextExpected => "text expected",
            Self::ShellExpected => "shell command expected",
            Self::UnknownCommand => "unknown command",
            Self::InvalidMark => "invalid mark",
            Self::InvalidCount => "invalid count",
            Self::NoAddressAllowed => "no address allowed here",
        };
        write!(f, "{s}")
    }
}

/// Sam executor failure discrimination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamExecErrorKind {
    /// Two staged transcript changes overlap
    Conflict,
    /// A `w` ran while a change to the same file was still unfinished
    WriteConflict,
    /// `q`/`e`/`qall`/`wq` rejected inside a loop
    LoopDestructive,
    /// `q`/`e`/`qall`/`wq` rejected inside a group
    GroupDestructive,
    /// A `|`/`<`/`>`/`!` subprocess exited non-zero
    CommandFailed(i32),
}

impl fmt::Display for SamExecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "overlapping changes in transcript"),
            Self::WriteConflict => write!(f, "write during unfinished change"),
            Self::LoopDestructive => write!(f, "destructive command inside loop"),
            Self::GroupDestructive => write!(f, "destructive command inside group"),
            Self::CommandFailed(code) => write!(f, "command failed with status {code}"),
        }
    }
}

/// The editor's error taxonomy, as one enum so call sites can propagate
/// with `?` across component boundaries without boxing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// Offset or range outside the document
    BadPosition { pos: usize, len: usize },
    /// Slab or piece allocation failed
    OutOfMemory,
    Io {
        kind: IoErrorKind,
        path: Option<String>,
    },
    /// Pattern failed to compile, or no match where one was required
    Regex(String),
    SamSyntax {
        kind: SamSyntaxErrorKind,
        detail: String,
    },
    SamExec(SamExecErrorKind),
    /// User cancelled a blocking subprocess operation
    Interrupted,
    /// Catch-all for cases without a dedicated kind
    Other { code: String, message: String },
}

impl EditorError {
    #[must_use]
    pub fn bad_position(pos: usize, len: usize) -> Self {
        Self::BadPosition { pos, len }
    }

    pub fn io(kind: IoErrorKind, path: impl Into<String>) -> Self {
        Self::Io {
            kind,
            path: Some(path.into()),
        }
    }

    pub fn sam_syntax(kind: SamSyntaxErrorKind, detail: impl Into<String>) -> Self {
        Self::SamSyntax {
            kind,
            detail: detail.into(),
        }
    }

    pub fn other(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Severity used to route this error to the diagnostics sink. Most
    /// buffer/motion failures are silent; Sam and `:`-command
    /// failures surface a single-line diagnostic.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfMemory => ErrorSeverity::Critical,
            Self::Io {
                kind: IoErrorKind::Truncated,
                ..
            } => ErrorSeverity::Critical,
            Self::BadPosition { .. } | Self::Interrupted => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPosition { pos, len } => {
                write!(f, "position {pos} out of bounds (len {len})")
            }
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::Io { kind, path } => match path {
                Some(p) => write!(f, "{p}: {kind}"),
                None => write!(f, "{kind}"),
            },
            Self::Regex(msg) => write!(f, "regex error: {msg}"),
            Self::SamSyntax { kind, detail } => write!(f, "sam syntax error: {kind}: {detail}"),
            Self::SamExec(kind) => write!(f, "sam execution error: {kind}"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Other { code, message } => write!(f, "[{code}] {message}"),
        }
    }
}

impl std::error::Error for EditorError {}

impl From<io::Error> for EditorError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.into(),
            path: None,
        }
    }
}

impl From<String> for EditorError {
    fn from(msg: String) -> Self {
        Self::Other {
            code: "GENERIC_ERROR".into(),
            message: msg,
        }
    }
}

impl From<&str> for EditorError {
    fn from(msg: &str) -> Self {
        Self::Other {
            code: "GENERIC_ERROR".into(),
            message: msg.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path() {
        let err = EditorError::io(IoErrorKind::NotFound, "/tmp/missing");
        assert_eq!(err.to_string(), "/tmp/missing: not found");
    }

    #[test]
    fn severity_routes_truncated_as_critical() {
        let err = EditorError::Io {
            kind: IoErrorKind::Truncated,
            path: None,
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn bad_position_is_warning() {
        assert_eq!(
            EditorError::bad_position(5, 3).severity(),
            ErrorSeverity::Warning
        );
    }
}
