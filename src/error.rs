//! Error types for ferro-txmap
//!
//! This module provides:
//! - Error codes for categorization
//! - Source span tracking for CIGAR parse failures
//! - A split between per-row statuses (never errors) and transient I/O
//!   failures that the batch pipeline retries

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors
///
/// These codes can be used for programmatic error handling
/// and for documentation lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Alignment errors (E11xx)
    /// CIGAR string does not parse
    MalformedOperationString = 1101,
    /// Alignment has no transcript bases or no match run
    EmptyAlignment = 1102,
    /// Transcript id seen twice
    DuplicateTranscript = 1103,

    // Input errors (E12xx)
    /// Row does not satisfy the input schema
    MalformedRow = 1201,
    /// Header lacks a required column
    InvalidHeader = 1202,

    // Lookup errors (E2xxx)
    /// Transcript not in the catalog
    UnknownTranscript = 2001,

    // Coordinate errors (E3xxx)
    /// Coordinates overflow or are otherwise unusable
    InvalidRange = 3003,

    // IO errors (E9xxx)
    /// File IO error
    IoError = 9001,
    /// Chunk I/O failed after every retry
    RetriesExhausted = 9002,
    /// Configuration file error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the error code as a string (e.g., "E1101")
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// Get a brief description of this error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::MalformedOperationString => "malformed CIGAR operation string",
            ErrorCode::EmptyAlignment => "alignment covers no transcript bases",
            ErrorCode::DuplicateTranscript => "duplicate transcript identifier",
            ErrorCode::MalformedRow => "malformed input row",
            ErrorCode::InvalidHeader => "missing required header column",
            ErrorCode::UnknownTranscript => "transcript not found",
            ErrorCode::InvalidRange => "invalid coordinate range",
            ErrorCode::IoError => "file I/O error",
            ErrorCode::RetriesExhausted => "retries exhausted",
            ErrorCode::ConfigError => "configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A span in the source input indicating error location
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceSpan {
    /// Starting byte offset (0-indexed)
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
}

impl SourceSpan {
    /// Create a new source span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a span for a single position
    pub fn point(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Format the source with the error highlighted
    ///
    /// Returns a string like:
    /// ```text
    /// 8M7X6M
    ///   ^~
    /// ```
    pub fn highlight(&self, source: &str) -> String {
        if source.is_empty() {
            return String::new();
        }

        let safe_start = self.start.min(source.len());
        let safe_end = self.end.min(source.len()).max(safe_start);

        let mut pointer = String::with_capacity(source.len() + 4);
        for _ in 0..safe_start {
            pointer.push(' ');
        }
        pointer.push('^');
        for _ in (safe_start + 1)..safe_end {
            pointer.push('~');
        }

        format!("{}\n{}", source, pointer)
    }
}

/// Main error type for ferro-txmap operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FerroError {
    /// CIGAR token does not parse
    #[error("Malformed operation string '{cigar}' at position {}: {msg}", .span.start)]
    MalformedOperationString {
        cigar: String,
        span: SourceSpan,
        msg: String,
    },

    /// Alignment covers no transcript bases or has no match run
    #[error("Empty alignment for '{cigar}': {msg}")]
    EmptyAlignment { cigar: String, msg: String },

    /// Transcript id already present in the catalog
    #[error("Duplicate transcript: {id}")]
    DuplicateTranscript { id: String },

    /// Input row failed schema validation
    #[error("Malformed row at line {line}: {msg}")]
    MalformedRow { line: u64, msg: String },

    /// Input header is missing required columns
    #[error("Invalid header in {input}: missing column(s) {missing}")]
    InvalidHeader { input: String, missing: String },

    /// Transcript not in the catalog
    #[error("Unknown transcript: {id}")]
    UnknownTranscript { id: String },

    /// Invalid coordinates provided
    #[error("Invalid coordinates: {msg}")]
    InvalidCoordinates { msg: String },

    /// IO error (for file operations)
    #[error("IO error: {msg}")]
    Io { msg: String },

    /// A chunk read or write kept failing
    #[error("Chunk {chunk} failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        chunk: u64,
        attempts: u32,
        last_error: Box<FerroError>,
    },

    /// Configuration file error
    #[error("Config error: {msg}")]
    Config { msg: String },
}

impl FerroError {
    /// Create a malformed CIGAR error pointing at `pos`
    pub fn malformed_cigar(cigar: &str, pos: usize, msg: impl Into<String>) -> Self {
        FerroError::MalformedOperationString {
            cigar: cigar.to_string(),
            span: SourceSpan::point(pos),
            msg: msg.into(),
        }
    }

    /// Create a malformed row error
    pub fn malformed_row(line: u64, msg: impl Into<String>) -> Self {
        FerroError::MalformedRow {
            line,
            msg: msg.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            FerroError::MalformedOperationString { .. } => ErrorCode::MalformedOperationString,
            FerroError::EmptyAlignment { .. } => ErrorCode::EmptyAlignment,
            FerroError::DuplicateTranscript { .. } => ErrorCode::DuplicateTranscript,
            FerroError::MalformedRow { .. } => ErrorCode::MalformedRow,
            FerroError::InvalidHeader { .. } => ErrorCode::InvalidHeader,
            FerroError::UnknownTranscript { .. } => ErrorCode::UnknownTranscript,
            FerroError::InvalidCoordinates { .. } => ErrorCode::InvalidRange,
            FerroError::Io { .. } => ErrorCode::IoError,
            FerroError::RetriesExhausted { .. } => ErrorCode::RetriesExhausted,
            FerroError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    /// Input line the error refers to, if any
    pub fn line(&self) -> Option<u64> {
        match self {
            FerroError::MalformedRow { line, .. } => Some(*line),
            FerroError::RetriesExhausted { last_error, .. } => last_error.line(),
            _ => None,
        }
    }

    /// Whether the batch pipeline should retry the operation that failed.
    /// Only I/O failures are transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, FerroError::Io { .. })
    }

    /// Get a formatted error with the error code and, for CIGAR errors,
    /// the offending token highlighted
    pub fn detailed_message(&self) -> String {
        match self {
            FerroError::MalformedOperationString { cigar, span, .. } => format!(
                "[{}] {}\n\n{}",
                self.code(),
                self,
                span.highlight(cigar)
            ),
            _ => format!("[{}] {}", self.code(), self),
        }
    }
}

impl From<std::io::Error> for FerroError {
    fn from(err: std::io::Error) -> Self {
        FerroError::Io {
            msg: err.to_string(),
        }
    }
}

impl From<csv::Error> for FerroError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(e) => e.into(),
            csv::ErrorKind::Deserialize { err, .. } => FerroError::MalformedRow {
                line,
                msg: err.to_string(),
            },
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => FerroError::MalformedRow {
                line,
                msg: format!("expected {} fields, found {}", expected_len, len),
            },
            csv::ErrorKind::Utf8 { err, .. } => FerroError::MalformedRow {
                line,
                msg: err.to_string(),
            },
            other => FerroError::Io {
                msg: format!("{:?}", other),
            },
        }
    }
}

impl From<toml::de::Error> for FerroError {
    fn from(err: toml::de::Error) -> Self {
        FerroError::Config {
            msg: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FerroError {
    fn from(err: serde_json::Error) -> Self {
        FerroError::Io {
            msg: err.to_string(),
        }
    }
}
