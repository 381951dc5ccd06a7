//! Error types for reading and transforming tasklang source.
//!
//! Reader and transformer failures are distinct structured errors; the
//! top-level [`Error`] tags either of them with the input that produced it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::ast::SpecialForm;
use crate::value::Value;

/// Convenience result alias for top-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error surfaced by the string and file entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw text could not be read into generic values.
    #[error("failed to read {input:?}: {source}")]
    Read {
        /// Original input text.
        input: String,
        /// Underlying reader failure.
        #[source]
        source: ReadError,
    },

    /// The generic values could not be transformed into an AST.
    #[error("failed to parse {input:?}: {source}")]
    Parse {
        /// Original input text.
        input: String,
        /// Underlying transform failure.
        #[source]
        source: ParseError,
    },

    /// A source file could not be loaded.
    #[error("failed to load {}: {source}", .path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// IO error
        #[source]
        source: io::Error,
    },

    /// Output configuration was invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rendering an AST as JSON failed.
    #[error("JSON rendering failed: {0}")]
    Render(#[from] serde_json::Error),
}

impl Error {
    /// Original input text, for read and parse failures.
    pub fn input(&self) -> Option<&str> {
        match self {
            Error::Read { input, .. } | Error::Parse { input, .. } => Some(input),
            _ => None,
        }
    }

    /// The transform failure, if this error wraps one.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            Error::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure while reading raw text into generic values.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at byte {offset}")]
pub struct ReadError {
    /// Description of the syntax problem.
    pub message: String,
    /// Byte offset into the source text.
    pub offset: usize,
}

/// What went wrong during a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// `()` has no operator.
    #[error("empty-list")]
    EmptyList,

    /// The value has no AST mapping.
    #[error("unparseable")]
    Unparseable,

    /// A special form had the wrong arity or argument shape.
    #[error("{}", .0.expected_shape())]
    InvalidForm(SpecialForm),

    /// An execution-log entry had a malformed field.
    #[error("{0}")]
    InvalidLogEntry(&'static str),
}

/// Structured transform failure: the kind plus the offending fragment.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {fragment}")]
pub struct ParseError {
    /// Failure kind.
    pub kind: ParseErrorKind,
    /// Offending input fragment.
    pub fragment: Value,
}

impl ParseError {
    /// Create an error attaching a copy of the offending fragment.
    pub fn new(kind: ParseErrorKind, fragment: &Value) -> Self {
        Self {
            kind,
            fragment: fragment.clone(),
        }
    }

    /// Shorthand for a malformed special form.
    pub fn invalid_form(form: SpecialForm, fragment: &Value) -> Self {
        Self::new(ParseErrorKind::InvalidForm(form), fragment)
    }

    /// Kind name: `empty-list`, `unparseable`, or the form-specific message.
    pub fn name(&self) -> String {
        self.kind.to_string()
    }

    /// The special form that was malformed, if any.
    pub fn form(&self) -> Option<SpecialForm> {
        match self.kind {
            ParseErrorKind::InvalidForm(form) => Some(form),
            _ => None,
        }
    }
}
