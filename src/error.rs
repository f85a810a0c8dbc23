use std::fmt;

use thiserror::Error;

use crate::formats::Format;

/// Where in a source document a parse failure was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A line number in a text format (1-based).
    Line(usize),
    /// A JSON path in a JSON format, e.g. `triggerRules.rules[2]`.
    JsonPath(String),
    /// The failure applies to the document as a whole.
    Document,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(n) => write!(f, "line {n}"),
            Location::JsonPath(path) => write!(f, "{path}"),
            Location::Document => write!(f, "document"),
        }
    }
}

/// A malformed rule in an otherwise-valid document.
///
/// Per-rule and non-fatal: the parser drops the offending rule, records one
/// of these, and keeps going. Accumulated in
/// [`ParsedDocument::errors`](crate::ParsedDocument).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{format} parse error at {location}: {reason}")]
pub struct ParseError {
    pub format: Format,
    pub location: Location,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn at_line(format: Format, line: usize, reason: impl Into<String>) -> Self {
        Self {
            format,
            location: Location::Line(line),
            reason: reason.into(),
        }
    }

    pub(crate) fn at_path(format: Format, path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            format,
            location: Location::JsonPath(path.into()),
            reason: reason.into(),
        }
    }
}

/// A document the parser could not read at all.
///
/// Unlike [`ParseError`] this is fatal for the whole call: invalid JSON for
/// a JSON-based format, or text that never enters the grammar.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{format} document is not valid: {reason}")]
    Syntax { format: Format, reason: String },

    #[error("{format} document is not valid JSON: {source}")]
    Json {
        format: Format,
        #[source]
        source: serde_json::Error,
    },
}

/// A document that yielded zero parseable rules.
///
/// Produced by [`ParsedDocument::require_rules`](crate::ParsedDocument::require_rules);
/// whether this is fatal is the caller's decision, not the compiler's.
#[derive(Debug, Error)]
#[error("no valid rules found in {format} document ({attempted} attempted)")]
pub struct EmptyDocumentError {
    pub format: Format,
    pub attempted: usize,
}

/// Unified error type covering every failure mode of the compiler.
#[derive(Debug, Error)]
pub enum FabulaError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    EmptyDocument(#[from] EmptyDocumentError),
}
