//! Error types for pattern compilation and sentence querying.
//!
//! Absence of a match is never an error; these cover malformed rule
//! definitions and misuse of the sentence API.

use thiserror::Error;

/// Failure while compiling a [`crate::algo::Pattern`] from its definition.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The primary or cue regex did not compile
    #[error("pattern '{name}': invalid regex '{source_text}': {message}")]
    InvalidRegex {
        name: String,
        source_text: String,
        message: String,
    },

    /// A cue scope name in a rule definition is not recognised
    #[error("pattern '{name}': unknown cue scope '{scope}' (expected sentence, before, after or either)")]
    UnknownScope { name: String, scope: String },

    /// A window was given for a scope that has no side to measure from
    #[error("pattern '{name}': window {window} needs a before, after or either scope, not '{scope}'")]
    WindowWithoutSide {
        name: String,
        scope: String,
        window: usize,
    },
}

/// Failure raised by a [`crate::text::Sentence`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SentenceError {
    /// Declared bounds disagree with the text they describe
    #[error("malformed sentence span: start={start}, end={end}, but text has {chars} characters")]
    MalformedSpan {
        start: usize,
        end: usize,
        chars: usize,
    },

    /// History was read before any query was issued
    #[error("no pattern query has been recorded for this sentence")]
    EmptyHistory,
}
