pub mod algo;
pub mod error;
pub mod outcome;
pub mod text;

// Re-export main types for convenient access
pub use algo::{
    CueScope, Finding, Group, Hit, Match, MatchCask, MatchKey, Negation, Pattern, PatternSpec,
};
pub use error::{PatternError, SentenceError};
pub use outcome::{Outcome, RuleOutcome};
pub use text::{Document, Extracted, GetOptions, LineSegmenter, Segmenter, Sentence};
