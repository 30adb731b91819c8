// WHY: sentence-level query surface; segmentation itself is supplied by the
// caller through the Segmenter trait

pub mod document;
pub mod sentence;

pub use document::{Document, LineSegmenter, Segmenter};
pub use sentence::{Extracted, GetOptions, GroupHit, PatternMatches, QueryLog, Sentence};
