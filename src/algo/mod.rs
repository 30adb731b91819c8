// WHY: matching primitives shared by sentences and documents; nothing here
// knows about segmentation or history

pub mod cask;
pub mod matching;
pub mod offsets;
pub mod pattern;

pub use cask::MatchCask;
pub use matching::{Finding, Group, Hit, Match, MatchKey, Negation, PatternId};
pub use pattern::{CueScope, FindIter, Pattern, PatternBuilder, PatternSpec};
