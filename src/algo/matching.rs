use std::sync::Arc;

use serde::Serialize;

/// Process-unique identity of a compiled pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PatternId(pub(crate) u64);

/// Deduplication key shared by every kind of match: `(pattern, start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub pattern: PatternId,
    pub start: usize,
    pub end: usize,
}

/// One capture group, anchored to document-global character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Positional accessors shared by plain and negated matches.
///
/// Group 0 is the whole match. Groups that did not participate and indices
/// past the pattern's group count both report `None`.
pub trait Finding {
    fn key(&self) -> MatchKey;

    fn pattern_name(&self) -> &str;

    fn group(&self, index: usize) -> Option<&Group>;

    fn start(&self, index: usize) -> Option<usize> {
        self.group(index).map(|g| g.start)
    }

    fn end(&self, index: usize) -> Option<usize> {
        self.group(index).map(|g| g.end)
    }

    fn group_text(&self, index: usize) -> Option<&str> {
        self.group(index).map(|g| g.text.as_str())
    }
}

/// An occurrence of a pattern in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pattern: PatternId,
    pattern_name: Arc<str>,
    groups: Vec<Option<Group>>,
}

impl Match {
    /// `groups[0]` must be present; it is the full match.
    pub(crate) fn new(
        pattern: PatternId,
        pattern_name: Arc<str>,
        groups: Vec<Option<Group>>,
    ) -> Self {
        debug_assert!(matches!(groups.first(), Some(Some(_))));
        Self {
            pattern,
            pattern_name,
            groups,
        }
    }

    pub fn pattern_id(&self) -> PatternId {
        self.pattern
    }

    /// Full matched text
    pub fn text(&self) -> &str {
        self.group_text(0).unwrap_or_default()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn full(&self) -> (usize, usize) {
        self.groups
            .first()
            .and_then(Option::as_ref)
            .map(|g| (g.start, g.end))
            .unwrap_or_default()
    }
}

impl Finding for Match {
    fn key(&self) -> MatchKey {
        let (start, end) = self.full();
        MatchKey {
            pattern: self.pattern,
            start,
            end,
        }
    }

    fn pattern_name(&self) -> &str {
        &self.pattern_name
    }

    fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index).and_then(Option::as_ref)
    }
}

/// A primary match together with the cue that negates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Negation {
    matched: Match,
    cue: Match,
    cue_source: Arc<str>,
}

impl Negation {
    pub(crate) fn new(matched: Match, cue: Match, cue_source: Arc<str>) -> Self {
        Self {
            matched,
            cue,
            cue_source,
        }
    }

    /// The negated finding
    pub fn matched(&self) -> &Match {
        &self.matched
    }

    /// The cue occurrence
    pub fn cue(&self) -> &Match {
        &self.cue
    }

    /// Source of the cue pattern that fired
    pub fn term(&self) -> &str {
        &self.cue_source
    }

    /// Literal cue text as it appears in the sentence
    pub fn term_group(&self) -> &str {
        self.cue.text()
    }
}

impl Finding for Negation {
    fn key(&self) -> MatchKey {
        self.matched.key()
    }

    fn pattern_name(&self) -> &str {
        self.matched.pattern_name()
    }

    fn group(&self, index: usize) -> Option<&Group> {
        self.matched.group(index)
    }
}

/// Result of a pattern query: either a plain finding or a negated one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Hit {
    Plain(Match),
    Negated(Negation),
}

impl Hit {
    pub fn is_negated(&self) -> bool {
        matches!(self, Hit::Negated(_))
    }

    pub fn as_match(&self) -> &Match {
        match self {
            Hit::Plain(m) => m,
            Hit::Negated(n) => n.matched(),
        }
    }

    pub fn as_negation(&self) -> Option<&Negation> {
        match self {
            Hit::Plain(_) => None,
            Hit::Negated(n) => Some(n),
        }
    }

    /// Literal cue text, if negated
    pub fn cue_text(&self) -> Option<&str> {
        self.as_negation().map(Negation::term_group)
    }

    /// Drop negation annotation, keeping the primary match
    pub fn into_plain(self) -> Hit {
        match self {
            Hit::Negated(n) => Hit::Plain(n.matched),
            plain => plain,
        }
    }
}

impl Finding for Hit {
    fn key(&self) -> MatchKey {
        self.as_match().key()
    }

    fn pattern_name(&self) -> &str {
        self.as_match().pattern_name()
    }

    fn group(&self, index: usize) -> Option<&Group> {
        self.as_match().group(index)
    }
}

impl From<Match> for Hit {
    fn from(m: Match) -> Self {
        Hit::Plain(m)
    }
}

impl From<Negation> for Hit {
    fn from(n: Negation) -> Self {
        Hit::Negated(n)
    }
}
