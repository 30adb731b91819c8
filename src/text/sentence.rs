// WHY: every query against a sentence leaves a trace in its QueryLog and its
// MatchCask, so all query methods take &mut self

use std::borrow::Borrow;
use std::iter::Peekable;

use serde::Serialize;
use tracing::trace;

use crate::algo::{Finding, FindIter, Group, Hit, MatchCask, Pattern};
use crate::error::SentenceError;

/// Ordered record of query outcomes, one entry per recorded query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryLog {
    entries: Vec<bool>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, found: bool) {
        self.entries.push(found);
    }

    /// Most recent outcome
    pub fn last(&self) -> Result<bool, SentenceError> {
        self.entries.last().copied().ok_or(SentenceError::EmptyHistory)
    }

    /// Whether any recorded query succeeded
    pub fn any(&self) -> Result<bool, SentenceError> {
        if self.entries.is_empty() {
            return Err(SentenceError::EmptyHistory);
        }
        Ok(self.entries.iter().any(|&found| found))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[bool] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flags for [`Sentence::get_pattern`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Capture group to report; 0 is the whole match
    pub index: usize,
    /// Report the group's offsets along with its text
    pub get_indices: bool,
    /// Return negated matches instead of treating them as absent
    pub return_negation: bool,
    /// Report the literal cue text alongside the group
    pub return_negation_keyword: bool,
}

impl GetOptions {
    pub fn group(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_indices(mut self) -> Self {
        self.get_indices = true;
        self
    }

    pub fn with_negation(mut self) -> Self {
        self.return_negation = true;
        self
    }

    pub fn with_negation_keyword(mut self) -> Self {
        self.return_negation_keyword = true;
        self
    }
}

/// Shape of a [`Sentence::get_pattern`] result; one variant per flag combination.
///
/// Group values are `None` when the requested group did not participate in
/// the match; cue values are `None` when the match was not negated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Extracted {
    Text(Option<String>),
    Located(Option<Group>),
    TextWithCue(Option<String>, Option<String>),
    LocatedWithCue(Option<Group>, Option<String>),
}

impl Extracted {
    fn from_hit(hit: &Hit, options: &GetOptions) -> Self {
        let group = hit.group(options.index).cloned();
        let cue = hit.cue_text().map(str::to_string);
        match (options.get_indices, options.return_negation_keyword) {
            (true, true) => Extracted::LocatedWithCue(group, cue),
            (true, false) => Extracted::Located(group),
            (false, true) => Extracted::TextWithCue(group.map(|g| g.text), cue),
            (false, false) => Extracted::Text(group.map(|g| g.text)),
        }
    }

    /// Group text regardless of shape
    pub fn text(&self) -> Option<&str> {
        match self {
            Extracted::Text(text) | Extracted::TextWithCue(text, _) => text.as_deref(),
            Extracted::Located(group) | Extracted::LocatedWithCue(group, _) => {
                group.as_ref().map(|g| g.text.as_str())
            }
        }
    }
}

/// One element yielded by [`Sentence::get_patterns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupHit {
    /// Requested group, with document-global offsets
    pub group: Option<Group>,
    /// Negation state; only reported when negation was requested
    pub negated: Option<bool>,
}

/// A trimmed span of document text, anchored at document-global character offsets.
#[derive(Debug, Clone, Serialize)]
pub struct Sentence {
    text: String,
    start: usize,
    end: usize,
    matches: MatchCask,
    history: QueryLog,
}

impl Sentence {
    /// Build a sentence for `text` occupying `[start, end)` in its document.
    ///
    /// Fails when the span does not describe exactly the characters of `text`.
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Result<Self, SentenceError> {
        let text = text.into();
        let chars = text.chars().count();
        if end < start || end - start != chars {
            return Err(SentenceError::MalformedSpan { start, end, chars });
        }
        let mut sentence = Self {
            text,
            start,
            end,
            matches: MatchCask::new(),
            history: QueryLog::new(),
        };
        sentence.strip();
        Ok(sentence)
    }

    /// Sentence for a whole standalone text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::at_offset(text, 0)
    }

    /// Sentence for `text` beginning at document position `start`
    pub fn at_offset(text: impl Into<String>, start: usize) -> Self {
        let text = text.into();
        let end = start + text.chars().count();
        let mut sentence = Self {
            text,
            start,
            end,
            matches: MatchCask::new(),
            history: QueryLog::new(),
        };
        sentence.strip();
        sentence
    }

    /// Replace the match cask, e.g. to continue one shared across sentences
    pub fn with_matches(mut self, matches: MatchCask) -> Self {
        self.matches = matches;
        self
    }

    /// Trim surrounding whitespace, moving `start` forward and `end` back
    /// by the number of characters removed on each side.
    fn strip(&mut self) {
        let leading_trimmed = self.text.trim_start();
        let lead = self.text.chars().count() - leading_trimmed.chars().count();
        let trimmed = leading_trimmed.trim_end();
        let trail = leading_trimmed.chars().count() - trimmed.chars().count();
        if lead == 0 && trail == 0 {
            return;
        }
        self.start += lead;
        self.end -= trail;
        self.text = trimmed.to_string();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn matches(&self) -> &MatchCask {
        &self.matches
    }

    pub fn into_matches(self) -> MatchCask {
        self.matches
    }

    pub fn history(&self) -> &QueryLog {
        &self.history
    }

    pub fn reset_found_pattern(&mut self) {
        self.history.clear();
    }

    pub fn last_found(&self) -> Result<bool, SentenceError> {
        self.history.last()
    }

    pub fn any_found(&self) -> Result<bool, SentenceError> {
        self.history.any()
    }

    /// Whether `pattern` occurs un-negated in this sentence.
    ///
    /// With `ignore_negation` set, cues are not consulted at all.
    pub fn has_pattern(&mut self, pattern: &Pattern, ignore_negation: bool) -> bool {
        let found = match pattern.resolve(&self.text, self.start, ignore_negation) {
            Some(hit) if !hit.is_negated() => {
                self.matches.add(hit);
                true
            }
            _ => false,
        };
        trace!(pattern = pattern.name(), start = self.start, found, "has_pattern");
        self.history.record(found);
        found
    }

    /// Short-circuit AND (`has_all`) or OR over `patterns`.
    ///
    /// Each evaluated pattern records its own outcome and the combined
    /// result is recorded once more at the end.
    pub fn has_patterns<P: Borrow<Pattern>>(
        &mut self,
        patterns: &[P],
        has_all: bool,
        ignore_negation: bool,
    ) -> bool {
        for pattern in patterns {
            let found = self.has_pattern(pattern.borrow(), ignore_negation);
            if has_all && !found {
                self.history.record(false);
                return false;
            }
            if !has_all && found {
                self.history.record(true);
                return true;
            }
        }
        self.history.record(has_all);
        has_all
    }

    /// First occurrence of `pattern`, shaped according to `options`.
    ///
    /// Negated occurrences count as absent unless `options.return_negation`
    /// is set.
    pub fn get_pattern(&mut self, pattern: &Pattern, options: GetOptions) -> Option<Extracted> {
        let hit = pattern
            .resolve(&self.text, self.start, false)
            .filter(|hit| options.return_negation || !hit.is_negated());
        trace!(pattern = pattern.name(), start = self.start, found = hit.is_some(), "get_pattern");
        self.history.record(hit.is_some());
        let hit = hit?;
        let extracted = Extracted::from_hit(&hit, &options);
        self.matches.add(hit);
        Some(extracted)
    }

    /// Lazily yield every occurrence of every pattern in document order.
    ///
    /// Occurrences at the same start are yielded in pattern order. Each
    /// yielded occurrence is added to the cask as it is produced. The overall
    /// outcome is recorded only once the iterator is exhausted; a consumer
    /// that stops early leaves no history entry.
    pub fn get_patterns<'s, P: Borrow<Pattern>>(
        &'s mut self,
        patterns: &'s [P],
        index: usize,
        return_negation: bool,
    ) -> PatternMatches<'s> {
        let Sentence {
            ref text,
            start,
            ref mut matches,
            ref mut history,
            ..
        } = *self;
        let streams = patterns
            .iter()
            .map(move |pattern| {
                let pattern: &'s Pattern = pattern.borrow();
                pattern.finditer(text, start, return_negation).peekable()
            })
            .collect();
        PatternMatches {
            offset: start,
            streams,
            cask: matches,
            history,
            index,
            return_negation,
            found: false,
            finished: false,
        }
    }
}

/// Iterator returned by [`Sentence::get_patterns`]. Single pass only.
pub struct PatternMatches<'s> {
    offset: usize,
    streams: Vec<Peekable<FindIter<'s, 's>>>,
    cask: &'s mut MatchCask,
    history: &'s mut QueryLog,
    index: usize,
    return_negation: bool,
    found: bool,
    finished: bool,
}

impl PatternMatches<'_> {
    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            trace!(start = self.offset, found = self.found, "get_patterns exhausted");
            self.history.record(self.found);
        }
    }
}

impl Iterator for PatternMatches<'_> {
    type Item = GroupHit;

    fn next(&mut self) -> Option<GroupHit> {
        let earliest = self
            .streams
            .iter_mut()
            .enumerate()
            .filter_map(|(position, stream)| stream.peek().map(|hit| (hit.key().start, position)))
            .min();
        let Some(hit) = earliest.and_then(|(_, position)| self.streams[position].next()) else {
            self.finish();
            return None;
        };

        self.found = true;
        let item = GroupHit {
            group: hit.group(self.index).cloned(),
            negated: self.return_negation.then(|| hit.is_negated()),
        };
        self.cask.add(hit);
        Some(item)
    }
}
