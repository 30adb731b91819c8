use std::borrow::Borrow;

use serde::Serialize;
use tracing::debug;

use super::sentence::Sentence;
use crate::algo::{Hit, Pattern};
use crate::error::SentenceError;

/// Splits document text into raw sentence spans.
///
/// Spans are `(raw_text, start, end)` in character offsets, ascending and
/// non-overlapping; `Document` trusts them without re-checking order.
pub trait Segmenter {
    fn segment<'t>(&self, text: &'t str) -> Vec<(&'t str, usize, usize)>;
}

impl<F> Segmenter for F
where
    F: for<'t> Fn(&'t str) -> Vec<(&'t str, usize, usize)>,
{
    fn segment<'t>(&self, text: &'t str) -> Vec<(&'t str, usize, usize)> {
        self(text)
    }
}

/// Splits after every newline, keeping the newline in the preceding span.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineSegmenter;

impl Segmenter for LineSegmenter {
    fn segment<'t>(&self, text: &'t str) -> Vec<(&'t str, usize, usize)> {
        let mut spans = Vec::new();
        let mut start = 0;
        for line in text.split_inclusive('\n') {
            let end = start + line.chars().count();
            spans.push((line, start, end));
            start = end;
        }
        spans
    }
}

/// A named text split into sentences.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    name: String,
    text: String,
    sentences: Vec<Sentence>,
}

impl Document {
    /// Segment `text` and build its sentences, dropping whitespace-only spans.
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        segmenter: &dyn Segmenter,
    ) -> Result<Self, SentenceError> {
        let name = name.into();
        let text = text.into();
        let sentences = segmenter
            .segment(&text)
            .into_iter()
            .map(|(raw, start, end)| Sentence::new(raw, start, end))
            .filter(|sentence| sentence.as_ref().map_or(true, |s| !s.is_empty()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(document = %name, sentences = sentences.len(), "Segmented document");
        Ok(Self { name, text, sentences })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn sentences_mut(&mut self) -> &mut [Sentence] {
        &mut self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.sentences.iter()
    }

    /// All cask entries, sentence by sentence in document order
    pub fn matches(&self) -> impl Iterator<Item = &Hit> + '_ {
        self.sentences.iter().flat_map(|s| s.matches().iter())
    }

    /// Query every sentence; true if any sentence matched.
    ///
    /// All sentences are queried so each one's history and cask stay in step.
    pub fn has_pattern(&mut self, pattern: &Pattern, ignore_negation: bool) -> bool {
        self.sentences
            .iter_mut()
            .fold(false, |found, s| s.has_pattern(pattern, ignore_negation) || found)
    }

    /// [`Sentence::has_patterns`] over every sentence; true if any sentence satisfied it.
    pub fn has_patterns<P: Borrow<Pattern>>(
        &mut self,
        patterns: &[P],
        has_all: bool,
        ignore_negation: bool,
    ) -> bool {
        self.sentences
            .iter_mut()
            .fold(false, |found, s| s.has_patterns(patterns, has_all, ignore_negation) || found)
    }

    /// Sentences satisfying [`Sentence::has_patterns`], in document order.
    pub fn select_sentences<P: Borrow<Pattern>>(
        &mut self,
        patterns: &[P],
        has_all: bool,
    ) -> Vec<&Sentence> {
        let mut selected = Vec::new();
        for sentence in self.sentences.iter_mut() {
            if sentence.has_patterns(patterns, has_all, false) {
                selected.push(&*sentence);
            }
        }
        selected
    }

    pub fn reset_found_pattern(&mut self) {
        for sentence in &mut self.sentences {
            sentence.reset_found_pattern();
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Sentence;
    type IntoIter = std::slice::Iter<'a, Sentence>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
