// WHY: a Pattern is compiled once per rule set and then only read, so every
// query method takes &self and patterns are shared as Arc<Pattern>

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use regex_automata::meta::{CapturesMatches, Regex};
use regex_automata::util::captures::Captures;
use regex_automata::util::syntax;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matching::{Finding, Group, Hit, Match, Negation, PatternId};
use super::offsets::{char_offset, PositionCounter};
use crate::error::PatternError;

static NEXT_PATTERN_ID: AtomicU64 = AtomicU64::new(1);

fn next_pattern_id() -> PatternId {
    PatternId(NEXT_PATTERN_ID.fetch_add(1, Ordering::Relaxed))
}

/// Where a cue must sit relative to the primary match to negate it.
///
/// `window` is the largest allowed gap in characters between the cue and
/// the primary match; `None` means anywhere in the sentence on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CueScope {
    /// Anywhere in the same sentence, overlapping included
    #[default]
    Sentence,
    Before { window: Option<usize> },
    After { window: Option<usize> },
    Either { window: Option<usize> },
}

impl CueScope {
    /// Parse a scope name as used in rule files and on the command line.
    ///
    /// `rule` names the pattern in errors. A window is only meaningful with
    /// a side, so `sentence` plus a window is rejected rather than ignored.
    pub fn parse(rule: &str, scope: &str, window: Option<usize>) -> Result<Self, PatternError> {
        match (scope.to_ascii_lowercase().as_str(), window) {
            ("sentence", None) => Ok(CueScope::Sentence),
            ("sentence", Some(window)) => Err(PatternError::WindowWithoutSide {
                name: rule.to_string(),
                scope: scope.to_string(),
                window,
            }),
            ("before", window) => Ok(CueScope::Before { window }),
            ("after", window) => Ok(CueScope::After { window }),
            ("either", window) => Ok(CueScope::Either { window }),
            _ => Err(PatternError::UnknownScope {
                name: rule.to_string(),
                scope: scope.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CueScope::Sentence => "sentence",
            CueScope::Before { .. } => "before",
            CueScope::After { .. } => "after",
            CueScope::Either { .. } => "either",
        }
    }

    /// Character gap between cue and primary span, or `None` when the cue
    /// does not satisfy this scope.
    fn distance(&self, cue: (usize, usize), primary: (usize, usize)) -> Option<usize> {
        let before = (cue.1 <= primary.0).then(|| primary.0 - cue.1);
        let after = (cue.0 >= primary.1).then(|| cue.0 - primary.1);
        let (gap, window) = match *self {
            CueScope::Sentence => return Some(before.or(after).unwrap_or(0)),
            CueScope::Before { window } => (before?, window),
            CueScope::After { window } => (after?, window),
            CueScope::Either { window } => (before.or(after)?, window),
        };
        match window {
            Some(max) if gap > max => None,
            _ => Some(gap),
        }
    }
}

/// Cue regexes draw ids from the same counter as patterns, so cue keys
/// never collide with primary match keys.
#[derive(Debug)]
struct Cue {
    id: PatternId,
    source: Arc<str>,
    regex: Regex,
}

/// A named matching rule with optional negation cues.
#[derive(Debug)]
pub struct Pattern {
    id: PatternId,
    name: Arc<str>,
    source: String,
    regex: Regex,
    cues: Vec<Cue>,
    scope: CueScope,
}

/// Builder for [`Pattern`]; matching is case-insensitive unless disabled.
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    name: String,
    source: String,
    cues: Vec<String>,
    scope: CueScope,
    case_insensitive: bool,
    replace_whitespace: Option<String>,
}

impl PatternBuilder {
    /// Add a cue pattern; may be called repeatedly
    pub fn negates(mut self, cue: impl Into<String>) -> Self {
        self.cues.push(cue.into());
        self
    }

    pub fn scope(mut self, scope: CueScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Replace each literal space in the primary and cue sources with `fragment`
    pub fn replace_whitespace(mut self, fragment: Option<&str>) -> Self {
        self.replace_whitespace = fragment.map(str::to_string);
        self
    }

    pub fn build(self) -> Result<Pattern, PatternError> {
        let source = self.rewrite(&self.source);
        let regex = self.compile(&source)?;
        let cues = self
            .cues
            .iter()
            .map(|cue| {
                let cue_source = self.rewrite(cue);
                let regex = self.compile(&cue_source)?;
                Ok(Cue {
                    id: next_pattern_id(),
                    source: Arc::from(cue_source),
                    regex,
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        let id = next_pattern_id();
        debug!(
            pattern = %self.name,
            id = id.0,
            cues = cues.len(),
            scope = self.scope.as_str(),
            "Compiled pattern"
        );

        Ok(Pattern {
            id,
            name: Arc::from(self.name),
            source,
            regex,
            cues,
            scope: self.scope,
        })
    }

    fn rewrite(&self, source: &str) -> String {
        match &self.replace_whitespace {
            Some(fragment) => source.replace(' ', fragment),
            None => source.to_string(),
        }
    }

    fn compile(&self, source: &str) -> Result<Regex, PatternError> {
        Regex::builder()
            .syntax(syntax::Config::new().case_insensitive(self.case_insensitive))
            .build(source)
            .map_err(|e| PatternError::InvalidRegex {
                name: self.name.clone(),
                source_text: source.to_string(),
                message: e.to_string(),
            })
    }
}

impl Pattern {
    pub fn builder(name: impl Into<String>, source: impl Into<String>) -> PatternBuilder {
        PatternBuilder {
            name: name.into(),
            source: source.into(),
            cues: Vec::new(),
            scope: CueScope::default(),
            case_insensitive: true,
            replace_whitespace: None,
        }
    }

    /// Compile a pattern with no negation cues
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self, PatternError> {
        Self::builder(name, source).build()
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary regex source after whitespace rewriting
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn scope(&self) -> CueScope {
        self.scope
    }

    pub fn has_cues(&self) -> bool {
        !self.cues.is_empty()
    }

    /// First occurrence in `text`, shifted by `offset` characters.
    ///
    /// A negated occurrence comes back as [`Hit::Negated`] only when
    /// `return_negation` is set and `ignore_negation` is not; otherwise the
    /// primary match is returned as [`Hit::Plain`].
    pub fn matches(
        &self,
        text: &str,
        offset: usize,
        ignore_negation: bool,
        return_negation: bool,
    ) -> Option<Hit> {
        self.resolve(text, offset, ignore_negation || !return_negation)
    }

    /// First occurrence in `text`, always carrying its negation state.
    pub fn resolve(&self, text: &str, offset: usize, ignore_negation: bool) -> Option<Hit> {
        let mut caps = self.regex.create_captures();
        self.regex.captures(text, &mut caps);
        let mut counter = PositionCounter::new();
        let primary = build_match(self.id, &self.name, text, &caps, offset, &mut counter)?;
        if ignore_negation {
            return Some(Hit::Plain(primary));
        }
        Some(self.annotate(text, offset, primary))
    }

    /// Every non-overlapping occurrence in `text`, left to right.
    pub fn finditer<'p, 't>(
        &'p self,
        text: &'t str,
        offset: usize,
        return_negation: bool,
    ) -> FindIter<'p, 't> {
        FindIter {
            pattern: self,
            text,
            offset,
            return_negation,
            inner: self.regex.captures_iter(text),
            counter: PositionCounter::new(),
        }
    }

    fn annotate(&self, text: &str, offset: usize, primary: Match) -> Hit {
        match self.nearest_cue(text, offset, &primary) {
            Some((cue, source)) => Hit::Negated(Negation::new(primary, cue, source)),
            None => Hit::Plain(primary),
        }
    }

    /// Closest qualifying cue; ties go to the earliest cue.
    fn nearest_cue(
        &self,
        text: &str,
        offset: usize,
        primary: &Match,
    ) -> Option<(Match, Arc<str>)> {
        let key = primary.key();
        let span = (key.start, key.end);
        let mut best: Option<(usize, usize, Match, Arc<str>)> = None;

        for cue in &self.cues {
            let mut counter = PositionCounter::new();
            for caps in cue.regex.captures_iter(text) {
                let found = build_match(cue.id, &cue.source, text, &caps, offset, &mut counter);
                let Some(found) = found else {
                    continue;
                };
                let cue_key = found.key();
                let Some(gap) = self.scope.distance((cue_key.start, cue_key.end), span) else {
                    continue;
                };
                let better = match &best {
                    Some((best_gap, best_start, ..)) => {
                        (gap, cue_key.start) < (*best_gap, *best_start)
                    }
                    None => true,
                };
                if better {
                    best = Some((gap, cue_key.start, found, Arc::clone(&cue.source)));
                }
            }
        }

        best.map(|(_, _, found, source)| (found, source))
    }
}

/// Lazy, single-pass sequence of every occurrence of a pattern.
pub struct FindIter<'p, 't> {
    pattern: &'p Pattern,
    text: &'t str,
    offset: usize,
    return_negation: bool,
    inner: CapturesMatches<'p, 't>,
    counter: PositionCounter,
}

impl Iterator for FindIter<'_, '_> {
    type Item = Hit;

    fn next(&mut self) -> Option<Hit> {
        let caps = self.inner.next()?;
        let pattern = self.pattern;
        let primary = build_match(
            pattern.id,
            &pattern.name,
            self.text,
            &caps,
            self.offset,
            &mut self.counter,
        )?;
        if self.return_negation {
            Some(pattern.annotate(self.text, self.offset, primary))
        } else {
            Some(Hit::Plain(primary))
        }
    }
}

/// Convert regex captures into a [`Match`] with document-global character offsets.
///
/// `counter` must only ever be asked for non-decreasing byte positions to
/// stay linear over a scan.
fn build_match(
    id: PatternId,
    name: &Arc<str>,
    text: &str,
    caps: &Captures,
    offset: usize,
    counter: &mut PositionCounter,
) -> Option<Match> {
    let whole = caps.get_group(0)?;
    let base = offset + counter.advance_to_byte(text, whole.start);
    let tail = &text[whole.start..];
    let groups = (0..caps.group_len())
        .map(|index| {
            caps.get_group(index).map(|span| {
                let matched = &text[span.range()];
                let start = base + char_offset(tail, span.start - whole.start);
                Group {
                    text: matched.to_string(),
                    start,
                    end: start + matched.chars().count(),
                }
            })
        })
        .collect();
    Some(Match::new(id, Arc::clone(name), groups))
}

/// Serializable rule definition, compiled with [`PatternSpec::compile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub negates: Vec<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub window: Option<usize>,
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
    #[serde(default)]
    pub replace_whitespace: Option<String>,
}

fn default_case_insensitive() -> bool {
    true
}

impl PatternSpec {
    pub fn compile(&self) -> Result<Pattern, PatternError> {
        let scope = CueScope::parse(
            &self.name,
            self.scope.as_deref().unwrap_or(CueScope::default().as_str()),
            self.window,
        )?;
        self.negates
            .iter()
            .fold(Pattern::builder(&self.name, &self.pattern), |builder, cue| builder.negates(cue))
            .scope(scope)
            .case_insensitive(self.case_insensitive)
            .replace_whitespace(self.replace_whitespace.as_deref())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pain_before_no() -> Pattern {
        Pattern::builder("pain", "pain")
            .negates(r"\bno\b")
            .scope(CueScope::Before { window: None })
            .build()
            .unwrap()
    }

    #[test]
    fn test_matches_applies_offset() {
        let pattern = Pattern::new("pain", "pain").unwrap();
        let hit = pattern.matches("no pain noted", 100, false, false).unwrap();
        assert_eq!(hit.start(0), Some(103));
        assert_eq!(hit.end(0), Some(107));
        assert_eq!(hit.group_text(0), Some("pain"));
    }

    #[test]
    fn test_no_match_is_absent() {
        let pattern = Pattern::new("fever", "fever").unwrap();
        assert!(pattern.matches("no pain noted", 0, false, false).is_none());
        assert_eq!(pattern.finditer("no pain noted", 0, false).count(), 0);
    }

    #[test]
    fn test_negation_returned_only_when_requested() {
        let pattern = pain_before_no();

        let negated = pattern.matches("no pain noted", 0, false, true).unwrap();
        let negation = negated.as_negation().expect("expected negation");
        assert_eq!(negation.cue().start(0), Some(0));
        assert_eq!(negation.start(0), Some(3));
        assert_eq!(negation.term_group(), "no");
        assert_eq!(negation.term(), r"\bno\b");

        let plain = pattern.matches("no pain noted", 0, false, false).unwrap();
        assert!(!plain.is_negated());
        assert_eq!(plain.start(0), Some(3));
    }

    #[test]
    fn test_ignore_negation_skips_cue_search() {
        let pattern = pain_before_no();
        let hit = pattern.resolve("no pain noted", 0, true).unwrap();
        assert!(!hit.is_negated());
    }

    #[test]
    fn test_cue_on_wrong_side_does_not_negate() {
        let pattern = pain_before_no();
        let hit = pattern.resolve("pain? no", 0, false).unwrap();
        assert!(!hit.is_negated());
    }

    #[test]
    fn test_window_limits_cue_distance() {
        let pattern = Pattern::builder("pain", "pain")
            .negates(r"\bno\b")
            .scope(CueScope::Before { window: Some(3) })
            .build()
            .unwrap();
        assert!(pattern.resolve("no pain", 0, false).unwrap().is_negated());
        assert!(!pattern.resolve("no further pain", 0, false).unwrap().is_negated());
    }

    #[test]
    fn test_nearest_cue_wins() {
        let pattern = Pattern::builder("pain", "pain")
            .negates(r"\bno\b")
            .negates(r"\bdenies\b")
            .scope(CueScope::Either { window: None })
            .build()
            .unwrap();
        let hit = pattern.resolve("no fever, denies pain", 0, false).unwrap();
        assert_eq!(hit.cue_text(), Some("denies"));
    }

    #[test]
    fn test_equidistant_cues_prefer_earliest() {
        let pattern = Pattern::builder("pain", "pain")
            .negates(r"\bno\b")
            .scope(CueScope::Either { window: None })
            .build()
            .unwrap();
        let hit = pattern.resolve("no pain no", 0, false).unwrap();
        let negation = hit.as_negation().unwrap();
        assert_eq!(negation.cue().start(0), Some(0));
    }

    #[test]
    fn test_finditer_yields_all_in_order_with_char_offsets() {
        let pattern = Pattern::new("pain", "pain").unwrap();
        let text = "douleur é pain, more pain";
        let starts: Vec<_> = pattern
            .finditer(text, 10, false)
            .map(|hit| hit.start(0).unwrap())
            .collect();
        assert_eq!(starts, vec![20, 31]);
    }

    #[test]
    fn test_finditer_first_agrees_with_matches() {
        let pattern = Pattern::new("num", r"(\d+) mg").unwrap();
        let text = "took 20 mg then 40 mg";
        let first = pattern.finditer(text, 5, false).next().unwrap();
        let single = pattern.matches(text, 5, false, false).unwrap();
        assert_eq!(first, single);
        assert_eq!(first.group_text(1), Some("20"));
        assert_eq!(first.start(1), Some(10));
    }

    #[test]
    fn test_finditer_annotates_negation_when_requested() {
        let pattern = pain_before_no();
        let hits: Vec<_> = pattern.finditer("pain now, no pain", 0, true).collect();
        assert_eq!(hits.len(), 2);
        assert!(!hits[0].is_negated());
        assert!(hits[1].is_negated());

        let plain: Vec<_> = pattern.finditer("pain now, no pain", 0, false).collect();
        assert!(plain.iter().all(|h| !h.is_negated()));
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let pattern = Pattern::new("pain", "pain").unwrap();
        assert!(pattern.matches("PAIN", 0, false, false).is_some());

        let strict = Pattern::builder("pain", "pain").case_insensitive(false).build().unwrap();
        assert!(strict.matches("PAIN", 0, false, false).is_none());
    }

    #[test]
    fn test_replace_whitespace() {
        let pattern = Pattern::builder("cp", "chest pain")
            .replace_whitespace(Some(r"\W*"))
            .build()
            .unwrap();
        assert_eq!(pattern.source(), r"chest\W*pain");
        assert!(pattern.matches("chest--pain", 0, false, false).is_some());
    }

    #[test]
    fn test_invalid_regex_fails_at_compile_time() {
        let err = Pattern::new("bad", "(unclosed").unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex { .. }));

        let err = Pattern::builder("bad-cue", "pain").negates("[").build().unwrap_err();
        assert!(err.to_string().contains("bad-cue"));
    }

    #[test]
    fn test_spec_compiles_scope_and_rejects_unknown() {
        let spec: PatternSpec = serde_json::from_str(
            r#"{"name": "pain", "pattern": "pain", "negates": ["\\bno\\b"], "scope": "before", "window": 5}"#,
        )
        .unwrap();
        let pattern = spec.compile().unwrap();
        assert_eq!(pattern.scope(), CueScope::Before { window: Some(5) });
        assert!(pattern.has_cues());

        let bad = PatternSpec {
            scope: Some("inside".to_string()),
            ..spec
        };
        assert!(matches!(bad.compile(), Err(PatternError::UnknownScope { .. })));
    }

    #[test]
    fn test_window_without_side_rejected() {
        let spec: PatternSpec = serde_json::from_str(
            r#"{"name": "pain", "pattern": "pain", "negates": ["no"], "window": 2}"#,
        )
        .unwrap();
        assert!(matches!(
            spec.compile(),
            Err(PatternError::WindowWithoutSide { window: 2, .. })
        ));

        let explicit = PatternSpec {
            scope: Some("sentence".to_string()),
            ..spec
        };
        let err = explicit.compile().unwrap_err();
        assert!(err.to_string().contains("pain"));

        assert!(CueScope::parse("pain", "Sentence", None).is_ok());
        assert_eq!(
            CueScope::parse("pain", "after", Some(2)).unwrap(),
            CueScope::After { window: Some(2) }
        );
    }

    #[test]
    fn test_after_scope_needs_cue_after_match() {
        let pattern = Pattern::builder("pain", "pain")
            .negates(r"\bresolved\b")
            .scope(CueScope::After { window: None })
            .build()
            .unwrap();

        let hit = pattern.resolve("pain, since resolved", 0, false).unwrap();
        assert_eq!(hit.cue_text(), Some("resolved"));
        assert_eq!(hit.as_negation().unwrap().cue().start(0), Some(12));

        assert!(!pattern.resolve("resolved pain", 0, false).unwrap().is_negated());
    }

    #[test]
    fn test_after_window_limits_cue_distance() {
        let pattern = Pattern::builder("pain", "pain")
            .negates(r"\bno\b")
            .scope(CueScope::After { window: Some(2) })
            .build()
            .unwrap();
        // gap of exactly the window still counts
        assert!(pattern.resolve("pain, no", 0, false).unwrap().is_negated());
        assert!(!pattern.resolve("pain, then no", 0, false).unwrap().is_negated());
    }

    #[test]
    fn test_either_window_limits_both_sides() {
        let pattern = Pattern::builder("pain", "pain")
            .negates(r"\bno\b")
            .scope(CueScope::Either { window: Some(2) })
            .build()
            .unwrap();
        assert!(pattern.resolve("no pain", 0, false).unwrap().is_negated());
        assert!(pattern.resolve("pain; no", 0, false).unwrap().is_negated());
        assert!(!pattern.resolve("no fever or pain", 0, false).unwrap().is_negated());
        assert!(!pattern.resolve("pain, then no", 0, false).unwrap().is_negated());
    }

    #[test]
    fn test_cue_keys_do_not_collide_with_pattern_keys() {
        let pattern = Pattern::builder("pain", "pain")
            .negates("pain")
            .scope(CueScope::Sentence)
            .build()
            .unwrap();
        let hit = pattern.resolve("pain", 0, false).unwrap();
        let negation = hit.as_negation().unwrap();
        // cue and primary cover the same span but carry different ids
        assert_eq!(negation.cue().start(0), negation.start(0));
        assert_ne!(negation.cue().key(), negation.key());
        assert_eq!(negation.key().pattern, pattern.id());
    }

    #[test]
    fn test_pattern_ids_are_unique() {
        let a = Pattern::new("a", "a").unwrap();
        let b = Pattern::new("a", "a").unwrap();
        assert_ne!(a.id(), b.id());
    }
}
