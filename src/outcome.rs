// WHY: rule code turns matches into outcomes and reporting consumes them;
// this module fixes only the contract between the two

use serde::{Deserialize, Serialize};

use crate::algo::{Finding, Hit};

/// What a rule reports for one document.
pub trait Outcome {
    /// Comparable result; reporters keep the maximum per document and rule
    fn result(&self) -> i32;

    fn value(&self) -> Option<&str>;

    /// Source text that produced the result
    fn text(&self) -> Option<&str>;

    fn date(&self) -> Option<&str>;

    fn extras(&self) -> &[String];

    /// The document should be excluded from the run entirely
    fn is_skip(&self) -> bool;

    /// Gold-truth value for validation, when known
    fn expected(&self) -> Option<i32>;
}

/// Plain [`Outcome`] value for rule authors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub result: i32,
    pub value: Option<String>,
    pub text: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub extras: Vec<String>,
    #[serde(default)]
    pub skip: bool,
    pub expected: Option<i32>,
}

impl RuleOutcome {
    pub fn new(result: i32) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }

    /// Outcome asking for the document to be skipped
    pub fn skip() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }

    /// Outcome carrying the matched text of `hit`, and its cue as an extra when negated
    pub fn from_hit(result: i32, hit: &Hit) -> Self {
        let mut outcome = Self::new(result).with_text(hit.group_text(0).unwrap_or_default());
        if let Some(cue) = hit.cue_text() {
            outcome.extras.push(cue.to_string());
        }
        outcome
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extras.push(extra.into());
        self
    }

    pub fn with_expected(mut self, expected: Option<i32>) -> Self {
        self.expected = expected;
        self
    }
}

impl Outcome for RuleOutcome {
    fn result(&self) -> i32 {
        self.result
    }

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    fn extras(&self) -> &[String] {
        &self.extras
    }

    fn is_skip(&self) -> bool {
        self.skip
    }

    fn expected(&self) -> Option<i32> {
        self.expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::{CueScope, Pattern};

    #[test]
    fn test_outcome_from_negated_hit() {
        let pattern = Pattern::builder("pain", "pain")
            .negates(r"\bno\b")
            .scope(CueScope::Before { window: None })
            .build()
            .unwrap();
        let hit = pattern.matches("no pain", 0, false, true).unwrap();

        let outcome = RuleOutcome::from_hit(2, &hit).with_expected(Some(2));
        assert_eq!(outcome.result(), 2);
        assert_eq!(Outcome::text(&outcome), Some("pain"));
        assert_eq!(outcome.extras(), ["no".to_string()]);
        assert_eq!(outcome.expected(), Some(2));
        assert!(!outcome.is_skip());
    }

    #[test]
    fn test_skip_outcome() {
        let outcome = RuleOutcome::skip();
        assert!(outcome.is_skip());
        assert_eq!(outcome.value(), None);
    }

    #[test]
    fn test_outcomes_compare_by_result() {
        let outcomes = [
            RuleOutcome::new(1),
            RuleOutcome::new(3),
            RuleOutcome::new(2).with_value("x"),
        ];
        let max = outcomes.iter().max_by_key(|o| o.result()).unwrap();
        assert_eq!(max.result(), 3);
    }
}
