// Negation resolution and query history through the public API

use std::sync::Arc;

use negex::{
    CueScope, Extracted, Finding, GetOptions, Hit, MatchCask, Pattern, PatternSpec, Sentence,
};

fn pain_with_preceding_no() -> Pattern {
    Pattern::builder("pain", "pain")
        .negates("no")
        .scope(CueScope::Before { window: None })
        .build()
        .expect("pattern should compile")
}

#[test]
fn test_no_pain_noted_scenario() {
    let pattern = pain_with_preceding_no();

    let negated = pattern.matches("no pain noted", 0, false, true).expect("pain should match");
    let Hit::Negated(negation) = &negated else {
        panic!("expected a negation, got {negated:?}");
    };
    assert_eq!(negation.cue().start(0), Some(0));
    assert_eq!(negation.term_group(), "no");
    assert_eq!(negation.start(0), Some(3));

    let plain = pattern.matches("no pain noted", 0, false, false).expect("pain should match");
    assert!(matches!(plain, Hit::Plain(_)));
    assert_eq!(plain.start(0), Some(3));
}

#[test]
fn test_matches_and_finditer_agree_without_cues() {
    let pattern = Pattern::new("dose", r"(\d+)\s*(mg|ml)").unwrap();
    for text in ["10 mg", "take 5ml then 10 mg", "none here", "ÄÖ 7 mg"] {
        let single = pattern.matches(text, 3, false, false);
        let first = pattern.finditer(text, 3, false).next();
        assert_eq!(single, first, "disagreement on {text:?}");
    }
}

#[test]
fn test_get_patterns_yields_document_order_and_single_record() {
    let pain = Arc::new(Pattern::new("pain", "pain").unwrap());
    let fever = Arc::new(Pattern::new("fever", "fever").unwrap());
    let patterns = vec![Arc::clone(&pain), Arc::clone(&fever)];
    let mut sentence = Sentence::at_offset("fever with pain and more fever", 50);

    let hits: Vec<_> = sentence.get_patterns(&patterns, 0, false).collect();
    let spans: Vec<_> = hits
        .iter()
        .map(|h| {
            let group = h.group.as_ref().unwrap();
            (group.text.as_str(), group.start)
        })
        .collect();
    assert_eq!(spans, vec![("fever", 50), ("pain", 61), ("fever", 75)]);
    assert_eq!(sentence.history().entries(), &[true]);
    assert_eq!(sentence.matches().len(), 3);
}

#[test]
fn test_requery_is_idempotent() {
    let pattern = pain_with_preceding_no();
    let mut sentence = Sentence::from_text("no pain noted");
    let options = GetOptions::default().with_negation().with_indices();

    let first = sentence.get_pattern(&pattern, options);
    let second = sentence.get_pattern(&pattern, options);
    assert_eq!(first, second);
    assert_eq!(sentence.matches().len(), 1);

    let hit = pattern.matches(sentence.text(), sentence.start(), false, true).unwrap();
    let mut cask = MatchCask::new();
    assert!(cask.add(hit.clone()));
    assert!(!cask.add(hit));
}

#[test]
fn test_and_or_combinators_record_extra_entry() {
    let pain = Pattern::new("pain", "pain").unwrap();
    let chest = Pattern::new("chest", "chest").unwrap();
    let fever = Pattern::new("fever", "fever").unwrap();
    let mut sentence = Sentence::from_text("chest pain");

    assert!(sentence.has_patterns(&[&chest, &pain], true, false));
    assert_eq!(sentence.history().entries(), &[true, true, true]);

    sentence.reset_found_pattern();
    assert!(sentence.has_patterns(&[&fever, &pain, &chest], false, false));
    assert_eq!(sentence.history().entries(), &[false, true, true]);
    assert_eq!(sentence.last_found(), Ok(true));
    assert_eq!(sentence.any_found(), Ok(true));
}

#[test]
fn test_rule_definitions_drive_extraction() {
    let specs: Vec<PatternSpec> = serde_json::from_str(
        r#"[
            {"name": "smoker", "pattern": "smok(er|es|ing)", "negates": ["never", "denies"], "scope": "before", "window": 20},
            {"name": "pack years", "pattern": "(\\d+) pack years", "case_insensitive": false}
        ]"#,
    )
    .unwrap();
    let patterns: Vec<_> = specs.iter().map(|s| s.compile().unwrap()).collect();

    let mut sentence = Sentence::from_text("Patient denies smoking, 0 pack years.");
    assert!(!sentence.has_pattern(&patterns[0], false));
    assert_eq!(
        sentence.get_pattern(
            &patterns[0],
            GetOptions::default().with_negation().with_negation_keyword()
        ),
        Some(Extracted::TextWithCue(
            Some("smoking".to_string()),
            Some("denies".to_string())
        ))
    );
    assert_eq!(
        sentence.get_pattern(&patterns[1], GetOptions::group(1)),
        Some(Extracted::Text(Some("0".to_string())))
    );
}
