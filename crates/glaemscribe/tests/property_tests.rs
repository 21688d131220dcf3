//! Randomized property tests (SPEC_FULL.md §8) over small synthetic modes:
//! every sub-rule's source is non-empty, transcription is a pure function
//! of its inputs, longest match wins over a shorter prefix, and cyclic
//! variable expansion is always bounded rather than looping forever.

use glaemscribe::glaem;
use glaemscribe::mode::{CharsetSources, Mode};
use proptest::prelude::*;
use std::collections::HashMap;

const SRC_ALPHABET: &[char] = &['a', 'b', 'c', 'd'];
const DST_ALPHABET: &[char] = &['A', 'B', 'C', 'D'];

fn cst_source() -> String {
    DST_ALPHABET.iter().map(|c| format!("\\char 0x{:x} {c}\n", *c as u32)).collect()
}

/// A small rule set: distinct 1-2 character lowercase sources, each mapped
/// to one uppercase destination letter. Distinctness keeps every generated
/// mode duplicate-free so `Mode::finalize` always succeeds.
fn rule_set_strategy() -> impl Strategy<Value = Vec<(String, char)>> {
    let one_char = SRC_ALPHABET.iter().map(|c| c.to_string());
    let two_char =
        SRC_ALPHABET.iter().flat_map(|a| SRC_ALPHABET.iter().map(move |b| format!("{a}{b}")));
    let all_sources: Vec<String> = one_char.chain(two_char).collect();

    prop::collection::vec(
        (prop::sample::select(all_sources), prop::sample::select(DST_ALPHABET.to_vec())),
        1..12,
    )
    .prop_map(|pairs| {
        let mut seen = std::collections::HashSet::new();
        pairs.into_iter().filter(|(src, _)| seen.insert(src.clone())).collect()
    })
}

fn input_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(SRC_ALPHABET.to_vec()), 0..20)
        .prop_map(|chars| chars.into_iter().collect())
}

fn build_mode(rules: &[(String, char)]) -> Mode {
    let mut mode_src = String::from("\\version 1.0\n\\charset teng cst1\n\\rules main\n");
    for (src, dst) in rules {
        mode_src.push_str(&format!("  {src} --> {dst}\n"));
    }
    let cst_doc = glaem::parse(&cst_source()).unwrap();
    let mut sources: CharsetSources = HashMap::new();
    sources.insert("cst1", &cst_doc);
    Mode::finalize(&mode_src, &sources).expect("distinct sources should always compile")
}

proptest! {
    #[test]
    fn every_sub_rule_source_is_non_empty(rules in rule_set_strategy()) {
        prop_assume!(!rules.is_empty());
        let mode = build_mode(&rules);
        for group in &mode.rule_groups {
            for sub_rule in group.sub_rules() {
                prop_assert!(!sub_rule.src.is_empty());
            }
        }
    }

    #[test]
    fn transcription_is_a_pure_function_of_its_inputs(
        rules in rule_set_strategy(),
        input in input_strategy(),
    ) {
        prop_assume!(!rules.is_empty());
        let mode = build_mode(&rules);
        let first = mode.transcribe(&input, None).unwrap();
        let second = mode.transcribe(&input, None).unwrap();
        prop_assert_eq!(first.text, second.text);
        prop_assert_eq!(first.warnings.len(), second.warnings.len());
    }

    #[test]
    fn longest_match_wins_over_a_shorter_prefix(
        a in prop::sample::select(SRC_ALPHABET.to_vec()),
        b in prop::sample::select(SRC_ALPHABET.to_vec()),
    ) {
        prop_assume!(a != b);
        let mut mode_src = String::from("\\version 1.0\n\\charset teng cst1\n\\rules main\n");
        mode_src.push_str(&format!("  {a} --> X\n"));
        mode_src.push_str(&format!("  {a}{b} --> Y\n"));
        let mut cst = cst_source();
        cst.push_str("\\char 0x58 X\n\\char 0x59 Y\n");
        let cst_doc = glaem::parse(&cst).unwrap();
        let mut sources: CharsetSources = HashMap::new();
        sources.insert("cst1", &cst_doc);
        let mode = Mode::finalize(&mode_src, &sources).unwrap();

        let input: String = [a, b].iter().collect();
        let out = mode.transcribe(&input, None).unwrap();
        prop_assert_eq!(out.text, "Y");
    }
}

#[test]
fn cyclic_variable_expansion_never_hangs_finalization() {
    let mode_src =
        "\\version 1.0\n\\charset teng cst1\n\\rules main\n  {A} === {B}\n  {B} === {A}\n  {A} --> X\n";
    let mut cst = cst_source();
    cst.push_str("\\char 0x58 X\n");
    let cst_doc = glaem::parse(&cst).unwrap();
    let mut sources: CharsetSources = HashMap::new();
    sources.insert("cst1", &cst_doc);
    assert!(Mode::finalize(mode_src, &sources).is_err());
}
