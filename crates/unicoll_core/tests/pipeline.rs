//! End-to-end pipeline tests: compile small tables and check the ordering,
//! chaining and reproducibility guarantees of the output.

use std::sync::Arc;

use proptest::prelude::*;

use unicoll_core::{
    is_contraction_ref, AbsoluteRule, CollationCompiler, CollationSettings, ContractionPolicy,
    Direction, Ducet, LocaleTailoring, RuleAnchor, RuleLevel, Strength, TailoringRule,
};

const LATIN_SAMPLE: &str = "\
0061 ; [.1C47.0020.0002.0061] # LATIN SMALL LETTER A
0041 ; [.1C47.0020.0008.0041] # LATIN CAPITAL LETTER A
0062 ; [.1C60.0020.0002.0062] # LATIN SMALL LETTER B
0068 ; [.1D18.0020.0002.0068] # LATIN SMALL LETTER H
";

fn compile(tailoring: LocaleTailoring, ducet_text: &str) -> unicoll_core::OptimizedCollation {
    let ducet = Arc::new(Ducet::parse(ducet_text, tailoring.settings.contractions));
    CollationCompiler::new(ducet, tailoring).compile().unwrap()
}

fn after_rule(anchor: &str, reference: &str, target: &str, level: RuleLevel) -> TailoringRule {
    TailoringRule {
        anchor: RuleAnchor::Text(anchor.into()),
        reference: reference.into(),
        target: target.into(),
        direction: Direction::After,
        level,
        expand_multiple: false,
    }
}

#[test]
fn untailored_table_orders_by_implicit_weights() {
    let settings = CollationSettings::new()
        .strength(Strength::Primary)
        .max_codepoint(0x100);
    let output = compile(LocaleTailoring::untailored(settings), "# empty table\n");

    // with no table entries every codepoint carries implicit weights,
    // which order by codepoint value
    assert!(output.weights[0x00] < output.weights[0x41]);
    assert!(output.weights[0x41] < output.weights[0x61]);
    for cp in 0..0xFFusize {
        assert!(output.weights[cp] < output.weights[cp + 1]);
        assert_eq!(output.next[cp], cp as u32 + 1);
    }
    assert_eq!(output.next[0xFF], 0xFF);
}

#[test]
fn absolute_range_gets_consecutive_weights() {
    let settings = CollationSettings::new().max_codepoint(0x100);
    let mut tailoring = LocaleTailoring::untailored(settings);
    tailoring.absolute_rules.push(AbsoluteRule {
        start: 0x41,
        end: 0x5A,
        start_weight: "[1000.0000.0000.0000]".into(),
        step: "[0001.0000.0000.0000]".into(),
    });
    let output = compile(tailoring, LATIN_SAMPLE);

    // 26 distinct consecutive weight values, in codepoint order
    for cp in 0x41..0x5Ausize {
        assert_eq!(output.weights[cp] + 1, output.weights[cp + 1]);
    }
    // the range sorts ahead of the table entries (0x1000 < 0x1C47)
    assert!(output.weights[0x5A] < output.weights[0x61]);
}

#[test]
fn after_rule_inserts_between_reference_and_successor() {
    let settings = CollationSettings::new()
        .strength(Strength::Primary)
        .max_codepoint(0x100);
    let mut tailoring = LocaleTailoring::untailored(settings);
    tailoring
        .rules
        .push(after_rule("a", "a", "\u{e4}", RuleLevel::Primary));
    let output = compile(tailoring, LATIN_SAMPLE);

    // a < ä, and ä still sorts before the key following a originally
    assert!(output.weights[0x61] < output.weights[0xE4]);
    assert!(output.weights[0xE4] < output.weights[0x62]);
    assert_eq!(output.next[0x61], 0xE4);
    assert_eq!(output.next[0x41], 0xE4); // A shares a's primary class
    assert_eq!(output.next[0xE4], 0x62);
}

#[test]
fn identity_rule_equalizes_weights() {
    let settings = CollationSettings::new().max_codepoint(0x100);
    let mut tailoring = LocaleTailoring::untailored(settings);
    tailoring.rules.push(TailoringRule {
        anchor: RuleAnchor::Text("a".into()),
        reference: "a".into(),
        target: "\u{e4}".into(),
        direction: Direction::After,
        level: RuleLevel::Identity,
        expand_multiple: false,
    });
    let output = compile(tailoring, LATIN_SAMPLE);

    assert_eq!(output.weights[0xE4], output.weights[0x61]);
    assert_eq!(output.next[0xE4], output.next[0x61]);
}

#[test]
fn contraction_tailoring_reaches_output_table() {
    let settings = CollationSettings::new()
        .max_codepoint(0x100)
        .contractions(ContractionPolicy::FROM_TAILORING);
    let mut tailoring = LocaleTailoring::untailored(settings);
    tailoring
        .rules
        .push(after_rule("h", "h", "ch", RuleLevel::Primary));
    let output = compile(tailoring, LATIN_SAMPLE);

    assert_eq!(output.contractions.len(), 1);
    assert_eq!(output.contractions[0].text, "ch");
    // the index finds it from its first codepoint
    assert_eq!(output.first_contraction(0x63), Some(0));
    assert_eq!(output.contraction_range(0x63), 0..1);
    // h's class chains to the contraction
    assert!(is_contraction_ref(output.next[0x68]));
}

#[test]
fn contraction_table_is_binary_sorted() {
    let settings = CollationSettings::new()
        .max_codepoint(0x100)
        .contractions(ContractionPolicy::FROM_TAILORING);
    let mut tailoring = LocaleTailoring::untailored(settings);
    tailoring
        .rules
        .push(after_rule("h", "h", "zz", RuleLevel::Primary));
    tailoring
        .rules
        .push(after_rule("h", "zz", "ch", RuleLevel::Primary));
    tailoring
        .rules
        .push(after_rule("h", "ch", "cs", RuleLevel::Primary));
    let output = compile(tailoring, LATIN_SAMPLE);

    let texts: Vec<&str> = output
        .contractions
        .iter()
        .map(|entry| entry.text.as_str())
        .collect();
    assert_eq!(texts, ["ch", "cs", "zz"]);
    assert_eq!(output.contraction_range(0x63), 0..2);
    assert_eq!(output.contraction_range(0x7A), 2..3);
}

#[test]
fn recompilation_reproduces_checksum() {
    let build = || {
        let settings = CollationSettings::new()
            .max_codepoint(0x100)
            .contractions(ContractionPolicy::FROM_TAILORING);
        let mut tailoring = LocaleTailoring::untailored(settings);
        tailoring
            .rules
            .push(after_rule("a", "a", "\u{e4}", RuleLevel::Primary));
        compile(tailoring, LATIN_SAMPLE)
    };

    let first = build();
    let second = build();
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(first.canonical_bytes(), second.canonical_bytes());

    // a different tailoring must produce a different digest
    let settings = CollationSettings::new().max_codepoint(0x100);
    let untailored = compile(LocaleTailoring::untailored(settings), LATIN_SAMPLE);
    assert_ne!(first.checksum, untailored.checksum);
}

#[test]
fn expansion_mode_covers_every_codepoint() {
    let settings = CollationSettings::new()
        .max_codepoint(0x100)
        .expansions(true);
    let output = compile(LocaleTailoring::untailored(settings), LATIN_SAMPLE);

    assert_eq!(output.ce_counts.len(), 0x100);
    assert!(output.ce_counts.iter().all(|&count| count > 0));
    assert_eq!(output.l13_weights.len(), 0x100 * output.ce_depth);
    assert!(output.next.iter().all(|&next| next != u32::MAX));
    // the last key in primary order chains to itself
    assert_eq!(output.next[0xFF], 0xFF);
}

fn table_from_entries(entries: &[(u32, u16)]) -> String {
    let mut text = String::new();
    for (cp, primary) in entries {
        text.push_str(&format!(
            "{cp:04X} ; [.{primary:04X}.0020.0002.0001] # entry\n"
        ));
    }
    text
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Following `next` from the lowest class steps through every weight
    /// class exactly once before reaching the self-chaining sentinel.
    #[test]
    fn next_chain_visits_every_class(
        max_cp in 0x40u32..0x100,
        entries in proptest::collection::btree_map(0u32..0x40, 0x100u16..0x2000, 0..12),
    ) {
        let entries: Vec<(u32, u16)> = entries.into_iter().collect();
        let settings = CollationSettings::new().max_codepoint(max_cp);
        let output = compile(
            LocaleTailoring::untailored(settings),
            &table_from_entries(&entries),
        );

        let weight_of = |cp: u32| output.weights[cp as usize];
        let class_count = output.weights.iter().max().copied().unwrap() + 1;

        // no self-chains below the final class
        for cp in 0..max_cp {
            if output.next[cp as usize] == cp {
                prop_assert_eq!(weight_of(cp), class_count - 1);
            }
        }

        // walk the chain from a weight-zero key
        let mut current = (0..max_cp).find(|&cp| weight_of(cp) == 0).unwrap();
        let mut hops = 0u32;
        while output.next[current as usize] != current {
            let next = output.next[current as usize];
            prop_assert_eq!(weight_of(next), weight_of(current) + 1);
            current = next;
            hops += 1;
            prop_assert!(hops <= class_count);
        }
        prop_assert_eq!(hops, class_count - 1);
    }

    /// Keys with identical collation elements receive identical optimized
    /// weights: weight assignment is a sound quotient of the comparator.
    #[test]
    fn equal_elements_share_weight(
        entries in proptest::collection::btree_map(0u32..0x40, 0x100u16..0x110, 4..16),
    ) {
        let entries: Vec<(u32, u16)> = entries.into_iter().collect();
        let settings = CollationSettings::new().max_codepoint(0x40);
        let output = compile(
            LocaleTailoring::untailored(settings),
            &table_from_entries(&entries),
        );

        for (cp_a, primary_a) in &entries {
            for (cp_b, primary_b) in &entries {
                if primary_a == primary_b {
                    prop_assert_eq!(
                        output.weights[*cp_a as usize],
                        output.weights[*cp_b as usize]
                    );
                } else {
                    prop_assert_ne!(
                        output.weights[*cp_a as usize],
                        output.weights[*cp_b as usize]
                    );
                }
            }
        }
    }
}
