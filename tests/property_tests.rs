//! Property tests for the invariants a compiled `Context` must satisfy,
//! regardless of which rules produced it.

use std::collections::HashSet;

use jetrule_compiler::ir::{ElementIr, ReteNodeIr};
use jetrule_compiler::{compile_jet_rule, CompilerOptions};
use proptest::prelude::*;

const FIXTURE: &str = r#"
    resource acme:hasGood = "acme:hasGood";
    resource acme:hasBad = "acme:hasBad";
    resource acme:hasUgly = "acme:hasUgly";
    resource acme:status = "acme:status";
    resource acme:amt = "acme:amt";
    [RuleSC1]:
        (?clm01 acme:hasGood ?good)
        (?clm01 acme:hasBad ?bad)
        (?clm01 acme:hasUgly ?ugly)
        -> (?clm01 acme:hasGood ?clm01).(?clm01 acme:hasBad ?bad);
    [RuleSC2]:
        (?clm01 acme:hasGood ?good)
        (?clm01 acme:status ?st)
        -> (?clm01 acme:status ?st);
    [RuleSC3]:
        (?clm01 acme:status ?clm02).[?clm01]
        (?clm01 acme:amt ?clm03).[?clm01 or true]
        -> (?clm01 acme:status ?clm02);
"#;

/// Property 1: resource keys are distinct and form the dense range [0, N).
#[test]
fn resource_keys_are_unique_and_dense() {
    let ctx = compile_jet_rule(FIXTURE, &CompilerOptions::default());
    assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);
    let mut keys: Vec<u64> = ctx.resources.iter().map(|r| r.key()).collect();
    keys.sort_unstable();
    let expected: Vec<u64> = (0..ctx.resources.len() as u64).collect();
    assert_eq!(keys, expected);
}

/// Property 2: every `*_key` in a Rete node indexes a real resources entry.
#[test]
fn rete_node_keys_reference_valid_resources() {
    let ctx = compile_jet_rule(FIXTURE, &CompilerOptions::default());
    assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);
    let valid: HashSet<u64> = ctx.resources.iter().map(|r| r.key()).collect();
    for node in &ctx.rete_nodes {
        match node {
            ReteNodeIr::Antecedent(a) => {
                assert!(valid.contains(&a.subject_key));
                assert!(valid.contains(&a.predicate_key));
                assert!(valid.contains(&a.object_key));
            }
            ReteNodeIr::Consequent(c) => {
                assert!(valid.contains(&c.subject_key));
                assert!(valid.contains(&c.predicate_key));
                assert!(valid.contains(&c.object_key));
            }
            ReteNodeIr::Head(_) => {}
        }
    }
}

/// Property 4: no two siblings under the same parent share
/// `(normalizedLabel, isNot)` unless they are in fact the same vertex.
#[test]
fn sibling_antecedents_never_duplicate_a_structural_key() {
    let ctx = compile_jet_rule(FIXTURE, &CompilerOptions::default());
    assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);
    let mut seen: std::collections::HashMap<(u32, String, bool), u32> = std::collections::HashMap::new();
    for node in &ctx.rete_nodes {
        if let ReteNodeIr::Antecedent(a) = node {
            let key = (a.parent_vertex, a.normalized_label.clone(), a.is_not);
            if let Some(&existing) = seen.get(&key) {
                assert_eq!(existing, a.vertex, "duplicate structural key at different vertices");
            } else {
                seen.insert(key, a.vertex);
            }
        }
    }
}

/// Property 5: every variable used in a consequent appears in the
/// `beta_relation_vars` of that rule's terminal antecedent vertex.
#[test]
fn consequent_variables_are_present_in_terminal_beta_relation() {
    let ctx = compile_jet_rule(FIXTURE, &CompilerOptions::default());
    assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);

    for rule in &ctx.jet_rules {
        // `RuleIr.antecedents[i].vertex` is a per-rule local ordinal; the
        // terminal Rete vertex for this rule is whichever antecedent node
        // lists the rule's name in its `rules` attachment.
        let terminal = ctx
            .rete_nodes
            .iter()
            .find_map(|n| match n {
                ReteNodeIr::Antecedent(a)
                    if a.rules.as_ref().is_some_and(|rs| rs.contains(&rule.name)) =>
                {
                    Some(a)
                }
                _ => None,
            })
            .expect("terminal antecedent vertex must exist in the rete IR");

        let beta: HashSet<&str> = terminal.beta_relation_vars.iter().map(String::as_str).collect();
        for con in &rule.consequents {
            for elem in [&con.triple.subject, &con.triple.predicate, &con.triple.object] {
                if let ElementIr::Var { id } = elem {
                    assert!(
                        beta.contains(id.as_str()),
                        "consequent variable {id} missing from terminal beta_relation_vars {beta:?}"
                    );
                }
            }
        }
    }
}

/// Property 6: compiling the same source twice yields byte-identical JSON.
#[test]
fn compilation_is_deterministic() {
    let a = compile_jet_rule(FIXTURE, &CompilerOptions::default());
    let b = compile_jet_rule(FIXTURE, &CompilerOptions::default());
    assert_eq!(a.jet_rules_json().unwrap(), b.jet_rules_json().unwrap());
    assert_eq!(a.jet_rete_nodes_json().unwrap(), b.jet_rete_nodes_json().unwrap());
}

/// Property 7: N seeded syntax errors across M files yields exactly N
/// reported errors — here varied across a small range via proptest.
proptest! {
    #[test]
    fn error_count_matches_seeded_syntax_errors(n in 1usize..6) {
        // Each `badN` fragment is a stray top-level identifier (one
        // diagnostic); the `int sepN = 1;` that follows is a valid
        // declaration-start token, so panic-mode recovery halts there
        // instead of swallowing the next seeded error.
        let mut src = String::new();
        for i in 0..n {
            src.push_str(&format!("bad{i}\nint sep{i} = 1;\n"));
        }
        let ctx = compile_jet_rule(&src, &CompilerOptions::default());
        prop_assert!(ctx.has_error());
        prop_assert_eq!(ctx.errors.len(), n);
    }
}
