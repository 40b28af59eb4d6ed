//! End-to-end scenarios exercising the full pipeline through the public
//! `compile_jet_rule`/`compile_jet_rule_file` entry points.

use jetrule_compiler::ir::{ElementIr, FilterExprIr, ResourceRow, ReteNodeIr};
use jetrule_compiler::{compile_jet_rule, compile_jet_rule_file, CompilerOptions, MapInputProvider};

fn keyword_key(ctx: &jetrule_compiler::Context, value: &str) -> u64 {
    ctx.resources
        .iter()
        .find_map(|r| match r {
            ResourceRow::Keyword(k) if k.value == value => Some(k.key),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no keyword row for {value}"))
}

/// First `var` row for `id` at `vertex` — a triple slot's own occurrence is
/// always emitted before any filter-leaf occurrence of the same variable at
/// the same vertex, so this matches what the folder's own subject-key
/// lookup resolves to.
fn first_var_key_at_vertex(ctx: &jetrule_compiler::Context, id: &str, vertex: u32) -> u64 {
    ctx.resources
        .iter()
        .find_map(|r| match r {
            ResourceRow::Var(v) if v.id == id && v.vertex == vertex => Some(v.key),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no var row for {id} at vertex {vertex}"))
}

/// Last `var` row for `id` at `vertex` — a filter-leaf occurrence of a
/// variable is always emitted after that antecedent's triple occurrence, so
/// this resolves to the filter's own leaf key rather than the triple's.
fn last_var_key_at_vertex(ctx: &jetrule_compiler::Context, id: &str, vertex: u32) -> u64 {
    ctx.resources
        .iter()
        .rev()
        .find_map(|r| match r {
            ResourceRow::Var(v) if v.id == id && v.vertex == vertex => Some(v.key),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no var row for {id} at vertex {vertex}"))
}

#[test]
fn import_chain_merges_resources_in_traversal_order() {
    let provider = MapInputProvider::new()
        .with_file(
            "import_test1.jr",
            r#"
            int litA = 1;
            int litB = 2;
            import "import_test11.jr";
            "#,
        )
        .with_file(
            "import_test11.jr",
            r#"
            lookup_table lkup1 = {
                table_name="claims",
                key=[claimId],
                columns=[acme:claimId=claim_id]
            };
            "#,
        );

    let ctx = compile_jet_rule_file("import_test1.jr", &provider, &CompilerOptions::default());

    assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);
    assert_eq!(
        ctx.imports.get("import_test1.jr"),
        Some(&vec!["import_test11.jr".to_string()])
    );
    // litA, litB from the main file; lkup1's own row + acme:claimId's row
    // from the imported file.
    assert_eq!(ctx.resources.len(), 4);
    assert_eq!(ctx.lookup_tables.len(), 1);
}

#[test]
fn syntax_errors_in_imported_file_precede_importer_errors() {
    let provider = MapInputProvider::new()
        .with_file(
            "main.jr",
            "import \"child.jr\";\nbad input here",
        )
        .with_file("child.jr", "also bad input");

    let ctx = compile_jet_rule_file("main.jr", &provider, &CompilerOptions::default());

    assert!(ctx.has_error());
    assert!(ctx.errors.len() >= 2);
    assert!(ctx.errors[0].contains("child.jr"));
}

#[test]
fn two_antecedent_filters_fold_into_the_first() {
    let src = r#"
        resource acme:status = "acme:status";
        resource acme:amt = "acme:amt";
        [RuleC4]: (?clm01 acme:status ?clm02).[?clm01] (?clm01 acme:amt ?clm03).[?clm01 or true] -> (?clm01 acme:status ?clm02);
    "#;
    let ctx = compile_jet_rule(src, &CompilerOptions::default());
    assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);
    assert_eq!(ctx.jet_rules.len(), 1);
    let rule = &ctx.jet_rules[0];
    assert!(
        rule.antecedents[1].filter.is_none(),
        "second antecedent's filter should have been folded into the first"
    );

    // The donor's own `?clm01 or true` operands, plus the first antecedent's
    // subject-variable occurrence at vertex 1 (not a freshly minted key).
    let lhs_key = last_var_key_at_vertex(&ctx, "?x1", 2);
    let true_key = keyword_key(&ctx, "true");
    let subject_key = first_var_key_at_vertex(&ctx, "?x1", 1);

    let expected = FilterExprIr::Binary {
        lhs: Box::new(FilterExprIr::Binary {
            lhs: Box::new(FilterExprIr::Leaf { key: lhs_key }),
            op: "or".to_string(),
            rhs: Box::new(FilterExprIr::Leaf { key: true_key }),
        }),
        op: "and".to_string(),
        rhs: Box::new(FilterExprIr::Leaf { key: subject_key }),
    };
    assert_eq!(rule.antecedents[0].filter, Some(expected));

    assert_eq!(
        rule.antecedents[0].normalized_label,
        "(?x1 acme:status ?x2).[(?x1 or true) and ?x1]"
    );
    assert_eq!(rule.antecedents[1].normalized_label, "(?x1 acme:amt ?x3)");
}

#[test]
fn undefined_predicate_reports_exact_message_and_excludes_rule() {
    let src = "[RuleC5]: (?clm01 reverse_of ?clm02) -> (?clm01 reverse_of ?clm02);";
    let ctx = compile_jet_rule(src, &CompilerOptions::default());
    assert!(ctx.has_error());
    assert_eq!(
        ctx.errors[0],
        "Error rule RuleC5: Identifier 'reverse_of' is not defined in this context '(?clm01 reverse_of ?clm02)', it must be defined."
    );
    assert!(ctx.jet_rules.is_empty());
}

#[test]
fn rete_build_shares_prefix_and_prunes_unused_variable() {
    let src = r#"
        resource rdf:type = "rdf:type";
        resource acme:Claim = "acme:Claim";
        resource acme:is_good = "acme:is_good";
        resource acme:related_to = "acme:related_to";
        [RuleSC1]:
            (?clm01 rdf:type acme:Claim)
            (?clm01 acme:is_good ?good).[?good]
            (?clm01 acme:related_to ?clm02)
            -> (?clm01 rdf:type acme:Claim).(?clm02 rdf:type acme:Claim);
    "#;
    let ctx = compile_jet_rule(src, &CompilerOptions::default());
    assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);

    let antecedent_count = ctx
        .rete_nodes
        .iter()
        .filter(|n| matches!(n, ReteNodeIr::Antecedent(_)))
        .count();
    assert_eq!(antecedent_count, 3);

    let terminal = ctx
        .rete_nodes
        .iter()
        .filter_map(|n| match n {
            ReteNodeIr::Antecedent(a) => Some(a),
            _ => None,
        })
        .last()
        .unwrap();
    // ?good (-> ?x2) is bound at vertex 2 by the `is_good` antecedent's own
    // filter and never referenced again; ?clm01/?clm02 (-> ?x1/?x3) both
    // feed the consequents and so stay live through the terminal vertex.
    assert_eq!(terminal.pruned_var, vec!["?x2".to_string()]);
    assert_eq!(
        terminal.beta_relation_vars,
        vec!["?x1".to_string(), "?x3".to_string()]
    );

    let consequents: Vec<_> = ctx
        .rete_nodes
        .iter()
        .filter_map(|n| match n {
            ReteNodeIr::Consequent(c) => Some(c),
            _ => None,
        })
        .collect();
    assert_eq!(consequents.len(), 2);
    assert_eq!(consequents[0].predicate_key, consequents[1].predicate_key);
}

#[test]
fn resource_extraction_directive_strips_prefix_and_declares_volatile_resource() {
    let src = r#"
        @JetCompilerDirective extract_resources_from_rules = "true";
        resource acme:hasGood = "acme:hasGood";
        [RuleSC2]: (?clm01 acme:hasGood _0:good) -> (?clm01 acme:hasGood _0:good);
    "#;
    let ctx = compile_jet_rule(src, &CompilerOptions::default());
    assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);

    let extracted = ctx.resources.iter().find_map(|r| match r {
        jetrule_compiler::ir::ResourceRow::Typed(t) if t.id == "good" => Some(t),
        _ => None,
    });
    let extracted = extracted.expect("good should have been auto-declared as a volatile_resource");
    assert_eq!(extracted.kind, "volatile_resource");
    assert_eq!(extracted.value.as_deref(), Some("_0:good"));

    let rule = &ctx.jet_rules[0];
    match &rule.antecedents[0].triple.object {
        ElementIr::Identifier { value } => assert_eq!(value, "good"),
        other => panic!("expected a bare identifier after extraction, got {other:?}"),
    }
}
