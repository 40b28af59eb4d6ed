//! # Normalizer / Optimizer
//!
//! Takes the raw, per-file merged AST and the symbol table the import
//! driver built, and produces a normalized [`crate::ir::RuleIr`] per rule
//! plus the `var`/`keyword` resource rows its variable and literal
//! occurrences require. Three behaviors live here: canonical variable
//! renaming, a narrow filter-folding pass matching the documented
//! two-antecedent shape, and resource extraction from `_<n>:name`
//! identifiers when the corresponding directive is in scope.

use std::collections::HashMap;

use crate::ast::{RawAntecedent, RawConsequent, RawElement, RawFilterExpr, RawRule, RawTriple};
use crate::ir::{
    AntecedentIr, ConsequentIr, ElementIr, FilterExprIr, KeywordRow, ResourceRow, RuleIr, TripleIr,
    TypedResourceRow, VarRow,
};
use crate::symbol_table::SymbolTable;

/// Normalizes every rule declaration found across the merged AST, in
/// source order. `extract_resources_from_rules` reflects the compiler's
/// default as possibly overridden by an in-scope `@JetCompilerDirective`.
pub fn normalize_rules(
    raw_rules: &[RawRule],
    symbols: &mut SymbolTable,
    resource_rows: &mut Vec<ResourceRow>,
    extract_resources_from_rules: bool,
) -> Vec<RuleIr> {
    raw_rules
        .iter()
        .map(|raw| normalize_rule(raw, symbols, resource_rows, extract_resources_from_rules))
        .collect()
}

fn normalize_rule(
    raw: &RawRule,
    symbols: &mut SymbolTable,
    resource_rows: &mut Vec<ResourceRow>,
    extract_resources_from_rules: bool,
) -> RuleIr {
    let mut renamer = VarRenamer::new();

    let mut antecedents = Vec::new();
    for (idx, ant) in raw.antecedents.iter().enumerate() {
        let vertex = (idx + 1) as u32;
        antecedents.push(normalize_antecedent(
            ant,
            vertex,
            &mut renamer,
            symbols,
            resource_rows,
            extract_resources_from_rules,
        ));
    }

    let terminal_vertex = antecedents.last().map(|a| a.vertex).unwrap_or(0);
    let mut consequents = Vec::new();
    for (seq, con) in raw.consequents.iter().enumerate() {
        consequents.push(normalize_consequent(
            con,
            terminal_vertex,
            seq,
            &mut renamer,
            symbols,
            resource_rows,
            extract_resources_from_rules,
        ));
    }

    fold_filters_two_antecedent_shape(&mut antecedents, resource_rows.as_slice());

    let (salience, optimization, properties) = interpret_properties(&raw.properties);

    let authored_label = render_rule_label(raw, |e| render_raw_element_authored(e));
    let normalized_label = build_normalized_label(&raw.name, &antecedents, &consequents);

    RuleIr {
        name: raw.name.clone(),
        properties,
        optimization,
        salience,
        antecedents,
        consequents,
        authored_label: authored_label.clone(),
        normalized_label: normalized_label.clone(),
        label: authored_label,
        source_file_name: raw.source_file_name.clone(),
    }
}

/// Tracks first-occurrence renaming of a rule's variables to `?x1, ?x2, …`,
/// plus the metadata needed to emit `var` resource rows for every
/// occurrence.
struct VarRenamer {
    canonical: HashMap<String, String>,
    first_seen: HashMap<String, (u8, u32)>,
    next_index: u32,
}

impl VarRenamer {
    fn new() -> Self {
        VarRenamer {
            canonical: HashMap::new(),
            first_seen: HashMap::new(),
            next_index: 1,
        }
    }

    fn canonical_name(&mut self, raw_name: &str) -> String {
        if let Some(existing) = self.canonical.get(raw_name) {
            return existing.clone();
        }
        let name = format!("?x{}", self.next_index);
        self.next_index += 1;
        self.canonical.insert(raw_name.to_string(), name.clone());
        name
    }

    /// Records this occurrence and returns `(canonical name, is_binded,
    /// var_pos, is_antecedent-relevant first-binding var_pos)`.
    fn observe(
        &mut self,
        raw_name: &str,
        slot: u8,
        vertex: u32,
        in_antecedent: bool,
    ) -> (String, bool, u8) {
        let canonical = self.canonical_name(raw_name);
        if let Some((first_pos, _first_vertex)) = self.first_seen.get(raw_name) {
            (canonical, true, *first_pos)
        } else {
            self.first_seen.insert(raw_name.to_string(), (slot, vertex));
            let _ = in_antecedent;
            (canonical, false, slot)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn normalize_antecedent(
    raw: &RawAntecedent,
    vertex: u32,
    renamer: &mut VarRenamer,
    symbols: &mut SymbolTable,
    resource_rows: &mut Vec<ResourceRow>,
    extract_resources_from_rules: bool,
) -> AntecedentIr {
    let triple = normalize_triple(
        &raw.triple,
        vertex,
        true,
        renamer,
        symbols,
        resource_rows,
        extract_resources_from_rules,
    );
    let filter = raw.filter.as_ref().map(|f| {
        normalize_filter_expr(
            f,
            vertex,
            renamer,
            symbols,
            resource_rows,
            extract_resources_from_rules,
        )
    });

    let label = render_antecedent_label(raw, render_raw_element_authored);
    let normalized_label = render_antecedent_normalized_label(raw, renamer);

    AntecedentIr {
        is_not: raw.is_not,
        triple,
        filter,
        label,
        normalized_label,
        vertex,
        parent_vertex: vertex - 1,
    }
}

#[allow(clippy::too_many_arguments)]
fn normalize_consequent(
    raw: &RawConsequent,
    vertex: u32,
    _seq: usize,
    renamer: &mut VarRenamer,
    symbols: &mut SymbolTable,
    resource_rows: &mut Vec<ResourceRow>,
    extract_resources_from_rules: bool,
) -> ConsequentIr {
    let triple = normalize_triple(
        &raw.triple,
        vertex,
        false,
        renamer,
        symbols,
        resource_rows,
        extract_resources_from_rules,
    );
    let label = render_raw_triple_authored(&raw.triple);
    let normalized_label = render_triple_with_renamer(&raw.triple, renamer);

    ConsequentIr {
        triple,
        label,
        normalized_label,
        vertex,
    }
}

#[allow(clippy::too_many_arguments)]
fn normalize_triple(
    triple: &RawTriple,
    vertex: u32,
    in_antecedent: bool,
    renamer: &mut VarRenamer,
    symbols: &mut SymbolTable,
    resource_rows: &mut Vec<ResourceRow>,
    extract_resources_from_rules: bool,
) -> TripleIr {
    TripleIr {
        subject: normalize_element(
            &triple.subject,
            0,
            vertex,
            in_antecedent,
            renamer,
            symbols,
            resource_rows,
            extract_resources_from_rules,
        )
        .0,
        predicate: normalize_element(
            &triple.predicate,
            1,
            vertex,
            in_antecedent,
            renamer,
            symbols,
            resource_rows,
            extract_resources_from_rules,
        )
        .0,
        object: normalize_element(
            &triple.object,
            2,
            vertex,
            in_antecedent,
            renamer,
            symbols,
            resource_rows,
            extract_resources_from_rules,
        )
        .0,
    }
}

/// Normalizes a single triple-slot element, returning both its IR form and
/// the resources-array key it resolves to (0 if none applies), so callers
/// building filter-leaf keys never need to re-search the resources list.
#[allow(clippy::too_many_arguments)]
fn normalize_element(
    elem: &RawElement,
    slot: u8,
    vertex: u32,
    in_antecedent: bool,
    renamer: &mut VarRenamer,
    symbols: &mut SymbolTable,
    resource_rows: &mut Vec<ResourceRow>,
    extract_resources_from_rules: bool,
) -> (ElementIr, u64) {
    match elem {
        RawElement::Var(name) => {
            let (canonical, is_binded, var_pos) = renamer.observe(name, slot, vertex, in_antecedent);
            let key = symbols.alloc_key();
            resource_rows.push(ResourceRow::Var(VarRow {
                kind: "var",
                id: canonical.clone(),
                is_binded,
                var_pos,
                vertex,
                is_antecedent: if is_binded { Some(in_antecedent) } else { None },
                key,
            }));
            (ElementIr::Var { id: canonical }, key)
        }
        RawElement::Identifier(text) => {
            let (resolved, key) =
                maybe_extract_resource(text, symbols, resource_rows, extract_resources_from_rules);
            (ElementIr::Identifier { value: resolved }, key)
        }
        RawElement::Keyword(text) => {
            let key = symbols.alloc_key();
            resource_rows.push(ResourceRow::Keyword(KeywordRow {
                kind: "keyword",
                value: text.clone(),
                inline: true,
                key,
            }));
            (ElementIr::Keyword { value: text.clone() }, key)
        }
        RawElement::IntLiteral(text) | RawElement::FloatLiteral(text) | RawElement::StringLiteral(text) => {
            let key = symbols.resource_or_implicit(text);
            (ElementIr::Identifier { value: text.clone() }, key)
        }
    }
}

/// Handles `_<n>:<name>` identifiers: strips the prefix and, when
/// extraction is enabled, auto-declares `<name>` as a `volatile_resource`
/// the first time it's seen. Returns the bare (or unchanged) name plus the
/// resources-array key it resolves to.
fn maybe_extract_resource(
    text: &str,
    symbols: &mut SymbolTable,
    resource_rows: &mut Vec<ResourceRow>,
    extract_resources_from_rules: bool,
) -> (String, u64) {
    if !extract_resources_from_rules {
        let key = symbols.resource_or_implicit(text);
        return (text.to_string(), key);
    }
    let Some(bare) = strip_underscore_prefix(text) else {
        let key = symbols.resource_or_implicit(text);
        return (text.to_string(), key);
    };
    if symbols.is_declared(bare) {
        let key = symbols.get_resource(bare).expect("just checked").key;
        return (bare.to_string(), key);
    }
    let key = symbols
        .declare_resource(
            bare,
            crate::ast::ResourceType::VolatileResource,
            Some(text.to_string()),
            None,
        )
        .expect("just checked absence");
    resource_rows.push(ResourceRow::Typed(TypedResourceRow {
        kind: "volatile_resource".to_string(),
        id: bare.to_string(),
        value: Some(text.to_string()),
        source_file_name: None,
        key,
    }));
    (bare.to_string(), key)
}

/// `_0:name` -> `Some("name")`; anything else -> `None`.
fn strip_underscore_prefix(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('_')?;
    let colon = rest.find(':')?;
    let (digits, tail) = rest.split_at(colon);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(&tail[1..])
}

fn normalize_filter_expr(
    expr: &RawFilterExpr,
    vertex: u32,
    renamer: &mut VarRenamer,
    symbols: &mut SymbolTable,
    resource_rows: &mut Vec<ResourceRow>,
    extract_resources_from_rules: bool,
) -> FilterExprIr {
    match expr {
        RawFilterExpr::Leaf(elem) => {
            let (_, key) = normalize_element(
                elem,
                0,
                vertex,
                true,
                renamer,
                symbols,
                resource_rows,
                extract_resources_from_rules,
            );
            FilterExprIr::Leaf { key }
        }
        RawFilterExpr::Binary { lhs, op, rhs } => FilterExprIr::Binary {
            lhs: Box::new(normalize_filter_expr(
                lhs,
                vertex,
                renamer,
                symbols,
                resource_rows,
                extract_resources_from_rules,
            )),
            op: op.clone(),
            rhs: Box::new(normalize_filter_expr(
                rhs,
                vertex,
                renamer,
                symbols,
                resource_rows,
                extract_resources_from_rules,
            )),
        },
    }
}

/// Narrow implementation of the documented two-antecedent filter-folding
/// shape: when the rule's first antecedent and a later antecedent both
/// carry filters, fold the later filter into the first as `F2 and <subject
/// var of vertex 1>`, discarding antecedent 0's own (now redundant) filter,
/// and drop the later antecedent's own filter. General N-antecedent
/// folding is not attempted.
fn fold_filters_two_antecedent_shape(antecedents: &mut [AntecedentIr], resource_rows: &[ResourceRow]) {
    if antecedents.len() < 2 {
        return;
    }
    let Some(donor_idx) = antecedents
        .iter()
        .skip(1)
        .position(|a| a.filter.is_some())
        .map(|i| i + 1)
    else {
        return;
    };
    if antecedents[0].filter.is_none() {
        return;
    }
    let f2 = antecedents[donor_idx].filter.take().unwrap();
    antecedents[0].filter.take();
    let subject_key = match &antecedents[0].triple.subject {
        ElementIr::Var { id } => find_var_row_key(resource_rows, id, antecedents[0].vertex).unwrap_or(0),
        _ => 0,
    };
    antecedents[0].filter = Some(FilterExprIr::Binary {
        lhs: Box::new(f2),
        op: "and".to_string(),
        rhs: Box::new(FilterExprIr::Leaf { key: subject_key }),
    });

    let label0 = rebuild_antecedent_normalized_label(&antecedents[0], resource_rows);
    antecedents[0].normalized_label = label0;
    let label_donor = rebuild_antecedent_normalized_label(&antecedents[donor_idx], resource_rows);
    antecedents[donor_idx].normalized_label = label_donor;
}

/// Finds the resources-array key of the `var` row emitted for `id`'s
/// occurrence at `vertex` (there is exactly one per occurrence).
fn find_var_row_key(resource_rows: &[ResourceRow], id: &str, vertex: u32) -> Option<u64> {
    resource_rows.iter().find_map(|row| match row {
        ResourceRow::Var(v) if v.id == id && v.vertex == vertex => Some(v.key),
        _ => None,
    })
}

/// Re-renders an antecedent's `normalizedLabel` from its (possibly
/// post-fold) IR triple/filter, so folding stays consistent with the label
/// it produces instead of re-using a pre-fold rendering.
fn rebuild_antecedent_normalized_label(ant: &AntecedentIr, resource_rows: &[ResourceRow]) -> String {
    let prefix = if ant.is_not { "!" } else { "" };
    let triple = render_triple_ir(&ant.triple);
    match &ant.filter {
        Some(f) => format!("{prefix}{triple}.[{}]", render_filter_ir(f, resource_rows)),
        None => format!("{prefix}{triple}"),
    }
}

fn render_element_ir(elem: &ElementIr) -> String {
    match elem {
        ElementIr::Var { id } => id.clone(),
        ElementIr::Identifier { value } | ElementIr::Keyword { value } => value.clone(),
    }
}

fn render_triple_ir(t: &TripleIr) -> String {
    format!(
        "({} {} {})",
        render_element_ir(&t.subject),
        render_element_ir(&t.predicate),
        render_element_ir(&t.object)
    )
}

fn render_filter_ir(expr: &FilterExprIr, resource_rows: &[ResourceRow]) -> String {
    match expr {
        FilterExprIr::Leaf { key } => render_resource_row_by_key(resource_rows, *key),
        FilterExprIr::Binary { lhs, op, rhs } => format!(
            "{} {} {}",
            render_filter_operand(lhs, resource_rows),
            op,
            render_filter_operand(rhs, resource_rows)
        ),
    }
}

/// Renders a filter operand, parenthesizing it if it's itself a binary
/// expression — the folded tree nests a freshly built `or` under an `and`,
/// which needs explicit grouping to round-trip back to the same tree.
fn render_filter_operand(expr: &FilterExprIr, resource_rows: &[ResourceRow]) -> String {
    match expr {
        FilterExprIr::Binary { .. } => format!("({})", render_filter_ir(expr, resource_rows)),
        FilterExprIr::Leaf { .. } => render_filter_ir(expr, resource_rows),
    }
}

fn render_resource_row_by_key(resource_rows: &[ResourceRow], key: u64) -> String {
    resource_rows
        .iter()
        .find_map(|row| match row {
            ResourceRow::Var(v) if v.key == key => Some(v.id.clone()),
            ResourceRow::Keyword(k) if k.key == key => Some(k.value.clone()),
            ResourceRow::Typed(t) if t.key == key => Some(t.id.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn interpret_properties(raw: &[(String, String)]) -> (i64, bool, Vec<(String, String)>) {
    let mut salience = 100i64;
    let mut optimization = true;
    let mut preserved = Vec::new();
    for (k, v) in raw {
        match k.as_str() {
            "s" | "salience" => {
                if let Ok(n) = v.parse::<i64>() {
                    salience = n;
                }
            }
            "o" | "optimize" => {
                optimization = v != "false";
            }
            _ => {}
        }
        preserved.push((k.clone(), v.clone()));
    }
    (salience, optimization, preserved)
}

fn render_rule_label(raw: &RawRule, render: impl Fn(&RawElement) -> String) -> String {
    let ants: Vec<String> = raw
        .antecedents
        .iter()
        .map(|a| render_antecedent_label(a, &render))
        .collect();
    let cons: Vec<String> = raw
        .consequents
        .iter()
        .map(|c| render_raw_triple_with(&c.triple, &render))
        .collect();
    format!(
        "[{}]: {} -> {};",
        raw.name,
        ants.join("."),
        cons.join(".")
    )
}

fn render_antecedent_label(raw: &RawAntecedent, render: impl Fn(&RawElement) -> String) -> String {
    let prefix = if raw.is_not { "!" } else { "" };
    let triple = render_raw_triple_with(&raw.triple, &render);
    match &raw.filter {
        Some(f) => format!("{prefix}{triple}.[{}]", render_raw_filter(f, &render)),
        None => format!("{prefix}{triple}"),
    }
}

fn render_antecedent_normalized_label(raw: &RawAntecedent, renamer: &mut VarRenamer) -> String {
    let prefix = if raw.is_not { "!" } else { "" };
    let triple = render_triple_with_renamer(&raw.triple, renamer);
    match &raw.filter {
        Some(f) => format!(
            "{prefix}{triple}.[{}]",
            render_filter_with_renamer(f, renamer)
        ),
        None => format!("{prefix}{triple}"),
    }
}

fn render_raw_element_authored(elem: &RawElement) -> String {
    match elem {
        RawElement::Var(v) => v.clone(),
        RawElement::Identifier(id) => id.clone(),
        RawElement::Keyword(k) => k.clone(),
        RawElement::IntLiteral(t) | RawElement::FloatLiteral(t) => t.clone(),
        RawElement::StringLiteral(s) => format!("\"{s}\""),
    }
}

fn render_raw_triple_authored(t: &RawTriple) -> String {
    render_raw_triple_with(t, &render_raw_element_authored)
}

fn render_raw_triple_with(t: &RawTriple, render: impl Fn(&RawElement) -> String) -> String {
    format!(
        "({} {} {})",
        render(&t.subject),
        render(&t.predicate),
        render(&t.object)
    )
}

fn render_raw_filter(expr: &RawFilterExpr, render: &impl Fn(&RawElement) -> String) -> String {
    match expr {
        RawFilterExpr::Leaf(e) => render(e),
        RawFilterExpr::Binary { lhs, op, rhs } => format!(
            "{} {} {}",
            render_raw_filter(lhs, render),
            op,
            render_raw_filter(rhs, render)
        ),
    }
}

fn render_triple_with_renamer(t: &RawTriple, renamer: &mut VarRenamer) -> String {
    format!(
        "({} {} {})",
        render_element_with_renamer(&t.subject, renamer),
        render_element_with_renamer(&t.predicate, renamer),
        render_element_with_renamer(&t.object, renamer)
    )
}

fn render_element_with_renamer(elem: &RawElement, renamer: &mut VarRenamer) -> String {
    match elem {
        RawElement::Var(name) => renamer
            .canonical
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.clone()),
        other => render_raw_element_authored(other),
    }
}

fn render_filter_with_renamer(expr: &RawFilterExpr, renamer: &mut VarRenamer) -> String {
    match expr {
        RawFilterExpr::Leaf(e) => render_element_with_renamer(e, renamer),
        RawFilterExpr::Binary { lhs, op, rhs } => format!(
            "{} {} {}",
            render_filter_with_renamer(lhs, renamer),
            op,
            render_filter_with_renamer(rhs, renamer)
        ),
    }
}

fn build_normalized_label(name: &str, ants: &[AntecedentIr], cons: &[ConsequentIr]) -> String {
    let ant_labels: Vec<&str> = ants.iter().map(|a| a.normalized_label.as_str()).collect();
    let con_labels: Vec<&str> = cons.iter().map(|c| c.normalized_label.as_str()).collect();
    format!(
        "[{}]: {} -> {};",
        name,
        ant_labels.join("."),
        con_labels.join(".")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ResourceType;

    fn sample_triple(s: RawElement, p: RawElement, o: RawElement) -> RawTriple {
        RawTriple {
            subject: s,
            predicate: p,
            object: o,
        }
    }

    #[test]
    fn renames_variables_in_first_occurrence_order() {
        let mut symbols = SymbolTable::new();
        symbols.declare_resource("rdf:type", ResourceType::Resource, None, None);
        let mut rows = Vec::new();
        let raw = RawRule {
            name: "R1".to_string(),
            properties: vec![],
            antecedents: vec![RawAntecedent {
                is_not: false,
                triple: sample_triple(
                    RawElement::Var("?a".to_string()),
                    RawElement::Identifier("rdf:type".to_string()),
                    RawElement::Var("?b".to_string()),
                ),
                filter: None,
            }],
            consequents: vec![RawConsequent {
                triple: sample_triple(
                    RawElement::Var("?a".to_string()),
                    RawElement::Identifier("rdf:type".to_string()),
                    RawElement::Var("?a".to_string()),
                ),
            }],
            source_file_name: None,
            line: 1,
            column: 1,
        };
        let rule = normalize_rule(&raw, &mut symbols, &mut rows, false);
        match &rule.antecedents[0].triple.subject {
            ElementIr::Var { id } => assert_eq!(id, "?x1"),
            other => panic!("expected var, got {other:?}"),
        }
        match &rule.antecedents[0].triple.object {
            ElementIr::Var { id } => assert_eq!(id, "?x2"),
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn default_salience_is_100() {
        let (salience, optimization, _) = interpret_properties(&[]);
        assert_eq!(salience, 100);
        assert!(optimization);
    }

    #[test]
    fn salience_property_overrides_default() {
        let (salience, _, _) = interpret_properties(&[("s".to_string(), "50".to_string())]);
        assert_eq!(salience, 50);
    }
}
