//! # Context Object
//!
//! The accumulating compilation result and the pipeline that fills it:
//! `InputProvider → Lexer/Parser → Import Driver → Symbol Table →
//! Semantic Validator → Normalizer → Rete Builder → Context`. A fresh
//! `Context` corresponds to exactly one `compile_jet_rule`/
//! `compile_jet_rule_file` call; nothing here is reused across
//! compilations.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::ast::{Declaration, RawRule, ResourceType};
use crate::config::CompilerOptions;
use crate::import_driver;
use crate::input_provider::InputProvider;
use crate::ir::{LookupTableIr, ResourceRow, ReteNodeIr, RuleIr, TypedResourceRow};
use crate::normalizer;
use crate::parser;
use crate::rete;
use crate::symbol_table::SymbolTable;
use crate::validator;

/// The compiler's accumulated result for a single compilation.
#[derive(Debug, Default)]
pub struct Context {
    pub resources: Vec<ResourceRow>,
    pub lookup_tables: Vec<LookupTableIr>,
    pub jet_rules: Vec<RuleIr>,
    pub rete_nodes: Vec<ReteNodeIr>,
    pub imports: BTreeMap<String, Vec<String>>,
    pub errors: Vec<String>,
    pub main_rule_file_name: Option<String>,
    pub support_rule_file_names: Vec<String>,
}

impl Context {
    /// True iff any diagnostic was collected during compilation.
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn jet_rules_view(&self) -> JetRulesView<'_> {
        JetRulesView {
            resources: &self.resources,
            lookup_tables: &self.lookup_tables,
            jet_rules: &self.jet_rules,
            imports: &self.imports,
        }
    }

    pub fn jet_rete_nodes_view(&self) -> JetReteNodesView<'_> {
        JetReteNodesView {
            main_rule_file_name: self.main_rule_file_name.as_deref(),
            support_rule_file_names: &self.support_rule_file_names,
            resources: &self.resources,
            lookup_tables: &self.lookup_tables,
            rete_nodes: &self.rete_nodes,
        }
    }

    pub fn jet_rules_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.jet_rules_view())
    }

    pub fn jet_rete_nodes_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.jet_rete_nodes_view())
    }
}

/// The `jetRules` serialized view: resources, lookup tables, normalized
/// rules, and the import graph.
#[derive(Debug, Serialize)]
pub struct JetRulesView<'a> {
    pub resources: &'a [ResourceRow],
    pub lookup_tables: &'a [LookupTableIr],
    pub jet_rules: &'a [RuleIr],
    pub imports: &'a BTreeMap<String, Vec<String>>,
}

/// The `jetReteNodes` serialized view: the Rete DAG plus enough of the
/// resource/lookup-table context to resolve its keys.
#[derive(Debug, Serialize)]
pub struct JetReteNodesView<'a> {
    pub main_rule_file_name: Option<&'a str>,
    pub support_rule_file_names: &'a [String],
    pub resources: &'a [ResourceRow],
    pub lookup_tables: &'a [LookupTableIr],
    pub rete_nodes: &'a [ReteNodeIr],
}

/// Compiles a single in-memory source blob with no `import` resolution.
/// `source_file_name` is `None` throughout the resulting `Context`.
pub fn compile_jet_rule(text: &str, options: &CompilerOptions) -> Context {
    let span = tracing::info_span!("compile_jet_rule");
    let _enter = span.enter();
    let (file, parse_errors) = parser::parse(text, None);
    build_context(file.declarations, Vec::new(), parse_errors, None, Vec::new(), options)
}

/// Compiles a named file through `provider`, resolving `import` directives
/// depth-first.
pub fn compile_jet_rule_file(
    name: &str,
    provider: &dyn InputProvider,
    options: &CompilerOptions,
) -> Context {
    let span = tracing::info_span!("compile_jet_rule_file", file = name);
    let _enter = span.enter();
    let result = import_driver::drive(name, provider);
    let support_rule_file_names: Vec<String> = result
        .imports
        .iter()
        .map(|(f, _)| f.clone())
        .filter(|f| f != name)
        .collect();
    build_context(
        result.declarations,
        result.imports,
        result.errors,
        Some(name.to_string()),
        support_rule_file_names,
        options,
    )
}

fn build_context(
    declarations: Vec<Declaration>,
    imports: Vec<(String, Vec<String>)>,
    mut errors: Vec<String>,
    main_rule_file_name: Option<String>,
    support_rule_file_names: Vec<String>,
    options: &CompilerOptions,
) -> Context {
    let mut symbols = SymbolTable::new();
    let mut resources: Vec<ResourceRow> = Vec::new();
    let mut lookup_tables = Vec::new();
    let mut raw_rules: Vec<RawRule> = Vec::new();
    let mut extract_resources_from_rules = options.extract_resources_from_rules;

    for decl in declarations {
        match decl {
            Declaration::Resource(r) => {
                if let Some(key) =
                    symbols.declare_resource(&r.id, r.kind, Some(r.value.clone()), r.source_file_name.clone())
                {
                    resources.push(ResourceRow::Typed(TypedResourceRow {
                        kind: r.kind.as_str().to_string(),
                        id: r.id.clone(),
                        value: Some(r.value.clone()),
                        source_file_name: r.source_file_name.clone(),
                        key,
                    }));
                } else {
                    errors.push(format!("Error: resource '{}' already declared", r.id));
                }
            }
            Declaration::LookupTable(lt) => {
                if symbols.get_lookup_table(&lt.name).is_some() {
                    errors.push(format!("Error: lookup table '{}' already declared", lt.name));
                    continue;
                }
                let table_key = symbols
                    .declare_resource(&lt.name, ResourceType::Resource, Some(lt.name.clone()), lt.source_file_name.clone())
                    .unwrap_or_else(|| symbols.alloc_key());
                resources.push(ResourceRow::Typed(TypedResourceRow {
                    kind: "resource".to_string(),
                    id: lt.name.clone(),
                    value: Some(lt.name.clone()),
                    source_file_name: lt.source_file_name.clone(),
                    key: table_key,
                }));
                for (res_id, col) in &lt.columns {
                    let key = symbols
                        .declare_resource(res_id, ResourceType::Resource, Some(col.clone()), lt.source_file_name.clone())
                        .unwrap_or_else(|| symbols.alloc_key());
                    resources.push(ResourceRow::Typed(TypedResourceRow {
                        kind: "resource".to_string(),
                        id: res_id.clone(),
                        value: Some(col.clone()),
                        source_file_name: lt.source_file_name.clone(),
                        key,
                    }));
                }
                symbols.declare_lookup_table(&lt.name, lt.table.clone(), lt.key.clone(), lt.columns.clone());
                lookup_tables.push(LookupTableIr {
                    name: lt.name.clone(),
                    table: lt.table.clone(),
                    key: lt.key.clone(),
                    columns: lt.columns.iter().map(|(_, c)| c.clone()).collect(),
                    resources: lt.columns.iter().map(|(r, _)| r.clone()).collect(),
                    source_file_name: lt.source_file_name.clone(),
                });
            }
            Declaration::Directive(d) => {
                if d.key == "extract_resources_from_rules" {
                    extract_resources_from_rules = d.value == "true";
                }
            }
            Declaration::Import(_) => unreachable!("import directives are consumed by the import driver"),
            Declaration::Rule(r) => raw_rules.push(r),
        }
    }

    debug!(count = raw_rules.len(), "validating rules");
    let mut valid_rules = Vec::new();
    for rule in raw_rules {
        if validator::validate_rule(&rule, &symbols, &mut errors) {
            valid_rules.push(rule);
        } else {
            warn!(rule = %rule.name, "excluding rule with validation errors from rete build");
        }
    }

    let jet_rules = normalizer::normalize_rules(
        &valid_rules,
        &mut symbols,
        &mut resources,
        extract_resources_from_rules,
    );

    let rete_nodes = rete::build_rete(&jet_rules, &mut symbols, &mut resources);

    let imports_map: BTreeMap<String, Vec<String>> = imports.into_iter().collect();

    Context {
        resources,
        lookup_tables,
        jet_rules,
        rete_nodes,
        imports: imports_map,
        errors,
        main_rule_file_name,
        support_rule_file_names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_inline_source_with_no_error() {
        let ctx = compile_jet_rule("int a = 1;", &CompilerOptions::default());
        assert!(!ctx.has_error());
        assert_eq!(ctx.resources.len(), 1);
        assert!(ctx.main_rule_file_name.is_none());
    }

    #[test]
    fn duplicate_resource_declaration_is_an_error() {
        let ctx = compile_jet_rule("int a = 1;\nint a = 2;", &CompilerOptions::default());
        assert!(ctx.has_error());
    }

    #[test]
    fn undefined_predicate_excludes_rule_from_rete_but_reports_error() {
        let src = "[RuleC5]: (?clm01 reverse_of ?clm02) -> (?clm01 reverse_of ?clm02);";
        let ctx = compile_jet_rule(src, &CompilerOptions::default());
        assert!(ctx.has_error());
        assert!(ctx.jet_rules.is_empty());
        assert_eq!(ctx.rete_nodes.len(), 1, "only the head node should remain");
    }

    #[test]
    fn compiles_simple_valid_rule_end_to_end() {
        let src = "resource rdf:type = \"rdf:type\";\nresource acme:Claim = \"acme:Claim\";\n\
                   [RuleA]: (?c1 rdf:type acme:Claim) -> (?c1 rdf:type acme:Claim);";
        let ctx = compile_jet_rule(src, &CompilerOptions::default());
        assert!(!ctx.has_error(), "errors: {:?}", ctx.errors);
        assert_eq!(ctx.jet_rules.len(), 1);
        assert!(ctx.rete_nodes.len() >= 2);
    }
}
