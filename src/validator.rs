//! # Semantic Validator
//!
//! Checks every rule's triples against the symbol table before
//! normalization runs. Only the predicate slot of a triple is checked:
//! subjects and objects may be variables, literals, or identifiers that are
//! resolved (or auto-declared) later, but a predicate must already name a
//! declared resource or lookup table. Also rejects rules with no
//! antecedents or no consequents.

use crate::ast::{RawAntecedent, RawConsequent, RawElement, RawRule, RawTriple};
use crate::symbol_table::SymbolTable;

/// Validates one rule, pushing any diagnostics onto `errors`. Returns
/// `false` if the rule has any error and should be excluded from the Rete
/// build.
pub fn validate_rule(rule: &RawRule, symbols: &SymbolTable, errors: &mut Vec<String>) -> bool {
    let mut ok = true;

    if rule.antecedents.is_empty() || rule.consequents.is_empty() {
        errors.push(format!(
            "Error rule {}: a rule must have at least one antecedent and one consequent.",
            rule.name
        ));
        ok = false;
    }

    for ant in &rule.antecedents {
        if !validate_antecedent(ant, &rule.name, symbols, errors) {
            ok = false;
        }
    }
    for con in &rule.consequents {
        if !validate_consequent(con, &rule.name, symbols, errors) {
            ok = false;
        }
    }

    ok
}

fn validate_antecedent(
    ant: &RawAntecedent,
    rule_name: &str,
    symbols: &SymbolTable,
    errors: &mut Vec<String>,
) -> bool {
    validate_predicate(&ant.triple, rule_name, symbols, errors)
}

fn validate_consequent(
    con: &RawConsequent,
    rule_name: &str,
    symbols: &SymbolTable,
    errors: &mut Vec<String>,
) -> bool {
    validate_predicate(&con.triple, rule_name, symbols, errors)
}

fn validate_predicate(
    triple: &RawTriple,
    rule_name: &str,
    symbols: &SymbolTable,
    errors: &mut Vec<String>,
) -> bool {
    if let RawElement::Identifier(id) = &triple.predicate {
        if !symbols.is_declared(id) && symbols.get_lookup_table(id).is_none() {
            errors.push(format!(
                "Error rule {}: Identifier '{}' is not defined in this context '{}', it must be defined.",
                rule_name,
                id,
                render_triple(triple)
            ));
            return false;
        }
    }
    true
}

fn render_element(elem: &RawElement) -> String {
    match elem {
        RawElement::Var(v) => v.clone(),
        RawElement::Identifier(id) => id.clone(),
        RawElement::Keyword(k) => k.clone(),
        RawElement::IntLiteral(t) | RawElement::FloatLiteral(t) => t.clone(),
        RawElement::StringLiteral(s) => format!("\"{s}\""),
    }
}

fn render_triple(t: &RawTriple) -> String {
    format!(
        "({} {} {})",
        render_element(&t.subject),
        render_element(&t.predicate),
        render_element(&t.object)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{RawConsequent, ResourceType};

    fn triple(p: &str) -> RawTriple {
        RawTriple {
            subject: RawElement::Var("?clm01".to_string()),
            predicate: RawElement::Identifier(p.to_string()),
            object: RawElement::Var("?clm02".to_string()),
        }
    }

    fn rule_with_predicate(p: &str) -> RawRule {
        RawRule {
            name: "RuleC5".to_string(),
            properties: vec![],
            antecedents: vec![RawAntecedent {
                is_not: false,
                triple: triple(p),
                filter: None,
            }],
            consequents: vec![RawConsequent { triple: triple(p) }],
            source_file_name: None,
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn reports_undefined_predicate_with_exact_message() {
        let symbols = SymbolTable::new();
        let mut errors = Vec::new();
        let rule = rule_with_predicate("reverse_of");
        assert!(!validate_rule(&rule, &symbols, &mut errors));
        assert_eq!(
            errors[0],
            "Error rule RuleC5: Identifier 'reverse_of' is not defined in this context '(?clm01 reverse_of ?clm02)', it must be defined."
        );
    }

    #[test]
    fn accepts_declared_predicate() {
        let mut symbols = SymbolTable::new();
        symbols.declare_resource("reverse_of", ResourceType::Resource, None, None);
        let mut errors = Vec::new();
        let rule = rule_with_predicate("reverse_of");
        assert!(validate_rule(&rule, &symbols, &mut errors));
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_rule_with_no_antecedents() {
        let symbols = SymbolTable::new();
        let mut errors = Vec::new();
        let mut rule = rule_with_predicate("x");
        symbols.is_declared("x");
        rule.antecedents.clear();
        assert!(!validate_rule(&rule, &symbols, &mut errors));
    }
}
