//! # Rete Builder
//!
//! The densest piece of the compiler. Stitches every rule's antecedent
//! chain into a single shared-prefix DAG rooted at a synthetic head node,
//! computes which variables must be carried forward at each vertex
//! (`beta_relation_vars`) versus dropped (`pruned_var`), and appends one
//! consequent node per rule consequent after all antecedent nodes.
//!
//! Vertex ids are assigned once, globally, the first time a distinct
//! `(parent_vertex, normalizedLabel, isNot)` combination is seen; a later
//! rule whose antecedent chain matches an existing prefix reuses those
//! vertex ids instead of creating new nodes.

use std::collections::{HashMap, HashSet};

use crate::ir::{
    AbbreviatedVarRow, AntecedentIr, AntecedentNodeIr, BetaVarNode, ConsequentIr, ConsequentNodeIr,
    ElementIr, FilterExprIr, HeadNodeIr, ResourceRow, ReteNodeIr, RuleIr, TripleIr, VarRow,
};
use crate::symbol_table::SymbolTable;

struct AntecedentBuild {
    vertex: u32,
    parent_vertex: u32,
    is_not: bool,
    normalized_label: String,
    filter: Option<FilterExprIr>,
    triple: TripleIr,
    rules: Vec<String>,
    salience: Vec<i64>,
    children: Vec<u32>,
}

struct ConsequentBuild {
    vertex: u32,
    seq: u32,
    rule_name: String,
    salience: i64,
    triple: TripleIr,
}

struct ReteBuilder {
    next_vertex: u32,
    merge_index: HashMap<(u32, String, bool), u32>,
    nodes: HashMap<u32, AntecedentBuild>,
    head_children: Vec<u32>,
    consequents: Vec<ConsequentBuild>,
}

impl ReteBuilder {
    fn new() -> Self {
        ReteBuilder {
            next_vertex: 1,
            merge_index: HashMap::new(),
            nodes: HashMap::new(),
            head_children: Vec::new(),
            consequents: Vec::new(),
        }
    }

    fn add_rule(&mut self, rule: &RuleIr) {
        let mut parent = 0u32;
        let mut terminal = 0u32;
        for ant in &rule.antecedents {
            let vertex = self.vertex_for(parent, ant);
            terminal = vertex;
            parent = vertex;
        }
        if terminal != 0 {
            let node = self.nodes.get_mut(&terminal).expect("vertex just created or reused");
            node.rules.push(rule.name.clone());
            node.salience.push(rule.salience);
        }
        for (seq, con) in rule.consequents.iter().enumerate() {
            self.consequents.push(ConsequentBuild {
                vertex: terminal,
                seq: seq as u32,
                rule_name: rule.name.clone(),
                salience: rule.salience,
                triple: con.triple.clone(),
            });
        }
    }

    fn vertex_for(&mut self, parent: u32, ant: &AntecedentIr) -> u32 {
        let key = (parent, ant.normalized_label.clone(), ant.is_not);
        if let Some(&v) = self.merge_index.get(&key) {
            return v;
        }
        let v = self.next_vertex;
        self.next_vertex += 1;
        self.merge_index.insert(key, v);
        self.nodes.insert(
            v,
            AntecedentBuild {
                vertex: v,
                parent_vertex: parent,
                is_not: ant.is_not,
                normalized_label: ant.normalized_label.clone(),
                filter: ant.filter.clone(),
                triple: ant.triple.clone(),
                rules: Vec::new(),
                salience: Vec::new(),
                children: Vec::new(),
            },
        );
        if parent == 0 {
            self.head_children.push(v);
        } else if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(v);
        }
        v
    }
}

/// Renders a normalized triple's `(subject predicate object)` text, used
/// for a consequent node's `normalizedLabel` (consequent nodes carry no
/// filter, so there is no `.[...]` suffix to append).
fn render_triple_label(t: &TripleIr) -> String {
    format!(
        "({} {} {})",
        render_element_label(&t.subject),
        render_element_label(&t.predicate),
        render_element_label(&t.object)
    )
}

fn render_element_label(elem: &ElementIr) -> String {
    match elem {
        ElementIr::Var { id } => id.clone(),
        ElementIr::Identifier { value } | ElementIr::Keyword { value } => value.clone(),
    }
}

fn vars_in_triple(triple: &TripleIr) -> HashSet<String> {
    let mut set = HashSet::new();
    for elem in [&triple.subject, &triple.predicate, &triple.object] {
        if let ElementIr::Var { id } = elem {
            set.insert(id.clone());
        }
    }
    set
}

fn filter_vars(filter: &Option<FilterExprIr>, resources_by_key: &HashMap<u64, String>) -> HashSet<String> {
    let mut set = HashSet::new();
    if let Some(f) = filter {
        collect_filter_vars(f, resources_by_key, &mut set);
    }
    set
}

fn collect_filter_vars(
    expr: &FilterExprIr,
    resources_by_key: &HashMap<u64, String>,
    out: &mut HashSet<String>,
) {
    match expr {
        FilterExprIr::Leaf { key } => {
            if let Some(id) = resources_by_key.get(key) {
                out.insert(id.clone());
            }
        }
        FilterExprIr::Binary { lhs, rhs, .. } => {
            collect_filter_vars(lhs, resources_by_key, out);
            collect_filter_vars(rhs, resources_by_key, out);
        }
    }
}

fn first_slot_in_triple(triple: &TripleIr, var_id: &str) -> u8 {
    if matches!(&triple.subject, ElementIr::Var { id } if id == var_id) {
        return 0;
    }
    if matches!(&triple.predicate, ElementIr::Var { id } if id == var_id) {
        return 1;
    }
    if matches!(&triple.object, ElementIr::Var { id } if id == var_id) {
        return 2;
    }
    0
}

fn sorted_vars(vars: &HashSet<String>) -> Vec<String> {
    let mut v: Vec<String> = vars.iter().cloned().collect();
    v.sort_by_key(|name| {
        name.trim_start_matches("?x")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    v
}

fn element_key(elem: &ElementIr, symbols: &SymbolTable, var_keys: &HashMap<(u32, String), u64>, vertex: u32) -> u64 {
    match elem {
        ElementIr::Var { id } => var_keys.get(&(vertex, id.clone())).copied().unwrap_or(0),
        ElementIr::Identifier { value } | ElementIr::Keyword { value } => {
            symbols.get_resource(value).map(|r| r.key).unwrap_or(0)
        }
    }
}

/// Builds the full Rete node list: the head node, every antecedent node in
/// vertex order, then every consequent node grouped in rule-addition order.
/// `resources` is mutated in place: a fresh `var` row is appended for every
/// variable descriptor that newly participates at a vertex, matching the
/// global key counter's "rete-node emission" mutation site.
pub fn build_rete(
    rules: &[RuleIr],
    symbols: &mut SymbolTable,
    resources: &mut Vec<ResourceRow>,
) -> Vec<ReteNodeIr> {
    let mut builder = ReteBuilder::new();
    for rule in rules {
        builder.add_rule(rule);
    }

    let resources_by_key: HashMap<u64, String> = resources
        .iter()
        .filter_map(|r| match r {
            ResourceRow::Var(v) => Some((v.key, v.id.clone())),
            _ => None,
        })
        .collect();

    let mut vertex_ids: Vec<u32> = builder.nodes.keys().copied().collect();
    vertex_ids.sort_unstable();

    // Forward pass: own_bound / bound_at_or_above, ascending vertex id
    // (a parent's id is always smaller than any of its children's).
    let mut own_bound: HashMap<u32, HashSet<String>> = HashMap::new();
    let mut bound_at_or_above: HashMap<u32, HashSet<String>> = HashMap::new();
    for v in &vertex_ids {
        let node = &builder.nodes[v];
        let parent_bound = if node.parent_vertex == 0 {
            HashSet::new()
        } else {
            bound_at_or_above
                .get(&node.parent_vertex)
                .cloned()
                .unwrap_or_default()
        };
        let triple_vars = vars_in_triple(&node.triple);
        let ob: HashSet<String> = triple_vars.difference(&parent_bound).cloned().collect();
        let bao: HashSet<String> = parent_bound.union(&ob).cloned().collect();
        own_bound.insert(*v, ob);
        bound_at_or_above.insert(*v, bao);
    }

    // Backward pass: used_below, descending vertex id (children before parents).
    let mut used_below: HashMap<u32, HashSet<String>> = HashMap::new();
    let mut desc_ids = vertex_ids.clone();
    desc_ids.sort_unstable_by(|a, b| b.cmp(a));
    for v in &desc_ids {
        let node = &builder.nodes[v];
        let mut set = filter_vars(&node.filter, &resources_by_key);
        for c in &node.children {
            if let Some(child_used) = used_below.get(c) {
                set.extend(child_used.iter().cloned());
            }
        }
        for con in builder.consequents.iter().filter(|c| c.vertex == *v) {
            set.extend(vars_in_triple(&con.triple));
        }
        used_below.insert(*v, set);
    }

    // Var-descriptor keys, allocated per (vertex, var-id) the first time a
    // var participates at a vertex as part of its beta_var_nodes.
    let mut var_keys: HashMap<(u32, String), u64> = HashMap::new();

    let mut nodes = Vec::with_capacity(vertex_ids.len() + 2);
    nodes.push(ReteNodeIr::Head(HeadNodeIr {
        children_vertexes: builder.head_children.clone(),
        ..HeadNodeIr::default()
    }));

    for v in &vertex_ids {
        let node = &builder.nodes[v];
        let bao = bound_at_or_above.get(v).cloned().unwrap_or_default();
        let ub = used_below.get(v).cloned().unwrap_or_default();
        let beta: HashSet<String> = bao.intersection(&ub).cloned().collect();
        let pruned: HashSet<String> = bao.difference(&beta).cloned().collect();
        let ob = own_bound.get(v).cloned().unwrap_or_default();

        let mut beta_var_nodes = Vec::new();
        for var_id in sorted_vars(&beta) {
            if ob.contains(&var_id) {
                let key = symbols.alloc_key();
                var_keys.insert((*v, var_id.clone()), key);
                let var_pos = first_slot_in_triple(&node.triple, &var_id);
                let row = VarRow {
                    kind: "var",
                    id: var_id.clone(),
                    is_binded: false,
                    var_pos,
                    vertex: *v,
                    is_antecedent: None,
                    key,
                };
                resources.push(ResourceRow::Var(row.clone()));
                beta_var_nodes.push(BetaVarNode::Full(row));
            } else {
                let var_pos = binding_slot(&builder, &bound_at_or_above, &own_bound, node.parent_vertex, &var_id);
                beta_var_nodes.push(BetaVarNode::Abbreviated(AbbreviatedVarRow {
                    kind: "var",
                    id: var_id.clone(),
                    is_binded: true,
                    var_pos,
                    vertex: *v,
                }));
            }
        }

        let subject_key = element_key(&node.triple.subject, symbols, &var_keys, *v);
        let predicate_key = element_key(&node.triple.predicate, symbols, &var_keys, *v);
        let object_key = element_key(&node.triple.object, symbols, &var_keys, *v);

        nodes.push(ReteNodeIr::Antecedent(AntecedentNodeIr {
            kind: "antecedent",
            is_not: node.is_not,
            normalized_label: node.normalized_label.clone(),
            filter: node.filter.clone(),
            vertex: *v,
            parent_vertex: node.parent_vertex,
            beta_relation_vars: sorted_vars(&beta),
            pruned_var: sorted_vars(&pruned),
            beta_var_nodes,
            children_vertexes: node.children.clone(),
            rules: if node.rules.is_empty() { None } else { Some(node.rules.clone()) },
            salience: if node.salience.is_empty() { None } else { Some(node.salience.clone()) },
            subject_key,
            predicate_key,
            object_key,
        }));
    }

    for con in &builder.consequents {
        let subject_key = element_key(&con.triple.subject, symbols, &var_keys, con.vertex);
        let predicate_key = element_key(&con.triple.predicate, symbols, &var_keys, con.vertex);
        let object_key = element_key(&con.triple.object, symbols, &var_keys, con.vertex);
        nodes.push(ReteNodeIr::Consequent(ConsequentNodeIr {
            kind: "consequent",
            normalized_label: render_triple_label(&con.triple),
            vertex: con.vertex,
            consequent_seq: con.seq,
            consequent_for_rule: con.rule_name.clone(),
            consequent_salience: con.salience,
            subject_key,
            predicate_key,
            object_key,
        }));
    }

    nodes
}

/// Walks ancestors of `start_parent` to find the vertex where `var_id` was
/// first bound, returning the slot it occupied there.
fn binding_slot(
    builder: &ReteBuilder,
    bound_at_or_above: &HashMap<u32, HashSet<String>>,
    own_bound: &HashMap<u32, HashSet<String>>,
    start_parent: u32,
    var_id: &str,
) -> u8 {
    let mut current = start_parent;
    while current != 0 {
        if let Some(ob) = own_bound.get(&current) {
            if ob.contains(var_id) {
                return first_slot_in_triple(&builder.nodes[&current].triple, var_id);
            }
        }
        current = builder.nodes.get(&current).map(|n| n.parent_vertex).unwrap_or(0);
    }
    let _ = bound_at_or_above;
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ResourceType;
    use crate::ir::{AntecedentIr, ConsequentIr};

    fn var_elem(id: &str) -> ElementIr {
        ElementIr::Var { id: id.to_string() }
    }
    fn id_elem(v: &str) -> ElementIr {
        ElementIr::Identifier { value: v.to_string() }
    }

    fn make_rule(name: &str, vars: [&str; 3], predicate: &str) -> RuleIr {
        let triple = TripleIr {
            subject: var_elem(vars[0]),
            predicate: id_elem(predicate),
            object: var_elem(vars[1]),
        };
        RuleIr {
            name: name.to_string(),
            properties: vec![],
            optimization: true,
            salience: 100,
            antecedents: vec![AntecedentIr {
                is_not: false,
                triple: triple.clone(),
                filter: None,
                label: String::new(),
                normalized_label: format!("({} {} {})", vars[0], predicate, vars[1]),
                vertex: 1,
                parent_vertex: 0,
            }],
            consequents: vec![ConsequentIr {
                triple: TripleIr {
                    subject: var_elem(vars[0]),
                    predicate: id_elem(predicate),
                    object: var_elem(vars[2]),
                },
                label: String::new(),
                normalized_label: String::new(),
                vertex: 1,
            }],
            authored_label: String::new(),
            normalized_label: String::new(),
            label: String::new(),
            source_file_name: None,
        }
    }

    #[test]
    fn shares_identical_antecedent_prefix_across_rules() {
        let mut symbols = SymbolTable::new();
        symbols.declare_resource("rdf:type", ResourceType::Resource, None, None);
        let mut resources = Vec::new();
        let r1 = make_rule("R1", ["?x1", "?x2", "?x3"], "rdf:type");
        let mut r2 = make_rule("R2", ["?x1", "?x2", "?x3"], "rdf:type");
        r2.normalized_label = r1.normalized_label.clone();
        r2.antecedents[0].normalized_label = r1.antecedents[0].normalized_label.clone();
        let nodes = build_rete(&[r1, r2], &mut symbols, &mut resources);
        let antecedent_count = nodes
            .iter()
            .filter(|n| matches!(n, ReteNodeIr::Antecedent(_)))
            .count();
        assert_eq!(antecedent_count, 1, "identical antecedents across rules should merge to one vertex");
    }

    #[test]
    fn head_node_is_first_with_vertex_zero() {
        let mut symbols = SymbolTable::new();
        symbols.declare_resource("rdf:type", ResourceType::Resource, None, None);
        let mut resources = Vec::new();
        let r1 = make_rule("R1", ["?x1", "?x2", "?x3"], "rdf:type");
        let nodes = build_rete(&[r1], &mut symbols, &mut resources);
        match &nodes[0] {
            ReteNodeIr::Head(h) => assert_eq!(h.vertex, 0),
            other => panic!("expected head node first, got {other:?}"),
        }
    }
}
