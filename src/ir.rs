//! # Normalized IR
//!
//! Types emitted by [`crate::normalizer`] and [`crate::rete`], and serialized
//! by [`crate::context::Context`] into the `jetRules` and `jetReteNodes`
//! views. Every row that lands in the `resources` array is a `type`-tagged
//! variant, mirroring the way the source this language was distilled from
//! discriminates dictionaries by a `type` key; here each tag gets its own
//! struct and the tagging is manual so field order stays exactly as
//! declared rather than at the mercy of a map's iteration order.

use serde::Serialize;

/// One row of the `resources` array for a typed literal, a plain/volatile
/// resource, or a lookup-table-synthesized resource.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypedResourceRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file_name: Option<String>,
    pub key: u64,
}

/// One row of the `resources` array for a single variable occurrence.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VarRow {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub is_binded: bool,
    pub var_pos: u8,
    pub vertex: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_antecedent: Option<bool>,
    pub key: u64,
}

impl VarRow {
    pub fn new_type() -> &'static str {
        "var"
    }
}

/// Abbreviated variable descriptor used inside `beta_var_nodes` when the
/// variable was already bound at a parent vertex: no `key`, no
/// `source_file_name`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AbbreviatedVarRow {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub is_binded: bool,
    pub var_pos: u8,
    pub vertex: u32,
}

/// One row of the `resources` array for a boolean keyword literal
/// (`true`/`false`) occurring inline in a triple.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeywordRow {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
    pub inline: bool,
    pub key: u64,
}

/// Any entry of the `resources` array, tagged by its own `type` field.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ResourceRow {
    Typed(TypedResourceRow),
    Var(VarRow),
    Keyword(KeywordRow),
}

impl ResourceRow {
    pub fn key(&self) -> u64 {
        match self {
            ResourceRow::Typed(r) => r.key,
            ResourceRow::Var(r) => r.key,
            ResourceRow::Keyword(r) => r.key,
        }
    }
}

/// A lookup table entry in the emitted rule IR.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LookupTableIr {
    pub name: String,
    pub table: String,
    pub key: Vec<String>,
    pub columns: Vec<String>,
    pub resources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file_name: Option<String>,
}

/// A single triple-slot value as it appears embedded in an antecedent or
/// consequent's `triple` field (normalized form).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum ElementIr {
    #[serde(rename = "var")]
    Var { id: String },
    #[serde(rename = "identifier")]
    Identifier { value: String },
    #[serde(rename = "keyword")]
    Keyword { value: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TripleIr {
    pub subject: ElementIr,
    pub predicate: ElementIr,
    pub object: ElementIr,
}

/// A normalized filter-expression tree. `Leaf` carries the resources-array
/// key the operand resolves to.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum FilterExprIr {
    #[serde(rename = "leaf")]
    Leaf { key: u64 },
    #[serde(rename = "binary")]
    Binary {
        lhs: Box<FilterExprIr>,
        op: String,
        rhs: Box<FilterExprIr>,
    },
}

/// Source-form antecedent, as it appears inside a rule's `antecedents` list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AntecedentIr {
    #[serde(rename = "isNot")]
    pub is_not: bool,
    pub triple: TripleIr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExprIr>,
    pub label: String,
    #[serde(rename = "normalizedLabel")]
    pub normalized_label: String,
    pub vertex: u32,
    pub parent_vertex: u32,
}

/// Source-form consequent, as it appears inside a rule's `consequents` list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConsequentIr {
    pub triple: TripleIr,
    pub label: String,
    #[serde(rename = "normalizedLabel")]
    pub normalized_label: String,
    pub vertex: u32,
}

/// A fully normalized rule, ready to be folded into the Rete network.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleIr {
    pub name: String,
    pub properties: Vec<(String, String)>,
    pub optimization: bool,
    pub salience: i64,
    pub antecedents: Vec<AntecedentIr>,
    pub consequents: Vec<ConsequentIr>,
    #[serde(rename = "authoredLabel")]
    pub authored_label: String,
    #[serde(rename = "normalizedLabel")]
    pub normalized_label: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file_name: Option<String>,
}

/// One node of the Rete DAG, in its three possible shapes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ReteNodeIr {
    Head(HeadNodeIr),
    Antecedent(AntecedentNodeIr),
    Consequent(ConsequentNodeIr),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeadNodeIr {
    pub vertex: u32,
    pub parent_vertex: u32,
    pub children_vertexes: Vec<u32>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Default for HeadNodeIr {
    fn default() -> Self {
        HeadNodeIr {
            vertex: 0,
            parent_vertex: 0,
            children_vertexes: Vec::new(),
            kind: "head_node",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AntecedentNodeIr {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "isNot")]
    pub is_not: bool,
    #[serde(rename = "normalizedLabel")]
    pub normalized_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExprIr>,
    pub vertex: u32,
    pub parent_vertex: u32,
    pub beta_relation_vars: Vec<String>,
    pub pruned_var: Vec<String>,
    pub beta_var_nodes: Vec<BetaVarNode>,
    pub children_vertexes: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salience: Option<Vec<i64>>,
    pub subject_key: u64,
    pub predicate_key: u64,
    pub object_key: u64,
}

/// A variable descriptor inside `beta_var_nodes`: either a full [`VarRow`]
/// (first bound at this vertex) or an [`AbbreviatedVarRow`] (carried from a
/// parent vertex).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum BetaVarNode {
    Full(VarRow),
    Abbreviated(AbbreviatedVarRow),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConsequentNodeIr {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "normalizedLabel")]
    pub normalized_label: String,
    pub vertex: u32,
    pub consequent_seq: u32,
    pub consequent_for_rule: String,
    pub consequent_salience: i64,
    pub subject_key: u64,
    pub predicate_key: u64,
    pub object_key: u64,
}
