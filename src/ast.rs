//! # Raw AST
//!
//! Parse-tree types produced directly by [`crate::parser`], before symbol
//! resolution or normalization. Variables here still carry their
//! as-authored names; no `key` has been assigned yet.

/// A declared typed-resource kind, from the typed-resource keyword that
/// introduced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Int,
    Uint,
    Long,
    Ulong,
    Double,
    Text,
    Date,
    Datetime,
    Resource,
    VolatileResource,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Int => "int",
            ResourceType::Uint => "uint",
            ResourceType::Long => "long",
            ResourceType::Ulong => "ulong",
            ResourceType::Double => "double",
            ResourceType::Text => "text",
            ResourceType::Date => "date",
            ResourceType::Datetime => "datetime",
            ResourceType::Resource => "resource",
            ResourceType::VolatileResource => "volatile_resource",
        }
    }
}

/// `<type> <id> = <literal>;`
#[derive(Debug, Clone)]
pub struct ResourceDecl {
    pub kind: ResourceType,
    pub id: String,
    pub value: String,
    pub source_file_name: Option<String>,
    pub line: usize,
    pub column: usize,
}

/// `lookup_table <id> = { table_name="...", key=[...], columns=[cResId=col, ...] };`
///
/// Each `columns` entry pairs the resource id a rule will reference
/// (`cResId`) with the backing column name it is bound to (`col`) — this is
/// how a lookup table's `resources` list (data model §3) is authored.
#[derive(Debug, Clone)]
pub struct LookupTableDecl {
    pub name: String,
    pub table: String,
    pub key: Vec<String>,
    pub columns: Vec<(String, String)>,
    pub source_file_name: Option<String>,
    pub line: usize,
    pub column: usize,
}

/// `import "name";`
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub name: String,
}

/// `@JetCompilerDirective <key> = "<value>";`
#[derive(Debug, Clone)]
pub struct DirectiveDecl {
    pub key: String,
    pub value: String,
}

/// An element occupying one of the three triple slots, as authored.
#[derive(Debug, Clone, PartialEq)]
pub enum RawElement {
    Var(String),
    Identifier(String),
    Keyword(String),
    IntLiteral(String),
    FloatLiteral(String),
    StringLiteral(String),
}

/// `(subject predicate object)`, as authored.
#[derive(Debug, Clone)]
pub struct RawTriple {
    pub subject: RawElement,
    pub predicate: RawElement,
    pub object: RawElement,
}

/// A filter expression, as authored.
#[derive(Debug, Clone)]
pub enum RawFilterExpr {
    Leaf(RawElement),
    Binary {
        lhs: Box<RawFilterExpr>,
        op: String,
        rhs: Box<RawFilterExpr>,
    },
}

/// One antecedent, as authored: `(s p o)[.\[filter\]]`.
#[derive(Debug, Clone)]
pub struct RawAntecedent {
    pub is_not: bool,
    pub triple: RawTriple,
    pub filter: Option<RawFilterExpr>,
}

/// One consequent, as authored: `(s p o)`.
#[derive(Debug, Clone)]
pub struct RawConsequent {
    pub triple: RawTriple,
}

/// `[Name[, prop=val]*]: ant.ant...antN -> con.con...conN;`
#[derive(Debug, Clone)]
pub struct RawRule {
    pub name: String,
    pub properties: Vec<(String, String)>,
    pub antecedents: Vec<RawAntecedent>,
    pub consequents: Vec<RawConsequent>,
    pub source_file_name: Option<String>,
    pub line: usize,
    pub column: usize,
}

/// Any top-level declaration in a single parsed file.
#[derive(Debug, Clone)]
pub enum Declaration {
    Resource(ResourceDecl),
    LookupTable(LookupTableDecl),
    Import(ImportDecl),
    Directive(DirectiveDecl),
    Rule(RawRule),
}

/// The raw AST of a single parsed file: its declarations in source order.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub declarations: Vec<Declaration>,
}
