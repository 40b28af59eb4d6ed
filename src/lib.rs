//! # JetRule Compiler
//!
//! Compiles JetRule source — typed resources, lookup tables, and
//! forward-chaining rules over RDF-style triples — into two JSON-ready
//! artifacts: the normalized rule IR (`jetRules`) and the shared-prefix
//! Rete network IR (`jetReteNodes`).
//!
//! ## Pipeline Architecture
//!
//! ```text
//! InputProvider
//!     ↓
//! Lexer / Parser            → per-file AST, panic-mode diagnostics
//!     ↓
//! Import Driver              → merged AST, import graph
//!     ↓
//! Symbol Table                → resources, lookup tables, monotonic keys
//!     ↓
//! Semantic Validator          → predicate-identifier checks
//!     ↓
//! Normalizer                  → RuleIr (renamed vars, folded filters)
//!     ↓
//! Rete Builder                → ReteNodeIr (shared-prefix DAG)
//!     ↓
//! Context                     → jetRules / jetReteNodes views
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use jetrule_compiler::{compile_jet_rule, CompilerOptions};
//!
//! let source = r#"
//!     resource rdf:type = "rdf:type";
//!     resource acme:Claim = "acme:Claim";
//!     [Rule1]: (?c1 rdf:type acme:Claim) -> (?c1 rdf:type acme:Claim);
//! "#;
//!
//! let ctx = compile_jet_rule(source, &CompilerOptions::default());
//! assert!(!ctx.has_error());
//! let rules_json = ctx.jet_rules_json().unwrap();
//! let rete_json = ctx.jet_rete_nodes_json().unwrap();
//! ```
//!
//! Multi-file compilations (`import "other";`) go through
//! [`compile_jet_rule_file`] with an [`InputProvider`] that knows how to
//! resolve an import name to source text — [`FileSystemInputProvider`] for
//! `.jr` files on disk, [`MapInputProvider`] for in-memory fixtures.
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `lexer` | Source text → tokens |
//! | `parser` | Tokens → per-file AST, with panic-mode error recovery |
//! | `ast` | Raw AST types produced by the parser |
//! | `input_provider` | Resolves an import name to source text |
//! | `import_driver` | Depth-first `import` graph walk, AST merging |
//! | `symbol_table` | Resource/lookup-table registry, monotonic keys |
//! | `validator` | Predicate-identifier semantic checks |
//! | `normalizer` | Variable renaming, filter folding, resource extraction |
//! | `rete` | Shared-prefix Rete DAG construction |
//! | `ir` | Normalized, JSON-serializable IR types |
//! | `context` | Orchestrates the pipeline, holds the compiled result |
//! | `config` | `CompilerOptions` |
//! | `error` | `CompileError` |

pub mod ast;
pub mod config;
pub mod context;
pub mod error;
pub mod import_driver;
pub mod input_provider;
pub mod ir;
pub mod lexer;
pub mod normalizer;
pub mod parser;
pub mod rete;
pub mod symbol_table;
pub mod validator;

pub use config::CompilerOptions;
pub use context::{compile_jet_rule, compile_jet_rule_file, Context, JetReteNodesView, JetRulesView};
pub use error::CompileError;
pub use input_provider::{FileSystemInputProvider, InputProvider, MapInputProvider};
