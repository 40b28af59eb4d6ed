//! # Symbol table
//!
//! Holds every resource and lookup table declared across a compilation,
//! each assigned a monotonic integer `key` the moment it is first seen.
//! The same counter is shared by resource declarations, variable
//! occurrences encountered during normalization, and Rete node emission, so
//! keys are unique across the whole compiled artifact, not just within one
//! namespace.

use std::collections::HashMap;

use crate::ast::ResourceType;

/// A resource declared by a typed-resource statement, or synthesized for a
/// lookup table's bound columns, or inferred from a rule triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub key: u64,
    pub id: String,
    pub kind: ResourceType,
    pub value: Option<String>,
    pub source_file_name: Option<String>,
}

/// A declared lookup table, plus the resources its `columns` list binds.
#[derive(Debug, Clone)]
pub struct LookupTable {
    pub key: u64,
    pub name: String,
    pub table: String,
    pub key_columns: Vec<String>,
    /// `(resource id, backing column name)` pairs, in declared order.
    pub columns: Vec<(String, String)>,
}

/// Assigns and tracks monotonic keys for every resource and lookup table
/// in a compilation.
#[derive(Debug, Default)]
pub struct SymbolTable {
    next_key: u64,
    resources: HashMap<String, Resource>,
    resource_order: Vec<String>,
    lookup_tables: HashMap<String, LookupTable>,
    lookup_table_order: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    fn next_key(&mut self) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        key
    }

    /// Allocates the next global key without declaring a resource entry.
    /// Used for `var`/`keyword` resource rows emitted during normalization.
    pub fn alloc_key(&mut self) -> u64 {
        self.next_key()
    }

    /// Declares a resource with an explicit typed value. Returns `None` (and
    /// leaves the existing entry untouched) if `id` is already declared,
    /// since JetRule resource ids must be unique across a compilation.
    pub fn declare_resource(
        &mut self,
        id: &str,
        kind: ResourceType,
        value: Option<String>,
        source_file_name: Option<String>,
    ) -> Option<u64> {
        if self.resources.contains_key(id) {
            return None;
        }
        let key = self.next_key();
        self.resources.insert(
            id.to_string(),
            Resource {
                key,
                id: id.to_string(),
                kind,
                value,
                source_file_name,
            },
        );
        self.resource_order.push(id.to_string());
        Some(key)
    }

    /// Looks up an already-declared resource by id, or implicitly declares
    /// it as an untyped `resource` the first time a rule triple references
    /// an identifier that was never given a typed-resource statement.
    pub fn resource_or_implicit(&mut self, id: &str) -> u64 {
        if let Some(r) = self.resources.get(id) {
            return r.key;
        }
        self.declare_resource(id, ResourceType::Resource, None, None)
            .expect("just checked absence")
    }

    pub fn get_resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn resources_in_order(&self) -> impl Iterator<Item = &Resource> {
        self.resource_order.iter().map(move |id| &self.resources[id])
    }

    /// Registers a lookup table's metadata. The resource rows for the
    /// table itself and for each bound column are the caller's
    /// responsibility (see `context::build_context`), since their exact
    /// `value` fields depend on declaration-site text the symbol table
    /// doesn't retain.
    pub fn declare_lookup_table(
        &mut self,
        name: &str,
        table: String,
        key_columns: Vec<String>,
        columns: Vec<(String, String)>,
    ) -> Option<u64> {
        if self.lookup_tables.contains_key(name) {
            return None;
        }
        let key = self.next_key();
        self.lookup_tables.insert(
            name.to_string(),
            LookupTable {
                key,
                name: name.to_string(),
                table,
                key_columns,
                columns,
            },
        );
        self.lookup_table_order.push(name.to_string());
        Some(key)
    }

    pub fn lookup_tables_in_order(&self) -> impl Iterator<Item = &LookupTable> {
        self.lookup_table_order
            .iter()
            .map(move |name| &self.lookup_tables[name])
    }

    pub fn get_lookup_table(&self, name: &str) -> Option<&LookupTable> {
        self.lookup_tables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_monotonic_keys_across_declarations() {
        let mut table = SymbolTable::new();
        let k1 = table.declare_resource("r1", ResourceType::Int, Some("1".into()), None).unwrap();
        let k2 = table.declare_resource("r2", ResourceType::Text, Some("\"a\"".into()), None).unwrap();
        assert!(k2 > k1);
    }

    #[test]
    fn duplicate_declaration_returns_none() {
        let mut table = SymbolTable::new();
        table.declare_resource("r1", ResourceType::Int, Some("1".into()), None);
        assert!(table
            .declare_resource("r1", ResourceType::Int, Some("2".into()), None)
            .is_none());
    }

    #[test]
    fn implicit_resource_is_declared_once() {
        let mut table = SymbolTable::new();
        let k1 = table.resource_or_implicit("acme:Thing");
        let k2 = table.resource_or_implicit("acme:Thing");
        assert_eq!(k1, k2);
    }

    #[test]
    fn lookup_table_registers_its_column_bindings() {
        let mut table = SymbolTable::new();
        table.declare_lookup_table(
            "lkup1",
            "claims".to_string(),
            vec!["claimId".to_string()],
            vec![("acme:claimId".to_string(), "claim_id".to_string())],
        );
        let lt = table.get_lookup_table("lkup1").unwrap();
        assert_eq!(lt.columns, vec![("acme:claimId".to_string(), "claim_id".to_string())]);
    }
}
