//! # Import Driver
//!
//! Walks the `import "name";` graph depth-first starting from a root file,
//! parsing each file at most once per compilation (a re-visited name is
//! skipped silently: no cycle error, the first parse is reused). Produces
//! one merged declaration list in traversal order — child-file
//! declarations land exactly where their `import` statement appeared in
//! the parent, which is what keeps symbol-table key assignment in the
//! depth-first order the language requires.
//!
//! Error ordering: a file's own diagnostics are appended only after every
//! file it imports has been fully visited, so an imported file's errors
//! always precede the errors of the file that imported it.

use std::collections::HashSet;

use crate::ast::Declaration;
use crate::input_provider::InputProvider;
use crate::parser;

/// Result of walking the import graph from one root file.
pub struct ImportResult {
    pub declarations: Vec<Declaration>,
    /// `imports[file] = [child1, child2, ...]` in import-declaration order,
    /// one entry per file actually visited (the root included).
    pub imports: Vec<(String, Vec<String>)>,
    pub errors: Vec<String>,
}

/// Drives import resolution starting at `root_name`, fetched from
/// `provider`.
pub fn drive(root_name: &str, provider: &dyn InputProvider) -> ImportResult {
    let mut visited = HashSet::new();
    let mut imports = Vec::new();
    let mut declarations = Vec::new();
    let mut errors = Vec::new();
    visit(
        root_name,
        provider,
        &mut visited,
        &mut imports,
        &mut declarations,
        &mut errors,
    );
    ImportResult {
        declarations,
        imports,
        errors,
    }
}

fn visit(
    name: &str,
    provider: &dyn InputProvider,
    visited: &mut HashSet<String>,
    imports: &mut Vec<(String, Vec<String>)>,
    declarations: &mut Vec<Declaration>,
    errors: &mut Vec<String>,
) {
    if visited.contains(name) {
        return;
    }
    visited.insert(name.to_string());

    let source = match provider.read(name) {
        Ok(s) => s,
        Err(_) => {
            errors.push(format!("Error: import '{name}' could not be resolved"));
            return;
        }
    };

    let (file, own_errors) = parser::parse(&source, Some(name.to_string()));

    let mut children = Vec::new();
    for decl in file.declarations {
        if let Declaration::Import(imp) = &decl {
            children.push(imp.name.clone());
            visit(&imp.name, provider, visited, imports, declarations, errors);
            continue;
        }
        declarations.push(decl);
    }

    imports.push((name.to_string(), children));
    errors.extend(own_errors);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_provider::MapInputProvider;

    #[test]
    fn merges_declarations_depth_first() {
        let provider = MapInputProvider::new()
            .with_file("main", "int a = 1;\nimport \"child\";\nint b = 2;")
            .with_file("child", "int c = 3;");
        let result = drive("main", &provider);
        let ids: Vec<String> = result
            .declarations
            .iter()
            .filter_map(|d| match d {
                Declaration::Resource(r) => Some(r.id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn records_import_graph() {
        let provider = MapInputProvider::new()
            .with_file("main", "import \"child\";")
            .with_file("child", "int c = 3;");
        let result = drive("main", &provider);
        assert_eq!(
            result.imports,
            vec![
                ("child".to_string(), vec![]),
                ("main".to_string(), vec!["child".to_string()]),
            ]
        );
    }

    #[test]
    fn revisiting_same_file_is_skipped_silently() {
        let provider = MapInputProvider::new()
            .with_file("main", "import \"shared\";\nimport \"shared\";")
            .with_file("shared", "int s = 1;");
        let result = drive("main", &provider);
        let shared_count = result
            .declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Resource(r) if r.id == "s"))
            .count();
        assert_eq!(shared_count, 1);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn imported_file_errors_precede_importer_errors() {
        let provider = MapInputProvider::new()
            .with_file("main", "import \"child\";\nbad")
            .with_file("child", "alsoBad");
        let result = drive("main", &provider);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("'alsoBad'"));
        assert!(result.errors[1].contains("'bad'"));
    }
}
