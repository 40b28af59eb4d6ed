//! # Compiler Options
//!
//! Small ambient configuration layer, mirroring the teacher's
//! `OptimizationConfig`/`Config` pattern. Most JetRule options are decided
//! in-source via `@JetCompilerDirective`; this struct carries the defaults
//! an outer caller may override before a compilation starts.

/// Compiler-wide options. Individual `.jr` files may override
/// `extract_resources_from_rules` in-source via
/// `@JetCompilerDirective extract_resources_from_rules = "true";`, which
/// takes precedence over this default for the scope of that file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Default value of the `extract_resources_from_rules` directive when
    /// a source file never sets it explicitly.
    pub extract_resources_from_rules: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            extract_resources_from_rules: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_does_not_extract_resources() {
        assert!(!CompilerOptions::default().extract_resources_from_rules);
    }
}
