//! # Compiler Errors
//!
//! Internal error type for failures that are not part of the textual
//! diagnostic stream accumulated on [`crate::context::Context`]. Diagnostics
//! that users are meant to see (syntax errors, semantic errors) are plain
//! `String`s in the exact formats mandated by the JetRule error-message
//! families; this type is reserved for invariant violations and provider
//! failures that should never reach a well-formed compilation.

use thiserror::Error;

/// Errors surfaced by library-internal operations outside the normal
/// per-file diagnostic stream.
#[derive(Debug, Error)]
pub enum CompileError {
    /// An `import "name";` directive referenced a name the [`crate::input_provider::InputProvider`]
    /// could not resolve.
    #[error("import not found: '{0}'")]
    ImportNotFound(String),

    /// An invariant the compiler assumes internally did not hold. Should
    /// never surface in practice; treated as [`spec.md`]'s `InternalError`
    /// kind.
    #[error("internal compiler error: {0}")]
    Internal(String),
}
