use thiserror::Error;

/// Scope and signature errors. All of these are fatal: they are raised
/// eagerly at the point of declaration or use and abort code generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("variable `{0}` already declared in this scope")]
    DuplicateVariable(String),

    #[error("undefined function `{0}`")]
    UndefinedFunction(String),

    #[error("function `{0}` already declared with a different signature")]
    ConflictingSignature(String),

    #[error("function `{name}` expects {expected} arguments, got {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("no function call is being prepared")]
    NoPendingCall,
}
