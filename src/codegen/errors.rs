use crate::symbol::SymbolError;
use thiserror::Error;

/// Code generation errors. All fatal: generation stops at the first one
/// and no listing is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error("call target must be a function name")]
    CallTargetNotName,

    #[error("`break` outside of a loop")]
    BreakOutsideLoop,

    #[error("invalid integer constant `{0}`")]
    BadConstant(String),

    #[error("malformed syntax tree: {0}")]
    MalformedTree(&'static str),
}
