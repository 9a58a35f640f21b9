use thiserror::Error;

/// A fatal syntax error: no alternative anywhere in the grammar could
/// accept the input. `rule` names the rule that was being parsed when the
/// deepest token match failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected} in {rule} at offset {offset}")]
pub struct ParseError {
    pub expected: &'static str,
    pub rule: &'static str,
    pub offset: usize,
}
