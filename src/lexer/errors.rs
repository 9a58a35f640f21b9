use thiserror::Error;

/// A token category refused to match at an input position.
///
/// Inside the parsing engine this is a recoverable signal; it only becomes
/// user-visible when no enclosing alternative absorbs it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {token} at offset {offset}")]
pub struct LexError {
    /// Name of the category that failed to match.
    pub token: &'static str,
    /// Byte offset (after whitespace skipping) the match was attempted at.
    pub offset: usize,
}
