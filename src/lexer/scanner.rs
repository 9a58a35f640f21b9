use crate::lexer::{LexError, TokenKind};
use regex::Regex;
use std::sync::OnceLock;

/// A successful token match: the exact matched text and the byte offset
/// just past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub text: String,
    pub end: usize,
}

fn compiled(kind: TokenKind) -> &'static Regex {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        TokenKind::ALL
            .iter()
            .map(|kind| {
                Regex::new(&format!(r"\A(?:{})", kind.pattern()))
                    .expect("token pattern must compile")
            })
            .collect()
    });
    &patterns[kind as usize]
}

/// First non-whitespace byte offset at or after `pos`.
pub fn skip_whitespace(src: &str, pos: usize) -> usize {
    src.as_bytes()[pos..]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(src.len(), |i| pos + i)
}

/// Match one lexical category at `pos`, skipping leading whitespace.
///
/// Pure: failure mutates nothing and reports the category name together
/// with the byte offset the match was attempted at.
pub fn match_token(kind: TokenKind, src: &str, pos: usize) -> Result<TokenMatch, LexError> {
    let start = skip_whitespace(src, pos);
    let refused = LexError {
        token: kind.name(),
        offset: start,
    };

    let Some(found) = compiled(kind).find(&src[start..]) else {
        return Err(refused);
    };
    let end = start + found.end();

    if let Some(next) = src[end..].chars().next() {
        if kind.blocks_follow(next) {
            return Err(refused);
        }
    }

    Ok(TokenMatch {
        text: found.as_str().to_string(),
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_leading_whitespace() {
        let m = match_token(TokenKind::Identifier, "  \t\n foo", 0).unwrap();
        assert_eq!(m.text, "foo");
        assert_eq!(m.end, 8);
    }

    #[test]
    fn keyword_requires_word_boundary() {
        assert!(match_token(TokenKind::IntKeyword, "intfoo", 0).is_err());
        assert!(match_token(TokenKind::IntKeyword, "int_x", 0).is_err());

        let m = match_token(TokenKind::IntKeyword, "int foo", 0).unwrap();
        assert_eq!(m.text, "int");
        assert_eq!(m.end, 3);

        // At end of input the keyword still matches.
        assert!(match_token(TokenKind::IntKeyword, "int", 0).is_ok());

        // The same text is a perfectly good identifier.
        let m = match_token(TokenKind::Identifier, "intfoo", 0).unwrap();
        assert_eq!(m.text, "intfoo");
    }

    #[test]
    fn assignment_never_splits_equality() {
        assert!(match_token(TokenKind::Assign, "== 1", 0).is_err());
        assert!(match_token(TokenKind::Assign, "= 1", 0).is_ok());
        assert!(match_token(TokenKind::EqualEqual, "== 1", 0).is_ok());
    }

    #[test]
    fn failure_reports_post_whitespace_offset() {
        let err = match_token(TokenKind::Semicolon, "   }", 0).unwrap_err();
        assert_eq!(err.token, "Semicolon");
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn end_of_input_only_matches_at_end() {
        assert!(match_token(TokenKind::EndOfInput, "x", 0).is_err());
        let m = match_token(TokenKind::EndOfInput, "x  ", 1).unwrap();
        assert_eq!(m.text, "");
        assert_eq!(m.end, 3);
    }

    #[test]
    fn constant_matches_digits_only() {
        let m = match_token(TokenKind::Constant, "42+1", 0).unwrap();
        assert_eq!(m.text, "42");
        assert_eq!(m.end, 2);
        assert!(match_token(TokenKind::Constant, "x", 0).is_err());
    }
}
