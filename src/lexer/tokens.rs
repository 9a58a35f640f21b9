use std::fmt;

/// Lexical categories of the source language.
///
/// Each category is recognized by a regular expression. Keywords refuse to
/// match when the next character would extend an identifier, so `intfoo`
/// lexes as one identifier rather than `int` followed by `foo`; the `=`
/// operator refuses a following `=` so it never eats half of `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Punctuation
    LeftParen,          // (
    RightParen,         // )
    LeftBrace,          // {
    RightBrace,         // }
    Semicolon,          // ;
    Comma,              // ,

    // Arithmetic operators
    Plus,               // +
    Minus,              // -
    Star,               // *
    Slash,              // /
    Percent,            // %

    // Shift operators
    ShiftLeft,          // <<
    ShiftRight,         // >>

    // Logical operators
    OrOr,               // ||
    AndAnd,             // &&
    Bang,               // !

    // Bitwise operators
    Pipe,               // |
    Ampersand,          // &
    Caret,              // ^
    Tilde,              // ~

    // Comparison operators
    EqualEqual,         // ==
    BangEqual,          // !=
    LessEqual,          // <=
    GreaterEqual,       // >=
    Less,               // <
    Greater,            // >

    // Assignment
    Assign,             // =

    // Keywords
    IntKeyword,
    IfKeyword,
    ElseKeyword,
    WhileKeyword,
    DoKeyword,
    ForKeyword,
    BreakKeyword,
    ReturnKeyword,
    TrueKeyword,
    FalseKeyword,

    // Literals and identifiers
    Identifier,
    Constant,

    // End of input
    EndOfInput,
}

impl TokenKind {
    /// Every category, in discriminant order (indexes the compiled-pattern
    /// cache).
    pub const ALL: [TokenKind; 40] = [
        TokenKind::LeftParen,
        TokenKind::RightParen,
        TokenKind::LeftBrace,
        TokenKind::RightBrace,
        TokenKind::Semicolon,
        TokenKind::Comma,
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::Star,
        TokenKind::Slash,
        TokenKind::Percent,
        TokenKind::ShiftLeft,
        TokenKind::ShiftRight,
        TokenKind::OrOr,
        TokenKind::AndAnd,
        TokenKind::Bang,
        TokenKind::Pipe,
        TokenKind::Ampersand,
        TokenKind::Caret,
        TokenKind::Tilde,
        TokenKind::EqualEqual,
        TokenKind::BangEqual,
        TokenKind::LessEqual,
        TokenKind::GreaterEqual,
        TokenKind::Less,
        TokenKind::Greater,
        TokenKind::Assign,
        TokenKind::IntKeyword,
        TokenKind::IfKeyword,
        TokenKind::ElseKeyword,
        TokenKind::WhileKeyword,
        TokenKind::DoKeyword,
        TokenKind::ForKeyword,
        TokenKind::BreakKeyword,
        TokenKind::ReturnKeyword,
        TokenKind::TrueKeyword,
        TokenKind::FalseKeyword,
        TokenKind::Identifier,
        TokenKind::Constant,
        TokenKind::EndOfInput,
    ];

    /// The regular expression recognizing this category, unanchored.
    pub fn pattern(self) -> &'static str {
        match self {
            TokenKind::LeftParen => r"\(",
            TokenKind::RightParen => r"\)",
            TokenKind::LeftBrace => r"\{",
            TokenKind::RightBrace => r"\}",
            TokenKind::Semicolon => r";",
            TokenKind::Comma => r",",
            TokenKind::Plus => r"\+",
            TokenKind::Minus => r"-",
            TokenKind::Star => r"\*",
            TokenKind::Slash => r"/",
            TokenKind::Percent => r"%",
            TokenKind::ShiftLeft => r"<<",
            TokenKind::ShiftRight => r">>",
            TokenKind::OrOr => r"\|\|",
            TokenKind::AndAnd => r"&&",
            TokenKind::Bang => r"!",
            TokenKind::Pipe => r"\|",
            TokenKind::Ampersand => r"&",
            TokenKind::Caret => r"\^",
            TokenKind::Tilde => r"~",
            TokenKind::EqualEqual => r"==",
            TokenKind::BangEqual => r"!=",
            TokenKind::LessEqual => r"<=",
            TokenKind::GreaterEqual => r">=",
            TokenKind::Less => r"<",
            TokenKind::Greater => r">",
            TokenKind::Assign => r"=",
            TokenKind::IntKeyword => r"int",
            TokenKind::IfKeyword => r"if",
            TokenKind::ElseKeyword => r"else",
            TokenKind::WhileKeyword => r"while",
            TokenKind::DoKeyword => r"do",
            TokenKind::ForKeyword => r"for",
            TokenKind::BreakKeyword => r"break",
            TokenKind::ReturnKeyword => r"return",
            TokenKind::TrueKeyword => r"true",
            TokenKind::FalseKeyword => r"false",
            TokenKind::Identifier => r"[A-Za-z_][A-Za-z0-9_]*",
            TokenKind::Constant => r"[0-9]+",
            TokenKind::EndOfInput => r"\z",
        }
    }

    /// Human-readable category name, used in diagnostics and AST printing.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::LeftParen => "LeftParen",
            TokenKind::RightParen => "RightParen",
            TokenKind::LeftBrace => "LeftBrace",
            TokenKind::RightBrace => "RightBrace",
            TokenKind::Semicolon => "Semicolon",
            TokenKind::Comma => "Comma",
            TokenKind::Plus => "Plus",
            TokenKind::Minus => "Minus",
            TokenKind::Star => "Star",
            TokenKind::Slash => "Slash",
            TokenKind::Percent => "Percent",
            TokenKind::ShiftLeft => "ShiftLeft",
            TokenKind::ShiftRight => "ShiftRight",
            TokenKind::OrOr => "OrOr",
            TokenKind::AndAnd => "AndAnd",
            TokenKind::Bang => "Bang",
            TokenKind::Pipe => "Pipe",
            TokenKind::Ampersand => "Ampersand",
            TokenKind::Caret => "Caret",
            TokenKind::Tilde => "Tilde",
            TokenKind::EqualEqual => "EqualEqual",
            TokenKind::BangEqual => "BangEqual",
            TokenKind::LessEqual => "LessEqual",
            TokenKind::GreaterEqual => "GreaterEqual",
            TokenKind::Less => "Less",
            TokenKind::Greater => "Greater",
            TokenKind::Assign => "Assign",
            TokenKind::IntKeyword => "IntKeyword",
            TokenKind::IfKeyword => "IfKeyword",
            TokenKind::ElseKeyword => "ElseKeyword",
            TokenKind::WhileKeyword => "WhileKeyword",
            TokenKind::DoKeyword => "DoKeyword",
            TokenKind::ForKeyword => "ForKeyword",
            TokenKind::BreakKeyword => "BreakKeyword",
            TokenKind::ReturnKeyword => "ReturnKeyword",
            TokenKind::TrueKeyword => "TrueKeyword",
            TokenKind::FalseKeyword => "FalseKeyword",
            TokenKind::Identifier => "Identifier",
            TokenKind::Constant => "Constant",
            TokenKind::EndOfInput => "EndOfInput",
        }
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::IntKeyword
                | TokenKind::IfKeyword
                | TokenKind::ElseKeyword
                | TokenKind::WhileKeyword
                | TokenKind::DoKeyword
                | TokenKind::ForKeyword
                | TokenKind::BreakKeyword
                | TokenKind::ReturnKeyword
                | TokenKind::TrueKeyword
                | TokenKind::FalseKeyword
        )
    }

    /// True if `next` appearing directly after a match invalidates it.
    pub(crate) fn blocks_follow(self, next: char) -> bool {
        if self.is_keyword() {
            return next.is_ascii_alphanumeric() || next == '_';
        }
        matches!(self, TokenKind::Assign) && next == '='
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
