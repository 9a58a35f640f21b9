use crate::lexer::TokenKind;
use std::fmt;

/// Type tag carried by every syntax-tree node: one variant per grammar rule
/// plus `Token` for leaves produced by the token engine. The enum
/// discriminant is the stable type tag used for dispatch during code
/// generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Program,
    FunctionDefinition,
    FunctionDeclaration,
    ParameterList,
    Parameter,
    VariableDeclaration,
    DeclarationStatement,
    TypeName,
    CompoundStatement,
    Statement,
    ExpressionStatement,
    IfStatement,
    LoopStatement,
    WhileStatement,
    DoWhileStatement,
    ForStatement,
    JumpStatement,
    Expression,
    AssignmentExpression,
    OrExpression,
    AndExpression,
    BitOrExpression,
    BitXorExpression,
    BitAndExpression,
    EqualityExpression,
    RelationalExpression,
    ShiftExpression,
    AdditiveExpression,
    MultiplicativeExpression,
    UnaryExpression,
    UnaryOperator,
    PostfixExpression,
    CallArguments,
    PrimaryExpression,
    Token(TokenKind),
}

impl NodeKind {
    /// Human-readable rule or token name, used for diagnostic printing.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Program => "Program",
            NodeKind::FunctionDefinition => "FunctionDefinition",
            NodeKind::FunctionDeclaration => "FunctionDeclaration",
            NodeKind::ParameterList => "ParameterList",
            NodeKind::Parameter => "Parameter",
            NodeKind::VariableDeclaration => "VariableDeclaration",
            NodeKind::DeclarationStatement => "DeclarationStatement",
            NodeKind::TypeName => "TypeName",
            NodeKind::CompoundStatement => "CompoundStatement",
            NodeKind::Statement => "Statement",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::IfStatement => "IfStatement",
            NodeKind::LoopStatement => "LoopStatement",
            NodeKind::WhileStatement => "WhileStatement",
            NodeKind::DoWhileStatement => "DoWhileStatement",
            NodeKind::ForStatement => "ForStatement",
            NodeKind::JumpStatement => "JumpStatement",
            NodeKind::Expression => "Expression",
            NodeKind::AssignmentExpression => "AssignmentExpression",
            NodeKind::OrExpression => "OrExpression",
            NodeKind::AndExpression => "AndExpression",
            NodeKind::BitOrExpression => "BitOrExpression",
            NodeKind::BitXorExpression => "BitXorExpression",
            NodeKind::BitAndExpression => "BitAndExpression",
            NodeKind::EqualityExpression => "EqualityExpression",
            NodeKind::RelationalExpression => "RelationalExpression",
            NodeKind::ShiftExpression => "ShiftExpression",
            NodeKind::AdditiveExpression => "AdditiveExpression",
            NodeKind::MultiplicativeExpression => "MultiplicativeExpression",
            NodeKind::UnaryExpression => "UnaryExpression",
            NodeKind::UnaryOperator => "UnaryOperator",
            NodeKind::PostfixExpression => "PostfixExpression",
            NodeKind::CallArguments => "CallArguments",
            NodeKind::PrimaryExpression => "PrimaryExpression",
            NodeKind::Token(kind) => kind.name(),
        }
    }
}

/// One node of the syntax tree.
///
/// Rule nodes own an ordered list of children; token nodes carry the exact
/// matched text instead. A node returned by its rule holds exactly the
/// children of the committed parse attempt; children appended during a
/// rolled-back alternative are truncated away before the rule returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    text: Option<String>,
}

impl Node {
    pub(crate) fn rule(kind: NodeKind) -> Self {
        Node {
            kind,
            children: Vec::new(),
            text: None,
        }
    }

    pub(crate) fn leaf(kind: TokenKind, text: String) -> Self {
        Node {
            kind: NodeKind::Token(kind),
            children: Vec::new(),
            text: Some(text),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_token(&self, kind: TokenKind) -> bool {
        self.kind == NodeKind::Token(kind)
    }

    /// Captured text of a token node; empty for rule nodes.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Node {
    /// Bracketed tree form: `["Rule", child, ...]` / `["Token", "text"]`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "[{:?}, {:?}]", self.name(), text),
            None => {
                write!(f, "[{:?}", self.name())?;
                for child in &self.children {
                    write!(f, ", {child}")?;
                }
                write!(f, "]")
            }
        }
    }
}
