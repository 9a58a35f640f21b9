use crate::lexer::TokenKind;
use crate::parser::engine::{choice, optional, repeat, ParseResult, Parser};
use crate::parser::{Node, NodeKind};

/// Program, statement, and declaration rules.
///
/// Framing punctuation and keywords are consumed without becoming
/// children; only the sub-results the generator needs are appended.
impl<'src> Parser<'src> {
    /// Program = ( FunctionDefinition / DeclarationStatement )* EndOfInput
    pub(crate) fn program(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::Program, |p, node| {
            repeat(p, node, |p, node| {
                choice(
                    p,
                    node,
                    &mut [
                        &mut |p, n| p.expect(n, Self::function_definition),
                        &mut |p, n| p.expect(n, Self::declaration_statement),
                    ],
                )
            })?;
            p.token(TokenKind::EndOfInput)?;
            Ok(())
        })
    }

    /// FunctionDefinition = FunctionDeclaration CompoundStatement
    fn function_definition(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::FunctionDefinition, |p, node| {
            p.expect(node, Self::function_declaration)?;
            p.expect(node, Self::compound_statement)
        })
    }

    /// DeclarationStatement = ( FunctionDeclaration / VariableDeclaration ) ";"
    fn declaration_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::DeclarationStatement, |p, node| {
            choice(
                p,
                node,
                &mut [
                    &mut |p, n| p.expect(n, Self::function_declaration),
                    &mut |p, n| p.expect(n, Self::variable_declaration),
                ],
            )?;
            p.token(TokenKind::Semicolon)?;
            Ok(())
        })
    }

    /// FunctionDeclaration = TypeName Identifier "(" ParameterList ")"
    fn function_declaration(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::FunctionDeclaration, |p, node| {
            p.expect(node, Self::type_name)?;
            p.expect_token(node, TokenKind::Identifier)?;
            p.token(TokenKind::LeftParen)?;
            p.expect(node, Self::parameter_list)?;
            p.token(TokenKind::RightParen)?;
            Ok(())
        })
    }

    /// ParameterList = [ Parameter ( "," Parameter )* ]
    fn parameter_list(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::ParameterList, |p, node| {
            optional(p, node, |p, node| {
                p.expect(node, Self::parameter)?;
                repeat(p, node, |p, node| {
                    p.token(TokenKind::Comma)?;
                    p.expect(node, Self::parameter)
                })
            })
        })
    }

    /// Parameter = TypeName Identifier
    fn parameter(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::Parameter, |p, node| {
            p.expect(node, Self::type_name)?;
            p.expect_token(node, TokenKind::Identifier)
        })
    }

    /// VariableDeclaration = TypeName Identifier [ "=" Expression ]
    fn variable_declaration(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::VariableDeclaration, |p, node| {
            p.expect(node, Self::type_name)?;
            p.expect_token(node, TokenKind::Identifier)?;
            optional(p, node, |p, node| {
                p.token(TokenKind::Assign)?;
                p.expect(node, Self::expression)
            })
        })
    }

    /// TypeName = "int"
    fn type_name(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::TypeName, |p, node| {
            p.expect_token(node, TokenKind::IntKeyword)
        })
    }

    /// CompoundStatement = "{" Statement* "}"
    fn compound_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::CompoundStatement, |p, node| {
            p.token(TokenKind::LeftBrace)?;
            repeat(p, node, |p, node| p.expect(node, Self::statement))?;
            p.token(TokenKind::RightBrace)?;
            Ok(())
        })
    }

    /// Statement = CompoundStatement / ExpressionStatement / IfStatement
    ///           / LoopStatement / JumpStatement / DeclarationStatement
    ///
    /// The expression alternative comes before the keyword statements;
    /// inputs such as `if (x) ...` are first tried (and rejected) as a
    /// call expression, which the backtracking engine absorbs.
    fn statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::Statement, |p, node| {
            choice(
                p,
                node,
                &mut [
                    &mut |p, n| p.expect(n, Self::compound_statement),
                    &mut |p, n| p.expect(n, Self::expression_statement),
                    &mut |p, n| p.expect(n, Self::if_statement),
                    &mut |p, n| p.expect(n, Self::loop_statement),
                    &mut |p, n| p.expect(n, Self::jump_statement),
                    &mut |p, n| p.expect(n, Self::declaration_statement),
                ],
            )
        })
    }

    /// ExpressionStatement = [ Expression ] ";"
    fn expression_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::ExpressionStatement, |p, node| {
            optional(p, node, |p, node| p.expect(node, Self::expression))?;
            p.token(TokenKind::Semicolon)?;
            Ok(())
        })
    }

    /// IfStatement = "if" "(" Expression ")" Statement [ "else" Statement ]
    fn if_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::IfStatement, |p, node| {
            p.token(TokenKind::IfKeyword)?;
            p.token(TokenKind::LeftParen)?;
            p.expect(node, Self::expression)?;
            p.token(TokenKind::RightParen)?;
            p.expect(node, Self::statement)?;
            optional(p, node, |p, node| {
                p.token(TokenKind::ElseKeyword)?;
                p.expect(node, Self::statement)
            })
        })
    }

    /// LoopStatement = WhileStatement / DoWhileStatement / ForStatement
    fn loop_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::LoopStatement, |p, node| {
            choice(
                p,
                node,
                &mut [
                    &mut |p, n| p.expect(n, Self::while_statement),
                    &mut |p, n| p.expect(n, Self::do_while_statement),
                    &mut |p, n| p.expect(n, Self::for_statement),
                ],
            )
        })
    }

    /// WhileStatement = "while" "(" Expression ")" Statement
    fn while_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::WhileStatement, |p, node| {
            p.token(TokenKind::WhileKeyword)?;
            p.token(TokenKind::LeftParen)?;
            p.expect(node, Self::expression)?;
            p.token(TokenKind::RightParen)?;
            p.expect(node, Self::statement)
        })
    }

    /// DoWhileStatement = "do" Statement "while" "(" Expression ")" ";"
    fn do_while_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::DoWhileStatement, |p, node| {
            p.token(TokenKind::DoKeyword)?;
            p.expect(node, Self::statement)?;
            p.token(TokenKind::WhileKeyword)?;
            p.token(TokenKind::LeftParen)?;
            p.expect(node, Self::expression)?;
            p.token(TokenKind::RightParen)?;
            p.token(TokenKind::Semicolon)?;
            Ok(())
        })
    }

    /// ForStatement = "for" "(" ExpressionStatement ExpressionStatement
    ///                [ Expression ] ")" Statement
    fn for_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::ForStatement, |p, node| {
            p.token(TokenKind::ForKeyword)?;
            p.token(TokenKind::LeftParen)?;
            p.expect(node, Self::expression_statement)?;
            p.expect(node, Self::expression_statement)?;
            optional(p, node, |p, node| p.expect(node, Self::expression))?;
            p.token(TokenKind::RightParen)?;
            p.expect(node, Self::statement)
        })
    }

    /// JumpStatement = ( "break" / "return" [ Expression ] ) ";"
    ///
    /// The keyword leaf is kept as the first child so the generator can
    /// dispatch on it.
    fn jump_statement(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::JumpStatement, |p, node| {
            choice(
                p,
                node,
                &mut [
                    &mut |p, n| p.expect_token(n, TokenKind::BreakKeyword),
                    &mut |p, n| {
                        p.expect_token(n, TokenKind::ReturnKeyword)?;
                        optional(p, n, |p, n| p.expect(n, Self::expression))
                    },
                ],
            )?;
            p.token(TokenKind::Semicolon)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Node {
        Parser::parse(src).expect("program should parse")
    }

    #[test]
    fn parses_a_minimal_function() {
        let program = parse("int main() { return 0; }");
        assert_eq!(program.kind, NodeKind::Program);
        assert_eq!(program.children.len(), 1);

        let def = &program.children[0];
        assert_eq!(def.kind, NodeKind::FunctionDefinition);
        let decl = &def.children[0];
        assert_eq!(decl.kind, NodeKind::FunctionDeclaration);
        assert_eq!(decl.children[1].text(), "main");
        assert_eq!(def.children[1].kind, NodeKind::CompoundStatement);
    }

    #[test]
    fn parses_globals_and_functions_in_order() {
        let program = parse("int x; int main() { return x; } int y;");
        let kinds: Vec<NodeKind> = program.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            [
                NodeKind::DeclarationStatement,
                NodeKind::FunctionDefinition,
                NodeKind::DeclarationStatement,
            ]
        );
    }

    #[test]
    fn function_declaration_collects_parameters() {
        let program = parse("int f(int a, int b);");
        let decl = &program.children[0].children[0];
        assert_eq!(decl.kind, NodeKind::FunctionDeclaration);
        let params = &decl.children[2];
        assert_eq!(params.kind, NodeKind::ParameterList);
        let names: Vec<&str> = params
            .children
            .iter()
            .map(|p| p.children[1].text())
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn variable_declaration_keeps_optional_initializer() {
        let program = parse("int x = 1 + 2;");
        let decl = &program.children[0].children[0];
        assert_eq!(decl.kind, NodeKind::VariableDeclaration);
        assert_eq!(decl.children.len(), 3);
        assert_eq!(decl.children[2].kind, NodeKind::Expression);

        let program = parse("int x;");
        let decl = &program.children[0].children[0];
        assert_eq!(decl.children.len(), 2);
    }

    #[test]
    fn if_with_and_without_else() {
        let program = parse("int main() { if (1) { } else { } if (0) { } }");
        let body = &program.children[0].children[1];
        let first = &body.children[0].children[0];
        assert_eq!(first.kind, NodeKind::IfStatement);
        assert_eq!(first.children.len(), 3);
        let second = &body.children[1].children[0];
        assert_eq!(second.children.len(), 2);
    }

    #[test]
    fn keyword_statements_win_over_expression_parses() {
        // `if (x) ...` is first attempted as a call expression statement
        // and must come out as an if statement regardless.
        let program = parse("int main() { int x; if (x) return 1; return 2; }");
        let body = &program.children[0].children[1];
        assert_eq!(body.children[1].children[0].kind, NodeKind::IfStatement);
    }

    #[test]
    fn loop_statements_parse_to_their_variants() {
        let program =
            parse("int main() { while (1) { } do { } while (0); for (;;) break; }");
        let body = &program.children[0].children[1];
        let loops: Vec<NodeKind> = body
            .children
            .iter()
            .map(|s| s.children[0].children[0].kind)
            .collect();
        assert_eq!(
            loops,
            [
                NodeKind::WhileStatement,
                NodeKind::DoWhileStatement,
                NodeKind::ForStatement,
            ]
        );
    }

    #[test]
    fn for_children_shape_depends_on_post_expression() {
        let program = parse("int main() { for (; 1; ) ; for (; 1; 2) ; }");
        let body = &program.children[0].children[1];
        let with_none = &body.children[0].children[0].children[0];
        assert_eq!(with_none.children.len(), 3);
        let with_post = &body.children[1].children[0].children[0];
        assert_eq!(with_post.children.len(), 4);
        assert_eq!(with_post.children[2].kind, NodeKind::Expression);
    }

    #[test]
    fn missing_semicolon_is_reported_at_the_right_spot() {
        let err = Parser::parse("int main() { int y; y }").unwrap_err();
        assert_eq!(err.expected, "Semicolon");
        assert_eq!(err.offset, 22);
    }

    #[test]
    fn garbage_after_program_fails() {
        assert!(Parser::parse("int main() { return 0; } @").is_err());
    }
}
