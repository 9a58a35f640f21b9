use crate::lexer::TokenKind;
use crate::parser::engine::{choice, optional, repeat, ParseResult, Parser};
use crate::parser::{Node, NodeKind};

/// Expression rules, one per precedence tier (lowest binds first).
///
/// Tiers with a single operator (`||`, `&&`, `|`, `^`, `&`) do not record
/// the operator leaf; tiers with several capture it between the operands so
/// the generator knows which instruction to fold with.
impl<'src> Parser<'src> {
    /// Expression = AssignmentExpression
    pub(crate) fn expression(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::Expression, |p, node| {
            p.expect(node, Self::assignment_expression)
        })
    }

    /// AssignmentExpression = ( Identifier "=" )* OrExpression
    ///
    /// Only a bare identifier may appear left of `=`; the value expression
    /// starts at the logical-or tier.
    pub(crate) fn assignment_expression(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::AssignmentExpression, |p, node| {
            repeat(p, node, |p, node| {
                p.expect_token(node, TokenKind::Identifier)?;
                p.expect_token(node, TokenKind::Assign)
            })?;
            p.expect(node, Self::or_expression)
        })
    }

    /// Ordered attempt of one operator out of `operators`; a token match
    /// has no side effects on failure, so no checkpoint is needed.
    fn operator(
        &mut self,
        node: &mut Node,
        operators: &[TokenKind],
        capture: bool,
    ) -> ParseResult<()> {
        let mut last = None;
        for &op in operators {
            match self.token(op) {
                Ok(leaf) => {
                    if capture {
                        node.children.push(leaf);
                    }
                    return Ok(());
                }
                Err(err) => last = Some(err),
            }
        }
        Err(last.expect("operator set is never empty"))
    }

    /// One left-folding binary tier: `next ( op next )*`.
    fn binary_tier(
        &mut self,
        kind: NodeKind,
        operators: &'static [TokenKind],
        capture: bool,
        next: fn(&mut Self) -> ParseResult<Node>,
    ) -> ParseResult<Node> {
        self.rule(kind, |p, node| {
            p.expect(node, next)?;
            repeat(p, node, |p, node| {
                p.operator(node, operators, capture)?;
                p.expect(node, next)
            })
        })
    }

    fn or_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::OrExpression,
            &[TokenKind::OrOr],
            false,
            Self::and_expression,
        )
    }

    fn and_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::AndExpression,
            &[TokenKind::AndAnd],
            false,
            Self::bit_or_expression,
        )
    }

    fn bit_or_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::BitOrExpression,
            &[TokenKind::Pipe],
            false,
            Self::bit_xor_expression,
        )
    }

    fn bit_xor_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::BitXorExpression,
            &[TokenKind::Caret],
            false,
            Self::bit_and_expression,
        )
    }

    fn bit_and_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::BitAndExpression,
            &[TokenKind::Ampersand],
            false,
            Self::equality_expression,
        )
    }

    fn equality_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::EqualityExpression,
            &[TokenKind::EqualEqual, TokenKind::BangEqual],
            true,
            Self::relational_expression,
        )
    }

    fn relational_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::RelationalExpression,
            &[
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::Greater,
            ],
            true,
            Self::shift_expression,
        )
    }

    fn shift_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::ShiftExpression,
            &[TokenKind::ShiftLeft, TokenKind::ShiftRight],
            true,
            Self::additive_expression,
        )
    }

    fn additive_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::AdditiveExpression,
            &[TokenKind::Plus, TokenKind::Minus],
            true,
            Self::multiplicative_expression,
        )
    }

    fn multiplicative_expression(&mut self) -> ParseResult<Node> {
        self.binary_tier(
            NodeKind::MultiplicativeExpression,
            &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
            true,
            Self::unary_expression,
        )
    }

    /// UnaryExpression = PostfixExpression / UnaryOperator UnaryExpression
    fn unary_expression(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::UnaryExpression, |p, node| {
            choice(
                p,
                node,
                &mut [
                    &mut |p, n| p.expect(n, Self::postfix_expression),
                    &mut |p, n| {
                        p.expect(n, Self::unary_operator)?;
                        p.expect(n, Self::unary_expression)
                    },
                ],
            )
        })
    }

    /// UnaryOperator = "+" / "-" / "!" / "~"
    fn unary_operator(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::UnaryOperator, |p, node| {
            p.operator(
                node,
                &[
                    TokenKind::Plus,
                    TokenKind::Minus,
                    TokenKind::Bang,
                    TokenKind::Tilde,
                ],
                true,
            )
        })
    }

    /// PostfixExpression = PrimaryExpression CallArguments*
    fn postfix_expression(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::PostfixExpression, |p, node| {
            p.expect(node, Self::primary_expression)?;
            repeat(p, node, |p, node| p.expect(node, Self::call_arguments))
        })
    }

    /// CallArguments = "(" [ AssignmentExpression ( "," AssignmentExpression )* ] ")"
    fn call_arguments(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::CallArguments, |p, node| {
            p.token(TokenKind::LeftParen)?;
            optional(p, node, |p, node| {
                p.expect(node, Self::assignment_expression)?;
                repeat(p, node, |p, node| {
                    p.token(TokenKind::Comma)?;
                    p.expect(node, Self::assignment_expression)
                })
            })?;
            p.token(TokenKind::RightParen)?;
            Ok(())
        })
    }

    /// PrimaryExpression = Identifier / Constant / "true" / "false"
    ///                   / "(" Expression ")"
    fn primary_expression(&mut self) -> ParseResult<Node> {
        self.rule(NodeKind::PrimaryExpression, |p, node| {
            choice(
                p,
                node,
                &mut [
                    &mut |p, n| p.expect_token(n, TokenKind::Identifier),
                    &mut |p, n| p.expect_token(n, TokenKind::Constant),
                    &mut |p, n| p.expect_token(n, TokenKind::TrueKeyword),
                    &mut |p, n| p.expect_token(n, TokenKind::FalseKeyword),
                    &mut |p, n| {
                        p.token(TokenKind::LeftParen)?;
                        p.expect(n, Self::expression)?;
                        p.token(TokenKind::RightParen)?;
                        Ok(())
                    },
                ],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(src: &str) -> Node {
        let mut p = Parser::new(src);
        p.expression().expect("expression should parse")
    }

    /// Walk down single-child tier wrappers to the first interesting node.
    fn unwrap_tiers(node: &Node) -> &Node {
        let mut cur = node;
        while cur.children.len() == 1
            && !matches!(cur.kind, NodeKind::PrimaryExpression | NodeKind::Token(_))
        {
            cur = &cur.children[0];
        }
        cur
    }

    #[test]
    fn precedence_puts_multiplication_below_addition() {
        let expr = parse_expr("1 + 2 * 3");
        let additive = unwrap_tiers(&expr);
        assert_eq!(additive.kind, NodeKind::AdditiveExpression);
        assert_eq!(additive.children.len(), 3);
        assert!(additive.children[1].is_token(TokenKind::Plus));

        let product = unwrap_tiers(&additive.children[2]);
        assert_eq!(product.kind, NodeKind::MultiplicativeExpression);
        assert_eq!(product.children.len(), 3);
        assert!(product.children[1].is_token(TokenKind::Star));
    }

    #[test]
    fn single_operand_tiers_capture_no_operator() {
        let expr = parse_expr("1 || 2");
        let or = unwrap_tiers(&expr);
        assert_eq!(or.kind, NodeKind::OrExpression);
        // Operands only; the `||` leaf is not recorded.
        assert_eq!(or.children.len(), 2);
        assert!(or
            .children
            .iter()
            .all(|c| c.kind == NodeKind::AndExpression));
    }

    #[test]
    fn assignment_chains_and_restricts_targets() {
        let expr = parse_expr("a = b = 5");
        let assign = &expr.children[0];
        assert_eq!(assign.kind, NodeKind::AssignmentExpression);
        // (Identifier Assign) (Identifier Assign) OrExpression
        assert_eq!(assign.children.len(), 5);
        assert_eq!(assign.children[0].text(), "a");
        assert!(assign.children[1].is_token(TokenKind::Assign));
        assert_eq!(assign.children[2].text(), "b");
        assert_eq!(assign.children[4].kind, NodeKind::OrExpression);
    }

    #[test]
    fn equality_is_not_mistaken_for_assignment() {
        let expr = parse_expr("x == 5");
        let assign = &expr.children[0];
        // No assignment prefix pairs; the whole thing is the value.
        assert_eq!(assign.children.len(), 1);
        let eq = unwrap_tiers(assign);
        assert_eq!(eq.kind, NodeKind::EqualityExpression);
        assert!(eq.children[1].is_token(TokenKind::EqualEqual));
    }

    #[test]
    fn logical_or_is_not_two_bitwise_ors() {
        let expr = parse_expr("a || b");
        let or = unwrap_tiers(&expr);
        assert_eq!(or.kind, NodeKind::OrExpression);
        assert_eq!(or.children.len(), 2);

        let expr = parse_expr("a | b");
        let bitor = unwrap_tiers(&expr);
        assert_eq!(bitor.kind, NodeKind::BitOrExpression);
        assert_eq!(bitor.children.len(), 2);
    }

    #[test]
    fn unary_operators_nest() {
        let expr = parse_expr("-~x");
        let unary = unwrap_tiers(&expr);
        assert_eq!(unary.kind, NodeKind::UnaryExpression);
        assert_eq!(unary.children.len(), 2);
        assert!(unary.children[0].children[0].is_token(TokenKind::Minus));
        let inner = &unary.children[1];
        assert_eq!(inner.kind, NodeKind::UnaryExpression);
        assert!(inner.children[0].children[0].is_token(TokenKind::Tilde));
    }

    #[test]
    fn calls_collect_arguments() {
        let expr = parse_expr("f(1, 2 + 3)");
        let postfix = unwrap_tiers(&expr);
        assert_eq!(postfix.kind, NodeKind::PostfixExpression);
        assert_eq!(postfix.children.len(), 2);
        assert_eq!(postfix.children[0].kind, NodeKind::PrimaryExpression);
        let args = &postfix.children[1];
        assert_eq!(args.kind, NodeKind::CallArguments);
        assert_eq!(args.children.len(), 2);

        let empty = parse_expr("f()");
        let postfix = unwrap_tiers(&empty);
        assert!(postfix.children[1].children.is_empty());
    }

    #[test]
    fn boolean_constants_are_primaries() {
        let expr = parse_expr("true");
        let primary = unwrap_tiers(&expr);
        assert_eq!(primary.kind, NodeKind::PrimaryExpression);
        assert!(primary.children[0].is_token(TokenKind::TrueKeyword));
    }

    #[test]
    fn parenthesized_expression_recurses() {
        let expr = parse_expr("(1 + 2) * 3");
        let product = unwrap_tiers(&expr);
        assert_eq!(product.kind, NodeKind::MultiplicativeExpression);
        let left = unwrap_tiers(&product.children[0]);
        assert_eq!(left.kind, NodeKind::PrimaryExpression);
        assert_eq!(left.children[0].kind, NodeKind::Expression);
    }
}
