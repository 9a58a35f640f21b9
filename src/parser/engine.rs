use crate::lexer::{match_token, LexError, TokenKind};
use crate::parser::{Node, NodeKind, ParseError};

pub type ParseResult<T> = Result<T, ParseError>;

/// Backtracking recursive-descent engine.
///
/// The cursor is a byte offset into the source. Alternatives and repetition
/// iterations snapshot `(children.len(), pos)` before each attempt and
/// restore both on failure, so a finished node's children always reflect
/// exactly the winning parse. Checkpoints are local values inside the
/// combinators, which makes the LIFO unwind discipline structural rather
/// than a runtime invariant.
pub struct Parser<'src> {
    src: &'src str,
    pos: usize,
    /// Name of the rule currently being parsed, for diagnostics.
    rule: &'static str,
    /// Furthest token failure seen so far; reported if the parse fails.
    deepest: Option<ParseError>,
}

/// Snapshot of the node under construction and the input cursor.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    children: usize,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            pos: 0,
            rule: "Program",
            deepest: None,
        }
    }

    /// Parse a whole program.
    ///
    /// On failure the reported error is the deepest token failure seen
    /// during the attempt, which names the construct that actually went
    /// wrong rather than the outermost alternative that gave up.
    pub fn parse(src: &'src str) -> ParseResult<Node> {
        let mut parser = Parser::new(src);
        match parser.program() {
            Ok(node) => Ok(node),
            Err(err) => Err(parser.deepest.take().unwrap_or(err)),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Run one grammar rule: construct its node, execute the body against
    /// it, and return the finished node. A rule either succeeds with a
    /// complete node or fails without observable effect on its caller.
    pub fn rule(
        &mut self,
        kind: NodeKind,
        body: impl FnOnce(&mut Self, &mut Node) -> ParseResult<()>,
    ) -> ParseResult<Node> {
        let span = tracing::trace_span!("rule", rule = kind.name(), at = self.pos);
        let _guard = span.enter();

        let outer = std::mem::replace(&mut self.rule, kind.name());
        let mut node = Node::rule(kind);
        let result = body(self, &mut node);
        self.rule = outer;

        match result {
            Ok(()) => {
                tracing::trace!(rule = kind.name(), "accepted");
                Ok(node)
            }
            Err(err) => {
                tracing::trace!(rule = kind.name(), %err, "rejected");
                Err(err)
            }
        }
    }

    /// Run a sub-rule and append its node as a child.
    pub fn expect(
        &mut self,
        node: &mut Node,
        rule: impl FnOnce(&mut Self) -> ParseResult<Node>,
    ) -> ParseResult<()> {
        let child = rule(self)?;
        node.children.push(child);
        Ok(())
    }

    /// Match one token and append the produced leaf as a child.
    pub fn expect_token(&mut self, node: &mut Node, kind: TokenKind) -> ParseResult<()> {
        let leaf = self.token(kind)?;
        node.children.push(leaf);
        Ok(())
    }

    /// Match one token and return the leaf. Callers drop the leaf to
    /// consume pure punctuation without recording it in the tree.
    pub fn token(&mut self, kind: TokenKind) -> ParseResult<Node> {
        match match_token(kind, self.src, self.pos) {
            Ok(found) => {
                self.pos = found.end;
                Ok(Node::leaf(kind, found.text))
            }
            Err(err) => Err(self.record(err)),
        }
    }

    fn record(&mut self, err: LexError) -> ParseError {
        let err = ParseError {
            expected: err.token,
            rule: self.rule,
            offset: err.offset,
        };
        match &self.deepest {
            Some(deepest) if deepest.offset > err.offset => {}
            _ => self.deepest = Some(err.clone()),
        }
        err
    }

    fn checkpoint(&self, node: &Node) -> Checkpoint {
        Checkpoint {
            children: node.children.len(),
            pos: self.pos,
        }
    }

    fn rollback(&mut self, node: &mut Node, mark: Checkpoint) {
        node.children.truncate(mark.children);
        self.pos = mark.pos;
    }
}

/// Ordered choice: try the alternatives left to right, rolling back the
/// child list and cursor between attempts. The last alternative's failure
/// propagates when every alternative fails.
pub fn choice<'src>(
    p: &mut Parser<'src>,
    node: &mut Node,
    alts: &mut [&mut dyn FnMut(&mut Parser<'src>, &mut Node) -> ParseResult<()>],
) -> ParseResult<()> {
    let mut last = None;
    for alt in alts.iter_mut() {
        let mark = p.checkpoint(node);
        match alt(p, node) {
            Ok(()) => return Ok(()),
            Err(err) => {
                p.rollback(node, mark);
                last = Some(err);
            }
        }
    }
    Err(last.expect("choice requires at least one alternative"))
}

/// Zero-or-more: repeat the body until its first failure, which is rolled
/// back and absorbed. Always succeeds; a failing first iteration
/// contributes nothing.
pub fn repeat<'src>(
    p: &mut Parser<'src>,
    node: &mut Node,
    mut body: impl FnMut(&mut Parser<'src>, &mut Node) -> ParseResult<()>,
) -> ParseResult<()> {
    loop {
        let mark = p.checkpoint(node);
        if body(p, node).is_err() {
            p.rollback(node, mark);
            return Ok(());
        }
    }
}

/// Zero-or-one: attempt the body; roll back and succeed if it fails.
pub fn optional<'src>(
    p: &mut Parser<'src>,
    node: &mut Node,
    body: impl FnOnce(&mut Parser<'src>, &mut Node) -> ParseResult<()>,
) -> ParseResult<()> {
    let mark = p.checkpoint(node);
    if body(p, node).is_err() {
        p.rollback(node, mark);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(p: &mut Parser) -> (Node, usize) {
        (Node::rule(NodeKind::Statement), p.pos())
    }

    #[test]
    fn choice_rolls_back_children_and_cursor_of_failed_alternatives() {
        // First alternative consumes an identifier and a `(`, appends two
        // children, then fails; the winning alternative is identifier-only.
        let mut p = Parser::new("foo (");
        let (mut node, _) = scratch(&mut p);

        choice(
            &mut p,
            &mut node,
            &mut [
                &mut |p, n| {
                    p.expect_token(n, TokenKind::Identifier)?;
                    p.expect_token(n, TokenKind::LeftParen)?;
                    p.expect_token(n, TokenKind::Semicolon)
                },
                &mut |p, n| p.expect_token(n, TokenKind::Identifier),
            ],
        )
        .unwrap();

        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].is_token(TokenKind::Identifier));
        assert_eq!(p.pos(), 3);
    }

    #[test]
    fn choice_propagates_the_last_failure() {
        let mut p = Parser::new("42");
        let (mut node, _) = scratch(&mut p);

        let err = choice(
            &mut p,
            &mut node,
            &mut [
                &mut |p, n| p.expect_token(n, TokenKind::Identifier),
                &mut |p, n| p.expect_token(n, TokenKind::Semicolon),
            ],
        )
        .unwrap_err();

        assert_eq!(err.expected, "Semicolon");
        assert!(node.children.is_empty());
        assert_eq!(p.pos(), 0);
    }

    #[test]
    fn repeat_with_always_failing_body_leaves_no_trace() {
        let mut p = Parser::new("42");
        let (mut node, start) = scratch(&mut p);

        repeat(&mut p, &mut node, |p, n| {
            p.expect_token(n, TokenKind::Identifier)
        })
        .unwrap();

        assert!(node.children.is_empty());
        assert_eq!(p.pos(), start);
    }

    #[test]
    fn repeat_accumulates_until_the_first_failure() {
        let mut p = Parser::new("a b c 1");
        let (mut node, _) = scratch(&mut p);

        repeat(&mut p, &mut node, |p, n| {
            p.expect_token(n, TokenKind::Identifier)
        })
        .unwrap();

        assert_eq!(node.children.len(), 3);
        let names: Vec<&str> = node.children.iter().map(|c| c.text()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn repeat_discards_a_partially_consumed_iteration() {
        // Each iteration wants identifier + semicolon; the trailing `c` is
        // consumed by a failing iteration and must be rolled back.
        let mut p = Parser::new("a; b; c");
        let (mut node, _) = scratch(&mut p);

        repeat(&mut p, &mut node, |p, n| {
            p.expect_token(n, TokenKind::Identifier)?;
            p.token(TokenKind::Semicolon)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(node.children.len(), 2);
        assert_eq!(p.pos(), 5);
    }

    #[test]
    fn optional_absorbs_failure() {
        let mut p = Parser::new(";");
        let (mut node, start) = scratch(&mut p);

        optional(&mut p, &mut node, |p, n| {
            p.expect_token(n, TokenKind::Identifier)
        })
        .unwrap();
        assert!(node.children.is_empty());
        assert_eq!(p.pos(), start);

        optional(&mut p, &mut node, |p, n| {
            p.expect_token(n, TokenKind::Semicolon)
        })
        .unwrap();
        assert_eq!(node.children.len(), 1);
    }

    #[test]
    fn rule_returns_a_typed_node() {
        let mut p = Parser::new("x");
        let node = p
            .rule(NodeKind::PrimaryExpression, |p, n| {
                p.expect_token(n, TokenKind::Identifier)
            })
            .unwrap();
        assert_eq!(node.kind, NodeKind::PrimaryExpression);
        assert_eq!(node.name(), "PrimaryExpression");
        assert_eq!(node.children[0].text(), "x");
    }
}
