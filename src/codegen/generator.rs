use crate::codegen::{control_label, Asm, CodegenError, Reg};
use crate::lexer::TokenKind;
use crate::parser::{Node, NodeKind};
use crate::symbol::Scope;

type GenResult = Result<(), CodegenError>;

fn child(node: &Node, index: usize) -> Result<&Node, CodegenError> {
    node.children
        .get(index)
        .ok_or(CodegenError::MalformedTree("missing child"))
}

fn identifier_text(node: &Node) -> Result<&str, CodegenError> {
    if node.is_token(TokenKind::Identifier) {
        Ok(node.text())
    } else {
        Err(CodegenError::MalformedTree("expected an identifier leaf"))
    }
}

/// Single-pass code generator: walks the syntax tree once, dispatching on
/// each node's type tag, and emits the listing while the [`Scope`] tracks
/// names, labels, and the virtual operand-stack depth.
pub struct CodeGenerator {
    scope: Scope,
    asm: Asm,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            scope: Scope::new(),
            asm: Asm::new(),
        }
    }

    /// Generate the complete listing for a parsed program.
    pub fn generate(mut self, program: &Node) -> Result<String, CodegenError> {
        self.gen_program(program)?;
        Ok(self.asm.finish())
    }

    fn gen_program(&mut self, node: &Node) -> GenResult {
        if node.kind != NodeKind::Program {
            return Err(CodegenError::MalformedTree("program root"));
        }
        for item in &node.children {
            match item.kind {
                NodeKind::FunctionDefinition => self.gen_function_definition(item)?,
                NodeKind::DeclarationStatement => self.gen_statement(item)?,
                _ => return Err(CodegenError::MalformedTree("top-level item")),
            }
        }
        self.scope.finish(&mut self.asm);
        Ok(())
    }

    /// Register the declared signature; children are
    /// `[TypeName, Identifier, ParameterList]`.
    fn register_function(&mut self, decl: &Node) -> GenResult {
        let name = identifier_text(child(decl, 1)?)?;
        self.scope.declare_function(name);
        for param in &child(decl, 2)?.children {
            let param_name = identifier_text(child(param, 1)?)?;
            self.scope.add_parameter_name(param_name);
        }
        self.scope.end_function_declaration()?;
        Ok(())
    }

    fn gen_function_definition(&mut self, node: &Node) -> GenResult {
        self.register_function(child(node, 0)?)?;
        let name = self.scope.last_function_name().to_string();

        self.asm.mark(&name);
        self.scope.spawn_function_scope()?;
        self.gen_statement(child(node, 1)?)?;
        self.scope.close_scope();
        // Falling off the end of a body still returns.
        self.asm.op("ret");
        Ok(())
    }

    fn gen_statement(&mut self, node: &Node) -> GenResult {
        match node.kind {
            NodeKind::Statement | NodeKind::LoopStatement => self.gen_statement(child(node, 0)?),
            NodeKind::CompoundStatement => self.gen_compound(node),
            NodeKind::ExpressionStatement => self.gen_expression_statement(node),
            NodeKind::DeclarationStatement => self.gen_declaration(node),
            NodeKind::IfStatement => self.gen_if(node),
            NodeKind::WhileStatement => self.gen_while(node),
            NodeKind::DoWhileStatement => self.gen_do_while(node),
            NodeKind::ForStatement => self.gen_for(node),
            NodeKind::JumpStatement => self.gen_jump(node),
            _ => Err(CodegenError::MalformedTree("statement")),
        }
    }

    fn gen_compound(&mut self, node: &Node) -> GenResult {
        self.scope.open_scope();
        for stmt in &node.children {
            self.gen_statement(stmt)?;
        }
        self.scope.close_scope();
        Ok(())
    }

    /// The statement's value, if any, is not consumed by anyone; bracket
    /// it with a depth save/restore so the discarded result does not leak
    /// into the tracked stack position.
    fn gen_expression_statement(&mut self, node: &Node) -> GenResult {
        self.scope.save_stack_pos();
        if let Some(expr) = node.children.first() {
            self.gen_expression(expr)?;
        }
        self.scope.restore_stack_pos();
        Ok(())
    }

    fn gen_declaration(&mut self, node: &Node) -> GenResult {
        let decl = child(node, 0)?;
        match decl.kind {
            NodeKind::FunctionDeclaration => self.register_function(decl),
            NodeKind::VariableDeclaration => self.gen_variable_declaration(decl),
            _ => Err(CodegenError::MalformedTree("declaration")),
        }
    }

    /// Children are `[TypeName, Identifier, initializer?]`. In statement
    /// context the initializer stores without leaving a result behind.
    fn gen_variable_declaration(&mut self, node: &Node) -> GenResult {
        let name = identifier_text(child(node, 1)?)?.to_string();
        self.scope.declare_variable(&name)?;
        if let Some(init) = node.children.get(2) {
            self.gen_expression(init)?;
            self.scope.load_variable_addr(&name, &mut self.asm)?;
            self.asm.pop_reg(Reg::Scratch);
            self.scope.track_pop();
            self.asm.pop_deref(Reg::Scratch);
            self.scope.track_pop();
        }
        Ok(())
    }

    /// Children are `[condition, true-branch, false-branch?]`. The branch
    /// instructions inspect the condition without popping it, so each path
    /// discards it explicitly.
    fn gen_if(&mut self, node: &Node) -> GenResult {
        let id = self.scope.unique_id();
        let else_label = control_label("else", id);
        let end_label = control_label("end", id);

        self.gen_expression(child(node, 0)?)?;
        self.asm.jump("jz", &else_label);
        self.asm.pop_reg(Reg::Scratch);
        self.scope.track_pop();
        self.gen_statement(child(node, 1)?)?;
        self.asm.jump("jmp", &end_label);

        self.asm.mark(&else_label);
        self.asm.pop_reg(Reg::Scratch);
        if let Some(false_branch) = node.children.get(2) {
            self.gen_statement(false_branch)?;
        }
        self.asm.mark(&end_label);
        Ok(())
    }

    /// Children are `[condition, body]`. The normal exit discards the
    /// condition value at `.done` and falls into `.end`; a `break` arrives
    /// with no condition on the stack and therefore targets `.end`
    /// directly.
    fn gen_while(&mut self, node: &Node) -> GenResult {
        let id = self.scope.unique_id();
        let loop_label = control_label("loop", id);
        let done_label = control_label("done", id);
        let end_label = control_label("end", id);

        self.asm.mark(&loop_label);
        self.gen_expression(child(node, 0)?)?;
        self.asm.jump("jz", &done_label);
        self.asm.pop_reg(Reg::Scratch);
        self.scope.track_pop();

        self.scope.enter_loop(id);
        let body = self.gen_statement(child(node, 1)?);
        self.scope.exit_loop();
        body?;

        self.asm.jump("jmp", &loop_label);
        self.asm.mark(&done_label);
        self.asm.pop_reg(Reg::Scratch);
        self.asm.mark(&end_label);
        Ok(())
    }

    /// Children are `[body, condition]`. The loop is primed with an
    /// always-true sentinel that the entry pop discards on the first pass;
    /// on every loop-back the same pop discards the previous condition
    /// value.
    fn gen_do_while(&mut self, node: &Node) -> GenResult {
        let id = self.scope.unique_id();
        let loop_label = control_label("loop", id);
        let end_label = control_label("end", id);

        self.asm.push_int(1);
        self.scope.track_push();
        self.asm.mark(&loop_label);
        self.asm.pop_reg(Reg::Scratch);
        self.scope.track_pop();

        self.scope.enter_loop(id);
        let body = self.gen_statement(child(node, 0)?);
        self.scope.exit_loop();
        body?;

        self.gen_expression(child(node, 1)?)?;
        self.asm.jump("jnz", &loop_label);
        self.asm.pop_reg(Reg::Scratch);
        self.scope.track_pop();
        self.asm.mark(&end_label);
        Ok(())
    }

    /// Children are `[init-statement, condition-statement, post?, body]`.
    /// The condition statement's inner expression keeps its value (an
    /// empty condition counts as true); the post expression is discarded
    /// like any expression statement.
    fn gen_for(&mut self, node: &Node) -> GenResult {
        let (post, body) = match node.children.len() {
            3 => (None, child(node, 2)?),
            4 => (Some(child(node, 2)?), child(node, 3)?),
            _ => return Err(CodegenError::MalformedTree("for statement")),
        };
        let id = self.scope.unique_id();
        let loop_label = control_label("loop", id);
        let done_label = control_label("done", id);
        let end_label = control_label("end", id);

        self.gen_statement(child(node, 0)?)?;

        self.asm.mark(&loop_label);
        match child(node, 1)?.children.first() {
            Some(cond) => self.gen_expression(cond)?,
            None => {
                self.asm.push_int(1);
                self.scope.track_push();
            }
        }
        self.asm.jump("jz", &done_label);
        self.asm.pop_reg(Reg::Scratch);
        self.scope.track_pop();

        self.scope.enter_loop(id);
        let result = self.gen_statement(body);
        self.scope.exit_loop();
        result?;

        if let Some(post) = post {
            self.scope.save_stack_pos();
            self.gen_expression(post)?;
            self.scope.restore_stack_pos();
        }
        self.asm.jump("jmp", &loop_label);
        self.asm.mark(&done_label);
        self.asm.pop_reg(Reg::Scratch);
        self.asm.mark(&end_label);
        Ok(())
    }

    /// The first child is the keyword leaf: `break` jumps to the end label
    /// of the innermost enclosing loop; `return` moves its optional value
    /// into the return register.
    fn gen_jump(&mut self, node: &Node) -> GenResult {
        let keyword = child(node, 0)?;
        if keyword.is_token(TokenKind::BreakKeyword) {
            let id = self
                .scope
                .current_loop()
                .ok_or(CodegenError::BreakOutsideLoop)?;
            self.asm.jump("jmp", &control_label("end", id));
            Ok(())
        } else if keyword.is_token(TokenKind::ReturnKeyword) {
            if let Some(value) = node.children.get(1) {
                self.gen_expression(value)?;
                self.asm.pop_reg(Reg::Return);
                self.scope.track_pop();
            }
            self.asm.op("ret");
            Ok(())
        } else {
            Err(CodegenError::MalformedTree("jump statement"))
        }
    }

    /// Every expression form leaves exactly one value on the operand stack.
    fn gen_expression(&mut self, node: &Node) -> GenResult {
        match node.kind {
            NodeKind::Expression => self.gen_expression(child(node, 0)?),
            NodeKind::AssignmentExpression => self.gen_assignment(node),
            NodeKind::OrExpression => self.gen_logical(node, "or", "jnz"),
            NodeKind::AndExpression => self.gen_logical(node, "and", "jz"),
            NodeKind::BitOrExpression => self.gen_uniform_fold(node, "or"),
            NodeKind::BitXorExpression => self.gen_uniform_fold(node, "xor"),
            NodeKind::BitAndExpression => self.gen_uniform_fold(node, "and"),
            NodeKind::EqualityExpression
            | NodeKind::RelationalExpression
            | NodeKind::ShiftExpression
            | NodeKind::AdditiveExpression
            | NodeKind::MultiplicativeExpression => self.gen_binary_fold(node),
            NodeKind::UnaryExpression => self.gen_unary(node),
            NodeKind::PostfixExpression => self.gen_postfix(node),
            NodeKind::PrimaryExpression => self.gen_primary(node),
            _ => Err(CodegenError::MalformedTree("expression")),
        }
    }

    /// Children are `(Identifier Assign)* value`. The value is computed
    /// once, then written right-to-left through the scratch register; a
    /// duplicate stays behind as the expression's result.
    fn gen_assignment(&mut self, node: &Node) -> GenResult {
        let value = node
            .children
            .last()
            .ok_or(CodegenError::MalformedTree("assignment value"))?;
        self.gen_expression(value)?;

        let targets = &node.children[..node.children.len() - 1];
        for pair in targets.chunks(2).rev() {
            let name = identifier_text(&pair[0])?.to_string();
            self.scope.load_variable_addr(&name, &mut self.asm)?;
            self.asm.pop_reg(Reg::Scratch);
            self.scope.track_pop();
            self.asm.op("dup");
            self.scope.track_push();
            self.asm.pop_deref(Reg::Scratch);
            self.scope.track_pop();
        }
        Ok(())
    }

    /// Short-circuit fold: the first operand is coerced to a boolean, then
    /// each remaining operand is guarded by a branch past the rest. A
    /// single-operand tier forwards with no coercion.
    fn gen_logical(&mut self, node: &Node, fold: &str, short_jump: &str) -> GenResult {
        if node.children.len() == 1 {
            return self.gen_expression(&node.children[0]);
        }
        let id = self.scope.unique_id();
        let end_label = control_label(fold, id);

        self.gen_expression(&node.children[0])?;
        self.asm.op("bool");
        for operand in &node.children[1..] {
            self.asm.jump(short_jump, &end_label);
            self.gen_expression(operand)?;
            self.asm.op("bool");
            self.asm.op(fold);
            self.scope.track_pop();
        }
        self.asm.mark(&end_label);
        Ok(())
    }

    /// Fold for tiers with a single implied operator: children are all
    /// operands.
    fn gen_uniform_fold(&mut self, node: &Node, fold: &str) -> GenResult {
        self.gen_expression(child(node, 0)?)?;
        for operand in &node.children[1..] {
            self.gen_expression(operand)?;
            self.asm.op(fold);
            self.scope.track_pop();
        }
        Ok(())
    }

    /// Fold for tiers that capture their operator leaves: children are
    /// `operand (operator operand)*`.
    fn gen_binary_fold(&mut self, node: &Node) -> GenResult {
        self.gen_expression(child(node, 0)?)?;
        for pair in node.children[1..].chunks(2) {
            let [operator, operand] = pair else {
                return Err(CodegenError::MalformedTree("dangling operator"));
            };
            self.gen_expression(operand)?;
            self.asm.op(Self::fold_mnemonic(operator)?);
            self.scope.track_pop();
        }
        Ok(())
    }

    fn fold_mnemonic(operator: &Node) -> Result<&'static str, CodegenError> {
        let NodeKind::Token(kind) = operator.kind else {
            return Err(CodegenError::MalformedTree("operator leaf"));
        };
        Ok(match kind {
            TokenKind::Plus => "add",
            TokenKind::Minus => "sub",
            TokenKind::Star => "mul",
            TokenKind::Slash => "div",
            TokenKind::Percent => "mod",
            TokenKind::ShiftLeft => "shl",
            TokenKind::ShiftRight => "shr",
            TokenKind::EqualEqual => "ceq",
            TokenKind::BangEqual => "cne",
            TokenKind::Less => "clt",
            TokenKind::Greater => "cgt",
            TokenKind::LessEqual => "cle",
            TokenKind::GreaterEqual => "cge",
            _ => return Err(CodegenError::MalformedTree("operator leaf")),
        })
    }

    /// Either `[postfix]` or `[UnaryOperator, operand]`.
    fn gen_unary(&mut self, node: &Node) -> GenResult {
        if node.children.len() == 1 {
            return self.gen_expression(child(node, 0)?);
        }
        let operator = child(child(node, 0)?, 0)?;
        self.gen_expression(child(node, 1)?)?;
        let NodeKind::Token(kind) = operator.kind else {
            return Err(CodegenError::MalformedTree("unary operator"));
        };
        match kind {
            TokenKind::Plus => {}
            TokenKind::Minus => self.asm.op("neg"),
            TokenKind::Tilde => self.asm.op("not"),
            TokenKind::Bang => {
                // Coerce, then flip the low bit.
                self.asm.op("bool");
                self.asm.push_int(1);
                self.scope.track_push();
                self.asm.op("xor");
                self.scope.track_pop();
            }
            _ => return Err(CodegenError::MalformedTree("unary operator")),
        }
        Ok(())
    }

    /// `[primary]` is a plain value; `[primary, CallArguments]` is a call
    /// whose target must be a bare identifier. Arguments are emitted
    /// right-to-left so the call sequence pops them into parameter slots
    /// in declaration order.
    fn gen_postfix(&mut self, node: &Node) -> GenResult {
        if node.children.len() == 1 {
            return self.gen_expression(child(node, 0)?);
        }
        if node.children.len() > 2 {
            return Err(CodegenError::CallTargetNotName);
        }
        let callee = child(child(node, 0)?, 0)?;
        if !callee.is_token(TokenKind::Identifier) {
            return Err(CodegenError::CallTargetNotName);
        }
        let name = callee.text().to_string();

        self.scope.prepare_call(&name, &mut self.asm)?;
        let args = &child(node, 1)?.children;
        for arg in args.iter().rev() {
            self.gen_expression(arg)?;
        }
        self.scope.check_arg_count(args.len())?;
        self.scope.call(&mut self.asm)?;
        Ok(())
    }

    fn gen_primary(&mut self, node: &Node) -> GenResult {
        let inner = child(node, 0)?;
        match inner.kind {
            NodeKind::Token(TokenKind::Identifier) => {
                let name = inner.text().to_string();
                self.scope.load_variable(&name, &mut self.asm)?;
                Ok(())
            }
            NodeKind::Token(TokenKind::Constant) => {
                let value: i64 = inner
                    .text()
                    .parse()
                    .map_err(|_| CodegenError::BadConstant(inner.text().to_string()))?;
                self.asm.push_int(value);
                self.scope.track_push();
                Ok(())
            }
            NodeKind::Token(TokenKind::TrueKeyword) => {
                self.asm.push_int(1);
                self.scope.track_push();
                Ok(())
            }
            NodeKind::Token(TokenKind::FalseKeyword) => {
                self.asm.push_int(0);
                self.scope.track_push();
                Ok(())
            }
            NodeKind::Expression => self.gen_expression(inner),
            _ => Err(CodegenError::MalformedTree("primary expression")),
        }
    }
}
