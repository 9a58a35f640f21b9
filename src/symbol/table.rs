use crate::codegen::{Asm, Reg};
use crate::symbol::SymbolError;
use indexmap::IndexMap;
use std::collections::HashMap;

/// One lexical frame: variable name → zero-based slot offset within the
/// frame. Declaration order is preserved so global emission is
/// deterministic.
#[derive(Debug, Default)]
pub struct Frame {
    offsets: IndexMap<String, i64>,
    global: bool,
}

impl Frame {
    fn global() -> Self {
        Frame {
            offsets: IndexMap::new(),
            global: true,
        }
    }

    fn declare(&mut self, name: &str) -> Result<i64, SymbolError> {
        if self.offsets.contains_key(name) {
            return Err(SymbolError::DuplicateVariable(name.to_string()));
        }
        let slot = self.offsets.len() as i64;
        self.offsets.insert(name.to_string(), slot);
        Ok(slot)
    }

    fn offset(&self, name: &str) -> Option<i64> {
        self.offsets.get(name).copied()
    }

    fn size(&self) -> i64 {
        self.offsets.len() as i64
    }
}

/// A declared function signature: the ordered parameter names. Repeated
/// declarations of one name only have to agree on the parameter count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub name: String,
    pub params: Vec<String>,
}

impl FunctionSig {
    fn equivalent(&self, other: &FunctionSig) -> bool {
        self.name == other.name && self.params.len() == other.params.len()
    }
}

/// Scope and symbol bookkeeping threaded through one generation pass:
/// nested lexical frames, declared function signatures, the unique label
/// counter, the enclosing-loop label stack, and the virtual operand-stack
/// depth history.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
    functions: Vec<FunctionSig>,
    by_name: HashMap<String, usize>,
    /// Callees whose argument lists are currently being generated,
    /// innermost last.
    pending_calls: Vec<usize>,
    unique: u32,
    /// Unique ids of the enclosing loops, innermost last; `break` jumps to
    /// the end label of the top entry.
    loop_ends: Vec<u32>,
    depth: i64,
    depth_history: Vec<i64>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::global()],
            functions: Vec::new(),
            by_name: HashMap::new(),
            pending_calls: Vec::new(),
            unique: 0,
            loop_ends: Vec::new(),
            depth: 0,
            depth_history: Vec::new(),
        }
    }

    /// Enter a lexical frame.
    pub fn open_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Leave the innermost frame, discarding its slot map. Callers must
    /// already have emitted any code that needs those offsets.
    pub fn close_scope(&mut self) {
        debug_assert!(self.frames.len() > 1, "global frame must stay");
        self.frames.pop();
    }

    /// Add a variable to the innermost frame. Shadowing an outer frame is
    /// fine; redeclaring within the same frame is fatal.
    pub fn declare_variable(&mut self, name: &str) -> Result<(), SymbolError> {
        let frame = self.frames.last_mut().expect("at least the global frame");
        frame.declare(name)?;
        Ok(())
    }

    /// Begin a function declaration; parameter names follow via
    /// [`Scope::add_parameter_name`].
    pub fn declare_function(&mut self, name: &str) {
        self.functions.push(FunctionSig {
            name: name.to_string(),
            params: Vec::new(),
        });
    }

    pub fn add_parameter_name(&mut self, name: &str) {
        self.functions
            .last_mut()
            .expect("declare_function first")
            .params
            .push(name.to_string());
    }

    /// Close the pending declaration: first declaration of a name is
    /// registered, repeats must agree on parameter count.
    pub fn end_function_declaration(&mut self) -> Result<(), SymbolError> {
        let index = self.functions.len() - 1;
        let sig = &self.functions[index];
        match self.by_name.get(&sig.name) {
            None => {
                self.by_name.insert(sig.name.clone(), index);
                Ok(())
            }
            Some(&prior) if self.functions[prior].equivalent(sig) => Ok(()),
            Some(_) => Err(SymbolError::ConflictingSignature(sig.name.clone())),
        }
    }

    /// Name of the most recently declared function.
    pub fn last_function_name(&self) -> &str {
        self.functions
            .last()
            .map(|f| f.name.as_str())
            .unwrap_or_default()
    }

    /// Open the call frame of the most recently declared function and
    /// declare its parameters in order, so they occupy the lowest slots.
    pub fn spawn_function_scope(&mut self) -> Result<(), SymbolError> {
        self.open_scope();
        let params = self
            .functions
            .last()
            .map(|f| f.params.clone())
            .unwrap_or_default();
        for name in &params {
            self.declare_variable(name)?;
        }
        Ok(())
    }

    /// Emit the address of `name` onto the operand stack, searching frames
    /// innermost to outermost. Locals are frame-relative; globals are
    /// referenced by name.
    pub fn load_variable_addr(&mut self, name: &str, asm: &mut Asm) -> Result<(), SymbolError> {
        for frame in self.frames.iter().rev() {
            let Some(offset) = frame.offset(name) else {
                continue;
            };
            if frame.global {
                asm.push_name(name);
            } else {
                asm.push_int(offset);
                asm.push_reg(Reg::StackPointer);
                asm.op("add");
            }
            self.depth += 1;
            return Ok(());
        }
        Err(SymbolError::UndefinedVariable(name.to_string()))
    }

    /// Emit a read of `name`, leaving its value on the operand stack.
    pub fn load_variable(&mut self, name: &str, asm: &mut Asm) -> Result<(), SymbolError> {
        self.load_variable_addr(name, asm)?;
        asm.pop_reg(Reg::Scratch);
        asm.push_deref(Reg::Scratch);
        Ok(())
    }

    /// Start a call: save the caller's frame pointer and remember the
    /// callee while its argument list is generated. Calls nest, so pending
    /// callees form a stack.
    pub fn prepare_call(&mut self, name: &str, asm: &mut Asm) -> Result<(), SymbolError> {
        let Some(&index) = self.by_name.get(name) else {
            return Err(SymbolError::UndefinedFunction(name.to_string()));
        };
        self.pending_calls.push(index);
        asm.push_reg(Reg::StackPointer);
        self.track_push();
        Ok(())
    }

    /// Validate the argument count supplied for the innermost pending call.
    pub fn check_arg_count(&self, found: usize) -> Result<(), SymbolError> {
        let &index = self
            .pending_calls
            .last()
            .ok_or(SymbolError::NoPendingCall)?;
        let sig = &self.functions[index];
        if found != sig.params.len() {
            return Err(SymbolError::ArgumentCount {
                name: sig.name.clone(),
                expected: sig.params.len(),
                found,
            });
        }
        Ok(())
    }

    /// Finish the innermost pending call: rebase the frame pointer past
    /// every live frame, pop the arguments into the new frame's lowest
    /// slots, call, restore the caller's frame pointer, and push the
    /// callee's result.
    pub fn call(&mut self, asm: &mut Asm) -> Result<(), SymbolError> {
        let index = self.pending_calls.pop().ok_or(SymbolError::NoPendingCall)?;
        let sig = self.functions[index].clone();

        let frame_size: i64 = self
            .frames
            .iter()
            .filter(|f| !f.global)
            .map(Frame::size)
            .sum();

        asm.push_int(frame_size);
        asm.push_reg(Reg::StackPointer);
        asm.op("add");
        asm.pop_reg(Reg::StackPointer);

        for _ in &sig.params {
            asm.pop_deref(Reg::StackPointer);
            asm.push_reg(Reg::StackPointer);
            asm.push_int(1);
            asm.op("add");
            asm.pop_reg(Reg::StackPointer);
            self.track_pop();
        }
        asm.push_reg(Reg::StackPointer);
        asm.push_int(sig.params.len() as i64);
        asm.op("sub");
        asm.pop_reg(Reg::StackPointer);

        asm.call(&sig.name);
        asm.pop_reg(Reg::StackPointer);
        asm.push_reg(Reg::Return);
        Ok(())
    }

    /// Allocate a fresh label id for one control-flow construct.
    pub fn unique_id(&mut self) -> u32 {
        self.unique += 1;
        self.unique
    }

    pub fn enter_loop(&mut self, id: u32) {
        self.loop_ends.push(id);
    }

    pub fn exit_loop(&mut self) {
        self.loop_ends.pop();
    }

    /// Label id of the innermost enclosing loop, if any.
    pub fn current_loop(&self) -> Option<u32> {
        self.loop_ends.last().copied()
    }

    /// Remember the operand-stack depth before a value-discarding context.
    pub fn save_stack_pos(&mut self) {
        self.depth_history.push(self.depth);
    }

    /// Forget any values computed since the matching save.
    pub fn restore_stack_pos(&mut self) {
        self.depth = self
            .depth_history
            .pop()
            .expect("save_stack_pos must precede restore");
    }

    pub fn track_push(&mut self) {
        self.depth += 1;
    }

    pub fn track_pop(&mut self) {
        self.depth -= 1;
    }

    /// Emit one storage declaration per global variable, in declaration
    /// order. Generation must have closed every non-global frame by now.
    pub fn finish(&mut self, asm: &mut Asm) {
        debug_assert_eq!(self.frames.len(), 1, "unbalanced scopes at finish");
        for name in self.frames[0].offsets.keys() {
            asm.global_var(name, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_isolation() {
        let mut scope = Scope::new();
        let mut asm = Asm::new();

        scope.open_scope();
        scope.declare_variable("x").unwrap();
        assert!(scope.load_variable("x", &mut asm).is_ok());
        scope.close_scope();

        scope.open_scope();
        assert_eq!(
            scope.load_variable("x", &mut asm),
            Err(SymbolError::UndefinedVariable("x".to_string()))
        );
        scope.close_scope();
    }

    #[test]
    fn shadowing_is_allowed_but_redeclaration_is_not() {
        let mut scope = Scope::new();
        scope.open_scope();
        scope.declare_variable("x").unwrap();
        assert_eq!(
            scope.declare_variable("x"),
            Err(SymbolError::DuplicateVariable("x".to_string()))
        );
        scope.open_scope();
        assert!(scope.declare_variable("x").is_ok());
    }

    #[test]
    fn local_addresses_are_frame_relative_and_globals_by_name() {
        let mut scope = Scope::new();
        let mut asm = Asm::new();

        scope.declare_variable("g").unwrap();
        scope.open_scope();
        scope.declare_variable("a").unwrap();
        scope.declare_variable("b").unwrap();

        scope.load_variable_addr("b", &mut asm).unwrap();
        scope.load_variable_addr("g", &mut asm).unwrap();
        assert_eq!(
            asm.as_str(),
            "    push 1\n    push %1\n    add\n    push g\n"
        );
    }

    #[test]
    fn repeated_declarations_must_agree_on_arity() {
        let mut scope = Scope::new();

        scope.declare_function("f");
        scope.add_parameter_name("a");
        scope.add_parameter_name("b");
        scope.end_function_declaration().unwrap();

        scope.declare_function("f");
        scope.add_parameter_name("x");
        scope.add_parameter_name("y");
        assert!(scope.end_function_declaration().is_ok());

        scope.declare_function("f");
        scope.add_parameter_name("only");
        assert_eq!(
            scope.end_function_declaration(),
            Err(SymbolError::ConflictingSignature("f".to_string()))
        );
    }

    #[test]
    fn call_checks_arity_of_the_innermost_pending_callee() {
        let mut scope = Scope::new();
        let mut asm = Asm::new();

        scope.declare_function("f");
        scope.add_parameter_name("a");
        scope.add_parameter_name("b");
        scope.end_function_declaration().unwrap();
        scope.declare_function("g");
        scope.add_parameter_name("x");
        scope.end_function_declaration().unwrap();

        scope.prepare_call("f", &mut asm).unwrap();
        scope.prepare_call("g", &mut asm).unwrap();
        assert!(scope.check_arg_count(1).is_ok());
        scope.call(&mut asm).unwrap();

        // Back at the outer call: the count must check against `f`.
        assert_eq!(
            scope.check_arg_count(1),
            Err(SymbolError::ArgumentCount {
                name: "f".to_string(),
                expected: 2,
                found: 1,
            })
        );
        assert!(scope.check_arg_count(2).is_ok());
    }

    #[test]
    fn unknown_callee_is_fatal() {
        let mut scope = Scope::new();
        let mut asm = Asm::new();
        assert_eq!(
            scope.prepare_call("missing", &mut asm),
            Err(SymbolError::UndefinedFunction("missing".to_string()))
        );
    }

    #[test]
    fn unique_ids_are_monotonic() {
        let mut scope = Scope::new();
        assert_eq!(scope.unique_id(), 1);
        assert_eq!(scope.unique_id(), 2);
        assert_eq!(scope.unique_id(), 3);
    }

    #[test]
    fn loop_stack_tracks_the_innermost_loop() {
        let mut scope = Scope::new();
        assert_eq!(scope.current_loop(), None);
        scope.enter_loop(4);
        scope.enter_loop(9);
        assert_eq!(scope.current_loop(), Some(9));
        scope.exit_loop();
        assert_eq!(scope.current_loop(), Some(4));
        scope.exit_loop();
        assert_eq!(scope.current_loop(), None);
    }

    #[test]
    fn finish_emits_each_global_exactly_once_in_declaration_order() {
        let mut scope = Scope::new();
        let mut asm = Asm::new();

        scope.declare_variable("first").unwrap();
        scope.declare_variable("second").unwrap();
        // Repeated references must not duplicate storage declarations.
        scope.load_variable("first", &mut asm).unwrap();
        scope.load_variable("first", &mut asm).unwrap();

        let mut out = Asm::new();
        scope.finish(&mut out);
        assert_eq!(out.finish(), "    var first 1\n    var second 1\n");
    }

    #[test]
    fn stack_depth_history_restores_saved_depth() {
        let mut scope = Scope::new();
        scope.save_stack_pos();
        scope.track_push();
        scope.track_push();
        scope.track_pop();
        scope.restore_stack_pos();
        assert_eq!(scope.depth, 0);
    }
}
