use std::fmt::{self, Write};

/// Registers with fixed roles in the calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    /// Frame base for variable slots; the call sequence rebases it.
    StackPointer = 1,
    /// Scratch register for address computation and value discards.
    Scratch = 2,
    /// Carries the callee's result back to the caller.
    Return = 3,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", *self as u32)
    }
}

/// Jump target for one control-flow construct instance. The leading dot
/// keeps generated labels out of the identifier namespace.
pub fn control_label(prefix: &str, id: u32) -> String {
    format!(".{prefix}_{id}")
}

/// Incrementally built assembly listing. Instructions are indented four
/// spaces; `func` entry markers sit in column zero.
#[derive(Debug, Default)]
pub struct Asm {
    text: String,
}

impl Asm {
    pub fn new() -> Self {
        Self::default()
    }

    fn instr(&mut self, args: fmt::Arguments) {
        // Writing into a String cannot fail.
        let _ = writeln!(self.text, "    {args}");
    }

    /// `push <int>` — literal value.
    pub fn push_int(&mut self, value: i64) {
        self.instr(format_args!("push {value}"));
    }

    /// `push <name>` — address of a global.
    pub fn push_name(&mut self, name: &str) {
        self.instr(format_args!("push {name}"));
    }

    /// `push %<reg>` — register value.
    pub fn push_reg(&mut self, reg: Reg) {
        self.instr(format_args!("push %{reg}"));
    }

    /// `pop %<reg>` — top of stack into a register.
    pub fn pop_reg(&mut self, reg: Reg) {
        self.instr(format_args!("pop %{reg}"));
    }

    /// `push !<reg>` — memory read through a register.
    pub fn push_deref(&mut self, reg: Reg) {
        self.instr(format_args!("push !{reg}"));
    }

    /// `pop !<reg>` — memory write through a register.
    pub fn pop_deref(&mut self, reg: Reg) {
        self.instr(format_args!("pop !{reg}"));
    }

    /// A plain zero-operand instruction (`add`, `dup`, `ret`, ...).
    pub fn op(&mut self, mnemonic: &str) {
        self.instr(format_args!("{mnemonic}"));
    }

    /// `jmp`/`jz`/`jnz` to a label.
    pub fn jump(&mut self, mnemonic: &str, label: &str) {
        self.instr(format_args!("{mnemonic} {label}"));
    }

    /// `call <name>`.
    pub fn call(&mut self, name: &str) {
        self.instr(format_args!("call {name}"));
    }

    /// `func <label>` — function entry or jump-target marker.
    pub fn mark(&mut self, label: &str) {
        let _ = writeln!(self.text, "func {label}");
    }

    /// `var <name> <size>` — global storage declaration.
    pub fn global_var(&mut self, name: &str, size: i64) {
        self.instr(format_args!("var {name} {size}"));
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn finish(self) -> String {
        self.text
    }
}
