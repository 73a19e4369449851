use super::pattern::{Bindings, Var};
use crate::dex::{Instruction, Opcode, Reg, select_form};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegExpr {
    Var(Var),
    Fixed(Reg),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitExpr {
    Var(Var),
    Const(i64),
}

/// One instruction produced by a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emit {
    pub opcode: Opcode,
    pub dest: Option<RegExpr>,
    pub srcs: Vec<RegExpr>,
    pub literal: Option<LitExpr>,
}

impl Emit {
    #[must_use]
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            srcs: Vec::new(),
            literal: None,
        }
    }

    /// `opcode vD, vS` with both registers taken from variables.
    #[must_use]
    pub fn unary(opcode: Opcode, dest: Var, src: Var) -> Self {
        Self::new(opcode).dest(RegExpr::Var(dest)).src(RegExpr::Var(src))
    }

    #[must_use]
    pub fn dest(mut self, expr: RegExpr) -> Self {
        self.dest = Some(expr);
        self
    }

    #[must_use]
    pub fn src(mut self, expr: RegExpr) -> Self {
        self.srcs.push(expr);
        self
    }

    #[must_use]
    pub fn lit(mut self, expr: LitExpr) -> Self {
        self.literal = Some(expr);
        self
    }

    fn build(&self, bindings: &Bindings) -> Result<Instruction> {
        let dest = self.dest.map(|expr| eval_reg(expr, bindings)).transpose()?;
        let srcs = self
            .srcs
            .iter()
            .map(|&expr| eval_reg(expr, bindings))
            .collect::<Result<Vec<_>>>()?;
        let literal = self
            .literal
            .map(|expr| eval_lit(expr, bindings))
            .transpose()?;
        Instruction::new(self.opcode, dest, &srcs, literal)
    }
}

fn eval_reg(expr: RegExpr, bindings: &Bindings) -> Result<Reg> {
    match expr {
        RegExpr::Fixed(reg) => Ok(reg),
        RegExpr::Var(var) => bindings.reg(var).ok_or_else(|| unbound(var)),
    }
}

fn eval_lit(expr: LitExpr, bindings: &Bindings) -> Result<i64> {
    match expr {
        LitExpr::Const(value) => Ok(value),
        LitExpr::Var(var) => bindings.literal(var).ok_or_else(|| unbound(var)),
    }
}

fn unbound(var: Var) -> Error {
    Error::MalformedRule {
        rule: String::new(),
        reason: format!("template reads unbound variable {var}"),
    }
}

/// Replacement for a matched window. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    emits: Vec<Emit>,
}

impl Template {
    #[must_use]
    pub const fn empty() -> Self {
        Self { emits: Vec::new() }
    }

    #[must_use]
    pub fn new(emits: Vec<Emit>) -> Self {
        Self { emits }
    }

    #[must_use]
    pub fn emits(&self) -> &[Emit] {
        &self.emits
    }

    /// Build every instruction and check each one is encodable.
    ///
    /// All or nothing: the first failure is returned and no partial output
    /// escapes. `Error::NotEncodable` means the registers or literal do not
    /// fit any form of the target opcode.
    pub fn instantiate(&self, bindings: &Bindings) -> Result<Vec<Instruction>> {
        self.emits
            .iter()
            .map(|emit| {
                let insn = emit.build(bindings)?;
                select_form(&insn)?;
                Ok(insn)
            })
            .collect()
    }
}
