use std::fmt;

use crate::dex::{Instruction, Opcode, Reg};

/// A pattern variable. Variables are bound while matching a window and read
/// back when building the replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(pub &'static str);

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Destination register of the matched instruction.
pub const RD: Var = Var("rd");
/// Source register of the matched instruction.
pub const RS: Var = Var("rs");
pub const RA: Var = Var("ra");
pub const RB: Var = Var("rb");
pub const LIT: Var = Var("lit");
pub const LIT2: Var = Var("lit2");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Reg(Reg),
    Lit(i64),
}

impl From<Reg> for Value {
    fn from(reg: Reg) -> Self {
        Self::Reg(reg)
    }
}

impl From<i64> for Value {
    fn from(lit: i64) -> Self {
        Self::Lit(lit)
    }
}

/// Variable assignments collected while matching one window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    slots: Vec<(Var, Value)>,
}

impl Bindings {
    #[must_use]
    pub fn get(&self, var: Var) -> Option<Value> {
        self.slots
            .iter()
            .find_map(|&(bound, value)| (bound == var).then_some(value))
    }

    #[must_use]
    pub fn reg(&self, var: Var) -> Option<Reg> {
        match self.get(var)? {
            Value::Reg(reg) => Some(reg),
            Value::Lit(_) => None,
        }
    }

    #[must_use]
    pub fn literal(&self, var: Var) -> Option<i64> {
        match self.get(var)? {
            Value::Lit(lit) => Some(lit),
            Value::Reg(_) => None,
        }
    }

    /// Bind `var`, or check it against its existing binding.
    fn bind(&mut self, var: Var, value: Value) -> bool {
        match self.get(var) {
            Some(existing) => existing == value,
            None => {
                self.slots.push((var, value));
                true
            }
        }
    }
}

/// Operand pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pat<T> {
    /// Match any value
    Any,
    /// Match exact value
    Exact(T),
    /// Bind to a variable; a variable bound twice must see equal values
    Bind(Var),
}

impl<T: Copy + PartialEq + Into<Value>> Pat<T> {
    fn matches(&self, value: T, bindings: &mut Bindings) -> bool {
        match self {
            Pat::Any => true,
            Pat::Exact(expected) => value == *expected,
            Pat::Bind(var) => bindings.bind(*var, value.into()),
        }
    }

    pub(crate) const fn var(&self) -> Option<Var> {
        match self {
            Pat::Bind(var) => Some(*var),
            Pat::Any | Pat::Exact(_) => None,
        }
    }
}

/// Register bound to `var`.
#[must_use]
pub const fn reg(var: Var) -> Pat<Reg> {
    Pat::Bind(var)
}

/// Literal bound to `var`.
#[must_use]
pub const fn lit(var: Var) -> Pat<i64> {
    Pat::Bind(var)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpcodeMatch {
    Exact(Opcode),
    AnyOf(&'static [Opcode]),
}

impl OpcodeMatch {
    #[must_use]
    pub fn matches(&self, opcode: Opcode) -> bool {
        match self {
            Self::Exact(expected) => *expected == opcode,
            Self::AnyOf(candidates) => candidates.contains(&opcode),
        }
    }

    /// Every opcode this matcher accepts.
    #[must_use]
    pub fn opcodes(&self) -> &[Opcode] {
        match self {
            Self::Exact(opcode) => std::slice::from_ref(opcode),
            Self::AnyOf(candidates) => candidates,
        }
    }
}

/// Shape of one instruction in a pattern window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub opcode: OpcodeMatch,
    pub dest: Option<Pat<Reg>>,
    pub srcs: Vec<Pat<Reg>>,
    pub literal: Option<Pat<i64>>,
}

impl Shape {
    #[must_use]
    pub fn op(opcode: Opcode) -> Self {
        Self::new(OpcodeMatch::Exact(opcode))
    }

    #[must_use]
    pub fn any_of(opcodes: &'static [Opcode]) -> Self {
        Self::new(OpcodeMatch::AnyOf(opcodes))
    }

    fn new(opcode: OpcodeMatch) -> Self {
        Self {
            opcode,
            dest: None,
            srcs: Vec::new(),
            literal: None,
        }
    }

    #[must_use]
    pub fn dest(mut self, pat: Pat<Reg>) -> Self {
        self.dest = Some(pat);
        self
    }

    #[must_use]
    pub fn src(mut self, pat: Pat<Reg>) -> Self {
        self.srcs.push(pat);
        self
    }

    #[must_use]
    pub fn lit(mut self, pat: Pat<i64>) -> Self {
        self.literal = Some(pat);
        self
    }

    /// Match `insn`, extending `bindings`. On failure `bindings` may hold
    /// partial assignments and should be discarded.
    pub fn matches(&self, insn: &Instruction, bindings: &mut Bindings) -> bool {
        if !self.opcode.matches(insn.opcode()) || self.srcs.len() != insn.srcs_size() {
            return false;
        }
        let dest_ok = match (&self.dest, insn.dest()) {
            (Some(pat), Some(reg)) => pat.matches(reg, bindings),
            (None, None) => true,
            _ => false,
        };
        if !dest_ok {
            return false;
        }
        if !self
            .srcs
            .iter()
            .zip(insn.srcs())
            .all(|(pat, &reg)| pat.matches(reg, bindings))
        {
            return false;
        }
        match (&self.literal, insn.literal()) {
            (Some(pat), Some(value)) => pat.matches(value, bindings),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Side-condition evaluated over a complete set of bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    LiteralIs(Var, i64),
    LiteralIn(Var, &'static [i64]),
    /// `literal & mask == expected`
    LiteralMasked {
        var: Var,
        mask: i64,
        expected: i64,
    },
    SameReg(Var, Var),
    DistinctRegs(Var, Var),
}

impl Condition {
    /// Unbound variables make a condition false.
    #[must_use]
    pub fn holds(&self, bindings: &Bindings) -> bool {
        match *self {
            Self::LiteralIs(var, value) => bindings.literal(var) == Some(value),
            Self::LiteralIn(var, values) => bindings
                .literal(var)
                .is_some_and(|lit| values.contains(&lit)),
            Self::LiteralMasked {
                var,
                mask,
                expected,
            } => bindings
                .literal(var)
                .is_some_and(|lit| lit & mask == expected),
            Self::SameReg(a, b) => match (bindings.reg(a), bindings.reg(b)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Self::DistinctRegs(a, b) => match (bindings.reg(a), bindings.reg(b)) {
                (Some(a), Some(b)) => a != b,
                _ => false,
            },
        }
    }

    pub(crate) fn literal_vars(&self) -> Vec<Var> {
        match *self {
            Self::LiteralIs(var, _)
            | Self::LiteralIn(var, _)
            | Self::LiteralMasked { var, .. } => vec![var],
            Self::SameReg(..) | Self::DistinctRegs(..) => Vec::new(),
        }
    }

    pub(crate) fn reg_vars(&self) -> Vec<Var> {
        match *self {
            Self::SameReg(a, b) | Self::DistinctRegs(a, b) => vec![a, b],
            Self::LiteralIs(..) | Self::LiteralIn(..) | Self::LiteralMasked { .. } => Vec::new(),
        }
    }
}
