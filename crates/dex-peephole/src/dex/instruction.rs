use std::fmt;

use super::{Opcode, Reg, encoding};
use crate::{Error, Result};

/// One decoded instruction.
///
/// Values are immutable once built: the operand set always matches the
/// opcode's [`OperandShape`](super::OperandShape), and a literal is present
/// exactly when the opcode takes one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    opcode: Opcode,
    dest: Option<Reg>,
    srcs: Vec<Reg>,
    literal: Option<i64>,
}

impl Instruction {
    pub fn new(
        opcode: Opcode,
        dest: Option<Reg>,
        srcs: &[Reg],
        literal: Option<i64>,
    ) -> Result<Self> {
        let shape = opcode.shape();
        if shape.has_dest != dest.is_some() || shape.srcs != srcs.len() {
            return Err(Error::Arity {
                opcode,
                expected_dest: shape.has_dest,
                expected_srcs: shape.srcs,
                got_dest: dest.is_some(),
                got_srcs: srcs.len(),
            });
        }
        let literal_ok = match literal {
            Some(value) => shape.has_literal && opcode.accepts_literal(value),
            None => !shape.has_literal,
        };
        if !literal_ok {
            return Err(Error::LiteralRange { opcode, literal });
        }
        Ok(Self {
            opcode,
            dest,
            srcs: srcs.to_vec(),
            literal,
        })
    }

    /// `const vD, #value`
    pub fn konst(dest: Reg, value: i64) -> Result<Self> {
        Self::new(Opcode::Const, Some(dest), &[], Some(value))
    }

    /// `move vD, vS`
    #[must_use]
    pub fn move_(dest: Reg, src: Reg) -> Self {
        Self::unary_unchecked(Opcode::Move, dest, src)
    }

    /// `neg-int vD, vS`
    #[must_use]
    pub fn neg(dest: Reg, src: Reg) -> Self {
        Self::unary_unchecked(Opcode::NegInt, dest, src)
    }

    /// `not-int vD, vS`
    #[must_use]
    pub fn not(dest: Reg, src: Reg) -> Self {
        Self::unary_unchecked(Opcode::NotInt, dest, src)
    }

    /// Register + literal arithmetic, e.g. `mul-int/lit8 vD, vS, #value`.
    pub fn lit_op(opcode: Opcode, dest: Reg, src: Reg, value: i64) -> Result<Self> {
        Self::new(opcode, Some(dest), &[src], Some(value))
    }

    /// Three-register arithmetic, e.g. `add-int vD, vA, vB`.
    pub fn binop(opcode: Opcode, dest: Reg, lhs: Reg, rhs: Reg) -> Result<Self> {
        Self::new(opcode, Some(dest), &[lhs, rhs], None)
    }

    fn unary_unchecked(opcode: Opcode, dest: Reg, src: Reg) -> Self {
        debug_assert_eq!(opcode.shape().srcs, 1);
        Self {
            opcode,
            dest: Some(dest),
            srcs: vec![src],
            literal: None,
        }
    }

    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    #[must_use]
    pub const fn dest(&self) -> Option<Reg> {
        self.dest
    }

    #[must_use]
    pub fn srcs(&self) -> &[Reg] {
        &self.srcs
    }

    pub fn src(&self, index: usize) -> Result<Reg> {
        self.srcs.get(index).copied().ok_or(Error::Index {
            index,
            len: self.srcs.len(),
        })
    }

    #[must_use]
    pub fn srcs_size(&self) -> usize {
        self.srcs.len()
    }

    #[must_use]
    pub const fn literal(&self) -> Option<i64> {
        self.literal
    }

    #[must_use]
    pub const fn has_literal(&self) -> bool {
        self.literal.is_some()
    }

    /// Register operands in slot order: destination first, then sources.
    #[must_use]
    pub fn registers(&self) -> Vec<Reg> {
        self.dest.iter().chain(&self.srcs).copied().collect()
    }

    /// Same opcode and operands as `other`.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self == other
    }

    /// Size in 16-bit code units of the narrowest encoding.
    pub fn size_in_units(&self) -> Result<u8> {
        encoding::select_form(self).map(|form| form.format.units)
    }

    /// Dalvik code units for the narrowest encoding.
    pub fn encode(&self) -> Result<Vec<u16>> {
        encoding::encode(self)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = encoding::select_form(self)
            .map_or_else(|_| self.opcode.name(), |form| form.mnemonic);
        f.write_str(mnemonic)?;
        let mut sep = " ";
        for reg in self.dest.iter().chain(&self.srcs) {
            write!(f, "{sep}v{reg}")?;
            sep = ", ";
        }
        if let Some(literal) = self.literal {
            write!(f, "{sep}#{literal}")?;
        }
        Ok(())
    }
}
