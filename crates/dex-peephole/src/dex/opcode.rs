use std::fmt;

/// Virtual register index within a method frame.
pub type Reg = u16;

/// How a format stores its literal operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// Sign-extended literal of the given bit width.
    Signed(u8),
    /// 32-bit literal whose low 16 bits are zero (`const/high16`).
    High16,
}

impl LiteralKind {
    #[must_use]
    pub const fn fits(self, value: i64) -> bool {
        match self {
            Self::Signed(bits) => {
                let half = 1i64 << (bits - 1);
                value >= -half && value < half
            }
            Self::High16 => {
                value & 0xFFFF == 0 && value >= i32::MIN as i64 && value <= i32::MAX as i64
            }
        }
    }
}

/// Dalvik format identifiers, named after the format table in the
/// Dalvik bytecode documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatId {
    F10x,
    F11x,
    F12x,
    F11n,
    F22x,
    F21s,
    F21h,
    F23x,
    F22b,
    F22s,
    F32x,
    F31i,
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::F10x => "10x",
            Self::F11x => "11x",
            Self::F12x => "12x",
            Self::F11n => "11n",
            Self::F22x => "22x",
            Self::F21s => "21s",
            Self::F21h => "21h",
            Self::F23x => "23x",
            Self::F22b => "22b",
            Self::F22s => "22s",
            Self::F32x => "32x",
            Self::F31i => "31i",
        })
    }
}

/// A Dalvik instruction format: operand layout and size.
///
/// `reg_bits` lists the bit budget of every register slot, destination first,
/// then sources in operand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub id: FormatId,
    pub units: u8,
    pub reg_bits: &'static [u8],
    pub literal: Option<LiteralKind>,
}

impl Format {
    /// Whether every register fits its slot's bit budget.
    #[must_use]
    pub fn accommodates(&self, registers: &[Reg]) -> bool {
        registers.len() == self.reg_bits.len()
            && registers
                .iter()
                .zip(self.reg_bits)
                .all(|(&reg, &bits)| u32::from(reg) < (1u32 << bits))
    }
}

pub const F10X: Format = Format {
    id: FormatId::F10x,
    units: 1,
    reg_bits: &[],
    literal: None,
};
pub const F11X: Format = Format {
    id: FormatId::F11x,
    units: 1,
    reg_bits: &[8],
    literal: None,
};
pub const F12X: Format = Format {
    id: FormatId::F12x,
    units: 1,
    reg_bits: &[4, 4],
    literal: None,
};
pub const F11N: Format = Format {
    id: FormatId::F11n,
    units: 1,
    reg_bits: &[4],
    literal: Some(LiteralKind::Signed(4)),
};
pub const F22X: Format = Format {
    id: FormatId::F22x,
    units: 2,
    reg_bits: &[8, 16],
    literal: None,
};
pub const F21S: Format = Format {
    id: FormatId::F21s,
    units: 2,
    reg_bits: &[8],
    literal: Some(LiteralKind::Signed(16)),
};
pub const F21H: Format = Format {
    id: FormatId::F21h,
    units: 2,
    reg_bits: &[8],
    literal: Some(LiteralKind::High16),
};
pub const F23X: Format = Format {
    id: FormatId::F23x,
    units: 2,
    reg_bits: &[8, 8, 8],
    literal: None,
};
pub const F22B: Format = Format {
    id: FormatId::F22b,
    units: 2,
    reg_bits: &[8, 8],
    literal: Some(LiteralKind::Signed(8)),
};
pub const F22S: Format = Format {
    id: FormatId::F22s,
    units: 2,
    reg_bits: &[4, 4],
    literal: Some(LiteralKind::Signed(16)),
};
pub const F32X: Format = Format {
    id: FormatId::F32x,
    units: 3,
    reg_bits: &[16, 16],
    literal: None,
};
pub const F31I: Format = Format {
    id: FormatId::F31i,
    units: 3,
    reg_bits: &[8],
    literal: Some(LiteralKind::Signed(32)),
};

/// One concrete Dalvik opcode implementing an [`Opcode`] family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingForm {
    pub mnemonic: &'static str,
    pub value: u8,
    pub format: Format,
}

macro_rules! forms {
    ($($name:ident = [$(($mnemonic:literal, $value:literal, $format:ident)),+ $(,)?];)+) => {
        $(
            const $name: &[EncodingForm] = &[$(EncodingForm {
                mnemonic: $mnemonic,
                value: $value,
                format: $format,
            }),+];
        )+
    };
}

forms! {
    NOP = [("nop", 0x00, F10X)];
    RETURN_VOID = [("return-void", 0x0e, F10X)];
    RETURN = [("return", 0x0f, F11X)];
    MOVE = [("move", 0x01, F12X), ("move/from16", 0x02, F22X), ("move/16", 0x03, F32X)];
    MOVE_OBJECT = [
        ("move-object", 0x07, F12X),
        ("move-object/from16", 0x08, F22X),
        ("move-object/16", 0x09, F32X),
    ];
    CONST = [
        ("const/4", 0x12, F11N),
        ("const/16", 0x13, F21S),
        ("const/high16", 0x15, F21H),
        ("const", 0x14, F31I),
    ];
    NEG_INT = [("neg-int", 0x7b, F12X)];
    NOT_INT = [("not-int", 0x7c, F12X)];
    ADD_INT = [("add-int", 0x90, F23X)];
    SUB_INT = [("sub-int", 0x91, F23X)];
    MUL_INT = [("mul-int", 0x92, F23X)];
    DIV_INT = [("div-int", 0x93, F23X)];
    REM_INT = [("rem-int", 0x94, F23X)];
    AND_INT = [("and-int", 0x95, F23X)];
    OR_INT = [("or-int", 0x96, F23X)];
    XOR_INT = [("xor-int", 0x97, F23X)];
    ADD_INT_LIT = [("add-int/lit8", 0xd8, F22B), ("add-int/lit16", 0xd0, F22S)];
    RSUB_INT = [("rsub-int/lit8", 0xd9, F22B), ("rsub-int", 0xd1, F22S)];
    MUL_INT_LIT = [("mul-int/lit8", 0xda, F22B), ("mul-int/lit16", 0xd2, F22S)];
    DIV_INT_LIT = [("div-int/lit8", 0xdb, F22B), ("div-int/lit16", 0xd3, F22S)];
    REM_INT_LIT = [("rem-int/lit8", 0xdc, F22B), ("rem-int/lit16", 0xd4, F22S)];
    AND_INT_LIT = [("and-int/lit8", 0xdd, F22B), ("and-int/lit16", 0xd5, F22S)];
    OR_INT_LIT = [("or-int/lit8", 0xde, F22B), ("or-int/lit16", 0xd6, F22S)];
    XOR_INT_LIT = [("xor-int/lit8", 0xdf, F22B), ("xor-int/lit16", 0xd7, F22S)];
    SHL_INT_LIT = [("shl-int/lit8", 0xe0, F22B)];
    SHR_INT_LIT = [("shr-int/lit8", 0xe1, F22B)];
    USHR_INT_LIT = [("ushr-int/lit8", 0xe2, F22B)];
}

/// Operand arity shared by every form of an opcode family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandShape {
    pub has_dest: bool,
    pub srcs: usize,
    pub has_literal: bool,
}

impl OperandShape {
    const fn new(has_dest: bool, srcs: usize, has_literal: bool) -> Self {
        Self {
            has_dest,
            srcs,
            has_literal,
        }
    }

    /// Number of register slots (destination plus sources).
    #[must_use]
    pub const fn register_count(self) -> usize {
        self.srcs + self.has_dest as usize
    }
}

/// Opcode families. Each family groups the concrete Dalvik opcodes that
/// differ only in register/literal widths; see [`Opcode::forms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    Nop,
    ReturnVoid,
    Return,
    Move,
    MoveObject,
    Const,
    NegInt,
    NotInt,
    // Three-register arithmetic (23x)
    AddInt,
    SubInt,
    MulInt,
    DivInt,
    RemInt,
    AndInt,
    OrInt,
    XorInt,
    // Register + literal arithmetic (22b / 22s)
    AddIntLit,
    RsubInt,
    MulIntLit,
    DivIntLit,
    RemIntLit,
    AndIntLit,
    OrIntLit,
    XorIntLit,
    ShlIntLit,
    ShrIntLit,
    UshrIntLit,
}

impl Opcode {
    pub const ALL: [Self; 27] = [
        Self::Nop,
        Self::ReturnVoid,
        Self::Return,
        Self::Move,
        Self::MoveObject,
        Self::Const,
        Self::NegInt,
        Self::NotInt,
        Self::AddInt,
        Self::SubInt,
        Self::MulInt,
        Self::DivInt,
        Self::RemInt,
        Self::AndInt,
        Self::OrInt,
        Self::XorInt,
        Self::AddIntLit,
        Self::RsubInt,
        Self::MulIntLit,
        Self::DivIntLit,
        Self::RemIntLit,
        Self::AndIntLit,
        Self::OrIntLit,
        Self::XorIntLit,
        Self::ShlIntLit,
        Self::ShrIntLit,
        Self::UshrIntLit,
    ];

    /// Opcodes combining one register with an embedded literal.
    pub const LITERAL_ARITHMETIC: [Self; 11] = [
        Self::AddIntLit,
        Self::RsubInt,
        Self::MulIntLit,
        Self::DivIntLit,
        Self::RemIntLit,
        Self::AndIntLit,
        Self::OrIntLit,
        Self::XorIntLit,
        Self::ShlIntLit,
        Self::ShrIntLit,
        Self::UshrIntLit,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::ReturnVoid => "return-void",
            Self::Return => "return",
            Self::Move => "move",
            Self::MoveObject => "move-object",
            Self::Const => "const",
            Self::NegInt => "neg-int",
            Self::NotInt => "not-int",
            Self::AddInt => "add-int",
            Self::SubInt => "sub-int",
            Self::MulInt => "mul-int",
            Self::DivInt => "div-int",
            Self::RemInt => "rem-int",
            Self::AndInt => "and-int",
            Self::OrInt => "or-int",
            Self::XorInt => "xor-int",
            Self::AddIntLit => "add-int/lit",
            Self::RsubInt => "rsub-int/lit",
            Self::MulIntLit => "mul-int/lit",
            Self::DivIntLit => "div-int/lit",
            Self::RemIntLit => "rem-int/lit",
            Self::AndIntLit => "and-int/lit",
            Self::OrIntLit => "or-int/lit",
            Self::XorIntLit => "xor-int/lit",
            Self::ShlIntLit => "shl-int/lit",
            Self::ShrIntLit => "shr-int/lit",
            Self::UshrIntLit => "ushr-int/lit",
        }
    }

    #[must_use]
    pub const fn shape(self) -> OperandShape {
        match self {
            Self::Nop | Self::ReturnVoid => OperandShape::new(false, 0, false),
            Self::Return => OperandShape::new(false, 1, false),
            Self::Const => OperandShape::new(true, 0, true),
            Self::Move | Self::MoveObject | Self::NegInt | Self::NotInt => {
                OperandShape::new(true, 1, false)
            }
            Self::AddInt
            | Self::SubInt
            | Self::MulInt
            | Self::DivInt
            | Self::RemInt
            | Self::AndInt
            | Self::OrInt
            | Self::XorInt => OperandShape::new(true, 2, false),
            Self::AddIntLit
            | Self::RsubInt
            | Self::MulIntLit
            | Self::DivIntLit
            | Self::RemIntLit
            | Self::AndIntLit
            | Self::OrIntLit
            | Self::XorIntLit
            | Self::ShlIntLit
            | Self::ShrIntLit
            | Self::UshrIntLit => OperandShape::new(true, 1, true),
        }
    }

    /// Available encodings, in declaration order. Never empty.
    #[must_use]
    pub const fn forms(self) -> &'static [EncodingForm] {
        match self {
            Self::Nop => NOP,
            Self::ReturnVoid => RETURN_VOID,
            Self::Return => RETURN,
            Self::Move => MOVE,
            Self::MoveObject => MOVE_OBJECT,
            Self::Const => CONST,
            Self::NegInt => NEG_INT,
            Self::NotInt => NOT_INT,
            Self::AddInt => ADD_INT,
            Self::SubInt => SUB_INT,
            Self::MulInt => MUL_INT,
            Self::DivInt => DIV_INT,
            Self::RemInt => REM_INT,
            Self::AndInt => AND_INT,
            Self::OrInt => OR_INT,
            Self::XorInt => XOR_INT,
            Self::AddIntLit => ADD_INT_LIT,
            Self::RsubInt => RSUB_INT,
            Self::MulIntLit => MUL_INT_LIT,
            Self::DivIntLit => DIV_INT_LIT,
            Self::RemIntLit => REM_INT_LIT,
            Self::AndIntLit => AND_INT_LIT,
            Self::OrIntLit => OR_INT_LIT,
            Self::XorIntLit => XOR_INT_LIT,
            Self::ShlIntLit => SHL_INT_LIT,
            Self::ShrIntLit => SHR_INT_LIT,
            Self::UshrIntLit => USHR_INT_LIT,
        }
    }

    /// Whether at least one form can hold `value` as its literal.
    #[must_use]
    pub fn accepts_literal(self, value: i64) -> bool {
        self.forms()
            .iter()
            .filter_map(|form| form.format.literal)
            .any(|kind| kind.fits(value))
    }

    /// Look up a family by its name or by any of its form mnemonics.
    #[must_use]
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| {
            op.name() == mnemonic || op.forms().iter().any(|form| form.mnemonic == mnemonic)
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_form_agrees_with_family_shape() {
        for op in Opcode::ALL {
            let shape = op.shape();
            assert!(!op.forms().is_empty(), "{op} has no forms");
            for form in op.forms() {
                assert_eq!(
                    form.format.reg_bits.len(),
                    shape.register_count(),
                    "{} register slots disagree with {op}",
                    form.mnemonic
                );
                assert_eq!(
                    form.format.literal.is_some(),
                    shape.has_literal,
                    "{} literal slot disagrees with {op}",
                    form.mnemonic
                );
            }
        }
    }

    #[test]
    fn opcode_values_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in Opcode::ALL {
            for form in op.forms() {
                assert!(seen.insert(form.value), "duplicate value {:#04x}", form.value);
            }
        }
    }

    #[test]
    fn literal_kinds() {
        assert!(LiteralKind::Signed(4).fits(7));
        assert!(LiteralKind::Signed(4).fits(-8));
        assert!(!LiteralKind::Signed(4).fits(8));
        assert!(LiteralKind::Signed(8).fits(-128));
        assert!(!LiteralKind::Signed(8).fits(128));
        assert!(LiteralKind::High16.fits(0x1234_0000));
        assert!(LiteralKind::High16.fits(-65536));
        assert!(!LiteralKind::High16.fits(0x1234_0001));
        assert!(!LiteralKind::High16.fits(0x1_0000_0000));
    }

    #[test]
    fn literal_domain_is_union_of_forms() {
        assert!(Opcode::AddIntLit.accepts_literal(32767));
        assert!(!Opcode::AddIntLit.accepts_literal(32768));
        assert!(Opcode::ShlIntLit.accepts_literal(127));
        assert!(!Opcode::ShlIntLit.accepts_literal(128));
        assert!(Opcode::Const.accepts_literal(i64::from(i32::MIN)));
        assert!(!Opcode::Const.accepts_literal(i64::from(i32::MAX) + 1));
        assert!(!Opcode::Move.accepts_literal(0));
    }

    #[test]
    fn mnemonic_lookup() {
        assert_eq!(Opcode::from_mnemonic("move/16"), Some(Opcode::Move));
        assert_eq!(Opcode::from_mnemonic("mul-int/lit8"), Some(Opcode::MulIntLit));
        assert_eq!(Opcode::from_mnemonic("rsub-int"), Some(Opcode::RsubInt));
        assert_eq!(Opcode::from_mnemonic("add-int/lit"), Some(Opcode::AddIntLit));
        assert_eq!(Opcode::from_mnemonic("const/4"), Some(Opcode::Const));
        assert_eq!(Opcode::from_mnemonic("invoke-virtual"), None);
    }

    #[test]
    fn negate_has_only_compact_form() {
        let forms = Opcode::NegInt.forms();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].format.reg_bits, &[4, 4]);
    }
}
