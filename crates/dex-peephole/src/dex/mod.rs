// Dalvik encodings pack registers and literals into 16-bit code units with
// explicit 'as' casts.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

mod asm;
pub mod encoding;
mod instruction;
mod opcode;

pub use asm::parse_listing;
pub use encoding::{narrowest_form, select_form};
pub use instruction::Instruction;
pub use opcode::{EncodingForm, Format, FormatId, LiteralKind, Opcode, OperandShape, Reg};
