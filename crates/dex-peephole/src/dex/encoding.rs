// Encodability oracle and code-unit encoder.
//
// Everything here is derived from `Opcode::forms()`; there is no separate
// width table to keep in sync.

use super::{EncodingForm, FormatId, Instruction, Opcode, Reg};
use crate::{Error, Result};

/// Narrowest form of `opcode` whose register slots fit `registers`.
///
/// `registers` is in slot order (destination first, then sources). Forms are
/// ranked by code-unit size; equal sizes keep declaration order. Literals are
/// not considered, see [`select_form`].
pub fn narrowest_form(opcode: Opcode, registers: &[Reg]) -> Result<&'static EncodingForm> {
    pick(opcode, registers, |_| true)
}

/// Narrowest form able to encode `insn`, literal included.
pub fn select_form(insn: &Instruction) -> Result<&'static EncodingForm> {
    pick(insn.opcode(), &insn.registers(), |form| literal_fits(form, insn.literal()))
}

/// Whether `form` can encode `insn` exactly as given.
#[must_use]
pub fn form_fits(form: &EncodingForm, insn: &Instruction) -> bool {
    form.format.accommodates(&insn.registers()) && literal_fits(form, insn.literal())
}

fn literal_fits(form: &EncodingForm, literal: Option<i64>) -> bool {
    match (form.format.literal, literal) {
        (Some(kind), Some(value)) => kind.fits(value),
        (None, None) => true,
        _ => false,
    }
}

/// Whether `opcode` has any form that can address `registers`.
#[must_use]
pub fn is_encodable(opcode: Opcode, registers: &[Reg]) -> bool {
    narrowest_form(opcode, registers).is_ok()
}

fn pick(
    opcode: Opcode,
    registers: &[Reg],
    literal_fits: impl Fn(&EncodingForm) -> bool,
) -> Result<&'static EncodingForm> {
    opcode
        .forms()
        .iter()
        .filter(|form| form.format.accommodates(registers) && literal_fits(form))
        // min_by_key returns the first minimum, preserving declaration order on ties.
        .min_by_key(|form| form.format.units)
        .ok_or_else(|| Error::NotEncodable {
            opcode,
            registers: registers.to_vec(),
        })
}

/// Encode `insn` into Dalvik code units using its narrowest form.
pub fn encode(insn: &Instruction) -> Result<Vec<u16>> {
    let form = select_form(insn)?;
    let op = u16::from(form.value);
    let regs = insn.registers();
    // Literals were range-checked by `select_form`; truncation keeps the
    // two's-complement bits the format stores.
    let lit = insn.literal().unwrap_or(0);

    let units = match form.format.id {
        FormatId::F10x => vec![op],
        FormatId::F11x => vec![op | regs[0] << 8],
        FormatId::F12x => vec![op | nibble(regs[0]) << 8 | nibble(regs[1]) << 12],
        FormatId::F11n => vec![op | nibble(regs[0]) << 8 | ((lit as u16) & 0xF) << 12],
        FormatId::F22x => vec![op | regs[0] << 8, regs[1]],
        FormatId::F21s => vec![op | regs[0] << 8, lit as u16],
        FormatId::F21h => vec![op | regs[0] << 8, (lit >> 16) as u16],
        FormatId::F23x => vec![op | regs[0] << 8, regs[1] | regs[2] << 8],
        FormatId::F22b => vec![op | regs[0] << 8, regs[1] | u16::from(lit as u8) << 8],
        FormatId::F22s => vec![
            op | nibble(regs[0]) << 8 | nibble(regs[1]) << 12,
            lit as u16,
        ],
        FormatId::F32x => vec![op, regs[0], regs[1]],
        FormatId::F31i => vec![op | regs[0] << 8, lit as u16, (lit >> 16) as u16],
    };
    debug_assert_eq!(units.len(), usize::from(form.format.units));
    Ok(units)
}

const fn nibble(reg: Reg) -> u16 {
    reg & 0x0F
}
