//! Textual assembly for instructions.
//!
//! The syntax is the one produced by `Display`:
//!
//! ```text
//! const/16 v0, #42
//! mul-int/lit8 v17, v0, #-1
//! move v1, v0
//! ```
//!
//! Any form mnemonic (`add-int/lit16`) or family name (`add-int/lit`) is
//! accepted. A form mnemonic must be able to encode its operands; the form
//! itself is not stored and is re-derived from the operands when printing.
//! Where a family shares its name with a form (`move`, `const`), the family
//! reading wins.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use super::{Instruction, Opcode, Reg, encoding};
use crate::{Error, Result};

impl FromStr for Instruction {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (mnemonic, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let opcode = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| Error::Parse(format!("unknown mnemonic '{mnemonic}'")))?;

        let mut registers = Vec::new();
        let mut literal = None;
        for operand in rest.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(reg) = operand.strip_prefix('v') {
                if literal.is_some() {
                    return Err(Error::Parse(format!(
                        "register '{operand}' after literal in '{line}'"
                    )));
                }
                registers.push(parse_reg(reg, line)?);
            } else if let Some(value) = operand.strip_prefix('#') {
                if literal.replace(parse_literal(value, line)?).is_some() {
                    return Err(Error::Parse(format!("more than one literal in '{line}'")));
                }
            } else {
                return Err(Error::Parse(format!(
                    "unrecognized operand '{operand}' in '{line}'"
                )));
            }
        }

        let (dest, srcs) = if opcode.shape().has_dest {
            match registers.split_first() {
                Some((dest, srcs)) => (Some(*dest), srcs),
                None => (None, &registers[..]),
            }
        } else {
            (None, &registers[..])
        };
        let insn = Instruction::new(opcode, dest, srcs, literal)?;
        if mnemonic != opcode.name() {
            let fits = opcode
                .forms()
                .iter()
                .find(|form| form.mnemonic == mnemonic)
                .is_some_and(|form| encoding::form_fits(form, &insn));
            if !fits {
                return Err(Error::Parse(format!(
                    "operands of '{line}' do not fit {mnemonic}"
                )));
            }
        }
        Ok(insn)
    }
}

fn parse_reg(text: &str, line: &str) -> Result<Reg> {
    text.parse()
        .map_err(|_| Error::Parse(format!("invalid register 'v{text}' in '{line}'")))
}

fn parse_literal(text: &str, line: &str) -> Result<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse(),
    }
    .map_err(|_| Error::Parse(format!("invalid literal '#{text}' in '{line}'")))?;
    Ok(if negative { -magnitude } else { magnitude })
}

// Instructions travel through JSON as their assembly text.
impl Serialize for Instruction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Instruction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Parse one instruction per line. Blank lines and `//` comments are skipped.
pub fn parse_listing(text: &str) -> Result<Vec<Instruction>> {
    text.lines()
        .map(|line| line.split_once("//").map_or(line, |(code, _)| code).trim())
        .filter(|line| !line.is_empty())
        .map(str::parse)
        .collect()
}
