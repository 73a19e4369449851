use crate::dex::{Opcode, Reg};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "Arity error for {opcode}: expected {} destination and {expected_srcs} source(s), got {} destination and {got_srcs} source(s)",
        u8::from(*expected_dest),
        u8::from(*got_dest)
    )]
    Arity {
        opcode: Opcode,
        expected_dest: bool,
        expected_srcs: usize,
        got_dest: bool,
        got_srcs: usize,
    },

    #[error("Literal {literal:?} is not valid for {opcode}")]
    LiteralRange {
        opcode: Opcode,
        literal: Option<i64>,
    },

    #[error("Source index {index} out of range ({len} sources)")]
    Index { index: usize, len: usize },

    #[error("No encoding of {opcode} can represent registers {registers:?}")]
    NotEncodable { opcode: Opcode, registers: Vec<Reg> },

    #[error("Malformed rule '{rule}': {reason}")]
    MalformedRule { rule: String, reason: String },

    #[error("Cannot convert config value '{key}': {reason}")]
    Conversion { key: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
