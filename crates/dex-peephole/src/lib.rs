#![allow(
    clippy::missing_errors_doc, // error variants are documented on `Error`
    clippy::module_name_repetitions
)]

pub mod config;
pub mod dex;
pub mod driver;
pub mod error;
pub mod peephole;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use config::{ConfigFiles, JsonConfig};
pub use dex::{Instruction, Opcode, Reg};
pub use driver::{DexClass, DexMethod, DexStore, PassStats, PeepholePass};
pub use error::{Error, Result};
pub use peephole::{RuleTable, rewrite};
