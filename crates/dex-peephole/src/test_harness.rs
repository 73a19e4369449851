//! Test harness for peephole tests
//!
//! Instruction streams are written as assembly text and compared with the
//! same structural equality the rewriter uses.
//!
//! # Example
//!
//! ```rust
//! use dex_peephole::test_harness::*;
//!
//! assert_rewrites_to(
//!     &["const/16 v0, #42", "mul-int/lit8 v1, v0, #-1"],
//!     &["const/16 v0, #42", "neg-int v1, v0"],
//! );
//! assert_unchanged(&["const/16 v0, #42", "add-int/lit8 v1, v0, #15"]);
//! ```

#![allow(
    clippy::must_use_candidate,
    clippy::manual_assert,
    clippy::missing_panics_doc,
    clippy::uninlined_format_args
)]

use crate::config::ConfigFiles;
use crate::dex::Instruction;
use crate::driver::{DexClass, DexMethod, DexStore, PassStats, PeepholePass};
use crate::peephole::{RuleTable, rewrite};

/// Parse one instruction per string, panicking on malformed text.
pub fn asm(lines: &[&str]) -> Vec<Instruction> {
    lines
        .iter()
        .map(|line| {
            line.parse()
                .unwrap_or_else(|e| panic!("bad instruction '{}': {}", line, e))
        })
        .collect()
}

fn show(insns: &[Instruction]) -> String {
    if insns.is_empty() {
        return "(empty)".to_string();
    }
    insns
        .iter()
        .map(|insn| format!("\n\t{insn}"))
        .collect()
}

/// Run the standard table over `input` and compare with `expected`.
pub fn assert_rewrites_to(input: &[&str], expected: &[&str]) {
    assert_rewrites_to_with(RuleTable::standard(), input, expected);
}

pub fn assert_rewrites_to_with(table: &RuleTable, input: &[&str], expected: &[&str]) {
    let input = asm(input);
    let expected = asm(expected);
    let actual = rewrite(&input, table)
        .unwrap_or_else(|e| panic!("rewrite failed: {}", e))
        .map_or_else(|| input.clone(), |result| result.instructions);
    if actual != expected {
        panic!(
            "rewrite mismatch\ninput:{}\nexpected:{}\nactual:{}",
            show(&input),
            show(&expected),
            show(&actual)
        );
    }
}

/// The standard table must leave `input` alone.
pub fn assert_unchanged(input: &[&str]) {
    let insns = asm(input);
    if let Some(result) = rewrite(&insns, RuleTable::standard())
        .unwrap_or_else(|e| panic!("rewrite failed: {}", e))
    {
        panic!(
            "expected no change, but {:?} applied\ninput:{}\nactual:{}",
            result.applications.iter().map(|app| app.rule).collect::<Vec<_>>(),
            show(&insns),
            show(&result.instructions)
        );
    }
}

/// Wrap `code` in a single store/class/method, run `pass` over it and return
/// the committed instructions with the pass counters.
pub fn run_pass_on_method(
    pass: &PeepholePass,
    config: &ConfigFiles,
    annotations: &[&str],
    code: Vec<Instruction>,
) -> (Vec<Instruction>, PassStats) {
    let mut stores = vec![DexStore {
        name: "classes".to_string(),
        classes: vec![DexClass {
            name: "LPeepholeTest;".to_string(),
            annotations: annotations.iter().map(ToString::to_string).collect(),
            methods: vec![DexMethod {
                name: "test".to_string(),
                code: Some(code),
            }],
        }],
    }];
    let stats = pass.run(&mut stores, config);
    let code = stores
        .pop()
        .and_then(|mut store| store.classes.pop())
        .and_then(|mut class| class.methods.pop())
        .and_then(|method| method.code)
        .expect("method code disappeared");
    (code, stats)
}
