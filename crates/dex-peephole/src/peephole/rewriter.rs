// Single-pass peephole matcher/rewriter.
//
// Scans left to right, building a fresh output vector. At each position the
// first rule (in table order) that matches, satisfies its conditions and
// instantiates to encodable instructions consumes its window. Replacements
// are never re-scanned, so every iteration consumes at least one input
// instruction and the pass terminates.

use super::RuleTable;
use crate::dex::Instruction;
use crate::{Error, Result};

/// One applied rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub rule: &'static str,
    /// Index of the first consumed instruction in the input stream.
    pub position: usize,
    pub consumed: usize,
    pub produced: usize,
}

/// Result of a pass that changed something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub instructions: Vec<Instruction>,
    pub applications: Vec<Application>,
}

impl Rewrite {
    /// Net number of instructions removed by the pass.
    #[must_use]
    pub fn removed(&self) -> usize {
        let consumed: usize = self.applications.iter().map(|app| app.consumed).sum();
        let produced: usize = self.applications.iter().map(|app| app.produced).sum();
        consumed.saturating_sub(produced)
    }
}

/// Rewrite one method's instruction stream.
///
/// Returns `Ok(None)` when no rule applied. An `Err` means the rule table is
/// defective (a template violated its opcode's arity or literal range); the
/// caller must keep the original stream.
pub fn rewrite(stream: &[Instruction], table: &RuleTable) -> Result<Option<Rewrite>> {
    let mut out = Vec::with_capacity(stream.len());
    let mut applications = Vec::new();
    let mut pos = 0;

    'scan: while pos < stream.len() {
        for rule in table {
            let Some(window) = stream.get(pos..pos + rule.window_len()) else {
                continue;
            };
            let Some(bindings) = rule.matches(window) else {
                continue;
            };
            match rule.instantiate(&bindings) {
                Ok(replacement) => {
                    tracing::trace!(
                        rule = rule.name(),
                        position = pos,
                        consumed = window.len(),
                        produced = replacement.len(),
                        "peephole rewrite"
                    );
                    applications.push(Application {
                        rule: rule.name(),
                        position: pos,
                        consumed: window.len(),
                        produced: replacement.len(),
                    });
                    out.extend(replacement);
                    pos += window.len();
                    continue 'scan;
                }
                Err(Error::NotEncodable { opcode, registers }) => {
                    tracing::trace!(
                        rule = rule.name(),
                        position = pos,
                        %opcode,
                        ?registers,
                        "replacement not encodable, rule skipped"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        out.push(stream[pos].clone());
        pos += 1;
    }

    if applications.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Rewrite {
            instructions: out,
            applications,
        }))
    }
}
