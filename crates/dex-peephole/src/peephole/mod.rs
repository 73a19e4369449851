//! Peephole rewriting of method instruction streams.
//!
//! Rules are plain data: a [`Shape`] per instruction in the matched window,
//! optional [`Condition`]s over the bound variables, and a [`Template`] that
//! builds the replacement. [`rewrite`] applies a [`RuleTable`] in one pass.

pub mod pattern;
mod rewriter;
mod rules;
pub mod template;

pub use pattern::{Bindings, Condition, OpcodeMatch, Pat, Shape, Var};
pub use rewriter::{Application, Rewrite, rewrite};
pub use rules::{Rule, RuleTable};
pub use template::{Emit, LitExpr, RegExpr, Template};
