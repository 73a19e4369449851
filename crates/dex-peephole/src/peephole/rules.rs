use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::pattern::{Bindings, Condition, LIT, OpcodeMatch, Pat, RA, RD, RS, Shape, Var, lit, reg};
use super::template::{Emit, LitExpr, RegExpr, Template};
use crate::dex::{Instruction, Opcode};
use crate::{Error, Result};

/// A rewrite rule: a window pattern, side-conditions, and a replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: &'static str,
    pattern: Vec<Shape>,
    conditions: Vec<Condition>,
    template: Template,
}

impl Rule {
    #[must_use]
    pub fn new(name: &'static str, pattern: Vec<Shape>, template: Template) -> Self {
        Self {
            name,
            pattern,
            conditions: Vec::new(),
            template,
        }
    }

    /// Add a side-condition.
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of instructions the pattern consumes.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.pattern.len()
    }

    /// Bindings if `window` matches the pattern and every side-condition holds.
    #[must_use]
    pub fn matches(&self, window: &[Instruction]) -> Option<Bindings> {
        if window.len() != self.pattern.len() {
            return None;
        }
        let mut bindings = Bindings::default();
        let shapes_match = self
            .pattern
            .iter()
            .zip(window)
            .all(|(shape, insn)| shape.matches(insn, &mut bindings));
        (shapes_match && self.conditions.iter().all(|c| c.holds(&bindings))).then_some(bindings)
    }

    /// Build the replacement for a successful match.
    pub fn instantiate(&self, bindings: &Bindings) -> Result<Vec<Instruction>> {
        self.template.instantiate(bindings).map_err(|err| match err {
            Error::MalformedRule { reason, .. } => Error::MalformedRule {
                rule: self.name.to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Static well-formedness check.
    ///
    /// Every shape must be satisfiable by its opcodes' operand shapes, every
    /// variable must be used consistently as a register or a literal, and
    /// every template instruction must only read variables the pattern binds.
    pub fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(self.malformed("empty pattern".to_string()));
        }

        let mut kinds: HashMap<Var, VarKind> = HashMap::new();
        let mut declare = |var: Var, kind: VarKind| -> Result<()> {
            match kinds.insert(var, kind) {
                Some(previous) if previous != kind => Err(self.malformed(format!(
                    "variable {var} used as both {previous:?} and {kind:?}"
                ))),
                _ => Ok(()),
            }
        };

        for (index, shape) in self.pattern.iter().enumerate() {
            for &opcode in shape.opcode.opcodes() {
                let op_shape = opcode.shape();
                if op_shape.has_dest != shape.dest.is_some()
                    || op_shape.srcs != shape.srcs.len()
                    || op_shape.has_literal != shape.literal.is_some()
                {
                    return Err(self.malformed(format!(
                        "pattern instruction {index} can never match {opcode}"
                    )));
                }
            }
            if let OpcodeMatch::AnyOf(opcodes) = shape.opcode {
                if opcodes.is_empty() {
                    return Err(
                        self.malformed(format!("pattern instruction {index} matches no opcode"))
                    );
                }
            }
            for var in shape.dest.iter().chain(&shape.srcs).filter_map(Pat::var) {
                declare(var, VarKind::Reg)?;
            }
            if let Some(var) = shape.literal.as_ref().and_then(Pat::var) {
                declare(var, VarKind::Lit)?;
            }
        }

        let check = |var: Var, kind: VarKind| -> Result<()> {
            match kinds.get(&var) {
                Some(&bound) if bound == kind => Ok(()),
                Some(&bound) => Err(self.malformed(format!(
                    "variable {var} is a {bound:?} but is read as a {kind:?}"
                ))),
                None => Err(self.malformed(format!("variable {var} is never bound"))),
            }
        };

        for condition in &self.conditions {
            for var in condition.reg_vars() {
                check(var, VarKind::Reg)?;
            }
            for var in condition.literal_vars() {
                check(var, VarKind::Lit)?;
            }
        }

        for emit in self.template.emits() {
            let op_shape = emit.opcode.shape();
            if op_shape.has_dest != emit.dest.is_some()
                || op_shape.srcs != emit.srcs.len()
                || op_shape.has_literal != emit.literal.is_some()
            {
                return Err(self.malformed(format!(
                    "template instruction {} has the wrong operands",
                    emit.opcode
                )));
            }
            for expr in emit.dest.iter().chain(&emit.srcs) {
                if let RegExpr::Var(var) = *expr {
                    check(var, VarKind::Reg)?;
                }
            }
            match emit.literal {
                Some(LitExpr::Var(var)) => check(var, VarKind::Lit)?,
                Some(LitExpr::Const(value)) if !emit.opcode.accepts_literal(value) => {
                    return Err(self.malformed(format!(
                        "constant #{value} does not fit {}",
                        emit.opcode
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn malformed(&self, reason: String) -> Error {
        Error::MalformedRule {
            rule: self.name.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarKind {
    Reg,
    Lit,
}

/// Ordered rule collection. Earlier rules win when several match at the
/// same position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

static STANDARD: LazyLock<RuleTable> = LazyLock::new(|| {
    let table = RuleTable {
        rules: standard_rules(),
    };
    debug_assert!(table.rules.iter().all(|rule| rule.validate().is_ok()));
    table
});

impl RuleTable {
    /// Build a table, rejecting malformed rules and duplicate names.
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut names = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !names.insert(rule.name) {
                return Err(rule.malformed("duplicate rule name".to_string()));
            }
        }
        Ok(Self { rules })
    }

    /// The built-in literal-arithmetic idioms, shared process-wide.
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Copy of this table without the named rules. Unknown names are ignored.
    #[must_use]
    pub fn without(&self, disabled: &HashSet<String>) -> Self {
        Self {
            rules: self
                .rules
                .iter()
                .filter(|rule| !disabled.contains(rule.name))
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(Rule::name).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

// Opcode groups by identity literal.
const ZERO_IS_IDENTITY: &[Opcode] = &[Opcode::AddIntLit, Opcode::OrIntLit, Opcode::XorIntLit];
const ONE_IS_IDENTITY: &[Opcode] = &[Opcode::MulIntLit, Opcode::DivIntLit];
const SHIFTS: &[Opcode] = &[Opcode::ShlIntLit, Opcode::ShrIntLit, Opcode::UshrIntLit];
const MOVES: &[Opcode] = &[Opcode::Move, Opcode::MoveObject];

/// `op vD, vS, #lit` with all three operands bound.
fn lit_arith(opcodes: OpcodeMatch) -> Shape {
    let shape = match opcodes {
        OpcodeMatch::Exact(opcode) => Shape::op(opcode),
        OpcodeMatch::AnyOf(opcodes) => Shape::any_of(opcodes),
    };
    shape.dest(reg(RD)).src(reg(RS)).lit(lit(LIT))
}

fn to_move() -> Template {
    Template::new(vec![Emit::unary(Opcode::Move, RD, RS)])
}

fn to_unary(opcode: Opcode) -> Template {
    Template::new(vec![Emit::unary(opcode, RD, RS)])
}

// Dalvik masks int shift distances to their low five bits.
const SHIFT_BY_ZERO: Condition = Condition::LiteralMasked {
    var: LIT,
    mask: 0x1f,
    expected: 0,
};

fn standard_rules() -> Vec<Rule> {
    use OpcodeMatch::{AnyOf, Exact};

    vec![
        Rule::new(
            "remove_self_move",
            vec![Shape::any_of(MOVES).dest(reg(RA)).src(reg(RA))],
            Template::empty(),
        ),
        // Identities that write their own source are dropped outright.
        Rule::new(
            "lit_zero_identity_in_place",
            vec![lit_arith(AnyOf(ZERO_IS_IDENTITY))],
            Template::empty(),
        )
        .when(Condition::LiteralIs(LIT, 0))
        .when(Condition::SameReg(RD, RS)),
        Rule::new(
            "lit_one_identity_in_place",
            vec![lit_arith(AnyOf(ONE_IS_IDENTITY))],
            Template::empty(),
        )
        .when(Condition::LiteralIs(LIT, 1))
        .when(Condition::SameReg(RD, RS)),
        Rule::new(
            "and_lit_all_ones_in_place",
            vec![lit_arith(Exact(Opcode::AndIntLit))],
            Template::empty(),
        )
        .when(Condition::LiteralIs(LIT, -1))
        .when(Condition::SameReg(RD, RS)),
        Rule::new(
            "shift_by_zero_in_place",
            vec![lit_arith(AnyOf(SHIFTS))],
            Template::empty(),
        )
        .when(SHIFT_BY_ZERO)
        .when(Condition::SameReg(RD, RS)),
        Rule::new(
            "add_lit_zero_to_move",
            vec![lit_arith(Exact(Opcode::AddIntLit))],
            to_move(),
        )
        .when(Condition::LiteralIs(LIT, 0))
        .when(Condition::DistinctRegs(RD, RS)),
        Rule::new(
            "mul_lit_one_to_move",
            vec![lit_arith(Exact(Opcode::MulIntLit))],
            to_move(),
        )
        .when(Condition::LiteralIs(LIT, 1))
        .when(Condition::DistinctRegs(RD, RS)),
        Rule::new(
            "mul_lit_neg_one_to_neg",
            vec![lit_arith(Exact(Opcode::MulIntLit))],
            to_unary(Opcode::NegInt),
        )
        .when(Condition::LiteralIs(LIT, -1)),
        // Dalvik defines MIN_INT / -1 as MIN_INT, which is also what neg-int yields.
        Rule::new(
            "div_lit_neg_one_to_neg",
            vec![lit_arith(Exact(Opcode::DivIntLit))],
            to_unary(Opcode::NegInt),
        )
        .when(Condition::LiteralIs(LIT, -1)),
        Rule::new(
            "div_lit_one_to_move",
            vec![lit_arith(Exact(Opcode::DivIntLit))],
            to_move(),
        )
        .when(Condition::LiteralIs(LIT, 1))
        .when(Condition::DistinctRegs(RD, RS)),
        Rule::new(
            "rsub_zero_to_neg",
            vec![lit_arith(Exact(Opcode::RsubInt))],
            to_unary(Opcode::NegInt),
        )
        .when(Condition::LiteralIs(LIT, 0)),
        Rule::new(
            "xor_lit_neg_one_to_not",
            vec![lit_arith(Exact(Opcode::XorIntLit))],
            to_unary(Opcode::NotInt),
        )
        .when(Condition::LiteralIs(LIT, -1)),
        Rule::new(
            "bitwise_lit_zero_to_move",
            vec![lit_arith(AnyOf(&[Opcode::OrIntLit, Opcode::XorIntLit]))],
            to_move(),
        )
        .when(Condition::LiteralIs(LIT, 0))
        .when(Condition::DistinctRegs(RD, RS)),
        Rule::new(
            "and_lit_all_ones_to_move",
            vec![lit_arith(Exact(Opcode::AndIntLit))],
            to_move(),
        )
        .when(Condition::LiteralIs(LIT, -1))
        .when(Condition::DistinctRegs(RD, RS)),
        Rule::new("shift_by_zero_to_move", vec![lit_arith(AnyOf(SHIFTS))], to_move())
            .when(SHIFT_BY_ZERO)
            .when(Condition::DistinctRegs(RD, RS)),
    ]
}
