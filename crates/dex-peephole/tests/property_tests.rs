//! Property tests for the standard rule table.
//!
//! Streams are drawn from constant loads, moves and literal arithmetic over a
//! small register file so that far registers (beyond the 4-bit range) show
//! up regularly. A tiny interpreter checks that rewriting never changes the
//! observable register state.

use dex_peephole::dex::select_form;
use dex_peephole::peephole::Rewrite;
use dex_peephole::{Instruction, Opcode, RuleTable, rewrite};
use proptest::prelude::*;

const REGISTERS: usize = 24;

// =============================================================================
// Interpreter
// =============================================================================

#[allow(clippy::cast_possible_truncation)]
fn execute(code: &[Instruction], mut regs: [i32; REGISTERS]) -> [i32; REGISTERS] {
    for insn in code {
        let src = |i: usize| regs[usize::from(insn.srcs()[i])];
        let lit = insn.literal().map_or(0, |value| value as i32);
        let value = match insn.opcode() {
            Opcode::Const => lit,
            Opcode::Move | Opcode::MoveObject => src(0),
            Opcode::NegInt => src(0).wrapping_neg(),
            Opcode::NotInt => !src(0),
            Opcode::AddInt => src(0).wrapping_add(src(1)),
            Opcode::AddIntLit => src(0).wrapping_add(lit),
            Opcode::RsubInt => lit.wrapping_sub(src(0)),
            Opcode::MulIntLit => src(0).wrapping_mul(lit),
            Opcode::DivIntLit => src(0).wrapping_div(lit),
            Opcode::RemIntLit => src(0).wrapping_rem(lit),
            Opcode::AndIntLit => src(0) & lit,
            Opcode::OrIntLit => src(0) | lit,
            Opcode::XorIntLit => src(0) ^ lit,
            Opcode::ShlIntLit => src(0).wrapping_shl(lit as u32 & 0x1f),
            Opcode::ShrIntLit => src(0).wrapping_shr(lit as u32 & 0x1f),
            Opcode::UshrIntLit => ((src(0) as u32) >> (lit as u32 & 0x1f)) as i32,
            other => panic!("interpreter does not model {other}"),
        };
        let dest = insn.dest().expect("modelled opcodes write a register");
        regs[usize::from(dest)] = value;
    }
    regs
}

// =============================================================================
// Strategies
// =============================================================================

fn reg() -> impl Strategy<Value = u16> {
    0u16..REGISTERS as u16
}

/// Identity and absorbing literals are overrepresented.
fn literal() -> impl Strategy<Value = i64> {
    prop_oneof![
        3 => prop::sample::select(vec![0i64, 1, -1, 32, 64, -32]),
        1 => -128i64..128,
        1 => -32768i64..32768,
    ]
}

fn lit_arith() -> impl Strategy<Value = Instruction> {
    (
        prop::sample::select(Opcode::LITERAL_ARITHMETIC.to_vec()),
        reg(),
        reg(),
        literal(),
    )
        .prop_filter_map("unencodable or division by zero", |(op, d, s, l)| {
            if matches!(op, Opcode::DivIntLit | Opcode::RemIntLit) && l == 0 {
                return None;
            }
            Instruction::lit_op(op, d, s, l)
                .ok()
                .filter(|insn| select_form(insn).is_ok())
        })
}

fn instruction() -> impl Strategy<Value = Instruction> {
    prop_oneof![
        4 => lit_arith(),
        1 => (reg(), literal()).prop_map(|(d, l)| Instruction::konst(d, l).unwrap()),
        1 => (reg(), reg()).prop_map(|(d, s)| Instruction::move_(d, s)),
        1 => (reg(), reg(), reg())
            .prop_map(|(d, a, b)| Instruction::binop(Opcode::AddInt, d, a, b).unwrap()),
    ]
}

fn stream() -> impl Strategy<Value = Vec<Instruction>> {
    prop::collection::vec(instruction(), 0..24)
}

fn initial_registers() -> impl Strategy<Value = [i32; REGISTERS]> {
    prop::array::uniform24(any::<i32>())
}

fn run(code: &[Instruction]) -> Option<Rewrite> {
    rewrite(code, RuleTable::standard()).expect("standard table has no defects")
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Rewritten code computes the same registers as the input.
    #[test]
    fn rewriting_preserves_register_state(code in stream(), regs in initial_registers()) {
        if let Some(result) = run(&code) {
            prop_assert_eq!(execute(&result.instructions, regs), execute(&code, regs));
        }
    }

    /// Every emitted instruction has a real encoding.
    #[test]
    fn output_is_encodable(code in stream()) {
        if let Some(result) = run(&code) {
            for insn in &result.instructions {
                prop_assert!(select_form(insn).is_ok(), "unencodable output {}", insn);
            }
        }
    }

    /// A pass never grows the stream, and every application consumes input.
    #[test]
    fn rewriting_is_bounded(code in stream()) {
        if let Some(result) = run(&code) {
            prop_assert!(result.instructions.len() <= code.len());
            prop_assert!(result.applications.len() <= code.len());
            prop_assert!(result.applications.iter().all(|app| app.consumed >= 1));
            prop_assert_eq!(code.len() - result.instructions.len(), result.removed());
        }
    }

    /// Windows are disjoint, in order, and inside the input.
    #[test]
    fn windows_do_not_overlap(code in stream()) {
        if let Some(result) = run(&code) {
            let mut next_free = 0;
            for app in &result.applications {
                prop_assert!(app.position >= next_free);
                next_free = app.position + app.consumed;
            }
            prop_assert!(next_free <= code.len());

            let consumed: usize = result.applications.iter().map(|app| app.consumed).sum();
            let produced: usize = result.applications.iter().map(|app| app.produced).sum();
            prop_assert_eq!(result.instructions.len(), code.len() - consumed + produced);
        }
    }

    /// A second pass over rewritten code finds nothing to do.
    #[test]
    fn standard_table_is_idempotent(code in stream()) {
        if let Some(result) = run(&code) {
            let again = run(&result.instructions);
            prop_assert!(
                again.is_none(),
                "second pass applied {:?}",
                again.map(|r| r.applications)
            );
        }
    }

    /// Literal identities into a distinct low register always become a move.
    #[test]
    fn identity_literals_become_moves(
        (op, value) in prop::sample::select(vec![
            (Opcode::AddIntLit, 0i64),
            (Opcode::MulIntLit, 1),
            (Opcode::DivIntLit, 1),
            (Opcode::OrIntLit, 0),
            (Opcode::XorIntLit, 0),
            (Opcode::AndIntLit, -1),
            (Opcode::ShlIntLit, 0),
            (Opcode::ShrIntLit, 32),
            (Opcode::UshrIntLit, 64),
        ]),
        dest in 0u16..16,
        src in 0u16..16,
    ) {
        prop_assume!(dest != src);
        let insn = Instruction::lit_op(op, dest, src, value).unwrap();
        let result = run(&[insn]).expect("identity must be rewritten");
        prop_assert_eq!(result.instructions, vec![Instruction::move_(dest, src)]);
    }

    /// Literals that are not identities are left alone.
    #[test]
    fn other_add_literals_are_kept(dest in reg(), src in reg(), value in 1i64..128) {
        let insn = Instruction::lit_op(Opcode::AddIntLit, dest, src, value).unwrap();
        prop_assert!(run(&[insn]).is_none());
    }
}
