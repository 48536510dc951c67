use devvm_ir::opcode::{decode, Instruction, Operand};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn finished(emit: Emitter) -> Vec<u8> {
    match emit.finish() {
        Ok(code) => code,
        Err(err) => panic!("unfinished body: {err:?}"),
    }
}

#[test]
fn short_constants_use_one_byte() {
    let mut emit = Emitter::new();
    emit.load_const(-128);
    emit.load_const(127);
    emit.load_const(128);
    emit.load_const(-129);
    let code = finished(emit);
    assert_eq!(
        code,
        vec![
            Opcode::IntConst8.byte(),
            0x80,
            Opcode::IntConst8.byte(),
            0x7F,
            Opcode::IntConst.byte(),
            0x80,
            0,
            0,
            0,
            Opcode::IntConst.byte(),
            0x7F,
            0xFF,
            0xFF,
            0xFF,
        ]
    );
}

#[test]
fn patch_measures_from_end_of_operand() {
    let mut emit = Emitter::new();
    let patch = emit.placeholder(Opcode::Ljz);
    emit.op(Opcode::Nop);
    emit.op(Opcode::Nop);
    emit.patch_to_here(patch);
    emit.op(Opcode::ReturnVoid);
    let code = finished(emit);

    let Some(Ok(insn)) = decode(&code, 0) else {
        panic!("bad branch");
    };
    assert_eq!(insn.operand, Operand::Branch(2));
    assert_eq!(insn.branch_target(0), Some(7));
}

#[test]
fn backward_jump() {
    let mut emit = Emitter::new();
    emit.op(Opcode::LoopChk);
    emit.jump_to(Opcode::Ljmp, 0);
    let code = finished(emit);
    let Some(Ok(insn)) = decode(&code, 1) else {
        panic!("bad branch");
    };
    assert_eq!(insn.branch_target(1), Some(0));
}

#[test]
fn loop_exit_resolves_every_break() {
    let mut emit = Emitter::new();
    let exit = emit.begin_loop();
    assert_eq!(emit.current_loop(), Some(exit));
    emit.branch_to_label(Opcode::Ljmp, exit); // 0
    emit.branch_to_label(Opcode::Ljz, exit); // 5
    assert!(emit.end_loop());
    assert_eq!(emit.current_loop(), None);
    emit.op(Opcode::ReturnVoid); // 10
    let code = finished(emit);

    for ip in [0, 5] {
        let Some(Ok(insn)) = decode(&code, ip) else {
            panic!("bad branch at {ip}");
        };
        assert_eq!(insn.branch_target(ip), Some(10));
    }
}

#[test]
fn loop_without_break_reports_no_exit() {
    let mut emit = Emitter::new();
    emit.begin_loop();
    emit.op(Opcode::LoopChk);
    assert!(!emit.end_loop());
}

#[test]
fn nested_loops_resolve_independently() {
    let mut emit = Emitter::new();
    let outer = emit.begin_loop();
    let inner = emit.begin_loop();
    assert_ne!(outer, inner);
    emit.branch_to_label(Opcode::Ljmp, outer);
    assert!(!emit.end_loop());
    assert!(emit.end_loop());
    assert!(emit.finish().is_ok());
}

#[test]
fn leftover_patches_are_reported() {
    let mut emit = Emitter::new();
    let label = emit.new_label();
    emit.branch_to_label(Opcode::Ljmp, label);
    assert_eq!(emit.finish(), Err(FinishError::UnresolvedBranches(1)));

    let mut emit = Emitter::new();
    emit.begin_loop();
    assert_eq!(emit.finish(), Err(FinishError::OpenLoops(1)));
}

proptest! {
    #[test]
    fn constants_decode_to_the_same_value(value in any::<i32>()) {
        let mut emit = Emitter::new();
        emit.load_const(value);
        let code = finished(emit);

        let expected_op = if (-128..=127).contains(&value) { Opcode::IntConst8 } else { Opcode::IntConst };
        prop_assert_eq!(code.len(), expected_op.len());
        prop_assert_eq!(
            decode(&code, 0),
            Some(Ok(Instruction { opcode: expected_op, operand: Operand::Int(value) }))
        );
    }
}
