use devvm_ir::Opcode;
use pretty_assertions::assert_eq;

use super::*;

/// Minimal assembler for hand-written test bodies.
#[derive(Default)]
struct Asm(Vec<u8>);

impl Asm {
    fn op(mut self, op: Opcode) -> Self {
        self.0.push(op.byte());
        self
    }

    fn op1(mut self, op: Opcode, operand: u8) -> Self {
        self.0.extend_from_slice(&[op.byte(), operand]);
        self
    }

    fn call(mut self, op: Opcode, argc: u8, index: u8) -> Self {
        self.0.extend_from_slice(&[op.byte(), argc, index]);
        self
    }

    fn long(mut self, op: Opcode, value: i32) -> Self {
        self.0.push(op.byte());
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn build(self) -> Vec<u8> {
        self.0
    }
}

#[test]
fn straight_line_depth() {
    // return 1 + 2 * 3
    let code = Asm::default()
        .op1(Opcode::IntConst8, 1)
        .op1(Opcode::IntConst8, 2)
        .op1(Opcode::IntConst8, 3)
        .op(Opcode::IntMul)
        .op(Opcode::IntAdd)
        .op(Opcode::ReturnInt)
        .build();
    assert_eq!(
        verify(&code, 0),
        Ok(Verified {
            max_depth: 3,
            stack_slots: 3
        })
    );
}

#[test]
fn locals_add_to_stack_slots() {
    let code = Asm::default()
        .op1(Opcode::IntConst8, 4)
        .op1(Opcode::ILStore, 1)
        .op1(Opcode::ILLoad, 1)
        .op(Opcode::Pop)
        .op(Opcode::ReturnVoid)
        .build();
    assert_eq!(verify(&code, 2).map(|v| v.stack_slots), Ok(3));
}

#[test]
fn local_index_out_of_range() {
    let code = Asm::default()
        .op1(Opcode::ILLoad, 2)
        .op(Opcode::ReturnInt)
        .build();
    assert_eq!(
        verify(&code, 2),
        Err(VerifyError::InvalidLocalIndex {
            offset: 0,
            index: 2
        })
    );
}

#[test]
fn global_slots_are_not_checked_against_locals() {
    let code = Asm::default()
        .op1(Opcode::IVLoad, 9)
        .op(Opcode::ReturnInt)
        .build();
    assert!(verify(&code, 0).is_ok());
}

#[test]
fn if_else_join_agrees() {
    // if (g) x = 1 else x = 2; return x
    let code = Asm::default()
        .op1(Opcode::IVLoad, 0) // 0
        .long(Opcode::Ljz, 7) // 2 -> 14
        .op1(Opcode::IntConst8, 1) // 7
        .long(Opcode::Ljmp, 2) // 9 -> 16
        .op1(Opcode::IntConst8, 2) // 14
        .op(Opcode::ReturnInt) // 16
        .build();
    assert_eq!(verify(&code, 0).map(|v| v.max_depth), Ok(1));
}

#[test]
fn join_with_different_depths_is_a_mismatch() {
    // one arm leaves an extra value behind
    let code = Asm::default()
        .op1(Opcode::IVLoad, 0) // 0
        .long(Opcode::Ljz, 2) // 2 -> 9
        .op1(Opcode::IntConst8, 1) // 7
        .op(Opcode::ReturnVoid) // 9
        .build();
    assert_eq!(
        verify(&code, 0),
        Err(VerifyError::StackMismatch { offset: 9 })
    );
}

#[test]
fn loop_back_edge_is_consistent() {
    // loop { loopchk } with a conditional exit
    let code = Asm::default()
        .op1(Opcode::IVLoad, 0) // 0
        .long(Opcode::Ljnz, 6) // 2 -> 13
        .op(Opcode::LoopChk) // 7
        .long(Opcode::Ljmp, -13) // 8 -> 0
        .op(Opcode::ReturnVoid) // 13
        .build();
    assert!(verify(&code, 0).is_ok());
}

#[test]
fn loop_that_grows_the_stack_is_a_mismatch() {
    let code = Asm::default()
        .op1(Opcode::IntConst8, 0) // 0
        .long(Opcode::Ljmp, -7) // 2 -> 0
        .build();
    assert_eq!(
        verify(&code, 0),
        Err(VerifyError::StackMismatch { offset: 0 })
    );
}

#[test]
fn underflow() {
    let code = Asm::default().op(Opcode::Pop).op(Opcode::ReturnVoid).build();
    assert_eq!(
        verify(&code, 0),
        Err(VerifyError::StackUnderflow { offset: 0 })
    );

    let code = Asm::default().op(Opcode::Dup).build();
    assert_eq!(
        verify(&code, 0),
        Err(VerifyError::StackUnderflow { offset: 0 })
    );
}

#[test]
fn method_calls_pop_receiver() {
    let code = Asm::default()
        .op1(Opcode::IVLoad, 0)
        .op1(Opcode::IntConst8, 1)
        .op1(Opcode::IntConst8, 2)
        .call(Opcode::MethodCallInt, 2, 0)
        .op(Opcode::ReturnInt)
        .build();
    assert_eq!(verify(&code, 0).map(|v| v.max_depth), Ok(3));

    // receiver missing
    let code = Asm::default()
        .op1(Opcode::IntConst8, 1)
        .call(Opcode::MethodCallVoid, 1, 0)
        .op(Opcode::ReturnVoid)
        .build();
    assert_eq!(
        verify(&code, 0),
        Err(VerifyError::StackUnderflow { offset: 2 })
    );
}

#[test]
fn static_calls_do_not_pop_receiver() {
    let code = Asm::default()
        .op1(Opcode::IntConst8, 1)
        .call(Opcode::StaticMethodCallVoid, 1, 0)
        .call(Opcode::FunctionCallInt, 0, 3)
        .op(Opcode::ReturnInt)
        .build();
    assert!(verify(&code, 0).is_ok());
}

#[test]
fn branch_out_of_bounds() {
    let code = Asm::default()
        .long(Opcode::Ljmp, 100)
        .build();
    assert_eq!(
        verify(&code, 0),
        Err(VerifyError::InvalidBranchTarget {
            offset: 0,
            target: 105
        })
    );

    let code = Asm::default().op1(Opcode::Jmp, 0xF0).build();
    assert_eq!(
        verify(&code, 0),
        Err(VerifyError::InvalidBranchTarget {
            offset: 0,
            target: -14
        })
    );
}

#[test]
fn falling_off_the_end_is_rejected() {
    let code = Asm::default().op(Opcode::Nop).build();
    assert_eq!(
        verify(&code, 0),
        Err(VerifyError::InvalidBranchTarget {
            offset: 0,
            target: 1
        })
    );
}

#[test]
fn bad_opcode_and_truncation() {
    assert_eq!(
        verify(&[0xEE], 0),
        Err(VerifyError::UnhandledOpcode {
            offset: 0,
            byte: 0xEE
        })
    );
    assert_eq!(
        verify(&[Opcode::IntConst.byte(), 0, 0], 0),
        Err(VerifyError::Truncated { offset: 0 })
    );
}

#[test]
fn unreachable_code_is_not_checked() {
    let code = Asm::default()
        .op(Opcode::ReturnVoid)
        .op(Opcode::Pop)
        .build();
    assert!(verify(&code, 0).is_ok());
}

#[test]
fn short_branches_are_followed() {
    let code = Asm::default()
        .op1(Opcode::IVLoad, 0) // 0
        .op1(Opcode::Jz, 1) // 2 -> 5
        .op(Opcode::Nop) // 4
        .op(Opcode::ReturnVoid) // 5
        .build();
    assert!(verify(&code, 0).is_ok());
}

#[test]
fn error_messages() {
    assert_eq!(
        VerifyError::StackMismatch { offset: 9 }.to_string(),
        "Bytecode validation failed (stack mismatch at offset 9)"
    );
}
