use super::*;
use proptest::prelude::*;

#[test]
fn byte_values_follow_declaration_order() {
    for (i, op) in Opcode::ALL.iter().enumerate() {
        assert_eq!(usize::from(op.byte()), i, "{op}");
        assert_eq!(Opcode::from_byte(op.byte()), Some(*op));
    }
    assert_eq!(Opcode::from_byte(47), None);
    assert_eq!(Opcode::from_byte(0xFF), None);
}

#[test]
fn instruction_lengths() {
    assert_eq!(Opcode::Nop.len(), 1);
    assert_eq!(Opcode::IntConst8.len(), 2);
    assert_eq!(Opcode::IntConst.len(), 5);
    assert_eq!(Opcode::ILStore.len(), 2);
    assert_eq!(Opcode::Jz.len(), 2);
    assert_eq!(Opcode::Ljmp.len(), 5);
    assert_eq!(Opcode::MethodCallInt.len(), 3);
    assert_eq!(Opcode::ReturnInt.len(), 1);
}

#[test]
fn call_stack_effects() {
    let effect = Opcode::MethodCallVoid.stack_effect();
    assert_eq!(effect.pops, PopCount::ArgsAndReceiver);
    assert_eq!(effect.push, None);

    let effect = Opcode::FunctionCallInt.stack_effect();
    assert_eq!(effect.pops, PopCount::Args);
    assert_eq!(effect.push, Some(PushKind::Int));

    let effect = Opcode::Dup.stack_effect();
    assert_eq!(effect.push, Some(PushKind::CopyTop));
}

#[test]
fn decode_long_branch_target() {
    // ljmp -5 at offset 3 jumps back to offset 3
    let mut code = vec![0, 0, 0, Opcode::Ljmp.byte()];
    code.extend_from_slice(&(-5i32).to_le_bytes());
    let Some(Ok(insn)) = decode(&code, 3) else {
        panic!("decode failed");
    };
    assert_eq!(insn.operand, Operand::Branch(-5));
    assert_eq!(insn.branch_target(3), Some(3));
}

#[test]
fn decode_short_branch_target() {
    let code = [Opcode::Jz.byte(), 0x02, 0, 0];
    let Some(Ok(insn)) = decode(&code, 0) else {
        panic!("decode failed");
    };
    assert_eq!(insn.branch_target(0), Some(4));
}

#[test]
fn decode_call_operands() {
    let code = [Opcode::StaticMethodCallInt.byte(), 2, 7];
    assert_eq!(
        decode(&code, 0),
        Some(Ok(Instruction {
            opcode: Opcode::StaticMethodCallInt,
            operand: Operand::Call { argc: 2, index: 7 },
        }))
    );
}

#[test]
fn decode_errors() {
    assert_eq!(decode(&[], 0), None);
    assert_eq!(decode(&[200], 0), Some(Err(DecodeError::UnknownOpcode(200))));
    assert_eq!(
        decode(&[Opcode::IntConst.byte(), 1, 2], 0),
        Some(Err(DecodeError::Truncated(Opcode::IntConst)))
    );
}

proptest! {
    #[test]
    fn long_constant_decodes_exactly(value in any::<i32>()) {
        let mut code = vec![Opcode::IntConst.byte()];
        code.extend_from_slice(&value.to_le_bytes());
        let decoded = decode(&code, 0);
        prop_assert_eq!(decoded, Some(Ok(Instruction { opcode: Opcode::IntConst, operand: Operand::Int(value) })));
    }

    #[test]
    fn short_constant_sign_extends(value in any::<i8>()) {
        let code = [Opcode::IntConst8.byte(), value.to_le_bytes()[0]];
        let decoded = decode(&code, 0);
        prop_assert_eq!(decoded, Some(Ok(Instruction { opcode: Opcode::IntConst8, operand: Operand::Int(i32::from(value)) })));
    }
}
