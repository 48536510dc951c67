//! Bytecode opcodes and instruction decoding.
//!
//! Every instruction is a one-byte opcode followed by 0-4 operand bytes:
//!
//! | operand form | bytes | used by |
//! |---|---|---|
//! | slot index | 1 | `IVLoad`, `IVStore`, `ILLoad`, `ILStore`, `ISLoad`, `ITLoad` |
//! | short constant | 1 (signed) | `IntConst8` |
//! | long constant | 4 (LE, signed) | `IntConst` |
//! | short branch | 1 (signed) | `Jz`, `Jnz`, `Jmp` |
//! | long branch | 4 (LE, signed) | `Ljz`, `Ljnz`, `Ljmp` |
//! | call | 2 (arg count, table index) | method and function calls |
//!
//! Branch displacements are measured from the byte following the operand.
//! The compiler itself only emits the long branch forms; the short forms are
//! accepted by the verifier and disassembler.

use std::fmt;

/// A bytecode opcode. The discriminant is the encoded byte.
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Opcode {
    Nop = 0,
    Pop,
    Dup,
    /// Load global variable (`slot.b`).
    IVLoad,
    /// Store global variable (`slot.b`).
    IVStore,
    /// Load local (`slot.b`).
    ILLoad,
    /// Store local (`slot.b`).
    ILStore,
    /// Load special variable (`slot.b`).
    ISLoad,
    /// Load thread variable (`slot.b`).
    ITLoad,
    /// Push constant (`value.l`).
    IntConst,
    /// Push constant (`value.b`, sign-extended).
    IntConst8,
    IntAdd,
    IntSub,
    IntMul,
    IntDiv,
    IntMod,
    IntAnd,
    IntOr,
    IntXor,
    IntAsr,
    IntAsl,
    Not,
    And,
    Or,
    IntLt,
    IntLe,
    IntGt,
    IntGe,
    IntEq,
    IntNe,
    IntNeg,
    IntNot,
    Jz,
    Jnz,
    Jmp,
    Ljz,
    Ljnz,
    Ljmp,
    /// Back-edge check at the bottom of `loop` bodies (lets the VM detect
    /// runaway loops).
    LoopChk,
    /// `argc.b, method.b`: pops the arguments and the receiver.
    MethodCallVoid,
    /// `argc.b, method.b`: pops the arguments and the receiver, pushes the result.
    MethodCallInt,
    /// `argc.b, method.b`
    StaticMethodCallVoid,
    /// `argc.b, method.b`
    StaticMethodCallInt,
    /// `argc.b, function.b`
    FunctionCallVoid,
    /// `argc.b, function.b`
    FunctionCallInt,
    ReturnVoid,
    ReturnInt,
}

/// How many values an instruction pops.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PopCount {
    Fixed(u8),
    /// The instruction's argument-count operand.
    Args,
    /// The argument-count operand plus one receiver object.
    ArgsAndReceiver,
}

/// The single value an instruction may push.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PushKind {
    /// A fresh 32-bit cell (integers and object/string/function handles).
    Int,
    /// A copy of the value currently on top of the stack.
    CopyTop,
}

/// Static stack effect of an opcode: pops happen before the push.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct StackEffect {
    pub pops: PopCount,
    pub push: Option<PushKind>,
}

impl StackEffect {
    const NONE: StackEffect = StackEffect {
        pops: PopCount::Fixed(0),
        push: None,
    };
    const PUSH: StackEffect = StackEffect {
        pops: PopCount::Fixed(0),
        push: Some(PushKind::Int),
    };
    const POP: StackEffect = StackEffect {
        pops: PopCount::Fixed(1),
        push: None,
    };
    /// Binary operators: pop two, push one (net one pop, same depth as `POP`
    /// followed by an in-place rewrite of the new top).
    const BINARY: StackEffect = StackEffect {
        pops: PopCount::Fixed(2),
        push: Some(PushKind::Int),
    };
    const UNARY: StackEffect = StackEffect {
        pops: PopCount::Fixed(1),
        push: Some(PushKind::Int),
    };
}

impl Opcode {
    /// All opcodes, indexed by their encoded byte.
    pub const ALL: [Opcode; 47] = [
        Opcode::Nop,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::IVLoad,
        Opcode::IVStore,
        Opcode::ILLoad,
        Opcode::ILStore,
        Opcode::ISLoad,
        Opcode::ITLoad,
        Opcode::IntConst,
        Opcode::IntConst8,
        Opcode::IntAdd,
        Opcode::IntSub,
        Opcode::IntMul,
        Opcode::IntDiv,
        Opcode::IntMod,
        Opcode::IntAnd,
        Opcode::IntOr,
        Opcode::IntXor,
        Opcode::IntAsr,
        Opcode::IntAsl,
        Opcode::Not,
        Opcode::And,
        Opcode::Or,
        Opcode::IntLt,
        Opcode::IntLe,
        Opcode::IntGt,
        Opcode::IntGe,
        Opcode::IntEq,
        Opcode::IntNe,
        Opcode::IntNeg,
        Opcode::IntNot,
        Opcode::Jz,
        Opcode::Jnz,
        Opcode::Jmp,
        Opcode::Ljz,
        Opcode::Ljnz,
        Opcode::Ljmp,
        Opcode::LoopChk,
        Opcode::MethodCallVoid,
        Opcode::MethodCallInt,
        Opcode::StaticMethodCallVoid,
        Opcode::StaticMethodCallInt,
        Opcode::FunctionCallVoid,
        Opcode::FunctionCallInt,
        Opcode::ReturnVoid,
        Opcode::ReturnInt,
    ];

    /// Decode an opcode byte.
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Self::ALL.get(usize::from(byte)).copied()
    }

    /// The encoded byte.
    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Total encoded length (opcode plus operands) in bytes.
    pub const fn len(self) -> usize {
        match self {
            Opcode::IVLoad
            | Opcode::IVStore
            | Opcode::ILLoad
            | Opcode::ILStore
            | Opcode::ISLoad
            | Opcode::ITLoad
            | Opcode::IntConst8
            | Opcode::Jz
            | Opcode::Jnz
            | Opcode::Jmp => 2,

            Opcode::MethodCallVoid
            | Opcode::MethodCallInt
            | Opcode::StaticMethodCallVoid
            | Opcode::StaticMethodCallInt
            | Opcode::FunctionCallVoid
            | Opcode::FunctionCallInt => 3,

            Opcode::IntConst | Opcode::Ljz | Opcode::Ljnz | Opcode::Ljmp => 5,

            _ => 1,
        }
    }

    /// Static stack effect.
    pub const fn stack_effect(self) -> StackEffect {
        match self {
            Opcode::Nop
            | Opcode::Jmp
            | Opcode::Ljmp
            | Opcode::LoopChk
            | Opcode::ReturnVoid => StackEffect::NONE,

            Opcode::Dup => StackEffect {
                pops: PopCount::Fixed(0),
                push: Some(PushKind::CopyTop),
            },

            Opcode::IVLoad
            | Opcode::ILLoad
            | Opcode::ISLoad
            | Opcode::ITLoad
            | Opcode::IntConst
            | Opcode::IntConst8 => StackEffect::PUSH,

            Opcode::Pop
            | Opcode::IVStore
            | Opcode::ILStore
            | Opcode::Jz
            | Opcode::Jnz
            | Opcode::Ljz
            | Opcode::Ljnz
            | Opcode::ReturnInt => StackEffect::POP,

            Opcode::IntNeg | Opcode::IntNot | Opcode::Not => StackEffect::UNARY,

            Opcode::IntAdd
            | Opcode::IntSub
            | Opcode::IntMul
            | Opcode::IntDiv
            | Opcode::IntMod
            | Opcode::IntAnd
            | Opcode::IntOr
            | Opcode::IntXor
            | Opcode::IntAsr
            | Opcode::IntAsl
            | Opcode::And
            | Opcode::Or
            | Opcode::IntLt
            | Opcode::IntLe
            | Opcode::IntGt
            | Opcode::IntGe
            | Opcode::IntEq
            | Opcode::IntNe => StackEffect::BINARY,

            Opcode::MethodCallVoid => StackEffect {
                pops: PopCount::ArgsAndReceiver,
                push: None,
            },
            Opcode::MethodCallInt => StackEffect {
                pops: PopCount::ArgsAndReceiver,
                push: Some(PushKind::Int),
            },
            Opcode::StaticMethodCallVoid | Opcode::FunctionCallVoid => StackEffect {
                pops: PopCount::Args,
                push: None,
            },
            Opcode::StaticMethodCallInt | Opcode::FunctionCallInt => StackEffect {
                pops: PopCount::Args,
                push: Some(PushKind::Int),
            },
        }
    }

    /// Whether the instruction's single-byte operand indexes the local slots.
    pub const fn uses_local_slot(self) -> bool {
        matches!(self, Opcode::ILLoad | Opcode::ILStore)
    }

    /// Whether control never falls through to the next instruction.
    pub const fn ends_path(self) -> bool {
        matches!(
            self,
            Opcode::Jmp | Opcode::Ljmp | Opcode::ReturnVoid | Opcode::ReturnInt
        )
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Pop => "pop",
            Opcode::Dup => "dup",
            Opcode::IVLoad => "ivload",
            Opcode::IVStore => "ivstore",
            Opcode::ILLoad => "ilload",
            Opcode::ILStore => "ilstore",
            Opcode::ISLoad => "isload",
            Opcode::ITLoad => "itload",
            Opcode::IntConst => "iconst",
            Opcode::IntConst8 => "iconst8",
            Opcode::IntAdd => "iadd",
            Opcode::IntSub => "isub",
            Opcode::IntMul => "imul",
            Opcode::IntDiv => "idiv",
            Opcode::IntMod => "imod",
            Opcode::IntAnd => "iand",
            Opcode::IntOr => "ior",
            Opcode::IntXor => "ixor",
            Opcode::IntAsr => "iasr",
            Opcode::IntAsl => "iasl",
            Opcode::Not => "not",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::IntLt => "ilt",
            Opcode::IntLe => "ile",
            Opcode::IntGt => "igt",
            Opcode::IntGe => "ige",
            Opcode::IntEq => "ieq",
            Opcode::IntNe => "ine",
            Opcode::IntNeg => "ineg",
            Opcode::IntNot => "inot",
            Opcode::Jz => "jz",
            Opcode::Jnz => "jnz",
            Opcode::Jmp => "jmp",
            Opcode::Ljz => "ljz",
            Opcode::Ljnz => "ljnz",
            Opcode::Ljmp => "ljmp",
            Opcode::LoopChk => "loopchk",
            Opcode::MethodCallVoid => "mcallv",
            Opcode::MethodCallInt => "mcalli",
            Opcode::StaticMethodCallVoid => "smcallv",
            Opcode::StaticMethodCallInt => "smcalli",
            Opcode::FunctionCallVoid => "fcallv",
            Opcode::FunctionCallInt => "fcalli",
            Opcode::ReturnVoid => "retv",
            Opcode::ReturnInt => "reti",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Decoded operand of one instruction.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Operand {
    None,
    Slot(u8),
    Int(i32),
    /// Relative displacement from the end of the instruction.
    Branch(i32),
    Call { argc: u8, index: u8 },
}

/// One decoded instruction.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Operand,
}

impl Instruction {
    /// Absolute branch target for an instruction at `ip`, if this is a branch.
    ///
    /// Returned as `i64` so out-of-range displacements can be reported
    /// instead of wrapping.
    pub fn branch_target(&self, ip: usize) -> Option<i64> {
        match self.operand {
            Operand::Branch(disp) => {
                let next = i64::try_from(ip + self.opcode.len()).unwrap_or(i64::MAX);
                Some(next + i64::from(disp))
            }
            _ => None,
        }
    }
}

/// Why an instruction could not be decoded.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DecodeError {
    UnknownOpcode(u8),
    /// The operand runs past the end of the buffer.
    Truncated(Opcode),
}

/// Decode the instruction starting at `ip`.
///
/// Returns `None` when `ip` is at or past the end of `code`.
pub fn decode(code: &[u8], ip: usize) -> Option<Result<Instruction, DecodeError>> {
    let &byte = code.get(ip)?;
    let Some(opcode) = Opcode::from_byte(byte) else {
        return Some(Err(DecodeError::UnknownOpcode(byte)));
    };
    let Some(operand_bytes) = code.get(ip + 1..ip + opcode.len()) else {
        return Some(Err(DecodeError::Truncated(opcode)));
    };

    let operand = match (opcode, operand_bytes) {
        (
            Opcode::IVLoad
            | Opcode::IVStore
            | Opcode::ILLoad
            | Opcode::ILStore
            | Opcode::ISLoad
            | Opcode::ITLoad,
            &[slot],
        ) => Operand::Slot(slot),
        (Opcode::IntConst8, &[v]) => Operand::Int(i32::from(i8::from_le_bytes([v]))),
        (Opcode::IntConst, &[a, b, c, d]) => Operand::Int(i32::from_le_bytes([a, b, c, d])),
        (Opcode::Jz | Opcode::Jnz | Opcode::Jmp, &[d]) => Operand::Branch(i32::from(i8::from_le_bytes([d]))),
        (Opcode::Ljz | Opcode::Ljnz | Opcode::Ljmp, &[a, b, c, d]) => {
            Operand::Branch(i32::from_le_bytes([a, b, c, d]))
        }
        (
            Opcode::MethodCallVoid
            | Opcode::MethodCallInt
            | Opcode::StaticMethodCallVoid
            | Opcode::StaticMethodCallInt
            | Opcode::FunctionCallVoid
            | Opcode::FunctionCallInt,
            &[argc, index],
        ) => Operand::Call { argc, index },
        _ => Operand::None,
    };

    Some(Ok(Instruction { opcode, operand }))
}

#[cfg(test)]
mod tests;
