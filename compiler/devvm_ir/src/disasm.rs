//! Human-readable bytecode listings.

use std::fmt::Write;

use crate::opcode::{decode, DecodeError, Operand};

/// Render `code` one instruction per line.
///
/// Undecodable bytes end the listing with a `!` line describing the problem.
pub fn disassemble(code: &[u8]) -> String {
    let mut out = String::new();
    let mut ip = 0;
    while let Some(result) = decode(code, ip) {
        let insn = match result {
            Ok(insn) => insn,
            Err(DecodeError::UnknownOpcode(byte)) => {
                let _ = writeln!(out, "{ip:04}: ! unknown opcode 0x{byte:02X}");
                break;
            }
            Err(DecodeError::Truncated(op)) => {
                let _ = writeln!(out, "{ip:04}: ! truncated {op}");
                break;
            }
        };

        let _ = write!(out, "{ip:04}: {}", insn.opcode);
        match insn.operand {
            Operand::None => {}
            Operand::Slot(slot) => {
                let _ = write!(out, " {slot}");
            }
            Operand::Int(value) => {
                let _ = write!(out, " {value}");
            }
            Operand::Branch(_) => {
                if let Some(target) = insn.branch_target(ip) {
                    let _ = write!(out, " -> {target:04}");
                }
            }
            Operand::Call { argc, index } => {
                let _ = write!(out, " [{index}] argc={argc}");
            }
        }
        out.push('\n');
        ip += insn.opcode.len();
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::opcode::Opcode;

    #[test]
    fn listing_resolves_branches() {
        let mut code = vec![Opcode::IntConst8.byte(), 5, Opcode::Ljz.byte()];
        code.extend_from_slice(&1i32.to_le_bytes());
        code.push(Opcode::LoopChk.byte());
        code.extend_from_slice(&[Opcode::FunctionCallVoid.byte(), 0, 3]);
        code.push(Opcode::ReturnVoid.byte());

        let expected = "\
0000: iconst8 5
0002: ljz -> 0008
0007: loopchk
0008: fcallv [3] argc=0
0011: retv
";
        assert_eq!(disassemble(&code), expected);
    }

    #[test]
    fn listing_stops_at_bad_byte() {
        let code = [Opcode::Nop.byte(), 0xEE, Opcode::Nop.byte()];
        assert_eq!(disassemble(&code), "0000: nop\n0001: ! unknown opcode 0xEE\n");
    }
}
