use std::fmt::{Display, Formatter};
use std::io::Write;

use crate::vm::decoder::{Decoder, Instruction};
use crate::vm::error::Result;
use crate::vm::operand::OperandKind;

/// Header NASM needs to assemble the listing back into 16-bit code.
pub const LISTING_HEADER: &str = "bits 16\n";

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.operation)?;
        for (i, operand) in self.operands.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            match operand.kind {
                // Encoded relative to the next instruction, rendered relative to this one
                OperandKind::Immediate(displacement) if self.operation.is_jump() => {
                    write!(f, "${:+}", displacement as i32 + 2)?
                }
                _ => write!(f, "{}", operand)?,
            }
        }
        Ok(())
    }
}

/// Writes the assembly listing of `program`, one instruction per line.
pub fn write_listing<W: Write>(out: &mut W, program: &[u8]) -> Result<()> {
    writeln!(out, "{}", LISTING_HEADER)?;
    for decoded in Decoder::new(program) {
        let (_, instruction) = decoded?;
        writeln!(out, "{}", instruction)?;
    }
    Ok(())
}

pub fn disassemble(program: &[u8]) -> Result<String> {
    let mut listing = Vec::new();
    write_listing(&mut listing, program)?;
    Ok(String::from_utf8_lossy(&listing).into_owned())
}
