mod alu;
mod control;


use crate::utils::number::even_parity;
use crate::vm::decoder::Instruction;
use crate::vm::error::{Error, Result};
use crate::vm::opcode::Operation;
use crate::vm::operand::Operand;
use crate::vm::runtime::CpuFlag::*;
use crate::vm::runtime::Runtime;

#[inline]
fn update_arithmetic_flags_word(vm: &mut Runtime, res: u16, overflow: bool, carry: bool) {
    vm.cpu.update_flag(Overflow, overflow);
    vm.cpu.update_flag(Carry, carry);
    vm.cpu.update_flag(Zero, res == 0);
    vm.cpu.update_flag(Sign, (res as i16) < 0);
    vm.cpu.update_flag(Parity, even_parity(res));
}

#[inline]
fn update_arithmetic_flags_byte(vm: &mut Runtime, res: u8, overflow: bool, carry: bool) {
    vm.cpu.update_flag(Overflow, overflow);
    vm.cpu.update_flag(Carry, carry);
    vm.cpu.update_flag(Zero, res == 0);
    vm.cpu.update_flag(Sign, (res as i8) < 0);
    vm.cpu.update_flag(Parity, even_parity(res as u16));
}

/// Destination and source of a two-operand instruction.
fn operands(instruction: &Instruction) -> Result<(&Operand, &Operand)> {
    match (instruction.destination(), instruction.source()) {
        (Some(dst), Some(src)) => Ok((dst, src)),
        _ => Err(Error::MissingOperand { operation: instruction.operation }),
    }
}

/// Access width of a two-operand instruction, taken from whichever operand knows it.
fn operand_width(operation: Operation, dst: &Operand, src: &Operand) -> Result<bool> {
    dst.is_word()
        .or_else(|| src.is_word())
        .ok_or(Error::InvalidOperand { operation, operand: *dst })
}

/// Executes one decoded instruction. IP already points past it.
pub fn process(vm: &mut Runtime, instruction: &Instruction) -> Result<()> {
    let operation = instruction.operation;
    match operation {
        Operation::Mov => {
            let (dst, src) = operands(instruction)?;
            let is_word = operand_width(operation, dst, src)?;
            let value = vm.cpu.load(src, is_word)?;
            vm.cpu.store(operation, dst, is_word, value)
        }
        Operation::Add | Operation::Sub | Operation::Cmp => alu::arithmetic(vm, instruction),
        Operation::Loop | Operation::Loopz | Operation::Loopnz => control::loop_cx(vm, instruction),
        _ => control::jump(vm, instruction),
    }
}
