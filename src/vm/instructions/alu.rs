use super::{operand_width, operands, update_arithmetic_flags_byte, update_arithmetic_flags_word};
use crate::utils::number::SpecialOps;
use crate::vm::decoder::Instruction;
use crate::vm::error::Result;
use crate::vm::opcode::Operation;
use crate::vm::runtime::CpuFlag::AuxCarry;
use crate::vm::runtime::Runtime;

/// ADD, SUB and CMP. CMP only updates the flags.
pub(super) fn arithmetic(vm: &mut Runtime, instruction: &Instruction) -> Result<()> {
    let operation = instruction.operation;
    let (dst, src) = operands(instruction)?;
    let is_word = operand_width(operation, dst, src)?;

    let prev = vm.cpu.load(dst, is_word)?;
    let value = vm.cpu.load(src, is_word)?;
    let res = if is_word {
        word_op(vm, operation, prev, value)
    } else {
        byte_op(vm, operation, prev as u8, value as u8) as u16
    };

    if operation != Operation::Cmp {
        vm.cpu.store(operation, dst, is_word, res)?;
    }
    Ok(())
}

fn word_op(vm: &mut Runtime, operation: Operation, prev: u16, word: u16) -> u16 {
    let (w, o, c) = match operation {
        Operation::Add => prev.oc_add(word),
        _ => prev.oc_sub(word),
    };
    update_arithmetic_flags_word(vm, w, o, c);
    let aux = match operation {
        Operation::Add => prev.aux_carry_add(word),
        _ => prev.aux_carry_sub(word),
    };
    vm.cpu.update_flag(AuxCarry, aux);
    w
}

fn byte_op(vm: &mut Runtime, operation: Operation, prev: u8, byte: u8) -> u8 {
    let (b, o, c) = match operation {
        Operation::Add => prev.oc_add(byte),
        _ => prev.oc_sub(byte),
    };
    update_arithmetic_flags_byte(vm, b, o, c);
    let aux = match operation {
        Operation::Add => prev.aux_carry_add(byte),
        _ => prev.aux_carry_sub(byte),
    };
    vm.cpu.update_flag(AuxCarry, aux);
    b
}
