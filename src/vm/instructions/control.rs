use crate::vm::decoder::Instruction;
use crate::vm::error::{Error, Result};
use crate::vm::opcode::Operation;
use crate::vm::operand::{OperandKind, Register};
use crate::vm::runtime::CpuFlag::*;
use crate::vm::runtime::Runtime;

fn displacement(instruction: &Instruction) -> Result<i16> {
    match instruction.destination() {
        Some(operand) => match operand.kind {
            OperandKind::Immediate(disp) => Ok(disp),
            _ => Err(Error::InvalidOperand {
                operation: instruction.operation,
                operand: *operand,
            }),
        },
        None => Err(Error::MissingOperand { operation: instruction.operation }),
    }
}

#[inline(always)]
fn branch(vm: &mut Runtime, disp: i16) {
    vm.cpu.registers.operation(Register::Ip, disp, u16::wrapping_add_signed);
}

/// Conditional jumps and JCXZ. Flags are left alone.
pub(super) fn jump(vm: &mut Runtime, instruction: &Instruction) -> Result<()> {
    let disp = displacement(instruction)?;
    let cpu = &vm.cpu;
    let taken = match instruction.operation {
        Operation::Jo => cpu.check_flag(Overflow),
        Operation::Jno => !cpu.check_flag(Overflow),
        Operation::Jb => cpu.check_flag(Carry),
        Operation::Jnb => !cpu.check_flag(Carry),
        Operation::Je => cpu.check_flag(Zero),
        Operation::Jne => !cpu.check_flag(Zero),
        Operation::Jbe => cpu.check_flag(Carry) || cpu.check_flag(Zero),
        Operation::Jnbe => !cpu.check_flag(Carry) && !cpu.check_flag(Zero),
        Operation::Js => cpu.check_flag(Sign),
        Operation::Jns => !cpu.check_flag(Sign),
        Operation::Jp => cpu.check_flag(Parity),
        Operation::Jnp => !cpu.check_flag(Parity),
        Operation::Jl => cpu.check_flag(Sign) != cpu.check_flag(Overflow),
        Operation::Jnl => cpu.check_flag(Sign) == cpu.check_flag(Overflow),
        Operation::Jle => {
            cpu.check_flag(Zero) || cpu.check_flag(Sign) != cpu.check_flag(Overflow)
        }
        Operation::Jnle => {
            !cpu.check_flag(Zero) && cpu.check_flag(Sign) == cpu.check_flag(Overflow)
        }
        Operation::Jcxz => cpu.registers.word(Register::Cx) == 0,
        operation => unreachable!("{} is not a conditional jump", operation),
    };
    if taken {
        branch(vm, disp);
    }
    Ok(())
}

/// LOOP, LOOPZ and LOOPNZ: CX is decremented before the test, flags are left alone.
pub(super) fn loop_cx(vm: &mut Runtime, instruction: &Instruction) -> Result<()> {
    let disp = displacement(instruction)?;
    let cx = vm.cpu.registers.operation(Register::Cx, 1, u16::wrapping_sub);
    let taken = cx != 0
        && match instruction.operation {
            Operation::Loop => true,
            Operation::Loopz => vm.cpu.check_flag(Zero),
            Operation::Loopnz => !vm.cpu.check_flag(Zero),
            operation => unreachable!("{} is not a loop", operation),
        };
    if taken {
        branch(vm, disp);
    }
    Ok(())
}
