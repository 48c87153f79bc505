use std::ops::{BitAnd, BitOr};

use crate::vm::error::{Error, Result};
use crate::vm::memory::Memory;
use crate::vm::modrm::effective_address;
use crate::vm::opcode::Operation;
use crate::vm::operand::{Operand, OperandKind, Register};
use crate::vm::registers::Registers;
use crate::vm::runtime::CpuFlag;

#[derive(Default)]
pub struct Cpu {
    pub registers: Registers,
    pub memory: Memory,
}

impl Cpu {
    #[inline(always)]
    pub fn flags(&self) -> u16 {
        self.registers.word(Register::Flags)
    }

    #[inline(always)]
    pub fn set_flag(&mut self, flag: CpuFlag) {
        self.registers.operation(Register::Flags, flag.mask(), u16::bitor);
    }

    #[inline(always)]
    pub fn unset_flag(&mut self, flag: CpuFlag) {
        self.registers.operation(Register::Flags, !flag.mask(), u16::bitand);
    }

    #[inline(always)]
    pub fn update_flag(&mut self, flag: CpuFlag, active: bool) {
        if active {
            self.set_flag(flag);
        } else {
            self.unset_flag(flag);
        }
    }

    #[inline(always)]
    pub fn check_flag(&self, flag: CpuFlag) -> bool {
        self.flags() & flag.mask() != 0
    }

    /// Value of a source operand. Memory is read as a byte or a little-endian word.
    pub fn load(&self, operand: &Operand, is_word: bool) -> Result<u16> {
        match operand.kind {
            OperandKind::Register(register) => Ok(self.registers.read(register)),
            OperandKind::Immediate(value) => Ok(value as u16),
            OperandKind::UnsignedImmediate(value) => Ok(value),
            OperandKind::Memory(displacement) => {
                let address = effective_address(&self.registers, &displacement) as usize;
                if is_word {
                    self.memory.read_word(address)
                } else {
                    self.memory.read_byte(address).map(u16::from)
                }
            }
        }
    }

    /// Writes a destination operand. Immediates are not writable.
    pub fn store(
        &mut self,
        operation: Operation,
        operand: &Operand,
        is_word: bool,
        value: u16,
    ) -> Result<()> {
        match operand.kind {
            OperandKind::Register(register) => {
                self.registers.write(register, value);
                Ok(())
            }
            OperandKind::Memory(displacement) => {
                let address = effective_address(&self.registers, &displacement) as usize;
                if is_word {
                    self.memory.write_word(address, value)
                } else {
                    self.memory.write_byte(address, value as u8)
                }
            }
            OperandKind::Immediate(_) | OperandKind::UnsignedImmediate(_) => {
                Err(Error::InvalidOperand { operation, operand: *operand })
            }
        }
    }
}
