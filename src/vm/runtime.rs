use std::fmt::{Debug, Display, Formatter};
use std::io::Write;

use log::debug;

use crate::vm::cpu::Cpu;
use crate::vm::decoder::{decode, Instruction};
use crate::vm::error::{Error, Result};
use crate::vm::instructions::process;
use crate::vm::memory::Memory;
use crate::vm::operand::Register;
use crate::vm::registers::Registers;
use crate::vm::runtime::CpuFlag::{AuxCarry, Carry, Overflow, Parity, Sign, Zero};

/// Status flags and their bit positions in FLAGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CpuFlag {
    Carry = 0,
    Parity = 2,
    AuxCarry = 4,
    Zero = 6,
    Sign = 7,
    Overflow = 11,
}

impl CpuFlag {
    /// Reporting order.
    pub const ALL: [CpuFlag; 6] = [Carry, Parity, AuxCarry, Zero, Sign, Overflow];

    #[inline(always)]
    pub const fn mask(self) -> u16 {
        1u16 << (self as u8)
    }

    pub const fn letter(self) -> char {
        match self {
            Carry => 'C',
            Parity => 'P',
            AuxCarry => 'A',
            Zero => 'Z',
            Sign => 'S',
            Overflow => 'O',
        }
    }
}

/// Letters of the flags set in `flags`, e.g. `CPZ`.
pub fn flags_string(flags: u16) -> String {
    CpuFlag::ALL
        .iter()
        .filter(|flag| flags & flag.mask() != 0)
        .map(|flag| flag.letter())
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Log the register file before every instruction.
    pub trace: bool,
}

/// One executed instruction and the register file around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub address: u16,
    pub instruction: Instruction,
    pub before: Registers,
    pub after: Registers,
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<20} ;", self.instruction.to_string())?;
        for (register, before, after) in self.before.changed(&self.after) {
            write!(f, " {}:{:#x}->{:#x}", register, before, after)?;
        }
        let (before, after) = (self.before.word(Register::Flags), self.after.word(Register::Flags));
        if before != after {
            write!(f, " flags:{}->{}", flags_string(before), flags_string(after))?;
        }
        Ok(())
    }
}

/// Largest program IP can walk off the end of without wrapping.
pub const MAX_PROGRAM_SIZE: usize = u16::MAX as usize;

/// Executes a flat program. Code is fetched from the program buffer, data
/// lives in the separate 1 MiB memory.
pub struct Runtime {
    pub(crate) cpu: Cpu,
    program: Vec<u8>,
    config: RuntimeConfig,
    pub instruction_count: u64,
}

impl Runtime {
    pub fn new(program: &[u8]) -> Self {
        Self::with_config(program, RuntimeConfig::default())
    }

    pub fn with_config(program: &[u8], config: RuntimeConfig) -> Self {
        Self {
            cpu: Cpu::default(),
            program: program.to_vec(),
            config,
            instruction_count: 0,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.cpu.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.cpu.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.cpu.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.cpu.memory
    }

    pub fn check_flag(&self, flag: CpuFlag) -> bool {
        self.cpu.check_flag(flag)
    }

    #[inline]
    pub fn ip(&self) -> u16 {
        self.cpu.registers.word(Register::Ip)
    }

    pub fn is_finished(&self) -> bool {
        self.ip() as usize >= self.program.len()
    }

    /// Decodes and executes the instruction at IP. IP moves past the
    /// instruction before it executes, so jumps are relative to the next one.
    pub fn step(&mut self) -> Result<Option<Step>> {
        if self.program.len() > MAX_PROGRAM_SIZE {
            return Err(Error::ProgramTooLarge { size: self.program.len() });
        }
        if self.is_finished() {
            return Ok(None);
        }
        if self.config.trace {
            debug!("{:?}", self);
        }

        let address = self.ip();
        let (instruction, advance) = decode(&self.program, address as usize)?;
        let before = self.cpu.registers;

        self.cpu.registers.operation(Register::Ip, advance as u16, u16::wrapping_add);
        process(self, &instruction)?;
        self.instruction_count += 1;

        Ok(Some(Step {
            address,
            instruction,
            before,
            after: self.cpu.registers,
        }))
    }

    /// Runs to the end of the program, writing one line per instruction and
    /// the final register summary.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<()> {
        debug!("Simulating {} bytes of code", self.program.len());
        while let Some(step) = self.step()? {
            writeln!(out, "{}", step)?;
        }
        writeln!(out)?;
        writeln!(out, "{}", self.cpu.registers.summary())?;
        debug!("Simulation finished after {} instructions", self.instruction_count);
        Ok(())
    }
}

#[inline(always)]
fn show_flag(vm: &Runtime, flag: CpuFlag) -> char {
    if vm.cpu.check_flag(flag) {
        return flag.letter();
    }
    '-'
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let registers = &self.cpu.registers;
        write!(
            f,
            "{:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {}{}{}{}{}{} ip={:04x}",
            registers.word(Register::Ax),
            registers.word(Register::Bx),
            registers.word(Register::Cx),
            registers.word(Register::Dx),
            registers.word(Register::Sp),
            registers.word(Register::Bp),
            registers.word(Register::Si),
            registers.word(Register::Di),
            show_flag(self, Overflow),
            show_flag(self, Sign),
            show_flag(self, Zero),
            show_flag(self, AuxCarry),
            show_flag(self, Parity),
            show_flag(self, Carry),
            registers.word(Register::Ip),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn flag_letters_follow_reporting_order() {
        assert_eq!(flags_string(0), "");
        assert_eq!(flags_string(Overflow.mask() | Carry.mask() | Zero.mask()), "CZO");
        assert_eq!(Overflow.mask(), 0x0800);
    }

    #[test]
    fn trace_lines_show_register_and_flag_deltas() {
        // mov cx, 200 ; sub cx, 200
        let mut vm = Runtime::new(&[0xB9, 0xC8, 0x00, 0x81, 0xE9, 0xC8, 0x00]);
        let first = vm.step().unwrap().unwrap();
        assert_eq!(first.address, 0);
        assert_eq!(first.to_string(), "mov cx, 200          ; cx:0x0->0xc8 ip:0x0->0x3");
        let second = vm.step().unwrap().unwrap();
        assert_eq!(second.address, 3);
        assert_eq!(
            second.to_string(),
            "sub cx, word 200     ; cx:0xc8->0x0 ip:0x3->0x7 flags:->PZ"
        );
        assert!(vm.step().unwrap().is_none());
    }

    #[test]
    fn run_writes_trace_and_summary() {
        // mov bx, 1000 ; mov ax, bx
        let mut vm = Runtime::new(&[0xBB, 0xE8, 0x03, 0x89, 0xD8]);
        let mut out = Vec::new();
        vm.run(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            indoc! {"
                mov bx, 1000         ; bx:0x0->0x3e8 ip:0x0->0x3
                mov ax, bx           ; ax:0x0->0x3e8 ip:0x3->0x5

                Final registers:
                      ax: 0x03e8 (1000)
                      bx: 0x03e8 (1000)
                      ip: 0x0005 (5)

            "}
        );
        assert_eq!(vm.instruction_count, 2);
    }

    #[test]
    fn runtimes_are_independent() {
        let mut a = Runtime::new(&[0xB8, 0x01, 0x00]);
        let b = Runtime::new(&[0xB8, 0x01, 0x00]);
        a.run(&mut std::io::sink()).unwrap();
        assert_eq!(a.registers().word(Register::Ax), 1);
        assert_eq!(b.registers().word(Register::Ax), 0);
        assert!(!b.is_finished());
    }

    #[test]
    fn program_filling_the_segment_is_rejected() {
        // 32768 x MOV AX,AX would carry IP past 0xFFFF back to 0
        let program = [0x89, 0xC0].repeat(0x8000);
        let mut vm = Runtime::new(&program);
        let err = vm.run(&mut std::io::sink()).unwrap_err();
        assert!(matches!(err, Error::ProgramTooLarge { size: 0x10000 }));
        assert_eq!(vm.instruction_count, 0);
    }

    #[test]
    fn largest_program_runs_to_the_end() {
        // 32766 x MOV AX,AX followed by MOV AX,1 ends exactly at 0xFFFF
        let mut program = [0x89, 0xC0].repeat(0x7FFE);
        program.extend([0xB8, 0x01, 0x00]);
        assert_eq!(program.len(), MAX_PROGRAM_SIZE);
        let mut vm = Runtime::new(&program);
        vm.run(&mut std::io::sink()).unwrap();
        assert_eq!(vm.instruction_count, 0x7FFF);
        assert_eq!(vm.ip(), 0xFFFF);
        assert_eq!(vm.registers().word(Register::Ax), 1);
        assert!(vm.is_finished());
    }

    #[test]
    fn preset_state_is_visible_to_the_program() {
        // MOV AX,[BX] with BX and the word at 0x200 set up front
        let mut vm = Runtime::new(&[0x8B, 0x07]);
        vm.registers_mut().set(Register::Bx, 0x200);
        Memory::copy_data(vm.memory_mut(), 0x200, &[0xCD, 0xAB]).unwrap();
        vm.run(&mut std::io::sink()).unwrap();
        assert_eq!(vm.registers().word(Register::Ax), 0xABCD);
        assert_eq!(&vm.memory().as_bytes()[0x200..0x202], &[0xCD, 0xAB]);
    }

    #[test]
    fn debug_line_marks_set_flags() {
        let mut vm = Runtime::new(&[]);
        vm.cpu.set_flag(Zero);
        vm.cpu.set_flag(Carry);
        assert_eq!(
            format!("{:?}", vm),
            "0000 0000 0000 0000 0000 0000 0000 0000 --Z--C ip=0000"
        );
    }
}
