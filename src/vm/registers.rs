use std::fmt::{Display, Formatter};

use crate::vm::operand::{Register, RegisterRef, RegisterWidth};
use crate::vm::runtime::flags_string;

/// The register file. AL/AH and friends are views into the slot of their
/// full register; writing one half leaves the other untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    slots: [u16; Register::COUNT],
}

impl Registers {
    #[inline(always)]
    pub fn word(&self, register: Register) -> u16 {
        self.slots[register as usize]
    }

    #[inline(always)]
    pub fn low(&self, register: Register) -> u8 {
        self.word(register) as u8
    }

    #[inline(always)]
    pub fn high(&self, register: Register) -> u8 {
        (self.word(register) >> 8) as u8
    }

    #[inline(always)]
    pub fn set(&mut self, register: Register, word: u16) {
        self.slots[register as usize] = word;
    }

    #[inline(always)]
    pub fn set_low(&mut self, register: Register, byte: u8) {
        let slot = &mut self.slots[register as usize];
        *slot = (*slot & 0xFF00) | byte as u16;
    }

    #[inline(always)]
    pub fn set_high(&mut self, register: Register, byte: u8) {
        let slot = &mut self.slots[register as usize];
        *slot = (*slot & 0x00FF) | (byte as u16) << 8;
    }

    #[inline(always)]
    pub fn operation<T>(
        &mut self,
        register: Register,
        value: T,
        operation: fn(u16, T) -> u16,
    ) -> u16 {
        let res = operation(self.word(register), value);
        self.set(register, res);
        res
    }

    /// Reads a register at its width, zero-extended.
    pub fn read(&self, register: RegisterRef) -> u16 {
        match register.width {
            RegisterWidth::Full => self.word(register.register),
            RegisterWidth::Low => self.low(register.register) as u16,
            RegisterWidth::High => self.high(register.register) as u16,
        }
    }

    /// Writes a register at its width; half registers take the low byte of `value`.
    pub fn write(&mut self, register: RegisterRef, value: u16) {
        match register.width {
            RegisterWidth::Full => self.set(register.register, value),
            RegisterWidth::Low => self.set_low(register.register, value as u8),
            RegisterWidth::High => self.set_high(register.register, value as u8),
        }
    }

    /// Registers that differ between `self` and `other`, FLAGS excluded.
    pub fn changed<'a>(
        &'a self,
        other: &'a Registers,
    ) -> impl Iterator<Item = (Register, u16, u16)> + 'a {
        Register::general()
            .map(move |register| (register, self.word(register), other.word(register)))
            .filter(|(_, before, after)| before != after)
    }

    /// Non-zero registers and set flags.
    pub fn summary(&self) -> String {
        let mut out = String::from("Final registers:\n");
        for register in Register::general() {
            let word = self.word(register);
            if word != 0 {
                out.push_str(&format!("{:>8}: 0x{:04x} ({})\n", register.name(), word, word));
            }
        }
        let flags = self.word(Register::Flags);
        if flags != 0 {
            out.push_str(&format!("{:>8}: {}\n", "flags", flags_string(flags)));
        }
        out
    }
}

impl Display for Registers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for register in Register::general() {
            let word = self.word(register);
            writeln!(f, "{:>5}: 0x{:04x} ({})", register.name(), word, word)?;
        }
        writeln!(f, "flags: {}", flags_string(self.word(Register::Flags)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::runtime::CpuFlag;

    #[test]
    fn halves_alias_the_full_register() {
        let mut registers = Registers::default();
        registers.write(RegisterRef::from_field(0b_000, false), 0x34);
        registers.write(RegisterRef::from_field(0b_100, false), 0x12);
        assert_eq!(registers.word(Register::Ax), 0x1234);

        registers.set(Register::Bx, 0xBEEF);
        assert_eq!(registers.read(RegisterRef::from_field(0b_011, false)), 0xEF);
        assert_eq!(registers.read(RegisterRef::from_field(0b_111, false)), 0xBE);
    }

    #[test]
    fn half_writes_keep_the_other_half() {
        let mut registers = Registers::default();
        registers.set(Register::Cx, 0xAABB);
        registers.set_low(Register::Cx, 0x11);
        assert_eq!(registers.word(Register::Cx), 0xAA11);
        registers.set_high(Register::Cx, 0x22);
        assert_eq!(registers.word(Register::Cx), 0x2211);
        // Only the low byte of the value lands in a half register
        registers.write(RegisterRef::from_field(0b_101, false), 0xFF33);
        assert_eq!(registers.word(Register::Cx), 0x3311);
    }

    #[test]
    fn changed_lists_differences_in_order() {
        let before = Registers::default();
        let mut after = before;
        after.set(Register::Ip, 3);
        after.set(Register::Ax, 5);
        after.set(Register::Flags, 1);
        let changed: Vec<_> = before.changed(&after).collect();
        assert_eq!(changed, vec![(Register::Ax, 0, 5), (Register::Ip, 0, 3)]);
    }

    #[test]
    fn summary_skips_zero_registers() {
        let mut registers = Registers::default();
        registers.set(Register::Bx, 1000);
        registers.set(Register::Ip, 14);
        registers.set(Register::Flags, 1 << CpuFlag::Parity as u8 | 1 << CpuFlag::Zero as u8);
        assert_eq!(
            registers.summary(),
            "Final registers:\n      bx: 0x03e8 (1000)\n      ip: 0x000e (14)\n   flags: PZ\n"
        );
    }
}
