use std::fmt::{Display, Formatter};

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Slots of the register file, in the order they are stored and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum Register {
    Ax = 0,
    Bx,
    Cx,
    Dx,
    Sp,
    Bp,
    Si,
    Di,
    Es,
    Cs,
    Ss,
    Ds,
    Ip,
    Flags,
}

impl Register {
    pub const COUNT: usize = 14;

    /// Every register except FLAGS, in storage order.
    pub fn general() -> impl Iterator<Item = Register> {
        (0..Register::Flags as usize).filter_map(Register::from_usize)
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Ax => "ax",
            Register::Bx => "bx",
            Register::Cx => "cx",
            Register::Dx => "dx",
            Register::Sp => "sp",
            Register::Bp => "bp",
            Register::Si => "si",
            Register::Di => "di",
            Register::Es => "es",
            Register::Cs => "cs",
            Register::Ss => "ss",
            Register::Ds => "ds",
            Register::Ip => "ip",
            Register::Flags => "flags",
        }
    }

    /// Segment register selected by the two-bit SR field.
    pub fn segment(sr: u8) -> Register {
        match sr & 0b_11 {
            0b_00 => Register::Es,
            0b_01 => Register::Cs,
            0b_10 => Register::Ss,
            0b_11 => Register::Ds,
            _ => unreachable!(),
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterWidth {
    Full,
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterRef {
    pub register: Register,
    pub width: RegisterWidth,
}

impl RegisterRef {
    pub const fn full(register: Register) -> Self {
        Self { register, width: RegisterWidth::Full }
    }

    /// Register named by a three-bit REG/RM field. Note the order of the
    /// first four: AX, CX, DX, BX.
    pub fn from_field(reg: u8, is_word: bool) -> Self {
        use Register::*;
        use RegisterWidth::*;
        let (register, width) = match (reg & 0b_111, is_word) {
            (0b_000, false) => (Ax, Low),
            (0b_001, false) => (Cx, Low),
            (0b_010, false) => (Dx, Low),
            (0b_011, false) => (Bx, Low),
            (0b_100, false) => (Ax, High),
            (0b_101, false) => (Cx, High),
            (0b_110, false) => (Dx, High),
            (0b_111, false) => (Bx, High),
            (0b_000, true) => (Ax, Full),
            (0b_001, true) => (Cx, Full),
            (0b_010, true) => (Dx, Full),
            (0b_011, true) => (Bx, Full),
            (0b_100, true) => (Sp, Full),
            (0b_101, true) => (Bp, Full),
            (0b_110, true) => (Si, Full),
            (0b_111, true) => (Di, Full),
            _ => unreachable!(),
        };
        Self { register, width }
    }

    /// AL or AX.
    pub fn accumulator(is_word: bool) -> Self {
        Self::from_field(0b_000, is_word)
    }

    pub fn is_word(&self) -> bool {
        self.width == RegisterWidth::Full
    }

    pub fn name(&self) -> &'static str {
        use Register::*;
        use RegisterWidth::*;
        match (self.register, self.width) {
            (register, Full) => register.name(),
            (Ax, Low) => "al",
            (Bx, Low) => "bl",
            (Cx, Low) => "cl",
            (Dx, Low) => "dl",
            (Ax, High) => "ah",
            (Bx, High) => "bh",
            (Cx, High) => "ch",
            (Dx, High) => "dh",
            _ => unreachable!("{:?} has no {:?} half", self.register, self.width),
        }
    }
}

impl Display for RegisterRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Base of a memory operand, indexed by the RM field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    BxSi,
    BxDi,
    BpSi,
    BpDi,
    Si,
    Di,
    Bp,
    Bx,
    Direct,
}

impl AddressKind {
    pub fn from_rm(rm: u8) -> Self {
        match rm & 0b_111 {
            0b_000 => AddressKind::BxSi,
            0b_001 => AddressKind::BxDi,
            0b_010 => AddressKind::BpSi,
            0b_011 => AddressKind::BpDi,
            0b_100 => AddressKind::Si,
            0b_101 => AddressKind::Di,
            0b_110 => AddressKind::Bp,
            0b_111 => AddressKind::Bx,
            _ => unreachable!(),
        }
    }

    /// Registers summed to form the base address.
    pub fn base(self) -> &'static [Register] {
        match self {
            AddressKind::BxSi => &[Register::Bx, Register::Si],
            AddressKind::BxDi => &[Register::Bx, Register::Di],
            AddressKind::BpSi => &[Register::Bp, Register::Si],
            AddressKind::BpDi => &[Register::Bp, Register::Di],
            AddressKind::Si => &[Register::Si],
            AddressKind::Di => &[Register::Di],
            AddressKind::Bp => &[Register::Bp],
            AddressKind::Bx => &[Register::Bx],
            AddressKind::Direct => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Displacement {
    pub kind: AddressKind,
    pub disp: i16,
}

impl Display for Displacement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.kind == AddressKind::Direct {
            return write!(f, "[{}]", self.disp as u16);
        }
        let base = self.kind.base().iter().map(|r| r.name()).collect::<Vec<_>>().join("+");
        write!(f, "[{}{:+}]", base, self.disp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Register(RegisterRef),
    Immediate(i16),
    UnsignedImmediate(u16),
    Memory(Displacement),
}

impl Display for OperandKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OperandKind::Register(register) => write!(f, "{}", register),
            OperandKind::Immediate(value) => write!(f, "{}", value),
            OperandKind::UnsignedImmediate(value) => write!(f, "{}", value),
            OperandKind::Memory(displacement) => write!(f, "{}", displacement),
        }
    }
}

/// Explicit operand size, as in `word [bx+0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeMark {
    #[default]
    None,
    Byte,
    Word,
}

impl SizeMark {
    pub fn from_w(is_word: bool) -> Self {
        if is_word {
            SizeMark::Word
        } else {
            SizeMark::Byte
        }
    }
}

impl Display for SizeMark {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SizeMark::None => "",
            SizeMark::Byte => "byte",
            SizeMark::Word => "word",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand {
    pub size: SizeMark,
    pub kind: OperandKind,
}

impl Operand {
    pub fn sized(size: SizeMark, kind: OperandKind) -> Self {
        Self { size, kind }
    }

    pub fn register(register: RegisterRef) -> Self {
        Self { size: SizeMark::None, kind: OperandKind::Register(register) }
    }

    pub fn memory(size: SizeMark, kind: AddressKind, disp: i16) -> Self {
        Self { size, kind: OperandKind::Memory(Displacement { kind, disp }) }
    }

    pub fn immediate(value: i16) -> Self {
        Self { size: SizeMark::None, kind: OperandKind::Immediate(value) }
    }

    /// Operand width if it can be told from the operand alone.
    pub fn is_word(&self) -> Option<bool> {
        if let OperandKind::Register(register) = self.kind {
            return Some(register.is_word());
        }
        match self.size {
            SizeMark::None => None,
            SizeMark::Byte => Some(false),
            SizeMark::Word => Some(true),
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.size != SizeMark::None {
            write!(f, "{} ", self.size)?;
        }
        write!(f, "{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_fields_follow_the_encoding_table() {
        assert_eq!(RegisterRef::from_field(0b_011, true).name(), "bx");
        assert_eq!(RegisterRef::from_field(0b_011, false).name(), "bl");
        assert_eq!(RegisterRef::from_field(0b_100, false).name(), "ah");
        assert_eq!(RegisterRef::from_field(0b_100, true).name(), "sp");
        assert_eq!(RegisterRef::accumulator(false).name(), "al");
    }

    #[test]
    fn segment_field() {
        assert_eq!(Register::segment(0b_00), Register::Es);
        assert_eq!(Register::segment(0b_11), Register::Ds);
    }

    #[test]
    fn general_registers_skip_flags() {
        let names: Vec<_> = Register::general().map(Register::name).collect();
        assert_eq!(names.len(), Register::COUNT - 1);
        assert_eq!(names.first(), Some(&"ax"));
        assert_eq!(names.last(), Some(&"ip"));
    }

    #[test]
    fn displacements_render_with_sign() {
        assert_eq!(Operand::memory(SizeMark::None, AddressKind::BxSi, 0).to_string(), "[bx+si+0]");
        assert_eq!(Operand::memory(SizeMark::None, AddressKind::Bp, -37).to_string(), "[bp-37]");
        assert_eq!(Operand::memory(SizeMark::Word, AddressKind::Di, 4).to_string(), "word [di+4]");
        assert_eq!(Operand::memory(SizeMark::None, AddressKind::Direct, -1).to_string(), "[65535]");
    }

    #[test]
    fn sized_immediates_render_their_mark() {
        let imm = Operand::sized(SizeMark::Byte, OperandKind::UnsignedImmediate(7));
        assert_eq!(imm.to_string(), "byte 7");
        assert_eq!(Operand::immediate(-12).to_string(), "-12");
    }
}
