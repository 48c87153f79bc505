use crate::vm::decoder::ByteStream;
use crate::vm::error::Result;
use crate::vm::operand::{AddressKind, Displacement, Operand, RegisterRef, SizeMark};
use crate::vm::registers::Registers;

/// The MOD/REG/RM fields of the byte following the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRM {
    pub mode: u8,
    pub reg: u8,
    pub rm: u8,
}

impl ModRM {
    pub fn new(byte: u8) -> Self {
        Self {
            mode: (byte >> 6) & 0b_11,
            reg: (byte >> 3) & 0b_111,
            rm: byte & 0b_111,
        }
    }

    /// Resolves the RM field into an operand, consuming any displacement bytes.
    pub fn rm_operand(&self, stream: &mut ByteStream, is_word: bool) -> Result<Operand> {
        let size = SizeMark::from_w(is_word);
        let kind = AddressKind::from_rm(self.rm);

        Ok(match self.mode {
            0b_11 => Operand::register(RegisterRef::from_field(self.rm, is_word)),
            0b_00 if self.rm == 0b_110 => {
                let address = stream.fetch_word()?;
                Operand::memory(size, AddressKind::Direct, address as i16)
            }
            0b_00 => Operand::memory(size, kind, 0),
            0b_01 => {
                let displacement = stream.fetch_byte()? as i8 as i16;
                Operand::memory(size, kind, displacement)
            }
            0b_10 => {
                let displacement = stream.fetch_word()? as i16;
                Operand::memory(size, kind, displacement)
            }
            _ => unreachable!(),
        })
    }
}

/// Offset addressed by a memory operand. The sum wraps at 16 bits.
#[inline]
pub fn effective_address(registers: &Registers, displacement: &Displacement) -> u16 {
    displacement
        .kind
        .base()
        .iter()
        .fold(displacement.disp as u16, |address, register| {
            address.wrapping_add(registers.word(*register))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::operand::Register;

    fn resolve(bytes: &[u8], is_word: bool) -> (Operand, usize) {
        let mut stream = ByteStream::new(bytes, 0);
        let modrm = ModRM::new(stream.fetch_byte().unwrap());
        let operand = modrm.rm_operand(&mut stream, is_word).unwrap();
        (operand, stream.consumed())
    }

    #[test]
    fn splits_fields() {
        assert_eq!(ModRM::new(0b_10_011_101), ModRM { mode: 0b_10, reg: 0b_011, rm: 0b_101 });
    }

    #[test]
    fn register_mode_reads_nothing_more() {
        let (operand, consumed) = resolve(&[0b_11_000_001], false);
        assert_eq!(operand, Operand::register(RegisterRef::from_field(0b_001, false)));
        assert_eq!(consumed, 1);
    }

    #[test]
    fn memory_modes_count_displacement_bytes() {
        let (operand, consumed) = resolve(&[0b_00_000_010], true);
        assert_eq!(operand, Operand::memory(SizeMark::Word, AddressKind::BpSi, 0));
        assert_eq!(consumed, 1);

        let (operand, consumed) = resolve(&[0b_01_000_110, 0xDB], false);
        assert_eq!(operand, Operand::memory(SizeMark::Byte, AddressKind::Bp, -37));
        assert_eq!(consumed, 2);

        let (operand, consumed) = resolve(&[0b_10_000_000, 0x87, 0x13], true);
        assert_eq!(operand, Operand::memory(SizeMark::Word, AddressKind::BxSi, 4999));
        assert_eq!(consumed, 3);
    }

    #[test]
    fn direct_address_is_unsigned() {
        let (operand, consumed) = resolve(&[0b_00_000_110, 0xFF, 0xFF], true);
        assert_eq!(operand, Operand::memory(SizeMark::Word, AddressKind::Direct, -1));
        assert_eq!(operand.to_string(), "word [65535]");
        assert_eq!(consumed, 3);
    }

    #[test]
    fn effective_address_wraps() {
        let mut registers = Registers::default();
        registers.set(Register::Bx, 0xFFFF);
        registers.set(Register::Si, 2);
        let displacement = Displacement { kind: AddressKind::BxSi, disp: 3 };
        assert_eq!(effective_address(&registers, &displacement), 4);

        let direct = Displacement { kind: AddressKind::Direct, disp: 1000 };
        assert_eq!(effective_address(&registers, &direct), 1000);

        let below = Displacement { kind: AddressKind::Si, disp: -3 };
        assert_eq!(effective_address(&registers, &below), 0xFFFF);
    }
}
