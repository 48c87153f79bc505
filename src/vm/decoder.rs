use log::trace;

use crate::utils::number::extend_sign;
use crate::vm::error::{Error, Result};
use crate::vm::modrm::ModRM;
use crate::vm::opcode::{classify, Encoding, Operation};
use crate::vm::operand::{AddressKind, Operand, OperandKind, Register, RegisterRef, SizeMark};

const WORD_MASK: u8 = 0b_00_00_00_01;
const DIRECTION_MASK: u8 = 0b_00_00_00_10;
const IMM_REG_WORD_MASK: u8 = 0b_00_00_10_00;
const SEGMENT_RESERVED_MASK: u8 = 0b_00_10_00_00;

/// One decoded instruction. Jumps carry their raw displacement as an immediate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub operation: Operation,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(operation: Operation, operands: Vec<Operand>) -> Self {
        Self { operation, operands }
    }

    pub fn destination(&self) -> Option<&Operand> {
        self.operands.first()
    }

    pub fn source(&self) -> Option<&Operand> {
        self.operands.get(1)
    }
}

/// Bounds-checked reader over the bytes of a single instruction.
pub struct ByteStream<'a> {
    buffer: &'a [u8],
    start: usize,
    position: usize,
}

impl<'a> ByteStream<'a> {
    pub fn new(buffer: &'a [u8], start: usize) -> Self {
        Self { buffer, start, position: start }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self.position + count;
        let bytes = self.buffer.get(self.position..end).ok_or(Error::Truncated {
            offset: self.start,
            needed: end - self.start,
            available: self.buffer.len().saturating_sub(self.start),
        })?;
        self.position = end;
        Ok(bytes)
    }

    #[inline]
    pub fn fetch_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn fetch_word(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Bytes read since the start of the instruction.
    pub fn consumed(&self) -> usize {
        self.position - self.start
    }
}

/// Decodes the instruction at `ip`, returning it with the number of bytes it spans.
pub fn decode(buffer: &[u8], ip: usize) -> Result<(Instruction, usize)> {
    let mut stream = ByteStream::new(buffer, ip);
    let (b1, b2) = match buffer.get(ip..ip + 2) {
        Some(&[b1, b2]) => (b1, b2),
        _ => {
            return Err(Error::Truncated {
                offset: ip,
                needed: 2,
                available: buffer.len().saturating_sub(ip),
            })
        }
    };
    let (encoding, operation) = classify(b1, b2, ip)?;

    let opcode = stream.fetch_byte()?;
    let is_word: bool = opcode & WORD_MASK != 0;
    let directional: bool = opcode & DIRECTION_MASK != 0;

    let operands = match encoding {
        Encoding::RmToFromReg => {
            let modrm = ModRM::new(stream.fetch_byte()?);
            let rm = modrm.rm_operand(&mut stream, is_word)?;
            let reg = Operand::register(RegisterRef::from_field(modrm.reg, is_word));
            if directional {
                vec![reg, rm]
            } else {
                vec![rm, reg]
            }
        }
        Encoding::ImmToRm => {
            let modrm = ModRM::new(stream.fetch_byte()?);
            let dst = modrm.rm_operand(&mut stream, is_word)?;
            // The direction bit doubles as the sign-extension bit outside of MOV
            let kind = if operation != Operation::Mov && directional {
                OperandKind::Immediate(extend_sign(stream.fetch_byte()?) as i16)
            } else if is_word {
                OperandKind::UnsignedImmediate(stream.fetch_word()?)
            } else {
                OperandKind::UnsignedImmediate(stream.fetch_byte()? as u16)
            };
            vec![dst, Operand::sized(SizeMark::from_w(is_word), kind)]
        }
        Encoding::MemToFromAcc => {
            let address = stream.fetch_word()?;
            let memory = Operand::memory(SizeMark::None, AddressKind::Direct, address as i16);
            let accumulator = Operand::register(RegisterRef::accumulator(is_word));
            if directional {
                vec![memory, accumulator]
            } else {
                vec![accumulator, memory]
            }
        }
        Encoding::ImmToReg => {
            let is_word = opcode & IMM_REG_WORD_MASK != 0;
            let register = RegisterRef::from_field(opcode, is_word);
            let value = fetch_signed(&mut stream, is_word)?;
            vec![Operand::register(register), Operand::immediate(value)]
        }
        Encoding::ImmToAcc => {
            let value = fetch_signed(&mut stream, is_word)?;
            vec![Operand::register(RegisterRef::accumulator(is_word)), Operand::immediate(value)]
        }
        Encoding::RmToSeg | Encoding::SegToRm => {
            let byte = stream.fetch_byte()?;
            if byte & SEGMENT_RESERVED_MASK != 0 {
                return Err(Error::IllegalSegmentEncoding { byte, offset: ip });
            }
            let modrm = ModRM::new(byte);
            let rm = modrm.rm_operand(&mut stream, true)?;
            let segment = Operand::register(RegisterRef::full(Register::segment(modrm.reg)));
            if encoding == Encoding::RmToSeg {
                vec![segment, rm]
            } else {
                vec![rm, segment]
            }
        }
        Encoding::ShortJump => {
            let displacement = extend_sign(stream.fetch_byte()?) as i16;
            vec![Operand::immediate(displacement)]
        }
    };

    let advance = stream.consumed();
    if advance == 0 {
        return Err(Error::NoAdvance { offset: ip });
    }

    let instruction = Instruction::new(operation, operands);
    trace!("{:04x}: {} ({} bytes)", ip, instruction, advance);
    Ok((instruction, advance))
}

fn fetch_signed(stream: &mut ByteStream, is_word: bool) -> Result<i16> {
    Ok(if is_word {
        stream.fetch_word()? as i16
    } else {
        extend_sign(stream.fetch_byte()?) as i16
    })
}

/// Walks a program front to back, yielding each instruction with its offset.
/// Stops after the first error since the length of a bad instruction is unknown.
pub struct Decoder<'a> {
    program: &'a [u8],
    ip: usize,
    failed: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(program: &'a [u8]) -> Self {
        Self { program, ip: 0, failed: false }
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<(usize, Instruction)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.ip >= self.program.len() {
            return None;
        }
        match decode(self.program, self.ip) {
            Ok((instruction, advance)) => {
                let at = self.ip;
                self.ip += advance;
                Some(Ok((at, instruction)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
