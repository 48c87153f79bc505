use std::io;

use thiserror::Error;

use crate::vm::opcode::Operation;
use crate::vm::operand::Operand;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unimplemented instruction at {offset:#06x}: {b1:08b} {b2:08b}")]
    UnimplementedOpcode { b1: u8, b2: u8, offset: usize },
    #[error("instruction stream did not advance at {offset:#06x}")]
    NoAdvance { offset: usize },
    #[error("illegal segment register encoding at {offset:#06x}: {byte:08b}")]
    IllegalSegmentEncoding { byte: u8, offset: usize },
    #[error("truncated instruction at {offset:#06x}: needs {needed} bytes, {available} left")]
    Truncated { offset: usize, needed: usize, available: usize },
    #[error("memory access out of range: {address:#07x}")]
    MemoryOutOfRange { address: usize },
    #[error("program of {size} bytes does not fit below the 64 KiB IP limit")]
    ProgramTooLarge { size: usize },
    #[error("`{operation}` is missing an operand")]
    MissingOperand { operation: Operation },
    #[error("`{operation}` cannot use operand `{operand}`")]
    InvalidOperand { operation: Operation, operand: Operand },
    #[error(transparent)]
    Io(#[from] io::Error),
}
