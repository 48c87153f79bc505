pub mod runtime;
pub mod memory;
pub mod registers;
pub mod instructions;
pub mod decoder;
pub mod disassembler;
pub mod error;
pub mod opcode;
pub mod operand;
mod modrm;
pub mod cpu;
