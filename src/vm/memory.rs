use std::io::{self, Write};

use crate::vm::error::{Error, Result};

pub const MEMORY_SIZE: usize = 1 << 20;

/// Flat 1 MiB address space.
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    pub fn copy_data(memory: &mut Memory, address: usize, data: &[u8]) -> Result<()> {
        let end = address + data.len();
        memory
            .bytes
            .get_mut(address..end)
            .ok_or_else(|| Error::MemoryOutOfRange { address: end.saturating_sub(1) })?
            .copy_from_slice(data);
        Ok(())
    }

    #[inline]
    pub fn read_byte(&self, address: usize) -> Result<u8> {
        self.bytes.get(address).copied().ok_or(Error::MemoryOutOfRange { address })
    }

    #[inline]
    pub fn read_word(&self, address: usize) -> Result<u16> {
        Ok(u16::from_le_bytes([self.read_byte(address)?, self.read_byte(address + 1)?]))
    }

    #[inline]
    pub fn write_byte(&mut self, address: usize, byte: u8) -> Result<()> {
        let slot = self.bytes.get_mut(address).ok_or(Error::MemoryOutOfRange { address })?;
        *slot = byte;
        Ok(())
    }

    #[inline]
    pub fn write_word(&mut self, address: usize, word: u16) -> Result<()> {
        if address + 1 >= MEMORY_SIZE {
            return Err(Error::MemoryOutOfRange { address: address + 1 });
        }
        let [low, high] = word.to_le_bytes();
        self.write_byte(address, low)?;
        self.write_byte(address + 1, high)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes the whole address space, no header.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.bytes)
    }
}
