use std::{error::Error, fmt};

use crate::word::Word;

/// Amount of addressable slots. Addresses are a single byte wide.
pub const MEMORY_SIZE: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryError {
    AddressOutOfRange { address: u16 },
    ProgramTooLarge { origin: u16, len: usize },
}

impl Error for MemoryError {}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfRange { address } => write!(
                f,
                "Address 0x{:04x} exceeds memory size of {} slots",
                address, MEMORY_SIZE
            ),
            Self::ProgramTooLarge { origin, len } => write!(
                f,
                "Not enough room in memory to load {} words at 0x{:02x}",
                len, origin
            ),
        }
    }
}

/// Main memory. Slots are positional, so an address is also the index of its slot.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    slots: Box<[Word; MEMORY_SIZE]>,
    /// Slot currently selected for `*_at_pointer` access.
    pointer: u8,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            slots: Box::new([Word::ZERO; MEMORY_SIZE]),
            pointer: 0,
        }
    }

    fn check(address: u16) -> Result<u8, MemoryError> {
        if (address as usize) < MEMORY_SIZE {
            Ok(address as u8)
        } else {
            Err(MemoryError::AddressOutOfRange { address })
        }
    }

    pub fn read(&self, address: u16) -> Result<Word, MemoryError> {
        let address = Self::check(address)?;
        Ok(self.slots[address as usize])
    }

    pub fn write(&mut self, address: u16, word: Word) -> Result<(), MemoryError> {
        let address = Self::check(address)?;
        self.slots[address as usize] = word;
        Ok(())
    }

    pub fn set_pointer(&mut self, address: u16) -> Result<(), MemoryError> {
        self.pointer = Self::check(address)?;
        Ok(())
    }

    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    pub fn read_at_pointer(&self) -> Word {
        self.slots[self.pointer as usize]
    }

    pub fn write_at_pointer(&mut self, word: Word) {
        self.slots[self.pointer as usize] = word;
    }

    /// Copy a program image into memory starting at `origin`. Nothing is written on failure.
    pub fn load(&mut self, origin: u16, words: &[Word]) -> Result<(), MemoryError> {
        let start = origin as usize;
        if start + words.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                origin,
                len: words.len(),
            });
        }
        self.slots[start..start + words.len()].copy_from_slice(words);
        Ok(())
    }

    /// Zero every slot. The memory itself is never resized.
    pub fn reset(&mut self) {
        self.slots.fill(Word::ZERO);
        self.pointer = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Word> {
        self.slots.iter()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
