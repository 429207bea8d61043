use std::{fmt, str::FromStr};

use crate::memory::MEMORY_SIZE;
use crate::word::Word;

/// Identity of every register in the register file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Register {
    /// Program counter
    Pc,
    /// Memory address register
    Mar,
    /// Memory data register
    Mdr,
    /// Instruction register
    Ir,
    /// General purpose register A
    Gpa,
    /// General purpose register B
    Gpb,
}

impl Register {
    pub const ALL: [Register; 6] = [
        Register::Pc,
        Register::Mar,
        Register::Mdr,
        Register::Ir,
        Register::Gpa,
        Register::Gpb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::Mar => "MAR",
            Self::Mdr => "MDR",
            Self::Ir => "IR",
            Self::Gpa => "GPA",
            Self::Gpb => "GPB",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Register {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PC" => Ok(Register::Pc),
            "MAR" => Ok(Register::Mar),
            "MDR" => Ok(Register::Mdr),
            "IR" => Ok(Register::Ir),
            "GPA" | "A" => Ok(Register::Gpa),
            "GPB" | "B" => Ok(Register::Gpb),
            _ => Err(()),
        }
    }
}

/// Every register of the CPU, all starting at zero.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct RegisterFile {
    pc: Word,
    mar: Word,
    mdr: Word,
    ir: Word,
    gpa: Word,
    gpb: Word,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, reg: Register) -> Word {
        match reg {
            Register::Pc => self.pc,
            Register::Mar => self.mar,
            Register::Mdr => self.mdr,
            Register::Ir => self.ir,
            Register::Gpa => self.gpa,
            Register::Gpb => self.gpb,
        }
    }

    pub fn write(&mut self, reg: Register, word: Word) {
        *self.slot(reg) = word;
    }

    pub fn reset(&mut self, reg: Register) {
        *self.slot(reg) = Word::ZERO;
    }

    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    fn slot(&mut self, reg: Register) -> &mut Word {
        match reg {
            Register::Pc => &mut self.pc,
            Register::Mar => &mut self.mar,
            Register::Mdr => &mut self.mdr,
            Register::Ir => &mut self.ir,
            Register::Gpa => &mut self.gpa,
            Register::Gpb => &mut self.gpb,
        }
    }

    /// Advance PC by one, wrapping back to the first memory slot.
    pub fn increment_pc(&mut self) {
        let next = self.pc.unsigned() as usize + 1;
        self.pc = if next >= MEMORY_SIZE {
            Word::ZERO
        } else {
            Word::from(next as u16)
        };
    }

    /// High byte of IR.
    pub fn opcode(&self) -> u8 {
        self.ir.high_byte()
    }

    /// Low byte of IR.
    pub fn operand(&self) -> u8 {
        self.ir.low_byte()
    }
}
