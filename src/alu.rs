use std::{fmt, str::FromStr};

use crate::psr::{Flag, Psr};
use crate::word::{Word, WordError};

/// Operation the ALU applies when computing Z.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum Circuit {
    #[default]
    Add,
    Sub,
    Mul,
    Div,
}

impl Circuit {
    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '×',
            Self::Div => '÷',
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "addition",
            Self::Sub => "subtraction",
            Self::Mul => "multiplication",
            Self::Div => "division",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Circuit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" | "+" => Ok(Circuit::Add),
            "sub" | "-" => Ok(Circuit::Sub),
            "mul" | "*" => Ok(Circuit::Mul),
            "div" | "/" => Ok(Circuit::Div),
            _ => Err(()),
        }
    }
}

/// Arithmetic logic unit with its X and Y operand latches and Z result.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Alu {
    x: Word,
    y: Word,
    z: Word,
    circuit: Circuit,
}

impl Alu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_x(&mut self, word: Word) {
        self.x = word;
    }

    pub fn write_y(&mut self, word: Word) {
        self.y = word;
    }

    pub fn read_x(&self) -> Word {
        self.x
    }

    pub fn read_y(&self) -> Word {
        self.y
    }

    pub fn read_z(&self) -> Word {
        self.z
    }

    pub fn set_circuit(&mut self, circuit: Circuit) {
        self.circuit = circuit;
    }

    pub fn circuit(&self) -> Circuit {
        self.circuit
    }

    /// Apply the current circuit to X and Y, latch the result into Z and update every PSR flag.
    ///
    /// On failure neither Z nor the PSR is modified.
    pub fn compute_z(&mut self, psr: &mut Psr) -> Result<Word, WordError> {
        let res = match self.circuit {
            Circuit::Add => Word::add(self.x, self.y),
            Circuit::Sub => Word::subtract(self.x, self.y),
            Circuit::Mul => Word::multiply(self.x, self.y),
            Circuit::Div => Word::divide(self.x, self.y)?,
        };
        self.z = res.word;
        psr.set_flag(Flag::Zero, res.word.is_zero());
        psr.set_flag(Flag::Negative, res.word.is_negative());
        psr.set_flag(Flag::Overflow, res.overflow);
        psr.set_flag(Flag::Carry, res.carry);
        Ok(res.word)
    }

    /// Back to the addition circuit with every latch cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
