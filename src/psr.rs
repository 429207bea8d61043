use std::{fmt, str::FromStr};

/// Flags held by the process status register.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Flag {
    Carry = 0b0001,
    Zero = 0b0010,
    Negative = 0b0100,
    Overflow = 0b1000,
}

impl Flag {
    pub const ALL: [Flag; 4] = [Flag::Carry, Flag::Zero, Flag::Negative, Flag::Overflow];

    pub fn letter(self) -> char {
        match self {
            Self::Carry => 'C',
            Self::Zero => 'Z',
            Self::Negative => 'N',
            Self::Overflow => 'V',
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Carry => "CARRY",
            Self::Zero => "ZERO",
            Self::Negative => "NEGATIVE",
            Self::Overflow => "OVERFLOW",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "C" | "CARRY" => Ok(Flag::Carry),
            "Z" | "ZERO" => Ok(Flag::Zero),
            "N" | "NEGATIVE" => Ok(Flag::Negative),
            "V" | "OVERFLOW" => Ok(Flag::Overflow),
            _ => Err(()),
        }
    }
}

/// Process status register. The upper four bits are unused.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Psr(u8);

impl Psr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only toggles the bit if its state actually changes.
    pub fn set_flag(&mut self, flag: Flag, state: bool) {
        if self.get_flag(flag) != state {
            self.0 ^= flag as u8;
        }
    }

    pub fn get_flag(&self, flag: Flag) -> bool {
        self.0 & flag as u8 != 0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

impl fmt::Display for Psr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}
