use std::{error::Error, fmt};

/// A 16-bit machine word.
///
/// The same bit pattern is viewed as signed or unsigned depending on the consumer, there is no
/// separate truncation step anywhere else in the crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Word(u16);

/// Result of a single arithmetic operation.
///
/// Carry and overflow only describe the operation which produced `word`, they are never stored
/// inside a [`Word`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Computed {
    pub word: Word,
    pub carry: bool,
    pub overflow: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordError {
    InvalidNumberFormat { input: String },
    DivisionByZero,
}

impl Error for WordError {}

impl fmt::Display for WordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumberFormat { input } => {
                write!(f, "Unrecognised number format: `{}`", input)
            }
            Self::DivisionByZero => write!(f, "Attempted to divide by zero"),
        }
    }
}

impl Word {
    pub const ZERO: Word = Word(0);

    /// Truncates to the low 16 bits.
    pub fn from_int(value: i32) -> Self {
        Word(value as u16)
    }

    pub const fn from_bytes(high: u8, low: u8) -> Self {
        Word(((high as u16) << 8) | low as u16)
    }

    /// Accepts 1 to 4 hex digits, without any prefix.
    pub fn from_hex_string(input: &str) -> Result<Self, WordError> {
        let invalid = || WordError::InvalidNumberFormat {
            input: input.to_string(),
        };
        if input.is_empty() || input.len() > 4 || !input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        u16::from_str_radix(input, 16)
            .map(Word)
            .map_err(|_| invalid())
    }

    pub fn to_hex_string(self) -> String {
        format!("{:04X}", self.0)
    }

    pub const fn signed(self) -> i16 {
        self.0 as i16
    }

    pub const fn unsigned(self) -> u16 {
        self.0
    }

    pub const fn high_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn low_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.signed() < 0
    }

    pub fn add(x: Word, y: Word) -> Computed {
        let signed = x.signed() as i32 + y.signed() as i32;
        let unsigned = x.unsigned() as u32 + y.unsigned() as u32;
        Computed {
            word: Word::from_int(signed),
            carry: unsigned > u16::MAX as u32,
            overflow: !fits_i16(signed),
        }
    }

    pub fn subtract(x: Word, y: Word) -> Computed {
        let signed = x.signed() as i32 - y.signed() as i32;
        Computed {
            word: Word::from_int(signed),
            // Borrow out of the top bit
            carry: x.unsigned() < y.unsigned(),
            overflow: !fits_i16(signed),
        }
    }

    pub fn multiply(x: Word, y: Word) -> Computed {
        let signed = x.signed() as i32 * y.signed() as i32;
        let unsigned = x.unsigned() as u32 * y.unsigned() as u32;
        Computed {
            word: Word::from_int(signed),
            carry: unsigned > u16::MAX as u32,
            overflow: !fits_i16(signed),
        }
    }

    pub fn divide(x: Word, y: Word) -> Result<Computed, WordError> {
        if y.is_zero() {
            return Err(WordError::DivisionByZero);
        }
        // Only `i16::MIN / -1` leaves the range
        let signed = x.signed() as i32 / y.signed() as i32;
        Ok(Computed {
            word: Word::from_int(signed),
            carry: false,
            overflow: !fits_i16(signed),
        })
    }
}

fn fits_i16(value: i32) -> bool {
    (i16::MIN as i32..=i16::MAX as i32).contains(&value)
}

impl From<u16> for Word {
    fn from(value: u16) -> Self {
        Word(value)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0x{:04x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_signed_overflow() {
        let res = Word::add(Word::from(0x7FFF), Word::from(0x0001));
        assert_eq!(res.word, Word::from(0x8000));
        assert!(res.overflow);
        assert!(!res.carry);
        assert!(res.word.is_negative());
    }

    #[test]
    fn add_unsigned_carry() {
        let res = Word::add(Word::from(0xFFFF), Word::from(0x0001));
        assert_eq!(res.word, Word::ZERO);
        assert!(res.carry);
        assert!(!res.overflow);
        assert!(res.word.is_zero());
    }

    #[test]
    fn add_negative_underflow() {
        let res = Word::add(Word::from(0x8000), Word::from(0xFFFF));
        assert_eq!(res.word, Word::from(0x7FFF));
        assert!(res.overflow);
        assert!(res.carry);
    }

    #[test]
    fn subtract_flags() {
        let res = Word::subtract(Word::from(0x8000), Word::from(0x0001));
        assert_eq!(res.word, Word::from(0x7FFF));
        assert!(res.overflow);
        assert!(!res.carry);

        let res = Word::subtract(Word::from(3), Word::from(5));
        assert_eq!(res.word.signed(), -2);
        assert!(!res.overflow);
        assert!(res.carry);

        let res = Word::subtract(Word::from(5), Word::from(5));
        assert!(res.word.is_zero());
        assert!(!res.carry);
    }

    #[test]
    fn multiply_flags() {
        let res = Word::multiply(Word::from(0x0100), Word::from(0x0100));
        assert_eq!(res.word, Word::ZERO);
        assert!(res.overflow);
        assert!(res.carry);

        let res = Word::multiply(Word::from_int(-3), Word::from(4));
        assert_eq!(res.word.signed(), -12);
        assert!(!res.overflow);
        // 0xFFFD * 4 does not fit in 16 unsigned bits
        assert!(res.carry);
    }

    #[test]
    fn divide() {
        let res = Word::divide(Word::from_int(-7), Word::from(2)).unwrap();
        assert_eq!(res.word.signed(), -3);
        assert!(!res.overflow);

        let res = Word::divide(Word::from(0x8000), Word::from_int(-1)).unwrap();
        assert_eq!(res.word, Word::from(0x8000));
        assert!(res.overflow);

        assert_eq!(
            Word::divide(Word::from(1), Word::ZERO),
            Err(WordError::DivisionByZero)
        );
    }

    #[test]
    fn hex_strings() {
        assert_eq!(Word::from_hex_string("0203").unwrap(), Word::from(0x0203));
        assert_eq!(Word::from_hex_string("a").unwrap(), Word::from(0x000A));
        assert_eq!(Word::from(0x00ab).to_hex_string(), "00AB");
        assert_eq!(Word::from_int(-1).to_hex_string(), "FFFF");
        for bad in ["", "12345", "0x12", "G1", "-1"] {
            assert!(
                matches!(
                    Word::from_hex_string(bad),
                    Err(WordError::InvalidNumberFormat { .. })
                ),
                "`{bad}` should be rejected"
            );
        }
    }

    #[test]
    fn views_share_bits() {
        let word = Word::from_int(-2);
        assert_eq!(word.signed(), -2);
        assert_eq!(word.unsigned(), 0xFFFE);
        assert_eq!(word.high_byte(), 0xFF);
        assert_eq!(word.low_byte(), 0xFE);
        assert_eq!(Word::from_bytes(0x02, 0x03), Word::from(0x0203));
    }
}
