use crate::air::LineOfCode;
use crate::alu::Circuit;
use crate::error::AsmErrorKind;
use crate::isa::{Gp, Mode, Operation, Target, ORG_OPCODE};
use crate::memory::MEMORY_SIZE;
use crate::psr::Flag;
use crate::word::Word;

const IMMEDIATE_SIGIL: char = '#';
const HEX_SIGIL: char = '$';
const DECIMAL_SIGIL: char = '^';

/// Operand token, classified by addressing mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// `#$hh` or `#^ddd`
    Immediate(u8),
    /// `$hh` or `^ddd`
    Direct(u8),
    /// `($hh)`
    Indirect(u8),
    /// `A` or `B`
    Register(Gp),
}

/// Parse `$hh` (hex) or `^ddd` (decimal). Values must address memory.
pub fn parse_number(token: &str) -> Result<u8, AsmErrorKind> {
    let (radix, digits) = if let Some(digits) = token.strip_prefix(HEX_SIGIL) {
        (16, digits)
    } else if let Some(digits) = token.strip_prefix(DECIMAL_SIGIL) {
        (10, digits)
    } else {
        return Err(AsmErrorKind::InvalidNumber);
    };
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return Err(AsmErrorKind::InvalidNumber);
    }
    // Too many digits for any address
    let value = u32::from_str_radix(digits, radix).map_err(|_| AsmErrorKind::AddressTooLarge)?;
    if value as usize >= MEMORY_SIZE {
        return Err(AsmErrorKind::AddressTooLarge);
    }
    Ok(value as u8)
}

pub fn parse_operand(token: &str) -> Result<Operand, AsmErrorKind> {
    let operand = match token {
        "A" => Operand::Register(Gp::A),
        "B" => Operand::Register(Gp::B),
        _ if token.starts_with(IMMEDIATE_SIGIL) => Operand::Immediate(parse_number(&token[1..])?),
        _ if token.starts_with(HEX_SIGIL) || token.starts_with(DECIMAL_SIGIL) => {
            Operand::Direct(parse_number(token)?)
        }
        _ => match token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            Some(inner) => Operand::Indirect(parse_number(inner)?),
            None => {
                return Err(AsmErrorKind::InvalidOperand {
                    operand: token.to_string(),
                })
            }
        },
    };
    Ok(operand)
}

/// Branch mnemonic -> (flag tested, state it must be in).
pub fn branch_condition(command: &str) -> Option<(Flag, bool)> {
    let cond = match command {
        "BCS" => (Flag::Carry, true),
        "BCC" => (Flag::Carry, false),
        "BNS" | "BMI" => (Flag::Negative, true),
        "BNC" | "BPL" => (Flag::Negative, false),
        "BZS" | "BEQ" => (Flag::Zero, true),
        "BZC" | "BNE" => (Flag::Zero, false),
        "BVS" => (Flag::Overflow, true),
        "BVC" => (Flag::Overflow, false),
        _ => return None,
    };
    Some(cond)
}

fn invalid(token: &str) -> AsmErrorKind {
    AsmErrorKind::InvalidOperand {
        operand: token.to_string(),
    }
}

fn expect_params(line: &LineOfCode, expected: usize) -> Result<(), AsmErrorKind> {
    if line.params.len() != expected {
        return Err(AsmErrorKind::ParameterCount { expected });
    }
    Ok(())
}

/// Two distinct operands.
fn expect_pair(line: &LineOfCode) -> Result<(&str, &str), AsmErrorKind> {
    expect_params(line, 2)?;
    let (src, dest) = (line.params[0].as_str(), line.params[1].as_str());
    if src == dest {
        return Err(AsmErrorKind::IdenticalParameters);
    }
    Ok((src, dest))
}

/// Third pass: translates lines into words, one at a time in layout order.
#[derive(Debug)]
pub struct Encoder {
    org_declared: bool,
    /// Position and source line number of the last non-blank line.
    last: Option<(usize, usize)>,
}

impl Encoder {
    pub fn new(last: Option<(usize, usize)>) -> Self {
        Encoder {
            org_declared: false,
            last,
        }
    }

    pub fn encode(&mut self, line: &LineOfCode) -> Result<Word, AsmErrorKind> {
        let command = line.command.as_str();
        let (op, operand) = match command {
            "ORG" => return self.org(line),
            "HALT" => return self.halt(line),
            "ADD" => Self::compute(line, Some(Circuit::Add))?,
            "SUB" => Self::compute(line, Some(Circuit::Sub))?,
            "CMP" => Self::compute(line, None)?,
            "MOVE" => Self::moving(line)?,
            "JMP" => {
                let (target, operand) = Self::target(line)?;
                (Operation::Jump { target }, operand)
            }
            _ => match branch_condition(command) {
                Some((flag, when)) => {
                    let (target, operand) = Self::target(line)?;
                    (Operation::Branch { flag, when, target }, operand)
                }
                None => return Err(AsmErrorKind::UnknownCommand),
            },
        };
        Ok(Word::from_bytes(op.opcode(), operand))
    }

    fn org(&mut self, line: &LineOfCode) -> Result<Word, AsmErrorKind> {
        if self.org_declared {
            return Err(AsmErrorKind::OrgRedeclared);
        }
        if line.position != 1 {
            return Err(AsmErrorKind::OrgNotFirst);
        }
        expect_params(line, 1)?;
        let address = parse_number(&line.params[0])?;
        self.org_declared = true;
        Ok(Word::from_bytes(ORG_OPCODE, address))
    }

    fn halt(&mut self, line: &LineOfCode) -> Result<Word, AsmErrorKind> {
        if let Some((position, last)) = self.last {
            if line.position != position {
                return Err(AsmErrorKind::HaltNotLast { last });
            }
        }
        expect_params(line, 0)?;
        Ok(Word::from_bytes(Operation::Halt.opcode(), 0))
    }

    /// `ADD`, `SUB`, or `CMP` when no circuit is given.
    fn compute(line: &LineOfCode, circuit: Option<Circuit>) -> Result<(Operation, u8), AsmErrorKind> {
        let (src, dest) = expect_pair(line)?;
        let Operand::Register(dest) = parse_operand(dest)? else {
            return Err(invalid(dest));
        };
        let (mode, operand) = match parse_operand(src)? {
            Operand::Immediate(n) => (Mode::Immediate, n),
            Operand::Direct(addr) => (Mode::Direct, addr),
            Operand::Register(_) => (Mode::Register, 0),
            Operand::Indirect(_) => return Err(invalid(src)),
        };
        let op = match circuit {
            Some(circuit) => Operation::Compute {
                circuit,
                mode,
                dest,
            },
            None => Operation::Compare { mode, dest },
        };
        Ok((op, operand))
    }

    fn moving(line: &LineOfCode) -> Result<(Operation, u8), AsmErrorKind> {
        let (src_token, dest_token) = expect_pair(line)?;
        let src = parse_operand(src_token)?;
        let dest = parse_operand(dest_token)?;
        let res = match (src, dest) {
            (Operand::Immediate(n), Operand::Register(dest)) => (
                Operation::Load {
                    mode: Mode::Immediate,
                    dest,
                },
                n,
            ),
            (Operand::Direct(addr), Operand::Register(dest)) => (
                Operation::Load {
                    mode: Mode::Direct,
                    dest,
                },
                addr,
            ),
            (Operand::Register(_), Operand::Register(dest)) => (
                Operation::Load {
                    mode: Mode::Register,
                    dest,
                },
                0,
            ),
            (Operand::Register(src), Operand::Direct(addr)) => (
                Operation::Store {
                    indirect: false,
                    src,
                },
                addr,
            ),
            (Operand::Register(src), Operand::Indirect(addr)) => (
                Operation::Store {
                    indirect: true,
                    src,
                },
                addr,
            ),
            (_, Operand::Immediate(_)) => return Err(invalid(dest_token)),
            _ => return Err(invalid(src_token)),
        };
        Ok(res)
    }

    fn target(line: &LineOfCode) -> Result<(Target, u8), AsmErrorKind> {
        expect_params(line, 1)?;
        let token = line.params[0].as_str();
        match parse_operand(token)? {
            Operand::Immediate(addr) => Ok((Target::Immediate, addr)),
            Operand::Direct(addr) => Ok((Target::Direct, addr)),
            _ => Err(invalid(token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn line(position: usize, text: &str) -> LineOfCode {
        let mut parts = text.split(' ');
        let command = parts.next().unwrap();
        let mut line = LineOfCode::new(position, position, Span::default(), command);
        if let Some(params) = parts.next() {
            line.params = params.split(',').map(str::to_string).collect();
        }
        line
    }

    fn encode(text: &str) -> Result<u16, AsmErrorKind> {
        Encoder::new(None)
            .encode(&line(2, text))
            .map(Word::unsigned)
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("$0A"), Ok(0x0A));
        assert_eq!(parse_number("^255"), Ok(255));
        assert_eq!(parse_number("$100"), Err(AsmErrorKind::AddressTooLarge));
        assert_eq!(parse_number("^99999999999"), Err(AsmErrorKind::AddressTooLarge));
        assert_eq!(parse_number("10"), Err(AsmErrorKind::InvalidNumber));
        assert_eq!(parse_number("$"), Err(AsmErrorKind::InvalidNumber));
        assert_eq!(parse_number("^1F"), Err(AsmErrorKind::InvalidNumber));
    }

    #[test]
    fn operand_modes() {
        assert_eq!(parse_operand("#$05"), Ok(Operand::Immediate(5)));
        assert_eq!(parse_operand("^16"), Ok(Operand::Direct(16)));
        assert_eq!(parse_operand("($20)"), Ok(Operand::Indirect(0x20)));
        assert_eq!(parse_operand("B"), Ok(Operand::Register(Gp::B)));
        assert_eq!(parse_operand("#5"), Err(AsmErrorKind::InvalidNumber));
        assert!(matches!(
            parse_operand("C"),
            Err(AsmErrorKind::InvalidOperand { .. })
        ));
    }

    #[test]
    fn arithmetic_forms() {
        assert_eq!(encode("ADD #$05,A"), Ok(0x0005));
        assert_eq!(encode("ADD #^10,B"), Ok(0x010A));
        assert_eq!(encode("ADD $20,B"), Ok(0x0320));
        assert_eq!(encode("ADD B,A"), Ok(0x0400));
        assert_eq!(encode("ADD A,B"), Ok(0x0500));
        assert_eq!(encode("SUB #$01,A"), Ok(0x0601));
        assert_eq!(encode("SUB A,B"), Ok(0x0B00));
        assert_eq!(encode("CMP $10,A"), Ok(0x0E10));
        assert_eq!(encode("CMP B,A"), Ok(0x1000));
    }

    #[test]
    fn move_forms() {
        assert_eq!(encode("MOVE #$FF,A"), Ok(0x12FF));
        assert_eq!(encode("MOVE $30,B"), Ok(0x1530));
        assert_eq!(encode("MOVE B,A"), Ok(0x1600));
        assert_eq!(encode("MOVE A,$40"), Ok(0x1840));
        assert_eq!(encode("MOVE B,($41)"), Ok(0x1B41));
        assert!(matches!(
            encode("MOVE A,#$01"),
            Err(AsmErrorKind::InvalidOperand { .. })
        ));
        assert!(matches!(
            encode("MOVE $01,$02"),
            Err(AsmErrorKind::InvalidOperand { .. })
        ));
    }

    #[test]
    fn jumps_and_branches() {
        assert_eq!(encode("JMP #$07"), Ok(0x1C07));
        assert_eq!(encode("JMP $07"), Ok(0x1D07));
        assert_eq!(encode("BCS #$01"), Ok(0x1E01));
        assert_eq!(encode("BEQ #$02"), Ok(0x2602));
        assert_eq!(encode("BZS #$02"), Ok(0x2602));
        assert_eq!(encode("BNE $03"), Ok(0x2903));
        assert_eq!(encode("BMI #$04"), Ok(0x2204));
        assert_eq!(encode("BPL #$04"), Ok(0x2404));
        assert_eq!(encode("BVC $05"), Ok(0x2D05));
        assert!(matches!(
            encode("JMP A"),
            Err(AsmErrorKind::InvalidOperand { .. })
        ));
    }

    #[test]
    fn parameter_rules() {
        assert_eq!(
            encode("ADD #$01"),
            Err(AsmErrorKind::ParameterCount { expected: 2 })
        );
        assert_eq!(encode("ADD A,A"), Err(AsmErrorKind::IdenticalParameters));
        assert_eq!(
            encode("JMP #$01,#$02"),
            Err(AsmErrorKind::ParameterCount { expected: 1 })
        );
        assert_eq!(encode("ADD #$100,A"), Err(AsmErrorKind::AddressTooLarge));
        assert_eq!(encode("NOP"), Err(AsmErrorKind::UnknownCommand));
    }

    #[test]
    fn org_rules() {
        let mut enc = Encoder::new(Some((3, 3)));
        assert_eq!(enc.encode(&line(1, "ORG $0A")).map(Word::unsigned), Ok(0x000A));
        assert_eq!(enc.encode(&line(2, "ORG $00")), Err(AsmErrorKind::OrgRedeclared));

        let mut enc = Encoder::new(None);
        assert_eq!(enc.encode(&line(2, "ORG $00")), Err(AsmErrorKind::OrgNotFirst));
        assert_eq!(
            enc.encode(&line(1, "ORG $00,$01")),
            Err(AsmErrorKind::ParameterCount { expected: 1 })
        );
    }

    #[test]
    fn halt_rules() {
        let mut enc = Encoder::new(Some((3, 5)));
        assert_eq!(enc.encode(&line(3, "HALT")).map(Word::unsigned), Ok(0xFF00));
        assert_eq!(
            enc.encode(&line(2, "HALT")),
            Err(AsmErrorKind::HaltNotLast { last: 5 })
        );
        assert_eq!(
            enc.encode(&line(3, "HALT $01")),
            Err(AsmErrorKind::ParameterCount { expected: 0 })
        );
    }
}
