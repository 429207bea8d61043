use std::error::Error;
use std::fmt;

use crate::alu::Circuit;
use crate::register::Register;
use crate::word::Word;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Fetch,
    Decode,
    Execute,
    Cycle { count: u16 },
    Run,
    Reset,
    Registers,
    Flags,
    Memory { address: u8, count: u16 },
    Set { register: Register, value: Word },
    Poke { address: u8, value: Word },
    Circuit { circuit: Circuit },
    Instruction { id: u8 },
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandName {
    Help,
    Fetch,
    Decode,
    Execute,
    Cycle,
    Run,
    Reset,
    Registers,
    Flags,
    Memory,
    Set,
    Poke,
    Circuit,
    Instruction,
    Quit,
}

impl CommandName {
    const ALL: [CommandName; 15] = [
        Self::Help,
        Self::Fetch,
        Self::Decode,
        Self::Execute,
        Self::Cycle,
        Self::Run,
        Self::Reset,
        Self::Registers,
        Self::Flags,
        Self::Memory,
        Self::Set,
        Self::Poke,
        Self::Circuit,
        Self::Instruction,
        Self::Quit,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Fetch => "fetch",
            Self::Decode => "decode",
            Self::Execute => "execute",
            Self::Cycle => "cycle",
            Self::Run => "run",
            Self::Reset => "reset",
            Self::Registers => "registers",
            Self::Flags => "flags",
            Self::Memory => "memory",
            Self::Set => "set",
            Self::Poke => "poke",
            Self::Circuit => "circuit",
            Self::Instruction => "instruction",
            Self::Quit => "quit",
        }
    }

    /// Short forms, and some obvious synonyms.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Help => &["h", "?"],
            Self::Fetch => &["f"],
            Self::Decode => &["d"],
            Self::Execute => &["e", "x"],
            Self::Cycle => &["c", "step", "s"],
            Self::Run => &["r", "continue"],
            Self::Reset => &[],
            Self::Registers => &["regs", "reg"],
            Self::Flags => &["psr"],
            Self::Memory => &["mem", "m"],
            Self::Set => &[],
            Self::Poke => &[],
            Self::Circuit => &["alu"],
            Self::Instruction => &["instr", "i"],
            Self::Quit => &["q", "exit"],
        }
    }

    fn find(input: &str) -> Option<Self> {
        let input = input.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|name| name.name() == input || name.aliases().contains(&input.as_str()))
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error parsing a command.
#[derive(Debug, PartialEq)]
pub enum CommandError {
    InvalidCommand {
        command_name: String,
        suggestion: Option<CommandName>,
    },
    MissingArgument {
        command_name: CommandName,
        argument_name: &'static str,
    },
    TooManyArguments {
        command_name: CommandName,
        expected_count: u8,
        actual_count: u8,
    },
    InvalidValue {
        command_name: CommandName,
        argument_name: &'static str,
        value: String,
    },
}

impl Error for CommandError {}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand {
                command_name,
                suggestion,
            } => {
                write!(f, "Not a command: `{}`", command_name)?;
                if let Some(suggestion) = suggestion {
                    write!(f, ". Did you mean `{}`?", suggestion)?;
                }
                Ok(())
            }
            Self::MissingArgument {
                command_name,
                argument_name,
            } => write!(
                f,
                "Missing argument `{}` for command `{}`",
                argument_name, command_name
            ),
            Self::TooManyArguments {
                command_name,
                expected_count,
                actual_count,
            } => write!(
                f,
                "Command `{}` takes {} argument{}, but {} were given",
                command_name,
                expected_count,
                if *expected_count == 1 { "" } else { "s" },
                actual_count
            ),
            Self::InvalidValue {
                command_name,
                argument_name,
                value,
            } => write!(
                f,
                "Invalid value `{}` for argument `{}` of command `{}`",
                value, argument_name, command_name
            ),
        }
    }
}

/// Whitespace-separated arguments of one command.
struct Arguments<'a> {
    command_name: CommandName,
    parts: Vec<&'a str>,
    cursor: usize,
}

impl<'a> Arguments<'a> {
    fn next(&mut self) -> Option<&'a str> {
        let part = self.parts.get(self.cursor).copied();
        self.cursor += 1;
        part
    }

    fn required<T>(
        &mut self,
        argument_name: &'static str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<T, CommandError> {
        let Some(value) = self.next() else {
            return Err(CommandError::MissingArgument {
                command_name: self.command_name,
                argument_name,
            });
        };
        self.value(argument_name, value, parse)
    }

    fn optional<T>(
        &mut self,
        argument_name: &'static str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<Option<T>, CommandError> {
        match self.next() {
            Some(value) => self.value(argument_name, value, parse).map(Some),
            None => Ok(None),
        }
    }

    fn value<T>(
        &self,
        argument_name: &'static str,
        value: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<T, CommandError> {
        parse(value).ok_or_else(|| CommandError::InvalidValue {
            command_name: self.command_name,
            argument_name,
            value: value.to_string(),
        })
    }

    /// All arguments must have been consumed.
    fn finish(self, expected_count: u8) -> Result<(), CommandError> {
        if self.parts.len() > self.cursor.min(self.parts.len()) {
            return Err(CommandError::TooManyArguments {
                command_name: self.command_name,
                expected_count,
                actual_count: self.parts.len() as u8,
            });
        }
        Ok(())
    }
}

/// Hex with an optional `$`, `0x` or `x` prefix.
fn hex(input: &str) -> Option<u16> {
    let digits = input
        .strip_prefix('$')
        .or_else(|| input.strip_prefix("0x"))
        .or_else(|| input.strip_prefix("0X"))
        .or_else(|| input.strip_prefix('x'))
        .unwrap_or(input);
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

fn address(input: &str) -> Option<u8> {
    hex(input).and_then(|value| u8::try_from(value).ok())
}

fn count(input: &str) -> Option<u16> {
    input.parse().ok().filter(|count| *count > 0)
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut parts = line.split_whitespace();
        let Some(first) = parts.next() else {
            return Err(CommandError::InvalidCommand {
                command_name: String::new(),
                suggestion: None,
            });
        };
        let Some(command_name) = CommandName::find(first) else {
            return Err(CommandError::InvalidCommand {
                command_name: first.to_string(),
                suggestion: suggest(first),
            });
        };

        let mut args = Arguments {
            command_name,
            parts: parts.collect(),
            cursor: 0,
        };

        let (command, expected) = match command_name {
            CommandName::Help => (Command::Help, 0),
            CommandName::Fetch => (Command::Fetch, 0),
            CommandName::Decode => (Command::Decode, 0),
            CommandName::Execute => (Command::Execute, 0),
            CommandName::Run => (Command::Run, 0),
            CommandName::Reset => (Command::Reset, 0),
            CommandName::Registers => (Command::Registers, 0),
            CommandName::Flags => (Command::Flags, 0),
            CommandName::Quit => (Command::Quit, 0),
            CommandName::Cycle => {
                let count = args.optional("count", count)?.unwrap_or(1);
                (Command::Cycle { count }, 1)
            }
            CommandName::Memory => {
                let address = args.required("address", address)?;
                let count = args.optional("count", count)?.unwrap_or(1);
                (Command::Memory { address, count }, 2)
            }
            CommandName::Set => {
                let register = args.required("register", |s| s.parse().ok())?;
                let value = args.required("value", |s| hex(s).map(Word::from))?;
                (Command::Set { register, value }, 2)
            }
            CommandName::Poke => {
                let address = args.required("address", address)?;
                let value = args.required("value", |s| hex(s).map(Word::from))?;
                (Command::Poke { address, value }, 2)
            }
            CommandName::Circuit => {
                let circuit = args.required("circuit", |s| s.parse().ok())?;
                (Command::Circuit { circuit }, 1)
            }
            CommandName::Instruction => {
                let id = args.required("id", address)?;
                (Command::Instruction { id }, 1)
            }
        };
        args.finish(expected)?;
        Ok(command)
    }
}

/// Closest command name, if the input is a prefix of one or differs by a single character.
fn suggest(input: &str) -> Option<CommandName> {
    let input = input.to_ascii_lowercase();
    CommandName::ALL.into_iter().find(|name| {
        let name = name.name();
        if input.len() >= 2 && name.starts_with(&input) {
            return true;
        }
        name.len() == input.len()
            && name.chars().zip(input.chars()).filter(|(a, b)| a != b).count() == 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(Command::parse("fetch"), Ok(Command::Fetch));
        assert_eq!(Command::parse("  DECODE  "), Ok(Command::Decode));
        assert_eq!(Command::parse("q"), Ok(Command::Quit));
        assert_eq!(Command::parse("regs"), Ok(Command::Registers));
    }

    #[test]
    fn arguments() {
        assert_eq!(Command::parse("cycle"), Ok(Command::Cycle { count: 1 }));
        assert_eq!(Command::parse("cycle 12"), Ok(Command::Cycle { count: 12 }));
        assert_eq!(
            Command::parse("memory $1F 4"),
            Ok(Command::Memory {
                address: 0x1F,
                count: 4
            })
        );
        assert_eq!(
            Command::parse("set gpa 0x00ff"),
            Ok(Command::Set {
                register: Register::Gpa,
                value: Word::from(0xFFu16)
            })
        );
        assert_eq!(
            Command::parse("poke 10 beef"),
            Ok(Command::Poke {
                address: 0x10,
                value: Word::from(0xBEEFu16)
            })
        );
        assert_eq!(
            Command::parse("circuit /"),
            Ok(Command::Circuit {
                circuit: Circuit::Div
            })
        );
        assert_eq!(
            Command::parse("instruction ff"),
            Ok(Command::Instruction { id: 0xFF })
        );
    }

    #[test]
    fn argument_errors() {
        assert_eq!(
            Command::parse("memory"),
            Err(CommandError::MissingArgument {
                command_name: CommandName::Memory,
                argument_name: "address"
            })
        );
        assert_eq!(
            Command::parse("memory 100"),
            Err(CommandError::InvalidValue {
                command_name: CommandName::Memory,
                argument_name: "address",
                value: "100".to_string()
            })
        );
        assert_eq!(
            Command::parse("fetch now"),
            Err(CommandError::TooManyArguments {
                command_name: CommandName::Fetch,
                expected_count: 0,
                actual_count: 1
            })
        );
        assert!(Command::parse("cycle 0").is_err());
        assert!(Command::parse("set pc").is_err());
        assert!(Command::parse("set sp 1").is_err());
        assert!(Command::parse("circuit mod").is_err());
    }

    #[test]
    fn unknown_command_suggests() {
        let err = Command::parse("fetcj").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not a command: `fetcj`. Did you mean `fetch`?"
        );
        let err = Command::parse("dance").unwrap_err();
        assert_eq!(err.to_string(), "Not a command: `dance`");
    }
}
