use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, Report, Severity};

use crate::memory::{MemoryError, MEMORY_SIZE};
use crate::span::Span;

// Assembler errors

/// Everything that can be wrong with a single source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmErrorKind {
    MainAfterSubroutine,
    DuplicateSubroutine,
    InvalidLabel { label: String },
    AddressTooLarge,
    UndefinedLabel { label: String },
    OrgNotFirst,
    OrgRedeclared,
    MissingOrg,
    HaltNotLast { last: usize },
    ParameterCount { expected: usize },
    IdenticalParameters,
    InvalidNumber,
    InvalidOperand { operand: String },
    UnknownCommand,
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainAfterSubroutine => write!(f, "Main code must occur before subroutines"),
            Self::DuplicateSubroutine => write!(f, "Subroutine already declared"),
            Self::InvalidLabel { label } => {
                write!(f, "Label '{}' must begin with '_'", label)
            }
            Self::AddressTooLarge => write!(f, "Address given exceeds memory size"),
            Self::UndefinedLabel { label } => write!(f, "Label '{}' is not defined", label),
            Self::OrgNotFirst => write!(f, "ORG can only occur on line 1"),
            Self::OrgRedeclared => write!(f, "ORG already declared"),
            Self::MissingOrg => write!(f, "Program must begin with ORG"),
            Self::HaltNotLast { last } => write!(f, "HALT can only occur on line {}", last),
            Self::ParameterCount { expected } => {
                write!(f, "Must only have {} parameters", expected)
            }
            Self::IdenticalParameters => write!(f, "Parameters must not be identical"),
            Self::InvalidNumber => write!(f, "Unrecognised number format"),
            Self::InvalidOperand { operand } => write!(f, "Invalid operand '{}'", operand),
            Self::UnknownCommand => write!(f, "Unrecognised command"),
        }
    }
}

impl AsmErrorKind {
    fn help(&self) -> &'static str {
        match self {
            Self::MainAfterSubroutine => "the first line of a program cannot carry a label",
            Self::DuplicateSubroutine => "the first subroutine with this label is kept",
            Self::InvalidLabel { .. } => "labels look like `_loop`",
            Self::AddressTooLarge => "addresses range from $00 to $FF",
            Self::UndefinedLabel { .. } => "declare a subroutine with this label",
            Self::OrgNotFirst | Self::MissingOrg => "start the program with `ORG $00`",
            Self::OrgRedeclared => "a program has a single origin",
            Self::HaltNotLast { .. } => "HALT must be the last line of the program",
            Self::ParameterCount { .. } => "check the operands for this instruction",
            Self::IdenticalParameters => "source and destination must differ",
            Self::InvalidNumber => "numbers look like `$0A` (hex) or `^10` (decimal)",
            Self::InvalidOperand { .. } => "registers are `A` and `B`",
            Self::UnknownCommand => "check the list of available instructions with `mcpu isa`",
        }
    }
}

/// Error located on a source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsmError {
    pub line: usize,
    pub span: Span,
    pub kind: AsmErrorKind,
}

impl AsmError {
    pub fn new(line: usize, span: Span, kind: AsmErrorKind) -> Self {
        AsmError { line, span, kind }
    }
}

impl Error for AsmError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.kind)
    }
}

pub fn asm_diagnostic(error: &AsmError, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::line",
        help = error.kind.help(),
        labels = vec![LabeledSpan::at(error.span, error.kind.to_string())],
        "{}",
        error,
    )
    .with_source_code(src.to_string())
}

pub fn asm_failed(count: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::failed",
        help = "fix the errors above and try again",
        "Assembly failed with {} error{}",
        count,
        if count == 1 { "" } else { "s" },
    )
}

// Engine errors

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Another cycle is in flight, try again later.
    Busy,
    InvalidInstruction { opcode: u8 },
    AddressOutOfRange { address: u16 },
    DivisionByZero,
    ProgramTooLarge { origin: u16, len: usize },
    /// Image does not start with an `ORG` word.
    MissingOrigin,
}

impl Error for EngineError {}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "Engine is busy with another cycle"),
            Self::InvalidInstruction { opcode } => {
                write!(f, "No instruction has opcode 0x{:02x}", opcode)
            }
            Self::AddressOutOfRange { address } => write!(
                f,
                "Address 0x{:04x} exceeds memory size of {} slots",
                address, MEMORY_SIZE
            ),
            Self::DivisionByZero => write!(f, "Attempted to divide by zero"),
            Self::ProgramTooLarge { origin, len } => write!(
                f,
                "Not enough room in memory to load {} words at 0x{:02x}",
                len, origin
            ),
            Self::MissingOrigin => write!(f, "Program image must begin with an ORG word"),
        }
    }
}

impl From<MemoryError> for EngineError {
    fn from(value: MemoryError) -> Self {
        match value {
            MemoryError::AddressOutOfRange { address } => Self::AddressOutOfRange { address },
            MemoryError::ProgramTooLarge { origin, len } => Self::ProgramTooLarge { origin, len },
        }
    }
}

pub fn runtime_error(error: &EngineError) -> Report {
    let help = match error {
        EngineError::Busy => "wait for the current cycle to finish",
        EngineError::InvalidInstruction { .. } => "list the instruction set with `mcpu isa`",
        EngineError::AddressOutOfRange { .. } => "addresses range from $00 to $FF",
        EngineError::DivisionByZero => "the divisor register holds zero",
        EngineError::ProgramTooLarge { .. } => "move the origin lower or shorten the program",
        EngineError::MissingOrigin => "assemble the program again",
    };
    miette!(
        severity = Severity::Error,
        code = "engine::cycle",
        help = help,
        "{}",
        error,
    )
}
