// Machine state
mod word;
pub use word::{Word, WordError};
mod memory;
pub use memory::{Memory, MemoryError, MEMORY_SIZE};
mod register;
pub use register::{Register, RegisterFile};
mod psr;
pub use psr::{Flag, Psr};
mod alu;
pub use alu::{Alu, Circuit};
mod isa;
pub use isa::{Instruction, InstructionSet, IsaError, HALT_OPCODE};

// Assembling
mod span;
mod air;
mod parser;
mod symbol;
mod encoder;
mod assembler;
pub use assembler::{Assembler, Assembly};
mod program;
pub use program::Program;

// Running
mod micro;
pub use micro::MicroOp;
mod engine;
pub use engine::{CancelToken, Engine, Phase, RunOutcome, SharedEngine};
pub mod console;

mod error;
pub use error::{asm_diagnostic, asm_failed, runtime_error, AsmError, AsmErrorKind, EngineError};

pub mod env;
pub mod output;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
