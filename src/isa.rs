use std::{error::Error, fmt, fs, io, path::Path};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::alu::Circuit;
use crate::psr::Flag;
use crate::register::Register;

/// Opcode of the `HALT` instruction, which stops a run.
pub const HALT_OPCODE: u8 = 0xFF;
/// Opcode byte of the `ORG` directive word. Never loaded into memory.
pub const ORG_OPCODE: u8 = 0x00;

const DEFAULT_INSTRUCTION_SET: &str = include_str!("instruction_set.json");

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// One entry of the instruction-set table.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Instruction {
    pub id: u8,
    pub mnemonic: String,
    pub description: String,
}

#[derive(Deserialize)]
struct InstructionSetFile {
    instructions: Vec<Instruction>,
}

#[derive(Debug)]
pub enum IsaError {
    Io(io::Error),
    Json(serde_json::Error),
    DuplicateId { id: u8 },
}

impl Error for IsaError {}

impl fmt::Display for IsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Could not read instruction set: {}", e),
            Self::Json(e) => write!(f, "Malformed instruction set: {}", e),
            Self::DuplicateId { id } => {
                write!(f, "Instruction id 0x{:02x} is declared more than once", id)
            }
        }
    }
}

/// Read-only lookup of opcode -> instruction, loaded once before execution.
#[derive(Clone, Debug)]
pub struct InstructionSet {
    table: FxMap<u8, Instruction>,
}

impl InstructionSet {
    pub fn from_json(json: &str) -> Result<Self, IsaError> {
        let file: InstructionSetFile = serde_json::from_str(json).map_err(IsaError::Json)?;
        let mut table = FxMap::with_capacity_and_hasher(file.instructions.len(), Default::default());
        for instr in file.instructions {
            let id = instr.id;
            if table.insert(id, instr).is_some() {
                return Err(IsaError::DuplicateId { id });
            }
        }
        Ok(InstructionSet { table })
    }

    pub fn load(path: &Path) -> Result<Self, IsaError> {
        let json = fs::read_to_string(path).map_err(IsaError::Io)?;
        Self::from_json(&json)
    }

    pub fn lookup(&self, opcode: u8) -> Option<&Instruction> {
        self.table.get(&opcode)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.table.values()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::from_json(DEFAULT_INSTRUCTION_SET).expect("embedded instruction set should be valid")
    }
}

/// General purpose register named by an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Gp {
    A,
    B,
}

impl Gp {
    pub fn register(self) -> Register {
        match self {
            Gp::A => Register::Gpa,
            Gp::B => Register::Gpb,
        }
    }

    pub fn other(self) -> Gp {
        match self {
            Gp::A => Gp::B,
            Gp::B => Gp::A,
        }
    }

    fn index(self) -> u8 {
        self as u8
    }
}

/// How the operand byte of a register-targeting instruction is interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Operand is the value itself.
    Immediate,
    /// Operand is the address of the value.
    Direct,
    /// The value comes from the other general purpose register, operand unused.
    Register,
}

impl Mode {
    fn index(self) -> u8 {
        match self {
            Mode::Immediate => 0,
            Mode::Direct => 1,
            Mode::Register => 2,
        }
    }
}

/// How the operand byte of a jump or branch names its target.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Target {
    /// Operand is the target address.
    Immediate,
    /// Operand is the address holding the target address.
    Direct,
}

/// Decoded meaning of an opcode byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operation {
    /// `dest <- dest (+|-) value`
    Compute { circuit: Circuit, mode: Mode, dest: Gp },
    /// Subtraction which only updates flags.
    Compare { mode: Mode, dest: Gp },
    /// Move a value into a register.
    Load { mode: Mode, dest: Gp },
    /// Move a register into memory.
    Store { indirect: bool, src: Gp },
    Jump { target: Target },
    /// Jump only if `flag` equals `when`.
    Branch { flag: Flag, when: bool, target: Target },
    Halt,
}

const ADD_BASE: u8 = 0x00;
const SUB_BASE: u8 = 0x06;
const CMP_BASE: u8 = 0x0C;
const LOAD_BASE: u8 = 0x12;
const STORE_BASE: u8 = 0x18;
const JUMP_BASE: u8 = 0x1C;
const BRANCH_BASE: u8 = 0x1E;
/// Branch opcodes are grouped per flag in this order.
const BRANCH_FLAGS: [Flag; 4] = [Flag::Carry, Flag::Negative, Flag::Zero, Flag::Overflow];

impl Operation {
    pub fn opcode(self) -> u8 {
        let group = |base: u8, mode: Mode, reg: Gp| base + mode.index() * 2 + reg.index();
        match self {
            Operation::Compute {
                circuit: Circuit::Sub,
                mode,
                dest,
            } => group(SUB_BASE, mode, dest),
            // Only addition and subtraction have opcodes
            Operation::Compute { mode, dest, .. } => group(ADD_BASE, mode, dest),
            Operation::Compare { mode, dest } => group(CMP_BASE, mode, dest),
            Operation::Load { mode, dest } => group(LOAD_BASE, mode, dest),
            Operation::Store { indirect, src } => STORE_BASE + indirect as u8 * 2 + src.index(),
            Operation::Jump { target } => JUMP_BASE + target as u8,
            Operation::Branch { flag, when, target } => {
                let flag_index = BRANCH_FLAGS
                    .iter()
                    .position(|f| *f == flag)
                    .expect("every flag has branch opcodes") as u8;
                BRANCH_BASE + flag_index * 4 + (!when) as u8 * 2 + target as u8
            }
            Operation::Halt => HALT_OPCODE,
        }
    }

    pub fn decode(opcode: u8) -> Option<Operation> {
        let gp = |bit: u8| if bit == 0 { Gp::A } else { Gp::B };
        let mode = |n: u8| match n {
            0 => Mode::Immediate,
            1 => Mode::Direct,
            _ => Mode::Register,
        };
        let target = |bit: u8| {
            if bit == 0 {
                Target::Immediate
            } else {
                Target::Direct
            }
        };
        let op = match opcode {
            0x00..=0x05 => Operation::Compute {
                circuit: Circuit::Add,
                mode: mode(opcode / 2),
                dest: gp(opcode % 2),
            },
            0x06..=0x0B => Operation::Compute {
                circuit: Circuit::Sub,
                mode: mode((opcode - SUB_BASE) / 2),
                dest: gp(opcode % 2),
            },
            0x0C..=0x11 => Operation::Compare {
                mode: mode((opcode - CMP_BASE) / 2),
                dest: gp(opcode % 2),
            },
            0x12..=0x17 => Operation::Load {
                mode: mode((opcode - LOAD_BASE) / 2),
                dest: gp(opcode % 2),
            },
            0x18..=0x1B => Operation::Store {
                indirect: opcode >= 0x1A,
                src: gp(opcode % 2),
            },
            0x1C..=0x1D => Operation::Jump {
                target: target(opcode - JUMP_BASE),
            },
            0x1E..=0x2D => {
                let offs = opcode - BRANCH_BASE;
                Operation::Branch {
                    flag: BRANCH_FLAGS[(offs / 4) as usize],
                    when: offs % 4 < 2,
                    target: target(offs % 2),
                }
            }
            HALT_OPCODE => Operation::Halt,
            _ => return None,
        };
        Some(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_entry_decodes() {
        let isa = InstructionSet::default();
        assert_eq!(isa.len(), 47);
        for instr in isa.iter() {
            let op = Operation::decode(instr.id)
                .unwrap_or_else(|| panic!("no operation for 0x{:02x}", instr.id));
            assert_eq!(op.opcode(), instr.id, "{}", instr.mnemonic);
        }
        assert!(isa.lookup(0x2E).is_none());
        assert_eq!(isa.lookup(HALT_OPCODE).unwrap().mnemonic, "HALT");
    }

    #[test]
    fn opcode_layout() {
        assert_eq!(
            Operation::Compute {
                circuit: Circuit::Add,
                mode: Mode::Register,
                dest: Gp::A
            }
            .opcode(),
            0x04
        );
        assert_eq!(
            Operation::Compare {
                mode: Mode::Direct,
                dest: Gp::B
            }
            .opcode(),
            0x0F
        );
        assert_eq!(
            Operation::Store {
                indirect: true,
                src: Gp::B
            }
            .opcode(),
            0x1B
        );
        assert_eq!(
            Operation::Branch {
                flag: Flag::Zero,
                when: false,
                target: Target::Immediate
            }
            .opcode(),
            0x28
        );
        assert_eq!(
            Operation::Branch {
                flag: Flag::Overflow,
                when: false,
                target: Target::Direct
            }
            .opcode(),
            0x2D
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"{"instructions": [
            {"id": 1, "mnemonic": "X", "description": ""},
            {"id": 1, "mnemonic": "Y", "description": ""}
        ]}"#;
        assert!(matches!(
            InstructionSet::from_json(json),
            Err(IsaError::DuplicateId { id: 1 })
        ));
        assert!(matches!(
            InstructionSet::from_json("{"),
            Err(IsaError::Json(_))
        ));
    }
}
