use std::fmt;

use crate::alu::Circuit;
use crate::isa::{Mode, Operation, Target};
use crate::psr::Flag;
use crate::register::Register;

/// Where a transferred value is taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Reg(Register),
    /// Low byte of IR.
    Operand,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reg(reg) => write!(f, "{}", reg),
            Self::Operand => write!(f, "IR.operand"),
        }
    }
}

/// One atomic transfer between registers, memory and the ALU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MicroOp {
    Transfer { from: Source, to: Register },
    IncrementPc,
    /// Memory pointer <- MAR
    SelectAddress,
    /// MDR <- memory at pointer
    ReadMemory,
    /// Memory at pointer <- MDR
    WriteMemory,
    /// Current instruction <- table entry for IR opcode
    Lookup,
    SetCircuit(Circuit),
    AluX(Source),
    AluY(Source),
    Compute,
    StoreZ(Register),
    /// Skip the rest of the cycle unless `flag` is in state `when`.
    Guard { flag: Flag, when: bool },
}

impl fmt::Display for MicroOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer { from, to } => write!(f, "{} <- {}", to, from),
            Self::IncrementPc => write!(f, "PC <- PC + 1"),
            Self::SelectAddress => write!(f, "POINTER <- MAR"),
            Self::ReadMemory => write!(f, "MDR <- MEMORY[POINTER]"),
            Self::WriteMemory => write!(f, "MEMORY[POINTER] <- MDR"),
            Self::Lookup => write!(f, "CURRENT <- ISA[IR.opcode]"),
            Self::SetCircuit(circuit) => write!(f, "ALU circuit <- {}", circuit),
            Self::AluX(src) => write!(f, "ALU.x <- {}", src),
            Self::AluY(src) => write!(f, "ALU.y <- {}", src),
            Self::Compute => write!(f, "ALU.z <- ALU.x op ALU.y"),
            Self::StoreZ(reg) => write!(f, "{} <- ALU.z", reg),
            Self::Guard { flag, when } => write!(f, "continue if {} == {}", flag, *when as u8),
        }
    }
}

use MicroOp::*;

fn reg(reg: Register) -> Source {
    Source::Reg(reg)
}

/// `MAR <- PC; PC <- PC+1; pointer <- MAR; MDR <- mem`. PC is captured before incrementing.
pub fn fetch() -> Vec<MicroOp> {
    vec![
        Transfer {
            from: reg(Register::Pc),
            to: Register::Mar,
        },
        IncrementPc,
        SelectAddress,
        ReadMemory,
    ]
}

pub fn decode() -> Vec<MicroOp> {
    vec![
        Transfer {
            from: reg(Register::Mdr),
            to: Register::Ir,
        },
        Lookup,
    ]
}

/// Read the word at the address held in the IR operand into MDR.
fn read_operand_address() -> [MicroOp; 3] {
    [
        Transfer {
            from: Source::Operand,
            to: Register::Mar,
        },
        SelectAddress,
        ReadMemory,
    ]
}

pub fn execute(op: Operation) -> Vec<MicroOp> {
    match op {
        Operation::Compute {
            circuit,
            mode,
            dest,
        } => {
            let mut ops = vec![SetCircuit(circuit)];
            ops.extend(compute(mode, dest.register(), dest.other().register()));
            ops.push(StoreZ(dest.register()));
            ops
        }
        Operation::Compare { mode, dest } => {
            let mut ops = vec![SetCircuit(Circuit::Sub)];
            ops.extend(compute(mode, dest.register(), dest.other().register()));
            ops
        }
        Operation::Load { mode, dest } => match mode {
            Mode::Immediate => vec![Transfer {
                from: Source::Operand,
                to: dest.register(),
            }],
            Mode::Direct => {
                let mut ops = read_operand_address().to_vec();
                ops.push(Transfer {
                    from: reg(Register::Mdr),
                    to: dest.register(),
                });
                ops
            }
            Mode::Register => vec![Transfer {
                from: reg(dest.other().register()),
                to: dest.register(),
            }],
        },
        Operation::Store { indirect, src } => {
            let mut ops = vec![Transfer {
                from: Source::Operand,
                to: Register::Mar,
            }];
            if indirect {
                ops.extend([
                    SelectAddress,
                    ReadMemory,
                    Transfer {
                        from: reg(Register::Mdr),
                        to: Register::Mar,
                    },
                ]);
            }
            ops.extend([
                Transfer {
                    from: reg(src.register()),
                    to: Register::Mdr,
                },
                SelectAddress,
                WriteMemory,
            ]);
            ops
        }
        Operation::Jump { target } => jump(target),
        Operation::Branch { flag, when, target } => {
            let mut ops = vec![Guard { flag, when }];
            ops.extend(jump(target));
            ops
        }
        Operation::Halt => Vec::new(),
    }
}

/// Load ALU X and Y for `dest <- dest op value`, without the final store.
fn compute(mode: Mode, dest: Register, other: Register) -> Vec<MicroOp> {
    let mut ops = Vec::with_capacity(7);
    match mode {
        Mode::Immediate => {
            ops.push(AluX(reg(dest)));
            ops.push(AluY(Source::Operand));
        }
        Mode::Direct => {
            ops.extend(read_operand_address());
            ops.push(AluY(reg(Register::Mdr)));
            ops.push(AluX(reg(dest)));
        }
        Mode::Register => {
            ops.push(AluX(reg(dest)));
            ops.push(AluY(reg(other)));
        }
    }
    ops.push(Compute);
    ops
}

fn jump(target: Target) -> Vec<MicroOp> {
    match target {
        Target::Immediate => vec![Transfer {
            from: Source::Operand,
            to: Register::Pc,
        }],
        Target::Direct => {
            let mut ops = read_operand_address().to_vec();
            ops.push(Transfer {
                from: reg(Register::Mdr),
                to: Register::Pc,
            });
            ops
        }
    }
}

/// `GPA <- GPA op GPB` with any circuit, including those no instruction selects.
pub fn operate(circuit: Circuit) -> Vec<MicroOp> {
    vec![
        SetCircuit(circuit),
        AluX(reg(Register::Gpa)),
        AluY(reg(Register::Gpb)),
        Compute,
        StoreZ(Register::Gpa),
    ]
}
