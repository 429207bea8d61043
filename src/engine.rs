use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

use crate::alu::{Alu, Circuit};
use crate::error::EngineError;
use crate::isa::{Instruction, InstructionSet, Operation, HALT_OPCODE, ORG_OPCODE};
use crate::memory::Memory;
use crate::micro::{self, MicroOp, Source};
use crate::output::{Console, Level};
use crate::psr::Psr;
use crate::register::{Register, RegisterFile};
use crate::word::Word;

/// Stage of the cycle in flight, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    Decoding,
    Executing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Fetching => write!(f, "Fetching"),
            Self::Decoding => write!(f, "Decoding"),
            Self::Executing => write!(f, "Executing"),
        }
    }
}

/// Why a run stopped without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Halted { cycles: usize },
    Cancelled { cycles: usize },
    LimitReached { cycles: usize },
}

/// Cancels a run between logical instructions.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Complete CPU state, copied at the start of every logical cycle.
#[derive(Clone, Default)]
struct Cpu {
    memory: Memory,
    registers: RegisterFile,
    alu: Alu,
    psr: Psr,
    current: Option<Instruction>,
}

/// Fetch/decode/execute state machine driving micro-instructions against the CPU.
pub struct Engine {
    cpu: Cpu,
    isa: InstructionSet,
    console: Box<dyn Console>,
    phase: Phase,
    queue: VecDeque<MicroOp>,
    /// State to restore if the cycle in flight fails.
    snapshot: Option<Cpu>,
}

impl Engine {
    pub fn new(isa: InstructionSet, console: Box<dyn Console>) -> Self {
        Engine {
            cpu: Cpu::default(),
            isa,
            console,
            phase: Phase::Idle,
            queue: VecDeque::new(),
            snapshot: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.cpu.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.cpu.memory
    }

    pub fn alu(&self) -> &Alu {
        &self.cpu.alu
    }

    pub fn psr(&self) -> &Psr {
        &self.cpu.psr
    }

    pub fn isa(&self) -> &InstructionSet {
        &self.isa
    }

    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.cpu.current.as_ref()
    }

    pub fn is_halted(&self) -> bool {
        self.cpu
            .current
            .as_ref()
            .is_some_and(|instr| instr.id == HALT_OPCODE)
    }

    pub fn console(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.phase != Phase::Idle {
            return Err(EngineError::Busy);
        }
        Ok(())
    }

    /// Zero memory, registers, ALU and PSR. Refused while a cycle is in flight.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.cpu = Cpu::default();
        self.queue.clear();
        self.snapshot = None;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Reset, then write an image (`ORG` word first) at its origin and point PC at it.
    ///
    /// Nothing changes if the image does not fit.
    pub fn load(&mut self, data: &[Word]) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let (org, image) = data.split_first().ok_or(EngineError::MissingOrigin)?;
        if org.high_byte() != ORG_OPCODE {
            return Err(EngineError::MissingOrigin);
        }
        let origin = org.low_byte() as u16;

        let mut cpu = Cpu::default();
        cpu.memory.load(origin, image)?;
        cpu.registers.write(Register::Pc, Word::from(origin));
        self.cpu = cpu;
        self.console.info(&format!(
            "Loaded {} words at 0x{:02x}",
            image.len(),
            origin
        ));
        Ok(())
    }

    pub fn set_register(&mut self, reg: Register, word: Word) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.cpu.registers.write(reg, word);
        Ok(())
    }

    pub fn poke(&mut self, address: u16, word: Word) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.cpu.memory.write(address, word)?;
        Ok(())
    }

    /// Make `id` the current instruction, as if it had just been decoded.
    pub fn set_current_instruction(&mut self, id: u8) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let instr = self
            .isa
            .lookup(id)
            .ok_or(EngineError::InvalidInstruction { opcode: id })?;
        self.cpu.current = Some(instr.clone());
        Ok(())
    }

    fn begin(&mut self, phase: Phase, ops: Vec<MicroOp>) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.snapshot = Some(self.cpu.clone());
        self.queue = ops.into();
        self.phase = phase;
        self.console.log(Level::Phase, &phase.to_string());
        Ok(())
    }

    pub fn begin_fetch(&mut self) -> Result<(), EngineError> {
        self.begin(Phase::Fetching, micro::fetch())
    }

    pub fn begin_decode(&mut self) -> Result<(), EngineError> {
        self.begin(Phase::Decoding, micro::decode())
    }

    /// Returns `false` without starting a cycle when nothing has been decoded.
    pub fn begin_execute(&mut self) -> Result<bool, EngineError> {
        self.ensure_idle()?;
        let Some(current) = &self.cpu.current else {
            self.console.warn("Nothing has been decoded, there is nothing to execute");
            return Ok(false);
        };
        let op = Operation::decode(current.id)
            .ok_or(EngineError::InvalidInstruction { opcode: current.id })?;
        self.begin(Phase::Executing, micro::execute(op))?;
        Ok(true)
    }

    /// Run a single micro-instruction. Returns whether the cycle is still in flight.
    ///
    /// On failure the whole cycle is rolled back.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        let Some(op) = self.queue.pop_front() else {
            self.finish();
            return Ok(false);
        };
        self.console.trace(&op.to_string());
        match self.apply(op) {
            Ok(true) => (),
            Ok(false) => self.queue.clear(),
            Err(e) => {
                if let Some(snapshot) = self.snapshot.take() {
                    self.cpu = snapshot;
                }
                let message = format!(
                    "`{}` failed, rolled back to before {}",
                    op,
                    self.phase.to_string().to_lowercase()
                );
                self.console.warn(&message);
                self.queue.clear();
                self.phase = Phase::Idle;
                return Err(e);
            }
        }
        if self.queue.is_empty() {
            self.finish();
            return Ok(false);
        }
        Ok(true)
    }

    fn finish(&mut self) {
        self.snapshot = None;
        self.phase = Phase::Idle;
    }

    fn run_cycle(&mut self) -> Result<(), EngineError> {
        while self.step()? {}
        Ok(())
    }

    pub fn fetch(&mut self) -> Result<(), EngineError> {
        self.begin_fetch()?;
        self.run_cycle()
    }

    pub fn decode(&mut self) -> Result<(), EngineError> {
        self.begin_decode()?;
        self.run_cycle()
    }

    pub fn execute(&mut self) -> Result<(), EngineError> {
        if self.begin_execute()? {
            self.run_cycle()?;
        }
        Ok(())
    }

    /// Fetch, decode and execute one instruction.
    pub fn cycle(&mut self) -> Result<(), EngineError> {
        self.fetch()?;
        self.decode()?;
        self.execute()
    }

    /// `GPA <- GPA op GPB` through the ALU, for circuits no instruction selects.
    pub fn operate(&mut self, circuit: Circuit) -> Result<(), EngineError> {
        self.begin(Phase::Executing, micro::operate(circuit))?;
        self.run_cycle()
    }

    /// Cycle until `HALT` is the current instruction or `cancel` fires.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<RunOutcome, EngineError> {
        self.run_bounded(usize::MAX, cancel)
    }

    /// As [`Engine::run`], stopping after `limit` cycles.
    pub fn run_bounded(
        &mut self,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<RunOutcome, EngineError> {
        self.ensure_idle()?;
        let mut cycles = 0;
        while !self.is_halted() {
            if cancel.is_cancelled() {
                return Ok(RunOutcome::Cancelled { cycles });
            }
            if cycles >= limit {
                return Ok(RunOutcome::LimitReached { cycles });
            }
            self.cycle()?;
            cycles += 1;
        }
        Ok(RunOutcome::Halted { cycles })
    }

    fn read(&self, src: Source) -> Word {
        match src {
            Source::Reg(reg) => self.cpu.registers.read(reg),
            Source::Operand => Word::from(self.cpu.registers.operand() as u16),
        }
    }

    /// Returns `false` when a guard fails and the rest of the cycle must be skipped.
    fn apply(&mut self, op: MicroOp) -> Result<bool, EngineError> {
        let cpu = &mut self.cpu;
        match op {
            MicroOp::Transfer { from, to } => {
                let word = self.read(from);
                self.cpu.registers.write(to, word);
            }
            MicroOp::IncrementPc => cpu.registers.increment_pc(),
            MicroOp::SelectAddress => {
                let mar = cpu.registers.read(Register::Mar);
                cpu.memory.set_pointer(mar.unsigned())?;
            }
            MicroOp::ReadMemory => {
                let word = cpu.memory.read_at_pointer();
                cpu.registers.write(Register::Mdr, word);
            }
            MicroOp::WriteMemory => {
                let word = cpu.registers.read(Register::Mdr);
                cpu.memory.write_at_pointer(word);
            }
            MicroOp::Lookup => {
                let opcode = cpu.registers.opcode();
                let instr = self
                    .isa
                    .lookup(opcode)
                    .ok_or(EngineError::InvalidInstruction { opcode })?;
                self.cpu.current = Some(instr.clone());
            }
            MicroOp::SetCircuit(circuit) => cpu.alu.set_circuit(circuit),
            MicroOp::AluX(src) => {
                let word = self.read(src);
                self.cpu.alu.write_x(word);
            }
            MicroOp::AluY(src) => {
                let word = self.read(src);
                self.cpu.alu.write_y(word);
            }
            MicroOp::Compute => {
                // Dividing by zero is the only way the ALU fails
                cpu.alu
                    .compute_z(&mut cpu.psr)
                    .map_err(|_| EngineError::DivisionByZero)?;
            }
            MicroOp::StoreZ(reg) => {
                let z = cpu.alu.read_z();
                cpu.registers.write(reg, z);
            }
            MicroOp::Guard { flag, when } => return Ok(cpu.psr.get_flag(flag) == when),
        }
        Ok(true)
    }
}

/// Engine shared between threads. A caller finding it locked gets [`EngineError::Busy`]
/// instead of waiting.
#[derive(Clone)]
pub struct SharedEngine(Arc<Mutex<Engine>>);

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        SharedEngine(Arc::new(Mutex::new(engine)))
    }

    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut Engine) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut engine = match self.0.try_lock() {
            Ok(engine) => engine,
            Err(TryLockError::WouldBlock) => return Err(EngineError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        f(&mut engine)
    }
}
