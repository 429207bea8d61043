mod command;
pub mod print;
mod source;

pub use command::{Command, CommandError, CommandName};
pub use source::{SourceMode, SourceReader};

use crate::engine::{CancelToken, Engine, RunOutcome};
use crate::error::EngineError;
use crate::register::Register;

const HELP: &str = include_str!("help.txt");

/// Command loop driving one engine.
pub struct Session {
    engine: Engine,
    reader: SourceMode,
    /// `run` stops after this many cycles.
    limit: Option<usize>,
    cancel: CancelToken,
}

impl Session {
    pub fn new(engine: Engine, reader: SourceMode) -> Self {
        Session {
            engine,
            reader,
            limit: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Handle commands until `quit` or the end of input.
    pub fn run(&mut self) {
        let echo = !self.reader.is_interactive();
        loop {
            let Some(line) = self.reader.read() else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let command = Command::parse(line);
            if echo {
                let echoed = format!("> {}", line);
                self.engine.console().plain(&echoed);
            }

            match command {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    if let Err(error) = self.execute(command) {
                        self.engine.console().error(&error.to_string());
                    }
                }
                Err(error) => self.engine.console().error(&error.to_string()),
            }
        }
    }

    fn plain_lines(&mut self, lines: Vec<String>) {
        for line in lines {
            self.engine.console().plain(&line);
        }
    }

    fn execute(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Help => {
                for line in HELP.lines() {
                    self.engine.console().plain(line);
                }
            }

            Command::Fetch => {
                self.engine.fetch()?;
                let registers = self.engine.registers();
                let message = format!(
                    "Fetched {} from 0x{:02x}",
                    registers.read(Register::Mdr),
                    registers.read(Register::Mar).unsigned()
                );
                self.engine.console().info(&message);
            }
            Command::Decode => {
                self.engine.decode()?;
                let message = match self.engine.current_instruction() {
                    Some(instr) => format!("Decoded {}", print::instruction(instr)),
                    None => "Nothing decoded".to_string(),
                };
                self.engine.console().info(&message);
            }
            Command::Execute => {
                self.engine.execute()?;
            }

            Command::Cycle { count } => {
                for _ in 0..count {
                    if self.engine.is_halted() {
                        self.engine.console().warn("Program has halted");
                        break;
                    }
                    self.engine.cycle()?;
                }
                let message = print::status(&self.engine);
                self.engine.console().info(&message);
            }
            Command::Run => {
                let outcome = match self.limit {
                    Some(limit) => self.engine.run_bounded(limit, &self.cancel)?,
                    None => self.engine.run(&self.cancel)?,
                };
                self.report_outcome(outcome);
            }
            Command::Reset => {
                self.engine.reset()?;
                self.engine.console().info("Reset");
            }

            Command::Registers => {
                let lines = print::registers(&self.engine);
                self.plain_lines(lines);
            }
            Command::Flags => {
                let line = print::flags(&self.engine);
                self.engine.console().plain(&line);
            }
            Command::Memory { address, count } => {
                let lines = print::memory(&self.engine, address, count);
                self.plain_lines(lines);
            }

            Command::Set { register, value } => {
                self.engine.set_register(register, value)?;
            }
            Command::Poke { address, value } => {
                self.engine.poke(address as u16, value)?;
            }
            Command::Circuit { circuit } => {
                self.engine.operate(circuit)?;
                let message = format!(
                    "GPA <- GPA {} GPB = {}",
                    circuit.symbol(),
                    self.engine.registers().read(Register::Gpa)
                );
                self.engine.console().info(&message);
            }
            Command::Instruction { id } => {
                self.engine.set_current_instruction(id)?;
                let message = match self.engine.current_instruction() {
                    Some(instr) => format!("Current instruction is {}", print::instruction(instr)),
                    None => "No current instruction".to_string(),
                };
                self.engine.console().info(&message);
            }

            Command::Quit => (),
        }
        Ok(())
    }

    fn report_outcome(&mut self, outcome: RunOutcome) {
        let console = self.engine.console();
        match outcome {
            RunOutcome::Halted { cycles } => {
                console.info(&format!("Halted after {} cycles", cycles))
            }
            RunOutcome::Cancelled { cycles } => {
                console.warn(&format!("Cancelled after {} cycles", cycles))
            }
            RunOutcome::LimitReached { cycles } => {
                console.warn(&format!("Stopped after reaching the limit of {} cycles", cycles))
            }
        }
    }
}
