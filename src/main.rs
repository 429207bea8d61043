use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result};

use mcpu::console::{print, Session, SourceMode};
use mcpu::output::{Silent, Terminal, TraceLevel};
use mcpu::{asm_diagnostic, asm_failed, runtime_error};
use mcpu::{CancelToken, Engine, InstructionSet, Program, RunOutcome};

/// mcpu assembles and runs programs for a small 16-bit teaching CPU, one micro-instruction at a time.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run text `.asm` or assembled `.hex` file until it halts
    Run {
        /// `.asm` or `.hex` file to run
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Instruction set to decode with, as JSON
        #[arg(long)]
        isa: Option<PathBuf>,
        /// Stop after this many instruction cycles
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Load a file and drive the CPU with console commands
    Console {
        /// `.asm` or `.hex` file to load
        name: PathBuf,
        /// Read console commands from argument
        #[arg(short, long)]
        command: Option<String>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Instruction set to decode with, as JSON
        #[arg(long)]
        isa: Option<PathBuf>,
        /// Stop `run` after this many instruction cycles
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Create `.hex` file to run later or view assembled words
    Assemble {
        /// `.asm` file to assemble
        name: PathBuf,
        /// Destination to output .hex file
        dest: Option<PathBuf>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check a `.asm` file without running or outputting words
    Check {
        /// File to check
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// List every instruction of the instruction set
    Isa {
        /// Instruction set to list instead of the built-in one
        #[arg(long)]
        isa: Option<PathBuf>,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    mcpu::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(mcpu::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, &RunOptions::default());
        }
        println!("\n~ mcpu v{VERSION} ~");
        println!("{}", LOGO.truecolor(125, 207, 255).bold());
        println!("{SHORT_INFO}");
        std::process::exit(0);
    };

    match command {
        Command::Run {
            name,
            minimal,
            isa,
            limit,
        } => run(
            &name,
            &RunOptions {
                minimal,
                isa,
                limit,
                command: None,
                console: false,
            },
        ),
        Command::Console {
            name,
            command,
            minimal,
            isa,
            limit,
        } => run(
            &name,
            &RunOptions {
                minimal,
                isa,
                limit,
                command,
                console: true,
            },
        ),
        Command::Assemble {
            name,
            dest,
            minimal,
        } => {
            file_message(Green, "Assembling", &name);
            let program = assemble(&name, minimal)?;
            let out_file_name = dest.unwrap_or_else(|| name.with_extension("hex"));
            fs::write(&out_file_name, program.to_hex()).into_diagnostic()?;

            message(Green, "Finished", "emit words");
            file_message(Green, "Saved", &out_file_name);
            Ok(())
        }
        Command::Check { name, minimal } => {
            file_message(Green, "Checking", &name);
            let _ = assemble(&name, minimal)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        Command::Isa { isa } => {
            let isa = instruction_set(isa.as_deref())?;
            for instr in isa.iter() {
                println!("{}", print::instruction(instr));
            }
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

#[derive(Default)]
struct RunOptions {
    minimal: bool,
    isa: Option<PathBuf>,
    limit: Option<usize>,
    /// Console commands, read from stdin when absent
    command: Option<String>,
    console: bool,
}

fn run(name: &Path, options: &RunOptions) -> Result<()> {
    let program = match name.extension().and_then(|ext| ext.to_str()) {
        Some("hex") => {
            file_message(MsgColor::Green, "Loading", name);
            let text = fs::read_to_string(name).into_diagnostic()?;
            Program::from_hex(name.display().to_string(), &text).into_diagnostic()?
        }
        Some("asm") => {
            file_message(MsgColor::Green, "Assembling", name);
            assemble(name, options.minimal)?
        }
        Some(_) => bail!("File has unknown extension. Exiting..."),
        None => bail!("File has no extension. Exiting..."),
    };

    let isa = instruction_set(options.isa.as_deref())?;
    let console = Terminal::new(options.minimal, mcpu::env::trace_level());
    let mut engine = Engine::new(isa, Box::new(console));
    engine
        .load(&program.data)
        .map_err(|error| runtime_error(&error))?;

    if options.console {
        message(MsgColor::Cyan, "Console", "type `help` for a list of commands");
        let reader = SourceMode::from(options.command.clone());
        let mut session = Session::new(engine, reader).with_limit(options.limit);
        session.run();
        file_message(MsgColor::Green, "Completed", name);
        return Ok(());
    }

    message(MsgColor::Green, "Running", "loaded words");
    let cancel = CancelToken::new();
    let outcome = match options.limit {
        Some(limit) => engine.run_bounded(limit, &cancel),
        None => engine.run(&cancel),
    }
    .map_err(|error| runtime_error(&error))?;

    for line in print::registers(&engine) {
        println!("{}", line);
    }
    println!("{}", print::flags(&engine));

    match outcome {
        RunOutcome::Halted { cycles } => {
            let cycles = format!("halted after {} cycles", cycles);
            message(MsgColor::Green, "Completed", &cycles);
        }
        RunOutcome::Cancelled { cycles } => {
            let cycles = format!("cancelled after {} cycles", cycles);
            message(MsgColor::Red, "Stopped", &cycles);
        }
        RunOutcome::LimitReached { cycles } => {
            bail!("Program did not halt within {} cycles", cycles)
        }
    }
    Ok(())
}

/// Assemble a source file, reporting every error before failing.
fn assemble(name: &Path, minimal: bool) -> Result<Program> {
    let contents = fs::read_to_string(name).into_diagnostic()?;
    let mut program = Program::new(name.display().to_string(), &contents);

    // Minimal output lists errors plainly, otherwise they are rendered with their source
    let assembly = if minimal {
        program.assemble(&mut Terminal::new(true, TraceLevel::Off))
    } else {
        program.assemble(&mut Silent)
    };
    if !assembly.assembled() {
        if !minimal {
            let src = program.source();
            for error in &assembly.errors {
                eprintln!("{:?}", asm_diagnostic(error, &src));
            }
        }
        return Err(asm_failed(assembly.errors.len()));
    }
    Ok(program)
}

fn instruction_set(path: Option<&Path>) -> Result<InstructionSet> {
    let default = mcpu::env::isa_path();
    match path.or(default.as_deref()) {
        Some(path) => InstructionSet::load(path).into_diagnostic(),
        None => Ok(InstructionSet::default()),
    }
}

const LOGO: &str = r#"
  _ __ ___   ___ _ __  _   _
 | '_ ` _ \ / __| '_ \| | | |
 | | | | | | (__| |_) | |_| |
 |_| |_| |_|\___| .__/ \__,_|
                |_|          "#;

const SHORT_INFO: &str = r"
Welcome to mcpu, an assembler and micro-instruction simulator
for a small 16-bit teaching CPU.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
