use std::{cell::RefCell, ffi::OsStr, path::PathBuf};

use crate::output::TraceLevel;

#[derive(Clone, Debug)]
struct Env {
    trace: TraceLevel,
    /// Instruction set used when `--isa` is not given.
    isa: Option<PathBuf>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        trace: var("MCPU_TRACE").map_or(TraceLevel::Off, |v| parse_trace(&v)),
        isa: var("MCPU_ISA").filter(|v| !v.is_empty()).map(PathBuf::from),
    };
    set_env(value);
}

/// How much of each instruction cycle to report as it runs, from `MCPU_TRACE`.
pub fn trace_level() -> TraceLevel {
    with_env(|env| env.trace)
}

/// Instruction set file named by `MCPU_ISA`.
pub fn isa_path() -> Option<PathBuf> {
    with_env(|env| env.isa.clone())
}

/// `1` and `micro` trace micro-instructions, `phases` only the phases. Anything else is off.
fn parse_trace(value: &str) -> TraceLevel {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "micro" => TraceLevel::MicroOps,
        "phases" => TraceLevel::Phases,
        _ => TraceLevel::Off,
    }
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.as_ref().unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(env)
    })
}

fn var(name: impl AsRef<OsStr>) -> Option<String> {
    std::env::var(name.as_ref()).ok()
}
