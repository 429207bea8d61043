use std::fmt;
use std::io::{self, Write as _};
use std::str::Chars;
use std::sync::{Arc, Mutex};

use colored::{ColoredString, Colorize};

/// Kind of a console entry, decides how it is decorated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// Verbatim text, such as register dumps.
    Plain,
    Info,
    Warning,
    Error,
    /// Start of a fetch, decode or execute phase.
    Phase,
    /// Individual micro-instructions.
    Trace,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Phase => write!(f, "phase"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Sink for everything the assembler and engine report.
pub trait Console: Send {
    fn log(&mut self, level: Level, message: &str);

    fn plain(&mut self, message: &str) {
        self.log(Level::Plain, message);
    }
    fn info(&mut self, message: &str) {
        self.log(Level::Info, message);
    }
    fn warn(&mut self, message: &str) {
        self.log(Level::Warning, message);
    }
    fn error(&mut self, message: &str) {
        self.log(Level::Error, message);
    }
    fn trace(&mut self, message: &str) {
        self.log(Level::Trace, message);
    }
}

/// How much of the engine's stepping a [`Terminal`] shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    #[default]
    Off,
    /// Every phase as it starts.
    Phases,
    /// Phases and every micro-instruction.
    MicroOps,
}

impl TraceLevel {
    /// Whether entries of `level` pass this filter.
    pub fn shows(self, level: Level) -> bool {
        match level {
            Level::Phase => self >= TraceLevel::Phases,
            Level::Trace => self >= TraceLevel::MicroOps,
            _ => true,
        }
    }
}

/// Writes to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct Terminal {
    /// Strip colour and status labels, suited for blackbox tests.
    minimal: bool,
    trace: TraceLevel,
}

impl Terminal {
    pub fn new(minimal: bool, trace: TraceLevel) -> Self {
        Terminal { minimal, trace }
    }

    pub fn is_minimal(&self) -> bool {
        self.minimal
    }
}

impl Console for Terminal {
    fn log(&mut self, level: Level, message: &str) {
        if !self.trace.shows(level) {
            return;
        }
        let mut stderr = io::stderr().lock();
        let res = if self.minimal {
            let text: String = Decolored::new(message).collect();
            match level {
                Level::Plain | Level::Info => writeln!(stderr, "{}", text),
                Level::Warning => writeln!(stderr, "Warning: {}", text),
                Level::Error => writeln!(stderr, "Error: {}", text),
                Level::Phase => writeln!(stderr, "{}", text),
                Level::Trace => writeln!(stderr, "  {}", text),
            }
        } else {
            match level {
                Level::Plain => writeln!(stderr, "{}", message),
                Level::Info => writeln!(stderr, "{} {}", label("Info").cyan(), message),
                Level::Warning => writeln!(stderr, "{} {}", label("Warning").yellow(), message),
                Level::Error => writeln!(stderr, "{} {}", label("Error").red(), message),
                Level::Phase => writeln!(stderr, "{} {}", label("Phase").dimmed(), message),
                Level::Trace => writeln!(stderr, "{}", ColoredString::from(message).dimmed()),
            }
        };
        // Nowhere left to report a broken stderr
        let _ = res;
    }
}

fn label(text: &str) -> ColoredString {
    format!("{:>12}", text).bold()
}

/// Keeps every entry, shareable between an engine and whoever inspects it.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<(Level, String)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages of a single level, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(_, msg)| msg.contains(needle))
    }
}

impl Console for Recorder {
    fn log(&mut self, level: Level, message: &str) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push((level, message.to_string()));
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Console for Silent {
    fn log(&mut self, _level: Level, _message: &str) {}
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decolored() {
        assert_eq!(Decolored::new("GPA 0005").collect::<String>(), "GPA 0005");
        assert_eq!(
            Decolored::new("\x1b[1mGPA\x1b[0m 0005").collect::<String>(),
            "GPA 0005"
        );
        assert_eq!(Decolored::new("abc\x1b[0xyz").collect::<String>(), "abc");
    }

    #[test]
    fn recorder_is_shared() {
        let recorder = Recorder::new();
        let mut sink: Box<dyn Console> = Box::new(recorder.clone());
        sink.info("loaded");
        sink.error("Line 2: Unrecognised command");
        sink.trace("MAR <- PC");

        assert_eq!(recorder.entries().len(), 3);
        assert_eq!(
            recorder.messages(Level::Error),
            vec!["Line 2: Unrecognised command".to_string()]
        );
        assert!(recorder.contains("MAR"));
    }

    #[test]
    fn trace_levels_filter() {
        assert!(TraceLevel::Off.shows(Level::Error));
        assert!(!TraceLevel::Off.shows(Level::Phase));
        assert!(TraceLevel::Phases.shows(Level::Phase));
        assert!(!TraceLevel::Phases.shows(Level::Trace));
        assert!(TraceLevel::MicroOps.shows(Level::Phase));
        assert!(TraceLevel::MicroOps.shows(Level::Trace));
    }
}
