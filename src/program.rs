use crate::assembler::{Assembler, Assembly};
use crate::output::Console;
use crate::word::{Word, WordError};

/// A named program: its source, and whatever the last assembly produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub code: Vec<String>,
    pub errors: Vec<String>,
    /// `ORG` word first, then the loaded image.
    pub data: Vec<Word>,
    pub assembled: bool,
}

impl Program {
    pub fn new(name: impl Into<String>, source: &str) -> Self {
        Program {
            name: name.into(),
            code: source.lines().map(str::to_string).collect(),
            ..Default::default()
        }
    }

    pub fn source(&self) -> String {
        self.code.join("\n")
    }

    /// Replace errors, data and the assembled flag with a fresh assembly of `code`.
    pub fn assemble(&mut self, console: &mut dyn Console) -> Assembly {
        let assembly = Assembler::assemble(&self.source(), console);
        self.errors = assembly.error_messages();
        self.data = assembly.data.clone();
        self.assembled = assembly.assembled();
        assembly
    }

    /// Previously assembled image, one word per line.
    pub fn from_hex(name: impl Into<String>, text: &str) -> Result<Self, WordError> {
        let data = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Word::from_hex_string)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Program {
            name: name.into(),
            data,
            assembled: true,
            ..Default::default()
        })
    }

    pub fn to_hex(&self) -> String {
        let mut text = String::with_capacity(self.data.len() * 5);
        for word in &self.data {
            text.push_str(&word.to_hex_string());
            text.push('\n');
        }
        text
    }
}
