use crate::air::LineOfCode;
use crate::encoder::{parse_number, Encoder};
use crate::error::{AsmError, AsmErrorKind};
use crate::output::Console;
use crate::parser::AsmParser;
use crate::span::Span;
use crate::symbol::{self, SymbolTable};
use crate::word::Word;

/// Everything produced by one assembler run.
#[derive(Clone, Debug, Default)]
pub struct Assembly {
    /// Sorted by source line.
    pub errors: Vec<AsmError>,
    /// `ORG` word first, then the image loaded at the origin.
    pub data: Vec<Word>,
    pub symbols: SymbolTable,
    /// Emitted lines in layout order, encoded where possible.
    pub lines: Vec<LineOfCode>,
}

impl Assembly {
    pub fn assembled(&self) -> bool {
        self.errors.is_empty()
    }

    /// Diagnostics as `Line N: message`.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Load address given by the leading `ORG` word.
    pub fn origin(&self) -> Option<u8> {
        self.lines
            .iter()
            .find(|line| line.command == "ORG")
            .and_then(|line| line.word)
            .map(Word::low_byte)
    }
}

/// Two-pass translator from source text to machine words. Keeps no state between runs.
pub struct Assembler;

impl Assembler {
    /// Never stops at the first error, every diagnostic is collected and reported to `console`.
    pub fn assemble(src: &str, console: &mut dyn Console) -> Assembly {
        let (air, mut errors) = AsmParser::new(src).parse();

        let first = air.first();
        match first {
            Some(line) if line.command == "ORG" => (),
            Some(line) => errors.push(AsmError::new(line.line, line.span, AsmErrorKind::MissingOrg)),
            None => errors.push(AsmError::new(1, Span::default(), AsmErrorKind::MissingOrg)),
        }
        let origin = first
            .filter(|line| line.command == "ORG" && line.params.len() == 1)
            .and_then(|line| parse_number(&line.params[0]).ok())
            .unwrap_or(0);
        let last = air.last();

        let (mut lines, symbols) = symbol::resolve(air, origin, &mut errors);

        let mut encoder = Encoder::new(last);
        let mut data = Vec::with_capacity(lines.len());
        for line in lines.iter_mut().filter(|line| !line.failed) {
            match encoder.encode(line) {
                Ok(word) => {
                    line.word = Some(word);
                    data.push(word);
                }
                Err(kind) => {
                    line.failed = true;
                    errors.push(AsmError::new(line.line, line.span, kind));
                }
            }
        }

        errors.sort_by_key(|error| error.line);
        for error in &errors {
            console.error(&error.to_string());
        }

        Assembly {
            errors,
            data,
            symbols,
            lines,
        }
    }
}
