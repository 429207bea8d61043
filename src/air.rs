use crate::span::Span;
use crate::word::Word;

/// Marks a token as a subroutine label or a reference to one.
pub const LABEL_SIGIL: char = '_';

/// One structured source line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LineOfCode {
    /// 1-based line number in the raw source, used for diagnostics.
    pub line: usize,
    /// 1-based position among non-blank lines, used for ordering rules.
    pub position: usize,
    pub label: Option<String>,
    pub command: String,
    pub params: Vec<String>,
    pub span: Span,
    /// Set once the line has been encoded.
    pub word: Option<Word>,
    /// Already reported as broken, must not be encoded.
    pub failed: bool,
}

impl LineOfCode {
    pub fn new(line: usize, position: usize, span: Span, command: impl Into<String>) -> Self {
        LineOfCode {
            line,
            position,
            label: None,
            command: command.into(),
            params: Vec::new(),
            span,
            word: None,
            failed: false,
        }
    }

    /// Whether this line emits a word into the loaded image.
    pub fn is_loaded(&self) -> bool {
        self.command != "ORG"
    }
}

/// Labeled block running to the next label.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Subroutine {
    pub label: String,
    pub lines: Vec<LineOfCode>,
}

impl Subroutine {
    pub fn opening_line(&self) -> &LineOfCode {
        &self.lines[0]
    }

    pub fn loaded_len(&self) -> usize {
        self.lines.iter().filter(|l| l.is_loaded()).count()
    }
}

/// Assembly intermediate representation: main body followed by subroutines.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Air {
    main: Vec<LineOfCode>,
    subroutines: Vec<Subroutine>,
    /// Last non-blank line, as (position, source line).
    last: Option<(usize, usize)>,
}

impl Air {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_main(&mut self, line: LineOfCode) {
        self.track(&line);
        self.main.push(line);
    }

    /// Start a new subroutine with its labeled opening line.
    pub fn open_subroutine(&mut self, label: String, line: LineOfCode) {
        self.track(&line);
        self.subroutines.push(Subroutine {
            label,
            lines: vec![line],
        });
    }

    /// Append to the most recently opened subroutine.
    pub fn push_subroutine(&mut self, line: LineOfCode) {
        self.track(&line);
        match self.subroutines.last_mut() {
            Some(sub) => sub.lines.push(line),
            None => self.main.push(line),
        }
    }

    /// Lines which never make it into the program still count for the HALT rule.
    pub fn track(&mut self, line: &LineOfCode) {
        if self.last.map_or(true, |(pos, _)| line.position > pos) {
            self.last = Some((line.position, line.line));
        }
    }

    pub fn main(&self) -> &[LineOfCode] {
        &self.main
    }

    pub fn subroutines(&self) -> &[Subroutine] {
        &self.subroutines
    }

    pub fn subroutine(&self, label: &str) -> Option<&Subroutine> {
        self.subroutines.iter().find(|sub| sub.label == label)
    }

    pub fn has_subroutine(&self, label: &str) -> bool {
        self.subroutine(label).is_some()
    }

    pub fn first(&self) -> Option<&LineOfCode> {
        self.main
            .first()
            .into_iter()
            .chain(self.subroutines.first().map(|sub| sub.opening_line()))
            .min_by_key(|line| line.position)
    }

    /// Position and source line of the last non-blank line.
    pub fn last(&self) -> Option<(usize, usize)> {
        self.last
    }

    /// Every line, main body first.
    pub fn lines(&self) -> impl Iterator<Item = &LineOfCode> {
        self.main
            .iter()
            .chain(self.subroutines.iter().flat_map(|sub| sub.lines.iter()))
    }

    /// Words the main body places into memory, `ORG` excluded.
    pub fn main_loaded_len(&self) -> usize {
        self.main.iter().filter(|l| l.is_loaded()).count()
    }

    /// Consume into main body plus the named subroutines, in program order.
    pub fn into_layout(self, keep: impl Fn(&str) -> bool) -> Vec<LineOfCode> {
        let mut lines = self.main;
        for sub in self.subroutines {
            if keep(&sub.label) {
                lines.extend(sub.lines);
            }
        }
        lines
    }

    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut LineOfCode> {
        self.main
            .iter_mut()
            .chain(self.subroutines.iter_mut().flat_map(|sub| sub.lines.iter_mut()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(position: usize, command: &str) -> LineOfCode {
        LineOfCode::new(position, position, Span::default(), command)
    }

    #[test]
    fn layout_keeps_program_order() {
        let mut air = Air::new();
        air.push_main(line(1, "ORG"));
        air.push_main(line(2, "JMP"));
        air.open_subroutine("_a".into(), line(3, "ADD"));
        air.push_subroutine(line(4, "HALT"));
        air.open_subroutine("_b".into(), line(5, "SUB"));

        assert_eq!(air.main_loaded_len(), 1);
        assert_eq!(air.subroutine("_a").unwrap().loaded_len(), 2);
        assert_eq!(air.last(), Some((5, 5)));
        assert_eq!(air.first().unwrap().command, "ORG");

        let layout = air.into_layout(|label| label == "_a");
        let commands: Vec<_> = layout.iter().map(|l| l.command.as_str()).collect();
        assert_eq!(commands, ["ORG", "JMP", "ADD", "HALT"]);
    }
}
