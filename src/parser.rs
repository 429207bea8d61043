use crate::air::{Air, LineOfCode, LABEL_SIGIL};
use crate::error::{AsmError, AsmErrorKind};
use crate::span::Span;

/// Separates label, command and parameters once a line is normalised.
pub const SEPARATOR: char = '@';
const COMMENT: char = ';';

/// A non-blank source line after normalisation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalLine<'a> {
    pub line: usize,
    pub position: usize,
    /// Fields joined by [`SEPARATOR`]. Starts with it when the line was indented.
    pub text: String,
    /// Raw line, comment excluded.
    pub raw: &'a str,
}

/// Strip comments and blank lines, collapse whitespace into separators.
pub fn normalise(src: &str) -> Vec<NormalLine<'_>> {
    let mut res = Vec::new();
    for (idx, raw) in src.lines().enumerate() {
        let raw = match raw.find(COMMENT) {
            Some(end) => &raw[..end],
            None => raw,
        };
        let raw = raw.trim_end();
        let text = normalise_line(raw);
        if text.chars().all(|ch| ch == SEPARATOR) {
            continue;
        }
        res.push(NormalLine {
            line: idx + 1,
            position: res.len() + 1,
            text,
            raw,
        });
    }
    res
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t' || ch == SEPARATOR
}

fn normalise_line(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ',' {
            // No whitespace on either side of a comma
            while text.ends_with(is_blank) {
                text.pop();
            }
            while chars.next_if(|ch| is_blank(*ch)).is_some() {}
            text.push(',');
        } else if is_blank(ch) {
            if !text.ends_with(SEPARATOR) {
                text.push(SEPARATOR);
            }
        } else {
            text.push(ch);
        }
    }
    text
}

/// Fields of a line: label, command and parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fields<'a> {
    pub label: Option<&'a str>,
    pub command: &'a str,
    pub params: Option<&'a str>,
}

/// Split a normalised line into its fields.
pub fn split_fields<'a>(text: &'a str) -> Result<Fields<'a>, AsmErrorKind> {
    let parts: Vec<&str> = text.split(SEPARATOR).collect();
    // Only the first field may be empty, from indentation
    if parts.iter().skip(1).any(|part| part.is_empty()) {
        return Err(AsmErrorKind::UnknownCommand);
    }
    let non_empty = |part: &'a str| (!part.is_empty()).then_some(part);
    let fields = match parts[..] {
        [command] => Fields {
            label: None,
            command,
            params: None,
        },
        ["", command] => Fields {
            label: None,
            command,
            params: None,
        },
        [label, command] if label.starts_with(LABEL_SIGIL) => Fields {
            label: Some(label),
            command,
            params: None,
        },
        [command, params] => Fields {
            label: None,
            command,
            params: Some(params),
        },
        [label, command, params] => Fields {
            label: non_empty(label),
            command,
            params: Some(params),
        },
        _ => return Err(AsmErrorKind::UnknownCommand),
    };
    Ok(fields)
}

/// Which block incoming lines belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Block {
    Main,
    Subroutine,
    /// Body of a repeated label, never emitted.
    Discarded,
}

/// First pass: structures source lines into a main body and subroutines.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    air: Air,
    errors: Vec<AsmError>,
    block: Block,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            src,
            air: Air::new(),
            errors: Vec::new(),
            block: Block::Main,
        }
    }

    pub fn parse(mut self) -> (Air, Vec<AsmError>) {
        for line in normalise(self.src) {
            self.parse_line(&line);
        }
        (self.air, self.errors)
    }

    fn parse_line(&mut self, normal: &NormalLine) {
        let span = Span::of(self.src, normal.raw.trim_start());
        let fields = match split_fields(&normal.text) {
            Ok(fields) => fields,
            Err(kind) => {
                self.error(normal.line, span, kind);
                let broken = LineOfCode::new(normal.line, normal.position, span, "");
                self.air.track(&broken);
                return;
            }
        };

        let mut line = LineOfCode::new(normal.line, normal.position, span, fields.command);
        if let Some(params) = fields.params {
            line.params = params.split(',').map(str::to_string).collect();
        }

        let Some(label) = fields.label else {
            match self.block {
                Block::Main => self.air.push_main(line),
                Block::Subroutine => self.air.push_subroutine(line),
                Block::Discarded => self.air.track(&line),
            }
            return;
        };

        if !label.starts_with(LABEL_SIGIL) {
            self.error(
                line.line,
                span,
                AsmErrorKind::InvalidLabel {
                    label: label.to_string(),
                },
            );
            self.air.track(&line);
            return;
        }
        if line.position == 1 {
            self.error(line.line, span, AsmErrorKind::MainAfterSubroutine);
        }
        if self.air.has_subroutine(label) {
            self.error(line.line, span, AsmErrorKind::DuplicateSubroutine);
            self.block = Block::Discarded;
            self.air.track(&line);
            return;
        }
        line.label = Some(label.to_string());
        self.air.open_subroutine(label.to_string(), line);
        self.block = Block::Subroutine;
    }

    fn error(&mut self, line: usize, span: Span, kind: AsmErrorKind) {
        self.errors.push(AsmError::new(line, span, kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_whitespace_and_comments() {
        let src = "ORG $00 ; start\n\n   ADD  #$05 ,  A\n\t\n_loop\tJMP @ _loop\nHALT";
        let lines = normalise(src);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["ORG@$00", "@ADD@#$05,A", "_loop@JMP@_loop", "HALT"]);
        let numbers: Vec<_> = lines.iter().map(|l| (l.line, l.position)).collect();
        assert_eq!(numbers, [(1, 1), (3, 2), (5, 3), (6, 4)]);
        assert_eq!(lines[0].raw, "ORG $00");
    }

    #[test]
    fn field_splits() {
        let f = split_fields("ORG@$0A").unwrap();
        assert_eq!((f.label, f.command, f.params), (None, "ORG", Some("$0A")));

        let f = split_fields("HALT").unwrap();
        assert_eq!((f.label, f.command, f.params), (None, "HALT", None));

        let f = split_fields("@HALT").unwrap();
        assert_eq!((f.label, f.command, f.params), (None, "HALT", None));

        let f = split_fields("_end@HALT").unwrap();
        assert_eq!((f.label, f.command, f.params), (Some("_end"), "HALT", None));

        let f = split_fields("_add@ADD@#$01,A").unwrap();
        assert_eq!(
            (f.label, f.command, f.params),
            (Some("_add"), "ADD", Some("#$01,A"))
        );

        let f = split_fields("@ADD@#$01,A").unwrap();
        assert_eq!((f.label, f.command, f.params), (None, "ADD", Some("#$01,A")));

        assert_eq!(
            split_fields("_a@ADD@#1,A@extra"),
            Err(AsmErrorKind::UnknownCommand)
        );
    }

    #[test]
    fn partitions_blocks() {
        let src = "ORG $00\nJMP _a\n_a ADD #$01,A\nSUB #$01,B\n_b HALT";
        let (air, errors) = AsmParser::new(src).parse();
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(air.main().len(), 2);
        assert_eq!(air.main()[1].params, ["_a"]);
        let subs: Vec<_> = air
            .subroutines()
            .iter()
            .map(|s| (s.label.as_str(), s.lines.len()))
            .collect();
        assert_eq!(subs, [("_a", 2), ("_b", 1)]);
        assert_eq!(air.subroutines()[0].lines[1].params, ["#$01", "B"]);
    }

    #[test]
    fn labeled_first_line() {
        let (_, errors) = AsmParser::new("_start ORG $00\nHALT").parse();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Line 1: Main code must occur before subroutines"
        );
    }

    #[test]
    fn duplicate_subroutine_keeps_first() {
        let src = "ORG $00\n_a ADD #$01,A\n_a SUB #$01,A\nCMP #$01,A";
        let (air, errors) = AsmParser::new(src).parse();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Line 3: Subroutine already declared");
        let sub = air.subroutine("_a").unwrap();
        assert_eq!(sub.lines.len(), 1);
        assert_eq!(sub.lines[0].command, "ADD");
        // Discarded lines still count as the end of the program
        assert_eq!(air.last(), Some((4, 4)));
    }

    #[test]
    fn error_span_covers_line() {
        let src = "ORG $00\n  _x A B C D\n";
        let (_, errors) = AsmParser::new(src).parse();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, AsmErrorKind::UnknownCommand);
        assert_eq!(&src[errors[0].span.as_range()], "_x A B C D");
    }
}
