use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::air::{Air, LineOfCode, LABEL_SIGIL};
use crate::error::{AsmError, AsmErrorKind};
use crate::memory::MEMORY_SIZE;

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Label -> source lines referencing it, in order of first reference.
#[derive(Clone, Debug, Default)]
pub struct References {
    table: FxMap<String, Vec<usize>>,
}

impl References {
    /// Collect every parameter naming a label, across main body and all subroutines.
    pub fn collect(air: &Air) -> Self {
        let mut table = FxMap::default();
        for line in air.lines() {
            for param in line.params.iter().filter(|p| p.starts_with(LABEL_SIGIL)) {
                table
                    .entry(param.clone())
                    .or_insert_with(Vec::new)
                    .push(line.line);
            }
        }
        References { table }
    }

    pub fn is_referenced(&self, label: &str) -> bool {
        self.table.contains_key(label)
    }

    pub fn lines(&self, label: &str) -> &[usize] {
        self.table.get(label).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.table.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

}

/// Label -> start address of each emitted subroutine.
pub type SymbolTable = FxMap<String, u8>;

/// Second pass: assign addresses to referenced subroutines, substitute references and lay out
/// the program.
///
/// `origin` is where the main body is loaded. Subroutines follow it in program order.
/// A subroutine's address is `origin` plus its offset in the loaded image, which equals its
/// opening line number minus 2 only with `ORG $00` and no dropped subroutines.
///
/// The first word landing past memory is reported, and it and every later word are marked
/// failed.
pub fn resolve(mut air: Air, origin: u8, errors: &mut Vec<AsmError>) -> (Vec<LineOfCode>, SymbolTable) {
    let refs = References::collect(&air);

    let mut symbols = SymbolTable::default();
    let mut offset = air.main_loaded_len();
    for sub in air.subroutines().iter().filter(|s| refs.is_referenced(&s.label)) {
        let address = origin as usize + offset;
        offset += sub.loaded_len();
        if address >= MEMORY_SIZE {
            let opening = sub.opening_line();
            errors.push(AsmError::new(
                opening.line,
                opening.span,
                AsmErrorKind::AddressTooLarge,
            ));
            continue;
        }
        symbols.insert(sub.label.clone(), address as u8);
    }

    for line in air.lines_mut() {
        for param in line.params.iter_mut() {
            if !param.starts_with(LABEL_SIGIL) {
                continue;
            }
            if let Some(address) = symbols.get(param.as_str()) {
                *param = format!("#${:02X}", address);
                continue;
            }
            line.failed = true;
        }
    }

    // Undefined labels, reported on every referencing line
    for (label, lines) in refs.iter() {
        if air.has_subroutine(label) {
            continue;
        }
        for &number in lines {
            let Some(line) = air.lines().find(|l| l.line == number) else {
                continue;
            };
            errors.push(AsmError::new(
                number,
                line.span,
                AsmErrorKind::UndefinedLabel {
                    label: label.to_string(),
                },
            ));
        }
    }

    let mut layout = air.into_layout(|label| refs.is_referenced(label));
    check_fits(&mut layout, origin, errors);
    (layout, symbols)
}

fn check_fits(layout: &mut [LineOfCode], origin: u8, errors: &mut Vec<AsmError>) {
    // A subroutine starting past memory has been reported already
    let mut reported = errors
        .iter()
        .any(|e| e.kind == AsmErrorKind::AddressTooLarge);
    let loaded = layout.iter_mut().filter(|l| l.is_loaded());
    for (index, line) in loaded.enumerate() {
        if origin as usize + index < MEMORY_SIZE {
            continue;
        }
        line.failed = true;
        if !reported {
            errors.push(AsmError::new(line.line, line.span, AsmErrorKind::AddressTooLarge));
            reported = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AsmParser;

    fn resolve_src(src: &str, origin: u8) -> (Vec<LineOfCode>, SymbolTable, Vec<AsmError>) {
        let (air, mut errors) = AsmParser::new(src).parse();
        let (lines, symbols) = resolve(air, origin, &mut errors);
        (lines, symbols, errors)
    }

    #[test]
    fn references_in_first_use_order() {
        let src = "ORG $00\nJMP _b\nJMP _a\nBEQ _b\n_a ADD #$01,A\n_b HALT";
        let (air, _) = AsmParser::new(src).parse();
        let refs = References::collect(&air);
        let labels: Vec<_> = refs.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ["_b", "_a"]);
        assert_eq!(refs.lines("_b"), [2, 4]);
        assert!(refs.lines("_c").is_empty());
    }

    #[test]
    fn addresses_follow_main_body() {
        let src = "ORG $00\nJMP _a\n_a ADD #$01,A\nJMP _b\n_b HALT";
        let (lines, symbols, errors) = resolve_src(src, 0);
        assert!(errors.is_empty(), "{errors:?}");
        // Opening line number minus two
        assert_eq!(symbols["_a"], 1);
        assert_eq!(symbols["_b"], 3);
        assert_eq!(lines[1].params, ["#$01"]);
        assert_eq!(lines[3].params, ["#$03"]);
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn unreferenced_subroutines_are_dropped() {
        let src = "ORG $10\nJMP _b\n_a ADD #$01,A\nSUB #$01,A\n_b HALT";
        let (lines, symbols, errors) = resolve_src(src, 0x10);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(!symbols.contains_key("_a"));
        // Laid out directly after the main body, offset by origin
        assert_eq!(symbols["_b"], 0x11);
        let commands: Vec<_> = lines.iter().map(|l| l.command.as_str()).collect();
        assert_eq!(commands, ["ORG", "JMP", "HALT"]);
    }

    #[test]
    fn undefined_label_on_every_reference() {
        let src = "ORG $00\nJMP _nowhere\nBNE _nowhere\nHALT";
        let (lines, _, errors) = resolve_src(src, 0);
        let messages: Vec<_> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            [
                "Line 2: Label '_nowhere' is not defined",
                "Line 3: Label '_nowhere' is not defined"
            ]
        );
        assert!(lines[1].failed && lines[2].failed);
        assert_eq!(lines[1].params, ["_nowhere"]);
    }

    #[test]
    fn subroutine_past_memory() {
        let src = "ORG $FF\nJMP _a\n_a HALT";
        let (lines, _, errors) = resolve_src(src, 0xFF);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Line 3: Address given exceeds memory size");
        assert!(lines[1].failed);
    }

    #[test]
    fn main_body_past_memory() {
        let src = "ORG $FF\nADD #$01,A\nADD #$01,A\nHALT";
        let (lines, _, errors) = resolve_src(src, 0xFF);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Line 3: Address given exceeds memory size");
        assert!(!lines[1].failed);
        assert!(lines[2].failed && lines[3].failed);
    }

    #[test]
    fn subroutine_body_past_memory() {
        let src = "ORG $FD\nJMP _a\nHALT\n_a ADD #$01,A\nSUB #$01,A\nHALT";
        let (lines, symbols, errors) = resolve_src(src, 0xFD);
        // Starts at $FF, only its opening line fits
        assert_eq!(symbols["_a"], 0xFF);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 5);
        assert!(!lines[3].failed);
        assert!(lines[4].failed && lines[5].failed);
    }
}
