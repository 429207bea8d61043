use crate::engine::Engine;
use crate::isa::Instruction;
use crate::memory::MEMORY_SIZE;
use crate::psr::Flag;
use crate::register::Register;
use crate::word::Word;

fn word_row(name: &str, word: Word) -> String {
    format!(
        "{:<8} {}  {:>6}  {:>6}",
        name,
        word.to_hex_string(),
        word.unsigned(),
        word.signed()
    )
}

/// Every register, then the ALU latches.
pub fn registers(engine: &Engine) -> Vec<String> {
    let mut lines = vec![format!("{:<8} {}  {:>6}  {:>6}", "", "hex", "uint", "int")];
    for reg in Register::ALL {
        lines.push(word_row(reg.name(), engine.registers().read(reg)));
    }
    let alu = engine.alu();
    lines.push(word_row("ALU.x", alu.read_x()));
    lines.push(word_row("ALU.y", alu.read_y()));
    lines.push(word_row("ALU.z", alu.read_z()));
    lines.push(format!("ALU circuit {} ({})", alu.circuit(), alu.circuit().symbol()));
    lines
}

/// `C 0  Z 1  N 0  V 0  (PSR 00000010)`
pub fn flags(engine: &Engine) -> String {
    let psr = engine.psr();
    let mut line = String::new();
    for flag in Flag::ALL {
        line.push_str(&format!("{} {}  ", flag.letter(), psr.get_flag(flag) as u8));
    }
    line.push_str(&format!("(PSR {})", psr));
    line
}

/// `count` words from `address`, stopping at the end of memory.
pub fn memory(engine: &Engine, address: u8, count: u16) -> Vec<String> {
    let end = (address as usize + count as usize).min(MEMORY_SIZE);
    (address as usize..end)
        .filter_map(|addr| {
            let word = engine.memory().read(addr as u16).ok()?;
            Some(format!("0x{:02x}  {}", addr, word.to_hex_string()))
        })
        .collect()
}

pub fn instruction(instr: &Instruction) -> String {
    format!("{:02X}  {:<12} {}", instr.id, instr.mnemonic, instr.description)
}

/// Phase, current instruction and whether the CPU has halted.
pub fn status(engine: &Engine) -> String {
    let current = match engine.current_instruction() {
        Some(instr) => format!("{:02X} {}", instr.id, instr.mnemonic),
        None => "none".to_string(),
    };
    format!(
        "{}, current instruction: {}{}",
        engine.phase(),
        current,
        if engine.is_halted() { " (halted)" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::InstructionSet;
    use crate::output::Silent;

    #[test]
    fn register_table() {
        let mut engine = Engine::new(InstructionSet::default(), Box::new(Silent));
        engine
            .set_register(Register::Gpb, Word::from(0xFFFEu16))
            .unwrap();
        let lines = registers(&engine);
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[6], "GPB      FFFE   65534      -2");
        assert_eq!(lines[10], "ALU circuit addition (+)");
    }

    #[test]
    fn memory_stops_at_end() {
        let mut engine = Engine::new(InstructionSet::default(), Box::new(Silent));
        engine.poke(0xFF, Word::from(0x1234u16)).unwrap();
        assert_eq!(memory(&engine, 0xFE, 8), ["0xfe  0000", "0xff  1234"]);
        assert_eq!(flags(&engine), "C 0  Z 0  N 0  V 0  (PSR 00000000)");
    }
}
