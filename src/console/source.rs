use std::io::{self, BufRead, IsTerminal, Write as _};

use console::{Key, Term};

/// Where console commands come from.
#[derive(Debug)]
pub enum SourceMode {
    Argument(Argument),
    Stdin(Stdin),
    Terminal(Terminal),
}

pub trait SourceReader {
    /// `None` indicates EOF.
    /// Returned string slice MAY include leading or trailing whitespace.
    fn read(&mut self) -> Option<&str>;
}

impl SourceMode {
    /// Commands from `argument` if given, otherwise standard input.
    pub fn from(argument: Option<String>) -> Self {
        if let Some(argument) = argument {
            return SourceMode::Argument(Argument::from(argument));
        }
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return SourceMode::Terminal(Terminal::new());
        }
        SourceMode::Stdin(Stdin::from(stdin))
    }

    /// Non-interactive sources have their commands echoed back.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

impl SourceReader for SourceMode {
    fn read(&mut self) -> Option<&str> {
        match self {
            Self::Argument(argument) => argument.read(),
            Self::Stdin(stdin) => stdin.read(),
            Self::Terminal(terminal) => terminal.read(),
        }
    }
}

/// Commands given on the command line, separated by `;` or newlines.
#[derive(Debug)]
pub struct Argument {
    buffer: String,
    /// Byte index
    cursor: usize,
}

impl Argument {
    pub fn from(source: String) -> Self {
        Self {
            buffer: source,
            cursor: 0,
        }
    }
}

impl SourceReader for Argument {
    fn read(&mut self) -> Option<&str> {
        if self.cursor >= self.buffer.len() {
            return None;
        }
        let rest = &self.buffer[self.cursor..];
        let end = rest.find(['\n', ';']).unwrap_or(rest.len());
        // Skip the delimiter as well
        self.cursor += end + 1;
        Some(&rest[..end])
    }
}

/// Standard input which is not attached to a terminal, i.e. piped.
#[derive(Debug)]
pub struct Stdin {
    stdin: io::Stdin,
    line: String,
    /// Byte index into `line`
    cursor: usize,
}

impl Stdin {
    pub fn from(stdin: io::Stdin) -> Self {
        Self {
            stdin,
            line: String::new(),
            cursor: 0,
        }
    }
}

impl SourceReader for Stdin {
    fn read(&mut self) -> Option<&str> {
        if self.cursor >= self.line.len() {
            self.line.clear();
            self.cursor = 0;
            // Read errors are treated like EOF
            match self.stdin.lock().read_line(&mut self.line) {
                Ok(0) | Err(_) => return None,
                Ok(_) => (),
            }
        }
        let rest = &self.line[self.cursor..];
        let end = rest.find([';', '\n']).unwrap_or(rest.len());
        self.cursor += end + 1;
        Some(&rest[..end])
    }
}

/// Interactive unbuffered terminal, with line editing and history.
#[derive(Debug)]
pub struct Terminal {
    term: Term,

    buffer: String,
    /// Byte index of the next command in `buffer`
    cursor: usize,

    history: Vec<String>,
    /// Focused item in history, or new entry if index==length
    history_index: usize,
    /// Visible line cursor in terminal
    visible_cursor: usize,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            buffer: String::new(),
            cursor: 0,
            history: Vec::new(),
            history_index: 0,
            visible_cursor: 0,
        }
    }

    fn is_next(&self) -> bool {
        self.history_index >= self.history.len()
    }

    /// If focused on a historic item, copy it into the buffer so it can be edited.
    fn update_next(&mut self) {
        if let Some(item) = self.history.get(self.history_index) {
            self.buffer = item.clone();
            self.history_index = self.history.len();
        }
    }

    fn current(&self) -> &str {
        self.history
            .get(self.history_index)
            .map_or(&self.buffer, String::as_str)
    }

    fn print_prompt(&mut self) -> io::Result<()> {
        self.term.clear_line()?;
        let current = self.current().to_string();
        write!(self.term, "\x1b[1;36mmcpu>\x1b[0m {}", current)?;
        self.term
            .move_cursor_left(current.len().saturating_sub(self.visible_cursor))?;
        self.term.flush()
    }

    /// Returns `true` once a line has been entered.
    fn read_key(&mut self) -> io::Result<bool> {
        match self.term.read_key()? {
            Key::Enter | Key::Char('\n') => {
                if self.is_next() && self.buffer.trim().is_empty() {
                    self.buffer.clear();
                    self.term.write_line("")?;
                } else {
                    self.update_next();
                    return Ok(true);
                }
            }
            // Commands are ASCII, anything else is ignored
            Key::Char(ch) if ch == ' ' || ch.is_ascii_graphic() => {
                self.update_next();
                self.buffer.insert(self.visible_cursor, ch);
                self.visible_cursor += 1;
            }
            Key::Backspace => {
                self.update_next();
                if self.visible_cursor > 0 && self.visible_cursor <= self.buffer.len() {
                    self.buffer.remove(self.visible_cursor - 1);
                    self.visible_cursor -= 1;
                }
            }
            Key::ArrowLeft => self.visible_cursor = self.visible_cursor.saturating_sub(1),
            Key::ArrowRight => {
                if self.visible_cursor < self.current().len() {
                    self.visible_cursor += 1;
                }
            }
            Key::ArrowUp => {
                if self.history_index > 0 {
                    self.history_index -= 1;
                    self.visible_cursor = self.current().len();
                }
            }
            Key::ArrowDown => {
                if self.history_index < self.history.len() {
                    self.history_index += 1;
                    self.visible_cursor = self.current().len();
                }
            }
            _ => (),
        }
        Ok(false)
    }

    fn read_line(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.visible_cursor = 0;
        loop {
            self.print_prompt()?;
            if self.read_key()? {
                break;
            }
        }
        self.term.write_line("")?;

        if self.history.last() != Some(&self.buffer) {
            self.history.push(self.buffer.clone());
        }
        self.history_index = self.history.len();
        Ok(())
    }
}

impl SourceReader for Terminal {
    fn read(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            // Terminal errors, including Ctrl+D, end the session
            self.read_line().ok()?;
        }
        let rest = &self.buffer[self.cursor..];
        match rest.find(';') {
            Some(index) => {
                self.cursor += index + 1;
                Some(&rest[..index])
            }
            None => {
                self.cursor = 0;
                Some(rest)
            }
        }
    }
}
