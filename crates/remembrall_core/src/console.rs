//! Line-oriented console output.
//!
//! Informational lines go to the output stream; warnings and errors go to the
//! diagnostic stream. Every line carries a level prefix.

use crate::model::memory::Memory;
use std::io::{self, Stderr, Stdout, Write};

/// Console writer over an output and a diagnostic stream.
pub struct Console<O: Write, E: Write> {
    out: O,
    err: E,
}

impl Console<Stdout, Stderr> {
    /// Console bound to the process stdout/stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn info(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "[INFO] {message}")
    }

    pub fn warn(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.err, "[WARNING] {message}")
    }

    pub fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.err, "[ERROR] {message}")
    }

    /// Writes unprefixed text (usage, version) to the output stream.
    pub fn plain(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}")
    }

    /// Writes one memory row: `"task" -- project -- YYYY-MM-DD`.
    ///
    /// The project part is omitted when untagged; the date only when `with_date`.
    pub fn memory(&mut self, memory: &Memory, with_date: bool) -> io::Result<()> {
        let mut line = format!("    \"{}\"", memory.task);
        if memory.has_project() {
            line.push_str(" -- ");
            line.push_str(&memory.project);
        }
        if with_date {
            line.push_str(" -- ");
            line.push_str(memory.created_date());
        }
        self.info(&line)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }

    /// Returns the underlying streams.
    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}
