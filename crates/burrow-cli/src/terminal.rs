//! Plain stdout rendering

use std::io::{self, Write};

use burrow_core::RenderSink;
use terminal_size::{terminal_size, Height, Width};

const FALLBACK_SIZE: (usize, usize) = (80, 24);

pub struct Terminal<W: Write> {
    out: W,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Columns and rows, or 80x24 when stdout is not a terminal
    pub fn size(&self) -> (usize, usize) {
        match terminal_size() {
            Some((Width(w), Height(h))) if w > 0 && h > 0 => (w as usize, h as usize),
            _ => FALLBACK_SIZE,
        }
    }

    pub fn print(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Leave the cursor after `text` on the same line
    pub fn prompt(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text} ")?;
        self.out.flush()
    }
}

impl<W: Write> RenderSink for Terminal<W> {
    fn draw_lines(&mut self, lines: &[String]) -> io::Result<()> {
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn draw_status(&mut self, status: &str) -> io::Result<()> {
        writeln!(self.out, "-- {status}")?;
        self.out.flush()
    }
}
