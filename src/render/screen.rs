//! Row-addressed terminal output shared by all monitor tasks.
//!
//! Each task owns one row and writes it with absolute cursor positioning.
//! The writer sits behind a mutex and every row update is queued and flushed
//! under a single lock acquisition, so concurrent updates never interleave
//! within a row.

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::render::lines::Line;

/// How output is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Cursor-addressed live rows (stdout is a terminal).
    Interactive,
    /// One line per finished target, no control sequences.
    Plain,
}

/// Whether a line is a transient update or a target's final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Live,
    Final,
}

/// Serialized output sink.
pub struct Screen<W: Write> {
    out: Mutex<W>,
    mode: RenderMode,
    color: bool,
}

impl<W: Write> Screen<W> {
    /// Colour is always off in plain mode.
    pub fn new(out: W, mode: RenderMode, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            mode,
            color: color && mode == RenderMode::Interactive,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn color(&self) -> bool {
        self.color
    }

    fn lock(&self) -> MutexGuard<'_, W> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the screen, hides the cursor and prints the header on row 0.
    pub fn begin(&self, header: &str) -> io::Result<()> {
        let mut guard = self.lock();
        let out = &mut *guard;
        match self.mode {
            RenderMode::Interactive => {
                queue!(out, Hide, Clear(ClearType::All), MoveTo(0, 0), Print(header))?;
            }
            RenderMode::Plain => {
                writeln!(out, "{}", header)?;
            }
        }
        out.flush()
    }

    /// Overwrites `row` with `line` without touching other rows.
    pub fn draw(&self, row: u16, line: &Line, kind: LineKind) -> io::Result<()> {
        let mut guard = self.lock();
        let out = &mut *guard;
        match self.mode {
            RenderMode::Interactive => {
                queue!(out, MoveTo(0, row))?;
                for span in line.spans() {
                    match span.color {
                        Some(color) if self.color => {
                            queue!(
                                out,
                                SetForegroundColor(color),
                                Print(span.text.as_str()),
                                ResetColor
                            )?;
                        }
                        _ => queue!(out, Print(span.text.as_str()))?,
                    }
                }
                queue!(out, Clear(ClearType::UntilNewLine))?;
            }
            RenderMode::Plain => {
                if kind == LineKind::Live {
                    return Ok(());
                }
                writeln!(out, "{}", line.plain_text())?;
            }
        }
        out.flush()
    }

    /// Prints `text` on `row`, restores the cursor and ends the line.
    pub fn finish(&self, row: u16, text: &str) -> io::Result<()> {
        let mut guard = self.lock();
        let out = &mut *guard;
        match self.mode {
            RenderMode::Interactive => {
                queue!(
                    out,
                    MoveTo(0, row),
                    Print(text),
                    Clear(ClearType::UntilNewLine),
                    Show,
                    Print("\n")
                )?;
            }
            RenderMode::Plain => {
                writeln!(out, "{}", text)?;
            }
        }
        out.flush()
    }

    /// Best-effort cleanup after an interrupt. Leaves the cursor below the
    /// target rows, starting at `row`.
    pub fn restore(&self, row: u16) -> io::Result<()> {
        let mut guard = self.lock();
        let out = &mut *guard;
        if self.mode == RenderMode::Interactive {
            queue!(out, ResetColor, MoveTo(0, row), Show, Print("\n"))?;
        }
        out.flush()
    }

    /// Writes free-form text at the current position.
    pub fn write_text(&self, text: &str) -> io::Result<()> {
        let mut guard = self.lock();
        let out = &mut *guard;
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

impl<W: Write> Screen<W> {
    /// Consumes the screen and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::style::Color;

    fn line() -> Line {
        Line::new().colored("[gzip]", Color::Cyan).plain(" PID 7")
    }

    #[test]
    fn test_interactive_draw_positions_row() {
        let screen = Screen::new(Vec::new(), RenderMode::Interactive, false);
        screen.draw(3, &line(), LineKind::Live).unwrap();
        let out = String::from_utf8(screen.into_inner()).unwrap();

        assert!(out.starts_with("\x1b[4;1H"));
        assert!(out.contains("[gzip] PID 7"));
        assert!(!out.contains("\x1b[38;5;"));
    }

    #[test]
    fn test_interactive_draw_with_color() {
        let screen = Screen::new(Vec::new(), RenderMode::Interactive, true);
        screen.draw(0, &line(), LineKind::Live).unwrap();
        let out = String::from_utf8(screen.into_inner()).unwrap();

        assert!(out.contains("[gzip]"));
        assert!(out.contains("\x1b[0m"));
    }

    #[test]
    fn test_restore_moves_below_targets() {
        let screen = Screen::new(Vec::new(), RenderMode::Interactive, true);
        screen.draw(2, &line(), LineKind::Live).unwrap();
        screen.restore(4).unwrap();
        let out = String::from_utf8(screen.into_inner()).unwrap();

        let tail = out.rsplit("[gzip]").next().unwrap();
        assert!(tail.ends_with("\x1b[5;1H\x1b[?25h\n"), "{:?}", tail);

        let plain = Screen::new(Vec::new(), RenderMode::Plain, false);
        plain.restore(4).unwrap();
        assert!(plain.into_inner().is_empty());
    }

    #[test]
    fn test_plain_mode_skips_live_lines() {
        let screen = Screen::new(Vec::new(), RenderMode::Plain, true);
        assert!(!screen.color());
        screen.draw(2, &line(), LineKind::Live).unwrap();
        screen.draw(2, &line(), LineKind::Final).unwrap();
        let out = String::from_utf8(screen.into_inner()).unwrap();

        assert_eq!(out, "[gzip] PID 7\n");
    }
}
