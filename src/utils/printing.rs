//! Re-renders a growing markdown reply in place, for streamed chat responses in the terminal.

use std::io::{self, stdout, Write};
use termimad::crossterm::{cursor, ExecutableCommand};
use termimad::crossterm::terminal::Clear;
use termimad::crossterm::terminal::ClearType::FromCursorDown;
use termimad::{FmtLine, FmtText, MadSkin};

struct RenderedMarkdown {
    text: String,
    rows: u16,
    last_line_width: u16,
}

impl From<FmtText<'_, '_>> for RenderedMarkdown {
    fn from(fmt_text: FmtText<'_, '_>) -> Self {
        let text = format!("{}", fmt_text);
        let line_width: Vec<usize> = fmt_text.lines.iter().map(FmtLine::visible_length).collect();
        Self {
            text,
            rows: line_width.len() as u16,
            last_line_width: line_width.last().copied().unwrap_or(0) as u16,
        }
    }
}

/// Prints markdown chunks as they arrive, redrawing the whole reply from an anchor each time.
pub struct IncrementalMarkdownPrinter {
    pub skin: MadSkin,
    pub wrap_width: Option<usize>,
    buffer: String,
    anchor: Option<(u16, u16)>,
    hide_cursor: bool,
}

impl Default for IncrementalMarkdownPrinter {
    fn default() -> Self {
        Self {
            skin: MadSkin::default(),
            wrap_width: None,
            buffer: String::new(),
            anchor: None,
            hide_cursor: false,
        }
    }
}

impl IncrementalMarkdownPrinter {
    pub fn activated(&self) -> bool {
        self.anchor.is_some()
    }

    /// Anchors at the current cursor position and clears the buffer.
    pub fn activate(&mut self, hide_cursor: bool) -> io::Result<()> {
        if self.activated() {
            return Ok(());
        }
        self.anchor = Some(cursor::position()?);
        self.buffer.clear();
        if hide_cursor {
            stdout().execute(cursor::Hide)?;
        }
        self.hide_cursor = hide_cursor;
        Ok(())
    }

    /// Releases the anchor, leaving the rendered reply on screen. Returns the full markdown text.
    pub fn deactivate(&mut self) -> io::Result<String> {
        if self.anchor.take().is_some() && self.hide_cursor {
            stdout().execute(cursor::Show)?;
        }
        println!();
        Ok(std::mem::take(&mut self.buffer))
    }

    pub fn push_and_print(&mut self, chunk: &str) -> io::Result<()> {
        self.buffer.push_str(chunk);
        let rendered: RenderedMarkdown = FmtText::from(&self.skin, &self.buffer, self.wrap_width).into();
        self.print_rendered(&rendered)
    }

    fn print_rendered(&mut self, rendered: &RenderedMarkdown) -> io::Result<()> {
        let Some((column, row)) = self.anchor else {
            return Ok(());
        };
        let mut out = stdout();
        out.execute(cursor::MoveTo(column, row))?
            .execute(Clear(FromCursorDown))?;
        write!(out, "{}", rendered.text)?;
        out.flush()?;
        // cursor positions are relative to the visible terminal, so the anchor drifts up once the output scrolls
        let (column, row) = cursor::position()?;
        self.anchor = Some((column.saturating_sub(rendered.last_line_width), row.saturating_sub(rendered.rows)));
        Ok(())
    }
}

impl Drop for IncrementalMarkdownPrinter {
    fn drop(&mut self) {
        if self.anchor.is_some() && self.hide_cursor {
            let _ = stdout().execute(cursor::Show);
        }
    }
}
