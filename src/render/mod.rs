mod braille;
mod halfblock;
mod kitty;

pub use braille::BrailleRenderer;
pub use halfblock::HalfBlockRenderer;
pub use kitty::{KittyRenderer, KittyTransport};

use crate::config::RendererMode;
use std::io::Write;

/// One terminal frame: the engine surface plus the text drawn around it.
pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    /// Rows given to the image; the HUD takes the rest.
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

impl Frame<'_> {
    /// Whether the pixel grid matches `per_col`×`per_row` pixels per cell and
    /// the buffer is large enough to index.
    pub fn fits_cells(&self, per_col: usize, per_row: usize) -> bool {
        let cols = self.term_cols as usize;
        let rows = self.visual_rows as usize;
        cols > 0
            && rows > 0
            && self.pixel_width == cols.saturating_mul(per_col)
            && self.pixel_height == rows.saturating_mul(per_row)
            && self.pixels_rgba.len() >= self.pixel_width * self.pixel_height * 4
    }

    #[inline]
    pub fn rgb_at(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let i = (y * self.pixel_width + x) * 4;
        (
            self.pixels_rgba[i],
            self.pixels_rgba[i + 1],
            self.pixels_rgba[i + 2],
        )
    }
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
    /// Removes anything the renderer left on screen outside the text grid.
    fn cleanup(&mut self, _out: &mut dyn Write) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn renderer_for(mode: RendererMode) -> Box<dyn Renderer> {
    match mode {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Braille => Box::new(BrailleRenderer::new()),
        RendererMode::Kitty => Box::new(KittyRenderer::new()),
    }
}

/// Starts a synchronized update, homes the cursor and disables autowrap.
pub(crate) fn begin_frame(frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")?;
    Ok(())
}

/// HUD, overlay, autowrap restore and end of the synchronized update.
pub(crate) fn finish_frame(frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    let cols = frame.term_cols as usize;
    let mut lines = frame.hud.lines();
    for i in 0..frame.hud_rows as usize {
        let row = frame.visual_rows as usize + i + 1;
        write!(out, "\x1b[{row};1H\x1b[0m\x1b[2K")?;
        if let Some(line) = lines.next() {
            let clipped: String = line.chars().take(cols).collect();
            if i == 0 {
                write!(out, "\x1b[38;2;210;218;230m{clipped}\x1b[0m")?;
            } else {
                write!(out, "\x1b[38;2;150;160;176m{clipped}\x1b[0m")?;
            }
        }
    }

    if let Some(text) = frame.overlay {
        draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
    }

    out.write_all(b"\x1b[?7h")?;
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

/// Emits SGR colors only when they change since the last cell.
#[derive(Default)]
pub(crate) struct ColorCursor {
    fg: Option<(u8, u8, u8)>,
    bg: Option<(u8, u8, u8)>,
}

impl ColorCursor {
    pub fn reset(&mut self) {
        self.fg = None;
        self.bg = None;
    }

    pub fn set(
        &mut self,
        out: &mut dyn Write,
        fg: (u8, u8, u8),
        bg: (u8, u8, u8),
    ) -> std::io::Result<()> {
        if self.fg != Some(fg) {
            write!(out, "\x1b[38;2;{};{};{}m", fg.0, fg.1, fg.2)?;
            self.fg = Some(fg);
        }
        if self.bg != Some(bg) {
            write!(out, "\x1b[48;2;{};{};{}m", bg.0, bg.1, bg.2)?;
            self.bg = Some(bg);
        }
        Ok(())
    }
}

/// Centered box over a dimmed screen; the first line is drawn as a title.
pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let max_inner_w = cols.saturating_sub(6).max(1);
    let lines = wrap_lines(text, max_inner_w);
    if lines.is_empty() {
        return Ok(());
    }

    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let box_w = (widest.clamp(1, max_inner_w) + 4).min(cols.saturating_sub(2)).max(4);
    let inner_w = box_w.saturating_sub(4);
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = (body_h + 2).min(rows.saturating_sub(1)).max(3);

    let left = (cols.saturating_sub(box_w)) / 2 + 1;
    let top = (rows.saturating_sub(box_h)) / 2 + 1;
    let edge = format!("+{}+", "-".repeat(box_w.saturating_sub(2)));
    let blank = " ".repeat(inner_w);

    out.write_all(b"\x1b[0m\x1b[38;2;220;228;242m\x1b[48;2;4;6;12m")?;
    for row in 1..=rows {
        write!(out, "\x1b[{row};1H\x1b[2K")?;
    }

    out.write_all(b"\x1b[0m\x1b[38;2;236;242;255m\x1b[48;2;12;16;28m")?;
    write!(out, "\x1b[{top};{left}H{edge}")?;
    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = top + 1 + i;
        write!(out, "\x1b[{row};{left}H| {blank} |")?;
        if i == 0 {
            write!(
                out,
                "\x1b[{row};{}H\x1b[1m\x1b[38;2;254;240;138m{line}\x1b[22m\x1b[38;2;236;242;255m",
                left + 2
            )?;
        } else {
            write!(out, "\x1b[{row};{}H{line}", left + 2)?;
        }
    }
    write!(out, "\x1b[{};{left}H{edge}", top + box_h - 1)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}

fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let chars: Vec<char> = raw.chars().collect();
        for chunk in chars.chunks(width.max(1)) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}
