use crate::render::{ColorCursor, Frame, Renderer, begin_frame, finish_frame};
use std::io::Write;

/// 2×4 pixels per cell. Pixels brighter than the cell's mid luma become dots
/// in the averaged "on" color; the rest set the background.
pub struct BrailleRenderer {
    colors: ColorCursor,
}

const DOT_BITS: [u8; 8] = [0x01, 0x08, 0x02, 0x10, 0x04, 0x20, 0x40, 0x80];

impl BrailleRenderer {
    pub fn new() -> Self {
        Self {
            colors: ColorCursor::default(),
        }
    }
}

impl Default for BrailleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct ColorSum {
    r: u32,
    g: u32,
    b: u32,
    n: u32,
}

impl ColorSum {
    fn add(&mut self, (r, g, b): (u8, u8, u8)) {
        self.r += r as u32;
        self.g += g as u32;
        self.b += b as u32;
        self.n += 1;
    }

    fn mean(&self) -> Option<(u8, u8, u8)> {
        (self.n > 0).then(|| {
            (
                (self.r / self.n) as u8,
                (self.g / self.n) as u8,
                (self.b / self.n) as u8,
            )
        })
    }
}

/// Dot pattern and (fg, bg) colors for one cell.
fn braille_cell(px: &[(u8, u8, u8); 8]) -> (char, (u8, u8, u8), (u8, u8, u8)) {
    let lum = px.map(|(r, g, b)| luma(r, g, b));
    let lo = lum.iter().copied().min().unwrap_or(0);
    let hi = lum.iter().copied().max().unwrap_or(0);
    let thr = (lo + hi) / 2;

    let mut bits = 0u8;
    let mut on = ColorSum::default();
    let mut off = ColorSum::default();
    for i in 0..8 {
        if lum[i] > thr {
            bits |= DOT_BITS[i];
            on.add(px[i]);
        } else {
            off.add(px[i]);
        }
    }

    let bg = off.mean().unwrap_or((0, 0, 0));
    if bits == 0 {
        return (' ', bg, bg);
    }
    let fg = on.mean().unwrap_or(bg);
    let ch = char::from_u32(0x2800 + bits as u32).unwrap_or(' ');
    (ch, fg, off.mean().unwrap_or(fg))
}

impl Renderer for BrailleRenderer {
    fn name(&self) -> &'static str {
        "braille"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        if !frame.fits_cells(2, 4) {
            return Ok(());
        }

        begin_frame(frame, out)?;
        self.colors.reset();

        let mut cell = [(0u8, 0u8, 0u8); 8];
        for row in 0..frame.visual_rows as usize {
            let y0 = row * 4;
            for col in 0..frame.term_cols as usize {
                let x0 = col * 2;
                for dy in 0..4 {
                    for dx in 0..2 {
                        cell[dy * 2 + dx] = frame.rgb_at(x0 + dx, y0 + dy);
                    }
                }
                let (ch, fg, bg) = braille_cell(&cell);
                self.colors.set(out, fg, bg)?;
                write!(out, "{ch}")?;
            }
            out.write_all(b"\r\n")?;
        }

        finish_frame(frame, out)
    }
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u16 {
    ((r as u32 * 54 + g as u32 * 183 + b as u32 * 19) >> 8) as u16
}
