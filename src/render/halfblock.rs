use crate::render::{ColorCursor, Frame, Renderer, begin_frame, finish_frame};
use std::io::Write;

/// Two surface rows per cell: upper pixel as foreground of `▀`, lower as background.
pub struct HalfBlockRenderer {
    colors: ColorCursor,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            colors: ColorCursor::default(),
        }
    }
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        if !frame.fits_cells(1, 2) {
            return Ok(());
        }

        begin_frame(frame, out)?;
        self.colors.reset();

        for row in 0..frame.visual_rows as usize {
            let top = row * 2;
            for x in 0..frame.term_cols as usize {
                let upper = frame.rgb_at(x, top);
                let lower = frame.rgb_at(x, top + 1);
                self.colors.set(out, upper, lower)?;
                out.write_all("\u{2580}".as_bytes())?;
            }
            out.write_all(b"\r\n")?;
        }

        finish_frame(frame, out)
    }
}
