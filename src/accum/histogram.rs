use crate::accum::surface::{SurfaceError, checked_pixels, try_alloc_zeroed};
use crate::accum::{PointSink, Projection, Rgb, Surface};

/// Three-stop color ramp for density rendering: background → low → mid → high.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DensityPalette {
    pub low: Rgb,
    pub mid: Rgb,
    pub high: Rgb,
}

impl Default for DensityPalette {
    fn default() -> Self {
        Self {
            low: Rgb(0x1e, 0x3a, 0x8a),
            mid: Rgb(0xef, 0x44, 0x44),
            high: Rgb(0xfe, 0xf0, 0x8a),
        }
    }
}

impl DensityPalette {
    pub const LOW_BREAK: f64 = 0.33;
    pub const MID_BREAK: f64 = 0.66;

    /// Color for a normalized density `t` in `[0, 1]`.
    #[inline]
    pub fn color_at(&self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let (from, to, u) = if t < Self::LOW_BREAK {
            (Rgb(0, 0, 0), self.low, t / Self::LOW_BREAK)
        } else if t < Self::MID_BREAK {
            (self.low, self.mid, (t - Self::LOW_BREAK) / (Self::MID_BREAK - Self::LOW_BREAK))
        } else {
            (self.mid, self.high, (t - Self::MID_BREAK) / (1.0 - Self::MID_BREAK))
        };
        from.lerp(to, u)
    }

    /// `ln(count+1) / ln(max_hits+1)`; zero when nothing has been counted.
    #[inline]
    pub fn density(count: u32, max_hits: u32) -> f64 {
        if max_hits == 0 {
            return 0.0;
        }
        (count as f64 + 1.0).ln() / (max_hits as f64 + 1.0).ln()
    }
}

/// Per-pixel hit counter, one cell per surface pixel.
#[derive(Clone, Debug)]
pub struct Histogram {
    width: usize,
    height: usize,
    counts: Vec<u32>,
    max_hits: u32,
    image: Vec<u8>,
}

impl Histogram {
    pub fn new(width: usize, height: usize) -> Result<Self, SurfaceError> {
        let mut h = Self::detached();
        h.resize(width, height)?;
        Ok(h)
    }

    /// No buffer; every increment is discarded until [`Histogram::resize`].
    pub fn detached() -> Self {
        Self {
            width: 0,
            height: 0,
            counts: Vec::new(),
            max_hits: 0,
            image: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), SurfaceError> {
        self.release();
        let n = checked_pixels(width, height)?;
        self.counts = try_alloc_zeroed(n)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Frees the buffers.
    pub fn release(&mut self) {
        self.counts = Vec::new();
        self.image = Vec::new();
        self.width = 0;
        self.height = 0;
        self.max_hits = 0;
    }

    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.max_hits = 0;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn max_hits(&self) -> u32 {
        self.max_hits
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn count_at(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.counts.get(y * self.width + x).copied()
    }

    /// Counts a hit for the pixel containing `(x, y)`.
    #[inline]
    pub fn increment(&mut self, x: f64, y: f64) -> bool {
        if !(x >= 0.0 && y >= 0.0) {
            return false;
        }
        let (px, py) = (x as usize, y as usize);
        if px >= self.width || py >= self.height {
            return false;
        }
        let cell = &mut self.counts[py * self.width + px];
        *cell = cell.saturating_add(1);
        if *cell > self.max_hits {
            self.max_hits = *cell;
        }
        true
    }

    /// Converts the whole buffer to colors and replaces the surface with it.
    /// Skipped (returns false) while nothing has been counted or when the
    /// surface size no longer matches.
    pub fn recolor(&mut self, palette: &DensityPalette, surface: &mut Surface) -> bool {
        if self.max_hits == 0 {
            return false;
        }
        if surface.width() != self.width || surface.height() != self.height {
            return false;
        }
        let need = self.counts.len() * 4;
        if self.image.len() != need {
            self.image.resize(need, 0);
        }

        let bg = surface.background();
        let log_max = (self.max_hits as f64 + 1.0).ln();
        for (count, px) in self.counts.iter().zip(self.image.chunks_exact_mut(4)) {
            let c = if *count == 0 {
                bg
            } else {
                palette.color_at((*count as f64 + 1.0).ln() / log_max)
            };
            px.copy_from_slice(&[c.0, c.1, c.2, 255]);
        }
        surface.replace_all(&self.image)
    }
}

impl PointSink for Histogram {
    #[inline]
    fn accept(&mut self, _surface: &mut Surface, projection: &Projection, x: f64, y: f64) -> u32 {
        let mut landed = 0u32;
        projection.for_each_candidate(x, y, |sx, sy| {
            if self.increment(sx, sy) {
                landed += 1;
            }
        });
        landed
    }
}
