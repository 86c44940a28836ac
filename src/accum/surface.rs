use crate::accum::Rgb;
use anyhow::Context;
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Largest surface the engine agrees to allocate (pixels).
pub const MAX_SURFACE_PIXELS: usize = 1 << 26;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    Empty { width: usize, height: usize },
    TooLarge { width: usize, height: usize },
    Alloc { bytes: usize },
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { width, height } => write!(f, "empty surface ({width}x{height})"),
            Self::TooLarge { width, height } => {
                write!(f, "surface too large ({width}x{height})")
            }
            Self::Alloc { bytes } => write!(f, "failed to allocate {bytes} bytes"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// Pixel count for a surface, or why it cannot be allocated.
pub fn checked_pixels(width: usize, height: usize) -> Result<usize, SurfaceError> {
    if width == 0 || height == 0 {
        return Err(SurfaceError::Empty { width, height });
    }
    match width.checked_mul(height) {
        Some(n) if n <= MAX_SURFACE_PIXELS => Ok(n),
        _ => Err(SurfaceError::TooLarge { width, height }),
    }
}

/// Allocates a zeroed buffer without aborting on allocation failure.
pub(crate) fn try_alloc_zeroed<T: Copy + Default>(len: usize) -> Result<Vec<T>, SurfaceError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| SurfaceError::Alloc {
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, T::default());
    Ok(v)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    /// `dst = dst·(1−a) + src·a`
    Normal,
    /// `dst = min(255, dst + src·a)`
    Additive,
}

/// RGBA8 frame buffer the accumulators draw into and the renderers read.
#[derive(Clone, Debug)]
pub struct Surface {
    width: usize,
    height: usize,
    background: Rgb,
    pixels: Vec<u8>,
}

impl Surface {
    /// A zero-sized surface; call [`Surface::resize`] before drawing.
    pub fn empty(background: Rgb) -> Self {
        Self {
            width: 0,
            height: 0,
            background,
            pixels: Vec::new(),
        }
    }

    pub fn new(width: usize, height: usize, background: Rgb) -> Result<Self, SurfaceError> {
        let mut s = Self::empty(background);
        s.resize(width, height)?;
        Ok(s)
    }

    /// Reallocates and clears. On failure the surface is left empty.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), SurfaceError> {
        self.pixels = Vec::new();
        self.width = 0;
        self.height = 0;
        let n = checked_pixels(width, height)?;
        self.pixels = try_alloc_zeroed(n * 4)?;
        self.width = width;
        self.height = height;
        self.clear();
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self) {
        self.fill(self.background);
    }

    pub fn fill(&mut self, c: Rgb) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[c.0, c.1, c.2, 255]);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some(Rgb(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    /// Draws a `size`×`size` block whose top-left corner is the pixel containing
    /// `(x, y)`. Returns false when the anchor lies outside the surface.
    #[inline]
    pub fn plot(&mut self, x: f64, y: f64, size: usize, c: Rgb, alpha: f32, blend: Blend) -> bool {
        if !(x >= 0.0 && y >= 0.0) {
            return false;
        }
        let (px, py) = (x as usize, y as usize);
        if px >= self.width || py >= self.height {
            return false;
        }
        let x_end = (px + size.max(1)).min(self.width);
        let y_end = (py + size.max(1)).min(self.height);
        for row in py..y_end {
            let base = row * self.width;
            for col in px..x_end {
                let i = (base + col) * 4;
                blend_px(&mut self.pixels[i..i + 4], c, alpha, blend);
            }
        }
        true
    }

    /// Overwrites every pixel. `rgba` must match the surface size exactly.
    pub fn replace_all(&mut self, rgba: &[u8]) -> bool {
        if rgba.len() != self.pixels.len() {
            return false;
        }
        self.pixels.copy_from_slice(rgba);
        true
    }

    /// Static copy of the current image.
    pub fn snapshot(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    /// Writes the current image as binary PPM (P6).
    pub fn write_ppm(&self, path: &Path) -> anyhow::Result<()> {
        let mut body = Vec::with_capacity(self.width * self.height * 3 + 32);
        write!(&mut body, "P6\n{} {}\n255\n", self.width, self.height)?;
        for px in self.pixels.chunks_exact(4) {
            body.extend_from_slice(&px[..3]);
        }
        std::fs::write(path, body).with_context(|| format!("write snapshot {}", path.display()))
    }
}

#[inline]
fn blend_px(dst: &mut [u8], c: Rgb, alpha: f32, blend: Blend) {
    let a = alpha.clamp(0.0, 1.0);
    let src = [c.0, c.1, c.2];
    for k in 0..3 {
        let d = dst[k] as f32;
        let s = src[k] as f32;
        let v = match blend {
            Blend::Normal => d + (s - d) * a,
            Blend::Additive => d + s * a,
        };
        dst[k] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = 255;
}
