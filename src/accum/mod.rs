mod direct;
mod histogram;
mod surface;

pub use direct::DirectPlot;
pub use histogram::{DensityPalette, Histogram};
pub use surface::{Blend, MAX_SURFACE_PIXELS, Surface, SurfaceError, checked_pixels};

use crate::params::MapParams;
use std::fmt;
use std::str::FromStr;

/// How orbit points are accumulated. Also the `--mode` value on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderMode {
    /// Direct plot, normal alpha blending.
    #[value(alias = "standard")]
    Chalk,
    /// Direct plot, additive blending.
    Glow,
    /// Per-pixel hit counter with logarithmic false color.
    #[value(alias = "density")]
    Histogram,
}

impl RenderMode {
    pub fn next(self) -> Self {
        match self {
            Self::Chalk => Self::Glow,
            Self::Glow => Self::Histogram,
            Self::Histogram => Self::Chalk,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Chalk => "Chalk",
            Self::Glow => "Glow",
            Self::Histogram => "Histogram",
        }
    }

    pub fn is_histogram(self) -> bool {
        self == Self::Histogram
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(s: &str) -> Result<Self, String> {
        let raw = s.trim();
        let hex = raw.strip_prefix('#').unwrap_or(raw);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("expected a #rrggbb color, got '{raw}'"));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Linear interpolation, rounded and clamped to `0..=255`.
    #[inline]
    pub fn lerp(self, to: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| {
            let v = a as f64 * (1.0 - t) + b as f64 * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb(mix(self.0, to.0), mix(self.1, to.1), mix(self.2, to.2))
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Map space to surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// `(cx + x·k, cy − y·k)`.
    Centered { cx: f64, cy: f64, k: f64 },
    /// Unit-square point replicated over a `period`×`period` grid covering the
    /// surface, y growing upwards.
    Tiled {
        width: f64,
        height: f64,
        period: usize,
    },
}

impl Projection {
    pub const IFS_FILL: f64 = 0.4;
    pub const ICON_EXTENT: f64 = 2.5;

    pub fn for_params(params: &MapParams, width: usize, height: usize) -> Self {
        let (w, h) = (width as f64, height as f64);
        let (cx, cy) = (w / 2.0, h / 2.0);
        let short = w.min(h);
        match params {
            MapParams::Ifs(p) => Self::Centered {
                cx,
                cy,
                k: short * Self::IFS_FILL * p.scale,
            },
            MapParams::Icon(p) => Self::Centered {
                cx,
                cy,
                k: short / (Self::ICON_EXTENT * p.scale),
            },
            MapParams::Quilt(p) => Self::Tiled {
                width: w,
                height: h,
                period: p.period(),
            },
        }
    }

    /// Screen marks one logical point produces before bounds checks.
    pub fn candidate_count(&self) -> usize {
        match self {
            Self::Centered { .. } => 1,
            Self::Tiled { period, .. } => period * period,
        }
    }

    #[inline]
    pub fn for_each_candidate(&self, x: f64, y: f64, mut f: impl FnMut(f64, f64)) {
        match *self {
            Self::Centered { cx, cy, k } => f(cx + x * k, cy - y * k),
            Self::Tiled {
                width,
                height,
                period,
            } => {
                let p = period as f64;
                for i in 0..period {
                    let px = (x + i as f64) / p * width;
                    for j in 0..period {
                        let py = height - (y + j as f64) / p * height;
                        f(px, py);
                    }
                }
            }
        }
    }
}

/// Accumulation strategy. Returns how many screen marks landed on the surface.
pub trait PointSink {
    fn accept(&mut self, surface: &mut Surface, projection: &Projection, x: f64, y: f64) -> u32;
}

/// The active strategy, chosen once per tick by the frame driver.
#[derive(Clone, Debug)]
pub enum Accumulator {
    Direct(DirectPlot),
    Histogram(Histogram),
}

impl Accumulator {
    /// Unsized strategy for `mode`; a histogram gets its buffer on the first
    /// [`Accumulator::resize`].
    pub fn for_mode(mode: RenderMode, color: Rgb, point_size: usize) -> Self {
        if mode.is_histogram() {
            Self::Histogram(Histogram::detached())
        } else {
            Self::Direct(DirectPlot::for_mode(mode, color, point_size))
        }
    }

    pub fn histogram(&self) -> Option<&Histogram> {
        match self {
            Self::Histogram(h) => Some(h),
            Self::Direct(_) => None,
        }
    }

    /// Zeroes accumulated state (histogram counts); direct plot keeps none.
    pub fn clear(&mut self) {
        if let Self::Histogram(h) = self {
            h.clear();
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), SurfaceError> {
        match self {
            Self::Histogram(h) => h.resize(width, height),
            Self::Direct(_) => Ok(()),
        }
    }

    pub fn release(&mut self) {
        if let Self::Histogram(h) = self {
            h.release();
        }
    }
}
