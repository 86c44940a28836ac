use crate::accum::{Blend, PointSink, Projection, RenderMode, Rgb, Surface};

/// Draws every orbit point straight onto the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectPlot {
    pub color: Rgb,
    pub alpha: f32,
    pub blend: Blend,
    pub point_size: usize,
}

impl DirectPlot {
    pub const CHALK_ALPHA: f32 = 0.2;
    pub const GLOW_ALPHA: f32 = 0.05;

    pub fn chalk(color: Rgb, point_size: usize) -> Self {
        Self {
            color,
            alpha: Self::CHALK_ALPHA,
            blend: Blend::Normal,
            point_size: point_size.max(1),
        }
    }

    pub fn glow(color: Rgb, point_size: usize) -> Self {
        Self {
            color,
            alpha: Self::GLOW_ALPHA,
            blend: Blend::Additive,
            point_size: point_size.max(1),
        }
    }

    /// Style for a direct-plot render mode; histogram mode falls back to chalk.
    pub fn for_mode(mode: RenderMode, color: Rgb, point_size: usize) -> Self {
        match mode {
            RenderMode::Glow => Self::glow(color, point_size),
            RenderMode::Chalk | RenderMode::Histogram => Self::chalk(color, point_size),
        }
    }
}

impl PointSink for DirectPlot {
    #[inline]
    fn accept(&mut self, surface: &mut Surface, projection: &Projection, x: f64, y: f64) -> u32 {
        let mut landed = 0u32;
        projection.for_each_candidate(x, y, |sx, sy| {
            if surface.plot(sx, sy, self.point_size, self.color, self.alpha, self.blend) {
                landed += 1;
            }
        });
        landed
    }
}
