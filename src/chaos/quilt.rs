use crate::chaos::{PointState, Step, SymmetryRng, reseed_near_origin};
use crate::params::QuiltParams;
use std::f64::consts::TAU;

/// Deterministic square-quilt recurrence on the unit torus.
#[derive(Debug, Clone)]
pub struct QuiltMap {
    params: QuiltParams,
}

impl QuiltMap {
    pub const SEED: (f64, f64) = (0.1, 0.334);

    pub fn new(params: QuiltParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &QuiltParams {
        &self.params
    }

    pub fn set_params(&mut self, params: QuiltParams) {
        self.params = params;
    }

    /// The raw recurrence before wrapping into the unit square.
    #[inline]
    pub fn raw(&self, x: f64, y: f64) -> (f64, f64) {
        let p = &self.params;
        let sx = (TAU * x).sin();
        let sy = (TAU * y).sin();
        let cx = (TAU * x).cos();
        let cy = (TAU * y).cos();
        let s2x = (2.0 * TAU * x).sin();
        let s2y = (2.0 * TAU * y).sin();
        let s3x = (3.0 * TAU * x).sin();
        let s3y = (3.0 * TAU * y).sin();
        let c2x = (2.0 * TAU * x).cos();
        let c2y = (2.0 * TAU * y).cos();

        let xn = (p.lambda + p.alpha * cy) * sx - p.omega * sy
            + p.beta * s2x
            + p.gamma * s3x * c2y
            + p.ma * x
            + p.shift;
        let yn = (p.lambda + p.alpha * cx) * sy
            + p.omega * sx
            + p.beta * s2y
            + p.gamma * s3y * c2x
            + p.ma * y
            + p.shift;
        (xn, yn)
    }

    /// The quilt map draws no random numbers; the handle is only used to re-seed
    /// after a blow-up.
    #[inline]
    pub fn step<R: SymmetryRng + ?Sized>(&self, pt: &mut PointState, rng: &mut R) -> Step {
        let (xn, yn) = self.raw(pt.x, pt.y);
        if !xn.is_finite() || !yn.is_finite() {
            reseed_near_origin(pt, rng);
            pt.x = wrap_unit(pt.x);
            pt.y = wrap_unit(pt.y);
            return Step::Reseeded;
        }
        let x = wrap_unit(xn);
        let y = wrap_unit(yn);
        pt.advance(x, y);
        Step::Plot { x, y }
    }
}

/// Wraps a finite value into `[0, 1)`.
#[inline]
pub fn wrap_unit(v: f64) -> f64 {
    let w = v - v.floor();
    // Tiny negative inputs round up to exactly 1.0.
    if (0.0..1.0).contains(&w) { w } else { 0.0 }
}
