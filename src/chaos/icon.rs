use crate::chaos::{PointState, Step, SymmetryRng, reseed_near_origin};
use crate::params::IconParams;

/// First drawn iteration after a (re)seed; the 99 before it are discarded.
pub const TRANSIENT_ITERATIONS: u64 = 100;

/// Symmetric icon: `z' = (λ + α|z|² + β Re(zⁿ) + iω) z + γ z̄ⁿ⁻¹`.
#[derive(Debug, Clone)]
pub struct IconMap {
    params: IconParams,
    degree: usize,
}

impl IconMap {
    pub const SEED: (f64, f64) = (0.01, 0.003);

    pub fn new(params: IconParams) -> Self {
        Self {
            degree: params.degree(),
            params,
        }
    }

    pub fn params(&self) -> &IconParams {
        &self.params
    }

    pub fn set_params(&mut self, params: IconParams) {
        self.degree = params.degree();
        self.params = params;
    }

    #[inline]
    pub fn step<R: SymmetryRng + ?Sized>(&self, pt: &mut PointState, rng: &mut R) -> Step {
        let p = &self.params;
        let (x, y) = (pt.x, pt.y);
        let zzbar = x * x + y * y;

        // z^(n-1) by repeated multiplication.
        let mut zr = x;
        let mut zi = y;
        for _ in 0..self.degree.saturating_sub(2) {
            let za = zr * x - zi * y;
            let zb = zi * x + zr * y;
            zr = za;
            zi = zb;
        }

        let zn = x * zr - y * zi;
        let pv = p.lambda + p.alpha * zzbar + p.beta * zn;
        let xn = pv * x + p.gamma * zr - p.omega * y;
        let yn = pv * y - p.gamma * zi + p.omega * x;

        if !xn.is_finite() || !yn.is_finite() {
            reseed_near_origin(pt, rng);
            return Step::Reseeded;
        }
        pt.advance(xn, yn);
        if pt.iterations < TRANSIENT_ITERATIONS {
            return Step::Transient;
        }
        Step::Plot { x: xn, y: yn }
    }
}
