use crate::chaos::trig::TrigTable;
use crate::chaos::{PointState, Step, SymmetryRng, reseed_near_origin};
use crate::params::IfsParams;

/// Affine map followed by a random rotation from the n-fold symmetry group and,
/// in dihedral mode, a random reflection across the x axis.
#[derive(Debug, Clone)]
pub struct IfsMap {
    params: IfsParams,
    trig: TrigTable,
}

impl IfsMap {
    pub const SEED: (f64, f64) = (0.1, -0.01);

    pub fn new(params: IfsParams) -> Self {
        Self {
            trig: TrigTable::new(params.degree()),
            params,
        }
    }

    pub fn params(&self) -> &IfsParams {
        &self.params
    }

    pub fn trig(&self) -> &TrigTable {
        &self.trig
    }

    pub fn set_params(&mut self, params: IfsParams) {
        if params.degree() != self.trig.degree() {
            self.trig = TrigTable::new(params.degree());
        }
        self.params = params;
    }

    #[inline]
    pub fn step<R: SymmetryRng + ?Sized>(&self, pt: &mut PointState, rng: &mut R) -> Step {
        let p = &self.params;
        let ax = p.a11 * pt.x + p.a12 * pt.y + p.b1;
        let ay = p.a21 * pt.x + p.a22 * pt.y + p.b2;

        let m = rng.fold(self.trig.degree());
        let (x, mut y) = self.trig.rotate(m, ax, ay);

        if p.reflect() && rng.coin() {
            y = -y;
        }

        if !x.is_finite() || !y.is_finite() {
            reseed_near_origin(pt, rng);
            return Step::Reseeded;
        }
        pt.advance(x, y);
        Step::Plot { x, y }
    }
}
