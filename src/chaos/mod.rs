mod icon;
mod ifs;
mod quilt;
mod trig;

pub use icon::{IconMap, TRANSIENT_ITERATIONS};
pub use ifs::IfsMap;
pub use quilt::{QuiltMap, wrap_unit};
pub use trig::TrigTable;

use crate::params::{MapKind, MapParams};

/// Current orbit position. `iterations` counts steps since the last (re)seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointState {
    pub x: f64,
    pub y: f64,
    pub iterations: u64,
}

impl PointState {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            iterations: 0,
        }
    }

    pub fn seed_for(kind: MapKind) -> Self {
        let (x, y) = match kind {
            MapKind::Ifs => IfsMap::SEED,
            MapKind::Quilt => QuiltMap::SEED,
            MapKind::Icon => IconMap::SEED,
        };
        Self::new(x, y)
    }

    #[inline]
    fn advance(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.iterations = self.iterations.saturating_add(1);
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Outcome of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// New orbit point in map space, to be accumulated.
    Plot { x: f64, y: f64 },
    /// Orbit advanced but the point is still settling onto the attractor.
    Transient,
    /// The recurrence blew up; the orbit was moved back near the origin.
    Reseeded,
}

/// Randomness consumed by the iterators. Seedable in production, scriptable in
/// tests.
pub trait SymmetryRng {
    /// Uniform fold index in `[0, n)`.
    fn fold(&mut self, n: usize) -> usize;
    /// Fair coin for the reflection.
    fn coin(&mut self) -> bool;
    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64;
}

impl SymmetryRng for fastrand::Rng {
    #[inline]
    fn fold(&mut self, n: usize) -> usize {
        if n <= 1 { 0 } else { self.usize(..n) }
    }

    #[inline]
    fn coin(&mut self) -> bool {
        self.bool()
    }

    #[inline]
    fn unit(&mut self) -> f64 {
        self.f64()
    }
}

pub(crate) fn reseed_near_origin<R: SymmetryRng + ?Sized>(pt: &mut PointState, rng: &mut R) {
    pt.x = (rng.unit() - 0.5) * 0.01;
    pt.y = (rng.unit() - 0.5) * 0.01;
    pt.iterations = 0;
    log::debug!("orbit diverged, reseeded at ({:.5}, {:.5})", pt.x, pt.y);
}

/// One iterator per map family, chosen from the active parameters.
#[derive(Debug, Clone)]
pub enum ChaosMap {
    Ifs(IfsMap),
    Quilt(QuiltMap),
    Icon(IconMap),
}

impl ChaosMap {
    pub fn new(params: &MapParams) -> Self {
        match *params {
            MapParams::Ifs(p) => Self::Ifs(IfsMap::new(p)),
            MapParams::Quilt(p) => Self::Quilt(QuiltMap::new(p)),
            MapParams::Icon(p) => Self::Icon(IconMap::new(p)),
        }
    }

    pub fn kind(&self) -> MapKind {
        match self {
            Self::Ifs(_) => MapKind::Ifs,
            Self::Quilt(_) => MapKind::Quilt,
            Self::Icon(_) => MapKind::Icon,
        }
    }

    /// Applies new coefficients, keeping cached tables where the degree is unchanged.
    pub fn update(&mut self, params: &MapParams) {
        match (self, *params) {
            (Self::Ifs(m), MapParams::Ifs(p)) => m.set_params(p),
            (Self::Quilt(m), MapParams::Quilt(p)) => m.set_params(p),
            (Self::Icon(m), MapParams::Icon(p)) => m.set_params(p),
            (this, _) => *this = Self::new(params),
        }
    }

    pub fn seed(&self) -> PointState {
        PointState::seed_for(self.kind())
    }

    #[inline]
    pub fn step<R: SymmetryRng + ?Sized>(&self, pt: &mut PointState, rng: &mut R) -> Step {
        match self {
            Self::Ifs(m) => m.step(pt, rng),
            Self::Quilt(m) => m.step(pt, rng),
            Self::Icon(m) => m.step(pt, rng),
        }
    }
}
