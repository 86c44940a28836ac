//! Frame driver: owns the orbit, the accumulator and the surface, and runs one
//! bounded batch of iterations per host frame.

use crate::accum::{
    Accumulator, DensityPalette, PointSink, Projection, Rgb, Surface, SurfaceError,
    checked_pixels,
};
use crate::chaos::{ChaosMap, PointState, Step, SymmetryRng};
use crate::accum::RenderMode;
use crate::params::{FieldChange, MapKind, MapParams, ParamError, ParamStore};
use std::fmt;

/// Counters are published to readers at most this often within a tick.
pub const COUNTER_PUBLISH_INTERVAL: u64 = 16_384;
/// Frames per point at the slowest speed.
pub const SLOWEST_FRAME_STRIDE: u32 = 60;

const HISTOGRAM_BATCH_MIN: f64 = 1666.0;
const HISTOGRAM_BATCH_MAX: f64 = 250_000.0;
const DIRECT_BATCH_MIN: f64 = 100.0;
const DIRECT_BATCH_MAX: f64 = 3000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    Surface(SurfaceError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(e) => write!(f, "cannot size render surface: {e}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<SurfaceError> for DriverError {
    fn from(e: SurfaceError) -> Self {
        Self::Surface(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineOptions {
    pub mode: RenderMode,
    /// 1..=100.
    pub speed: u32,
    pub color: Rgb,
    pub palette: DensityPalette,
    pub background: Rgb,
    pub point_size: usize,
    pub seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::Histogram,
            speed: 50,
            color: Rgb(0x34, 0xd3, 0x99),
            palette: DensityPalette::default(),
            background: Rgb(0, 0, 0),
            point_size: 1,
            seed: None,
        }
    }
}

/// Running totals since the last reset/clear/resize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub iterations: u64,
    /// Screen marks that landed on the surface.
    pub plotted: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub batch: usize,
    pub plotted: u64,
    pub reseeds: u64,
    pub recolored: bool,
}

/// Iterations to run this frame for a speed in `1..=100`.
///
/// Speed 1 runs a single iteration every [`SLOWEST_FRAME_STRIDE`] frames using
/// `slow_frames` as the frame counter. Histogram mode ramps exponentially to a
/// much higher ceiling than direct plotting, which ramps linearly.
pub fn batch_size(speed: u32, mode: RenderMode, slow_frames: &mut u32) -> usize {
    let speed = speed.clamp(1, 100);
    if speed == 1 {
        *slow_frames += 1;
        if *slow_frames < SLOWEST_FRAME_STRIDE {
            return 0;
        }
        *slow_frames = 0;
        return 1;
    }
    *slow_frames = 0;
    let t = (speed - 2) as f64 / 98.0;
    let n = if mode.is_histogram() {
        HISTOGRAM_BATCH_MIN * (HISTOGRAM_BATCH_MAX / HISTOGRAM_BATCH_MIN).powf(t)
    } else {
        DIRECT_BATCH_MIN + (DIRECT_BATCH_MAX - DIRECT_BATCH_MIN) * t
    };
    n.floor() as usize
}

/// One independent canvas: parameters, iterator, accumulator and surface.
pub struct Engine<R: SymmetryRng = fastrand::Rng> {
    store: ParamStore,
    applied_revision: u64,
    map: ChaosMap,
    point: PointState,
    rng: R,
    surface: Surface,
    accum: Accumulator,
    projection: Projection,
    mode: RenderMode,
    palette: DensityPalette,
    color: Rgb,
    point_size: usize,
    speed: u32,
    slow_frames: u32,
    state: RunState,
    sized: bool,
    live: Counters,
    published: Counters,
}

impl Engine<fastrand::Rng> {
    pub fn new(params: MapParams, opts: EngineOptions) -> Self {
        let rng = match opts.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self::with_rng(params, opts, rng)
    }
}

impl<R: SymmetryRng> Engine<R> {
    /// The engine starts unsized; call [`Engine::resize`] before the first tick.
    pub fn with_rng(params: MapParams, opts: EngineOptions, rng: R) -> Self {
        let map = ChaosMap::new(&params);
        let point = map.seed();
        let accum = Accumulator::for_mode(opts.mode, opts.color, opts.point_size);
        Self {
            projection: Projection::for_params(&params, 0, 0),
            store: ParamStore::new(params),
            applied_revision: 0,
            map,
            point,
            rng,
            surface: Surface::empty(opts.background),
            accum,
            mode: opts.mode,
            palette: opts.palette,
            color: opts.color,
            point_size: opts.point_size.max(1),
            speed: opts.speed.clamp(1, 100),
            slow_frames: 0,
            state: RunState::Running,
            sized: false,
            live: Counters::default(),
            published: Counters::default(),
        }
    }

    pub fn params(&self) -> &MapParams {
        self.store.current()
    }

    pub fn store(&self) -> &ParamStore {
        &self.store
    }

    pub fn kind(&self) -> MapKind {
        self.store.kind()
    }

    pub fn map(&self) -> &ChaosMap {
        &self.map
    }

    pub fn point(&self) -> PointState {
        self.point
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accum
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn is_sized(&self) -> bool {
        self.sized
    }

    /// Counters as last published; may lag the live values within a tick.
    pub fn counters(&self) -> Counters {
        self.published
    }

    pub fn toggle_pause(&mut self) {
        self.state = match self.state {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
        };
    }

    pub fn pause(&mut self) {
        self.state = RunState::Paused;
    }

    pub fn resume(&mut self) {
        self.state = RunState::Running;
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed.clamp(1, 100);
        self.slow_frames = 0;
    }

    /// Switches strategy and clears the canvas.
    pub fn set_mode(&mut self, mode: RenderMode) -> Result<(), DriverError> {
        self.mode = mode;
        self.accum = Accumulator::for_mode(mode, self.color, self.point_size);
        if self.sized {
            if let Err(e) = self.accum.resize(self.surface.width(), self.surface.height()) {
                log::warn!("render mode {} unavailable: {e}", mode.label());
                self.mark_unsized();
                return Err(e.into());
            }
        }
        self.clear();
        Ok(())
    }

    /// Reallocates the surface and the histogram. Destructive: the canvas and
    /// counters go back to empty. On failure the engine skips ticks until a
    /// later resize succeeds.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), DriverError> {
        let sized = checked_pixels(width, height)
            .and_then(|_| self.surface.resize(width, height))
            .and_then(|_| self.accum.resize(width, height));
        if let Err(e) = sized {
            log::warn!("resize to {width}x{height} failed: {e}");
            self.mark_unsized();
            return Err(e.into());
        }
        self.sized = true;
        self.projection = Projection::for_params(self.store.current(), width, height);
        self.reset_counters();
        log::debug!("surface resized to {width}x{height}");
        Ok(())
    }

    fn mark_unsized(&mut self) {
        self.sized = false;
        self.accum.release();
        self.reset_counters();
    }

    /// Restarts the orbit from the family seed and zeroes accumulated hits. The
    /// visible surface is cleared unless `keep_canvas` is set, in which case it
    /// stays until the next recolor pass overwrites it.
    pub fn reset(&mut self, keep_canvas: bool) {
        self.point = self.map.seed();
        self.slow_frames = 0;
        self.accum.clear();
        if !keep_canvas {
            self.surface.clear();
        }
        self.reset_counters();
    }

    /// Clears the canvas and hit counts; the orbit continues where it was.
    pub fn clear(&mut self) {
        self.accum.clear();
        self.surface.clear();
        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.live = Counters::default();
        self.published = Counters::default();
    }

    /// Atomically replaces all parameters (preset load, reset to defaults) and
    /// restarts.
    pub fn load_params(&mut self, params: MapParams, keep_canvas: bool) {
        self.store.replace(params);
        self.store.take_structural_change();
        self.apply_params();
        self.reset(keep_canvas);
    }

    /// Switches map family with that family's default coefficients.
    pub fn set_map(&mut self, kind: MapKind) {
        log::debug!("map family -> {}", kind.tag());
        self.load_params(MapParams::default_for(kind), false);
    }

    /// Single-field edit. Structural edits take effect (with a reset and clear)
    /// at the start of the next tick.
    pub fn set_field(&mut self, field: &str, value: f64) -> Result<FieldChange, ParamError> {
        self.store.set_field(field, value)
    }

    pub fn nudge_field(&mut self, field: &str, delta: f64) -> Result<FieldChange, ParamError> {
        self.store.nudge_field(field, delta)
    }

    fn apply_params(&mut self) {
        self.map.update(self.store.current());
        self.projection = Projection::for_params(
            self.store.current(),
            self.surface.width(),
            self.surface.height(),
        );
        self.applied_revision = self.store.revision();
    }

    /// Drops the histogram buffer and stops iterating.
    pub fn teardown(&mut self) {
        self.state = RunState::Paused;
        self.accum.release();
        self.surface = Surface::empty(self.surface.background());
        self.sized = false;
        self.reset_counters();
    }

    /// One host frame: a batch of iterations plus, in histogram mode, one
    /// recolor pass.
    pub fn tick(&mut self) -> TickStats {
        if self.state == RunState::Paused || !self.sized {
            return TickStats::default();
        }

        if self.store.revision() != self.applied_revision {
            self.apply_params();
        }
        if self.store.take_structural_change() {
            log::debug!("structural parameter change, restarting orbit");
            self.reset(false);
        }

        let batch = batch_size(self.speed, self.mode, &mut self.slow_frames);
        let mut stats = TickStats {
            batch,
            ..TickStats::default()
        };

        let mut run = BatchRun {
            map: &self.map,
            point: &mut self.point,
            rng: &mut self.rng,
            surface: &mut self.surface,
            projection: &self.projection,
            live: &mut self.live,
            published: &mut self.published,
            stats: &mut stats,
        };
        match &mut self.accum {
            Accumulator::Direct(sink) => run.run(sink, batch),
            Accumulator::Histogram(sink) => run.run(sink, batch),
        }

        if let Accumulator::Histogram(h) = &mut self.accum {
            stats.recolored = h.recolor(&self.palette, &mut self.surface);
        }
        self.published = self.live;
        stats
    }
}

struct BatchRun<'a, R: SymmetryRng> {
    map: &'a ChaosMap,
    point: &'a mut PointState,
    rng: &'a mut R,
    surface: &'a mut Surface,
    projection: &'a Projection,
    live: &'a mut Counters,
    published: &'a mut Counters,
    stats: &'a mut TickStats,
}

impl<R: SymmetryRng> BatchRun<'_, R> {
    #[inline]
    fn run<S: PointSink>(&mut self, sink: &mut S, batch: usize) {
        for _ in 0..batch {
            match self.map.step(self.point, self.rng) {
                Step::Plot { x, y } => {
                    let landed = sink.accept(self.surface, self.projection, x, y) as u64;
                    self.live.plotted += landed;
                    self.stats.plotted += landed;
                }
                Step::Transient => {}
                Step::Reseeded => self.stats.reseeds += 1,
            }
            self.live.iterations += 1;
            if self.live.iterations % COUNTER_PUBLISH_INTERVAL == 0 {
                *self.published = *self.live;
            }
        }
    }
}
