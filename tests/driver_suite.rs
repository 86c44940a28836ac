use symchaos::accum::{MAX_SURFACE_PIXELS, SurfaceError};
use symchaos::chaos::PointState;
use symchaos::config::{MapKind, RenderMode};
use symchaos::driver::{
    COUNTER_PUBLISH_INTERVAL, DriverError, Engine, EngineOptions, RunState, SLOWEST_FRAME_STRIDE,
    batch_size,
};
use symchaos::params::{FieldChange, MapParams, ParamError};

fn engine(kind: MapKind, mode: RenderMode) -> Engine {
    let opts = EngineOptions {
        mode,
        seed: Some(1234),
        ..EngineOptions::default()
    };
    let mut e = Engine::new(MapParams::default_for(kind), opts);
    e.resize(96, 64).expect("resize");
    e
}

fn lit_pixels(e: &Engine) -> usize {
    let bg = e.surface().background();
    e.surface()
        .pixels()
        .chunks_exact(4)
        .filter(|p| (p[0], p[1], p[2]) != (bg.0, bg.1, bg.2))
        .count()
}

#[test]
fn batch_grows_with_speed_and_histogram_outpaces_direct() {
    let mut frames = 0;
    let mut prev_hist = 0;
    let mut prev_direct = 0;
    for speed in 2..=100 {
        let hist = batch_size(speed, RenderMode::Histogram, &mut frames);
        let direct = batch_size(speed, RenderMode::Chalk, &mut frames);
        assert!(hist >= prev_hist, "histogram batch shrank at speed {speed}");
        assert!(direct >= prev_direct, "direct batch shrank at speed {speed}");
        assert!(hist > direct, "speed {speed}: {hist} <= {direct}");
        prev_hist = hist;
        prev_direct = direct;
    }
    assert_eq!(batch_size(2, RenderMode::Histogram, &mut frames), 1666);
    assert_eq!(batch_size(2, RenderMode::Glow, &mut frames), 100);
    assert_eq!(batch_size(100, RenderMode::Glow, &mut frames), 3000);
    let top = batch_size(100, RenderMode::Histogram, &mut frames);
    assert!((249_990..=250_000).contains(&top), "top histogram batch {top}");
}

#[test]
fn slowest_speed_emits_one_point_per_stride() {
    let mut frames = 0;
    let total: usize = (0..SLOWEST_FRAME_STRIDE * 3)
        .map(|_| batch_size(1, RenderMode::Histogram, &mut frames))
        .sum();
    assert_eq!(total, 3);
}

#[test]
fn tick_runs_a_batch_and_publishes_counters() {
    let mut e = engine(MapKind::Ifs, RenderMode::Histogram);
    let stats = e.tick();
    assert!(stats.batch > 0);
    assert!(stats.recolored);
    assert_eq!(e.counters().iterations, stats.batch as u64);
    assert_eq!(e.counters().plotted, stats.plotted);
    assert!(lit_pixels(&e) > 0);
    assert!(COUNTER_PUBLISH_INTERVAL > 0);
}

#[test]
fn paused_engine_does_not_iterate() {
    let mut e = engine(MapKind::Icon, RenderMode::Chalk);
    e.pause();
    assert_eq!(e.state(), RunState::Paused);
    let point = e.point();
    let stats = e.tick();
    assert_eq!(stats.batch, 0);
    assert_eq!(e.point(), point);
    assert_eq!(e.counters().iterations, 0);

    e.toggle_pause();
    assert!(e.is_running());
    assert!(e.tick().batch > 0);
}

#[test]
fn unsized_engine_skips_ticks() {
    let mut e = Engine::new(MapParams::default_for(MapKind::Quilt), EngineOptions::default());
    assert!(!e.is_sized());
    assert_eq!(e.tick().batch, 0);
}

#[test]
fn oversized_resize_fails_then_recovers() {
    let mut e = engine(MapKind::Ifs, RenderMode::Histogram);
    let err = e
        .resize(MAX_SURFACE_PIXELS, 2)
        .expect_err("surface over the pixel cap");
    assert!(matches!(
        err,
        DriverError::Surface(SurfaceError::TooLarge { .. })
    ));
    assert!(!e.is_sized());
    assert_eq!(e.tick().batch, 0);

    assert_eq!(
        e.resize(0, 10),
        Err(DriverError::Surface(SurfaceError::Empty {
            width: 0,
            height: 10
        }))
    );

    e.resize(40, 30).expect("resize");
    assert!(e.is_sized());
    assert_eq!(e.surface().width(), 40);
    let hist = e.accumulator().histogram().expect("histogram mode");
    assert_eq!(hist.len(), 40 * 30);
    assert!(e.tick().batch > 0);
}

#[test]
fn reset_keep_canvas_leaves_surface_untouched() {
    let mut e = engine(MapKind::Icon, RenderMode::Histogram);
    for _ in 0..4 {
        e.tick();
    }
    let before = e.surface().snapshot();
    assert!(lit_pixels(&e) > 0);

    e.reset(true);
    assert_eq!(e.surface().pixels(), &before[..]);
    assert_eq!(e.point(), PointState::seed_for(MapKind::Icon));
    assert_eq!(e.counters().iterations, 0);
    let hist = e.accumulator().histogram().expect("histogram mode");
    assert_eq!(hist.max_hits(), 0);

    e.reset(false);
    assert_eq!(lit_pixels(&e), 0);
}

#[test]
fn clear_keeps_the_orbit() {
    let mut e = engine(MapKind::Ifs, RenderMode::Glow);
    e.tick();
    let point = e.point();
    e.clear();
    assert_eq!(e.point(), point);
    assert_eq!(lit_pixels(&e), 0);
    assert_eq!(e.counters().iterations, 0);
}

#[test]
fn structural_change_restarts_on_next_tick() {
    let mut e = engine(MapKind::Ifs, RenderMode::Histogram);
    let batch = e.tick().batch as u64;
    e.tick();
    assert_eq!(e.counters().iterations, 2 * batch);

    assert_eq!(e.set_field("a11", 0.41), Ok(FieldChange::Coefficient));
    e.tick();
    assert_eq!(e.counters().iterations, 3 * batch, "coefficients keep the orbit");

    assert_eq!(e.set_field("n", 5.0), Ok(FieldChange::Structural));
    e.tick();
    assert_eq!(e.counters().iterations, batch, "degree change restarts");
    let MapParams::Ifs(p) = e.params() else {
        panic!("family changed");
    };
    assert_eq!(p.degree(), 5);
    assert!(matches!(e.map(), symchaos::chaos::ChaosMap::Ifs(m) if m.trig().len() == 5));
}

#[test]
fn reflection_toggle_is_structural() {
    let mut e = engine(MapKind::Ifs, RenderMode::Chalk);
    assert_eq!(e.set_field("conj", 0.0), Ok(FieldChange::Structural));
    assert!(e.store().structural_change_pending());
    e.tick();
    assert!(!e.store().structural_change_pending());
}

#[test]
fn set_field_rejects_unknown_and_non_finite() {
    let mut e = engine(MapKind::Quilt, RenderMode::Histogram);
    assert!(matches!(
        e.set_field("a11", 1.0),
        Err(ParamError::UnknownField { .. })
    ));
    assert!(matches!(
        e.set_field("lambda", f64::NAN),
        Err(ParamError::NotFinite { .. })
    ));
    assert_eq!(e.set_field("lambda", -0.59), Ok(FieldChange::Unchanged));
    assert_eq!(e.set_field("nperiod", 3.7), Ok(FieldChange::Coefficient));
    assert_eq!(e.nudge_field("nperiod", 1.0), Ok(FieldChange::Structural));
    assert_eq!(e.params().symmetry(), 4);
}

#[test]
fn mode_change_clears_canvas() {
    let mut e = engine(MapKind::Quilt, RenderMode::Chalk);
    e.tick();
    assert!(lit_pixels(&e) > 0);
    e.set_mode(RenderMode::Histogram).expect("set mode");
    assert_eq!(e.mode(), RenderMode::Histogram);
    assert_eq!(lit_pixels(&e), 0);
    assert_eq!(e.counters().iterations, 0);
    assert_eq!(
        e.accumulator().histogram().map(|h| h.len()),
        Some(96 * 64)
    );
    assert!(e.tick().recolored);
}

#[test]
fn map_switch_loads_defaults_and_reseeds() {
    let mut e = engine(MapKind::Ifs, RenderMode::Histogram);
    e.tick();
    e.set_map(MapKind::Quilt);
    assert_eq!(e.kind(), MapKind::Quilt);
    assert_eq!(e.map().kind(), MapKind::Quilt);
    assert_eq!(e.point(), PointState::seed_for(MapKind::Quilt));
    assert_eq!(lit_pixels(&e), 0);
    e.tick();
    assert!(lit_pixels(&e) > 0);
}

#[test]
fn same_seed_gives_same_image() {
    let render = || {
        let mut e = engine(MapKind::Ifs, RenderMode::Histogram);
        for _ in 0..3 {
            e.tick();
        }
        e.surface().snapshot()
    };
    assert_eq!(render(), render());
}

#[test]
fn teardown_releases_buffers() {
    let mut e = engine(MapKind::Icon, RenderMode::Histogram);
    e.tick();
    e.teardown();
    assert_eq!(e.state(), RunState::Paused);
    assert!(!e.is_sized());
    assert!(e.surface().is_empty());
    assert_eq!(e.accumulator().histogram().map(|h| h.len()), Some(0));
    e.resume();
    assert_eq!(e.tick().batch, 0);
}
