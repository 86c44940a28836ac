use std::time::Instant;

use anyhow::Result;
use symchaos::config::{MapKind, RenderMode};
use symchaos::driver::{Engine, EngineOptions};
use symchaos::preset::builtin_presets;

struct Args {
    frames: usize,
    w: usize,
    h: usize,
    speed: u32,
    seed: u64,
    all_presets: bool,
    ci_smoke: bool,
    min_rate: f64,
}

fn parse_args() -> Args {
    let mut args = Args {
        frames: 120,
        w: 320,
        h: 176,
        speed: 100,
        seed: 7,
        all_presets: false,
        ci_smoke: false,
        min_rate: 1.0e5,
    };

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--w", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.w = n.max(1);
                }
                i += 2;
            }
            ("--h", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.h = n.max(1);
                }
                i += 2;
            }
            ("--speed", Some(x)) => {
                if let Ok(n) = x.parse::<u32>() {
                    args.speed = n.clamp(1, 100);
                }
                i += 2;
            }
            ("--seed", Some(x)) => {
                if let Ok(n) = x.parse::<u64>() {
                    args.seed = n;
                }
                i += 2;
            }
            ("--min-rate", Some(x)) => {
                if let Ok(v) = x.parse::<f64>() {
                    args.min_rate = v.max(0.0);
                }
                i += 2;
            }
            ("--all-presets", _) => {
                args.all_presets = true;
                i += 1;
            }
            ("--ci-smoke", _) => {
                args.ci_smoke = true;
                args.frames = args.frames.min(30);
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }
    args
}

struct Run {
    iterations: u64,
    plotted: u64,
    secs: f64,
    lit: usize,
}

impl Run {
    fn rate(&self) -> f64 {
        if self.secs > 0.0 {
            self.iterations as f64 / self.secs
        } else {
            0.0
        }
    }
}

fn bench_one(args: &Args, params: symchaos::params::MapParams, mode: RenderMode) -> Result<Run> {
    let opts = EngineOptions {
        mode,
        speed: args.speed,
        seed: Some(args.seed),
        ..EngineOptions::default()
    };
    let mut engine = Engine::new(params, opts);
    engine.resize(args.w, args.h)?;

    let start = Instant::now();
    let mut plotted = 0u64;
    for _ in 0..args.frames {
        plotted += engine.tick().plotted;
    }
    let secs = start.elapsed().as_secs_f64();

    let bg = engine.surface().background();
    let lit = engine
        .surface()
        .pixels()
        .chunks_exact(4)
        .filter(|p| (p[0], p[1], p[2]) != (bg.0, bg.1, bg.2))
        .count();
    Ok(Run {
        iterations: engine.counters().iterations,
        plotted,
        secs,
        lit,
    })
}

fn main() -> Result<()> {
    let args = parse_args();
    println!(
        "symchaos benchmark: frames={} size={}x{} speed={} seed={}",
        args.frames, args.w, args.h, args.speed, args.seed
    );

    let modes = [RenderMode::Chalk, RenderMode::Glow, RenderMode::Histogram];
    let mut failures = Vec::new();
    for kind in MapKind::all() {
        let presets = builtin_presets(kind);
        let take = if args.all_presets { presets.len() } else { 1 };
        for preset in presets.iter().take(take) {
            for mode in modes {
                let run = bench_one(&args, preset.params, mode)?;
                println!(
                    "{:<6} {:<22} {:<9} {:>10.0} it/s  plotted={:>9}  lit={:>6}",
                    kind.label(),
                    preset.name,
                    mode.label(),
                    run.rate(),
                    run.plotted,
                    run.lit
                );
                if run.lit == 0 {
                    failures.push(format!("{} / {} / {}: blank", kind.label(), preset.name, mode.label()));
                } else if run.rate() < args.min_rate {
                    failures.push(format!(
                        "{} / {} / {}: {:.0} it/s < {:.0}",
                        kind.label(),
                        preset.name,
                        mode.label(),
                        run.rate(),
                        args.min_rate
                    ));
                }
            }
        }
    }

    if args.ci_smoke {
        if !failures.is_empty() {
            eprintln!("CI smoke: FAIL");
            for f in &failures {
                eprintln!("  {f}");
            }
            anyhow::bail!("ci smoke failed");
        }
        println!("CI smoke: PASS (min_rate={:.0})", args.min_rate);
    }
    Ok(())
}
