use crate::accum::DensityPalette;
use crate::config::{Config, MapKind, RendererMode};
use crate::driver::{Engine, EngineOptions, TickStats};
use crate::params::{FieldChange, MapParams};
use crate::preset::{self, Preset, PresetError};
use crate::render::{self, Frame};
use crate::terminal::TerminalGuard;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

const HUD_ROWS: u16 = 3;
const STATUS_TTL: Duration = Duration::from_secs(4);
const SPEED_STEP: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    /// The HUD was toggled; the surface has to be re-laid out.
    Relayout,
    Quit,
}

/// Terminal rows split between image and HUD.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub cols: u16,
    pub rows: u16,
    pub visual_rows: u16,
    pub hud_rows: u16,
}

impl Layout {
    pub fn new((cols, rows): (u16, u16), show_hud: bool) -> Self {
        let hud_rows = if show_hud {
            HUD_ROWS.min(rows.saturating_sub(1))
        } else {
            0
        };
        Self {
            cols,
            rows,
            visual_rows: rows.saturating_sub(hud_rows).max(1),
            hud_rows,
        }
    }

    /// Surface size in pixels for a renderer.
    pub fn surface_size(&self, renderer: RendererMode) -> (usize, usize) {
        let (mx, my) = renderer.cell_pixels();
        (
            (self.cols as usize).saturating_mul(mx),
            (self.visual_rows as usize).saturating_mul(my),
        )
    }
}

/// Everything the terminal loop drives, minus the terminal itself.
pub struct App {
    engine: Engine,
    kind: MapKind,
    presets: Vec<Preset>,
    preset_idx: usize,
    file_presets: Option<(MapKind, Vec<Preset>)>,
    keep_canvas: bool,
    show_hud: bool,
    show_help: bool,
    status: Option<(String, Instant)>,
    last_stats: TickStats,
    params_out: std::path::PathBuf,
    snapshot_out: std::path::PathBuf,
    presets_file: Option<std::path::PathBuf>,
}

impl App {
    pub fn new(cfg: &Config) -> Self {
        let mut status = None;
        let file_presets = match cfg.presets_file.as_deref() {
            Some(path) => match load_preset_file(path, cfg.map) {
                Ok(loaded) => Some(loaded),
                Err(e) => {
                    log::warn!("rejected preset file {}: {e}", path.display());
                    status = Some(format!("preset file rejected: {e}"));
                    None
                }
            },
            None => None,
        };

        let kind = file_presets.as_ref().map_or(cfg.map, |(k, _)| *k);
        let presets = collect_presets(kind, file_presets.as_ref());
        let preset_idx = match cfg.preset.as_deref() {
            Some(q) => preset::find_preset(&presets, q).unwrap_or_else(|| {
                log::warn!("no preset matches '{q}'");
                status = Some(format!("no preset matches '{q}'"));
                0
            }),
            None => 0,
        };
        let params = presets
            .get(preset_idx)
            .map_or(MapParams::default_for(kind), |p| p.params);

        let opts = EngineOptions {
            mode: cfg.mode,
            speed: cfg.speed,
            color: cfg.color,
            palette: DensityPalette {
                low: cfg.low,
                mid: cfg.mid,
                high: cfg.high,
            },
            point_size: cfg.point_size as usize,
            seed: cfg.seed,
            ..EngineOptions::default()
        };

        Self {
            engine: Engine::new(params, opts),
            kind,
            presets,
            preset_idx,
            file_presets,
            keep_canvas: cfg.keep_canvas,
            show_hud: true,
            show_help: false,
            status: status.map(|s| (s, Instant::now())),
            last_stats: TickStats::default(),
            params_out: cfg.params_out.clone(),
            snapshot_out: cfg.snapshot_out.clone(),
            presets_file: cfg.presets_file.clone(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn kind(&self) -> MapKind {
        self.kind
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn preset_index(&self) -> usize {
        self.preset_idx
    }

    pub fn keep_canvas(&self) -> bool {
        self.keep_canvas
    }

    pub fn show_hud(&self) -> bool {
        self.show_hud
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| at.elapsed() < STATUS_TTL)
            .map(|(s, _)| s.as_str())
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Instant::now()));
    }

    pub fn layout(&mut self, layout: Layout, renderer: RendererMode) {
        let (w, h) = layout.surface_size(renderer);
        if let Err(e) = self.engine.resize(w, h) {
            self.set_status(format!("cannot draw at {w}x{h}: {e}"));
        }
    }

    pub fn tick(&mut self) -> TickStats {
        self.last_stats = self.engine.tick();
        self.last_stats
    }

    pub fn teardown(&mut self) {
        self.engine.teardown();
    }

    pub fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers) -> KeyAction {
        if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
            return KeyAction::Quit;
        }
        match code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return KeyAction::Quit,
            KeyCode::Char(' ') => self.engine.toggle_pause(),
            KeyCode::Char('r') => self.engine.reset(false),
            KeyCode::Char('R') => self.engine.reset(true),
            KeyCode::Char('c') | KeyCode::Char('C') => self.engine.clear(),
            KeyCode::Left => self.step_preset(-1),
            KeyCode::Right => self.step_preset(1),
            KeyCode::Char('m') | KeyCode::Char('M') => self.switch_map(self.kind.next()),
            KeyCode::Char('v') | KeyCode::Char('V') => {
                let mode = self.engine.mode().next();
                match self.engine.set_mode(mode) {
                    Ok(()) => self.set_status(format!("mode: {}", mode.label())),
                    Err(e) => self.set_status(e.to_string()),
                }
            }
            KeyCode::Up => {
                let speed = self.engine.speed().saturating_add(SPEED_STEP);
                self.engine.set_speed(speed);
            }
            KeyCode::Down => {
                let speed = self.engine.speed().saturating_sub(SPEED_STEP);
                self.engine.set_speed(speed);
            }
            KeyCode::Char('[') => self.step_symmetry(-1),
            KeyCode::Char(']') => self.step_symmetry(1),
            KeyCode::Char('x') | KeyCode::Char('X') => self.toggle_reflection(),
            KeyCode::Char('k') | KeyCode::Char('K') => {
                self.keep_canvas = !self.keep_canvas;
                let state = if self.keep_canvas { "on" } else { "off" };
                self.set_status(format!("keep canvas on preset change: {state}"));
            }
            KeyCode::Char('w') | KeyCode::Char('W') => self.write_params(),
            KeyCode::Char('o') | KeyCode::Char('O') => self.write_snapshot(),
            KeyCode::Char('l') | KeyCode::Char('L') => self.reload_presets(),
            KeyCode::Char('i') | KeyCode::Char('I') => {
                self.show_hud = !self.show_hud;
                return KeyAction::Relayout;
            }
            KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::F(1) => {
                self.show_help = !self.show_help;
            }
            _ => {}
        }
        KeyAction::Continue
    }

    fn step_preset(&mut self, delta: isize) {
        if self.presets.is_empty() {
            return;
        }
        let n = self.presets.len() as isize;
        self.preset_idx = (self.preset_idx as isize + delta).rem_euclid(n) as usize;
        self.apply_preset(self.keep_canvas);
    }

    fn apply_preset(&mut self, keep_canvas: bool) {
        if let Some(p) = self.presets.get(self.preset_idx) {
            self.engine.load_params(p.params, keep_canvas);
            let msg = format!(
                "preset {}/{}: {}",
                self.preset_idx + 1,
                self.presets.len(),
                p.name
            );
            self.set_status(msg);
        }
    }

    fn switch_map(&mut self, kind: MapKind) {
        self.kind = kind;
        self.presets = collect_presets(kind, self.file_presets.as_ref());
        self.preset_idx = 0;
        if self.presets.is_empty() {
            self.engine.set_map(kind);
        } else {
            self.apply_preset(false);
        }
    }

    fn step_symmetry(&mut self, delta: i64) {
        let field = MapParams::symmetry_field(self.kind);
        let current = self.engine.params().symmetry() as i64;
        let target = (current + delta).max(1);
        if target == current {
            return;
        }
        match self.engine.set_field(field, target as f64) {
            Ok(FieldChange::Structural) => self.set_status(format!("{field} = {target}")),
            Ok(_) => {}
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn toggle_reflection(&mut self) {
        let MapParams::Ifs(p) = *self.engine.params() else {
            self.set_status("reflection only applies to IFS");
            return;
        };
        let conj = if p.reflect() { 0.0 } else { 1.0 };
        match self.engine.set_field("conj", conj) {
            Ok(_) => {
                let style = if conj == 1.0 { "dihedral" } else { "cyclic" };
                self.set_status(format!("symmetry: {style}"));
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn write_params(&mut self) {
        let name = self.presets.get(self.preset_idx).map(|p| p.name.clone());
        let params = *self.engine.params();
        let path = self.params_out.clone();
        match preset::save_params(&path, name.as_deref(), &params) {
            Ok(()) => self.set_status(format!("wrote {}", path.display())),
            Err(e) => {
                log::warn!("save params to {}: {e}", path.display());
                self.set_status(format!("save failed: {e}"));
            }
        }
    }

    fn write_snapshot(&mut self) {
        let path = self.snapshot_out.clone();
        if self.engine.surface().is_empty() {
            self.set_status("nothing to snapshot");
            return;
        }
        match self.engine.surface().write_ppm(&path) {
            Ok(()) => self.set_status(format!("wrote {}", path.display())),
            Err(e) => {
                log::warn!("snapshot: {e:#}");
                self.set_status(format!("snapshot failed: {e}"));
            }
        }
    }

    /// Re-reads the preset file. A rejected file leaves the active list and
    /// parameters untouched.
    fn reload_presets(&mut self) {
        let Some(path) = self.presets_file.clone() else {
            self.set_status("no preset file given (--presets-file)");
            return;
        };
        match load_preset_file(&path, self.kind) {
            Ok((kind, list)) => {
                let count = list.len();
                self.file_presets = Some((kind, list));
                self.kind = kind;
                self.presets = collect_presets(kind, self.file_presets.as_ref());
                self.preset_idx = 0;
                self.apply_preset(self.keep_canvas);
                self.set_status(format!("reloaded {count} presets"));
            }
            Err(e) => {
                log::warn!("rejected preset file {}: {e}", path.display());
                self.set_status(format!("preset file rejected: {e}"));
            }
        }
    }

    pub fn hud(&self, cols: usize, fps: f32, renderer: &str) -> String {
        let engine = self.engine();
        let preset_name = self
            .presets
            .get(self.preset_idx)
            .map_or("custom", |p| p.name.as_str());
        let counters = engine.counters();
        let state = if !engine.is_sized() {
            "no surface"
        } else if engine.is_running() {
            "running"
        } else {
            "paused"
        };
        let lines = [
            format!(
                "{} | {} ({}/{}) | {} | speed {} (batch {}) | {}",
                self.kind.label(),
                preset_name,
                self.preset_idx + 1,
                self.presets.len(),
                engine.mode().label(),
                engine.speed(),
                self.last_stats.batch,
                state,
            ),
            format!(
                "iter {} | plotted {} | {}={} | keep {} | fps {:>4.1} | {}",
                compact_count(counters.iterations),
                compact_count(counters.plotted),
                MapParams::symmetry_field(self.kind),
                engine.params().symmetry(),
                if self.keep_canvas { "on" } else { "off" },
                fps,
                renderer,
            ),
            match self.status() {
                Some(s) => s.to_string(),
                None => "space pause | r/R restart | c clear | ←/→ preset | m map | v mode | ↑/↓ speed | [/] symmetry | h help | q quit".to_string(),
            },
        ];
        lines
            .iter()
            .map(|l| l.chars().take(cols.max(1)).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    // stderr belongs to the screen while the TUI is up.
    let _quiet = cfg.log_file.is_none().then(StderrLogPause::new);

    let mut app = App::new(&cfg);
    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer = render::renderer_for(cfg.renderer);

    let mut size = TerminalGuard::size()?;
    if size.0 < 4 || size.1 < 2 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            size.0,
            size.1
        ));
    }
    let mut layout = Layout::new(size, app.show_hud());
    app.layout(layout, cfg.renderer);

    let mut fps = FpsCounter::new();
    let frame_budget = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);

    'frames: loop {
        let now = Instant::now();
        let mut relayout = false;

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    match app.handle_key(k.code, k.modifiers) {
                        KeyAction::Quit => break 'frames,
                        KeyAction::Relayout => relayout = true,
                        KeyAction::Continue => {}
                    }
                }
                Event::Resize(c, r) => {
                    size = (c.max(1), r.max(1));
                    relayout = true;
                }
                _ => {}
            }
        }

        // Some terminals drop resize events.
        let polled = TerminalGuard::size()?;
        if polled != size {
            size = polled;
            relayout = true;
        }
        if relayout {
            layout = Layout::new(size, app.show_hud());
            app.layout(layout, cfg.renderer);
            TerminalGuard::clear(out.get_mut())?;
        }

        app.tick();

        let hud = if app.show_hud() {
            app.hud(layout.cols as usize, fps.fps(), renderer.name())
        } else {
            String::new()
        };
        let help = help_popup_text();
        let surface = app.engine().surface();
        let frame = Frame {
            term_cols: layout.cols,
            term_rows: layout.rows,
            visual_rows: layout.visual_rows,
            pixel_width: surface.width(),
            pixel_height: surface.height(),
            pixels_rgba: surface.pixels(),
            hud: &hud,
            hud_rows: layout.hud_rows,
            overlay: app.show_help().then_some(help),
            sync_updates: cfg.sync_updates,
        };

        if app.engine().is_sized() {
            renderer.render(&frame, &mut out)?;
        } else {
            draw_unsized(&frame, &mut out)?;
        }

        fps.tick();
        let elapsed = now.elapsed();
        if elapsed < frame_budget {
            std::thread::sleep(frame_budget - elapsed);
        }
    }

    renderer.cleanup(&mut out)?;
    out.flush()?;
    app.teardown();
    Ok(())
}

fn load_preset_file(
    path: &Path,
    fallback: MapKind,
) -> Result<(MapKind, Vec<Preset>), PresetError> {
    let text = std::fs::read_to_string(path).map_err(|e| PresetError::Io(e.to_string()))?;
    let kind = preset::detect_kind(&text).unwrap_or(fallback);
    let list = preset::parse_presets(kind, &text)?;
    log::info!(
        "loaded {} {} presets from {}",
        list.len(),
        kind.tag(),
        path.display()
    );
    Ok((kind, list))
}

/// File presets for `kind` first, then the built-in table.
fn collect_presets(kind: MapKind, file: Option<&(MapKind, Vec<Preset>)>) -> Vec<Preset> {
    let mut out = Vec::new();
    if let Some((file_kind, list)) = file {
        if *file_kind == kind {
            out.extend(list.iter().cloned());
        }
    }
    out.extend(preset::builtin_presets(kind));
    out
}

fn draw_unsized(frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    out.write_all(b"\x1b[H\x1b[0m\x1b[2J")?;
    write!(
        out,
        "no drawable surface at {}x{} cells; resize the terminal",
        frame.term_cols, frame.visual_rows
    )?;
    for (i, line) in frame.hud.lines().take(frame.hud_rows as usize).enumerate() {
        write!(out, "\x1b[{};1H{line}", frame.visual_rows as usize + i + 1)?;
    }
    out.flush()?;
    Ok(())
}

/// `1234` -> `1.2k`, `5_600_000` -> `5.6M`.
pub fn compact_count(n: u64) -> String {
    match n {
        0..=999 => n.to_string(),
        1_000..=999_999 => format!("{:.1}k", n as f64 / 1e3),
        1_000_000..=999_999_999 => format!("{:.1}M", n as f64 / 1e6),
        _ => format!("{:.1}G", n as f64 / 1e9),
    }
}

pub fn help_popup_text() -> &'static str {
    "symchaos hotkeys\n\
space  pause / resume\n\
r  restart orbit (clears canvas)\n\
R  restart orbit, keep canvas\n\
c  clear canvas\n\
←/→  previous/next preset\n\
m  next map family (IFS / Quilt / Icon)\n\
v  next render mode (chalk / glow / histogram)\n\
↑/↓  speed +/- 5\n\
[ / ]  symmetry degree or tiling period -/+ 1\n\
x  toggle IFS reflection (cyclic / dihedral)\n\
k  keep canvas when changing presets\n\
w  write current parameters as JSON\n\
o  write PPM snapshot\n\
l  reload preset file\n\
i  show/hide HUD\n\
? or h or F1  toggle this help\n\
q or esc  quit"
}

/// Silences the global logger until dropped, restoring the previous level.
struct StderrLogPause {
    previous: log::LevelFilter,
}

impl StderrLogPause {
    fn new() -> Self {
        let previous = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        Self { previous }
    }
}

impl Drop for StderrLogPause {
    fn drop(&mut self) {
        log::set_max_level(self.previous);
    }
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let dt = self.last.elapsed().as_secs_f32();
        if dt >= 0.5 {
            self.fps = self.frames as f32 / dt;
            self.frames = 0;
            self.last = Instant::now();
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
