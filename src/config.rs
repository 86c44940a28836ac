pub use crate::accum::RenderMode;
pub use crate::params::MapKind;

use crate::accum::Rgb;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "symchaos",
    version,
    about = "Symmetric chaos renderer: IFS rosettes, square quilts and symmetric icons in the terminal"
)]
pub struct Config {
    #[arg(long, value_enum, default_value_t = MapKind::Icon)]
    pub map: MapKind,

    #[arg(long, value_enum, default_value_t = RenderMode::Histogram)]
    pub mode: RenderMode,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// Iteration speed, 1 (one point per second) to 100.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub speed: u32,

    /// Built-in or loaded preset, by index or by (partial) name.
    #[arg(long)]
    pub preset: Option<String>,

    /// JSON preset file for the selected map family.
    #[arg(long)]
    pub presets_file: Option<PathBuf>,

    /// Point color for chalk/glow modes.
    #[arg(long, default_value = "#34d399", value_parser = Rgb::parse_hex)]
    pub color: Rgb,

    #[arg(long, default_value = "#1e3a8a", value_parser = Rgb::parse_hex)]
    pub low: Rgb,

    #[arg(long, default_value = "#ef4444", value_parser = Rgb::parse_hex)]
    pub mid: Rgb,

    #[arg(long, default_value = "#fef08a", value_parser = Rgb::parse_hex)]
    pub high: Rgb,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=8))]
    pub point_size: u32,

    /// Seed for the symmetry PRNG; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the canvas when switching presets (points and buffers still reset).
    #[arg(long, default_value_t = false)]
    pub keep_canvas: bool,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, default_value = "symchaos-params.json")]
    pub params_out: PathBuf,

    #[arg(long, default_value = "symchaos-snapshot.ppm")]
    pub snapshot_out: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    #[value(alias = "hires", alias = "dots")]
    Braille,
    Kitty,
}

impl RendererMode {
    /// Surface pixels per terminal cell (columns, rows).
    pub fn cell_pixels(self) -> (usize, usize) {
        match self {
            Self::HalfBlock => (1, 2),
            Self::Braille => (2, 4),
            // Kitty gets the same density as braille but in full color per pixel.
            Self::Kitty => (2, 4),
        }
    }
}
