//! Planar symmetric chaos renderers: IFS rosettes with cyclic or dihedral
//! symmetry, square quilts and symmetric icons, accumulated into an RGBA
//! surface by direct plotting or a log-density histogram.

pub mod accum;
pub mod app;
pub mod chaos;
pub mod config;
pub mod driver;
pub mod params;
pub mod preset;
pub mod render;
pub mod terminal;
