//! Map coefficients and the parameter store the frame driver reads every tick.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound for the rotational symmetry degree. Keeps the trig table and the
/// icon power loop bounded for absurd inputs.
pub const MAX_SYMMETRY_DEGREE: usize = 1024;
/// Upper bound for the quilt tiling period (each point produces period² marks).
pub const MAX_TILING_PERIOD: usize = 64;

/// Map family. Also the `--map` value on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MapKind {
    /// Affine map with n-fold rotational (and optional mirror) symmetry.
    #[value(alias = "fractal")]
    Ifs,
    /// Periodic square-quilt recurrence on the unit torus.
    #[value(alias = "tile")]
    Quilt,
    /// Symmetric icon polynomial recurrence.
    #[value(alias = "attractor")]
    Icon,
}

impl MapKind {
    pub const fn all() -> [Self; 3] {
        [Self::Ifs, Self::Quilt, Self::Icon]
    }

    pub fn next(self) -> Self {
        match self {
            Self::Ifs => Self::Quilt,
            Self::Quilt => Self::Icon,
            Self::Icon => Self::Ifs,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ifs => "IFS",
            Self::Quilt => "Quilt",
            Self::Icon => "Icon",
        }
    }

    /// Lowercase tag used in saved parameter files.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Ifs => "ifs",
            Self::Quilt => "quilt",
            Self::Icon => "icon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IfsParams {
    pub a11: f64,
    pub a12: f64,
    pub a21: f64,
    pub a22: f64,
    pub b1: f64,
    pub b2: f64,
    pub n: f64,
    /// 1 enables the random reflection (dihedral symmetry), anything else is cyclic.
    pub conj: f64,
    pub scale: f64,
}

impl Default for IfsParams {
    fn default() -> Self {
        Self {
            a11: 0.4,
            a12: 0.35,
            a21: 0.2,
            a22: 0.4,
            b1: 0.0,
            b2: 0.4,
            n: 3.0,
            conj: 1.0,
            scale: 1.0,
        }
    }
}

impl IfsParams {
    pub fn degree(&self) -> usize {
        floor_count(self.n, 1, MAX_SYMMETRY_DEGREE)
    }

    pub fn reflect(&self) -> bool {
        self.conj == 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuiltParams {
    pub lambda: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub omega: f64,
    /// Linear drift coefficient.
    pub ma: f64,
    pub shift: f64,
    pub nperiod: f64,
}

impl Default for QuiltParams {
    fn default() -> Self {
        Self {
            lambda: -0.59,
            alpha: 0.2,
            beta: 0.1,
            gamma: -0.09,
            omega: 0.0,
            ma: 0.0,
            shift: 0.0,
            nperiod: 3.0,
        }
    }
}

impl QuiltParams {
    pub fn period(&self) -> usize {
        floor_count(self.nperiod, 1, MAX_TILING_PERIOD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IconParams {
    pub lambda: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub omega: f64,
    pub n: f64,
    pub scale: f64,
}

impl Default for IconParams {
    fn default() -> Self {
        Self {
            lambda: -1.8,
            alpha: 2.0,
            beta: 0.0,
            gamma: 1.0,
            omega: 0.0,
            n: 4.0,
            scale: 1.0,
        }
    }
}

impl IconParams {
    pub fn degree(&self) -> usize {
        floor_count(self.n, 1, MAX_SYMMETRY_DEGREE)
    }
}

fn floor_count(v: f64, min: usize, max: usize) -> usize {
    if !v.is_finite() {
        return min;
    }
    (v.floor().max(min as f64) as usize).min(max)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "map", rename_all = "lowercase")]
pub enum MapParams {
    Ifs(IfsParams),
    Quilt(QuiltParams),
    Icon(IconParams),
}

impl MapParams {
    pub fn default_for(kind: MapKind) -> Self {
        match kind {
            MapKind::Ifs => Self::Ifs(IfsParams::default()),
            MapKind::Quilt => Self::Quilt(QuiltParams::default()),
            MapKind::Icon => Self::Icon(IconParams::default()),
        }
    }

    pub fn kind(&self) -> MapKind {
        match self {
            Self::Ifs(_) => MapKind::Ifs,
            Self::Quilt(_) => MapKind::Quilt,
            Self::Icon(_) => MapKind::Icon,
        }
    }

    /// Field names in display order.
    pub fn field_names(kind: MapKind) -> &'static [&'static str] {
        match kind {
            MapKind::Ifs => &["a11", "a12", "a21", "a22", "b1", "b2", "n", "conj", "scale"],
            MapKind::Quilt => &[
                "lambda", "alpha", "beta", "gamma", "omega", "ma", "shift", "nperiod",
            ],
            MapKind::Icon => &["lambda", "alpha", "beta", "gamma", "omega", "n", "scale"],
        }
    }

    /// Fields whose change alters the attractor discontinuously.
    pub fn is_structural(kind: MapKind, field: &str) -> bool {
        match kind {
            MapKind::Ifs => matches!(field, "n" | "conj"),
            MapKind::Quilt => field == "nperiod",
            MapKind::Icon => field == "n",
        }
    }

    /// The integer symmetry degree (IFS/icon) or tiling period (quilt).
    pub fn symmetry(&self) -> usize {
        match self {
            Self::Ifs(p) => p.degree(),
            Self::Quilt(p) => p.period(),
            Self::Icon(p) => p.degree(),
        }
    }

    /// Name of the field holding [`MapParams::symmetry`].
    pub fn symmetry_field(kind: MapKind) -> &'static str {
        match kind {
            MapKind::Quilt => "nperiod",
            MapKind::Ifs | MapKind::Icon => "n",
        }
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        let v = match self {
            Self::Ifs(p) => match field {
                "a11" => p.a11,
                "a12" => p.a12,
                "a21" => p.a21,
                "a22" => p.a22,
                "b1" => p.b1,
                "b2" => p.b2,
                "n" => p.n,
                "conj" => p.conj,
                "scale" => p.scale,
                _ => return None,
            },
            Self::Quilt(p) => match field {
                "lambda" => p.lambda,
                "alpha" => p.alpha,
                "beta" => p.beta,
                "gamma" => p.gamma,
                "omega" => p.omega,
                "ma" => p.ma,
                "shift" => p.shift,
                "nperiod" => p.nperiod,
                _ => return None,
            },
            Self::Icon(p) => match field {
                "lambda" => p.lambda,
                "alpha" => p.alpha,
                "beta" => p.beta,
                "gamma" => p.gamma,
                "omega" => p.omega,
                "n" => p.n,
                "scale" => p.scale,
                _ => return None,
            },
        };
        Some(v)
    }

    /// Raw field write without change tracking. Returns false for unknown names.
    pub fn set(&mut self, field: &str, value: f64) -> bool {
        match self.slot_mut(field) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn slot_mut(&mut self, field: &str) -> Option<&mut f64> {
        let slot = match self {
            Self::Ifs(p) => match field {
                "a11" => &mut p.a11,
                "a12" => &mut p.a12,
                "a21" => &mut p.a21,
                "a22" => &mut p.a22,
                "b1" => &mut p.b1,
                "b2" => &mut p.b2,
                "n" => &mut p.n,
                "conj" => &mut p.conj,
                "scale" => &mut p.scale,
                _ => return None,
            },
            Self::Quilt(p) => match field {
                "lambda" => &mut p.lambda,
                "alpha" => &mut p.alpha,
                "beta" => &mut p.beta,
                "gamma" => &mut p.gamma,
                "omega" => &mut p.omega,
                "ma" => &mut p.ma,
                "shift" => &mut p.shift,
                "nperiod" => &mut p.nperiod,
                _ => return None,
            },
            Self::Icon(p) => match field {
                "lambda" => &mut p.lambda,
                "alpha" => &mut p.alpha,
                "beta" => &mut p.beta,
                "gamma" => &mut p.gamma,
                "omega" => &mut p.omega,
                "n" => &mut p.n,
                "scale" => &mut p.scale,
                _ => return None,
            },
        };
        Some(slot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    UnknownField { map: MapKind, field: String },
    NotFinite { field: String },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { map, field } => {
                write!(f, "unknown {} parameter: {field}", map.label())
            }
            Self::NotFinite { field } => write!(f, "{field} must be a finite number"),
        }
    }
}

impl std::error::Error for ParamError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    /// Value did not change.
    Unchanged,
    Coefficient,
    /// Symmetry degree, reflection flag or tiling period changed: the orbit and
    /// accumulated buffers are stale.
    Structural,
}

/// Holds the active coefficients. Replacement is atomic: readers only ever see a
/// complete parameter set.
#[derive(Debug, Clone)]
pub struct ParamStore {
    current: MapParams,
    revision: u64,
    structural_pending: bool,
}

impl ParamStore {
    pub fn new(params: MapParams) -> Self {
        Self {
            current: params,
            revision: 0,
            structural_pending: false,
        }
    }

    pub fn current(&self) -> &MapParams {
        &self.current
    }

    pub fn kind(&self) -> MapKind {
        self.current.kind()
    }

    /// Bumped on every accepted change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn replace(&mut self, params: MapParams) {
        self.current = params;
        self.revision = self.revision.wrapping_add(1);
        self.structural_pending = true;
    }

    pub fn set_field(&mut self, field: &str, value: f64) -> Result<FieldChange, ParamError> {
        let kind = self.current.kind();
        if !value.is_finite() {
            return Err(ParamError::NotFinite {
                field: field.to_string(),
            });
        }
        let before_symmetry = self.current.symmetry();
        let before_reflect = match &self.current {
            MapParams::Ifs(p) => p.reflect(),
            _ => false,
        };
        let slot = self
            .current
            .slot_mut(field)
            .ok_or_else(|| ParamError::UnknownField {
                map: kind,
                field: field.to_string(),
            })?;
        if *slot == value {
            return Ok(FieldChange::Unchanged);
        }
        *slot = value;
        self.revision = self.revision.wrapping_add(1);

        if !MapParams::is_structural(kind, field) {
            return Ok(FieldChange::Coefficient);
        }
        // Only a change of the effective integer degree/flag restarts the orbit.
        let after_reflect = match &self.current {
            MapParams::Ifs(p) => p.reflect(),
            _ => false,
        };
        if self.current.symmetry() == before_symmetry && after_reflect == before_reflect {
            return Ok(FieldChange::Coefficient);
        }
        self.structural_pending = true;
        Ok(FieldChange::Structural)
    }

    pub fn nudge_field(&mut self, field: &str, delta: f64) -> Result<FieldChange, ParamError> {
        let kind = self.current.kind();
        let value = self
            .current
            .get(field)
            .ok_or_else(|| ParamError::UnknownField {
                map: kind,
                field: field.to_string(),
            })?;
        self.set_field(field, value + delta)
    }

    /// Consumes the structural-change signal.
    pub fn take_structural_change(&mut self) -> bool {
        std::mem::take(&mut self.structural_pending)
    }

    pub fn structural_change_pending(&self) -> bool {
        self.structural_pending
    }
}
