//! Named parameter sets: built-in tables per map family and JSON preset files.

use crate::params::{IconParams, IfsParams, MapKind, MapParams, QuiltParams};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    /// Figure reference from the source table, when there is one.
    pub figure: Option<String>,
    pub params: MapParams,
}

impl Preset {
    pub fn new(name: impl Into<String>, params: MapParams) -> Self {
        Self {
            name: name.into(),
            figure: None,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresetError {
    Io(String),
    Json(String),
    Shape(String),
    MissingField { index: usize, field: &'static str },
    NotNumeric { index: usize, field: &'static str },
    BadShift { index: usize, value: String },
    WrongMap { expected: MapKind, found: String },
    Empty,
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Json(msg) => write!(f, "invalid JSON: {msg}"),
            Self::Shape(msg) => write!(f, "unexpected preset layout: {msg}"),
            Self::MissingField { index, field } => {
                write!(f, "entry {}: missing required field '{field}'", index + 1)
            }
            Self::NotNumeric { index, field } => {
                write!(f, "entry {}: field '{field}' is not a number", index + 1)
            }
            Self::BadShift { index, value } => {
                write!(f, "entry {}: cannot read shift '{value}'", index + 1)
            }
            Self::WrongMap { expected, found } => {
                write!(f, "file holds '{found}' parameters, expected '{}'", expected.tag())
            }
            Self::Empty => write!(f, "no presets in file"),
        }
    }
}

impl std::error::Error for PresetError {}

/// Quilt table rows only have to carry the four trig coefficients.
const TABLE_REQUIRED: [&str; 4] = ["lambda", "alpha", "beta", "gamma"];
const TABLE_DEFAULT_PERIOD: f64 = 3.0;

/// Parses a preset file for one map family.
///
/// Accepts a single parameter object, an array of them, a saved-preset wrapper
/// (`{"name": .., "params": {..}}`) or, for quilts, a `{"tables": [{"data":
/// [..]}]}` collection. Any invalid entry rejects the whole file.
pub fn parse_presets(kind: MapKind, text: &str) -> Result<Vec<Preset>, PresetError> {
    let root: Value = serde_json::from_str(text).map_err(|e| PresetError::Json(e.to_string()))?;

    let mut out = Vec::new();
    match &root {
        Value::Object(obj) if obj.contains_key("tables") => {
            if kind != MapKind::Quilt {
                return Err(PresetError::Shape(format!(
                    "table collections are only defined for quilts, not {}",
                    kind.label()
                )));
            }
            for entry in table_rows(obj)? {
                let index = out.len();
                out.push(parse_table_row(index, entry)?);
            }
        }
        Value::Object(_) => out.push(parse_entry(kind, 0, &root)?),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                out.push(parse_entry(kind, index, item)?);
            }
        }
        other => {
            return Err(PresetError::Shape(format!(
                "expected an object or array, found {}",
                json_type(other)
            )));
        }
    }

    if out.is_empty() {
        return Err(PresetError::Empty);
    }
    Ok(out)
}

pub fn load_presets(kind: MapKind, path: &Path) -> Result<Vec<Preset>, PresetError> {
    let text = std::fs::read_to_string(path).map_err(|e| PresetError::Io(e.to_string()))?;
    let presets = parse_presets(kind, &text)?;
    log::info!(
        "loaded {} {} presets from {}",
        presets.len(),
        kind.tag(),
        path.display()
    );
    Ok(presets)
}

/// Family tag of a saved parameter file, if it carries one.
pub fn detect_kind(text: &str) -> Option<MapKind> {
    let root: Value = serde_json::from_str(text).ok()?;
    let first = match &root {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let tag = first.get("map")?.as_str()?;
    MapKind::all().into_iter().find(|k| k.tag() == tag)
}

/// Writes `params` as pretty JSON, through a temp file and a rename.
pub fn save_params(path: &Path, name: Option<&str>, params: &MapParams) -> Result<(), PresetError> {
    let mut value = serde_json::to_value(params).map_err(|e| PresetError::Json(e.to_string()))?;
    if let (Some(name), Value::Object(obj)) = (name, &mut value) {
        obj.insert("name".to_string(), Value::String(name.to_string()));
    }
    let mut body =
        serde_json::to_string_pretty(&value).map_err(|e| PresetError::Json(e.to_string()))?;
    body.push('\n');

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &body).map_err(|e| PresetError::Io(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| PresetError::Io(e.to_string()))
}

/// Reads a tiling shift: a number, a decimal string or a fraction like `"1/2"`.
pub fn parse_shift(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            match s.split_once('/') {
                Some((num, den)) => {
                    let num: f64 = num.trim().parse().ok()?;
                    let den: f64 = den.trim().parse().ok()?;
                    if den == 0.0 {
                        return None;
                    }
                    num / den
                }
                None => s.parse().ok()?,
            }
        }
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Finds a preset by 1-based index or by case-insensitive (partial) name.
pub fn find_preset(presets: &[Preset], query: &str) -> Option<usize> {
    let query = query.trim();
    if let Ok(n) = query.parse::<usize>() {
        return (1..=presets.len()).contains(&n).then(|| n - 1);
    }
    let needle = query.to_ascii_lowercase();
    presets
        .iter()
        .position(|p| p.name.to_ascii_lowercase() == needle)
        .or_else(|| {
            presets
                .iter()
                .position(|p| p.name.to_ascii_lowercase().contains(&needle))
        })
}

fn table_rows(obj: &Map<String, Value>) -> Result<Vec<&Value>, PresetError> {
    let tables = obj
        .get("tables")
        .and_then(Value::as_array)
        .ok_or_else(|| PresetError::Shape("'tables' must be an array".to_string()))?;
    let mut rows = Vec::new();
    for (t, table) in tables.iter().enumerate() {
        let data = table
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| PresetError::Shape(format!("table {} has no 'data' array", t + 1)))?;
        rows.extend(data.iter());
    }
    Ok(rows)
}

fn parse_entry(kind: MapKind, index: usize, entry: &Value) -> Result<Preset, PresetError> {
    let obj = entry.as_object().ok_or_else(|| {
        PresetError::Shape(format!(
            "entry {} is {}, expected an object",
            index + 1,
            json_type(entry)
        ))
    })?;

    // Saved-preset wrapper: metadata outside, coefficients under "params".
    if let Some(inner) = obj.get("params").filter(|v| v.is_object()) {
        let mut preset = parse_entry(kind, index, inner)?;
        if let Some(name) = obj.get("name").and_then(Value::as_str) {
            preset.name = name.to_string();
        }
        return Ok(preset);
    }

    if let Some(tag) = obj.get("map") {
        let found = tag.as_str().unwrap_or_default();
        if found != kind.tag() {
            return Err(PresetError::WrongMap {
                expected: kind,
                found: found.to_string(),
            });
        }
    }

    let mut params = MapParams::default_for(kind);
    for &field in MapParams::field_names(kind) {
        let value = obj
            .get(field)
            .ok_or(PresetError::MissingField { index, field })?;
        let v = value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or(PresetError::NotNumeric { index, field })?;
        params.set(field, v);
    }

    Ok(Preset {
        name: entry_name(obj, kind, index),
        figure: entry_figure(obj),
        params,
    })
}

fn parse_table_row(index: usize, entry: &Value) -> Result<Preset, PresetError> {
    let obj = entry.as_object().ok_or_else(|| {
        PresetError::Shape(format!(
            "table row {} is {}, expected an object",
            index + 1,
            json_type(entry)
        ))
    })?;

    let number = |field: &'static str| -> Result<Option<f64>, PresetError> {
        match obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or(PresetError::NotNumeric { index, field }),
        }
    };

    let mut p = QuiltParams {
        omega: 0.0,
        ma: 0.0,
        shift: 0.0,
        nperiod: TABLE_DEFAULT_PERIOD,
        ..QuiltParams::default()
    };
    for field in TABLE_REQUIRED {
        let v = number(field)?.ok_or(PresetError::MissingField { index, field })?;
        match field {
            "lambda" => p.lambda = v,
            "alpha" => p.alpha = v,
            "beta" => p.beta = v,
            _ => p.gamma = v,
        }
    }
    p.omega = number("omega")?.unwrap_or(0.0);
    p.ma = number("ma")?.unwrap_or(0.0);
    p.nperiod = number("nperiod")?.unwrap_or(TABLE_DEFAULT_PERIOD);
    if let Some(raw) = obj.get("shift").filter(|v| !v.is_null()) {
        p.shift = parse_shift(raw).ok_or_else(|| PresetError::BadShift {
            index,
            value: match raw {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })?;
    }

    Ok(Preset {
        name: entry_name(obj, MapKind::Quilt, index),
        figure: entry_figure(obj),
        params: MapParams::Quilt(p),
    })
}

fn entry_name(obj: &Map<String, Value>, kind: MapKind, index: usize) -> String {
    match obj.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => match entry_figure(obj) {
            Some(fig) => format!("{} fig. {fig}", kind.label()),
            None => format!("{} #{}", kind.label(), index + 1),
        },
    }
}

fn entry_figure(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("figure")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn builtin_presets(kind: MapKind) -> Vec<Preset> {
    match kind {
        MapKind::Ifs => ifs_presets(),
        MapKind::Quilt => quilt_presets(),
        MapKind::Icon => icon_presets(),
    }
}

fn ifs_presets() -> Vec<Preset> {
    let base = IfsParams::default();
    let variant = |n: f64, conj: f64| IfsParams { n, conj, ..base };
    vec![
        Preset::new("Dihedral Rosette", MapParams::Ifs(base)),
        Preset::new("Cyclic Pinwheel", MapParams::Ifs(variant(3.0, 0.0))),
        Preset::new("Pentagonal Lace", MapParams::Ifs(variant(5.0, 1.0))),
        Preset::new("Hexagonal Spiral", MapParams::Ifs(variant(6.0, 0.0))),
    ]
}

fn quilt_presets() -> Vec<Preset> {
    #[rustfmt::skip]
    const TABLE: [(&str, [f64; 7]); 12] = [
        // lambda, alpha, beta, gamma, omega, ma, shift
        ("Emerald Mosaic",       [-0.59,  0.2,  0.1,  -0.33,  0.0,   2.0, 0.0]),
        ("Sugar and Spice",      [-0.59,  0.2,  0.1,  -0.27,  0.0,   0.0, 0.5]),
        ("Sicilian Tile",        [-0.2,  -0.1,  0.1,  -0.25,  0.0,   0.0, 0.0]),
        ("Roses",                [ 0.25, -0.3,  0.2,   0.3,   0.0,   1.0, 0.0]),
        ("Wagonwheels",          [-0.28,  0.25, 0.05, -0.24,  0.0,  -1.0, 0.0]),
        ("Victorian Tiles",      [-0.12, -0.36, 0.18, -0.14,  0.0,   1.0, 0.5]),
        ("Mosque",               [ 0.1,   0.2,  0.1,   0.39,  0.0,  -1.0, 0.0]),
        ("Red Tiles",            [-0.589, 0.2,  0.04, -0.2,   0.0,   0.0, 0.5]),
        ("Cathedral Attractor",  [-0.28,  0.08, 0.45, -0.05,  0.0,   2.0, 0.5]),
        ("Gyroscopes",           [-0.59,  0.2,  0.2,   0.3,   0.0,   2.0, 0.0]),
        ("Cats Eyes",            [-0.28,  0.25, 0.05, -0.24,  0.0,  -1.0, 0.5]),
        ("Flowers with Ribbons", [-0.11, -0.26, 0.19, -0.059, 0.07,  2.0, 0.5]),
    ];
    TABLE
        .iter()
        .map(|(name, [lambda, alpha, beta, gamma, omega, ma, shift])| {
            Preset::new(
                *name,
                MapParams::Quilt(QuiltParams {
                    lambda: *lambda,
                    alpha: *alpha,
                    beta: *beta,
                    gamma: *gamma,
                    omega: *omega,
                    ma: *ma,
                    shift: *shift,
                    nperiod: TABLE_DEFAULT_PERIOD,
                }),
            )
        })
        .collect()
}

fn icon_presets() -> Vec<Preset> {
    #[rustfmt::skip]
    const TABLE: [(&str, [f64; 6]); 11] = [
        // lambda, alpha, beta, gamma, omega, n
        ("Starfish",          [-1.8,   2.0,    0.0,   1.0,   0.0,   4.0]),
        ("Swirling Pentagon", [-2.5,   5.0,   -1.9,   1.0,   0.188, 5.0]),
        ("Trefoil Drift",     [ 1.56, -1.0,    0.1,  -0.82,  0.12,  3.0]),
        ("Pentagram",         [-1.806, 1.806,  0.0,   1.0,   0.0,   5.0]),
        ("Clam Triple",       [-2.195, 10.0, -12.0,   1.0,   0.0,   3.0]),
        ("Triangle Web",      [ 2.5,  -2.5,    0.0,   0.9,   0.0,   3.0]),
        ("Nonagon Bloom",     [-2.05,  3.0,  -16.79,  1.0,   0.0,   9.0]),
        ("Halloween",         [-2.7,   5.0,    1.5,   1.0,   0.0,   6.0]),
        ("Coral Ring",        [ 2.409,-2.5,    0.0,   0.9,   0.0,  23.0]),
        ("Emperor's Cloak",   [-2.08,  1.0,   -0.1,   0.167, 0.0,   7.0]),
        ("Pentagonal Chain",  [-2.32,  2.32,   0.0,   0.75,  0.0,   5.0]),
    ];
    TABLE
        .iter()
        .map(|(name, [lambda, alpha, beta, gamma, omega, n])| {
            Preset::new(
                *name,
                MapParams::Icon(IconParams {
                    lambda: *lambda,
                    alpha: *alpha,
                    beta: *beta,
                    gamma: *gamma,
                    omega: *omega,
                    n: *n,
                    scale: 1.0,
                }),
            )
        })
        .collect()
}
