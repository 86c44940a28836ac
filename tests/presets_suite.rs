use serde_json::json;
use symchaos::config::MapKind;
use symchaos::params::{IconParams, IfsParams, MapParams, QuiltParams};
use symchaos::preset::{
    PresetError, builtin_presets, detect_kind, find_preset, load_presets, parse_presets,
    parse_shift, save_params,
};

fn temp_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("symchaos-{tag}-{}.json", std::process::id()))
}

#[test]
fn parses_array_of_ifs_objects() {
    let text = r#"[
        {"name": "Tri", "a11": 0.4, "a12": 0.35, "a21": 0.2, "a22": 0.4, "b1": 0, "b2": 0.4, "n": 3, "conj": 1, "scale": 1},
        {"a11": -0.1, "a12": 0.35, "a21": 0.2, "a22": 0.5, "b1": 0.5, "b2": 0.4, "n": 5, "conj": 0, "scale": 0.8, "figure": "4.12"}
    ]"#;
    let presets = parse_presets(MapKind::Ifs, text).expect("valid file");
    assert_eq!(presets.len(), 2);
    assert_eq!(presets[0].name, "Tri");
    assert_eq!(presets[0].params, MapParams::Ifs(IfsParams::default()));
    assert_eq!(presets[1].figure.as_deref(), Some("4.12"));
    assert_eq!(presets[1].name, "IFS fig. 4.12");
    let MapParams::Ifs(p) = presets[1].params else {
        panic!("wrong family");
    };
    assert_eq!(p.degree(), 5);
    assert!(!p.reflect());
}

#[test]
fn parses_single_object_and_saved_wrapper() {
    let single = json!({
        "lambda": -2.7, "alpha": 5, "beta": 1.5, "gamma": 1, "omega": 0, "n": 6, "scale": 1
    });
    let presets = parse_presets(MapKind::Icon, &single.to_string()).expect("object");
    assert_eq!(presets.len(), 1);
    assert_eq!(presets[0].name, "Icon #1");

    let wrapped = json!({
        "id": "a1b2", "name": "Halloween", "timestamp": 1700000000,
        "params": {"lambda": -2.7, "alpha": 5, "beta": 1.5, "gamma": 1, "omega": 0, "n": 6, "scale": 1}
    });
    let presets = parse_presets(MapKind::Icon, &wrapped.to_string()).expect("wrapper");
    assert_eq!(presets[0].name, "Halloween");
    assert_eq!(
        presets[0].params,
        MapParams::Icon(IconParams {
            lambda: -2.7,
            alpha: 5.0,
            beta: 1.5,
            gamma: 1.0,
            omega: 0.0,
            n: 6.0,
            scale: 1.0,
        })
    );
}

#[test]
fn parses_quilt_tables_with_fraction_shift() {
    let text = json!({
        "tables": [
            {"data": [
                {"name": "Sugar", "lambda": -0.59, "alpha": 0.2, "beta": 0.1, "gamma": -0.27, "shift": "1/2"},
                {"lambda": -0.2, "alpha": -0.1, "beta": 0.1, "gamma": -0.25, "ma": 2, "shift": "0.5", "nperiod": 4}
            ]},
            {"data": [
                {"figure": 7, "lambda": 0.25, "alpha": -0.3, "beta": 0.2, "gamma": 0.3, "omega": 0.07, "shift": 0}
            ]}
        ]
    })
    .to_string();
    let presets = parse_presets(MapKind::Quilt, &text).expect("tables");
    assert_eq!(presets.len(), 3);

    let MapParams::Quilt(first) = presets[0].params else {
        panic!("wrong family");
    };
    assert_eq!(first.shift, 0.5);
    assert_eq!(first.nperiod, 3.0, "nperiod defaults to 3");
    assert_eq!(first.omega, 0.0);
    assert_eq!(first.ma, 0.0);

    let MapParams::Quilt(second) = presets[1].params else {
        panic!("wrong family");
    };
    assert_eq!(second.shift, 0.5);
    assert_eq!(second.ma, 2.0);
    assert_eq!(second.period(), 4);

    assert_eq!(presets[2].name, "Quilt fig. 7");
    let MapParams::Quilt(third) = presets[2].params else {
        panic!("wrong family");
    };
    assert_eq!(third.omega, 0.07);
}

#[test]
fn shift_parser_accepts_numbers_decimals_and_fractions() {
    assert_eq!(parse_shift(&json!("1/2")), Some(0.5));
    assert_eq!(parse_shift(&json!(" 3 / 4 ")), Some(0.75));
    assert_eq!(parse_shift(&json!("0.25")), Some(0.25));
    assert_eq!(parse_shift(&json!(0.5)), Some(0.5));
    assert_eq!(parse_shift(&json!("1/0")), None);
    assert_eq!(parse_shift(&json!("half")), None);
    assert_eq!(parse_shift(&json!(true)), None);
}

#[test]
fn missing_field_rejects_whole_file() {
    let text = json!([
        {"lambda": -1.8, "alpha": 2, "beta": 0, "gamma": 1, "omega": 0, "n": 4, "scale": 1},
        {"lambda": -1.8, "alpha": 2, "beta": 0, "gamma": 1, "omega": 0, "scale": 1}
    ])
    .to_string();
    assert_eq!(
        parse_presets(MapKind::Icon, &text),
        Err(PresetError::MissingField {
            index: 1,
            field: "n"
        })
    );
}

#[test]
fn non_numeric_field_is_rejected() {
    let text = json!({
        "a11": "0.4", "a12": 0.35, "a21": 0.2, "a22": 0.4, "b1": 0, "b2": 0.4, "n": 3, "conj": 1, "scale": 1
    })
    .to_string();
    assert_eq!(
        parse_presets(MapKind::Ifs, &text),
        Err(PresetError::NotNumeric {
            index: 0,
            field: "a11"
        })
    );

    let table = json!({"tables": [{"data": [
        {"lambda": -0.59, "alpha": 0.2, "beta": 0.1, "gamma": -0.27, "shift": "a/b"}
    ]}]})
    .to_string();
    assert!(matches!(
        parse_presets(MapKind::Quilt, &table),
        Err(PresetError::BadShift { index: 0, .. })
    ));
}

#[test]
fn malformed_layouts_are_reported() {
    assert!(matches!(
        parse_presets(MapKind::Ifs, "{not json"),
        Err(PresetError::Json(_))
    ));
    assert_eq!(parse_presets(MapKind::Ifs, "[]"), Err(PresetError::Empty));
    assert!(matches!(
        parse_presets(MapKind::Ifs, "42"),
        Err(PresetError::Shape(_))
    ));
    assert!(matches!(
        parse_presets(MapKind::Icon, r#"{"tables": []}"#),
        Err(PresetError::Shape(_))
    ));
    assert!(matches!(
        parse_presets(MapKind::Quilt, r#"{"tables": [{"rows": []}]}"#),
        Err(PresetError::Shape(_))
    ));
    assert!(matches!(
        parse_presets(MapKind::Quilt, "[1, 2]"),
        Err(PresetError::Shape(_))
    ));
}

#[test]
fn family_tag_must_match() {
    let text = serde_json::to_string(&MapParams::Icon(IconParams::default())).expect("json");
    assert_eq!(detect_kind(&text), Some(MapKind::Icon));
    assert_eq!(
        parse_presets(MapKind::Quilt, &text),
        Err(PresetError::WrongMap {
            expected: MapKind::Quilt,
            found: "icon".to_string()
        })
    );
    assert_eq!(detect_kind("[]"), None);
}

#[test]
fn saved_params_load_back_exactly() {
    let params = MapParams::Quilt(QuiltParams {
        lambda: -0.589,
        alpha: 0.2,
        beta: 0.04,
        gamma: -0.2,
        omega: 0.07,
        ma: 0.0,
        shift: 0.5,
        nperiod: 5.0,
    });
    let path = temp_path("roundtrip");
    save_params(&path, Some("Red Tiles"), &params).expect("save");
    let loaded = load_presets(MapKind::Quilt, &path).expect("load");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "Red Tiles");
    assert_eq!(loaded[0].params, params);
    assert!(!path.with_extension("tmp").exists());
}

/// Finite values spread over the whole exponent range, plus short decimals
/// scaled by small and large powers of ten.
fn awkward_f64(rng: &mut fastrand::Rng) -> f64 {
    loop {
        let v = if rng.bool() {
            f64::from_bits(rng.u64(..))
        } else {
            (rng.f64() - 0.5) * 10f64.powi(rng.i32(-300..=300))
        };
        if v.is_finite() {
            return v;
        }
    }
}

#[test]
fn saved_params_keep_every_bit() {
    let mut rng = fastrand::Rng::with_seed(0x5eed_f10a7);
    let path = temp_path("bits");
    let mut checked = 0;
    for _ in 0..400 {
        let mut params = MapParams::Icon(IconParams::default());
        for field in MapParams::field_names(MapKind::Icon) {
            params.set(field, awkward_f64(&mut rng));
        }
        save_params(&path, None, &params).expect("save");
        let text = std::fs::read_to_string(&path).expect("read back");
        let loaded = parse_presets(MapKind::Icon, &text).expect("parse");
        for field in MapParams::field_names(MapKind::Icon) {
            let wrote = params.get(field).expect("field");
            let read = loaded[0].params.get(field).expect("field");
            assert_eq!(read.to_bits(), wrote.to_bits(), "{field}: {wrote:e} came back as {read:e}");
            checked += 1;
        }
    }
    let _ = std::fs::remove_file(&path);
    assert_eq!(checked, 400 * 7);
}

#[test]
fn missing_file_is_an_io_error() {
    let path = temp_path("does-not-exist");
    assert!(matches!(
        load_presets(MapKind::Ifs, &path),
        Err(PresetError::Io(_))
    ));
}

#[test]
fn find_preset_by_index_or_name() {
    let presets = builtin_presets(MapKind::Quilt);
    assert_eq!(find_preset(&presets, "2"), Some(1));
    assert_eq!(find_preset(&presets, "0"), None);
    assert_eq!(find_preset(&presets, "99"), None);
    assert_eq!(find_preset(&presets, "roses"), Some(3));
    assert_eq!(find_preset(&presets, "cathedral"), Some(8));
    assert_eq!(find_preset(&presets, "nothing like this"), None);
}

#[test]
fn builtin_tables_cover_every_family() {
    let quilts = builtin_presets(MapKind::Quilt);
    assert_eq!(quilts.len(), 12);
    assert_eq!(quilts[0].name, "Emerald Mosaic");
    assert!(quilts.iter().all(|p| p.params.symmetry() == 3));

    for kind in MapKind::all() {
        let presets = builtin_presets(kind);
        assert!(!presets.is_empty());
        for p in &presets {
            assert_eq!(p.params.kind(), kind, "{}", p.name);
            for field in MapParams::field_names(kind) {
                let v = p.params.get(field).expect("field exists");
                assert!(v.is_finite(), "{}.{field}", p.name);
            }
        }
    }
}

#[test]
fn error_messages_are_readable() {
    let err = PresetError::MissingField {
        index: 2,
        field: "gamma",
    };
    assert_eq!(err.to_string(), "entry 3: missing required field 'gamma'");
    assert_eq!(PresetError::Empty.to_string(), "no presets in file");
}
