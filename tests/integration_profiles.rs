//! Integration tests for profile sources, validation, and splitting.

mod common;

use std::fs;

use microgrid_sim::config::ScenarioConfig;
use microgrid_sim::error::{EnvError, ProfileError};
use microgrid_sim::profile::split::{SplitRatios, split_profile_csv};
use microgrid_sim::profile::validation::validate_profiles_csv;
use microgrid_sim::profile::{CsvProfile, EpisodeProfile, StaticProfile};
use microgrid_sim::sim::engine::Environment;

fn write_profile_csv(dir: &std::path::Path, rows: usize) -> std::path::PathBuf {
    let path = dir.join("profiles.csv");
    let mut body =
        String::from("timestamp,renewable_kw,load_kw,price_import_per_kwh,price_export_per_kwh\n");
    for i in 0..rows {
        let minutes = i * 15;
        body.push_str(&format!(
            "2024-06-01 {:02}:{:02}:00,{},{},{:.2},{:.2}\n",
            minutes / 60,
            minutes % 60,
            i * 2,
            60 + i,
            0.10 + 0.01 * (i % 3) as f64,
            0.05
        ));
    }
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn csv_profile_drives_environment() {
    let dir = common::scratch_dir("csv_env");
    let path = write_profile_csv(&dir, 8);

    let mut params = common::default_params();
    params.env.horizon = 20;
    let mut env = Environment::new(params, CsvProfile::new(&path)).unwrap();
    let obs = env.reset(None, None).unwrap();
    assert_eq!(obs.renewable_kw(), 0.0);
    assert_eq!(obs.renewable_next_kw(), 2.0);
    assert_eq!(obs.load_kw(), 60.0);

    // Series of 8 tiled to 20
    let profile = env.profile().unwrap();
    assert_eq!(profile.len(), 20);
    assert_eq!(profile.load_at(8), 60.0);
    assert_eq!(profile.price_export_at(3), 0.05);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_csv_fails_reset_not_construction() {
    let mut env =
        Environment::new(common::default_params(), CsvProfile::new("/no/such/file.csv")).unwrap();
    assert!(matches!(
        env.reset(None, None),
        Err(EnvError::Profile(ProfileError::Io { .. }))
    ));
    assert!(env.state().is_none());
}

#[test]
fn scenario_file_resolves_relative_profile_path() {
    let dir = common::scratch_dir("scenario_rel");
    write_profile_csv(&dir, 4);
    let scenario = dir.join("scenario.toml");
    fs::write(
        &scenario,
        "[environment]\nhorizon = 4\n\n[profile]\ncsv = \"profiles.csv\"\n",
    )
    .unwrap();

    let cfg = ScenarioConfig::from_toml_file(&scenario).unwrap();
    assert_eq!(cfg.profile.csv.as_deref(), Some(dir.join("profiles.csv").as_path()));

    let mut env = Environment::new(cfg.params(), cfg.profile_source()).unwrap();
    assert!(env.reset(None, None).is_ok());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn static_profile_derives_export_price() {
    let mut params = common::default_params();
    params.env.horizon = 3;
    params.grid.sell_price_factor = 0.5;
    let mut env = Environment::new(params, StaticProfile::new(common::short_series())).unwrap();
    env.reset(None, None).unwrap();
    let p: &EpisodeProfile = env.profile().unwrap();
    assert_eq!(p.len(), 3);
    assert!((p.price_export_at(2) - 0.06).abs() < 1e-12);
}

#[test]
fn validation_of_generated_file_passes() {
    let dir = common::scratch_dir("validate");
    let path = write_profile_csv(&dir, 12);
    let report = validate_profiles_csv(&path, Some(0.25)).unwrap();
    assert!(report.ok(), "{report}");
    assert_eq!(report.rows, 12);
    assert_eq!(report.inferred_timestep_minutes, Some(15.0));
    assert!(report.warnings.is_empty());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn validation_flags_bad_rows() {
    let dir = common::scratch_dir("validate_bad");
    let path = dir.join("bad.csv");
    fs::write(
        &path,
        "renewable_kw,load_kw,price_import_per_kwh\n1,-5,0.1\n2,inf,0.1\n",
    )
    .unwrap();
    let report = validate_profiles_csv(&path, None).unwrap();
    assert!(!report.ok());
    assert!(report.errors.iter().any(|e| e.contains("negative")));
    assert!(report.errors.iter().any(|e| e.contains("non-finite")));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn split_round_trip_preserves_order() {
    let dir = common::scratch_dir("split");
    let path = write_profile_csv(&dir, 40);
    let out = dir.join("out");
    let paths = split_profile_csv(&path, &out, SplitRatios::default()).unwrap();

    let rows = |p: &std::path::Path| -> Vec<String> {
        fs::read_to_string(p)
            .unwrap()
            .lines()
            .skip(1)
            .map(str::to_string)
            .collect()
    };
    let train = rows(&paths.train);
    let val = rows(&paths.val);
    let test = rows(&paths.test);
    assert_eq!(train.len() + val.len() + test.len(), 40);
    assert!(train.len() >= 27 && !val.is_empty() && !test.is_empty());

    let original: Vec<String> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect();
    let joined: Vec<String> = train.into_iter().chain(val).chain(test).collect();
    assert_eq!(joined, original);

    // Split files are valid profile sources themselves
    let report = validate_profiles_csv(&paths.val, Some(0.25)).unwrap();
    assert!(report.ok(), "{report}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn split_rejects_bad_ratios() {
    let dir = common::scratch_dir("split_ratio");
    let path = write_profile_csv(&dir, 10);
    let ratios = SplitRatios {
        train: 0.6,
        val: 0.3,
        test: 0.3,
    };
    assert!(matches!(
        split_profile_csv(&path, &dir.join("out"), ratios),
        Err(ProfileError::Split(_))
    ));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn non_finite_csv_values_fail_reset() {
    let dir = common::scratch_dir("csv_non_finite");
    let path = dir.join("profiles.csv");
    fs::write(
        &path,
        "renewable_kw,load_kw,price_import_per_kwh\nNaN,50,0.1\n10,-inf,0.1\n",
    )
    .unwrap();

    let mut params = common::default_params();
    params.env.horizon = 2;
    let mut env = Environment::new(params, CsvProfile::new(&path)).unwrap();
    assert!(matches!(
        env.reset(None, None),
        Err(EnvError::Profile(ProfileError::InvalidValue { .. }))
    ));
    assert!(env.state().is_none());
    assert!(matches!(env.step(&[0.0]), Err(EnvError::NotReset)));

    let _ = fs::remove_dir_all(&dir);
}
