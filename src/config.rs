//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::profile::{CsvProfile, ProfileSource, SyntheticProfile};
use crate::sim::controller::RuleBasedPolicyConfig;
use crate::sim::types::{BatteryParams, EnvParams, GridParams, MicrogridParams, RewardWeights};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Episode timing, initial SoC, and seed.
    #[serde(default)]
    pub environment: EnvParams,
    /// Battery storage parameters.
    #[serde(default)]
    pub battery: BatteryParams,
    /// Grid import/export limits and export tariff fallback.
    #[serde(default)]
    pub grid: GridParams,
    /// Penalty weights.
    #[serde(default)]
    pub reward: RewardWeights,
    /// Profile data source.
    #[serde(default)]
    pub profile: ProfileConfig,
    /// Rule-based baseline thresholds.
    #[serde(default)]
    pub policy: RuleBasedPolicyConfig,
}

/// Profile data source selection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// CSV file with profile columns; synthetic generation when absent.
    pub csv: Option<PathBuf>,
}

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the tight-grid preset: weak interconnection, steeper unmet penalty.
    pub fn tight_grid() -> Self {
        Self {
            grid: GridParams {
                max_import_kw: 90.0,
                max_export_kw: 30.0,
                ..GridParams::default()
            },
            reward: RewardWeights {
                unmet_load_penalty_per_kwh: 25.0,
                ..RewardWeights::default()
            },
            ..Self::default()
        }
    }

    /// Returns the small-battery preset: low capacity and power rating.
    pub fn small_battery() -> Self {
        Self {
            battery: BatteryParams {
                capacity_kwh: 40.0,
                max_charge_kw: 20.0,
                max_discharge_kw: 20.0,
                charge_efficiency: 0.92,
                discharge_efficiency: 0.92,
                ..BatteryParams::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "tight_grid", "small_battery"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "tight_grid" => Ok(Self::tight_grid()),
            "small_battery" => Ok(Self::small_battery()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// A relative `profile.csv` path is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        if let (Some(csv), Some(dir)) = (&cfg.profile.csv, path.parent()) {
            if csv.is_relative() {
                cfg.profile.csv = Some(dir.join(csv));
            }
        }
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// The physical and reward parameters for the environment.
    pub fn params(&self) -> MicrogridParams {
        MicrogridParams {
            env: self.environment.clone(),
            battery: self.battery.clone(),
            grid: self.grid.clone(),
            reward: self.reward.clone(),
        }
    }

    /// Profile source selected by `[profile]`.
    pub fn profile_source(&self) -> Box<dyn ProfileSource> {
        match &self.profile.csv {
            Some(path) => Box::new(CsvProfile::new(path.clone())),
            None => Box::new(SyntheticProfile::default()),
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = self.params().check();

        let p = &self.policy;
        if !(p.low_price_threshold <= p.high_price_threshold) {
            errors.push(ConfigError::new(
                "policy.low_price_threshold",
                "must be <= policy.high_price_threshold",
            ));
        }
        if !(0.0..=1.0).contains(&p.low_price_charge_fraction) {
            errors.push(ConfigError::new(
                "policy.low_price_charge_fraction",
                "must be in [0.0, 1.0]",
            ));
        }
        for (field, value) in [
            ("policy.reserve_soc", p.reserve_soc),
            ("policy.target_soc", p.target_soc),
            ("policy.high_soc_discharge_bias", p.high_soc_discharge_bias),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn baseline_matches_documented_defaults() {
        let cfg = ScenarioConfig::baseline();
        assert_eq!(cfg.environment.horizon, 96);
        assert_eq!(cfg.environment.time_step_hours, 0.25);
        assert_eq!(cfg.environment.seed, 42);
        assert_eq!(cfg.battery.capacity_kwh, 150.0);
        assert_eq!(cfg.grid.max_import_kw, 250.0);
        assert_eq!(cfg.reward.unmet_load_penalty_per_kwh, 15.0);
        assert!(cfg.profile.csv.is_none());
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert_eq!(err.field, "preset");
        assert!(err.message.contains("unknown preset"));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[environment]
time_step_hours = 0.5
horizon = 48
initial_soc = 0.4
seed = 99

[battery]
capacity_kwh = 200.0
max_charge_kw = 80.0
max_discharge_kw = 90.0
charge_efficiency = 0.9
discharge_efficiency = 0.93
soc_min = 0.15
soc_max = 0.85
degradation_cost_per_kwh = 0.03

[grid]
max_import_kw = 120.0
max_export_kw = 60.0
sell_price_factor = 0.5

[reward]
unmet_load_penalty_per_kwh = 20.0
export_curtail_penalty_per_kwh = 0.2

[profile]
csv = "/data/profiles.csv"

[policy]
high_price_threshold = 0.2
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.environment.horizon, 48);
        assert_eq!(cfg.battery.max_discharge_kw, 90.0);
        assert_eq!(cfg.grid.sell_price_factor, 0.5);
        assert_eq!(cfg.reward.export_curtail_penalty_per_kwh, 0.2);
        assert_eq!(cfg.profile.csv, Some(PathBuf::from("/data/profiles.csv")));
        assert_eq!(cfg.policy.high_price_threshold, 0.2);
        assert_eq!(cfg.policy.low_price_threshold, 0.11);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[battery]
capacity_kwh = 100.0
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(ScenarioConfig::from_toml_str("[feeder]\nmax_import_kw = 1.0\n").is_err());
    }

    #[test]
    fn validation_collects_every_error() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.capacity_kwh = 0.0;
        cfg.battery.soc_min = 0.95;
        cfg.grid.max_export_kw = -5.0;
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"battery.capacity_kwh".to_string()));
        assert!(fields.contains(&"battery.soc_min".to_string()));
        assert!(fields.contains(&"grid.max_export_kw".to_string()));
    }

    #[test]
    fn validation_catches_inverted_price_thresholds() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.policy.low_price_threshold = 0.3;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "policy.low_price_threshold"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).unwrap();
            let errors = cfg.validate();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn tight_grid_has_tighter_limits() {
        let base = ScenarioConfig::baseline();
        let tight = ScenarioConfig::tight_grid();
        assert!(tight.grid.max_import_kw < base.grid.max_import_kw);
        assert!(tight.grid.max_export_kw < base.grid.max_export_kw);
    }

    #[test]
    fn small_battery_is_smaller() {
        let base = ScenarioConfig::baseline();
        let small = ScenarioConfig::small_battery();
        assert!(small.battery.capacity_kwh < base.battery.capacity_kwh);
        assert!(small.battery.max_discharge_kw < base.battery.max_discharge_kw);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = ScenarioConfig::from_toml_str("[environment]\nseed = 99\n").unwrap();
        // seed overridden
        assert_eq!(cfg.environment.seed, 99);
        // horizon kept default
        assert_eq!(cfg.environment.horizon, 96);
        // battery kept default
        assert_eq!(cfg.battery, BatteryParams::default());
    }

    #[test]
    fn profile_source_follows_config() {
        let mut cfg = ScenarioConfig::baseline();
        assert_eq!(cfg.profile_source().name(), "synthetic");
        cfg.profile.csv = Some(PathBuf::from("profiles.csv"));
        assert_eq!(cfg.profile_source().name(), "csv");
    }
}
