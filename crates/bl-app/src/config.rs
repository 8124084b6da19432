//! Service configuration, read from an optional YAML file.

use std::path::Path;
use std::time::Duration;

use bl_results::shape::DEFAULT_POINT_CAP;
use bl_sim::MAX_CYCLES;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServiceConfig {
    /// Address the HTTP server listens on
    pub bind: String,
    /// Wall-clock budget of one solve [s]
    pub simulation_timeout_s: f64,
    pub max_cycles: usize,
    /// Series longer than this are downsampled
    pub downsample_points: usize,
    pub max_concurrent_simulations: usize,
    /// Answer errors with HTTP 200, as older front-ends expect
    pub legacy_error_status: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            simulation_timeout_s: 120.0,
            max_cycles: MAX_CYCLES,
            downsample_points: DEFAULT_POINT_CAP,
            max_concurrent_simulations: 4,
            legacy_error_status: false,
        }
    }
}

impl ServiceConfig {
    pub fn from_yaml_str(text: &str) -> AppResult<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> AppResult<()> {
        let bad = |what: String| Err(AppError::Config(what));
        if !self.simulation_timeout_s.is_finite() || self.simulation_timeout_s <= 0.0 {
            return bad(format!(
                "simulation_timeout_s must be positive, got {}",
                self.simulation_timeout_s
            ));
        }
        if !(1..=MAX_CYCLES).contains(&self.max_cycles) {
            return bad(format!(
                "max_cycles must lie in [1, {MAX_CYCLES}], got {}",
                self.max_cycles
            ));
        }
        if self.downsample_points < 2 {
            return bad(format!(
                "downsample_points must be at least 2, got {}",
                self.downsample_points
            ));
        }
        if self.max_concurrent_simulations == 0 {
            return bad("max_concurrent_simulations must be positive".to_string());
        }
        Ok(())
    }

    pub fn simulation_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.simulation_timeout_s)
    }

    /// The part of the configuration the lab pipelines see.
    pub fn lab_settings(&self) -> LabSettings {
        LabSettings {
            simulation_timeout: Some(self.simulation_timeout()),
            max_cycles: self.max_cycles,
            point_cap: self.downsample_points,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabSettings {
    /// Per-solve deadline; `None` never expires
    pub simulation_timeout: Option<Duration>,
    pub max_cycles: usize,
    pub point_cap: usize,
}

impl Default for LabSettings {
    fn default() -> Self {
        ServiceConfig::default().lab_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let c = ServiceConfig::from_yaml_str("{}").unwrap();
        assert_eq!(c, ServiceConfig::default());
        assert_eq!(c.max_cycles, 100);
        assert_eq!(c.downsample_points, 8100);
        assert!(!c.legacy_error_status);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let c = ServiceConfig::from_yaml_str(
            "bind: 0.0.0.0:9000\nsimulation_timeout_s: 30\nlegacy_error_status: true\n",
        )
        .unwrap();
        assert_eq!(c.bind, "0.0.0.0:9000");
        assert_eq!(c.simulation_timeout(), Duration::from_secs(30));
        assert!(c.legacy_error_status);
        assert_eq!(c.max_concurrent_simulations, 4);
    }

    #[test]
    fn unknown_and_invalid_fields_are_rejected() {
        assert!(ServiceConfig::from_yaml_str("max_cycle: 10\n").is_err());
        assert!(ServiceConfig::from_yaml_str("max_cycles: 0\n").is_err());
        assert!(ServiceConfig::from_yaml_str("max_cycles: 101\n").is_err());
        assert!(ServiceConfig::from_yaml_str("simulation_timeout_s: -1\n").is_err());
        assert!(ServiceConfig::from_yaml_str("downsample_points: 1\n").is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ServiceConfig::load(Path::new("/nonexistent/batterylab.yaml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
