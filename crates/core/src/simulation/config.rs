//! Integrator configuration
//!
//! Physics switches and tunables live here instead of in process state. A
//! config is plain data: build it in code, or read it from JSON, and hand it
//! to [`crate::simulation::Integrator::with_config`]. Every switch can also
//! be flipped on a live integrator.

use crate::error::{FeedbackError, Result};
use crate::physics::{ContactMask, GravityMode, RadiationTracer};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default dust cross-section per hydrogen atom (cm^2)
pub const DEFAULT_DUST_CROSS_SECTION: f64 = 1e-21;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoolingConfig {
    pub enabled: bool,
    pub contact_mask: ContactMask,
    /// Temperature floor applied after cooling and after every hydro step (K)
    pub temperature_floor: f64,
}

impl Default for CoolingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            contact_mask: ContactMask::None,
            temperature_floor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityConfig {
    pub enabled: bool,
    pub mode: GravityMode,
    /// Point mass at the origin (g)
    pub central_mass: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiationConfig {
    /// Trace photons every step. Switches itself on the first time a
    /// source emits.
    pub enabled: bool,
    /// Write the radiation force into the acceleration field
    pub radiation_pressure: bool,
    /// Dust cross-section per H atom (cm^2); `None` leaves the grid's values
    pub dust_cross_section: Option<f64>,
    pub force_ionised_temperature: bool,
    /// Cells hotter than this multiple of the ionised temperature are not
    /// cooled to it
    pub grace_factor: f64,
}

impl Default for RadiationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radiation_pressure: true,
            dust_cross_section: Some(DEFAULT_DUST_CROSS_SECTION),
            force_ionised_temperature: false,
            grace_factor: 2.0,
        }
    }
}

impl RadiationConfig {
    pub fn tracer(&self) -> RadiationTracer {
        RadiationTracer {
            dust_cross_section: self.dust_cross_section,
            grace_factor: self.grace_factor,
            force_ionised_temperature: self.force_ionised_temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutflowConfig {
    /// Cell whose outer face is tracked; the outermost cell if `None`
    pub tracked_cell: Option<usize>,
}

/// Everything the integrator needs besides the solver and the sources
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    pub cooling: CoolingConfig,
    pub gravity: GravityConfig,
    pub radiation: RadiationConfig,
    pub outflow: OutflowConfig,
}

impl IntegratorConfig {
    /// Parse a JSON config; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::Config`] on malformed JSON and the
    /// [`IntegratorConfig::validate`] errors otherwise.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| FeedbackError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config from disk
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::Io`] if the file cannot be read, otherwise
    /// as [`IntegratorConfig::from_json_str`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject settings that cannot run
    ///
    /// # Errors
    ///
    /// - [`FeedbackError::UnimplementedMode`] for [`GravityMode::PerturbedOnly`]
    /// - [`FeedbackError::InvalidParameter`] for a non-finite temperature
    ///   floor, a negative central mass or a grace factor below 1
    pub fn validate(&self) -> Result<()> {
        if self.gravity.mode == GravityMode::PerturbedOnly {
            return Err(FeedbackError::UnimplementedMode(
                "gravity mode PerturbedOnly".into(),
            ));
        }
        if !self.cooling.temperature_floor.is_finite() || self.cooling.temperature_floor < 0.0 {
            return Err(FeedbackError::InvalidParameter(format!(
                "temperature floor must be a finite non-negative value, got {}",
                self.cooling.temperature_floor
            )));
        }
        if self.gravity.central_mass.is_nan() || self.gravity.central_mass < 0.0 {
            return Err(FeedbackError::InvalidParameter(format!(
                "central mass must be non-negative, got {}",
                self.gravity.central_mass
            )));
        }
        if self.radiation.grace_factor.is_nan() || self.radiation.grace_factor < 1.0 {
            return Err(FeedbackError::InvalidParameter(format!(
                "grace factor must be at least 1, got {}",
                self.radiation.grace_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_empty_json() {
        let config = IntegratorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, IntegratorConfig::default());
        assert!(!config.cooling.enabled);
        assert!(!config.gravity.enabled);
        assert!(config.radiation.radiation_pressure);
        assert_eq!(config.cooling.temperature_floor, 1.0);
    }

    #[test]
    fn test_partial_json() {
        let config = IntegratorConfig::from_json_str(
            r#"{"cooling": {"enabled": true, "contact_mask": "EdgeSearch"},
                "outflow": {"tracked_cell": 200}}"#,
        )
        .unwrap();
        assert!(config.cooling.enabled);
        assert_eq!(config.cooling.contact_mask, ContactMask::EdgeSearch);
        assert_eq!(config.outflow.tracked_cell, Some(200));
        assert_eq!(config.radiation.grace_factor, 2.0);
    }

    #[test]
    fn test_perturbed_gravity_is_rejected() {
        let err = IntegratorConfig::from_json_str(r#"{"gravity": {"mode": "PerturbedOnly"}}"#)
            .unwrap_err();
        assert!(matches!(err, FeedbackError::UnimplementedMode(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = IntegratorConfig::from_json_str("{cooling").unwrap_err();
        assert!(matches!(err, FeedbackError::Config(_)));
    }
}
