//! Equilibrium temperature of photoionised gas
//!
//! The temperature of an HII region depends mainly on the hardness of the
//! ionising spectrum (the star's effective temperature) and on the metal
//! content of the gas, which sets the line cooling. [`GridIonisedTemperatures`]
//! reads a table of photoionisation-code results and interpolates it.
//!
//! # Table format
//!
//! Comma-separated rows with at least seven columns:
//!
//! `Teff, spectral type, log nH, log U, log Z/Zsun, log T(H0), log T(H+), ...`
//!
//! Only rows with ionisation parameter `log U = -2` are used, and the
//! ionised temperature is read from the seventh column. Lines starting with
//! `#` and a single non-numeric header line are skipped.

use crate::core_types::units::SOLAR_METALLICITY;
use crate::error::{FeedbackError, Result};
use std::fmt::Debug;
use std::path::Path;
use tracing::info;

/// Ionisation parameter the tables are evaluated at
const LOG_IONISATION_PARAMETER: f64 = -2.0;

/// Gas density the tables are evaluated at (log10 cm^-3)
const LOG_DENSITY: f64 = 1.75;

/// Ionised gas temperature lookup
pub trait IonisedTemperatureTable: Debug + Send + Sync {
    /// Temperature of photoionised gas in K
    ///
    /// # Arguments
    /// * `effective_temperature` - Stellar effective temperature (K)
    /// * `metallicity` - Gas metal mass fraction (solar is 0.014)
    fn ionised_temperature(&self, effective_temperature: f64, metallicity: f64) -> f64;
}

/// The same temperature for every star
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantIonisedTemperature(pub f64);

impl IonisedTemperatureTable for ConstantIonisedTemperature {
    fn ionised_temperature(&self, _effective_temperature: f64, _metallicity: f64) -> f64 {
        self.0
    }
}

/// Regular (Teff, log nH, log Z/Zsun) grid with trilinear interpolation
///
/// Queries outside the grid are extrapolated linearly from the nearest
/// edge segment.
#[derive(Debug, Clone, PartialEq)]
pub struct GridIonisedTemperatures {
    teff: Vec<f64>,
    log_nh: Vec<f64>,
    log_z: Vec<f64>,
    /// Temperatures in K, indexed `[teff][nh][z]` flattened
    values: Vec<f64>,
}

impl GridIonisedTemperatures {
    /// Read a table from disk
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::Io`] if the file cannot be read and
    /// [`FeedbackError::Config`] if it is malformed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_csv_str(&text)?;
        info!(
            "Loaded ionised gas temperatures from {} ({}x{}x{} grid)",
            path.as_ref().display(),
            table.teff.len(),
            table.log_nh.len(),
            table.log_z.len()
        );
        Ok(table)
    }

    /// Parse a table from CSV text
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::Config`] if a row cannot be parsed, no row
    /// has `log U = -2`, or the rows do not fill a regular grid.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: std::result::Result<Vec<f64>, _> =
                line.split(',').map(|f| f.trim().parse::<f64>()).collect();
            let fields = match fields {
                Ok(f) => f,
                Err(_) if rows.is_empty() && lineno == 0 => continue,
                Err(e) => {
                    return Err(FeedbackError::Config(format!(
                        "ionised temperature table line {}: {e}",
                        lineno + 1
                    )))
                }
            };
            if fields.len() < 7 {
                return Err(FeedbackError::Config(format!(
                    "ionised temperature table line {}: expected at least 7 columns, found {}",
                    lineno + 1,
                    fields.len()
                )));
            }
            if fields[3] == LOG_IONISATION_PARAMETER {
                rows.push((fields[0], fields[2], fields[4], 10f64.powf(fields[6])));
            }
        }
        if rows.is_empty() {
            return Err(FeedbackError::Config(
                "ionised temperature table has no rows at log U = -2".into(),
            ));
        }

        let axis = |pick: fn(&(f64, f64, f64, f64)) -> f64| {
            let mut v: Vec<f64> = rows.iter().map(pick).collect();
            v.sort_by(f64::total_cmp);
            v.dedup();
            v
        };
        let teff = axis(|r| r.0);
        let log_nh = axis(|r| r.1);
        let log_z = axis(|r| r.2);

        let mut values = vec![f64::NAN; teff.len() * log_nh.len() * log_z.len()];
        for &(t, n, z, value) in &rows {
            let (Some(i), Some(j), Some(k)) = (
                teff.iter().position(|&a| a == t),
                log_nh.iter().position(|&a| a == n),
                log_z.iter().position(|&a| a == z),
            ) else {
                continue;
            };
            values[(i * log_nh.len() + j) * log_z.len() + k] = value;
        }
        if values.iter().any(|v| v.is_nan()) {
            return Err(FeedbackError::Config(
                "ionised temperature table does not cover a regular grid".into(),
            ));
        }

        Ok(Self {
            teff,
            log_nh,
            log_z,
            values,
        })
    }

    fn value(&self, i: usize, j: usize, k: usize) -> f64 {
        self.values[(i * self.log_nh.len() + j) * self.log_z.len() + k]
    }

    /// Interpolate the grid at an arbitrary point
    pub fn interpolate(&self, teff: f64, log_nh: f64, log_z: f64) -> f64 {
        let (i, ti) = segment(&self.teff, teff);
        let (j, tj) = segment(&self.log_nh, log_nh);
        let (k, tk) = segment(&self.log_z, log_z);

        let mut result = 0.0;
        for (di, wi) in [(0, 1.0 - ti), (1, ti)] {
            for (dj, wj) in [(0, 1.0 - tj), (1, tj)] {
                for (dk, wk) in [(0, 1.0 - tk), (1, tk)] {
                    let weight = wi * wj * wk;
                    if weight != 0.0 {
                        result += weight * self.value(i + di, j + dj, k + dk);
                    }
                }
            }
        }
        result
    }
}

/// Lower index and (unclamped) fractional position within an axis segment
fn segment(axis: &[f64], x: f64) -> (usize, f64) {
    if axis.len() < 2 {
        return (0, 0.0);
    }
    let upper = axis.partition_point(|&a| a <= x).clamp(1, axis.len() - 1);
    let lower = upper - 1;
    let t = (x - axis[lower]) / (axis[upper] - axis[lower]);
    (lower, t)
}

impl IonisedTemperatureTable for GridIonisedTemperatures {
    fn ionised_temperature(&self, effective_temperature: f64, metallicity: f64) -> f64 {
        let log_z = (metallicity / SOLAR_METALLICITY).log10();
        self.interpolate(effective_temperature, LOG_DENSITY, log_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// log10 T = 3.9 + Teff / 1e5 - 0.1 dZ, linear in every axis
    fn table() -> String {
        let mut text = String::from("Teff,Styp,nH,U,dZ,T_H0,T_H+,T_H2\n");
        for teff in [30000.0, 40000.0] {
            for nh in [1.0, 2.0, 3.0] {
                for dz in [-0.5, 0.0] {
                    for u in [-3.0, -2.0] {
                        let log_t = 3.9 + teff / 1e5 - 0.1 * dz + if u == -3.0 { 1.0 } else { 0.0 };
                        text.push_str(&format!("{teff},1,{nh},{u},{dz},2.0,{log_t},1.0\n"));
                    }
                }
            }
        }
        text
    }

    #[test]
    fn test_grid_nodes_are_exact() {
        let grid = GridIonisedTemperatures::from_csv_str(&table()).unwrap();
        let expected = 10f64.powf(3.9 + 0.3);
        assert_relative_eq!(grid.interpolate(30000.0, 2.0, 0.0), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_solar_metallicity_lookup_interpolates_teff() {
        let grid = GridIonisedTemperatures::from_csv_str(&table()).unwrap();
        let a = 10f64.powf(4.2);
        let b = 10f64.powf(4.3);
        let t = grid.ionised_temperature(35000.0, SOLAR_METALLICITY);
        assert_relative_eq!(t, 0.5 * (a + b), max_relative = 1e-12);
    }

    #[test]
    fn test_extrapolates_beyond_table() {
        let grid = GridIonisedTemperatures::from_csv_str(&table()).unwrap();
        let a = 10f64.powf(4.2);
        let b = 10f64.powf(4.3);
        let t = grid.interpolate(50000.0, 2.0, 0.0);
        assert_relative_eq!(t, b + (b - a), max_relative = 1e-12);
    }

    #[test]
    fn test_incomplete_grid_is_rejected() {
        let text = "30000,1,1,-2,0,2,4\n40000,1,2,-2,0,2,4\n";
        let err = GridIonisedTemperatures::from_csv_str(text).unwrap_err();
        assert!(matches!(err, FeedbackError::Config(_)));
    }

    #[test]
    fn test_constant_table() {
        let table = ConstantIonisedTemperature(8000.0);
        assert_eq!(table.ionised_temperature(45000.0, 0.002), 8000.0);
    }
}
