//! Physical constants and unit conversion
//!
//! Everything public-facing in this crate works in cgs. The hydro solver
//! works in its own code units, chosen so that `G = 1`:
//! - distance: 1 parsec
//! - density: 1 hydrogen mass per cubic centimetre
//! - time: `1 / sqrt(G * density)`
//!
//! Velocity, mass, pressure, energy and acceleration units are derived from
//! these three. Every conversion between the two systems goes through
//! [`CodeUnits`]; mixing them is a correctness bug.
//!
//! # Usage
//! ```
//! use feedback_core::core_types::units::{CodeUnits, PARSEC};
//!
//! let units = CodeUnits::default();
//! assert!((units.distance - PARSEC).abs() < 1.0);
//! let v_code = units.velocity_to_code(1e5);
//! assert!((units.velocity_from_code(v_code) - 1e5).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// PHYSICAL CONSTANTS (cgs)
// ============================================================================

/// Parsec in cm
pub const PARSEC: f64 = 3.086e18;
/// Hydrogen atom mass in g
pub const HYDROGEN_MASS: f64 = 1.66e-24;
/// Year in s
pub const YEAR: f64 = 3.154e7;
/// Megayear in s
pub const MYR: f64 = 1e6 * YEAR;
/// Boltzmann constant in erg/K
pub const BOLTZMANN: f64 = 1.3806485279e-16;
/// Gravitational constant in cgs
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67428e-8;
/// Hydrogen mass fraction
pub const HYDROGEN_FRACTION: f64 = 0.74;
/// Mean gas mass per hydrogen atom in g
pub const MEAN_PARTICLE_MASS: f64 = HYDROGEN_MASS / HYDROGEN_FRACTION;
/// Speed of light in cm/s
pub const SPEED_OF_LIGHT: f64 = 2.998e10;
/// Electron volt in erg
pub const ELECTRON_VOLT: f64 = 1.60217662e-12;
/// Solar mass in g
pub const SOLAR_MASS: f64 = 1.9891e33;
/// Solar metallicity (mass fraction) assumed by the stellar and ionised-gas tables
pub const SOLAR_METALLICITY: f64 = 0.014;

// ============================================================================
// CODE UNITS
// ============================================================================

/// Conversion factors between cgs and hydro-solver code units.
///
/// Multiply a code value by the matching field to get cgs; divide a cgs
/// value by it to get code units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CodeUnits {
    /// cm per code length
    pub distance: f64,
    /// g/cm^3 per code density
    pub density: f64,
    /// s per code time
    pub time: f64,
    /// cm/s per code velocity
    pub velocity: f64,
    /// g per code mass
    pub mass: f64,
    /// erg/cm^3 per code pressure
    pub pressure: f64,
    /// erg per code energy
    pub energy: f64,
    /// cm/s^2 per code acceleration
    pub gravity: f64,
}

impl CodeUnits {
    /// Build a unit system from a length and density scale, with `G = 1`.
    #[must_use]
    pub fn new(distance: f64, density: f64) -> Self {
        let time = 1.0 / (GRAVITATIONAL_CONSTANT * density).sqrt();
        let velocity = distance / time;
        let mass = density * distance.powi(3);
        Self {
            distance,
            density,
            time,
            velocity,
            mass,
            pressure: density * velocity * velocity,
            energy: mass * velocity * velocity,
            gravity: GRAVITATIONAL_CONSTANT * mass / (distance * distance),
        }
    }

    #[inline]
    pub fn distance_to_code(&self, cm: f64) -> f64 {
        cm / self.distance
    }

    #[inline]
    pub fn distance_from_code(&self, code: f64) -> f64 {
        code * self.distance
    }

    #[inline]
    pub fn density_to_code(&self, rho: f64) -> f64 {
        rho / self.density
    }

    #[inline]
    pub fn density_from_code(&self, code: f64) -> f64 {
        code * self.density
    }

    #[inline]
    pub fn pressure_to_code(&self, p: f64) -> f64 {
        p / self.pressure
    }

    #[inline]
    pub fn pressure_from_code(&self, code: f64) -> f64 {
        code * self.pressure
    }

    #[inline]
    pub fn velocity_to_code(&self, v: f64) -> f64 {
        v / self.velocity
    }

    #[inline]
    pub fn velocity_from_code(&self, code: f64) -> f64 {
        code * self.velocity
    }

    #[inline]
    pub fn time_to_code(&self, seconds: f64) -> f64 {
        seconds / self.time
    }

    #[inline]
    pub fn time_from_code(&self, code: f64) -> f64 {
        code * self.time
    }

    #[inline]
    pub fn gravity_to_code(&self, accel: f64) -> f64 {
        accel / self.gravity
    }

    #[inline]
    pub fn gravity_from_code(&self, code: f64) -> f64 {
        code * self.gravity
    }
}

impl Default for CodeUnits {
    fn default() -> Self {
        Self::new(PARSEC, HYDROGEN_MASS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_code_units_set_g_to_one() {
        let units = CodeUnits::default();
        // G in code units = G_cgs * density * time^2
        let g_code = GRAVITATIONAL_CONSTANT * units.density * units.time * units.time;
        assert_relative_eq!(g_code, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_gravity_unit_matches_velocity_squared_over_distance() {
        let units = CodeUnits::default();
        assert_relative_eq!(
            units.gravity,
            units.velocity * units.velocity / units.distance,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_conversions_invert() {
        let units = CodeUnits::default();
        let rho = 1000.0 * MEAN_PARTICLE_MASS;
        assert_relative_eq!(
            units.density_from_code(units.density_to_code(rho)),
            rho,
            max_relative = 1e-14
        );
        let p = 1.38e-12;
        assert_relative_eq!(
            units.pressure_from_code(units.pressure_to_code(p)),
            p,
            max_relative = 1e-14
        );
    }
}
