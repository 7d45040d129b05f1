//! Closed-form solutions for the standard feedback test problems
//!
//! All inputs and outputs are cgs. These are the curves scenario runs are
//! compared against: blastwaves, wind bubbles, HII regions and free-fall.

use crate::core_types::units::{BOLTZMANN, GRAVITATIONAL_CONSTANT, MEAN_PARTICLE_MASS};
use crate::physics::alpha_b_hii;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Similarity constant of the energy-conserving blastwave
const SEDOV_TAYLOR_CONSTANT: f64 = 1.17;

/// Radius (cm) of an adiabatic blastwave
///
/// # Arguments
///
/// * `time` - Time since the explosion (s)
/// * `energy` - Energy of the explosion (erg)
/// * `density` - Background mass density (g/cm^3)
pub fn sedov_taylor_radius(time: f64, energy: f64, density: f64) -> f64 {
    SEDOV_TAYLOR_CONSTANT * (energy * time * time / density).powf(0.2)
}

/// Prefactor of the `(L t^3 / rho)^(1/5)` wind bubble law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindBubbleModel {
    /// Castor et al. (1975) / Weaver et al. (1977), no cooling
    #[default]
    Castor,
    /// Weaver et al. (1977) with interior cooling
    WeaverIntermediate,
    /// Avedisova (1972)
    Avedisova,
    /// Capriotti & Kozminski (2001), adiabatic
    CapriottiAdiabatic,
}

impl WindBubbleModel {
    pub fn constant(self) -> f64 {
        match self {
            Self::Castor => 0.88,
            Self::WeaverIntermediate => 0.76,
            Self::Avedisova => 1.02,
            Self::CapriottiAdiabatic => 0.86,
        }
    }
}

/// Radius (cm) of a bubble blown by a constant wind
///
/// # Arguments
///
/// * `luminosity` - Mechanical wind luminosity (erg/s)
/// * `nh` - Background hydrogen number density (cm^-3)
/// * `time` - Time since the wind switched on (s)
/// * `model` - Which similarity constant to use
pub fn wind_bubble_radius(luminosity: f64, nh: f64, time: f64, model: WindBubbleModel) -> f64 {
    let rho = nh * MEAN_PARTICLE_MASS;
    model.constant() * (luminosity * time.powi(3) / rho).powf(0.2)
}

/// Initial Stromgren radius (cm) of a source emitting `qh` photons/s into
/// hydrogen of density `nh` (cm^-3) recombining at `tion` (K)
pub fn stromgren_radius(qh: f64, nh: f64, tion: f64) -> f64 {
    (qh / (4.0 / 3.0 * PI * alpha_b_hii(tion) * nh * nh)).cbrt()
}

/// Isothermal sound speed used by the ionisation-front laws
fn ionised_sound_speed(tion: f64) -> f64 {
    (2.0 * tion * BOLTZMANN / MEAN_PARTICLE_MASS).sqrt()
}

/// Radius (cm) of an expanding HII region after Spitzer (1978)
pub fn spitzer_radius(qh: f64, nh: f64, time: f64, tion: f64) -> f64 {
    let rs = stromgren_radius(qh, nh, tion);
    let ci = ionised_sound_speed(tion);
    rs * (1.0 + 7.0 / 4.0 * ci / rs * time).powf(4.0 / 7.0)
}

/// Radius (cm) of an expanding HII region after Hosokawa & Inutsuka (2006)
pub fn hosokawa_inutsuka_radius(qh: f64, nh: f64, time: f64, tion: f64) -> f64 {
    let rs = stromgren_radius(qh, nh, tion);
    let ci = ionised_sound_speed(tion);
    rs * (1.0 + 7.0 / 4.0 * (4.0_f64 / 3.0).sqrt() * ci / rs * time).powf(4.0 / 7.0)
}

/// Hydrogen density (cm^-3) inside a Spitzer HII region, from
/// photoionisation equilibrium at its current radius
pub fn spitzer_ionised_density(qh: f64, nh: f64, time: f64, tion: f64) -> f64 {
    let ri = spitzer_radius(qh, nh, time, tion);
    (3.0 * qh / (4.0 * PI * alpha_b_hii(tion) * ri.powi(3))).sqrt()
}

/// Free-fall time (s) of a uniform sphere of mass density `rho0` (g/cm^3)
pub fn free_fall_time(rho0: f64) -> f64 {
    (3.0 * PI / (32.0 * GRAVITATIONAL_CONSTANT * rho0)).sqrt()
}

/// Time (s) for a collapsing uniform sphere to reach density `rho`
///
/// Densities below `rho0` are outside the solution and return 0.
pub fn collapse_time_from_density(rho: f64, rho0: f64) -> f64 {
    let x = (rho / rho0).powf(-0.5).min(1.0);
    free_fall_time(rho0) * 2.0 / PI * collapse_phase(x)
}

/// Time (s) for a test particle released at rest at `x0` (cm) to fall to
/// `x` (cm) towards a point mass `central_mass` (g)
pub fn collapse_time_from_position(x: f64, x0: f64, central_mass: f64) -> f64 {
    let ratio = (x / x0).clamp(0.0, 1.0);
    collapse_phase(ratio) * x0.powf(1.5) / (2.0 * GRAVITATIONAL_CONSTANT * central_mass).sqrt()
}

/// `acos(sqrt(x)) + sqrt(x (1 - x))`, the radial Kepler orbit phase
fn collapse_phase(x: f64) -> f64 {
    x.sqrt().acos() + (x * (1.0 - x)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::units::{MYR, PARSEC, SOLAR_MASS};
    use approx::assert_relative_eq;

    #[test]
    fn test_sedov_scaling() {
        let r1 = sedov_taylor_radius(MYR, 1e51, 1e-22);
        let r2 = sedov_taylor_radius(2.0 * MYR, 1e51, 1e-22);
        assert_relative_eq!(r2 / r1, 2.0_f64.powf(0.4), max_relative = 1e-12);
        // A few tens of parsecs after a megayear in the diffuse ISM
        assert!(r1 > 10.0 * PARSEC && r1 < 100.0 * PARSEC);
    }

    #[test]
    fn test_wind_models_differ_only_by_constant() {
        let castor = wind_bubble_radius(1e36, 100.0, MYR, WindBubbleModel::Castor);
        let weaver = wind_bubble_radius(1e36, 100.0, MYR, WindBubbleModel::WeaverIntermediate);
        assert_relative_eq!(castor / weaver, 0.88 / 0.76, max_relative = 1e-12);
    }

    #[test]
    fn test_ionisation_fronts_start_at_stromgren_radius() {
        let rs = stromgren_radius(1e49, 1000.0, 8400.0);
        assert_relative_eq!(spitzer_radius(1e49, 1000.0, 0.0, 8400.0), rs);
        assert_relative_eq!(hosokawa_inutsuka_radius(1e49, 1000.0, 0.0, 8400.0), rs);
        assert!(
            hosokawa_inutsuka_radius(1e49, 1000.0, MYR, 8400.0)
                > spitzer_radius(1e49, 1000.0, MYR, 8400.0)
        );
        // Equilibrium density at t = 0 is the background density
        assert_relative_eq!(
            spitzer_ionised_density(1e49, 1000.0, 0.0, 8400.0),
            1000.0,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_collapse_limits() {
        let tff = free_fall_time(1e-20);
        assert_relative_eq!(collapse_time_from_density(1e-20, 1e-20), 0.0, epsilon = 1e-6 * tff);
        assert_relative_eq!(collapse_time_from_density(1e10, 1e-20), tff, max_relative = 1e-6);

        let x0 = PARSEC;
        let m = 1000.0 * SOLAR_MASS;
        assert_eq!(collapse_time_from_position(x0, x0, m), 0.0);
        let t_fall = collapse_time_from_position(0.0, x0, m);
        assert_relative_eq!(
            t_fall,
            PI / 2.0 * x0.powf(1.5) / (2.0 * GRAVITATIONAL_CONSTANT * m).sqrt()
        );
    }
}
