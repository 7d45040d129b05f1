//! Ionising radiation from a central source
//!
//! Photons from the origin are marched outward one cell at a time. In each
//! cell dust absorbs a fraction `1 - exp(-nH sigma dx)` of the incoming
//! ionising photons, and the remainder must pay for the recombinations of a
//! fully ionised shell. A cell whose recombinations are paid for is fully
//! ionised and the surplus moves on; the first cell that cannot be paid for
//! is partially ionised and absorbs everything left.
//!
//! Before the forward pass every cell loses the ions that recombined during
//! the last step, so a front whose source fades recedes instead of freezing.
//!
//! Optionally the absorbed photon momentum is turned into an outward
//! acceleration and written into the grid's gravity field (overwriting it).
//!
//! # Scientific References
//! - Hui, L. & Gnedin, N. (1997). "Equation of state of the photoionized
//!   intergalactic medium", MNRAS 292, 27 (case B recombination fit)
//! - Draine, B. (2011). "On radiation pressure in static, dusty HII
//!   regions", ApJ 732, 100

use crate::core_types::units::SPEED_OF_LIGHT;
use crate::grid::HydroGrid;
use std::f64::consts::PI;

/// Gas above this temperature is collisionally ionised and dust-free
const COLLISIONAL_IONISATION_TEMPERATURE: f64 = 1e5;

/// Case B recombination coefficient of hydrogen in cm^3/s
///
/// # Arguments
/// * `temperature` - Gas temperature (K)
pub fn alpha_b_hii(temperature: f64) -> f64 {
    let l = 315_614.0 / temperature;
    2.753e-14 * l.powf(1.5) / (1.0 + (l / 2.74).powf(0.407)).powf(2.242)
}

/// Photons handed to the tracer for one step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhotonInput {
    /// Ionising luminosity (erg/s)
    pub ionising_luminosity: f64,
    /// Non-ionising luminosity (erg/s)
    pub non_ionising_luminosity: f64,
    /// Mean energy of an ionising photon (erg)
    pub photon_energy: f64,
    /// Equilibrium temperature of the photoionised gas (K)
    pub ionised_temperature: f64,
}

impl PhotonInput {
    /// Ionising photons emitted per second
    pub fn photon_rate(&self) -> f64 {
        if self.photon_energy > 0.0 {
            self.ionising_luminosity / self.photon_energy
        } else {
            0.0
        }
    }
}

/// Outcome of one trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSummary {
    /// Ionising photons per second entering the grid
    pub photon_rate: f64,
    /// First cell that is not fully ionised, if the front is on the grid
    pub front_cell: Option<usize>,
}

/// Marches an ionisation front through the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiationTracer {
    /// Dust cross-section per H atom (cm^2). `None` keeps the grid's own values.
    pub dust_cross_section: Option<f64>,
    /// Cells hotter than `grace_factor * Tion` are ionised but not cooled to `Tion`
    pub grace_factor: f64,
    /// Set every ionised cell to `Tion` regardless of its temperature
    pub force_ionised_temperature: bool,
}

impl Default for RadiationTracer {
    fn default() -> Self {
        Self {
            dust_cross_section: Some(1e-21),
            grace_factor: 2.0,
            force_ionised_temperature: false,
        }
    }
}

impl RadiationTracer {
    /// Trace the photons of one step through the grid
    ///
    /// Updates ionisation fraction, temperature, the outgoing photon rate of
    /// every cell and, with `radiation_pressure`, the acceleration field.
    ///
    /// # Arguments
    ///
    /// * `grid` - Grid to ionise
    /// * `input` - Luminosities, photon energy and ionised temperature
    /// * `dt` - Length of the step the recombinations are charged over (s)
    /// * `radiation_pressure` - Whether to write the radiation force
    pub fn trace(
        &self,
        grid: &mut HydroGrid,
        input: &PhotonInput,
        dt: f64,
        radiation_pressure: bool,
    ) -> TraceSummary {
        let n = grid.ncells();
        let dx = grid.dx();
        let tion = input.ionised_temperature;
        let qh = input.photon_rate();

        let temperature: Vec<f64> = (0..n).map(|i| grid.temperature(i)).collect();
        let nh: Vec<f64> = (0..n).map(|i| grid.nh(i)).collect();

        if let Some(sigma) = self.dust_cross_section {
            grid.sigma_dust_mut().fill(sigma);
        }
        for (sigma, &t) in grid.sigma_dust_mut().iter_mut().zip(&temperature) {
            if t > COLLISIONAL_IONISATION_TEMPERATURE {
                *sigma = 0.0;
            }
        }
        let sigma: Vec<f64> = grid.sigma_dust().to_vec();

        let fixed_alpha = (tion > 0.0).then(|| alpha_b_hii(tion));
        let alpha: Vec<f64> = temperature
            .iter()
            .map(|&t| fixed_alpha.unwrap_or_else(|| alpha_b_hii(t.max(1.0))))
            .collect();

        // Recombinations per second in each fully ionised shell
        let recombinations: Vec<f64> = (0..n)
            .map(|i| {
                if temperature[i] > COLLISIONAL_IONISATION_TEMPERATURE {
                    0.0
                } else {
                    let r = grid.outer_radius(i);
                    4.0 * PI * r * r * nh[i] * nh[i] * alpha[i] * dx
                }
            })
            .collect();

        // Ions lost since the last step
        for i in 0..n {
            let atoms = nh[i] * grid.volume(i);
            let xhii = &mut grid.xhii_mut()[i];
            if atoms > 0.0 {
                let ions = (atoms * *xhii - recombinations[i] * dt).max(0.0);
                *xhii = (ions / atoms).min(1.0);
            }
        }

        // Forward pass
        let grace = self.grace_factor * tion;
        let mut q = qh;
        let mut incoming = vec![0.0; n];
        let mut front_cell = None;
        for i in 0..n {
            incoming[i] = q;
            if q <= 0.0 {
                front_cell = front_cell.or(Some(i));
                grid.qion_mut()[i] = 0.0;
                continue;
            }
            let after_dust = q * (-nh[i] * sigma[i] * dx).exp();
            if after_dust >= recombinations[i] {
                grid.xhii_mut()[i] = 1.0;
                if self.force_ionised_temperature || temperature[i] < grace {
                    grid.set_temperature(i, tion);
                }
                q = after_dust - recombinations[i];
            } else {
                let fraction = after_dust / recombinations[i];
                grid.xhii_mut()[i] = fraction;
                if temperature[i] < tion {
                    let blended = temperature[i] * (1.0 - fraction) + fraction * tion;
                    grid.set_temperature(i, blended);
                }
                front_cell = Some(i);
                q = 0.0;
            }
            grid.qion_mut()[i] = q;
        }

        if radiation_pressure {
            Self::apply_radiation_pressure(grid, input, &incoming, &nh, &sigma, &alpha);
        }

        TraceSummary {
            photon_rate: qh,
            front_cell,
        }
    }

    /// Acceleration from dust absorption and direct photoionisation
    fn apply_radiation_pressure(
        grid: &mut HydroGrid,
        input: &PhotonInput,
        incoming: &[f64],
        nh: &[f64],
        sigma: &[f64],
        alpha: &[f64],
    ) {
        let dx = grid.dx();
        let mut optical_depth = 0.0_f64;
        for i in 0..grid.ncells() {
            let tau = nh[i] * sigma[i] * dx;
            // Momentum per second absorbed in the shell (dyn)
            let dust = tau
                * (input.non_ionising_luminosity * (-optical_depth).exp()
                    + incoming[i] * input.photon_energy)
                / SPEED_OF_LIGHT;
            let r = grid.outer_radius(i);
            let ions = nh[i] * grid.xhii()[i];
            let photoionisations = alpha[i] * ions * ions * 4.0 * PI * r * r * dx;
            let direct = photoionisations * input.photon_energy / SPEED_OF_LIGHT;
            optical_depth += tau;

            let mass = grid.mass(i);
            let accel = if mass > 0.0 { (dust + direct) / mass } else { 0.0 };
            grid.set_gravity(i, accel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::units::{CodeUnits, ELECTRON_VOLT, PARSEC};
    use crate::grid::FieldKind;
    use crate::solver::SphericalHllSolver;
    use approx::assert_relative_eq;

    const TION: f64 = 8400.0;

    fn grid() -> HydroGrid {
        let mut grid = HydroGrid::new(Box::new(SphericalHllSolver::new()), CodeUnits::default());
        grid.attach(64, 10.0 * PARSEC, 5.0 / 3.0).unwrap();
        FieldKind::HydrogenDensity.fill(&mut grid, 100.0).unwrap();
        FieldKind::Temperature.fill(&mut grid, 10.0).unwrap();
        grid
    }

    fn input(qh: f64) -> PhotonInput {
        let energy = 13.6 * ELECTRON_VOLT;
        PhotonInput {
            ionising_luminosity: qh * energy,
            non_ionising_luminosity: 0.0,
            photon_energy: energy,
            ionised_temperature: TION,
        }
    }

    fn dust_free() -> RadiationTracer {
        RadiationTracer {
            dust_cross_section: Some(0.0),
            ..RadiationTracer::default()
        }
    }

    /// Cells the source can keep ionised, from the recombination budget
    fn stromgren_cells(grid: &HydroGrid, qh: f64) -> usize {
        let alpha = alpha_b_hii(TION);
        let mut sink = 0.0;
        for i in 0..grid.ncells() {
            let r = grid.outer_radius(i);
            sink += 4.0 * PI * r * r * 100.0 * 100.0 * alpha * grid.dx();
            if sink > qh {
                return i;
            }
        }
        grid.ncells()
    }

    #[test]
    fn test_recombination_coefficient_at_1e4() {
        assert_relative_eq!(alpha_b_hii(1e4), 2.59e-13, max_relative = 1e-2);
    }

    #[test]
    fn test_front_matches_recombination_budget() {
        let mut grid = grid();
        let qh = 1e49;
        let summary = dust_free().trace(&mut grid, &input(qh), 0.0, false);

        let expected = stromgren_cells(&grid, qh);
        assert_eq!(summary.front_cell, Some(expected));
        for i in 0..expected {
            assert_eq!(grid.xhii()[i], 1.0);
            assert_relative_eq!(grid.temperature(i), TION, max_relative = 1e-10);
        }
        let partial = grid.xhii()[expected];
        assert!(partial > 0.0 && partial < 1.0);
        assert_eq!(grid.xhii()[expected + 1], 0.0);
        assert_relative_eq!(grid.temperature(expected + 2), 10.0, max_relative = 1e-10);
    }

    #[test]
    fn test_repeated_tracing_converges() {
        let mut grid = grid();
        let tracer = dust_free();
        let photons = input(1e49);
        tracer.trace(&mut grid, &photons, 1e10, false);
        tracer.trace(&mut grid, &photons, 1e10, false);
        let first = grid.xhii().to_vec();
        tracer.trace(&mut grid, &photons, 1e10, false);
        assert_eq!(grid.xhii(), first.as_slice());
    }

    #[test]
    fn test_front_recedes_without_photons() {
        let mut grid = grid();
        let tracer = dust_free();
        tracer.trace(&mut grid, &input(1e49), 0.0, false);
        assert_eq!(grid.xhii()[0], 1.0);

        // A long dark step lets every ionised cell recombine completely
        let summary = tracer.trace(&mut grid, &input(0.0), 1e15, false);
        assert_eq!(summary.front_cell, Some(0));
        assert!(grid.xhii().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_dust_shrinks_the_front() {
        let qh = 1e49;
        let mut clean = grid();
        let clean_front = dust_free().trace(&mut clean, &input(qh), 0.0, false).front_cell;

        let mut dusty = grid();
        let dusty_front = RadiationTracer::default()
            .trace(&mut dusty, &input(qh), 0.0, false)
            .front_cell;
        assert!(dusty_front.unwrap() <= clean_front.unwrap());
        assert!(dusty.qion()[0] < clean.qion()[0]);
    }

    #[test]
    fn test_hot_gas_is_ionised_but_not_cooled() {
        let mut grid = grid();
        grid.set_temperature(1, 1e6);
        dust_free().trace(&mut grid, &input(1e49), 0.0, false);
        assert_eq!(grid.xhii()[1], 1.0);
        assert_relative_eq!(grid.temperature(1), 1e6, max_relative = 1e-10);

        let forced = RadiationTracer {
            force_ionised_temperature: true,
            ..dust_free()
        };
        grid.set_temperature(1, 1e6);
        forced.trace(&mut grid, &input(1e49), 0.0, false);
        assert_relative_eq!(grid.temperature(1), TION, max_relative = 1e-10);
    }

    #[test]
    fn test_radiation_pressure_pushes_outward() {
        let mut grid = grid();
        let mut photons = input(1e49);
        photons.non_ionising_luminosity = 1e39;
        RadiationTracer::default().trace(&mut grid, &photons, 0.0, true);
        assert!(grid.gravity(0) > 0.0);
        assert!((0..grid.ncells()).all(|i| grid.gravity(i) >= 0.0));
    }

    #[test]
    fn test_photoionisation_push_uses_outer_shell_area() {
        let mut grid = grid();
        let photons = input(1e49);
        dust_free().trace(&mut grid, &photons, 0.0, true);
        assert_eq!(grid.xhii()[0], 1.0);

        let (nh, r) = (grid.nh(0), grid.outer_radius(0));
        let recombinations = alpha_b_hii(TION) * nh * nh * 4.0 * PI * r * r * grid.dx();
        let push = recombinations * photons.photon_energy / SPEED_OF_LIGHT;
        assert_relative_eq!(grid.gravity(0), push / grid.mass(0), max_relative = 1e-10);
    }
}
