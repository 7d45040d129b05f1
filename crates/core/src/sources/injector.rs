//! Per-step accumulator for everything the sources deposit
//!
//! Sources never write to the grid themselves. Each step the integrator
//! clears the injector, lets every source add to it, then flushes it into
//! the innermost cell in a fixed order.

use crate::grid::HydroGrid;
use crate::physics::PhotonInput;

/// Pending mass, energy and photon budget for the current step
///
/// Mass, energies and luminosities add up. Photon energy and ionised
/// temperature keep the largest value seen this step, so when two sources
/// disagree the harder spectrum wins; ties go to the first source in list
/// order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Injector {
    mass: f64,
    kinetic_energy: f64,
    thermal_energy: f64,
    ionising_luminosity: f64,
    non_ionising_luminosity: f64,
    photon_energy: f64,
    ionised_temperature: f64,
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Mass to add (g)
    pub fn add_mass(&mut self, mass: f64) {
        self.mass += mass;
    }

    /// Kinetic energy to add (erg)
    pub fn add_kinetic_energy(&mut self, energy: f64) {
        self.kinetic_energy += energy;
    }

    /// Thermal energy to add (erg)
    pub fn add_thermal_energy(&mut self, energy: f64) {
        self.thermal_energy += energy;
    }

    /// Register a photon source
    ///
    /// # Arguments
    ///
    /// * `ionising_luminosity` - Luminosity above 13.6 eV (erg/s)
    /// * `non_ionising_luminosity` - Luminosity below 13.6 eV (erg/s)
    /// * `photon_energy` - Mean energy of an ionising photon (erg)
    /// * `ionised_temperature` - Equilibrium temperature of the gas it ionises (K)
    pub fn add_photons(
        &mut self,
        ionising_luminosity: f64,
        non_ionising_luminosity: f64,
        photon_energy: f64,
        ionised_temperature: f64,
    ) {
        self.ionising_luminosity += ionising_luminosity;
        self.non_ionising_luminosity += non_ionising_luminosity;
        if photon_energy > self.photon_energy {
            self.photon_energy = photon_energy;
        }
        if ionised_temperature > self.ionised_temperature {
            self.ionised_temperature = ionised_temperature;
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.kinetic_energy
    }

    pub fn thermal_energy(&self) -> f64 {
        self.thermal_energy
    }

    /// Whether any source contributed luminosity this step
    pub fn has_photons(&self) -> bool {
        self.ionising_luminosity > 0.0 || self.non_ionising_luminosity > 0.0
    }

    /// Accumulated photon budget for the radiation tracer
    pub fn photon_input(&self) -> PhotonInput {
        PhotonInput {
            ionising_luminosity: self.ionising_luminosity,
            non_ionising_luminosity: self.non_ionising_luminosity,
            photon_energy: self.photon_energy,
            ionised_temperature: self.ionised_temperature,
        }
    }

    /// Flush mass and energy into the innermost cell
    ///
    /// Mass goes first and is elastic, so the cell keeps its velocity and
    /// temperature; the energies are then layered on top.
    pub fn apply(&self, grid: &mut HydroGrid) {
        if self.mass > 0.0 {
            let mass = grid.mass(0) + self.mass;
            grid.set_mass(0, mass);
        }
        if self.thermal_energy > 0.0 {
            let energy = grid.thermal_energy(0) + self.thermal_energy;
            grid.set_thermal_energy(0, energy);
        }
        if self.kinetic_energy > 0.0 {
            let energy = grid.kinetic_energy(0) + self.kinetic_energy;
            grid.set_kinetic_energy(0, energy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::units::PARSEC;
    use crate::core_types::CodeUnits;
    use crate::solver::SphericalHllSolver;
    use approx::assert_relative_eq;

    fn grid() -> HydroGrid {
        let mut grid = HydroGrid::new(Box::new(SphericalHllSolver::new()), CodeUnits::default());
        grid.attach(16, 16.0 * PARSEC, 5.0 / 3.0).unwrap();
        grid
    }

    #[test]
    fn test_photon_energy_takes_maximum() {
        let mut injector = Injector::new();
        injector.add_photons(1e38, 0.0, 2.2e-11, 8000.0);
        injector.add_photons(2e38, 1e38, 3.0e-11, 7000.0);
        let input = injector.photon_input();
        assert_relative_eq!(input.ionising_luminosity, 3e38, max_relative = 1e-12);
        assert_eq!(input.photon_energy, 3.0e-11);
        assert_eq!(input.ionised_temperature, 8000.0);
        assert!(injector.has_photons());

        injector.clear();
        assert!(!injector.has_photons());
        assert_eq!(injector, Injector::default());
    }

    #[test]
    fn test_apply_adds_energy_to_innermost_cell() {
        let mut grid = grid();
        let mass = grid.mass(0);
        let thermal = grid.thermal_energy(0);
        let neighbour = grid.mass(1);

        let mut injector = Injector::new();
        injector.add_mass(0.5 * mass);
        injector.add_thermal_energy(1e45);
        injector.add_kinetic_energy(1e44);
        injector.apply(&mut grid);

        assert_relative_eq!(grid.mass(0), 1.5 * mass, max_relative = 1e-12);
        assert_relative_eq!(grid.kinetic_energy(0), 1e44, max_relative = 1e-9);
        // Elastic mass addition scales the thermal energy with the mass
        assert_relative_eq!(
            grid.thermal_energy(0),
            1.5 * thermal + 1e45,
            max_relative = 1e-9
        );
        assert_eq!(grid.mass(1), neighbour);
    }
}
