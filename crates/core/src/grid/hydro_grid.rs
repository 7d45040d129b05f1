//! Field accessor layer over the hydro solver
//!
//! `HydroGrid` owns the solver together with the per-cell arrays that only
//! the feedback physics needs (ionisation fraction, metallicity, photon rate,
//! dust cross-section, magnetic field). Every accessor takes and returns cgs
//! values; the conversion to solver code units happens here and nowhere else.
//!
//! Derived quantities follow the ideal-gas relations:
//! - temperature `T = P_th / (nH kB)`
//! - sound speed `cs = sqrt(gamma P_th / rho)`
//! - thermal energy `E_th = P_th V / (gamma - 1)`
//! - magnetic pressure `P_B = B^2 / 8 pi`, carried inside the solver's total pressure

use crate::core_types::units::{
    CodeUnits, BOLTZMANN, GRAVITATIONAL_CONSTANT, HYDROGEN_FRACTION, HYDROGEN_MASS,
};
use crate::error::{FeedbackError, Result};
use crate::solver::{GridGeometry, HydroSolver};
use std::f64::consts::PI;
use std::fmt;

/// Relative tolerance when checking that cells are evenly spaced
const UNIFORMITY_TOLERANCE: f64 = 1e-9;

const EIGHT_PI: f64 = 8.0 * PI;

/// Grid of radial cells backed by a hydro solver
pub struct HydroGrid {
    solver: Box<dyn HydroSolver>,
    units: CodeUnits,

    // Uniform cell width and shell volumes in cgs
    dx: f64,
    volumes: Vec<f64>,

    xhii: Vec<f64>,
    zsolar: Vec<f64>,
    qion: Vec<f64>,
    sigma_dust: Vec<f64>,
    bfield: Vec<f64>,
}

impl fmt::Debug for HydroGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HydroGrid")
            .field("ncells", &self.ncells())
            .field("dx", &self.dx)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

impl HydroGrid {
    /// Wrap a solver. The grid has no cells until [`HydroGrid::attach`] runs.
    pub fn new(solver: Box<dyn HydroSolver>, units: CodeUnits) -> Self {
        Self {
            solver,
            units,
            dx: 0.0,
            volumes: Vec::new(),
            xhii: Vec::new(),
            zsolar: Vec::new(),
            qion: Vec::new(),
            sigma_dust: Vec::new(),
            bfield: Vec::new(),
        }
    }

    /// Set up the solver and allocate the auxiliary arrays
    ///
    /// # Arguments
    ///
    /// * `ncells` - Number of radial cells
    /// * `rmax` - Outer radius of the grid in cm
    /// * `gamma` - Adiabatic index
    ///
    /// # Errors
    ///
    /// Propagates solver setup failures, and returns
    /// [`FeedbackError::NonUniformGrid`] if the solver's cell positions are
    /// not evenly spaced from the origin.
    pub fn attach(&mut self, ncells: usize, rmax: f64, gamma: f64) -> Result<()> {
        let geometry = GridGeometry {
            ncells,
            xmin: 0.0,
            xmax: self.units.distance_to_code(rmax),
            gamma,
        };
        self.solver.setup(&geometry)?;

        let x = self.positions();
        if x.len() < 2 {
            return Err(FeedbackError::InvalidParameter(format!(
                "grid needs at least 2 cells, solver reports {}",
                x.len()
            )));
        }
        let dx = x[1] - x[0];
        for (i, pair) in x.windows(2).enumerate() {
            let width = pair[1] - pair[0];
            if ((width - dx) / dx).abs() > UNIFORMITY_TOLERANCE {
                return Err(FeedbackError::NonUniformGrid {
                    cell: i,
                    width,
                    expected: dx,
                });
            }
        }
        if (x[0] / dx).abs() > UNIFORMITY_TOLERANCE {
            return Err(FeedbackError::NonUniformGrid {
                cell: 0,
                width: x[0],
                expected: 0.0,
            });
        }

        self.dx = dx;
        // Shell volume between x and x + dx
        self.volumes = x
            .iter()
            .map(|&r| 4.0 * PI * (r * r * dx + r * dx * dx + dx * dx * dx / 3.0))
            .collect();

        let n = x.len();
        self.xhii = vec![0.0; n];
        self.zsolar = vec![1.0; n];
        self.qion = vec![0.0; n];
        self.sigma_dust = vec![0.0; n];
        self.bfield = vec![0.0; n];
        Ok(())
    }

    /// Drop all grid state
    pub fn detach(&mut self) {
        self.solver.reset();
        self.dx = 0.0;
        self.volumes.clear();
        self.xhii.clear();
        self.zsolar.clear();
        self.qion.clear();
        self.sigma_dust.clear();
        self.bfield.clear();
    }

    /// Whether `attach` has completed
    pub fn is_ready(&self) -> bool {
        !self.volumes.is_empty()
    }

    pub fn ncells(&self) -> usize {
        self.volumes.len()
    }

    pub fn gamma(&self) -> f64 {
        self.solver.gamma()
    }

    pub fn units(&self) -> &CodeUnits {
        &self.units
    }

    /// Underlying solver (code units)
    pub fn solver(&self) -> &dyn HydroSolver {
        self.solver.as_ref()
    }

    /// Mutable underlying solver (code units)
    pub fn solver_mut(&mut self) -> &mut dyn HydroSolver {
        self.solver.as_mut()
    }

    // ========================================================================
    // GEOMETRY
    // ========================================================================

    /// Inner radius of every cell in cm
    pub fn positions(&self) -> Vec<f64> {
        self.solver
            .positions()
            .iter()
            .map(|&x| self.units.distance_from_code(x))
            .collect()
    }

    /// Inner radius of cell `i` in cm
    pub fn position(&self, i: usize) -> f64 {
        self.units.distance_from_code(self.solver.positions()[i])
    }

    /// Outer radius of cell `i` in cm
    pub fn outer_radius(&self, i: usize) -> f64 {
        self.position(i) + self.dx
    }

    /// Uniform cell width in cm
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Outer edge of the domain in cm
    pub fn rmax(&self) -> f64 {
        self.units.distance_from_code(self.solver.xmax())
    }

    /// Shell volume of cell `i` in cm^3
    pub fn volume(&self, i: usize) -> f64 {
        self.volumes[i]
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    /// Area of the outer face of cell `i` in cm^2
    pub fn outer_area(&self, i: usize) -> f64 {
        4.0 * PI * self.outer_radius(i).powi(2)
    }

    // ========================================================================
    // PRIMITIVES
    // ========================================================================

    /// Mass density in g/cm^3
    pub fn density(&self, i: usize) -> f64 {
        self.units.density_from_code(self.solver.density()[i])
    }

    pub fn set_density(&mut self, i: usize, rho: f64) {
        let code = self.units.density_to_code(rho);
        self.solver.density_mut()[i] = code;
    }

    /// Hydrogen number density in cm^-3
    pub fn nh(&self, i: usize) -> f64 {
        self.density(i) * HYDROGEN_FRACTION / HYDROGEN_MASS
    }

    pub fn set_nh(&mut self, i: usize, nh: f64) {
        self.set_density(i, nh * HYDROGEN_MASS / HYDROGEN_FRACTION);
    }

    /// Thermal plus magnetic pressure in erg/cm^3
    pub fn pressure(&self, i: usize) -> f64 {
        self.units.pressure_from_code(self.solver.pressure()[i])
    }

    pub fn set_pressure(&mut self, i: usize, p: f64) {
        let code = self.units.pressure_to_code(p);
        self.solver.pressure_mut()[i] = code;
    }

    /// Thermal pressure only, in erg/cm^3
    pub fn thermal_pressure(&self, i: usize) -> f64 {
        self.pressure(i) - self.magnetic_pressure(i)
    }

    pub fn set_thermal_pressure(&mut self, i: usize, p: f64) {
        let total = p + self.magnetic_pressure(i);
        self.set_pressure(i, total);
    }

    /// Radial velocity in cm/s, positive outward
    pub fn velocity(&self, i: usize) -> f64 {
        self.units.velocity_from_code(self.solver.velocity()[i])
    }

    pub fn set_velocity(&mut self, i: usize, v: f64) {
        let code = self.units.velocity_to_code(v);
        self.solver.velocity_mut()[i] = code;
    }

    /// Radial acceleration in cm/s^2 applied by the solver
    pub fn gravity(&self, i: usize) -> f64 {
        self.units.gravity_from_code(self.solver.gravity()[i])
    }

    pub fn set_gravity(&mut self, i: usize, g: f64) {
        let code = self.units.gravity_to_code(g);
        self.solver.gravity_mut()[i] = code;
    }

    // ========================================================================
    // DERIVED
    // ========================================================================

    /// Gas mass in g
    pub fn mass(&self, i: usize) -> f64 {
        self.density(i) * self.volumes[i]
    }

    /// Set the mass of a cell without changing its velocity or temperature
    ///
    /// Density follows the new mass and thermal pressure scales with it, so
    /// kinetic energy changes by `0.5 * dm * v^2`.
    pub fn set_mass(&mut self, i: usize, mass: f64) {
        let old_rho = self.density(i);
        let pth = self.thermal_pressure(i);
        let new_rho = mass / self.volumes[i];
        self.set_density(i, new_rho);
        if old_rho > 0.0 {
            self.set_thermal_pressure(i, pth * new_rho / old_rho);
        }
    }

    /// Gas temperature in K
    pub fn temperature(&self, i: usize) -> f64 {
        let nh = self.nh(i);
        if nh > 0.0 {
            self.thermal_pressure(i) / (nh * BOLTZMANN)
        } else {
            0.0
        }
    }

    /// Set temperature at fixed density
    pub fn set_temperature(&mut self, i: usize, t: f64) {
        let p = t * self.nh(i) * BOLTZMANN;
        self.set_thermal_pressure(i, p);
    }

    /// Adiabatic sound speed in cm/s
    pub fn sound_speed(&self, i: usize) -> f64 {
        let rho = self.density(i);
        if rho > 0.0 {
            (self.gamma() * self.thermal_pressure(i).max(0.0) / rho).sqrt()
        } else {
            0.0
        }
    }

    pub fn set_sound_speed(&mut self, i: usize, cs: f64) {
        let p = cs * cs * self.density(i) / self.gamma();
        self.set_thermal_pressure(i, p);
    }

    /// Kinetic energy in erg
    pub fn kinetic_energy(&self, i: usize) -> f64 {
        0.5 * self.mass(i) * self.velocity(i).powi(2)
    }

    /// Set kinetic energy by changing the speed, keeping the direction of
    /// motion (outward for gas at rest)
    pub fn set_kinetic_energy(&mut self, i: usize, ke: f64) {
        let mass = self.mass(i);
        if mass <= 0.0 {
            return;
        }
        let speed = (2.0 * ke.max(0.0) / mass).sqrt();
        let sign = if self.velocity(i) < 0.0 { -1.0 } else { 1.0 };
        self.set_velocity(i, sign * speed);
    }

    /// Thermal energy in erg
    pub fn thermal_energy(&self, i: usize) -> f64 {
        self.thermal_pressure(i) * self.volumes[i] / (self.gamma() - 1.0)
    }

    pub fn set_thermal_energy(&mut self, i: usize, te: f64) {
        let p = te * (self.gamma() - 1.0) / self.volumes[i];
        self.set_thermal_pressure(i, p);
    }

    /// Gravitational potential energy of each cell against the mass inside
    /// it (inclusive), in erg. The central cell is assigned zero.
    pub fn gravitational_energy(&self) -> Vec<f64> {
        let mut inside = 0.0;
        (0..self.ncells())
            .map(|i| {
                let m = self.mass(i);
                inside += m;
                let x = self.position(i);
                if x > 0.0 {
                    GRAVITATIONAL_CONSTANT * m * inside / x
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Magnetic pressure in erg/cm^3
    pub fn magnetic_pressure(&self, i: usize) -> f64 {
        self.bfield[i] * self.bfield[i] / EIGHT_PI
    }

    /// Change magnetic pressure, keeping thermal pressure fixed
    pub fn set_magnetic_pressure(&mut self, i: usize, pmag: f64) {
        let pth = self.thermal_pressure(i);
        self.bfield[i] = (EIGHT_PI * pmag.max(0.0)).sqrt();
        self.set_thermal_pressure(i, pth);
    }

    /// Magnetic field strength in Gauss
    pub fn magnetic_field(&self, i: usize) -> f64 {
        self.bfield[i]
    }

    pub fn set_magnetic_field(&mut self, i: usize, b: f64) {
        self.set_magnetic_pressure(i, b * b / EIGHT_PI);
    }

    // ========================================================================
    // AUXILIARY ARRAYS
    // ========================================================================

    /// Hydrogen ionisation fraction in [0, 1]
    pub fn xhii(&self) -> &[f64] {
        &self.xhii
    }

    pub fn xhii_mut(&mut self) -> &mut [f64] {
        &mut self.xhii
    }

    /// Metallicity in solar units
    pub fn zsolar(&self) -> &[f64] {
        &self.zsolar
    }

    pub fn zsolar_mut(&mut self) -> &mut [f64] {
        &mut self.zsolar
    }

    /// Ionising photons per second leaving each cell outward
    pub fn qion(&self) -> &[f64] {
        &self.qion
    }

    pub fn qion_mut(&mut self) -> &mut [f64] {
        &mut self.qion
    }

    /// Dust cross-section per hydrogen atom in cm^2
    pub fn sigma_dust(&self) -> &[f64] {
        &self.sigma_dust
    }

    pub fn sigma_dust_mut(&mut self) -> &mut [f64] {
        &mut self.sigma_dust
    }

    /// Magnetic field per cell in Gauss
    pub fn bfield(&self) -> &[f64] {
        &self.bfield
    }

    /// Overwrite the stored field without touching the solver's pressure.
    /// Used when restoring a snapshot whose total pressure already carries it.
    pub(crate) fn restore_bfield(&mut self, b: &[f64]) {
        self.bfield.copy_from_slice(b);
    }

    // ========================================================================
    // TOTALS
    // ========================================================================

    /// Total gas mass in g
    pub fn total_mass(&self) -> f64 {
        (0..self.ncells()).map(|i| self.mass(i)).sum()
    }

    /// Total kinetic plus thermal energy in erg
    pub fn total_energy(&self) -> f64 {
        (0..self.ncells())
            .map(|i| self.kinetic_energy(i) + self.thermal_energy(i))
            .sum()
    }
}

// ============================================================================
// FIELD DISPATCH
// ============================================================================

/// Every per-cell quantity the grid exposes, for uniform get/set access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Position,
    Volume,
    Density,
    HydrogenDensity,
    Pressure,
    ThermalPressure,
    Velocity,
    Mass,
    Temperature,
    SoundSpeed,
    KineticEnergy,
    ThermalEnergy,
    GravitationalEnergy,
    MagneticPressure,
    MagneticField,
    Gravity,
    IonisedFraction,
    Metallicity,
    PhotonRate,
    DustCrossSection,
}

impl FieldKind {
    /// Whether the field can be written
    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            FieldKind::Position | FieldKind::Volume | FieldKind::GravitationalEnergy
        )
    }

    /// Read the field in one cell (cgs)
    pub fn get(self, grid: &HydroGrid, i: usize) -> f64 {
        match self {
            FieldKind::Position => grid.position(i),
            FieldKind::Volume => grid.volume(i),
            FieldKind::Density => grid.density(i),
            FieldKind::HydrogenDensity => grid.nh(i),
            FieldKind::Pressure => grid.pressure(i),
            FieldKind::ThermalPressure => grid.thermal_pressure(i),
            FieldKind::Velocity => grid.velocity(i),
            FieldKind::Mass => grid.mass(i),
            FieldKind::Temperature => grid.temperature(i),
            FieldKind::SoundSpeed => grid.sound_speed(i),
            FieldKind::KineticEnergy => grid.kinetic_energy(i),
            FieldKind::ThermalEnergy => grid.thermal_energy(i),
            FieldKind::GravitationalEnergy => grid.gravitational_energy()[i],
            FieldKind::MagneticPressure => grid.magnetic_pressure(i),
            FieldKind::MagneticField => grid.magnetic_field(i),
            FieldKind::Gravity => grid.gravity(i),
            FieldKind::IonisedFraction => grid.xhii[i],
            FieldKind::Metallicity => grid.zsolar[i],
            FieldKind::PhotonRate => grid.qion[i],
            FieldKind::DustCrossSection => grid.sigma_dust[i],
        }
    }

    /// Write the field in one cell (cgs)
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::InvalidParameter`] for read-only fields.
    pub fn set(self, grid: &mut HydroGrid, i: usize, value: f64) -> Result<()> {
        match self {
            FieldKind::Position | FieldKind::Volume | FieldKind::GravitationalEnergy => {
                return Err(FeedbackError::InvalidParameter(format!(
                    "{self:?} is derived from the grid and cannot be set; reset and set up the grid instead"
                )));
            }
            FieldKind::Density => grid.set_density(i, value),
            FieldKind::HydrogenDensity => grid.set_nh(i, value),
            FieldKind::Pressure => grid.set_pressure(i, value),
            FieldKind::ThermalPressure => grid.set_thermal_pressure(i, value),
            FieldKind::Velocity => grid.set_velocity(i, value),
            FieldKind::Mass => grid.set_mass(i, value),
            FieldKind::Temperature => grid.set_temperature(i, value),
            FieldKind::SoundSpeed => grid.set_sound_speed(i, value),
            FieldKind::KineticEnergy => grid.set_kinetic_energy(i, value),
            FieldKind::ThermalEnergy => grid.set_thermal_energy(i, value),
            FieldKind::MagneticPressure => grid.set_magnetic_pressure(i, value),
            FieldKind::MagneticField => grid.set_magnetic_field(i, value),
            FieldKind::Gravity => grid.set_gravity(i, value),
            FieldKind::IonisedFraction => grid.xhii[i] = value.clamp(0.0, 1.0),
            FieldKind::Metallicity => grid.zsolar[i] = value.max(0.0),
            FieldKind::PhotonRate => grid.qion[i] = value,
            FieldKind::DustCrossSection => grid.sigma_dust[i] = value,
        }
        Ok(())
    }

    /// Read the field over the whole grid
    pub fn values(self, grid: &HydroGrid) -> Vec<f64> {
        match self {
            FieldKind::GravitationalEnergy => grid.gravitational_energy(),
            _ => (0..grid.ncells()).map(|i| self.get(grid, i)).collect(),
        }
    }

    /// Write the same value into every cell
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::InvalidParameter`] for read-only fields.
    pub fn fill(self, grid: &mut HydroGrid, value: f64) -> Result<()> {
        for i in 0..grid.ncells() {
            self.set(grid, i, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::units::PARSEC;
    use crate::solver::SphericalHllSolver;
    use approx::assert_relative_eq;

    fn grid(ncells: usize) -> HydroGrid {
        let mut grid = HydroGrid::new(Box::new(SphericalHllSolver::new()), CodeUnits::default());
        grid.attach(ncells, 10.0 * PARSEC, 5.0 / 3.0).unwrap();
        FieldKind::HydrogenDensity.fill(&mut grid, 100.0).unwrap();
        FieldKind::Temperature.fill(&mut grid, 1e4).unwrap();
        FieldKind::Velocity.fill(&mut grid, 0.0).unwrap();
        grid
    }

    #[test]
    fn test_attach_computes_geometry() {
        let g = grid(10);
        assert_eq!(g.ncells(), 10);
        assert_relative_eq!(g.dx(), PARSEC, max_relative = 1e-12);
        assert_eq!(g.position(0), 0.0);
        let total: f64 = g.volumes().iter().sum();
        assert_relative_eq!(
            total,
            4.0 / 3.0 * PI * (10.0 * PARSEC).powi(3),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_temperature_roundtrip_through_pressure() {
        let mut g = grid(8);
        g.set_temperature(3, 123.0);
        assert_relative_eq!(g.temperature(3), 123.0, max_relative = 1e-12);
        assert_relative_eq!(g.nh(3), 100.0, max_relative = 1e-12);
    }

    #[test]
    fn test_set_mass_is_elastic() {
        let mut g = grid(8);
        g.set_velocity(4, 1e6);
        let t0 = g.temperature(4);
        let ke0 = g.kinetic_energy(4);
        let m0 = g.mass(4);
        let dm = 0.3 * m0;
        g.set_mass(4, m0 + dm);

        assert_relative_eq!(g.velocity(4), 1e6, max_relative = 1e-12);
        assert_relative_eq!(g.temperature(4), t0, max_relative = 1e-12);
        assert_relative_eq!(
            g.kinetic_energy(4) - ke0,
            0.5 * dm * 1e12,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_kinetic_energy_keeps_direction() {
        let mut g = grid(8);
        g.set_velocity(2, -5e5);
        g.set_kinetic_energy(2, 4.0 * g.kinetic_energy(2));
        assert_relative_eq!(g.velocity(2), -1e6, max_relative = 1e-12);
    }

    #[test]
    fn test_magnetic_pressure_is_separate_from_thermal() {
        let mut g = grid(8);
        let pth = g.thermal_pressure(1);
        g.set_magnetic_field(1, 1e-5);
        assert_relative_eq!(g.thermal_pressure(1), pth, max_relative = 1e-10);
        assert_relative_eq!(
            g.pressure(1),
            pth + 1e-10 / EIGHT_PI,
            max_relative = 1e-10
        );
        assert_relative_eq!(g.magnetic_field(1), 1e-5, max_relative = 1e-12);
    }

    #[test]
    fn test_thermal_energy_uses_gamma() {
        let g = grid(8);
        let expected = 1.5 * g.thermal_pressure(5) * g.volume(5);
        assert_relative_eq!(g.thermal_energy(5), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_read_only_fields_reject_writes() {
        let mut g = grid(4);
        assert!(FieldKind::Position.set(&mut g, 0, 1.0).is_err());
        assert!(!FieldKind::Volume.is_writable());
        assert!(FieldKind::Density.is_writable());
    }

    #[test]
    fn test_ionised_fraction_is_clamped() {
        let mut g = grid(4);
        FieldKind::IonisedFraction.set(&mut g, 0, 1.5).unwrap();
        assert_eq!(g.xhii()[0], 1.0);
        assert_eq!(g.zsolar()[0], 1.0);
    }
}
