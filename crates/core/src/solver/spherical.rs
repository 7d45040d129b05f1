//! Reference spherical hydro solver
//!
//! This module provides a CPU implementation of the `HydroSolver` trait: a
//! first-order conservative finite-volume scheme on a uniform radial grid
//! with HLL fluxes. It is deliberately simple. It stands in for a
//! production Lagrangian-remap code wherever the engine needs a real solver
//! (tests, small runs), and it conserves mass and total energy to roundoff
//! when no gas leaves the grid and gravity is off.
//!
//! Boundaries:
//! - inner edge: reflecting (mirror velocity)
//! - outer edge: zero-gradient inflow/outflow

use super::hll::{hll_flux_euler, max_signal_speed, EulerState, Primitive};
use super::r#trait::{GridGeometry, HydroSolver};
use crate::error::{FeedbackError, Result};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Default Courant number
const DEFAULT_CFL: f64 = 0.25;

/// Density floor in code units
const DENSITY_FLOOR: f64 = 1e-30;

/// Pressure floor in code units
const PRESSURE_FLOOR: f64 = 1e-30;

/// First-order HLL finite-volume solver on a spherical radial grid
#[derive(Debug, Clone)]
pub struct SphericalHllSolver {
    cfl: f64,
    gamma: f64,
    xmin: f64,
    xmax: f64,
    dx: f64,

    // Inner radius of each cell
    positions: Vec<f64>,
    // Face areas (ncells + 1) and cell volumes, including the 4π factor
    face_area: Vec<f64>,
    volume: Vec<f64>,

    density: Vec<f64>,
    pressure: Vec<f64>,
    velocity: Vec<f64>,
    gravity: Vec<f64>,

    time: f64,
    inverse_dt_limit: f64,
}

impl SphericalHllSolver {
    /// Create an unallocated solver with the default Courant number
    #[must_use]
    pub fn new() -> Self {
        Self::with_cfl(DEFAULT_CFL)
    }

    /// Create an unallocated solver with a custom Courant number
    ///
    /// # Arguments
    ///
    /// * `cfl` - Courant number; values above ~0.3 can drain the central
    ///   cell in a single step because its volume is a third of `A * dx`
    #[must_use]
    pub fn with_cfl(cfl: f64) -> Self {
        Self {
            cfl,
            gamma: 5.0 / 3.0,
            xmin: 0.0,
            xmax: 0.0,
            dx: 0.0,
            positions: Vec::new(),
            face_area: Vec::new(),
            volume: Vec::new(),
            density: Vec::new(),
            pressure: Vec::new(),
            velocity: Vec::new(),
            gravity: Vec::new(),
            time: 0.0,
            inverse_dt_limit: 0.0,
        }
    }

    /// Courant number in use
    pub fn cfl(&self) -> f64 {
        self.cfl
    }

    fn primitive(&self, i: usize) -> Primitive {
        Primitive {
            rho: self.density[i],
            vel: self.velocity[i],
            pressure: self.pressure[i],
        }
    }

    /// Inverse of the largest stable timestep from the CFL condition
    fn stability_rate(&self) -> f64 {
        let gamma = self.gamma;
        let max_speed = (0..self.ncells())
            .map(|i| max_signal_speed(&self.primitive(i), gamma))
            .fold(0.0_f64, f64::max);
        max_speed / self.dx / self.cfl
    }

    fn face_fluxes(&self) -> Vec<EulerState> {
        let n = self.ncells();
        let gamma = self.gamma;
        (0..=n)
            .into_par_iter()
            .map(|face| {
                if face == 0 {
                    let inner = self.primitive(0);
                    let ghost = Primitive {
                        vel: -inner.vel,
                        ..inner
                    };
                    hll_flux_euler(&ghost, &inner, gamma)
                } else if face == n {
                    let outer = self.primitive(n - 1);
                    hll_flux_euler(&outer, &outer, gamma)
                } else {
                    hll_flux_euler(&self.primitive(face - 1), &self.primitive(face), gamma)
                }
            })
            .collect()
    }
}

impl Default for SphericalHllSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl HydroSolver for SphericalHllSolver {
    fn setup(&mut self, geometry: &GridGeometry) -> Result<()> {
        if geometry.ncells < 3 {
            return Err(FeedbackError::InvalidParameter(format!(
                "solver needs at least 3 cells, got {}",
                geometry.ncells
            )));
        }
        if geometry.xmax.is_nan() || geometry.xmin.is_nan() || geometry.xmax <= geometry.xmin {
            return Err(FeedbackError::InvalidParameter(format!(
                "grid extent must be positive (xmin={}, xmax={})",
                geometry.xmin, geometry.xmax
            )));
        }
        if geometry.gamma.is_nan() || geometry.gamma <= 1.0 {
            return Err(FeedbackError::InvalidParameter(format!(
                "adiabatic index must exceed 1, got {}",
                geometry.gamma
            )));
        }

        let n = geometry.ncells;
        self.gamma = geometry.gamma;
        self.xmin = geometry.xmin;
        self.xmax = geometry.xmax;
        self.dx = (geometry.xmax - geometry.xmin) / n as f64;

        let edge = |j: usize| self.xmin + j as f64 * self.dx;
        self.positions = (0..n).map(edge).collect();
        self.face_area = (0..=n).map(|j| 4.0 * PI * edge(j).powi(2)).collect();
        self.volume = (0..n)
            .map(|i| 4.0 / 3.0 * PI * (edge(i + 1).powi(3) - edge(i).powi(3)))
            .collect();

        self.density = vec![1.0; n];
        self.pressure = vec![1.0; n];
        self.velocity = vec![0.0; n];
        self.gravity = vec![0.0; n];
        self.time = 0.0;
        self.inverse_dt_limit = 0.0;
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::with_cfl(self.cfl);
    }

    fn ncells(&self) -> usize {
        self.positions.len()
    }

    fn gamma(&self) -> f64 {
        self.gamma
    }

    fn positions(&self) -> &[f64] {
        &self.positions
    }

    fn xmax(&self) -> f64 {
        self.xmax
    }

    fn density(&self) -> &[f64] {
        &self.density
    }

    fn density_mut(&mut self) -> &mut [f64] {
        &mut self.density
    }

    fn pressure(&self) -> &[f64] {
        &self.pressure
    }

    fn pressure_mut(&mut self) -> &mut [f64] {
        &mut self.pressure
    }

    fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    fn velocity_mut(&mut self) -> &mut [f64] {
        &mut self.velocity
    }

    fn gravity(&self) -> &[f64] {
        &self.gravity
    }

    fn gravity_mut(&mut self) -> &mut [f64] {
        &mut self.gravity
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    fn inverse_dt_limit(&self) -> f64 {
        self.inverse_dt_limit
    }

    fn set_inverse_dt_limit(&mut self, limit: f64) {
        self.inverse_dt_limit = limit;
    }

    fn stability_limit(&self) -> f64 {
        if self.ncells() == 0 {
            return 0.0;
        }
        self.stability_rate()
    }

    fn advance(&mut self) -> Result<()> {
        let n = self.ncells();
        if n == 0 {
            return Err(FeedbackError::Solver(
                "advance called before setup".to_string(),
            ));
        }

        let inverse_dt = self.stability_rate().max(self.inverse_dt_limit);
        if !(inverse_dt.is_finite() && inverse_dt > 0.0) {
            return Err(FeedbackError::Solver(format!(
                "no finite timestep available (inverse dt = {inverse_dt})"
            )));
        }
        let dt = 1.0 / inverse_dt;

        let flux = self.face_fluxes();
        let gamma = self.gamma;

        for i in 0..n {
            let (rho, vel, p, g) = (
                self.density[i],
                self.velocity[i],
                self.pressure[i],
                self.gravity[i],
            );
            let q = EulerState::from_primitive(rho, vel, p, gamma);
            let a_in = self.face_area[i];
            let a_out = self.face_area[i + 1];
            let dt_over_v = dt / self.volume[i];

            let rho_new = q.rho - dt_over_v * (a_out * flux[i + 1].rho - a_in * flux[i].rho);
            let mom_new = q.mom - dt_over_v * (a_out * flux[i + 1].mom - a_in * flux[i].mom)
                + dt_over_v * p * (a_out - a_in)
                + dt * rho * g;
            let energy_new = q.energy
                - dt_over_v * (a_out * flux[i + 1].energy - a_in * flux[i].energy)
                + dt * q.mom * g;

            let rho_new = rho_new.max(DENSITY_FLOOR);
            let vel_new = mom_new / rho_new;
            let internal = energy_new - 0.5 * rho_new * vel_new * vel_new;

            self.density[i] = rho_new;
            self.velocity[i] = vel_new;
            self.pressure[i] = ((gamma - 1.0) * internal).max(PRESSURE_FLOOR);
        }

        self.time += dt;
        // The external limiter only applies to the step it was set for
        self.inverse_dt_limit = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn geometry(ncells: usize) -> GridGeometry {
        GridGeometry {
            ncells,
            xmin: 0.0,
            xmax: 1.0,
            gamma: 5.0 / 3.0,
        }
    }

    fn total(solver: &SphericalHllSolver, f: impl Fn(usize) -> f64) -> f64 {
        (0..solver.ncells()).map(|i| f(i) * solver.volume[i]).sum()
    }

    #[test]
    fn test_setup_builds_uniform_grid() {
        let mut solver = SphericalHllSolver::new();
        solver.setup(&geometry(10)).unwrap();
        assert_eq!(solver.ncells(), 10);
        assert_eq!(solver.positions()[0], 0.0);
        assert_relative_eq!(solver.positions()[5], 0.5, epsilon = 1e-14);
        let sphere: f64 = solver.volume.iter().sum();
        assert_relative_eq!(sphere, 4.0 / 3.0 * PI, max_relative = 1e-12);
    }

    #[test]
    fn test_setup_rejects_tiny_grid() {
        let mut solver = SphericalHllSolver::new();
        assert!(solver.setup(&geometry(2)).is_err());
    }

    #[test]
    fn test_static_gas_stays_static() {
        let mut solver = SphericalHllSolver::new();
        solver.setup(&geometry(32)).unwrap();
        for _ in 0..20 {
            solver.advance().unwrap();
        }
        for i in 0..32 {
            assert!(solver.velocity()[i].abs() < 1e-10, "cell {i} moved");
            assert_relative_eq!(solver.density()[i], 1.0, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_blast_conserves_mass_and_energy() {
        let mut solver = SphericalHllSolver::new();
        solver.setup(&geometry(64)).unwrap();
        solver.pressure_mut()[0] = 1e4;
        let gamma = solver.gamma();
        let energy = |s: &SphericalHllSolver| {
            total(s, |i| {
                s.pressure[i] / (gamma - 1.0) + 0.5 * s.density[i] * s.velocity[i].powi(2)
            })
        };
        let mass0 = total(&solver, |i| solver.density[i]);
        let energy0 = energy(&solver);

        for _ in 0..30 {
            solver.advance().unwrap();
        }

        let mass1 = total(&solver, |i| solver.density[i]);
        assert_relative_eq!(mass1, mass0, max_relative = 1e-10);
        assert_relative_eq!(energy(&solver), energy0, max_relative = 1e-10);
    }

    #[test]
    fn test_inverse_dt_limit_caps_step_and_resets() {
        let mut solver = SphericalHllSolver::new();
        solver.setup(&geometry(16)).unwrap();
        let natural = 1.0 / solver.stability_rate();
        solver.set_inverse_dt_limit(10.0 / natural);
        solver.advance().unwrap();
        assert_relative_eq!(solver.time(), natural / 10.0, max_relative = 1e-12);
        assert_eq!(solver.inverse_dt_limit(), 0.0);
    }

    #[test]
    fn test_advance_before_setup_fails() {
        let mut solver = SphericalHllSolver::new();
        assert!(matches!(solver.advance(), Err(FeedbackError::Solver(_))));
    }
}
