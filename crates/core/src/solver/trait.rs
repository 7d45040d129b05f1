//! Hydro solver trait definition
//!
//! This module defines the `HydroSolver` trait, the contract between the
//! feedback engine and whatever one-dimensional hydrodynamics code performs
//! the fluid advection. The engine never advects anything itself: it reads
//! and writes primitive variables between steps and asks the solver to
//! advance.
//!
//! All quantities crossing this interface are in solver code units (see
//! [`crate::core_types::CodeUnits`]).

use crate::error::Result;

/// Grid geometry handed to the solver at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    /// Number of radial cells
    pub ncells: usize,
    /// Inner edge of the grid (code units)
    pub xmin: f64,
    /// Outer edge of the grid (code units)
    pub xmax: f64,
    /// Adiabatic index of the gas
    pub gamma: f64,
}

/// Backend-agnostic interface for a one-dimensional spherical hydro solver
///
/// A solver is a single mutable resource: one integrator owns it, and no
/// method is re-entrant.
pub trait HydroSolver {
    /// Allocate and initialise the grid
    ///
    /// # Arguments
    ///
    /// * `geometry` - Cell count, radial extent and adiabatic index
    ///
    /// # Errors
    ///
    /// Returns an error if the geometry cannot be represented
    fn setup(&mut self, geometry: &GridGeometry) -> Result<()>;

    /// Drop all grid state so `setup` can run again
    fn reset(&mut self);

    /// Number of active cells (zero before setup)
    fn ncells(&self) -> usize;

    /// Adiabatic index set at setup
    fn gamma(&self) -> f64;

    /// Inner radius of every cell, with the first cell at the origin
    fn positions(&self) -> &[f64];

    /// Outer edge of the grid
    fn xmax(&self) -> f64;

    /// Mass density per cell
    fn density(&self) -> &[f64];

    /// Mutable mass density per cell
    fn density_mut(&mut self) -> &mut [f64];

    /// Total (thermal + magnetic) pressure per cell
    fn pressure(&self) -> &[f64];

    /// Mutable total pressure per cell
    fn pressure_mut(&mut self) -> &mut [f64];

    /// Radial velocity per cell, positive outward
    fn velocity(&self) -> &[f64];

    /// Mutable radial velocity per cell
    fn velocity_mut(&mut self) -> &mut [f64];

    /// Radial acceleration applied as a source term, positive outward
    fn gravity(&self) -> &[f64];

    /// Mutable radial acceleration per cell
    fn gravity_mut(&mut self) -> &mut [f64];

    /// Internal clock, monotonically increasing across `advance` calls
    fn time(&self) -> f64;

    /// Overwrite the internal clock (used when restoring snapshots)
    fn set_time(&mut self, time: f64);

    /// External inverse-timestep limiter (larger value means smaller next step)
    fn inverse_dt_limit(&self) -> f64;

    /// Set the external inverse-timestep limiter for the next `advance`
    fn set_inverse_dt_limit(&mut self, limit: f64);

    /// Inverse of the largest step the solver's own stability condition
    /// allows in the current state, in code units. Zero for an empty grid.
    fn stability_limit(&self) -> f64;

    /// Evolve the fluid by one internally chosen timestep
    ///
    /// The step length is the smaller of the solver's own stability bound
    /// and `1 / inverse_dt_limit()`. The external limiter is consumed by
    /// the step.
    ///
    /// # Errors
    ///
    /// Returns an error if no finite timestep can be found
    fn advance(&mut self) -> Result<()>;
}
