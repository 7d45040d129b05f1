//! Self-gravity of a spherically symmetric gas distribution
//!
//! By Gauss's theorem the acceleration at radius `r` depends only on the
//! mass interior to `r`:
//!
//! g(r) = -G M(<r) / r^2
//!
//! Each cell feels the mass of every cell inside it (excluding itself) plus
//! an optional point mass at the origin. The innermost cell sits at `r = 0`
//! and is assigned zero acceleration.

use crate::core_types::units::GRAVITATIONAL_CONSTANT;
use crate::error::{FeedbackError, Result};
use crate::grid::HydroGrid;
use serde::{Deserialize, Serialize};

/// Which gas feels gravity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GravityMode {
    /// Every cell is accelerated
    #[default]
    WholeVolume,
    /// Only gas perturbed by feedback is accelerated, with the ambient
    /// medium assumed to be turbulently supported. Not implemented.
    PerturbedOnly,
}

/// Radial gravity from the enclosed mass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravitySolver {
    mode: GravityMode,
    /// Point mass at the origin in g
    central_mass: f64,
}

impl GravitySolver {
    pub fn new(mode: GravityMode, central_mass: f64) -> Self {
        Self { mode, central_mass }
    }

    /// Acceleration in cm/s^2 for every cell
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::UnimplementedMode`] for
    /// [`GravityMode::PerturbedOnly`].
    pub fn acceleration(&self, grid: &HydroGrid) -> Result<Vec<f64>> {
        if self.mode == GravityMode::PerturbedOnly {
            return Err(FeedbackError::UnimplementedMode(
                "gravity restricted to perturbed gas is not implemented; use WholeVolume".into(),
            ));
        }

        let mut enclosed = self.central_mass;
        let accel = (0..grid.ncells())
            .map(|i| {
                let r = grid.position(i);
                let g = if r > 0.0 {
                    -GRAVITATIONAL_CONSTANT * enclosed / (r * r)
                } else {
                    0.0
                };
                enclosed += grid.mass(i);
                g
            })
            .collect();
        Ok(accel)
    }

    /// Write the gravitational acceleration into the grid
    ///
    /// # Errors
    ///
    /// See [`GravitySolver::acceleration`].
    pub fn calculate_gravity(&self, grid: &mut HydroGrid) -> Result<()> {
        let accel = self.acceleration(grid)?;
        for (i, g) in accel.into_iter().enumerate() {
            grid.set_gravity(i, g);
        }
        Ok(())
    }

    /// Clear the acceleration field
    pub fn zero(grid: &mut HydroGrid) {
        grid.solver_mut().gravity_mut().fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::units::{CodeUnits, PARSEC, SOLAR_MASS};
    use crate::grid::FieldKind;
    use crate::solver::SphericalHllSolver;
    use approx::assert_relative_eq;

    fn grid() -> HydroGrid {
        let mut grid = HydroGrid::new(Box::new(SphericalHllSolver::new()), CodeUnits::default());
        grid.attach(16, 4.0 * PARSEC, 5.0 / 3.0).unwrap();
        FieldKind::HydrogenDensity.fill(&mut grid, 1000.0).unwrap();
        FieldKind::Temperature.fill(&mut grid, 10.0).unwrap();
        grid
    }

    #[test]
    fn test_gravity_points_inward_and_excludes_own_cell() {
        let mut grid = grid();
        let solver = GravitySolver::new(GravityMode::WholeVolume, 0.0);
        solver.calculate_gravity(&mut grid).unwrap();

        assert_eq!(grid.gravity(0), 0.0);
        let m0 = grid.mass(0);
        let r1 = grid.position(1);
        assert_relative_eq!(
            grid.gravity(1),
            -GRAVITATIONAL_CONSTANT * m0 / (r1 * r1),
            max_relative = 1e-10
        );
        for i in 1..grid.ncells() {
            assert!(grid.gravity(i) < 0.0);
        }
    }

    #[test]
    fn test_central_mass_adds_point_source() {
        let grid = grid();
        let bare = GravitySolver::new(GravityMode::WholeVolume, 0.0)
            .acceleration(&grid)
            .unwrap();
        let with_star = GravitySolver::new(GravityMode::WholeVolume, 100.0 * SOLAR_MASS)
            .acceleration(&grid)
            .unwrap();
        let r = grid.position(5);
        assert_relative_eq!(
            with_star[5] - bare[5],
            -GRAVITATIONAL_CONSTANT * 100.0 * SOLAR_MASS / (r * r),
            max_relative = 1e-10
        );
    }

    #[test]
    fn test_perturbed_only_fails_loudly() {
        let mut grid = grid();
        let solver = GravitySolver::new(GravityMode::PerturbedOnly, 0.0);
        let result = solver.calculate_gravity(&mut grid);
        assert!(matches!(result, Err(FeedbackError::UnimplementedMode(_))));
    }
}
