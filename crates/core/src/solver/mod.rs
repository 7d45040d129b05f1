//! Hydrodynamics solver module
//!
//! The feedback engine never advects gas itself. It drives a one-dimensional
//! spherical hydro solver through the `HydroSolver` trait, reading and
//! writing primitive variables between steps.
//!
//! # Backends
//!
//! - [`SphericalHllSolver`]: first-order HLL finite-volume reference solver
//!   that ships with the crate and backs the scenario tests.
//!
//! Any other 1D code can be plugged in by implementing [`HydroSolver`].
//!
//! # Example
//!
//! ```rust
//! use feedback_core::solver::{GridGeometry, HydroSolver, SphericalHllSolver};
//!
//! let mut solver = SphericalHllSolver::new();
//! solver
//!     .setup(&GridGeometry { ncells: 64, xmin: 0.0, xmax: 10.0, gamma: 5.0 / 3.0 })
//!     .unwrap();
//! solver.advance().unwrap();
//! assert!(solver.time() > 0.0);
//! ```

pub mod hll;
mod spherical;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

// Re-exports
pub use hll::{hll_flux_euler, EulerState, Primitive};
pub use r#trait::{GridGeometry, HydroSolver};
pub use spherical::SphericalHllSolver;
