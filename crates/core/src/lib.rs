//! Stellar Feedback Core Library
//!
//! Couples stellar feedback to a one-dimensional spherical hydrodynamics
//! solver: winds, supernovae and ionising radiation from massive stars,
//! together with radiative cooling and self-gravity, integrated step by step
//! around a uniform or prepared gas cloud.
//!
//! ## Structure
//!
//! - [`solver`]: the hydro solver seam and the bundled HLL reference solver
//! - [`grid`]: cgs view of the solver state plus the grid-side arrays
//!   (ionisation fraction, metallicity, magnetic field, photon flux)
//! - [`physics`]: cooling, gravity and ionisation-front tracing
//! - [`sources`]: feedback sources and the per-step injector
//! - [`stellar`]: stellar evolution seams the table-driven star uses
//! - [`simulation`]: the [`Integrator`], snapshots, savers and timing
//! - [`analysis`]: closed-form test solutions

// Core types and utilities
pub mod core_types;
pub mod error;

// Hydro state
pub mod grid;
pub mod solver;

// Feedback physics
pub mod physics;
pub mod sources;
pub mod stellar;

// Driver and validation
pub mod analysis;
pub mod simulation;

// Re-export core types
pub use core_types::units::{MYR, PARSEC, SOLAR_MASS, YEAR};
pub use core_types::CodeUnits;
pub use error::{FeedbackError, Result};

// Re-export the driver
pub use grid::{FieldKind, HydroGrid};
pub use simulation::{GridSetup, Integrator, IntegratorConfig, Saver, Snapshot};
pub use sources::{Source, SourceId};
