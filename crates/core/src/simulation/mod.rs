//! Simulation driver: the integrator and what it carries between steps
//!
//! [`Integrator`] owns the hydro grid and runs the feedback step. The rest of
//! this module is its machinery: configuration, timestep control, outflow
//! accounting, snapshots, savers and phase timing.

mod config;
mod integrator;
mod outflow;
mod persistence;
mod profiler;
mod saver;
mod timestep;

pub use config::{
    CoolingConfig, GravityConfig, IntegratorConfig, OutflowConfig, RadiationConfig,
    DEFAULT_DUST_CROSS_SECTION,
};
pub use integrator::{GridSetup, Integrator};
pub use outflow::{OutflowTotals, OutflowTracker};
pub use persistence::{Snapshot, Switches, SNAPSHOT_EXTENSION, SNAPSHOT_VERSION};
pub use profiler::ProcessTimer;
pub use saver::{Saver, SaverId};
pub use timestep::StepControl;
