//! Versioned snapshots of the integrator state
//!
//! A snapshot is zstd-compressed JSON. Solver arrays, the clock and the
//! timestep limiter are stored in solver code units so a restart is bit
//! exact. Sources are not stored; a restarted run must register them again.
//!
//! # Versions
//!
//! | version | adds                 |
//! |---------|----------------------|
//! | 100     | base format          |
//! | 101     | magnetic field       |
//! | 104     | outflow totals       |
//!
//! Fields added by a later version are optional. Older files load with those
//! fields left at their defaults; newer files are rejected.

use crate::error::{FeedbackError, Result};
use crate::grid::HydroGrid;
use crate::simulation::OutflowTotals;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Version written by this build
pub const SNAPSHOT_VERSION: u32 = 104;

/// First version carrying the magnetic field
const MAGNETIC_FIELD_VERSION: u32 = 101;

/// First version carrying the outflow totals
const OUTFLOW_VERSION: u32 = 104;

/// File extension appended when a path has none
pub const SNAPSHOT_EXTENSION: &str = "snap";

/// zstd level used when writing
const COMPRESSION_LEVEL: i32 = 9;

/// Physics switches stored alongside the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Switches {
    pub cooling: bool,
    pub gravity: bool,
}

/// Complete restartable state of a run (sources excluded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub ncells: usize,
    /// Outer radius (cm)
    pub rmax: f64,
    pub gamma: f64,
    /// Clock (code units)
    pub time: f64,
    /// Last step length (code units)
    pub dt: f64,
    /// Solver inverse-timestep limiter (code units)
    pub inverse_dt_limit: f64,
    /// Code units
    pub density: Vec<f64>,
    /// Code units, total pressure
    pub pressure: Vec<f64>,
    /// Code units
    pub velocity: Vec<f64>,
    pub xhii: Vec<f64>,
    pub zsolar: Vec<f64>,
    /// Code units
    pub gravity: Vec<f64>,
    /// Gauss, from version 101
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bfield: Option<Vec<f64>>,
    pub switches: Switches,
    /// From version 104
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outflows: Option<OutflowTotals>,
}

impl Snapshot {
    /// Copy the state of a ready grid
    ///
    /// `time` and `dt` are in code units.
    pub fn capture(
        grid: &HydroGrid,
        time: f64,
        dt: f64,
        switches: Switches,
        outflows: OutflowTotals,
    ) -> Self {
        let solver = grid.solver();
        Self {
            version: SNAPSHOT_VERSION,
            ncells: grid.ncells(),
            rmax: grid.rmax(),
            gamma: grid.gamma(),
            time,
            dt,
            inverse_dt_limit: solver.inverse_dt_limit(),
            density: solver.density().to_vec(),
            pressure: solver.pressure().to_vec(),
            velocity: solver.velocity().to_vec(),
            xhii: grid.xhii().to_vec(),
            zsolar: grid.zsolar().to_vec(),
            gravity: solver.gravity().to_vec(),
            bfield: Some(grid.bfield().to_vec()),
            switches,
            outflows: Some(outflows),
        }
    }

    /// Magnetic field, if the file's version carries it
    pub fn magnetic_field(&self) -> Option<&[f64]> {
        if self.version >= MAGNETIC_FIELD_VERSION {
            self.bfield.as_deref()
        } else {
            None
        }
    }

    /// Outflow totals, if the file's version carries them
    pub fn outflow_totals(&self) -> Option<OutflowTotals> {
        if self.version >= OUTFLOW_VERSION {
            self.outflows
        } else {
            None
        }
    }

    /// Whether `grid` has the same cell count, radius and adiabatic index
    pub fn matches_grid(&self, grid: &HydroGrid) -> bool {
        self.check_grid(grid).is_ok()
    }

    /// # Errors
    ///
    /// Returns [`FeedbackError::NotReady`] if the grid is not set up and
    /// [`FeedbackError::GridMismatch`] naming the first differing parameter.
    pub fn check_grid(&self, grid: &HydroGrid) -> Result<()> {
        if !grid.is_ready() {
            return Err(FeedbackError::NotReady);
        }
        if grid.ncells() != self.ncells {
            return Err(FeedbackError::grid_mismatch("ncells", grid.ncells(), self.ncells));
        }
        if !same(grid.rmax(), self.rmax) {
            return Err(FeedbackError::grid_mismatch("rmax", grid.rmax(), self.rmax));
        }
        if grid.gamma() != self.gamma {
            return Err(FeedbackError::grid_mismatch("gamma", grid.gamma(), self.gamma));
        }
        Ok(())
    }

    /// Overwrite the grid with the stored state
    ///
    /// The clock is restored on the solver; the caller restores its own
    /// bookkeeping of `time` and `dt`.
    ///
    /// # Errors
    ///
    /// Returns the [`Snapshot::check_grid`] errors, or
    /// [`FeedbackError::Serialization`] if an array has the wrong length.
    /// The grid is untouched on error.
    pub fn apply(&self, grid: &mut HydroGrid) -> Result<()> {
        self.validate()?;
        self.check_grid(grid)?;
        let solver = grid.solver_mut();
        solver.density_mut().copy_from_slice(&self.density);
        solver.pressure_mut().copy_from_slice(&self.pressure);
        solver.velocity_mut().copy_from_slice(&self.velocity);
        solver.gravity_mut().copy_from_slice(&self.gravity);
        solver.set_time(self.time);
        solver.set_inverse_dt_limit(self.inverse_dt_limit);
        grid.xhii_mut().copy_from_slice(&self.xhii);
        grid.zsolar_mut().copy_from_slice(&self.zsolar);
        if let Some(b) = self.magnetic_field() {
            grid.restore_bfield(b);
        }
        Ok(())
    }

    /// Write to `path`, adding the `.snap` extension if missing
    ///
    /// The file is written beside its destination and renamed into place,
    /// so a failed save never leaves a truncated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::Io`] on filesystem failures and
    /// [`FeedbackError::Serialization`] if encoding fails.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = with_extension(path.as_ref());
        let json = serde_json::to_string(self)?;
        let compressed = zstd::encode_all(json.as_bytes(), COMPRESSION_LEVEL)?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        if let Err(e) = fs::write(&tmp, &compressed).and_then(|()| fs::rename(&tmp, &path)) {
            fs::remove_file(&tmp).ok();
            return Err(e.into());
        }
        Ok(path)
    }

    /// Read from `path`, adding the `.snap` extension if missing
    ///
    /// # Errors
    ///
    /// - [`FeedbackError::Io`] if the file cannot be read or decompressed
    /// - [`FeedbackError::Serialization`] if it is not a snapshot or its
    ///   arrays do not match its cell count
    /// - [`FeedbackError::UnsupportedVersion`] for files from a newer format
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = with_extension(path.as_ref());
        let compressed = fs::read(&path)?;
        let json = zstd::decode_all(&compressed[..])?;
        let snapshot: Self = serde_json::from_slice(&json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(FeedbackError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        let arrays: [(&str, Option<&[f64]>); 7] = [
            ("density", Some(self.density.as_slice())),
            ("pressure", Some(self.pressure.as_slice())),
            ("velocity", Some(self.velocity.as_slice())),
            ("xhii", Some(self.xhii.as_slice())),
            ("zsolar", Some(self.zsolar.as_slice())),
            ("gravity", Some(self.gravity.as_slice())),
            ("bfield", self.magnetic_field()),
        ];
        for (name, values) in arrays {
            if let Some(values) = values {
                if values.len() != self.ncells {
                    return Err(FeedbackError::Serialization(format!(
                        "snapshot array {name} has {} entries for {} cells",
                        values.len(),
                        self.ncells
                    )));
                }
            }
        }
        Ok(())
    }
}

fn with_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|e| e == SNAPSHOT_EXTENSION) {
        path.to_path_buf()
    } else {
        let mut p = path.as_os_str().to_owned();
        p.push(".");
        p.push(SNAPSHOT_EXTENSION);
        PathBuf::from(p)
    }
}

/// Radii survive a round trip through code units only to rounding
fn same(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
}
