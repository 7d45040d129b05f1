//! Periodic snapshot policy
//!
//! A [`Saver`] decides when the integrator should write a snapshot and what
//! to call it. It can save every `dtout` seconds, at a list of times, or
//! both (whichever comes first). With exact times it also shortens the step
//! so the clock lands on the target.

use std::path::{Path, PathBuf};
use tracing::warn;

/// A save is due once the clock is this close (relative) to the target
const TIME_TOLERANCE: f64 = 1e-6;

/// Handle returned when a saver is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SaverId(pub(crate) u64);

/// When and where to write snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct Saver {
    folder: PathBuf,
    dtout: Option<f64>,
    times_to_save: Vec<f64>,
    force_exact_times: bool,
    output_number: u32,
    last_save: f64,
    saved_times: Vec<f64>,
}

impl Saver {
    /// A saver writing into `folder` with no policy yet
    pub fn new<P: AsRef<Path>>(folder: P) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            dtout: None,
            times_to_save: Vec::new(),
            force_exact_times: false,
            output_number: 0,
            last_save: 0.0,
            saved_times: Vec::new(),
        }
    }

    /// Save every `dtout` seconds, counted from registration or the last save
    pub fn with_interval(mut self, dtout: f64) -> Self {
        self.dtout = Some(dtout);
        self
    }

    /// Save at each of these times (s)
    pub fn with_times(mut self, mut times: Vec<f64>) -> Self {
        times.retain(|t| t.is_finite());
        times.sort_by(f64::total_cmp);
        times.dedup();
        self.times_to_save = times;
        self
    }

    /// Shorten steps so saves land on their target times
    pub fn with_exact_times(mut self, enabled: bool) -> Self {
        self.force_exact_times = enabled;
        self
    }

    /// Number of the last existing output, for restarts
    pub fn with_starting_output_number(mut self, number: u32) -> Self {
        self.output_number = number;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn force_exact_times(&self) -> bool {
        self.force_exact_times
    }

    pub fn output_number(&self) -> u32 {
        self.output_number
    }

    pub fn has_policy(&self) -> bool {
        self.dtout.is_some() || !self.times_to_save.is_empty()
    }

    /// Start counting intervals from `time` (s)
    pub(crate) fn arm(&mut self, time: f64) {
        self.last_save = time;
        if !self.has_policy() {
            warn!(
                "Saver for {} has neither an interval nor a list of times; it will never save",
                self.folder.display()
            );
        }
    }

    /// Earliest time (s) this saver still wants a snapshot at
    pub fn next_target(&self) -> Option<f64> {
        let listed = self
            .times_to_save
            .iter()
            .copied()
            .find(|&t| t >= self.last_save && !self.saved_times.contains(&t));
        let periodic = self.dtout.map(|dt| self.last_save + dt);
        match (listed, periodic) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Whether the clock has reached `target`
    pub fn is_due(&self, time: f64, target: f64) -> bool {
        time >= target - TIME_TOLERANCE * target.abs() && !self.saved_times.contains(&target)
    }

    /// Path of the next output, `folder/snapshot_NNNNN`
    pub(crate) fn next_path(&mut self) -> PathBuf {
        self.output_number += 1;
        self.folder.join(format!("snapshot_{:05}", self.output_number))
    }

    pub(crate) fn mark_saved(&mut self, time: f64, target: f64) {
        self.last_save = time;
        self.saved_times.push(target);
    }
}
