//! Wall-clock totals for the phases of a step
//!
//! Names nest: `begin("step")` then `begin("radiation")` accumulates under
//! `.step.radiation`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Column width of the process name in [`ProcessTimer::write_log`]
const NAME_COLUMN: usize = 30;

/// Nested named timer
#[derive(Debug, Default)]
pub struct ProcessTimer {
    stack: String,
    open: Vec<(String, Instant)>,
    totals: BTreeMap<String, f64>,
}

impl ProcessTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing `name` inside whatever is currently open
    pub fn begin(&mut self, name: &str) {
        self.stack.push('.');
        self.stack.push_str(name);
        self.open.push((self.stack.clone(), Instant::now()));
    }

    /// Stop the innermost open timer
    ///
    /// Mismatched names are tolerated; the innermost timer is closed
    /// regardless.
    pub fn end(&mut self, name: &str) {
        let Some((key, start)) = self.open.pop() else {
            return;
        };
        debug_assert!(key.ends_with(name), "timer {key} closed as {name}");
        *self.totals.entry(key).or_insert(0.0) += start.elapsed().as_secs_f64();
        let cut = self.open.last().map_or(0, |(parent, _)| parent.len());
        self.stack.truncate(cut);
    }

    /// Run `f` inside a `begin`/`end` pair
    pub fn scope<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        self.begin(name);
        let out = f();
        self.end(name);
        out
    }

    /// Accumulated seconds for a full dotted name such as `.step.hydro`
    pub fn total(&self, key: &str) -> Option<f64> {
        self.totals.get(key).copied()
    }

    pub fn totals(&self) -> &BTreeMap<String, f64> {
        &self.totals
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Write the totals as a two-column text table
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn write_log<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
        writeln!(out, "{:<NAME_COLUMN$} : Time in seconds", "Process name")?;
        for (name, seconds) in &self.totals {
            writeln!(out, "{name:<NAME_COLUMN$} : {seconds}")?;
        }
        out.flush()
    }
}
