//! Accounting for what leaves through the outer edge of the grid

use crate::grid::HydroGrid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Running totals of everything that has flowed out
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutflowTotals {
    /// g
    pub mass: f64,
    /// g cm/s, signed
    pub momentum: f64,
    /// erg
    pub energy: f64,
    /// Ionising photons
    pub photons: f64,
}

impl fmt::Display for OutflowTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Outflows: (mass: {:e} g, momentum: {:e} g cm/s, energy: {:e} erg, photons: {:e})",
            self.mass, self.momentum, self.energy, self.photons
        )
    }
}

/// Integrates the flux through the outer face of one cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutflowTracker {
    tracked_cell: Option<usize>,
    totals: OutflowTotals,
}

impl OutflowTracker {
    /// Track `tracked_cell`, or the outermost cell if `None`
    pub fn new(tracked_cell: Option<usize>) -> Self {
        Self {
            tracked_cell,
            totals: OutflowTotals::default(),
        }
    }

    pub fn totals(&self) -> OutflowTotals {
        self.totals
    }

    pub(crate) fn restore(&mut self, totals: OutflowTotals) {
        self.totals = totals;
    }

    pub fn clear(&mut self) {
        self.totals = OutflowTotals::default();
    }

    /// Add the flow through the tracked cell's outer face over `dt` (s)
    ///
    /// Inflow into the outermost cell is not counted: a zero-gradient outer
    /// boundary can report small inward velocities there.
    pub fn track_for_step(&mut self, grid: &HydroGrid, dt: f64) {
        let n = grid.ncells();
        if n == 0 {
            return;
        }
        let last = n - 1;
        let cell = self.tracked_cell.map_or(last, |c| c.min(last));

        let rho = grid.density(cell);
        let mut vel = grid.velocity(cell);
        if cell == last {
            vel = vel.max(0.0);
        }
        let flow_volume = vel * grid.outer_area(cell) * dt;
        let energy_density =
            (grid.kinetic_energy(cell) + grid.thermal_energy(cell)) / grid.volume(cell);

        self.totals.mass += rho * flow_volume;
        self.totals.momentum += rho * vel * flow_volume;
        self.totals.energy += energy_density * flow_volume;
        self.totals.photons += grid.qion()[cell] * dt;
    }
}
