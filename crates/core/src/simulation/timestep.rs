//! Timestep control shared by the integrator and the sources
//!
//! The hydro solver picks its own step from its stability condition. The
//! feedback layer can only shorten it, by raising the solver's external
//! inverse-timestep limiter before `advance`. Two requests exist:
//! - a courant limit for flows the grid has not seen yet (winds)
//! - a time target that the next step must not jump over (supernovae, saves)

use crate::core_types::CodeUnits;
use crate::solver::HydroSolver;

/// Multiplier that makes a targeted step overshoot its target by a hair,
/// so a `time >= target` check after the step is guaranteed to trigger
const TARGET_OVERSHOOT: f64 = 0.999_999_999;

/// Tighten the limiter so a flow at `velocity` (cm/s) crosses at most one
/// cell per step. Never loosens an existing limit.
pub(crate) fn courant_limiter(
    solver: &mut dyn HydroSolver,
    units: &CodeUnits,
    dx: f64,
    velocity: f64,
) {
    if !(velocity.is_finite() && velocity > 0.0 && dx > 0.0) {
        return;
    }
    let inverse_dt = units.velocity_to_code(velocity) / units.distance_to_code(dx);
    let current = solver.inverse_dt_limit();
    solver.set_inverse_dt_limit(current.max(inverse_dt));
}

/// Shorten the next step so it lands on `target` (s)
///
/// Engages only if `target` is strictly in the future and the step the
/// solver would otherwise take jumps over it. Returns whether the limiter
/// was tightened.
pub(crate) fn force_time_target(
    solver: &mut dyn HydroSolver,
    units: &CodeUnits,
    time: f64,
    target: f64,
) -> bool {
    if target <= time {
        return false;
    }
    let inverse_dt = units.time / (target - time) * TARGET_OVERSHOOT;
    let natural = solver.stability_limit().max(solver.inverse_dt_limit());
    if inverse_dt <= natural {
        return false;
    }
    solver.set_inverse_dt_limit(inverse_dt);
    true
}

/// What a source may see and change during one step
///
/// Sources read the clock and ask for shorter steps; they never touch the
/// grid directly. Everything they want to deposit goes through the
/// [`crate::sources::Injector`].
pub struct StepControl<'a> {
    time: f64,
    dt: f64,
    dx: f64,
    units: CodeUnits,
    solver: &'a mut dyn HydroSolver,
}

impl<'a> StepControl<'a> {
    /// # Arguments
    ///
    /// * `time` - Current simulation time (s)
    /// * `dt` - Length of the previous step (s)
    /// * `dx` - Cell width (cm)
    /// * `units` - Solver code units
    /// * `solver` - Solver whose limiter the sources may tighten
    pub fn new(
        time: f64,
        dt: f64,
        dx: f64,
        units: CodeUnits,
        solver: &'a mut dyn HydroSolver,
    ) -> Self {
        Self {
            time,
            dt,
            dx,
            units,
            solver,
        }
    }

    /// Current simulation time (s)
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Length of the previous step (s), used as the injection interval
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// See [`crate::simulation::Integrator::courant_limiter`]
    pub fn courant_limiter(&mut self, velocity: f64) {
        courant_limiter(self.solver, &self.units, self.dx, velocity);
    }

    /// See [`crate::simulation::Integrator::force_time_target`]
    pub fn force_time_target(&mut self, target: f64) -> bool {
        force_time_target(self.solver, &self.units, self.time, target)
    }
}

impl std::fmt::Debug for StepControl<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepControl")
            .field("time", &self.time)
            .field("dt", &self.dt)
            .field("dx", &self.dx)
            .field("inverse_dt_limit", &self.solver.inverse_dt_limit())
            .finish_non_exhaustive()
    }
}
