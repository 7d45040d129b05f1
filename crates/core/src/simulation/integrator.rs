//! The step loop coupling feedback physics to the hydro solver

use super::config::IntegratorConfig;
use super::outflow::{OutflowTotals, OutflowTracker};
use super::persistence::{Snapshot, Switches};
use super::profiler::ProcessTimer;
use super::saver::{Saver, SaverId};
use super::timestep::{self, StepControl};
use crate::core_types::units::{BOLTZMANN, MEAN_PARTICLE_MASS, PARSEC};
use crate::core_types::CodeUnits;
use crate::error::{FeedbackError, Result};
use crate::grid::HydroGrid;
use crate::physics::{
    AnalyticIsmCooling, ContactMask, CoolingFunction, CoolingSolver, GravityMode, GravitySolver,
    TraceSummary,
};
use crate::solver::{HydroSolver, SphericalHllSolver};
use crate::sources::{Injector, Source, SourceId, SourceList};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

thread_local! {
    /// Whether an integrator currently owns a solver on this thread
    static LIVE: Cell<bool> = const { Cell::new(false) };
}

/// Grid parameters for [`Integrator::setup`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSetup {
    pub ncells: usize,
    /// Outer radius (cm)
    pub rmax: f64,
    /// Initial hydrogen number density (cm^-3)
    pub n0: f64,
    /// Initial temperature (K)
    pub t0: f64,
    pub gamma: f64,
}

impl Default for GridSetup {
    fn default() -> Self {
        Self {
            ncells: 512,
            rmax: 20.0 * PARSEC,
            n0: 1000.0,
            t0: 10.0,
            gamma: 5.0 / 3.0,
        }
    }
}

/// Drives the feedback step and owns simulation time
///
/// One integrator owns the hydro solver; constructing a second one on the
/// same thread while the first is alive fails with
/// [`FeedbackError::IntegratorAlreadyLive`].
///
/// # Lifecycle
///
/// `new` → [`setup`](Self::setup) → [`step`](Self::step)* →
/// [`reset`](Self::reset) → `setup` again. Stepping before setup fails with
/// [`FeedbackError::NotReady`]; a second `setup` while ready is a no-op.
///
/// # Example
///
/// ```
/// use feedback_core::simulation::{GridSetup, Integrator};
/// use feedback_core::sources::Source;
///
/// let mut integrator = Integrator::new().unwrap();
/// integrator
///     .setup(&GridSetup { ncells: 64, ..GridSetup::default() })
///     .unwrap();
/// integrator.add_source(Source::wind(1e36, 1e20));
/// for _ in 0..3 {
///     integrator.step().unwrap();
/// }
/// assert!(integrator.time() > 0.0);
/// ```
#[derive(Debug)]
pub struct Integrator {
    grid: HydroGrid,
    config: IntegratorConfig,
    cooling: CoolingSolver,
    sources: SourceList,
    injector: Injector,
    savers: Vec<(SaverId, Saver)>,
    next_saver_id: u64,
    outflow: OutflowTracker,
    timer: ProcessTimer,
    /// Clock (code units)
    time_code: f64,
    /// Last step length (code units)
    dt_code: f64,
    last_trace: Option<TraceSummary>,
}

impl Integrator {
    /// Integrator on the built-in solver with default units and config
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::IntegratorAlreadyLive`] if another
    /// integrator exists on this thread.
    pub fn new() -> Result<Self> {
        Self::with_config(IntegratorConfig::default())
    }

    /// Integrator on the built-in solver
    ///
    /// # Errors
    ///
    /// As [`Integrator::with_solver`].
    pub fn with_config(config: IntegratorConfig) -> Result<Self> {
        Self::with_solver(
            Box::new(SphericalHllSolver::new()),
            CodeUnits::default(),
            config,
        )
    }

    /// # Arguments
    ///
    /// * `solver` - Hydro solver the integrator takes ownership of
    /// * `units` - Conversion between cgs and the solver's code units
    /// * `config` - Physics switches and tunables
    ///
    /// # Errors
    ///
    /// Returns the [`IntegratorConfig::validate`] errors, or
    /// [`FeedbackError::IntegratorAlreadyLive`] if another integrator
    /// exists on this thread.
    pub fn with_solver(
        solver: Box<dyn HydroSolver>,
        units: CodeUnits,
        config: IntegratorConfig,
    ) -> Result<Self> {
        config.validate()?;
        if LIVE.with(|live| live.replace(true)) {
            return Err(FeedbackError::IntegratorAlreadyLive);
        }
        let cooling = CoolingSolver::new(
            Box::new(AnalyticIsmCooling::default()),
            config.cooling.contact_mask,
            config.cooling.temperature_floor,
        );
        Ok(Self {
            grid: HydroGrid::new(solver, units),
            config,
            cooling,
            sources: SourceList::new(),
            injector: Injector::new(),
            savers: Vec::new(),
            next_saver_id: 0,
            outflow: OutflowTracker::new(config.outflow.tracked_cell),
            timer: ProcessTimer::new(),
            time_code: 0.0,
            dt_code: 0.0,
            last_trace: None,
        })
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Build the grid and fill it with uniform gas at rest
    ///
    /// Does nothing if the grid is already set up; call
    /// [`reset`](Self::reset) first to change it.
    ///
    /// # Errors
    ///
    /// Propagates solver setup failures and
    /// [`FeedbackError::NonUniformGrid`].
    pub fn setup(&mut self, params: &GridSetup) -> Result<()> {
        if self.is_ready() {
            debug!("Integrator already set up, ignoring setup call");
            return Ok(());
        }
        self.grid.attach(params.ncells, params.rmax, params.gamma)?;

        let units = *self.grid.units();
        let rho = units.density_to_code(params.n0 * MEAN_PARTICLE_MASS);
        let pressure = units.pressure_to_code(params.n0 * BOLTZMANN * params.t0);
        let solver = self.grid.solver_mut();
        solver.density_mut().fill(rho);
        solver.pressure_mut().fill(pressure);
        solver.velocity_mut().fill(0.0);
        solver.gravity_mut().fill(0.0);

        self.time_code = self.grid.solver().time();
        self.dt_code = 0.0;
        self.outflow.clear();
        info!(
            "Grid set up: {} cells to {:.3} pc, n0 = {} cm^-3, T0 = {} K, gamma = {:.4}",
            params.ncells,
            params.rmax / PARSEC,
            params.n0,
            params.t0,
            params.gamma
        );
        Ok(())
    }

    /// Tear down the grid and drop every source
    pub fn reset(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.grid.detach();
        self.sources.clear();
        self.injector.clear();
        self.outflow.clear();
        self.time_code = 0.0;
        self.dt_code = 0.0;
        self.last_trace = None;
        info!("Integrator reset");
    }

    pub fn is_ready(&self) -> bool {
        self.grid.is_ready()
    }

    // ========================================================================
    // STEP
    // ========================================================================

    /// Advance the simulation by one hydro step
    ///
    /// Phases, in order:
    /// 1. gravity (or zero acceleration)
    /// 2. cooling over the previous step's length
    /// 3. sources and radiation
    /// 4. hydro advance
    /// 5. clock update
    /// 6. temperature floor
    /// 7. outflow accounting
    /// 8. savers
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::NotReady`] before setup. Gravity, solver
    /// and snapshot failures abort the step where they occur; earlier
    /// phases are not rolled back.
    pub fn step(&mut self) -> Result<()> {
        if !self.is_ready() {
            return Err(FeedbackError::NotReady);
        }
        self.timer.begin("step");
        let result = self.run_phases();
        self.timer.end("step");
        result
    }

    fn run_phases(&mut self) -> Result<()> {
        let dt = self.dt();

        // 1. Gravity
        if self.config.gravity.enabled {
            let gravity =
                GravitySolver::new(self.config.gravity.mode, self.config.gravity.central_mass);
            self.timer.begin("gravity");
            let result = gravity.calculate_gravity(&mut self.grid);
            self.timer.end("gravity");
            result?;
        } else {
            GravitySolver::zero(&mut self.grid);
        }

        // 2. Cooling lags one step behind
        if self.config.cooling.enabled {
            self.timer.begin("cooling");
            self.cooling.solve_cooling(&mut self.grid, dt);
            self.timer.end("cooling");
        }

        // 3. Sources, then radiation
        self.inject_sources(dt);

        // 4. Hydro
        self.timer.begin("hydro");
        let result = self.grid.solver_mut().advance();
        self.timer.end("hydro");
        result?;

        // 5. Clock
        self.update_time();

        // 6. Guard against what the hydro step did to temperatures
        if self.config.cooling.enabled {
            self.cooling.check_temperature(&mut self.grid);
        }

        // 7. Outflow
        self.outflow.track_for_step(&self.grid, self.dt());

        debug!(
            "Step done: t = {:.6e} s, dt = {:.6e} s, sources = {}, front = {:?}",
            self.time(),
            self.dt(),
            self.sources.len(),
            self.last_trace.and_then(|t| t.front_cell)
        );

        // 8. Savers
        self.check_savers()
    }

    fn inject_sources(&mut self, dt: f64) {
        self.injector.clear();
        let time = self.time();
        let dx = self.grid.dx();
        let units = *self.grid.units();
        {
            let mut ctx = StepControl::new(time, dt, dx, units, self.grid.solver_mut());
            self.sources.inject_all(&mut ctx, &mut self.injector);
        }
        self.injector.apply(&mut self.grid);

        let emitting = self.injector.has_photons();
        if emitting && !self.config.radiation.enabled {
            info!("Sources are emitting photons, radiation switched on");
            self.config.radiation.enabled = true;
        }
        if self.config.radiation.enabled {
            let tracer = self.config.radiation.tracer();
            let pressure = self.config.radiation.radiation_pressure && emitting;
            self.timer.begin("radiation");
            let summary =
                tracer.trace(&mut self.grid, &self.injector.photon_input(), dt, pressure);
            self.timer.end("radiation");
            self.last_trace = Some(summary);
        }
    }

    fn update_time(&mut self) {
        let old = self.time_code;
        self.time_code = self.grid.solver().time();
        self.dt_code = self.time_code - old;
    }

    fn check_savers(&mut self) -> Result<()> {
        let mut savers = std::mem::take(&mut self.savers);
        let mut result = Ok(());
        for (_, saver) in &mut savers {
            if let Some(target) = saver.next_target() {
                if saver.is_due(self.time(), target) {
                    let path = saver.next_path();
                    let written = std::fs::create_dir_all(saver.folder())
                        .map_err(FeedbackError::from)
                        .and_then(|()| self.save(&path));
                    match written {
                        Ok(written) => {
                            info!("Saved snapshot {} at t = {:e} s", written.display(), self.time());
                            saver.mark_saved(self.time(), target);
                        }
                        Err(e) => {
                            result = Err(e);
                            break;
                        }
                    }
                }
            }
            // Land the next step on the next target
            if saver.force_exact_times() {
                if let Some(next) = saver.next_target() {
                    self.force_time_target(next);
                }
            }
        }
        self.savers = savers;
        result
    }

    // ========================================================================
    // CLOCK
    // ========================================================================

    /// Simulation time (s)
    pub fn time(&self) -> f64 {
        self.grid.units().time_from_code(self.time_code)
    }

    /// Length of the last step (s)
    pub fn dt(&self) -> f64 {
        self.grid.units().time_from_code(self.dt_code)
    }

    /// Keep the next step short enough that a flow at `velocity` (cm/s)
    /// crosses at most one cell. Only ever tightens the limit.
    pub fn courant_limiter(&mut self, velocity: f64) {
        let units = *self.grid.units();
        let dx = self.grid.dx();
        timestep::courant_limiter(self.grid.solver_mut(), &units, dx, velocity);
    }

    /// Shorten the next step so the clock lands on `target` (s)
    ///
    /// Does nothing for past targets or targets the next step would not
    /// reach anyway. Returns whether the limit was tightened.
    pub fn force_time_target(&mut self, target: f64) -> bool {
        let units = *self.grid.units();
        let time = self.time();
        timestep::force_time_target(self.grid.solver_mut(), &units, time, target)
    }

    // ========================================================================
    // SOURCES AND SAVERS
    // ========================================================================

    pub fn add_source(&mut self, source: impl Into<Source>) -> SourceId {
        let source = source.into();
        debug!("Adding {} source", source.name());
        self.sources.add(source)
    }

    pub fn remove_source(&mut self, id: SourceId) -> Option<Source> {
        self.sources.remove(id)
    }

    pub fn sources(&self) -> &SourceList {
        &self.sources
    }

    /// Register a saver; its interval counts from the current time
    pub fn add_saver(&mut self, mut saver: Saver) -> SaverId {
        saver.arm(self.time());
        if saver.force_exact_times() && self.is_ready() {
            if let Some(target) = saver.next_target() {
                self.force_time_target(target);
            }
        }
        let id = SaverId(self.next_saver_id);
        self.next_saver_id += 1;
        self.savers.push((id, saver));
        id
    }

    pub fn remove_saver(&mut self, id: SaverId) -> Option<Saver> {
        let index = self.savers.iter().position(|(i, _)| *i == id)?;
        Some(self.savers.remove(index).1)
    }

    // ========================================================================
    // SWITCHES
    // ========================================================================

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    pub fn set_cooling(&mut self, enabled: bool) {
        self.config.cooling.enabled = enabled;
    }

    pub fn set_contact_mask(&mut self, mask: ContactMask) {
        self.config.cooling.contact_mask = mask;
        self.cooling.set_mask(mask);
    }

    pub fn set_temperature_floor(&mut self, floor: f64) {
        self.config.cooling.temperature_floor = floor;
        self.cooling.set_temperature_floor(floor);
    }

    /// Replace the cooling model (the default is [`AnalyticIsmCooling`])
    pub fn set_cooling_function(&mut self, function: Box<dyn CoolingFunction>) {
        self.cooling.set_function(function);
    }

    pub fn set_gravity(&mut self, enabled: bool) {
        self.config.gravity.enabled = enabled;
    }

    /// # Errors
    ///
    /// Returns [`FeedbackError::UnimplementedMode`] for
    /// [`GravityMode::PerturbedOnly`].
    pub fn set_gravity_mode(&mut self, mode: GravityMode) -> Result<()> {
        if mode == GravityMode::PerturbedOnly {
            return Err(FeedbackError::UnimplementedMode(
                "gravity mode PerturbedOnly".into(),
            ));
        }
        self.config.gravity.mode = mode;
        Ok(())
    }

    /// Point mass at the origin (g)
    pub fn set_central_mass(&mut self, mass: f64) {
        self.config.gravity.central_mass = mass;
    }

    pub fn set_radiation(&mut self, enabled: bool) {
        self.config.radiation.enabled = enabled;
    }

    pub fn set_radiation_pressure(&mut self, enabled: bool) {
        self.config.radiation.radiation_pressure = enabled;
    }

    // ========================================================================
    // STATE ACCESS
    // ========================================================================

    /// # Errors
    ///
    /// Returns [`FeedbackError::NotReady`] before setup.
    pub fn grid(&self) -> Result<&HydroGrid> {
        if self.is_ready() {
            Ok(&self.grid)
        } else {
            Err(FeedbackError::NotReady)
        }
    }

    /// # Errors
    ///
    /// Returns [`FeedbackError::NotReady`] before setup.
    pub fn grid_mut(&mut self) -> Result<&mut HydroGrid> {
        if self.is_ready() {
            Ok(&mut self.grid)
        } else {
            Err(FeedbackError::NotReady)
        }
    }

    pub fn outflows(&self) -> OutflowTotals {
        self.outflow.totals()
    }

    /// Result of the most recent radiation trace
    pub fn last_trace(&self) -> Option<TraceSummary> {
        self.last_trace
    }

    pub fn timer(&self) -> &ProcessTimer {
        &self.timer
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Snapshot of the current state
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::NotReady`] before setup.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let grid = self.grid()?;
        Ok(Snapshot::capture(
            grid,
            self.time_code,
            self.dt_code,
            self.switches(),
            self.outflow.totals(),
        ))
    }

    /// Write a snapshot to `path` (`.snap` appended if missing)
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::NotReady`] before setup and the
    /// [`Snapshot::write`] errors.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        self.snapshot()?.write(path)
    }

    /// Restore a snapshot from `path`
    ///
    /// A grid with different cell count, radius or adiabatic index is
    /// reset and rebuilt from the file first (which drops the sources).
    ///
    /// # Errors
    ///
    /// Returns the [`Snapshot::read`] errors and setup failures.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let snapshot = Snapshot::read(path.as_ref())?;
        self.restore(&snapshot)?;
        info!(
            "Loaded snapshot {} (version {}) at t = {:e} s",
            path.as_ref().display(),
            snapshot.version,
            self.time()
        );
        Ok(())
    }

    /// Restore an in-memory snapshot, rebuilding the grid if needed
    ///
    /// # Errors
    ///
    /// As [`Integrator::load`], without the file errors.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        if self.is_ready() && !snapshot.matches_grid(&self.grid) {
            info!("Grid properties have changed, resetting grid");
            self.reset();
        }
        if !self.is_ready() {
            self.setup(&GridSetup {
                ncells: snapshot.ncells,
                rmax: snapshot.rmax,
                gamma: snapshot.gamma,
                ..GridSetup::default()
            })?;
        }
        snapshot.apply(&mut self.grid)?;
        self.time_code = snapshot.time;
        self.dt_code = snapshot.dt;
        self.config.cooling.enabled = snapshot.switches.cooling;
        self.config.gravity.enabled = snapshot.switches.gravity;
        if let Some(totals) = snapshot.outflow_totals() {
            self.outflow.restore(totals);
        }
        Ok(())
    }

    fn switches(&self) -> Switches {
        Switches {
            cooling: self.config.cooling.enabled,
            gravity: self.config.gravity.enabled,
        }
    }

    /// Write the phase timings collected so far
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::Io`] if the file cannot be written.
    pub fn write_timing_log<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.timer.write_log(path)?;
        Ok(())
    }
}

impl Drop for Integrator {
    fn drop(&mut self) {
        LIVE.with(|live| live.set(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SupernovaSource;
    use approx::assert_relative_eq;

    fn small() -> GridSetup {
        GridSetup {
            ncells: 32,
            rmax: 10.0 * PARSEC,
            n0: 100.0,
            t0: 100.0,
            gamma: 5.0 / 3.0,
        }
    }

    #[test]
    fn test_step_before_setup_fails() {
        let mut integrator = Integrator::new().unwrap();
        assert!(matches!(integrator.step(), Err(FeedbackError::NotReady)));
        assert!(matches!(integrator.grid(), Err(FeedbackError::NotReady)));
    }

    #[test]
    fn test_second_integrator_is_refused() {
        let first = Integrator::new().unwrap();
        assert!(matches!(
            Integrator::new(),
            Err(FeedbackError::IntegratorAlreadyLive)
        ));
        drop(first);
        assert!(Integrator::new().is_ok());
    }

    #[test]
    fn test_setup_is_idempotent_until_reset() {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&small()).unwrap();
        integrator
            .setup(&GridSetup {
                ncells: 64,
                ..small()
            })
            .unwrap();
        assert_eq!(integrator.grid().unwrap().ncells(), 32);

        integrator.reset();
        assert!(!integrator.is_ready());
        integrator
            .setup(&GridSetup {
                ncells: 64,
                ..small()
            })
            .unwrap();
        assert_eq!(integrator.grid().unwrap().ncells(), 64);
    }

    #[test]
    fn test_setup_fills_uniform_gas() {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&small()).unwrap();
        let grid = integrator.grid().unwrap();
        assert_relative_eq!(grid.nh(7), 100.0, max_relative = 1e-12);
        assert_relative_eq!(grid.temperature(7), 100.0, max_relative = 1e-12);
        assert_eq!(grid.velocity(7), 0.0);
    }

    #[test]
    fn test_time_advances_and_dt_is_last_step() {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&small()).unwrap();
        integrator.step().unwrap();
        let t1 = integrator.time();
        assert!(t1 > 0.0);
        assert_relative_eq!(integrator.dt(), t1, max_relative = 1e-12);
        integrator.step().unwrap();
        assert_relative_eq!(integrator.time() - t1, integrator.dt(), max_relative = 1e-9);
    }

    #[test]
    fn test_only_reachable_targets_shorten_the_step() {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&small()).unwrap();
        integrator.step().unwrap();
        integrator.step().unwrap();
        let (time, dt) = (integrator.time(), integrator.dt());

        assert!(!integrator.force_time_target(time + 1e6 * dt));
        integrator.step().unwrap();
        assert_relative_eq!(integrator.dt(), dt, max_relative = 1e-3);

        let target = integrator.time() + 0.1 * dt;
        assert!(integrator.force_time_target(target));
        integrator.step().unwrap();
        assert!(integrator.time() >= target);
        assert_relative_eq!(integrator.time(), target, max_relative = 1e-6);
    }

    #[test]
    fn test_reset_drops_sources() {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&small()).unwrap();
        integrator.add_source(SupernovaSource::new(1e51, 0.0, 1e20));
        assert_eq!(integrator.sources().len(), 1);
        integrator.reset();
        assert!(integrator.sources().is_empty());
    }

    #[test]
    fn test_perturbed_gravity_fails_loudly() {
        let mut integrator = Integrator::new().unwrap();
        let err = integrator
            .set_gravity_mode(GravityMode::PerturbedOnly)
            .unwrap_err();
        assert!(matches!(err, FeedbackError::UnimplementedMode(_)));
    }

    #[test]
    fn test_gravity_switch_controls_acceleration() {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&small()).unwrap();
        integrator.set_gravity(true);
        integrator.step().unwrap();
        assert!(integrator.grid().unwrap().gravity(10) < 0.0);

        integrator.set_gravity(false);
        integrator.step().unwrap();
        assert_eq!(integrator.grid().unwrap().gravity(10), 0.0);
    }

    #[test]
    fn test_radiation_switches_itself_on() {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&small()).unwrap();
        assert!(!integrator.config().radiation.enabled);
        let id = integrator.add_source(Source::simple_radiation(1e48, 1e4));
        integrator.step().unwrap();
        assert!(integrator.config().radiation.enabled);
        assert!(integrator.grid().unwrap().xhii()[1] > 0.99);

        integrator.remove_source(id);
        integrator.step().unwrap();
        assert!(integrator.config().radiation.enabled);
        assert!(integrator.last_trace().is_some());
    }

    #[test]
    fn test_timer_records_phases() {
        let mut integrator = Integrator::new().unwrap();
        integrator.setup(&small()).unwrap();
        integrator.set_cooling(true);
        integrator.step().unwrap();
        assert!(integrator.timer().total(".step.hydro").is_some());
        assert!(integrator.timer().total(".step.cooling").is_some());
    }
}
