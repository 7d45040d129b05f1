use super::SourceStatus;
use crate::simulation::StepControl;
use crate::sources::Injector;
use tracing::info;

/// A single explosion at a fixed time
///
/// Until the trigger time the source only shortens the step so the clock
/// lands on it. On the first step with `time >= trigger_time` it deposits
/// its mass and energy (as kinetic energy) and is spent.
#[derive(Debug, Clone, PartialEq)]
pub struct SupernovaSource {
    energy: f64,
    mass: f64,
    trigger_time: f64,
    exploded: bool,
}

impl SupernovaSource {
    /// # Arguments
    ///
    /// * `energy` - Explosion energy (erg)
    /// * `mass` - Ejecta mass (g)
    /// * `trigger_time` - Simulation time of the explosion (s)
    pub fn new(energy: f64, mass: f64, trigger_time: f64) -> Self {
        Self {
            energy,
            mass,
            trigger_time,
            exploded: false,
        }
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn trigger_time(&self) -> f64 {
        self.trigger_time
    }

    pub fn has_exploded(&self) -> bool {
        self.exploded
    }

    pub(crate) fn inject(
        &mut self,
        ctx: &mut StepControl<'_>,
        injector: &mut Injector,
    ) -> SourceStatus {
        if self.exploded {
            return SourceStatus::Spent;
        }
        ctx.force_time_target(self.trigger_time);
        if ctx.time() < self.trigger_time {
            return SourceStatus::Active;
        }
        info!(
            "Supernova: injecting {:e} erg and {:e} g at t = {:e} s (target {:e} s)",
            self.energy,
            self.mass,
            ctx.time(),
            self.trigger_time
        );
        injector.add_mass(self.mass);
        injector.add_kinetic_energy(self.energy);
        self.exploded = true;
        SourceStatus::Spent
    }
}
