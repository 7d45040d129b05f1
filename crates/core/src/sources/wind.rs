use super::SourceStatus;
use crate::simulation::StepControl;
use crate::sources::Injector;
use crate::stellar::WindYield;
use tracing::warn;

/// Constant stellar wind
///
/// Deposits `mass_loss_rate * dt` of mass and `luminosity * dt` of kinetic
/// energy every step, and keeps the step short enough that the wind
/// crosses at most one cell per step.
#[derive(Debug, Clone, PartialEq)]
pub struct WindSource {
    luminosity: f64,
    mass_loss_rate: f64,
    courant_velocity: Option<f64>,
    warned: bool,
}

impl WindSource {
    /// # Arguments
    ///
    /// * `luminosity` - Mechanical luminosity (erg/s)
    /// * `mass_loss_rate` - Mass-loss rate (g/s)
    pub fn new(luminosity: f64, mass_loss_rate: f64) -> Self {
        let courant_velocity = WindYield {
            energy: luminosity,
            mass: mass_loss_rate,
        }
        .velocity();
        Self {
            luminosity,
            mass_loss_rate,
            courant_velocity,
            warned: false,
        }
    }

    pub fn luminosity(&self) -> f64 {
        self.luminosity
    }

    pub fn mass_loss_rate(&self) -> f64 {
        self.mass_loss_rate
    }

    /// Terminal velocity `sqrt(2 L / Mdot)` (cm/s), `None` if degenerate
    pub fn courant_velocity(&self) -> Option<f64> {
        self.courant_velocity
    }

    pub(crate) fn inject(
        &mut self,
        ctx: &mut StepControl<'_>,
        injector: &mut Injector,
    ) -> SourceStatus {
        let dt = ctx.dt();
        injector.add_mass(self.mass_loss_rate * dt);
        injector.add_kinetic_energy(self.luminosity * dt);
        match self.courant_velocity {
            Some(v) => ctx.courant_limiter(v),
            None if !self.warned => {
                warn!(
                    "Wind with luminosity {:e} erg/s and mass loss {:e} g/s has no usable velocity, \
                     ignoring its courant limit",
                    self.luminosity, self.mass_loss_rate
                );
                self.warned = true;
            }
            None => {}
        }
        SourceStatus::Active
    }
}
