use super::SourceStatus;
use crate::core_types::units::{BOLTZMANN, MEAN_PARTICLE_MASS, SOLAR_METALLICITY};
use crate::simulation::StepControl;
use crate::sources::Injector;
use crate::stellar::{IonisedTemperatureTable, StellarTracks};
use std::sync::Arc;
use tracing::{info, warn};

/// A single star whose feedback comes from stellar evolution tracks
///
/// Winds, radiation and the final supernova are looked up from
/// [`StellarTracks`] at the star's current age. The star is silent before
/// its birth time. Once its supernova has gone off it is spent.
pub struct TableStarSource {
    mass: f64,
    birth_time: f64,
    supernova_time: f64,
    winds: bool,
    radiation: bool,
    supernova: bool,
    exploded: bool,
    courant_warned: bool,
    photon_warned: bool,
    tracks: Arc<dyn StellarTracks>,
    ionised_temperatures: Arc<dyn IonisedTemperatureTable>,
}

impl TableStarSource {
    /// A star with winds and radiation; the supernova is opt-in
    ///
    /// # Arguments
    ///
    /// * `mass` - Initial stellar mass (Msun)
    /// * `birth_time` - Simulation time the star is born (s)
    /// * `tracks` - Stellar evolution lookups
    /// * `ionised_temperatures` - Temperature of the gas the star ionises
    pub fn new(
        mass: f64,
        birth_time: f64,
        tracks: Arc<dyn StellarTracks>,
        ionised_temperatures: Arc<dyn IonisedTemperatureTable>,
    ) -> Self {
        let supernova_time = birth_time + tracks.lifetime(mass);
        Self {
            mass,
            birth_time,
            supernova_time,
            winds: true,
            radiation: true,
            supernova: false,
            exploded: false,
            courant_warned: false,
            photon_warned: false,
            tracks,
            ionised_temperatures,
        }
    }

    #[must_use]
    pub fn with_winds(mut self, enabled: bool) -> Self {
        self.winds = enabled;
        self
    }

    #[must_use]
    pub fn with_radiation(mut self, enabled: bool) -> Self {
        self.radiation = enabled;
        self
    }

    #[must_use]
    pub fn with_supernova(mut self, enabled: bool) -> Self {
        self.supernova = enabled;
        self
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn birth_time(&self) -> f64 {
        self.birth_time
    }

    /// Birth time plus lifetime (s)
    pub fn supernova_time(&self) -> f64 {
        self.supernova_time
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
        let age = ctx.time() - self.birth_time;
        if age <= 0.0 {
            return SourceStatus::Active;
        }

        if self.supernova {
            ctx.force_time_target(self.supernova_time);
            if ctx.time() >= self.supernova_time {
                let yields = self.tracks.supernova(self.mass);
                info!(
                    "Table star ({} Msun): supernova with {:e} erg and {:e} g at t = {:e} s",
                    self.mass,
                    yields.energy,
                    yields.mass_loss,
                    ctx.time()
                );
                injector.add_mass(yields.mass_loss);
                injector.add_kinetic_energy(yields.energy);
                self.exploded = true;
                return SourceStatus::Spent;
            }
        }

        let mut effective_temperature = None;
        if self.winds {
            let teff = self.inject_winds(ctx, injector, age);
            effective_temperature = Some(teff);
        }
        if self.radiation {
            let teff = effective_temperature
                .unwrap_or_else(|| self.tracks.effective_temperature(self.mass, age));
            self.inject_radiation(injector, age, teff);
        }
        SourceStatus::Active
    }

    /// Returns the effective temperature used for the wind's heat content
    fn inject_winds(
        &mut self,
        ctx: &mut StepControl<'_>,
        injector: &mut Injector,
        age: f64,
    ) -> f64 {
        let wind = self.tracks.winds(self.mass, age, ctx.dt());
        // Mass first so the kinetic energy lands elastically
        injector.add_mass(wind.mass);
        injector.add_kinetic_energy(wind.energy);
        let teff = self.tracks.effective_temperature(self.mass, age);
        injector.add_thermal_energy(1.5 * BOLTZMANN * wind.mass / MEAN_PARTICLE_MASS * teff);

        match self.tracks.winds(self.mass, age, 1.0).velocity() {
            Some(v) => ctx.courant_limiter(v),
            None if !self.courant_warned => {
                warn!(
                    "Table star ({} Msun) at age {:e} s has no usable wind velocity, \
                     ignoring its courant limit (reported once)",
                    self.mass, age
                );
                self.courant_warned = true;
            }
            None => {}
        }
        teff
    }

    fn inject_radiation(&mut self, injector: &mut Injector, age: f64, teff: f64) {
        let radiation = self.tracks.radiation(self.mass, age);
        let tion = self
            .ionised_temperatures
            .ionised_temperature(teff, SOLAR_METALLICITY);
        let photon_energy = if radiation.ionising_photon_rate > 0.0 {
            radiation.ionising_luminosity / radiation.ionising_photon_rate
        } else {
            if !self.photon_warned {
                warn!(
                    "Table star ({} Msun) at age {:e} s emits no ionising photons (reported once)",
                    self.mass, age
                );
                self.photon_warned = true;
            }
            0.0
        };
        injector.add_photons(
            radiation.ionising_luminosity,
            radiation.non_ionising_luminosity(),
            photon_energy,
            tion,
        );
    }
}

impl std::fmt::Debug for TableStarSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStarSource")
            .field("mass", &self.mass)
            .field("birth_time", &self.birth_time)
            .field("supernova_time", &self.supernova_time)
            .field("winds", &self.winds)
            .field("radiation", &self.radiation)
            .field("supernova", &self.supernova)
            .field("exploded", &self.exploded)
            .finish_non_exhaustive()
    }
}
