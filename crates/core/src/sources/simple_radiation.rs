use super::SourceStatus;
use crate::core_types::units::ELECTRON_VOLT;
use crate::sources::Injector;

/// Default temperature of gas ionised by a [`SimpleRadiationSource`] (K)
pub const DEFAULT_IONISED_TEMPERATURE: f64 = 1e4;

/// Monochromatic ionising source at the Lyman limit
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleRadiationSource {
    photon_rate: f64,
    ionised_temperature: f64,
}

impl SimpleRadiationSource {
    /// Every photon carries 13.6 eV
    pub const PHOTON_ENERGY: f64 = 13.6 * ELECTRON_VOLT;

    /// # Arguments
    ///
    /// * `photon_rate` - Ionising photons per second
    /// * `ionised_temperature` - Temperature of the gas it ionises (K)
    pub fn new(photon_rate: f64, ionised_temperature: f64) -> Self {
        Self {
            photon_rate,
            ionised_temperature,
        }
    }

    /// Source at the default ionised temperature of 10^4 K
    pub fn with_photon_rate(photon_rate: f64) -> Self {
        Self::new(photon_rate, DEFAULT_IONISED_TEMPERATURE)
    }

    pub fn photon_rate(&self) -> f64 {
        self.photon_rate
    }

    pub fn ionised_temperature(&self) -> f64 {
        self.ionised_temperature
    }

    pub(crate) fn inject(&self, injector: &mut Injector) -> SourceStatus {
        injector.add_photons(
            self.photon_rate * Self::PHOTON_ENERGY,
            0.0,
            Self::PHOTON_ENERGY,
            self.ionised_temperature,
        );
        SourceStatus::Active
    }
}
