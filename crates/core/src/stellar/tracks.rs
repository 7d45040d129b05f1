//! Stellar evolution lookups
//!
//! Table-driven star sources ask a [`StellarTracks`] implementation for
//! everything that depends on stellar mass and age. Implementations are
//! pure and deterministic; the crate treats them as opaque.

use std::fmt::Debug;

/// Photon output of a star at a given age
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StellarRadiation {
    /// Hydrogen-ionising photons per second
    pub ionising_photon_rate: f64,
    /// Luminosity in hydrogen-ionising photons (erg/s)
    pub ionising_luminosity: f64,
    /// Bolometric luminosity (erg/s)
    pub bolometric_luminosity: f64,
}

impl StellarRadiation {
    /// Luminosity below the Lyman limit (erg/s), never negative
    pub fn non_ionising_luminosity(&self) -> f64 {
        (self.bolometric_luminosity - self.ionising_luminosity).max(0.0)
    }
}

/// Wind output integrated over an interval
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindYield {
    /// Kinetic energy (erg)
    pub energy: f64,
    /// Mass lost (g)
    pub mass: f64,
}

impl WindYield {
    /// Terminal velocity implied by the energy and mass, if both are usable
    pub fn velocity(&self) -> Option<f64> {
        let v2 = 2.0 * self.energy / self.mass;
        (self.mass > 0.0 && v2.is_finite() && v2 > 0.0).then(|| v2.sqrt())
    }
}

/// Core-collapse supernova yield
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SupernovaYield {
    /// Explosion energy (erg)
    pub energy: f64,
    /// Ejecta mass (g)
    pub mass_loss: f64,
    /// Metal mass in the ejecta (g)
    pub metal_yield: f64,
}

/// Mass- and age-dependent stellar properties
///
/// Masses are initial stellar masses in solar masses; ages and intervals
/// are in seconds; every output is cgs.
pub trait StellarTracks: Debug + Send + Sync {
    /// Time from birth to core collapse (s)
    fn lifetime(&self, mass: f64) -> f64;

    /// Wind energy and mass lost between `age` and `age + dt`
    fn winds(&self, mass: f64, age: f64, dt: f64) -> WindYield;

    /// Effective surface temperature (K)
    fn effective_temperature(&self, mass: f64, age: f64) -> f64;

    /// Photon output at `age`
    fn radiation(&self, mass: f64, age: f64) -> StellarRadiation;

    /// Supernova yield at the end of the star's life
    fn supernova(&self, mass: f64) -> SupernovaYield;
}
