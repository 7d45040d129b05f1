//! Feedback sources
//!
//! A source decides each step what it wants to deposit and hands it to the
//! [`Injector`]. Sources do not know about each other; the injector adds
//! their mass and energy and picks the hardest photon spectrum.
//!
//! # Ordering
//!
//! Sources run in the order they were added. Only the photon energy and
//! ionised temperature depend on that order (on exact ties the earlier
//! source wins); every additive quantity is order independent.

mod injector;
mod simple_radiation;
mod supernova;
mod table_star;
mod wind;

pub use injector::Injector;
pub use simple_radiation::{SimpleRadiationSource, DEFAULT_IONISED_TEMPERATURE};
pub use supernova::SupernovaSource;
pub use table_star::TableStarSource;
pub use wind::WindSource;

use crate::simulation::StepControl;

/// Whether a source stays registered after this step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Active,
    /// Nothing left to inject, drop it from the list
    Spent,
}

/// Handle returned when a source is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

/// Every kind of feedback the integrator knows how to inject
#[derive(Debug)]
pub enum Source {
    Wind(WindSource),
    Supernova(SupernovaSource),
    TableStar(TableStarSource),
    SimpleRadiation(SimpleRadiationSource),
}

impl Source {
    /// Constant wind, see [`WindSource::new`]
    pub fn wind(luminosity: f64, mass_loss_rate: f64) -> Self {
        Self::Wind(WindSource::new(luminosity, mass_loss_rate))
    }

    /// Single explosion, see [`SupernovaSource::new`]
    pub fn supernova(energy: f64, mass: f64, trigger_time: f64) -> Self {
        Self::Supernova(SupernovaSource::new(energy, mass, trigger_time))
    }

    /// Lyman-limit photon source, see [`SimpleRadiationSource::new`]
    pub fn simple_radiation(photon_rate: f64, ionised_temperature: f64) -> Self {
        Self::SimpleRadiation(SimpleRadiationSource::new(photon_rate, ionised_temperature))
    }

    /// Add this step's contribution to `injector`
    pub fn inject(&mut self, ctx: &mut StepControl<'_>, injector: &mut Injector) -> SourceStatus {
        match self {
            Self::Wind(s) => s.inject(ctx, injector),
            Self::Supernova(s) => s.inject(ctx, injector),
            Self::TableStar(s) => s.inject(ctx, injector),
            Self::SimpleRadiation(s) => s.inject(injector),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Wind(_) => "wind",
            Self::Supernova(_) => "supernova",
            Self::TableStar(_) => "table star",
            Self::SimpleRadiation(_) => "simple radiation",
        }
    }
}

impl From<WindSource> for Source {
    fn from(s: WindSource) -> Self {
        Self::Wind(s)
    }
}

impl From<SupernovaSource> for Source {
    fn from(s: SupernovaSource) -> Self {
        Self::Supernova(s)
    }
}

impl From<TableStarSource> for Source {
    fn from(s: TableStarSource) -> Self {
        Self::TableStar(s)
    }
}

impl From<SimpleRadiationSource> for Source {
    fn from(s: SimpleRadiationSource) -> Self {
        Self::SimpleRadiation(s)
    }
}

/// Registered sources in insertion order
#[derive(Debug, Default)]
pub struct SourceList {
    next_id: u64,
    entries: Vec<(SourceId, Source)>,
}

impl SourceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: impl Into<Source>) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, source.into()));
        id
    }

    /// Remove a source, returning it if it was still registered
    pub fn remove(&mut self, id: SourceId) -> Option<Source> {
        let index = self.entries.iter().position(|(i, _)| *i == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &Source)> {
        self.entries.iter().map(|(id, s)| (*id, s))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Let every source contribute, dropping the ones that are spent
    pub fn inject_all(&mut self, ctx: &mut StepControl<'_>, injector: &mut Injector) {
        self.entries
            .retain_mut(|(_, source)| source.inject(ctx, injector) == SourceStatus::Active);
    }
}
