//! Stellar evolution and photoionised gas lookups

pub mod ionised_temperature;
pub mod tracks;

pub use ionised_temperature::{
    ConstantIonisedTemperature, GridIonisedTemperatures, IonisedTemperatureTable,
};
pub use tracks::{StellarRadiation, StellarTracks, SupernovaYield, WindYield};
