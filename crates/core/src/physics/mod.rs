//! Physics modules coupled to the hydro step

pub mod cooling;
pub mod gravity;
pub mod radiation;

pub use cooling::{AnalyticIsmCooling, ContactMask, CoolingFunction, CoolingSolver};
pub use gravity::{GravityMode, GravitySolver};
pub use radiation::{alpha_b_hii, PhotonInput, RadiationTracer, TraceSummary};
