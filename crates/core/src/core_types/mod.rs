//! Core types and utilities

pub mod units;

pub use units::CodeUnits;
