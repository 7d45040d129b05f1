//! Reference solutions for validating runs

pub mod analytic;

pub use analytic::WindBubbleModel;
