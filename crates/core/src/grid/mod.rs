//! Grid-based field access

pub mod hydro_grid;

// Re-export main types
pub use hydro_grid::{FieldKind, HydroGrid};
