//! Data format used by the heat diffusion simulation

pub mod csv;
pub mod parameters;
pub mod surface;

/// Computation precision
pub type Precision = f32;
