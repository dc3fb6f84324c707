//! Filter operations
//!
//! This module provides the convolution filters of the engine.

/// Filter kernels
pub mod kernels;
pub use kernels::Kernel;

/// Convolution operations
mod convolution;
pub use convolution::*;

mod error;
pub use error::FilterError;

/// Named filter presets
mod presets;
pub use presets::FilterPreset;
