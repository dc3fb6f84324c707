#![deny(missing_docs)]
//! Image types for the bandblur convolution engine

/// image representation for the convolution engine.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize, Rgb8Image};
