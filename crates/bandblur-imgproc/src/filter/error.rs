use bandblur_image::ImageError;

use crate::parallel::ParallelError;

/// An error type for the filter module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FilterError {
    /// The kernel side length must be odd so that a center cell exists.
    #[error("kernel size must be odd, got {0}")]
    EvenKernelSize(usize),

    /// The kernel has no cells.
    #[error("kernel size must be > 0")]
    EmptyKernel,

    /// The number of weights does not match the square of the side length.
    #[error("kernel of size {0} expects {1} weights, got {2}")]
    InvalidKernelWeights(usize, usize, usize),

    /// The kernel does not fit in the image.
    #[error("kernel size {0} exceeds the image side {1}")]
    KernelTooLarge(usize, usize),

    /// The destination band does not match the requested rows.
    #[error("band buffer has {0} elements, expected {1}")]
    InvalidBandLength(usize, usize),

    /// The filter preset name is not known.
    #[error("unknown filter preset: {0}")]
    UnknownPreset(String),

    /// Error coming from the image buffers.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error coming from the thread scheduler.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}
