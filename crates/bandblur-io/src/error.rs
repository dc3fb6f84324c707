/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Error to open, read or write the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// The stream ended before a full image was read.
    #[error("Truncated raw image: expected {expected} bytes, got {got}")]
    TruncatedImage {
        /// Number of bytes a full image needs.
        expected: usize,
        /// Number of bytes actually read.
        got: usize,
    },

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] bandblur_image::ImageError),
}
