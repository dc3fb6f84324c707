use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use bandblur_image::{ImageSize, Rgb8Image};

use crate::error::IoError;

/// Decode a headerless RGB stream into an image.
///
/// The stream holds `size.width * size.height` triplets (red, green, blue),
/// one byte each, row-major. Bytes after the last pixel are ignored.
///
/// # Errors
///
/// Returns [`IoError::TruncatedImage`] when the stream ends early.
pub fn decode_image_rgb_raw<R: Read>(reader: R, size: ImageSize) -> Result<Rgb8Image, IoError> {
    let expected = size.width * size.height * 3;
    let mut data = Vec::with_capacity(expected);
    let got = reader.take(expected as u64).read_to_end(&mut data)?;
    if got != expected {
        return Err(IoError::TruncatedImage { expected, got });
    }
    Ok(Rgb8Image::new(size, data)?)
}

/// Reads a raw RGB image from the given file path.
///
/// # Arguments
///
/// * `file_path` - The path to the raw image.
/// * `size` - The size of the image in pixels; raw files carry no header.
///
/// # Returns
///
/// An image containing the raw image data.
///
/// # Errors
///
/// A missing file or a file shorter than one full image is an error; no
/// partial image is returned.
pub fn read_image_rgb_raw(
    file_path: impl AsRef<Path>,
    size: ImageSize,
) -> Result<Rgb8Image, IoError> {
    let file_path = file_path.as_ref().to_owned();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path));
    }

    let file = File::open(&file_path)?;
    let image = decode_image_rgb_raw(BufReader::new(file), size)?;
    log::debug!("read {} from {}", image.size(), file_path.display());

    Ok(image)
}

/// Writes an RGB image as headerless triplets to the given file path.
///
/// # Arguments
///
/// * `file_path` - The path to the raw image.
/// * `image` - The image to write.
pub fn write_image_rgb_raw(file_path: impl AsRef<Path>, image: &Rgb8Image) -> Result<(), IoError> {
    let mut writer = BufWriter::new(File::create(file_path)?);
    writer.write_all(image.as_slice())?;
    writer.flush()?;
    Ok(())
}
