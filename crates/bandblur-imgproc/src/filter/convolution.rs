use std::ops::Range;

use bandblur_image::Image;

use super::{FilterError, Kernel};
use crate::parallel::BandScheduler;

/// Clamp an accumulated channel value into the `u8` range.
#[inline]
pub fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Compute one output pixel of the convolution of `src` with `kernel`.
///
/// Taps that fall outside the image are skipped: the border pixels are
/// convolved against a smaller neighborhood and the remaining weights are not
/// renormalized. Each tap is rounded on its own, `bias` is added once per
/// in-bounds tap and the running sum is kept as an integer. The sum is only
/// clamped to `[0, 255]` at the end.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `row` - The row of the output pixel.
/// * `col` - The column of the output pixel.
/// * `kernel` - The convolution kernel.
/// * `bias` - The value added per accumulated tap.
///
/// PRECONDITION: `row` and `col` are inside `src`.
pub fn evaluate_pixel<const C: usize>(
    src: &Image<u8, C>,
    row: usize,
    col: usize,
    kernel: &Kernel,
    bias: f32,
) -> [u8; C] {
    let half = kernel.half_size();
    let mut acc = [0i32; C];

    let row_lo = row.saturating_sub(half);
    let row_hi = (row + half).min(src.rows() - 1);
    let col_lo = col.saturating_sub(half);
    let col_hi = (col + half).min(src.cols() - 1);

    for sy in row_lo..=row_hi {
        let ky = sy + half - row;
        for sx in col_lo..=col_hi {
            let kx = sx + half - col;
            let weight = kernel.weight(ky, kx);
            let pixel = src.pixel(sy, sx);
            for ch in 0..C {
                let term = (pixel[ch] as f32 * weight).round();
                acc[ch] = (acc[ch] as f64 + term as f64 + bias as f64) as i32;
            }
        }
    }

    acc.map(clamp_channel)
}

/// Check that a kernel fits inside the image.
pub fn check_kernel_fits<const C: usize>(
    src: &Image<u8, C>,
    kernel: &Kernel,
) -> Result<(), FilterError> {
    let side = src.rows().min(src.cols());
    if kernel.size() > side {
        return Err(FilterError::KernelTooLarge(kernel.size(), side));
    }
    Ok(())
}

/// Convolve the rows `rows` of `src` into a full-width output band.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `band` - The output rows `rows`, row-major and channel-interleaved.
/// * `rows` - The image rows covered by `band`.
/// * `kernel` - The convolution kernel.
/// * `bias` - The value added per accumulated tap.
/// * `scheduler` - Distributes the pixels of the band over threads.
pub fn convolve_band<const C: usize>(
    src: &Image<u8, C>,
    band: &mut [u8],
    rows: Range<usize>,
    kernel: &Kernel,
    bias: f32,
    scheduler: &BandScheduler,
) -> Result<(), FilterError> {
    check_kernel_fits(src, kernel)?;

    let expected = src.row_band(rows.clone())?.len();
    if band.len() != expected {
        return Err(FilterError::InvalidBandLength(band.len(), expected));
    }
    if rows.is_empty() {
        return Ok(());
    }

    scheduler.for_each_pixel(band, C, src.cols(), rows.start, |row, col, pixel| {
        pixel.copy_from_slice(&evaluate_pixel(src, row, col, kernel, bias));
    })?;

    Ok(())
}

/// Convolve a full image on the current thread.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel` - The convolution kernel.
/// * `bias` - The value added per accumulated tap.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn convolve<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    kernel: &Kernel,
    bias: f32,
) -> Result<(), FilterError> {
    if src.size() != dst.size() {
        return Err(bandblur_image::ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        )
        .into());
    }
    check_kernel_fits(src, kernel)?;

    let cols = src.cols();
    dst.as_slice_mut()
        .chunks_exact_mut(C)
        .enumerate()
        .for_each(|(i, pixel)| {
            pixel.copy_from_slice(&evaluate_pixel(src, i / cols, i % cols, kernel, bias));
        });

    Ok(())
}
