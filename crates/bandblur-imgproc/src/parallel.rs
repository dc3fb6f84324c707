use rayon::prelude::*;
use thiserror::Error;

/// Number of threads used per worker when nothing else is requested.
pub const DEFAULT_NUM_THREADS: usize = 5;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The row stride must be valid.
    #[error("row stride must be > 0, got {0}")]
    InvalidRowStride(usize),

    /// The band length is not a whole number of rows.
    #[error("band of length {0} is not a multiple of the row stride {1}")]
    RaggedBand(usize, usize),
}

/// Controls how the pixels of a band are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or as a reference for the parallel paths.
    Serial,

    /// Use the global Rayon thread pool for rows and for the pixels of each row.
    Global,

    /// Run on a dedicated thread pool with `n` threads, built once.
    Fixed(usize),
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Fixed(DEFAULT_NUM_THREADS)
    }
}

/// Schedules per-pixel work over a full-width band of rows.
///
/// Rows of the band are distributed over the threads and, inside each row,
/// the pixels are split again. Every closure call receives its own disjoint
/// pixel slice, so no synchronization is needed on the output.
pub struct BandScheduler {
    strategy: ExecutionStrategy,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for BandScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandScheduler")
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl BandScheduler {
    /// Create a scheduler for the given strategy.
    ///
    /// For [`ExecutionStrategy::Fixed`] the thread pool is built here and reused
    /// by every call to [`BandScheduler::for_each_pixel`].
    pub fn new(strategy: ExecutionStrategy) -> Result<Self, ParallelError> {
        let pool = match strategy {
            ExecutionStrategy::Fixed(0) => return Err(ParallelError::InvalidThreadCount(0)),
            ExecutionStrategy::Fixed(n) => {
                log::debug!("building band thread pool with {n} threads");
                Some(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(n)
                        .build()
                        .map_err(|e| ParallelError::BuildError(e.to_string()))?,
                )
            }
            ExecutionStrategy::Serial | ExecutionStrategy::Global => None,
        };
        Ok(Self { strategy, pool })
    }

    /// Apply `op(row, col, pixel)` to every pixel of a band.
    ///
    /// # Arguments
    ///
    /// * `band` - The output rows, contiguous and channel-interleaved.
    /// * `channels` - The number of elements per pixel.
    /// * `cols` - The number of pixels per row.
    /// * `first_row` - The image row index of the first row of the band.
    /// * `op` - Called once per pixel with its image coordinates.
    pub fn for_each_pixel<T, F>(
        &self,
        band: &mut [T],
        channels: usize,
        cols: usize,
        first_row: usize,
        op: F,
    ) -> Result<(), ParallelError>
    where
        T: Send,
        F: Fn(usize, usize, &mut [T]) + Sync + Send,
    {
        let stride = channels * cols;
        if stride == 0 {
            return Err(ParallelError::InvalidRowStride(stride));
        }
        if band.len() % stride != 0 {
            return Err(ParallelError::RaggedBand(band.len(), stride));
        }

        match (&self.strategy, &self.pool) {
            (ExecutionStrategy::Serial, _) => {
                band.chunks_exact_mut(stride)
                    .enumerate()
                    .for_each(|(r, row)| {
                        row.chunks_exact_mut(channels)
                            .enumerate()
                            .for_each(|(col, pixel)| op(first_row + r, col, pixel));
                    });
            }
            (_, Some(pool)) => {
                pool.install(|| par_for_each_pixel(band, stride, channels, first_row, &op));
            }
            (_, None) => par_for_each_pixel(band, stride, channels, first_row, &op),
        }
        Ok(())
    }
}

fn par_for_each_pixel<T, F>(
    band: &mut [T],
    stride: usize,
    channels: usize,
    first_row: usize,
    op: &F,
) where
    T: Send,
    F: Fn(usize, usize, &mut [T]) + Sync + Send,
{
    band.par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(r, row)| {
            row.par_chunks_exact_mut(channels)
                .enumerate()
                .for_each(|(col, pixel)| op(first_row + r, col, pixel));
        });
}
