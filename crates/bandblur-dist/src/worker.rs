use std::{ops::Range, sync::Arc, time::Instant};

use bandblur_image::Rgb8Image;
use bandblur_imgproc::{
    filter::{self, Kernel},
    parallel::BandScheduler,
};

use crate::{
    comm::{Communicator, BAND_TAG},
    config::ClusterConfig,
    error::DistError,
    partition::{partition, COORDINATOR},
};

/// One rank of a distributed convolution.
///
/// Every worker holds the shared read-only `source` and its own `result`
/// buffer of the same size. A pass computes the worker's band of `result`;
/// the coordinator then gathers the bands of all the other workers so that
/// its `result` is complete.
pub struct Worker<C: Communicator> {
    comm: C,
    source: Arc<Rgb8Image>,
    result: Rgb8Image,
    rows: Range<usize>,
    scheduler: BandScheduler,
    config: ClusterConfig,
}

impl<C: Communicator> std::fmt::Debug for Worker<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("rank", &self.comm.rank())
            .field("size", &self.comm.size())
            .field("rows", &self.rows)
            .finish()
    }
}

impl<C: Communicator> Worker<C> {
    /// Create the worker of rank `comm.rank()`.
    ///
    /// # Arguments
    ///
    /// * `comm` - The endpoint of this worker in the process set.
    /// * `source` - The source image, identical on every worker. Must be square.
    /// * `config` - The scheduling and gather configuration.
    pub fn new(comm: C, source: Arc<Rgb8Image>, config: ClusterConfig) -> Result<Self, DistError> {
        if !source.size().is_square() {
            return Err(DistError::NonSquareImage(source.size()));
        }

        let rows = partition(comm.rank(), comm.size(), source.rows())?;
        if rows.is_empty() {
            log::warn!(
                "worker {} has an empty partition ({} rows for {} workers)",
                comm.rank(),
                source.rows(),
                comm.size()
            );
        }

        let scheduler = BandScheduler::new(config.strategy)?;
        let result = Rgb8Image::from_size_val(source.size(), 0u8)?;

        Ok(Self {
            comm,
            source,
            result,
            rows,
            scheduler,
            config,
        })
    }

    /// The rank of this worker.
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    /// Whether this worker assembles the final result.
    pub fn is_coordinator(&self) -> bool {
        self.comm.rank() == COORDINATOR
    }

    /// The rows owned by this worker.
    pub fn partition(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// The result buffer of this worker.
    ///
    /// Only the coordinator's buffer is complete after a pass; the other
    /// workers only hold their own band.
    pub fn result(&self) -> &Rgb8Image {
        &self.result
    }

    /// Mutable access to the endpoint of this worker.
    pub fn comm_mut(&mut self) -> &mut C {
        &mut self.comm
    }

    /// Compute the band of this worker into its own `result`.
    pub fn run_local(&mut self, kernel: &Kernel, bias: f32) -> Result<(), DistError> {
        let band = self.result.row_band_mut(self.rows.clone())?;
        filter::convolve_band(
            self.source.as_ref(),
            band,
            self.rows.clone(),
            kernel,
            bias,
            &self.scheduler,
        )?;
        log::debug!(
            "worker {} computed rows {}..{}",
            self.comm.rank(),
            self.rows.start,
            self.rows.end
        );
        Ok(())
    }

    /// Exchange the bands after [`Worker::run_local`].
    ///
    /// A worker sends its band to the coordinator and blocks until it is taken.
    /// The coordinator receives the bands in increasing rank order and copies
    /// each one into its `result` at the rows of the sender's partition.
    pub fn gather(&mut self) -> Result<(), DistError> {
        if !self.is_coordinator() {
            let band = self.result.row_band(self.rows.clone())?.to_vec();
            return self.comm.send(COORDINATOR, BAND_TAG, band);
        }

        for rank in 1..self.comm.size() {
            let rows = partition(rank, self.comm.size(), self.source.rows())?;
            let payload = self.comm.recv(rank, BAND_TAG, self.config.gather_timeout)?;

            let band = self.result.row_band_mut(rows)?;
            if payload.len() != band.len() {
                return Err(DistError::BandLengthMismatch {
                    rank,
                    expected: band.len(),
                    got: payload.len(),
                });
            }
            band.copy_from_slice(&payload);
            log::debug!("coordinator received band of worker {rank}");
        }
        Ok(())
    }

    /// Run one full distributed pass with the given kernel and bias.
    ///
    /// Every rank of the process set must call this with the same arguments.
    /// On the coordinator, `result` is complete when this returns.
    pub fn apply_filter(&mut self, kernel: &Kernel, bias: f32) -> Result<(), DistError> {
        let start = Instant::now();

        self.run_local(kernel, bias)?;
        self.gather()?;

        if self.is_coordinator() {
            log::info!(
                "applied {0}x{0} filter on {1} with {2} workers in {3:.1} ms",
                kernel.size(),
                self.source.size(),
                self.comm.size(),
                start.elapsed().as_secs_f64() * 1e3
            );
        }
        Ok(())
    }
}
