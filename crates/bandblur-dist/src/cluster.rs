use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use bandblur_image::Rgb8Image;
use bandblur_imgproc::filter::{self, FilterPreset, Kernel};

use crate::{
    comm::{Communicator, LocalCommunicator},
    config::ClusterConfig,
    error::DistError,
    worker::Worker,
};

/// A process set of workers running as threads of the current process.
///
/// The coordinator runs on the calling thread, every other worker on its own
/// thread for the duration of a pass. All workers share the same source
/// image and exchange their bands over their [`Communicator`] endpoints,
/// [`LocalCommunicator`] links unless built with
/// [`LocalCluster::from_communicators`].
///
/// # Example
///
/// ```
/// use bandblur_dist::{ClusterConfig, LocalCluster};
/// use bandblur_image::{ImageSize, Rgb8Image};
/// use bandblur_imgproc::filter::FilterPreset;
///
/// let source = Rgb8Image::from_size_val(ImageSize::square(8), 90).unwrap();
/// let mut cluster = LocalCluster::new(source, ClusterConfig::new(3).with_threads(2)).unwrap();
///
/// let result = cluster.apply_preset(FilterPreset::Box3).unwrap();
/// // round(90 / 9) = 10 per tap, 9 taps in the interior
/// assert_eq!(result.pixel(4, 4), &[90, 90, 90]);
/// ```
#[derive(Debug)]
pub struct LocalCluster<C: Communicator = LocalCommunicator> {
    source: Arc<Rgb8Image>,
    workers: Vec<Worker<C>>,
}

impl LocalCluster {
    /// Spawn the workers of a process set around a square source image.
    pub fn new(source: Rgb8Image, config: ClusterConfig) -> Result<Self, DistError> {
        let comms = LocalCommunicator::create(config.num_workers)?;
        Self::from_communicators(source, comms, config)
    }
}

impl<C: Communicator> LocalCluster<C> {
    /// Build a process set from one endpoint per worker.
    ///
    /// The endpoints must be given in rank order, starting with the
    /// coordinator. `config.num_workers` is ignored in favor of `comms.len()`.
    pub fn from_communicators(
        source: Rgb8Image,
        comms: Vec<C>,
        config: ClusterConfig,
    ) -> Result<Self, DistError> {
        if comms.is_empty() {
            return Err(DistError::NoWorkers);
        }
        if let Some((index, comm)) = comms.iter().enumerate().find(|(i, c)| c.rank() != *i) {
            return Err(DistError::RankOrder {
                index,
                rank: comm.rank(),
            });
        }

        let source = Arc::new(source);
        let workers = comms
            .into_iter()
            .map(|comm| Worker::new(comm, Arc::clone(&source), config.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "created local cluster of {} workers for {}",
            workers.len(),
            source.size()
        );

        Ok(Self { source, workers })
    }

    /// The number of workers, coordinator included.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// The workers, in rank order.
    pub fn workers(&self) -> &[Worker<C>] {
        &self.workers
    }

    /// The source image shared by all the workers.
    pub fn source(&self) -> &Rgb8Image {
        &self.source
    }

    /// The assembled result held by the coordinator.
    pub fn result(&self) -> &Rgb8Image {
        // the coordinator always exists, empty process sets are rejected on creation
        self.workers[0].result()
    }

    /// Run one distributed pass and return the assembled result.
    ///
    /// The kernel is validated before any worker starts, so that a bad kernel
    /// cannot leave a worker blocked on the gather. A failure or a panic during
    /// the pass disconnects the failing rank and is fatal for the cluster. When
    /// the coordinator loses a worker, the error of that worker is returned.
    pub fn apply_filter(&mut self, kernel: &Kernel, bias: f32) -> Result<&Rgb8Image, DistError> {
        filter::check_kernel_fits(self.source.as_ref(), kernel)?;

        let (coordinator, others) = self.workers.split_first_mut().ok_or(DistError::NoWorkers)?;

        std::thread::scope(|s| {
            let handles = others
                .iter_mut()
                .map(|worker| s.spawn(move || run_worker(worker, kernel, bias)))
                .collect::<Vec<_>>();

            let coordinator_res = coordinator.apply_filter(kernel, bias);
            if coordinator_res.is_err() {
                coordinator.comm_mut().disconnect();
            }

            let worker_results = handles
                .into_iter()
                .enumerate()
                .map(|(i, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(DistError::WorkerPanicked(i + 1)))
                })
                .collect::<Vec<_>>();

            match coordinator_res {
                // report why the worker went away rather than the disconnection itself
                Err(DistError::WorkerLost(rank)) => {
                    let lost = rank
                        .checked_sub(1)
                        .and_then(|i| worker_results.into_iter().nth(i));
                    match lost {
                        Some(Err(e)) => Err(e),
                        _ => Err(DistError::WorkerLost(rank)),
                    }
                }
                Err(e) => Err(e),
                Ok(()) => worker_results.into_iter().collect::<Result<(), _>>(),
            }
        })?;

        Ok(self.result())
    }

    /// Run one distributed pass with a named preset.
    pub fn apply_preset(&mut self, preset: FilterPreset) -> Result<&Rgb8Image, DistError> {
        let kernel = preset.kernel()?;
        self.apply_filter(&kernel, preset.bias())
    }
}

/// Run one pass on a non-coordinator rank.
///
/// On error or panic the rank drops its links, so that the coordinator wakes
/// up instead of waiting for a band that will never come.
fn run_worker<C: Communicator>(
    worker: &mut Worker<C>,
    kernel: &Kernel,
    bias: f32,
) -> Result<(), DistError> {
    let rank = worker.rank();
    let res = panic::catch_unwind(AssertUnwindSafe(|| worker.apply_filter(kernel, bias)))
        .unwrap_or(Err(DistError::WorkerPanicked(rank)));

    if res.is_err() {
        log::warn!("worker {rank} failed, dropping its links");
        worker.comm_mut().disconnect();
    }
    res
}
