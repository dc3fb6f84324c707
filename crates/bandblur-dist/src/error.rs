use bandblur_image::{ImageError, ImageSize};
use bandblur_imgproc::{filter::FilterError, parallel::ParallelError};

/// An error type for the distribution module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DistError {
    /// At least one worker is needed.
    #[error("number of workers must be > 0")]
    NoWorkers,

    /// The rank does not belong to the process set.
    #[error("rank {rank} is out of range for {num_workers} workers")]
    RankOutOfRange {
        /// The offending rank.
        rank: usize,
        /// The size of the process set.
        num_workers: usize,
    },

    /// The endpoints of a process set are not in rank order.
    #[error("endpoint at position {index} has rank {rank}")]
    RankOrder {
        /// Position of the endpoint in the process set.
        index: usize,
        /// Rank reported by the endpoint.
        rank: usize,
    },

    /// The engine only partitions square images.
    #[error("image must be square, got {0}")]
    NonSquareImage(ImageSize),

    /// The communicator has no link between the two ranks.
    #[error("no route from rank {from} to rank {to}")]
    NoRoute {
        /// Sending rank.
        from: usize,
        /// Receiving rank.
        to: usize,
    },

    /// A message arrived with the wrong tag.
    #[error("expected message tag {expected}, got {got}")]
    UnexpectedTag {
        /// Tag the receiver waited for.
        expected: u32,
        /// Tag found on the message.
        got: u32,
    },

    /// A band payload does not cover exactly the rows of its partition.
    #[error("band from rank {rank} has {got} bytes, expected {expected}")]
    BandLengthMismatch {
        /// Rank that sent the band.
        rank: usize,
        /// Bytes in the partition.
        expected: usize,
        /// Bytes received.
        got: usize,
    },

    /// The peer went away before the exchange completed.
    #[error("worker {0} was lost before the gather completed")]
    WorkerLost(usize),

    /// The coordinator gave up waiting for a band.
    #[error("timed out waiting for the band of worker {rank}")]
    GatherTimeout {
        /// Rank whose band did not arrive.
        rank: usize,
    },

    /// A worker thread panicked.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    /// Error coming from the filters.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Error coming from the image buffers.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error coming from the thread scheduler.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}
