use std::{sync::Arc, time::Duration};

use bandblur_dist::{
    comm::BAND_TAG, partition::partitions, ClusterConfig, Communicator, DistError, LocalCluster,
    LocalCommunicator, Worker,
};
use bandblur_image::{Image, ImageSize};
use bandblur_imgproc::{
    filter::{convolve, kernels::box_blur_kernel_2d, FilterError, FilterPreset, Kernel},
    parallel::ExecutionStrategy,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// How a [`FaultyComm`] misbehaves when sending.
#[derive(Debug, Clone, Copy)]
enum Fault {
    Healthy,
    Refuse,
    Panic,
    Stall(Duration),
}

/// A local endpoint that can be told to fail its sends.
struct FaultyComm {
    inner: LocalCommunicator,
    fault: Fault,
}

impl Communicator for FaultyComm {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn send(&self, dest: usize, tag: u32, payload: Vec<u8>) -> Result<(), DistError> {
        match self.fault {
            Fault::Healthy => self.inner.send(dest, tag, payload),
            Fault::Refuse => Err(DistError::NoRoute {
                from: self.rank(),
                to: dest,
            }),
            Fault::Panic => panic!("link of rank {} broke", self.rank()),
            Fault::Stall(delay) => {
                std::thread::sleep(delay);
                self.inner.send(dest, tag, payload)
            }
        }
    }

    fn recv(
        &self,
        source: usize,
        tag: u32,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DistError> {
        self.inner.recv(source, tag, timeout)
    }

    fn disconnect(&mut self) {
        self.inner.disconnect();
    }
}

/// A cluster of `num_workers` where only rank 1 misbehaves.
fn faulty_cluster(
    num_workers: usize,
    fault: Fault,
    config: ClusterConfig,
) -> Result<LocalCluster<FaultyComm>, DistError> {
    let comms = LocalCommunicator::create(num_workers)?
        .into_iter()
        .map(|inner| {
            let fault = if inner.rank() == 1 {
                fault
            } else {
                Fault::Healthy
            };
            FaultyComm { inner, fault }
        })
        .collect();
    LocalCluster::from_communicators(random_image(8, 21), comms, config)
}

fn random_image(side: usize, seed: u64) -> Image<u8, 3> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..side * side * 3).map(|_| rng.random::<u8>()).collect();
    Image::new(ImageSize::square(side), data).unwrap()
}

#[test]
fn test_worker_count_invariance() -> Result<(), DistError> {
    init_logger();
    let source = random_image(23, 1234);

    for preset in FilterPreset::ALL {
        let reference = LocalCluster::new(source.clone(), ClusterConfig::new(1))?
            .apply_preset(preset)?
            .clone();

        let mut serial = Image::from_size_val(source.size(), 0u8)?;
        convolve(&source, &mut serial, &preset.kernel()?, preset.bias())?;
        assert_eq!(reference, serial, "{preset} single worker vs serial");

        // 23 rows: even and uneven splits, plus more workers than rows
        for num_workers in [2, 3, 4, 7, 23, 30] {
            let config = ClusterConfig::new(num_workers).with_threads(2);
            let mut cluster = LocalCluster::new(source.clone(), config)?;
            let result = cluster.apply_preset(preset)?;
            assert_eq!(result, &reference, "{preset} with {num_workers} workers");
        }
    }
    Ok(())
}

#[test]
fn test_repeated_passes_read_the_same_source() -> Result<(), DistError> {
    init_logger();
    let source = random_image(12, 99);
    let mut cluster = LocalCluster::new(source.clone(), ClusterConfig::new(3))?;

    let box5 = cluster.apply_preset(FilterPreset::Box5)?.clone();
    let box3 = cluster.apply_preset(FilterPreset::Box3)?.clone();
    let box5_again = cluster.apply_preset(FilterPreset::Box5)?.clone();

    assert_eq!(box5, box5_again);
    assert_ne!(box3, box5);
    assert_eq!(cluster.source(), &source);
    Ok(())
}

#[test]
fn test_identity_and_custom_kernels() -> Result<(), DistError> {
    let source = random_image(10, 5);
    let mut cluster = LocalCluster::new(
        source.clone(),
        ClusterConfig::new(4).with_strategy(ExecutionStrategy::Serial),
    )?;

    assert_eq!(cluster.apply_filter(&Kernel::identity(), 0.0)?, &source);

    // negative weights and a bias run through the same pipeline
    #[rustfmt::skip]
    let sharpen = Kernel::new(3, vec![
        0.0, -1.0, 0.0,
        -1.0, 5.0, -1.0,
        0.0, -1.0, 0.0,
    ])?;
    let mut expected = Image::from_size_val(source.size(), 0u8)?;
    convolve(&source, &mut expected, &sharpen, 1.5)?;
    assert_eq!(cluster.apply_filter(&sharpen, 1.5)?, &expected);
    Ok(())
}

#[test]
fn test_single_bright_pixel_across_band_boundary() -> Result<(), DistError> {
    let side = 6;
    let mut source = Image::<u8, 3>::from_size_val(ImageSize::square(side), 0)?;
    // row 3 is the first row of the second band with 2 workers
    source.as_slice_mut()[(3 * side + 2) * 3] = 255;

    let mut cluster = LocalCluster::new(source, ClusterConfig::new(2))?;
    let result = cluster.apply_preset(FilterPreset::Box3)?;

    for row in 0..side {
        for col in 0..side {
            let near = row.abs_diff(3) <= 1 && col.abs_diff(2) <= 1;
            let expected = if near { [28, 0, 0] } else { [0, 0, 0] };
            assert_eq!(result.pixel(row, col), &expected, "pixel ({row}, {col})");
        }
    }
    Ok(())
}

#[test]
fn test_cluster_rejects_invalid_setups() -> Result<(), DistError> {
    let square = Image::<u8, 3>::from_size_val(ImageSize::square(4), 0)?;
    assert!(matches!(
        LocalCluster::new(square.clone(), ClusterConfig::new(0)),
        Err(DistError::NoWorkers)
    ));

    let size = ImageSize {
        width: 4,
        height: 3,
    };
    let rect = Image::<u8, 3>::from_size_val(size, 0)?;
    assert!(matches!(
        LocalCluster::new(rect, ClusterConfig::new(2)),
        Err(DistError::NonSquareImage(s)) if s == size
    ));

    let mut cluster = LocalCluster::new(square, ClusterConfig::new(2))?;
    let res = cluster.apply_filter(&box_blur_kernel_2d(5)?, 0.0);
    assert!(matches!(
        res,
        Err(DistError::Filter(FilterError::KernelTooLarge(5, 4)))
    ));

    // the cluster is still usable after a rejected kernel
    cluster.apply_preset(FilterPreset::Box3)?;
    Ok(())
}

#[test]
fn test_gather_timeout_on_silent_worker() -> Result<(), DistError> {
    let source = Arc::new(random_image(4, 3));
    let config = ClusterConfig::new(2).with_gather_timeout(Duration::from_millis(20));

    let mut comms = LocalCommunicator::create(2)?.into_iter();
    let coordinator_comm = comms.next().ok_or(DistError::NoWorkers)?;
    // the second rank is created but never runs
    let _silent = comms.next();

    let mut coordinator = Worker::new(coordinator_comm, source, config)?;
    let res = coordinator.apply_filter(&Kernel::identity(), 0.0);
    assert_eq!(res, Err(DistError::GatherTimeout { rank: 1 }));
    Ok(())
}

#[test]
fn test_gather_rejects_short_band() -> Result<(), DistError> {
    let source = Arc::new(random_image(4, 3));
    let mut comms = LocalCommunicator::create(2)?.into_iter();
    let coordinator_comm = comms.next().ok_or(DistError::NoWorkers)?;
    let rogue = comms.next().ok_or(DistError::NoWorkers)?;

    let mut coordinator = Worker::new(coordinator_comm, source, ClusterConfig::new(2))?;
    coordinator.run_local(&Kernel::identity(), 0.0)?;

    let handle = std::thread::spawn(move || rogue.send(0, BAND_TAG, vec![0u8; 5]));
    assert_eq!(
        coordinator.gather(),
        Err(DistError::BandLengthMismatch {
            rank: 1,
            expected: 2 * 4 * 3,
            got: 5
        })
    );
    handle.join().map_err(|_| DistError::WorkerPanicked(1))??;
    Ok(())
}

#[test]
fn test_workers_own_their_partitions() -> Result<(), DistError> {
    let source = random_image(9, 11);
    let mut cluster = LocalCluster::new(source, ClusterConfig::new(4))?;
    cluster.apply_preset(FilterPreset::Box3)?;

    let expected = partitions(4, 9)?;
    assert_eq!(expected[0], 0..3);
    for (worker, rows) in cluster.workers().iter().zip(expected) {
        assert_eq!(worker.partition(), rows);
        // every band matches the assembled result at the same rows
        assert_eq!(
            worker.result().row_band(rows.clone())?,
            cluster.result().row_band(rows)?
        );
    }
    assert!(cluster.workers()[0].is_coordinator());
    assert_eq!(cluster.num_workers(), 4);
    Ok(())
}

#[test]
fn test_healthy_custom_communicator() -> Result<(), DistError> {
    let mut cluster = faulty_cluster(3, Fault::Healthy, ClusterConfig::new(3))?;
    let expected = LocalCluster::new(cluster.source().clone(), ClusterConfig::new(1))?
        .apply_preset(FilterPreset::Box3)?
        .clone();
    assert_eq!(cluster.apply_preset(FilterPreset::Box3)?, &expected);
    Ok(())
}

#[test]
fn test_failed_worker_reports_its_own_error() -> Result<(), DistError> {
    init_logger();
    let mut cluster = faulty_cluster(3, Fault::Refuse, ClusterConfig::new(3))?;
    assert_eq!(
        cluster.apply_preset(FilterPreset::Box3),
        Err(DistError::NoRoute { from: 1, to: 0 })
    );
    Ok(())
}

#[test]
fn test_panicked_worker_does_not_hang_the_gather() -> Result<(), DistError> {
    init_logger();
    // no gather timeout: the coordinator must still wake up
    let mut cluster = faulty_cluster(3, Fault::Panic, ClusterConfig::new(3))?;
    assert_eq!(
        cluster.apply_preset(FilterPreset::Box3),
        Err(DistError::WorkerPanicked(1))
    );
    Ok(())
}

#[test]
fn test_cluster_gather_timeout() -> Result<(), DistError> {
    init_logger();
    let config = ClusterConfig::new(3).with_gather_timeout(Duration::from_millis(20));
    let mut cluster = faulty_cluster(3, Fault::Stall(Duration::from_millis(300)), config)?;
    assert_eq!(
        cluster.apply_preset(FilterPreset::Box3),
        Err(DistError::GatherTimeout { rank: 1 })
    );
    Ok(())
}

#[test]
fn test_communicators_out_of_rank_order() -> Result<(), DistError> {
    let mut comms = LocalCommunicator::create(3)?;
    comms.swap(1, 2);
    let res = LocalCluster::from_communicators(random_image(4, 1), comms, ClusterConfig::new(3));
    assert!(matches!(
        res,
        Err(DistError::RankOrder { index: 1, rank: 2 })
    ));

    let res = LocalCluster::<LocalCommunicator>::from_communicators(
        random_image(4, 1),
        vec![],
        ClusterConfig::new(0),
    );
    assert!(matches!(res, Err(DistError::NoWorkers)));
    Ok(())
}
