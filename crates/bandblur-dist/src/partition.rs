use std::ops::Range;

use crate::error::DistError;

/// The rank that owns the assembled result.
pub const COORDINATOR: usize = 0;

/// Compute the rows `[lo, hi)` owned by `rank`.
///
/// Every worker gets `num_rows / num_workers` contiguous rows. When the rows
/// do not divide evenly, the remainder is added to the coordinator's band,
/// which comes first; the other bands are shifted down accordingly. With more
/// workers than rows the coordinator owns everything and the other bands are
/// empty.
///
/// # Arguments
///
/// * `rank` - The worker rank, in `[0, num_workers)`.
/// * `num_workers` - The size of the process set.
/// * `num_rows` - The number of rows of the image.
///
/// # Example
///
/// ```
/// use bandblur_dist::partition::partition;
///
/// assert_eq!(partition(0, 3, 10).unwrap(), 0..4);
/// assert_eq!(partition(1, 3, 10).unwrap(), 4..7);
/// assert_eq!(partition(2, 3, 10).unwrap(), 7..10);
/// ```
pub fn partition(
    rank: usize,
    num_workers: usize,
    num_rows: usize,
) -> Result<Range<usize>, DistError> {
    if num_workers == 0 {
        return Err(DistError::NoWorkers);
    }
    if rank >= num_workers {
        return Err(DistError::RankOutOfRange { rank, num_workers });
    }

    let base = num_rows / num_workers;
    let remainder = num_rows % num_workers;

    if rank == COORDINATOR {
        return Ok(0..base + remainder);
    }
    let lo = remainder + rank * base;
    Ok(lo..lo + base)
}

/// Compute the partitions of all the ranks, in rank order.
pub fn partitions(num_workers: usize, num_rows: usize) -> Result<Vec<Range<usize>>, DistError> {
    (0..num_workers)
        .map(|rank| partition(rank, num_workers, num_rows))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_even() -> Result<(), DistError> {
        assert_eq!(partitions(4, 8)?, vec![0..2, 2..4, 4..6, 6..8]);
        Ok(())
    }

    #[test]
    fn test_partition_remainder_to_coordinator() -> Result<(), DistError> {
        assert_eq!(partitions(3, 11)?, vec![0..5, 5..8, 8..11]);
        Ok(())
    }

    #[test]
    fn test_partition_more_workers_than_rows() -> Result<(), DistError> {
        assert_eq!(partitions(5, 3)?, vec![0..3, 3..3, 3..3, 3..3, 3..3]);
        Ok(())
    }

    #[test]
    fn test_partition_single_worker() -> Result<(), DistError> {
        assert_eq!(partition(0, 1, 2048)?, 0..2048);
        Ok(())
    }

    #[test]
    fn test_partition_coverage() -> Result<(), DistError> {
        for num_rows in 0..64 {
            for num_workers in 1..12 {
                let mut seen = vec![0u32; num_rows];
                let mut next = 0;
                for rows in partitions(num_workers, num_rows)? {
                    assert_eq!(rows.start, next, "bands must be contiguous");
                    next = rows.end;
                    rows.for_each(|r| seen[r] += 1);
                }
                assert_eq!(next, num_rows);
                assert!(
                    seen.iter().all(|&c| c == 1),
                    "{num_workers} workers, {num_rows} rows"
                );
            }
        }
        Ok(())
    }

    #[test]
    fn test_partition_invalid() {
        assert_eq!(partition(0, 0, 4), Err(DistError::NoWorkers));
        assert_eq!(
            partition(3, 3, 4),
            Err(DistError::RankOutOfRange {
                rank: 3,
                num_workers: 3
            })
        );
    }
}
