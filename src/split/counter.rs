//! Partition counter.

use super::store::SampleStore;
use crate::error::PrepError;
use crate::layout::{Partition, PartitionMap};

/// Counts the images currently in each partition.
///
/// Read-only. A missing partition directory counts as zero.
pub fn count_partitions<S: SampleStore + ?Sized>(
    store: &S,
) -> Result<PartitionMap<usize>, PrepError> {
    let mut counts = PartitionMap::default();
    for partition in Partition::ALL {
        counts[partition] = store.images(partition)?.len();
    }
    Ok(counts)
}
