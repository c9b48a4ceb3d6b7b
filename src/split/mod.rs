//! Train/valid/test splitting.
//!
//! A split run counts the images in each partition, computes target counts
//! from the configured fractions, then moves image + label pairs from
//! partitions above target to partitions below it:
//!
//! - [`count_partitions`]: current counts
//! - [`compute_targets`]: target counts that always sum to the total
//! - [`rebalance`]: the moves
//!
//! All three work against a [`SampleStore`], so they run the same on a real
//! directory ([`FsStore`]) or in memory ([`MemoryStore`]).

mod counter;
mod memory;
mod rebalance;
mod report;
mod store;
mod targets;

pub use counter::count_partitions;
pub use memory::MemoryStore;
pub use rebalance::{move_pair, rebalance, recover_stranded_labels, RebalanceOutcome};
pub use report::{
    FileKind, LabelRecovery, LabelStatus, MoveBatch, MoveFailure, MovedSample, RebalanceReport,
    Shortfall,
};
pub use store::{move_file, FsStore, SampleStore};
pub use targets::{compute_targets, TargetAdjustment, Targets};

pub(crate) use report::percent;

use tracing::{info, warn};

use crate::config::SplitConfig;
use crate::error::PrepError;
use crate::layout::Partition;

/// Runs a full split against `store`: recover stranded labels, count,
/// compute targets, rebalance, count again.
///
/// Returns a report even when moves failed or a partition stayed short; the
/// caller decides what that means for the exit status.
pub fn split_dataset<S: SampleStore + ?Sized>(
    store: &mut S,
    config: &SplitConfig,
) -> Result<RebalanceReport, PrepError> {
    config.validate()?;

    let mut failures = Vec::new();
    let recovered_labels = recover_stranded_labels(store, &mut failures)?;

    let mut unlisted_images = Vec::new();
    for partition in Partition::ALL {
        for path in store.non_utf8_images(partition)? {
            warn!(
                "Image {:?} has a non UTF-8 name; it is not counted or moved",
                path
            );
            unlisted_images.push(path.to_string_lossy().into_owned());
        }
    }

    let before = count_partitions(store)?;
    let total = before.total();
    let targets = compute_targets(total, &config.fractions, &config.partition_order);

    info!("Total images: {}", total);
    info!("Target split: {}", targets.counts);
    info!("Current split: {}", before);

    let outcome = rebalance(store, config, before, &targets.counts)?;
    failures.extend(outcome.failures);

    let after = count_partitions(store)?;
    if after != outcome.counts {
        warn!(
            "Counts changed outside this run: expected {}, found {}",
            outcome.counts, after
        );
    }

    let shortfalls: Vec<Shortfall> = Partition::ALL
        .into_iter()
        .filter(|p| after[*p] < targets.counts[*p])
        .map(|partition| Shortfall {
            partition,
            target: targets.counts[partition],
            actual: after[partition],
        })
        .collect();

    for shortfall in &shortfalls {
        warn!(
            "Partition '{}' is {} image(s) short of its target {}",
            shortfall.partition,
            shortfall.missing(),
            shortfall.target
        );
    }

    Ok(RebalanceReport {
        total,
        targets: targets.counts,
        adjustments: targets.adjustments,
        before,
        after,
        batches: outcome.batches,
        moves: outcome.moves,
        recovered_labels,
        unlisted_images,
        failures,
        shortfalls,
        dry_run: false,
    })
}

/// Plans a split on an in-memory snapshot of `store` without moving files.
pub fn plan_split<S: SampleStore + ?Sized>(
    store: &S,
    config: &SplitConfig,
) -> Result<RebalanceReport, PrepError> {
    let mut snapshot = MemoryStore::snapshot(store)?;
    let mut report = split_dataset(&mut snapshot, config)?;
    report.dry_run = true;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PartitionMap;

    fn store_with(partition: Partition, count: usize) -> MemoryStore {
        let mut store = MemoryStore::new();
        for i in 0..count {
            store.insert_sample(partition, &format!("ds1_{i:04}.jpg"), i % 3 != 0);
        }
        store
    }

    #[test]
    fn hundred_images_from_train() {
        let mut store = store_with(Partition::Train, 100);
        let report = split_dataset(&mut store, &SplitConfig::default()).expect("split");

        assert_eq!(report.targets, PartitionMap::new(70, 20, 10));
        assert_eq!(report.after, PartitionMap::new(70, 20, 10));
        assert_eq!(report.moved_count(), 30);
        assert!(report.is_balanced());

        let to_valid = report
            .moves
            .iter()
            .filter(|m| m.from == Partition::Train && m.to == Partition::Valid)
            .count();
        let to_test = report
            .moves
            .iter()
            .filter(|m| m.from == Partition::Train && m.to == Partition::Test)
            .count();
        assert_eq!((to_valid, to_test), (20, 10));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut store = store_with(Partition::Train, 37);
        let first = split_dataset(&mut store, &SplitConfig::default()).expect("first split");
        let moves_after_first = store.move_count();

        let second = split_dataset(&mut store, &SplitConfig::default()).expect("second split");
        assert_eq!(second.after, first.after);
        assert_eq!(second.moved_count(), 0);
        assert_eq!(store.move_count(), moves_after_first);
    }

    #[test]
    fn single_image_stays_in_train() {
        let mut store = store_with(Partition::Test, 1);
        let report = split_dataset(&mut store, &SplitConfig::default()).expect("split");

        assert_eq!(report.targets, PartitionMap::new(1, 0, 0));
        assert_eq!(report.after, PartitionMap::new(1, 0, 0));
        assert_eq!(report.adjustments.len(), 2);
    }

    #[test]
    fn failed_moves_leave_a_reported_shortfall() {
        let mut store = MemoryStore::new();
        for i in 0..10 {
            let name = format!("img_{i}.jpg");
            store.insert_sample(Partition::Train, &name, true);
            store.fail_image_moves(&name);
        }

        let report = split_dataset(&mut store, &SplitConfig::default()).expect("split");
        assert_eq!(report.after, PartitionMap::new(10, 0, 0));
        assert!(report.failure_count() > 0);
        assert_eq!(
            report
                .shortfalls
                .iter()
                .map(|s| s.partition)
                .collect::<Vec<_>>(),
            vec![Partition::Valid, Partition::Test]
        );
    }

    #[test]
    fn interrupted_label_move_is_finished_on_retry() {
        let mut store = store_with(Partition::Train, 10);
        // ds1_0001 is labeled; its label move fails on the first run.
        store.fail_label_moves("ds1_0001");

        let first = split_dataset(&mut store, &SplitConfig::default()).expect("first split");
        assert_eq!(first.failure_count(), 1);
        assert!(store.has_label(Partition::Train, "ds1_0001"));
        assert!(store.contains_image(Partition::Valid, "ds1_0001.jpg"));

        store.heal();
        let second = split_dataset(&mut store, &SplitConfig::default()).expect("second split");
        assert_eq!(second.recovered_labels.len(), 1);
        assert!(store.has_label(Partition::Valid, "ds1_0001"));
        assert_eq!(second.moved_count(), 0);
    }

    #[test]
    fn plan_split_leaves_store_untouched() {
        let store = store_with(Partition::Train, 20);
        let report = plan_split(&store, &SplitConfig::default()).expect("plan");

        assert!(report.dry_run);
        assert_eq!(report.after, PartitionMap::new(14, 4, 2));
        assert_eq!(store.image_count(Partition::Train), 20);
        assert_eq!(store.move_count(), 0);
    }

    #[test]
    fn invalid_config_is_rejected_before_moving() {
        let mut store = store_with(Partition::Train, 5);
        let config = SplitConfig {
            fractions: PartitionMap::new(0.5, 0.5, 0.5),
            ..SplitConfig::default()
        };

        assert!(split_dataset(&mut store, &config).is_err());
        assert_eq!(store.move_count(), 0);
    }
}
