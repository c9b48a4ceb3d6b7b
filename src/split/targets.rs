//! Target count computation.

use serde::Serialize;

use crate::layout::{Partition, PartitionMap};

/// Absorbs floating point noise such as `10000.0 * 0.7 == 7000.000000000001`
/// before rounding up.
const CEIL_EPSILON: f64 = 1e-9;

/// Target counts per partition, plus any clamping applied to reach them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Targets {
    pub counts: PartitionMap<usize>,
    pub adjustments: Vec<TargetAdjustment>,
}

/// A target that had to be lowered because the rounded-up shares of the
/// earlier partitions already exceeded the total.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TargetAdjustment {
    pub partition: Partition,
    /// Value before clamping; negative for the remainder partition.
    pub raw: i64,
    pub adjusted: usize,
}

/// Computes how many samples each partition should hold.
///
/// Every partition in `order` except the last gets `ceil(total * fraction)`.
/// The last one absorbs the remainder, `total - sum(others)`, so the targets
/// always sum to `total`. Reordering `order` changes which partition absorbs
/// the rounding slack.
///
/// When `total` is so small that the rounded-up shares exceed it (for example
/// `total = 1` with 0.7/0.2/0.1), the remainder partition is clamped to zero
/// and the excess is taken back one sample at a time from the partition whose
/// ceiling most overshoots its exact share, ties going to the later partition
/// in `order`. Each clamp is listed in [`Targets::adjustments`].
pub fn compute_targets(total: usize, fractions: &PartitionMap<f64>, order: &[Partition]) -> Targets {
    let mut counts = PartitionMap::default();
    let mut adjustments = Vec::new();

    let Some((&last, head)) = order.split_last() else {
        return Targets {
            counts,
            adjustments,
        };
    };

    let mut assigned = 0usize;
    for &partition in head {
        let share = ceil_share(total, fractions[partition]);
        counts[partition] = share;
        assigned += share;
    }

    if assigned <= total {
        counts[last] = total - assigned;
        return Targets {
            counts,
            adjustments,
        };
    }

    adjustments.push(TargetAdjustment {
        partition: last,
        raw: total as i64 - assigned as i64,
        adjusted: 0,
    });

    let raw = counts;
    let exact = |partition: Partition| total as f64 * fractions[partition];

    let mut excess = assigned - total;
    while excess > 0 {
        let mut pick: Option<(Partition, f64)> = None;
        for &partition in head.iter().filter(|p| counts[**p] > 0) {
            let overshoot = counts[partition] as f64 - exact(partition);
            match pick {
                Some((_, best)) if best > overshoot => {}
                _ => pick = Some((partition, overshoot)),
            }
        }

        // `assigned > total` guarantees a positive count in `head`.
        let Some((partition, _)) = pick else {
            break;
        };
        counts[partition] -= 1;
        excess -= 1;
    }

    for &partition in head {
        if counts[partition] != raw[partition] {
            adjustments.push(TargetAdjustment {
                partition,
                raw: raw[partition] as i64,
                adjusted: counts[partition],
            });
        }
    }

    Targets {
        counts,
        adjustments,
    }
}

fn ceil_share(total: usize, fraction: f64) -> usize {
    if total == 0 {
        return 0;
    }
    (total as f64 * fraction - CEIL_EPSILON).ceil().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_fractions() -> PartitionMap<f64> {
        PartitionMap::new(0.7, 0.2, 0.1)
    }

    #[test]
    fn hundred_images_split_exactly() {
        let targets = compute_targets(100, &default_fractions(), &Partition::ALL);
        assert_eq!(targets.counts, PartitionMap::new(70, 20, 10));
        assert!(targets.adjustments.is_empty());
    }

    #[test]
    fn ten_images_need_no_remainder_adjustment() {
        let targets = compute_targets(10, &default_fractions(), &Partition::ALL);
        assert_eq!(targets.counts, PartitionMap::new(7, 2, 1));
        assert!(targets.adjustments.is_empty());
    }

    #[test]
    fn zero_total_gives_zero_targets() {
        let targets = compute_targets(0, &default_fractions(), &Partition::ALL);
        assert_eq!(targets.counts, PartitionMap::new(0, 0, 0));
    }

    #[test]
    fn single_image_clamps_negative_remainder() {
        let targets = compute_targets(1, &default_fractions(), &Partition::ALL);
        assert_eq!(targets.counts, PartitionMap::new(1, 0, 0));
        assert_eq!(
            targets.adjustments,
            vec![
                TargetAdjustment {
                    partition: Partition::Test,
                    raw: -1,
                    adjusted: 0,
                },
                TargetAdjustment {
                    partition: Partition::Valid,
                    raw: 1,
                    adjusted: 0,
                },
            ]
        );
    }

    #[test]
    fn three_images_take_excess_from_largest_overshoot() {
        // raw ceilings {3, 1, -1}; train overshoots 2.1 by 0.9, valid 0.6 by 0.4
        let targets = compute_targets(3, &default_fractions(), &Partition::ALL);
        assert_eq!(targets.counts, PartitionMap::new(2, 1, 0));
        assert_eq!(targets.counts.total(), 3);
    }

    #[test]
    fn floating_noise_does_not_overshoot() {
        let targets = compute_targets(10_000, &default_fractions(), &Partition::ALL);
        assert_eq!(targets.counts, PartitionMap::new(7000, 2000, 1000));
    }

    #[test]
    fn order_decides_which_partition_absorbs_slack() {
        // 33 images: ceil(23.1)=24, ceil(6.6)=7, remainder test=2
        let default_order = compute_targets(33, &default_fractions(), &Partition::ALL);
        assert_eq!(default_order.counts, PartitionMap::new(24, 7, 2));

        // train last: ceil(3.3)=4, ceil(6.6)=7, remainder train=22
        let train_last = compute_targets(
            33,
            &default_fractions(),
            &[Partition::Test, Partition::Valid, Partition::Train],
        );
        assert_eq!(train_last.counts, PartitionMap::new(22, 7, 4));
    }
}
