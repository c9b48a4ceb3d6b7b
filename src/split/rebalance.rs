//! Rebalancing by moving image + label pairs between partitions.

use std::collections::BTreeSet;

use tracing::{debug, error, info};

use super::report::{FileKind, LabelRecovery, LabelStatus, MoveBatch, MoveFailure, MovedSample};
use super::store::SampleStore;
use crate::config::SplitConfig;
use crate::error::PrepError;
use crate::layout::{file_stem, Partition, PartitionMap};

/// Result of one rebalance pass.
#[derive(Clone, Debug, Default)]
pub struct RebalanceOutcome {
    /// Counts after the pass, maintained incrementally.
    pub counts: PartitionMap<usize>,
    pub batches: Vec<MoveBatch>,
    pub moves: Vec<MovedSample>,
    pub failures: Vec<MoveFailure>,
}

/// Moves samples until each partition reaches its target, as far as donors
/// allow.
///
/// Partitions are filled in `config.partition_order`. For each partition
/// below target, donors are tried in `config.donor_priority`; a donor only
/// gives its surplus (`current - target`) and never drops below its own
/// target. Each batch moves up to `min(surplus, remaining deficit)` samples,
/// taking the donor's images in file name order. Every (partition, donor)
/// pair is visited at most once, so a run makes at most six batches.
///
/// A failed move is recorded and skipped; the batch continues with the next
/// image. A partition left short stays short and shows up in the counts.
pub fn rebalance<S: SampleStore + ?Sized>(
    store: &mut S,
    config: &SplitConfig,
    current: PartitionMap<usize>,
    targets: &PartitionMap<usize>,
) -> Result<RebalanceOutcome, PrepError> {
    let mut outcome = RebalanceOutcome {
        counts: current,
        ..Default::default()
    };

    for &partition in &config.partition_order {
        let mut need = targets[partition].saturating_sub(outcome.counts[partition]);
        if need == 0 {
            continue;
        }

        info!("Rebalancing: need {} more in '{}'", need, partition);

        for &donor in &config.donor_priority {
            if need == 0 {
                break;
            }
            if donor == partition || outcome.counts[donor] <= targets[donor] {
                continue;
            }

            let surplus = outcome.counts[donor] - targets[donor];
            let requested = surplus.min(need);
            let available = store.images(donor)?;

            let mut batch = MoveBatch {
                from: donor,
                to: partition,
                requested,
                moved: 0,
            };

            for file_name in &available {
                if batch.moved == requested {
                    break;
                }

                if let Some(sample) =
                    move_pair(store, file_name, donor, partition, &mut outcome.failures)
                {
                    outcome.counts[donor] -= 1;
                    outcome.counts[partition] += 1;
                    batch.moved += 1;
                    outcome.moves.push(sample);
                }
            }

            info!(
                "Moved {} of {} image(s) from '{}' to '{}'",
                batch.moved, batch.requested, donor, partition
            );

            outcome.batches.push(batch);
            need = targets[partition].saturating_sub(outcome.counts[partition]);
        }
    }

    Ok(outcome)
}

/// Moves one image and, if present, its label.
///
/// Returns `None` when the image could not be moved. When the image moved
/// but the label did not, the sample counts as moved with
/// [`LabelStatus::Failed`]; [`recover_stranded_labels`] finishes the job on
/// the next run.
pub fn move_pair<S: SampleStore + ?Sized>(
    store: &mut S,
    file_name: &str,
    from: Partition,
    to: Partition,
    failures: &mut Vec<MoveFailure>,
) -> Option<MovedSample> {
    if let Err(err) = store.move_image(file_name, from, to) {
        error!("Failed to move image {}: {}", file_name, err);
        failures.push(MoveFailure {
            kind: FileKind::Image,
            file_name: file_name.to_string(),
            from,
            to,
            message: err.to_string(),
        });
        return None;
    }

    let stem = file_stem(file_name);
    let label = match store.move_label(stem, from, to) {
        Ok(true) => LabelStatus::Moved,
        Ok(false) => LabelStatus::Missing,
        Err(err) => {
            error!("Moved image {} but not its label: {}", file_name, err);
            failures.push(MoveFailure {
                kind: FileKind::Label,
                file_name: format!("{stem}.txt"),
                from,
                to,
                message: err.to_string(),
            });
            LabelStatus::Failed
        }
    };

    debug!("Moved {} from '{}' to '{}' (label: {:?})", file_name, from, to, label);

    Some(MovedSample {
        file_name: file_name.to_string(),
        from,
        to,
        label,
    })
}

/// Finishes pair moves interrupted between the image and the label.
///
/// A label is stranded when its partition has no image with the same stem
/// while exactly one other partition does and holds no label for it. Such
/// labels are moved next to their image. Labels with no image anywhere are
/// orphans and stay where they are.
pub fn recover_stranded_labels<S: SampleStore + ?Sized>(
    store: &mut S,
    failures: &mut Vec<MoveFailure>,
) -> Result<Vec<LabelRecovery>, PrepError> {
    let mut image_stems: PartitionMap<BTreeSet<String>> = PartitionMap::default();
    let mut label_stems: PartitionMap<BTreeSet<String>> = PartitionMap::default();
    for partition in Partition::ALL {
        image_stems[partition] = store
            .images(partition)?
            .iter()
            .map(|name| file_stem(name).to_string())
            .collect();
        label_stems[partition] = store.label_stems(partition)?.into_iter().collect();
    }

    let mut recovered = Vec::new();

    for from in Partition::ALL {
        let stems: Vec<String> = label_stems[from].iter().cloned().collect();
        for stem in stems {
            if image_stems[from].contains(&stem) {
                continue;
            }

            let homes: Vec<Partition> = Partition::ALL
                .into_iter()
                .filter(|p| *p != from && image_stems[*p].contains(&stem))
                .collect();

            let [to] = homes.as_slice() else {
                debug!("Leaving label {}.txt in '{}' in place", stem, from);
                continue;
            };
            let to = *to;

            if label_stems[to].contains(&stem) {
                continue;
            }

            match store.move_label(&stem, from, to) {
                Ok(true) => {
                    info!("Recovered stranded label {}.txt: '{}' -> '{}'", stem, from, to);
                    label_stems[from].remove(&stem);
                    label_stems[to].insert(stem.clone());
                    recovered.push(LabelRecovery { stem, from, to });
                }
                Ok(false) => {}
                Err(err) => {
                    error!("Failed to recover label {}.txt: {}", stem, err);
                    failures.push(MoveFailure {
                        kind: FileKind::Label,
                        file_name: format!("{stem}.txt"),
                        from,
                        to,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    Ok(recovered)
}
