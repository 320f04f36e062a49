//! Cumulative top-N pose statistics.
//!
//! For every run tag this computes, for `n = 1..=max_poses`, the
//! percentage of systems that have at least one pose among their top
//! `n` whose RMSD falls below each success threshold.

use crate::error::{PoseStatError, Result};
use crate::models::{CumulativeTable, EvaluationRecord, Thresholds, TopNRow, THRESHOLD_COUNT};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Poses of each system under one tag, in input order.
pub type SystemPoses<'a> = BTreeMap<&'a str, Vec<&'a EvaluationRecord>>;

/// Group records by tag, then by system id.
///
/// Both levels are sorted by key. Within a system the records keep
/// their relative input order, which is taken as the pose ranking.
pub fn group_by_tag(records: &[EvaluationRecord]) -> BTreeMap<&str, SystemPoses<'_>> {
    let mut grouped: BTreeMap<&str, SystemPoses<'_>> = BTreeMap::new();

    for record in records {
        grouped
            .entry(record.run_tag.as_str())
            .or_default()
            .entry(record.system_id.as_str())
            .or_default()
            .push(record);
    }

    grouped
}

/// Compute one cumulative table per tag, in ascending tag order.
///
/// Records must already be sorted by pose rank within each system; no
/// re-sorting happens here. Every tag must have exactly
/// `expected_systems` distinct systems, otherwise no table is returned
/// for any tag.
pub fn aggregate_top_n(
    records: &[EvaluationRecord],
    expected_systems: usize,
    thresholds: &Thresholds,
) -> Result<Vec<CumulativeTable>> {
    let grouped = group_by_tag(records);

    // Validate every tag before computing anything
    for (tag, systems) in &grouped {
        check_system_count(tag, systems, expected_systems)?;
    }

    let tables: Vec<CumulativeTable> = grouped
        .iter()
        .map(|(tag, systems)| cumulative_table(tag, systems, thresholds))
        .collect();

    info!(
        "Computed top-N statistics for {} tags over {} records",
        tables.len(),
        records.len()
    );

    Ok(tables)
}

/// Fail with a data integrity error when a tag's system count is off.
pub fn check_system_count(tag: &str, systems: &SystemPoses<'_>, expected: usize) -> Result<()> {
    if systems.len() != expected {
        return Err(PoseStatError::DataIntegrity {
            tag: tag.to_string(),
            expected,
            actual: systems.len(),
        });
    }
    Ok(())
}

/// Accumulate the threshold flags of every system over its ranked poses.
///
/// A system that has fewer than `n` poses keeps the flags it already has.
pub fn cumulative_table(
    tag: &str,
    systems: &SystemPoses<'_>,
    thresholds: &Thresholds,
) -> CumulativeTable {
    let max_poses = systems.values().map(Vec::len).max().unwrap_or(0);
    let mut reached = vec![[false; THRESHOLD_COUNT]; systems.len()];
    let mut rows = Vec::with_capacity(max_poses);

    debug!(
        "Tag {}: {} systems, up to {} poses",
        tag,
        systems.len(),
        max_poses
    );

    for n in 1..=max_poses {
        for (flags, poses) in reached.iter_mut().zip(systems.values()) {
            if let Some(pose) = poses.get(n - 1) {
                for (flag, hit) in flags.iter_mut().zip(pose.within(thresholds)) {
                    *flag |= hit;
                }
            }
        }

        rows.push(TopNRow::from_percentages(n, percentages(&reached)));
    }

    CumulativeTable {
        tag: tag.to_string(),
        systems: systems.len(),
        max_poses,
        rows,
    }
}

/// Percentage of systems with each flag set.
fn percentages(reached: &[[bool; THRESHOLD_COUNT]]) -> [f64; THRESHOLD_COUNT] {
    let total = reached.len();
    let mut counts = [0usize; THRESHOLD_COUNT];

    for flags in reached {
        for (count, flag) in counts.iter_mut().zip(flags) {
            if *flag {
                *count += 1;
            }
        }
    }

    counts.map(|c| {
        if total == 0 {
            0.0
        } else {
            c as f64 * 100.0 / total as f64
        }
    })
}
