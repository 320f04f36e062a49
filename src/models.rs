//! Data models for pose statistics.
//!
//! This module contains the core data structures used throughout
//! the application: evaluation records, success thresholds,
//! cumulative top-N tables and the report that wraps them.

use crate::error::{PoseStatError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of success thresholds tracked per pose.
pub const THRESHOLD_COUNT: usize = 3;

/// Success thresholds, in RMSD distance units.
///
/// A pose is "within" threshold k when its RMSD is strictly below it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    values: [f64; THRESHOLD_COUNT],
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            values: [1.0, 2.0, 3.0],
        }
    }
}

impl Thresholds {
    /// Build thresholds from a slice of exactly three strictly increasing,
    /// positive, finite distances.
    pub fn new(values: &[f64]) -> Result<Self> {
        let values: [f64; THRESHOLD_COUNT] = values.try_into().map_err(|_| {
            PoseStatError::InvalidInput(format!(
                "expected {} thresholds, got {}",
                THRESHOLD_COUNT,
                values.len()
            ))
        })?;

        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(PoseStatError::InvalidInput(
                "thresholds must be positive finite numbers".to_string(),
            ));
        }

        if values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PoseStatError::InvalidInput(
                "thresholds must be strictly increasing".to_string(),
            ));
        }

        Ok(Self { values })
    }

    pub fn values(&self) -> [f64; THRESHOLD_COUNT] {
        self.values
    }

    /// Flags for each threshold that `rmsd` falls strictly below.
    pub fn classify(&self, rmsd: f64) -> [bool; THRESHOLD_COUNT] {
        self.values.map(|t| rmsd < t)
    }

    /// Column label for the k-th threshold (0-based), e.g. `<2`.
    pub fn label(&self, k: usize) -> String {
        format!("<{}", self.values[k])
    }
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// One evaluated pose of a system under a run tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Receptor-ligand pair identifier.
    pub system_id: String,
    /// Docking run/configuration that produced the pose.
    pub run_tag: String,
    /// 1-based rank of the pose within its system and tag.
    pub pose_rank: u32,
    /// RMSD to the reference pose. Non-negative, may be infinite.
    pub rmsd: f64,
}

impl EvaluationRecord {
    pub fn new(
        system_id: impl Into<String>,
        run_tag: impl Into<String>,
        pose_rank: u32,
        rmsd: f64,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            run_tag: run_tag.into(),
            pose_rank,
            rmsd,
        }
    }

    /// The `within_1`, `within_2`, `within_3` flags of this pose.
    pub fn within(&self, thresholds: &Thresholds) -> [bool; THRESHOLD_COUNT] {
        thresholds.classify(self.rmsd)
    }
}

/// Percentages of systems with a good pose among the top `n`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopNRow {
    /// Number of top-ranked poses considered.
    pub n: usize,
    pub pct_within_1: f64,
    pub pct_within_2: f64,
    pub pct_within_3: f64,
}

impl TopNRow {
    pub fn from_percentages(n: usize, pct: [f64; THRESHOLD_COUNT]) -> Self {
        Self {
            n,
            pct_within_1: pct[0],
            pct_within_2: pct[1],
            pct_within_3: pct[2],
        }
    }

    pub fn percentages(&self) -> [f64; THRESHOLD_COUNT] {
        [self.pct_within_1, self.pct_within_2, self.pct_within_3]
    }
}

/// Cumulative top-N statistics for a single run tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeTable {
    /// Run tag the table was computed for.
    pub tag: String,
    /// Number of distinct systems under the tag.
    pub systems: usize,
    /// Largest pose count of any system under the tag.
    pub max_poses: usize,
    /// Rows for `n = 1..=max_poses`.
    pub rows: Vec<TopNRow>,
}

impl CumulativeTable {
    /// Row for the top `n` poses.
    ///
    /// Past `max_poses` no system gains a pose, so the last row holds.
    pub fn at(&self, n: usize) -> Option<&TopNRow> {
        let index = n.min(self.rows.len()).checked_sub(1)?;
        self.rows.get(index)
    }
}

/// A cumulative table with its display label and source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledTable {
    /// Name shown in reports (defaults to the tag).
    pub label: String,
    /// Input file the table was computed from.
    pub source: String,
    pub table: CumulativeTable,
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Input files, in processing order.
    pub inputs: Vec<String>,
    /// Expected number of unique systems per tag.
    pub expected_systems: usize,
    pub thresholds: Thresholds,
    /// Pose counts highlighted in the summary.
    pub report_poses: Vec<usize>,
    /// Duration of the computation in seconds.
    pub duration_seconds: f64,
}

/// The complete top-N report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub tables: Vec<LabeledTable>,
}
