//! Reader for delimited evaluation tables.
//!
//! This module turns rows of a delimited text file into typed
//! [`EvaluationRecord`]s, honoring the configured delimiter, header
//! presence, column subset and column-name mapping.

use crate::config::InputConfig;
use crate::error::{PoseStatError, Result};
use crate::models::EvaluationRecord;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Layout of an evaluation table.
#[derive(Debug, Clone)]
pub struct InputSpec {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Whether the first row is a header to skip.
    pub has_header: bool,
    /// 0-based indices of the columns to read.
    pub use_columns: Vec<usize>,
    /// Names given to the selected columns, in the same order.
    pub column_names: Vec<String>,
    /// Column name holding the system id.
    pub system_field: String,
    /// Column name holding the run tag.
    pub tag_field: String,
    /// Column name holding the RMSD.
    pub rmsd_field: String,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            use_columns: vec![0, 2, 7],
            column_names: vec!["tag", "rmsd", "rec"]
                .into_iter()
                .map(String::from)
                .collect(),
            system_field: "rec".to_string(),
            tag_field: "tag".to_string(),
            rmsd_field: "rmsd".to_string(),
        }
    }
}

impl TryFrom<&InputConfig> for InputSpec {
    type Error = PoseStatError;

    fn try_from(config: &InputConfig) -> Result<Self> {
        Ok(Self {
            delimiter: parse_delimiter(&config.delimiter)?,
            has_header: config.has_header,
            use_columns: config.use_columns.clone(),
            column_names: config.column_names.clone(),
            system_field: config.system_field.clone(),
            tag_field: config.tag_field.clone(),
            rmsd_field: config.rmsd_field.clone(),
        })
    }
}

/// Raw column indices of the three fields a record needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    system: usize,
    tag: usize,
    rmsd: usize,
}

impl InputSpec {
    /// Check the column mapping and resolve the record fields to raw indices.
    fn resolve(&self) -> Result<ColumnMap> {
        if self.use_columns.is_empty() {
            return Err(PoseStatError::InvalidInput(
                "no columns selected".to_string(),
            ));
        }

        if self.use_columns.len() != self.column_names.len() {
            return Err(PoseStatError::InvalidInput(format!(
                "{} columns selected but {} column names given",
                self.use_columns.len(),
                self.column_names.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.column_names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(PoseStatError::InvalidInput(format!(
                "duplicate column name '{}'",
                dup
            )));
        }

        let index_of = |field: &str| -> Result<usize> {
            self.column_names
                .iter()
                .position(|n| n == field)
                .map(|i| self.use_columns[i])
                .ok_or_else(|| {
                    PoseStatError::InvalidInput(format!(
                        "field '{}' is not among the column names [{}]",
                        field,
                        self.column_names.join(", ")
                    ))
                })
        };

        Ok(ColumnMap {
            system: index_of(&self.system_field)?,
            tag: index_of(&self.tag_field)?,
            rmsd: index_of(&self.rmsd_field)?,
        })
    }
}

/// Parse a delimiter setting. Accepts a single character or `\t`/`tab`.
pub fn parse_delimiter(value: &str) -> Result<u8> {
    match value {
        "\\t" | "tab" => return Ok(b'\t'),
        _ => {}
    }

    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(PoseStatError::InvalidInput(format!(
            "delimiter must be a single ASCII character, got '{}'",
            value
        ))),
    }
}

/// Read all evaluation records from a file.
pub fn read_records(path: &Path, spec: &InputSpec) -> Result<Vec<EvaluationRecord>> {
    debug!("Reading evaluation records from {}", path.display());
    let file = File::open(path)?;
    let records = parse_records(file, spec)?;
    info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse evaluation records from any reader.
///
/// Pose ranks are assigned in order of appearance within each
/// (system, tag) pair; rows must already be sorted by rank.
pub fn parse_records<R: Read>(reader: R, spec: &InputSpec) -> Result<Vec<EvaluationRecord>> {
    let columns = spec.resolve()?;

    let mut reader = ReaderBuilder::new()
        .delimiter(spec.delimiter)
        .has_headers(spec.has_header)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut ranks: HashMap<(String, String), u32> = HashMap::new();
    let mut records = Vec::new();

    for result in reader.records() {
        let row = result?;
        let mut record = parse_row(&row, columns, spec.delimiter)?;

        let rank = ranks
            .entry((record.run_tag.clone(), record.system_id.clone()))
            .or_insert(0);
        *rank += 1;
        record.pose_rank = *rank;

        records.push(record);
    }

    Ok(records)
}

/// Convert one row into a record with a placeholder rank.
fn parse_row(row: &StringRecord, columns: ColumnMap, delimiter: u8) -> Result<EvaluationRecord> {
    let line = row.position().map(|p| p.line()).unwrap_or(0);
    let fail = |reason: String| PoseStatError::Parse {
        line,
        content: row
            .iter()
            .collect::<Vec<_>>()
            .join(&char::from(delimiter).to_string()),
        reason,
    };

    let system_id = required_field(row, columns.system, "system").map_err(&fail)?;
    let run_tag = required_field(row, columns.tag, "tag").map_err(&fail)?;
    let raw_rmsd = required_field(row, columns.rmsd, "rmsd").map_err(&fail)?;

    let rmsd: f64 = raw_rmsd
        .parse()
        .map_err(|_| fail(format!("rmsd '{}' is not a number", raw_rmsd)))?;

    if rmsd.is_nan() || rmsd < 0.0 {
        return Err(fail(format!("rmsd '{}' must be non-negative", raw_rmsd)));
    }

    Ok(EvaluationRecord::new(system_id, run_tag, 0, rmsd))
}

/// Non-empty value of a column, or the reason it is unusable.
fn required_field<'r>(
    row: &'r StringRecord,
    index: usize,
    name: &str,
) -> std::result::Result<&'r str, String> {
    match row.get(index) {
        Some("") => Err(format!("empty {} field (column {})", name, index)),
        Some(value) => Ok(value),
        None => Err(format!(
            "missing {} field (column {}, row has {} columns)",
            name,
            index,
            row.len()
        )),
    }
}
