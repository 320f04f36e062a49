//! Merging of per-job RMSD files into a master table.
//!
//! Every docking job leaves a whitespace-separated `.rmsds` file with
//! `tag molids rmsd` lines. This module gathers those files for a list
//! of pocket directories and writes them into one CSV with the columns
//! `tag,molids,rmsd,pocket,rec,lig`.

use crate::error::{PoseStatError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Header of the master table.
pub const MASTER_HEADER: [&str; 6] = ["tag", "molids", "rmsd", "pocket", "rec", "lig"];

/// Extension of per-job RMSD files.
pub const RMSDS_EXTENSION: &str = ".rmsds";

/// Options for a coalescing run.
#[derive(Debug, Clone)]
pub struct CoalesceOptions {
    /// Root of the pocket directories.
    pub data_root: PathBuf,
    /// Pocket names, each a path prefix relative to the root.
    pub pockets: Vec<String>,
    /// Suffix preceding the value in matching file names.
    pub suffix: String,
    /// Values combined with the suffix. A non-empty value replaces the tag.
    pub values: Vec<String>,
    /// Output CSV path.
    pub output: PathBuf,
}

/// Counts of what was merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoalesceSummary {
    pub files: usize,
    pub rows: usize,
}

/// One row of the master table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MasterRow {
    tag: String,
    molids: String,
    rmsd: String,
    pocket: String,
    rec: String,
    lig: String,
}

impl MasterRow {
    fn fields(&self) -> [&str; 6] {
        [
            self.tag.as_str(),
            self.molids.as_str(),
            self.rmsd.as_str(),
            self.pocket.as_str(),
            self.rec.as_str(),
            self.lig.as_str(),
        ]
    }
}

/// Read pocket names from a directory list, one per line.
pub fn read_pocket_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Merge all matching `.rmsds` files into the output CSV.
pub fn coalesce(options: &CoalesceOptions) -> Result<CoalesceSummary> {
    let name_pattern = receptor_ligand_pattern()?;
    let candidates = list_rmsds_files(&options.data_root)?;
    debug!(
        "Found {} {} files under {}",
        candidates.len(),
        RMSDS_EXTENSION,
        options.data_root.display()
    );

    let mut writer = csv::Writer::from_path(&options.output)?;
    writer.write_record(MASTER_HEADER)?;

    let mut summary = CoalesceSummary::default();

    for pocket in &options.pockets {
        info!("Coalescing pocket {}", pocket);

        for value in &options.values {
            let ending = format!("{}{}{}", options.suffix, value, RMSDS_EXTENSION);
            let matches: Vec<&String> = candidates
                .iter()
                .filter(|rel| matches_job_file(rel, pocket, &ending))
                .collect();

            if matches.is_empty() {
                warn!("No files match {}*{}", pocket, ending);
            }

            for rel in matches {
                let path = options.data_root.join(rel);
                let rows = read_job_file(&path, pocket, value, &name_pattern)?;
                for row in &rows {
                    writer.write_record(row.fields())?;
                }
                debug!("{}: {} rows", rel, rows.len());

                summary.files += 1;
                summary.rows += rows.len();
            }
        }
    }

    writer.flush()?;

    info!(
        "Wrote {} rows from {} files to {}",
        summary.rows,
        summary.files,
        options.output.display()
    );

    Ok(summary)
}

/// `(\S+)_PRO_(\S+)_LIG` over the job file name captures receptor and ligand.
fn receptor_ligand_pattern() -> Result<Regex> {
    Regex::new(r"(\S+)_PRO_(\S+)_LIG")
        .map_err(|e| PoseStatError::InvalidInput(format!("bad file name pattern: {}", e)))
}

/// Relative paths (with `/` separators) of all `.rmsds` files, sorted.
fn list_rmsds_files(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if rel.ends_with(RMSDS_EXTENSION) {
            files.push(rel);
        }
    }

    files.sort();
    Ok(files)
}

/// Whether `rel` matches the glob `<pocket>*<ending>`.
///
/// As in shell globbing, `*` does not cross a `/`.
fn matches_job_file(rel: &str, pocket: &str, ending: &str) -> bool {
    let Some(rest) = rel.strip_prefix(pocket) else {
        return false;
    };

    match rest.strip_suffix(ending) {
        Some(wildcard) => !wildcard.contains('/'),
        None => false,
    }
}

/// Turn the lines of one job file into master rows.
fn read_job_file(path: &Path, pocket: &str, value: &str, pattern: &Regex) -> Result<Vec<MasterRow>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let captures = pattern.captures(&file_name).ok_or_else(|| PoseStatError::Parse {
        line: 0,
        content: path.display().to_string(),
        reason: "file name has no <rec>_PRO_<lig>_LIG part".to_string(),
    })?;
    let rec = captures[1].to_string();
    let lig = captures[2].to_string();

    let content = fs::read_to_string(path)?;
    let mut rows = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(PoseStatError::Parse {
                line: index as u64 + 1,
                content: line.to_string(),
                reason: format!(
                    "expected 'tag molids rmsd' in {}",
                    path.display()
                ),
            });
        }

        let tag = if value.is_empty() { fields[0] } else { value };

        rows.push(MasterRow {
            tag: tag.to_string(),
            molids: fields[1].to_string(),
            rmsd: fields[2].to_string(),
            pocket: pocket.to_string(),
            rec: rec.clone(),
            lig: lig.clone(),
        });
    }

    Ok(rows)
}
