//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.posebench.toml` files.

use crate::cli::{OutputFormat, TopNArgs};
use crate::ingest::InputSpec;
use crate::models::Thresholds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".posebench.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input table layout.
    #[serde(default)]
    pub input: InputConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report output path. Defaults to `posebench_report.<ext>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Layout of the delimited input files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Field delimiter (single character, or `\t`).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Whether the files start with a header row.
    #[serde(default = "default_true")]
    pub has_header: bool,

    /// 0-based indices of the columns to read.
    #[serde(default = "default_use_columns")]
    pub use_columns: Vec<usize>,

    /// Names assigned to the selected columns.
    #[serde(default = "default_column_names")]
    pub column_names: Vec<String>,

    /// Column name of the system identifier.
    #[serde(default = "default_system_field")]
    pub system_field: String,

    /// Column name of the run tag.
    #[serde(default = "default_tag_field")]
    pub tag_field: String,

    /// Column name of the RMSD value.
    #[serde(default = "default_rmsd_field")]
    pub rmsd_field: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: true,
            use_columns: default_use_columns(),
            column_names: default_column_names(),
            system_field: default_system_field(),
            tag_field: default_tag_field(),
            rmsd_field: default_rmsd_field(),
        }
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_true() -> bool {
    true
}

fn default_use_columns() -> Vec<usize> {
    vec![0, 2, 7]
}

fn default_column_names() -> Vec<String> {
    vec!["tag", "rmsd", "rec"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_system_field() -> String {
    "rec".to_string()
}

fn default_tag_field() -> String {
    "tag".to_string()
}

fn default_rmsd_field() -> String {
    "rmsd".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of unique receptor-ligand systems each tag must have.
    #[serde(default = "default_expected_systems")]
    pub expected_systems: usize,

    /// RMSD success thresholds, strictly increasing.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            expected_systems: default_expected_systems(),
            thresholds: default_thresholds(),
        }
    }
}

fn default_expected_systems() -> usize {
    4260
}

fn default_thresholds() -> Vec<f64> {
    Thresholds::default().values().to_vec()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Pose counts highlighted in the summary table.
    #[serde(default = "default_report_poses")]
    pub report_poses: Vec<usize>,

    /// Display names for the tags, in output order.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Decimal places for percentages.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            report_poses: default_report_poses(),
            labels: Vec::new(),
            precision: default_precision(),
        }
    }
}

fn default_report_poses() -> Vec<usize> {
    vec![1, 3]
}

fn default_precision() -> usize {
    1
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load `.posebench.toml` from `dir` if it exists.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let default_path = dir.join(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(&default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with `topn` arguments.
    ///
    /// Only options given on the command line override the file.
    pub fn merge_with_args(&mut self, args: &TopNArgs) {
        // Input layout
        if let Some(ref delimiter) = args.delimiter {
            self.input.delimiter = delimiter.clone();
        }
        if args.no_header {
            self.input.has_header = false;
        }
        if let Some(ref columns) = args.use_columns {
            self.input.use_columns = columns.clone();
        }
        if let Some(ref names) = args.column_names {
            self.input.column_names = names.clone();
        }
        if let Some(ref field) = args.system_field {
            self.input.system_field = field.clone();
        }
        if let Some(ref field) = args.tag_field {
            self.input.tag_field = field.clone();
        }
        if let Some(ref field) = args.rmsd_field {
            self.input.rmsd_field = field.clone();
        }

        // Analysis
        if let Some(count) = args.num_unique {
            self.analysis.expected_systems = count;
        }
        if let Some(ref thresholds) = args.thresholds {
            self.analysis.thresholds = thresholds.clone();
        }

        // Report
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref poses) = args.report_poses {
            self.report.report_poses = poses.clone();
        }
        if let Some(ref names) = args.names {
            self.report.labels = names.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
    }

    /// Thresholds checked for ordering and range.
    pub fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::new(&self.analysis.thresholds).context("Invalid [analysis] thresholds")
    }

    /// Input layout with the delimiter parsed.
    pub fn input_spec(&self) -> Result<InputSpec> {
        InputSpec::try_from(&self.input).context("Invalid [input] settings")
    }

    /// Path the report is written to.
    pub fn output_path(&self) -> PathBuf {
        match self.general.output {
            Some(ref output) => PathBuf::from(output),
            None => PathBuf::from(format!(
                "posebench_report.{}",
                self.report.format.extension()
            )),
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.expected_systems == 0 {
            anyhow::bail!("[analysis] expected_systems must be at least 1");
        }
        if self.report.report_poses.contains(&0) {
            anyhow::bail!("[report] report_poses are 1-based; 0 is not a pose count");
        }
        self.thresholds()?;
        self.input_spec()?;
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.expected_systems, 4260);
        assert_eq!(config.analysis.thresholds, vec![1.0, 2.0, 3.0]);
        assert_eq!(config.input.use_columns, vec![0, 2, 7]);
        assert_eq!(config.report.report_poses, vec![1, 3]);
        assert_eq!(config.output_path(), PathBuf::from("posebench_report.md"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.json"

[input]
delimiter = "\t"
has_header = false
use_columns = [0, 1, 2]
column_names = ["tag", "rec", "rmsd"]

[analysis]
expected_systems = 12
thresholds = [0.5, 1.0, 1.5]

[report]
format = "json"
labels = ["Default", "Dense"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("custom_report.json"));
        assert_eq!(config.input.delimiter, "\t");
        assert!(!config.input.has_header);
        assert_eq!(config.input.system_field, "rec");
        assert_eq!(config.analysis.expected_systems, 12);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.labels, vec!["Default", "Dense"]);
        assert_eq!(config.report.report_poses, vec![1, 3]);

        let spec = config.input_spec().unwrap();
        assert_eq!(spec.delimiter, b'\t');
        assert_eq!(config.thresholds().unwrap().values(), [0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.analysis.thresholds = vec![3.0, 2.0, 1.0];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.expected_systems = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.input.delimiter = ";;".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let args = TopNArgs {
            input: vec![PathBuf::from("a.csv")],
            names: Some(vec!["Run A".to_string()]),
            num_unique: Some(7),
            thresholds: None,
            report_poses: Some(vec![1, 5, 9]),
            delimiter: Some(" ".to_string()),
            no_header: true,
            use_columns: None,
            column_names: None,
            system_field: Some("receptor".to_string()),
            tag_field: None,
            rmsd_field: None,
            format: Some(OutputFormat::Csv),
            output: None,
        };

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.analysis.expected_systems, 7);
        assert_eq!(config.analysis.thresholds, vec![1.0, 2.0, 3.0]);
        assert_eq!(config.report.report_poses, vec![1, 5, 9]);
        assert_eq!(config.report.labels, vec!["Run A"]);
        assert_eq!(config.input.delimiter, " ");
        assert!(!config.input.has_header);
        assert_eq!(config.input.system_field, "receptor");
        assert_eq!(config.input.tag_field, "tag");
        assert_eq!(config.output_path(), PathBuf::from("posebench_report.csv"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[analysis]\nthresholds = [0.25, 0.5, 0.75]\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.analysis.thresholds, vec![0.25, 0.5, 0.75]);

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[analysis]\nthresholds = [0.25, 0.5, 0.75\n",
        )
        .unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.analysis.expected_systems, 4260);
    }
}
