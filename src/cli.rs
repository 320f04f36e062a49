//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// PoseBench - top-N pose statistics for docking benchmarks
///
/// Computes, for every docking run tag, the percentage of
/// receptor-ligand systems with a good pose among the top N poses,
/// and merges per-job RMSD files into master tables.
///
/// Examples:
///   posebench topn -i master_rmsds.csv -U 4260
///   posebench topn -i run1.csv run2.csv -N "Default" "Dense" --format json
///   posebench coalesce -s _ex -r /data/ -d pockets.txt -o master.csv --values 8 16
///   posebench init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .posebench.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute cumulative top-N statistics and write a report
    Topn(TopNArgs),
    /// Merge per-job .rmsds files into one master CSV
    Coalesce(CoalesceArgs),
    /// Generate a default .posebench.toml configuration file
    InitConfig,
}

/// Arguments of the `topn` subcommand.
///
/// Options left unset fall back to the configuration file.
#[derive(clap::Args, Debug, Clone)]
pub struct TopNArgs {
    /// Master RMSD files to compare
    ///
    /// Each file is validated and aggregated on its own.
    #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
    pub input: Vec<PathBuf>,

    /// Display names for the tags, in output order
    ///
    /// Tags are ordered by input file, then alphabetically within a file.
    #[arg(short = 'N', long, num_args = 1.., value_name = "NAME")]
    pub names: Option<Vec<String>>,

    /// Number of unique receptor-ligand systems every tag must have
    #[arg(short = 'U', long, value_name = "COUNT", env = "POSEBENCH_NUM_UNIQUE")]
    pub num_unique: Option<usize>,

    /// RMSD success thresholds (comma-separated, strictly increasing)
    #[arg(long, value_name = "T1,T2,T3", value_delimiter = ',')]
    pub thresholds: Option<Vec<f64>>,

    /// Pose counts highlighted in the report summary (comma-separated)
    #[arg(long, value_name = "POSES", value_delimiter = ',')]
    pub report_poses: Option<Vec<usize>>,

    /// Field delimiter of the input files
    #[arg(short, long, value_name = "CHAR")]
    pub delimiter: Option<String>,

    /// Input files have no header row
    #[arg(long)]
    pub no_header: bool,

    /// 0-based indices of the columns to read (comma-separated)
    #[arg(long, value_name = "INDICES", value_delimiter = ',')]
    pub use_columns: Option<Vec<usize>>,

    /// Names for the selected columns (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub column_names: Option<Vec<String>>,

    /// Column name of the system identifier
    #[arg(long, value_name = "NAME")]
    pub system_field: Option<String>,

    /// Column name of the run tag
    #[arg(long, value_name = "NAME")]
    pub tag_field: Option<String>,

    /// Column name of the RMSD value
    #[arg(long, value_name = "NAME")]
    pub rmsd_field: Option<String>,

    /// Output format (markdown, json, csv)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments of the `coalesce` subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct CoalesceArgs {
    /// Suffix of the files to merge (files are *<SUFFIX><VALUE>.rmsds)
    #[arg(short, long)]
    pub suffix: String,

    /// Values combined with the suffix; each non-empty value replaces the tag
    #[arg(long, num_args = 1.., value_name = "VALUE")]
    pub values: Option<Vec<String>>,

    /// Root of the directories to search
    #[arg(short = 'r', long, value_name = "DIR")]
    pub dataroot: PathBuf,

    /// File containing the pocket directory names to work on
    #[arg(short, long, value_name = "FILE")]
    pub dirlist: PathBuf,

    /// Name of the output file
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// CSV format (one row per tag and pose count)
    Csv,
}

impl OutputFormat {
    /// File extension used for default report names.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Topn(topn) => topn.validate(),
            Command::Coalesce(coalesce) => coalesce.validate(),
            Command::InitConfig => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl TopNArgs {
    fn validate(&self) -> Result<(), String> {
        for path in &self.input {
            if !path.is_file() {
                return Err(format!("Input file does not exist: {}", path.display()));
            }
        }

        if self.num_unique == Some(0) {
            return Err("Number of unique systems must be at least 1".to_string());
        }

        if let Some(ref poses) = self.report_poses {
            if poses.contains(&0) {
                return Err("Report poses are 1-based; 0 is not a pose count".to_string());
            }
        }

        if let Some(ref names) = self.names {
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err("Names must not be empty".to_string());
            }
        }

        Ok(())
    }
}

impl CoalesceArgs {
    fn validate(&self) -> Result<(), String> {
        if !self.dataroot.is_dir() {
            return Err(format!(
                "Data root is not a directory: {}",
                self.dataroot.display()
            ));
        }

        if !self.dirlist.is_file() {
            return Err(format!(
                "Directory list does not exist: {}",
                self.dirlist.display()
            ));
        }

        Ok(())
    }

    /// Values to combine with the suffix; a single empty value by default.
    pub fn effective_values(&self) -> Vec<String> {
        self.values.clone().unwrap_or_else(|| vec![String::new()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_topn_args() -> TopNArgs {
        TopNArgs {
            input: Vec::new(),
            names: None,
            num_unique: Some(10),
            thresholds: None,
            report_poses: None,
            delimiter: None,
            no_header: false,
            use_columns: None,
            column_names: None,
            system_field: None,
            tag_field: None,
            rmsd_field: None,
            format: None,
            output: None,
        }
    }

    fn make_args(command: Command) -> Args {
        Args {
            command,
            config: None,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_topn() {
        let args = Args::try_parse_from([
            "posebench",
            "-v",
            "topn",
            "-i",
            "a.csv",
            "b.csv",
            "-U",
            "42",
            "--thresholds",
            "0.5,1,1.5",
            "--report-poses",
            "1,5",
            "-f",
            "json",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Command::Topn(topn) => {
                assert_eq!(topn.input.len(), 2);
                assert_eq!(topn.num_unique, Some(42));
                assert_eq!(topn.thresholds, Some(vec![0.5, 1.0, 1.5]));
                assert_eq!(topn.report_poses, Some(vec![1, 5]));
                assert_eq!(topn.format, Some(OutputFormat::Json));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_coalesce() {
        let args = Args::try_parse_from([
            "posebench",
            "coalesce",
            "-s",
            "_ex",
            "--values",
            "8",
            "16",
            "-r",
            "/data",
            "-d",
            "dirs.txt",
            "-o",
            "out.csv",
        ])
        .unwrap();

        match args.command {
            Command::Coalesce(coalesce) => {
                assert_eq!(coalesce.suffix, "_ex");
                assert_eq!(coalesce.effective_values(), vec!["8", "16"]);
                assert_eq!(coalesce.dirlist, PathBuf::from("dirs.txt"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_documented_synopsis() {
        let args = Args::try_parse_from([
            "posebench",
            "-q",
            "topn",
            "-i",
            "run1.csv",
            "run2.csv",
            "-N",
            "Default",
            "Dense",
            "-U",
            "2",
            "-d",
            "\\t",
            "-o",
            "report.md",
        ])
        .unwrap();

        match args.command {
            Command::Topn(topn) => {
                assert_eq!(
                    topn.names,
                    Some(vec!["Default".to_string(), "Dense".to_string()])
                );
                assert_eq!(topn.delimiter.as_deref(), Some("\\t"));
                assert_eq!(topn.output, Some(PathBuf::from("report.md")));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let args = Args::try_parse_from([
            "posebench",
            "coalesce",
            "-s",
            "_x",
            "-r",
            "root",
            "-o",
            "o.csv",
            "-d",
            "dl.txt",
        ])
        .unwrap();

        match args.command {
            Command::Coalesce(coalesce) => {
                assert_eq!(coalesce.dataroot, PathBuf::from("root"));
                assert_eq!(coalesce.dirlist, PathBuf::from("dl.txt"));
                assert_eq!(coalesce.effective_values(), vec![String::new()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_default_coalesce_values() {
        let args = CoalesceArgs {
            suffix: "_x".to_string(),
            values: None,
            dataroot: PathBuf::from("."),
            dirlist: PathBuf::from("dirs.txt"),
            output: PathBuf::from("out.csv"),
        };
        assert_eq!(args.effective_values(), vec![String::new()]);
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::InitConfig);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_topn_values() {
        let mut topn = make_topn_args();
        assert!(topn.validate().is_ok());

        topn.num_unique = Some(0);
        assert!(topn.validate().is_err());

        topn.num_unique = None;
        topn.report_poses = Some(vec![0, 3]);
        assert!(topn.validate().is_err());

        topn.report_poses = None;
        topn.input = vec![PathBuf::from("definitely/not/here.csv")];
        assert!(topn.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::InitConfig);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_output_extension() {
        assert_eq!(OutputFormat::Markdown.extension(), "md");
        assert_eq!(OutputFormat::Json.extension(), "json");
        assert_eq!(OutputFormat::Csv.extension(), "csv");
    }
}
