//! PoseBench - docking benchmark pose statistics
//!
//! A CLI tool that computes cumulative top-N success rates of docked
//! poses per run tag, and merges per-job RMSD files into master tables.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (bad arguments, unreadable input, integrity failure, etc.)

mod analysis;
mod cli;
mod coalesce;
mod config;
mod error;
mod ingest;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, CoalesceArgs, Command, TopNArgs};
use config::{Config, CONFIG_FILE_NAME};
use ingest::InputSpec;
use models::{CumulativeTable, Report, ReportMetadata, Thresholds};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        if let Err(e) = handle_init_config() {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Initialize logging
    init_logging(&args);

    info!("PoseBench v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let outcome = match args.command {
        Command::Topn(ref topn) => run_topn(&args, topn),
        Command::Coalesce(ref coalesce) => run_coalesce(coalesce),
        Command::InitConfig => Ok(()),
    };

    if let Err(e) = outcome {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Handle init-config: generate a default .posebench.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the input layout, thresholds, and report.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Compute the top-N tables for every input and write the report.
fn run_topn(args: &Args, topn: &TopNArgs) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(args)?;
    config.merge_with_args(topn);
    config.validate()?;

    let spec = config.input_spec()?;
    let thresholds = config.thresholds()?;
    let expected = config.analysis.expected_systems;

    println!(
        "📊 Computing top-N statistics ({} systems per tag, thresholds {})",
        expected, thresholds
    );

    let per_input = aggregate_inputs(&topn.input, &spec, expected, &thresholds)?;

    let inputs: Vec<String> = per_input.iter().map(|(source, _)| source.clone()).collect();
    let tables = report::assign_labels(per_input, &config.report.labels)?;

    if tables.is_empty() {
        anyhow::bail!("No evaluation records found in the input files");
    }

    let metadata = ReportMetadata {
        generated_at: Utc::now(),
        inputs,
        expected_systems: expected,
        thresholds,
        report_poses: config.report.report_poses.clone(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report { metadata, tables };

    let output = report::render_report(&report, config.report.format, config.report.precision)?;
    let output_path = config.output_path();

    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!(
        "\n✅ {} tags reported. Report saved to: {}",
        report.tables.len(),
        output_path.display()
    );

    Ok(())
}

/// Read and aggregate every input file in order.
///
/// Each file is validated on its own; the first failing file aborts the run.
fn aggregate_inputs(
    paths: &[PathBuf],
    spec: &InputSpec,
    expected: usize,
    thresholds: &Thresholds,
) -> Result<Vec<(String, Vec<CumulativeTable>)>> {
    let mut per_input = Vec::with_capacity(paths.len());

    for path in paths {
        let source = path.display().to_string();

        let records = ingest::read_records(path, spec)
            .with_context(|| format!("Failed to read {}", source))?;
        if records.is_empty() {
            warn!("{} contains no records", source);
        }

        let tables = analysis::aggregate_top_n(&records, expected, thresholds)
            .with_context(|| format!("Failed to aggregate {}", source))?;

        for table in &tables {
            println!(
                "   {}: {} systems, {} poses",
                table.tag, table.systems, table.max_poses
            );
        }

        per_input.push((source, tables));
    }

    Ok(per_input)
}

/// Merge per-job .rmsds files into a master CSV.
fn run_coalesce(args: &CoalesceArgs) -> Result<()> {
    let pockets = coalesce::read_pocket_list(&args.dirlist)
        .with_context(|| format!("Failed to read {}", args.dirlist.display()))?;

    println!(
        "📥 Coalescing {} pocket directories under {}",
        pockets.len(),
        args.dataroot.display()
    );

    let options = coalesce::CoalesceOptions {
        data_root: args.dataroot.clone(),
        pockets,
        suffix: args.suffix.clone(),
        values: args.effective_values(),
        output: args.output.clone(),
    };

    let summary = coalesce::coalesce(&options)?;

    println!(
        "\n✅ Merged {} rows from {} files into {}",
        summary.rows,
        summary.files,
        args.output.display()
    );

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    load_config_from(args.config.as_deref(), Path::new("."))
}

/// Load the explicit config, else `.posebench.toml` in `dir`, else defaults.
///
/// A config file that exists but cannot be read is an error.
fn load_config_from(explicit: Option<&Path>, dir: &Path) -> Result<Config> {
    // Try explicit config path
    if let Some(config_path) = explicit {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_from_dir(dir)
        .with_context(|| format!("Failed to load {}", CONFIG_FILE_NAME))?
    {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::error::PoseStatError;
    use tempfile::TempDir;

    fn simple_spec() -> InputSpec {
        InputSpec {
            use_columns: vec![0, 1, 2],
            column_names: vec!["tag".into(), "rec".into(), "rmsd".into()],
            ..InputSpec::default()
        }
    }

    fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn topn_args(input: Vec<PathBuf>, output: PathBuf) -> TopNArgs {
        TopNArgs {
            input,
            names: None,
            num_unique: Some(2),
            thresholds: None,
            report_poses: None,
            delimiter: None,
            no_header: false,
            use_columns: Some(vec![0, 1, 2]),
            column_names: Some(vec!["tag".into(), "rec".into(), "rmsd".into()]),
            system_field: None,
            tag_field: None,
            rmsd_field: None,
            format: Some(OutputFormat::Csv),
            output: Some(output),
        }
    }

    #[test]
    fn test_labels_span_files_in_input_order() {
        let dir = TempDir::new().unwrap();
        let first = write_input(
            &dir,
            "a.csv",
            "tag,rec,rmsd\nB,x,0.5\nB,y,2.5\nA,x,1.5\nA,y,0.1\n",
        );
        let second = write_input(&dir, "b.csv", "tag,rec,rmsd\nC,x,4.0\nC,y,0.2\n");

        let per_input = aggregate_inputs(
            &[first, second],
            &simple_spec(),
            2,
            &Thresholds::default(),
        )
        .unwrap();

        assert_eq!(per_input.len(), 2);
        assert!(per_input[0].0.ends_with("a.csv"));
        assert!(per_input[1].0.ends_with("b.csv"));

        let labels = vec!["One".to_string(), "Two".to_string(), "Three".to_string()];
        let tables = report::assign_labels(per_input, &labels).unwrap();
        let pairs: Vec<(&str, &str)> = tables
            .iter()
            .map(|t| (t.label.as_str(), t.table.tag.as_str()))
            .collect();
        assert_eq!(pairs, vec![("One", "A"), ("Two", "B"), ("Three", "C")]);
        assert!(tables[2].source.ends_with("b.csv"));
    }

    #[test]
    fn test_second_file_integrity_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let good = write_input(&dir, "good.csv", "tag,rec,rmsd\nA,x,0.5\nA,y,2.5\n");
        let bad = write_input(&dir, "bad.csv", "tag,rec,rmsd\nA,x,0.5\nA,x,0.7\n");

        let err = aggregate_inputs(
            &[good.clone(), bad.clone()],
            &simple_spec(),
            2,
            &Thresholds::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PoseStatError>(),
            Some(PoseStatError::DataIntegrity { expected: 2, actual: 1, .. })
        ));

        let config_path = write_input(&dir, "config.toml", "");
        let output = dir.path().join("report.csv");
        let args = Args {
            command: Command::InitConfig,
            config: Some(config_path),
            verbose: false,
            quiet: true,
        };
        let topn = topn_args(vec![good, bad], output.clone());

        assert!(run_topn(&args, &topn).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_run_topn_writes_report() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "in.csv", "tag,rec,rmsd\nA,x,0.5\nA,y,2.5\n");
        let config_path = write_input(
            &dir,
            "config.toml",
            "[analysis]\nthresholds = [0.25, 0.75, 3.0]\n",
        );
        let output = dir.path().join("report.csv");
        let args = Args {
            command: Command::InitConfig,
            config: Some(config_path),
            verbose: false,
            quiet: true,
        };

        run_topn(&args, &topn_args(vec![input], output.clone())).unwrap();

        let written = std::fs::read_to_string(output).unwrap();
        assert!(written.contains("A,A,1,0,50,100"));
    }

    #[test]
    fn test_malformed_default_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[analysis]\nthresholds = [0.25, 0.5, 0.75",
        )
        .unwrap();

        assert!(load_config_from(None, dir.path()).is_err());
    }

    #[test]
    fn test_missing_default_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(None, dir.path()).unwrap();
        assert_eq!(config.analysis.expected_systems, 4260);
    }
}
