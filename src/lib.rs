//! Platesplit: prepare YOLO license plate datasets for training.
//!
//! Independent steps over a dataset directory with parallel `images/` and
//! `labels/` trees split into `train`, `valid` and `test`:
//!
//! - [`merge`]: combine several source datasets with collision-free prefixes
//! - [`relabel`]: keep selected classes and rewrite them to class 0
//! - [`validation`]: find and delete malformed label files with their images
//! - [`split`]: move samples between partitions to reach target ratios
//! - [`summary`] and [`layout::count_files`]: counts
//!
//! # Modules
//!
//! - [`config`]: fixed defaults and the config structs passed to each step
//! - [`error`]: Error types for platesplit operations

pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod merge;
pub mod relabel;
pub mod split;
pub mod summary;
pub mod validation;

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::PrepError;

use crate::config::{MergeConfig, SplitConfig, ValidateConfig};

/// The platesplit CLI application.
#[derive(Parser)]
#[command(name = "platesplit")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Count every file below a directory.
    Count(CountArgs),
    /// Show how many images each partition holds.
    Summary(SummaryArgs),
    /// Merge several source datasets into one directory tree.
    Merge(MergeArgs),
    /// Keep only selected classes in a directory of label files.
    Relabel(RelabelArgs),
    /// Find malformed label files and delete them with their images.
    Validate(ValidateArgs),
    /// Move samples between train/valid/test to reach the target ratios.
    Split(SplitArgs),
}

#[derive(clap::Args)]
struct CountArgs {
    /// Directory to count.
    #[arg(default_value = config::DEFAULT_DATASET_ROOT)]
    path: PathBuf,
}

#[derive(clap::Args)]
struct SummaryArgs {
    /// Dataset root containing images/.
    #[arg(long, default_value = config::DEFAULT_DATASET_ROOT)]
    root: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct MergeArgs {
    /// Source dataset roots, in prefix order (ds1, ds2, ...).
    sources: Vec<PathBuf>,

    /// Merged dataset root.
    #[arg(long = "into", default_value = config::DEFAULT_DATASET_ROOT)]
    output_root: PathBuf,
}

#[derive(clap::Args)]
struct RelabelArgs {
    /// Directory holding the .txt label files.
    label_dir: PathBuf,

    /// Class id to keep (repeatable). Kept lines are rewritten to class 0.
    #[arg(long = "keep", required = true)]
    keep: Vec<usize>,

    /// Renumber kept classes to 0..n by ascending old id instead.
    #[arg(long)]
    renumber: bool,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Dataset root containing images/ and labels/.
    #[arg(long, default_value = config::DEFAULT_DATASET_ROOT)]
    root: PathBuf,

    /// Number of classes; class ids must be below it.
    #[arg(long, default_value_t = config::NUM_CLASSES)]
    classes: usize,

    /// Delete invalid label/image pairs without asking.
    #[arg(long)]
    yes: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Dataset root containing images/ and labels/.
    #[arg(long, default_value = config::DEFAULT_DATASET_ROOT)]
    root: PathBuf,

    /// Target fractions as train,valid,test.
    #[arg(long, default_value = "0.7,0.2,0.1")]
    ratios: String,

    /// Partition order for targets and filling; the last absorbs rounding.
    #[arg(long, default_value = "train,valid,test")]
    order: String,

    /// Order in which partitions give away surplus images.
    #[arg(long, default_value = "train,valid,test")]
    donors: String,

    /// Plan the moves without touching any file.
    #[arg(long)]
    dry_run: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Report output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(raw: &str) -> Result<Self, PrepError> {
        match raw {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(PrepError::UnsupportedOutput(format!(
                "'{}' (supported: text, json)",
                other
            ))),
        }
    }
}

/// Run the platesplit CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PrepError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Some(Commands::Count(args)) => run_count(args),
        Some(Commands::Summary(args)) => run_summary(args),
        Some(Commands::Merge(args)) => run_merge(args),
        Some(Commands::Relabel(args)) => run_relabel(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Split(args)) => run_split(args),
        None => {
            println!("platesplit {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Prepare YOLO license plate datasets: merge, relabel, validate and split.");
            println!();
            println!("Run 'platesplit --help' for usage information.");
            Ok(())
        }
    }
}

fn emit<T: Serialize + fmt::Display>(report: &T, format: OutputFormat) -> Result<(), PrepError> {
    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|source| PrepError::JsonWrite { source })?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_count(args: CountArgs) -> Result<(), PrepError> {
    let total = layout::count_files(&args.path)?;
    println!("Total files in '{}': {}", args.path.display(), total);
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<(), PrepError> {
    let format = OutputFormat::parse(&args.output)?;
    let summary = summary::split_summary(&args.root, &config::SUMMARY_IMAGE_EXTENSIONS)?;
    emit(&summary, format)
}

fn run_merge(args: MergeArgs) -> Result<(), PrepError> {
    let mut merge_config = MergeConfig {
        output_root: args.output_root,
        ..MergeConfig::default()
    };
    if !args.sources.is_empty() {
        merge_config.sources = args.sources;
    }

    let report = merge::merge_datasets(&merge_config)?;
    print!("{}", report);
    Ok(())
}

fn run_relabel(args: RelabelArgs) -> Result<(), PrepError> {
    let keep: BTreeSet<usize> = args.keep.into_iter().collect();
    let report = relabel::relabel_dir(&args.label_dir, &keep, args.renumber)?;
    print!("{}", report);
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), PrepError> {
    let format = OutputFormat::parse(&args.output)?;
    let validate_config = ValidateConfig {
        dataset_root: args.root,
        num_classes: args.classes,
        ..ValidateConfig::default()
    };

    let report = validation::validate_dataset(&validate_config)?;
    emit(&report, format)?;

    if report.is_clean() {
        return Ok(());
    }

    let confirmed = args.yes || (format == OutputFormat::Text && confirm_deletion()?);
    if !confirmed {
        if format == OutputFormat::Text {
            println!();
            println!("Deletion cancelled.");
        }
        return Ok(());
    }

    let deletion = validation::delete_invalid(&report);
    if format == OutputFormat::Text {
        println!();
        print!("{}", deletion);
    }

    if deletion.errors.is_empty() {
        Ok(())
    } else {
        Err(PrepError::DeletionFailed {
            failed: deletion.errors.len(),
        })
    }
}

fn confirm_deletion() -> Result<bool, PrepError> {
    print!("\nDelete all these label/image pairs? [y/N]: ");
    io::stdout().flush().map_err(PrepError::Io)?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(PrepError::Io)?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn run_split(args: SplitArgs) -> Result<(), PrepError> {
    let format = OutputFormat::parse(&args.output)?;
    let split_config = SplitConfig {
        fractions: config::parse_fractions(&args.ratios)?,
        partition_order: config::parse_partition_order(&args.order)?,
        donor_priority: config::parse_partition_order(&args.donors)?,
        ..SplitConfig::with_root(args.root)
    };
    split_config.validate()?;

    let mut store = split::FsStore::from_config(&split_config);

    let report = if args.dry_run {
        split::plan_split(&store, &split_config)?
    } else {
        store.layout().ensure_dirs()?;
        split::split_dataset(&mut store, &split_config)?
    };

    emit(&report, format)?;

    if report.failure_count() > 0 {
        return Err(PrepError::SplitIncomplete {
            failed: report.failure_count(),
            report: Box::new(report),
        });
    }

    Ok(())
}
