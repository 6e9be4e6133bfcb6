//! intake - Command-line driver for the simulated deal intake pipeline.
//!
//! Scans the given paths, enqueues them in single-deal or bulk mode,
//! submits, and reports stage progress on stderr until every entry is done.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args as ClapArgs, Parser, Subcommand};
use intake_engine::{
    format_file_size, scan_selection, select_file, status_text, DrainSummary, EntryStatus, Mode,
    Pipeline, PipelineConfig, PipelineObserver, SelectedFile, SubmitReceipt, UploadEntry,
};
use tracing_subscriber::EnvFilter;

/// intake - Simulated document intake for vehicle deals
#[derive(Parser, Debug)]
#[command(name = "intake")]
#[command(version = "0.1.0")]
#[command(about = "Run deal documents through the simulated intake pipeline")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// TOML file with pipeline settings
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Divide every stage delay by this factor
    #[arg(long, value_name = "N", global = true)]
    time_scale: Option<u32>,

    /// Print every stage transition
    #[arg(long, global = true)]
    verbose: bool,

    /// Print the final entries as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload documents for one deal (files, or directories scanned recursively)
    Single {
        /// Customer name (required)
        #[arg(long, value_name = "NAME")]
        customer: String,

        /// Deal ID; generated when omitted
        #[arg(long, value_name = "ID")]
        deal_id: Option<String>,

        /// Free-form notes
        #[arg(long, value_name = "TEXT")]
        notes: Option<String>,

        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Upload many deals; each subfolder of a directory becomes one deal
    Bulk {
        #[arg(value_name = "DIR", required = true)]
        dirs: Vec<PathBuf>,
    },
}

/// CLI implementation of PipelineObserver for displaying stage progress
struct CliProgress {
    verbose: bool,
    start_time: Instant,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        CliProgress {
            verbose,
            start_time: Instant::now(),
        }
    }

    fn print_progress_bar(percent: u8) -> String {
        let filled = (percent / 5) as usize;
        let empty = 20 - filled;
        format!("[{}{}] {:3}%", "=".repeat(filled), " ".repeat(empty), percent)
    }

    fn describe(entry: &UploadEntry) -> String {
        match entry.size_bytes() {
            Some(size) => format!("{} ({})", entry.name, format_file_size(size)),
            None => format!("{} ({} files)", entry.name, entry.file_count().unwrap_or(0)),
        }
    }
}

impl PipelineObserver for CliProgress {
    fn on_submitted(&self, receipt: &SubmitReceipt) {
        eprintln!("Processing started ({} mode)", receipt.mode);
        if let Some(deal_id) = &receipt.deal_id {
            eprintln!("  Deal ID: {}", deal_id);
        }
        if let Some(customer) = &receipt.customer_name {
            eprintln!("  Customer: {}", customer);
        }
        eprintln!("  Entries: {}", receipt.entry_count);
        eprintln!();
    }

    fn on_entry_advanced(&self, entry: &UploadEntry) {
        if !self.verbose && !entry.status.is_terminal() {
            return;
        }

        let mut line = format!(
            "{} {} - {}",
            Self::print_progress_bar(entry.progress),
            Self::describe(entry),
            status_text(entry)
        );
        if let Some(deal) = &entry.synthetic_deal {
            line.push_str(&format!(" [{} / {}]", deal.deal_id, deal.customer_name));
        }
        eprintln!("{}", line);
    }

    fn on_drained(&self, mode: Mode, summary: &DrainSummary) {
        eprintln!();
        eprintln!("Processing complete!");
        eprintln!("Summary: {}", summary.message(mode));
        eprintln!("Elapsed: {:.1}s", self.start_time.elapsed().as_secs_f64());
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.common.verbose);

    // Exit code tracking
    let exit_code = match run_cli(&args).await {
        Ok(summary) if summary.failed == 0 => 0,
        Ok(_) => 1,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build the pipeline configuration from the config file and flags.
fn load_config(common: &CommonArgs) -> Result<PipelineConfig, String> {
    let mut config = match &common.config {
        Some(path) => PipelineConfig::load(path).map_err(|e| e.to_string())?,
        None => PipelineConfig::default(),
    };
    if let Some(scale) = common.time_scale {
        config.time_scale = scale;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Collect files for a single-deal upload: files as given, directories flattened.
fn collect_single(paths: &[PathBuf]) -> Result<Vec<SelectedFile>, String> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(scan_selection(path).map_err(|e| e.to_string())?);
        } else {
            files.push(select_file(path).map_err(|e| e.to_string())?);
        }
    }
    Ok(files)
}

/// Collect files for a bulk upload, keeping paths relative to each directory.
///
/// Deal folders are named by their top-level directory, so the same folder
/// name under two different roots is rejected instead of merged.
fn collect_bulk(dirs: &[PathBuf]) -> Result<Vec<SelectedFile>, String> {
    let mut files = Vec::new();
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for dir in dirs {
        if !dir.is_dir() {
            return Err(format!("Not a directory: {}", dir.display()));
        }
        let scanned = scan_selection(dir).map_err(|e| e.to_string())?;

        let folders: HashSet<&str> = scanned
            .iter()
            .filter_map(|f| f.relative_path.as_deref())
            .filter_map(|rel| rel.split_once('/').map(|(top, _)| top))
            .collect();
        for folder in folders {
            if let Some(first) = seen.insert(folder.to_string(), dir.as_path()) {
                return Err(format!(
                    "Deal folder '{}' appears in both {} and {}",
                    folder,
                    first.display(),
                    dir.display()
                ));
            }
        }

        files.extend(scanned);
    }
    Ok(files)
}

/// Main CLI logic - separated for testability
async fn run_cli(args: &Args) -> Result<DrainSummary, String> {
    let config = load_config(&args.common)?;

    let (mode, files) = match &args.command {
        Command::Single { paths, .. } => (Mode::Single, collect_single(paths)?),
        Command::Bulk { dirs } => (Mode::Bulk, collect_bulk(dirs)?),
    };
    tracing::info!(%mode, files = files.len(), time_scale = config.time_scale, "selection scanned");

    let progress = Arc::new(CliProgress::new(args.common.verbose));
    let mut pipeline = Pipeline::new(mode, config)
        .map_err(|e| format!("Pipeline creation failed: {}", e))?
        .with_observer(progress);

    pipeline
        .enqueue(files)
        .map_err(|e| format!("Enqueue failed: {}", e))?;

    if let Command::Single {
        customer,
        deal_id,
        notes,
        ..
    } = &args.command
    {
        pipeline
            .set_customer_name(customer.as_str())
            .map_err(|e| e.to_string())?;
        if let Some(deal_id) = deal_id {
            pipeline
                .set_deal_id(deal_id.as_str())
                .map_err(|e| e.to_string())?;
        }
        if let Some(notes) = notes {
            pipeline.set_notes(notes.as_str()).map_err(|e| e.to_string())?;
        }
    }

    pipeline
        .submit()
        .map_err(|e| format!("{}: {}", e.title(), e.description()))?;

    let summary = pipeline
        .wait_drained()
        .await
        .map_err(|e| format!("Processing failed: {}", e))?;

    if args.common.json {
        let entries = pipeline.snapshot();
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| format!("Failed to encode entries: {}", e))?;
        println!("{}", json);
    }

    report_failures(&pipeline.snapshot());
    Ok(summary)
}

fn report_failures(entries: &[UploadEntry]) {
    let failed: Vec<&UploadEntry> = entries
        .iter()
        .filter(|e| e.status == EntryStatus::Error)
        .collect();
    if failed.is_empty() {
        return;
    }

    eprintln!();
    eprintln!("Failed entries:");
    for entry in failed {
        eprintln!(
            "  {}: {}",
            entry.name,
            entry.error_message.as_deref().unwrap_or("(unknown error)")
        );
    }
}
