mod client;
mod export;

use analytics::{TXN_FAMILY, catalogue};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use client::{
    ClientJob, ClientStatus, ClientSummary, client_id_from_path, dedupe_output_dirs, process_client,
    scan_input_dir,
};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{PlatformConfig, init_tracing, load_config};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// The main entry point for the ledgerlens reporting batch.
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A .env file is optional; it only supplies LEDGERLENS__* overrides.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = load_config(&cli.config).context("Failed to load configuration")?;
    // The guard flushes the log file on drop, so it must live until main returns.
    let _guard = init_tracing(&config.logging).context("Failed to initialise logging")?;
    engine::install_panic_hook();

    // Execute the appropriate command
    let all_clean = match cli.command {
        Commands::Run(args) => handle_run(args, config)?,
        Commands::Batch(args) => handle_batch(args, config).await?,
        Commands::Modules => handle_modules()?,
    };

    Ok(if all_clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Batch analytics reporting for financial-institution transaction extracts.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file; repeat to layer several, later files win.
    #[arg(long, global = true, default_value = "config/ledgerlens.toml")]
    config: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis catalogue for a single client extract.
    Run(RunArgs),
    /// Run every extract in a folder, one client per file.
    Batch(BatchArgs),
    /// List the available analyses in execution order.
    Modules,
}

#[derive(Parser)]
struct RunArgs {
    /// Path to the transaction extract (.csv, .txt or .tsv).
    #[arg(long)]
    input: PathBuf,

    /// The client (institution) id, e.g. "1453".
    #[arg(long)]
    client_id: String,

    /// Display name; defaults to the configured name, then the id.
    #[arg(long)]
    client_name: Option<String>,

    /// Base output folder; defaults to `base_output_dir` from config.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Comma-separated analysis ids to run instead of the full catalogue.
    #[arg(long, value_delimiter = ',')]
    modules: Option<Vec<String>>,
}

#[derive(Parser)]
struct BatchArgs {
    /// Folder of extracts; defaults to the txn pipeline's `input_dir`.
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Clients processed at once; defaults to `batch.max_workers`.
    #[arg(long)]
    workers: Option<usize>,

    /// Base output folder; defaults to `base_output_dir` from config.
    #[arg(long)]
    output: Option<PathBuf>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_run(args: RunArgs, config: PlatformConfig) -> anyhow::Result<bool> {
    let pipeline = config.pipeline(TXN_FAMILY);
    let job = ClientJob {
        client_id: args.client_id,
        client_name: args.client_name,
        input: args.input,
        output_base: args.output.unwrap_or_else(|| config.base_output_dir.clone()),
        modules: args.modules.or(pipeline.modules),
    };

    let summary = process_client(&config, job, Some(Box::new(|msg: &str| println!("  {msg}"))));
    print_summary(std::slice::from_ref(&summary));
    Ok(summary.status == ClientStatus::Complete)
}

/// Processes every extract in the input folder, at most `workers` clients at a time.
/// Each client runs on a blocking worker; a failed client is reported, not fatal.
async fn handle_batch(args: BatchArgs, config: PlatformConfig) -> anyhow::Result<bool> {
    let pipeline = config.pipeline(TXN_FAMILY);
    if !pipeline.enabled {
        bail!("The '{TXN_FAMILY}' pipeline is disabled in config");
    }
    let Some(input_dir) = args.input_dir.or(pipeline.input_dir) else {
        bail!("No input folder: pass --input-dir or set pipelines.{TXN_FAMILY}.input_dir");
    };
    let workers = args.workers.unwrap_or(config.batch.max_workers).max(1);
    let output_base = args.output.unwrap_or_else(|| config.base_output_dir.clone());

    let files = scan_input_dir(&input_dir)
        .with_context(|| format!("Failed to read input folder {}", input_dir.display()))?;
    if files.is_empty() {
        println!("No extracts found in {}", input_dir.display());
        return Ok(true);
    }
    println!(
        "Processing {} extract(s) from {} with {} worker(s)",
        files.len(),
        input_dir.display(),
        workers
    );

    // Set up the progress bar
    let progress_bar = ProgressBar::new(files.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    let mut skipped = 0;

    let mut jobs = Vec::with_capacity(files.len());
    for input in files {
        match client_id_from_path(&input) {
            Some(client_id) => jobs.push(ClientJob {
                client_id,
                client_name: None,
                input,
                output_base: output_base.clone(),
                modules: pipeline.modules.clone(),
            }),
            None => {
                progress_bar.inc(1);
                tracing::warn!(path = %input.display(), "Cannot derive a client id from the file name, skipping.");
                skipped += 1;
            }
        }
    }
    let (jobs, shadowed) = dedupe_output_dirs(jobs);
    for path in &shadowed {
        progress_bar.inc(1);
        tracing::warn!(path = %path.display(), "Another extract already writes to this output folder, skipping.");
    }
    skipped += shadowed.len();

    let config = Arc::new(config);
    let semaphore = Arc::new(Semaphore::new(workers));

    let tasks: Vec<_> = jobs
        .into_iter()
        .map(|job| {
            let config = Arc::clone(&config);
            let semaphore = Arc::clone(&semaphore);
            let pb_clone = progress_bar.clone();

            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                let client_id = job.client_id.clone();
                let pb_msg = pb_clone.clone();
                let progress = move |msg: &str| pb_msg.set_message(format!("{client_id} {msg}"));

                let summary = tokio::task::spawn_blocking(move || {
                    process_client(&config, job, Some(Box::new(progress)))
                })
                .await?;

                pb_clone.inc(1);
                Ok::<ClientSummary, anyhow::Error>(summary)
            })
        })
        .collect();

    // Wait for all concurrent clients to complete
    let results = join_all(tasks).await;
    progress_bar.finish_with_message("Batch complete!");

    let mut summaries = Vec::with_capacity(results.len());
    let mut all_clean = skipped == 0;
    for result in results {
        match result {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(e)) => {
                all_clean = false;
                eprintln!("A client task failed: {e}");
            }
            Err(e) => {
                all_clean = false;
                eprintln!("A client task panicked: {e}");
            }
        }
    }
    summaries.sort_by(|a, b| (&a.client_id, &a.output).cmp(&(&b.client_id, &b.output)));
    print_summary(&summaries);

    Ok(all_clean && summaries.iter().all(|s| s.status == ClientStatus::Complete))
}

fn handle_modules() -> anyhow::Result<bool> {
    let registry = catalogue()?;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Analysis", "Description"]);
    for (i, entry) in registry.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            entry.id().to_string(),
            entry.unit().description().to_string(),
        ]);
    }
    println!("{table}");
    Ok(true)
}

fn print_summary(summaries: &[ClientSummary]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Client", "Name", "Status", "Succeeded", "Failed", "Output", "Notes",
    ]);
    for s in summaries {
        table.add_row(vec![
            s.client_id.clone(),
            s.client_name.clone(),
            s.status.label().to_string(),
            s.succeeded.to_string(),
            s.failed.to_string(),
            s.output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            s.message.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
}
