use crate::export::{client_output_dir, write_run_summary};
use analytics::catalogue;
use configuration::PlatformConfig;
use engine::{PipelineContext, PipelineError, ProgressCallback, guidance};
use extract::read_extract;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Extensions picked up when scanning an input folder.
pub const EXTRACT_EXTENSIONS: &[&str] = &["csv", "txt", "tsv"];

/// One client's work: which extract to load and where its output goes.
#[derive(Debug, Clone)]
pub struct ClientJob {
    pub client_id: String,
    /// Overrides the configured client name.
    pub client_name: Option<String>,
    pub input: PathBuf,
    pub output_base: PathBuf,
    /// Restricts the run to these analysis ids, in catalogue order.
    pub modules: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Complete,
    /// Some analyses failed; the rest of the run was kept.
    Partial,
    /// Nothing ran: the extract or the configuration was unusable.
    Failed,
}

impl ClientStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ClientStatus::Complete => "Complete",
            ClientStatus::Partial => "Partial",
            ClientStatus::Failed => "Failed",
        }
    }
}

/// What the CLI reports for one client.
#[derive(Debug, Clone)]
pub struct ClientSummary {
    pub client_id: String,
    pub client_name: String,
    pub status: ClientStatus,
    pub succeeded: usize,
    pub failed: usize,
    pub output: Option<PathBuf>,
    /// Guidance for the first problem, if any.
    pub message: Option<String>,
}

/// The client id encoded in an extract's file name: the stem up to the first `_`.
///
/// `1453_Harbor_2025-02.csv` belongs to client `1453`.
pub fn client_id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let id = stem.split('_').next()?.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// The output folder name for an extract: its file stem.
pub fn extract_label(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("extract")
        .to_string()
}

/// Keeps the first job for each output folder. Returns the kept jobs and the inputs
/// of the dropped ones, e.g. `1453_jan.txt` next to `1453_jan.csv`.
pub fn dedupe_output_dirs(jobs: Vec<ClientJob>) -> (Vec<ClientJob>, Vec<PathBuf>) {
    let mut seen = BTreeSet::new();
    let mut kept = Vec::with_capacity(jobs.len());
    let mut dropped = Vec::new();
    for job in jobs {
        let key = (job.output_base.clone(), job.client_id.clone(), extract_label(&job.input));
        if seen.insert(key) {
            kept.push(job);
        } else {
            dropped.push(job.input);
        }
    }
    (kept, dropped)
}

/// Lists the extracts in `dir`, sorted by path.
pub fn scan_input_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTRACT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Runs one client end to end. Never fails: problems are folded into the summary so
/// one bad client cannot stop a batch.
pub fn process_client(
    config: &PlatformConfig,
    job: ClientJob,
    progress: Option<ProgressCallback>,
) -> ClientSummary {
    match run_client(config, &job, progress) {
        Ok(summary) => summary,
        Err(err) => {
            let advice = guidance(&err);
            tracing::error!(client = %job.client_id, error = %err, "Client run failed.");
            ClientSummary {
                client_id: job.client_id.clone(),
                client_name: job
                    .client_name
                    .clone()
                    .unwrap_or_else(|| config.client_settings(&job.client_id).client_name),
                status: ClientStatus::Failed,
                succeeded: 0,
                failed: 0,
                output: None,
                message: Some(format!("{}: {err}. {}", advice.title, advice.message)),
            }
        }
    }
}

fn run_client(
    config: &PlatformConfig,
    job: &ClientJob,
    progress: Option<ProgressCallback>,
) -> Result<ClientSummary, PipelineError> {
    let settings = config.client_settings(&job.client_id);
    let client_name = job.client_name.clone().unwrap_or(settings.client_name);

    let mut ctx = PipelineContext::new().with_client(&job.client_id, client_name);
    ctx.output_dir = client_output_dir(
        &job.output_base,
        &job.client_id,
        ctx.analysis_date,
        &extract_label(&job.input),
    );
    ctx.slide_policy = config.slide_id_policy;
    ctx.set_config_value("top_n", settings.top_n);
    ctx.set_config_value("ic_rate", settings.ic_rate.to_string());
    ctx.input_files.insert("tran".to_string(), job.input.clone());
    ctx.set_progress_callback(progress);

    let registry = match &job.modules {
        Some(ids) => catalogue()?.select(ids)?,
        None => catalogue()?,
    };

    ctx.data = Some(read_extract(&job.input)?);
    let report = engine::run(&mut ctx, &registry);
    let output = write_run_summary(&mut ctx, &report)?;

    let message = report.failures.first().map(|failure| {
        let advice = guidance(&failure.error);
        format!("{}: {} ({})", failure.name, advice.title, advice.message)
    });
    Ok(ClientSummary {
        client_id: ctx.client_id.clone(),
        client_name: ctx.client_name.clone(),
        status: if report.is_clean() {
            ClientStatus::Complete
        } else {
            ClientStatus::Partial
        },
        succeeded: report.succeeded(),
        failed: report.failures.len(),
        output: Some(output),
        message,
    })
}
