use chrono::{Local, NaiveDate};
use core_types::{AnalysisResult, SlideEntry, SlideIdPolicy, Table};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Sink for human-readable progress messages.
pub type ProgressCallback = Box<dyn Fn(&str) + Send + Sync>;

/// The mutable state threaded through one client's pipeline run.
///
/// A context is owned by a single run and passed by `&mut` to every analysis unit
/// in turn. Units read earlier results by name and add their own; the result map
/// only ever grows, and slide entries are only ever appended (see `deck`).
///
/// Every field has a default, so a context can be built up piecemeal:
///
/// ```
/// use engine::PipelineContext;
///
/// let mut ctx = PipelineContext::default();
/// ctx.client_id = "1453".to_string();
/// assert!(ctx.results().is_empty());
/// ```
pub struct PipelineContext {
    // --- Client identity ---
    pub client_name: String,
    pub client_id: String,
    pub analysis_date: NaiveDate,
    /// Unique per run; distinguishes two runs for the same client and date.
    pub run_id: Uuid,

    // --- Input ---
    /// Input files by role, e.g. `"tran"` for the transaction extract.
    pub input_files: BTreeMap<String, PathBuf>,
    /// The loaded extract, if the caller loaded one before the run.
    pub data: Option<Table>,
    /// Per-client parameters read by analysis units (e.g. `ic_rate`, `top_n`).
    pub client_config: BTreeMap<String, Value>,

    // --- Output ---
    pub output_dir: PathBuf,
    /// Artifacts written by output stages, in write order.
    pub export_log: Vec<PathBuf>,
    pub slide_policy: SlideIdPolicy,

    // --- Accumulated state ---
    results: BTreeMap<String, AnalysisResult>,
    pub(crate) all_slides: Vec<SlideEntry>,
    slide_pass: u32,

    // --- Progress ---
    progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            client_name: String::new(),
            client_id: String::new(),
            analysis_date: Local::now().date_naive(),
            run_id: Uuid::new_v4(),
            input_files: BTreeMap::new(),
            data: None,
            client_config: BTreeMap::new(),
            output_dir: PathBuf::from("output"),
            export_log: Vec::new(),
            slide_policy: SlideIdPolicy::default(),
            results: BTreeMap::new(),
            all_slides: Vec::new(),
            slide_pass: 0,
            progress_callback: None,
        }
    }
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client_id: impl Into<String>, client_name: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self.client_name = client_name.into();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_data(mut self, data: Table) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    pub fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.progress_callback = callback;
    }

    pub fn progress_callback(&self) -> Option<&ProgressCallback> {
        self.progress_callback.as_ref()
    }

    /// Charts and other per-run artifacts go here.
    pub fn chart_dir(&self) -> PathBuf {
        self.output_dir.join("charts")
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    // --- Results ---

    pub fn results(&self) -> &BTreeMap<String, AnalysisResult> {
        &self.results
    }

    pub fn result(&self, name: &str) -> Option<&AnalysisResult> {
        self.results.get(name)
    }

    pub fn has_result(&self, name: &str) -> bool {
        self.results.contains_key(name)
    }

    /// Stores `result` under its own name, replacing any earlier result with that name.
    /// Returns the replaced result.
    pub fn insert_result(&mut self, result: AnalysisResult) -> Option<AnalysisResult> {
        self.results.insert(result.name().to_string(), result)
    }

    /// A metadata value published by an earlier analysis.
    pub fn metric(&self, result_name: &str, key: &str) -> Option<&Value> {
        self.results.get(result_name).and_then(|r| r.metric(key))
    }

    // --- Slides ---

    pub fn slides(&self) -> &[SlideEntry] {
        &self.all_slides
    }

    pub fn included_slides(&self) -> impl Iterator<Item = &SlideEntry> {
        self.all_slides.iter().filter(|s| s.include)
    }

    pub fn slides_in_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a SlideEntry> + 'a {
        self.all_slides.iter().filter(move |s| s.category == category)
    }

    // --- Client parameters ---

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.client_config.get(key)
    }

    pub fn set_config_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.client_config.insert(key.into(), value.into());
    }

    /// The current run pass: 0 before the first `run`, then 1, 2, ...
    pub fn slide_pass(&self) -> u32 {
        self.slide_pass
    }

    pub(crate) fn begin_pass(&mut self) -> u32 {
        self.slide_pass += 1;
        self.slide_pass
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("client_name", &self.client_name)
            .field("client_id", &self.client_id)
            .field("analysis_date", &self.analysis_date)
            .field("run_id", &self.run_id)
            .field("output_dir", &self.output_dir)
            .field("data_rows", &self.data.as_ref().map(Table::len))
            .field("results", &self.results.keys().collect::<Vec<_>>())
            .field("slides", &self.all_slides.len())
            .field("slide_pass", &self.slide_pass)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}
