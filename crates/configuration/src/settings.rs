use core_types::SlideIdPolicy;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The root configuration structure for the entire platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Every client's output lands under `<base_output_dir>/<client_id>/<YYYY.MM>/`.
    pub base_output_dir: PathBuf,
    pub slide_id_policy: SlideIdPolicy,
    pub logging: LoggingConfig,
    pub batch: BatchConfig,
    pub analysis: AnalysisDefaults,
    /// Per pipeline family (e.g. "txn").
    pub pipelines: BTreeMap<String, PipelineConfig>,
    /// Per-client overrides, keyed by client id.
    pub clients: BTreeMap<String, ClientConfig>,
}

/// Where and how verbosely the process logs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    /// File name prefix for the daily-rolling log file.
    pub file_prefix: String,
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
}

/// Contains parameters for processing many clients in one invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on clients processed at the same time. 1 means sequential.
    pub max_workers: usize,
}

/// Default analysis parameters, applied when a client has no override.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// How many rows the ranked tables keep.
    pub top_n: usize,
    /// Interchange rate as a fraction of spend. 0.0015 corresponds to 0.15%.
    pub ic_rate: Decimal,
}

/// Settings for one pipeline family.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub enabled: bool,
    pub input_dir: Option<PathBuf>,
    /// Restricts the run to these analysis ids. `None` runs the whole catalogue.
    pub modules: Option<Vec<String>>,
}

/// Overrides for a single client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub client_name: Option<String>,
    pub ic_rate: Option<Decimal>,
    pub top_n: Option<usize>,
}

/// The effective settings for one client after overrides are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub client_id: String,
    pub client_name: String,
    pub ic_rate: Decimal,
    pub top_n: usize,
}

// --- Default Implementations ---
// These allow a user to omit any section from their toml and still have it work
// with sensible defaults.

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_output_dir: PathBuf::from("output"),
            slide_id_policy: SlideIdPolicy::default(),
            logging: LoggingConfig::default(),
            batch: BatchConfig::default(),
            analysis: AnalysisDefaults::default(),
            pipelines: BTreeMap::new(),
            clients: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_prefix: "ledgerlens.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_workers: 1 }
    }
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            top_n: 50,
            ic_rate: Decimal::ZERO,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            input_dir: None,
            modules: None,
        }
    }
}

impl PlatformConfig {
    /// Resolves the effective settings for a client. The client name falls back to the id.
    pub fn client_settings(&self, client_id: &str) -> ClientSettings {
        let overrides = self.clients.get(client_id).cloned().unwrap_or_default();
        ClientSettings {
            client_id: client_id.to_string(),
            client_name: overrides
                .client_name
                .unwrap_or_else(|| client_id.to_string()),
            ic_rate: overrides.ic_rate.unwrap_or(self.analysis.ic_rate),
            top_n: overrides.top_n.unwrap_or(self.analysis.top_n),
        }
    }

    /// The configuration for a pipeline family, or the defaults if it is not listed.
    pub fn pipeline(&self, family: &str) -> PipelineConfig {
        self.pipelines.get(family).cloned().unwrap_or_default()
    }
}
