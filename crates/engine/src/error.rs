use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Structured diagnostic payload carried by an error, e.g. `{"available": [...]}`.
pub type Detail = BTreeMap<String, Value>;

/// The category of a `PipelineError`, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Data,
    Output,
    Retrieve,
    ColumnMismatch,
    Analysis,
    Unexpected,
}

/// Every failure an analysis unit, the registry, or the runner can report.
///
/// Units return the anticipated kinds (`Config`, `Data`, `Output`, `Retrieve`,
/// `ColumnMismatch`). The runner wraps whatever a unit returns, and any panic it
/// catches, in `Analysis` so the failure names the unit without losing the cause.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {message}")]
    Config { message: String, detail: Detail },

    #[error("Data error: {message}")]
    Data { message: String, detail: Detail },

    #[error("Output error: {message}")]
    Output { message: String, detail: Detail },

    #[error("Retrieve error: {message}")]
    Retrieve { message: String, detail: Detail },

    #[error("Missing required columns: {missing:?}")]
    ColumnMismatch {
        missing: BTreeSet<String>,
        available: BTreeSet<String>,
    },

    #[error("Analysis '{name}' failed: {source}")]
    Analysis {
        name: String,
        source: Box<PipelineError>,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Analysis panicked: {0}")]
    Panic(String),
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Config {
            message: message.into(),
            detail: Detail::new(),
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        PipelineError::Data {
            message: message.into(),
            detail: Detail::new(),
        }
    }

    pub fn output(message: impl Into<String>) -> Self {
        PipelineError::Output {
            message: message.into(),
            detail: Detail::new(),
        }
    }

    pub fn retrieve(message: impl Into<String>) -> Self {
        PipelineError::Retrieve {
            message: message.into(),
            detail: Detail::new(),
        }
    }

    pub fn column_mismatch(missing: BTreeSet<String>, available: BTreeSet<String>) -> Self {
        PipelineError::ColumnMismatch { missing, available }
    }

    /// Wraps `cause` as the failure of the analysis `name`.
    pub fn analysis(name: impl Into<String>, cause: PipelineError) -> Self {
        PipelineError::Analysis {
            name: name.into(),
            source: Box::new(cause),
        }
    }

    pub fn unexpected<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PipelineError::Unexpected(Box::new(err))
    }

    /// Adds one entry to the structured detail. Kinds without a detail map
    /// (`ColumnMismatch`, `Analysis`, `Unexpected`, `Panic`) are returned unchanged.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(detail) = self.detail_mut() {
            detail.insert(key.into(), value.into());
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Config { .. } => ErrorKind::Config,
            PipelineError::Data { .. } => ErrorKind::Data,
            PipelineError::Output { .. } => ErrorKind::Output,
            PipelineError::Retrieve { .. } => ErrorKind::Retrieve,
            PipelineError::ColumnMismatch { .. } => ErrorKind::ColumnMismatch,
            PipelineError::Analysis { .. } => ErrorKind::Analysis,
            PipelineError::Unexpected(_) | PipelineError::Panic(_) => ErrorKind::Unexpected,
        }
    }

    pub fn detail(&self) -> Option<&Detail> {
        match self {
            PipelineError::Config { detail, .. }
            | PipelineError::Data { detail, .. }
            | PipelineError::Output { detail, .. }
            | PipelineError::Retrieve { detail, .. } => Some(detail),
            _ => None,
        }
    }

    fn detail_mut(&mut self) -> Option<&mut Detail> {
        match self {
            PipelineError::Config { detail, .. }
            | PipelineError::Data { detail, .. }
            | PipelineError::Output { detail, .. }
            | PipelineError::Retrieve { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// The name of the failed analysis, for `Analysis` errors.
    pub fn analysis_name(&self) -> Option<&str> {
        match self {
            PipelineError::Analysis { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The innermost error beneath any `Analysis` wrappers.
    pub fn root_cause(&self) -> &PipelineError {
        let mut current = self;
        while let PipelineError::Analysis { source, .. } = current {
            current = source;
        }
        current
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::unexpected(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::unexpected(err)
    }
}

impl From<core_types::CoreError> for PipelineError {
    fn from(err: core_types::CoreError) -> Self {
        PipelineError::data(err.to_string())
    }
}
