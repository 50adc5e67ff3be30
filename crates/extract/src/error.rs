use engine::PipelineError;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Extract file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported extract format '{extension}' for {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed extract: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required columns: {missing:?}")]
    MissingColumns {
        missing: BTreeSet<String>,
        available: BTreeSet<String>,
    },

    #[error("Headers '{first}' and '{second}' both map to column '{column}'")]
    DuplicateColumn {
        column: String,
        first: String,
        second: String,
    },

    #[error("Invalid amount '{value}' on line {line}")]
    InvalidAmount { line: u64, value: String },

    #[error(transparent)]
    Table(#[from] core_types::CoreError),
}

impl From<ExtractError> for PipelineError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::NotFound(path) => {
                PipelineError::retrieve(format!("Extract file not found: {}", path.display()))
                    .with_detail("path", path.display().to_string())
            }
            ExtractError::MissingColumns { missing, available } => {
                PipelineError::column_mismatch(missing, available)
            }
            ExtractError::DuplicateColumn { ref column, .. } => {
                PipelineError::data(err.to_string()).with_detail("column", column.clone())
            }
            // Keep the io::Error itself so a locked file still reads as one.
            ExtractError::Io { source, .. } => PipelineError::from(source),
            other @ (ExtractError::UnsupportedFormat { .. }
            | ExtractError::Csv(_)
            | ExtractError::InvalidAmount { .. }
            | ExtractError::Table(_)) => PipelineError::data(other.to_string()),
        }
    }
}
