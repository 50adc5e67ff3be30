use crate::error::PipelineError;
use serde::Serialize;

/// A short, operator-facing explanation of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guidance {
    pub title: &'static str,
    pub message: &'static str,
}

impl Guidance {
    const fn new(title: &'static str, message: &'static str) -> Self {
        Self { title, message }
    }
}

const FILE_NOT_FOUND: Guidance = Guidance::new(
    "File Not Found",
    "Check the file path and ensure the source drive is connected",
);
const FILE_LOCKED: Guidance = Guidance::new("File Locked", "Close the file in Excel and try again");
const RETRIEVE: Guidance = Guidance::new(
    "Retrieve Error",
    "Check the source drive connection and the input folder paths in config",
);
const DATA: Guidance = Guidance::new(
    "Data Problem",
    "The extract format may have changed -- check column names",
);
const CONFIG: Guidance = Guidance::new(
    "Setup Issue",
    "Check the platform config file and the requested module ids",
);
const OUTPUT: Guidance = Guidance::new(
    "Output Error",
    "Check that the output folder is writable and slide ids are unique",
);
const UNEXPECTED: Guidance = Guidance::new(
    "Unexpected Error",
    "An unexpected error occurred. Check the log file for details.",
);

/// Maps an error to the guidance shown to the person running the batch.
///
/// `Analysis` wrappers are looked through, so a wrapped data problem still reads as
/// a data problem. Missing columns count as a data problem.
pub fn guidance(err: &PipelineError) -> Guidance {
    match err.root_cause() {
        PipelineError::Config { .. } => CONFIG,
        PipelineError::Data { .. } | PipelineError::ColumnMismatch { .. } => DATA,
        PipelineError::Output { .. } => OUTPUT,
        PipelineError::Retrieve { .. } => RETRIEVE,
        PipelineError::Unexpected(source) => match source.downcast_ref::<std::io::Error>() {
            Some(io) if io.kind() == std::io::ErrorKind::NotFound => FILE_NOT_FOUND,
            Some(io) if io.kind() == std::io::ErrorKind::PermissionDenied => FILE_LOCKED,
            _ => UNEXPECTED,
        },
        PipelineError::Panic(_) | PipelineError::Analysis { .. } => UNEXPECTED,
    }
}
