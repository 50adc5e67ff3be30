use engine::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Required upstream analysis '{0}' has not produced a result")]
    MissingDependency(String),

    #[error("Invalid client parameter '{key}': {value}")]
    InvalidParameter { key: String, value: String },

    #[error(transparent)]
    Table(#[from] core_types::CoreError),
}

impl From<AnalyticsError> for PipelineError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvalidParameter { ref key, .. } => {
                let key = key.clone();
                PipelineError::config(err.to_string()).with_detail("parameter", key)
            }
            AnalyticsError::MissingDependency(ref name) => {
                let name = name.clone();
                PipelineError::data(err.to_string()).with_detail("requires", name)
            }
            AnalyticsError::Table(_) => PipelineError::data(err.to_string()),
        }
    }
}
