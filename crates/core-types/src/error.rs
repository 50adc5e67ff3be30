use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Row has {actual} cells but the table has {expected} columns")]
    RowArity { expected: usize, actual: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}
