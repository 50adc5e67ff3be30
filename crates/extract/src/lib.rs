//! # LedgerLens Extract Reader
//!
//! Loads a client's transaction extract from disk into a `Table` whose headers have
//! been resolved to canonical column names. Everything downstream (the registry's
//! column checks, the analytics units) speaks only those canonical names.

pub mod columns;
pub mod error;
pub mod reader;

pub use columns::REQUIRED_COLUMNS;
pub use error::ExtractError;
pub use reader::read_extract;
