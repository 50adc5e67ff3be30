//! # LedgerLens Core Types
//!
//! The value types every other crate in the workspace speaks: the tabular dataset
//! analyses read and produce, the immutable per-analysis result, and the slide entry
//! that feeds deck assembly.
//!
//! As a Layer 0 crate, it has no knowledge of the pipeline that moves these values
//! around.

pub mod error;
pub mod result;
pub mod slide;
pub mod table;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use result::AnalysisResult;
pub use slide::{DEFAULT_CATEGORY, SlideEntry, SlideIdPolicy};
pub use table::{Cell, Table};
