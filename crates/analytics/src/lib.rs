//! # LedgerLens Transaction Analytics
//!
//! The analysis units of the transaction pipeline and the catalogue that orders them.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Logic:** Builds on `engine` (the unit trait, context and deck) and
//!   `extract` (canonical column names). It never touches the filesystem.
//! - **Context in, result out:** A unit reads the extract and earlier results from
//!   the `PipelineContext`, returns one `AnalysisResult`, and adds one slide.
//!
//! ## Public API
//!
//! - `catalogue`: The ordered `txn` registry.
//! - `units`: The individual analysis units.
//! - `grouped_summary`: The shared ranking template.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

pub mod catalogue;
pub mod error;
pub mod helpers;
pub mod params;
pub mod summary;
pub mod units;

pub use catalogue::{TXN_FAMILY, catalogue};
pub use error::AnalyticsError;
pub use params::AnalysisParams;
pub use summary::{RankBy, grouped_summary};
