//! # LedgerLens Pipeline Engine
//!
//! The orchestration core shared by every pipeline family. It owns the per-run
//! context, the ordered registry of analysis units, and the runner that executes
//! them with per-unit failure isolation.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** Depends only on `core-types` (Layer 0). It knows nothing about
//!   extract formats, specific analyses, or where outputs are written.
//! - **Isolation over abort:** One failing unit is recorded and the run moves on.
//!   A run always completes with a `RunReport` listing results and failures.
//!
//! ## Public API
//!
//! - `PipelineContext`: The mutable state threaded through one client's run.
//! - `Registry` / `AnalysisUnit`: The declared, ordered catalogue of analyses.
//! - `run`: Executes a registry against a context and returns a `RunReport`.
//! - `report` / `add_slide`: The deck accumulator used by analysis units.
//! - `PipelineError` / `guidance`: The error taxonomy and its operator-facing text.

pub mod context;
pub mod deck;
pub mod error;
pub mod guidance;
pub mod registry;
pub mod runner;

pub use context::{PipelineContext, ProgressCallback};
pub use deck::{add_slide, add_slide_with_category, exclude_slide, report};
pub use error::{Detail, ErrorKind, PipelineError};
pub use guidance::{Guidance, guidance};
pub use registry::{AnalysisUnit, Registry, RegistryBuilder, RegistryEntry, UnitOutput};
pub use runner::{
    AnalysisFailure, RunReport, UnitOutcome, UnitStatus, install_panic_hook, panic_message, run,
};
