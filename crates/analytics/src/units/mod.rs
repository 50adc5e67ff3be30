//! The analysis units of the transaction pipeline.
//!
//! Each unit reads the loaded extract (and, for later units, earlier results) from
//! the context, returns one `AnalysisResult`, and adds one slide to the deck.

pub mod interchange;
pub mod mcc;
pub mod merchants;
pub mod scorecard;
pub mod segments;

pub use interchange::InterchangeSummary;
pub use mcc::MccRanking;
pub use merchants::MerchantRanking;
pub use scorecard::PortfolioScorecard;
pub use segments::{Segment, SegmentSplit};

use core_types::{AnalysisResult, Table};
use engine::{PipelineContext, PipelineError, add_slide_with_category};
use extract::columns::{AMOUNT, MERCHANT_NAME, PRIMARY_ACCOUNT_NUM};
use serde_json::{Map, Value};

/// Columns every unit needs.
pub(crate) const BASE_COLUMNS: &[&str] = &[MERCHANT_NAME, AMOUNT, PRIMARY_ACCOUNT_NUM];

/// The loaded extract, or a `Data` error when none was loaded.
pub(crate) fn transactions(ctx: &PipelineContext) -> Result<&Table, PipelineError> {
    ctx.data
        .as_ref()
        .ok_or_else(|| PipelineError::data("No transaction data loaded"))
}

/// Adds the standard slide for `result`, carrying `extra` alongside the common fields.
pub(crate) fn publish_slide(
    ctx: &mut PipelineContext,
    category: &str,
    result: &AnalysisResult,
    extra: Map<String, Value>,
) -> Result<(), PipelineError> {
    let mut data = Map::new();
    data.insert("title".to_string(), Value::from(result.title()));
    data.insert("sheet_name".to_string(), Value::from(result.sheet_name()));
    data.insert(
        "rows".to_string(),
        Value::from(result.main_table().map(Table::len).unwrap_or(0)),
    );
    if !result.summary().is_empty() {
        data.insert("summary".to_string(), Value::from(result.summary()));
    }
    data.extend(extra);
    add_slide_with_category(ctx, result.name(), category, data)
}
