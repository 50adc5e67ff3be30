use super::{publish_slide, transactions};
use crate::params::AnalysisParams;
use crate::summary::{RankBy, grouped_summary};
use core_types::AnalysisResult;
use engine::{AnalysisUnit, PipelineContext, UnitOutput};
use extract::columns::{AMOUNT, MCC_CODE, MERCHANT_NAME, PRIMARY_ACCOUNT_NUM};
use serde_json::{Map, Value};

const MCC_COLUMNS: &[&str] = &[MERCHANT_NAME, AMOUNT, PRIMARY_ACCOUNT_NUM, MCC_CODE];

/// Spend ranked by merchant category code. Transactions without a code are not ranked
/// but still count toward the percentage denominators.
#[derive(Debug, Default)]
pub struct MccRanking;

impl AnalysisUnit for MccRanking {
    fn run(&self, ctx: &mut PipelineContext) -> UnitOutput {
        let params = AnalysisParams::from_context(ctx)?;
        let data = transactions(ctx)?;
        let uncoded = data.column(MCC_CODE)?.filter(|c| c.is_empty()).count();
        let table = grouped_summary(data, MCC_CODE, RankBy::Spend, params.top_n, params.ic_rate)?;

        let result = AnalysisResult::from_table("mcc_by_spend", "Top MCC Codes by Spend", table)
            .with_sheet_name("M2 MCC Spend")
            .with_metadata("uncoded_transactions", uncoded);

        let mut extra = Map::new();
        extra.insert("uncoded_transactions".to_string(), Value::from(uncoded));
        publish_slide(ctx, "MCC", &result, extra)?;
        Ok(Some(result))
    }

    fn required_columns(&self) -> &[&str] {
        MCC_COLUMNS
    }

    fn description(&self) -> &str {
        "Top merchant category codes by spend"
    }
}
