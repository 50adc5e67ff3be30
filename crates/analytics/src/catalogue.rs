use crate::units::{InterchangeSummary, MccRanking, MerchantRanking, PortfolioScorecard, SegmentSplit};
use engine::{PipelineError, Registry};

/// Name of the transaction pipeline family.
pub const TXN_FAMILY: &str = "txn";

/// The transaction analysis catalogue, in execution order.
///
/// Order encodes dependencies: `interchange_summary` and `segment_split` publish
/// metadata that `portfolio_scorecard` reads, and it reads the
/// `top_merchants_by_spend` table, so the scorecard stays last.
pub fn catalogue() -> Result<Registry, PipelineError> {
    Registry::builder(TXN_FAMILY)
        // Overall rankings
        .add("top_merchants_by_spend", MerchantRanking::top_by_spend())
        .add("top_merchants_by_transactions", MerchantRanking::top_by_transactions())
        .add("top_merchants_by_accounts", MerchantRanking::top_by_accounts())
        // Category codes
        .add("mcc_by_spend", MccRanking)
        // Segment rankings
        .add("business_top_by_spend", MerchantRanking::business_by_spend())
        .add("personal_top_by_spend", MerchantRanking::personal_by_spend())
        .add("segment_split", SegmentSplit)
        .add("interchange_summary", InterchangeSummary)
        // Must run last
        .add("portfolio_scorecard", PortfolioScorecard)
        .build()
}
