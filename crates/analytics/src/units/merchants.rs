use super::segments::{Segment, columns_for};
use super::{publish_slide, transactions};
use crate::params::AnalysisParams;
use crate::summary::{RankBy, grouped_summary};
use core_types::AnalysisResult;
use engine::{AnalysisUnit, PipelineContext, UnitOutput};
use extract::columns::MERCHANT_NAME;
use serde_json::{Map, Value};

/// A ranked merchant table for one segment of accounts.
#[derive(Debug, Clone)]
pub struct MerchantRanking {
    name: &'static str,
    title: &'static str,
    sheet_name: &'static str,
    rank_by: RankBy,
    segment: Segment,
}

impl MerchantRanking {
    pub const fn new(
        name: &'static str,
        title: &'static str,
        sheet_name: &'static str,
        rank_by: RankBy,
        segment: Segment,
    ) -> Self {
        Self {
            name,
            title,
            sheet_name,
            rank_by,
            segment,
        }
    }

    pub const fn top_by_spend() -> Self {
        Self::new(
            "top_merchants_by_spend",
            "Top Merchants by Spend",
            "M1 Top Spend",
            RankBy::Spend,
            Segment::All,
        )
    }

    pub const fn top_by_transactions() -> Self {
        Self::new(
            "top_merchants_by_transactions",
            "Top Merchants by Transactions",
            "M1 Top Transactions",
            RankBy::Transactions,
            Segment::All,
        )
    }

    pub const fn top_by_accounts() -> Self {
        Self::new(
            "top_merchants_by_accounts",
            "Top Merchants by Unique Accounts",
            "M1 Top Accounts",
            RankBy::Accounts,
            Segment::All,
        )
    }

    pub const fn business_by_spend() -> Self {
        Self::new(
            "business_top_by_spend",
            "Business - Top Merchants by Spend",
            "M3 Biz Spend",
            RankBy::Spend,
            Segment::Business,
        )
    }

    pub const fn personal_by_spend() -> Self {
        Self::new(
            "personal_top_by_spend",
            "Personal - Top Merchants by Spend",
            "M4 Personal Spend",
            RankBy::Spend,
            Segment::Personal,
        )
    }

    fn category(&self) -> &'static str {
        match self.segment {
            Segment::All => "Merchants",
            Segment::Business => "Business",
            Segment::Personal => "Personal",
        }
    }
}

impl AnalysisUnit for MerchantRanking {
    fn run(&self, ctx: &mut PipelineContext) -> UnitOutput {
        let params = AnalysisParams::from_context(ctx)?;
        let data = self.segment.filter(transactions(ctx)?);
        let table = grouped_summary(&data, MERCHANT_NAME, self.rank_by, params.top_n, params.ic_rate)?;
        tracing::debug!(analysis = self.name, input_rows = data.len(), ranked = table.len(), "Ranked merchants.");

        let leader = table
            .rows()
            .first()
            .filter(|_| table.len() > 1)
            .map(|row| row[0].to_string());
        let summary = match &leader {
            Some(name) => format!("{name} leads {} merchants ranked.", table.len() - 1),
            None => "No transactions in this segment.".to_string(),
        };

        let result = AnalysisResult::from_table(self.name, self.title, table)
            .with_sheet_name(self.sheet_name)
            .with_summary(summary)
            .with_metadata("segment", self.segment.label())
            .with_metadata("top_n", params.top_n);

        let mut extra = Map::new();
        extra.insert("leader".to_string(), leader.map(Value::from).unwrap_or(Value::Null));
        publish_slide(ctx, self.category(), &result, extra)?;
        Ok(Some(result))
    }

    fn required_columns(&self) -> &[&str] {
        columns_for(self.segment)
    }

    fn description(&self) -> &str {
        self.title
    }
}
