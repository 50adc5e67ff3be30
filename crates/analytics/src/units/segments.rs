use super::{BASE_COLUMNS, publish_slide, transactions};
use crate::helpers::{decimal_value, safe_percentage};
use crate::summary::{PCT_OF_TOTAL_AMOUNT, TOTAL_AMOUNT, TRANSACTION_COUNT, UNIQUE_ACCOUNTS};
use core_types::{AnalysisResult, Cell, Table};
use engine::{AnalysisUnit, PipelineContext, UnitOutput};
use extract::columns::{AMOUNT, BUSINESS_FLAG, MERCHANT_NAME, PRIMARY_ACCOUNT_NUM};
use rust_decimal::Decimal;
use serde_json::Map;
use std::collections::BTreeSet;

/// Which accounts a ranking covers, by the extract's business flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    All,
    Business,
    Personal,
}

impl Segment {
    pub fn label(self) -> &'static str {
        match self {
            Segment::All => "All",
            Segment::Business => "Business",
            Segment::Personal => "Personal",
        }
    }

    /// The rows of `data` belonging to this segment. Rows without a flag count as personal.
    pub fn filter(self, data: &Table) -> Table {
        let Some(idx) = data.column_index(BUSINESS_FLAG) else {
            return match self {
                Segment::Business => data.filter_rows(|_| false),
                Segment::All | Segment::Personal => data.clone(),
            };
        };
        match self {
            Segment::All => data.clone(),
            Segment::Business => data.filter_rows(|row| row[idx].as_str() == Some("Yes")),
            Segment::Personal => data.filter_rows(|row| row[idx].as_str() != Some("Yes")),
        }
    }
}

/// Spend, volume and account totals for one slice of the extract.
struct SegmentTotals {
    spend: Decimal,
    transactions: usize,
    accounts: usize,
}

fn totals(data: &Table) -> Result<SegmentTotals, core_types::CoreError> {
    let spend = data.column(AMOUNT)?.filter_map(|c| c.as_decimal()).sum();
    let accounts: BTreeSet<String> = data
        .column(PRIMARY_ACCOUNT_NUM)?
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect();
    Ok(SegmentTotals {
        spend,
        transactions: data.len(),
        accounts: accounts.len(),
    })
}

/// Business versus personal share of spend, transactions and accounts.
///
/// Publishes `business_spend_pct`, `personal_spend_pct`, `business_accounts` and
/// `personal_accounts` as metadata for the scorecard.
#[derive(Debug, Default)]
pub struct SegmentSplit;

const SEGMENT_COLUMNS: &[&str] = &[MERCHANT_NAME, AMOUNT, PRIMARY_ACCOUNT_NUM, BUSINESS_FLAG];

impl AnalysisUnit for SegmentSplit {
    fn run(&self, ctx: &mut PipelineContext) -> UnitOutput {
        let data = transactions(ctx)?;
        let overall = totals(data)?;
        let business = totals(&Segment::Business.filter(data))?;
        let personal = totals(&Segment::Personal.filter(data))?;

        let mut table = Table::new([
            "segment",
            TOTAL_AMOUNT,
            TRANSACTION_COUNT,
            UNIQUE_ACCOUNTS,
            PCT_OF_TOTAL_AMOUNT,
        ]);
        for (segment, t) in [(Segment::Business, &business), (Segment::Personal, &personal)] {
            table.push_row(vec![
                Cell::text(segment.label()),
                Cell::Decimal(t.spend.round_dp(2)),
                Cell::from(t.transactions),
                Cell::from(t.accounts),
                Cell::Decimal(safe_percentage(t.spend, overall.spend)),
            ])?;
        }

        let business_pct = safe_percentage(business.spend, overall.spend);
        let personal_pct = safe_percentage(personal.spend, overall.spend);
        let result = AnalysisResult::from_table("segment_split", "Business vs Personal Split", table)
            .with_sheet_name("M5 Segments")
            .with_summary(format!(
                "Business accounts drive {business_pct}% of spend; personal accounts {personal_pct}%."
            ))
            .with_metadata("business_spend_pct", decimal_value(business_pct))
            .with_metadata("personal_spend_pct", decimal_value(personal_pct))
            .with_metadata("business_accounts", business.accounts)
            .with_metadata("personal_accounts", personal.accounts);

        let mut extra = Map::new();
        extra.insert("business_spend_pct".to_string(), decimal_value(business_pct));
        publish_slide(ctx, "Segments", &result, extra)?;
        Ok(Some(result))
    }

    fn required_columns(&self) -> &[&str] {
        SEGMENT_COLUMNS
    }

    fn description(&self) -> &str {
        "Business vs personal share of spend and accounts"
    }
}

/// Columns a ranking over `segment` needs.
pub(crate) fn columns_for(segment: Segment) -> &'static [&'static str] {
    match segment {
        Segment::All => BASE_COLUMNS,
        Segment::Business | Segment::Personal => SEGMENT_COLUMNS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn data() -> Table {
        let mut table = Table::new([MERCHANT_NAME, AMOUNT, PRIMARY_ACCOUNT_NUM, BUSINESS_FLAG]);
        for (m, a, acct, flag) in [
            ("Supply Co", dec!(75.00), "B1", "Yes"),
            ("Grocer", dec!(20.00), "P1", "No"),
            ("Cafe", dec!(5.00), "P2", "No"),
        ] {
            table
                .push_row(vec![Cell::text(m), Cell::Decimal(a), Cell::text(acct), Cell::text(flag)])
                .unwrap();
        }
        table
    }

    #[test]
    fn test_filter_by_flag() {
        assert_eq!(Segment::Business.filter(&data()).len(), 1);
        assert_eq!(Segment::Personal.filter(&data()).len(), 2);
        assert_eq!(Segment::All.filter(&data()).len(), 3);
    }

    #[test]
    fn test_split_metadata_and_slide() {
        let mut ctx = PipelineContext::new().with_data(data());
        let result = SegmentSplit.run(&mut ctx).unwrap().unwrap();

        assert_eq!(result.metric("business_spend_pct"), Some(&json!("75")));
        assert_eq!(result.metric("personal_accounts"), Some(&json!(2)));
        assert_eq!(result.main_table().unwrap().len(), 2);

        let slide = &ctx.slides()[0];
        assert_eq!(slide.id, "segment_split");
        assert_eq!(slide.category, "Segments");
    }
}
