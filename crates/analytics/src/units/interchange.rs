use super::segments::{Segment, columns_for};
use super::{publish_slide, transactions};
use crate::helpers::{decimal_value, safe_percentage};
use crate::params::AnalysisParams;
use crate::summary::group_totals;
use core_types::{AnalysisResult, Cell, Table};
use engine::{AnalysisUnit, PipelineContext, UnitOutput};
use extract::columns::{AMOUNT, MERCHANT_NAME, PRIMARY_ACCOUNT_NUM};
use rust_decimal::Decimal;
use serde_json::Map;
use std::collections::BTreeSet;

/// How many merchants the interchange breakdown lists.
const TOP_MERCHANTS: usize = 10;

/// Estimated interchange revenue at the client's `ic_rate`: portfolio total, the
/// business/personal split, and the top merchants by estimated revenue.
///
/// Publishes `total_ic_revenue` and `ic_rate` as metadata for the scorecard. With no
/// rate configured the result is empty and `total_ic_revenue` is zero.
#[derive(Debug, Default)]
pub struct InterchangeSummary;

fn spend_and_accounts(data: &Table) -> Result<(Decimal, usize), core_types::CoreError> {
    let spend = data.column(AMOUNT)?.filter_map(|c| c.as_decimal()).sum();
    let accounts: BTreeSet<String> = data
        .column(PRIMARY_ACCOUNT_NUM)?
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect();
    Ok((spend, accounts.len()))
}

impl AnalysisUnit for InterchangeSummary {
    fn run(&self, ctx: &mut PipelineContext) -> UnitOutput {
        let params = AnalysisParams::from_context(ctx)?;
        let ic_rate = params.ic_rate;
        let data = transactions(ctx)?;

        let mut table = Table::new([
            "section",
            "item",
            "spend",
            "estimated_ic_revenue",
            "accounts",
            "pct_of_total",
        ]);

        if ic_rate <= Decimal::ZERO || data.is_empty() {
            let result = AnalysisResult::from_table("interchange_summary", "Interchange Revenue Summary", table)
                .with_sheet_name("M8 IC Summary")
                .with_summary("IC rate not configured")
                .with_metadata("total_ic_revenue", decimal_value(Decimal::ZERO))
                .with_metadata("ic_rate", ic_rate.normalize().to_string());
            publish_slide(ctx, "Interchange", &result, Map::new())?;
            return Ok(Some(result));
        }

        let (total_spend, total_accounts) = spend_and_accounts(data)?;
        let total_ic = total_spend * ic_rate;
        table.push_row(vec![
            Cell::text("Portfolio"),
            Cell::text("Total Estimated Interchange Revenue"),
            Cell::Decimal(total_spend.round_dp(2)),
            Cell::Decimal(total_ic.round_dp(2)),
            Cell::from(total_accounts),
            Cell::Decimal(Decimal::ONE_HUNDRED),
        ])?;

        for segment in [Segment::Business, Segment::Personal] {
            let (spend, accounts) = spend_and_accounts(&segment.filter(data))?;
            let ic = spend * ic_rate;
            table.push_row(vec![
                Cell::text("Segment"),
                Cell::text(segment.label()),
                Cell::Decimal(spend.round_dp(2)),
                Cell::Decimal(ic.round_dp(2)),
                Cell::from(accounts),
                Cell::Decimal(safe_percentage(ic, total_ic)),
            ])?;
        }

        // Ranking by spend is ranking by estimated revenue at a flat rate.
        let mut merchants: Vec<_> = group_totals(data, MERCHANT_NAME)?.into_iter().collect();
        merchants.sort_by(|(a_name, a), (b_name, b)| b.total.cmp(&a.total).then_with(|| a_name.cmp(b_name)));
        for (name, totals) in merchants.into_iter().take(TOP_MERCHANTS) {
            let ic = totals.total * ic_rate;
            table.push_row(vec![
                Cell::text("Top Merchant"),
                Cell::text(name),
                Cell::Decimal(totals.total.round_dp(2)),
                Cell::Decimal(ic.round_dp(2)),
                Cell::from(totals.accounts.len()),
                Cell::Decimal(safe_percentage(ic, total_ic)),
            ])?;
        }

        let result = AnalysisResult::from_table("interchange_summary", "Interchange Revenue Summary", table)
            .with_sheet_name("M8 IC Summary")
            .with_summary(format!(
                "Estimated interchange revenue of ${} at {}% of spend.",
                total_ic.round_dp(2),
                (ic_rate * Decimal::ONE_HUNDRED).normalize()
            ))
            .with_metadata("total_ic_revenue", decimal_value(total_ic))
            .with_metadata("ic_rate", ic_rate.normalize().to_string());

        let mut extra = Map::new();
        extra.insert("total_ic_revenue".to_string(), decimal_value(total_ic));
        publish_slide(ctx, "Interchange", &result, extra)?;
        Ok(Some(result))
    }

    fn required_columns(&self) -> &[&str] {
        columns_for(Segment::Business)
    }

    fn description(&self) -> &str {
        "Estimated interchange revenue at the client's rate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::columns::BUSINESS_FLAG;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn data() -> Table {
        let mut table = Table::new([MERCHANT_NAME, AMOUNT, PRIMARY_ACCOUNT_NUM, BUSINESS_FLAG]);
        for (m, a, acct, flag) in [
            ("Supply Co", dec!(600.00), "B1", "Yes"),
            ("Grocer", dec!(300.00), "P1", "No"),
            ("Cafe", dec!(100.00), "P2", "No"),
        ] {
            table
                .push_row(vec![Cell::text(m), Cell::Decimal(a), Cell::text(acct), Cell::text(flag)])
                .unwrap();
        }
        table
    }

    #[test]
    fn test_without_rate_reports_zero() {
        let mut ctx = PipelineContext::new().with_data(data());
        let result = InterchangeSummary.run(&mut ctx).unwrap().unwrap();

        assert!(result.main_table().unwrap().is_empty());
        assert_eq!(result.metric("total_ic_revenue"), Some(&json!("0")));
        assert_eq!(result.summary(), "IC rate not configured");
    }

    #[test]
    fn test_estimates_at_rate() {
        let mut ctx = PipelineContext::new().with_data(data());
        ctx.set_config_value("ic_rate", "0.01");

        let result = InterchangeSummary.run(&mut ctx).unwrap().unwrap();

        assert_eq!(result.metric("total_ic_revenue"), Some(&json!("10")));
        let table = result.main_table().unwrap();
        // Portfolio, two segments, three merchants.
        assert_eq!(table.len(), 6);
        assert_eq!(table.get(1, "estimated_ic_revenue"), Some(&Cell::Decimal(dec!(6.00))));
        assert_eq!(table.get(1, "pct_of_total"), Some(&Cell::Decimal(dec!(60.00))));
        assert_eq!(table.get(3, "item"), Some(&Cell::text("Supply Co")));
        assert_eq!(ctx.slides()[0].data["total_ic_revenue"], json!("10"));
    }
}
