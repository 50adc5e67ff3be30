use super::{BASE_COLUMNS, publish_slide, transactions};
use crate::error::AnalyticsError;
use crate::helpers::{GRAND_TOTAL, decimal_from_value, decimal_value, safe_ratio};
use crate::summary::PCT_OF_TOTAL_AMOUNT;
use core_types::{AnalysisResult, Cell, Table};
use engine::{AnalysisUnit, PipelineContext, UnitOutput};
use extract::columns::{AMOUNT, MERCHANT_NAME, PRIMARY_ACCOUNT_NUM, YEAR_MONTH};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Map;
use std::collections::BTreeSet;

const BENCHMARK_SOURCE: &str = "PULSE 2024 Debit Issuer Study";

// Credit-union averages from the benchmark study.
const BENCH_ANNUAL_SPEND_PER_CARD: Decimal = dec!(9291);
const BENCH_TXN_PER_CARD_MONTH: Decimal = dec!(20.2);
const BENCH_AVG_TICKET: Decimal = dec!(40.00);

/// Status relative to a benchmark: at or above 100% is "Above", 85% or more is "At".
fn status(value: Decimal, benchmark: Option<Decimal>) -> &'static str {
    match benchmark {
        Some(b) if b > Decimal::ZERO => {
            let ratio = value / b;
            if ratio >= Decimal::ONE {
                "Above"
            } else if ratio >= dec!(0.85) {
                "At"
            } else {
                "Below"
            }
        }
        _ => "",
    }
}

struct Kpis {
    table: Table,
}

impl Kpis {
    fn new() -> Self {
        Self {
            table: Table::new(["metric", "value", "benchmark", "status", "format"]),
        }
    }

    fn push(
        &mut self,
        metric: &str,
        value: Cell,
        benchmark: Option<Decimal>,
        format: &str,
    ) -> Result<(), AnalyticsError> {
        let band = value.as_decimal().map(|v| status(v, benchmark)).unwrap_or("");
        self.table.push_row(vec![
            Cell::text(metric),
            value,
            benchmark.map(Cell::Decimal).unwrap_or_default(),
            Cell::text(band),
            Cell::text(format),
        ])?;
        Ok(())
    }
}

/// The executive scorecard. Reads the loaded extract for portfolio totals and the
/// metadata of earlier units for everything else, so it must run after them.
///
/// `top_merchants_by_spend` is required; `interchange_summary` and `segment_split`
/// are used when present.
#[derive(Debug, Default)]
pub struct PortfolioScorecard;

impl AnalysisUnit for PortfolioScorecard {
    fn run(&self, ctx: &mut PipelineContext) -> UnitOutput {
        let top_spend = ctx
            .result("top_merchants_by_spend")
            .ok_or_else(|| AnalyticsError::MissingDependency("top_merchants_by_spend".to_string()))?;
        let concentration = top_ten_concentration(top_spend);

        let data = transactions(ctx)?;
        let accounts: BTreeSet<String> = data
            .column(PRIMARY_ACCOUNT_NUM)?
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();
        let total_accounts = Decimal::from(accounts.len().max(1));
        let total_spend: Decimal = data.column(AMOUNT)?.filter_map(|c| c.as_decimal()).sum();
        let total_txns = Decimal::from(data.len());
        let months = match data.column(YEAR_MONTH) {
            Ok(cells) => cells
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string())
                .collect::<BTreeSet<_>>()
                .len()
                .max(1),
            Err(_) => 1,
        };
        let months_dec = Decimal::from(months);

        if !ctx.has_result("interchange_summary") {
            tracing::warn!(client = %ctx.client_id, "Scorecard running without interchange_summary; interchange KPI will be zero.");
        }
        let ic_revenue = ctx
            .metric("interchange_summary", "total_ic_revenue")
            .and_then(decimal_from_value)
            .unwrap_or_default();
        let ic_rate = ctx
            .metric("interchange_summary", "ic_rate")
            .and_then(decimal_from_value)
            .unwrap_or_default();
        let business_pct = ctx
            .metric("segment_split", "business_spend_pct")
            .and_then(decimal_from_value);

        let mut kpis = Kpis::new();
        kpis.push("Active Accounts", Cell::from(accounts.len()), None, "")?;
        kpis.push(
            "Avg Spend/Account/Month",
            Cell::Decimal(safe_ratio(total_spend, total_accounts * months_dec, 2)),
            Some((BENCH_ANNUAL_SPEND_PER_CARD / dec!(12)).round_dp(2)),
            "$",
        )?;
        kpis.push(
            "Avg Txn/Account/Month",
            Cell::Decimal(safe_ratio(total_txns, total_accounts * months_dec, 1)),
            Some(BENCH_TXN_PER_CARD_MONTH),
            "",
        )?;
        kpis.push(
            "Average Ticket",
            Cell::Decimal(safe_ratio(total_spend, total_txns, 2)),
            Some(BENCH_AVG_TICKET),
            "$",
        )?;
        kpis.push(
            "Est. Annual Interchange Revenue",
            Cell::Decimal((ic_revenue / months_dec * dec!(12)).round_dp(2)),
            None,
            "$",
        )?;
        kpis.push(
            "Top 10 Merchant Concentration %",
            Cell::Decimal(concentration.round_dp(1)),
            None,
            "%",
        )?;
        if let Some(pct) = business_pct {
            kpis.push("Business Spend %", Cell::Decimal(pct.round_dp(1)), None, "%")?;
        }

        let result = AnalysisResult::from_table("portfolio_scorecard", "Portfolio Health Scorecard", kpis.table)
            .with_sheet_name("M9 Scorecard")
            .with_metadata("months_in_data", months)
            .with_metadata("ic_rate", ic_rate.normalize().to_string())
            .with_metadata("top10_concentration_pct", decimal_value(concentration))
            .with_metadata("benchmark_source", BENCHMARK_SOURCE);

        publish_slide(ctx, "Scorecard", &result, Map::new())?;
        Ok(Some(result))
    }

    fn required_columns(&self) -> &[&str] {
        BASE_COLUMNS
    }

    fn description(&self) -> &str {
        "Executive KPI scorecard against industry benchmarks (runs last)"
    }
}

/// Share of spend held by the first ten ranked merchants.
fn top_ten_concentration(top_spend: &AnalysisResult) -> Decimal {
    let Some(table) = top_spend.main_table() else {
        return Decimal::ZERO;
    };
    let (Some(name_idx), Some(pct_idx)) = (
        table.column_index(MERCHANT_NAME),
        table.column_index(PCT_OF_TOTAL_AMOUNT),
    ) else {
        return Decimal::ZERO;
    };
    table
        .rows()
        .iter()
        .filter(|row| row[name_idx].as_str() != Some(GRAND_TOTAL))
        .take(10)
        .filter_map(|row| row[pct_idx].as_decimal())
        .sum()
}
