use crate::error::AnalyticsError;
use crate::helpers::{add_grand_total, safe_percentage, safe_ratio};
use core_types::{Cell, Table};
use extract::columns::{AMOUNT, PRIMARY_ACCOUNT_NUM};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

pub const TOTAL_AMOUNT: &str = "total_amount";
pub const TRANSACTION_COUNT: &str = "transaction_count";
pub const AVG_TRANSACTION: &str = "avg_transaction";
pub const UNIQUE_ACCOUNTS: &str = "unique_accounts";
pub const PCT_OF_TOTAL_AMOUNT: &str = "pct_of_total_amount";
pub const PCT_OF_TOTAL_TRANSACTIONS: &str = "pct_of_total_transactions";
pub const ESTIMATED_IC_REVENUE: &str = "estimated_ic_revenue";

/// The metric a grouped summary is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    Spend,
    Transactions,
    Accounts,
}

/// One group's running totals.
#[derive(Debug, Default, Clone)]
pub(crate) struct GroupTotals {
    pub total: Decimal,
    pub count: usize,
    pub accounts: BTreeSet<String>,
}

impl GroupTotals {
    fn metric(&self, rank_by: RankBy) -> Decimal {
        match rank_by {
            RankBy::Spend => self.total,
            RankBy::Transactions => Decimal::from(self.count),
            RankBy::Accounts => Decimal::from(self.accounts.len()),
        }
    }
}

/// Sums amount, counts rows and collects distinct accounts per value of `group_col`.
/// Rows with an empty group value are skipped.
pub(crate) fn group_totals(
    data: &Table,
    group_col: &str,
) -> Result<BTreeMap<String, GroupTotals>, AnalyticsError> {
    let groups = data.column(group_col)?;
    let amounts = data.column(AMOUNT)?;
    let accounts = data.column(PRIMARY_ACCOUNT_NUM)?;

    let mut totals: BTreeMap<String, GroupTotals> = BTreeMap::new();
    for ((group, amount), account) in groups.zip(amounts).zip(accounts) {
        if group.is_empty() {
            continue;
        }
        let entry = totals.entry(group.to_string()).or_default();
        entry.total += amount.as_decimal().unwrap_or_default();
        entry.count += 1;
        if !account.is_empty() {
            entry.accounts.insert(account.to_string());
        }
    }
    Ok(totals)
}

/// Aggregates `data` by `group_col` into a ranked summary table.
///
/// Columns: the group column, `total_amount`, `transaction_count`,
/// `avg_transaction`, `unique_accounts`, `pct_of_total_amount`,
/// `pct_of_total_transactions`, plus `estimated_ic_revenue` when `ic_rate` is
/// positive. Rows are sorted descending by `rank_by` (ties by group name), cut to
/// `top_n`, and followed by a Grand Total row. Percentages are relative to the
/// whole input, not just the kept rows.
pub fn grouped_summary(
    data: &Table,
    group_col: &str,
    rank_by: RankBy,
    top_n: usize,
    ic_rate: Decimal,
) -> Result<Table, AnalyticsError> {
    let with_ic = ic_rate > Decimal::ZERO;
    let mut columns = vec![
        group_col,
        TOTAL_AMOUNT,
        TRANSACTION_COUNT,
        AVG_TRANSACTION,
        UNIQUE_ACCOUNTS,
        PCT_OF_TOTAL_AMOUNT,
        PCT_OF_TOTAL_TRANSACTIONS,
    ];
    if with_ic {
        columns.push(ESTIMATED_IC_REVENUE);
    }
    let mut table = Table::new(columns);
    if data.is_empty() {
        return Ok(table);
    }

    let grand_amount: Decimal = data.column(AMOUNT)?.filter_map(|c| c.as_decimal()).sum();
    let grand_count = Decimal::from(data.len());

    let mut ranked: Vec<(String, GroupTotals)> = group_totals(data, group_col)?.into_iter().collect();
    ranked.sort_by(|(a_name, a), (b_name, b)| {
        b.metric(rank_by)
            .cmp(&a.metric(rank_by))
            .then_with(|| a_name.cmp(b_name))
    });

    for (name, totals) in ranked.into_iter().take(top_n) {
        let count = Decimal::from(totals.count);
        let mut row = vec![
            Cell::text(name),
            Cell::Decimal(totals.total.round_dp(2)),
            Cell::from(totals.count),
            Cell::Decimal(safe_ratio(totals.total, count, 2)),
            Cell::from(totals.accounts.len()),
            Cell::Decimal(safe_percentage(totals.total, grand_amount)),
            Cell::Decimal(safe_percentage(count, grand_count)),
        ];
        if with_ic {
            row.push(Cell::Decimal((totals.total * ic_rate).round_dp(2)));
        }
        table.push_row(row)?;
    }

    add_grand_total(&mut table, group_col)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::GRAND_TOTAL;
    use rust_decimal_macros::dec;

    fn transactions() -> Table {
        let mut table = Table::new(["merchant_name", "amount", "primary_account_num"]);
        for (merchant, amount, account) in [
            ("Grocer", dec!(10.00), "A1"),
            ("Grocer", dec!(20.00), "A2"),
            ("Fuel", dec!(50.00), "A1"),
            ("Cafe", dec!(5.00), "A1"),
            ("Cafe", dec!(5.00), "A1"),
            ("Cafe", dec!(10.00), "A1"),
        ] {
            table
                .push_row(vec![Cell::text(merchant), Cell::Decimal(amount), Cell::text(account)])
                .unwrap();
        }
        table
    }

    fn first_column(table: &Table) -> Vec<String> {
        table.column("merchant_name").unwrap().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_rank_by_spend() {
        let table = grouped_summary(&transactions(), "merchant_name", RankBy::Spend, 50, Decimal::ZERO).unwrap();

        assert_eq!(first_column(&table), vec!["Fuel", "Grocer", "Cafe", GRAND_TOTAL]);
        assert_eq!(table.get(0, TOTAL_AMOUNT), Some(&Cell::Decimal(dec!(50.00))));
        assert_eq!(table.get(0, PCT_OF_TOTAL_AMOUNT), Some(&Cell::Decimal(dec!(50.00))));
        assert_eq!(table.get(1, AVG_TRANSACTION), Some(&Cell::Decimal(dec!(15.00))));
        assert_eq!(table.get(3, TOTAL_AMOUNT), Some(&Cell::Decimal(dec!(100.00))));
        assert_eq!(table.get(3, TRANSACTION_COUNT), Some(&Cell::Int(6)));
        assert!(table.column_index(ESTIMATED_IC_REVENUE).is_none());
    }

    #[test]
    fn test_rank_by_transactions_and_accounts() {
        let by_txn = grouped_summary(&transactions(), "merchant_name", RankBy::Transactions, 50, Decimal::ZERO).unwrap();
        assert_eq!(first_column(&by_txn)[0], "Cafe");
        assert_eq!(by_txn.get(0, PCT_OF_TOTAL_TRANSACTIONS), Some(&Cell::Decimal(dec!(50.00))));

        let by_accounts = grouped_summary(&transactions(), "merchant_name", RankBy::Accounts, 50, Decimal::ZERO).unwrap();
        assert_eq!(first_column(&by_accounts)[0], "Grocer");
        assert_eq!(by_accounts.get(0, UNIQUE_ACCOUNTS), Some(&Cell::Int(2)));
    }

    #[test]
    fn test_top_n_and_interchange() {
        let table = grouped_summary(&transactions(), "merchant_name", RankBy::Spend, 2, dec!(0.01)).unwrap();

        assert_eq!(first_column(&table), vec!["Fuel", "Grocer", GRAND_TOTAL]);
        assert_eq!(table.get(0, ESTIMATED_IC_REVENUE), Some(&Cell::Decimal(dec!(0.50))));
        assert_eq!(table.get(2, TOTAL_AMOUNT), Some(&Cell::Decimal(dec!(80.00))));
    }

    #[test]
    fn test_empty_input_keeps_columns() {
        let empty = Table::new(["merchant_name", "amount", "primary_account_num"]);
        let table = grouped_summary(&empty, "merchant_name", RankBy::Spend, 50, dec!(0.01)).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 8);
    }
}
