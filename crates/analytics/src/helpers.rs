use core_types::{Cell, CoreError, Table};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde_json::Value;
use std::str::FromStr;

/// Label written into the summary row appended by [`add_grand_total`].
pub const GRAND_TOTAL: &str = "Grand Total";

/// `numerator / denominator * 100`, rounded to 2 dp. A zero denominator yields 0.
pub fn safe_percentage(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    (numerator / denominator * Decimal::ONE_HUNDRED).round_dp(2)
}

/// `numerator / denominator`, rounded to `dp` places. A zero denominator yields 0.
pub fn safe_ratio(numerator: Decimal, denominator: Decimal, dp: u32) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    (numerator / denominator).round_dp(dp)
}

/// Appends a "Grand Total" row that sums every numeric column.
///
/// A column counts as numeric when all its non-empty cells are `Int` or `Decimal`.
/// Integer columns stay integer. Other columns are left empty, and `label_col`
/// carries the label. An empty table is left untouched.
pub fn add_grand_total(table: &mut Table, label_col: &str) -> Result<(), CoreError> {
    if table.is_empty() {
        return Ok(());
    }
    let label_idx = table
        .column_index(label_col)
        .ok_or_else(|| CoreError::UnknownColumn(label_col.to_string()))?;

    let totals = (0..table.columns().len())
        .map(|idx| {
            if idx == label_idx {
                return Cell::text(GRAND_TOTAL);
            }
            column_total(table.rows().iter().map(|row| &row[idx]))
        })
        .collect();

    table.push_row(totals)
}

fn column_total<'a>(cells: impl Iterator<Item = &'a Cell>) -> Cell {
    let mut int_total: i64 = 0;
    let mut dec_total = Decimal::ZERO;
    let mut saw_decimal = false;
    let mut saw_number = false;

    for cell in cells {
        match cell {
            Cell::Empty => {}
            Cell::Int(v) => {
                int_total += *v;
                dec_total += Decimal::from(*v);
                saw_number = true;
            }
            Cell::Decimal(v) => {
                dec_total += *v;
                saw_decimal = true;
                saw_number = true;
            }
            Cell::Text(_) | Cell::Bool(_) => return Cell::Empty,
        }
    }

    match (saw_number, saw_decimal) {
        (false, _) => Cell::Empty,
        (true, false) => Cell::Int(int_total),
        (true, true) => Cell::Decimal(dec_total),
    }
}

/// Reads a decimal out of a JSON value, accepting both numbers and numeric strings.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        _ => None,
    }
}

/// Decimals travel through metadata and slide payloads as strings so no precision
/// is lost to `f64`. Rounded to 2 dp with trailing zeros dropped.
pub fn decimal_value(value: Decimal) -> Value {
    Value::String(value.round_dp(2).normalize().to_string())
}
