use crate::columns::{self, AMOUNT, BUSINESS_FLAG, REQUIRED_COLUMNS, TRANSACTION_DATE, YEAR_MONTH};
use crate::error::ExtractError;
use chrono::NaiveDate;
use core_types::{Cell, Table};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%y", "%m/%d/%Y"];
const BUSINESS_TRUTHY: [&str; 5] = ["yes", "y", "true", "1", "t"];
const BUSINESS_FALSY: [&str; 6] = ["no", "n", "false", "0", "f", ""];

/// Reads a transaction extract into a `Table` with canonical column names.
///
/// `.csv` files are comma-delimited; `.txt` and `.tsv` files are tab-delimited. Both
/// must carry a header row. After loading, `year_month` is derived from
/// `transaction_date` when the file has no such column, and `business_flag` is
/// normalized to `Yes`/`No` (added as all `No` when absent).
///
/// Two headers that resolve to the same column, e.g. `date` and `transaction_date`,
/// are rejected with `ExtractError::DuplicateColumn`.
pub fn read_extract(path: &Path) -> Result<Table, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    let delimiter = delimiter_for(path)?;
    let file = File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let mut columns = Vec::with_capacity(headers.len());
    let mut sources: BTreeMap<String, String> = BTreeMap::new();
    for raw in headers.iter() {
        let raw = raw.trim();
        let column = columns::canonical_name(raw)
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string());
        if let Some(first) = sources.insert(column.clone(), raw.to_string()) {
            return Err(ExtractError::DuplicateColumn {
                column,
                first,
                second: raw.to_string(),
            });
        }
        columns.push(column);
    }

    let available: BTreeSet<String> = columns.iter().cloned().collect();
    let missing: BTreeSet<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !available.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ExtractError::MissingColumns { missing, available });
    }

    let amount_idx = columns.iter().position(|c| c == AMOUNT);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let mut row = Vec::with_capacity(columns.len());
        for (idx, field) in record.iter().enumerate() {
            let cell = if field.is_empty() {
                Cell::Empty
            } else if Some(idx) == amount_idx {
                Cell::Decimal(parse_amount(field).ok_or_else(|| ExtractError::InvalidAmount {
                    line,
                    value: field.to_string(),
                })?)
            } else {
                Cell::text(field)
            };
            row.push(cell);
        }
        rows.push(row);
    }

    normalize_business_flag(&columns, &mut rows);

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row)?;
    }
    if table.column_index(BUSINESS_FLAG).is_none() {
        table.add_column(BUSINESS_FLAG, |_| Cell::text("No"));
    }
    if table.column_index(YEAR_MONTH).is_none() {
        let date_idx = table.column_index(TRANSACTION_DATE);
        table.add_column(YEAR_MONTH, |row| {
            date_idx
                .and_then(|i| row[i].as_str())
                .and_then(year_month)
                .map(Cell::Text)
                .unwrap_or_default()
        });
    }

    tracing::info!(path = %path.display(), rows = table.len(), "Loaded transaction extract.");
    Ok(table)
}

fn delimiter_for(path: &Path) -> Result<u8, ExtractError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => Ok(b','),
        "txt" | "tsv" => Ok(b'\t'),
        _ => Err(ExtractError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

/// Parses an amount, tolerating currency symbols and thousands separators.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    Decimal::from_str(cleaned.trim()).ok()
}

/// `YYYY-MM` for a transaction date, or `None` if the date cannot be parsed.
fn year_month(raw: &str) -> Option<String> {
    // Timestamps carry a time part after the date.
    let date_part = raw.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .map(|d| d.format("%Y-%m").to_string())
}

fn normalize_business_flag(columns: &[String], rows: &mut [Vec<Cell>]) {
    let Some(idx) = columns.iter().position(|c| c == BUSINESS_FLAG) else {
        return;
    };
    let mut unmapped = 0usize;
    for row in rows.iter_mut() {
        let raw = row[idx].as_str().unwrap_or_default().to_lowercase();
        let normalized = if BUSINESS_TRUTHY.contains(&raw.as_str()) {
            "Yes"
        } else {
            if !BUSINESS_FALSY.contains(&raw.as_str()) {
                unmapped += 1;
            }
            "No"
        };
        row[idx] = Cell::text(normalized);
    }
    if unmapped > 0 {
        tracing::warn!(rows = unmapped, "business_flag values not recognised, defaulting to 'No'.");
    }
}
