use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A single value in a `Table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Decimal(Decimal),
    Bool(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell. Integers widen to `Decimal`; text is not parsed.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Decimal(d) => Some(*d),
            Cell::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Decimal(d) => write!(f, "{d}"),
            Cell::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Int(value as i64)
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Decimal(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

/// A tabular dataset: ordered named columns, rows of cells, and optional row labels.
///
/// Every row has exactly one cell per column; `push_row` enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            index: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Row labels, when the table is indexed by name.
    pub fn index(&self) -> Option<&[String]> {
        self.index.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), CoreError> {
        if row.len() != self.columns.len() {
            return Err(CoreError::RowArity {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        if let Some(index) = self.index.as_mut() {
            index.push(String::new());
        }
        self.rows.push(row);
        Ok(())
    }

    /// Appends a row under a label. Switches the table to indexed mode; rows pushed
    /// earlier without a label get an empty one.
    pub fn push_labeled_row(
        &mut self,
        label: impl Into<String>,
        row: Vec<Cell>,
    ) -> Result<(), CoreError> {
        if self.index.is_none() {
            self.index = Some(vec![String::new(); self.rows.len()]);
        }
        self.push_row(row)?;
        if let Some(last) = self.index.as_mut().and_then(|i| i.last_mut()) {
            *last = label.into();
        }
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterates the cells of one column.
    pub fn column<'a>(
        &'a self,
        name: &str,
    ) -> Result<impl Iterator<Item = &'a Cell> + use<'a>, CoreError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| CoreError::UnknownColumn(name.to_string()))?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Looks up one cell by row position and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Returns the required columns this table does not have.
    pub fn missing_columns<'a, I>(&self, required: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        required
            .into_iter()
            .filter(|name| self.column_index(name).is_none())
            .map(str::to_string)
            .collect()
    }

    pub fn column_set(&self) -> BTreeSet<String> {
        self.columns.iter().cloned().collect()
    }

    /// A new table with the same columns and only the rows matching `predicate`.
    /// Row labels are carried over for the kept rows.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(&[Cell]) -> bool,
    {
        let mut rows = Vec::new();
        let mut index = self.index.as_ref().map(|_| Vec::new());
        for (pos, row) in self.rows.iter().enumerate() {
            if predicate(row) {
                rows.push(row.clone());
                if let (Some(kept), Some(labels)) = (index.as_mut(), self.index.as_ref()) {
                    kept.push(labels[pos].clone());
                }
            }
        }
        Table {
            columns: self.columns.clone(),
            rows,
            index,
        }
    }

    /// Renames columns in place. Columns for which `rename` returns `None` keep their name.
    pub fn rename_columns<F>(&mut self, mut rename: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        for column in self.columns.iter_mut() {
            if let Some(new_name) = rename(column) {
                *column = new_name;
            }
        }
    }

    /// Appends a column, filling each row from `value_for(row)`.
    pub fn add_column<F>(&mut self, name: impl Into<String>, mut value_for: F)
    where
        F: FnMut(&[Cell]) -> Cell,
    {
        for row in self.rows.iter_mut() {
            let cell = value_for(row);
            row.push(cell);
        }
        self.columns.push(name.into());
    }
}
