use crate::table::Table;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Excel caps worksheet names at 31 characters.
const MAX_SHEET_NAME_LEN: usize = 31;

/// The immutable output of one analysis unit.
///
/// An `AnalysisResult` is built once through `new`/`from_table` and the consuming
/// `with_*` methods, then only read. A corrected result is a new value that replaces
/// the old one in the context, keyed by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    name: String,
    title: String,
    data: BTreeMap<String, Table>,
    charts: Vec<PathBuf>,
    summary: String,
    metadata: BTreeMap<String, Value>,
}

impl AnalysisResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            data: BTreeMap::new(),
            charts: Vec::new(),
            summary: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a result holding a single `"main"` table.
    pub fn from_table(name: impl Into<String>, title: impl Into<String>, table: Table) -> Self {
        Self::new(name).with_title(title).with_table("main", table)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Adds a named table. A second table under the same name replaces the first.
    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.data.insert(name.into(), table);
        self
    }

    /// Appends a chart path. Charts keep the order they are added in, which is display order.
    pub fn with_chart(mut self, path: impl Into<PathBuf>) -> Self {
        self.charts.push(path.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_sheet_name(self, sheet_name: impl Into<String>) -> Self {
        let sheet_name: String = sheet_name.into();
        self.with_metadata("sheet_name", sheet_name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn data(&self) -> &BTreeMap<String, Table> {
        &self.data
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.data.get(name)
    }

    /// The `"main"` table, if the result has one.
    pub fn main_table(&self) -> Option<&Table> {
        self.table("main")
    }

    pub fn charts(&self) -> &[PathBuf] {
        &self.charts
    }

    pub fn chart_paths(&self) -> impl Iterator<Item = &Path> {
        self.charts.iter().map(PathBuf::as_path)
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// A single metadata value, used for cross-analysis lookups.
    pub fn metric(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// The worksheet name for this result: the `sheet_name` metadata entry, or the
    /// result name with spaces replaced, truncated to 31 characters.
    pub fn sheet_name(&self) -> String {
        match self.metadata.get("sheet_name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => self
                .name
                .replace(' ', "_")
                .chars()
                .take(MAX_SHEET_NAME_LEN)
                .collect(),
        }
    }
}

impl Hash for AnalysisResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.title.hash(state);
        self.data.hash(state);
        self.charts.hash(state);
        self.summary.hash(state);
        self.metadata.len().hash(state);
        for (key, value) in &self.metadata {
            key.hash(state);
            hash_value(value, state);
        }
    }
}

/// Structural hash of a JSON value, consistent with `Value`'s `PartialEq`.
fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Number(n) => n.to_string().hash(state),
        Value::String(s) => s.hash(state),
        Value::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            map.len().hash(state);
            for (key, item) in map {
                key.hash(state);
                hash_value(item, state);
            }
        }
    }
}
