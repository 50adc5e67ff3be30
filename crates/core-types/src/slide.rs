use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The category a slide lands in when the caller does not name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// One entry destined for presentation-deck assembly.
///
/// Entries are appended during the analysis phase and never removed. Later stages
/// drop an entry from the deck by reading `include`, not by deleting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideEntry {
    pub id: String,
    pub category: String,
    pub data: Map<String, Value>,
    pub include: bool,
    /// The run pass that added the entry; 0 for entries added outside a run.
    #[serde(default)]
    pub pass: u32,
}

impl SlideEntry {
    pub fn new(id: impl Into<String>, category: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            data,
            include: true,
            pass: 0,
        }
    }

    pub fn with_pass(mut self, pass: u32) -> Self {
        self.pass = pass;
        self
    }
}

/// What to do when a slide id is added a second time in one run pass.
///
/// An id first added by an earlier pass is always superseded, whatever the policy:
/// re-running the pipeline replaces its slides the way it replaces its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideIdPolicy {
    /// Refuse the second entry; the deck is left unchanged.
    #[default]
    Reject,
    /// Keep the earlier entries but mark them `include = false`, then append.
    LastWins,
    /// Append the second entry alongside the first.
    AllowDuplicates,
}
