use crate::context::PipelineContext;
use crate::error::PipelineError;
use core_types::AnalysisResult;
use serde_json::Value;

/// What an analysis unit hands back: a result to store, or `None` when the unit only
/// produced side effects (slides, files).
pub type UnitOutput = Result<Option<AnalysisResult>, PipelineError>;

/// A single analysis in a registry.
///
/// A unit reads whatever it needs from the context (the loaded extract, results of
/// units declared before it) and writes its output back, either by returning a
/// result or through the deck accumulator.
///
/// # Example
/// ```
/// use engine::{AnalysisUnit, PipelineContext, UnitOutput};
/// use core_types::AnalysisResult;
///
/// struct RowCount;
///
/// impl AnalysisUnit for RowCount {
///     fn run(&self, ctx: &mut PipelineContext) -> UnitOutput {
///         let rows = ctx.data.as_ref().map(|t| t.len()).unwrap_or(0);
///         Ok(Some(AnalysisResult::new("row_count").with_metadata("rows", rows)))
///     }
/// }
/// ```
pub trait AnalysisUnit: Send + Sync {
    /// Execute this unit against the shared context.
    ///
    /// Anticipated failures are returned as typed `PipelineError`s. A unit must
    /// never swallow an error and return a partial result as success.
    fn run(&self, ctx: &mut PipelineContext) -> UnitOutput;

    /// Columns the loaded extract must have before `run` is attempted.
    fn required_columns(&self) -> &[&str] {
        &[]
    }

    /// One-line description for catalogue listings.
    fn description(&self) -> &str {
        ""
    }
}

impl<F> AnalysisUnit for F
where
    F: Fn(&mut PipelineContext) -> UnitOutput + Send + Sync,
{
    fn run(&self, ctx: &mut PipelineContext) -> UnitOutput {
        self(ctx)
    }
}

/// One id/unit pair in a registry.
pub struct RegistryEntry {
    id: String,
    unit: Box<dyn AnalysisUnit>,
}

impl RegistryEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn unit(&self) -> &dyn AnalysisUnit {
        self.unit.as_ref()
    }
}

/// The declared, ordered catalogue of analysis units for one pipeline family.
///
/// Order is part of the contract: a unit may rely on every unit declared before it
/// having run. Entries are only ever appended; reordering means editing the
/// declaration.
pub struct Registry {
    name: String,
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn builder(name: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder::new(name)
    }

    /// The pipeline family this registry belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(RegistryEntry::id).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Appends a unit. Ids must be unique within the registry.
    pub fn register<U>(&mut self, id: impl Into<String>, unit: U) -> Result<(), PipelineError>
    where
        U: AnalysisUnit + 'static,
    {
        self.register_boxed(id, Box::new(unit))
    }

    pub fn register_boxed(
        &mut self,
        id: impl Into<String>,
        unit: Box<dyn AnalysisUnit>,
    ) -> Result<(), PipelineError> {
        let id = id.into();
        if self.contains(&id) {
            return Err(PipelineError::config(format!(
                "Analysis id '{id}' is registered twice in '{}'",
                self.name
            ))
            .with_detail("id", id));
        }
        tracing::debug!(registry = %self.name, analysis = %id, "Registered analysis unit.");
        self.entries.push(RegistryEntry { id, unit });
        Ok(())
    }

    /// Looks up a unit by id.
    pub fn get(&self, id: &str) -> Result<&dyn AnalysisUnit, PipelineError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(RegistryEntry::unit)
            .ok_or_else(|| self.unknown_id(id))
    }

    /// Narrows the registry to `ids`, keeping declared order regardless of the order
    /// `ids` lists them in. Any unknown id is a `Config` error.
    pub fn select<S: AsRef<str>>(self, ids: &[S]) -> Result<Registry, PipelineError> {
        if let Some(unknown) = ids.iter().map(AsRef::as_ref).find(|id| !self.contains(id)) {
            return Err(self.unknown_id(unknown));
        }
        let Registry { name, entries } = self;
        let entries = entries
            .into_iter()
            .filter(|e| ids.iter().any(|id| id.as_ref() == e.id))
            .collect();
        Ok(Registry { name, entries })
    }

    fn unknown_id(&self, id: &str) -> PipelineError {
        let available: Vec<Value> = self.ids().into_iter().map(Value::from).collect();
        PipelineError::config(format!("Unknown analytics module: '{id}'"))
            .with_detail("available", available)
    }
}

/// Builder for constructing registries in declaration order.
pub struct RegistryBuilder {
    name: String,
    entries: Vec<(String, Box<dyn AnalysisUnit>)>,
}

impl RegistryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add a unit to the end of the declared order.
    pub fn add<U: AnalysisUnit + 'static>(mut self, id: impl Into<String>, unit: U) -> Self {
        self.entries.push((id.into(), Box::new(unit)));
        self
    }

    /// Add a closure as a unit.
    pub fn add_fn<F>(self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut PipelineContext) -> UnitOutput + Send + Sync + 'static,
    {
        self.add(id, f)
    }

    /// Build the registry. Fails on the first duplicate id.
    pub fn build(self) -> Result<Registry, PipelineError> {
        let mut registry = Registry::new(self.name);
        for (id, unit) in self.entries {
            registry.register_boxed(id, unit)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn noop(_: &mut PipelineContext) -> UnitOutput {
        Ok(None)
    }

    fn sample() -> Registry {
        Registry::builder("txn")
            .add("a", noop)
            .add("b", noop)
            .add("c", noop)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_keeps_declared_order() {
        let registry = sample();
        assert_eq!(registry.name(), "txn");
        assert_eq!(registry.ids(), vec!["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_id_is_config_error() {
        let err = Registry::builder("txn")
            .add("a", noop)
            .add("a", noop)
            .build()
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);

        let mut registry = sample();
        assert!(registry.register("b", noop).is_err());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_appends() {
        let mut registry = sample();
        registry.register("d", noop).unwrap();
        assert_eq!(registry.ids(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_get_unknown_lists_available() {
        let registry = sample();
        assert!(registry.get("b").is_ok());

        let err = registry.get("zzz").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.detail().unwrap()["available"], json!(["a", "b", "c"]));
    }

    #[test]
    fn test_select_keeps_declared_order() {
        let selected = sample().select(&["c", "a"]).unwrap();
        assert_eq!(selected.ids(), vec!["a", "c"]);

        assert!(sample().select(&["a", "nope"]).is_err());
    }

    #[test]
    fn test_closure_units() {
        let registry = Registry::builder("adhoc")
            .add_fn("rows", |ctx| {
                Ok(Some(AnalysisResult::new("rows").with_metadata("client", ctx.client_id.clone())))
            })
            .build()
            .unwrap();

        let mut ctx = PipelineContext::new().with_client("7", "Seven");
        let result = registry.get("rows").unwrap().run(&mut ctx).unwrap().unwrap();
        assert_eq!(result.metric("client"), Some(&json!("7")));
    }
}
