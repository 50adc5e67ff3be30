use crate::context::PipelineContext;
use crate::deck::report;
use crate::error::PipelineError;
use crate::registry::{AnalysisUnit, Registry, UnitOutput};
use core_types::AnalysisResult;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One unit that did not complete.
#[derive(Debug)]
pub struct AnalysisFailure {
    /// Registry id of the failed unit.
    pub name: String,
    /// Always `PipelineError::Analysis` wrapping the underlying cause.
    pub error: PipelineError,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Returned a result.
    Succeeded,
    /// Completed without returning a result.
    SideEffectOnly,
    Failed,
}

/// Per-unit timing and status, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    pub name: String,
    pub status: UnitStatus,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

/// Everything one call to [`run`] produced.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Every result on the context once the pass finished, keyed by result name.
    pub results: BTreeMap<String, AnalysisResult>,
    /// Failures in the order they occurred.
    pub failures: Vec<AnalysisFailure>,
    pub outcomes: Vec<UnitOutcome>,
    pub elapsed: Duration,
}

impl RunReport {
    /// True if no unit failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status != UnitStatus::Failed)
            .count()
    }

    pub fn failure(&self, name: &str) -> Option<&AnalysisFailure> {
        self.failures.iter().find(|f| f.name == name)
    }
}

/// Executes every unit in `registry`, in declared order, against `ctx`.
///
/// A failing unit never stops the run: its error is wrapped as
/// `PipelineError::Analysis { name: <registry id>, .. }`, logged, recorded in the
/// report, and the next unit starts. Panics inside a unit are caught and recorded
/// the same way. Units that return a result have it stored on the context under
/// the result's own name, replacing any earlier result with that name.
///
/// Running the same registry twice on one context is allowed. Each call starts a
/// new slide pass: the second run overwrites results by name, and its slides
/// supersede the ones the first run added under the same ids.
pub fn run(ctx: &mut PipelineContext, registry: &Registry) -> RunReport {
    let started = Instant::now();
    let pass = ctx.begin_pass();
    let total = registry.len();
    let mut failures = Vec::new();
    let mut outcomes = Vec::with_capacity(total);

    tracing::info!(
        client = %ctx.client_id,
        registry = %registry.name(),
        run_id = %ctx.run_id,
        pass,
        units = total,
        "Starting analysis run."
    );

    for (i, entry) in registry.iter().enumerate() {
        let id = entry.id();
        report(ctx, &format!("[{}/{}] {}", i + 1, total, id));

        let unit_started = Instant::now();
        let outcome = check_columns(ctx, entry.unit()).and_then(|()| invoke(ctx, entry.unit()));
        let elapsed = unit_started.elapsed();

        let status = match outcome {
            Ok(Some(result)) => {
                tracing::debug!(analysis = %id, result = %result.name(), ?elapsed, "Analysis complete.");
                ctx.insert_result(result);
                UnitStatus::Succeeded
            }
            Ok(None) => {
                tracing::debug!(analysis = %id, ?elapsed, "Analysis complete (no result).");
                UnitStatus::SideEffectOnly
            }
            Err(cause) => {
                let error = PipelineError::analysis(id, cause);
                tracing::error!(client = %ctx.client_id, analysis = %id, error = %error, "Analysis failed, continuing.");
                failures.push(AnalysisFailure {
                    name: id.to_string(),
                    error,
                    elapsed,
                });
                UnitStatus::Failed
            }
        };

        outcomes.push(UnitOutcome {
            name: id.to_string(),
            status,
            elapsed,
        });
    }

    let elapsed = started.elapsed();
    tracing::info!(
        client = %ctx.client_id,
        registry = %registry.name(),
        succeeded = total - failures.len(),
        failed = failures.len(),
        ?elapsed,
        "Analysis run finished."
    );

    RunReport {
        run_id: ctx.run_id,
        results: ctx.results().clone(),
        failures,
        outcomes,
        elapsed,
    }
}

fn check_columns(ctx: &PipelineContext, unit: &dyn AnalysisUnit) -> Result<(), PipelineError> {
    let required = unit.required_columns();
    if required.is_empty() {
        return Ok(());
    }
    let Some(data) = ctx.data.as_ref() else {
        return Err(PipelineError::data("No transaction data loaded"));
    };
    let missing = data.missing_columns(required.iter().copied());
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::column_mismatch(missing, data.column_set()))
    }
}

fn invoke(ctx: &mut PipelineContext, unit: &dyn AnalysisUnit) -> UnitOutput {
    match panic::catch_unwind(AssertUnwindSafe(|| unit.run(ctx))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(PipelineError::Panic(panic_message(payload.as_ref()))),
    }
}

/// The text of a panic payload: the `&str` or `String` passed to `panic!`.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Replaces the default panic hook, which writes straight to stderr, with one that
/// logs through `tracing`. `run` still catches unit panics; this only moves the
/// report into the log.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::error!(panic = %message, %location, "Panic captured.");
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::Registry;
    use core_types::Table;
    use std::sync::{Arc, Mutex};

    fn named(name: &'static str) -> impl Fn(&mut PipelineContext) -> UnitOutput + Send + Sync {
        move |_ctx: &mut PipelineContext| Ok(Some(AnalysisResult::new(name)))
    }

    struct NeedsAmount;

    impl AnalysisUnit for NeedsAmount {
        fn run(&self, _ctx: &mut PipelineContext) -> UnitOutput {
            Ok(Some(AnalysisResult::new("needs_amount")))
        }

        fn required_columns(&self) -> &[&str] {
            &["amount", "merchant_name"]
        }
    }

    #[test]
    fn test_progress_messages_in_order() {
        let registry = Registry::builder("txn")
            .add("first", named("first"))
            .add("second", named("second"))
            .build()
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut ctx = PipelineContext::new().with_progress(move |m| sink.lock().unwrap().push(m.to_string()));

        let report = run(&mut ctx, &registry);

        assert!(report.is_clean());
        assert_eq!(*seen.lock().unwrap(), vec!["[1/2] first", "[2/2] second"]);
    }

    #[test]
    fn test_result_stored_under_its_own_name() {
        let registry = Registry::builder("txn")
            .add("registry_id", named("result_name"))
            .build()
            .unwrap();
        let mut ctx = PipelineContext::new();

        let report = run(&mut ctx, &registry);

        assert!(ctx.has_result("result_name"));
        assert!(!ctx.has_result("registry_id"));
        assert!(report.results.contains_key("result_name"));
    }

    #[test]
    fn test_side_effect_only_unit() {
        let registry = Registry::builder("txn")
            .add_fn("quiet", |_ctx| Ok(None))
            .build()
            .unwrap();
        let mut ctx = PipelineContext::new();

        let report = run(&mut ctx, &registry);

        assert!(report.is_clean());
        assert!(report.results.is_empty());
        assert_eq!(report.outcomes[0].status, UnitStatus::SideEffectOnly);
        assert_eq!(report.succeeded(), 1);
    }

    #[test]
    fn test_missing_data_and_columns() {
        let registry = Registry::builder("txn").add("needs", NeedsAmount).build().unwrap();

        let mut ctx = PipelineContext::new();
        let report = run(&mut ctx, &registry);
        let failure = report.failure("needs").unwrap();
        assert_eq!(failure.error.kind(), ErrorKind::Analysis);
        assert_eq!(failure.error.root_cause().kind(), ErrorKind::Data);

        let mut ctx = PipelineContext::new().with_data(Table::new(["merchant_name"]));
        let report = run(&mut ctx, &registry);
        match report.failure("needs").unwrap().error.root_cause() {
            PipelineError::ColumnMismatch { missing, available } => {
                assert_eq!(missing.iter().collect::<Vec<_>>(), vec!["amount"]);
                assert_eq!(available.iter().collect::<Vec<_>>(), vec!["merchant_name"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut ctx = PipelineContext::new().with_data(Table::new(["amount", "merchant_name"]));
        assert!(run(&mut ctx, &registry).is_clean());
    }

    #[test]
    fn test_panic_is_recorded() {
        let registry = Registry::builder("txn")
            .add_fn("boom", |_ctx| panic!("kaboom"))
            .add("after", named("after"))
            .build()
            .unwrap();
        let mut ctx = PipelineContext::new();

        let report = run(&mut ctx, &registry);

        let failure = report.failure("boom").unwrap();
        assert_eq!(failure.error.root_cause().kind(), ErrorKind::Unexpected);
        assert!(failure.error.to_string().contains("kaboom"));
        assert!(ctx.has_result("after"));
    }

    #[test]
    fn test_panic_message_from_payload() {
        let literal: Box<dyn Any + Send> = Box::new("static text");
        let formatted: Box<dyn Any + Send> = Box::new(format!("row {}", 7));
        let other: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(literal.as_ref()), "static text");
        assert_eq!(panic_message(formatted.as_ref()), "row 7");
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_panic_recorded_with_hook_installed() {
        install_panic_hook();
        let registry = Registry::builder("txn")
            .add_fn("boom", |_ctx| panic!("bad row {}", 3))
            .build()
            .unwrap();
        let mut ctx = PipelineContext::new();

        let report = run(&mut ctx, &registry);
        let _ = panic::take_hook();

        let failure = report.failure("boom").unwrap();
        assert_eq!(failure.error.root_cause().to_string(), "Analysis panicked: bad row 3");
    }
}
