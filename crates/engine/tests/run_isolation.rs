use core_types::{AnalysisResult, Cell, SlideIdPolicy, Table};
use engine::{
    AnalysisUnit, ErrorKind, PipelineContext, PipelineError, Registry, UnitOutput, UnitStatus,
    add_slide, run,
};
use rust_decimal_macros::dec;
use serde_json::{Map, json};

fn spend_table() -> Table {
    let mut table = Table::new(["merchant_name", "amount"]);
    table
        .push_row(vec![Cell::from("Grocer"), Cell::from(dec!(12.50))])
        .unwrap();
    table
        .push_row(vec![Cell::from("Fuel"), Cell::from(dec!(40.00))])
        .unwrap();
    table
}

struct TotalSpend;

impl AnalysisUnit for TotalSpend {
    fn run(&self, ctx: &mut PipelineContext) -> UnitOutput {
        let data = ctx
            .data
            .as_ref()
            .ok_or_else(|| PipelineError::data("no data"))?;
        let total: rust_decimal::Decimal = data
            .column("amount")?
            .filter_map(Cell::as_decimal)
            .sum();
        add_slide(ctx, "total_spend", Map::new())?;
        Ok(Some(
            AnalysisResult::new("total_spend").with_metadata("total", total.to_string()),
        ))
    }

    fn required_columns(&self) -> &[&str] {
        &["amount"]
    }
}

fn three_unit_registry() -> Registry {
    Registry::builder("txn")
        .add("a", TotalSpend)
        .add_fn("b", |_ctx| {
            Err(PipelineError::data("bad amounts").with_detail("column", "amount"))
        })
        .add_fn("c", |ctx| {
            let total = ctx
                .metric("total_spend", "total")
                .cloned()
                .ok_or_else(|| PipelineError::data("total_spend has not run"))?;
            Ok(Some(AnalysisResult::new("c").with_metadata("seen_total", total)))
        })
        .build()
        .unwrap()
}

#[test]
fn test_failure_in_the_middle_does_not_stop_the_run() {
    let registry = three_unit_registry();
    let mut ctx = PipelineContext::new()
        .with_client("1453", "Harbor CU")
        .with_data(spend_table());

    let report = run(&mut ctx, &registry);

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.name, "b");
    assert_eq!(failure.error.kind(), ErrorKind::Analysis);
    assert_eq!(failure.error.analysis_name(), Some("b"));
    assert_eq!(
        failure.error.root_cause().detail().unwrap()["column"],
        json!("amount")
    );

    assert_eq!(report.results.len(), 2);
    assert!(ctx.has_result("total_spend"));
    assert_eq!(ctx.metric("c", "seen_total"), Some(&json!("52.50")));

    let statuses: Vec<_> = report.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![UnitStatus::Succeeded, UnitStatus::Failed, UnitStatus::Succeeded]
    );
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.run_id, ctx.run_id);
}

#[test]
fn test_rerun_matches_single_run() {
    let registry = three_unit_registry();
    let mut ctx = PipelineContext::new().with_data(spend_table());

    let first = run(&mut ctx, &registry);
    let second = run(&mut ctx, &registry);

    assert_eq!(second.results, first.results);
    assert_eq!(ctx.results(), &first.results);
    let failed: Vec<_> = second.failures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["b"]);
    assert_eq!(ctx.slides().len(), 2);
    let included: Vec<_> = ctx.included_slides().map(|s| s.pass).collect();
    assert_eq!(included, vec![2]);
}

#[test]
fn test_rerun_picks_up_corrected_data() {
    let registry = three_unit_registry().select(&["a", "c"]).unwrap();
    let mut ctx = PipelineContext::new().with_data(spend_table());

    let first = run(&mut ctx, &registry);
    assert!(first.is_clean());

    let mut corrected = spend_table();
    corrected
        .push_row(vec![Cell::from("Pharmacy"), Cell::from(dec!(7.50))])
        .unwrap();
    ctx.data = Some(corrected);
    let second = run(&mut ctx, &registry);

    assert!(second.is_clean());
    assert_eq!(ctx.metric("total_spend", "total"), Some(&json!("60.00")));
    assert_eq!(ctx.metric("c", "seen_total"), Some(&json!("60.00")));
    assert_eq!(ctx.included_slides().count(), 1);
}

#[test]
fn test_duplicate_slide_within_one_run_is_rejected() {
    let registry = Registry::builder("txn")
        .add("a", TotalSpend)
        .add("a_again", TotalSpend)
        .build()
        .unwrap();
    let mut ctx = PipelineContext::new().with_data(spend_table());

    let report = run(&mut ctx, &registry);
    assert_eq!(report.failures.len(), 1);
    let failure = report.failure("a_again").unwrap();
    assert_eq!(failure.error.root_cause().kind(), ErrorKind::Output);
    assert_eq!(ctx.slides().len(), 1);

    ctx.slide_policy = SlideIdPolicy::LastWins;
    let report = run(&mut ctx, &registry);
    assert!(report.is_clean());
    assert_eq!(ctx.slides().len(), 3);
    assert_eq!(ctx.included_slides().count(), 1);
}

#[test]
fn test_selected_registry_runs_in_declared_order() {
    let registry = three_unit_registry().select(&["c", "a"]).unwrap();
    let mut ctx = PipelineContext::new().with_data(spend_table());

    let report = run(&mut ctx, &registry);

    let names: Vec<_> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
    assert!(report.is_clean());
}

#[test]
fn test_unit_order_matters_for_dependencies() {
    let registry = Registry::builder("txn")
        .add_fn("c", |ctx| {
            ctx.metric("total_spend", "total")
                .ok_or_else(|| PipelineError::data("total_spend has not run"))?;
            Ok(None)
        })
        .add("a", TotalSpend)
        .build()
        .unwrap();
    let mut ctx = PipelineContext::new().with_data(spend_table());

    let report = run(&mut ctx, &registry);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "c");
    assert!(ctx.has_result("total_spend"));
}

#[test]
fn test_outcomes_serialize_with_readable_durations() {
    let registry = three_unit_registry();
    let mut ctx = PipelineContext::new().with_data(spend_table());

    let report = run(&mut ctx, &registry);
    let rendered = serde_json::to_value(&report.outcomes).unwrap();

    assert_eq!(rendered[1]["status"], json!("failed"));
    assert!(rendered[0]["elapsed"].is_string());
}
