use chrono::NaiveDate;
use core_types::{AnalysisResult, SlideEntry};
use engine::{Detail, ErrorKind, Guidance, PipelineContext, PipelineError, RunReport, UnitOutcome, guidance};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// `<base>/<client_id>/<YYYY.MM>/<label>/` for the month the analysis ran in.
///
/// `label` names the extract, so two extracts for one client never share a folder.
pub fn client_output_dir(
    base: &Path,
    client_id: &str,
    analysis_date: NaiveDate,
    label: &str,
) -> PathBuf {
    base.join(client_id)
        .join(analysis_date.format("%Y.%m").to_string())
        .join(label)
}

#[derive(Serialize)]
struct FailureRecord<'a> {
    analysis: &'a str,
    kind: ErrorKind,
    message: String,
    guidance: Guidance,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a Detail>,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    client_id: &'a str,
    client_name: &'a str,
    analysis_date: String,
    run_id: String,
    results: &'a BTreeMap<String, AnalysisResult>,
    slides: Vec<&'a SlideEntry>,
    outcomes: &'a [UnitOutcome],
    failures: Vec<FailureRecord<'a>>,
}

/// Writes `run_summary.json` into the context's output directory and records the
/// path in `export_log`. An existing summary is overwritten.
pub fn write_run_summary(
    ctx: &mut PipelineContext,
    report: &RunReport,
) -> Result<PathBuf, PipelineError> {
    let failures = report
        .failures
        .iter()
        .map(|failure| {
            let cause = failure.error.root_cause();
            FailureRecord {
                analysis: &failure.name,
                kind: cause.kind(),
                message: cause.to_string(),
                guidance: guidance(&failure.error),
                detail: cause.detail(),
            }
        })
        .collect();

    let summary = RunSummary {
        client_id: &ctx.client_id,
        client_name: &ctx.client_name,
        analysis_date: ctx.analysis_date.to_string(),
        run_id: report.run_id.to_string(),
        results: &report.results,
        slides: ctx.included_slides().collect(),
        outcomes: &report.outcomes,
        failures,
    };
    let json = serde_json::to_string_pretty(&summary)?;

    let output_dir = ctx.output_dir().to_path_buf();
    fs::create_dir_all(&output_dir).map_err(|e| {
        PipelineError::output(format!("cannot create {}: {e}", output_dir.display()))
            .with_detail("path", output_dir.display().to_string())
    })?;
    let path = output_dir.join(RUN_SUMMARY_FILE);
    fs::write(&path, json)?;

    tracing::info!(client = %ctx.client_id, path = %path.display(), "Run summary written.");
    ctx.export_log.push(path.clone());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{Registry, run};
    use serde_json::{Value, json};
    use tempfile::TempDir;

    #[test]
    fn test_client_output_dir_is_monthly() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(
            client_output_dir(Path::new("out"), "1453", date, "1453_jan"),
            PathBuf::from("out/1453/2025.03/1453_jan")
        );
        assert_ne!(
            client_output_dir(Path::new("out"), "1453", date, "1453_jan"),
            client_output_dir(Path::new("out"), "1453", date, "1453_feb")
        );
    }

    #[test]
    fn test_summary_records_results_and_guided_failures() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::builder("test")
            .add_fn("good", |ctx: &mut PipelineContext| {
                engine::add_slide(ctx, "good", serde_json::Map::new())?;
                Ok(Some(AnalysisResult::new("good").with_metadata("total", "12.5")))
            })
            .add_fn("bad", |_: &mut PipelineContext| {
                Err(PipelineError::data("amount column is blank").with_detail("column", "amount"))
            })
            .build()
            .unwrap();
        let mut ctx = PipelineContext::new()
            .with_client("1453", "Harbor CU")
            .with_output_dir(dir.path().join("1453"));

        let report = run(&mut ctx, &registry);
        let path = write_run_summary(&mut ctx, &report).unwrap();

        assert_eq!(ctx.export_log, vec![path.clone()]);
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["client_name"], json!("Harbor CU"));
        assert_eq!(written["run_id"], json!(ctx.run_id.to_string()));
        assert_eq!(written["results"]["good"]["metadata"]["total"], json!("12.5"));
        assert_eq!(written["slides"][0]["id"], json!("good"));
        assert_eq!(written["outcomes"][1]["status"], json!("failed"));

        let failure = &written["failures"][0];
        assert_eq!(failure["analysis"], json!("bad"));
        assert_eq!(failure["kind"], json!("data"));
        assert_eq!(failure["guidance"]["title"], json!("Data Problem"));
        assert_eq!(failure["detail"]["column"], json!("amount"));
    }

    #[test]
    fn test_rewrite_overwrites_summary() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::new("empty");
        let mut ctx = PipelineContext::new().with_output_dir(dir.path());

        let report = run(&mut ctx, &registry);
        let first = write_run_summary(&mut ctx, &report).unwrap();
        let second = write_run_summary(&mut ctx, &report).unwrap();

        assert_eq!(first, second);
        assert_eq!(ctx.export_log.len(), 2);
    }
}
