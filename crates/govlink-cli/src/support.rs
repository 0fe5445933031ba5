use govlink_evidence::{Datum, Evidence, Labels};
use govlink_ledger::{
    ArtifactDescriptor, ExportOutcome, ExportStatus, Ledger, LedgerConfig, MatchOutcome,
    MatchReport, RequirementPlan, read_export_file,
};
use serde_json::Value;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to stderr so `--json` stdout stays parseable.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

pub fn load_config_or_exit(path: Option<&str>) -> LedgerConfig {
    let Some(path) = path else {
        return LedgerConfig::default();
    };
    let config = LedgerConfig::load(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    tracing::debug!(path, client = %config.client_name, "loaded config");
    config
}

/// `key=value` pairs as string-valued labels.
pub fn parse_pairs_or_exit(flag: &str, pairs: &[String]) -> Labels {
    let mut labels = Labels::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            eprintln!("error: --{flag} expects key=value, got `{pair}`");
            std::process::exit(1);
        };
        let key = key.trim();
        if key.is_empty() {
            eprintln!("error: --{flag} has an empty key in `{pair}`");
            std::process::exit(1);
        }
        labels.insert(key.to_string(), Value::String(value.trim().to_string()));
    }
    labels
}

/// A ledger registered against the plan file at `plan`.
pub fn register_or_exit(config: LedgerConfig, plan: &str) -> Ledger {
    let plan = RequirementPlan::load(plan).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    let mut ledger = Ledger::new(config);
    ledger.register_plan(plan);
    ledger
}

/// Artifact and evidence carried by an export file.
pub fn load_export_or_exit(path: &str) -> (Option<ArtifactDescriptor>, Vec<Evidence>) {
    let file = read_export_file(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    let evidence = file.data.to_evidence().unwrap_or_else(|e| {
        eprintln!("error: invalid evidence in {path}: {e}");
        std::process::exit(1);
    });
    let artifact = file
        .data
        .models
        .and_then(|models| models.into_iter().next());
    (artifact, evidence)
}

pub fn load_metrics_or_exit(path: &str) -> Datum {
    let bytes = std::fs::read(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read {path}: {e}");
        std::process::exit(1);
    });
    let value: Value = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        eprintln!("error: failed to parse {path}: {e}");
        std::process::exit(1);
    });
    Datum::from_json(&value)
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

pub fn render_labels(labels: &Labels) -> String {
    if labels.is_empty() {
        return "{}".to_string();
    }
    let pairs: Vec<String> = labels
        .iter()
        .map(|(key, value)| match value {
            Value::String(text) => format!("{key}={text}"),
            other => format!("{key}={other}"),
        })
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

pub fn print_report(report: &MatchReport) {
    println!(
        "  Satisfied: {}",
        if report.satisfied() { "yes" } else { "no" }
    );
    println!(
        "  Matched: {}/{}",
        report.matched_count(),
        report.outcomes().len()
    );
    for outcome in report.outcomes() {
        let state = match outcome {
            MatchOutcome::Matched { .. } => "matched",
            MatchOutcome::Missing { .. } => "missing",
            MatchOutcome::Ambiguous { .. } => "ambiguous",
        };
        println!("    - {state}: {}", render_labels(outcome.requirement()));
    }
}

pub fn describe_status(status: &ExportStatus) -> String {
    match status {
        ExportStatus::NotReady(reason) => format!("not ready ({reason})"),
        ExportStatus::Written { path } => format!("written to {}", path.display()),
        ExportStatus::Uploaded { job_id } => format!("uploaded (job {job_id})"),
        ExportStatus::JobFailed { job_id, .. } => format!("job {job_id} failed"),
        ExportStatus::TimedOut { job_id, waited } => {
            format!("job {job_id} timed out after {}s", waited.as_secs())
        }
        ExportStatus::DeliveryFailed(reason) => format!("delivery failed: {reason}"),
    }
}

pub fn outcome_json(outcome: &ExportOutcome, out: &Path) -> Value {
    serde_json::json!({
        "out": out.display().to_string(),
        "status": describe_status(&outcome.status),
        "delivered": outcome.status.delivered(),
        "succeeded": outcome.succeeded(),
        "report": outcome.report,
    })
}
