use crate::support::{
    load_export_or_exit, parse_pairs_or_exit, print_json, print_report, register_or_exit,
    render_labels,
};
use govlink_ledger::{ArtifactDescriptor, LedgerConfig};
use serde_json::json;

pub fn run(
    config: LedgerConfig,
    plan: String,
    evidence: String,
    tags: Vec<String>,
    json_output: bool,
) {
    let tags = parse_pairs_or_exit("tag", &tags);
    let mut ledger = register_or_exit(config, &plan);
    let (artifact, items) = load_export_or_exit(&evidence);
    let count = items.len();

    // Tags given on the command line replace the export file's.
    match artifact {
        Some(artifact) if tags.is_empty() => ledger.set_artifacts(artifact),
        Some(artifact) => ledger.set_artifacts(artifact.with_tags(tags)),
        None if !tags.is_empty() => {
            ledger.set_artifacts(ArtifactDescriptor::new("unnamed").with_tags(tags))
        }
        None => {}
    }
    ledger.set_evidence(items);
    let report = ledger.check();
    let artifact_tags = ledger.artifact_tags();

    if json_output {
        print_json(&json!({
            "plan": plan,
            "evidence_path": evidence,
            "evidence_count": count,
            "artifact_tags": artifact_tags,
            "satisfied": report.satisfied(),
            "missing": report.missing(),
            "report": report,
        }));
    } else {
        println!("govlink check {plan}");
        println!("  Evidence: {evidence} ({count} items)");
        println!("  Artifact tags: {}", render_labels(&artifact_tags));
        print_report(&report);
    }

    if !report.satisfied() {
        std::process::exit(1);
    }
}
