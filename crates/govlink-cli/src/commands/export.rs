use crate::support::{
    describe_status, load_export_or_exit, outcome_json, parse_pairs_or_exit, print_json,
    print_report, register_or_exit,
};
use govlink_ledger::{ArtifactDescriptor, ExportDestination, LedgerConfig};
use std::path::PathBuf;

pub struct Args {
    pub plan: String,
    pub evidence: String,
    pub out: String,
    pub model: Option<String>,
    pub tags: Vec<String>,
    pub json: bool,
}

pub fn run(config: LedgerConfig, args: Args) {
    let tags = parse_pairs_or_exit("tag", &args.tags);
    let mut ledger = register_or_exit(config, &args.plan);
    let (artifact, items) = load_export_or_exit(&args.evidence);

    let artifact = match (args.model, artifact) {
        (Some(model), _) => Some(ArtifactDescriptor::new(model).with_tags(tags)),
        (None, Some(artifact)) if tags.is_empty() => Some(artifact),
        (None, Some(artifact)) => Some(artifact.with_tags(tags)),
        (None, None) => None,
    };
    if let Some(artifact) = artifact {
        ledger.set_artifacts(artifact);
    }
    ledger.set_evidence(items);

    let out = PathBuf::from(args.out);
    let outcome = ledger.export(ExportDestination::File(out.clone()));

    if args.json {
        print_json(&outcome_json(&outcome, &out));
    } else {
        println!("govlink export {}", args.plan);
        println!("  Status: {}", describe_status(&outcome.status));
        if let Some(report) = &outcome.report {
            print_report(report);
        }
    }

    if !outcome.succeeded() {
        std::process::exit(1);
    }
}
