use crate::support::{
    describe_status, load_metrics_or_exit, outcome_json, parse_pairs_or_exit, print_json,
    print_report, register_or_exit,
};
use govlink_evidence::Metadata;
use govlink_ledger::{Adapter, ArtifactDescriptor, ExportDestination, LedgerConfig, WriteMode};
use std::path::PathBuf;

pub struct Args {
    pub plan: String,
    pub metrics: String,
    pub model: String,
    pub source: String,
    pub out: String,
    pub tags: Vec<String>,
    pub labels: Vec<String>,
    pub json: bool,
}

pub fn run(config: LedgerConfig, args: Args) {
    let tags = parse_pairs_or_exit("tag", &args.tags);
    let labels = parse_pairs_or_exit("label", &args.labels);
    let metrics = load_metrics_or_exit(&args.metrics);
    let mut ledger = register_or_exit(config, &args.plan);

    let written = {
        let mut adapter =
            Adapter::new(&mut ledger, ArtifactDescriptor::new(args.model).with_tags(tags));
        adapter
            .metrics_to_ledger(
                metrics,
                &args.source,
                labels,
                Metadata::new(),
                WriteMode::Overwrite,
            )
            .unwrap_or_else(|e| {
                eprintln!("error: invalid metrics in {}: {e}", args.metrics);
                std::process::exit(1);
            })
    };

    let out = PathBuf::from(args.out);
    let outcome = ledger.export(ExportDestination::File(out.clone()));

    if args.json {
        let mut payload = outcome_json(&outcome, &out);
        payload["evidence_count"] = written.into();
        print_json(&payload);
    } else {
        println!("govlink metrics {}", args.metrics);
        println!("  Evidence: {written} items from {}", args.source);
        println!("  Status: {}", describe_status(&outcome.status));
        if let Some(report) = &outcome.report {
            print_report(report);
        }
    }

    if !outcome.succeeded() {
        std::process::exit(1);
    }
}
