use crate::support::{parse_pairs_or_exit, print_json, register_or_exit, render_labels};
use govlink_ledger::LedgerConfig;
use serde_json::json;

pub fn run(config: LedgerConfig, plan: String, tags: Vec<String>, json_output: bool) {
    let tags = parse_pairs_or_exit("tag", &tags);
    let ledger = register_or_exit(config, &plan);
    let applicable = ledger.requirements_for(&tags);
    let Some(registration) = ledger.registration() else {
        eprintln!("error: {plan} did not register");
        std::process::exit(1);
    };

    if json_output {
        print_json(&json!({
            "use_case_id": registration.use_case_id,
            "policy_pack_id": registration.policy_pack_id,
            "artifact_tags": tags,
            "requirement_tags": ledger.requirement_tags(),
            "total": ledger.all_requirements().len(),
            "requirements": applicable,
        }));
    } else {
        println!(
            "govlink requirements {} ({})",
            registration.use_case_id, registration.policy_pack_id
        );
        println!("  Artifact tags: {}", render_labels(&tags));
        println!(
            "  Applicable: {}/{}",
            applicable.len(),
            ledger.all_requirements().len()
        );
        for requirement in &applicable {
            if requirement.tags().is_empty() {
                println!("    - {}", render_labels(requirement.label()));
            } else {
                println!(
                    "    - {} when {}",
                    render_labels(requirement.label()),
                    render_labels(requirement.tags())
                );
            }
        }
    }
}
