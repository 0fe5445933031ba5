use govlink_evidence::{Evidence, EvidenceKind, EvidenceStruct};
use serde_json::{Value, json};
use std::path::PathBuf;

fn fixture_records() -> Vec<Value> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("evidence_structs.json");
    let bytes = std::fs::read(&path).expect("fixture should be readable");
    serde_json::from_slice(&bytes).expect("fixture should be json")
}

#[test]
fn every_fixture_record_round_trips() {
    let records = fixture_records();
    assert_eq!(records.len(), 6);

    for record in records {
        let parsed: EvidenceStruct =
            serde_json::from_value(record.clone()).expect("record should parse");
        let evidence = Evidence::from_struct(parsed).expect("record should validate");
        let rendered = serde_json::to_value(evidence.to_struct()).expect("record should render");
        assert_eq!(rendered, record);
    }
}

#[test]
fn parsed_kinds_follow_wire_type() {
    let kinds: Vec<EvidenceKind> = fixture_records()
        .into_iter()
        .map(|record| {
            let parsed: EvidenceStruct = serde_json::from_value(record).expect("record");
            Evidence::from_struct(parsed).expect("evidence").kind()
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            EvidenceKind::Metric,
            EvidenceKind::StatisticTest,
            EvidenceKind::Table,
            EvidenceKind::ModelProfiler,
            EvidenceKind::DataProfiler,
            EvidenceKind::DeepchecksResult,
        ]
    );
}

#[test]
fn parsed_label_is_the_exported_label() {
    let record = fixture_records().remove(0);
    let parsed: EvidenceStruct = serde_json::from_value(record).expect("record");
    let evidence = Evidence::from_struct(parsed).expect("evidence");
    assert_eq!(
        serde_json::to_value(evidence.label()).expect("label"),
        json!({"metric_type": "false_positive_rate", "sensitive_feature": "gender"})
    );
}

#[test]
fn unknown_type_is_rejected_by_the_parser() {
    let record = json!({
        "type": "histogram",
        "label": {},
        "data": {},
        "generated_at": "2024-03-01T12:00:00Z",
        "metadata": {}
    });
    assert!(serde_json::from_value::<EvidenceStruct>(record).is_err());
}
