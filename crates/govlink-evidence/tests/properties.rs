//! Property tests for sanitizing and metric expansion.

use govlink_evidence::*;
use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_float() -> impl Strategy<Value = f64> {
    prop_oneof![
        1 => Just(f64::NAN),
        4 => -1.0e6..1.0e6f64,
    ]
}

fn arb_table() -> impl Strategy<Value = Table> {
    (1usize..4).prop_flat_map(|width| {
        prop::collection::vec(
            prop::collection::vec(arb_float().prop_map(Datum::Float), width),
            0..5,
        )
        .prop_map(move |rows| {
            Table::from_rows((0..width).map(|i| format!("c{i}")), rows)
                .expect("rows have the declared width")
                .named("generated")
        })
    })
}

fn arb_leaf() -> impl Strategy<Value = Datum> {
    prop_oneof![
        Just(Datum::Null),
        any::<bool>().prop_map(Datum::Bool),
        any::<i64>().prop_map(Datum::Int),
        arb_float().prop_map(Datum::Float),
        "[a-z]{0,6}".prop_map(Datum::Str),
        prop::collection::vec(prop::option::of(arb_float()), 0..5).prop_map(Datum::Array),
        arb_table().prop_map(Datum::Table),
    ]
}

fn arb_datum() -> impl Strategy<Value = Datum> {
    arb_leaf().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Datum::List),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4).prop_map(Datum::Map),
        ]
    })
}

fn arb_metrics() -> impl Strategy<Value = BTreeMap<String, f64>> {
    prop::collection::btree_map("[a-z_]{3,12}", arb_float(), 1..8)
}

fn metric_table(metrics: &BTreeMap<String, f64>) -> Datum {
    let rows = metrics
        .iter()
        .map(|(name, value)| vec![Datum::from(name.as_str()), Datum::Float(*value)])
        .collect();
    Table::from_rows(["type", "value"], rows)
        .expect("two cells per row")
        .into()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Sanitizing twice is the same as sanitizing once.
    #[test]
    fn sanitize_is_idempotent(raw in arb_datum()) {
        let once = sanitize(&raw);
        prop_assert!(is_sanitized(&once));
        prop_assert_eq!(sanitize(&once), once);
    }

    /// Sanitizing keeps the variant of the value it was given.
    #[test]
    fn sanitize_preserves_container_type(raw in arb_datum()) {
        let clean = sanitize(&raw);
        if raw.is_nan() {
            prop_assert!(clean.is_null());
        } else {
            prop_assert_eq!(clean.type_name(), raw.type_name());
        }
    }

    /// A metric mapping expands to one evidence per key, NaN becoming null.
    #[test]
    fn metric_mapping_expands_per_key(metrics in arb_metrics()) {
        let container = EvidenceContainer::metric(
            metric_table(&metrics),
            Labels::new(),
            Metadata::new(),
        )
        .expect("metric table validates");
        let evidence = container.to_evidence();
        prop_assert_eq!(evidence.len(), metrics.len());

        for (item, (name, value)) in evidence.iter().zip(metrics.iter()) {
            prop_assert_eq!(item.kind(), EvidenceKind::Metric);
            prop_assert_eq!(&item.label()["metric_type"], &Value::String(name.clone()));
            let data = item.data();
            if value.is_nan() {
                prop_assert_eq!(&data["value"], &Value::Null);
            } else {
                prop_assert_eq!(data["value"].as_f64(), Some(*value));
            }
        }
    }

    /// Significance flips exactly at the threshold.
    #[test]
    fn significance_matches_threshold(threshold in 0.0..1.0f64, p_value in 0.0..1.0f64) {
        let result = StatisticTestResult {
            statistic_type: "generated".to_string(),
            test_statistic: None,
            significance_threshold: threshold,
            p_value,
        };
        prop_assert_eq!(result.significant(), p_value <= threshold);
        let at_boundary = StatisticTestResult { p_value: threshold, ..result };
        prop_assert!(at_boundary.significant());
    }
}
