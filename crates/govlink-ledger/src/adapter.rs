//! Convenience layer for callers holding plain metric mappings or tables.

use crate::export::ArtifactDescriptor;
use crate::ledger::Ledger;
use govlink_evidence::{
    Datum, Evidence, EvidenceContainer, Labels, Metadata, Table, ValidationError,
};
use serde_json::Value;

/// Whether new evidence replaces or extends what the ledger holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

/// Packages raw results as evidence for one artifact.
pub struct Adapter<'l> {
    ledger: &'l mut Ledger,
}

impl<'l> Adapter<'l> {
    /// Bind to `ledger` and record `artifact` as its current artifact.
    pub fn new(ledger: &'l mut Ledger, artifact: ArtifactDescriptor) -> Self {
        ledger.set_artifacts(artifact);
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger {
        &*self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut *self.ledger
    }

    /// Metrics as a `{metric_type: value}` map or a metric table.
    /// Returns how many evidence items were written.
    pub fn metrics_to_ledger(
        &mut self,
        metrics: Datum,
        source: &str,
        labels: Labels,
        metadata: Metadata,
        mode: WriteMode,
    ) -> Result<usize, ValidationError> {
        let evidence = self.metrics_to_evidence(metrics, labels, self.metadata(metadata, source))?;
        Ok(self.write(evidence, mode))
    }

    /// A named table as one table evidence.
    pub fn table_to_ledger(
        &mut self,
        table: Table,
        source: &str,
        labels: Labels,
        metadata: Metadata,
        mode: WriteMode,
    ) -> Result<usize, ValidationError> {
        let container =
            EvidenceContainer::table(Datum::Table(table), labels, self.metadata(metadata, source))?;
        Ok(self.write(container.to_evidence(), mode))
    }

    /// Evidence of an already-built container, stamped with artifact
    /// metadata and `source`.
    pub fn container_to_ledger(
        &mut self,
        container: &EvidenceContainer,
        source: &str,
        mode: WriteMode,
    ) -> usize {
        let defaults = self.ledger.artifact_metadata();
        let mut stamp = Metadata::new();
        stamp.insert("source".to_string(), Value::String(source.to_string()));
        let evidence = container
            .to_evidence_with(&stamp)
            .into_iter()
            .map(|item| item.with_default_metadata(&defaults))
            .collect();
        self.write(evidence, mode)
    }

    /// Metric evidence without touching the ledger.
    pub fn metrics_to_evidence(
        &self,
        metrics: Datum,
        labels: Labels,
        metadata: Metadata,
    ) -> Result<Vec<Evidence>, ValidationError> {
        let table = match metrics {
            Datum::Map(map) => {
                let rows = map
                    .into_iter()
                    .map(|(name, value)| vec![Datum::Str(name), value])
                    .collect();
                Datum::Table(Table::from_rows(["type", "value"], rows)?)
            }
            table @ Datum::Table(_) => table,
            other => {
                return Err(ValidationError::WrongShape(format!(
                    "metrics must be a map or a table, got {}",
                    other.type_name()
                )));
            }
        };
        Ok(EvidenceContainer::metric(table, labels, metadata)?.to_evidence())
    }

    /// Artifact metadata, then caller metadata, then `source`.
    fn metadata(&self, caller: Metadata, source: &str) -> Metadata {
        let mut metadata = self.ledger.artifact_metadata();
        metadata.extend(caller);
        metadata.insert("source".to_string(), Value::String(source.to_string()));
        metadata
    }

    fn write(&mut self, evidence: Vec<Evidence>, mode: WriteMode) -> usize {
        let count = evidence.len();
        match mode {
            WriteMode::Overwrite => self.ledger.set_evidence(evidence),
            WriteMode::Append => self.ledger.add_evidence(evidence),
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::sink::NoopSink;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn ledger() -> Ledger {
        Ledger::with_sink(LedgerConfig::default(), Arc::new(NoopSink))
    }

    fn metrics() -> Datum {
        let mut map = BTreeMap::new();
        map.insert("precision".to_string(), Datum::Float(0.5));
        map.insert("recall".to_string(), Datum::Float(0.4));
        Datum::Map(map)
    }

    fn labels_of(evidence: &[Evidence]) -> Vec<Value> {
        evidence
            .iter()
            .map(|e| serde_json::to_value(e.label()).expect("label"))
            .collect()
    }

    #[test]
    fn metric_map_becomes_one_evidence_per_key() {
        let mut ledger = ledger();
        let adapter = Adapter::new(&mut ledger, ArtifactDescriptor::new("model"));
        let evidence = adapter
            .metrics_to_evidence(metrics(), Labels::new(), Metadata::new())
            .expect("metrics");
        assert_eq!(
            labels_of(&evidence),
            vec![
                json!({"metric_type": "precision"}),
                json!({"metric_type": "recall"}),
            ]
        );
    }

    #[test]
    fn extra_labels_reach_every_metric() {
        let mut ledger = ledger();
        let adapter = Adapter::new(&mut ledger, ArtifactDescriptor::new("model"));
        let mut labels = Labels::new();
        labels.insert("test".to_string(), json!("test"));
        let evidence = adapter
            .metrics_to_evidence(metrics(), labels, Metadata::new())
            .expect("metrics");
        assert_eq!(
            labels_of(&evidence),
            vec![
                json!({"metric_type": "precision", "test": "test"}),
                json!({"metric_type": "recall", "test": "test"}),
            ]
        );
    }

    #[test]
    fn metadata_carries_artifact_and_source() {
        let mut ledger = ledger();
        let mut adapter = Adapter::new(
            &mut ledger,
            ArtifactDescriptor::new("credit_model").with_assessment_dataset("holdout"),
        );
        let mut caller = Metadata::new();
        caller.insert("run".to_string(), json!(3));
        let written = adapter
            .metrics_to_ledger(metrics(), "lens", Labels::new(), caller, WriteMode::Overwrite)
            .expect("metrics");
        assert_eq!(written, 2);

        let metadata = adapter.ledger().evidence()[0].metadata().clone();
        assert_eq!(metadata["model_name"], json!("credit_model"));
        assert_eq!(metadata["assessment_dataset_name"], json!("holdout"));
        assert_eq!(metadata["source"], json!("lens"));
        assert_eq!(metadata["run"], json!(3));
    }

    #[test]
    fn write_mode_selects_set_or_add() {
        let mut ledger = ledger();
        let mut adapter = Adapter::new(&mut ledger, ArtifactDescriptor::new("model"));
        adapter
            .metrics_to_ledger(metrics(), "a", Labels::new(), Metadata::new(), WriteMode::Overwrite)
            .expect("first");
        adapter
            .metrics_to_ledger(metrics(), "b", Labels::new(), Metadata::new(), WriteMode::Append)
            .expect("append");
        assert_eq!(adapter.ledger().evidence().len(), 4);
        adapter
            .metrics_to_ledger(metrics(), "c", Labels::new(), Metadata::new(), WriteMode::Overwrite)
            .expect("overwrite");
        assert_eq!(adapter.ledger().evidence().len(), 2);
    }

    #[test]
    fn scalar_metrics_are_the_wrong_shape() {
        let mut ledger = ledger();
        let adapter = Adapter::new(&mut ledger, ArtifactDescriptor::new("model"));
        let err = adapter
            .metrics_to_evidence(Datum::Float(0.5), Labels::new(), Metadata::new())
            .expect_err("scalar");
        assert!(matches!(err, ValidationError::WrongShape(_)));
    }

    #[test]
    fn named_table_is_one_evidence() {
        let mut ledger = ledger();
        let mut adapter = Adapter::new(&mut ledger, ArtifactDescriptor::new("model"));
        let table = Table::from_rows(["fpr", "tpr"], vec![vec![0.0.into(), 0.5.into()]])
            .expect("table")
            .named("roc_curve");
        let written = adapter
            .table_to_ledger(table, "lens", Labels::new(), Metadata::new(), WriteMode::Append)
            .expect("table");
        assert_eq!(written, 1);
        assert_eq!(
            adapter.ledger().evidence()[0].label()["table_name"],
            json!("roc_curve")
        );
    }

    #[test]
    fn container_metadata_beats_artifact_defaults() {
        let mut ledger = ledger();
        let mut adapter = Adapter::new(&mut ledger, ArtifactDescriptor::new("model"));
        let mut metadata = Metadata::new();
        metadata.insert("model_name".to_string(), json!("override"));
        let container = EvidenceContainer::metric(
            Table::from_rows(["type", "value"], vec![vec!["auc".into(), 0.9.into()]])
                .expect("table")
                .into(),
            Labels::new(),
            metadata,
        )
        .expect("container");
        assert_eq!(adapter.container_to_ledger(&container, "lens", WriteMode::Append), 1);
        let stored = adapter.ledger().evidence()[0].metadata().clone();
        assert_eq!(stored["model_name"], json!("override"));
        assert_eq!(stored["source"], json!("lens"));
    }
}
