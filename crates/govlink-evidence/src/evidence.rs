//! Evidence: one governance-relevant fact, typed and labeled.
//!
//! The label is a two-stage value. `computed_label` is a pure function of
//! the payload and the caller's additional labels; `assigned_label` is set
//! only by requirement matching, and `label()` prefers it when present.

use crate::datum::{Column, ColumnType, Datum, Table};
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Identifying key/value pairs of evidence or required by a requirement.
pub type Labels = BTreeMap<String, Value>;

/// Free-form metadata attached to evidence.
pub type Metadata = BTreeMap<String, Value>;

/// Wire discriminator of an evidence record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Metric,
    StatisticTest,
    Table,
    ModelProfiler,
    DataProfiler,
    DeepchecksResult,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Metric => "metric",
            EvidenceKind::StatisticTest => "statistic_test",
            EvidenceKind::Table => "table",
            EvidenceKind::ModelProfiler => "model_profiler",
            EvidenceKind::DataProfiler => "data_profiler",
            EvidenceKind::DeepchecksResult => "deepchecks_result",
        }
    }

    /// Base-label key that carries the payload's identifying name.
    fn name_key(self) -> Option<&'static str> {
        match self {
            EvidenceKind::Metric => Some("metric_type"),
            EvidenceKind::StatisticTest => Some("statistic_type"),
            EvidenceKind::Table => Some("table_name"),
            EvidenceKind::DeepchecksResult => Some("suite_result_name"),
            EvidenceKind::ModelProfiler | EvidenceKind::DataProfiler => None,
        }
    }
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar metric with an optional confidence interval.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub metric_type: String,
    pub value: Option<f64>,
    pub confidence_interval: Option<(f64, f64)>,
    pub confidence_level: Option<f64>,
}

impl MetricResult {
    pub fn new(metric_type: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            metric_type: metric_type.into(),
            value,
            confidence_interval: None,
            confidence_level: None,
        }
    }

    pub fn with_confidence(mut self, interval: (f64, f64), level: Option<f64>) -> Self {
        self.confidence_interval = Some(interval);
        self.confidence_level = level;
        self
    }
}

/// A statistical test outcome. Significance is derived, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticTestResult {
    pub statistic_type: String,
    pub test_statistic: Option<f64>,
    pub significance_threshold: f64,
    pub p_value: f64,
}

impl StatisticTestResult {
    pub fn significant(&self) -> bool {
        self.p_value <= self.significance_threshold
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableResult {
    pub name: String,
    pub table: Table,
}

/// Model profiler output keyed by the profile's row index.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    pub entries: BTreeMap<String, Datum>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataProfile {
    pub description: Datum,
}

/// A validation-suite result rendered to JSON by its integration.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub name: String,
    pub report: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvidencePayload {
    Metric(MetricResult),
    StatisticTest(StatisticTestResult),
    Table(TableResult),
    ModelProfiler(ModelProfile),
    DataProfiler(DataProfile),
    DeepchecksResult(SuiteReport),
}

impl EvidencePayload {
    pub fn kind(&self) -> EvidenceKind {
        match self {
            EvidencePayload::Metric(_) => EvidenceKind::Metric,
            EvidencePayload::StatisticTest(_) => EvidenceKind::StatisticTest,
            EvidencePayload::Table(_) => EvidenceKind::Table,
            EvidencePayload::ModelProfiler(_) => EvidenceKind::ModelProfiler,
            EvidencePayload::DataProfiler(_) => EvidenceKind::DataProfiler,
            EvidencePayload::DeepchecksResult(_) => EvidenceKind::DeepchecksResult,
        }
    }

    /// Kind-specific identifying label.
    pub fn base_label(&self) -> Labels {
        let (key, value) = match self {
            EvidencePayload::Metric(m) => ("metric_type", m.metric_type.as_str()),
            EvidencePayload::StatisticTest(t) => ("statistic_type", t.statistic_type.as_str()),
            EvidencePayload::Table(t) => ("table_name", t.name.as_str()),
            EvidencePayload::ModelProfiler(_) => ("profiler_type", "model"),
            EvidencePayload::DataProfiler(_) => ("profiler_type", "data"),
            EvidencePayload::DeepchecksResult(s) => ("suite_result_name", s.name.as_str()),
        };
        let mut label = Labels::new();
        label.insert(key.to_string(), Value::String(value.to_string()));
        label
    }

    /// Kind-specific JSON payload.
    pub fn data(&self) -> Value {
        match self {
            EvidencePayload::Metric(m) => json!({
                "confidence_interval": m.confidence_interval.map(|(lo, hi)| vec![lo, hi]),
                "confidence_level": m.confidence_level,
                "value": m.value,
            }),
            EvidencePayload::StatisticTest(t) => json!({
                "p_value": t.p_value,
                "significance_threshold": t.significance_threshold,
                "significant": t.significant(),
                "test_statistic": t.test_statistic,
            }),
            EvidencePayload::Table(t) => {
                let columns: Vec<Value> = t
                    .table
                    .columns()
                    .iter()
                    .map(|c| json!({"type": c.dtype.wire_name(), "value": c.name}))
                    .collect();
                let rows: Vec<Value> = t
                    .table
                    .rows()
                    .iter()
                    .map(|row| Value::Array(row.iter().map(Datum::to_json).collect()))
                    .collect();
                json!({"columns": columns, "value": rows})
            }
            EvidencePayload::ModelProfiler(p) => Value::Object(
                p.entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            EvidencePayload::DataProfiler(p) => p.description.to_json(),
            EvidencePayload::DeepchecksResult(s) => s.report.clone(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            EvidencePayload::Metric(m) if m.metric_type.trim().is_empty() => {
                Err(ValidationError::invalid("type", "must be a non-empty string"))
            }
            EvidencePayload::StatisticTest(t) if t.statistic_type.trim().is_empty() => Err(
                ValidationError::invalid("statistic_type", "must be a non-empty string"),
            ),
            _ => self.validate_values(),
        }
    }

    /// Checks that do not depend on the identifying name.
    fn validate_values(&self) -> Result<(), ValidationError> {
        match self {
            EvidencePayload::Metric(m)
                if m.confidence_interval.is_some() && m.confidence_level.is_none() =>
            {
                Err(ValidationError::MissingConfidenceLevel {
                    metric_type: m.metric_type.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// One unit of governance evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    payload: EvidencePayload,
    additional_labels: Labels,
    assigned_label: Option<Labels>,
    metadata: Metadata,
    generated_at: DateTime<Utc>,
}

impl Evidence {
    /// Validate `payload` and stamp it with the current UTC time.
    pub fn new(
        payload: EvidencePayload,
        additional_labels: Labels,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        payload.validate()?;
        Ok(Self::from_validated(payload, additional_labels, metadata))
    }

    pub(crate) fn from_validated(
        payload: EvidencePayload,
        additional_labels: Labels,
        metadata: Metadata,
    ) -> Self {
        Self {
            payload,
            additional_labels,
            assigned_label: None,
            metadata,
            generated_at: Utc::now(),
        }
    }

    pub(crate) fn check_payload(payload: &EvidencePayload) -> Result<(), ValidationError> {
        payload.validate()
    }

    /// Override the creation timestamp (fixtures, parsed exports).
    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn kind(&self) -> EvidenceKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &EvidencePayload {
        &self.payload
    }

    pub fn base_label(&self) -> Labels {
        self.payload.base_label()
    }

    pub fn additional_labels(&self) -> &Labels {
        &self.additional_labels
    }

    /// Base label merged with additional labels; additional labels win.
    pub fn computed_label(&self) -> Labels {
        let mut label = self.base_label();
        label.extend(
            self.additional_labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        label
    }

    /// The effective label: the matcher's assignment, else the computed label.
    pub fn label(&self) -> Labels {
        match &self.assigned_label {
            Some(label) => label.clone(),
            None => self.computed_label(),
        }
    }

    pub fn assigned_label(&self) -> Option<&Labels> {
        self.assigned_label.as_ref()
    }

    /// Replace the effective label with the exact requirement label it
    /// satisfied.
    pub fn assign_label(&mut self, label: Labels) {
        self.assigned_label = Some(label);
    }

    pub fn data(&self) -> Value {
        self.payload.data()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Fill in metadata keys this evidence does not carry yet.
    pub fn with_default_metadata(mut self, defaults: &Metadata) -> Self {
        for (key, value) in defaults {
            self.metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn to_struct(&self) -> EvidenceStruct {
        self.to_struct_with(&Metadata::new())
    }

    /// Wire record with `overrides` merged over the evidence metadata.
    pub fn to_struct_with(&self, overrides: &Metadata) -> EvidenceStruct {
        let mut metadata = self.metadata.clone();
        metadata.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        EvidenceStruct {
            kind: self.kind(),
            label: self.label(),
            data: self.data(),
            generated_at: self.generated_at,
            metadata,
        }
    }

    /// Rebuild evidence from its wire record.
    ///
    /// The record's label becomes the additional labels, so the parsed
    /// evidence reports exactly the exported label. A matched record may
    /// carry a requirement label without the name key (`table_name`,
    /// `metric_type`, ...); the payload name is then empty and the record's
    /// label is kept as the assigned label.
    pub fn from_struct(record: EvidenceStruct) -> Result<Self, ValidationError> {
        let payload = decode_payload(record.kind, &record.label, &record.data)?;
        let named = record
            .kind
            .name_key()
            .is_none_or(|key| record.label.contains_key(key));
        if named {
            payload.validate()?;
        } else {
            payload.validate_values()?;
        }
        let mut evidence =
            Evidence::from_validated(payload, record.label.clone(), record.metadata)
                .with_generated_at(record.generated_at);
        if !named {
            evidence.assign_label(record.label);
        }
        Ok(evidence)
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string_pretty(&self.to_struct()).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// Serialized form of one evidence item in the export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceStruct {
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    pub label: Labels,
    pub data: Value,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Name carried under `key`, empty when the label omits it.
fn label_name(label: &Labels, key: &str) -> Result<String, ValidationError> {
    match label.get(key) {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::invalid(
            key,
            format!("expected string label, got {other}"),
        )),
    }
}

fn data_number(data: &Value, key: &str) -> Result<Option<f64>, ValidationError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(ValidationError::invalid(
            key,
            format!("expected number or null, got {other}"),
        )),
    }
}

fn required_number(data: &Value, key: &str) -> Result<f64, ValidationError> {
    data_number(data, key)?
        .ok_or_else(|| ValidationError::invalid(key, "a number is required"))
}

fn decode_payload(
    kind: EvidenceKind,
    label: &Labels,
    data: &Value,
) -> Result<EvidencePayload, ValidationError> {
    let payload = match kind {
        EvidenceKind::Metric => {
            let interval = match data.get("confidence_interval") {
                None | Some(Value::Null) => None,
                Some(Value::Array(bounds)) if bounds.len() == 2 => {
                    match (bounds[0].as_f64(), bounds[1].as_f64()) {
                        (Some(lo), Some(hi)) => Some((lo, hi)),
                        _ => {
                            return Err(ValidationError::invalid(
                                "confidence_interval",
                                "bounds must be numbers",
                            ));
                        }
                    }
                }
                Some(other) => {
                    return Err(ValidationError::invalid(
                        "confidence_interval",
                        format!("expected [lower, upper], got {other}"),
                    ));
                }
            };
            EvidencePayload::Metric(MetricResult {
                metric_type: label_name(label, "metric_type")?,
                value: data_number(data, "value")?,
                confidence_interval: interval,
                confidence_level: data_number(data, "confidence_level")?,
            })
        }
        EvidenceKind::StatisticTest => EvidencePayload::StatisticTest(StatisticTestResult {
            statistic_type: label_name(label, "statistic_type")?,
            test_statistic: data_number(data, "test_statistic")?,
            significance_threshold: required_number(data, "significance_threshold")?,
            p_value: required_number(data, "p_value")?,
        }),
        EvidenceKind::Table => {
            let name = label_name(label, "table_name")?;
            let columns = data
                .get("columns")
                .and_then(Value::as_array)
                .ok_or_else(|| ValidationError::invalid("columns", "must be a list"))?
                .iter()
                .enumerate()
                .map(|(idx, column)| {
                    let name = column.get("value").and_then(Value::as_str);
                    let dtype = column.get("type").and_then(Value::as_str);
                    match (name, dtype) {
                        (Some(name), Some(dtype)) => Ok(Column {
                            name: name.to_string(),
                            dtype: ColumnType::from_wire_name(dtype),
                        }),
                        _ => Err(ValidationError::invalid(
                            format!("columns[{idx}]"),
                            "must carry string 'value' and 'type'",
                        )),
                    }
                })
                .collect::<Result<Vec<Column>, ValidationError>>()?;
            let rows = data
                .get("value")
                .and_then(Value::as_array)
                .ok_or_else(|| ValidationError::invalid("value", "must be a list of rows"))?
                .iter()
                .enumerate()
                .map(|(idx, row)| {
                    row.as_array()
                        .map(|cells| cells.iter().map(Datum::from_json).collect())
                        .ok_or_else(|| {
                            ValidationError::invalid(format!("value[{idx}]"), "row must be a list")
                        })
                })
                .collect::<Result<Vec<Vec<Datum>>, ValidationError>>()?;
            EvidencePayload::Table(TableResult {
                table: Table::with_columns(columns, rows)?.named(name.clone()),
                name,
            })
        }
        EvidenceKind::ModelProfiler => {
            let entries = data
                .as_object()
                .ok_or_else(|| ValidationError::invalid("data", "model profile must be a map"))?
                .iter()
                .map(|(k, v)| (k.clone(), Datum::from_json(v)))
                .collect();
            EvidencePayload::ModelProfiler(ModelProfile { entries })
        }
        EvidenceKind::DataProfiler => EvidencePayload::DataProfiler(DataProfile {
            description: Datum::from_json(data),
        }),
        EvidenceKind::DeepchecksResult => EvidencePayload::DeepchecksResult(SuiteReport {
            name: label_name(label, "suite_result_name")?,
            report: data.clone(),
        }),
    };
    Ok(payload)
}
