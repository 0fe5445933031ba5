//! Containers turn one raw evaluator output into evidence.
//!
//! Construction runs shape validation, schema validation, sanitization and
//! row decoding in that order. A container that exists has already decoded
//! every payload, so expansion cannot fail.

use crate::datum::{Datum, Table};
use crate::error::ValidationError;
use crate::evidence::{
    DataProfile, Evidence, EvidencePayload, Labels, Metadata, MetricResult, ModelProfile,
    StatisticTestResult, TableResult,
};
use crate::sanitize::{sanitize, sanitize_table};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Metric,
    StatisticTest,
    Table,
    ModelProfiler,
    DataProfiler,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Metric => "metric",
            ContainerKind::StatisticTest => "statistic_test",
            ContainerKind::Table => "table",
            ContainerKind::ModelProfiler => "model_profiler",
            ContainerKind::DataProfiler => "data_profiler",
        }
    }

    /// Row-wise kinds yield one evidence per row; the rest wrap the whole input.
    pub fn is_row_wise(&self) -> bool {
        matches!(self, ContainerKind::Metric | ContainerKind::StatisticTest)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed column list of a row-wise container.
struct RowSchema {
    required: &'static [&'static str],
    optional: &'static [&'static str],
}

const METRIC_SCHEMA: RowSchema = RowSchema {
    required: &["type", "value"],
    optional: &["confidence_interval", "confidence_level"],
};

const STATISTIC_TEST_SCHEMA: RowSchema = RowSchema {
    required: &[
        "statistic_type",
        "test_statistic",
        "significance_threshold",
        "p_value",
        "significant",
    ],
    optional: &[],
};

/// Column holding model profiler results.
pub const MODEL_PROFILER_COLUMN: &str = "results";

/// Index keys every model profile must carry.
pub const MODEL_PROFILER_KEYS: &[&str] = &["parameters", "model_name"];

#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceContainer {
    kind: ContainerKind,
    payloads: Vec<EvidencePayload>,
    labels: Labels,
    metadata: Metadata,
}

impl EvidenceContainer {
    /// Validate, sanitize and decode `raw` as evidence of `kind`.
    pub fn new(
        kind: ContainerKind,
        raw: Datum,
        labels: Labels,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        let payloads = match kind {
            ContainerKind::Metric => {
                let table = expect_table(kind, raw)?;
                check_columns(kind, &table, &METRIC_SCHEMA)?;
                decode_rows(&sanitize_table(&table), decode_metric)?
            }
            ContainerKind::StatisticTest => {
                let table = expect_table(kind, raw)?;
                check_columns(kind, &table, &STATISTIC_TEST_SCHEMA)?;
                decode_rows(&sanitize_table(&table), decode_statistic_test)?
            }
            ContainerKind::Table => {
                let table = expect_table(kind, raw)?;
                let Some(name) = table.name().map(str::to_string) else {
                    return Err(ValidationError::MissingFields {
                        container: kind.as_str(),
                        what: "attributes",
                        missing: vec!["name".to_string()],
                    });
                };
                vec![EvidencePayload::Table(TableResult {
                    name,
                    table: sanitize_table(&table),
                })]
            }
            ContainerKind::ModelProfiler => {
                let table = expect_table(kind, raw)?;
                vec![decode_model_profile(&table)?]
            }
            ContainerKind::DataProfiler => {
                if !matches!(raw, Datum::Map(_)) {
                    return Err(ValidationError::WrongShape(format!(
                        "data_profiler description must be a map, got {}",
                        raw.type_name()
                    )));
                }
                vec![EvidencePayload::DataProfiler(DataProfile {
                    description: sanitize(&raw),
                })]
            }
        };
        for payload in &payloads {
            Evidence::check_payload(payload)?;
        }
        Ok(Self {
            kind,
            payloads,
            labels,
            metadata,
        })
    }

    pub fn metric(raw: Datum, labels: Labels, metadata: Metadata) -> Result<Self, ValidationError> {
        Self::new(ContainerKind::Metric, raw, labels, metadata)
    }

    pub fn statistic_test(
        raw: Datum,
        labels: Labels,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        Self::new(ContainerKind::StatisticTest, raw, labels, metadata)
    }

    pub fn table(raw: Datum, labels: Labels, metadata: Metadata) -> Result<Self, ValidationError> {
        Self::new(ContainerKind::Table, raw, labels, metadata)
    }

    pub fn model_profiler(
        raw: Datum,
        labels: Labels,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        Self::new(ContainerKind::ModelProfiler, raw, labels, metadata)
    }

    pub(crate) fn from_payloads(
        kind: ContainerKind,
        payloads: Vec<EvidencePayload>,
        labels: Labels,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        for payload in &payloads {
            Evidence::check_payload(payload)?;
        }
        Ok(Self {
            kind,
            payloads,
            labels,
            metadata,
        })
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Number of evidence items `to_evidence` yields.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn to_evidence(&self) -> Vec<Evidence> {
        self.to_evidence_with(&Metadata::new())
    }

    /// Expand with `extra` merged over the container metadata.
    pub fn to_evidence_with(&self, extra: &Metadata) -> Vec<Evidence> {
        let mut metadata = self.metadata.clone();
        metadata.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.payloads
            .iter()
            .map(|payload| {
                Evidence::from_validated(payload.clone(), self.labels.clone(), metadata.clone())
            })
            .collect()
    }
}

fn expect_table(kind: ContainerKind, raw: Datum) -> Result<Table, ValidationError> {
    match raw {
        Datum::Table(table) => Ok(table),
        other => Err(ValidationError::WrongShape(format!(
            "{kind} data must be a table, got {}",
            other.type_name()
        ))),
    }
}

fn check_unique_columns(kind: ContainerKind, table: &Table) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    let repeated: BTreeSet<&str> = table
        .column_names()
        .filter(|name| !seen.insert(*name))
        .collect();
    if repeated.is_empty() {
        return Ok(());
    }
    let repeated: Vec<&str> = repeated.into_iter().collect();
    Err(ValidationError::MalformedTable(format!(
        "{kind} data repeats columns: {}",
        repeated.join(", ")
    )))
}

fn check_columns(
    kind: ContainerKind,
    table: &Table,
    schema: &RowSchema,
) -> Result<(), ValidationError> {
    check_unique_columns(kind, table)?;
    let present: BTreeSet<&str> = table.column_names().collect();
    let missing: Vec<String> = schema
        .required
        .iter()
        .filter(|name| !present.contains(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields {
            container: kind.as_str(),
            what: "columns",
            missing,
        });
    }
    let unexpected: Vec<String> = table
        .column_names()
        .filter(|name| !schema.required.contains(name) && !schema.optional.contains(name))
        .map(str::to_string)
        .collect();
    if !unexpected.is_empty() {
        return Err(ValidationError::UnexpectedFields {
            container: kind.as_str(),
            unexpected,
        });
    }
    Ok(())
}

fn decode_rows(
    table: &Table,
    decode: impl Fn(&Row<'_>) -> Result<EvidencePayload, ValidationError>,
) -> Result<Vec<EvidencePayload>, ValidationError> {
    (0..table.len())
        .map(|row| decode(&Row { table, row }))
        .collect()
}

/// One table row addressed by column name.
struct Row<'t> {
    table: &'t Table,
    row: usize,
}

impl Row<'_> {
    fn cell(&self, column: &str) -> Option<&Datum> {
        self.table
            .column_position(column)
            .map(|idx| &self.table.rows()[self.row][idx])
    }

    fn field(&self, column: &str) -> String {
        format!("row {} column {column}", self.row)
    }

    fn string(&self, column: &str) -> Result<String, ValidationError> {
        match self.cell(column) {
            Some(Datum::Str(s)) if !s.trim().is_empty() => Ok(s.clone()),
            Some(other) => Err(ValidationError::invalid(
                self.field(column),
                format!("expected non-empty string, got {}", other.type_name()),
            )),
            None => Err(ValidationError::invalid(self.field(column), "missing")),
        }
    }

    fn number(&self, column: &str) -> Result<Option<f64>, ValidationError> {
        match self.cell(column) {
            None | Some(Datum::Null) => Ok(None),
            Some(cell) => cell.as_f64().map(Some).ok_or_else(|| {
                ValidationError::invalid(
                    self.field(column),
                    format!("expected number, got {}", cell.type_name()),
                )
            }),
        }
    }

    fn required_number(&self, column: &str) -> Result<f64, ValidationError> {
        self.number(column)?
            .ok_or_else(|| ValidationError::invalid(self.field(column), "a number is required"))
    }

    fn interval(&self, column: &str) -> Result<Option<(f64, f64)>, ValidationError> {
        let bounds = match self.cell(column) {
            None | Some(Datum::Null) => return Ok(None),
            Some(Datum::List(items)) if items.len() == 2 => (items[0].as_f64(), items[1].as_f64()),
            Some(Datum::Array(cells)) if cells.len() == 2 => (cells[0], cells[1]),
            Some(other) => {
                return Err(ValidationError::invalid(
                    self.field(column),
                    format!("expected a [lower, upper] pair, got {}", other.type_name()),
                ));
            }
        };
        match bounds {
            (Some(lo), Some(hi)) => Ok(Some((lo, hi))),
            _ => Err(ValidationError::invalid(
                self.field(column),
                "interval bounds must be numbers",
            )),
        }
    }
}

fn decode_metric(row: &Row<'_>) -> Result<EvidencePayload, ValidationError> {
    Ok(EvidencePayload::Metric(MetricResult {
        metric_type: row.string("type")?,
        value: row.number("value")?,
        confidence_interval: row.interval("confidence_interval")?,
        confidence_level: row.number("confidence_level")?,
    }))
}

fn decode_statistic_test(row: &Row<'_>) -> Result<EvidencePayload, ValidationError> {
    // `significant` is recomputed from p_value and the threshold.
    match row.cell("significant") {
        None | Some(Datum::Null) | Some(Datum::Bool(_)) => {}
        Some(other) => {
            return Err(ValidationError::invalid(
                row.field("significant"),
                format!("expected bool, got {}", other.type_name()),
            ));
        }
    }
    Ok(EvidencePayload::StatisticTest(StatisticTestResult {
        statistic_type: row.string("statistic_type")?,
        test_statistic: row.number("test_statistic")?,
        significance_threshold: row.required_number("significance_threshold")?,
        p_value: row.required_number("p_value")?,
    }))
}

fn decode_model_profile(table: &Table) -> Result<EvidencePayload, ValidationError> {
    let kind = ContainerKind::ModelProfiler;
    check_unique_columns(kind, table)?;
    let Some(results) = table.column_position(MODEL_PROFILER_COLUMN) else {
        return Err(ValidationError::MissingFields {
            container: kind.as_str(),
            what: "columns",
            missing: vec![MODEL_PROFILER_COLUMN.to_string()],
        });
    };
    let unexpected: Vec<String> = table
        .column_names()
        .filter(|name| *name != MODEL_PROFILER_COLUMN)
        .map(str::to_string)
        .collect();
    if !unexpected.is_empty() {
        return Err(ValidationError::UnexpectedFields {
            container: kind.as_str(),
            unexpected,
        });
    }
    let index = table.index().unwrap_or(&[]);
    let missing: Vec<String> = MODEL_PROFILER_KEYS
        .iter()
        .filter(|key| !index.iter().any(|k| k == *key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields {
            container: kind.as_str(),
            what: "index keys",
            missing,
        });
    }
    let entries = index
        .iter()
        .zip(table.rows())
        .map(|(key, row)| (key.clone(), sanitize(&row[results])))
        .collect();
    Ok(EvidencePayload::ModelProfiler(ModelProfile { entries }))
}
