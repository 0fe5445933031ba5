//! Capability traits for third-party profilers and validation suites.
//!
//! Integrations adapt their native result objects to these traits before
//! handing them over; nothing here knows about the concrete libraries.

use crate::container::{ContainerKind, EvidenceContainer};
use crate::datum::{Column, ColumnType, Datum, Table};
use crate::error::ValidationError;
use crate::evidence::{Evidence, EvidencePayload, Labels, Metadata, SuiteReport, TableResult};
use serde_json::Value;

/// A data profiling report.
pub trait ProfileReport {
    /// Nested description of the profiled dataset.
    fn description(&self) -> Datum;
}

/// A finished validation suite run.
pub trait SuiteResult {
    fn checks_by_status(&self) -> CheckGroups;
    fn to_json(&self) -> Value;
}

/// Check headers grouped by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckGroups {
    pub not_passed: Vec<String>,
    pub passed: Vec<String>,
    pub not_run: Vec<String>,
}

impl CheckGroups {
    pub const NOT_PASSED: &'static str = "Not Passed";
    pub const PASSED: &'static str = "Passed";
    pub const NOT_RUN: &'static str = "Not Run";

    pub fn len(&self) -> usize {
        self.not_passed.len() + self.passed.len() + self.not_run.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Check_Name`/`Status` table, failures first.
    pub fn to_table(&self) -> Result<Table, ValidationError> {
        let groups = [
            (Self::NOT_PASSED, &self.not_passed),
            (Self::PASSED, &self.passed),
            (Self::NOT_RUN, &self.not_run),
        ];
        let rows = groups
            .iter()
            .flat_map(|(status, checks)| {
                checks
                    .iter()
                    .map(move |check| vec![Datum::from(check.as_str()), Datum::from(*status)])
            })
            .collect();
        let columns = ["Check_Name", "Status"]
            .into_iter()
            .map(|name| Column {
                name: name.to_string(),
                dtype: ColumnType::Object,
            })
            .collect();
        Table::with_columns(columns, rows)
    }
}

impl EvidenceContainer {
    /// Container holding one data profiler evidence.
    pub fn from_profile_report(
        report: &impl ProfileReport,
        labels: Labels,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        Self::new(
            ContainerKind::DataProfiler,
            report.description(),
            labels,
            metadata,
        )
    }

    /// Container holding one table evidence named `name` that summarises
    /// every check of `suite` with its status.
    pub fn from_suite_result(
        name: impl Into<String>,
        suite: &impl SuiteResult,
        labels: Labels,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let table = suite.checks_by_status().to_table()?.named(name.clone());
        Self::from_payloads(
            ContainerKind::Table,
            vec![EvidencePayload::Table(TableResult { name, table })],
            labels,
            metadata,
        )
    }
}

impl Evidence {
    /// Raw suite rendering as a single evidence.
    pub fn deepchecks_result(
        name: impl Into<String>,
        suite: &impl SuiteResult,
        labels: Labels,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        Evidence::new(
            EvidencePayload::DeepchecksResult(SuiteReport {
                name: name.into(),
                report: suite.to_json(),
            }),
            labels,
            metadata,
        )
    }
}
