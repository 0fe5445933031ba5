//! # govlink-ledger
//!
//! Reconciles collected evidence with a governance service's requirement
//! plan.
//!
//! This crate provides:
//! - `RequirementPlan`/`PlanSource` (plan documents and how to obtain them)
//! - `match_requirements` (subset matching, ambiguity as failure)
//! - `Ledger` (registration, artifact, evidence, check, export)
//! - `AssessmentApi` (remote seam) with bounded job polling
//! - export documents and atomically written export files
//! - `DiagnosticSink` implementations and `LedgerConfig`
//! - `Adapter` for plain metric mappings and tables
//!
//! Reconciliation problems (missing, ambiguous, remote failures) come back
//! as data. Only construction and I/O failures are `Err`.

pub mod adapter;
pub mod api;
pub mod config;
pub mod export;
pub mod ledger;
pub mod matcher;
pub mod plan;
pub mod sink;

pub use adapter::{Adapter, WriteMode};
pub use api::{
    ApiError, AssessmentApi, AssessmentJob, JobOutcome, JobStatus, PollPolicy, await_assessment,
};
pub use config::{ConfigError, LedgerConfig, PollConfig};
pub use export::{
    ArtifactDescriptor, ExportDocument, ExportError, ExportFile, ExportMeta, ExportOutcome,
    ExportStatus, read_export_file, write_export_file,
};
pub use ledger::{ExportDestination, Ledger, Registration};
pub use matcher::{MatchOutcome, MatchReport, match_requirements};
pub use plan::{PlanError, PlanSource, RequirementPlan};
pub use sink::{
    Diagnostic, DiagnosticSink, NoopSink, RecordingSink, Severity, SkipReason, TracingSink,
};
