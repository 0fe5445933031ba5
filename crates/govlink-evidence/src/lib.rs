//! # govlink-evidence
//!
//! Typed evidence for governance reconciliation.
//!
//! This crate provides:
//! - `Datum`/`Table` (heterogeneous evaluator output)
//! - `sanitize` (NaN → explicit null, deep copy)
//! - `Evidence` with its two-stage label and wire struct
//! - `EvidenceContainer` (validate, sanitize, expand raw input)
//! - `EvidenceRequirement` and the label subset test
//!
//! Matching evidence against requirements lives in `govlink-ledger`.
//!
//! ## Data flow
//!
//! ```text
//! raw Datum ──validate/sanitize──▶ EvidenceContainer ──to_evidence──▶ Vec<Evidence>
//! ```

pub mod container;
pub mod datum;
pub mod error;
pub mod evidence;
pub mod integrations;
pub mod requirement;
pub mod sanitize;

pub use container::{ContainerKind, EvidenceContainer, MODEL_PROFILER_COLUMN, MODEL_PROFILER_KEYS};
pub use datum::{Column, ColumnType, Datum, Table};
pub use error::ValidationError;
pub use evidence::{
    DataProfile, Evidence, EvidenceKind, EvidencePayload, EvidenceStruct, Labels, Metadata,
    MetricResult, ModelProfile, StatisticTestResult, SuiteReport, TableResult,
};
pub use integrations::{CheckGroups, ProfileReport, SuiteResult};
pub use requirement::{EvidenceRequirement, check_subset};
pub use sanitize::{is_sanitized, sanitize, sanitize_table};
