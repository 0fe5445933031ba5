//! Diagnostics emitted by the ledger.
//!
//! The ledger never logs directly. It reports through an injected
//! [`DiagnosticSink`]; [`TracingSink`] forwards to `tracing` and is the
//! default.

use govlink_evidence::Labels;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Why an export did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotRegistered,
    NoEvidence,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotRegistered => f.write_str("no requirement plan registered"),
            SkipReason::NoEvidence => f.write_str("no evidence to export"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Registered {
        use_case_id: String,
        policy_pack_id: String,
        requirements: usize,
    },
    RegistrationFailed {
        reason: String,
    },
    ArtifactsSet {
        name: String,
        tags: Labels,
    },
    MissingEvidence {
        label: Labels,
    },
    AmbiguousEvidence {
        label: Labels,
        candidates: Vec<Labels>,
    },
    ExportSkipped {
        reason: SkipReason,
    },
    ExportWritten {
        path: PathBuf,
        evidences: usize,
    },
    UploadStarted {
        use_case_id: String,
        evidences: usize,
    },
    UploadInProgress {
        job_id: String,
        elapsed: Duration,
    },
    UploadSucceeded {
        job_id: String,
        /// Service-reported run time in milliseconds.
        duration_ms: Option<f64>,
    },
    UploadFailed {
        reason: String,
    },
    UploadTimedOut {
        job_id: String,
        waited: Duration,
    },
    ExportSummary {
        satisfied: bool,
        missing: usize,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::RegistrationFailed { .. }
            | Diagnostic::AmbiguousEvidence { .. }
            | Diagnostic::UploadFailed { .. }
            | Diagnostic::UploadTimedOut { .. } => Severity::Error,
            Diagnostic::ExportSkipped { .. } => Severity::Warning,
            Diagnostic::ExportSummary { satisfied, .. } if !satisfied => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// Stable short name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::Registered { .. } => "registered",
            Diagnostic::RegistrationFailed { .. } => "registration_failed",
            Diagnostic::ArtifactsSet { .. } => "artifacts_set",
            Diagnostic::MissingEvidence { .. } => "missing_evidence",
            Diagnostic::AmbiguousEvidence { .. } => "ambiguous_evidence",
            Diagnostic::ExportSkipped { .. } => "export_skipped",
            Diagnostic::ExportWritten { .. } => "export_written",
            Diagnostic::UploadStarted { .. } => "upload_started",
            Diagnostic::UploadInProgress { .. } => "upload_in_progress",
            Diagnostic::UploadSucceeded { .. } => "upload_succeeded",
            Diagnostic::UploadFailed { .. } => "upload_failed",
            Diagnostic::UploadTimedOut { .. } => "upload_timed_out",
            Diagnostic::ExportSummary { .. } => "export_summary",
        }
    }
}

pub(crate) fn render_labels(label: &Labels) -> String {
    serde_json::to_string(label).unwrap_or_else(|_| format!("{label:?}"))
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Registered {
                use_case_id,
                policy_pack_id,
                requirements,
            } => write!(
                f,
                "registered policy pack {policy_pack_id} for use case {use_case_id} \
                 ({requirements} requirements)"
            ),
            Diagnostic::RegistrationFailed { reason } => {
                write!(f, "failed to register requirement plan: {reason}")
            }
            Diagnostic::ArtifactsSet { name, tags } => {
                write!(f, "artifact {name} set with tags {}", render_labels(tags))
            }
            Diagnostic::MissingEvidence { label } => {
                write!(f, "missing evidence with label {}", render_labels(label))
            }
            Diagnostic::AmbiguousEvidence { label, candidates } => {
                let rendered: Vec<String> = candidates.iter().map(render_labels).collect();
                write!(
                    f,
                    "multiple evidence match requirement {}: [{}]",
                    render_labels(label),
                    rendered.join(", ")
                )
            }
            Diagnostic::ExportSkipped { reason } => write!(f, "export skipped: {reason}"),
            Diagnostic::ExportWritten { path, evidences } => write!(
                f,
                "wrote {evidences} evidence(s) to {}",
                path.display()
            ),
            Diagnostic::UploadStarted {
                use_case_id,
                evidences,
            } => write!(
                f,
                "uploading {evidences} evidence(s) to use case {use_case_id}"
            ),
            Diagnostic::UploadInProgress { job_id, elapsed } => write!(
                f,
                "assessment {job_id} in progress after {:.1}s",
                elapsed.as_secs_f64()
            ),
            Diagnostic::UploadSucceeded {
                job_id,
                duration_ms,
            } => match duration_ms {
                Some(ms) => write!(
                    f,
                    "assessment {job_id} completed in {:.2}s",
                    ms / 1000.0
                ),
                None => write!(f, "assessment {job_id} completed"),
            },
            Diagnostic::UploadFailed { reason } => write!(f, "upload failed: {reason}"),
            Diagnostic::UploadTimedOut { job_id, waited } => write!(
                f,
                "gave up on assessment {job_id} after {:.1}s",
                waited.as_secs_f64()
            ),
            Diagnostic::ExportSummary { satisfied, missing } => {
                if *satisfied {
                    f.write_str("all requirements satisfied")
                } else {
                    write!(f, "{missing} requirement(s) not satisfied")
                }
            }
        }
    }
}

/// Receiver for ledger diagnostics.
pub trait DiagnosticSink {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` at their severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        let kind = diagnostic.kind();
        match diagnostic.severity() {
            Severity::Info => tracing::info!(kind, "{diagnostic}"),
            Severity::Warning => tracing::warn!(kind, "{diagnostic}"),
            Severity::Error => tracing::error!(kind, "{diagnostic}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn emit(&self, _diagnostic: &Diagnostic) {}
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn at_least(&self, severity: Severity) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.severity() >= severity)
            .collect()
    }

    pub fn clear(&self) {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}
