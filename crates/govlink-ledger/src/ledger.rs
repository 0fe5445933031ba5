//! The governance ledger: current requirements plus current evidence.
//!
//! ```text
//! Unregistered ──register──▶ Registered ──add/set_evidence──▶ Registered + evidence
//!                               ▲                                   │
//!                               └────────── register (clears) ──────┘
//! ```

use crate::api::{AssessmentApi, JobOutcome, await_assessment};
use crate::config::LedgerConfig;
use crate::export::{
    ArtifactDescriptor, ExportDocument, ExportError, ExportFile, ExportMeta, ExportOutcome,
    ExportStatus, write_export_file,
};
use crate::matcher::{MatchReport, match_requirements};
use crate::plan::{PlanSource, RequirementPlan};
use crate::sink::{Diagnostic, DiagnosticSink, SkipReason, TracingSink};
use govlink_evidence::{Evidence, EvidenceRequirement, Labels, Metadata};
use std::path::PathBuf;
use std::sync::Arc;

/// Where `export` delivers the document.
pub enum ExportDestination<'a> {
    File(PathBuf),
    Remote(&'a dyn AssessmentApi),
}

/// Ids of the registered requirement plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub use_case_id: String,
    pub policy_pack_id: String,
}

pub struct Ledger {
    config: LedgerConfig,
    sink: Arc<dyn DiagnosticSink>,
    registration: Option<Registration>,
    requirements: Vec<EvidenceRequirement>,
    unique_tags: Vec<Labels>,
    evidence: Vec<Evidence>,
    artifact: Option<ArtifactDescriptor>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: LedgerConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            config,
            sink,
            registration: None,
            requirements: Vec::new(),
            unique_tags: Vec::new(),
            evidence: Vec::new(),
            artifact: None,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn emit(&self, diagnostic: Diagnostic) {
        self.sink.emit(&diagnostic);
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Resolve and register a plan. On failure the ledger is left as it was.
    pub fn register(&mut self, source: &PlanSource, api: Option<&dyn AssessmentApi>) -> bool {
        match source.resolve(api) {
            Ok(plan) => {
                self.register_plan(plan);
                true
            }
            Err(err) => {
                self.emit(Diagnostic::RegistrationFailed {
                    reason: format!("{}: {err}", source.describe()),
                });
                false
            }
        }
    }

    /// Replace requirements with `plan`'s and drop collected evidence.
    pub fn register_plan(&mut self, plan: RequirementPlan) {
        self.unique_tags = plan.unique_tags();
        self.evidence.clear();
        self.emit(Diagnostic::Registered {
            use_case_id: plan.use_case_id.clone(),
            policy_pack_id: plan.policy_pack_id.clone(),
            requirements: plan.evidence_requirements.len(),
        });
        self.requirements = plan.evidence_requirements;
        self.registration = Some(Registration {
            use_case_id: plan.use_case_id,
            policy_pack_id: plan.policy_pack_id,
        });
    }

    pub fn registered(&self) -> bool {
        self.registration.is_some()
    }

    pub fn registration(&self) -> Option<&Registration> {
        self.registration.as_ref()
    }

    // ---------------------------------------------------------------------
    // Artifacts
    // ---------------------------------------------------------------------

    pub fn set_artifacts(&mut self, artifact: ArtifactDescriptor) {
        self.emit(Diagnostic::ArtifactsSet {
            name: artifact.name.clone(),
            tags: artifact.tags.clone(),
        });
        self.artifact = Some(artifact);
    }

    pub fn artifact(&self) -> Option<&ArtifactDescriptor> {
        self.artifact.as_ref()
    }

    /// Tags of the current artifact; empty when none is set.
    pub fn artifact_tags(&self) -> Labels {
        self.artifact
            .as_ref()
            .map(|a| a.tags.clone())
            .unwrap_or_default()
    }

    /// Metadata stamped onto evidence for the current artifact.
    pub fn artifact_metadata(&self) -> Metadata {
        self.artifact
            .as_ref()
            .map(ArtifactDescriptor::evidence_metadata)
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Evidence
    // ---------------------------------------------------------------------

    pub fn add_evidence(&mut self, evidence: impl IntoIterator<Item = Evidence>) {
        self.evidence.extend(evidence);
    }

    pub fn set_evidence(&mut self, evidence: impl IntoIterator<Item = Evidence>) {
        self.evidence = evidence.into_iter().collect();
    }

    pub fn clear_evidence(&mut self) {
        self.evidence.clear();
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    // ---------------------------------------------------------------------
    // Requirements
    // ---------------------------------------------------------------------

    /// Requirements applying to an artifact carrying `tags`.
    pub fn requirements_for(&self, tags: &Labels) -> Vec<&EvidenceRequirement> {
        self.requirements
            .iter()
            .filter(|r| r.applies_to(tags))
            .collect()
    }

    /// Requirements applying to the current artifact.
    pub fn requirements(&self) -> Vec<&EvidenceRequirement> {
        self.requirements_for(&self.artifact_tags())
    }

    /// Every requirement of the plan, regardless of tags.
    pub fn all_requirements(&self) -> &[EvidenceRequirement] {
        &self.requirements
    }

    /// Distinct non-empty tag sets across the plan.
    pub fn requirement_tags(&self) -> &[Labels] {
        &self.unique_tags
    }

    // ---------------------------------------------------------------------
    // Matching and export
    // ---------------------------------------------------------------------

    /// Match the current artifact's requirements against collected evidence.
    pub fn check(&mut self) -> MatchReport {
        let active: Vec<EvidenceRequirement> = self.requirements().into_iter().cloned().collect();
        match_requirements(&active, &mut self.evidence, self.sink.as_ref())
    }

    pub fn requirements_satisfied(&mut self) -> bool {
        self.check().satisfied()
    }

    /// Document for the current state. Does not run matching.
    pub fn export_document(&self, overrides: &Metadata) -> Option<ExportDocument> {
        let registration = self.registration.as_ref()?;
        Some(ExportDocument {
            policy_pack_id: registration.policy_pack_id.clone(),
            models: self.artifact.clone().map(|artifact| vec![artifact]),
            evidences: self
                .evidence
                .iter()
                .map(|e| e.to_struct_with(overrides))
                .collect(),
        })
    }

    pub fn export(&mut self, destination: ExportDestination<'_>) -> ExportOutcome {
        self.export_with(destination, &Metadata::new())
    }

    /// Match, then deliver the export document with `overrides` merged into
    /// every evidence's metadata.
    pub fn export_with(
        &mut self,
        destination: ExportDestination<'_>,
        overrides: &Metadata,
    ) -> ExportOutcome {
        let Some(registration) = self.registration.clone() else {
            return self.skip(SkipReason::NotRegistered);
        };
        if self.evidence.is_empty() {
            return self.skip(SkipReason::NoEvidence);
        }

        let report = self.check();
        let Some(document) = self.export_document(overrides) else {
            return self.skip(SkipReason::NotRegistered);
        };
        let status = match destination {
            ExportDestination::File(path) => self.write_file(path, document),
            ExportDestination::Remote(api) => self.upload(api, &registration, &document),
        };
        self.emit(Diagnostic::ExportSummary {
            satisfied: report.satisfied(),
            missing: report.missing().len(),
        });
        ExportOutcome {
            status,
            report: Some(report),
        }
    }

    /// Boolean form of [`Ledger::export`].
    pub fn export_to(&mut self, destination: ExportDestination<'_>) -> bool {
        self.export(destination).succeeded()
    }

    fn skip(&self, reason: SkipReason) -> ExportOutcome {
        self.emit(Diagnostic::ExportSkipped { reason });
        ExportOutcome::not_ready(reason)
    }

    fn write_file(&self, path: PathBuf, document: ExportDocument) -> ExportStatus {
        let evidences = document.evidences.len();
        let file = ExportFile {
            meta: ExportMeta::for_client(self.config.client_name.clone()),
            data: document,
        };
        match write_export_file(&path, &file) {
            Ok(()) => {
                self.emit(Diagnostic::ExportWritten {
                    path: path.clone(),
                    evidences,
                });
                ExportStatus::Written { path }
            }
            Err(err) => self.delivery_failed(err.to_string()),
        }
    }

    fn upload(
        &self,
        api: &dyn AssessmentApi,
        registration: &Registration,
        document: &ExportDocument,
    ) -> ExportStatus {
        let payload = match serde_json::to_value(document) {
            Ok(payload) => payload,
            Err(err) => return self.delivery_failed(ExportError::Serialize(err).to_string()),
        };
        self.emit(Diagnostic::UploadStarted {
            use_case_id: registration.use_case_id.clone(),
            evidences: document.evidences.len(),
        });
        let outcome = api
            .create_assessment(&registration.use_case_id, &payload)
            .and_then(|job| {
                await_assessment(
                    api,
                    &registration.use_case_id,
                    job,
                    self.config.poll_policy(),
                    self.sink.as_ref(),
                )
            });
        match outcome {
            Ok(JobOutcome::Succeeded(job)) => {
                self.emit(Diagnostic::UploadSucceeded {
                    job_id: job.id.clone(),
                    duration_ms: job.duration,
                });
                ExportStatus::Uploaded { job_id: job.id }
            }
            Ok(JobOutcome::Failed(job)) => {
                let reason = job
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "assessment finished with an error".to_string());
                self.emit(Diagnostic::UploadFailed {
                    reason: format!("assessment {}: {reason}", job.id),
                });
                ExportStatus::JobFailed {
                    job_id: job.id,
                    error: job.error,
                }
            }
            Ok(JobOutcome::TimedOut { job_id, waited }) => {
                self.emit(Diagnostic::UploadTimedOut {
                    job_id: job_id.clone(),
                    waited,
                });
                ExportStatus::TimedOut { job_id, waited }
            }
            Err(err) => self.delivery_failed(err.to_string()),
        }
    }

    fn delivery_failed(&self, reason: String) -> ExportStatus {
        self.emit(Diagnostic::UploadFailed {
            reason: reason.clone(),
        });
        ExportStatus::DeliveryFailed(reason)
    }
}
