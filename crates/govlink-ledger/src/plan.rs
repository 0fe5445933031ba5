//! Requirement plans and where they come from.

use crate::api::{ApiError, AssessmentApi};
use govlink_evidence::{EvidenceRequirement, Labels};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no requirement plan for use case {use_case_name} and policy pack {policy_pack_key}")]
    Unresolved {
        use_case_name: String,
        policy_pack_key: String,
    },

    #[error("a remote plan source needs an assessment api")]
    NoApi,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to read plan: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid requirement plan from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parsed requirement plan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementPlan {
    pub use_case_id: String,
    pub policy_pack_id: String,
    #[serde(default)]
    pub evidence_requirements: Vec<EvidenceRequirement>,
}

impl RequirementPlan {
    pub fn from_json_str(text: &str) -> Result<Self, PlanError> {
        serde_json::from_str(text).map_err(|source| PlanError::Parse {
            origin: "<document>".to_string(),
            source,
        })
    }

    pub fn from_value(value: Value, origin: &str) -> Result<Self, PlanError> {
        serde_json::from_value(value).map_err(|source| PlanError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PlanError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| PlanError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }

    /// Distinct non-empty tag sets, in first-seen order.
    pub fn unique_tags(&self) -> Vec<Labels> {
        let mut seen: Vec<Labels> = Vec::new();
        for requirement in &self.evidence_requirements {
            let tags = requirement.tags();
            if !tags.is_empty() && !seen.contains(tags) {
                seen.push(tags.clone());
            }
        }
        seen
    }
}

/// Where a requirement plan is obtained from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSource {
    /// Remote lookup of the plan URL by names, then fetch.
    Named {
        use_case_name: String,
        policy_pack_key: String,
    },
    Url(String),
    /// Inline JSON document.
    Document(String),
    File(PathBuf),
}

impl PlanSource {
    pub fn describe(&self) -> String {
        match self {
            PlanSource::Named {
                use_case_name,
                policy_pack_key,
            } => format!("{use_case_name}/{policy_pack_key}"),
            PlanSource::Url(url) => url.clone(),
            PlanSource::Document(_) => "<document>".to_string(),
            PlanSource::File(path) => path.display().to_string(),
        }
    }

    /// Resolve to a parsed plan. Remote sources need `api`.
    pub fn resolve(&self, api: Option<&dyn AssessmentApi>) -> Result<RequirementPlan, PlanError> {
        match self {
            PlanSource::Named {
                use_case_name,
                policy_pack_key,
            } => {
                let api = api.ok_or(PlanError::NoApi)?;
                let url = api
                    .assessment_plan_url(use_case_name, policy_pack_key)?
                    .ok_or_else(|| PlanError::Unresolved {
                        use_case_name: use_case_name.clone(),
                        policy_pack_key: policy_pack_key.clone(),
                    })?;
                RequirementPlan::from_value(api.assessment_plan(&url)?, &url)
            }
            PlanSource::Url(url) => {
                let api = api.ok_or(PlanError::NoApi)?;
                RequirementPlan::from_value(api.assessment_plan(url)?, url)
            }
            PlanSource::Document(text) => RequirementPlan::from_json_str(text),
            PlanSource::File(path) => RequirementPlan::load(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AssessmentJob;
    use serde_json::json;

    const PLAN: &str = r#"{
        "use_case_id": "uc-1",
        "policy_pack_id": "pp-1",
        "evidence_requirements": [
            {"tags": {}, "label": {"metric_type": "precision"}},
            {"tags": {"risk": "high"}, "label": {"metric_type": "recall"}},
            {"label": {"table_name": "roc_curve"}},
            {"tags": {"risk": "high"}, "label": {"metric_type": "auc"}},
            {"tags": {"team": "ml"}, "label": {"metric_type": "f1"}}
        ]
    }"#;

    struct PlanServer;

    impl AssessmentApi for PlanServer {
        fn assessment_plan_url(
            &self,
            use_case_name: &str,
            policy_pack_key: &str,
        ) -> Result<Option<String>, ApiError> {
            Ok((use_case_name == "credit" && policy_pack_key == "fairness")
                .then(|| "https://gov.example/plans/uc-1".to_string()))
        }

        fn assessment_plan(&self, url: &str) -> Result<Value, ApiError> {
            if url.ends_with("uc-1") {
                serde_json::from_str(PLAN).map_err(|e| ApiError::Decode(e.to_string()))
            } else {
                Err(ApiError::NotFound(url.to_string()))
            }
        }

        fn create_assessment(&self, _: &str, _: &Value) -> Result<AssessmentJob, ApiError> {
            Err(ApiError::Transport("read-only".to_string()))
        }

        fn get_assessment(&self, _: &str, _: &str) -> Result<AssessmentJob, ApiError> {
            Err(ApiError::Transport("read-only".to_string()))
        }
    }

    #[test]
    fn all_sources_converge_on_the_same_plan() {
        let from_document = PlanSource::Document(PLAN.to_string())
            .resolve(None)
            .expect("inline plan");
        let from_name = PlanSource::Named {
            use_case_name: "credit".to_string(),
            policy_pack_key: "fairness".to_string(),
        }
        .resolve(Some(&PlanServer))
        .expect("named plan");
        let from_url = PlanSource::Url("https://gov.example/plans/uc-1".to_string())
            .resolve(Some(&PlanServer))
            .expect("url plan");
        assert_eq!(from_document, from_name);
        assert_eq!(from_document, from_url);
        assert_eq!(from_document.evidence_requirements.len(), 5);
    }

    #[test]
    fn unique_tags_skip_empty_and_keep_first_seen_order() {
        let plan = RequirementPlan::from_json_str(PLAN).expect("plan");
        let tags: Vec<Value> = plan
            .unique_tags()
            .iter()
            .map(|t| serde_json::to_value(t).expect("tags"))
            .collect();
        assert_eq!(tags, vec![json!({"risk": "high"}), json!({"team": "ml"})]);
    }

    #[test]
    fn unknown_name_is_unresolved() {
        let err = PlanSource::Named {
            use_case_name: "other".to_string(),
            policy_pack_key: "fairness".to_string(),
        }
        .resolve(Some(&PlanServer))
        .expect_err("no such plan");
        assert!(matches!(err, PlanError::Unresolved { .. }));
    }

    #[test]
    fn remote_source_without_api_fails() {
        let err = PlanSource::Url("https://gov.example/plans/uc-1".to_string())
            .resolve(None)
            .expect_err("api needed");
        assert!(matches!(err, PlanError::NoApi));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = PlanSource::Document("{\"use_case_id\": 1}".to_string())
            .resolve(None)
            .expect_err("bad plan");
        assert!(matches!(err, PlanError::Parse { .. }));
    }
}
