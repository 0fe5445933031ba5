//! Requirement matching.
//!
//! Requirements are visited in registration order. A requirement whose label
//! is a subset of exactly one evidence label is met, and that evidence's
//! label is replaced by the requirement label; later requirements see the
//! replaced label. Zero candidates is missing; more than one is ambiguous and
//! counts as missing, with no label touched.

use crate::sink::{Diagnostic, DiagnosticSink};
use govlink_evidence::{Evidence, EvidenceRequirement, Labels};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched {
        requirement: Labels,
        evidence_index: usize,
    },
    Missing {
        requirement: Labels,
    },
    Ambiguous {
        requirement: Labels,
        candidates: Vec<usize>,
    },
}

impl MatchOutcome {
    pub fn requirement(&self) -> &Labels {
        match self {
            MatchOutcome::Matched { requirement, .. }
            | MatchOutcome::Missing { requirement }
            | MatchOutcome::Ambiguous { requirement, .. } => requirement,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }
}

/// Per-requirement outcome of one matching pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchReport {
    satisfied: bool,
    outcomes: Vec<MatchOutcome>,
}

impl MatchReport {
    /// True when every requirement matched exactly one evidence.
    pub fn satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn outcomes(&self) -> &[MatchOutcome] {
        &self.outcomes
    }

    /// Labels of requirements left unmet, ambiguous ones included.
    pub fn missing(&self) -> Vec<&Labels> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_matched())
            .map(MatchOutcome::requirement)
            .collect()
    }

    pub fn matched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_matched()).count()
    }

    pub fn ambiguous_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MatchOutcome::Ambiguous { .. }))
            .count()
    }
}

/// Match `requirements` against `evidence`, assigning labels on unique hits.
pub fn match_requirements(
    requirements: &[EvidenceRequirement],
    evidence: &mut [Evidence],
    sink: &dyn DiagnosticSink,
) -> MatchReport {
    let mut outcomes = Vec::with_capacity(requirements.len());
    for requirement in requirements {
        let candidates: Vec<usize> = evidence
            .iter()
            .enumerate()
            .filter(|(_, item)| requirement.is_satisfied_by(item))
            .map(|(idx, _)| idx)
            .collect();
        let label = requirement.label().clone();
        let outcome = match candidates.len() {
            0 => {
                sink.emit(&Diagnostic::MissingEvidence {
                    label: label.clone(),
                });
                MatchOutcome::Missing { requirement: label }
            }
            1 => {
                let only = candidates[0];
                evidence[only].assign_label(label.clone());
                MatchOutcome::Matched {
                    requirement: label,
                    evidence_index: only,
                }
            }
            _ => {
                sink.emit(&Diagnostic::AmbiguousEvidence {
                    label: label.clone(),
                    candidates: candidates.iter().map(|&idx| evidence[idx].label()).collect(),
                });
                MatchOutcome::Ambiguous {
                    requirement: label,
                    candidates,
                }
            }
        };
        outcomes.push(outcome);
    }
    let satisfied = outcomes.iter().all(MatchOutcome::is_matched);
    MatchReport {
        satisfied,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{RecordingSink, Severity};
    use govlink_evidence::{EvidencePayload, Metadata, MetricResult};
    use serde_json::{Value, json};

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn metric(metric_type: &str, extra: &[(&str, &str)]) -> Evidence {
        Evidence::new(
            EvidencePayload::Metric(MetricResult::new(metric_type, Some(0.5))),
            labels(extra),
            Metadata::new(),
        )
        .expect("metric")
    }

    fn requirement(label: &[(&str, &str)]) -> EvidenceRequirement {
        EvidenceRequirement::new(Labels::new(), labels(label))
    }

    #[test]
    fn unique_match_overwrites_label() {
        let mut evidence = vec![metric("precision", &[("run", "a")])];
        let sink = RecordingSink::default();
        let report = match_requirements(
            &[requirement(&[("metric_type", "precision")])],
            &mut evidence,
            &sink,
        );
        assert!(report.satisfied());
        assert_eq!(evidence[0].label(), labels(&[("metric_type", "precision")]));
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn ambiguous_match_is_missing_and_untouched() {
        let mut evidence = vec![
            metric("precision", &[("run", "a")]),
            metric("precision", &[("run", "b")]),
        ];
        let before: Vec<Labels> = evidence.iter().map(Evidence::label).collect();
        let sink = RecordingSink::default();
        let report = match_requirements(
            &[requirement(&[("metric_type", "precision")])],
            &mut evidence,
            &sink,
        );

        assert!(!report.satisfied());
        assert_eq!(report.missing(), vec![&labels(&[("metric_type", "precision")])]);
        assert_eq!(report.ambiguous_count(), 1);
        let after: Vec<Labels> = evidence.iter().map(Evidence::label).collect();
        assert_eq!(before, after);
        assert!(evidence.iter().all(|e| e.assigned_label().is_none()));

        let errors = sink.at_least(Severity::Error);
        assert_eq!(errors.len(), 1);
        let Diagnostic::AmbiguousEvidence { candidates, .. } = &errors[0] else {
            panic!("expected ambiguity diagnostic, got {:?}", errors[0]);
        };
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn missing_requirement_is_reported() {
        let mut evidence = vec![metric("recall", &[])];
        let sink = RecordingSink::default();
        let report = match_requirements(
            &[
                requirement(&[("metric_type", "recall")]),
                requirement(&[("metric_type", "auc")]),
            ],
            &mut evidence,
            &sink,
        );
        assert!(!report.satisfied());
        assert_eq!(report.matched_count(), 1);
        assert_eq!(report.missing(), vec![&labels(&[("metric_type", "auc")])]);
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::MissingEvidence {
                label: labels(&[("metric_type", "auc")])
            }]
        );
    }

    #[test]
    fn earlier_assignment_narrows_later_requirements() {
        // The first requirement strips `run` from the matched item, so the
        // second requirement no longer sees it.
        let mut evidence = vec![metric("precision", &[("run", "a")])];
        let report = match_requirements(
            &[
                requirement(&[("metric_type", "precision")]),
                requirement(&[("run", "a")]),
            ],
            &mut evidence,
            &crate::sink::NoopSink,
        );
        assert_eq!(report.matched_count(), 1);
        assert_eq!(report.missing(), vec![&labels(&[("run", "a")])]);
    }

    #[test]
    fn no_requirements_is_trivially_satisfied() {
        let mut evidence = vec![metric("precision", &[])];
        let report = match_requirements(&[], &mut evidence, &crate::sink::NoopSink);
        assert!(report.satisfied());
        assert!(report.outcomes().is_empty());
    }

    #[test]
    fn report_serializes_with_outcome_tags() {
        let mut evidence = vec![metric("precision", &[])];
        let report = match_requirements(
            &[requirement(&[("metric_type", "precision")])],
            &mut evidence,
            &crate::sink::NoopSink,
        );
        assert_eq!(
            serde_json::to_value(&report).expect("report"),
            json!({
                "satisfied": true,
                "outcomes": [{
                    "outcome": "matched",
                    "requirement": {"metric_type": "precision"},
                    "evidence_index": 0,
                }],
            })
        );
    }
}
