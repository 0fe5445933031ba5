//! Remote governance service seam.
//!
//! Transport and authentication live behind [`AssessmentApi`]. The ledger
//! only needs plan lookup, job creation and job polling.

use crate::sink::{Diagnostic, DiagnosticSink};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

pub trait AssessmentApi {
    /// URL of the requirement plan for a use case and policy pack, if any.
    fn assessment_plan_url(
        &self,
        use_case_name: &str,
        policy_pack_key: &str,
    ) -> Result<Option<String>, ApiError>;

    /// Fetch a requirement plan document.
    fn assessment_plan(&self, url: &str) -> Result<Value, ApiError>;

    fn create_assessment(&self, use_case_id: &str, payload: &Value)
    -> Result<AssessmentJob, ApiError>;

    fn get_assessment(&self, use_case_id: &str, job_id: &str) -> Result<AssessmentJob, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentJob {
    pub id: String,
    pub result: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Run time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Bounded wait for an in-progress assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        crate::config::PollConfig::default().policy()
    }
}

/// Terminal state of a submitted assessment.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(AssessmentJob),
    Failed(AssessmentJob),
    TimedOut { job_id: String, waited: Duration },
}

/// Poll `job` until it leaves `in_progress` or `policy.timeout` elapses.
pub fn await_assessment(
    api: &dyn AssessmentApi,
    use_case_id: &str,
    mut job: AssessmentJob,
    policy: PollPolicy,
    sink: &dyn DiagnosticSink,
) -> Result<JobOutcome, ApiError> {
    let started = Instant::now();
    loop {
        match job.result {
            JobStatus::Success => return Ok(JobOutcome::Succeeded(job)),
            JobStatus::Error => return Ok(JobOutcome::Failed(job)),
            JobStatus::InProgress => {}
        }
        let elapsed = started.elapsed();
        if elapsed >= policy.timeout {
            return Ok(JobOutcome::TimedOut {
                job_id: job.id,
                waited: elapsed,
            });
        }
        sink.emit(&Diagnostic::UploadInProgress {
            job_id: job.id.clone(),
            elapsed,
        });
        std::thread::sleep(policy.interval.min(policy.timeout - elapsed));
        job = api.get_assessment(use_case_id, &job.id)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NoopSink;
    use serde_json::json;
    use std::cell::Cell;

    struct Scripted {
        polls: Cell<usize>,
        finish_after: usize,
        finish_with: JobStatus,
    }

    impl AssessmentApi for Scripted {
        fn assessment_plan_url(&self, _: &str, _: &str) -> Result<Option<String>, ApiError> {
            Ok(None)
        }

        fn assessment_plan(&self, url: &str) -> Result<Value, ApiError> {
            Err(ApiError::NotFound(url.to_string()))
        }

        fn create_assessment(&self, _: &str, _: &Value) -> Result<AssessmentJob, ApiError> {
            Ok(job(JobStatus::InProgress))
        }

        fn get_assessment(&self, _: &str, _: &str) -> Result<AssessmentJob, ApiError> {
            let polls = self.polls.get() + 1;
            self.polls.set(polls);
            if polls >= self.finish_after {
                Ok(job(self.finish_with))
            } else {
                Ok(job(JobStatus::InProgress))
            }
        }
    }

    fn job(result: JobStatus) -> AssessmentJob {
        AssessmentJob {
            id: "job-1".to_string(),
            result,
            error: (result == JobStatus::Error).then(|| json!({"detail": "bad payload"})),
            duration: None,
            details: None,
        }
    }

    fn quick() -> PollPolicy {
        PollPolicy {
            interval: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn polls_until_success() {
        let api = Scripted {
            polls: Cell::new(0),
            finish_after: 3,
            finish_with: JobStatus::Success,
        };
        let outcome = await_assessment(&api, "uc", job(JobStatus::InProgress), quick(), &NoopSink)
            .expect("polling succeeds");
        assert!(matches!(outcome, JobOutcome::Succeeded(_)));
        assert_eq!(api.polls.get(), 3);
    }

    #[test]
    fn remote_error_is_a_failed_outcome() {
        let api = Scripted {
            polls: Cell::new(0),
            finish_after: 1,
            finish_with: JobStatus::Error,
        };
        let outcome = await_assessment(&api, "uc", job(JobStatus::InProgress), quick(), &NoopSink)
            .expect("polling succeeds");
        let JobOutcome::Failed(job) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(job.error, Some(json!({"detail": "bad payload"})));
    }

    #[test]
    fn wait_is_bounded_by_timeout() {
        let api = Scripted {
            polls: Cell::new(0),
            finish_after: usize::MAX,
            finish_with: JobStatus::Success,
        };
        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(30),
        };
        let started = Instant::now();
        let outcome = await_assessment(&api, "uc", job(JobStatus::InProgress), policy, &NoopSink)
            .expect("polling returns");
        assert!(matches!(outcome, JobOutcome::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn finished_job_is_not_polled() {
        let api = Scripted {
            polls: Cell::new(0),
            finish_after: 1,
            finish_with: JobStatus::Success,
        };
        let outcome = await_assessment(&api, "uc", job(JobStatus::Success), quick(), &NoopSink)
            .expect("no polling");
        assert!(matches!(outcome, JobOutcome::Succeeded(_)));
        assert_eq!(api.polls.get(), 0);
    }

    #[test]
    fn job_status_uses_wire_names() {
        let parsed: AssessmentJob =
            serde_json::from_value(json!({"id": "j", "result": "in_progress"})).expect("job");
        assert_eq!(parsed.result, JobStatus::InProgress);
        assert_eq!(parsed.error, None);
    }
}
