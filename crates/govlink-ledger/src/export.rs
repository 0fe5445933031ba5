//! Export document, export files and the artifact descriptor.

use crate::matcher::MatchReport;
use crate::sink::SkipReason;
use govlink_evidence::{Evidence, EvidenceStruct, Labels, Metadata, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// The model (and datasets) evidence is collected about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub name: String,
    #[serde(default)]
    pub tags: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_dataset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_dataset_name: Option<String>,
}

impl ArtifactDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Labels::new(),
            training_dataset_name: None,
            assessment_dataset_name: None,
        }
    }

    pub fn with_tags(mut self, tags: Labels) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_training_dataset(mut self, name: impl Into<String>) -> Self {
        self.training_dataset_name = Some(name.into());
        self
    }

    pub fn with_assessment_dataset(mut self, name: impl Into<String>) -> Self {
        self.assessment_dataset_name = Some(name.into());
        self
    }

    /// Metadata stamped onto evidence collected for this artifact.
    pub fn evidence_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("model_name".to_string(), Value::String(self.name.clone()));
        if let Some(name) = &self.training_dataset_name {
            metadata.insert("training_dataset_name".to_string(), Value::String(name.clone()));
        }
        if let Some(name) = &self.assessment_dataset_name {
            metadata.insert(
                "assessment_dataset_name".to_string(),
                Value::String(name.clone()),
            );
        }
        metadata
    }
}

/// Wire document sent to the governance service or written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub policy_pack_id: String,
    pub models: Option<Vec<ArtifactDescriptor>>,
    pub evidences: Vec<EvidenceStruct>,
}

impl ExportDocument {
    /// Parse every evidence record back into evidence.
    pub fn to_evidence(&self) -> Result<Vec<Evidence>, ValidationError> {
        self.evidences
            .iter()
            .cloned()
            .map(Evidence::from_struct)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMeta {
    pub client: String,
    pub version: String,
}

impl ExportMeta {
    pub fn for_client(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// On-disk export: `{meta, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub meta: ExportMeta,
    pub data: ExportDocument,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid export file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Write `file` to `path` through a temporary sibling and a rename.
pub fn write_export_file(path: impl AsRef<Path>, file: &ExportFile) -> Result<(), ExportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), ExportError> {
        let handle = File::create(&tmp_path).map_err(|e| io_error(&tmp_path, e))?;
        let mut writer = BufWriter::new(handle);
        serde_json::to_writer_pretty(&mut writer, file).map_err(ExportError::Serialize)?;
        writer.write_all(b"\n").map_err(|e| io_error(&tmp_path, e))?;
        writer.flush().map_err(|e| io_error(&tmp_path, e))?;
        let handle = writer
            .into_inner()
            .map_err(|e| io_error(&tmp_path, e.into_error()))?;
        handle.sync_all().map_err(|e| io_error(&tmp_path, e))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error(path, e)
    })
}

pub fn read_export_file(path: impl AsRef<Path>) -> Result<ExportFile, ExportError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| ExportError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

/// How an export attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    /// Preconditions failed; nothing was written or sent.
    NotReady(SkipReason),
    Written { path: PathBuf },
    Uploaded { job_id: String },
    /// The service finished the job with `result: error`.
    JobFailed { job_id: String, error: Option<Value> },
    TimedOut { job_id: String, waited: Duration },
    /// Transport or file failure.
    DeliveryFailed(String),
}

impl ExportStatus {
    pub fn delivered(&self) -> bool {
        matches!(
            self,
            ExportStatus::Written { .. } | ExportStatus::Uploaded { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub status: ExportStatus,
    /// Present whenever matching ran.
    pub report: Option<MatchReport>,
}

impl ExportOutcome {
    pub(crate) fn not_ready(reason: SkipReason) -> Self {
        Self {
            status: ExportStatus::NotReady(reason),
            report: None,
        }
    }

    /// Every requirement matched and the document was delivered.
    pub fn succeeded(&self) -> bool {
        self.status.delivered() && self.report.as_ref().is_some_and(MatchReport::satisfied)
    }
}
