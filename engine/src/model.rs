//! Core data model for the intake pipeline.
//!
//! This module defines the data structures that flow through the pipeline:
//! - UploadEntry: one file (single mode) or one folder (bulk mode)
//! - EntryStatus: the ordered stages an entry can occupy
//! - SelectedFile: the raw input handed to `enqueue`
//! - DealForm, DrainSummary, SyntheticDeal: supporting records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IntakeError;

/// Opaque identifier of an entry, unique within one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new(uuid: Uuid) -> Self {
        EntryId(uuid)
    }

    /// Build an id from a plain counter value.
    pub fn from_u128(value: u128) -> Self {
        EntryId(Uuid::from_u128(value))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Documents for one deal; one entry per file
    Single,
    /// Many deals at once; one entry per top-level folder
    Bulk,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Single => write!(f, "single"),
            Mode::Bulk => write!(f, "bulk"),
        }
    }
}

/// Stage an entry currently occupies.
///
/// Declaration order is the stage order: an entry may only move to a
/// variant declared after its current one. Single-mode entries use the
/// `Uploading..=Validating` stages, bulk entries use `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Queued, not yet started
    Waiting,
    Uploading,
    Classifying,
    Extracting,
    Validating,
    /// Bulk folder being worked on
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with a failure recorded on the entry
    Error,
}

impl EntryStatus {
    /// Returns true if this status is terminal (no further changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Error)
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::Uploading => "uploading",
            EntryStatus::Classifying => "classifying",
            EntryStatus::Extracting => "extracting",
            EntryStatus::Validating => "validating",
            EntryStatus::Processing => "processing",
            EntryStatus::Completed => "completed",
            EntryStatus::Error => "error",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What an entry stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntrySource {
    /// A single document
    File { size_bytes: u64 },
    /// A folder of documents for one deal
    Folder {
        file_count: usize,
        /// Member files whose extension is in the accepted formats
        supported_count: usize,
    },
}

/// Deal record synthesized for a bulk folder when its processing starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticDeal {
    pub deal_id: String,
    pub customer_name: String,
}

/// One unit of work in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEntry {
    /// Immutable key used for every lookup
    pub id: EntryId,

    /// File name (single mode) or folder name (bulk mode)
    pub name: String,

    pub source: EntrySource,

    pub status: EntryStatus,

    /// Percentage, 0 at creation and 100 once completed
    pub progress: u8,

    /// Document type, set by the classification stage
    pub classification: Option<String>,

    /// Number of fields found, set by the extraction stage
    pub extracted_field_count: Option<u32>,

    /// Bulk only; present from the first processing stage onwards
    pub synthetic_deal: Option<SyntheticDeal>,

    /// Reason for an `Error` status
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    /// When the first non-waiting stage was applied
    pub started_at: Option<DateTime<Utc>>,

    /// When a terminal status was reached
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadEntry {
    /// Create a waiting entry at 0% progress.
    pub fn new(id: EntryId, name: impl Into<String>, source: EntrySource) -> Self {
        UploadEntry {
            id,
            name: name.into(),
            source,
            status: EntryStatus::Waiting,
            progress: 0,
            classification: None,
            extracted_field_count: None,
            synthetic_deal: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Move the entry to `status` at `progress`.
    ///
    /// Staying on the same status is allowed (bulk checkpoints), but the
    /// status never moves backwards and progress never decreases.
    pub fn advance(&mut self, status: EntryStatus, progress: u8) -> Result<(), IntakeError> {
        if self.status.is_terminal() {
            return Err(IntakeError::AlreadyTerminal {
                id: self.id,
                status: self.status,
            });
        }
        if status < self.status {
            return Err(IntakeError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: status,
            });
        }
        if progress > 100 {
            return Err(IntakeError::ProgressOutOfRange {
                id: self.id,
                progress,
            });
        }
        if progress < self.progress {
            return Err(IntakeError::ProgressRegression {
                id: self.id,
                from: self.progress,
                to: progress,
            });
        }
        if status == EntryStatus::Completed && progress != 100 {
            return Err(IntakeError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: status,
            });
        }

        let now = Utc::now();
        if self.started_at.is_none() && status != EntryStatus::Waiting {
            self.started_at = Some(now);
        }
        if status.is_terminal() {
            self.finished_at = Some(now);
        }
        self.status = status;
        self.progress = progress;
        Ok(())
    }

    /// Mark the entry as failed, keeping its current progress.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), IntakeError> {
        if self.status.is_terminal() {
            return Err(IntakeError::AlreadyTerminal {
                id: self.id,
                status: self.status,
            });
        }
        let now = Utc::now();
        self.started_at.get_or_insert(now);
        self.finished_at = Some(now);
        self.status = EntryStatus::Error;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Byte size for file entries, `None` for folders.
    pub fn size_bytes(&self) -> Option<u64> {
        match self.source {
            EntrySource::File { size_bytes } => Some(size_bytes),
            EntrySource::Folder { .. } => None,
        }
    }

    /// Member count for folder entries, `None` for files.
    pub fn file_count(&self) -> Option<usize> {
        match self.source {
            EntrySource::File { .. } => None,
            EntrySource::Folder { file_count, .. } => Some(file_count),
        }
    }
}

/// A file handed to the pipeline by a picker, drop area, or directory scan.
///
/// Only metadata is carried; contents are never read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub name: String,
    pub size_bytes: u64,
    /// Path relative to the selection root, `/`-separated (bulk grouping)
    pub relative_path: Option<String>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        SelectedFile {
            name: name.into(),
            size_bytes,
            relative_path: None,
        }
    }

    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }
}

/// Deal details entered alongside a single-deal upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealForm {
    /// Generated at submission when left blank
    pub deal_id: String,
    /// Required before a single-deal submission
    pub customer_name: String,
    pub notes: String,
}

/// Aggregate outcome, published once every entry is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl DrainSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Completion notice text, e.g. "3 documents processed successfully".
    pub fn message(&self, mode: Mode) -> String {
        let noun = match mode {
            Mode::Single => "documents",
            Mode::Bulk => "deals",
        };
        if self.failed > 0 {
            format!(
                "{} {} processed successfully, {} failed.",
                self.succeeded, noun, self.failed
            )
        } else {
            format!("{} {} processed successfully.", self.succeeded, noun)
        }
    }
}
