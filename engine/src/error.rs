//! Error types for the intake pipeline.
//!
//! `IntakeError` covers pipeline-level failures (frozen state, illegal
//! transitions, configuration and scanning problems). `SubmitError` covers
//! the precondition checks of `Pipeline::submit`, which are returned to the
//! caller instead of being pushed to a notifier.
//!
//! Entry-level processing failures are not errors here: they are recorded on
//! the `UploadEntry` itself (status `Error` plus `error_message`).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::{EntryId, EntryStatus, Mode};

/// Errors raised by pipeline operations.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The pipeline was already submitted; selection and form are read-only.
    #[error("pipeline is frozen after submission")]
    Frozen,

    /// A transition tried to move an entry backwards along the stage order.
    #[error("invalid transition for entry {id}: {from} -> {to}")]
    InvalidTransition {
        id: EntryId,
        from: EntryStatus,
        to: EntryStatus,
    },

    /// A transition tried to lower an entry's progress.
    #[error("progress cannot decrease for entry {id}: {from}% -> {to}%")]
    ProgressRegression { id: EntryId, from: u8, to: u8 },

    /// Progress above 100%.
    #[error("progress out of range for entry {id}: {progress}%")]
    ProgressOutOfRange { id: EntryId, progress: u8 },

    /// The entry already reached `Completed` or `Error`.
    #[error("entry {id} is already terminal ({status})")]
    AlreadyTerminal { id: EntryId, status: EntryStatus },

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file is not valid TOML for `PipelineConfig`.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A selection root could not be enumerated.
    #[error("failed to scan {}: {source}", .path.display())]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `wait_drained` was called before `submit`; nothing would ever drain.
    #[error("pipeline has not been submitted")]
    NotSubmitted,

    /// The pipeline was shut down before every entry became terminal.
    #[error("processing was cancelled before the pipeline drained")]
    Cancelled,
}

/// Reasons `Pipeline::submit` refuses to start processing.
///
/// A rejected submission never changes pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Single-deal mode requires a non-blank customer name.
    #[error("customer name is required")]
    MissingCustomerName,

    /// Nothing has been enqueued.
    #[error("no entries to process ({0} mode)")]
    NoEntries(Mode),

    /// `submit` was already called on this pipeline.
    #[error("pipeline was already submitted")]
    AlreadySubmitted,

    /// Stage tasks need a tokio runtime and none is running.
    #[error("no tokio runtime available to schedule processing")]
    NoRuntime,
}

impl SubmitError {
    /// Short headline suitable for a user-visible notice.
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingCustomerName => "Customer name required",
            Self::NoEntries(Mode::Bulk) => "No deals to process",
            Self::NoEntries(Mode::Single) => "No documents to process",
            Self::AlreadySubmitted => "Already submitted",
            Self::NoRuntime => "Processing unavailable",
        }
    }

    /// Longer explanation accompanying `title`.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingCustomerName => "Please enter a customer name before submitting.",
            Self::NoEntries(Mode::Bulk) => "Please upload some deal folders before submitting.",
            Self::NoEntries(Mode::Single) => "Please upload some documents before submitting.",
            Self::AlreadySubmitted => "These documents are already being processed.",
            Self::NoRuntime => "Processing could not be scheduled.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_error_notice_text() {
        let err = SubmitError::MissingCustomerName;
        assert_eq!(err.title(), "Customer name required");
        assert_eq!(err.description(), "Please enter a customer name before submitting.");

        let err = SubmitError::NoEntries(Mode::Bulk);
        assert_eq!(err.title(), "No deals to process");
        assert_eq!(err.description(), "Please upload some deal folders before submitting.");
    }

    #[test]
    fn test_transition_error_display() {
        let id = EntryId::from_u128(7);
        let err = IntakeError::InvalidTransition {
            id,
            from: EntryStatus::Extracting,
            to: EntryStatus::Uploading,
        };
        let text = err.to_string();
        assert!(text.contains("extracting -> uploading"), "unexpected message: {}", text);
    }
}
