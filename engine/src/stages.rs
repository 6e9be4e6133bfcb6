//! Fixed stage plans for both pipeline variants.
//!
//! A plan is an ordered list of stages. The runner applies a stage, then
//! holds for that stage's delay before applying the next one; the hold of
//! the last stage is never waited on.

use std::time::Duration;

use crate::config::PipelineConfig;
use crate::error::IntakeError;
use crate::ids::IdSource;
use crate::model::{EntrySource, EntryStatus, Mode, SyntheticDeal, UploadEntry};

/// Classification used when no keyword matches the file name.
pub const DEFAULT_CLASSIFICATION: &str = "Title Document";

/// Keyword table for the deal document types, checked in order.
const CLASSIFICATION_KEYWORDS: &[(&[&str], &str)] = &[
    (&["bill_of_sale", "bill of sale", "bill-of-sale"], "Bill of Sale"),
    (&["mv7d"], "MV-7D"),
    (&["mv1"], "MV-1"),
    (&["odometer"], "Odometer"),
    (&["power_of_attorney", "power of attorney", "poa"], "Power of Attorney"),
    (&["title"], "Title Document"),
];

/// Side effect performed when a stage is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEffect {
    None,
    /// Fail zero-byte files
    CheckPayload,
    /// Fail unsupported formats, otherwise set `classification`
    Classify,
    /// Set `extracted_field_count`
    Extract,
    /// Attach the synthetic deal id and customer name
    AssignDeal,
    /// Fail folders without a single supported document
    CheckFolder,
}

/// One (status, progress, hold) step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub status: EntryStatus,
    pub progress: u8,
    /// Time spent in this stage before the next one is applied
    pub hold: Duration,
    pub effect: StageEffect,
}

const fn stage(status: EntryStatus, progress: u8, hold_ms: u64, effect: StageEffect) -> Stage {
    Stage {
        status,
        progress,
        hold: Duration::from_millis(hold_ms),
        effect,
    }
}

const SINGLE_STAGES: &[Stage] = &[
    stage(EntryStatus::Uploading, 20, 1000, StageEffect::CheckPayload),
    stage(EntryStatus::Classifying, 40, 2000, StageEffect::Classify),
    stage(EntryStatus::Extracting, 70, 3000, StageEffect::Extract),
    stage(EntryStatus::Validating, 90, 1500, StageEffect::None),
    stage(EntryStatus::Completed, 100, 500, StageEffect::None),
];

const BULK_STAGES: &[Stage] = &[
    stage(EntryStatus::Processing, 0, 1000, StageEffect::AssignDeal),
    stage(EntryStatus::Processing, 25, 2000, StageEffect::CheckFolder),
    stage(EntryStatus::Processing, 50, 3000, StageEffect::None),
    stage(EntryStatus::Processing, 75, 2500, StageEffect::None),
    stage(EntryStatus::Processing, 100, 1000, StageEffect::None),
    stage(EntryStatus::Completed, 100, 0, StageEffect::None),
];

/// The ordered stage list for a pipeline variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    stages: &'static [Stage],
}

impl StagePlan {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Single => StagePlan {
                stages: SINGLE_STAGES,
            },
            Mode::Bulk => StagePlan {
                stages: BULK_STAGES,
            },
        }
    }

    pub fn stages(&self) -> &'static [Stage] {
        self.stages
    }

    /// Total unscaled time from the first stage to the last one.
    pub fn total_duration(&self) -> Duration {
        let holds = self.stages.len().saturating_sub(1);
        self.stages[..holds].iter().map(|s| s.hold).sum()
    }
}

/// Pick a document type from keywords in the file name.
pub fn classify_document(file_name: &str) -> &'static str {
    let lowered = file_name.to_lowercase();
    CLASSIFICATION_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, label)| *label)
        .unwrap_or(DEFAULT_CLASSIFICATION)
}

/// Apply `stage` to `entry`: run its effect, then move status and progress.
///
/// A failing check marks the entry `Error` instead of advancing it.
pub fn apply_stage(
    entry: &mut UploadEntry,
    stage: &Stage,
    config: &PipelineConfig,
    ids: &dyn IdSource,
) -> Result<(), IntakeError> {
    if let Some(reason) = check_failure(entry, stage.effect, config) {
        return entry.fail(reason);
    }

    entry.advance(stage.status, stage.progress)?;

    match stage.effect {
        StageEffect::Classify => {
            entry.classification = Some(classify_document(&entry.name).to_string());
        }
        StageEffect::Extract => {
            entry.extracted_field_count = Some(config.extracted_field_count);
        }
        StageEffect::AssignDeal => {
            if entry.synthetic_deal.is_none() {
                entry.synthetic_deal = Some(SyntheticDeal {
                    deal_id: ids.deal_id(),
                    customer_name: ids.customer_name(),
                });
            }
        }
        StageEffect::None | StageEffect::CheckPayload | StageEffect::CheckFolder => {}
    }
    Ok(())
}

fn check_failure(
    entry: &UploadEntry,
    effect: StageEffect,
    config: &PipelineConfig,
) -> Option<&'static str> {
    match (effect, &entry.source) {
        (StageEffect::CheckPayload, EntrySource::File { size_bytes: 0 })
            if config.reject_empty_files =>
        {
            Some("file is empty")
        }
        (StageEffect::Classify, EntrySource::File { .. })
            if config.reject_unsupported_formats && !config.accepts(&entry.name) =>
        {
            Some("unsupported document format")
        }
        (StageEffect::CheckFolder, EntrySource::Folder { supported_count: 0, .. })
            if config.reject_unsupported_formats =>
        {
            Some("folder contains no supported documents")
        }
        _ => None,
    }
}
