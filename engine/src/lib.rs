//! # Deal Intake Engine - Simulated Document Pipeline
//!
//! A headless model of the vehicle-deal document intake workflow.
//! Designed as the foundation for multiple front ends (CLI, GUI, tests).
//!
//! ## Overview
//!
//! Uploaded documents are grouped into entries and walked through a fixed
//! sequence of simulated stages once the deal is submitted:
//! - Single-deal mode: one entry per file, uploading through validating
//! - Bulk mode: one entry per folder, with a synthetic deal attached
//! - Per-entry failure isolation (empty or unsupported documents)
//! - Progress reporting via an observer trait (decoupled from UI technology)
//! - Cancellable stage tasks, revoked on shutdown or drop
//!
//! ## Basic Usage
//!
//! ```no_run
//! use intake_engine::{Mode, Pipeline, PipelineConfig, SelectedFile};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = Pipeline::new(Mode::Single, PipelineConfig::default())?;
//! pipeline.enqueue(vec![
//!     SelectedFile::new("title.pdf", 48_213),
//!     SelectedFile::new("bill_of_sale.pdf", 20_511),
//! ])?;
//! pipeline.set_customer_name("Jane Doe")?;
//!
//! let receipt = pipeline.submit()?;
//! println!("Processing {} documents", receipt.entry_count);
//!
//! let summary = pipeline.wait_drained().await?;
//! println!("{}", summary.message(pipeline.mode()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (UploadEntry, EntryStatus, SelectedFile)
//! - **error**: Error types
//! - **config**: Pipeline tunables and TOML loading
//! - **ids**: Injected identifier sources
//! - **selection**: Grouping a selection into entries
//! - **stages**: Fixed stage plans and stage effects
//! - **pipeline**: Orchestration (enqueue, remove, submit, drain)
//! - **progress**: Observer trait
//! - **fs_ops**: Building selections from disk
//! - **display**: Status text and size formatting

pub mod config;
pub mod display;
pub mod error;
pub mod fs_ops;
pub mod ids;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod selection;
pub mod stages;

// Re-export main types and functions
pub use config::PipelineConfig;
pub use display::{format_file_size, status_text};
pub use error::{IntakeError, SubmitError};
pub use fs_ops::{scan_selection, select_file};
pub use ids::{IdSource, RandomIds, SequentialIds};
pub use model::{
    DealForm, DrainSummary, EntryId, EntrySource, EntryStatus, Mode, SelectedFile, SyntheticDeal,
    UploadEntry,
};
pub use pipeline::{Pipeline, StageHandle, SubmitReceipt};
pub use progress::{ChannelObserver, NoopObserver, PipelineEvent, PipelineObserver};
pub use stages::{classify_document, Stage, StageEffect, StagePlan};
