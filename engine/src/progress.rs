//! Progress reporting trait.
//!
//! This module defines the PipelineObserver trait, which decouples the
//! pipeline from whatever surfaces its progress (CLI, GUI, tests).
//!
//! Callbacks run on the stage tasks, outside the pipeline lock. Calls for
//! one entry arrive in stage order; calls for different entries interleave.

use crossbeam_channel::Sender;

use crate::model::{DrainSummary, Mode, UploadEntry};
use crate::pipeline::SubmitReceipt;

/// Trait for receiving progress updates from a pipeline.
pub trait PipelineObserver: Send + Sync {
    /// Called once when a submission is accepted, before any stage runs.
    fn on_submitted(&self, receipt: &SubmitReceipt);

    /// Called after every stage application with the entry's new state.
    fn on_entry_advanced(&self, entry: &UploadEntry);

    /// Called exactly once, when the last entry becomes terminal.
    fn on_drained(&self, mode: Mode, summary: &DrainSummary);
}

/// Observer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_submitted(&self, _receipt: &SubmitReceipt) {}

    fn on_entry_advanced(&self, _entry: &UploadEntry) {}

    fn on_drained(&self, _mode: Mode, _summary: &DrainSummary) {}
}

/// Pipeline updates as plain values, for channel-based consumers.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Submitted(SubmitReceipt),
    EntryAdvanced(UploadEntry),
    Drained { mode: Mode, summary: DrainSummary },
}

/// A PipelineObserver that forwards updates over a channel.
pub struct ChannelObserver {
    sender: Sender<PipelineEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<PipelineEvent>) -> Self {
        ChannelObserver { sender }
    }
}

impl PipelineObserver for ChannelObserver {
    fn on_submitted(&self, receipt: &SubmitReceipt) {
        let _ = self.sender.send(PipelineEvent::Submitted(receipt.clone()));
    }

    fn on_entry_advanced(&self, entry: &UploadEntry) {
        let _ = self.sender.send(PipelineEvent::EntryAdvanced(entry.clone()));
    }

    fn on_drained(&self, mode: Mode, summary: &DrainSummary) {
        let _ = self.sender.send(PipelineEvent::Drained {
            mode,
            summary: *summary,
        });
    }
}
