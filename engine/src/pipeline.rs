//! Pipeline orchestration.
//!
//! This module provides the pipeline lifecycle:
//! - Enqueuing a selection (grouped into waiting entries)
//! - Editing or removing queued work until submission
//! - Submitting, which schedules one cancellable stage task per entry
//! - Observing entries until every one is terminal (drained)
//!
//! All entry mutation happens under a single lock that is never held across
//! an `.await`; stage tasks only sleep between applications.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{IntakeError, SubmitError};
use crate::ids::{IdSource, RandomIds};
use crate::model::{DealForm, DrainSummary, EntryId, EntryStatus, Mode, SelectedFile, UploadEntry};
use crate::progress::{NoopObserver, PipelineObserver};
use crate::selection::group_selection;
use crate::stages::{apply_stage, Stage, StagePlan};

/// Returned by a successful `Pipeline::submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub mode: Mode,
    /// Entries scheduled for processing
    pub entry_count: usize,
    /// Deal id of a single-deal submission (entered or generated)
    pub deal_id: Option<String>,
    pub customer_name: Option<String>,
}

/// Drain progress published to `wait_drained` callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainState {
    Pending,
    Drained(DrainSummary),
    Cancelled,
}

/// Handle to one entry's scheduled stage sequence.
#[derive(Debug)]
pub struct StageHandle {
    entry_id: EntryId,
    task: JoinHandle<()>,
}

impl StageHandle {
    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    /// Stop the sequence; stages not yet applied never will be.
    pub fn revoke(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Mutable pipeline state, guarded by one lock.
#[derive(Debug, Default)]
struct Board {
    entries: IndexMap<EntryId, UploadEntry>,
    form: DealForm,
    submitted: bool,
    /// Set by shutdown; stage applications are refused afterwards
    closed: bool,
    summary: Option<DrainSummary>,
}

impl Board {
    fn ensure_editable(&self) -> Result<(), IntakeError> {
        if self.submitted {
            return Err(IntakeError::Frozen);
        }
        Ok(())
    }

    /// Compute the summary the first time every entry is terminal.
    fn settle(&mut self) -> Option<DrainSummary> {
        if !self.submitted || self.summary.is_some() || self.entries.is_empty() {
            return None;
        }
        if !self.entries.values().all(|e| e.status.is_terminal()) {
            return None;
        }
        let failed = self
            .entries
            .values()
            .filter(|e| e.status == EntryStatus::Error)
            .count();
        let summary = DrainSummary {
            succeeded: self.entries.len() - failed,
            failed,
        };
        self.summary = Some(summary);
        Some(summary)
    }
}

/// Result of applying one stage, captured while the lock was held.
struct AppliedStage {
    entry: UploadEntry,
    drained: Option<DrainSummary>,
}

/// Everything a stage task needs, cloned into each task.
#[derive(Clone)]
struct StageRunner {
    mode: Mode,
    plan: StagePlan,
    config: Arc<PipelineConfig>,
    ids: Arc<dyn IdSource>,
    observer: Arc<dyn PipelineObserver>,
    board: Arc<Mutex<Board>>,
    drain_tx: Arc<watch::Sender<DrainState>>,
}

impl StageRunner {
    async fn run(self, id: EntryId, start_delay: Duration) {
        if !start_delay.is_zero() {
            tokio::time::sleep(start_delay).await;
        }

        let stages = self.plan.stages();
        for (index, stage) in stages.iter().enumerate() {
            let Some(applied) = self.apply(id, stage) else {
                return;
            };

            self.observer.on_entry_advanced(&applied.entry);
            if let Some(summary) = applied.drained {
                info!(
                    mode = %self.mode,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "pipeline drained"
                );
                self.observer.on_drained(self.mode, &summary);
                self.drain_tx.send_replace(DrainState::Drained(summary));
            }

            if applied.entry.status.is_terminal() {
                return;
            }
            if index + 1 < stages.len() {
                tokio::time::sleep(self.config.scaled(stage.hold)).await;
            }
        }
    }

    fn apply(&self, id: EntryId, stage: &Stage) -> Option<AppliedStage> {
        let mut board = self.board.lock();
        if board.closed {
            return None;
        }
        let entry = board.entries.get_mut(&id)?;

        if let Err(e) = apply_stage(entry, stage, &self.config, self.ids.as_ref()) {
            warn!(entry = %id, error = %e, "stage rejected");
            return None;
        }

        if entry.status == EntryStatus::Error {
            warn!(
                entry = %id,
                name = %entry.name,
                reason = entry.error_message.as_deref().unwrap_or("unknown"),
                "entry failed"
            );
        } else {
            debug!(
                entry = %id,
                status = %entry.status,
                progress = entry.progress,
                "stage applied"
            );
        }

        let entry = entry.clone();
        let drained = board.settle();
        Some(AppliedStage { entry, drained })
    }
}

/// The simulated upload pipeline.
///
/// Owns the entry map and the stage tasks. Dropping the pipeline revokes
/// every task that is still scheduled.
pub struct Pipeline {
    mode: Mode,
    config: Arc<PipelineConfig>,
    ids: Arc<dyn IdSource>,
    observer: Arc<dyn PipelineObserver>,
    board: Arc<Mutex<Board>>,
    drain_tx: Arc<watch::Sender<DrainState>>,
    handles: Vec<StageHandle>,
}

impl Pipeline {
    /// Create an empty pipeline with random ids and no observer.
    ///
    /// # Errors
    /// Returns `IntakeError::InvalidConfig` if `config` fails validation.
    pub fn new(mode: Mode, config: PipelineConfig) -> Result<Self, IntakeError> {
        config.validate()?;
        let (drain_tx, _) = watch::channel(DrainState::Pending);
        Ok(Pipeline {
            mode,
            config: Arc::new(config),
            ids: Arc::new(RandomIds::new()),
            observer: Arc::new(NoopObserver),
            board: Arc::new(Mutex::new(Board::default())),
            drain_tx: Arc::new(drain_tx),
            handles: Vec::new(),
        })
    }

    /// Replace the identifier source.
    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Add a selection as waiting entries and return their ids.
    ///
    /// Existing entries are left untouched. File contents and types are not
    /// checked here.
    ///
    /// # Errors
    /// Returns `IntakeError::Frozen` after submission.
    pub fn enqueue(&self, files: Vec<SelectedFile>) -> Result<Vec<EntryId>, IntakeError> {
        let mut board = self.board.lock();
        board.ensure_editable()?;

        let file_count = files.len();
        let entries = group_selection(self.mode, files, &self.config, self.ids.as_ref());
        let ids: Vec<EntryId> = entries.iter().map(|e| e.id).collect();
        for entry in entries {
            board.entries.insert(entry.id, entry);
        }

        info!(
            mode = %self.mode,
            files = file_count,
            entries = ids.len(),
            queued = board.entries.len(),
            "selection enqueued"
        );
        Ok(ids)
    }

    /// Delete a queued entry. Returns `false` if no entry has that id.
    ///
    /// # Errors
    /// Returns `IntakeError::Frozen` after submission; nothing is removed.
    pub fn remove(&self, id: EntryId) -> Result<bool, IntakeError> {
        let mut board = self.board.lock();
        board.ensure_editable()?;
        let removed = board.entries.shift_remove(&id).is_some();
        if removed {
            debug!(entry = %id, "entry removed");
        }
        Ok(removed)
    }

    pub fn set_deal_id(&self, deal_id: impl Into<String>) -> Result<(), IntakeError> {
        let mut board = self.board.lock();
        board.ensure_editable()?;
        board.form.deal_id = deal_id.into();
        Ok(())
    }

    pub fn set_customer_name(&self, name: impl Into<String>) -> Result<(), IntakeError> {
        let mut board = self.board.lock();
        board.ensure_editable()?;
        board.form.customer_name = name.into();
        Ok(())
    }

    pub fn set_notes(&self, notes: impl Into<String>) -> Result<(), IntakeError> {
        let mut board = self.board.lock();
        board.ensure_editable()?;
        board.form.notes = notes.into();
        Ok(())
    }

    pub fn form(&self) -> DealForm {
        self.board.lock().form.clone()
    }

    /// Freeze the pipeline and schedule every queued entry.
    ///
    /// Single-deal entries start immediately; bulk entries start
    /// `bulk_stagger_ms` apart in queue order. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    /// Returns a `SubmitError` (and changes nothing) when the customer name
    /// is blank in single mode, nothing is queued, the pipeline was already
    /// submitted, or no runtime is available.
    pub fn submit(&mut self) -> Result<SubmitReceipt, SubmitError> {
        let (receipt, queued, runtime) = {
            let mut board = self.board.lock();
            if self.mode == Mode::Single && board.form.customer_name.trim().is_empty() {
                return Err(SubmitError::MissingCustomerName);
            }
            if board.entries.is_empty() {
                return Err(SubmitError::NoEntries(self.mode));
            }
            if board.submitted {
                return Err(SubmitError::AlreadySubmitted);
            }
            let runtime = Handle::try_current().map_err(|_| SubmitError::NoRuntime)?;

            board.submitted = true;
            let receipt = match self.mode {
                Mode::Single => {
                    if board.form.deal_id.trim().is_empty() {
                        board.form.deal_id = self.ids.deal_id();
                    }
                    SubmitReceipt {
                        mode: self.mode,
                        entry_count: board.entries.len(),
                        deal_id: Some(board.form.deal_id.clone()),
                        customer_name: Some(board.form.customer_name.trim().to_string()),
                    }
                }
                Mode::Bulk => SubmitReceipt {
                    mode: self.mode,
                    entry_count: board.entries.len(),
                    deal_id: None,
                    customer_name: None,
                },
            };
            let queued: Vec<EntryId> = board.entries.keys().copied().collect();
            (receipt, queued, runtime)
        };

        info!(
            mode = %self.mode,
            entries = receipt.entry_count,
            deal_id = receipt.deal_id.as_deref().unwrap_or("-"),
            "processing started"
        );
        self.observer.on_submitted(&receipt);

        let runner = StageRunner {
            mode: self.mode,
            plan: StagePlan::for_mode(self.mode),
            config: Arc::clone(&self.config),
            ids: Arc::clone(&self.ids),
            observer: Arc::clone(&self.observer),
            board: Arc::clone(&self.board),
            drain_tx: Arc::clone(&self.drain_tx),
        };
        for (position, entry_id) in queued.into_iter().enumerate() {
            let start_delay = match self.mode {
                Mode::Single => Duration::ZERO,
                Mode::Bulk => self.config.stagger_for(position),
            };
            let task = runtime.spawn(runner.clone().run(entry_id, start_delay));
            self.handles.push(StageHandle { entry_id, task });
        }

        Ok(receipt)
    }

    /// Revoke every scheduled stage task.
    ///
    /// Entries keep the state they had; pending `wait_drained` calls fail
    /// with `IntakeError::Cancelled` unless the pipeline already drained.
    pub fn shutdown(&mut self) {
        {
            // Publish a summary settled by a task that has not sent it yet.
            let mut board = self.board.lock();
            board.closed = true;
            let settled = board.summary;
            self.drain_tx.send_if_modified(|state| {
                if *state != DrainState::Pending {
                    return false;
                }
                *state = match settled {
                    Some(summary) => DrainState::Drained(summary),
                    None => DrainState::Cancelled,
                };
                true
            });
        }
        let revoked = self.handles.iter().filter(|h| !h.is_finished()).count();
        for handle in self.handles.drain(..) {
            handle.revoke();
        }
        if revoked > 0 {
            info!(revoked, "pipeline shut down with stages in flight");
        }
    }

    /// Wait until every entry is terminal and return the summary.
    ///
    /// # Errors
    /// Returns `IntakeError::NotSubmitted` if `submit` has not succeeded yet,
    /// and `IntakeError::Cancelled` if the pipeline is shut down first.
    pub async fn wait_drained(&self) -> Result<DrainSummary, IntakeError> {
        if !self.board.lock().submitted {
            return Err(IntakeError::NotSubmitted);
        }
        let mut rx = self.drain_tx.subscribe();
        let state = *rx
            .wait_for(|state| *state != DrainState::Pending)
            .await
            .map_err(|_| IntakeError::Cancelled)?;
        match state {
            DrainState::Drained(summary) => Ok(summary),
            DrainState::Pending | DrainState::Cancelled => Err(IntakeError::Cancelled),
        }
    }

    /// All entries in insertion order.
    pub fn snapshot(&self) -> Vec<UploadEntry> {
        self.board.lock().entries.values().cloned().collect()
    }

    pub fn entry(&self, id: EntryId) -> Option<UploadEntry> {
        self.board.lock().entries.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.board.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.board.lock().entries.is_empty()
    }

    pub fn is_submitted(&self) -> bool {
        self.board.lock().submitted
    }

    pub fn is_drained(&self) -> bool {
        self.board.lock().summary.is_some()
    }

    /// The drain summary, once every entry is terminal.
    pub fn summary(&self) -> Option<DrainSummary> {
        self.board.lock().summary
    }

    /// Handles of the scheduled stage sequences, in submission order.
    pub fn handles(&self) -> &[StageHandle] {
        &self.handles
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
