//! Tracks the files of one upload widget from selection to server asset.
//!
//! Every transfer runs as its own Tokio task and reports back through a
//! channel; the manager is the only thing that mutates task state and it
//! applies those reports in arrival order when `update_state`,
//! `next_event` or `wait_idle` is called. Reports for a task that has since
//! been removed or restarted are dropped.
//!
//! The manager spawns onto the current Tokio runtime, so `accept`, `select`,
//! `drop_files` and `retry` must be called from within one.

use super::transfer::{ProgressFn, Transfer};
use super::types::{RemoteAsset, SourceFile, TaskStatus, UploadTask};
use super::validator::{validate, Validation, ValidationIssue};
use crate::config::UploadConfig;
use crate::error::TransferError;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type CompletionHook = Box<dyn Fn(&RemoteAsset) + Send + Sync>;

#[derive(Debug)]
enum TaskEvent {
    Progress {
        id: String,
        attempt: u32,
        percent: u8,
    },
    Completed {
        id: String,
        attempt: u32,
        asset: RemoteAsset,
    },
    Failed {
        id: String,
        attempt: u32,
        message: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct UploadManagerState {
    pub tasks: Vec<UploadTask>,
    pub is_dragging: bool,
    pub validation_errors: Vec<ValidationIssue>,
}

pub struct UploadManager {
    config: UploadConfig,
    transfer: Arc<dyn Transfer>,
    state: UploadManagerState,
    drag_depth: u32,
    in_flight: HashMap<String, AbortHandle>,
    events_tx: UnboundedSender<TaskEvent>,
    events_rx: UnboundedReceiver<TaskEvent>,
    on_upload_complete: Option<CompletionHook>,
}

impl UploadManager {
    /// Creates a manager seeded with `config.initial_files` as completed
    /// tasks. No request is made for them.
    pub fn new(config: UploadConfig, transfer: Arc<dyn Transfer>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let tasks: Vec<UploadTask> = config
            .initial_files
            .iter()
            .map(UploadTask::seeded)
            .collect();
        debug!("Upload manager created with {} seeded files", tasks.len());

        Self {
            config,
            transfer,
            state: UploadManagerState {
                tasks,
                ..UploadManagerState::default()
            },
            drag_depth: 0,
            in_flight: HashMap::new(),
            events_tx,
            events_rx,
            on_upload_complete: None,
        }
    }

    /// Called once for every task that reaches `Completed`.
    pub fn on_upload_complete(
        mut self,
        hook: impl Fn(&RemoteAsset) + Send + Sync + 'static,
    ) -> Self {
        self.on_upload_complete = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn state(&self) -> &UploadManagerState {
        &self.state
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.state.tasks
    }

    pub fn task(&self, id: &str) -> Option<&UploadTask> {
        self.state.tasks.iter().find(|t| t.id == id)
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging
    }

    pub fn validation_errors(&self) -> &[ValidationIssue] {
        &self.state.validation_errors
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.state
            .validation_errors
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn has_uploads_in_progress(&self) -> bool {
        self.state.tasks.iter().any(UploadTask::is_uploading)
    }

    pub fn drag_enter(&mut self) {
        self.drag_depth += 1;
        self.state.is_dragging = true;
    }

    /// Nested drag targets fire enter/leave in pairs; only the outermost
    /// leave ends the drag.
    pub fn drag_leave(&mut self) {
        self.drag_depth = self.drag_depth.saturating_sub(1);
        if self.drag_depth == 0 {
            self.state.is_dragging = false;
        }
    }

    pub fn drop_files(&mut self, files: Vec<SourceFile>) -> Vec<String> {
        self.drag_depth = 0;
        self.state.is_dragging = false;
        self.select(files)
    }

    /// File picker entry point. Keeps only the first file unless the widget
    /// allows multiple files.
    pub fn select(&mut self, mut files: Vec<SourceFile>) -> Vec<String> {
        if !self.config.multiple {
            files.truncate(1);
        }
        self.accept(files)
    }

    /// Validates the batch and starts an upload for every accepted file.
    /// Returns the ids of the new tasks; rejections land in
    /// `validation_errors`.
    pub fn accept(&mut self, files: Vec<SourceFile>) -> Vec<String> {
        let Validation { accepted, rejected } =
            validate(files, self.state.tasks.len(), &self.config);

        for issue in &rejected {
            info!("Rejected: {}", issue);
        }
        self.state.validation_errors.extend(rejected);

        let mut ids = Vec::with_capacity(accepted.len());
        for file in accepted {
            let id = Uuid::new_v4().to_string();
            self.state
                .tasks
                .push(UploadTask::uploading(id.clone(), file.clone()));
            self.spawn_upload(id.clone(), 0, file);
            ids.push(id);
        }
        ids
    }

    /// Restarts a failed upload. Anything other than a task in `Error` is
    /// left alone.
    pub fn retry(&mut self, id: &str) -> bool {
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            debug!("Retry ignored, no task {}", id);
            return false;
        };
        if task.status() != TaskStatus::Error {
            debug!("Retry ignored, task {} is {}", id, task.status());
            return false;
        }

        task.mark_uploading();
        let attempt = task.attempt;
        let file = task.file.clone();
        info!("Retrying '{}' (attempt {})", file.name, attempt);
        self.spawn_upload(id.to_string(), attempt, file);
        true
    }

    /// Drops a task. Its in-flight transfer is cancelled and its remote asset,
    /// if any, is deleted; a failed deletion is only logged.
    pub async fn remove(&mut self, id: &str) -> bool {
        let Some(index) = self.state.tasks.iter().position(|t| t.id == id) else {
            debug!("Remove ignored, no task {}", id);
            return false;
        };

        if let Some(handle) = self.in_flight.remove(id) {
            handle.abort();
        }

        if let Some(asset_id) = self.state.tasks[index].remote_asset_id() {
            if let Err(e) = self.transfer.remove(asset_id).await {
                warn!("Failed to delete asset {}: {}", asset_id, e);
            }
        }

        let task = self.state.tasks.remove(index);
        info!("Removed '{}'", task.file.name);
        true
    }

    /// Cancels every transfer, deletes every uploaded asset in one call and
    /// resets the file list and the validation errors.
    pub async fn clear_all(&mut self) {
        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }

        let asset_ids: Vec<String> = self
            .state
            .tasks
            .iter()
            .filter_map(|t| t.remote_asset_id().map(str::to_string))
            .collect();

        if !asset_ids.is_empty() {
            if let Err(e) = self.transfer.remove_many(&asset_ids).await {
                warn!("Bulk delete failed: {}", e);
            }
        }

        info!("Cleared {} files", self.state.tasks.len());
        self.state.tasks.clear();
        self.state.validation_errors.clear();
    }

    /// Applies every queued transfer report without waiting. Returns how many
    /// were applied.
    pub fn update_state(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Applies one report, waiting for it if uploads are still running.
    /// Returns false when there is nothing left to wait for.
    pub async fn next_event(&mut self) -> bool {
        if let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            return true;
        }
        if !self.has_uploads_in_progress() {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Processes reports until no task is uploading.
    pub async fn wait_idle(&mut self) {
        while self.next_event().await {}
        self.update_state();
    }

    fn spawn_upload(&mut self, id: String, attempt: u32, file: SourceFile) {
        let transfer = self.transfer.clone();
        let events = self.events_tx.clone();

        let progress_events = events.clone();
        let progress_id = id.clone();
        let on_progress: ProgressFn = Arc::new(move |percent| {
            let _ = progress_events.send(TaskEvent::Progress {
                id: progress_id.clone(),
                attempt,
                percent,
            });
        });

        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            let upload = AssertUnwindSafe(async move {
                let file = file.loaded().await?;
                transfer.upload(&file, on_progress).await
            })
            .catch_unwind();
            let event = match upload.await {
                Ok(Ok(asset)) => TaskEvent::Completed {
                    id: task_id,
                    attempt,
                    asset,
                },
                Ok(Err(e)) => TaskEvent::Failed {
                    id: task_id,
                    attempt,
                    message: e.to_string(),
                },
                Err(_) => TaskEvent::Failed {
                    id: task_id,
                    attempt,
                    message: TransferError::Aborted.to_string(),
                },
            };
            let _ = events.send(event);
        });

        if let Some(previous) = self.in_flight.insert(id, handle.abort_handle()) {
            previous.abort();
        }
    }

    /// The task a report belongs to, if it still exists and is still on the
    /// same attempt.
    fn live_task_mut(&mut self, id: &str, attempt: u32) -> Option<&mut UploadTask> {
        self.state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.attempt == attempt && t.is_uploading())
    }

    fn apply(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Progress {
                id,
                attempt,
                percent,
            } => match self.live_task_mut(&id, attempt) {
                Some(task) => {
                    task.set_progress(percent);
                    debug!("'{}' at {}%", task.file.name, task.progress());
                }
                None => debug!("Dropped stale progress for {}", id),
            },
            TaskEvent::Completed { id, attempt, asset } => {
                match self.live_task_mut(&id, attempt) {
                    Some(task) => {
                        task.mark_completed(&asset);
                        info!("'{}' completed as asset {}", task.file.name, asset.id);
                    }
                    None => {
                        debug!("Dropped stale completion for {}", id);
                        return;
                    }
                }
                self.in_flight.remove(&id);
                if let Some(hook) = &self.on_upload_complete {
                    hook(&asset);
                }
            }
            TaskEvent::Failed {
                id,
                attempt,
                message,
            } => {
                match self.live_task_mut(&id, attempt) {
                    Some(task) => {
                        warn!("'{}' failed: {}", task.file.name, message);
                        task.mark_failed(message);
                    }
                    None => {
                        debug!("Dropped stale failure for {}", id);
                        return;
                    }
                }
                self.in_flight.remove(&id);
            }
        }
    }
}

impl Drop for UploadManager {
    /// Transfers never outlive the manager that tracks them.
    fn drop(&mut self) {
        for (id, handle) in self.in_flight.drain() {
            debug!("Aborting upload {} on shutdown", id);
            handle.abort();
        }
    }
}
