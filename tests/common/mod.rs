//! Scripted `Transfer` double shared by the integration tests.

#![allow(dead_code)]

use asset_uploader::error::TransferError;
use asset_uploader::upload::{
    AssetPage, ProgressFn, RemoteAsset, SourceFile, TaskStatus, Transfer, UploadManager,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

pub const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed,
    Fail(String),
}

/// Uploads succeed unless an outcome is queued for the file name. A gate can
/// hold an upload open until the test releases it.
#[derive(Default)]
pub struct ScriptedTransfer {
    outcomes: Mutex<HashMap<String, VecDeque<Outcome>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    pub progress_steps: Vec<u8>,
    pub fail_removes: bool,
    pub removed: Mutex<Vec<String>>,
    pub remove_many_calls: Mutex<Vec<Vec<String>>>,
    /// Name and payload length of every upload attempt.
    pub payloads: Mutex<Vec<(String, usize)>>,
    uploads: AtomicUsize,
}

impl ScriptedTransfer {
    pub fn new() -> Self {
        Self {
            progress_steps: vec![25, 50, 75],
            ..Self::default()
        }
    }

    pub fn failing_removes() -> Self {
        Self {
            fail_removes: true,
            ..Self::new()
        }
    }

    pub fn queue(&self, name: &str, outcome: Outcome) {
        self.outcomes
            .lock()
            .entry(name.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Holds the next upload of `name` until the returned sender fires.
    pub fn gate(&self, name: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(name.to_string(), rx);
        tx
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transfer for ScriptedTransfer {
    async fn upload(
        &self,
        file: &SourceFile,
        on_progress: ProgressFn,
    ) -> Result<RemoteAsset, TransferError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().push((file.name.clone(), file.data.len()));
        for step in &self.progress_steps {
            on_progress(*step);
        }

        let gate = self.gates.lock().remove(&file.name);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let outcome = self
            .outcomes
            .lock()
            .get_mut(&file.name)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Outcome::Succeed);

        match outcome {
            Outcome::Succeed => {
                on_progress(100);
                Ok(RemoteAsset {
                    id: format!("asset-{}-{}", file.name, n),
                    url: format!("https://cdn.example.com/{}", file.name),
                    name: Some(file.name.clone()),
                    size: Some(file.size),
                    mime_type: Some(file.mime_type.clone()),
                })
            }
            Outcome::Fail(message) => Err(TransferError::Network(message)),
        }
    }

    async fn upload_many(
        &self,
        files: &[SourceFile],
        on_progress: ProgressFn,
    ) -> Result<Vec<RemoteAsset>, TransferError> {
        let mut assets = Vec::new();
        for file in files {
            assets.push(self.upload(file, on_progress.clone()).await?);
        }
        Ok(assets)
    }

    async fn remove(&self, asset_id: &str) -> Result<(), TransferError> {
        self.removed.lock().push(asset_id.to_string());
        if self.fail_removes {
            Err(TransferError::Status(500))
        } else {
            Ok(())
        }
    }

    async fn remove_many(&self, asset_ids: &[String]) -> Result<(), TransferError> {
        self.remove_many_calls.lock().push(asset_ids.to_vec());
        if self.fail_removes {
            Err(TransferError::PartialDelete {
                failed: asset_ids.to_vec(),
                total: asset_ids.len(),
            })
        } else {
            Ok(())
        }
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<AssetPage, TransferError> {
        Ok(AssetPage {
            offset,
            limit,
            ..AssetPage::default()
        })
    }
}

pub fn file(name: &str, size: usize) -> SourceFile {
    SourceFile::new(name, "application/octet-stream", vec![0u8; size])
}

/// A file that claims `size` bytes without allocating them.
pub fn sized(name: &str, size: u64) -> SourceFile {
    let mut file = SourceFile::new(name, "application/octet-stream", Vec::new());
    file.size = size;
    file
}

/// Status, error and asset id must always agree.
pub fn assert_task_invariants(manager: &UploadManager) {
    assert!(manager.tasks().len() <= manager.config().max_files);
    for task in manager.tasks() {
        assert_eq!(
            task.status() == TaskStatus::Completed,
            task.remote_asset_id().is_some(),
            "asset id out of sync for {}",
            task.file.name
        );
        assert_eq!(
            task.status() == TaskStatus::Error,
            task.error().is_some(),
            "error out of sync for {}",
            task.file.name
        );
        if task.status() == TaskStatus::Completed {
            assert_eq!(task.progress(), 100);
        }
    }
}
