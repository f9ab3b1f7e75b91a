use crate::error::TransferError;
use bytes::Bytes;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file picked or dropped by the user, with its payload already loaded.
#[derive(Derivative, Clone, PartialEq)]
#[derivative(Debug)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    #[derivative(Debug = "ignore")]
    pub data: Bytes,
    pub path: Option<PathBuf>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            mime_type: mime_type.into(),
            data,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// A file on disk known only by its metadata. The payload is read by
    /// `loaded` once the file has passed validation.
    pub fn on_disk(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: u64,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            data: Bytes::new(),
            path: Some(path.into()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.size == 0 || !self.data.is_empty() || self.path.is_none()
    }

    /// This file with its payload in memory, reading it from `path` if it
    /// has not been read yet.
    pub async fn loaded(&self) -> Result<SourceFile, TransferError> {
        let path = match &self.path {
            Some(path) if !self.is_loaded() => path,
            _ => return Ok(self.clone()),
        };

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| TransferError::Read(format!("{}: {}", path.display(), e)))?;
        let mut file = self.clone();
        file.size = data.len() as u64;
        file.data = Bytes::from(data);
        Ok(file)
    }

    /// Placeholder for a file that only exists remotely. Carries the
    /// descriptor's size but no payload.
    pub fn from_descriptor(descriptor: &FileDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            size: descriptor.size,
            mime_type: descriptor.mime_type.clone(),
            data: Bytes::new(),
            path: None,
        }
    }

    /// Preview shown while the file is still local.
    pub fn local_preview(&self, task_id: &str) -> String {
        match &self.path {
            Some(path) => format!("file://{}", path.display()),
            None => format!("blob:{}", task_id),
        }
    }
}

/// An already-uploaded file used to seed the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub url: String,
}

/// The server-side copy of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: String,
    pub url: String,
    pub name: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
}

/// One page of the remote asset listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPage {
    pub items: Vec<RemoteAsset>,
    pub offset: u64,
    pub limit: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Uploading,
    Completed,
    Error,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskStatus::Uploading => "uploading",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Transfer state of one tracked file.
///
/// `status`, `error` and `remote_asset_id` only change together through the
/// `mark_*` methods, so `remote_asset_id` is set exactly when the task is
/// completed and `error` exactly when it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    pub id: String,
    pub file: SourceFile,
    pub preview_url: String,
    progress: u8,
    status: TaskStatus,
    error: Option<String>,
    remote_asset_id: Option<String>,
    pub(crate) attempt: u32,
}

impl UploadTask {
    pub(crate) fn uploading(id: String, file: SourceFile) -> Self {
        let preview_url = file.local_preview(&id);
        Self {
            id,
            file,
            preview_url,
            progress: 0,
            status: TaskStatus::Uploading,
            error: None,
            remote_asset_id: None,
            attempt: 0,
        }
    }

    pub(crate) fn seeded(descriptor: &FileDescriptor) -> Self {
        Self {
            id: descriptor.id.clone(),
            file: SourceFile::from_descriptor(descriptor),
            preview_url: descriptor.url.clone(),
            progress: 100,
            status: TaskStatus::Completed,
            error: None,
            remote_asset_id: Some(descriptor.id.clone()),
            attempt: 0,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn remote_asset_id(&self) -> Option<&str> {
        self.remote_asset_id.as_deref()
    }

    pub fn is_uploading(&self) -> bool {
        self.status == TaskStatus::Uploading
    }

    /// Restart the transfer: progress back to zero, previous error dropped.
    pub(crate) fn mark_uploading(&mut self) {
        self.status = TaskStatus::Uploading;
        self.progress = 0;
        self.error = None;
        self.remote_asset_id = None;
        self.attempt += 1;
    }

    /// Progress never moves backwards within an attempt.
    pub(crate) fn set_progress(&mut self, percent: u8) {
        if self.status == TaskStatus::Uploading {
            self.progress = self.progress.max(percent.min(100));
        }
    }

    pub(crate) fn mark_completed(&mut self, asset: &RemoteAsset) {
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.error = None;
        self.remote_asset_id = Some(asset.id.clone());
        self.preview_url = asset.url.clone();
    }

    pub(crate) fn mark_failed(&mut self, message: String) {
        self.status = TaskStatus::Error;
        self.error = Some(message);
        self.remote_asset_id = None;
    }
}
