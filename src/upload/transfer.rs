use super::normalize;
use super::types::{AssetPage, RemoteAsset, SourceFile};
use crate::config::ClientConfig;
use crate::error::TransferError;
use crate::session::Session;
use crate::utils::file_type::DEFAULT_MIME_TYPE;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response, Url};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receives upload completion as a whole percentage.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

pub const SINGLE_UPLOAD_PATH: &str = "/f/s";
pub const BATCH_UPLOAD_PATH: &str = "/f/m";
pub const LIST_PATH: &str = "/f/g";
pub const SINGLE_FIELD: &str = "file";
pub const BATCH_FIELD: &str = "files";

/// Remote file storage.
///
/// `on_progress` is called with non-decreasing values and, on success, the
/// last call before the future resolves reports 100.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn upload(
        &self,
        file: &SourceFile,
        on_progress: ProgressFn,
    ) -> Result<RemoteAsset, TransferError>;

    async fn upload_many(
        &self,
        files: &[SourceFile],
        on_progress: ProgressFn,
    ) -> Result<Vec<RemoteAsset>, TransferError>;

    async fn remove(&self, asset_id: &str) -> Result<(), TransferError>;

    /// Deletes one after another. Earlier deletions stand when a later one
    /// fails; every id is attempted and the failures are reported together.
    async fn remove_many(&self, asset_ids: &[String]) -> Result<(), TransferError> {
        let mut failed = Vec::new();
        for asset_id in asset_ids {
            if let Err(e) = self.remove(asset_id).await {
                warn!("Failed to delete asset {}: {}", asset_id, e);
                failed.push(asset_id.clone());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(TransferError::PartialDelete {
                failed,
                total: asset_ids.len(),
            })
        }
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<AssetPage, TransferError>;
}

pub(crate) fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let sent = sent.min(total) as u128;
    ((sent * 100 + total as u128 / 2) / total as u128) as u8
}

/// Byte counter shared by every body chunk of one request.
struct ProgressTracker {
    sent: AtomicU64,
    total: u64,
    last: AtomicU8,
    on_progress: ProgressFn,
}

impl ProgressTracker {
    fn new(total: u64, on_progress: ProgressFn) -> Arc<Self> {
        Arc::new(Self {
            sent: AtomicU64::new(0),
            total,
            last: AtomicU8::new(0),
            on_progress,
        })
    }

    fn advance(&self, bytes: u64) {
        let sent = self.sent.fetch_add(bytes, Ordering::SeqCst) + bytes;
        self.report(percent_of(sent, self.total));
    }

    fn finish(&self) {
        self.report(100);
    }

    fn report(&self, percent: u8) {
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            (self.on_progress)(percent);
        }
    }
}

fn split_chunks(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect()
}

fn progress_body(data: Bytes, chunk_size: usize, tracker: Arc<ProgressTracker>) -> Body {
    let stream = futures::stream::iter(split_chunks(&data, chunk_size)).map(move |chunk| {
        tracker.advance(chunk.len() as u64);
        Ok::<_, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}

/// `Transfer` over the storage REST API.
#[derive(Clone)]
pub struct HttpTransfer {
    client: Client,
    base_url: String,
    chunk_size: usize,
    session: Arc<Session>,
}

impl HttpTransfer {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransferError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chunk_size: config.chunk_size,
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/f/{asset_id}` with the id escaped as a single path segment.
    fn asset_url(&self, asset_id: &str) -> Result<Url, TransferError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TransferError::Client(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| TransferError::Client(format!("Base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(["f", asset_id]);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn part(&self, file: &SourceFile, tracker: Arc<ProgressTracker>) -> Result<Part, TransferError> {
        let mime_type = if file.mime_type.is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            file.mime_type.as_str()
        };
        let body = progress_body(file.data.clone(), self.chunk_size, tracker);
        Part::stream_with_length(body, file.data.len() as u64)
            .file_name(file.name.clone())
            .mime_str(mime_type)
            .map_err(|e| TransferError::Client(format!("Invalid MIME type {}: {}", mime_type, e)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Bytes, TransferError> {
        let response: Response = self.authorized(request).send().await.map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status(status.as_u16()));
        }

        response.bytes().await.map_err(map_send_error)
    }
}

fn map_send_error(e: reqwest::Error) -> TransferError {
    if e.is_timeout() {
        TransferError::Aborted
    } else {
        TransferError::from(e)
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn upload(
        &self,
        file: &SourceFile,
        on_progress: ProgressFn,
    ) -> Result<RemoteAsset, TransferError> {
        let file = &file.loaded().await?;
        debug!("Uploading '{}' ({} bytes)", file.name, file.size);
        let tracker = ProgressTracker::new(file.data.len() as u64, on_progress);
        let form = Form::new().part(SINGLE_FIELD, self.part(file, tracker.clone())?);

        let body = self
            .send(self.client.post(self.url(SINGLE_UPLOAD_PATH)).multipart(form))
            .await?;
        let asset = normalize::parse_upload(&body)?;

        tracker.finish();
        info!("Uploaded '{}' as asset {}", file.name, asset.id);
        Ok(asset)
    }

    async fn upload_many(
        &self,
        files: &[SourceFile],
        on_progress: ProgressFn,
    ) -> Result<Vec<RemoteAsset>, TransferError> {
        let mut loaded = Vec::with_capacity(files.len());
        for file in files {
            loaded.push(file.loaded().await?);
        }
        let files = loaded.as_slice();
        let total = files.iter().map(|f| f.data.len() as u64).sum();
        let tracker = ProgressTracker::new(total, on_progress);

        let mut form = Form::new();
        for file in files {
            form = form.part(BATCH_FIELD, self.part(file, tracker.clone())?);
        }

        let body = self
            .send(self.client.post(self.url(BATCH_UPLOAD_PATH)).multipart(form))
            .await?;
        let assets = normalize::parse_upload_many(&body)?;

        tracker.finish();
        info!("Uploaded batch of {} files", assets.len());
        Ok(assets)
    }

    async fn remove(&self, asset_id: &str) -> Result<(), TransferError> {
        debug!("Deleting asset {}", asset_id);
        self.send(self.client.delete(self.asset_url(asset_id)?))
            .await?;
        info!("Deleted asset {}", asset_id);
        Ok(())
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<AssetPage, TransferError> {
        let request = self
            .client
            .get(self.url(LIST_PATH))
            .query(&[("offset", offset), ("limit", limit)]);
        let body = self.send(request).await?;
        normalize::parse_page(&body, offset, limit)
    }
}
