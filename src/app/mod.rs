mod state;
pub mod ui;

use crate::config::Settings;
use crate::error::Result;
use crate::session::Session;
use crate::upload::{
    AssetPage, FileProcessor, HttpTransfer, TaskStatus, Transfer, UploadManager,
};
pub use state::{ActionProgress, UploadSummary};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Command-line front end over the upload manager and the transfer client.
pub struct Uploader {
    settings: Settings,
    session: Arc<Session>,
    transfer: Arc<dyn Transfer>,
}

impl Uploader {
    pub fn new(settings: Settings) -> Result<Self> {
        let session = match settings.session_path() {
            Some(path) => Session::load(path)?,
            None => Session::ephemeral(None),
        };
        if let Some(token) = settings.token.clone() {
            session.override_token(token);
        }
        let session = Arc::new(session);
        let transfer = HttpTransfer::new(&settings.client, session.clone())?;

        Ok(Self::with_transfer(settings, session, Arc::new(transfer)))
    }

    pub fn with_transfer(
        settings: Settings,
        session: Arc<Session>,
        transfer: Arc<dyn Transfer>,
    ) -> Self {
        Self {
            settings,
            session,
            transfer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Uploads every file under `paths`, retrying failed files up to
    /// `retries` times. Progress goes to stdout. The summary counts files
    /// refused by validation as well.
    pub async fn upload(&self, paths: Vec<PathBuf>, retries: u32) -> Result<UploadSummary> {
        let processor = FileProcessor::new(paths);
        let files = processor.load()?;
        println!("Found {} files to upload", files.len());

        let mut manager =
            UploadManager::new(self.settings.upload.clone(), self.transfer.clone());
        manager.select(files);
        self.drive(&mut manager).await;

        for round in 1..=retries {
            let failed: Vec<String> = manager
                .tasks()
                .iter()
                .filter(|t| t.status() == TaskStatus::Error)
                .map(|t| t.id.clone())
                .collect();
            if failed.is_empty() {
                break;
            }

            info!("Retry round {} for {} files", round, failed.len());
            for id in &failed {
                manager.retry(id);
            }
            self.drive(&mut manager).await;
        }

        print!("{}", ui::render(&manager));
        let rejected = manager.validation_errors().len();
        if rejected > 0 {
            warn!("{} files were not uploaded", rejected);
        }
        Ok(UploadSummary::from_tasks(manager.tasks()).with_rejected(rejected))
    }

    /// Runs the manager until idle, printing the status line whenever a file
    /// settles.
    async fn drive(&self, manager: &mut UploadManager) {
        let mut last_settled = usize::MAX;
        while manager.next_event().await {
            let summary = UploadSummary::from_tasks(manager.tasks());
            let settled = summary.completed + summary.failed;
            if settled != last_settled {
                last_settled = settled;
                println!("{}", summary.status_text());
            }
        }
        manager.update_state();
    }

    pub async fn list(&self, offset: u64, limit: u64) -> Result<AssetPage> {
        debug!("Listing files offset={} limit={}", offset, limit);
        Ok(self.transfer.list(offset, limit).await?)
    }

    pub async fn delete(&self, asset_ids: &[String]) -> Result<()> {
        if asset_ids.len() == 1 {
            self.transfer.remove(&asset_ids[0]).await?;
        } else {
            self.transfer.remove_many(asset_ids).await?;
        }
        info!("Deleted {} files", asset_ids.len());
        Ok(())
    }

    pub fn login(&self, token: &str) -> Result<()> {
        self.session.set_token(token.trim())?;
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            warn!("No session to clear");
        }
        self.session.clear()?;
        Ok(())
    }
}
