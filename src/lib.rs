//! Client-side upload manager for the property sales dashboard's file
//! storage API: validation, progress-tracked uploads, retry and deletion.

pub mod app;
pub mod config;
pub mod error;
pub mod session;
pub mod upload;
pub mod utils;

pub use config::{ClientConfig, Settings, UploadConfig};
pub use error::{Error, Result, TransferError};
pub use session::Session;
pub use upload::{
    HttpTransfer, RemoteAsset, SourceFile, TaskStatus, Transfer, UploadManager, UploadTask,
};
