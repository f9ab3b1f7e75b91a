mod file_processor;
mod manager;
pub mod normalize;
mod transfer;
mod types;
mod validator;

pub use file_processor::FileProcessor;
pub use manager::{CompletionHook, UploadManager, UploadManagerState};
pub use transfer::{HttpTransfer, ProgressFn, Transfer};
pub use types::{
    AssetPage, FileDescriptor, RemoteAsset, SourceFile, TaskStatus, UploadTask,
};
pub use validator::{validate, AcceptList, Validation, ValidationIssue};
