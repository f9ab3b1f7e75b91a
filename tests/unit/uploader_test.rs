#[path = "../common/mod.rs"]
mod common;

use asset_uploader::app::{ActionProgress, Uploader};
use asset_uploader::upload::FileProcessor;
use asset_uploader::{Session, Settings};
use common::{Outcome, ScriptedTransfer};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn uploader(settings: Settings, transfer: Arc<ScriptedTransfer>) -> Uploader {
    Uploader::with_transfer(settings, Arc::new(Session::ephemeral(None)), transfer)
}

fn write_files(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), format!("contents of {}", name)).unwrap();
    }
}

#[tokio::test]
async fn test_upload_folder_completes_every_file() {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), &["a.txt", "b.png"]);
    let transfer = Arc::new(ScriptedTransfer::new());

    let summary = uploader(Settings::default(), transfer.clone())
        .upload(vec![dir.path().to_path_buf()], 0)
        .await
        .unwrap();

    assert_eq!(summary.completed, 2);
    assert!(!summary.has_failures());
    assert_eq!(summary.percent, 100);
    assert_eq!(
        summary.progress,
        ActionProgress::Completed {
            total: 2,
            completed: 2,
            failed: 0
        }
    );
    assert_eq!(transfer.upload_count(), 2);
}

#[tokio::test]
async fn test_retries_recover_transient_failures() {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), &["flaky.txt"]);
    let transfer = Arc::new(ScriptedTransfer::new());
    transfer.queue("flaky.txt", Outcome::Fail("reset by peer".to_string()));

    let summary = uploader(Settings::default(), transfer.clone())
        .upload(vec![dir.path().to_path_buf()], 2)
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(transfer.upload_count(), 2);
}

#[tokio::test]
async fn test_failures_remain_without_retries() {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), &["ok.txt", "bad.txt"]);
    let transfer = Arc::new(ScriptedTransfer::new());
    transfer.queue("bad.txt", Outcome::Fail("refused".to_string()));

    let summary = uploader(Settings::default(), transfer)
        .upload(vec![dir.path().to_path_buf()], 0)
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.has_failures());
}

#[tokio::test]
async fn test_batch_over_limit_uploads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), &["1.txt", "2.txt", "3.txt"]);
    let transfer = Arc::new(ScriptedTransfer::new());
    let mut settings = Settings::default();
    settings.upload.max_files = 2;

    let summary = uploader(settings, transfer.clone())
        .upload(vec![dir.path().to_path_buf()], 0)
        .await
        .unwrap();

    assert_eq!(summary.progress, ActionProgress::NotStarted);
    assert_eq!(summary.rejected, 1);
    assert!(summary.has_failures());
    assert_eq!(transfer.upload_count(), 0);
}

#[tokio::test]
async fn test_oversized_file_fails_the_run_without_being_read() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("big.bin"), vec![7u8; 4096]).unwrap();
    let transfer = Arc::new(ScriptedTransfer::new());
    let mut settings = Settings::default();
    settings.upload.max_size = 10;

    let found = FileProcessor::new(vec![dir.path().to_path_buf()]).load().unwrap();
    assert_eq!(found[0].size, 4096);
    assert!(found[0].data.is_empty());

    let summary = uploader(settings, transfer.clone())
        .upload(vec![dir.path().to_path_buf()], 0)
        .await
        .unwrap();

    assert_eq!(summary.completed + summary.failed, 0);
    assert_eq!(summary.rejected, 1);
    assert!(summary.has_failures());
    assert_eq!(transfer.upload_count(), 0);
}

#[tokio::test]
async fn test_accepted_files_are_read_before_transfer() {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), &["a.txt"]);
    let transfer = Arc::new(ScriptedTransfer::new());

    let summary = uploader(Settings::default(), transfer.clone())
        .upload(vec![dir.path().to_path_buf()], 0)
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.rejected, 0);
    assert_eq!(
        transfer.payloads.lock().clone(),
        vec![("a.txt".to_string(), "contents of a.txt".len())]
    );
}

#[tokio::test]
async fn test_delete_uses_single_or_bulk_call() {
    let transfer = Arc::new(ScriptedTransfer::new());
    let app = uploader(Settings::default(), transfer.clone());

    app.delete(&["one".to_string()]).await.unwrap();
    assert_eq!(transfer.removed.lock().clone(), vec!["one".to_string()]);
    assert!(transfer.remove_many_calls.lock().is_empty());

    app.delete(&["two".to_string(), "three".to_string()]).await.unwrap();
    assert_eq!(transfer.remove_many_calls.lock().len(), 1);
}

#[tokio::test]
async fn test_delete_failure_is_returned() {
    let transfer = Arc::new(ScriptedTransfer::failing_removes());
    let app = uploader(Settings::default(), transfer);

    let err = app
        .delete(&["a".to_string(), "b".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to delete 2 of 2 files: a, b");
}

#[tokio::test]
async fn test_list_forwards_paging() {
    let transfer = Arc::new(ScriptedTransfer::new());
    let page = uploader(Settings::default(), transfer)
        .list(40, 20)
        .await
        .unwrap();
    assert_eq!((page.offset, page.limit), (40, 20));
}

#[test]
fn test_login_and_logout_manage_stored_token() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("nested").join("session");
    let session = Arc::new(Session::load(&store).unwrap());
    let app = Uploader::with_transfer(
        Settings::default(),
        session.clone(),
        Arc::new(ScriptedTransfer::new()),
    );

    app.login("  abc123\n").unwrap();
    assert_eq!(session.token().as_deref(), Some("abc123"));
    assert_eq!(fs::read_to_string(&store).unwrap(), "abc123");

    app.logout().unwrap();
    assert!(!session.is_authenticated());
    assert!(!store.exists());
    app.logout().unwrap();
}
