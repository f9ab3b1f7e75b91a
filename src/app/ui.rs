use super::state::UploadSummary;
use crate::upload::{AssetPage, TaskStatus, UploadManager, UploadTask};
use crate::utils::{file_type_label, FileSizeUtils};
use std::fmt::Write;

fn status_badge(task: &UploadTask) -> String {
    match task.status() {
        TaskStatus::Uploading => format!("📤 {:>3}%", task.progress()),
        TaskStatus::Completed => "✅ done".to_string(),
        TaskStatus::Error => "❌ error".to_string(),
    }
}

pub fn render_task(task: &UploadTask) -> String {
    let mut line = format!(
        "{:<9} {} ({}, {})",
        status_badge(task),
        task.file.name,
        FileSizeUtils::format_bytes(task.file.size),
        file_type_label(&task.file.mime_type)
    );

    match task.status() {
        TaskStatus::Completed => {
            if let Some(asset_id) = task.remote_asset_id() {
                let _ = write!(line, " → {} {}", asset_id, task.preview_url);
            }
        }
        TaskStatus::Error => {
            if let Some(error) = task.error() {
                let _ = write!(line, ": {} (retry with --retries)", error);
            }
        }
        TaskStatus::Uploading => {}
    }
    line
}

/// Full text report: one row per file, then validation errors, then the
/// summary line.
pub fn render(manager: &UploadManager) -> String {
    let mut out = String::new();
    for task in manager.tasks() {
        let _ = writeln!(out, "{}", render_task(task));
    }

    let errors = manager.error_messages();
    if !errors.is_empty() {
        let _ = writeln!(out, "Some files were not added:");
        for error in errors {
            let _ = writeln!(out, "  • {}", error);
        }
    }

    let summary = UploadSummary::from_tasks(manager.tasks());
    let status = summary.status_text();
    if !status.is_empty() {
        let _ = writeln!(out, "{}", status);
    }
    out
}

pub fn render_page(page: &AssetPage) -> String {
    let mut out = String::new();
    for asset in &page.items {
        let name = asset.name.as_deref().unwrap_or("-");
        let size = asset
            .size
            .map(FileSizeUtils::format_bytes)
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{}  {}  {}  {}", asset.id, name, size, asset.url);
    }
    let _ = writeln!(
        out,
        "Showing {} of {} files (offset {}, limit {}){}",
        page.items.len(),
        page.total_items,
        page.offset,
        page.limit,
        if page.has_next { ", more available" } else { "" }
    );
    out
}
