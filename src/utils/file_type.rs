use std::path::Path;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("csv", "text/csv"),
    ("zip", "application/zip"),
    ("rar", "application/vnd.rar"),
    ("gz", "application/gzip"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
];

/// Guesses a MIME type from the file extension.
pub fn mime_from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .and_then(|ext| {
            MIME_BY_EXTENSION
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Coarse label for a MIME type, used in the file list.
pub fn file_type_label(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") {
        "Image"
    } else if mime_type.starts_with("video/") {
        "Video"
    } else if mime_type.starts_with("audio/") {
        "Audio"
    } else if mime_type.contains("pdf") {
        "PDF"
    } else if mime_type.contains("word") || mime_type.contains("doc") {
        "Document"
    } else if mime_type.contains("excel") || mime_type.contains("sheet") {
        "Spreadsheet"
    } else if mime_type.contains("zip") || mime_type.contains("rar") {
        "Archive"
    } else {
        "File"
    }
}
