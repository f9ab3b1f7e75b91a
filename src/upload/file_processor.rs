use super::types::SourceFile;
use crate::error::{Error, Result};
use crate::utils::mime_from_path;
use ignore::Walk;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const IGNORED_FILES: [&str; 3] = [".DS_Store", "Thumbs.db", "desktop.ini"];

/// Turns command-line paths into `SourceFile`s, the way a file picker would.
/// Folders are walked honouring `.gitignore`; hidden files are skipped.
#[derive(Clone, Debug)]
pub struct FileProcessor {
    paths: Vec<PathBuf>,
}

impl FileProcessor {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Files the paths expand to, in walk order.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in &self.paths {
            if root.is_file() {
                files.push(root.clone());
                continue;
            }

            for entry in Walk::new(root) {
                match entry {
                    Ok(entry) => {
                        let path = entry.path();
                        if path.is_file() && !Self::is_ignored(path) {
                            files.push(path.to_path_buf());
                        }
                    }
                    Err(e) => warn!("Skipping unreadable entry under {:?}: {}", root, e),
                }
            }
        }
        files
    }

    pub fn count_files(&self) -> usize {
        self.discover().len()
    }

    /// Size-only handles for every discovered file. Payloads are read later,
    /// for accepted files only.
    pub fn load(&self) -> Result<Vec<SourceFile>> {
        self.discover()
            .iter()
            .map(|path| Self::open_file(path))
            .collect()
    }

    pub fn open_file(path: &Path) -> Result<SourceFile> {
        let metadata = fs::metadata(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_from_path(path);
        debug!("Found '{}' ({} bytes, {})", name, metadata.len(), mime_type);

        let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(SourceFile::on_disk(name, mime_type, metadata.len(), absolute))
    }

    fn is_ignored(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| IGNORED_FILES.contains(&name))
            .unwrap_or(false)
    }
}
