use super::types::SourceFile;
use crate::config::UploadConfig;
use crate::utils::FileSizeUtils;
use glob::Pattern;
use std::fmt;

/// Why a file (or a whole batch) was refused. These are shown to the user,
/// they never abort anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    TooManyFiles { max_files: usize, attempted: usize },
    TooLarge { name: String, max_size: u64 },
    UnsupportedType { name: String, mime_type: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::TooManyFiles {
                max_files,
                attempted,
            } => write!(
                f,
                "Maximum {} files allowed. You're trying to upload {} files.",
                max_files, attempted
            ),
            ValidationIssue::TooLarge { name, max_size } => write!(
                f,
                "File \"{}\" exceeds maximum size of {}",
                name,
                FileSizeUtils::format_bytes(*max_size)
            ),
            ValidationIssue::UnsupportedType { name, mime_type } => {
                write!(f, "File \"{}\" has unsupported type: {}", name, mime_type)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Validation {
    pub accepted: Vec<SourceFile>,
    pub rejected: Vec<ValidationIssue>,
}

/// Comma separated MIME patterns such as `image/*, application/pdf`.
#[derive(Debug, Clone)]
pub struct AcceptList {
    patterns: Vec<String>,
}

impl AcceptList {
    pub fn parse(accept: &str) -> Option<Self> {
        let accept = accept.trim();
        if accept.is_empty() || accept == "*" {
            return None;
        }

        let patterns = accept
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Some(Self { patterns })
    }

    pub fn matches(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.to_lowercase();
        self.patterns.iter().any(|pattern| {
            if *pattern == mime_type {
                return true;
            }
            if !pattern.ends_with("/*") {
                return false;
            }
            match Pattern::new(pattern) {
                Ok(glob) => glob.matches(&mime_type),
                Err(_) => false,
            }
        })
    }
}

/// Checks a batch against the configured limits.
///
/// The count limit is checked first and refuses the whole batch. Size and
/// type are then checked per file; a file too large is not type checked.
pub fn validate(
    candidates: Vec<SourceFile>,
    current_count: usize,
    config: &UploadConfig,
) -> Validation {
    let mut validation = Validation::default();

    if current_count + candidates.len() > config.max_files {
        validation.rejected.push(ValidationIssue::TooManyFiles {
            max_files: config.max_files,
            attempted: candidates.len(),
        });
        return validation;
    }

    let accept = AcceptList::parse(&config.accept);

    for file in candidates {
        if file.size > config.max_size {
            validation.rejected.push(ValidationIssue::TooLarge {
                name: file.name.clone(),
                max_size: config.max_size,
            });
            continue;
        }

        if let Some(accept) = &accept {
            if !accept.matches(&file.mime_type) {
                validation.rejected.push(ValidationIssue::UnsupportedType {
                    name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                });
                continue;
            }
        }

        validation.accepted.push(file);
    }

    validation
}
