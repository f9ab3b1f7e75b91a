use crate::upload::{TaskStatus, UploadTask};

/// Where the current batch stands, derived from the task list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionProgress {
    NotStarted,
    Uploading {
        total: usize,
        completed: usize,
        failed: usize,
    },
    Completed {
        total: usize,
        completed: usize,
        failed: usize,
    },
}

impl Default for ActionProgress {
    fn default() -> Self {
        Self::NotStarted
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub progress: ActionProgress,
    pub uploading: usize,
    pub completed: usize,
    pub failed: usize,
    /// Validation issues raised. Each is a refused file or a refused batch.
    pub rejected: usize,
    /// Mean progress over all tasks, 0 to 100.
    pub percent: u8,
}

impl UploadSummary {
    pub fn from_tasks(tasks: &[UploadTask]) -> Self {
        if tasks.is_empty() {
            return Self::default();
        }

        let mut summary = Self::default();
        let mut progress_sum = 0u64;
        for task in tasks {
            match task.status() {
                TaskStatus::Uploading => summary.uploading += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Error => summary.failed += 1,
            }
            progress_sum += u64::from(task.progress());
        }

        let total = tasks.len();
        summary.percent = (progress_sum / total as u64) as u8;
        summary.progress = if summary.uploading > 0 {
            ActionProgress::Uploading {
                total,
                completed: summary.completed,
                failed: summary.failed,
            }
        } else {
            ActionProgress::Completed {
                total,
                completed: summary.completed,
                failed: summary.failed,
            }
        };
        summary
    }

    pub fn with_rejected(mut self, rejected: usize) -> Self {
        self.rejected = rejected;
        self
    }

    /// True when any file failed to upload or was refused outright.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.rejected > 0
    }

    pub fn status_text(&self) -> String {
        match &self.progress {
            ActionProgress::NotStarted => String::new(),
            ActionProgress::Uploading {
                total,
                completed,
                failed,
            } => format!(
                "Progress: {}% | {}/{} files | ✅ Done: {} | ❌ Failed: {}",
                self.percent,
                completed + failed,
                total,
                completed,
                failed
            ),
            ActionProgress::Completed {
                total,
                completed,
                failed,
            } => format!(
                "Final Status: {}/{} files | ✅ Done: {} | ❌ Failed: {}",
                completed, total, completed, failed
            ),
        }
    }
}
