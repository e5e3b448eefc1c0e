use std::fs;
use std::path::{Path, PathBuf};

use zvit_core::domain::PipelineWarning;
use zvit_core::duty::DutyWindow;
use zvit_core::error::AppError;

use super::{collect, unreadable, AlertSource, FetchedAlerts};

/// Messages stored one per file: a Maildir (`cur/` and `new/`) or a flat directory.
#[derive(Debug, Clone)]
pub struct MaildirSource {
    root: PathBuf,
    window: Option<DutyWindow>,
}

impl MaildirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            window: None,
        }
    }

    pub fn with_window(mut self, window: DutyWindow) -> Self {
        self.window = Some(window);
        self
    }

    fn message_dirs(&self) -> Vec<PathBuf> {
        let dirs: Vec<PathBuf> = ["cur", "new"]
            .iter()
            .map(|sub| self.root.join(sub))
            .filter(|dir| dir.is_dir())
            .collect();
        if dirs.is_empty() {
            vec![self.root.clone()]
        } else {
            dirs
        }
    }
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| unreadable(dir, e))? {
        let path = entry.map_err(|e| unreadable(dir, e))?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    Ok(files)
}

impl AlertSource for MaildirSource {
    fn fetch(&self) -> Result<FetchedAlerts, AppError> {
        let mut files = Vec::new();
        for dir in self.message_dirs() {
            files.extend(list_files(&dir)?);
        }
        // Maildir names start with the delivery time, so name order is arrival order.
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut read_warnings = Vec::new();
        let mut messages = Vec::with_capacity(files.len());
        for path in &files {
            match fs::read(path) {
                Ok(bytes) => messages.push((path.display().to_string(), bytes)),
                Err(e) => read_warnings.push(
                    PipelineWarning::new("MAIL_MESSAGE_UNREADABLE", "Failed to read message file")
                        .with_details(format!("path={}; err={e}", path.display())),
                ),
            }
        }

        let mut fetched = collect(
            messages
                .iter()
                .map(|(origin, bytes)| (origin.clone(), bytes.as_slice())),
            self.window.as_ref(),
        );
        fetched.warnings.extend(read_warnings);
        Ok(fetched)
    }
}
