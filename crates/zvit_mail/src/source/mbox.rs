use std::fs;
use std::path::PathBuf;

use zvit_core::duty::DutyWindow;
use zvit_core::error::AppError;

use super::{collect, unreadable, AlertSource, FetchedAlerts};

/// All messages of one mbox file.
#[derive(Debug, Clone)]
pub struct MboxSource {
    path: PathBuf,
    window: Option<DutyWindow>,
}

impl MboxSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            window: None,
        }
    }

    pub fn with_window(mut self, window: DutyWindow) -> Self {
        self.window = Some(window);
        self
    }
}

/// Split an mbox on `From ` lines that open the file or follow a blank line.
/// Body lines quoted as `>From ` lose one `>`. Bytes are kept as stored; each
/// message is decoded in its own charset later.
pub fn split_mbox(data: &[u8]) -> Vec<Vec<u8>> {
    let mut messages = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    let mut after_blank = true;

    for line in data.split_inclusive(|b| *b == b'\n') {
        if after_blank && line.starts_with(b"From ") {
            if let Some(message) = current.take() {
                messages.push(message);
            }
            current = Some(Vec::new());
            after_blank = false;
            continue;
        }
        after_blank = line.iter().all(|b| *b == b'\r' || *b == b'\n');
        if let Some(message) = current.as_mut() {
            let unquoted = line.iter().position(|b| *b != b'>');
            let quoted_from = line.starts_with(b">")
                && unquoted.is_some_and(|idx| line[idx..].starts_with(b"From "));
            message.extend_from_slice(if quoted_from { &line[1..] } else { line });
        }
    }
    if let Some(message) = current {
        messages.push(message);
    }
    messages
}

impl AlertSource for MboxSource {
    fn fetch(&self) -> Result<FetchedAlerts, AppError> {
        let bytes = fs::read(&self.path).map_err(|e| unreadable(&self.path, e))?;
        let messages = split_mbox(&bytes);
        Ok(collect(
            messages
                .iter()
                .enumerate()
                .map(|(idx, m)| (format!("{}#{}", self.path.display(), idx + 1), m.as_slice())),
            self.window.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_separator_lines_only() {
        let text = b"From a@x Fri Oct 16 09:00:00 2026\nSubject: one\n\nnot From here\n>From quoted\n\n\
                    From b@x Fri Oct 16 10:00:00 2026\nSubject: two\n\nbody\n";
        let messages = split_mbox(text);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], b"Subject: one\n\nnot From here\nFrom quoted\n\n");
        assert_eq!(messages[1], b"Subject: two\n\nbody\n");
    }
}
