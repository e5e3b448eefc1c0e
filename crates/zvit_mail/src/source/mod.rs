use std::path::Path;

use zvit_core::domain::{PipelineWarning, RawAlert};
use zvit_core::duty::DutyWindow;
use zvit_core::error::AppError;

use crate::message::parse_message;

pub mod maildir;
pub mod mbox;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedAlerts {
    /// Parsed alerts in source order.
    pub alerts: Vec<RawAlert>,
    /// Messages received outside the retrieval window.
    pub outside_window: usize,
    pub warnings: Vec<PipelineWarning>,
}

/// Where a report run gets its alerts from.
pub trait AlertSource {
    fn fetch(&self) -> Result<FetchedAlerts, AppError>;
}

/// Parse stored messages in order, keeping the ones received inside `window`.
fn collect<'a, I>(messages: I, window: Option<&DutyWindow>) -> FetchedAlerts
where
    I: IntoIterator<Item = (String, &'a [u8])>,
{
    let mut fetched = FetchedAlerts::default();
    for (origin, bytes) in messages {
        let alert = match parse_message(bytes) {
            Ok(alert) => alert,
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "message skipped");
                fetched.warnings.push(
                    PipelineWarning::new(e.code.clone(), e.message.clone()).with_details(
                        match &e.details {
                            Some(details) => format!("origin={origin}; {details}"),
                            None => format!("origin={origin}"),
                        },
                    ),
                );
                continue;
            }
        };
        if let Some(window) = window {
            if !window.contains(alert.received_at) {
                tracing::trace!(origin = %origin, "message outside retrieval window");
                fetched.outside_window += 1;
                continue;
            }
        }
        fetched.alerts.push(alert);
    }
    tracing::debug!(
        alerts = fetched.alerts.len(),
        outside_window = fetched.outside_window,
        skipped = fetched.warnings.len(),
        "mail source read"
    );
    fetched
}

/// The mail spool may be mid-delivery or on an unmounted share, so a rerun can succeed.
fn unreadable(path: &Path, e: std::io::Error) -> AppError {
    AppError::new("MAIL_SOURCE_UNREADABLE", "Failed to read mail source")
        .with_details(format!("path={}; err={e}", path.display()))
        .with_retryable(true)
}
