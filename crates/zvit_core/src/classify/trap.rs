use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use time::{OffsetDateTime, UtcOffset};

use crate::error::AppError;
use crate::normalize::timestamps::parse_trap_timestamp;

const TRAP_PREFIX: &str = "Trap value:";
const TRAP_TIMESTAMP: &str =
    r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?";

/// Decode a body that arrived as one base64 blob; anything else is returned untouched.
pub fn decode_payload(body: &str) -> Cow<'_, str> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let looks_encoded = !compact.is_empty()
        && compact.len() % 4 == 0
        && compact
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=');
    if !looks_encoded {
        return Cow::Borrowed(body);
    }

    let Ok(bytes) = STANDARD.decode(compact.as_bytes()) else {
        return Cow::Borrowed(body);
    };
    match String::from_utf8(bytes) {
        Ok(text) if !text.chars().any(|c| c.is_control() && !c.is_whitespace()) => {
            Cow::Owned(text)
        }
        _ => Cow::Borrowed(body),
    }
}

/// Finds the event time an OSM trap payload carries.
#[derive(Debug, Clone)]
pub struct TrapScanner {
    timestamp: Regex,
}

impl TrapScanner {
    pub fn new() -> Result<Self, AppError> {
        let timestamp = Regex::new(TRAP_TIMESTAMP).map_err(|e| {
            AppError::new("CLASSIFIER_RULE_INVALID", "Invalid trap timestamp pattern")
                .with_details(e.to_string())
        })?;
        Ok(Self { timestamp })
    }

    /// Timestamp from the last `Trap value:` line that carries one.
    pub fn scan(&self, body: &str, local: UtcOffset) -> Option<OffsetDateTime> {
        let payload = decode_payload(body);
        let mut found = None;
        for line in payload.lines() {
            let Some(value) = line.trim_start().strip_prefix(TRAP_PREFIX) else {
                continue;
            };
            let Some(m) = self.timestamp.find(value) else {
                continue;
            };
            match parse_trap_timestamp(m.as_str(), local) {
                Some(ts) => found = Some(ts),
                None => tracing::debug!(value = m.as_str(), "unparseable trap value timestamp"),
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn plain_text_is_not_decoded() {
        let body = "Trap value: linkDown 2026-10-16T07:42:10";
        assert!(matches!(decode_payload(body), Cow::Borrowed(_)));
    }

    #[test]
    fn base64_body_is_decoded() {
        let encoded = STANDARD.encode("Trap value: x 2026-10-16T07:42:10\n");
        assert_eq!(
            decode_payload(&encoded),
            "Trap value: x 2026-10-16T07:42:10\n"
        );
    }

    #[test]
    fn last_trap_line_wins() {
        let scanner = TrapScanner::new().unwrap();
        let body = "Event: LOS\n\
                    Trap value: alarm raised at 2026-10-16T07:40:00\n\
                    Trap value: alarm confirmed at 2026-10-16T07:42:10+03:00\n";
        assert_eq!(
            scanner.scan(body, offset!(+2)),
            Some(datetime!(2026-10-16 07:42:10 +3))
        );
    }

    #[test]
    fn no_trap_line_means_no_timestamp() {
        let scanner = TrapScanner::new().unwrap();
        assert_eq!(scanner.scan("Severity: major\n", offset!(+3)), None);
        assert_eq!(
            scanner.scan("Trap value: no date here\n", offset!(+3)),
            None
        );
    }
}
