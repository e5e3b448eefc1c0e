use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One alert message as handed over by the mail source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAlert {
    pub subject: String,
    pub body: String,
    pub received_at: OffsetDateTime,
}

impl RawAlert {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        received_at: OffsetDateTime,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            received_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertFamily {
    /// Ping-down: reachability loss or restart reported by Zabbix.
    #[serde(rename = "PD")]
    Pd,
    /// Circuit and power events reported by OSM.
    #[serde(rename = "SDH")]
    Sdh,
}

impl AlertFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFamily::Pd => "PD",
            AlertFamily::Sdh => "SDH",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    Problem,
    Resolved,
    Unspecified,
}

impl IncidentState {
    pub fn from_subject(subject: &str) -> Self {
        if subject.contains(" Resolved:") {
            IncidentState::Resolved
        } else if subject.contains(" Problem:") {
            IncidentState::Problem
        } else {
            IncidentState::Unspecified
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SdhKind {
    /// `STM` circuit loss between two sites.
    Circuit,
    /// Power, generator or air conditioning event on one site.
    Power,
    /// Any other connectivity event on one site.
    Connectivity,
}

/// A site name after the circuit dictionary has been consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteName {
    pub raw: String,
    pub canonical: String,
    pub needs_review: bool,
}

/// Family-specific data kept next to the common incident fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidentDetail {
    Pd {
        /// Name handed to the device dictionary (role prefixes stripped).
        lookup_key: String,
        state: IncidentState,
        event_word: String,
    },
    Sdh {
        kind: SdhKind,
        state: IncidentState,
        from: SiteName,
        to: Option<SiteName>,
        trap_timestamp: bool,
    },
}

/// A classified, canonicalized alert ready for aggregation.
///
/// `primary_ts` is always the receipt time. `secondary_ts` is the moment the event
/// happened when the body carried a trap timestamp, otherwise equal to `primary_ts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIncident {
    pub group_key: String,
    pub device_key: String,
    pub primary_ts: OffsetDateTime,
    pub secondary_ts: OffsetDateTime,
    pub message: String,
    pub needs_review: bool,
    pub detail: IncidentDetail,
}

impl ParsedIncident {
    pub fn category(&self) -> AlertFamily {
        match self.detail {
            IncidentDetail::Pd { .. } => AlertFamily::Pd,
            IncidentDetail::Sdh { .. } => AlertFamily::Sdh,
        }
    }

    /// Raw names that no dictionary rule matched.
    pub fn unresolved_names(&self) -> Vec<String> {
        match &self.detail {
            IncidentDetail::Pd { lookup_key, .. } => {
                if self.needs_review {
                    vec![lookup_key.clone()]
                } else {
                    Vec::new()
                }
            }
            IncidentDetail::Sdh { from, to, .. } => std::iter::once(from)
                .chain(to.iter())
                .filter(|site| site.needs_review)
                .map(|site| site.raw.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// Subject matches neither family signature.
    Unrecognized,
    /// Subject names a non-operational system from the noise denylist.
    Denylisted,
    /// Restarts have no end; their "resolved" notices carry nothing.
    ResolvedRestart,
    /// Subject too short to carry the expected tokens.
    Malformed,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::Unrecognized => "unrecognized",
            DiscardReason::Denylisted => "denylisted",
            DiscardReason::ResolvedRestart => "resolved_restart",
            DiscardReason::Malformed => "malformed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Incident(ParsedIncident),
    Discarded(DiscardReason),
}

impl Classification {
    pub fn incident(self) -> Option<ParsedIncident> {
        match self {
            Classification::Incident(incident) => Some(incident),
            Classification::Discarded(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl PipelineWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
