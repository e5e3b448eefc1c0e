use std::collections::BTreeMap;

use time::{OffsetDateTime, UtcOffset};

use crate::domain::ParsedIncident;

/// Composite bucket key. Field order is the report sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub group: String,
    pub device: String,
    pub primary_ts: OffsetDateTime,
    pub secondary_ts: OffsetDateTime,
}

impl BucketKey {
    pub fn new(
        group: impl Into<String>,
        device: impl Into<String>,
        primary_ts: OffsetDateTime,
        secondary_ts: OffsetDateTime,
    ) -> Self {
        // Keys compare by instant already; UTC keeps Debug output and hashing uniform.
        let utc = |ts: OffsetDateTime| ts.checked_to_offset(UtcOffset::UTC).unwrap_or(ts);
        Self {
            group: group.into(),
            device: device.into(),
            primary_ts: utc(primary_ts),
            secondary_ts: utc(secondary_ts),
        }
    }
}

/// One rendered line, flattened out of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry<'a> {
    pub key: &'a BucketKey,
    pub message: &'a str,
}

/// Incidents of one report run, grouped by `(group, device, primary, secondary)`.
///
/// Repeats of the same key are appended in arrival order; nothing is ever overwritten.
#[derive(Debug, Clone, Default)]
pub struct IncidentStore {
    buckets: BTreeMap<BucketKey, Vec<String>>,
}

impl IncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, incident: &ParsedIncident) {
        let key = BucketKey::new(
            incident.group_key.as_str(),
            incident.device_key.as_str(),
            incident.primary_ts,
            incident.secondary_ts,
        );
        self.buckets
            .entry(key)
            .or_default()
            .push(incident.message.clone());
    }

    pub fn bucket(&self, key: &BucketKey) -> Option<&[String]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn message_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// All lines in report order.
    pub fn entries(&self) -> impl Iterator<Item = StoreEntry<'_>> {
        self.buckets.iter().flat_map(|(key, messages)| {
            messages.iter().map(move |message| StoreEntry {
                key,
                message: message.as_str(),
            })
        })
    }

    /// Lines whose primary timestamp lies in `[begin, end]`, in report order.
    pub fn entries_within(
        &self,
        begin: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Vec<StoreEntry<'_>> {
        self.entries()
            .filter(|entry| entry.key.primary_ts >= begin && entry.key.primary_ts <= end)
            .collect()
    }
}

/// Free-function form of [`IncidentStore::add`].
pub fn add(store: &mut IncidentStore, incident: &ParsedIncident) {
    store.add(incident);
}
