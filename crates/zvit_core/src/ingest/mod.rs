use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::IncidentStore;
use crate::classify::Classifier;
use crate::domain::{Classification, DiscardReason, PipelineWarning, RawAlert};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestSummary {
    pub processed: usize,
    pub classified: usize,
    pub discarded: BTreeMap<DiscardReason, usize>,
    /// Raw names without a dictionary rule, sorted and deduplicated.
    pub needs_review: Vec<String>,
    pub warnings: Vec<PipelineWarning>,
}

impl IngestSummary {
    pub fn discarded_total(&self) -> usize {
        self.discarded.values().sum()
    }
}

/// Classify `alerts` in arrival order and add every incident to `store`.
pub fn ingest_alerts<'a, I>(
    classifier: &Classifier,
    alerts: I,
    store: &mut IncidentStore,
) -> IngestSummary
where
    I: IntoIterator<Item = &'a RawAlert>,
{
    let mut summary = IngestSummary::default();
    let mut review = BTreeSet::new();

    for alert in alerts {
        summary.processed += 1;
        match classifier.classify(alert) {
            Classification::Incident(incident) => {
                tracing::debug!(
                    family = incident.category().as_str(),
                    group = %incident.group_key,
                    device = %incident.device_key,
                    needs_review = incident.needs_review,
                    "alert classified"
                );
                review.extend(incident.unresolved_names());
                store.add(&incident);
                summary.classified += 1;
            }
            Classification::Discarded(reason) => {
                tracing::debug!(reason = reason.as_str(), subject = %alert.subject, "alert discarded");
                *summary.discarded.entry(reason).or_insert(0) += 1;
            }
        }
    }

    if !review.is_empty() {
        summary.warnings.push(
            PipelineWarning::new(
                "DICTIONARY_NAMES_UNRESOLVED",
                format!("{} name(s) have no dictionary rule", review.len()),
            )
            .with_details(review.iter().cloned().collect::<Vec<_>>().join(", ")),
        );
    }
    summary.needs_review = review.into_iter().collect();

    tracing::info!(
        processed = summary.processed,
        classified = summary.classified,
        discarded = summary.discarded_total(),
        needs_review = summary.needs_review.len(),
        "alert batch ingested"
    );
    summary
}
