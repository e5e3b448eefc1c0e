use crate::dictionary::Namespace;
use crate::domain::{
    Classification, DiscardReason, IncidentDetail, IncidentState, ParsedIncident, RawAlert,
    SdhKind, SiteName,
};
use crate::normalize::timestamps::format_display;
use crate::report::escape_html;

use super::{collapse_whitespace, review_note, Classifier};

/// Separator between the two ends of a circuit in the geo token.
const PAIR_DELIMITER: &str = "__";

fn kind_of(type_word: &str) -> SdhKind {
    if type_word == "STM" {
        SdhKind::Circuit
    } else if type_word.eq_ignore_ascii_case("power") {
        SdhKind::Power
    } else {
        SdhKind::Connectivity
    }
}

fn state_phrase(state: IncidentState) -> &'static str {
    match state {
        IncidentState::Resolved => "OSM зареєстровано кінець інциденту, ",
        IncidentState::Problem | IncidentState::Unspecified => {
            "OSM зареєстровано початок інциденту, "
        }
    }
}

fn kind_phrase(kind: SdhKind) -> &'static str {
    match kind {
        SdhKind::Power => "зникнення живлення на виносі ",
        SdhKind::Circuit | SdhKind::Connectivity => "втрата зв'язності ",
    }
}

fn appendix(subject: &str) -> &'static str {
    if subject.contains("Air Conditioning") {
        " (кондиціонер)"
    } else if subject.contains("Diesel Generator") {
        " (генератор)"
    } else {
        ""
    }
}

fn resolve_site(classifier: &Classifier, raw: &str) -> SiteName {
    let lookup = classifier.dictionaries().lookup(Namespace::Circuit, raw);
    SiteName {
        raw: raw.to_string(),
        canonical: lookup.value,
        needs_review: !lookup.matched,
    }
}

pub(super) fn classify(classifier: &Classifier, alert: &RawAlert) -> Classification {
    let subject = alert.subject.as_str();
    let words: Vec<&str> = subject.split_whitespace().collect();
    let geo = words.get(3).copied().unwrap_or("");
    let type_word = words.get(5).copied().unwrap_or("");
    let kind = kind_of(type_word);

    let (from_raw, to_raw) = if kind == SdhKind::Circuit {
        let mut sides = geo.split(PAIR_DELIMITER);
        (sides.next().unwrap_or(""), sides.next().unwrap_or(""))
    } else {
        (geo, "")
    };
    if from_raw.is_empty() {
        return Classification::Discarded(DiscardReason::Malformed);
    }

    let from = resolve_site(classifier, from_raw);
    let to = if to_raw.is_empty() {
        None
    } else {
        Some(resolve_site(classifier, to_raw))
    };

    let trap_ts = classifier.trap.scan(&alert.body, classifier.local_offset());
    let secondary_ts = trap_ts.unwrap_or(alert.received_at);

    let geo_phrase = match (kind, &to) {
        (SdhKind::Circuit, Some(to)) => format!(
            "з {} на {}",
            escape_html(&from.canonical),
            escape_html(&to.canonical)
        ),
        (SdhKind::Circuit, None) => format!("на {}", escape_html(&from.canonical)),
        _ => escape_html(&from.canonical),
    };

    let state = IncidentState::from_subject(subject);
    let mut text = collapse_whitespace(&format!(
        "{}{}{geo_phrase}",
        state_phrase(state),
        kind_phrase(kind)
    ));

    let unresolved: Vec<&str> = std::iter::once(&from)
        .chain(to.iter())
        .filter(|site| site.needs_review)
        .map(|site| site.canonical.as_str())
        .collect();
    if !unresolved.is_empty() {
        text.push_str(&review_note(&unresolved));
    }
    text.push_str(appendix(subject));

    let message = format!(
        "{} : {text}",
        format_display(secondary_ts, classifier.local_offset())
    );
    let needs_review = !unresolved.is_empty();

    tracing::trace!(
        from = %from.canonical,
        to = to.as_ref().map(|s| s.canonical.as_str()).unwrap_or(""),
        trap_timestamp = trap_ts.is_some(),
        needs_review,
        "classified circuit alert"
    );

    Classification::Incident(ParsedIncident {
        group_key: from.canonical.clone(),
        device_key: to
            .as_ref()
            .map(|site| site.canonical.clone())
            .unwrap_or_default(),
        primary_ts: alert.received_at,
        secondary_ts,
        message,
        needs_review,
        detail: IncidentDetail::Sdh {
            kind,
            state,
            from,
            to,
            trap_timestamp: trap_ts.is_some(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_word_selects_kind() {
        assert_eq!(kind_of("STM"), SdhKind::Circuit);
        assert_eq!(kind_of("Power"), SdhKind::Power);
        assert_eq!(kind_of("POWER"), SdhKind::Power);
        assert_eq!(kind_of("stm"), SdhKind::Connectivity);
        assert_eq!(kind_of(""), SdhKind::Connectivity);
    }

    #[test]
    fn appendix_names_environment_equipment() {
        assert_eq!(appendix("Power Air Conditioning failure"), " (кондиціонер)");
        assert_eq!(appendix("Power Diesel Generator started"), " (генератор)");
        assert_eq!(appendix("Power lost"), "");
    }
}
