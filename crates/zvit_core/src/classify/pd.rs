use crate::dictionary::Namespace;
use crate::domain::{
    Classification, DiscardReason, IncidentDetail, IncidentState, ParsedIncident, RawAlert,
};
use crate::normalize::timestamps::format_display;
use crate::report::escape_html;

use super::{collapse_whitespace, review_note, Classifier};

/// Appended to tokens that carry no interface number.
const ANY_INTERFACE_SUFFIX: &str = "-65535:";

fn state_phrase(state: IncidentState) -> &'static str {
    match state {
        IncidentState::Resolved => "Zabbix зареєстровано кінець інциденту, ",
        IncidentState::Problem => "Zabbix зареєстровано початок інциденту, ",
        IncidentState::Unspecified => "Zabbix зареєстровано ",
    }
}

fn event_phrase(word: &str) -> &str {
    match word {
        "ICMP" => "зникнення зв'язку з обладнанням на",
        "Unavailable" | "by" => "зникнення підключення",
        "been" => "перезавантаження обладнання",
        other => other,
    }
}

/// Name part of `name-<digits>:`, taking the first such suffix.
fn strip_interface_suffix(token: &str) -> Option<&str> {
    for (idx, _) in token.match_indices('-') {
        let rest = &token[idx + 1..];
        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits > 0 && rest[digits..].starts_with(':') {
            return Some(&token[..idx]);
        }
    }
    None
}

pub(super) fn classify(classifier: &Classifier, alert: &RawAlert) -> Classification {
    let subject = alert.subject.as_str();

    if classifier.is_noise(subject) {
        return Classification::Discarded(DiscardReason::Denylisted);
    }
    if subject.contains(" Resolved:") && subject.contains(" been") {
        return Classification::Discarded(DiscardReason::ResolvedRestart);
    }

    let words: Vec<&str> = subject.split_whitespace().collect();
    if words.len() < 6 {
        return Classification::Discarded(DiscardReason::Malformed);
    }
    let token = words[2];
    let event_word = words[5];

    let with_suffix = if token.ends_with(':') {
        token.to_string()
    } else {
        format!("{token}{ANY_INTERFACE_SUFFIX}")
    };
    let name = strip_interface_suffix(&with_suffix).unwrap_or(&with_suffix);
    let lookup_key = classifier.strip_role_prefix(name).replace(':', "");
    let device_key = token.trim_end_matches([':', ',', ';']).to_string();

    let lookup = classifier.dictionaries().lookup(Namespace::Device, &lookup_key);
    let needs_review = !lookup.matched;
    let state = IncidentState::from_subject(subject);

    let mut text = collapse_whitespace(&format!(
        "{}{} {}",
        state_phrase(state),
        event_phrase(event_word),
        escape_html(&lookup.value)
    ));
    if needs_review {
        text.push_str(&review_note(&[lookup.value.as_str()]));
    }

    let message = format!(
        "{} : {text}",
        format_display(alert.received_at, classifier.local_offset())
    );

    tracing::trace!(
        device = %device_key,
        group = %lookup.value,
        needs_review,
        "classified ping-down alert"
    );

    Classification::Incident(ParsedIncident {
        group_key: lookup.value,
        device_key,
        primary_ts: alert.received_at,
        secondary_ts: alert.received_at,
        message,
        needs_review,
        detail: IncidentDetail::Pd {
            lookup_key,
            state,
            event_word: event_word.to_string(),
        },
    })
}
