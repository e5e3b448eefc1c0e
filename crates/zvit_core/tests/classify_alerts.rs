use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pretty_assertions::assert_eq;
use time::macros::{datetime, offset};
use zvit_core::aggregate::IncidentStore;
use zvit_core::classify::{Classifier, ClassifierRules};
use zvit_core::dictionary::{Dictionaries, Dictionary};
use zvit_core::domain::{
    AlertFamily, Classification, DiscardReason, IncidentDetail, IncidentState, RawAlert, SdhKind,
};

fn classifier() -> Classifier {
    let device = Dictionary::from_text(include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/dictionaries/dictionary_pd.txt"
    )));
    let circuit = Dictionary::from_text(include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/dictionaries/dictionary_sdh.txt"
    )));
    Classifier::with_default_rules(Dictionaries::new(device, circuit), offset!(+3))
        .expect("classifier")
}

#[test]
fn ping_down_alert_resolves_device_to_site() {
    let alert = RawAlert::new(
        "Zabbix Problem: sw1-3: Unavailable by ICMP ping",
        "",
        datetime!(2026-10-16 09:15:00 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.category(), AlertFamily::Pd);
    assert_eq!(incident.group_key, "Site A");
    assert_eq!(incident.device_key, "sw1-3");
    assert!(!incident.needs_review);
    assert_eq!(incident.primary_ts, incident.secondary_ts);
    assert_eq!(
        incident.message,
        "16 жовт 2026 09:15:00 : Zabbix зареєстровано початок інциденту, \
         зникнення зв'язку з обладнанням на Site A"
    );
    assert_eq!(
        incident.detail,
        IncidentDetail::Pd {
            lookup_key: "sw1".to_string(),
            state: IncidentState::Problem,
            event_word: "ICMP".to_string(),
        }
    );
}

#[test]
fn unknown_device_keeps_its_name_and_needs_review() {
    let alert = RawAlert::new(
        "Zabbix Problem: mystery-9: Unavailable by ICMP ping",
        "",
        datetime!(2026-10-16 11:00:00 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert!(incident.needs_review);
    assert_eq!(incident.group_key, "mystery");
    assert_eq!(incident.unresolved_names(), vec!["mystery".to_string()]);
    assert!(incident
        .message
        .ends_with("(<i>потребує коригування назви</i> '<b>mystery</b>')"));
}

#[test]
fn role_prefix_is_stripped_before_lookup() {
    let alert = RawAlert::new(
        "Zabbix Problem: r-core-2-17: Unavailable by ICMP ping",
        "",
        datetime!(2026-10-16 09:00:00 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.group_key, "Core");
    assert_eq!(incident.device_key, "r-core-2-17");
}

#[test]
fn token_without_interface_is_looked_up_whole() {
    let alert = RawAlert::new(
        "Zabbix Resolved: edge Unavailable by ICMP ping",
        "",
        datetime!(2026-10-16 09:00:00 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.device_key, "edge");
    // Canonical names are escaped inside the message.
    assert_eq!(
        incident.message,
        "16 жовт 2026 09:00:00 : Zabbix зареєстровано кінець інциденту, \
         зникнення зв'язку з обладнанням на Edge &amp; Co"
    );
}

#[test]
fn discards_are_counted_by_reason() {
    let classifier = classifier();
    let at = datetime!(2026-10-16 09:00:00 +3);
    let cases = [
        ("Backup job finished", DiscardReason::Unrecognized),
        (
            "Zabbix Problem: IVR-1: Unavailable by ICMP ping",
            DiscardReason::Denylisted,
        ),
        (
            "Zabbix Resolved: core-7: host has been restarted",
            DiscardReason::ResolvedRestart,
        ),
        ("Unavailable by ICMP ping", DiscardReason::Malformed),
    ];

    for (subject, reason) in cases {
        assert_eq!(
            classifier.classify(&RawAlert::new(subject, "", at)),
            Classification::Discarded(reason),
            "{subject}"
        );
    }
}

#[test]
fn noise_exception_rescues_subject() {
    let alert = RawAlert::new(
        "Zabbix Problem: alca-console-4: Unavailable by ICMP ping",
        "",
        datetime!(2026-10-16 09:00:00 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.device_key, "alca-console-4");
    assert_eq!(incident.unresolved_names(), vec!["console".to_string()]);
}

#[test]
fn restart_problem_is_reported() {
    let alert = RawAlert::new(
        "Zabbix Problem: sw1-2: host has been restarted",
        "",
        datetime!(2026-10-16 09:00:00 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.group_key, "Site A");
    assert!(incident
        .message
        .ends_with("Zabbix зареєстровано початок інциденту, перезавантаження обладнання Site A"));
}

#[test]
fn circuit_alert_names_both_sites() {
    let alert = RawAlert::new(
        "OSM Problem: alarm siteA__siteB : STM STM-4 LOS",
        "Severity: major\n",
        datetime!(2026-10-16 10:00:05 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.category(), AlertFamily::Sdh);
    assert_eq!(incident.group_key, "Вузол А");
    assert_eq!(incident.device_key, "Вузол Б");
    assert!(incident.message.contains("з Вузол А на Вузол Б"));
    assert_eq!(incident.secondary_ts, incident.primary_ts);
    assert!(!incident.needs_review);
}

#[test]
fn trap_value_becomes_secondary_timestamp() {
    let body = STANDARD.encode("Event: LOS\nTrap value: raised 2026-10-16T09:58:40+03:00\n");
    let received = datetime!(2026-10-16 10:00:05 +3);
    let alert = RawAlert::new("OSM Problem: alarm siteA__siteB : STM STM-4 LOS", body, received);

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.primary_ts, received);
    assert_eq!(incident.secondary_ts, datetime!(2026-10-16 09:58:40 +3));
    assert!(incident.message.starts_with("16 жовт 2026 09:58:40 : OSM "));
    assert!(matches!(
        incident.detail,
        IncidentDetail::Sdh {
            kind: SdhKind::Circuit,
            trap_timestamp: true,
            ..
        }
    ));
}

#[test]
fn out_of_calendar_trap_value_falls_back_to_receipt_time() {
    let received = datetime!(2026-10-16 10:00:05 +3);
    let alert = RawAlert::new(
        "OSM Problem: alarm siteA__siteB : STM STM-4 LOS",
        "Trap value: raised 9999-12-31T23:59:59-05:00\n",
        received,
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.primary_ts, received);
    assert_eq!(incident.secondary_ts, received);
    assert!(incident.message.starts_with("16 жовт 2026 10:00:05 : OSM "));

    let mut store = IncidentStore::new();
    store.add(&incident);
    assert_eq!(store.message_count(), 1);
}

#[test]
fn earlier_trap_value_survives_an_unusable_later_one() {
    let alert = RawAlert::new(
        "OSM Problem: alarm siteA__siteB : STM STM-4 LOS",
        "Trap value: raised 2026-10-16T09:58:40+03:00\n\
         Trap value: cleared 9999-12-31T23:30:00Z\n",
        datetime!(2026-10-16 10:00:05 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.secondary_ts, datetime!(2026-10-16 09:58:40 +3));
}

#[test]
fn power_alert_on_unknown_site_needs_review() {
    let alert = RawAlert::new(
        "OSM Resolved: alarm odesa-1 : Power Diesel Generator started",
        "",
        datetime!(2026-10-16 13:00:00 +3),
    );

    let incident = classifier().classify(&alert).incident().expect("incident");
    assert_eq!(incident.group_key, "odesa-1");
    assert_eq!(incident.device_key, "");
    assert!(incident.needs_review);
    assert_eq!(
        incident.message,
        "16 жовт 2026 13:00:00 : OSM зареєстровано кінець інциденту, зникнення живлення \
         на виносі odesa-1 (<i>потребує коригування назви</i> '<b>odesa-1</b>') (генератор)"
    );
}

#[test]
fn stm1_needs_opt_in() {
    let alert = RawAlert::new(
        "OSM Problem: alarm siteA__siteB : STM STM-1 LOS",
        "",
        datetime!(2026-10-16 10:00:05 +3),
    );
    assert_eq!(
        classifier().classify(&alert),
        Classification::Discarded(DiscardReason::Unrecognized)
    );

    let rules = ClassifierRules {
        include_stm1: true,
        ..ClassifierRules::default()
    };
    let opted_in =
        Classifier::new(classifier().dictionaries().clone(), &rules, offset!(+3)).expect("rules");
    assert!(opted_in.classify(&alert).incident().is_some());
}

#[test]
fn circuit_without_from_side_is_malformed() {
    let alert = RawAlert::new(
        "OSM Problem: alarm __siteB : STM STM-4 LOS",
        "",
        datetime!(2026-10-16 10:00:05 +3),
    );
    assert_eq!(
        classifier().classify(&alert),
        Classification::Discarded(DiscardReason::Malformed)
    );
}
