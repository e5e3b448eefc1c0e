use zvit_core::dictionary::{Dictionaries, Dictionary, Namespace};

#[test]
fn longer_pattern_wins_regardless_of_file_order() {
    let general_first = Dictionary::from_text("sw.*=Switches\nsw1.*=Site A\n");
    let specific_first = Dictionary::from_text("sw1.*=Site A\nsw.*=Switches\n");

    for dictionary in [&general_first, &specific_first] {
        assert_eq!(dictionary.lookup("sw12").value, "Site A");
        assert_eq!(dictionary.lookup("sw9").value, "Switches");
        assert_eq!(dictionary.entries()[0].pattern(), "sw1.*");
    }
}

#[test]
fn patterns_must_match_the_whole_key() {
    let dictionary = Dictionary::from_text("sw1=Site A\n");

    let hit = dictionary.lookup("sw1");
    assert!(hit.matched);
    assert_eq!(hit.value, "Site A");

    let miss = dictionary.lookup("sw10");
    assert!(!miss.matched);
    assert_eq!(miss.value, "sw10");
}

#[test]
fn invalid_pattern_disables_only_its_rule() {
    let dictionary = Dictionary::from_text("core-(\\d+=Core\nedge=Edge\nno separator here\n");

    assert_eq!(dictionary.len(), 1);
    assert_eq!(dictionary.lookup("edge").value, "Edge");

    let codes: Vec<&str> = dictionary
        .warnings()
        .iter()
        .map(|w| w.code.as_str())
        .collect();
    assert_eq!(codes, vec!["DICTIONARY_LINE_INVALID", "DICTIONARY_PATTERN_INVALID"]);
}

#[test]
fn fixture_dictionaries_load_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let device = dir.path().join("dictionary_pd.txt");
    let circuit = dir.path().join("dictionary_sdh.txt");
    std::fs::write(
        &device,
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../fixtures/dictionaries/dictionary_pd.txt"
        )),
    )
    .expect("write device");
    std::fs::write(
        &circuit,
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../fixtures/dictionaries/dictionary_sdh.txt"
        )),
    )
    .expect("write circuit");

    let dictionaries = Dictionaries::load(&device, &circuit).expect("load");
    assert!(dictionaries.warnings().is_empty());
    assert_eq!(dictionaries.lookup(Namespace::Device, "sw12").value, "Site A ring");
    assert_eq!(dictionaries.lookup(Namespace::Circuit, "lviv-3").value, "Львів");
    // Namespaces are independent.
    assert!(!dictionaries.lookup(Namespace::Circuit, "sw1").matched);
}

#[test]
fn missing_dictionary_file_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = Dictionary::load(&dir.path().join("absent.txt")).unwrap_err();
    assert_eq!(err.code, "DICTIONARY_READ_FAILED");
    assert!(err.details.unwrap_or_default().contains("absent.txt"));
}
