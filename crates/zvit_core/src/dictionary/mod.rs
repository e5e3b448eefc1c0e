use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::PipelineWarning;
use crate::error::AppError;

/// The two independent dictionaries an alert can be resolved against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Zabbix device names (PD family).
    Device,
    /// OSM circuit and site names (SDH family).
    Circuit,
}

#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    source: String,
    pattern: Regex,
    canonical_value: String,
}

impl DictionaryEntry {
    /// Pattern text as written in the dictionary file.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn canonical_value(&self) -> &str {
        &self.canonical_value
    }

    fn matches(&self, raw_key: &str) -> bool {
        self.pattern.is_match(raw_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub value: String,
    pub matched: bool,
}

/// Ordered `pattern=canonical` rules for one namespace.
///
/// Rules are sorted longest pattern first at build time (ties keep file order) and every
/// pattern must match the whole key, so `sw1` never resolves `sw10`.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    warnings: Vec<PipelineWarning>,
}

struct RuleLine<'a> {
    line_no: usize,
    pattern: &'a str,
    value: &'a str,
}

fn compile_full_match(pattern: &str) -> Result<Regex, regex::Error> {
    // Compile bare first so an unbalanced group cannot escape the anchors below.
    Regex::new(pattern)?;
    Regex::new(&format!("^(?:{pattern})$"))
}

impl Dictionary {
    pub fn build<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut warnings = Vec::new();
        let mut rules = Vec::new();

        for (idx, line) in lines.into_iter().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((pattern, value)) = trimmed.split_once('=') else {
                tracing::warn!(line_no, line = trimmed, "dictionary line has no '=', skipped");
                warnings.push(
                    PipelineWarning::new(
                        "DICTIONARY_LINE_INVALID",
                        "Dictionary line is not pattern=value; skipped",
                    )
                    .with_details(format!("line={line_no}; text={trimmed}")),
                );
                continue;
            };

            let pattern = pattern.trim();
            if pattern.is_empty() {
                tracing::warn!(line_no, "dictionary line has an empty pattern, skipped");
                warnings.push(
                    PipelineWarning::new(
                        "DICTIONARY_PATTERN_EMPTY",
                        "Dictionary line has an empty pattern; skipped",
                    )
                    .with_details(format!("line={line_no}")),
                );
                continue;
            }

            rules.push(RuleLine {
                line_no,
                pattern,
                value: value.trim(),
            });
        }

        // Stable: equal lengths keep file order.
        rules.sort_by(|a, b| b.pattern.chars().count().cmp(&a.pattern.chars().count()));

        let mut entries = Vec::with_capacity(rules.len());
        for rule in rules {
            match compile_full_match(rule.pattern) {
                Ok(pattern) => entries.push(DictionaryEntry {
                    source: rule.pattern.to_string(),
                    pattern,
                    canonical_value: rule.value.to_string(),
                }),
                Err(e) => {
                    tracing::warn!(
                        line_no = rule.line_no,
                        pattern = rule.pattern,
                        error = %e,
                        "invalid regex pattern in dictionary, rule disabled"
                    );
                    warnings.push(
                        PipelineWarning::new(
                            "DICTIONARY_PATTERN_INVALID",
                            "Invalid regex pattern in dictionary; rule disabled",
                        )
                        .with_details(format!(
                            "line={}; pattern={}; err={e}",
                            rule.line_no, rule.pattern
                        )),
                    );
                }
            }
        }

        Self { entries, warnings }
    }

    pub fn from_text(text: &str) -> Self {
        Self::build(text.lines())
    }

    /// Read a dictionary file. An unreadable file is fatal; bad rules inside it are not.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::new("DICTIONARY_READ_FAILED", "Failed to load dictionary file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
        let dictionary = Self::from_text(&text);
        tracing::debug!(
            path = %path.display(),
            rules = dictionary.len(),
            skipped = dictionary.warnings.len(),
            "dictionary loaded"
        );
        Ok(dictionary)
    }

    pub fn lookup(&self, raw_key: &str) -> Lookup {
        match self.entries.iter().find(|entry| entry.matches(raw_key)) {
            Some(entry) => Lookup {
                value: entry.canonical_value.clone(),
                matched: true,
            },
            None => Lookup {
                value: raw_key.to_string(),
                matched: false,
            },
        }
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warnings(&self) -> &[PipelineWarning] {
        &self.warnings
    }
}

/// Both namespaces, shared read-only by the classifier.
#[derive(Debug, Clone, Default)]
pub struct Dictionaries {
    device: Dictionary,
    circuit: Dictionary,
}

impl Dictionaries {
    pub fn new(device: Dictionary, circuit: Dictionary) -> Self {
        Self { device, circuit }
    }

    pub fn load(device_path: &Path, circuit_path: &Path) -> Result<Self, AppError> {
        Ok(Self::new(
            Dictionary::load(device_path)?,
            Dictionary::load(circuit_path)?,
        ))
    }

    pub fn get(&self, namespace: Namespace) -> &Dictionary {
        match namespace {
            Namespace::Device => &self.device,
            Namespace::Circuit => &self.circuit,
        }
    }

    pub fn lookup(&self, namespace: Namespace, raw_key: &str) -> Lookup {
        self.get(namespace).lookup(raw_key)
    }

    pub fn warnings(&self) -> Vec<PipelineWarning> {
        self.device
            .warnings()
            .iter()
            .chain(self.circuit.warnings())
            .cloned()
            .collect()
    }
}
