mod pd;
mod sdh;
pub mod trap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::dictionary::Dictionaries;
use crate::domain::{Classification, DiscardReason, RawAlert};
use crate::error::AppError;
use crate::report::escape_html;

use self::trap::TrapScanner;

const DEFAULT_PD_SIGNATURE: &str = "Unavailable by ICMP ping|has been restarted";

/// Site-specific tuning of the classifier.
///
/// These lists follow one organization's naming conventions, so they are data, not code:
/// operators override them from the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierRules {
    /// Subject pattern that selects the ping-down family.
    pub pd_signature: String,
    /// Subject pattern that selects the circuit/power family. `None` derives it from
    /// `include_stm1`.
    pub sdh_signature: Option<String>,
    /// Report STM-1 circuits too (normally only STM-2 and above).
    pub include_stm1: bool,
    /// PD subjects matching any of these belong to non-operational systems.
    pub noise_patterns: Vec<String>,
    /// Substrings that rescue a subject from the noise filter.
    pub noise_exceptions: Vec<String>,
    /// Role markers stripped from the start of a device name before lookup.
    pub role_prefixes: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            pd_signature: DEFAULT_PD_SIGNATURE.to_string(),
            sdh_signature: None,
            include_stm1: false,
            noise_patterns: [
                "IVR",
                "TELEVIEV",
                "Z-SQL",
                "UVPN",
                "SDH-OSM",
                "astashov",
                "console",
                r"ramb-\d+",
                r"[dm]: NS\d?",
                r": [ap][^:]+: [ap][^:]+ has",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            noise_exceptions: vec!["alca".to_string()],
            role_prefixes: [r"[rsp]-", r"ies\d?-", "alca-"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ClassifierRules {
    pub fn effective_sdh_signature(&self) -> String {
        match &self.sdh_signature {
            Some(signature) => signature.clone(),
            None => {
                let digits = if self.include_stm1 { "1-9" } else { "2-9" };
                format!("[Pp][Oo][Ww][Ee][Rr]|STM [Ss][Tt][Mm].?[{digits}][0-9]*")
            }
        }
    }
}

fn compile_rule(field: &str, pattern: &str) -> Result<Regex, AppError> {
    Regex::new(pattern).map_err(|e| {
        AppError::new("CLASSIFIER_RULE_INVALID", format!("Invalid pattern in {field}"))
            .with_details(format!("pattern={pattern}; err={e}"))
    })
}

/// Turns raw alerts into canonicalized incidents.
///
/// Holds only read-only state, so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct Classifier {
    dictionaries: Dictionaries,
    pd_signature: Regex,
    sdh_signature: Regex,
    noise: Vec<Regex>,
    noise_exceptions: Vec<String>,
    role_prefix: Option<Regex>,
    trap: TrapScanner,
    local_offset: UtcOffset,
}

impl Classifier {
    pub fn new(
        dictionaries: Dictionaries,
        rules: &ClassifierRules,
        local_offset: UtcOffset,
    ) -> Result<Self, AppError> {
        let pd_signature = compile_rule("pd_signature", &rules.pd_signature)?;
        let sdh_signature = compile_rule("sdh_signature", &rules.effective_sdh_signature())?;

        let noise = rules
            .noise_patterns
            .iter()
            .map(|p| compile_rule("noise_patterns", p))
            .collect::<Result<Vec<_>, _>>()?;

        let role_prefix = if rules.role_prefixes.is_empty() {
            None
        } else {
            for p in &rules.role_prefixes {
                compile_rule("role_prefixes", p)?;
            }
            let alternation = rules.role_prefixes.join("|");
            Some(compile_rule("role_prefixes", &format!("^(?:{alternation})"))?)
        };

        Ok(Self {
            dictionaries,
            pd_signature,
            sdh_signature,
            noise,
            noise_exceptions: rules.noise_exceptions.clone(),
            role_prefix,
            trap: TrapScanner::new()?,
            local_offset,
        })
    }

    pub fn with_default_rules(
        dictionaries: Dictionaries,
        local_offset: UtcOffset,
    ) -> Result<Self, AppError> {
        Self::new(dictionaries, &ClassifierRules::default(), local_offset)
    }

    /// Classify one alert. PD is tried before SDH; anything else is dropped.
    pub fn classify(&self, alert: &RawAlert) -> Classification {
        if self.pd_signature.is_match(&alert.subject) {
            pd::classify(self, alert)
        } else if self.sdh_signature.is_match(&alert.subject) {
            sdh::classify(self, alert)
        } else {
            Classification::Discarded(DiscardReason::Unrecognized)
        }
    }

    pub fn dictionaries(&self) -> &Dictionaries {
        &self.dictionaries
    }

    pub fn local_offset(&self) -> UtcOffset {
        self.local_offset
    }

    fn is_noise(&self, subject: &str) -> bool {
        self.noise.iter().any(|re| re.is_match(subject))
            && !self
                .noise_exceptions
                .iter()
                .any(|marker| subject.contains(marker.as_str()))
    }

    fn strip_role_prefix<'a>(&self, name: &'a str) -> &'a str {
        match self.role_prefix.as_ref().and_then(|re| re.find(name)) {
            Some(m) => &name[m.end()..],
            None => name,
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// ` (<i>потребує коригування назви</i> '<b>a</b>' та '<b>b</b>')`
fn review_note(names: &[&str]) -> String {
    let quoted: Vec<String> = names
        .iter()
        .map(|name| format!("'<b>{}</b>'", escape_html(name)))
        .collect();
    format!(
        " (<i>потребує коригування назви</i> {})",
        quoted.join(" та ")
    )
}
