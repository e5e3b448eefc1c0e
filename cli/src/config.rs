//! Run configuration: optional TOML file, overridden by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use zvit_core::classify::ClassifierRules;
use zvit_core::error::AppError;

use crate::cli::Cli;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DictionaryPaths {
    pub device: Option<PathBuf>,
    pub circuit: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MailConfig {
    pub maildir: Option<PathBuf>,
    pub mbox: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    pub output: Option<PathBuf>,
    pub fragments: Vec<PathBuf>,
    pub review_json: Option<PathBuf>,
}

/// Contents of the config file. Every key is optional; unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub debug: Option<bool>,
    pub incidents: Option<bool>,
    /// Fixed `±HH:MM` for every duty bound and displayed time. It does not follow
    /// daylight saving: on the two change nights a year one shift bound is an hour off.
    pub utc_offset: Option<String>,
    pub dictionaries: DictionaryPaths,
    pub mail: MailConfig,
    pub classifier: ClassifierRules,
    pub report: ReportConfig,
}

impl FileConfig {
    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| {
            AppError::new("CONFIG_PARSE_FAILED", "Invalid TOML in config file")
                .with_details(e.to_string())
        })
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read config file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
        let mut config = Self::from_toml(&text).map_err(|e| {
            let details = e.details.clone().unwrap_or_default();
            e.with_details(format!("path={}; {details}", path.display()))
        })?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Resolve relative paths against the config file's directory.
    fn rebase(&mut self, base: &Path) {
        let rebase = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        rebase(&mut self.dictionaries.device);
        rebase(&mut self.dictionaries.circuit);
        rebase(&mut self.mail.maildir);
        rebase(&mut self.mail.mbox);
        rebase(&mut self.report.output);
        rebase(&mut self.report.review_json);
        for fragment in &mut self.report.fragments {
            if fragment.is_relative() {
                *fragment = base.join(&*fragment);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailSourceConfig {
    Maildir(PathBuf),
    Mbox(PathBuf),
}

/// Effective settings of one run after merging and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub debug: bool,
    pub incidents: bool,
    pub utc_offset: UtcOffset,
    pub device_dictionary: Option<PathBuf>,
    pub circuit_dictionary: Option<PathBuf>,
    pub mail: Option<MailSourceConfig>,
    pub classifier: ClassifierRules,
    pub output: Option<PathBuf>,
    pub fragments: Vec<PathBuf>,
    pub review_json: Option<PathBuf>,
    pub now: Option<OffsetDateTime>,
}

fn invalid(message: &str) -> AppError {
    AppError::new("CONFIG_INVALID", message)
}

/// Parse `±HH:MM`.
pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, AppError> {
    UtcOffset::parse(
        raw.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|e| {
        invalid("utc_offset must look like +02:00").with_details(format!("value={raw}; err={e}"))
    })
}

fn local_offset() -> UtcOffset {
    match UtcOffset::current_local_offset() {
        Ok(offset) => offset,
        Err(e) => {
            tracing::warn!(error = %e, "local offset unavailable, using UTC");
            UtcOffset::UTC
        }
    }
}

impl RunConfig {
    /// Read the file named by `--config` (if any) and merge the flags over it.
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, cli)
    }

    pub fn resolve(file: FileConfig, cli: &Cli) -> Result<Self, AppError> {
        let utc_offset = match cli.utc_offset.as_deref().or(file.utc_offset.as_deref()) {
            Some(raw) => parse_utc_offset(raw)?,
            None => local_offset(),
        };

        // Either flag replaces the file's source entirely.
        let (maildir, mbox) = if cli.maildir.is_some() || cli.mbox.is_some() {
            (cli.maildir.clone(), cli.mbox.clone())
        } else {
            (file.mail.maildir, file.mail.mbox)
        };
        let mail = match (maildir, mbox) {
            (Some(_), Some(_)) => {
                return Err(invalid("Configure either a maildir or an mbox, not both"))
            }
            (Some(dir), None) => Some(MailSourceConfig::Maildir(dir)),
            (None, Some(path)) => Some(MailSourceConfig::Mbox(path)),
            (None, None) => None,
        };

        let mut fragments = file.report.fragments;
        if !cli.fragments.is_empty() {
            fragments = cli.fragments.clone();
        }

        let config = Self {
            debug: cli.debug || file.debug.unwrap_or(false),
            incidents: cli.incidents_flag().or(file.incidents).unwrap_or(true),
            utc_offset,
            device_dictionary: cli.dictionary_pd.clone().or(file.dictionaries.device),
            circuit_dictionary: cli.dictionary_sdh.clone().or(file.dictionaries.circuit),
            mail,
            classifier: file.classifier,
            output: cli.output.clone().or(file.report.output),
            fragments,
            review_json: cli.review_json.clone().or(file.report.review_json),
            now: cli.now,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !self.incidents {
            return Ok(());
        }
        if self.device_dictionary.is_none() || self.circuit_dictionary.is_none() {
            return Err(invalid(
                "Both dictionaries (device and circuit) are required for the incident section",
            ));
        }
        if self.mail.is_none() {
            return Err(invalid(
                "A mail source (maildir or mbox) is required for the incident section",
            ));
        }
        Ok(())
    }

    /// Nothing would be written: no incident section and no fragments.
    pub fn all_sections_disabled(&self) -> bool {
        !self.incidents && self.fragments.is_empty()
    }
}
