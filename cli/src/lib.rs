use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use time::OffsetDateTime;
use zvit_core::aggregate::IncidentStore;
use zvit_core::classify::Classifier;
use zvit_core::dictionary::Dictionaries;
use zvit_core::domain::PipelineWarning;
use zvit_core::duty::{report_subject, DutySchedule};
use zvit_core::error::AppError;
use zvit_core::ingest::{ingest_alerts, IngestSummary};
use zvit_core::report::render_section;
use zvit_mail::{AlertSource, MaildirSource, MboxSource};

pub mod cli;
pub mod config;

use config::{MailSourceConfig, RunConfig};

pub const DOCUMENT_HEAD: &str = r#"<html><head><meta http-equiv="content-type" content="text/html; charset=UTF-8"></head><body>"#;
pub const DOCUMENT_TAIL: &str = "</body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutput {
    pub subject: String,
    pub html: String,
    /// Present when the incident section was built.
    pub summary: Option<IngestSummary>,
    /// Fragments that could not be read.
    pub warnings: Vec<PipelineWarning>,
}

fn required<'a>(path: &'a Option<PathBuf>, what: &str) -> Result<&'a Path, AppError> {
    path.as_deref().ok_or_else(|| {
        AppError::new("CONFIG_INVALID", format!("{what} is required for the incident section"))
    })
}

fn incident_section(
    config: &RunConfig,
    schedule: &DutySchedule,
    now: OffsetDateTime,
) -> Result<(String, IngestSummary), AppError> {
    let dictionaries = Dictionaries::load(
        required(&config.device_dictionary, "Device dictionary")?,
        required(&config.circuit_dictionary, "Circuit dictionary")?,
    )?;
    let dictionary_warnings = dictionaries.warnings();
    let classifier = Classifier::new(dictionaries, &config.classifier, config.utc_offset)?;

    let retrieval = schedule.retrieval_window();
    let source: Box<dyn AlertSource> = match &config.mail {
        Some(MailSourceConfig::Maildir(dir)) => {
            Box::new(MaildirSource::new(dir.clone()).with_window(retrieval))
        }
        Some(MailSourceConfig::Mbox(path)) => {
            Box::new(MboxSource::new(path.clone()).with_window(retrieval))
        }
        None => {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "A mail source is required for the incident section",
            ))
        }
    };
    let fetched = source.fetch()?;

    let mut store = IncidentStore::new();
    let mut summary = ingest_alerts(&classifier, &fetched.alerts, &mut store);
    let mut warnings = dictionary_warnings;
    warnings.extend(fetched.warnings);
    warnings.append(&mut summary.warnings);
    summary.warnings = warnings;

    let window = schedule.active(now);
    Ok((render_section(&store, &window), summary))
}

/// Build the report document for the shift active at `now`.
///
/// Returns `None` when every section is disabled.
pub fn generate_report(
    config: &RunConfig,
    now: OffsetDateTime,
) -> Result<Option<ReportOutput>, AppError> {
    if config.all_sections_disabled() {
        tracing::info!("all report sections are disabled");
        return Ok(None);
    }

    let schedule = DutySchedule::for_instant(now, config.utc_offset)?;
    let window = schedule.active(now);
    let subject = report_subject(&window);
    tracing::info!(subject = %subject, "generating report");

    let mut html = String::from(DOCUMENT_HEAD);
    let mut summary = None;
    if config.incidents {
        let (section, ingest) = incident_section(config, &schedule, now)?;
        html.push_str(&section);
        summary = Some(ingest);
    }

    let mut warnings = Vec::new();
    for path in &config.fragments {
        match fs::read_to_string(path) {
            Ok(fragment) => html.push_str(&fragment),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "report fragment skipped");
                warnings.push(
                    PipelineWarning::new("REPORT_FRAGMENT_UNREADABLE", "Report fragment skipped")
                        .with_details(format!("path={}; err={e}", path.display())),
                );
            }
        }
    }
    html.push_str(DOCUMENT_TAIL);

    Ok(Some(ReportOutput {
        subject,
        html,
        summary,
        warnings,
    }))
}

/// One report run: build the document and write it where the config says.
pub fn run(config: &RunConfig) -> anyhow::Result<()> {
    let now = config.now.unwrap_or_else(OffsetDateTime::now_utc);
    let Some(report) = generate_report(config, now)? else {
        return Ok(());
    };

    if let Some(path) = &config.review_json {
        match &report.summary {
            Some(summary) => {
                let json = serde_json::to_string_pretty(summary)
                    .context("failed to encode ingest summary")?;
                fs::write(path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            None => tracing::warn!("incident section disabled, review JSON not written"),
        }
    }

    match &config.output {
        Some(path) => {
            fs::write(path, &report.html)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{}", report.subject);
        }
        None => println!("{}", report.html),
    }
    Ok(())
}
