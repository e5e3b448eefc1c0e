use std::path::PathBuf;

use clap::Parser;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Build the duty-shift incident report from Zabbix and OSM alert mail.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "noczvit")]
#[command(about = "Duty-shift incident report from monitoring alert mail")]
#[command(version)]
pub struct Cli {
    /// TOML config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Device name dictionary (pattern=name per line)
    #[arg(long)]
    pub dictionary_pd: Option<PathBuf>,

    /// Circuit and site name dictionary (pattern=name per line)
    #[arg(long)]
    pub dictionary_sdh: Option<PathBuf>,

    /// Read alerts from a Maildir or a directory of message files
    #[arg(long, conflicts_with = "mbox")]
    pub maildir: Option<PathBuf>,

    /// Read alerts from an mbox file
    #[arg(long)]
    pub mbox: Option<PathBuf>,

    /// Write the HTML document here and print the subject on stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Extra HTML section appended after the incidents (repeatable)
    #[arg(long = "fragment")]
    pub fragments: Vec<PathBuf>,

    /// Write the ingest summary as JSON
    #[arg(long)]
    pub review_json: Option<PathBuf>,

    /// Include the incident section
    #[arg(long, overrides_with = "no_incidents")]
    pub incidents: bool,

    /// Leave the incident section out
    #[arg(long, overrides_with = "incidents")]
    pub no_incidents: bool,

    /// Debug logging
    #[arg(long)]
    pub debug: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Report as if generated at this RFC 3339 instant
    #[arg(long, value_parser = parse_now)]
    pub now: Option<OffsetDateTime>,

    /// Fixed local offset of the duty schedule, e.g. +02:00 (no daylight saving)
    #[arg(long)]
    pub utc_offset: Option<String>,
}

impl Cli {
    /// `Some` when one of `--incidents` / `--no-incidents` was given.
    pub fn incidents_flag(&self) -> Option<bool> {
        if self.no_incidents {
            Some(false)
        } else if self.incidents {
            Some(true)
        } else {
            None
        }
    }
}

fn parse_now(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}
