use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zvit_core::error::AppError;

use noczvit_lib::cli::Cli;
use noczvit_lib::config::{FileConfig, RunConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let debug = cli.debug || cli.verbose || file.debug.unwrap_or(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("noczvit_lib=debug,zvit_core=debug,zvit_mail=debug,info")
        } else {
            EnvFilter::new("noczvit_lib=info,zvit_core=info,zvit_mail=info,warn")
        }
    });
    // stdout carries the document.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = RunConfig::resolve(file, &cli)?;
    let result = noczvit_lib::run(&config);
    if let Err(e) = &result {
        if e.downcast_ref::<AppError>().is_some_and(|e| e.retryable) {
            tracing::warn!("failure looks transient, the next run may succeed");
        }
    }
    result
}
