use crate::config::Config;
use crate::display::*;
use crate::extract::Extractor;
use crate::loaders::{Loader, Source};
use crate::stats::{aggregate_stats, observed_subjects, tabulate};
use clap::{ArgAction, Parser};
use eyre::{Error, WrapErr, bail};
use std::path::PathBuf;
use tracing::{Level, info};

mod checks;
mod config;
mod display;
mod extract;
mod loaders;
mod model;
mod report;
mod stats;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    source: SourceArgs,
    /// Directory receiving the JSON and CSV files (default: current directory)
    #[arg(short, long, value_name = "PATH")]
    directory: Option<PathBuf>,
    /// Use FILE instead of necta-stats.toml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print grade counts for every subject
    #[arg(long)]
    details: bool,
    /// Set verbosity level
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Centre number, e.g. 507
    #[arg(long, value_name = "ID")]
    centre: Option<String>,
    /// Full address of the results page
    #[arg(long)]
    url: Option<String>,
    /// Results page saved on disk
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

impl SourceArgs {
    fn source(self) -> Result<Source, Error> {
        Ok(match self {
            SourceArgs {
                centre: Some(centre),
                ..
            } => Source::Centre(centre),
            SourceArgs { url: Some(url), .. } => Source::Url(url),
            SourceArgs {
                file: Some(file), ..
            } => Source::File(file),
            _ => bail!("one of --centre, --url or --file is required"),
        })
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    color_eyre::install()?;
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(args.verbose))
        .with_writer(std::io::stderr)
        .init();
    let config = Config::discover(args.config.as_deref())?;
    let codes = &config.codes;
    let source = args.source.source()?;

    let html = Loader::new(&config.source)?.load(&source).await?;
    let extraction = Extractor::new()?
        .extract(&html)
        .wrap_err_with(|| format!("cannot read results from {source}"))?;
    let records = extraction.records;
    info!(students = records.len(), "results extracted");

    let tally = tabulate(&records, &observed_subjects(&records), codes);
    let stats = aggregate_stats(&records);
    let mut warnings = extraction.warnings;
    warnings.extend(tally.warnings.iter().cloned());
    warnings.extend(checks::unknown_aggregate_codes(&records, codes));
    checks::log_warnings(&warnings);

    let directory = report::resolve_directory(args.directory.as_deref())?;
    let outputs = report::write_all(&directory, &config.output, &records, &tally)?;

    let mut out = std::io::stdout().lock();
    if args.details {
        display_details(&mut out, &tally)?;
    }
    display_stats(&mut out, &records, &tally, &stats, codes)?;
    display_star_codes(&mut out, &star_code_summary(&records, codes), codes)?;
    display_divisions(&mut out, &tally)?;
    display_warnings(&mut out, &warnings)?;
    display_outputs(&mut out, &outputs)?;
    Ok(())
}
