use std::process;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use xml_shape::cli::{Cli, VerbosityLevel};
use xml_shape::config::ConfigManager;
use xml_shape::engine::InferenceEngine;
use xml_shape::output::FileReportWriter;

fn init_tracing(verbosity: VerbosityLevel) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = ConfigManager::load_config(cli).context("Failed to load configuration")?;
    let quiet = config.output.quiet;

    let mut writer = FileReportWriter::new(&config.output.directory);
    let engine = InferenceEngine::new(config);
    let summary = engine
        .run(&cli.path, &mut writer)
        .with_context(|| format!("Failed to analyze {}", cli.path.display()))?;

    if let Some(report) = summary.report
        && !quiet
    {
        println!("{}", report.display());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbosity());

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
