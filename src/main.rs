mod cli_logger;

use anyhow::Result;
use clap::Parser;
use perftrace::{
    AnalysisOutput, Config, DEFAULT_CONFIG_FILE, Reporter, TraceCommand, trace_command,
};
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;
use std::process::ExitCode;

use cli_logger::CliLogger;

/// Reduce speedscope CPU traces to hotspot metrics and baseline verdicts.
#[derive(Debug, Parser)]
#[command(name = "perftrace", version, about)]
struct Cli {
    /// Path to perftrace.toml.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Output format; defaults to the config's reporter.
    #[arg(long, global = true)]
    format: Option<Reporter>,
    /// Shorthand for `--format json`.
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: TraceCommand,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load_optional(&cli.config);
    let reporter = if cli.json {
        Reporter::Json
    } else {
        cli.format.unwrap_or(config.reporter)
    };
    let logger = CliLogger::new(reporter == Reporter::Json, cli.no_color);

    match run(&config, &cli.command, reporter, &logger) {
        Ok(code) => code,
        Err(err) => {
            logger.print_error(&format!("{err:#}"));
            ExitCode::from(2)
        }
    }
}

fn run(
    config: &Config,
    command: &TraceCommand,
    reporter: Reporter,
    logger: &CliLogger,
) -> Result<ExitCode> {
    let value = trace_command(config, command)?;

    if let Ok(single) = serde_json::from_value::<AnalysisOutput>(value.clone()) {
        if let Some(error) = &single.metrics.error {
            logger.print_warning(&format!("{}: {error}", single.trace));
        }
    }

    match reporter {
        Reporter::Markdown => logger.print_markdown(&value)?,
        Reporter::Pretty | Reporter::Json => logger.print_value(&value)?,
    }

    let regressed = value
        .get("regression")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    Ok(if regressed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PERFTRACE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
