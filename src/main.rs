//! Entry point for the `yt` transcript downloader.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use console::style;
use tracing::{info, Level};
use tracing_appender::non_blocking;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yt_transcript::cli::{Cli, Command, ConfigAction};
use yt_transcript::config::{Config, DEFAULT_CONFIG_TEMPLATE};
use yt_transcript::format::OutputFormat;
use yt_transcript::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // `config init` must run before loading: its target may not exist yet.
    if let Some(Command::Config { action: ConfigAction::Init { force } }) = &cli.command {
        return config_init(cli.config.clone(), *force);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);

    if let Some(Command::Config { action: ConfigAction::Show }) = &cli.command {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    setup_logging(cli.verbose, config.log_file())?;

    let urls = collect_urls(&cli)?;
    if urls.is_empty() {
        eprintln!(
            "{} no URLs given; pass them as arguments or with --input",
            style("error:").red().bold()
        );
        return Ok(ExitCode::FAILURE);
    }

    if cli.workers > 1 {
        tracing::warn!("--workers is reserved; URLs are processed sequentially");
    }

    let format: OutputFormat = config.output.format.parse()?;
    config.ensure_directories()?;

    let workflow = Workflow::new(config, format, cli.length, cli.force, cli.no_save, cli.verbose)?;
    let summary = workflow.run(&urls).await?;

    info!(
        "Run complete: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    if summary.failed > 0 {
        eprintln!(
            "{} {} of {} URLs failed",
            style("warning:").yellow().bold(),
            summary.failed,
            urls.len()
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Positional URLs plus, optionally, one URL per line from an input file.
/// Blank lines and `#` comments in the file are skipped.
fn collect_urls(cli: &Cli) -> Result<Vec<String>> {
    let mut urls = cli.urls.clone();

    if let Some(input) = &cli.input {
        let content = std::fs::read_to_string(input)?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            urls.push(line.to_string());
        }
    }

    Ok(urls)
}

fn config_init(explicit_path: Option<PathBuf>, force: bool) -> Result<ExitCode> {
    let path = explicit_path.unwrap_or_else(Config::default_path);
    if path.exists() && !force {
        eprintln!(
            "{} {} already exists (use --force to overwrite)",
            style("error:").red().bold(),
            path.display()
        );
        return Ok(ExitCode::FAILURE);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
    println!("Wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}

/// Logging goes to stderr so pipe mode keeps stdout clean; a file layer is
/// added when a log file is configured.
fn setup_logging(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    let log_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::from_default_env().add_directive(log_level.into());

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let registry = tracing_subscriber::registry().with(filter).with(console_layer);

    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            std::fs::create_dir_all(dir)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "yt.log".to_string());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = non_blocking(appender);
            // Keep the guard alive for the duration of the program.
            std::mem::forget(guard);

            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(false);
            registry.with(file_layer).try_init()
        }
        None => registry.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
