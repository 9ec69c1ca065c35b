mod composer;
mod error;
mod installation;
mod opened_packages;
mod product_info;
mod telemetry;
#[cfg(test)]
mod test_harness;
mod version;
mod vm_options;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use crate::composer::{ArgumentComposer, LaunchPreferences};
use crate::telemetry::{Telemetry, init_logging};

/// CLI arguments for platform-jvm-args execution.
#[derive(Parser, Debug)]
#[command(
    name = "platform-jvm-args",
    about = "Compose the JVM arguments for launching an IDE installation in a sandbox.",
    version
)]
struct Cli {
    /// Root of the installed IDE build.
    #[arg(long, value_name = "PATH")]
    installation: PathBuf,
    /// Coroutines debug agent jar attached to new enough builds.
    #[arg(long, value_name = "PATH")]
    agent: PathBuf,
    #[arg(long, value_name = "SIZE")]
    max_heap: Option<String>,
    #[arg(long, value_name = "SIZE")]
    min_heap: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Lines)]
    format: OutputFormat,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// OTLP/HTTP endpoint receiving composition traces.
    #[arg(long, value_name = "URL")]
    otel: Option<String>,
    #[arg(long)]
    quiet: bool,
    #[arg(long)]
    timing: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    /// One argument per line.
    Lines,
    /// JSON array of arguments.
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    if !cli.installation.is_dir() {
        anyhow::bail!("installation not found: {}", cli.installation.display());
    }

    let telemetry = match cli.otel.clone() {
        Some(endpoint) => Some(Arc::new(Telemetry::new(endpoint)?)),
        None => None,
    };
    let started_at = Instant::now();
    let preferences = LaunchPreferences::new(cli.max_heap.clone(), cli.min_heap.clone());
    let composer = ArgumentComposer::new(&cli.installation, &cli.agent, preferences)
        .with_telemetry(telemetry.clone());
    let result = composer.compose();
    if let Some(telemetry) = telemetry.as_ref() {
        telemetry.shutdown()?;
    }
    let arguments = result.context("failed to compose JVM arguments")?;
    if let Ok(build_number) = composer.installation().build_number() {
        info!(
            installation = %cli.installation.display(),
            build = %build_number,
            count = arguments.len(),
            "composed JVM arguments"
        );
    }

    let mut writer = output_writer(cli.output.as_deref())?;
    write_arguments(&mut writer, &arguments, cli.format)?;

    if cli.timing && !cli.quiet {
        eprintln!(
            "timing: total_ms={} arguments={}",
            started_at.elapsed().as_millis(),
            arguments.len()
        );
    }

    Ok(())
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdout())),
        Some(path) => Ok(Box::new(
            File::create(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Ok(Box::new(io::stdout())),
    }
}

fn write_arguments(
    writer: &mut dyn Write,
    arguments: &[String],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Lines => {
            for argument in arguments {
                writeln!(writer, "{argument}").context("failed to write arguments")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, arguments)
                .context("failed to serialize arguments")?;
            writer
                .write_all(b"\n")
                .context("failed to write arguments")?;
        }
    }
    writer.flush().context("failed to flush arguments")
}
