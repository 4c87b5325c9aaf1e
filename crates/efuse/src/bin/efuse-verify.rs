//! eFuse verification CLI
//!
//! Reads an espefuse JSON summary and checks it against the virgin or
//! locked security profile, or with `--info` only lists the security eFuses.
//! Exit status: 0 pass (or info), 1 fail, 2 no device data.

use anyhow::{Context, Result};
use canary_core::{logging, Config, LoggingConfig};
use canary_efuse::report::{self, EXIT_PASS, EXIT_UNAVAILABLE};
use canary_efuse::{parse_attributes, DeviceIdentity, EfuseError, Mode, Verifier};
use clap::{ArgGroup, Parser};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "efuse-verify")]
#[command(about = "Verify an ESP32-S3 eFuse configuration against a security profile")]
#[command(version)]
#[command(group(ArgGroup::new("mode").args(["expect", "expect_virgin", "expect_locked", "info"])))]
struct Cli {
    /// espefuse JSON summary (`-` for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Expected profile (virgin or locked)
    #[arg(short, long)]
    expect: Option<String>,

    /// Shorthand for --expect virgin
    #[arg(long)]
    expect_virgin: bool,

    /// Shorthand for --expect locked
    #[arg(long)]
    expect_locked: bool,

    /// List the security eFuses without verifying them
    #[arg(long)]
    info: bool,

    /// Chip model recorded in the report
    #[arg(long)]
    chip_model: Option<String>,

    /// Chip revision recorded in the report
    #[arg(long)]
    chip_revision: Option<String>,

    /// MAC address recorded in the report
    #[arg(long)]
    mac: Option<String>,

    /// Chip ID recorded in the report
    #[arg(long)]
    chip_id: Option<String>,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suppress the report, only set the exit status
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            error!("{:#}", err);
            eprintln!("error: {:#}", err);
            ExitCode::from(EXIT_UNAVAILABLE as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default_config(),
    };

    let logging_config = if cli.verbose {
        LoggingConfig {
            level: "debug".to_string(),
            ..config.logging.clone()
        }
    } else {
        config.logging.clone()
    };
    logging::init_with(&logging_config);

    let text = read_input(&cli.input)?;
    let attributes = parse_attributes(&text)
        .with_context(|| format!("no usable eFuse data in {}", cli.input.display()))?;

    let identity = DeviceIdentity {
        chip_model: cli.chip_model.clone(),
        chip_revision: cli.chip_revision.clone(),
        mac_address: cli.mac.clone(),
        chip_id: cli.chip_id.clone(),
    };
    let verifier = Verifier::new();

    if cli.info {
        info!(attributes = attributes.len(), "eFuse summary loaded");
        let summary = verifier.summarize(&attributes, Some(identity));
        emit(cli, &report::to_json_pretty(&summary)?, || {
            report::render_summary(&summary)
        })?;
        return Ok(EXIT_PASS);
    }

    let mode = resolve_mode(cli, &config)?;
    info!(attributes = attributes.len(), %mode, "eFuse summary loaded");
    let result = verifier.verify(&attributes, mode, Some(identity));
    emit(cli, &report::to_json_pretty(&result)?, || report::render_text(&result))?;

    Ok(report::exit_code(&result))
}

/// Write the JSON document to `--output` and print the chosen format.
fn emit(cli: &Cli, json: &str, text: impl FnOnce() -> String) -> Result<()> {
    if let Some(path) = &cli.output {
        fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }

    if !cli.quiet {
        if cli.json {
            println!("{}", json);
        } else {
            print!("{}", text());
        }
    }
    Ok(())
}

fn resolve_mode(cli: &Cli, config: &Config) -> Result<Mode> {
    if cli.expect_virgin {
        return Ok(Mode::Virgin);
    }
    if cli.expect_locked {
        return Ok(Mode::Locked);
    }
    let raw = cli
        .expect
        .as_deref()
        .unwrap_or(config.verifier.default_mode.as_str());
    Ok(raw.parse::<Mode>()?)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| EfuseError::InputUnavailable(e.to_string()))?;
        return Ok(text);
    }

    fs::read_to_string(path)
        .map_err(|e| EfuseError::InputUnavailable(format!("{}: {}", path.display(), e)).into())
}
