//! Telemetry replay CLI
//!
//! Feeds newline-delimited JSON events through the dispatcher and prints one
//! JSON result per event. Each input line is either
//! `{"topic": "securacv/<device>/<category>", "payload": ...}` or
//! `{"device_id": "...", "category": "...", "payload": ...}`.

use anyhow::{Context, Result};
use canary_core::{logging, Config, LoggingConfig};
use canary_telemetry::{Dispatch, Dispatcher, TelemetryError};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "canary-replay")]
#[command(about = "Replay recorded Canary telemetry through the state engine")]
#[command(version)]
struct Cli {
    /// Newline-delimited JSON events (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured topic prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Print every stored signal per device after the replay
    #[arg(long)]
    summary: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct Event {
    topic: Option<String>,
    device_id: Option<String>,
    category: Option<String>,
    #[serde(default)]
    payload: Value,
}

impl Event {
    /// Raw bytes as the device would have published them.
    fn payload_bytes(&self) -> Vec<u8> {
        match &self.payload {
            Value::String(s) => s.as_bytes().to_vec(),
            Value::Null => Vec::new(),
            other => other.to_string().into_bytes(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

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

    let mut dispatcher = Dispatcher::from_config(&config.telemetry);
    if let Some(prefix) = &cli.prefix {
        dispatcher = dispatcher.with_topic_prefix(prefix);
    }

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut processed = 0usize;
    let mut rejected = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let result = serde_json::from_str::<Event>(&line)
            .map_err(|e| e.to_string())
            .and_then(|event| dispatch(&dispatcher, &event).map_err(|e| e.to_string()));

        let record = match result {
            Ok(dispatch) => {
                processed += 1;
                serde_json::to_value(&dispatch)?
            }
            Err(error) => {
                rejected += 1;
                warn!(line = index + 1, %error, "rejected event");
                json!({ "line": index + 1, "error": error })
            }
        };
        writeln!(out, "{}", record)?;
    }

    if cli.summary {
        for device in dispatcher.registry().devices() {
            let signals = dispatcher.snapshot(&device);
            writeln!(out, "{}", json!({ "device_id": device, "signals": signals }))?;
        }
        writeln!(out, "{}", serde_json::to_value(dispatcher.diagnostics())?)?;
    }

    info!(processed, rejected, "replay finished");
    Ok(())
}

fn dispatch(dispatcher: &Dispatcher, event: &Event) -> Result<Dispatch, TelemetryError> {
    let payload = event.payload_bytes();
    match (&event.topic, &event.device_id, &event.category) {
        (Some(topic), _, _) => dispatcher.handle_topic(topic, &payload),
        (None, Some(device_id), Some(category)) => {
            dispatcher.handle_named(device_id, category, &payload)
        }
        _ => Err(TelemetryError::InvalidTopic {
            topic: String::new(),
            reason: "event needs a topic or a device_id and category".to_string(),
        }),
    }
}
