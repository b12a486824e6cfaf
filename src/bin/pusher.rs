//! Pusher CLI - Command-line interface for station-push
//!
//! Commands:
//! - providers: List supported networks and their endpoints
//! - shape: Print the payloads that would be sent, without sending
//! - push: Run one push cycle for every configured station
//! - run: Push on a fixed cadence until interrupted

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use station_push::adapters::adapter_for;
use station_push::pusher::build_request;
use station_push::types::{ProviderId, PushPayload, ReadingSnapshot, SkipReason};
use station_push::{
    CycleReport, NetatmoAdapter, PushError, PushScheduler, Pusher, PusherConfig, PUSH_VERSION,
};

/// Pusher - Republish weather-station readings to third-party networks
#[derive(Parser)]
#[command(name = "pusher")]
#[command(version = PUSH_VERSION)]
#[command(about = "Push weather-station readings to WOW, PWS Weather, Weather Underground and OpenWeatherMap", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported providers
    Providers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print shaped payloads without sending them
    Shape {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Snapshot file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "snapshot")]
        input_format: InputFormat,

        /// Only shape for this provider
        #[arg(long)]
        provider: Option<String>,
    },

    /// Run one push cycle
    Push {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Snapshot file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "snapshot")]
        input_format: InputFormat,

        /// Pretty-print the results
        #[arg(long)]
        pretty: bool,
    },

    /// Push on a fixed cadence, re-reading configuration and snapshots each cycle
    Run {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Snapshot file path, rewritten by the collector between cycles
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "snapshot")]
        input_format: InputFormat,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of reading snapshots
    Snapshot,
    /// Netatmo station data response
    Netatmo,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), PusherCliError> {
    match cli.command {
        Commands::Providers { json } => cmd_providers(json),

        Commands::Shape {
            config,
            input,
            input_format,
            provider,
        } => cmd_shape(&config, &input, input_format, provider.as_deref()),

        Commands::Push {
            config,
            input,
            input_format,
            pretty,
        } => cmd_push(&config, &input, input_format, pretty).await,

        Commands::Run {
            config,
            input,
            input_format,
        } => cmd_run(&config, &input, input_format).await,
    }
}

fn cmd_providers(json: bool) -> Result<(), PusherCliError> {
    let providers: Vec<ProviderInfo> = ProviderId::ALL
        .iter()
        .map(|&provider| {
            let adapter = adapter_for(provider, None);
            ProviderInfo {
                id: provider.as_str(),
                name: provider.display_name(),
                endpoint: adapter.endpoint().to_string(),
                fields: adapter.field_map().iter().map(|r| r.target).collect(),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
    } else {
        for p in &providers {
            println!("{:<4} {:<20} {}", p.id, p.name, p.endpoint);
            println!("     fields: {}", p.fields.join(", "));
        }
    }
    Ok(())
}

fn cmd_shape(
    config_path: &Path,
    input: &Path,
    input_format: InputFormat,
    provider: Option<&str>,
) -> Result<(), PusherCliError> {
    let config = PusherConfig::load(config_path)?;
    let snapshots = read_snapshots(input, &input_format)?;
    let only = provider.map(str::parse::<ProviderId>).transpose()?;

    // Shaping never touches the network; the transport is never used
    let pusher = Pusher::from_config(&config)?;
    let now = Utc::now();
    let mut shaped = Vec::new();

    for station in &config.stations {
        let snapshot = snapshots.iter().find(|s| s.station_id == station.station_id);
        for creds in &station.providers {
            if only.is_some_and(|p| p != creds.provider) {
                continue;
            }
            let adapter = config.adapter(creds.provider);
            let outcome = match snapshot {
                Some(snapshot) => pusher.prepare(adapter.as_ref(), creds, snapshot, now),
                None => Err(SkipReason::NoSnapshot),
            };
            let (payload, skipped, url) = match outcome {
                Ok(payload) => {
                    let request = build_request(adapter.as_ref(), creds, &payload);
                    (Some(payload), None, Some(request.url))
                }
                Err(reason) => (None, Some(reason), None),
            };
            shaped.push(ShapedPayload {
                station_id: station.station_id.clone(),
                provider: creds.provider.as_str(),
                url,
                payload,
                skipped,
            });
        }
    }

    println!("{}", serde_json::to_string_pretty(&shaped)?);
    Ok(())
}

async fn cmd_push(
    config_path: &Path,
    input: &Path,
    input_format: InputFormat,
    pretty: bool,
) -> Result<(), PusherCliError> {
    let config = PusherConfig::load(config_path)?;
    let snapshots = read_snapshots(input, &input_format)?;

    let pusher = Pusher::from_config(&config)?;
    let mut scheduler = PushScheduler::new(pusher, &config);
    let report = scheduler
        .run_cycle(&config.stations, &snapshots, Utc::now())
        .await;

    print_report(&report, pretty)?;
    Ok(())
}

async fn cmd_run(
    config_path: &Path,
    input: &Path,
    input_format: InputFormat,
) -> Result<(), PusherCliError> {
    if input.to_string_lossy() == "-" {
        return Err(PusherCliError::Usage(
            "run needs a snapshot file it can re-read each cycle".to_string(),
        ));
    }

    let mut config = PusherConfig::load(config_path)?;
    let pusher = Pusher::from_config(&config)?;
    let mut scheduler = PushScheduler::new(pusher, &config);
    let mut retry_tick = false;

    log::info!(
        "pushing {} station(s) every {}s",
        config.stations.len(),
        config.push_interval_secs
    );

    loop {
        match PusherConfig::load(config_path) {
            Ok(fresh) if config.requires_rebuild(&fresh) => match Pusher::from_config(&fresh) {
                Ok(pusher) => {
                    log::info!("configuration changed, rebuilding pusher");
                    scheduler.reconfigure(pusher, &fresh);
                    config = fresh;
                }
                Err(e) => log::warn!("keeping previous configuration: {}", e),
            },
            Ok(fresh) => config = fresh,
            Err(e) => log::warn!("keeping previous configuration: {}", e),
        }

        match read_snapshots(input, &input_format) {
            Ok(snapshots) => {
                let now = Utc::now();
                let report = if retry_tick {
                    scheduler.retry_failed(&config.stations, &snapshots, now).await
                } else {
                    scheduler.run_cycle(&config.stations, &snapshots, now).await
                };
                print_report(&report, false)?;
            }
            Err(e) => log::warn!("cannot read snapshots: {:?}", e),
        }

        let interval = config.push_interval();
        let delay = if !retry_tick && scheduler.pending_retries() > 0 {
            retry_tick = true;
            retry_delay(interval)
        } else {
            retry_tick = false;
            interval
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Transport failures are retried well before the next regular cycle
fn retry_delay(interval: Duration) -> Duration {
    (interval / 4).max(Duration::from_secs(30)).min(interval)
}

fn read_snapshots(
    input: &Path,
    input_format: &InputFormat,
) -> Result<Vec<ReadingSnapshot>, PusherCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(PusherCliError::Usage(
                "stdin is a terminal; pipe a snapshot file or pass --input".to_string(),
            ));
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let snapshots = match input_format {
        InputFormat::Snapshot => serde_json::from_str(&input_data)?,
        InputFormat::Netatmo => NetatmoAdapter::parse(&input_data)?,
    };
    Ok(snapshots)
}

fn print_report(report: &CycleReport, pretty: bool) -> Result<(), PusherCliError> {
    let output = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    println!("{}", output);
    Ok(())
}

// Output types

#[derive(serde::Serialize)]
struct ProviderInfo {
    id: &'static str,
    name: &'static str,
    endpoint: String,
    fields: Vec<&'static str>,
}

#[derive(serde::Serialize)]
struct ShapedPayload {
    station_id: String,
    provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<PushPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<SkipReason>,
}

#[derive(Debug)]
enum PusherCliError {
    Io(io::Error),
    Push(PushError),
    Json(serde_json::Error),
    Usage(String),
}

impl From<io::Error> for PusherCliError {
    fn from(e: io::Error) -> Self {
        PusherCliError::Io(e)
    }
}

impl From<PushError> for PusherCliError {
    fn from(e: PushError) -> Self {
        PusherCliError::Push(e)
    }
}

impl From<serde_json::Error> for PusherCliError {
    fn from(e: serde_json::Error) -> Self {
        PusherCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PusherCliError> for CliError {
    fn from(e: PusherCliError) -> Self {
        match e {
            PusherCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PusherCliError::Push(e @ PushError::InvalidConfig(_))
            | PusherCliError::Push(e @ PushError::TomlError(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the configuration file".to_string()),
            },
            PusherCliError::Push(e @ PushError::UnsupportedProvider(_)) => CliError {
                code: "UNSUPPORTED_PROVIDER".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pusher providers' for the supported list".to_string()),
            },
            PusherCliError::Push(e) => CliError {
                code: "PUSH_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PusherCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the snapshot file and --input-format".to_string()),
            },
            PusherCliError::Usage(message) => CliError {
                code: "USAGE_ERROR".to_string(),
                message,
                hint: Some("Run 'pusher --help'".to_string()),
            },
        }
    }
}
