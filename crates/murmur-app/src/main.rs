//! # Murmur
//!
//! Replays a reader session script against the sound engine on the headless backend
//! and prints what the engine ended up doing.
//!
//! ```text
//! murmur [--config <path>] [--realtime] <session.json>
//! ```

mod report;
mod session;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use murmur_audio::AudioEngine;
use murmur_core::EngineConfig;
use report::Report;
use session::Session;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "murmur")]
#[command(about = "Replay a reader session against the sound engine")]
#[command(version)]
struct Args {
    /// Engine config (JSON). Defaults to config.json in the platform config directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Replay on the wall clock with the engine running on its own thread.
    #[arg(long)]
    realtime: bool,

    /// Session script to replay.
    session: PathBuf,
}

/// `--config` if given, else `config.json` in the platform config directory, else
/// the defaults.
fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let Some(dirs) = directories::ProjectDirs::from("", "", "murmur") else {
        return Ok(EngineConfig::default());
    };
    let path = dirs.config_dir().join("config.json");
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }
    EngineConfig::load(&path).with_context(|| format!("failed to load config {}", path.display()))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=info,murmur_audio=info".into()),
        )
        .init();

    info!("Starting Murmur v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    let session = Session::load(&args.session)
        .with_context(|| format!("failed to load session {}", args.session.display()))?;
    if let Some(platform) = session.platform {
        config.platform = platform;
    }

    let mut engine = AudioEngine::new(session.backend(), &config)?;
    let events = engine.subscribe();

    let engine = if args.realtime {
        session.run_realtime(engine)?
    } else {
        session.run_simulated(&mut engine);
        engine
    };

    let report = Report::collect(&engine, events.try_iter().collect());
    println!("{}", report.to_json()?);
    Ok(())
}
