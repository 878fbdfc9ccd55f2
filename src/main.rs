use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use influence_playback::catalog::{self, RunFilter, SavedRunSummary};
use influence_playback::config::PlaybackConfig;
use influence_playback::headless::{CameraCommand, HeadlessRenderer};
use influence_playback::host::PublishedState;
use influence_playback::model::{LiveRunData, SavedRunPayload};
use influence_playback::sequencer::PlaybackOutcome;
use influence_playback::session::PlaybackSession;

/// Replay influence-propagation simulations as timed graph animations.
#[derive(Parser)]
#[command(name = "influence-playback")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Playback config file (.yaml, .yml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Multiplier applied to every wait (1.0 = real time)
    #[arg(long, global = true)]
    time_scale: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one algorithm's results from a freshly computed run
    Live {
        /// Run data (.json) with nodes, edges and algorithm_results
        #[arg(short, long)]
        input: PathBuf,

        /// Algorithm to play
        #[arg(short, long)]
        algorithm: String,
    },
    /// Validate and replay a saved run
    Replay {
        /// Saved run (.json)
        #[arg(short, long)]
        input: PathBuf,
    },
    /// List saved runs
    Runs {
        /// Saved-run listing (.json)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        network: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        algorithm: Option<String>,
    },
}

/// What a playback command prints
#[derive(Serialize)]
struct Report<'a> {
    outcome: String,
    state: &'a PublishedState,
    camera_commands: Vec<CameraCommand>,
}

fn load_config(path: Option<&Path>, time_scale: Option<f64>) -> anyhow::Result<PlaybackConfig> {
    let config = match path {
        Some(path) => PlaybackConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PlaybackConfig::default(),
    };
    Ok(match time_scale {
        Some(scale) => config.with_time_scale(scale)?,
        None => config,
    })
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn new_session(config: PlaybackConfig) -> anyhow::Result<PlaybackSession<HeadlessRenderer, PublishedState>> {
    let renderer = HeadlessRenderer::new(config.layout.clone());
    Ok(PlaybackSession::new(renderer, PublishedState::default(), config)?)
}

fn print_report(
    outcome: &PlaybackOutcome,
    session: &PlaybackSession<HeadlessRenderer, PublishedState>,
) -> anyhow::Result<()> {
    let outcome = match outcome {
        PlaybackOutcome::Completed => "completed".to_string(),
        PlaybackOutcome::Skipped(reason) => format!("skipped: {reason}"),
    };
    let report = Report {
        outcome,
        state: session.observer(),
        camera_commands: session.renderer().commands(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn live(input: &Path, algorithm: &str, config: PlaybackConfig) -> anyhow::Result<()> {
    let data = LiveRunData::from_json(&read_input(input)?)
        .with_context(|| format!("invalid run data in {}", input.display()))?;
    let mut session = new_session(config)?;
    session.load_graph(data.graph());
    let outcome = session.play_live(algorithm, &data).await?;
    print_report(&outcome, &session)
}

async fn replay(input: &Path, config: PlaybackConfig) -> anyhow::Result<()> {
    let payload = SavedRunPayload::from_json(&read_input(input)?)
        .with_context(|| format!("invalid saved run in {}", input.display()))?;
    let mut session = new_session(config)?;
    let outcome = session.load_saved_run(payload).await?;
    print_report(&outcome, &session)
}

fn runs(input: &Path, filter: RunFilter) -> anyhow::Result<()> {
    let runs = SavedRunSummary::list_from_json(&read_input(input)?)
        .with_context(|| format!("invalid saved-run listing in {}", input.display()))?;
    println!("{}", catalog::format_table(&filter.apply(&runs)));
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Live { input, algorithm } => {
            let config = load_config(cli.config.as_deref(), cli.time_scale)?;
            live(&input, &algorithm, config).await?;
        }
        Commands::Replay { input } => {
            let config = load_config(cli.config.as_deref(), cli.time_scale)?;
            replay(&input, config).await?;
        }
        Commands::Runs {
            input,
            network,
            model,
            algorithm,
        } => {
            let filter = RunFilter {
                network,
                model,
                algorithm,
            };
            runs(&input, filter)?;
        }
    }

    Ok(())
}
