//! CLI binary for wakectl.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use wakectl::config::{LoggingConfig, SpeechBackend};
use wakectl::feature::FeatureKey;
use wakectl::{ControlConfig, ControlError, Controller, chat, speech};

/// wakectl: voice-gated control plane for local feature workloads.
#[derive(Parser)]
#[command(name = "wakectl", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "WAKECTL_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run the controller until an exit phrase or Ctrl+C.
    Run,

    /// Print how a phrase would be classified.
    Classify {
        /// Words of the phrase.
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let config = load_config(cli.config.as_deref())?;
            let _guard = init_tracing(&config.logging)?;
            run(config).await
        }
        Command::Classify { text } => {
            let phrase = text.join(" ");
            let command = wakectl::classify(&phrase);
            println!("{command}");
            Ok(())
        }
        Command::InitConfig { force } => {
            let path = cli
                .config
                .unwrap_or_else(ControlConfig::default_config_path);
            init_config(&path, force)
        }
    }
}

/// Loads the config file (explicit path, or the default path when it
/// exists), then applies environment overrides.
fn load_config(path: Option<&Path>) -> anyhow::Result<ControlConfig> {
    let mut config = match path {
        Some(path) => ControlConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            let default_path = ControlConfig::default_config_path();
            if default_path.exists() {
                ControlConfig::from_file(&default_path)
                    .with_context(|| format!("loading config from {}", default_path.display()))?
            } else {
                ControlConfig::default()
            }
        }
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Stderr logging, plus a daily-rolling file when enabled.
///
/// The returned guard must stay alive for the file writer to flush.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wakectl=info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    if !logging.file {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .try_init()?;
        return Ok(None);
    }

    let dir = logging.effective_directory();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "wakectl.log"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;
    Ok(Some(guard))
}

async fn run(config: ControlConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), wake_phrase = %config.wake.phrase, "wakectl starting");
    preflight(&config);

    let speech = speech::from_config(&config.speech).context("speech adapter unavailable")?;
    let chat = match chat::from_config(&config.chat) {
        Ok(chat) => chat,
        Err(e @ ControlError::AdapterUnavailable(_)) => {
            warn!(error = %e, "assistant disabled");
            None
        }
        Err(e) => return Err(e.into()),
    };

    if config.speech.backend == SpeechBackend::Console {
        println!("Type what you would say, one line per utterance. Ctrl+D or Ctrl+C to quit.");
    }

    let mut controller = Controller::new(config, speech, chat);
    match controller.run().await {
        Ok(()) => Ok(()),
        // Console end of input is an ordinary way to leave.
        Err(ControlError::AdapterUnavailable(reason)) => {
            info!(%reason, "speech input ended");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Warns about feature programs and scripts that will not start.
fn preflight(config: &ControlConfig) {
    for key in FeatureKey::SPAWNABLE {
        let Some(spec) = config.features.get(key) else {
            continue;
        };
        if let Err(e) = which::which(&spec.program) {
            warn!(feature = %key, program = %spec.program, error = %e, "feature program not found");
        }
        if let Some(script) = &spec.script
            && !script.exists()
        {
            warn!(feature = %key, script = %script.display(), "feature script not found");
        }
    }
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    ControlConfig::default().save_to_file(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
