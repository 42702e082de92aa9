mod app;
mod command;
mod config;
mod dispatch;
mod gesture;
mod recognizer;
mod replay;
mod session;
mod tones;
mod tts;
mod tui;

use config::Config;
use dispatch::{Chime, Dispatcher, HistoryNavigator, PrintNotifier, Speaker};

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "voicenav", about = "Voice-activated navigation")]
struct Cli {
    /// Config file (defaults apply when missing)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Interactive terminal mode (default)
    Run,
    /// Print the command a transcript maps to
    Classify {
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Replay a gesture script with simulated time
    Replay {
        script: PathBuf,
        /// Transcript every session hears
        #[arg(long)]
        say: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.mode.unwrap_or(Mode::Run) {
        Mode::Run => {
            init_logging(Some(&config.log.file))?;
            tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?
                .block_on(tui::run(&config, speaker(&config), chime(&config)))
        }
        Mode::Classify { words } => {
            init_logging(None)?;
            let command = command::classify(&words.join(" "));
            match command.path() {
                Some(path) => println!("{}\t{}", command.kind(), path),
                None => println!("{}", command.kind()),
            }
            if let Some(msg) = command.announcement() {
                println!("{}", msg);
            }
            Ok(())
        }
        Mode::Replay { script, say } => {
            init_logging(None)?;
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let steps = replay::parse(&text)?;
            let navigator = HistoryNavigator::default();
            let dispatcher = Dispatcher::new(
                Box::new(navigator.clone()),
                Box::new(PrintNotifier),
                speaker(&config),
                chime(&config),
            );
            replay::run(&steps, say.as_deref(), config.gesture.timings(), dispatcher);
            for path in navigator.history() {
                println!("visited {}", path);
            }
            println!("final page: {}", navigator.current());
            Ok(())
        }
    }
}

/// Log to `file` when given (the terminal belongs to the UI), otherwise stderr.
/// `RUST_LOG` overrides the default filter.
fn init_logging(file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "voicenav=info".into());
    match file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

fn speaker(config: &Config) -> Box<dyn Speaker> {
    if config.speech.enabled && !config.speech.command.is_empty() {
        Box::new(tts::SystemSpeaker::new(&config.speech.command, &config.speech.args))
    } else {
        Box::new(tts::MuteSpeaker)
    }
}

fn chime(config: &Config) -> Box<dyn Chime> {
    if config.tones.enabled {
        Box::new(tones::Tones::spawn(config.tones.volume))
    } else {
        Box::new(tones::Tones::silent())
    }
}
