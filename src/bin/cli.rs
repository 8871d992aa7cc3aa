//! tekhne CLI: scale lookup, offline render and live playback of scores.
//!
//! Usage:
//!   tekhne-cli quantize 135 440 1000
//!   tekhne-cli render score.toml -o out.wav
//!   tekhne-cli play score.toml --quantize

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tk_master::{Controller, Score, VoiceId};
use tracing_subscriber::EnvFilter;

#[cfg(all(feature = "alloc_check", debug_assertions))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

#[derive(Parser)]
#[command(name = "tekhne-cli", version, about = "Four-voice FM synthesis engine")]
struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Snap frequencies (Hz) to the nearest scale entry.
    Quantize {
        #[arg(required = true, allow_negative_numbers = true)]
        hz: Vec<f32>,
    },
    /// Render a score to a WAV file.
    Render {
        score: PathBuf,
        #[arg(short, long, default_value = "out.wav")]
        output: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Play a score on the default output device.
    Play {
        score: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Flags that override score fields.
#[derive(Args)]
struct Overrides {
    #[arg(long)]
    sample_rate: Option<u32>,
    /// Snap the carrier to the scale.
    #[arg(long)]
    quantize: bool,
}

impl Overrides {
    fn apply(&self, score: &mut Score) {
        if let Some(rate) = self.sample_rate {
            score.sample_rate = rate;
        }
        if self.quantize {
            score.quantize = true;
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_score(path: &Path, overrides: &Overrides) -> Result<Score> {
    let mut score = Score::load(path).with_context(|| format!("failed to load score {}", path.display()))?;
    overrides.apply(&mut score);
    score.validate()?;
    tracing::debug!(
        triggers = score.triggers.len(),
        base_changes = score.base_changes.len(),
        duration = score.duration_seconds(),
        "score loaded"
    );
    Ok(score)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Quantize { hz } => {
            for f in hz {
                println!("{:>10.2} -> {:.2}", f, tk_master::quantize(f));
            }
        }
        Command::Render { score, output, overrides } => {
            let score = load_score(&score, &overrides)?;
            println!(
                "Rendering {:.1}s to {} at {} Hz...",
                score.duration_seconds(),
                output.display(),
                score.sample_rate
            );
            Controller::new()
                .render_to_wav(&score, &output)
                .with_context(|| format!("failed to render {}", output.display()))?;
            println!("Done.");
        }
        Command::Play { score, overrides } => {
            let score = load_score(&score, &overrides)?;
            play(&score);
        }
    }
    Ok(())
}

fn play(score: &Score) {
    let mut ctrl = Controller::new();
    ctrl.play(score);
    println!("Playing...");

    while ctrl.is_playing() {
        let done: String = VoiceId::all()
            .map(|v| if ctrl.voice_completed(v) { '*' } else { '.' })
            .collect();
        print!("\rVoices done: {}", done);
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(50));
    }

    println!("\rDone.               ");
}
