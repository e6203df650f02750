//! braille-touch-rs: tactile Braille word explorer for Linux.

mod braille;
mod config;
mod cursor;
mod haptics;
mod history;
mod keys;
mod layout;
mod notifier;
mod recorder;
mod service;
mod speech;
mod touch;
mod transcriber;
mod translate;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "braille-touch-rs",
    about = "Explore a dictated word's Braille cells by touch, with spoken and haptic feedback"
)]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the translation service (always read the dictated word)
    #[arg(long)]
    no_translate: bool,

    /// Print a practice report for a date (YYYY-MM-DD or "today") and exit
    #[arg(long, value_name = "DATE")]
    report: Option<String>,

    /// Enable verbose (debug) logging and capture WAV dumps
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging (suppress noisy ort internals)
    let filter = if args.verbose {
        EnvFilter::new("debug,ort=info")
    } else {
        EnvFilter::new("info,ort=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(date) = args.report {
        println!("{}", history::generate_report(&date));
        return Ok(());
    }

    info!("braille-touch-rs starting");

    // Load config
    let mut config = config::Config::load(args.config.as_deref());
    if args.no_translate {
        config.translate.enabled = false;
    }
    info!(
        "Locales: dictate {} -> read {}",
        config.translate.source_lang, config.translate.target_lang
    );

    // Load Whisper model (blocking, takes a few seconds). Failure keeps
    // the service running with dictation disabled.
    info!("Loading Whisper model...");
    let transcriber = tokio::task::spawn_blocking({
        let whisper_config = config.whisper.clone();
        move || transcriber::WordTranscriber::load(&whisper_config, &whisper_config.language)
    })
    .await?;
    let transcriber = match transcriber {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::warn!("Failed to load Whisper model: {e}");
            info!("Dictation disabled — continuing with the configured word");
            None
        }
    };

    // Speech output: absence degrades to haptic-only feedback
    let scheduler = if config.speech.enabled {
        info!("Loading Kokoro speech model...");
        match speech::kokoro::KokoroSpeech::load(&config.speech) {
            Ok(engine) => {
                info!(
                    "Speech output ready (voices: {} / {}, cue rate {})",
                    config.speech.voice_primary, config.speech.voice_content, config.speech.cue_rate
                );
                speech::SpeechScheduler::new(Some(Arc::new(engine)), config.speech.cue_rate)
            }
            Err(e) => {
                tracing::warn!("Failed to load speech model: {e}");
                info!("Speech disabled — continuing with haptic feedback only");
                speech::SpeechScheduler::disabled()
            }
        }
    } else {
        speech::SpeechScheduler::disabled()
    };

    // Run the service
    let mut service =
        service::TactileReaderService::new(config, transcriber, scheduler, args.verbose);
    service.run().await?;

    Ok(())
}
