//! Whisper ASR for the dictated source word.
//!
//! Loads a GGML model once at startup, then turns captured 16kHz mono
//! samples into a transcript in the primary locale. Only the final
//! transcript matters; no interim results are surfaced.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::config::WhisperConfig;

/// Thread-safe Whisper wrapper; the context is Send+Sync behind an Arc
/// so lookups can run on a blocking task while the event loop stays live.
#[derive(Clone)]
pub struct WordTranscriber {
    ctx: Arc<WhisperContext>,
    language: String,
}

impl WordTranscriber {
    /// Load the GGML model and pin the recognition language.
    pub fn load(config: &WhisperConfig, language: &str) -> Result<Self, String> {
        let model_path = Self::find_model(&config.model)?;

        info!("Loading Whisper model from {}", model_path.display());
        let t0 = Instant::now();

        let params = WhisperContextParameters::default();
        let path_str = model_path
            .to_str()
            .ok_or("Whisper model path is not valid UTF-8")?;
        let ctx = WhisperContext::new_with_params(path_str, params)
            .map_err(|e| format!("Failed to load Whisper model: {e}"))?;

        info!("Whisper model loaded in {}ms", t0.elapsed().as_millis());

        Ok(Self {
            ctx: Arc::new(ctx),
            language: language.to_string(),
        })
    }

    /// Transcribe captured samples to text.
    pub fn transcribe(&self, samples: &[f32]) -> Result<String, String> {
        let t0 = Instant::now();

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| format!("Failed to create whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(self.language.as_str()));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_single_segment(true);
        params.set_token_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| format!("Whisper inference failed: {e}"))?;

        let n_segments = state.full_n_segments();
        let mut text = String::new();
        for i in 0..n_segments {
            if let Some(segment) = state.get_segment(i) {
                if let Ok(segment_text) = segment.to_str_lossy() {
                    let trimmed = segment_text.trim();
                    if !trimmed.is_empty() {
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(trimmed);
                    }
                }
            }
        }

        let latency_ms = t0.elapsed().as_millis();
        info!(
            "Transcribed {:.1}s audio in {latency_ms}ms ({}): {:?}",
            samples.len() as f64 / 16000.0,
            self.language,
            text
        );

        Ok(text)
    }

    /// Locate the GGML model file by direct path or well-known names.
    fn find_model(model_name: &str) -> Result<PathBuf, String> {
        let direct = PathBuf::from(model_name);
        if direct.exists() && direct.extension().is_some() {
            return Ok(direct);
        }

        let filenames = [
            format!("ggml-{}.bin", model_name.replace('/', "-")),
            "ggml-distil-large-v3.bin".to_string(),
            "ggml-large-v3-turbo.bin".to_string(),
            "ggml-base.bin".to_string(),
        ];

        let search_dirs: Vec<PathBuf> = [
            std::env::current_dir().ok(),
            dirs::home_dir().map(|h| h.join(".cache/whisper")),
            dirs::home_dir().map(|h| h.join("braille-touch")),
        ]
        .into_iter()
        .flatten()
        .collect();

        for dir in &search_dirs {
            for filename in &filenames {
                let path = dir.join(filename);
                if path.exists() {
                    return Ok(path);
                }
            }
        }

        Err(format!(
            "Whisper GGML model not found. Download with:\n  \
             wget https://huggingface.co/distil-whisper/distil-large-v3-ggml/resolve/main/ggml-distil-large-v3.bin\n\
             Searched in: {search_dirs:?}"
        ))
    }
}
