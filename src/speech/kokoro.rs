//! Kokoro speech backend: utterance → phonemes → ONNX inference → audio.
//!
//! Pipeline per utterance:
//! 1. Text → phonemes (misaki-rs G2P)
//! 2. Phonemes → token IDs (tokenizer.json vocabulary)
//! 3. Token IDs + locale voice style + rate → ONNX inference → f32 audio (24kHz)
//! 4. Audio → rodio Sink playback
//!
//! Supersession is a generation counter: `cancel` bumps it and stops the
//! active sink, and a queue task aborts as soon as its ticket goes stale.
//! Utterances within one enqueue play strictly in order.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ndarray::{Array1, Array2, Array3};
use ndarray_npy::NpzReader;
use ort::value::Tensor;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, info, warn};

use crate::config::SpeechConfig;
use crate::speech::{Locale, SpeechBackend, Utterance};

const SAMPLE_RATE: u32 = 24000;
const MAX_TOKENS: usize = 510; // Voice style array first dimension

/// Loaded voice style data, squeezed to (510, 256).
struct VoiceData {
    styles: Array2<f32>,
}

/// Cancellable, in-order Kokoro playback engine behind `SpeechBackend`.
#[derive(Clone)]
pub struct KokoroSpeech {
    inner: Arc<Inner>,
}

struct Inner {
    // ONNX model (Mutex because ort 2.0 Session::run needs &mut)
    session: Mutex<Option<ort::session::Session>>,

    // Phonemizer (misaki-rs G2P)
    phonemizer: Option<misaki_rs::G2P>,

    // Tokenizer vocabulary: char → token ID
    vocab: HashMap<char, i64>,

    // Voices: name → style data
    voices: HashMap<String, VoiceData>,

    voice_primary: String,
    voice_content: String,
    base_speed: f32,

    // Audio output, kept alive for the process lifetime
    output_stream: Option<OutputStream>,

    // Supersession state
    generation: AtomicU64,
    active_sink: Mutex<Option<Sink>>,

    model_path: PathBuf,
    voices_path: PathBuf,
    tokenizer_path: PathBuf,
}

impl KokoroSpeech {
    /// Load the model, tokenizer, voices, phonemizer, and audio output.
    /// Blocking; call before the event loop starts.
    pub fn load(config: &SpeechConfig) -> Result<Self, String> {
        let mut inner = Inner::new(config);
        inner.load_assets()?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }
}

impl SpeechBackend for KokoroSpeech {
    fn cancel(&self) {
        self.inner.interrupt();
    }

    fn enqueue(&self, utterances: Vec<Utterance>) {
        let inner = Arc::clone(&self.inner);
        let ticket = inner.generation.load(Ordering::Relaxed);
        tokio::spawn(async move {
            inner.speak_queue(utterances, ticket).await;
        });
    }
}

impl Inner {
    fn new(config: &SpeechConfig) -> Self {
        let model_path = if config.model_path.is_empty() {
            std::env::current_dir()
                .unwrap_or_default()
                .join("kokoro-v1.0.onnx")
        } else {
            PathBuf::from(&config.model_path)
        };
        let assets_dir = model_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            session: Mutex::new(None),
            phonemizer: None,
            vocab: HashMap::new(),
            voices: HashMap::new(),
            voice_primary: config.voice_primary.clone(),
            voice_content: config.voice_content.clone(),
            base_speed: config.speed,
            output_stream: None,
            generation: AtomicU64::new(0),
            active_sink: Mutex::new(None),
            voices_path: assets_dir.join("voices-v1.0.bin"),
            tokenizer_path: assets_dir.join("tokenizer.json"),
            model_path,
        }
    }

    fn load_assets(&mut self) -> Result<(), String> {
        info!("Loading tokenizer from {}", self.tokenizer_path.display());
        self.vocab = load_tokenizer(&self.tokenizer_path)?;
        info!("Tokenizer loaded: {} tokens", self.vocab.len());

        info!("Loading voices from {}", self.voices_path.display());
        self.voices = load_voices(&self.voices_path)?;
        info!("Loaded {} voices", self.voices.len());

        for voice in [&self.voice_primary, &self.voice_content] {
            if !self.voices.contains_key(voice) {
                return Err(format!("Configured voice not in voice data: {voice}"));
            }
        }

        info!("Loading ONNX model from {}", self.model_path.display());
        let session = ort::session::Session::builder()
            .map_err(|e| format!("Failed to create ONNX session builder: {e}"))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| format!("Failed to set optimization level: {e}"))?
            .with_intra_threads(4)
            .map_err(|e| format!("Failed to set thread count: {e}"))?
            .commit_from_file(&self.model_path)
            .map_err(|e| format!("Failed to load ONNX model: {e}"))?;
        *self.session.lock().unwrap() = Some(session);

        self.phonemizer = Some(misaki_rs::G2P::new(misaki_rs::Language::EnglishUS));

        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| format!("Failed to open audio output: {e}"))?;
        self.output_stream = Some(stream);

        info!(
            "Kokoro speech ready (voices: {} / {})",
            self.voice_primary, self.voice_content
        );
        Ok(())
    }

    /// Invalidate any running queue and silence the active sink.
    fn interrupt(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
        if let Some(sink) = self.active_sink.lock().unwrap().take() {
            sink.stop();
        }
        debug!("speech interrupted");
    }

    fn voice_for(&self, locale: Locale) -> &str {
        match locale {
            Locale::Primary => &self.voice_primary,
            Locale::Content => &self.voice_content,
        }
    }

    /// Play a queue of utterances in order, aborting the moment the
    /// ticket goes stale.
    async fn speak_queue(&self, utterances: Vec<Utterance>, ticket: u64) {
        for utterance in utterances {
            if self.generation.load(Ordering::Relaxed) != ticket {
                return;
            }

            let samples = match self.generate(&utterance) {
                Ok(samples) => samples,
                Err(e) => {
                    warn!("Speech generation failed for {:?}: {e}", utterance.text);
                    continue;
                }
            };

            if self.generation.load(Ordering::Relaxed) != ticket {
                return;
            }
            if samples.is_empty() {
                continue;
            }

            if self.play(samples, ticket).await {
                return; // superseded during playback
            }
        }
    }

    /// Synthesize one utterance into f32 samples.
    fn generate(&self, utterance: &Utterance) -> Result<Vec<f32>, String> {
        let mut session_guard = self.session.lock().unwrap();
        let session = session_guard.as_mut().ok_or("Model not loaded")?;
        let phonemizer = self.phonemizer.as_ref().ok_or("Phonemizer not loaded")?;

        let (phonemes, _tokens) = phonemizer
            .g2p(&utterance.text)
            .map_err(|e| format!("Phonemization failed: {e}"))?;
        if phonemes.is_empty() {
            return Ok(Vec::new());
        }

        let mut token_ids: Vec<i64> = Vec::with_capacity(phonemes.len() + 2);
        token_ids.push(0); // Start padding
        for ch in phonemes.chars() {
            if let Some(&id) = self.vocab.get(&ch) {
                token_ids.push(id);
            }
            // Unknown characters are skipped
        }
        token_ids.push(0); // End padding

        let n_tokens = token_ids.len().min(MAX_TOKENS);
        token_ids.truncate(n_tokens);

        let voice_name = self.voice_for(utterance.locale);
        let voice_data = self
            .voices
            .get(voice_name)
            .ok_or_else(|| format!("Voice not found: {voice_name}"))?;

        // Style vector indexed by token count, clamped to the table
        let style_idx = n_tokens.saturating_sub(2).min(voice_data.styles.nrows() - 1);
        let style_vec: Vec<f32> = voice_data.styles.row(style_idx).to_vec();

        let speed = (self.base_speed * utterance.rate).max(0.1);

        let tokens_array = Array2::from_shape_vec((1, n_tokens), token_ids)
            .map_err(|e| format!("Failed to create tokens tensor: {e}"))?;
        let tokens_tensor = Tensor::from_array(tokens_array)
            .map_err(|e| format!("Failed to create tokens ort tensor: {e}"))?;

        let style_array = Array2::from_shape_vec((1, 256), style_vec)
            .map_err(|e| format!("Failed to create style tensor: {e}"))?;
        let style_tensor = Tensor::from_array(style_array)
            .map_err(|e| format!("Failed to create style ort tensor: {e}"))?;

        let speed_array = Array1::from_vec(vec![speed]);
        let speed_tensor = Tensor::from_array(speed_array)
            .map_err(|e| format!("Failed to create speed ort tensor: {e}"))?;

        let outputs = session
            .run(ort::inputs![
                "tokens" => tokens_tensor,
                "style" => style_tensor,
                "speed" => speed_tensor
            ])
            .map_err(|e| format!("ONNX inference failed: {e}"))?;

        let first_output = outputs
            .iter()
            .next()
            .ok_or("No output tensor from model")?;
        let (_shape, audio_slice) = first_output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| format!("Failed to extract audio tensor: {e}"))?;

        let samples: Vec<f32> = audio_slice.iter().copied().collect();
        debug!(
            "Synthesized {:?} at rate {:.1}: {} samples ({:.2}s)",
            utterance.text,
            utterance.rate,
            samples.len(),
            samples.len() as f32 / SAMPLE_RATE as f32
        );
        Ok(samples)
    }

    /// Play samples through rodio. Returns true when the ticket went
    /// stale during playback.
    async fn play(&self, samples: Vec<f32>, ticket: u64) -> bool {
        let Some(stream) = &self.output_stream else {
            warn!("No audio output stream");
            return false;
        };

        let sink = Sink::connect_new(stream.mixer());
        sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));
        *self.active_sink.lock().unwrap() = Some(sink);

        if self.generation.load(Ordering::Relaxed) != ticket {
            if let Some(sink) = self.active_sink.lock().unwrap().take() {
                sink.stop();
            }
            return true;
        }

        // Poll until the sink drains or a newer generation silences it.
        let mut interval = tokio::time::interval(tokio::time::Duration::from_millis(25));
        loop {
            interval.tick().await;

            let is_empty = {
                let guard = self.active_sink.lock().unwrap();
                match guard.as_ref() {
                    Some(sink) => sink.empty(),
                    // interrupt() took the sink away
                    None => return self.generation.load(Ordering::Relaxed) != ticket,
                }
            };
            if is_empty {
                *self.active_sink.lock().unwrap() = None;
                return false;
            }

            if self.generation.load(Ordering::Relaxed) != ticket {
                if let Some(sink) = self.active_sink.lock().unwrap().take() {
                    sink.stop();
                }
                return true;
            }
        }
    }
}

// --- Asset loading ---

/// Read the char → token ID vocabulary out of tokenizer.json.
fn load_tokenizer(path: &Path) -> Result<HashMap<char, i64>, String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read tokenizer: {e}"))?;
    let data: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse tokenizer JSON: {e}"))?;

    let vocab = data["model"]["vocab"]
        .as_object()
        .ok_or("Missing model.vocab in tokenizer.json")?;

    let mut map = HashMap::new();
    for (token, id) in vocab {
        let id = id.as_i64().ok_or("Token ID is not an integer")?;
        // Each token is a single phoneme character
        if let Some(ch) = token.chars().next() {
            map.insert(ch, id);
        }
    }
    Ok(map)
}

/// Load all voice styles from the NPZ archive, squeezing each entry
/// from (510, 1, 256) to (510, 256).
fn load_voices(path: &Path) -> Result<HashMap<String, VoiceData>, String> {
    let file = fs::File::open(path).map_err(|e| format!("Failed to open voices file: {e}"))?;
    let mut npz = NpzReader::new(file).map_err(|e| format!("Failed to read NPZ voices file: {e}"))?;

    let names: Vec<String> = npz
        .names()
        .map_err(|e| format!("Failed to list NPZ entries: {e}"))?
        .into_iter()
        .map(|n| n.trim_end_matches(".npy").to_string())
        .collect();

    let mut voices = HashMap::new();
    for name in &names {
        let npy_name = format!("{name}.npy");
        let arr: Array3<f32> = npz
            .by_name(&npy_name)
            .map_err(|e| format!("Failed to read voice '{name}': {e}"))?;

        let dim0 = arr.shape()[0];
        let dim2 = arr.shape()[2];
        let styles = arr
            .into_shape_with_order((dim0, dim2))
            .map_err(|e| format!("Failed to reshape voice '{name}': {e}"))?;

        voices.insert(name.clone(), VoiceData { styles });
    }
    Ok(voices)
}
