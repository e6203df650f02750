//! Configuration management for braille-touch-rs.
//!
//! Loads config from YAML files in standard locations; every section
//! has working defaults so the service starts with no config at all.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_size: u32,
    /// Capture window for one dictated word, seconds.
    pub max_duration: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_size: 1024,
            max_duration: 6.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    pub threshold: f32,
    pub duration: f64,
    pub min_speech_duration: f64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            duration: 1.0,
            min_speech_duration: 0.4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    pub model: String,
    /// Recognition language: the primary (dictation) locale.
    pub language: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model: "distil-whisper/distil-large-v3".into(),
            language: "es".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    pub enabled: bool,
    /// LibreTranslate-compatible service root.
    pub host: String,
    pub source_lang: String,
    pub target_lang: String,
    pub request_timeout_secs: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "http://localhost:5000".into(),
            source_lang: "es".into(),
            target_lang: "en".into(),
            request_timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Upper bound on a whole dictation lookup (transcription plus
    /// translation); expiry counts as a lookup failure.
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Kokoro voice for the primary (dictation) locale.
    pub voice_primary: String,
    /// Kokoro voice for the content (learning) locale.
    pub voice_content: String,
    pub speed: f32,
    /// Rate multiplier for short scanning cues.
    pub cue_rate: f32,
    pub model_path: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice_primary: "ef_dora".into(),
            voice_content: "af_heart".into(),
            speed: 1.0,
            cue_rate: 2.2,
            model_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HapticsConfig {
    pub enabled: bool,
    /// sysfs timed-output device; empty selects the default vibrator.
    pub device_path: String,
    pub tick_ms: u32,
    pub weak_ms: u32,
    pub strong_ms: u32,
}

impl Default for HapticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_path: String::new(),
            tick_ms: 40,
            weak_ms: 25,
            strong_ms: 80,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub screen_width: f32,
    pub screen_height: f32,
    /// Everything above this y is the letter strip, below it the dot pad.
    pub strip_height: f32,
    pub cell_width: f32,
    pub cell_gap: f32,
    /// Max distance from the center line at which a cell takes focus.
    pub focus_threshold: f32,
    pub dot_radius: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280.0,
            screen_height: 800.0,
            strip_height: 420.0,
            cell_width: 96.0,
            cell_gap: 28.0,
            focus_threshold: 80.0,
            dot_radius: 56.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub axis_x_min: f32,
    pub axis_x_max: f32,
    pub axis_y_min: f32,
    pub axis_y_max: f32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            axis_x_min: 0.0,
            axis_x_max: 4095.0,
            axis_y_min: 0.0,
            axis_y_max: 4095.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub dictate_combo: Vec<String>,
    pub next_key: String,
    pub prev_key: String,
    pub repeat_key: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            dictate_combo: vec!["KEY_LEFTMETA".into(), "KEY_LEFTALT".into()],
            next_key: "KEY_RIGHT".into(),
            prev_key: "KEY_LEFT".into(),
            repeat_key: "KEY_SPACE".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub notifications: bool,
    /// Spoken intro before a translated word, in the primary locale.
    pub intro_translated: String,
    /// Spoken intro before a fallback (untranslated) word.
    pub intro_fallback: String,
    pub status_no_speech: String,
    pub status_capture_unavailable: String,
    pub status_lookup_failed: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            notifications: true,
            intro_translated: "la palabra es".into(),
            intro_fallback: "sin traducción, la palabra es".into(),
            status_no_speech: "no se escuchó ninguna palabra".into(),
            status_capture_unavailable: "el dictado no está disponible".into(),
            status_lookup_failed: "el servicio de traducción no responde".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Word loaded at startup so the surface is explorable immediately.
    pub initial_word: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_word: "sol".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub silence: SilenceConfig,
    pub whisper: WhisperConfig,
    pub translate: TranslateConfig,
    pub lookup: LookupConfig,
    pub speech: SpeechConfig,
    pub haptics: HapticsConfig,
    pub surface: SurfaceConfig,
    pub touch: TouchConfig,
    pub keys: KeysConfig,
    pub feedback: FeedbackConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/braille-touch/config.yaml
    /// 3. /etc/braille-touch/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/braille-touch/config.yaml")),
                Some(PathBuf::from("/etc/braille-touch/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match serde_yml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse {}: {e}, using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read {}: {e}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }
}
