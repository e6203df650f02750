//! Microphone capture with cpal.
//!
//! The input stream stays open for the whole session so push-to-talk
//! starts with no device-open latency. Captures 16kHz mono f32 audio
//! sized for a single dictated word; silence after speech auto-stops
//! the capture so the user doesn't have to time the key release.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{CaptureConfig, SilenceConfig};

/// Word-sized audio recorder with an always-open stream.
pub struct WordRecorder {
    config: CaptureConfig,
    silence: SilenceConfig,
    shared: Arc<Mutex<CaptureState>>,
    /// Kept alive to hold the stream open.
    _stream: Option<Stream>,
}

struct CaptureState {
    is_recording: bool,
    buffer: Vec<f32>,
    max_samples: usize,
    started: Option<Instant>,
    silence_since: Option<Instant>,
    should_auto_stop: bool,
}

impl WordRecorder {
    pub fn new(config: CaptureConfig, silence: SilenceConfig) -> Self {
        let max_samples = (config.max_duration * config.sample_rate as f64) as usize;
        let shared = Arc::new(Mutex::new(CaptureState {
            is_recording: false,
            buffer: Vec::with_capacity(max_samples),
            max_samples,
            started: None,
            silence_since: None,
            should_auto_stop: false,
        }));

        Self {
            config,
            silence,
            shared,
            _stream: None,
        }
    }

    /// Open the input stream. Call once at startup; failure means the
    /// host has no usable microphone and dictation stays disabled.
    pub fn open_stream(&mut self) -> Result<(), String> {
        if self._stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or("No input audio device available")?;
        info!(
            "Using audio device: {}",
            device.name().unwrap_or("unknown".into())
        );

        let stream_config = StreamConfig {
            channels: self.config.channels,
            sample_rate: SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.config.chunk_size),
        };

        let shared = Arc::clone(&self.shared);
        let threshold = self.silence.threshold;
        let silence_duration = self.silence.duration;
        let min_speech_duration = self.silence.min_speech_duration;

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    let mut state = shared.lock().unwrap();
                    if !state.is_recording {
                        return;
                    }

                    let remaining = state.max_samples.saturating_sub(state.buffer.len());
                    let to_copy = data.len().min(remaining);
                    state.buffer.extend_from_slice(&data[..to_copy]);

                    if state.buffer.len() >= state.max_samples {
                        debug!("Word capture window full, auto-stopping");
                        state.should_auto_stop = true;
                        return;
                    }

                    // Give the speaker a moment before judging silence
                    let elapsed = state
                        .started
                        .map(|t| t.elapsed().as_secs_f64())
                        .unwrap_or(0.0);
                    if elapsed < min_speech_duration {
                        return;
                    }

                    if rms_energy(data) < threshold {
                        let since = state.silence_since.get_or_insert_with(Instant::now);
                        if since.elapsed().as_secs_f64() >= silence_duration {
                            debug!("Trailing silence, auto-stopping capture");
                            state.should_auto_stop = true;
                        }
                    } else {
                        state.silence_since = None;
                    }
                },
                move |err| {
                    warn!("Audio stream error: {err}");
                },
                None, // timeout
            )
            .map_err(|e| format!("Failed to build input stream: {e}"))?;

        stream
            .play()
            .map_err(|e| format!("Failed to start audio stream: {e}"))?;
        info!("Audio stream open, push-to-talk ready");

        self._stream = Some(stream);
        Ok(())
    }

    pub fn start(&self) {
        let mut state = self.shared.lock().unwrap();
        state.buffer.clear();
        state.is_recording = true;
        state.started = Some(Instant::now());
        state.silence_since = None;
        state.should_auto_stop = false;
        info!("Capture started");
    }

    /// Stop and hand back the captured samples (f32, mono).
    pub fn stop(&self) -> Vec<f32> {
        let mut state = self.shared.lock().unwrap();
        state.is_recording = false;
        let samples = std::mem::take(&mut state.buffer);
        let duration = samples.len() as f64 / self.config.sample_rate as f64;
        info!("Capture stopped: {:.1}s ({} samples)", duration, samples.len());
        samples
    }

    pub fn should_auto_stop(&self) -> bool {
        self.shared.lock().unwrap().should_auto_stop
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// True when the whole capture stayed under the silence threshold.
    pub fn is_silent(samples: &[f32], threshold: f32) -> bool {
        let rms = rms_energy(samples);
        debug!("Capture RMS energy: {rms:.4} (threshold: {threshold})");
        rms < threshold
    }

    /// Dump a capture to WAV for debugging transcription trouble.
    pub fn dump_wav(&self, samples: &[f32], path: &Path) {
        let spec = hound::WavSpec {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        match hound::WavWriter::create(path, spec) {
            Ok(mut writer) => {
                for &sample in samples {
                    // f32 [-1, 1] → i16
                    let s = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    if writer.write_sample(s).is_err() {
                        break;
                    }
                }
                if writer.finalize().is_ok() {
                    debug!("Saved capture WAV to {}", path.display());
                }
            }
            Err(e) => warn!("Failed to save capture WAV: {e}"),
        }
    }
}

/// RMS energy of a sample window.
fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms_energy(&[]), 0.0);
        assert_eq!(rms_energy(&[0.0; 64]), 0.0);
    }

    #[test]
    fn silence_check_tracks_the_threshold() {
        let quiet = vec![0.001f32; 256];
        let loud = vec![0.5f32; 256];
        assert!(WordRecorder::is_silent(&quiet, 0.01));
        assert!(!WordRecorder::is_silent(&loud, 0.01));
    }
}
