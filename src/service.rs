//! Service orchestration with the session state machine.
//!
//! IDLE → CAPTURING → LOOKUP → IDLE
//!
//! All input (command keys, touch frames, lookup completions) arrives
//! on channels and is processed one event at a time, so the reading
//! cursor is never mutated concurrently. Capture transcription and
//! translation run on spawned tasks and rejoin the loop as a single
//! terminal event; while one is in flight, new dictation requests are
//! rejected but navigation and dot exploration stay live on the
//! previous word.

use std::path::Path;

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use crate::config::Config;
use crate::cursor::{Feedback, HapticKind, ReadingCursor};
use crate::haptics::HapticMotor;
use crate::history::{self, ExplorationRecord};
use crate::keys::{KeyCommand, KeyMonitor};
use crate::layout::SurfaceLayout;
use crate::notifier::Notifier;
use crate::recorder::WordRecorder;
use crate::speech::{Locale, SpeechScheduler};
use crate::touch::{TouchEvent, TouchMonitor};
use crate::transcriber::WordTranscriber;
use crate::translate::{normalize_word, TranslateOutcome, Translator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    Lookup,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Capturing => write!(f, "CAPTURING"),
            Self::Lookup => write!(f, "LOOKUP"),
        }
    }
}

/// Terminal event of a dictation lookup task.
#[derive(Debug)]
enum LookupEvent {
    Word {
        source: String,
        outcome: TranslateOutcome,
    },
    CaptureFailed(String),
}

pub struct TactileReaderService {
    config: Config,
    state: SessionState,
    recorder: WordRecorder,
    transcriber: Option<WordTranscriber>,
    translator: Translator,
    cursor: ReadingCursor,
    scheduler: SpeechScheduler,
    haptics: HapticMotor,
    notifier: Notifier,
    capture_ready: bool,
    /// Locale the current display word is spoken in: the learning
    /// locale normally, the primary locale on translation fallback.
    word_locale: Locale,
    /// Intro phrase announcements of the current word are built with.
    current_intro: String,
    verbose: bool,
}

impl TactileReaderService {
    pub fn new(
        config: Config,
        transcriber: Option<WordTranscriber>,
        scheduler: SpeechScheduler,
        verbose: bool,
    ) -> Self {
        let recorder = WordRecorder::new(config.capture.clone(), config.silence.clone());
        let translator = Translator::new(config.translate.clone());
        let cursor = ReadingCursor::new(SurfaceLayout::from_config(&config.surface));
        let haptics = HapticMotor::new(&config.haptics);
        let notifier = Notifier::new(config.feedback.notifications);
        let current_intro = config.feedback.intro_fallback.clone();

        Self {
            config,
            state: SessionState::Idle,
            recorder,
            transcriber,
            translator,
            cursor,
            scheduler,
            haptics,
            notifier,
            capture_ready: false,
            word_locale: Locale::Primary,
            current_intro,
            verbose,
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.capture_ready = self.transcriber.is_some();
        if self.capture_ready {
            if let Err(e) = self.recorder.open_stream() {
                warn!("Microphone unavailable: {e}");
                self.capture_ready = false;
            }
        }
        if !self.capture_ready {
            let status = self.config.feedback.status_capture_unavailable.clone();
            self.report_status("Dictation", &status);
        }

        let (key_tx, mut key_rx) = mpsc::channel::<KeyCommand>(16);
        let (touch_tx, mut touch_rx) = mpsc::channel::<TouchEvent>(64);
        let (lookup_tx, mut lookup_rx) = mpsc::channel::<LookupEvent>(4);

        tokio::spawn(KeyMonitor::new(&self.config.keys, key_tx).run());
        tokio::spawn(TouchMonitor::new(&self.config.touch, &self.config.surface, touch_tx).run());

        // Load the initial word through the normal lookup path so the
        // surface is explorable before the first dictation.
        let initial = self.config.session.initial_word.trim().to_lowercase();
        if !initial.is_empty() {
            self.state = SessionState::Lookup;
            info!("State: IDLE → LOOKUP (initial word {initial:?})");
            spawn_word_lookup(
                initial,
                self.translator.clone(),
                self.config.lookup.timeout_secs,
                lookup_tx.clone(),
            );
        }

        info!("Service ready — hold the push-to-talk combo to dictate a word");

        // Auto-stop poll interval for silence-terminated captures
        let mut auto_stop = tokio::time::interval(Duration::from_millis(100));
        let mut keys_alive = true;
        let mut touch_alive = true;

        loop {
            tokio::select! {
                event = key_rx.recv(), if keys_alive => {
                    match event {
                        Some(command) => self.on_key_command(command, &lookup_tx),
                        None => {
                            warn!("Key channel closed, command keys disabled");
                            keys_alive = false;
                        }
                    }
                }
                event = touch_rx.recv(), if touch_alive => {
                    match event {
                        Some(event) => self.on_touch_event(event),
                        None => {
                            warn!("Touch channel closed, touch exploration disabled");
                            touch_alive = false;
                        }
                    }
                }
                Some(event) = lookup_rx.recv() => {
                    self.on_lookup_complete(event);
                }
                _ = auto_stop.tick() => {
                    if self.state == SessionState::Capturing && self.recorder.should_auto_stop() {
                        info!("Auto-stop triggered by trailing silence");
                        self.finish_capture(&lookup_tx);
                    }
                }
            }

            if !keys_alive && !touch_alive {
                warn!("All input devices gone, shutting down");
                break;
            }
        }

        Ok(())
    }

    fn on_key_command(&mut self, command: KeyCommand, lookup_tx: &mpsc::Sender<LookupEvent>) {
        match command {
            KeyCommand::DictateStart => self.start_capture(),
            KeyCommand::DictateStop => {
                if self.state == SessionState::Capturing {
                    self.finish_capture(lookup_tx);
                }
            }
            KeyCommand::Next => {
                let effects = self.cursor.next();
                self.apply_feedback(effects);
            }
            KeyCommand::Prev => {
                let effects = self.cursor.prev();
                self.apply_feedback(effects);
            }
            KeyCommand::Repeat => {
                let effects = self.cursor.repeat();
                self.apply_feedback(effects);
            }
        }
    }

    fn on_touch_event(&mut self, event: TouchEvent) {
        let effects = match event {
            TouchEvent::Down(p) => self.cursor.touch_down(p),
            TouchEvent::Move(p) => self.cursor.touch_move(p),
            TouchEvent::Up => self.cursor.touch_up(),
        };
        self.apply_feedback(effects);
    }

    fn start_capture(&mut self) {
        if !self.capture_ready {
            let status = self.config.feedback.status_capture_unavailable.clone();
            self.report_status("Dictation", &status);
            return;
        }
        if self.state != SessionState::Idle {
            // one dictation session at a time; the in-flight lookup wins
            info!("Dictation request rejected in state {}", self.state);
            return;
        }

        self.state = SessionState::Capturing;
        // keep the synthesizer out of the microphone
        self.scheduler.hush();
        self.haptics.pulse(HapticKind::Tick);
        self.recorder.start();
        info!("State: IDLE → CAPTURING");
    }

    fn finish_capture(&mut self, lookup_tx: &mpsc::Sender<LookupEvent>) {
        if self.state != SessionState::Capturing {
            return;
        }

        let samples = self.recorder.stop();
        if samples.is_empty() || WordRecorder::is_silent(&samples, self.config.silence.threshold) {
            info!("Nothing dictated, returning to IDLE");
            self.state = SessionState::Idle;
            let status = self.config.feedback.status_no_speech.clone();
            self.report_status("Dictation", &status);
            return;
        }

        if self.verbose {
            self.recorder
                .dump_wav(&samples, Path::new("/tmp/braille-touch-last.wav"));
        }

        let Some(transcriber) = self.transcriber.clone() else {
            self.state = SessionState::Idle;
            return;
        };

        self.state = SessionState::Lookup;
        info!(
            "State: CAPTURING → LOOKUP ({:.1}s audio)",
            samples.len() as f64 / self.recorder.sample_rate() as f64
        );
        spawn_capture_lookup(
            samples,
            transcriber,
            self.translator.clone(),
            self.config.lookup.timeout_secs,
            lookup_tx.clone(),
        );
    }

    fn on_lookup_complete(&mut self, event: LookupEvent) {
        self.state = SessionState::Idle;
        info!("State: LOOKUP → IDLE");

        match event {
            LookupEvent::CaptureFailed(reason) => {
                warn!("Dictation lookup failed: {reason}");
                let status = self.config.feedback.status_no_speech.clone();
                self.report_status("Dictation", &status);
            }
            LookupEvent::Word { source, outcome } => self.present_word(source, outcome),
        }
    }

    /// Put a looked-up word on the surface: pick the display text and
    /// announcement intro, surface any lookup miss, and hand the word
    /// to the reading cursor.
    fn present_word(&mut self, source: String, outcome: TranslateOutcome) {
        let feedback = self.config.feedback.clone();

        let (display, translated) = resolve_display(&source, &outcome);

        match &outcome {
            TranslateOutcome::Unavailable => {
                self.notifier.notify(
                    "Translation",
                    &format!("No translation for \"{source}\", reading the original"),
                );
            }
            TranslateOutcome::Failed => {
                self.notifier.notify("Translation", &feedback.status_lookup_failed);
            }
            TranslateOutcome::Translated(_) => {}
        }

        self.word_locale = if translated {
            Locale::Content
        } else {
            Locale::Primary
        };
        self.current_intro = if translated {
            feedback.intro_translated
        } else {
            feedback.intro_fallback
        };

        let effects = self.cursor.replace_word(&display);
        if effects.is_empty() {
            // nothing explorable came out of the lookup
            self.report_status("Dictation", &feedback.status_no_speech);
            return;
        }

        history::save_record(&ExplorationRecord::now(&source, &display, translated));
        self.apply_feedback(effects);
    }

    /// Map cursor feedback decisions onto the output devices.
    fn apply_feedback(&mut self, effects: Vec<Feedback>) {
        for effect in effects {
            match effect {
                Feedback::Announce { text } => {
                    self.scheduler
                        .speak_sequential(&self.current_intro, &text, self.word_locale);
                }
                Feedback::LetterCue { ch } => {
                    self.scheduler
                        .speak_short_cue(&ch.to_string(), self.word_locale);
                }
                Feedback::DotCue { digit } => {
                    self.scheduler
                        .speak_short_cue(&digit.to_string(), Locale::Primary);
                }
                Feedback::Haptic(kind) => self.haptics.pulse(kind),
            }
        }
    }

    /// A user-visible failure is never silent: notification plus the
    /// spoken equivalent.
    fn report_status(&self, summary: &str, spoken: &str) {
        self.notifier.notify(summary, spoken);
        self.scheduler.speak_single(spoken, Locale::Primary);
    }
}

/// The word the surface will carry for a lookup outcome: the
/// translation when there is one, otherwise the source word itself so
/// the reading engine stays fully usable.
fn resolve_display(source: &str, outcome: &TranslateOutcome) -> (String, bool) {
    match outcome {
        TranslateOutcome::Translated(text) => (text.clone(), true),
        TranslateOutcome::Unavailable | TranslateOutcome::Failed => (source.to_string(), false),
    }
}

/// Translate an already-known word and report the terminal event.
fn spawn_word_lookup(
    source: String,
    translator: Translator,
    timeout_secs: u64,
    tx: mpsc::Sender<LookupEvent>,
) {
    tokio::spawn(async move {
        let outcome = match timeout(
            Duration::from_secs(timeout_secs),
            translator.translate(&source),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Translation lookup timed out");
                TranslateOutcome::Failed
            }
        };
        let _ = tx.send(LookupEvent::Word { source, outcome }).await;
    });
}

/// Transcribe a capture, normalize it to a word, translate it, and
/// report exactly one terminal event.
fn spawn_capture_lookup(
    samples: Vec<f32>,
    transcriber: WordTranscriber,
    translator: Translator,
    timeout_secs: u64,
    tx: mpsc::Sender<LookupEvent>,
) {
    tokio::spawn(async move {
        let lookup_timeout = Duration::from_secs(timeout_secs);

        let transcribed = timeout(
            lookup_timeout,
            tokio::task::spawn_blocking(move || transcriber.transcribe(&samples)),
        )
        .await;

        let transcript = match transcribed {
            Err(_) => {
                let _ = tx
                    .send(LookupEvent::CaptureFailed("transcription timed out".into()))
                    .await;
                return;
            }
            Ok(Err(e)) => {
                let _ = tx
                    .send(LookupEvent::CaptureFailed(format!(
                        "transcription task failed: {e}"
                    )))
                    .await;
                return;
            }
            Ok(Ok(Err(e))) => {
                let _ = tx.send(LookupEvent::CaptureFailed(e)).await;
                return;
            }
            Ok(Ok(Ok(text))) => text,
        };

        let Some(source) = normalize_word(&transcript) else {
            let _ = tx
                .send(LookupEvent::CaptureFailed(format!(
                    "no word in transcript {transcript:?}"
                )))
                .await;
            return;
        };

        let outcome = match timeout(lookup_timeout, translator.translate(&source)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Translation lookup timed out");
                TranslateOutcome::Failed
            }
        };
        let _ = tx.send(LookupEvent::Word { source, outcome }).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translated_words_are_displayed_translated() {
        let outcome = TranslateOutcome::Translated("sun".to_string());
        assert_eq!(resolve_display("sol", &outcome), ("sun".to_string(), true));
    }

    #[test]
    fn unavailable_translation_falls_back_to_the_source_word() {
        assert_eq!(
            resolve_display("xyz", &TranslateOutcome::Unavailable),
            ("xyz".to_string(), false)
        );
    }

    #[test]
    fn failed_translation_reads_like_unavailable() {
        assert_eq!(
            resolve_display("sol", &TranslateOutcome::Failed),
            ("sol".to_string(), false)
        );
    }
}
