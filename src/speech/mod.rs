//! Speech feedback scheduling.
//!
//! The scheduler owns the single spoken-output channel. Every operation
//! first cancels whatever is in flight or queued, then hands the backend
//! a fresh utterance list, so the newest user action is always the one
//! heard and speech never backs up into a stale queue. Operations are
//! fire-and-forget: nothing blocks, nothing reports completion.

pub mod kokoro;

use std::sync::Arc;

use tracing::debug;

/// The two spoken locales of a session: the user's own language
/// (dictation, status phrases) and the language of the word under
/// exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    Primary,
    Content,
}

/// One utterance to synthesize: text, voice locale, speech rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub locale: Locale,
    pub rate: f32,
}

/// Something that can cancel current speech and play a queue of
/// utterances in order. The production implementation is the Kokoro
/// engine; tests substitute a recording mock to verify call order.
pub trait SpeechBackend: Send + Sync {
    fn cancel(&self);
    fn enqueue(&self, utterances: Vec<Utterance>);
}

/// Cancel-then-speak front end over an optional backend.
///
/// With no backend (speech disabled or the engine failed to load) every
/// operation is a silent no-op; speech being unavailable must never
/// disturb the rest of the system.
pub struct SpeechScheduler {
    backend: Option<Arc<dyn SpeechBackend>>,
    cue_rate: f32,
}

impl SpeechScheduler {
    pub fn new(backend: Option<Arc<dyn SpeechBackend>>, cue_rate: f32) -> Self {
        Self { backend, cue_rate }
    }

    pub fn disabled() -> Self {
        Self {
            backend: None,
            cue_rate: 1.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Cancel and speak one utterance at normal rate.
    pub fn speak_single(&self, text: &str, locale: Locale) {
        self.submit(vec![Utterance {
            text: text.to_string(),
            locale,
            rate: 1.0,
        }]);
    }

    /// Cancel and speak an intro phrase in the primary locale followed
    /// back-to-back by the content in its own locale. The backend plays
    /// queued utterances in order; the caller never polls.
    pub fn speak_sequential(&self, intro: &str, content: &str, content_locale: Locale) {
        self.submit(vec![
            Utterance {
                text: intro.to_string(),
                locale: Locale::Primary,
                rate: 1.0,
            },
            Utterance {
                text: content.to_string(),
                locale: content_locale,
                rate: 1.0,
            },
        ]);
    }

    /// Cancel and speak a short label (a letter, a dot digit) at the
    /// fast cue rate used for rapid scanning.
    pub fn speak_short_cue(&self, label: &str, locale: Locale) {
        self.submit(vec![Utterance {
            text: label.to_string(),
            locale,
            rate: self.cue_rate,
        }]);
    }

    /// Cancel without speaking anything new. Used when the microphone
    /// opens so the synthesizer doesn't talk over the recording.
    pub fn hush(&self) {
        if let Some(backend) = &self.backend {
            backend.cancel();
        }
    }

    fn submit(&self, utterances: Vec<Utterance>) {
        let Some(backend) = &self.backend else {
            debug!("speech disabled, dropping {} utterance(s)", utterances.len());
            return;
        };
        backend.cancel();
        backend.enqueue(utterances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the backend call sequence so tests can assert ordering.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Call>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Cancel,
        Enqueue(Vec<Utterance>),
    }

    impl SpeechBackend for RecordingBackend {
        fn cancel(&self) {
            self.calls.lock().unwrap().push(Call::Cancel);
        }

        fn enqueue(&self, utterances: Vec<Utterance>) {
            self.calls.lock().unwrap().push(Call::Enqueue(utterances));
        }
    }

    fn scheduler() -> (SpeechScheduler, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        let scheduler = SpeechScheduler::new(Some(backend.clone()), 2.2);
        (scheduler, backend)
    }

    #[test]
    fn cancel_always_precedes_speak() {
        let (scheduler, backend) = scheduler();
        scheduler.speak_single("hola", Locale::Primary);

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], Call::Cancel);
        assert!(matches!(calls[1], Call::Enqueue(_)));
    }

    #[test]
    fn sequential_enqueues_exactly_two_utterances_in_order() {
        let (scheduler, backend) = scheduler();
        scheduler.speak_sequential("la palabra es", "sun", Locale::Content);

        let calls = backend.calls.lock().unwrap();
        let Call::Enqueue(utterances) = &calls[1] else {
            panic!("expected enqueue after cancel");
        };
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[0].text, "la palabra es");
        assert_eq!(utterances[0].locale, Locale::Primary);
        assert_eq!(utterances[1].text, "sun");
        assert_eq!(utterances[1].locale, Locale::Content);
    }

    #[test]
    fn new_speech_supersedes_a_running_sequence() {
        let (scheduler, backend) = scheduler();
        scheduler.speak_sequential("la palabra es", "sun", Locale::Content);
        scheduler.speak_single("s", Locale::Content);

        let calls = backend.calls.lock().unwrap();
        // cancel, enqueue(2), cancel, enqueue(1): the second cancel lands
        // before the second speak, so at most one stream is ever audible
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[2], Call::Cancel);
        let Call::Enqueue(utterances) = &calls[3] else {
            panic!("expected enqueue after cancel");
        };
        assert_eq!(utterances.len(), 1);
        assert_eq!(utterances[0].text, "s");
    }

    #[test]
    fn short_cues_use_the_fast_rate() {
        let (scheduler, backend) = scheduler();
        scheduler.speak_short_cue("3", Locale::Primary);

        let calls = backend.calls.lock().unwrap();
        let Call::Enqueue(utterances) = &calls[1] else {
            panic!("expected enqueue after cancel");
        };
        assert_eq!(utterances[0].rate, 2.2);
    }

    #[test]
    fn disabled_scheduler_is_a_silent_no_op() {
        let scheduler = SpeechScheduler::disabled();
        assert!(!scheduler.is_enabled());
        // must not panic or block
        scheduler.speak_single("hola", Locale::Primary);
        scheduler.speak_sequential("a", "b", Locale::Content);
        scheduler.speak_short_cue("1", Locale::Primary);
        scheduler.hush();
    }
}
