//! Reading cursor engine.
//!
//! Owns the current word, the strip scroll state, and the focus/dot
//! cursor, and turns continuous touch geometry into discrete feedback
//! effects. The controller never talks to devices: every event handler
//! returns the list of `Feedback` effects it decided on, and the service
//! maps those onto the speech scheduler, the haptic motor, and the
//! notifier. That keeps the whole engine drivable with synthetic
//! geometry in tests.

mod dots;
mod focus;
#[cfg(test)]
mod tests;

pub use dots::{resolve_dot, DotHit};
pub use focus::{resolve_focus, FocusHit};

use tracing::debug;

use crate::braille;
use crate::layout::{CellGeometry, DotRegion, Point, SurfaceLayout};

/// One letter of the current word with its resolved dot pattern.
#[derive(Debug, Clone)]
pub struct Letter {
    pub ch: char,
    pub position: usize,
    pub pattern: [bool; 6],
}

/// An immutable word: the display text and its per-letter dot patterns,
/// resolved once when the word is derived.
#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    pub letters: Vec<Letter>,
}

impl Word {
    pub fn from_text(text: &str) -> Self {
        let letters = text
            .chars()
            .enumerate()
            .map(|(position, ch)| Letter {
                ch,
                position,
                pattern: braille::pattern_for(ch),
            })
            .collect();
        Self {
            text: text.to_string(),
            letters,
        }
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}

/// Vibration strengths the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticKind {
    /// Short tick marking a letter-focus change.
    Tick,
    /// Soft pulse for an inactive (flat) dot.
    Weak,
    /// Strong pulse for an active (raised) dot.
    Strong,
}

/// A feedback decision made by the engine for one input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// Announce the whole word (sequential intro + content speech).
    Announce { text: String },
    /// Speak the newly focused letter as a short cue.
    LetterCue { ch: char },
    /// Speak the dot number of a raised dot as a short cue.
    DotCue { digit: u8 },
    /// Fire a vibration pulse.
    Haptic(HapticKind),
}

/// Reading cursor controller.
///
/// All cursor state lives in explicit fields here; the focus resolver
/// and dot hit-tester are pure functions called with this state, so a
/// test can construct a controller, feed it geometry, and assert on the
/// returned effects.
pub struct ReadingCursor {
    layout: SurfaceLayout,
    dot_regions: [DotRegion; 6],
    word: Option<Word>,
    cells: Vec<CellGeometry>,
    scroll_offset: f32,
    active_letter: Option<usize>,
    active_dot: Option<usize>,
    /// Deduplication token for dot feedback: (letter index, dot index)
    /// of the last dot the touch was identified on.
    dot_token: Option<(usize, usize)>,
    /// Last sampled x while a drag is running in the strip band.
    drag_anchor: Option<f32>,
}

impl ReadingCursor {
    pub fn new(layout: SurfaceLayout) -> Self {
        Self {
            layout,
            dot_regions: layout.dot_regions(),
            word: None,
            cells: Vec::new(),
            scroll_offset: 0.0,
            active_letter: None,
            active_dot: None,
            dot_token: None,
            drag_anchor: None,
        }
    }

    pub fn word(&self) -> Option<&Word> {
        self.word.as_ref()
    }

    pub fn active_letter(&self) -> Option<usize> {
        self.active_letter
    }

    pub fn active_dot(&self) -> Option<usize> {
        self.active_dot
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    /// Replace the current word and re-establish the start-of-word
    /// entry point.
    ///
    /// Focus always lands on letter 0 of a non-empty word (with one
    /// announcement and one haptic tick); an empty replacement clears
    /// focus entirely. The dot token is reset either way.
    pub fn replace_word(&mut self, text: &str) -> Vec<Feedback> {
        self.active_dot = None;
        self.dot_token = None;
        self.drag_anchor = None;

        let word = Word::from_text(text);
        if word.is_empty() {
            debug!("word cleared");
            self.word = None;
            self.cells.clear();
            self.scroll_offset = 0.0;
            self.active_letter = None;
            return Vec::new();
        }

        debug!("word loaded: {:?} ({} letters)", word.text, word.len());
        self.cells = self.layout.cells(word.len());
        self.scroll_offset = self.layout.centering_offset(&self.cells[0]);
        self.active_letter = Some(0);
        let announce = Feedback::Announce {
            text: word.text.clone(),
        };
        self.word = Some(word);
        vec![announce, Feedback::Haptic(HapticKind::Tick)]
    }

    /// Re-announce the current word without moving the cursor.
    pub fn repeat(&self) -> Vec<Feedback> {
        match &self.word {
            Some(word) => vec![Feedback::Announce {
                text: word.text.clone(),
            }],
            None => Vec::new(),
        }
    }

    pub fn touch_down(&mut self, p: Point) -> Vec<Feedback> {
        if self.layout.in_strip(p) {
            self.drag_anchor = Some(p.x);
            Vec::new()
        } else {
            self.explore_dot(p)
        }
    }

    pub fn touch_move(&mut self, p: Point) -> Vec<Feedback> {
        if self.layout.in_strip(p) {
            // leaving the dot pad ends the current dot identification
            self.clear_dot_state();
            let Some(anchor) = self.drag_anchor.replace(p.x) else {
                return Vec::new();
            };
            let dragged = self.scroll_offset - (p.x - anchor);
            self.scroll_offset = self.layout.clamp_offset(dragged, &self.cells);
            self.focus_tick()
        } else {
            self.drag_anchor = None;
            self.explore_dot(p)
        }
    }

    /// Touch ended: dot exploration stops, the letter focus stays.
    pub fn touch_up(&mut self) -> Vec<Feedback> {
        self.drag_anchor = None;
        self.clear_dot_state();
        Vec::new()
    }

    /// Move focus to the next letter. No-op at the last letter.
    pub fn next(&mut self) -> Vec<Feedback> {
        let target = match self.active_letter {
            Some(index) => index + 1,
            None => 0,
        };
        self.navigate_to(target)
    }

    /// Move focus to the previous letter. No-op at letter 0.
    pub fn prev(&mut self) -> Vec<Feedback> {
        match self.active_letter {
            Some(index) if index > 0 => self.navigate_to(index - 1),
            Some(_) => Vec::new(),
            None => self.navigate_to(0),
        }
    }

    /// Center the viewport on `target` and let the normal geometry-tick
    /// path pick up the resulting focus change.
    fn navigate_to(&mut self, target: usize) -> Vec<Feedback> {
        let len = self.word.as_ref().map_or(0, Word::len);
        if target >= len {
            return Vec::new();
        }
        let centered = self.layout.centering_offset(&self.cells[target]);
        self.scroll_offset = self.layout.clamp_offset(centered, &self.cells);
        self.focus_tick()
    }

    /// One geometry tick: resolve focus for the current scroll position
    /// and emit feedback only when the focused letter actually changed.
    fn focus_tick(&mut self) -> Vec<Feedback> {
        let center = self.layout.viewport_center(self.scroll_offset);
        let hit = resolve_focus(center, &self.cells, self.layout.focus_threshold);

        let Some(hit) = hit else {
            // between cells or past the ends: keep the previous focus
            return Vec::new();
        };
        if self.active_letter == Some(hit.index) {
            return Vec::new();
        }

        debug!(
            "focus: {:?} -> {} (distance {:.1})",
            self.active_letter, hit.index, hit.distance
        );
        self.active_letter = Some(hit.index);
        self.clear_dot_state();

        let ch = self
            .word
            .as_ref()
            .map(|w| w.letters[hit.index].ch)
            .unwrap_or_default();
        vec![Feedback::Haptic(HapticKind::Tick), Feedback::LetterCue { ch }]
    }

    /// One dot-pad touch sample: hit-test against the focused letter and
    /// emit feedback when the identified dot changes.
    fn explore_dot(&mut self, p: Point) -> Vec<Feedback> {
        let Some(letter_index) = self.active_letter else {
            // dots are only explorable on a focused letter
            return Vec::new();
        };
        let Some(word) = &self.word else {
            return Vec::new();
        };

        let letter = &word.letters[letter_index];
        match resolve_dot(p, &self.dot_regions, &letter.pattern) {
            Some(hit) => {
                let token = (letter_index, hit.index);
                if self.dot_token == Some(token) {
                    return Vec::new();
                }
                self.dot_token = Some(token);
                self.active_dot = Some(hit.index);
                debug!(
                    "dot: letter {:?} at {} dot {} ({})",
                    letter.ch,
                    letter.position,
                    hit.index + 1,
                    if hit.active { "raised" } else { "flat" }
                );
                if hit.active {
                    vec![
                        Feedback::Haptic(HapticKind::Strong),
                        Feedback::DotCue {
                            digit: (hit.index + 1) as u8,
                        },
                    ]
                } else {
                    vec![Feedback::Haptic(HapticKind::Weak)]
                }
            }
            None => {
                // the touch left the identified dot region
                self.clear_dot_state();
                Vec::new()
            }
        }
    }

    fn clear_dot_state(&mut self) {
        self.active_dot = None;
        self.dot_token = None;
    }
}
