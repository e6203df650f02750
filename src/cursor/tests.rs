use super::*;
use crate::layout::{Point, SurfaceLayout};

fn layout() -> SurfaceLayout {
    SurfaceLayout {
        screen_width: 1280.0,
        screen_height: 800.0,
        strip_height: 420.0,
        cell_width: 96.0,
        cell_gap: 28.0,
        focus_threshold: 80.0,
        dot_radius: 56.0,
    }
}

fn loaded(word: &str) -> ReadingCursor {
    let mut cursor = ReadingCursor::new(layout());
    cursor.replace_word(word);
    cursor
}

/// Center point of a dot region on the pad (regions are column-major,
/// index = dot number - 1).
fn dot_center(index: usize) -> Point {
    let r = layout().dot_regions()[index];
    Point::new(r.cx, r.cy)
}

fn pad_gap_point() -> Point {
    // between the two columns, inside the pad band
    Point::new(640.0, 610.0)
}

fn letter_cues(effects: &[Feedback]) -> Vec<char> {
    effects
        .iter()
        .filter_map(|e| match e {
            Feedback::LetterCue { ch } => Some(*ch),
            _ => None,
        })
        .collect()
}

#[test]
fn loading_a_word_focuses_letter_zero_with_one_announcement() {
    let mut cursor = ReadingCursor::new(layout());
    let effects = cursor.replace_word("sol");

    assert_eq!(cursor.active_letter(), Some(0));
    assert_eq!(cursor.active_dot(), None);
    assert_eq!(
        effects,
        vec![
            Feedback::Announce {
                text: "sol".to_string()
            },
            Feedback::Haptic(HapticKind::Tick),
        ]
    );
}

#[test]
fn loading_an_empty_word_clears_focus() {
    let mut cursor = loaded("sol");
    let effects = cursor.replace_word("");
    assert!(effects.is_empty());
    assert_eq!(cursor.active_letter(), None);
    assert!(cursor.word().is_none());
}

#[test]
fn replacement_resets_focus_regardless_of_prior_state() {
    let mut cursor = loaded("palabra");
    cursor.next();
    cursor.next();
    assert_eq!(cursor.active_letter(), Some(2));

    cursor.replace_word("sol");
    assert_eq!(cursor.active_letter(), Some(0));
}

#[test]
fn next_walks_the_word_and_stops_at_the_end() {
    let mut cursor = loaded("sol");

    let effects = cursor.next();
    assert_eq!(cursor.active_letter(), Some(1));
    assert_eq!(letter_cues(&effects), vec!['o']);

    let effects = cursor.next();
    assert_eq!(cursor.active_letter(), Some(2));
    assert_eq!(letter_cues(&effects), vec!['l']);

    // boundary: third next is a no-op with no feedback
    let effects = cursor.next();
    assert!(effects.is_empty());
    assert_eq!(cursor.active_letter(), Some(2));
}

#[test]
fn navigation_recenters_the_viewport_on_the_target_cell() {
    let l = layout();
    let mut cursor = loaded("sol");
    cursor.next();

    let cells = l.cells(3);
    assert_eq!(
        l.viewport_center(cursor.scroll_offset()),
        cells[1].center()
    );
}

#[test]
fn prev_at_letter_zero_is_a_no_op() {
    let mut cursor = loaded("sol");
    let effects = cursor.prev();
    assert!(effects.is_empty());
    assert_eq!(cursor.active_letter(), Some(0));
}

#[test]
fn navigation_on_no_word_emits_nothing() {
    let mut cursor = ReadingCursor::new(layout());
    assert!(cursor.next().is_empty());
    assert!(cursor.prev().is_empty());
    assert!(cursor.repeat().is_empty());
    assert_eq!(cursor.active_letter(), None);
}

#[test]
fn repeat_re_announces_without_moving_focus() {
    let mut cursor = loaded("sol");
    cursor.next();

    let effects = cursor.repeat();
    assert_eq!(
        effects,
        vec![Feedback::Announce {
            text: "sol".to_string()
        }]
    );
    assert_eq!(cursor.active_letter(), Some(1));
}

#[test]
fn dragging_the_strip_moves_focus_with_one_cue_per_letter() {
    let mut cursor = loaded("sol");
    let y = 100.0; // strip band

    cursor.touch_down(Point::new(900.0, y));
    // drag left by one cell pitch in small steps; exactly one focus
    // change despite many move events
    let mut cues = Vec::new();
    for step in 1..=31 {
        let p = Point::new(900.0 - step as f32 * 4.0, y);
        cues.extend(letter_cues(&cursor.touch_move(p)));
    }
    cursor.touch_up();

    assert_eq!(cues, vec!['o']);
    assert_eq!(cursor.active_letter(), Some(1));
}

#[test]
fn identical_ticks_emit_no_redundant_feedback() {
    let mut cursor = loaded("sol");
    let p = Point::new(700.0, 50.0);
    cursor.touch_down(p);
    for _ in 0..10 {
        // zero-delta moves: same resolver result every tick
        assert!(cursor.touch_move(p).is_empty());
    }
    assert_eq!(cursor.active_letter(), Some(0));
}

#[test]
fn raised_dot_gets_strong_pulse_and_spoken_digit() {
    // 's' raises dots 2, 3, 4
    let mut cursor = loaded("sol");

    let effects = cursor.touch_down(dot_center(1));
    assert_eq!(
        effects,
        vec![
            Feedback::Haptic(HapticKind::Strong),
            Feedback::DotCue { digit: 2 },
        ]
    );
    assert_eq!(cursor.active_dot(), Some(1));
}

#[test]
fn flat_dot_gets_weak_pulse_and_no_speech() {
    let mut cursor = loaded("sol");

    let effects = cursor.touch_down(dot_center(0));
    assert_eq!(effects, vec![Feedback::Haptic(HapticKind::Weak)]);
    assert_eq!(cursor.active_dot(), Some(0));
}

#[test]
fn resting_on_a_dot_emits_once() {
    let mut cursor = loaded("sol");
    cursor.touch_down(dot_center(1));

    // a resting finger produces a stream of identical move samples
    for _ in 0..20 {
        assert!(cursor.touch_move(dot_center(1)).is_empty());
    }
}

#[test]
fn leaving_a_dot_resets_the_identity_token() {
    let mut cursor = loaded("sol");
    cursor.touch_down(dot_center(1));

    // into the gap: identification ends, no feedback
    assert!(cursor.touch_move(pad_gap_point()).is_empty());
    assert_eq!(cursor.active_dot(), None);

    // back onto the same dot: feedback fires again
    let effects = cursor.touch_move(dot_center(1));
    assert_eq!(
        effects,
        vec![
            Feedback::Haptic(HapticKind::Strong),
            Feedback::DotCue { digit: 2 },
        ]
    );
}

#[test]
fn touch_end_clears_the_dot_cursor_but_not_the_letter() {
    let mut cursor = loaded("sol");
    cursor.touch_down(dot_center(1));
    assert_eq!(cursor.active_dot(), Some(1));

    let effects = cursor.touch_up();
    assert!(effects.is_empty());
    assert_eq!(cursor.active_dot(), None);
    assert_eq!(cursor.active_letter(), Some(0));
}

#[test]
fn focus_change_resets_the_dot_token() {
    // 'l' raises dots 1, 2, 3; dot 2 is raised in both 's' and 'l'
    let mut cursor = loaded("sol");
    cursor.touch_down(dot_center(1));
    cursor.touch_up();

    cursor.next();
    cursor.next();
    assert_eq!(cursor.active_letter(), Some(2));

    // same physical dot on the new letter speaks again
    let effects = cursor.touch_down(dot_center(1));
    assert_eq!(
        effects,
        vec![
            Feedback::Haptic(HapticKind::Strong),
            Feedback::DotCue { digit: 2 },
        ]
    );
}

#[test]
fn dots_are_not_explorable_without_a_focused_letter() {
    let mut cursor = ReadingCursor::new(layout());
    assert!(cursor.touch_down(dot_center(1)).is_empty());
    assert_eq!(cursor.active_dot(), None);
}

#[test]
fn sliding_from_pad_into_strip_ends_dot_identification() {
    let mut cursor = loaded("sol");
    cursor.touch_down(dot_center(1));
    assert_eq!(cursor.active_dot(), Some(1));

    cursor.touch_move(Point::new(640.0, 100.0));
    assert_eq!(cursor.active_dot(), None);

    // and the next pad touch re-identifies
    let effects = cursor.touch_move(dot_center(1));
    assert_eq!(effects.len(), 2);
}

#[test]
fn unknown_characters_still_form_explorable_flat_cells() {
    let mut cursor = loaded("x7");
    assert_eq!(cursor.active_letter(), Some(0));
    cursor.next();
    // '7' resolves to an all-inactive pattern: weak pulses only
    let effects = cursor.touch_down(dot_center(3));
    assert_eq!(effects, vec![Feedback::Haptic(HapticKind::Weak)]);
}
