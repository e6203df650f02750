//! Dot hit-tester: touch point → dot index within the focused letter.

use crate::layout::{DotRegion, Point};

/// A resolved dot under the finger, with its raised/flat state taken
/// from the focused letter's pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotHit {
    pub index: usize,
    pub active: bool,
}

/// Test a touch point against the six dot regions of the dot pad.
///
/// Regions are disjoint circles, so the first containing region is the
/// only one; the gap between dots (and everything outside the pad)
/// resolves to `None`. The caller is responsible for suppressing repeats
/// while the finger rests on one dot; this function just answers
/// "which dot, and is it raised".
pub fn resolve_dot(point: Point, regions: &[DotRegion; 6], pattern: &[bool; 6]) -> Option<DotHit> {
    regions.iter().find(|r| r.contains(point)).map(|r| DotHit {
        index: r.index,
        active: pattern[r.index],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> [DotRegion; 6] {
        // two columns at x=100/200, rows at y=100/200/300, radius 40
        let mut regions = [DotRegion {
            index: 0,
            cx: 0.0,
            cy: 0.0,
            radius: 40.0,
        }; 6];
        for (index, r) in regions.iter_mut().enumerate() {
            r.index = index;
            r.cx = if index < 3 { 100.0 } else { 200.0 };
            r.cy = 100.0 + (index % 3) as f32 * 100.0;
        }
        regions
    }

    // dots 2,3,4 raised (the letter 's')
    const PATTERN: [bool; 6] = [false, true, true, true, false, false];

    #[test]
    fn touch_inside_a_dot_reports_its_index_and_state() {
        let hit = resolve_dot(Point::new(100.0, 200.0), &regions(), &PATTERN).unwrap();
        assert_eq!(hit, DotHit { index: 1, active: true });

        let hit = resolve_dot(Point::new(200.0, 200.0), &regions(), &PATTERN).unwrap();
        assert_eq!(hit, DotHit { index: 4, active: false });
    }

    #[test]
    fn gap_between_dots_resolves_to_none() {
        assert!(resolve_dot(Point::new(150.0, 150.0), &regions(), &PATTERN).is_none());
        assert!(resolve_dot(Point::new(500.0, 500.0), &regions(), &PATTERN).is_none());
    }

    #[test]
    fn stationary_touch_is_idempotent() {
        let p = Point::new(102.0, 298.0);
        let a = resolve_dot(p, &regions(), &PATTERN);
        let b = resolve_dot(p, &regions(), &PATTERN);
        assert_eq!(a, b);
        assert_eq!(a.unwrap().index, 2);
    }
}
