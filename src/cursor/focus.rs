//! Focus resolver: continuous scroll position → focused letter cell.

use crate::layout::CellGeometry;

/// The cell a viewport center line resolves to, and how far off-center
/// it sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusHit {
    pub index: usize,
    pub distance: f32,
}

/// Resolve which cell is centered under the viewport center line.
///
/// Picks the cell whose center is nearest to `viewport_center`; cells
/// further than `threshold` never win, so a strip scrolled past its ends
/// (or a word still sliding into view) resolves to `None` instead of
/// snapping focus to a barely-visible cell. Equidistant cells resolve to
/// the lower index, keeping resolution deterministic and biased toward
/// reading order.
///
/// Pure and allocation-free; the caller compares the result against its
/// previous focus to decide whether anything changed.
pub fn resolve_focus(
    viewport_center: f32,
    cells: &[CellGeometry],
    threshold: f32,
) -> Option<FocusHit> {
    let mut best: Option<FocusHit> = None;

    for cell in cells {
        let distance = (cell.center() - viewport_center).abs();
        if distance > threshold {
            continue;
        }
        // strict comparison: ties keep the earlier (lower-index) cell
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(FocusHit {
                index: cell.index,
                distance,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(n: usize) -> Vec<CellGeometry> {
        // 100-wide cells with centers at 50, 150, 250, ...
        (0..n)
            .map(|index| CellGeometry {
                index,
                left: index as f32 * 100.0,
                width: 100.0,
            })
            .collect()
    }

    #[test]
    fn nearest_center_wins() {
        let cells = cells(3);
        let hit = resolve_focus(160.0, &cells, 80.0).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.distance, 10.0);
    }

    #[test]
    fn nothing_within_threshold_resolves_to_none() {
        let cells = cells(2);
        assert!(resolve_focus(500.0, &cells, 80.0).is_none());
        assert!(resolve_focus(-200.0, &cells, 80.0).is_none());
    }

    #[test]
    fn equidistant_cells_prefer_the_lower_index() {
        // center line exactly between cell 0 (50) and cell 1 (150)
        let hit = resolve_focus(100.0, &cells(2), 80.0).unwrap();
        assert_eq!(hit.index, 0);
    }

    #[test]
    fn empty_strip_resolves_to_none() {
        assert!(resolve_focus(0.0, &[], 80.0).is_none());
    }

    #[test]
    fn resolution_is_idempotent() {
        let cells = cells(4);
        let a = resolve_focus(250.0, &cells, 80.0);
        let b = resolve_focus(250.0, &cells, 80.0);
        assert_eq!(a, b);
    }
}
