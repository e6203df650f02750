//! Touch-surface geometry.
//!
//! The screen is split into two horizontal bands: the upper strip band
//! holds the scrollable row of Braille letter cells, the lower band is
//! the dot pad where the focused letter's six dots are laid out for
//! scrubbing. Everything here is pure math over logical coordinates so
//! the reading-cursor engine can be driven with synthetic geometry in
//! tests and with config-derived geometry in production.

use crate::config::SurfaceConfig;

/// A touch point in logical screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rendered geometry of one letter cell along the strip axis.
#[derive(Debug, Clone, Copy)]
pub struct CellGeometry {
    pub index: usize,
    pub left: f32,
    pub width: f32,
}

impl CellGeometry {
    pub fn center(&self) -> f32 {
        self.left + self.width / 2.0
    }
}

/// Circular hit region for one dot of the focused letter.
#[derive(Debug, Clone, Copy)]
pub struct DotRegion {
    pub index: usize,
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
}

impl DotRegion {
    pub fn contains(&self, p: Point) -> bool {
        let dx = p.x - self.cx;
        let dy = p.y - self.cy;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Static description of the touch surface, derived from config.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceLayout {
    pub screen_width: f32,
    pub screen_height: f32,
    pub strip_height: f32,
    pub cell_width: f32,
    pub cell_gap: f32,
    pub focus_threshold: f32,
    pub dot_radius: f32,
}

impl SurfaceLayout {
    pub fn from_config(config: &SurfaceConfig) -> Self {
        Self {
            screen_width: config.screen_width,
            screen_height: config.screen_height,
            strip_height: config.strip_height,
            cell_width: config.cell_width,
            cell_gap: config.cell_gap,
            focus_threshold: config.focus_threshold,
            dot_radius: config.dot_radius,
        }
    }

    /// True when a touch point lands in the scrollable strip band.
    pub fn in_strip(&self, p: Point) -> bool {
        p.y < self.strip_height
    }

    /// Lay out `letter_count` cells left to right along the strip axis.
    ///
    /// Built once per word; the focus resolver then runs over the slice
    /// without allocating.
    pub fn cells(&self, letter_count: usize) -> Vec<CellGeometry> {
        let pitch = self.cell_width + self.cell_gap;
        (0..letter_count)
            .map(|index| CellGeometry {
                index,
                left: index as f32 * pitch,
                width: self.cell_width,
            })
            .collect()
    }

    /// The 2×3 dot grid of the dot pad, column-major so region index i
    /// corresponds to Braille dot i + 1.
    pub fn dot_regions(&self) -> [DotRegion; 6] {
        let pad_top = self.strip_height;
        let pad_height = (self.screen_height - pad_top).max(1.0);
        let col_x = [self.screen_width / 3.0, self.screen_width * 2.0 / 3.0];
        let row_y = [
            pad_top + pad_height * 0.25,
            pad_top + pad_height * 0.5,
            pad_top + pad_height * 0.75,
        ];

        let mut regions = [DotRegion {
            index: 0,
            cx: 0.0,
            cy: 0.0,
            radius: self.dot_radius,
        }; 6];
        for (index, region) in regions.iter_mut().enumerate() {
            region.index = index;
            region.cx = col_x[index / 3];
            region.cy = row_y[index % 3];
        }
        regions
    }

    /// Scroll offset that puts `cell` on the viewport center line.
    pub fn centering_offset(&self, cell: &CellGeometry) -> f32 {
        cell.center() - self.screen_width / 2.0
    }

    /// Clamp a scroll offset to the range where some cell can still be
    /// centered. Keeps drags from flinging the strip into empty space.
    pub fn clamp_offset(&self, offset: f32, cells: &[CellGeometry]) -> f32 {
        let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
            return 0.0;
        };
        let lo = self.centering_offset(first);
        let hi = self.centering_offset(last);
        offset.clamp(lo, hi)
    }

    /// Position of the viewport center line in strip coordinates.
    pub fn viewport_center(&self, offset: f32) -> f32 {
        offset + self.screen_width / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn cells_are_spaced_by_width_plus_gap() {
        let cells = layout().cells(3);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].center(), 48.0);
        assert_eq!(cells[1].center(), 48.0 + 124.0);
        assert_eq!(cells[2].center(), 48.0 + 248.0);
    }

    #[test]
    fn centering_offset_round_trips_through_viewport_center() {
        let l = layout();
        let cells = l.cells(5);
        let offset = l.centering_offset(&cells[3]);
        assert_eq!(l.viewport_center(offset), cells[3].center());
    }

    #[test]
    fn clamp_keeps_first_and_last_cells_reachable() {
        let l = layout();
        let cells = l.cells(4);
        let lo = l.centering_offset(&cells[0]);
        let hi = l.centering_offset(&cells[3]);
        assert_eq!(l.clamp_offset(-10_000.0, &cells), lo);
        assert_eq!(l.clamp_offset(10_000.0, &cells), hi);
        assert_eq!(l.clamp_offset(0.0, &cells), 0.0f32.clamp(lo, hi));
    }

    #[test]
    fn empty_strip_clamps_to_zero() {
        assert_eq!(layout().clamp_offset(123.0, &[]), 0.0);
    }

    #[test]
    fn dot_regions_form_two_columns_of_three() {
        let regions = layout().dot_regions();
        // left column holds dots 1-3, right column dots 4-6
        assert!(regions[0].cx < regions[3].cx);
        assert_eq!(regions[0].cx, regions[2].cx);
        assert!(regions[0].cy < regions[1].cy);
        assert!(regions[1].cy < regions[2].cy);
        assert_eq!(regions[1].cy, regions[4].cy);
        // all in the pad band
        for r in &regions {
            assert!(r.cy > 420.0 && r.cy < 800.0);
        }
    }

    #[test]
    fn dot_region_containment_is_circular() {
        let regions = layout().dot_regions();
        let r = regions[0];
        assert!(r.contains(Point::new(r.cx, r.cy)));
        assert!(r.contains(Point::new(r.cx + r.radius - 1.0, r.cy)));
        // corner of the bounding square lies outside the circle
        assert!(!r.contains(Point::new(r.cx + r.radius - 1.0, r.cy + r.radius - 1.0)));
    }

    #[test]
    fn band_split_routes_points() {
        let l = layout();
        assert!(l.in_strip(Point::new(100.0, 50.0)));
        assert!(!l.in_strip(Point::new(100.0, 500.0)));
    }
}
