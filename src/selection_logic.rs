//! Pure geometry for the selection: no window or toolkit types in here.

use serde::{Deserialize, Serialize};

/// A point in screen-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// Rectangular selection in normalized form (`x1 <= x2`, `y1 <= y2`).
///
/// Every constructor normalizes, so a `Region` handed to history, the
/// overlay or the capture path can never be inverted. It serializes as a
/// plain `[x1, y1, x2, y2]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Region {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl Region {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Region {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn from_points(a: Point, b: Point) -> Self {
        Region::new(a.x, a.y, b.x, b.y)
    }

    pub fn x1(&self) -> i32 {
        self.x1
    }

    pub fn y1(&self) -> i32 {
        self.y1
    }

    pub fn x2(&self) -> i32 {
        self.x2
    }

    pub fn y2(&self) -> i32 {
        self.y2
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Both sides are at least `min` pixels long.
    pub fn meets_minimum(&self, min: i32) -> bool {
        self.width() >= min && self.height() >= min
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, p: Point) -> bool {
        self.x1 <= p.x && p.x <= self.x2 && self.y1 <= p.y && p.y <= self.y2
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Region {
        Region {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Finds the handle under `p`.
    ///
    /// Corners win over edges, and both are checked in a fixed order
    /// (tl, tr, bl, br, then left, right, top, bottom). An edge only
    /// matches when `p` lies within the rectangle's span on the other axis.
    pub fn classify(&self, p: Point, threshold: i32) -> Option<Handle> {
        let near = |a: i32, b: i32| (a - b).abs() <= threshold;
        let within_x = self.x1 <= p.x && p.x <= self.x2;
        let within_y = self.y1 <= p.y && p.y <= self.y2;

        let corners = [
            (Handle::TopLeft, self.x1, self.y1),
            (Handle::TopRight, self.x2, self.y1),
            (Handle::BottomLeft, self.x1, self.y2),
            (Handle::BottomRight, self.x2, self.y2),
        ];
        if let Some((handle, _, _)) = corners
            .iter()
            .find(|(_, cx, cy)| near(p.x, *cx) && near(p.y, *cy))
        {
            return Some(*handle);
        }

        if near(p.x, self.x1) && within_y {
            Some(Handle::Left)
        } else if near(p.x, self.x2) && within_y {
            Some(Handle::Right)
        } else if near(p.y, self.y1) && within_x {
            Some(Handle::Top)
        } else if near(p.y, self.y2) && within_x {
            Some(Handle::Bottom)
        } else if self.contains(p) {
            Some(Handle::Inside)
        } else {
            None
        }
    }

    /// Moves the edges owned by `handle` to `p`; all other edges keep
    /// their value. `Inside` owns no edge and returns the region unchanged.
    pub fn with_handle_at(&self, handle: Handle, p: Point) -> Region {
        let (mut x1, mut y1, mut x2, mut y2) = (self.x1, self.y1, self.x2, self.y2);
        if handle.moves_left() {
            x1 = p.x;
        }
        if handle.moves_right() {
            x2 = p.x;
        }
        if handle.moves_top() {
            y1 = p.y;
        }
        if handle.moves_bottom() {
            y2 = p.y;
        }
        Region::new(x1, y1, x2, y2)
    }

    /// Shifts the edges owned by `handle` by `(dx, dy)`. `Inside` shifts
    /// the whole rectangle.
    pub fn nudged(&self, handle: Handle, dx: i32, dy: i32) -> Region {
        if handle == Handle::Inside {
            return self.translate(dx, dy);
        }
        let (mut x1, mut y1, mut x2, mut y2) = (self.x1, self.y1, self.x2, self.y2);
        if handle.moves_left() {
            x1 += dx;
        }
        if handle.moves_right() {
            x2 += dx;
        }
        if handle.moves_top() {
            y1 += dy;
        }
        if handle.moves_bottom() {
            y2 += dy;
        }
        Region::new(x1, y1, x2, y2)
    }

    /// The point a handle stands for: its corner, or the midpoint of its
    /// edge. `Inside` maps to the bottom-right corner.
    pub fn handle_point(&self, handle: Handle) -> Point {
        let mid_x = (self.x1 + self.x2) / 2;
        let mid_y = (self.y1 + self.y2) / 2;
        match handle {
            Handle::TopLeft => Point::new(self.x1, self.y1),
            Handle::TopRight => Point::new(self.x2, self.y1),
            Handle::BottomLeft => Point::new(self.x1, self.y2),
            Handle::BottomRight | Handle::Inside => Point::new(self.x2, self.y2),
            Handle::Left => Point::new(self.x1, mid_y),
            Handle::Right => Point::new(self.x2, mid_y),
            Handle::Top => Point::new(mid_x, self.y1),
            Handle::Bottom => Point::new(mid_x, self.y2),
        }
    }

    /// Like [`Region::handle_point`], but an edge handle keeps the pointer's
    /// coordinate along the edge, so the magnifier follows the pointer.
    pub fn handle_point_near(&self, handle: Handle, pointer: Point) -> Point {
        match handle {
            Handle::Left => Point::new(self.x1, pointer.y),
            Handle::Right => Point::new(self.x2, pointer.y),
            Handle::Top => Point::new(pointer.x, self.y1),
            Handle::Bottom => Point::new(pointer.x, self.y2),
            other => self.handle_point(other),
        }
    }

    /// Intersection with `[0, width) x [0, height)`, or `None` when empty.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Region> {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        let clipped = Region {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        };
        (!clipped.is_empty()).then_some(clipped)
    }
}

impl From<[i32; 4]> for Region {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Region::new(x1, y1, x2, y2)
    }
}

impl From<Region> for [i32; 4] {
    fn from(r: Region) -> Self {
        [r.x1, r.y1, r.x2, r.y2]
    }
}

/// Resize and move affordances of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Left,
    Right,
    Top,
    Bottom,
    #[default]
    Inside,
}

impl Handle {
    pub fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::BottomLeft | Handle::Left)
    }

    pub fn moves_right(self) -> bool {
        matches!(self, Handle::TopRight | Handle::BottomRight | Handle::Right)
    }

    pub fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::TopRight | Handle::Top)
    }

    pub fn moves_bottom(self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::BottomRight | Handle::Bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Region {
        Region::new(100, 100, 400, 300)
    }

    #[test]
    fn new_normalizes_inverted_corners() {
        let r = Region::new(400, 300, 100, 100);
        assert_eq!((r.x1(), r.y1(), r.x2(), r.y2()), (100, 100, 400, 300));
        assert_eq!((r.width(), r.height()), (300, 200));
    }

    #[test]
    fn corners_take_priority_over_edges() {
        let r = sample();
        assert_eq!(r.classify(Point::new(105, 95), 10), Some(Handle::TopLeft));
        assert_eq!(r.classify(Point::new(392, 108), 10), Some(Handle::TopRight));
        assert_eq!(r.classify(Point::new(90, 310), 10), Some(Handle::BottomLeft));
        assert_eq!(r.classify(Point::new(410, 290), 10), Some(Handle::BottomRight));
    }

    #[test]
    fn edges_require_span_on_other_axis() {
        let r = sample();
        assert_eq!(r.classify(Point::new(95, 200), 10), Some(Handle::Left));
        assert_eq!(r.classify(Point::new(405, 200), 10), Some(Handle::Right));
        assert_eq!(r.classify(Point::new(250, 92), 10), Some(Handle::Top));
        assert_eq!(r.classify(Point::new(250, 310), 10), Some(Handle::Bottom));
        // Near the left edge line but above the rectangle and away from the corner.
        assert_eq!(r.classify(Point::new(95, 50), 10), None);
    }

    #[test]
    fn inside_and_outside() {
        let r = sample();
        assert_eq!(r.classify(Point::new(250, 200), 10), Some(Handle::Inside));
        assert_eq!(r.classify(Point::new(20, 20), 10), None);
        assert_eq!(r.classify(Point::new(500, 200), 10), None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let r = sample();
        assert_eq!(r.classify(Point::new(90, 200), 10), Some(Handle::Left));
        assert_eq!(r.classify(Point::new(89, 200), 10), None);
    }

    #[test]
    fn handle_moves_only_its_edges() {
        let r = sample();
        let moved = r.with_handle_at(Handle::Left, Point::new(50, 999));
        assert_eq!(moved, Region::new(50, 100, 400, 300));

        let moved = r.with_handle_at(Handle::BottomRight, Point::new(450, 350));
        assert_eq!(moved, Region::new(100, 100, 450, 350));

        assert_eq!(r.with_handle_at(Handle::Inside, Point::new(0, 0)), r);
    }

    #[test]
    fn nudge_inside_translates() {
        let r = sample().nudged(Handle::Inside, -1, 0);
        assert_eq!(r, Region::new(99, 100, 399, 300));
    }

    #[test]
    fn nudge_corner_moves_one_corner() {
        let r = sample().nudged(Handle::TopLeft, -1, 0);
        assert_eq!(r, Region::new(99, 100, 400, 300));
        let r = sample().nudged(Handle::Bottom, 0, 1);
        assert_eq!(r, Region::new(100, 100, 400, 301));
    }

    #[test]
    fn handle_points() {
        let r = sample();
        assert_eq!(r.handle_point(Handle::Top), Point::new(250, 100));
        assert_eq!(r.handle_point(Handle::Right), Point::new(400, 200));
        assert_eq!(
            r.handle_point_near(Handle::Left, Point::new(97, 180)),
            Point::new(100, 180)
        );
    }

    #[test]
    fn clip_to_bounds() {
        let r = Region::new(-20, 10, 50, 500);
        assert_eq!(r.clip_to(100, 100), Some(Region::new(0, 10, 50, 100)));
        assert_eq!(Region::new(200, 200, 300, 300).clip_to(100, 100), None);
    }

    #[test]
    fn serializes_as_array() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, "[100,100,400,300]");
        let back: Region = serde_json::from_str("[400,300,100,100]").unwrap();
        assert_eq!(back, sample());
    }
}
