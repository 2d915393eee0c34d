//! Region selection state machine. It only sees points and key deltas; the
//! window adapter in `window` is the one that talks to minifb.

use log::trace;

use crate::selection_logic::{Handle, Point, Region};

/// Pixel thresholds used by the state machine.
///
/// The minimum size and the handle hit distance happen to share a default,
/// but nothing ties them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub min_size: i32,
    pub handle_threshold: i32,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        SelectionLimits {
            min_size: 10,
            handle_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Idle,
    /// Drawing a new rectangle; `anchor` stays put, `free` follows the pointer.
    Selecting { anchor: Point, free: Point },
    /// `origin` is the region as it was when the drag began.
    Resizing { handle: Handle, origin: Region },
    /// `offset` is the pointer position relative to the top-left corner.
    Moving { offset: Point },
}

/// Arrow-key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Left,
    Right,
    Up,
    Down,
}

impl Nudge {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Nudge::Left => (-1, 0),
            Nudge::Right => (1, 0),
            Nudge::Up => (0, -1),
            Nudge::Down => (0, 1),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionStateMachine {
    limits: SelectionLimits,
    region: Option<Region>,
    selected: bool,
    mode: SelectionMode,
    last_adjust: Handle,
}

impl SelectionStateMachine {
    pub fn new(limits: SelectionLimits) -> Self {
        SelectionStateMachine {
            limits,
            ..Default::default()
        }
    }

    pub fn limits(&self) -> SelectionLimits {
        self.limits
    }

    /// Current region, always normalized. During a fresh drag this is the
    /// live rectangle and may still be below the minimum size.
    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// The region once it has been released, restored or loaded from history.
    pub fn selected_region(&self) -> Option<Region> {
        self.region.filter(|_| self.selected)
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_dragging(&self) -> bool {
        self.mode != SelectionMode::Idle
    }

    /// Handle last used by a drag; arrow keys act on it.
    pub fn last_adjust(&self) -> Handle {
        self.last_adjust
    }

    /// Handle under `p`, only once a region has been selected.
    pub fn hover(&self, p: Point) -> Option<Handle> {
        self.selected_region()
            .and_then(|r| r.classify(p, self.limits.handle_threshold))
    }

    /// Replaces the region with a committed one (history restore/navigation).
    pub fn load(&mut self, region: Region) {
        self.region = Some(region);
        self.selected = true;
        self.mode = SelectionMode::Idle;
    }

    pub fn clear(&mut self) {
        self.region = None;
        self.selected = false;
        self.mode = SelectionMode::Idle;
    }

    pub fn pointer_down(&mut self, p: Point) -> SelectionMode {
        self.mode = match (self.selected_region(), self.hover(p)) {
            (Some(region), Some(Handle::Inside)) => {
                self.last_adjust = Handle::Inside;
                let tl = region.top_left();
                SelectionMode::Moving {
                    offset: Point::new(p.x - tl.x, p.y - tl.y),
                }
            }
            (Some(region), Some(handle)) => {
                self.last_adjust = handle;
                SelectionMode::Resizing {
                    handle,
                    origin: region,
                }
            }
            _ => {
                self.region = Some(Region::from_points(p, p));
                self.selected = false;
                SelectionMode::Selecting {
                    anchor: p,
                    free: p,
                }
            }
        };
        trace!("pointer down at {:?} -> {:?}", p, self.mode);
        self.mode
    }

    /// Returns whether the region changed.
    pub fn pointer_move(&mut self, p: Point) -> bool {
        match self.mode {
            SelectionMode::Idle => false,
            SelectionMode::Selecting { anchor, .. } => {
                self.mode = SelectionMode::Selecting { anchor, free: p };
                self.replace(Region::from_points(anchor, p))
            }
            SelectionMode::Resizing { handle, origin } => {
                let resized = origin.with_handle_at(handle, p);
                if !resized.meets_minimum(self.limits.min_size) {
                    trace!("resize to {:?} rejected", resized);
                    return false;
                }
                self.replace(resized)
            }
            SelectionMode::Moving { offset } => {
                let Some(current) = self.region else {
                    return false;
                };
                let tl = current.top_left();
                let moved = current.translate(p.x - offset.x - tl.x, p.y - offset.y - tl.y);
                self.replace(moved)
            }
        }
    }

    /// Ends the current drag. A fresh selection below the minimum size is
    /// discarded; anything else stays as the selected region.
    pub fn pointer_up(&mut self, p: Point) -> bool {
        let mode = std::mem::take(&mut self.mode);
        match mode {
            SelectionMode::Idle => false,
            SelectionMode::Selecting { anchor, .. } => {
                let region = Region::from_points(anchor, p);
                if region.meets_minimum(self.limits.min_size) {
                    self.region = Some(region);
                    self.selected = true;
                } else {
                    trace!("selection {:?} below minimum, discarded", region);
                    self.clear();
                }
                true
            }
            SelectionMode::Resizing { .. } | SelectionMode::Moving { .. } => {
                self.selected = self.region.is_some();
                true
            }
        }
    }

    /// Applies a one-pixel arrow nudge to the last adjusted handle.
    ///
    /// Handle nudges that would shrink the region below the minimum size
    /// are dropped. Returns the new region when something changed.
    pub fn nudge(&mut self, direction: Nudge) -> Option<Region> {
        if self.is_dragging() {
            return None;
        }
        let current = self.selected_region()?;
        let (dx, dy) = direction.delta();
        let nudged = current.nudged(self.last_adjust, dx, dy);
        if self.last_adjust != Handle::Inside && !nudged.meets_minimum(self.limits.min_size) {
            return None;
        }
        self.replace(nudged).then_some(nudged)
    }

    fn replace(&mut self, region: Region) -> bool {
        let changed = self.region != Some(region);
        self.region = Some(region);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    fn selected(x1: i32, y1: i32, x2: i32, y2: i32) -> SelectionStateMachine {
        let mut sm = SelectionStateMachine::new(SelectionLimits::default());
        sm.pointer_down(p(x1, y1));
        sm.pointer_move(p(x2, y2));
        sm.pointer_up(p(x2, y2));
        sm
    }

    #[test]
    fn drag_creates_normalized_region() {
        let mut sm = SelectionStateMachine::new(SelectionLimits::default());
        assert!(matches!(sm.pointer_down(p(400, 300)), SelectionMode::Selecting { .. }));
        assert!(sm.pointer_move(p(100, 100)));
        assert_eq!(sm.region(), Some(Region::new(100, 100, 400, 300)));
        assert!(!sm.is_selected());
        sm.pointer_up(p(100, 100));
        assert_eq!(sm.selected_region(), Some(Region::new(100, 100, 400, 300)));
        assert_eq!(sm.mode(), SelectionMode::Idle);
    }

    #[test]
    fn tiny_selection_is_discarded() {
        let sm = selected(50, 50, 55, 52);
        assert_eq!(sm.region(), None);
        assert!(!sm.is_selected());
    }

    #[test]
    fn narrow_but_tall_selection_is_discarded() {
        let sm = selected(50, 50, 59, 300);
        assert_eq!(sm.region(), None);
    }

    #[test]
    fn click_outside_starts_new_selection() {
        let mut sm = selected(100, 100, 400, 300);
        assert!(matches!(sm.pointer_down(p(600, 600)), SelectionMode::Selecting { .. }));
        assert!(!sm.is_selected());
        assert_eq!(sm.region(), Some(Region::new(600, 600, 600, 600)));
    }

    #[test]
    fn resize_moves_only_owned_edges() {
        let mut sm = selected(100, 100, 400, 300);
        assert!(matches!(
            sm.pointer_down(p(100, 200)),
            SelectionMode::Resizing { handle: Handle::Left, .. }
        ));
        sm.pointer_move(p(60, 250));
        assert_eq!(sm.region(), Some(Region::new(60, 100, 400, 300)));
        sm.pointer_up(p(60, 250));
        assert_eq!(sm.last_adjust(), Handle::Left);
        assert_eq!(sm.selected_region(), Some(Region::new(60, 100, 400, 300)));
    }

    #[test]
    fn resize_below_minimum_is_rejected() {
        let mut sm = selected(100, 100, 400, 300);
        sm.pointer_down(p(400, 300));
        assert!(sm.pointer_move(p(200, 200)));
        assert!(!sm.pointer_move(p(105, 200)));
        assert_eq!(sm.region(), Some(Region::new(100, 100, 200, 200)));
    }

    #[test]
    fn move_preserves_size_and_offset() {
        let mut sm = selected(100, 100, 400, 300);
        assert!(matches!(sm.pointer_down(p(150, 150)), SelectionMode::Moving { .. }));
        sm.pointer_move(p(160, 170));
        assert_eq!(sm.region(), Some(Region::new(110, 120, 410, 320)));
        sm.pointer_move(p(20, 30));
        let r = sm.region().unwrap();
        assert_eq!((r.width(), r.height()), (300, 200));
        assert_eq!(r.top_left(), p(-30, -20));
        sm.pointer_up(p(20, 30));
        assert_eq!(sm.last_adjust(), Handle::Inside);
    }

    #[test]
    fn nudge_defaults_to_translation() {
        let mut sm = selected(100, 100, 400, 300);
        assert_eq!(sm.nudge(Nudge::Down), Some(Region::new(100, 101, 400, 301)));
    }

    #[test]
    fn nudge_follows_last_handle() {
        let mut sm = selected(100, 100, 400, 300);
        sm.pointer_down(p(101, 99));
        sm.pointer_up(p(101, 99));
        assert_eq!(sm.last_adjust(), Handle::TopLeft);
        assert_eq!(sm.nudge(Nudge::Left), Some(Region::new(99, 100, 400, 300)));
        // Vertical nudge moves the same corner.
        assert_eq!(sm.nudge(Nudge::Up), Some(Region::new(99, 99, 400, 300)));
    }

    #[test]
    fn nudge_respects_minimum_size() {
        let mut sm = SelectionStateMachine::new(SelectionLimits {
            min_size: 10,
            handle_threshold: 3,
        });
        sm.load(Region::new(100, 100, 110, 200));
        sm.pointer_down(p(110, 150));
        sm.pointer_up(p(110, 150));
        assert_eq!(sm.last_adjust(), Handle::Right);
        assert_eq!(sm.nudge(Nudge::Left), None);
        assert_eq!(sm.region(), Some(Region::new(100, 100, 110, 200)));
    }

    #[test]
    fn nudge_without_selection_is_noop() {
        let mut sm = SelectionStateMachine::new(SelectionLimits::default());
        assert_eq!(sm.nudge(Nudge::Left), None);
    }

    #[test]
    fn load_marks_selected_and_idle() {
        let mut sm = SelectionStateMachine::new(SelectionLimits::default());
        sm.pointer_down(p(5, 5));
        sm.load(Region::new(10, 10, 50, 50));
        assert_eq!(sm.mode(), SelectionMode::Idle);
        assert_eq!(sm.selected_region(), Some(Region::new(10, 10, 50, 50)));
    }
}
