//! Overlay scene: the dim mask around the selection, the coordinate and size
//! labels, and the help panel.
//!
//! The renderer holds no drawing state from earlier frames. Each
//! [`OverlayRenderer::redraw`] throws the previous scene away and builds a new
//! one from the region, which `raster` then paints.

use crate::selection_logic::{Point, Region};

pub const CORNER_LABEL_COLOR: u32 = 0x00FF_FF00;
pub const SIZE_LABEL_COLOR: u32 = 0x0000_FFFF;
pub const HELP_TEXT_COLOR: u32 = 0x00FF_FFFF;
pub const HELP_BACKGROUND: u32 = 0x0000_0000;

const CORNER_LABEL_OFFSET: i32 = 5;
const SIZE_LABEL_OFFSET: i32 = 10;
pub const LABEL_SCALE: u32 = 2;
pub const HELP_PADDING: i32 = 20;

pub const HELP_TEXT: &str = "\
Screen Capture - Keyboard Shortcuts

Select Area: Click and drag
Move Selection: Click inside and drag
Resize: Click corners/edges and drag

Arrow Keys: Adjust selection
Backspace: Previous capture
Tab: Next capture
I: Toggle info display
H: Toggle this help
Enter: Save to file
ESC: Copy to clipboard
Ctrl+C: Quit
PrtSc or Ctrl+Shift+4: Start capture";

/// Which point of the text box sits on the label's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub at: Point,
    pub anchor: Anchor,
    pub color: u32,
    /// Rotated 90 degrees counter-clockwise (reads bottom to top).
    pub rotated: bool,
    pub scale: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpPanel {
    pub text: &'static str,
    pub center: Point,
    pub padding: i32,
    pub scale: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayScene {
    /// Dimmed areas, never overlapping and never zero-area.
    pub masks: Vec<Region>,
    pub labels: Vec<Label>,
    pub help: Option<HelpPanel>,
}

#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    width: i32,
    height: i32,
    show_info: bool,
    show_help: bool,
    scene: OverlayScene,
}

impl OverlayRenderer {
    pub fn new(width: u32, height: u32, show_info: bool) -> Self {
        OverlayRenderer {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
            show_info,
            show_help: false,
            scene: OverlayScene::default(),
        }
    }

    pub fn scene(&self) -> &OverlayScene {
        &self.scene
    }

    pub fn toggle_info(&mut self) -> bool {
        self.show_info = !self.show_info;
        self.show_info
    }

    pub fn toggle_help(&mut self) -> bool {
        self.show_help = !self.show_help;
        self.scene.help = self.help_panel();
        self.show_help
    }

    /// Rebuilds the whole scene. Without a region the entire screen is dimmed.
    pub fn redraw(&mut self, region: Option<Region>) -> &OverlayScene {
        self.scene = OverlayScene {
            masks: match region {
                Some(r) => self.masks_around(r),
                None => self.full_mask(),
            },
            labels: match region {
                Some(r) if self.show_info => info_labels(r),
                _ => Vec::new(),
            },
            help: self.help_panel(),
        };
        &self.scene
    }

    fn full_mask(&self) -> Vec<Region> {
        let screen = Region::new(0, 0, self.width, self.height);
        if screen.is_empty() { vec![] } else { vec![screen] }
    }

    fn masks_around(&self, r: Region) -> Vec<Region> {
        let (w, h) = (self.width, self.height);
        // Clamp the hole to the screen so a region dragged partly off-screen
        // still leaves a consistent frame.
        let x1 = r.x1().clamp(0, w);
        let x2 = r.x2().clamp(0, w);
        let y1 = r.y1().clamp(0, h);
        let y2 = r.y2().clamp(0, h);
        [
            Region::new(0, 0, w, y1),
            Region::new(0, y2, w, h),
            Region::new(0, y1, x1, y2),
            Region::new(x2, y1, w, y2),
        ]
        .into_iter()
        .filter(|m| !m.is_empty())
        .collect()
    }

    fn help_panel(&self) -> Option<HelpPanel> {
        self.show_help.then(|| HelpPanel {
            text: HELP_TEXT,
            center: Point::new(self.width / 2, self.height / 2),
            padding: HELP_PADDING,
            scale: LABEL_SCALE,
        })
    }
}

fn info_labels(r: Region) -> Vec<Label> {
    let corner = |x: i32, y: i32, dx: i32, dy: i32, anchor: Anchor| Label {
        text: format!("({}, {})", x, y),
        at: Point::new(x + dx, y + dy),
        anchor,
        color: CORNER_LABEL_COLOR,
        rotated: false,
        scale: LABEL_SCALE,
    };
    let size = |text: String, at: Point, rotated: bool| Label {
        text,
        at,
        anchor: Anchor::Center,
        color: SIZE_LABEL_COLOR,
        rotated,
        scale: LABEL_SCALE,
    };

    let off = CORNER_LABEL_OFFSET;
    let mid_x = (r.x1() + r.x2()) / 2;
    let mid_y = (r.y1() + r.y2()) / 2;
    let width_text = format!("W: {}px", r.width());
    let height_text = format!("H: {}px", r.height());

    vec![
        corner(r.x1(), r.y1(), -off, -off, Anchor::SouthEast),
        corner(r.x2(), r.y1(), off, -off, Anchor::SouthWest),
        corner(r.x1(), r.y2(), -off, off, Anchor::NorthEast),
        corner(r.x2(), r.y2(), off, off, Anchor::NorthWest),
        size(width_text.clone(), Point::new(mid_x, r.y1() - SIZE_LABEL_OFFSET), false),
        size(width_text, Point::new(mid_x, r.y2() + SIZE_LABEL_OFFSET), false),
        size(height_text.clone(), Point::new(r.x1() - SIZE_LABEL_OFFSET, mid_y), true),
        size(height_text, Point::new(r.x2() + SIZE_LABEL_OFFSET, mid_y), true),
    ]
}
