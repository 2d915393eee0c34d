//! Zoomed preview of the frozen screenshot around a focus point.
//!
//! The magnifier samples a square box of `size / zoom` pixels centered on the
//! focus point, shifts it back inside the bitmap when it would cross an edge,
//! scales it up with nearest-neighbor sampling and marks the focus point with
//! a crosshair. It is placed beside the pointer and flips to the other side
//! near the screen edges.

use std::time::{Duration, Instant};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::selection_logic::{Point, Region};

/// Distance between the focus point and the magnifier's near corner.
pub const MAGNIFIER_OFFSET: i32 = 30;
/// Extra room kept free at the screen edge before the magnifier flips.
pub const MAGNIFIER_EDGE_MARGIN: i32 = 50;
/// Half-length of each crosshair arm, in magnifier pixels.
pub const CROSSHAIR_HALF_LENGTH: i32 = 12;
const CROSSHAIR_THICKNESS: i32 = 2;
const CROSSHAIR_DOT_RADIUS: i32 = 2;

const CROSSHAIR_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const DOT_OUTLINE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagnifierSettings {
    /// Side of the magnified image in pixels.
    pub size: u32,
    /// Integer zoom factor.
    pub zoom: u32,
    /// How long a keyboard-triggered magnifier stays up.
    pub hide_delay: Duration,
}

impl Default for MagnifierSettings {
    fn default() -> Self {
        MagnifierSettings {
            size: 180,
            zoom: 3,
            hide_delay: Duration::from_millis(500),
        }
    }
}

impl MagnifierSettings {
    /// Side of the sampled source box.
    pub fn source_side(&self) -> u32 {
        (self.size / self.zoom.max(1)).max(1)
    }
}

/// A rendered magnifier frame.
#[derive(Debug, Clone)]
pub struct MagnifierView {
    /// `size x size` zoomed pixels with the crosshair already drawn.
    pub image: RgbaImage,
    /// Focus point that was magnified.
    pub focus: Point,
    /// Box sampled from the bitmap, always inside its bounds.
    pub source: Region,
    /// Crosshair center inside `image`.
    pub crosshair: Point,
    /// Top-left corner of the magnifier on screen.
    pub position: Point,
}

/// Source box of side `side` centered on `focus`, shifted (never shrunk) to
/// stay within `[0, width) x [0, height)`. Only a bitmap smaller than the
/// box forces it to shrink to the bitmap's extent.
pub fn source_box(focus: Point, side: u32, width: u32, height: u32) -> Region {
    let axis = |center: i32, extent: u32| -> (i32, i32) {
        let extent = i32::try_from(extent).unwrap_or(i32::MAX);
        let side = i32::try_from(side).unwrap_or(i32::MAX).min(extent);
        let start = (center - side / 2).clamp(0, extent - side);
        (start, start + side)
    };
    let (x1, x2) = axis(focus.x, width);
    let (y1, y2) = axis(focus.y, height);
    Region::new(x1, y1, x2, y2)
}

/// Screen position of the magnifier's top-left corner: below-right of the
/// focus point, flipped above/left on each axis that would overflow.
pub fn placement(focus: Point, size: u32, screen_width: u32, screen_height: u32) -> Point {
    let size = i32::try_from(size).unwrap_or(i32::MAX);
    let axis = |f: i32, extent: u32| -> i32 {
        let extent = i32::try_from(extent).unwrap_or(i32::MAX);
        let near = f + MAGNIFIER_OFFSET;
        if near + size + MAGNIFIER_EDGE_MARGIN > extent {
            f - size - MAGNIFIER_OFFSET
        } else {
            near
        }
    };
    Point::new(axis(focus.x, screen_width), axis(focus.y, screen_height))
}

/// Renders the magnifier for `focus` over `frame`.
pub fn render(settings: &MagnifierSettings, frame: &RgbaImage, focus: Point) -> MagnifierView {
    let (width, height) = frame.dimensions();
    let focus = Point::new(
        focus.x.clamp(0, width.saturating_sub(1) as i32),
        focus.y.clamp(0, height.saturating_sub(1) as i32),
    );
    let source = source_box(focus, settings.source_side(), width, height);

    let crop = imageops::crop_imm(
        frame,
        source.x1() as u32,
        source.y1() as u32,
        source.width() as u32,
        source.height() as u32,
    )
    .to_image();
    let mut image = imageops::resize(&crop, settings.size, settings.size, FilterType::Nearest);

    let zoom = settings.zoom.max(1) as i32;
    let crosshair = Point::new(
        (focus.x - source.x1()) * zoom,
        (focus.y - source.y1()) * zoom,
    );
    draw_crosshair(&mut image, crosshair);

    MagnifierView {
        image,
        focus,
        source,
        crosshair,
        position: placement(focus, settings.size, width, height),
    }
}

fn draw_crosshair(image: &mut RgbaImage, c: Point) {
    let half_thick = CROSSHAIR_THICKNESS / 2;
    for d in -CROSSHAIR_HALF_LENGTH..=CROSSHAIR_HALF_LENGTH {
        for t in -half_thick..(CROSSHAIR_THICKNESS - half_thick) {
            put(image, c.x + t, c.y + d, CROSSHAIR_COLOR);
            put(image, c.x + d, c.y + t, CROSSHAIR_COLOR);
        }
    }
    let r = CROSSHAIR_DOT_RADIUS;
    for dy in -r - 1..=r + 1 {
        for dx in -r - 1..=r + 1 {
            let dist2 = dx * dx + dy * dy;
            if dist2 <= r * r {
                put(image, c.x + dx, c.y + dy, CROSSHAIR_COLOR);
            } else if dist2 <= (r + 1) * (r + 1) {
                put(image, c.x + dx, c.y + dy, DOT_OUTLINE_COLOR);
            }
        }
    }
}

fn put(image: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// Visibility and timing around [`render`].
#[derive(Debug, Clone, Default)]
pub struct MagnifierController {
    settings: MagnifierSettings,
    view: Option<MagnifierView>,
    hide_at: Option<Instant>,
}

impl MagnifierController {
    pub fn new(settings: MagnifierSettings) -> Self {
        MagnifierController {
            settings,
            view: None,
            hide_at: None,
        }
    }

    pub fn view(&self) -> Option<&MagnifierView> {
        self.view.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.view.is_some()
    }

    /// Shows the magnifier until it is hidden explicitly.
    pub fn show_at(&mut self, frame: &RgbaImage, focus: Point) {
        self.view = Some(render(&self.settings, frame, focus));
        self.hide_at = None;
    }

    /// Shows the magnifier and (re)arms the idle timeout.
    pub fn show_briefly(&mut self, frame: &RgbaImage, focus: Point, now: Instant) {
        self.view = Some(render(&self.settings, frame, focus));
        self.hide_at = Some(now + self.settings.hide_delay);
    }

    /// Returns whether anything was visible.
    pub fn hide(&mut self) -> bool {
        self.hide_at = None;
        self.view.take().is_some()
    }

    /// Hides the magnifier once the idle timeout has passed. Returns
    /// whether it was hidden by this call.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if now >= deadline => self.hide(),
            _ => false,
        }
    }
}
