//! Software painter for the overlay window. Pixels are 0RGB `u32`, the
//! format minifb expects.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::RgbaImage;

use crate::magnifier::MagnifierView;
use crate::overlay::{Anchor, HELP_BACKGROUND, HELP_TEXT_COLOR, HelpPanel, Label, OverlayScene};
use crate::selection_logic::{Point, Region};

const GLYPH: i32 = 8;
const LINE_GAP: i32 = 4;
const MAGNIFIER_BORDER: i32 = 3;
const MAGNIFIER_BORDER_COLOR: u32 = 0x00FF_FFFF;

pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Converts the frozen screenshot into the window's pixel format.
pub fn backdrop_from(image: &RgbaImage) -> Vec<u32> {
    image
        .pixels()
        .map(|p| pack_rgb(p[0], p[1], p[2]))
        .collect()
}

/// Halves each channel.
fn dim(pix: u32) -> u32 {
    (pix >> 1) & 0x007F_7F7F
}

/// Size of a text block in pixels, before rotation.
pub fn text_extent(text: &str, scale: u32) -> (i32, i32) {
    let s = scale.max(1) as i32;
    let lines = text.lines().count().max(1) as i32;
    let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as i32;
    let width = longest * GLYPH * s;
    let height = lines * GLYPH * s + (lines - 1) * LINE_GAP;
    (width, height)
}

pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Framebuffer {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    /// Paints one frame: backdrop, masks, labels, help panel, magnifier.
    pub fn compose(
        &mut self,
        backdrop: &[u32],
        scene: &OverlayScene,
        magnifier: Option<&MagnifierView>,
    ) {
        let n = self.pixels.len().min(backdrop.len());
        self.pixels[..n].copy_from_slice(&backdrop[..n]);

        for mask in &scene.masks {
            self.dim_rect(*mask);
        }
        for label in &scene.labels {
            self.draw_label(label);
        }
        if let Some(help) = &scene.help {
            self.draw_help(help);
        }
        if let Some(view) = magnifier {
            self.draw_magnifier(view);
        }
    }

    /// Clips `r` to the buffer; `None` when nothing is left.
    fn clip(&self, r: Region) -> Option<(usize, usize, usize, usize)> {
        let r = r.clip_to(self.width as u32, self.height as u32)?;
        Some((r.x1() as usize, r.y1() as usize, r.x2() as usize, r.y2() as usize))
    }

    fn dim_rect(&mut self, r: Region) {
        let Some((x1, y1, x2, y2)) = self.clip(r) else {
            return;
        };
        for y in y1..y2 {
            let base = y * self.width;
            for pix in &mut self.pixels[base + x1..base + x2] {
                *pix = dim(*pix);
            }
        }
    }

    pub fn fill_rect(&mut self, r: Region, color: u32) {
        let Some((x1, y1, x2, y2)) = self.clip(r) else {
            return;
        };
        for y in y1..y2 {
            let base = y * self.width;
            self.pixels[base + x1..base + x2].fill(color);
        }
    }

    fn put(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = color;
        }
    }

    fn draw_label(&mut self, label: &Label) {
        let (w, h) = text_extent(&label.text, label.scale);
        let (bw, bh) = if label.rotated { (h, w) } else { (w, h) };
        let origin = anchored(label.at, label.anchor, bw, bh);
        self.draw_text(&label.text, origin, label.scale, label.color, label.rotated);
    }

    /// Draws `text` with its (unrotated) top-left at `origin`. A rotated
    /// block keeps `origin` as the top-left of its rotated box.
    fn draw_text(&mut self, text: &str, origin: Point, scale: u32, color: u32, rotated: bool) {
        let s = scale.max(1) as i32;
        let (block_w, _) = text_extent(text, scale);
        for (row, line) in text.lines().enumerate() {
            let line_y = row as i32 * (GLYPH * s + LINE_GAP);
            for (col, ch) in line.chars().enumerate() {
                let Some(glyph) = BASIC_FONTS.get(ch) else {
                    continue;
                };
                let glyph_x = col as i32 * GLYPH * s;
                for (gy, bits) in glyph.iter().enumerate() {
                    for gx in 0..GLYPH {
                        if bits & (1 << gx) == 0 {
                            continue;
                        }
                        for sy in 0..s {
                            for sx in 0..s {
                                let tx = glyph_x + gx * s + sx;
                                let ty = line_y + gy as i32 * s + sy;
                                let (px, py) = if rotated {
                                    (ty, block_w - 1 - tx)
                                } else {
                                    (tx, ty)
                                };
                                self.put(origin.x + px, origin.y + py, color);
                            }
                        }
                    }
                }
            }
        }
    }

    fn draw_help(&mut self, help: &HelpPanel) {
        let (w, h) = text_extent(help.text, help.scale);
        let origin = anchored(help.center, Anchor::Center, w, h);
        let p = help.padding;
        self.fill_rect(
            Region::new(origin.x - p, origin.y - p, origin.x + w + p, origin.y + h + p),
            HELP_BACKGROUND,
        );
        self.draw_text(help.text, origin, help.scale, HELP_TEXT_COLOR, false);
    }

    fn draw_magnifier(&mut self, view: &MagnifierView) {
        let (w, h) = view.image.dimensions();
        let at = view.position;
        let b = MAGNIFIER_BORDER;
        self.fill_rect(
            Region::new(at.x - b, at.y - b, at.x + w as i32 + b, at.y + h as i32 + b),
            MAGNIFIER_BORDER_COLOR,
        );
        for (x, y, p) in view.image.enumerate_pixels() {
            self.put(at.x + x as i32, at.y + y as i32, pack_rgb(p[0], p[1], p[2]));
        }
    }
}

fn anchored(at: Point, anchor: Anchor, w: i32, h: i32) -> Point {
    match anchor {
        Anchor::Center => Point::new(at.x - w / 2, at.y - h / 2),
        Anchor::NorthWest => at,
        Anchor::NorthEast => Point::new(at.x - w, at.y),
        Anchor::SouthWest => Point::new(at.x, at.y - h),
        Anchor::SouthEast => Point::new(at.x - w, at.y - h),
    }
}
