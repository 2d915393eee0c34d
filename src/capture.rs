//! Turning a committed region into output.
//!
//! The region is cropped out of the frozen screenshot and handed either to
//! the clipboard (as a header-stripped BMP, i.e. a DIB, on Windows) or to a
//! save dialog together with a timestamped default file name.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(windows)]
use std::thread;
#[cfg(windows)]
use std::time::Duration;

use arboard::{Clipboard, ImageData};
use chrono::{DateTime, Local};
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::{info, warn};

use crate::selection_logic::Region;

/// Length of the BMP file header that precedes the DIB.
pub const BMP_FILE_HEADER_LEN: usize = 14;

#[cfg(windows)]
const CLIPBOARD_OPEN_ATTEMPTS: usize = 5;
#[cfg(windows)]
const CLIPBOARD_RETRY_DELAY: Duration = Duration::from_millis(2);

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Region {0:?} does not overlap the screenshot")]
    OutOfBounds(Region),

    #[error("BMP encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("Saving {path} failed: {reason}")]
    SaveFailed { path: PathBuf, reason: String },
}

/// What the user asked for when the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Save,
    Copy,
}

/// A committed region together with the screenshot it was drawn on.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    pub kind: OutputKind,
    pub region: Region,
    pub frame: Arc<RgbaImage>,
}

impl CaptureJob {
    pub fn crop(&self) -> Result<RgbaImage, CaptureError> {
        crop_region(&self.frame, self.region)
    }
}

/// Crops `region` out of `frame`, clipped to the frame's bounds.
pub fn crop_region(frame: &RgbaImage, region: Region) -> Result<RgbaImage, CaptureError> {
    let clipped = region
        .clip_to(frame.width(), frame.height())
        .ok_or(CaptureError::OutOfBounds(region))?;
    Ok(image::imageops::crop_imm(
        frame,
        clipped.x1() as u32,
        clipped.y1() as u32,
        clipped.width() as u32,
        clipped.height() as u32,
    )
    .to_image())
}

/// Clipboard-ready image. Sinks pick the representation they need: raw
/// RGBA pixels, or the DIB that is only encoded when asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    image: RgbaImage,
}

impl ClipboardPayload {
    pub fn new(image: RgbaImage) -> Self {
        ClipboardPayload { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn rgba(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// The picture in CF_DIB layout.
    pub fn dib(&self) -> Result<Vec<u8>, CaptureError> {
        encode_dib(&self.image)
    }
}

/// Encodes `image` as a 24-bit BMP and drops the 14-byte file header,
/// leaving the BITMAPINFOHEADER and pixel rows.
pub fn encode_dib(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut bmp = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut bmp), ImageFormat::Bmp)
        .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
    if bmp.len() <= BMP_FILE_HEADER_LEN || &bmp[..2] != b"BM" {
        return Err(CaptureError::EncodingFailed("unexpected BMP layout".into()));
    }
    Ok(bmp.split_off(BMP_FILE_HEADER_LEN))
}

/// `screenshot_YYYYmmdd_HHMMSS.png`.
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("screenshot_{}.png", now.format("%Y%m%d_%H%M%S"))
}

/// Where the clipboard payload goes.
pub trait ClipboardSink {
    fn set_image(&mut self, payload: &ClipboardPayload) -> Result<(), CaptureError>;
}

/// Defaults shown in the save dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSuggestion {
    pub file_name: String,
    pub directory: PathBuf,
}

/// Modal save dialog. Returns the written path, or `None` when cancelled.
pub trait SaveDialog {
    fn save_image(
        &mut self,
        image: &RgbaImage,
        suggestion: &SaveSuggestion,
    ) -> Result<Option<PathBuf>, CaptureError>;
}

/// System clipboard. On Windows the DIB goes straight in as CF_DIB and
/// arboard is only the fallback; elsewhere arboard takes the RGBA pixels.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn set_image(&mut self, payload: &ClipboardPayload) -> Result<(), CaptureError> {
        #[cfg(windows)]
        {
            match payload.dib().and_then(|dib| set_clipboard_dib(&dib)) {
                Ok(()) => return Ok(()),
                Err(e) => warn!("CF_DIB write failed, retrying through arboard: {}", e),
            }
        }
        set_clipboard_rgba(payload)
    }
}

fn set_clipboard_rgba(payload: &ClipboardPayload) -> Result<(), CaptureError> {
    let mut clipboard = Clipboard::new().map_err(|e| CaptureError::Clipboard(e.to_string()))?;
    let image_data = ImageData {
        width: payload.width() as usize,
        height: payload.height() as usize,
        bytes: payload.rgba().into(),
    };
    clipboard
        .set_image(image_data)
        .map_err(|e| CaptureError::Clipboard(e.to_string()))?;
    Ok(())
}

/// Replaces the clipboard contents with `dib` as CF_DIB.
#[cfg(windows)]
fn set_clipboard_dib(dib: &[u8]) -> Result<(), CaptureError> {
    use std::ptr;

    use windows_sys::Win32::Foundation::{GlobalFree, HGLOBAL};
    use windows_sys::Win32::System::DataExchange::{
        CloseClipboard, EmptyClipboard, OpenClipboard, SetClipboardData,
    };
    use windows_sys::Win32::System::Memory::{GMEM_MOVEABLE, GlobalAlloc, GlobalLock, GlobalUnlock};

    const CF_DIB: u32 = 8;

    // Another process may hold the clipboard for a moment.
    for _ in 0..CLIPBOARD_OPEN_ATTEMPTS {
        if unsafe { OpenClipboard(ptr::null_mut()) } == 0 {
            thread::sleep(CLIPBOARD_RETRY_DELAY);
            continue;
        }

        let mut hmem: HGLOBAL = ptr::null_mut();
        let mut written = false;
        unsafe {
            if EmptyClipboard() != 0 {
                hmem = GlobalAlloc(GMEM_MOVEABLE, dib.len());
                if !hmem.is_null() {
                    let dst = GlobalLock(hmem) as *mut u8;
                    if !dst.is_null() {
                        ptr::copy_nonoverlapping(dib.as_ptr(), dst, dib.len());
                        let _ = GlobalUnlock(hmem);
                        if !SetClipboardData(CF_DIB, hmem).is_null() {
                            // The clipboard owns the memory now.
                            hmem = ptr::null_mut();
                            written = true;
                        }
                    }
                }
            }
            if !hmem.is_null() {
                let _ = GlobalFree(hmem);
            }
            let _ = CloseClipboard();
        }
        return if written {
            Ok(())
        } else {
            Err(CaptureError::Clipboard("SetClipboardData(CF_DIB) failed".into()))
        };
    }
    Err(CaptureError::Clipboard("clipboard is held by another process".into()))
}

/// Native save dialog through rfd.
#[derive(Debug, Default)]
pub struct FileSaveDialog;

impl SaveDialog for FileSaveDialog {
    fn save_image(
        &mut self,
        image: &RgbaImage,
        suggestion: &SaveSuggestion,
    ) -> Result<Option<PathBuf>, CaptureError> {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save Screenshot")
            .set_directory(&suggestion.directory)
            .set_file_name(&suggestion.file_name)
            .add_filter("PNG Image", &["png"])
            .add_filter("JPEG Image", &["jpg", "jpeg"])
            .add_filter("All Files", &["*"])
            .save_file()
        else {
            return Ok(None);
        };
        let path = with_default_extension(path);
        write_image(image, &path)?;
        Ok(Some(path))
    }
}

fn with_default_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension("png")
    }
}

/// Writes `image`, choosing the format from the extension. JPEG has no
/// alpha channel, so everything is saved as RGB.
pub fn write_image(image: &RgbaImage, path: &Path) -> Result<(), CaptureError> {
    DynamicImage::ImageRgba8(image.clone())
        .to_rgb8()
        .save(path)
        .map_err(|e| CaptureError::SaveFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Delivers capture jobs to the clipboard and save-dialog collaborators.
///
/// Lives for the whole process so the last save directory carries over
/// from one session to the next.
pub struct CaptureOutput {
    clipboard: Box<dyn ClipboardSink>,
    dialog: Box<dyn SaveDialog>,
    save_dir: PathBuf,
    copy_on_save: bool,
}

impl CaptureOutput {
    pub fn new(
        clipboard: Box<dyn ClipboardSink>,
        dialog: Box<dyn SaveDialog>,
        save_dir: PathBuf,
        copy_on_save: bool,
    ) -> Self {
        CaptureOutput {
            clipboard,
            dialog,
            save_dir,
            copy_on_save,
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn deliver(&mut self, job: &CaptureJob) -> Result<Option<PathBuf>, CaptureError> {
        match job.kind {
            OutputKind::Copy => self.copy(job).map(|()| None),
            OutputKind::Save => self.save(job),
        }
    }

    pub fn copy(&mut self, job: &CaptureJob) -> Result<(), CaptureError> {
        let payload = ClipboardPayload::new(job.crop()?);
        self.clipboard.set_image(&payload)?;
        info!("copied {}x{} region to clipboard", payload.width(), payload.height());
        Ok(())
    }

    pub fn save(&mut self, job: &CaptureJob) -> Result<Option<PathBuf>, CaptureError> {
        let image = job.crop()?;
        if self.copy_on_save {
            let payload = ClipboardPayload::new(image.clone());
            if let Err(e) = self.clipboard.set_image(&payload) {
                warn!("clipboard copy before save failed: {}", e);
            }
        }

        let suggestion = SaveSuggestion {
            file_name: default_file_name(Local::now()),
            directory: self.save_dir.clone(),
        };
        let saved = self.dialog.save_image(&image, &suggestion)?;
        if let Some(path) = &saved {
            info!("saved capture to {}", path.display());
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                self.save_dir = parent.to_path_buf();
            }
        }
        Ok(saved)
    }
}
