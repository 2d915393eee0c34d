use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use image::{Rgba, RgbaImage};

use regioncap::capture::{
    CaptureError, CaptureJob, CaptureOutput, ClipboardPayload, ClipboardSink, OutputKind, SaveDialog,
    SaveSuggestion,
};
use regioncap::history::HistoryNavigator;
use regioncap::input::{InputHandler, KeyInput, ModifierState, SessionAction};
use regioncap::selection::SelectionMode;
use regioncap::selection_logic::{Point, Region};
use regioncap::session::{CaptureSession, SessionSettings};

#[derive(Clone, Default)]
struct Clipboard(Rc<RefCell<Vec<ClipboardPayload>>>);

impl ClipboardSink for Clipboard {
    fn set_image(&mut self, payload: &ClipboardPayload) -> Result<(), CaptureError> {
        self.0.borrow_mut().push(payload.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Dialog {
    calls: Rc<RefCell<Vec<(RgbaImage, SaveSuggestion)>>>,
    answer: Option<PathBuf>,
}

impl SaveDialog for Dialog {
    fn save_image(
        &mut self,
        image: &RgbaImage,
        suggestion: &SaveSuggestion,
    ) -> Result<Option<PathBuf>, CaptureError> {
        self.calls
            .borrow_mut()
            .push((image.clone(), suggestion.clone()));
        Ok(self.answer.clone())
    }
}

/// 800x600 frame where each pixel encodes its own coordinates, so crops can
/// be checked against the source box.
fn frame() -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_fn(800, 600, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, (x / 256 + y / 256 * 4) as u8, 255])
    }))
}

fn key(session: &mut CaptureSession<'_>, key: KeyInput) -> SessionAction {
    session.on_key(key, ModifierState::default(), Instant::now())
}

fn drag(session: &mut CaptureSession<'_>, from: (i32, i32), to: (i32, i32)) {
    session.on_pointer_down(Point::new(from.0, from.1));
    session.on_pointer_move(Point::new(to.0, to.1));
    session.on_pointer_up(Point::new(to.0, to.1));
}

fn expect_job(action: SessionAction) -> CaptureJob {
    match action {
        SessionAction::Deliver(job) => job,
        other => panic!("expected a capture job, got {:?}", other),
    }
}

#[test]
fn drag_then_enter_saves_exact_box() {
    let mut history = HistoryNavigator::new();
    let clipboard = Clipboard::default();
    let dialog = Dialog {
        answer: Some(PathBuf::from("/tmp/shots/a.png")),
        ..Dialog::default()
    };
    let mut output = CaptureOutput::new(
        Box::new(clipboard.clone()),
        Box::new(dialog.clone()),
        PathBuf::from("/home/user/Downloads"),
        true,
    );

    let mut session = CaptureSession::new(&mut history, frame(), SessionSettings::default());
    drag(&mut session, (100, 100), (400, 300));
    assert_eq!(session.region(), Some(Region::new(100, 100, 400, 300)));

    let job = expect_job(key(&mut session, KeyInput::Enter));
    assert_eq!(job.kind, OutputKind::Save);
    drop(session);
    assert_eq!(history.entries(), &[Region::new(100, 100, 400, 300)]);
    assert_eq!(history.cursor(), Some(0));

    let saved = output.deliver(&job).unwrap();
    assert_eq!(saved, Some(PathBuf::from("/tmp/shots/a.png")));
    let calls = dialog.calls.borrow();
    assert_eq!(calls.len(), 1);
    let (image, suggestion) = &calls[0];
    assert_eq!(image.dimensions(), (300, 200));
    assert_eq!(image.get_pixel(0, 0), &Rgba([100, 100, 0, 255]));
    assert_eq!(image.get_pixel(299, 199), &Rgba([143, 43, 5, 255]));
    assert_eq!(suggestion.directory, PathBuf::from("/home/user/Downloads"));
    assert!(suggestion.file_name.starts_with("screenshot_"));
    assert_eq!(clipboard.0.borrow().len(), 1);
    assert_eq!(output.save_dir(), Path::new("/tmp/shots"));
}

#[test]
fn backspace_with_single_entry_stays_put() {
    let mut history = HistoryNavigator::new();
    let mut session = CaptureSession::new(&mut history, frame(), SessionSettings::default());
    drag(&mut session, (100, 100), (400, 300));
    expect_job(key(&mut session, KeyInput::Enter));

    key(&mut session, KeyInput::Backspace);
    assert_eq!(session.region(), Some(Region::new(100, 100, 400, 300)));
    assert_eq!(session.history().cursor(), Some(0));
}

#[test]
fn history_steps_between_committed_regions() {
    let a = Region::new(100, 100, 400, 300);
    let b = Region::new(200, 150, 500, 450);
    let mut history = HistoryNavigator::new();
    let mut session = CaptureSession::new(&mut history, frame(), SessionSettings::default());

    drag(&mut session, (100, 100), (400, 300));
    expect_job(key(&mut session, KeyInput::Escape));
    // Start a fresh selection outside the current one.
    drag(&mut session, (500, 450), (200, 150));
    assert_eq!(session.region(), Some(b));
    expect_job(key(&mut session, KeyInput::Escape));

    key(&mut session, KeyInput::Backspace);
    assert_eq!(session.region(), Some(a));
    key(&mut session, KeyInput::Tab);
    assert_eq!(session.region(), Some(b));
}

#[test]
fn history_wraps_both_ways() {
    let a = Region::new(0, 0, 50, 50);
    let b = Region::new(100, 100, 150, 150);
    let c = Region::new(200, 200, 250, 250);
    let mut history = HistoryNavigator::from_entries(vec![a, b, c]);
    let mut session = CaptureSession::new(&mut history, frame(), SessionSettings::default());
    assert_eq!(session.region(), Some(c));

    key(&mut session, KeyInput::Tab);
    assert_eq!(session.region(), Some(a));
    key(&mut session, KeyInput::Backspace);
    assert_eq!(session.region(), Some(c));
}

#[test]
fn tiny_selection_is_discarded() {
    let mut history = HistoryNavigator::new();
    let mut session = CaptureSession::new(&mut history, frame(), SessionSettings::default());
    drag(&mut session, (50, 50), (55, 52));
    assert_eq!(session.region(), None);
    assert!(!session.selection().is_selected());
    assert!(matches!(key(&mut session, KeyInput::Enter), SessionAction::Continue));
    drop(session);
    assert!(history.is_empty());
}

#[test]
fn left_arrow_moves_top_left_corner() {
    let mut history = HistoryNavigator::new();
    let mut session = CaptureSession::new(&mut history, frame(), SessionSettings::default());
    drag(&mut session, (100, 100), (400, 300));
    // Grab the top-left corner without moving it.
    session.on_pointer_down(Point::new(100, 100));
    assert!(matches!(
        session.selection().mode(),
        SelectionMode::Resizing { .. }
    ));
    session.on_pointer_up(Point::new(100, 100));

    key(&mut session, KeyInput::Left);
    assert_eq!(session.region(), Some(Region::new(99, 100, 400, 300)));
}

#[test]
fn escape_copies_dib_payload() {
    let mut history = HistoryNavigator::new();
    let clipboard = Clipboard::default();
    let dialog = Dialog::default();
    let mut output = CaptureOutput::new(
        Box::new(clipboard.clone()),
        Box::new(dialog.clone()),
        PathBuf::from("."),
        true,
    );
    let mut session = CaptureSession::new(&mut history, frame(), SessionSettings::default());
    drag(&mut session, (10, 20), (42, 36));
    let job = expect_job(key(&mut session, KeyInput::Escape));
    assert_eq!(job.kind, OutputKind::Copy);

    assert_eq!(output.deliver(&job).unwrap(), None);
    assert!(dialog.calls.borrow().is_empty());
    let payloads = clipboard.0.borrow();
    let payload = &payloads[0];
    assert_eq!((payload.width(), payload.height()), (32, 16));
    // BITMAPINFOHEADER size field leads the DIB.
    assert_eq!(&payload.dib().unwrap()[..4], &40u32.to_le_bytes());
}

#[test]
fn next_session_restores_last_capture() {
    let mut history = HistoryNavigator::new();
    {
        let mut session = CaptureSession::new(&mut history, frame(), SessionSettings::default());
        drag(&mut session, (100, 100), (400, 300));
        expect_job(key(&mut session, KeyInput::Enter));
    }
    let session = CaptureSession::new(&mut history, frame(), SessionSettings::default());
    assert_eq!(
        session.selection().selected_region(),
        Some(Region::new(100, 100, 400, 300))
    );
}
