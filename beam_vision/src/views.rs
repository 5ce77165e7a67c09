// THEORY:
// Debug views are a flag-driven routing layer. Key presses flip flags in
// `ViewToggles`; once per frame the `ViewRouter` compares the flags with the
// windows it knows to be open and issues the minimum set of show/destroy calls
// to a `WindowSink`. The sink is the only part that touches a GUI toolkit, so
// the routing rules are tested here with a recording sink.

use crate::core_modules::frame::Frame;
use crate::pipeline::DebugBuffers;
use image::GrayImage;
use std::fmt;

pub const MAIN_WINDOW: &str = "Final Frame";

/// Number of auxiliary debug windows.
pub const VIEW_COUNT: usize = 5;

/// One of the auxiliary debug windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugView {
    Grayscale,
    Blurred,
    Threshold,
    RedMask,
    RedOverlay,
}

impl DebugView {
    pub const ALL: [DebugView; VIEW_COUNT] = [
        DebugView::Grayscale,
        DebugView::Blurred,
        DebugView::Threshold,
        DebugView::RedMask,
        DebugView::RedOverlay,
    ];

    pub fn index(self) -> usize {
        match self {
            DebugView::Grayscale => 0,
            DebugView::Blurred => 1,
            DebugView::Threshold => 2,
            DebugView::RedMask => 3,
            DebugView::RedOverlay => 4,
        }
    }

    /// Window title.
    pub fn title(self) -> &'static str {
        match self {
            DebugView::Grayscale => "Grayscale",
            DebugView::Blurred => "Blurred",
            DebugView::Threshold => "Thresholded Bright Spots",
            DebugView::RedMask => "Red Mask (Tail Lamps)",
            DebugView::RedOverlay => "Red Light Overlay",
        }
    }

    /// Short name used in the key help and snapshot file names.
    pub fn name(self) -> &'static str {
        match self {
            DebugView::Grayscale => "Grayscale",
            DebugView::Blurred => "Blurred",
            DebugView::Threshold => "Bright Spot Threshold",
            DebugView::RedMask => "Red Mask",
            DebugView::RedOverlay => "Red Overlay",
        }
    }

    pub fn key(self) -> char {
        match self {
            DebugView::Grayscale => '1',
            DebugView::Blurred => '2',
            DebugView::Threshold => '3',
            DebugView::RedMask => '4',
            DebugView::RedOverlay => '5',
        }
    }

    pub fn select(self, buffers: &DebugBuffers) -> ViewImage<'_> {
        match self {
            DebugView::Grayscale => ViewImage::Gray(&buffers.gray),
            DebugView::Blurred => ViewImage::Gray(&buffers.blurred),
            DebugView::Threshold => ViewImage::Gray(&buffers.threshold),
            DebugView::RedMask => ViewImage::Gray(&buffers.red_mask),
            DebugView::RedOverlay => ViewImage::Color(&buffers.red_overlay),
        }
    }
}

impl fmt::Display for DebugView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// The image behind a debug view.
#[derive(Debug, Clone, Copy)]
pub enum ViewImage<'a> {
    Gray(&'a GrayImage),
    Color(&'a Frame),
}

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Toggle(DebugView),
    Snapshot,
    Quit,
}

impl KeyCommand {
    /// Decodes the raw code returned by a key poll. Only the low byte is
    /// significant; "no key" (-1) and unknown keys decode to `None`.
    pub fn from_key(code: i32) -> Option<Self> {
        let byte = (code & 0xFF) as u8;
        match byte as char {
            'q' => Some(KeyCommand::Quit),
            's' => Some(KeyCommand::Snapshot),
            c => DebugView::ALL
                .into_iter()
                .find(|view| view.key() == c)
                .map(KeyCommand::Toggle),
        }
    }
}

/// Lines printed at startup describing the keyboard controls.
pub fn key_help() -> Vec<String> {
    let mut lines: Vec<String> = DebugView::ALL
        .iter()
        .map(|view| format!("[i] Press {}: Toggle {}", view.key(), view.name()))
        .collect();
    lines.push("[i] Press S to save a snapshot of the debug views".to_string());
    lines.push("[i] Press Q to quit".to_string());
    lines
}

/// Which debug views the user asked to see. All off initially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewToggles {
    enabled: [bool; VIEW_COUNT],
}

impl ViewToggles {
    pub fn toggle(&mut self, view: DebugView) -> bool {
        let flag = &mut self.enabled[view.index()];
        *flag = !*flag;
        *flag
    }

    pub fn is_enabled(&self, view: DebugView) -> bool {
        self.enabled[view.index()]
    }

    pub fn enabled_views(&self) -> impl Iterator<Item = DebugView> + '_ {
        DebugView::ALL.into_iter().filter(|view| self.is_enabled(*view))
    }
}

/// Something that can put images in named windows.
pub trait WindowSink {
    type Error: fmt::Display;

    /// Shows `image` in the window `title`, creating the window if needed.
    fn show(&mut self, title: &str, image: ViewImage<'_>) -> Result<(), Self::Error>;

    /// Closes the window `title`.
    fn destroy(&mut self, title: &str) -> Result<(), Self::Error>;
}

/// Keeps the set of open debug windows in line with the toggles.
#[derive(Debug, Default)]
pub struct ViewRouter {
    open: [bool; VIEW_COUNT],
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, view: DebugView) -> bool {
        self.open[view.index()]
    }

    /// Shows every enabled view and closes windows whose view was switched
    /// off. Show errors propagate; destroy errors are logged and ignored.
    pub fn route<S: WindowSink>(
        &mut self,
        toggles: &ViewToggles,
        buffers: &DebugBuffers,
        sink: &mut S,
    ) -> Result<(), S::Error> {
        for view in DebugView::ALL {
            if toggles.is_enabled(view) {
                sink.show(view.title(), view.select(buffers))?;
                self.open[view.index()] = true;
            } else if self.is_open(view) {
                self.close(view, sink);
            }
        }
        Ok(())
    }

    /// Closes every debug window this router opened.
    pub fn close_all<S: WindowSink>(&mut self, sink: &mut S) {
        for view in DebugView::ALL {
            if self.is_open(view) {
                self.close(view, sink);
            }
        }
    }

    fn close<S: WindowSink>(&mut self, view: DebugView, sink: &mut S) {
        if let Err(err) = sink.destroy(view.title()) {
            log::debug!("ignoring failure to close '{}': {}", view.title(), err);
        }
        self.open[view.index()] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::classifier::DecisionMode;
    use crate::pipeline::BeamPipeline;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Show(String),
        Destroy(String),
    }

    /// Records calls; destroying an unknown window fails like a real GUI would.
    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<Call>,
        windows: Vec<String>,
    }

    impl WindowSink for RecordingSink {
        type Error = String;

        fn show(&mut self, title: &str, _image: ViewImage<'_>) -> Result<(), String> {
            self.calls.push(Call::Show(title.to_string()));
            if !self.windows.iter().any(|w| w == title) {
                self.windows.push(title.to_string());
            }
            Ok(())
        }

        fn destroy(&mut self, title: &str) -> Result<(), String> {
            self.calls.push(Call::Destroy(title.to_string()));
            let before = self.windows.len();
            self.windows.retain(|w| w != title);
            if self.windows.len() == before {
                Err(format!("no window named {title}"))
            } else {
                Ok(())
            }
        }
    }

    fn buffers() -> DebugBuffers {
        let frame = Frame::filled(32, 24, [0, 0, 0]).unwrap();
        BeamPipeline::with_defaults(DecisionMode::Contour)
            .process(&frame)
            .unwrap()
            .buffers
    }

    #[test]
    fn keys_decode_to_commands() {
        assert_eq!(
            KeyCommand::from_key('1' as i32),
            Some(KeyCommand::Toggle(DebugView::Grayscale))
        );
        assert_eq!(
            KeyCommand::from_key('5' as i32),
            Some(KeyCommand::Toggle(DebugView::RedOverlay))
        );
        assert_eq!(KeyCommand::from_key('q' as i32), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key('s' as i32), Some(KeyCommand::Snapshot));
        assert_eq!(KeyCommand::from_key(-1), None);
        assert_eq!(KeyCommand::from_key('x' as i32), None);
        // High bits from modifier keys are ignored.
        assert_eq!(KeyCommand::from_key(0x10_0000 | 'q' as i32), Some(KeyCommand::Quit));
    }

    #[test]
    fn help_lists_every_view_and_quit() {
        let help = key_help();
        assert_eq!(help[0], "[i] Press 1: Toggle Grayscale");
        assert_eq!(help[2], "[i] Press 3: Toggle Bright Spot Threshold");
        assert_eq!(help.last().map(String::as_str), Some("[i] Press Q to quit"));
    }

    #[test]
    fn toggles_start_off_and_flip() {
        let mut toggles = ViewToggles::default();
        assert_eq!(toggles.enabled_views().count(), 0);
        assert!(toggles.toggle(DebugView::RedMask));
        assert_eq!(toggles.enabled_views().collect::<Vec<_>>(), vec![DebugView::RedMask]);
        assert!(!toggles.toggle(DebugView::RedMask));
    }

    #[test]
    fn toggle_on_then_off_destroys_window_once() {
        let buffers = buffers();
        let mut toggles = ViewToggles::default();
        let mut router = ViewRouter::new();
        let mut sink = RecordingSink::default();

        toggles.toggle(DebugView::Blurred);
        router.route(&toggles, &buffers, &mut sink).unwrap();
        toggles.toggle(DebugView::Blurred);
        router.route(&toggles, &buffers, &mut sink).unwrap();
        router.route(&toggles, &buffers, &mut sink).unwrap();

        assert_eq!(
            sink.calls,
            vec![
                Call::Show("Blurred".to_string()),
                Call::Destroy("Blurred".to_string()),
            ]
        );
        assert!(sink.windows.is_empty());
        assert!(!router.is_open(DebugView::Blurred));
    }

    #[test]
    fn enabled_views_are_refreshed_every_frame() {
        let buffers = buffers();
        let mut toggles = ViewToggles::default();
        toggles.toggle(DebugView::Threshold);
        toggles.toggle(DebugView::RedOverlay);
        let mut router = ViewRouter::new();
        let mut sink = RecordingSink::default();

        router.route(&toggles, &buffers, &mut sink).unwrap();
        router.route(&toggles, &buffers, &mut sink).unwrap();

        let shows = sink.calls.iter().filter(|c| matches!(c, Call::Show(_))).count();
        assert_eq!(shows, 4);
        assert_eq!(sink.windows.len(), 2);
    }

    #[test]
    fn destroy_failure_is_ignored() {
        let buffers = buffers();
        let mut toggles = ViewToggles::default();
        let mut router = ViewRouter::new();
        let mut sink = RecordingSink::default();

        toggles.toggle(DebugView::Grayscale);
        router.route(&toggles, &buffers, &mut sink).unwrap();
        // The user closed the window by hand.
        sink.windows.clear();
        toggles.toggle(DebugView::Grayscale);

        assert!(router.route(&toggles, &buffers, &mut sink).is_ok());
        assert!(!router.is_open(DebugView::Grayscale));
    }

    #[test]
    fn close_all_only_touches_open_windows() {
        let buffers = buffers();
        let mut toggles = ViewToggles::default();
        toggles.toggle(DebugView::RedMask);
        let mut router = ViewRouter::new();
        let mut sink = RecordingSink::default();

        router.route(&toggles, &buffers, &mut sink).unwrap();
        router.close_all(&mut sink);

        assert_eq!(sink.calls.last(), Some(&Call::Destroy("Red Mask (Tail Lamps)".to_string())));
        assert_eq!(sink.calls.len(), 2);
    }
}
