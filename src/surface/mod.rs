//! Page controls the app binds to, abstracted away from any real DOM.

mod page;
mod sink;

pub use page::HeadlessPage;
pub use sink::ErrorSink;

use crate::error::Result;
use crate::platform::ObjectUrl;
use async_trait::async_trait;
use futures::future::BoxFuture;
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

/// Identified elements of the camera page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    WebLoader,
    CameraImage,
    VideoOutput,
    CameraSelector,
    FrameRateInput,
    FrameRateValue,
    ResolutionSelector,
    StartButton,
    StopButton,
    StillCaptureButton,
    SnapshotButton,
    RecordingTimer,
    PhotoOutput,
}

impl ElementId {
    pub const ALL: [ElementId; 13] = [
        ElementId::WebLoader,
        ElementId::CameraImage,
        ElementId::VideoOutput,
        ElementId::CameraSelector,
        ElementId::FrameRateInput,
        ElementId::FrameRateValue,
        ElementId::ResolutionSelector,
        ElementId::StartButton,
        ElementId::StopButton,
        ElementId::StillCaptureButton,
        ElementId::SnapshotButton,
        ElementId::RecordingTimer,
        ElementId::PhotoOutput,
    ];

    /// DOM id of the element
    pub fn dom_id(&self) -> &'static str {
        match self {
            ElementId::WebLoader => "web-loader",
            ElementId::CameraImage => "camera-image",
            ElementId::VideoOutput => "video-output",
            ElementId::CameraSelector => "change-camera-selection",
            ElementId::FrameRateInput => "frame-rate-input",
            ElementId::FrameRateValue => "frame-rate-value",
            ElementId::ResolutionSelector => "camera-resolution",
            ElementId::StartButton => "start-button",
            ElementId::StopButton => "stop-button",
            ElementId::StillCaptureButton => "take-still-capturing-button",
            ElementId::SnapshotButton => "take-snapshot-button",
            ElementId::RecordingTimer => "recording-timer-display",
            ElementId::PhotoOutput => "photo-output",
        }
    }

    pub fn from_dom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|element| element.dom_id() == id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dom_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    /// Value committed
    Change,
    /// Value edited, not yet committed
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub target: ElementId,
    pub kind: EventKind,
}

impl ControlEvent {
    pub fn new(target: ElementId, kind: EventKind) -> Self {
        Self { target, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

pub type HandlerFuture = BoxFuture<'static, Result<()>>;

/// Event listener; the returned future runs until its first suspension
/// inside `dispatch` and continues in the background afterwards.
pub type Handler = Arc<dyn Fn(ControlEvent) -> HandlerFuture + Send + Sync>;

/// Control surface of the camera page.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    fn is_displayed(&self, id: ElementId) -> bool;

    fn set_displayed(&self, id: ElementId, displayed: bool);

    fn value(&self, id: ElementId) -> Option<String>;

    fn set_value(&self, id: ElementId, value: &str);

    fn text(&self, id: ElementId) -> Option<String>;

    fn set_text(&self, id: ElementId, text: &str);

    fn options(&self, id: ElementId) -> Vec<SelectOption>;

    fn clear_options(&self, id: ElementId);

    fn append_option(&self, id: ElementId, option: SelectOption);

    /// Attach (or detach) a live stream to a preview element
    fn set_source_stream(&self, id: ElementId, stream_id: Option<String>);

    fn source_stream(&self, id: ElementId) -> Option<String>;

    fn canvas_size(&self, id: ElementId) -> (u32, u32);

    fn put_canvas(&self, id: ElementId, image: RgbaImage);

    fn canvas(&self, id: ElementId) -> Option<RgbaImage>;

    fn media_source(&self, id: ElementId) -> Option<ObjectUrl>;

    fn set_media_source(&self, id: ElementId, url: Option<ObjectUrl>);

    /// Reload a media element from its current source
    fn load_media(&self, id: ElementId);

    fn add_event_listener(&self, id: ElementId, kind: EventKind, handler: Handler);

    async fn dispatch(&self, event: ControlEvent);

    async fn click(&self, id: ElementId) {
        self.dispatch(ControlEvent::new(id, EventKind::Click)).await
    }
}
