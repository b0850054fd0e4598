use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    /// May be empty when the host withholds labels
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Constraint set handed to the host when opening or refining a stream.
///
/// Width and height are exact requirements; the device id is a preference.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub device_id: Option<String>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRange {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoCapabilities {
    pub image_width: ValueRange,
    pub image_height: ValueRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSettings {
    pub image_width: u32,
    pub image_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
}

/// Notifications emitted by a recorder, in order.
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    Started,
    DataAvailable(Artifact),
    Stopped,
}

/// Encoded image or video bytes tagged with their MIME type.
///
/// Cloning shares the underlying buffer; the content never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    mime_type: String,
    data: Bytes,
}

impl Artifact {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
