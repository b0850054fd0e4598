use crate::config::CameraConfig;
use crate::error::SurfaceError;
use crate::platform::MediaConstraints;
use serde::{Deserialize, Serialize};

/// Parameters requested for a capture session.
///
/// Width and height only change together through [`CaptureConstraints::set_resolution`].
/// Any change means the device session has to be acquired again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    selected_device_id: Option<String>,
    width: u32,
    height: u32,
    frame_rate: f64,
    audio_enabled: bool,
}

impl CaptureConstraints {
    pub fn new(width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            selected_device_id: None,
            width,
            height,
            frame_rate,
            audio_enabled: false,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            selected_device_id: config.device_id.clone(),
            width: config.resolution.0,
            height: config.resolution.1,
            frame_rate: config.frame_rate,
            audio_enabled: config.audio,
        }
    }

    pub fn selected_device_id(&self) -> Option<&str> {
        self.selected_device_id.as_deref()
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn select_device(&mut self, device_id: impl Into<String>) {
        self.selected_device_id = Some(device_id.into());
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn set_frame_rate(&mut self, frame_rate: f64) {
        self.frame_rate = frame_rate;
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }

    /// Host-facing constraint set: exact width/height, ideal device id.
    pub fn to_media_constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio: self.audio_enabled,
            device_id: self.selected_device_id.clone(),
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
        }
    }
}

/// Parse a resolution option value of the form `"<width> <height>"`.
pub fn parse_resolution(value: &str) -> Result<(u32, u32), SurfaceError> {
    let invalid = |details: &str| SurfaceError::InvalidValue {
        element: "camera-resolution".to_string(),
        value: value.to_string(),
        details: details.to_string(),
    };

    let mut parts = value.split(' ');
    let width = parts.next().ok_or_else(|| invalid("missing width"))?;
    let height = parts.next().ok_or_else(|| invalid("missing height"))?;
    if parts.next().is_some() {
        return Err(invalid("expected exactly two numbers"));
    }

    let width: u32 = width.parse().map_err(|_| invalid("width is not a number"))?;
    let height: u32 = height
        .parse()
        .map_err(|_| invalid("height is not a number"))?;

    if width == 0 || height == 0 {
        return Err(invalid("dimensions must be positive"));
    }

    Ok((width, height))
}

/// Parse a frame-rate input value into a positive number.
pub fn parse_frame_rate(value: &str) -> Result<f64, SurfaceError> {
    let rate: f64 = value
        .trim()
        .parse()
        .map_err(|_| SurfaceError::InvalidValue {
            element: "frame-rate-input".to_string(),
            value: value.to_string(),
            details: "not a number".to_string(),
        })?;

    if !(rate > 0.0) || !rate.is_finite() {
        return Err(SurfaceError::InvalidValue {
            element: "frame-rate-input".to_string(),
            value: value.to_string(),
            details: "frame rate must be positive".to_string(),
        });
    }

    Ok(rate)
}
