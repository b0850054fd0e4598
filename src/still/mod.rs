//! Point-in-time photo capture.

mod render;

pub use render::{bitmap_to_jpeg, draw_letterboxed, letterbox, Placement, JPEG_MIME_TYPE};

use crate::download::DownloadSink;
use crate::error::{CaptureError, Result};
use crate::platform::{Artifact, ImageCapture, PhotoSettings};
use crate::surface::{ControlSurface, ElementId};
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, info};

/// How a still is obtained from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StillCapture {
    /// Full-resolution capture through the camera's photo pipeline
    HardwarePhoto,
    /// Snapshot of the live preview frame, encoded locally
    FrameGrab { jpeg_quality: u8 },
}

/// Encoded still plus the bitmap used for on-page display.
pub struct CapturedStill {
    pub artifact: Artifact,
    pub bitmap: RgbaImage,
}

/// A still taken from the camera but not necessarily encoded yet.
pub struct GrabbedStill {
    pub bitmap: RgbaImage,
    encoded: Option<Artifact>,
}

impl StillCapture {
    /// Take the picture. Hardware photos arrive encoded, frame grabs do not.
    pub async fn grab(&self, camera: &dyn ImageCapture) -> Result<GrabbedStill> {
        match *self {
            StillCapture::HardwarePhoto => {
                let caps = camera.photo_capabilities().await?;
                let settings = PhotoSettings {
                    image_width: caps.image_width.max,
                    image_height: caps.image_height.max,
                };
                debug!(
                    "Taking photo at {}x{}",
                    settings.image_width, settings.image_height
                );

                let artifact = camera.take_photo(settings).await?;
                if artifact.is_empty() {
                    return Err(CaptureError::EmptyEncode {
                        mime_type: artifact.mime_type().to_string(),
                    }
                    .into());
                }

                let bitmap = image::load_from_memory(artifact.data())
                    .map_err(|e| CaptureError::Decode {
                        details: e.to_string(),
                    })?
                    .to_rgba8();

                Ok(GrabbedStill {
                    bitmap,
                    encoded: Some(artifact),
                })
            }
            StillCapture::FrameGrab { .. } => Ok(GrabbedStill {
                bitmap: camera.grab_frame().await?,
                encoded: None,
            }),
        }
    }

    pub fn encode(&self, grabbed: GrabbedStill) -> Result<CapturedStill> {
        let quality = match *self {
            StillCapture::FrameGrab { jpeg_quality } => jpeg_quality,
            StillCapture::HardwarePhoto => 100,
        };
        let artifact = match grabbed.encoded {
            Some(artifact) => artifact,
            None => bitmap_to_jpeg(&grabbed.bitmap, quality)?,
        };
        Ok(CapturedStill {
            artifact,
            bitmap: grabbed.bitmap,
        })
    }

    pub async fn capture(&self, camera: &dyn ImageCapture) -> Result<CapturedStill> {
        let grabbed = self.grab(camera).await?;
        self.encode(grabbed)
    }
}

/// Captures a still, shows it on the photo canvas and downloads it.
pub struct StillCaptureAdapter {
    surface: Arc<dyn ControlSurface>,
    sink: Arc<DownloadSink>,
    prefix: String,
}

impl StillCaptureAdapter {
    pub fn new(
        surface: Arc<dyn ControlSurface>,
        sink: Arc<DownloadSink>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            surface,
            sink,
            prefix: prefix.into(),
        }
    }

    /// Draws before encoding, so the canvas shows the still even when
    /// encoding fails.
    pub async fn take(&self, mode: StillCapture, camera: &dyn ImageCapture) -> Result<()> {
        let grabbed = mode.grab(camera).await?;

        let canvas_size = self.surface.canvas_size(ElementId::PhotoOutput);
        self.surface.put_canvas(
            ElementId::PhotoOutput,
            draw_letterboxed(canvas_size, &grabbed.bitmap),
        );

        let still = mode.encode(grabbed)?;
        info!(
            "Captured {:?} still {}x{} ({} bytes)",
            mode,
            still.bitmap.width(),
            still.bitmap.height(),
            still.artifact.len()
        );

        self.sink.save(&still.artifact, &self.prefix).await;
        Ok(())
    }
}
