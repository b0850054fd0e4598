use super::camera_app::CameraApp;
use crate::constraints::{parse_frame_rate, parse_resolution};
use crate::error::{Result, SurfaceError};
use crate::still::StillCapture;
use crate::surface::{ElementId, EventKind, Handler};
use futures::FutureExt;
use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Wrap an app method as a page listener. The page only holds a weak
/// reference so a dropped app does not outlive its page.
fn listener<F, Fut>(app: &Arc<CameraApp>, f: F) -> Handler
where
    F: Fn(Arc<CameraApp>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let app: Weak<CameraApp> = Arc::downgrade(app);
    Arc::new(move |_event| match app.upgrade() {
        Some(app) => f(app).boxed(),
        None => async { Ok(()) }.boxed(),
    })
}

impl CameraApp {
    pub(super) fn bind_controls(self: &Arc<Self>) {
        let bindings: [(ElementId, EventKind, Handler); 8] = [
            (
                ElementId::StillCaptureButton,
                EventKind::Click,
                listener(self, |app| async move { app.take_still_photo().await }),
            ),
            (
                ElementId::SnapshotButton,
                EventKind::Click,
                listener(self, |app| async move { app.take_snapshot().await }),
            ),
            (
                ElementId::StartButton,
                EventKind::Click,
                listener(self, |app| async move { app.start_recording() }),
            ),
            (
                ElementId::StopButton,
                EventKind::Click,
                listener(self, |app| async move { app.stop_recording() }),
            ),
            (
                ElementId::CameraSelector,
                EventKind::Change,
                listener(self, |app| async move { app.change_camera().await }),
            ),
            (
                ElementId::FrameRateInput,
                EventKind::Input,
                listener(self, |app| async move { app.mirror_frame_rate() }),
            ),
            (
                ElementId::FrameRateInput,
                EventKind::Change,
                listener(self, |app| async move { app.change_frame_rate().await }),
            ),
            (
                ElementId::ResolutionSelector,
                EventKind::Change,
                listener(self, |app| async move { app.change_resolution().await }),
            ),
        ];

        for (id, kind, handler) in bindings {
            self.surface.add_event_listener(id, kind, handler);
        }
        debug!("Page controls bound");
    }

    pub async fn take_still_photo(&self) -> Result<()> {
        let camera = self.sessions.image_capture()?;
        self.stills
            .take(StillCapture::HardwarePhoto, camera.as_ref())
            .await
    }

    pub async fn take_snapshot(&self) -> Result<()> {
        let camera = self.sessions.image_capture()?;
        let mode = StillCapture::FrameGrab {
            jpeg_quality: self.config.capture.jpeg_quality,
        };
        self.stills.take(mode, camera.as_ref()).await
    }

    pub fn start_recording(&self) -> Result<()> {
        self.recording.start()
    }

    pub fn stop_recording(&self) -> Result<()> {
        self.recording.stop()
    }

    pub async fn change_camera(&self) -> Result<()> {
        let device_id = self.control_value(ElementId::CameraSelector)?;
        info!("Switching to camera {}", device_id);
        self.constraints.lock().select_device(device_id);
        self.connect_camera().await
    }

    pub async fn change_frame_rate(&self) -> Result<()> {
        let value = self.control_value(ElementId::FrameRateInput)?;
        let frame_rate = parse_frame_rate(&value)?;
        info!("Changing frame rate to {}", frame_rate);
        self.constraints.lock().set_frame_rate(frame_rate);
        self.connect_camera().await
    }

    pub async fn change_resolution(&self) -> Result<()> {
        let value = self.control_value(ElementId::ResolutionSelector)?;
        let (width, height) = parse_resolution(&value)?;
        info!("Changing resolution to {}x{}", width, height);
        self.constraints.lock().set_resolution(width, height);
        self.connect_camera().await
    }

    /// Show the frame-rate slider value while it is being dragged
    pub fn mirror_frame_rate(&self) -> Result<()> {
        let value = self.control_value(ElementId::FrameRateInput)?;
        self.surface.set_text(ElementId::FrameRateValue, &value);
        Ok(())
    }

    fn control_value(&self, id: ElementId) -> Result<String> {
        self.surface
            .value(id)
            .ok_or_else(|| SurfaceError::MissingValue { element: id.to_string() }.into())
    }
}
