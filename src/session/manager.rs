use crate::constraints::CaptureConstraints;
use crate::error::{PlatformError, Result};
use crate::platform::{ImageCapture, MediaHost, MediaRecorder, MediaStream, RecorderOptions};
use crate::recording::RecordingController;
use crate::surface::{ControlSurface, ElementId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A live camera stream and the capture handles derived from it.
pub struct DeviceSession {
    stream: Arc<dyn MediaStream>,
    image_capture: Arc<dyn ImageCapture>,
    recorder: Arc<dyn MediaRecorder>,
}

impl DeviceSession {
    pub fn stream(&self) -> &Arc<dyn MediaStream> {
        &self.stream
    }

    pub fn image_capture(&self) -> Arc<dyn ImageCapture> {
        Arc::clone(&self.image_capture)
    }

    pub fn recorder(&self) -> Arc<dyn MediaRecorder> {
        Arc::clone(&self.recorder)
    }

    /// Stop every track of the stream
    fn stop(&self) {
        for track in self.stream.tracks() {
            track.stop();
        }
        debug!("Stopped all tracks of stream {}", self.stream.id());
    }
}

/// Owns the single live [`DeviceSession`] and replaces it whenever the
/// capture constraints change.
///
/// The busy indicator (`web-loader`) is shown as soon as an acquisition is
/// requested and hidden once the last pending acquisition has attached its
/// stream to the preview. A failed acquisition leaves it shown.
pub struct SessionManager {
    host: Arc<dyn MediaHost>,
    surface: Arc<dyn ControlSurface>,
    recording: Arc<RecordingController>,
    recorder_options: RecorderOptions,
    current: Mutex<Option<Arc<DeviceSession>>>,
    acquire_lock: tokio::sync::Mutex<()>,
    pending: AtomicUsize,
}

impl SessionManager {
    pub fn new(
        host: Arc<dyn MediaHost>,
        surface: Arc<dyn ControlSurface>,
        recording: Arc<RecordingController>,
        recorder_options: RecorderOptions,
    ) -> Self {
        Self {
            host,
            surface,
            recording,
            recorder_options,
            current: Mutex::new(None),
            acquire_lock: tokio::sync::Mutex::new(()),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> Option<Arc<DeviceSession>> {
        self.current.lock().clone()
    }

    pub fn image_capture(&self) -> Result<Arc<dyn ImageCapture>> {
        self.current()
            .map(|session| session.image_capture())
            .ok_or_else(|| {
                PlatformError::InvalidState {
                    details: "no active camera session".to_string(),
                }
                .into()
            })
    }

    /// Open a session for `constraints`, stopping the previous one first.
    ///
    /// Host failures are returned exactly as the host reported them.
    pub async fn acquire(&self, constraints: &CaptureConstraints) -> Result<Arc<DeviceSession>> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.surface.set_displayed(ElementId::WebLoader, true);

        let result = {
            let _guard = self.acquire_lock.lock().await;
            self.connect(constraints).await
        };

        let remaining = self.pending.fetch_sub(1, Ordering::SeqCst) - 1;
        match &result {
            Ok(_) if remaining == 0 => {
                self.surface.set_displayed(ElementId::WebLoader, false);
            }
            Ok(_) => debug!("{} acquisition(s) still pending", remaining),
            Err(e) => warn!("Camera acquisition failed: {}", e),
        }

        result
    }

    /// Stop the current session, if any
    pub fn release(&self) {
        if let Some(session) = self.current.lock().take() {
            session.stop();
            self.surface.set_source_stream(ElementId::CameraImage, None);
            info!("Camera session released");
        }
    }

    async fn connect(&self, constraints: &CaptureConstraints) -> Result<Arc<DeviceSession>> {
        if let Some(previous) = self.current.lock().take() {
            previous.stop();
        }

        let media = constraints.to_media_constraints();
        let stream = self.host.get_user_media(&media).await?;
        self.surface
            .set_source_stream(ElementId::CameraImage, Some(stream.id().to_string()));

        let track = stream
            .video_tracks()
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotFound {
                details: "stream has no video track".to_string(),
            })?;

        let image_capture = self.host.image_capture(Arc::clone(&track))?;
        let (recorder, events) = self
            .host
            .media_recorder(Arc::clone(&stream), &self.recorder_options)?;
        self.recording.attach(Arc::clone(&recorder), events);

        let session = Arc::new(DeviceSession {
            stream,
            image_capture,
            recorder,
        });
        *self.current.lock() = Some(Arc::clone(&session));

        // Some hosts only honour constraints once the track is live
        track.apply_constraints(&media).await?;

        let (width, height) = constraints.resolution();
        info!(
            "Camera session {} ready ({}x{} @ {}fps)",
            session.stream().id(),
            width,
            height,
            constraints.frame_rate()
        );

        Ok(session)
    }
}
