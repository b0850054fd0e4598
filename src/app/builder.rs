use super::camera_app::CameraApp;
use crate::config::AppConfig;
use crate::constraints::CaptureConstraints;
use crate::download::{DownloadSink, DownloadTarget};
use crate::error::{Result, WebcamError};
use crate::platform::{MediaHost, ObjectUrls, RecorderOptions};
use crate::recording::RecordingController;
use crate::session::SessionManager;
use crate::still::StillCaptureAdapter;
use crate::surface::ControlSurface;
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Builder wiring a [`CameraApp`] to its host, page and download target
pub struct CameraAppBuilder {
    config: Option<AppConfig>,
    host: Option<Arc<dyn MediaHost>>,
    surface: Option<Arc<dyn ControlSurface>>,
    target: Option<Arc<dyn DownloadTarget>>,
    urls: Option<Arc<ObjectUrls>>,
}

impl CameraAppBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            host: None,
            surface: None,
            target: None,
            urls: None,
        }
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn host(mut self, host: Arc<dyn MediaHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn surface(mut self, surface: Arc<dyn ControlSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn download_target(mut self, target: Arc<dyn DownloadTarget>) -> Self {
        self.target = Some(target);
        self
    }

    /// Share an object URL registry with the download target
    pub fn object_urls(mut self, urls: Arc<ObjectUrls>) -> Self {
        self.urls = Some(urls);
        self
    }

    pub fn build(self) -> Result<Arc<CameraApp>> {
        let config = self.config.unwrap_or_default();
        let host = self
            .host
            .ok_or_else(|| WebcamError::system("A media host must be specified"))?;
        let surface = self
            .surface
            .ok_or_else(|| WebcamError::system("A control surface must be specified"))?;
        let target = self
            .target
            .ok_or_else(|| WebcamError::system("A download target must be specified"))?;
        let urls = self.urls.unwrap_or_default();

        let sink = Arc::new(DownloadSink::new(
            Arc::clone(&urls),
            target,
            config.capture.timestamp_timezone.as_deref(),
        ));

        let recording = Arc::new(RecordingController::new(
            Arc::clone(&surface),
            Arc::clone(&sink),
            Arc::clone(&urls),
            config.capture.video_prefix.clone(),
            Duration::from_millis(config.recording.timer_interval_ms),
            config.recording.timeslice_ms.map(Duration::from_millis),
        ));

        let sessions = SessionManager::new(
            host.clone(),
            Arc::clone(&surface),
            Arc::clone(&recording),
            RecorderOptions {
                mime_type: config.recording.mime_type.clone(),
            },
        );

        let stills = StillCaptureAdapter::new(
            Arc::clone(&surface),
            sink,
            config.capture.photo_prefix.clone(),
        );

        let constraints = CaptureConstraints::from_config(&config.camera);

        Ok(Arc::new(CameraApp {
            config,
            host,
            surface,
            urls,
            sessions,
            recording,
            stills,
            constraints: Mutex::new(constraints),
            init_done: AtomicBool::new(false),
        }))
    }
}

impl Default for CameraAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
