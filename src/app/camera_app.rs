use crate::config::AppConfig;
use crate::constraints::CaptureConstraints;
use crate::error::Result;
use crate::platform::{DeviceKind, MediaHost, ObjectUrls};
use crate::recording::RecordingController;
use crate::session::SessionManager;
use crate::still::StillCaptureAdapter;
use crate::surface::{ControlSurface, ElementId, ErrorSink, SelectOption};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// The camera page: binds page controls to session, still capture,
/// recording and download handling.
pub struct CameraApp {
    pub(super) config: AppConfig,
    pub(super) host: Arc<dyn MediaHost>,
    pub(super) surface: Arc<dyn ControlSurface>,
    pub(super) urls: Arc<ObjectUrls>,
    pub(super) sessions: SessionManager,
    pub(super) recording: Arc<RecordingController>,
    pub(super) stills: StillCaptureAdapter,
    pub(super) constraints: Mutex<CaptureConstraints>,
    pub(super) init_done: AtomicBool,
}

impl CameraApp {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn surface(&self) -> &Arc<dyn ControlSurface> {
        &self.surface
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn recording(&self) -> &RecordingController {
        &self.recording
    }

    pub fn object_urls(&self) -> &Arc<ObjectUrls> {
        &self.urls
    }

    pub fn constraints(&self) -> CaptureConstraints {
        self.constraints.lock().clone()
    }

    /// True once handlers are bound and the first session is up
    pub fn is_init_done(&self) -> bool {
        self.init_done.load(Ordering::SeqCst)
    }

    /// Bind every control, then initialise the camera and device list
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        info!("Starting camera app");
        self.bind_controls();
        self.render_controls();
        self.init().await?;
        self.init_done.store(true, Ordering::SeqCst);
        info!("Camera app initialised");
        Ok(())
    }

    /// Open a session for the current constraints
    pub async fn connect_camera(&self) -> Result<()> {
        let constraints = self.constraints();
        self.sessions.acquire(&constraints).await?;
        Ok(())
    }

    async fn init(&self) -> Result<()> {
        self.connect_camera().await?;

        self.surface.clear_options(ElementId::CameraSelector);
        let devices = self.host.enumerate_devices().await?;
        for device in devices
            .into_iter()
            .filter(|device| device.kind == DeviceKind::VideoInput)
        {
            let text = if device.label.is_empty() {
                format!(
                    "camera {}",
                    self.surface.options(ElementId::CameraSelector).len() + 1
                )
            } else {
                device.label
            };
            debug!("Camera option '{}' ({})", text, device.device_id);
            self.surface.append_option(
                ElementId::CameraSelector,
                SelectOption {
                    value: device.device_id,
                    text,
                },
            );
        }

        Ok(())
    }

    /// Seed the frame-rate and resolution controls from the constraints
    fn render_controls(&self) {
        let constraints = self.constraints();
        let frame_rate = constraints.frame_rate().to_string();
        self.surface.set_value(ElementId::FrameRateInput, &frame_rate);
        self.surface.set_text(ElementId::FrameRateValue, &frame_rate);

        let (width, height) = constraints.resolution();
        let current = format!("{} {}", width, height);
        self.surface.clear_options(ElementId::ResolutionSelector);
        let mut values = vec![current.clone()];
        for option in &self.config.harness.resolutions {
            if !values.contains(option) {
                values.push(option.clone());
            }
        }
        for value in values {
            self.surface.append_option(
                ElementId::ResolutionSelector,
                SelectOption {
                    text: value.replace(' ', "x"),
                    value,
                },
            );
        }
        self.surface.set_value(ElementId::ResolutionSelector, &current);
    }
}

/// Start the app without awaiting it; a failure lands in `errors`.
pub fn launch(app: &Arc<CameraApp>, errors: Arc<ErrorSink>) -> tokio::task::JoinHandle<()> {
    let app = Arc::clone(app);
    tokio::spawn(async move {
        if let Err(e) = app.start().await {
            errors.report_rejection("camera app start", &e);
        }
    })
}
