use super::TestSession;
use crate::app::CameraApp;
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::platform::{DeviceKind, MediaHost};
use crate::surface::{ControlEvent, ControlSurface, ElementId, EventKind};
use std::time::Duration;
use tracing::{debug, warn};

/// Settings of a scenario run
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub resolutions: Vec<String>,
    pub frame_rates: Vec<f64>,
    pub step_duration: Duration,
}

impl ScenarioPlan {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            resolutions: config.resolutions.clone(),
            frame_rates: config.frame_rates.clone(),
            step_duration: Duration::from_secs_f64(config.step_duration_secs),
        }
    }

    pub fn with_step_duration(mut self, step_duration: Duration) -> Self {
        self.step_duration = step_duration;
        self
    }
}

/// Drive every camera through every frame rate and resolution, taking a
/// snapshot and a short recording at each combination.
///
/// The session is marked done however the run ends. The first page error
/// aborts the run and is returned as the step failure.
pub async fn run_scenario(session: &TestSession, app: &CameraApp, plan: &ScenarioPlan) -> Result<()> {
    session.add_log("testWebCameraApp");
    let result = exercise_controls(session, app, plan).await;
    if let Err(e) = &result {
        warn!("Scenario aborted: {}", e);
    }
    session.mark_done();
    result
}

async fn exercise_controls(session: &TestSession, app: &CameraApp, plan: &ScenarioPlan) -> Result<()> {
    session.wait_for(|| app.is_init_done()).await;
    session.throw_if_error("Fail to wait for Init done: ")?;

    let surface: &dyn ControlSurface = app.surface().as_ref();
    let cameras = surface.options(ElementId::CameraSelector);

    for camera in cameras {
        debug!("Scenario camera {} ({})", camera.text, camera.value);
        change_control(session, surface, ElementId::CameraSelector, &camera.value).await;
        session.throw_if_error("Fail to change device: ")?;

        for frame_rate in &plan.frame_rates {
            for resolution in &plan.resolutions {
                change_control(
                    session,
                    surface,
                    ElementId::FrameRateInput,
                    &frame_rate.to_string(),
                )
                .await;
                session.throw_if_error("Fail to change frame rate: ")?;

                change_control(session, surface, ElementId::ResolutionSelector, resolution).await;
                session.throw_if_error("Fail to change resolution: ")?;

                surface.click(ElementId::SnapshotButton).await;
                session.throw_if_error("Fail to take a snapshot: ")?;

                surface.click(ElementId::StartButton).await;
                session
                    .wait_for_element_display(surface, ElementId::VideoOutput, false)
                    .await;
                session.throw_if_error("Fail to start recording: ")?;

                tokio::time::sleep(plan.step_duration).await;

                surface.click(ElementId::StopButton).await;
                session
                    .wait_for_element_display(surface, ElementId::VideoOutput, true)
                    .await;
                session.throw_if_error("Fail to stop recording: ")?;
            }
        }
    }

    Ok(())
}

/// Commit a new value on a control and wait for the reconfiguration
async fn change_control(
    session: &TestSession,
    surface: &dyn ControlSurface,
    id: ElementId,
    value: &str,
) {
    surface.set_value(id, value);
    surface.dispatch(ControlEvent::new(id, EventKind::Change)).await;
    session
        .wait_for_element_display(surface, ElementId::WebLoader, false)
        .await;
}

/// Whether the host exposes any camera. Enumeration failures are kept on
/// the session instead of being raised.
pub async fn check_video_input(session: &TestSession, host: &dyn MediaHost) -> bool {
    session.add_log("checkVideoInput");
    match host.enumerate_devices().await {
        Ok(devices) => devices
            .iter()
            .any(|device| device.kind == DeviceKind::VideoInput),
        Err(e) => {
            warn!("Device enumeration failed: {}", e);
            session.set_enumerate_devices_error(format!("{}: {}", e.name(), e));
            false
        }
    }
}
