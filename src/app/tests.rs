use super::*;
use crate::config::{AppConfig, SimulatedCameraConfig};
use crate::download::MemoryDownloads;
use crate::error::PlatformError;
use crate::platform::{ObjectUrls, SimulatedHost};
use crate::surface::{ControlEvent, ControlSurface, ElementId, ErrorSink, EventKind, HeadlessPage};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

struct Fixture {
    host: Arc<SimulatedHost>,
    page: Arc<HeadlessPage>,
    downloads: Arc<MemoryDownloads>,
    app: Arc<CameraApp>,
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    let resolutions = vec![(160, 90), (320, 180)];
    config.simulation.cameras = vec![
        SimulatedCameraConfig {
            id: "front".to_string(),
            label: "Front Camera".to_string(),
            resolutions: resolutions.clone(),
            max_photo_resolution: (320, 180),
        },
        SimulatedCameraConfig {
            id: "back".to_string(),
            label: String::new(),
            resolutions,
            max_photo_resolution: (320, 240),
        },
    ];
    config.camera.resolution = (160, 90);
    config.capture.photo_canvas = (64, 36);
    config.harness.resolutions = vec!["160 90".to_string(), "320 180".to_string()];
    config.recording.timer_interval_ms = 20;
    config
}

fn fixture() -> Fixture {
    let config = test_config();
    let host = Arc::new(SimulatedHost::new(&config.simulation));
    let urls = Arc::new(ObjectUrls::new());
    let page = Arc::new(HeadlessPage::new(
        config.capture.photo_canvas,
        Arc::new(ErrorSink::new()),
    ));
    let downloads = Arc::new(MemoryDownloads::new(Arc::clone(&urls)));

    let app = CameraAppBuilder::new()
        .config(config)
        .host(host.clone())
        .surface(page.clone())
        .download_target(downloads.clone())
        .object_urls(urls)
        .build()
        .unwrap();

    Fixture {
        host,
        page,
        downloads,
        app,
    }
}

async fn started() -> Fixture {
    let fixture = fixture();
    tokio::time::timeout(WAIT, fixture.app.start())
        .await
        .unwrap()
        .unwrap();
    fixture
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[test]
fn test_builder_requires_host() {
    let urls = Arc::new(ObjectUrls::new());
    let result = CameraAppBuilder::new()
        .surface(Arc::new(HeadlessPage::new((64, 36), Arc::new(ErrorSink::new()))))
        .download_target(Arc::new(MemoryDownloads::new(urls)))
        .build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_start_populates_camera_list() {
    let fixture = started().await;

    assert!(fixture.app.is_init_done());
    assert!(!fixture.page.is_displayed(ElementId::WebLoader));

    let options = fixture.page.options(ElementId::CameraSelector);
    let texts: Vec<&str> = options.iter().map(|option| option.text.as_str()).collect();
    assert_eq!(texts, vec!["Front Camera", "camera 2"]);
    assert_eq!(
        fixture.page.value(ElementId::CameraSelector).as_deref(),
        Some("front")
    );

    assert_eq!(
        fixture.page.value(ElementId::ResolutionSelector).as_deref(),
        Some("160 90")
    );
    assert_eq!(fixture.page.options(ElementId::ResolutionSelector).len(), 2);
    assert_eq!(fixture.host.live_video_tracks(), 1);
}

#[tokio::test]
async fn test_every_control_is_bound() {
    let fixture = started().await;
    for (id, kind) in [
        (ElementId::StillCaptureButton, EventKind::Click),
        (ElementId::SnapshotButton, EventKind::Click),
        (ElementId::StartButton, EventKind::Click),
        (ElementId::StopButton, EventKind::Click),
        (ElementId::CameraSelector, EventKind::Change),
        (ElementId::FrameRateInput, EventKind::Input),
        (ElementId::FrameRateInput, EventKind::Change),
        (ElementId::ResolutionSelector, EventKind::Change),
    ] {
        assert_eq!(fixture.page.listener_count(id, kind), 1, "{} {:?}", id, kind);
    }
}

#[tokio::test]
async fn test_still_and_snapshot_clicks_download_photos() {
    let fixture = started().await;

    fixture.page.click(ElementId::StillCaptureButton).await;
    wait_until(|| fixture.downloads.count_with_prefix("IMG_") == 1).await;

    fixture.page.click(ElementId::SnapshotButton).await;
    wait_until(|| fixture.downloads.count_with_prefix("IMG_") == 2).await;

    assert!(fixture.page.errors().is_empty());
}

#[tokio::test]
async fn test_resolution_change_shows_loader_and_reconnects() {
    let fixture = started().await;

    fixture
        .page
        .set_value(ElementId::ResolutionSelector, "320 180");
    fixture
        .page
        .dispatch(ControlEvent::new(
            ElementId::ResolutionSelector,
            EventKind::Change,
        ))
        .await;
    assert!(fixture.page.is_displayed(ElementId::WebLoader));

    wait_until(|| !fixture.page.is_displayed(ElementId::WebLoader)).await;
    assert_eq!(fixture.app.constraints().resolution(), (320, 180));
    assert_eq!(fixture.host.live_video_tracks(), 1);
    assert_eq!(fixture.host.acquisition_count(), 2);
    assert!(fixture.page.errors().is_empty());
}

#[tokio::test]
async fn test_camera_change_selects_device() {
    let fixture = started().await;

    fixture.page.set_value(ElementId::CameraSelector, "back");
    fixture
        .page
        .dispatch(ControlEvent::new(ElementId::CameraSelector, EventKind::Change))
        .await;

    wait_until(|| fixture.host.acquisition_count() == 2).await;
    wait_until(|| !fixture.page.is_displayed(ElementId::WebLoader)).await;
    assert_eq!(
        fixture.app.constraints().selected_device_id(),
        Some("back")
    );
    assert_eq!(fixture.host.live_video_tracks(), 1);
}

#[tokio::test]
async fn test_frame_rate_input_mirrors_value() {
    let fixture = started().await;
    assert_eq!(
        fixture.page.text(ElementId::FrameRateValue).as_deref(),
        Some("30")
    );

    fixture.page.set_value(ElementId::FrameRateInput, "12");
    fixture
        .page
        .dispatch(ControlEvent::new(ElementId::FrameRateInput, EventKind::Input))
        .await;

    assert_eq!(
        fixture.page.text(ElementId::FrameRateValue).as_deref(),
        Some("12")
    );
    // Input alone does not reconnect
    assert_eq!(fixture.host.acquisition_count(), 1);
}

#[tokio::test]
async fn test_invalid_frame_rate_is_reported() {
    let fixture = started().await;

    fixture.page.set_value(ElementId::FrameRateInput, "fast");
    fixture
        .page
        .dispatch(ControlEvent::new(ElementId::FrameRateInput, EventKind::Change))
        .await;

    assert_eq!(fixture.page.errors().len(), 1);
    assert_eq!(fixture.app.constraints().frame_rate(), 30.0);
}

#[tokio::test]
async fn test_record_clicks_download_video() {
    let fixture = started().await;

    fixture.page.click(ElementId::StartButton).await;
    wait_until(|| fixture.app.recording().is_timer_running()).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    fixture.page.click(ElementId::StopButton).await;

    wait_until(|| fixture.page.is_displayed(ElementId::VideoOutput)).await;
    assert_eq!(fixture.downloads.count_with_prefix("VID_"), 1);
    assert!(fixture.page.errors().is_empty());
}

#[tokio::test]
async fn test_stop_click_while_idle_reports_error() {
    let fixture = started().await;
    fixture.page.click(ElementId::StopButton).await;
    assert_eq!(fixture.page.errors().len(), 1);
}

#[tokio::test]
async fn test_launch_reports_start_failure() {
    let fixture = fixture();
    fixture.host.set_permission_granted(false);

    let errors = Arc::clone(fixture.page.errors());
    tokio::time::timeout(WAIT, launch(&fixture.app, Arc::clone(&errors)))
        .await
        .unwrap()
        .unwrap();

    assert!(!fixture.app.is_init_done());
    assert!(errors.first().unwrap().contains("camera access was denied"));
    assert!(fixture.page.is_displayed(ElementId::WebLoader));
}

#[tokio::test]
async fn test_enumeration_failure_fails_start() {
    let fixture = fixture();
    fixture
        .host
        .fail_enumeration(Some(PlatformError::failed("device list unavailable")));

    let err = tokio::time::timeout(WAIT, fixture.app.start())
        .await
        .unwrap()
        .err()
        .unwrap();

    assert!(err.to_string().contains("device list unavailable"));
    assert!(!fixture.app.is_init_done());
}
