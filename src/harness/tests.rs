use super::*;
use crate::app::{CameraApp, CameraAppBuilder};
use crate::config::{AppConfig, SimulatedCameraConfig};
use crate::download::MemoryDownloads;
use crate::error::{HarnessError, PlatformError, WebcamError};
use crate::platform::{ObjectUrls, SimulatedHost};
use crate::surface::{ControlSurface, ElementId, ErrorSink, HeadlessPage};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(30);

struct Fixture {
    host: Arc<SimulatedHost>,
    page: Arc<HeadlessPage>,
    downloads: Arc<MemoryDownloads>,
    app: Arc<CameraApp>,
    session: TestSession,
    plan: ScenarioPlan,
}

fn fixture() -> Fixture {
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
            max_photo_resolution: (320, 180),
        },
    ];
    config.camera.resolution = (160, 90);
    config.capture.photo_canvas = (64, 36);
    config.harness.resolutions = vec!["160 90".to_string(), "320 180".to_string()];

    let errors = Arc::new(ErrorSink::new());
    let host = Arc::new(SimulatedHost::new(&config.simulation));
    let urls = Arc::new(ObjectUrls::new());
    let page = Arc::new(HeadlessPage::new(
        config.capture.photo_canvas,
        Arc::clone(&errors),
    ));
    let downloads = Arc::new(MemoryDownloads::new(Arc::clone(&urls)));
    let plan = ScenarioPlan::from_config(&config.harness)
        .with_step_duration(Duration::from_millis(50));
    let session = TestSession::new(errors, Duration::from_millis(20));

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
        session,
        plan,
    }
}

#[tokio::test]
async fn test_scenario_runs_every_combination() {
    let fixture = fixture();
    assert!(!fixture.session.is_ready());
    fixture.session.attach(&fixture.app);
    assert!(fixture.session.is_ready());

    tokio::time::timeout(
        WAIT,
        run_scenario(&fixture.session, &fixture.app, &fixture.plan),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(fixture.session.is_done());
    assert!(fixture.session.errors().is_empty());
    let logs = fixture.session.logs();
    assert!(logs.iter().any(|entry| entry.ends_with("] testWebCameraApp")));

    // 2 cameras x 2 frame rates x 2 resolutions
    assert_eq!(fixture.downloads.count_with_prefix("VID_"), 8);
    assert!(!fixture.page.is_displayed(ElementId::WebLoader));
    assert!(fixture.page.is_displayed(ElementId::VideoOutput));
    assert_eq!(fixture.host.live_video_tracks(), 1);

    // Snapshots finish in the background
    tokio::time::timeout(WAIT, async {
        while fixture.downloads.count_with_prefix("IMG_") < 8 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_init_failure_aborts_and_still_completes() {
    let fixture = fixture();
    fixture.host.set_permission_granted(false);
    fixture.session.attach(&fixture.app);

    let err = tokio::time::timeout(
        WAIT,
        run_scenario(&fixture.session, &fixture.app, &fixture.plan),
    )
    .await
    .unwrap()
    .err()
    .unwrap();

    match err {
        WebcamError::Harness(HarnessError::StepFailed { step, first_error }) => {
            assert_eq!(step, "Fail to wait for Init done: ");
            assert!(first_error.contains("camera access was denied"));
        }
        other => panic!("Expected step failure, got {:?}", other),
    }
    assert!(fixture.session.is_done());
    assert_eq!(fixture.session.errors().len(), 1);
}

#[tokio::test]
async fn test_unsupported_resolution_fails_the_step() {
    let mut fixture = fixture();
    fixture.plan.resolutions = vec!["1920 1080".to_string()];
    fixture.session.attach(&fixture.app);

    let err = tokio::time::timeout(
        WAIT,
        run_scenario(&fixture.session, &fixture.app, &fixture.plan),
    )
    .await
    .unwrap()
    .err()
    .unwrap();

    assert!(err.to_string().contains("Fail to change resolution: "));
    assert!(fixture.session.is_done());
    // A failed reconfiguration leaves the indicator up
    assert!(fixture.page.is_displayed(ElementId::WebLoader));
}

#[tokio::test]
async fn test_check_video_input() {
    let fixture = fixture();
    assert!(check_video_input(&fixture.session, &*fixture.host).await);
    assert!(fixture.session.enumerate_devices_error().is_empty());

    fixture
        .host
        .fail_enumeration(Some(PlatformError::failed("enumeration broke")));
    assert!(!check_video_input(&fixture.session, &*fixture.host).await);
    assert_eq!(
        fixture.session.enumerate_devices_error(),
        "UnknownError: Host operation failed: enumeration broke"
    );
    // Enumeration failures are not page errors
    assert!(fixture.session.errors().is_empty());

    let logs = fixture.session.logs();
    assert_eq!(logs.len(), 2);
    assert!(logs[0].ends_with("] checkVideoInput"));
}

#[tokio::test]
async fn test_wait_for_returns_on_page_error() {
    let errors = Arc::new(ErrorSink::new());
    let session = TestSession::new(Arc::clone(&errors), Duration::from_millis(5));

    let reporter = {
        let errors = Arc::clone(&errors);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            errors.report_rejection("test", &"boom");
        })
    };

    tokio::time::timeout(Duration::from_secs(2), session.wait_for(|| false))
        .await
        .unwrap();
    reporter.await.unwrap();

    let err = session.throw_if_error("Fail to wait: ").unwrap_err();
    assert_eq!(err.to_string(), "Fail to wait: boom");
}

#[test]
fn test_report_serializes() {
    let session = TestSession::new(Arc::new(ErrorSink::new()), Duration::from_millis(20));
    session.add_log("hello");

    let report = session.report();
    assert!(!report.ready);
    assert!(!report.done);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["done"], serde_json::json!(false));
    assert_eq!(json["logs"].as_array().unwrap().len(), 1);
    assert_eq!(json["enumerate_devices_error"], serde_json::json!(""));
}
