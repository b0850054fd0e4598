pub mod app;
pub mod config;
pub mod constraints;
pub mod download;
pub mod error;
pub mod harness;
pub mod keyboard_input;
pub mod platform;
pub mod recording;
pub mod session;
pub mod still;
pub mod surface;

pub use app::{launch, CameraApp, CameraAppBuilder};
pub use config::AppConfig;
pub use constraints::{parse_frame_rate, parse_resolution, CaptureConstraints};
pub use download::{DirectoryDownloads, DownloadSink, DownloadTarget, MemoryDownloads};
pub use error::{PlatformError, Result, WebcamError};
pub use harness::{check_video_input, run_scenario, ScenarioPlan, TestReport, TestSession};
pub use keyboard_input::KeyboardInputHandler;
pub use platform::{Artifact, MediaHost, ObjectUrls, SimulatedHost};
pub use recording::{format_elapsed, RecordingController, RecordingState};
pub use session::{DeviceSession, SessionManager};
pub use still::{StillCapture, StillCaptureAdapter};
pub use surface::{ControlSurface, ElementId, ErrorSink, EventKind, HeadlessPage};
