use crate::constraints::parse_resolution;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub recording: RecordingConfig,
    pub capture: CaptureConfig,
    pub harness: HarnessConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Preferred camera device id; the first camera is used when unset
    #[serde(default)]
    pub device_id: Option<String>,

    /// Initial capture resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Initial frame rate
    #[serde(default = "default_camera_frame_rate")]
    pub frame_rate: f64,

    /// Capture audio alongside video
    #[serde(default = "default_camera_audio")]
    pub audio: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RecordingConfig {
    /// Container/codec requested from the recorder
    #[serde(default = "default_recording_mime_type")]
    pub mime_type: String,

    /// Elapsed-time readout refresh period in milliseconds
    #[serde(default = "default_timer_interval_ms")]
    pub timer_interval_ms: u64,

    /// Deliver recorded data in chunks of this many milliseconds
    #[serde(default)]
    pub timeslice_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// JPEG quality used when transcoding grabbed frames (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Photo preview canvas size (width, height)
    #[serde(default = "default_photo_canvas")]
    pub photo_canvas: (u32, u32),

    /// File name prefix for still images
    #[serde(default = "default_photo_prefix")]
    pub photo_prefix: String,

    /// File name prefix for recordings
    #[serde(default = "default_video_prefix")]
    pub video_prefix: String,

    /// Directory that receives downloaded artifacts
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// IANA timezone for file name timestamps; local time when unset
    #[serde(default)]
    pub timestamp_timezone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Resolution option values exercised per camera ("<width> <height>")
    #[serde(default = "default_harness_resolutions")]
    pub resolutions: Vec<String>,

    /// Frame rates exercised per camera
    #[serde(default = "default_harness_frame_rates")]
    pub frame_rates: Vec<f64>,

    /// Polling period while waiting on page state
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Recording duration of each scenario step in seconds
    #[serde(default = "default_step_duration_secs")]
    pub step_duration_secs: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Cameras exposed by the simulated host
    #[serde(default = "default_simulated_cameras")]
    pub cameras: Vec<SimulatedCameraConfig>,

    /// Expose a microphone next to the cameras
    #[serde(default = "default_include_microphone")]
    pub include_microphone: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulatedCameraConfig {
    pub id: String,

    /// Device label; an empty label is reported as such
    #[serde(default)]
    pub label: String,

    /// Supported streaming resolutions
    pub resolutions: Vec<(u32, u32)>,

    /// Largest still photo the camera produces
    pub max_photo_resolution: (u32, u32),
}

impl AppConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("webcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.frame_rate", default_camera_frame_rate())?
            .set_default("camera.audio", default_camera_audio())?
            .set_default("recording.mime_type", default_recording_mime_type())?
            .set_default("recording.timer_interval_ms", default_timer_interval_ms())?
            .set_default("capture.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default(
                "capture.photo_canvas",
                vec![default_photo_canvas().0, default_photo_canvas().1],
            )?
            .set_default("capture.photo_prefix", default_photo_prefix())?
            .set_default("capture.video_prefix", default_video_prefix())?
            .set_default("capture.download_dir", default_download_dir())?
            .set_default("harness.resolutions", default_harness_resolutions())?
            .set_default("harness.frame_rates", default_harness_frame_rates())?
            .set_default("harness.poll_interval_ms", default_poll_interval_ms())?
            .set_default("harness.step_duration_secs", default_step_duration_secs())?
            .set_default(
                "simulation.include_microphone",
                default_include_microphone(),
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment overrides, e.g. WEBCAM_CAMERA__FRAME_RATE=15
            .add_source(
                Environment::with_prefix("WEBCAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if !(self.camera.frame_rate > 0.0) {
            return Err(ConfigError::Message(
                "Camera frame_rate must be greater than 0".to_string(),
            ));
        }

        if self.recording.timer_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Recording timer_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.recording.timeslice_ms == Some(0) {
            return Err(ConfigError::Message(
                "Recording timeslice_ms must be greater than 0 when set".to_string(),
            ));
        }

        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            return Err(ConfigError::Message(
                "Capture jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.capture.photo_canvas.0 == 0 || self.capture.photo_canvas.1 == 0 {
            return Err(ConfigError::Message(
                "Capture photo_canvas must be greater than 0".to_string(),
            ));
        }

        if self.harness.resolutions.is_empty() || self.harness.frame_rates.is_empty() {
            return Err(ConfigError::Message(
                "Harness resolutions and frame_rates must not be empty".to_string(),
            ));
        }

        for option in &self.harness.resolutions {
            parse_resolution(option).map_err(|e| ConfigError::Message(e.to_string()))?;
        }

        if self.harness.frame_rates.iter().any(|rate| !(*rate > 0.0)) {
            return Err(ConfigError::Message(
                "Harness frame_rates must all be greater than 0".to_string(),
            ));
        }

        if self.harness.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Harness poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        let step = self.harness.step_duration_secs;
        if !(step.is_finite() && step >= 0.0) {
            return Err(ConfigError::Message(
                "Harness step_duration_secs must be a finite, non-negative number".to_string(),
            ));
        }

        for camera in &self.simulation.cameras {
            if camera.resolutions.is_empty() {
                return Err(ConfigError::Message(format!(
                    "Simulated camera '{}' must support at least one resolution",
                    camera.id
                )));
            }
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                device_id: None,
                resolution: default_camera_resolution(),
                frame_rate: default_camera_frame_rate(),
                audio: default_camera_audio(),
            },
            recording: RecordingConfig {
                mime_type: default_recording_mime_type(),
                timer_interval_ms: default_timer_interval_ms(),
                timeslice_ms: None,
            },
            capture: CaptureConfig {
                jpeg_quality: default_jpeg_quality(),
                photo_canvas: default_photo_canvas(),
                photo_prefix: default_photo_prefix(),
                video_prefix: default_video_prefix(),
                download_dir: default_download_dir(),
                timestamp_timezone: None,
            },
            harness: HarnessConfig {
                resolutions: default_harness_resolutions(),
                frame_rates: default_harness_frame_rates(),
                poll_interval_ms: default_poll_interval_ms(),
                step_duration_secs: default_step_duration_secs(),
            },
            simulation: SimulationConfig {
                cameras: default_simulated_cameras(),
                include_microphone: default_include_microphone(),
            },
        }
    }
}

// Default value functions
fn default_camera_resolution() -> (u32, u32) {
    (640, 360)
}
fn default_camera_frame_rate() -> f64 {
    30.0
}
fn default_camera_audio() -> bool {
    false
}

fn default_recording_mime_type() -> String {
    "video/mp4; codecs=vp9".to_string()
}
fn default_timer_interval_ms() -> u64 {
    100
}

fn default_jpeg_quality() -> u8 {
    100
}
fn default_photo_canvas() -> (u32, u32) {
    (640, 360)
}
fn default_photo_prefix() -> String {
    "IMG_".to_string()
}
fn default_video_prefix() -> String {
    "VID_".to_string()
}
fn default_download_dir() -> String {
    "./downloads".to_string()
}

fn default_harness_resolutions() -> Vec<String> {
    vec!["640 480".to_string(), "1280 720".to_string()]
}
fn default_harness_frame_rates() -> Vec<f64> {
    vec![30.0, 2.0]
}
fn default_poll_interval_ms() -> u64 {
    20
}
fn default_step_duration_secs() -> f64 {
    1.0
}

fn default_simulated_cameras() -> Vec<SimulatedCameraConfig> {
    let resolutions = vec![(640, 360), (640, 480), (1280, 720)];
    vec![
        SimulatedCameraConfig {
            id: "sim-front".to_string(),
            label: "Simulated Front Camera".to_string(),
            resolutions: resolutions.clone(),
            max_photo_resolution: (1280, 720),
        },
        SimulatedCameraConfig {
            id: "sim-back".to_string(),
            label: String::new(),
            resolutions,
            max_photo_resolution: (1280, 960),
        },
    ]
}
fn default_include_microphone() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.resolution, (640, 360));
        assert_eq!(config.capture.photo_prefix, "IMG_");
        assert_eq!(config.capture.video_prefix, "VID_");
        assert_eq!(config.harness.frame_rates, vec![30.0, 2.0]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.camera.resolution = (0, 0);
        assert!(config.validate().is_err());

        config.camera.resolution = (640, 480);
        assert!(config.validate().is_ok());

        config.capture.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.capture.jpeg_quality = 100;

        config.harness.resolutions = vec!["640x480".to_string()];
        assert!(config.validate().is_err());
        config.harness.resolutions = vec!["640 480".to_string()];

        config.harness.frame_rates = vec![30.0, 0.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[camera]
resolution = [1280, 720]
frame_rate = 15.0

[harness]
resolutions = ["320 240"]
step_duration_secs = 0.1
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.camera.resolution, (1280, 720));
        assert_eq!(config.camera.frame_rate, 15.0);
        assert_eq!(config.harness.resolutions, vec!["320 240".to_string()]);
        assert_eq!(config.harness.poll_interval_ms, 20);
        assert_eq!(config.recording.timer_interval_ms, 100);
        assert_eq!(config.simulation.cameras.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/webcam.toml").unwrap();
        assert_eq!(config.camera, AppConfig::default().camera);
        assert_eq!(config.capture, AppConfig::default().capture);
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = AppConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[camera]"));
        assert!(rendered.contains("photo_prefix = \"IMG_\""));
    }
}
