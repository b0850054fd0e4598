use super::{
    Artifact, DeviceInfo, DeviceKind, ImageCapture, MediaConstraints, MediaHost, MediaRecorder,
    MediaStream, MediaTrack, PhotoCapabilities, PhotoSettings, PlatformResult, RecorderEvent,
    RecorderOptions, RecorderState, TrackKind, ValueRange,
};
use crate::config::{SimulatedCameraConfig, SimulationConfig};
use crate::error::PlatformError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

const MAX_FRAME_RATE: f64 = 60.0;
const MIN_PHOTO_DIMENSION: u32 = 160;
const PHOTO_JPEG_QUALITY: u8 = 92;
const SIMULATED_VIDEO_MAGIC: &[u8; 4] = b"SIMV";

/// In-process media host backed by synthetic cameras.
///
/// Frames are generated test patterns, photos are real JPEGs, and the
/// recorder emits a small self-describing container of frame timestamps.
/// Failure switches let tests exercise the host error paths.
pub struct SimulatedHost {
    cameras: Vec<SimulatedCameraConfig>,
    include_microphone: bool,
    permission_granted: AtomicBool,
    enumerate_failure: Mutex<Option<PlatformError>>,
    empty_photos: Arc<AtomicBool>,
    tracks: Mutex<HashMap<String, Arc<SimulatedTrack>>>,
    frame_counter: Arc<AtomicU64>,
    acquisitions: AtomicU64,
}

impl SimulatedHost {
    pub fn new(config: &SimulationConfig) -> Self {
        info!(
            "Simulated media host with {} camera(s), microphone: {}",
            config.cameras.len(),
            config.include_microphone
        );

        Self {
            cameras: config.cameras.clone(),
            include_microphone: config.include_microphone,
            permission_granted: AtomicBool::new(true),
            enumerate_failure: Mutex::new(None),
            empty_photos: Arc::new(AtomicBool::new(false)),
            tracks: Mutex::new(HashMap::new()),
            frame_counter: Arc::new(AtomicU64::new(0)),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Make subsequent `get_user_media` calls fail with `PermissionDenied`
    pub fn set_permission_granted(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::Relaxed);
    }

    /// Make subsequent `enumerate_devices` calls fail
    pub fn fail_enumeration(&self, error: Option<PlatformError>) {
        *self.enumerate_failure.lock() = error;
    }

    /// Make hardware photo capture return empty payloads
    pub fn set_empty_photos(&self, empty: bool) {
        self.empty_photos.store(empty, Ordering::Relaxed);
    }

    /// Number of video tracks that have not been stopped
    pub fn live_video_tracks(&self) -> usize {
        self.tracks
            .lock()
            .values()
            .filter(|track| track.kind == TrackKind::Video && track.is_live())
            .count()
    }

    /// Number of live tracks of any kind
    pub fn live_tracks(&self) -> usize {
        self.tracks
            .lock()
            .values()
            .filter(|track| track.is_live())
            .count()
    }

    /// Number of successful `get_user_media` calls
    pub fn acquisition_count(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    fn select_camera(&self, device_id: Option<&str>) -> PlatformResult<&SimulatedCameraConfig> {
        let preferred = device_id.and_then(|id| self.cameras.iter().find(|c| c.id == id));
        if preferred.is_none() {
            if let Some(id) = device_id {
                debug!("Preferred camera '{}' not present, using first camera", id);
            }
        }

        preferred
            .or_else(|| self.cameras.first())
            .ok_or_else(|| PlatformError::NotFound {
                details: "no video input devices available".to_string(),
            })
    }

    fn track_by_id(&self, track_id: &str) -> PlatformResult<Arc<SimulatedTrack>> {
        self.tracks
            .lock()
            .get(track_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotSupported {
                details: format!("track {} was not created by this host", track_id),
            })
    }

    fn register_track(&self, track: Arc<SimulatedTrack>) {
        self.tracks.lock().retain(|_, existing| existing.is_live());
        self.tracks.lock().insert(track.id.clone(), track);
    }
}

#[async_trait]
impl MediaHost for SimulatedHost {
    async fn enumerate_devices(&self) -> PlatformResult<Vec<DeviceInfo>> {
        tokio::task::yield_now().await;

        if let Some(error) = self.enumerate_failure.lock().clone() {
            return Err(error);
        }

        let mut devices: Vec<DeviceInfo> = self
            .cameras
            .iter()
            .map(|camera| DeviceInfo {
                device_id: camera.id.clone(),
                kind: DeviceKind::VideoInput,
                label: camera.label.clone(),
            })
            .collect();

        if self.include_microphone {
            devices.push(DeviceInfo {
                device_id: "sim-microphone".to_string(),
                kind: DeviceKind::AudioInput,
                label: "Simulated Microphone".to_string(),
            });
        }

        Ok(devices)
    }

    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> PlatformResult<Arc<dyn MediaStream>> {
        tokio::task::yield_now().await;

        if !self.permission_granted.load(Ordering::Relaxed) {
            return Err(PlatformError::PermissionDenied {
                details: "camera access was denied".to_string(),
            });
        }

        let camera = self.select_camera(constraints.device_id.as_deref())?;
        check_video_constraints(camera, constraints)?;

        if constraints.audio && !self.include_microphone {
            return Err(PlatformError::NotFound {
                details: "no audio input devices available".to_string(),
            });
        }

        let video = Arc::new(SimulatedTrack::new(
            TrackKind::Video,
            camera.clone(),
            constraints,
        ));
        self.register_track(Arc::clone(&video));

        let mut tracks = vec![video];
        if constraints.audio {
            let audio = Arc::new(SimulatedTrack::new(
                TrackKind::Audio,
                camera.clone(),
                constraints,
            ));
            self.register_track(Arc::clone(&audio));
            tracks.push(audio);
        }

        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        let stream = SimulatedStream {
            id: Uuid::new_v4().to_string(),
            tracks,
        };

        debug!(
            "Opened simulated stream {} on '{}' ({}x{} @ {}fps)",
            stream.id, camera.id, constraints.width, constraints.height, constraints.frame_rate
        );

        Ok(Arc::new(stream))
    }

    fn image_capture(&self, track: Arc<dyn MediaTrack>) -> PlatformResult<Arc<dyn ImageCapture>> {
        if track.kind() != TrackKind::Video {
            return Err(PlatformError::NotSupported {
                details: "image capture requires a video track".to_string(),
            });
        }

        Ok(Arc::new(SimulatedImageCapture {
            track: self.track_by_id(track.id())?,
            empty_photos: Arc::clone(&self.empty_photos),
            frame_counter: Arc::clone(&self.frame_counter),
        }))
    }

    fn media_recorder(
        &self,
        stream: Arc<dyn MediaStream>,
        options: &RecorderOptions,
    ) -> PlatformResult<(Arc<dyn MediaRecorder>, mpsc::UnboundedReceiver<RecorderEvent>)> {
        let video = stream
            .video_tracks()
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotSupported {
                details: "recorder requires a video track".to_string(),
            })?;
        let video = self.track_by_id(video.id())?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let recorder = SimulatedRecorder {
            video,
            mime_type: options.mime_type.clone(),
            state: Arc::new(Mutex::new(RecorderState::Inactive)),
            sender,
            cancel: Mutex::new(None),
        };

        Ok((Arc::new(recorder), receiver))
    }
}

fn check_video_constraints(
    camera: &SimulatedCameraConfig,
    constraints: &MediaConstraints,
) -> PlatformResult<()> {
    if !camera
        .resolutions
        .contains(&(constraints.width, constraints.height))
    {
        return Err(PlatformError::Overconstrained {
            constraint: "width".to_string(),
            details: format!(
                "camera '{}' has no {}x{} mode",
                camera.id, constraints.width, constraints.height
            ),
        });
    }

    if !(constraints.frame_rate > 0.0 && constraints.frame_rate <= MAX_FRAME_RATE) {
        return Err(PlatformError::Overconstrained {
            constraint: "frameRate".to_string(),
            details: format!(
                "frame rate {} outside 0-{}",
                constraints.frame_rate, MAX_FRAME_RATE
            ),
        });
    }

    Ok(())
}

struct SimulatedStream {
    id: String,
    tracks: Vec<Arc<SimulatedTrack>>,
}

impl MediaStream for SimulatedStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|track| Arc::clone(track) as Arc<dyn MediaTrack>)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackSettings {
    width: u32,
    height: u32,
    frame_rate: f64,
}

struct SimulatedTrack {
    id: String,
    kind: TrackKind,
    camera: SimulatedCameraConfig,
    live: AtomicBool,
    settings: Mutex<TrackSettings>,
}

impl SimulatedTrack {
    fn new(kind: TrackKind, camera: SimulatedCameraConfig, constraints: &MediaConstraints) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            camera,
            live: AtomicBool::new(true),
            settings: Mutex::new(TrackSettings {
                width: constraints.width,
                height: constraints.height,
                frame_rate: constraints.frame_rate,
            }),
        }
    }

    fn settings(&self) -> TrackSettings {
        *self.settings.lock()
    }

    fn ensure_live(&self) -> PlatformResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(PlatformError::InvalidState {
                details: format!("track {} has ended", self.id),
            })
        }
    }
}

#[async_trait]
impl MediaTrack for SimulatedTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::Relaxed) {
            trace!("Stopped simulated {:?} track {}", self.kind, self.id);
        }
    }

    async fn apply_constraints(&self, constraints: &MediaConstraints) -> PlatformResult<()> {
        tokio::task::yield_now().await;
        self.ensure_live()?;

        if self.kind == TrackKind::Video {
            check_video_constraints(&self.camera, constraints)?;
            *self.settings.lock() = TrackSettings {
                width: constraints.width,
                height: constraints.height,
                frame_rate: constraints.frame_rate,
            };
        }

        Ok(())
    }
}

struct SimulatedImageCapture {
    track: Arc<SimulatedTrack>,
    empty_photos: Arc<AtomicBool>,
    frame_counter: Arc<AtomicU64>,
}

#[async_trait]
impl ImageCapture for SimulatedImageCapture {
    async fn photo_capabilities(&self) -> PlatformResult<PhotoCapabilities> {
        tokio::task::yield_now().await;
        self.track.ensure_live()?;

        let (max_width, max_height) = self.track.camera.max_photo_resolution;
        Ok(PhotoCapabilities {
            image_width: ValueRange {
                min: MIN_PHOTO_DIMENSION.min(max_width),
                max: max_width,
                step: 1,
            },
            image_height: ValueRange {
                min: MIN_PHOTO_DIMENSION.min(max_height),
                max: max_height,
                step: 1,
            },
        })
    }

    async fn take_photo(&self, settings: PhotoSettings) -> PlatformResult<Artifact> {
        tokio::task::yield_now().await;
        self.track.ensure_live()?;

        let (max_width, max_height) = self.track.camera.max_photo_resolution;
        if settings.image_width == 0
            || settings.image_height == 0
            || settings.image_width > max_width
            || settings.image_height > max_height
        {
            return Err(PlatformError::Overconstrained {
                constraint: "imageWidth".to_string(),
                details: format!(
                    "photo size {}x{} outside supported {}x{}",
                    settings.image_width, settings.image_height, max_width, max_height
                ),
            });
        }

        if self.empty_photos.load(Ordering::Relaxed) {
            warn!("Simulated camera returning an empty photo");
            return Ok(Artifact::new("image/jpeg", Vec::new()));
        }

        let seed = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let image = test_pattern(settings.image_width, settings.image_height, seed);
        let data = encode_jpeg(&image, PHOTO_JPEG_QUALITY)?;

        debug!(
            "Simulated photo {}x{} ({} bytes)",
            settings.image_width,
            settings.image_height,
            data.len()
        );
        Ok(Artifact::new("image/jpeg", data))
    }

    async fn grab_frame(&self) -> PlatformResult<RgbaImage> {
        tokio::task::yield_now().await;
        self.track.ensure_live()?;

        let settings = self.track.settings();
        let seed = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        Ok(test_pattern(settings.width, settings.height, seed))
    }
}

struct SimulatedRecorder {
    video: Arc<SimulatedTrack>,
    mime_type: String,
    state: Arc<Mutex<RecorderState>>,
    sender: mpsc::UnboundedSender<RecorderEvent>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl MediaRecorder for SimulatedRecorder {
    fn state(&self) -> RecorderState {
        *self.state.lock()
    }

    fn start(&self, timeslice: Option<Duration>) -> PlatformResult<()> {
        {
            let mut state = self.state.lock();
            if *state == RecorderState::Recording {
                return Err(PlatformError::InvalidState {
                    details: "recorder is already recording".to_string(),
                });
            }
            self.video.ensure_live()?;
            *state = RecorderState::Recording;
        }

        let token = CancellationToken::new();
        *self.cancel.lock() = Some(token.clone());

        let job = RecordingJob {
            video: Arc::clone(&self.video),
            mime_type: self.mime_type.clone(),
            state: Arc::clone(&self.state),
            sender: self.sender.clone(),
            timeslice,
        };
        tokio::spawn(job.run(token));

        Ok(())
    }

    fn stop(&self) -> PlatformResult<()> {
        {
            let mut state = self.state.lock();
            if *state == RecorderState::Inactive {
                return Err(PlatformError::InvalidState {
                    details: "recorder is not recording".to_string(),
                });
            }
            *state = RecorderState::Inactive;
        }

        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }

        Ok(())
    }
}

struct RecordingJob {
    video: Arc<SimulatedTrack>,
    mime_type: String,
    state: Arc<Mutex<RecorderState>>,
    sender: mpsc::UnboundedSender<RecorderEvent>,
    timeslice: Option<Duration>,
}

impl RecordingJob {
    async fn run(self, token: CancellationToken) {
        let settings = self.video.settings();
        let frame_interval =
            Duration::from_secs_f64(1.0 / settings.frame_rate).max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(frame_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let _ = self.sender.send(RecorderEvent::Started);
        let started = Instant::now();
        let mut chunk_started = Instant::now();
        let mut frames: Vec<u64> = Vec::new();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.video.is_live() {
                        debug!("Recorded track ended, finishing recording");
                        *self.state.lock() = RecorderState::Inactive;
                        break;
                    }

                    frames.push(started.elapsed().as_micros() as u64);

                    if let Some(slice) = self.timeslice {
                        if chunk_started.elapsed() >= slice {
                            self.flush(settings, &mut frames);
                            chunk_started = Instant::now();
                        }
                    }
                }
            }
        }

        self.flush(settings, &mut frames);
        let _ = self.sender.send(RecorderEvent::Stopped);
    }

    fn flush(&self, settings: TrackSettings, frames: &mut Vec<u64>) {
        let data = encode_container(settings, frames);
        trace!("Recorder delivering chunk of {} frames", frames.len());
        frames.clear();
        let _ = self
            .sender
            .send(RecorderEvent::DataAvailable(Artifact::new(
                self.mime_type.clone(),
                data,
            )));
    }
}

fn encode_container(settings: TrackSettings, frames: &[u64]) -> Vec<u8> {
    let mut data = Vec::with_capacity(20 + frames.len() * 8);
    data.extend_from_slice(SIMULATED_VIDEO_MAGIC);
    data.extend_from_slice(&settings.width.to_le_bytes());
    data.extend_from_slice(&settings.height.to_le_bytes());
    data.extend_from_slice(&(settings.frame_rate as f32).to_le_bytes());
    data.extend_from_slice(&(frames.len() as u32).to_le_bytes());
    for timestamp in frames {
        data.extend_from_slice(&timestamp.to_le_bytes());
    }
    data
}

fn test_pattern(width: u32, height: u32, seed: u64) -> RgbaImage {
    let shade = (seed % 256) as u8;
    RgbaImage::from_fn(width, height, |x, y| {
        let r = ((x as u64 * 255) / width.max(1) as u64) as u8;
        let g = ((y as u64 * 255) / height.max(1) as u64) as u8;
        Rgba([r, g, shade, 255])
    })
}

fn encode_jpeg(image: &RgbaImage, quality: u8) -> PlatformResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| PlatformError::failed(format!("photo encoding failed: {}", e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn host() -> SimulatedHost {
        SimulatedHost::new(&AppConfig::default().simulation)
    }

    fn constraints(width: u32, height: u32) -> MediaConstraints {
        MediaConstraints {
            audio: false,
            device_id: None,
            width,
            height,
            frame_rate: 30.0,
        }
    }

    #[tokio::test]
    async fn test_enumerate_lists_cameras_and_microphone() {
        let host = host();
        let devices = host.enumerate_devices().await.unwrap();
        let cameras: Vec<_> = devices
            .iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .collect();
        assert_eq!(cameras.len(), 2);
        assert!(devices.iter().any(|d| d.kind == DeviceKind::AudioInput));
    }

    #[tokio::test]
    async fn test_enumerate_failure_is_reported() {
        let host = host();
        host.fail_enumeration(Some(PlatformError::failed("enumeration broke")));
        assert_eq!(
            host.enumerate_devices().await.unwrap_err(),
            PlatformError::failed("enumeration broke")
        );
    }

    #[tokio::test]
    async fn test_get_user_media_rejects_unsupported_resolution() {
        let host = host();
        let err = host
            .get_user_media(&constraints(333, 222))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PlatformError::Overconstrained { .. }));
        assert_eq!(host.live_video_tracks(), 0);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let host = host();
        host.set_permission_granted(false);
        let err = host
            .get_user_media(&constraints(640, 360))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PlatformError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_unknown_device_falls_back_to_first_camera() {
        let host = host();
        let mut request = constraints(640, 480);
        request.device_id = Some("missing".to_string());
        let stream = host.get_user_media(&request).await.unwrap();
        assert_eq!(stream.video_tracks().len(), 1);
        assert_eq!(host.live_video_tracks(), 1);
    }

    #[tokio::test]
    async fn test_stopping_tracks_releases_them() {
        let host = host();
        let stream = host.get_user_media(&constraints(640, 360)).await.unwrap();
        assert_eq!(host.live_video_tracks(), 1);
        for track in stream.tracks() {
            track.stop();
        }
        assert_eq!(host.live_video_tracks(), 0);
    }

    #[tokio::test]
    async fn test_grab_frame_matches_track_resolution() {
        let host = host();
        let stream = host.get_user_media(&constraints(640, 480)).await.unwrap();
        let track = stream.video_tracks().remove(0);
        let capture = host.image_capture(track).unwrap();
        let frame = capture.grab_frame().await.unwrap();
        assert_eq!(frame.dimensions(), (640, 480));
    }

    #[tokio::test]
    async fn test_take_photo_produces_jpeg() {
        let host = host();
        let stream = host.get_user_media(&constraints(640, 360)).await.unwrap();
        let capture = host.image_capture(stream.video_tracks().remove(0)).unwrap();
        let caps = capture.photo_capabilities().await.unwrap();
        assert_eq!(caps.image_width.max, 1280);

        let photo = capture
            .take_photo(PhotoSettings {
                image_width: 320,
                image_height: 180,
            })
            .await
            .unwrap();
        assert_eq!(photo.mime_type(), "image/jpeg");
        assert_eq!(&photo.data()[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_recorder_emits_started_data_stopped() {
        let host = host();
        let stream = host.get_user_media(&constraints(640, 360)).await.unwrap();
        let (recorder, mut events) = host
            .media_recorder(
                stream,
                &RecorderOptions {
                    mime_type: "video/x-test".to_string(),
                },
            )
            .unwrap();

        recorder.start(None).unwrap();
        assert!(recorder.start(None).is_err());
        assert!(matches!(events.recv().await, Some(RecorderEvent::Started)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        recorder.stop().unwrap();
        assert_eq!(recorder.state(), RecorderState::Inactive);

        match events.recv().await {
            Some(RecorderEvent::DataAvailable(artifact)) => {
                assert_eq!(artifact.mime_type(), "video/x-test");
                assert_eq!(&artifact.data()[..4], SIMULATED_VIDEO_MAGIC);
            }
            other => panic!("Expected data, got {:?}", other),
        }
        assert!(matches!(events.recv().await, Some(RecorderEvent::Stopped)));
        assert!(recorder.stop().is_err());
    }
}
