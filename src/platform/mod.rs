//! Host media capabilities consumed by the app.
//!
//! Everything in here is an external collaborator: device enumeration,
//! stream acquisition, track constraints, photo capture and recording are
//! provided by whatever implements [`MediaHost`]. [`SimulatedHost`] is an
//! in-process implementation used by the binary and the tests.

mod simulated;
mod types;
mod urls;

pub use simulated::SimulatedHost;
pub use types::{
    Artifact, DeviceInfo, DeviceKind, MediaConstraints, PhotoCapabilities, PhotoSettings,
    RecorderEvent, RecorderOptions, RecorderState, TrackKind, ValueRange,
};
pub use urls::{ObjectUrl, ObjectUrls};

use crate::error::PlatformError;
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;
use tokio::sync::mpsc;

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Entry point to the host's media stack.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// List the media input devices known to the host
    async fn enumerate_devices(&self) -> PlatformResult<Vec<DeviceInfo>>;

    /// Open a stream satisfying `constraints`
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> PlatformResult<Arc<dyn MediaStream>>;

    /// Wrap a live video track for still capture
    fn image_capture(&self, track: Arc<dyn MediaTrack>) -> PlatformResult<Arc<dyn ImageCapture>>;

    /// Create a recorder over a stream; events arrive on the returned receiver
    fn media_recorder(
        &self,
        stream: Arc<dyn MediaStream>,
        options: &RecorderOptions,
    ) -> PlatformResult<(Arc<dyn MediaRecorder>, mpsc::UnboundedReceiver<RecorderEvent>)>;
}

pub trait MediaStream: Send + Sync {
    fn id(&self) -> &str;

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    fn video_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks()
            .into_iter()
            .filter(|track| track.kind() == TrackKind::Video)
            .collect()
    }
}

#[async_trait]
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    fn is_live(&self) -> bool;

    /// End the track and release the underlying device
    fn stop(&self);

    /// Refine the constraints of a live track
    async fn apply_constraints(&self, constraints: &MediaConstraints) -> PlatformResult<()>;
}

#[async_trait]
pub trait ImageCapture: Send + Sync {
    async fn photo_capabilities(&self) -> PlatformResult<PhotoCapabilities>;

    /// Hardware still capture, returning the encoded image
    async fn take_photo(&self, settings: PhotoSettings) -> PlatformResult<Artifact>;

    /// Snapshot of the current live frame
    async fn grab_frame(&self) -> PlatformResult<RgbaImage>;
}

pub trait MediaRecorder: Send + Sync {
    fn state(&self) -> RecorderState;

    /// Begin encoding; `Started` is delivered once encoding is running
    fn start(&self, timeslice: Option<std::time::Duration>) -> PlatformResult<()>;

    /// Stop encoding; remaining data is delivered before `Stopped`
    fn stop(&self) -> PlatformResult<()>;
}
