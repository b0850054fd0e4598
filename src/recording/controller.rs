use super::RecordingTimer;
use crate::download::DownloadSink;
use crate::error::{RecordingError, Result};
use crate::platform::{Artifact, MediaRecorder, ObjectUrls, RecorderEvent, RecorderState};
use crate::surface::{ControlSurface, ElementId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

/// Starts and stops recording on the current session's recorder and
/// publishes every recorded chunk to the page and the download sink.
pub struct RecordingController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    surface: Arc<dyn ControlSurface>,
    sink: Arc<DownloadSink>,
    urls: Arc<ObjectUrls>,
    timer: RecordingTimer,
    prefix: String,
    timeslice: Option<Duration>,
    state: Mutex<RecordingState>,
    recorder: Mutex<Option<Arc<dyn MediaRecorder>>>,
}

impl RecordingController {
    pub fn new(
        surface: Arc<dyn ControlSurface>,
        sink: Arc<DownloadSink>,
        urls: Arc<ObjectUrls>,
        prefix: impl Into<String>,
        timer_interval: Duration,
        timeslice: Option<Duration>,
    ) -> Self {
        let timer = RecordingTimer::new(Arc::clone(&surface), timer_interval);
        Self {
            inner: Arc::new(ControllerInner {
                surface,
                sink,
                urls,
                timer,
                prefix: prefix.into(),
                timeslice,
                state: Mutex::new(RecordingState::Idle),
                recorder: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> RecordingState {
        *self.inner.state.lock()
    }

    pub fn is_timer_running(&self) -> bool {
        self.inner.timer.is_running()
    }

    /// Switch to the recorder of a newly acquired session
    pub fn attach(
        &self,
        recorder: Arc<dyn MediaRecorder>,
        mut events: mpsc::UnboundedReceiver<RecorderEvent>,
    ) {
        *self.inner.recorder.lock() = Some(recorder);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                inner.handle_event(event).await;
            }
            debug!("Recorder event stream closed");
        });
    }

    pub fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if *state != RecordingState::Idle {
            return Err(RecordingError::NotIdle.into());
        }

        let recorder = self
            .inner
            .recorder
            .lock()
            .clone()
            .ok_or(RecordingError::NoSession)?;

        let surface = &self.inner.surface;
        surface.set_displayed(ElementId::VideoOutput, false);
        if let Some(previous) = surface.media_source(ElementId::VideoOutput) {
            self.inner.urls.revoke(&previous);
            surface.set_media_source(ElementId::VideoOutput, None);
        }

        recorder.start(self.inner.timeslice)?;
        *state = RecordingState::Recording;
        info!("Recording requested");
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if *state != RecordingState::Recording {
            return Err(RecordingError::NotRecording.into());
        }

        let recorder = self
            .inner
            .recorder
            .lock()
            .clone()
            .ok_or(RecordingError::NoSession)?;

        recorder.stop()?;
        self.inner.timer.stop();
        *state = RecordingState::Idle;
        info!("Recording stop requested");
        Ok(())
    }
}

impl ControllerInner {
    async fn handle_event(&self, event: RecorderEvent) {
        match event {
            RecorderEvent::Started => {
                // Seed the readout when encoding actually begins
                let state = self.state.lock();
                if *state != RecordingState::Recording {
                    debug!("Recorder started after stop was requested, ignoring");
                    return;
                }
                debug!("Recorder started");
                self.timer.start();
            }
            RecorderEvent::DataAvailable(artifact) => {
                self.publish_chunk(artifact).await;
            }
            RecorderEvent::Stopped => {
                debug!("Recorder stopped");
                // A late stop from a previous run must not end a new one
                let restarted = self
                    .recorder
                    .lock()
                    .as_ref()
                    .map(|recorder| recorder.state() == RecorderState::Recording)
                    .unwrap_or(false);
                if !restarted {
                    self.timer.stop();
                    *self.state.lock() = RecordingState::Idle;
                }
            }
        }
    }

    async fn publish_chunk(&self, artifact: Artifact) {
        if artifact.is_empty() {
            warn!("Recorder delivered an empty chunk");
        }

        self.sink.save(&artifact, &self.prefix).await;

        if let Some(previous) = self.surface.media_source(ElementId::VideoOutput) {
            self.urls.revoke(&previous);
        }
        let url = self.urls.create(artifact);
        self.surface
            .set_media_source(ElementId::VideoOutput, Some(url));
        self.surface.load_media(ElementId::VideoOutput);
        self.surface.set_displayed(ElementId::VideoOutput, true);
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.inner.timer.stop();
    }
}
