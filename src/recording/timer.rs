use crate::surface::{ControlSurface, ElementId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Elapsed time as `MM:SS`, truncated to whole seconds.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Periodically refreshes the elapsed-time readout while recording.
pub struct RecordingTimer {
    surface: Arc<dyn ControlSurface>,
    interval: Duration,
    running: Mutex<Option<CancellationToken>>,
}

impl RecordingTimer {
    pub fn new(surface: Arc<dyn ControlSurface>, interval: Duration) -> Self {
        Self {
            surface,
            interval,
            running: Mutex::new(None),
        }
    }

    /// Reset the readout to `00:00` and start counting from now
    pub fn start(&self) {
        self.stop();

        self.surface
            .set_text(ElementId::RecordingTimer, &format_elapsed(Duration::ZERO));

        let token = CancellationToken::new();
        *self.running.lock() = Some(token.clone());

        let surface = Arc::clone(&self.surface);
        let period = self.interval;
        let started = Instant::now();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if token.is_cancelled() {
                            break;
                        }
                        surface.set_text(ElementId::RecordingTimer, &format_elapsed(started.elapsed()));
                    }
                }
            }

            trace!("Recording timer stopped");
        });
    }

    pub fn stop(&self) {
        if let Some(token) = self.running.lock().take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Drop for RecordingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
