use crate::app::{launch, CameraApp};
use crate::error::HarnessError;
use crate::surface::{ControlSurface, ElementId, ErrorSink};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// State of one harness run, read by whoever observes the run.
pub struct TestSession {
    ready: AtomicBool,
    done: AtomicBool,
    logs: Mutex<Vec<String>>,
    errors: Arc<ErrorSink>,
    enumerate_devices_error: Mutex<String>,
    poll_interval: Duration,
}

/// Snapshot of a [`TestSession`] for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub ready: bool,
    pub done: bool,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
    pub enumerate_devices_error: String,
}

impl TestSession {
    /// A session collecting page failures from `errors`
    pub fn new(errors: Arc<ErrorSink>, poll_interval: Duration) -> Self {
        Self {
            ready: AtomicBool::new(false),
            done: AtomicBool::new(false),
            logs: Mutex::new(Vec::new()),
            errors,
            enumerate_devices_error: Mutex::new(String::new()),
            poll_interval,
        }
    }

    /// Whether the session has been attached to a running app
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Launch `app` with its failures reported into this session
    pub fn attach(&self, app: &Arc<CameraApp>) -> JoinHandle<()> {
        let handle = launch(app, Arc::clone(&self.errors));
        self.ready.store(true, Ordering::SeqCst);
        handle
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    pub(super) fn mark_done(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.errors()
    }

    pub fn error_sink(&self) -> &Arc<ErrorSink> {
        &self.errors
    }

    /// Text of the last device enumeration failure, empty if none
    pub fn enumerate_devices_error(&self) -> String {
        self.enumerate_devices_error.lock().clone()
    }

    pub(super) fn set_enumerate_devices_error(&self, error: String) {
        *self.enumerate_devices_error.lock() = error;
    }

    /// Append a timestamped log entry
    pub fn add_log(&self, msg: &str) {
        info!("{}", msg);
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.logs.lock().push(format!("[{}] {}", now, msg));
    }

    /// Poll `condition` until it holds or any page error has been reported
    pub async fn wait_for<F: Fn() -> bool>(&self, condition: F) {
        while !condition() && self.errors.is_empty() {
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn wait_for_element_display(
        &self,
        surface: &dyn ControlSurface,
        id: ElementId,
        displayed: bool,
    ) {
        self.wait_for(|| surface.is_displayed(id) == displayed).await
    }

    /// Fail the current step if the page has reported any error
    pub fn throw_if_error(&self, step: &str) -> Result<(), HarnessError> {
        match self.errors.first() {
            Some(first_error) => Err(HarnessError::StepFailed {
                step: step.to_string(),
                first_error,
            }),
            None => Ok(()),
        }
    }

    pub fn report(&self) -> TestReport {
        TestReport {
            ready: self.is_ready(),
            done: self.is_done(),
            logs: self.logs(),
            errors: self.errors(),
            enumerate_devices_error: self.enumerate_devices_error(),
        }
    }
}
