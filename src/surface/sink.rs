use parking_lot::Mutex;
use std::fmt::Display;
use tracing::error;

/// Collects failures nobody else handled.
///
/// Stands in for page-wide error and unhandled-rejection listeners. The
/// page reports failed event handlers here and the test harness reads it,
/// so each test run owns its own sink.
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Mutex<Vec<String>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure raised synchronously by a handler
    pub fn report_error(&self, source: &str, err: &dyn Display) {
        error!("Uncaught error in {}: {}", source, err);
        self.errors.lock().push(err.to_string());
    }

    /// Failure of a handler after it suspended
    pub fn report_rejection(&self, source: &str, err: &dyn Display) {
        error!("Unhandled rejection in {}: {}", source, err);
        self.errors.lock().push(err.to_string());
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn first(&self) -> Option<String> {
        self.errors.lock().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}
