mod controller;
mod timer;

pub use controller::{RecordingController, RecordingState};
pub use timer::{format_elapsed, RecordingTimer};
