//! End-to-end driver of the camera page.
//!
//! The harness acts like a user on the page: it commits control values,
//! clicks buttons and waits on element visibility, collecting logs and
//! page errors into a [`TestSession`].

mod scenario;
mod session;
#[cfg(test)]
mod tests;

pub use scenario::{check_video_input, run_scenario, ScenarioPlan};
pub use session::{TestReport, TestSession};
