mod manager;

pub use manager::{DeviceSession, SessionManager};
