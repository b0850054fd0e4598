mod builder;
mod camera_app;
mod handlers;

#[cfg(test)]
mod tests;

pub use builder::CameraAppBuilder;
pub use camera_app::{launch, CameraApp};
