use crate::error::Result;
use crate::surface::{ControlEvent, ControlSurface, ElementId, EventKind};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press does on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Click(ElementId),
    /// Commit the next option of a select control
    NextOption(ElementId),
    NextFrameRate,
    Quit,
}

pub fn key_action(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Char('p') => Some(KeyAction::Click(ElementId::StillCaptureButton)),
        KeyCode::Char('s') => Some(KeyAction::Click(ElementId::SnapshotButton)),
        KeyCode::Char('r') => Some(KeyAction::Click(ElementId::StartButton)),
        KeyCode::Char('t') => Some(KeyAction::Click(ElementId::StopButton)),
        KeyCode::Char('c') => Some(KeyAction::NextOption(ElementId::CameraSelector)),
        KeyCode::Char('x') => Some(KeyAction::NextOption(ElementId::ResolutionSelector)),
        KeyCode::Char('f') => Some(KeyAction::NextFrameRate),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

/// The value after `current` in `values`, wrapping around
pub fn next_value(values: &[String], current: Option<&str>) -> Option<String> {
    let position = current.and_then(|current| values.iter().position(|v| v == current));
    let next = match position {
        Some(index) => (index + 1) % values.len(),
        None => 0,
    };
    values.get(next).cloned()
}

/// Apply a key action to the page the way a user would
pub async fn perform(surface: &dyn ControlSurface, action: KeyAction, frame_rates: &[f64]) {
    match action {
        KeyAction::Click(id) => surface.click(id).await,
        KeyAction::NextOption(id) => {
            let values: Vec<String> = surface
                .options(id)
                .into_iter()
                .map(|option| option.value)
                .collect();
            if let Some(value) = next_value(&values, surface.value(id).as_deref()) {
                info!("Selecting {} = {}", id, value);
                surface.set_value(id, &value);
                surface.dispatch(ControlEvent::new(id, EventKind::Change)).await;
            }
        }
        KeyAction::NextFrameRate => {
            let values: Vec<String> = frame_rates.iter().map(|rate| rate.to_string()).collect();
            let current = surface.value(ElementId::FrameRateInput);
            if let Some(value) = next_value(&values, current.as_deref()) {
                info!("Frame rate = {}", value);
                surface.set_value(ElementId::FrameRateInput, &value);
                surface
                    .dispatch(ControlEvent::new(ElementId::FrameRateInput, EventKind::Input))
                    .await;
                surface
                    .dispatch(ControlEvent::new(ElementId::FrameRateInput, EventKind::Change))
                    .await;
            }
        }
        KeyAction::Quit => {}
    }
}

/// Drives the camera page from the terminal
pub struct KeyboardInputHandler {
    surface: Arc<dyn ControlSurface>,
    frame_rates: Vec<f64>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    /// `shutdown` is cancelled when the quit key is pressed
    pub fn new(
        surface: Arc<dyn ControlSurface>,
        frame_rates: Vec<f64>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            surface,
            frame_rates,
            cancellation_token: shutdown,
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!(
            "Keys: p photo, s snapshot, r record, t stop, c camera, f frame rate, x resolution, q quit"
        );

        let surface = Arc::clone(&self.surface);
        let frame_rates = self.frame_rates.clone();
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) if key_event.kind == KeyEventKind::Press => {
                                key_event
                            }
                            _ => continue,
                        };

                        match key_action(key_event.code) {
                            Some(KeyAction::Quit) => {
                                info!("Quit key pressed - requesting shutdown");
                                cancellation_token.cancel();
                                break;
                            }
                            Some(action) => {
                                let surface = Arc::clone(&surface);
                                let frame_rates = frame_rates.clone();
                                runtime_handle.spawn(async move {
                                    perform(surface.as_ref(), action, &frame_rates).await;
                                });
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Let the blocking task notice and restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{ErrorSink, HeadlessPage, SelectOption};

    fn page() -> Arc<HeadlessPage> {
        Arc::new(HeadlessPage::new((64, 36), Arc::new(ErrorSink::new())))
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            key_action(KeyCode::Char('p')),
            Some(KeyAction::Click(ElementId::StillCaptureButton))
        );
        assert_eq!(
            key_action(KeyCode::Char('c')),
            Some(KeyAction::NextOption(ElementId::CameraSelector))
        );
        assert_eq!(key_action(KeyCode::Esc), Some(KeyAction::Quit));
        assert_eq!(key_action(KeyCode::Char('z')), None);
    }

    #[test]
    fn test_next_value_wraps() {
        let values = vec!["a".to_string(), "b".to_string()];
        assert_eq!(next_value(&values, Some("a")).as_deref(), Some("b"));
        assert_eq!(next_value(&values, Some("b")).as_deref(), Some("a"));
        assert_eq!(next_value(&values, Some("zzz")).as_deref(), Some("a"));
        assert_eq!(next_value(&values, None).as_deref(), Some("a"));
        assert_eq!(next_value(&[], None), None);
    }

    #[tokio::test]
    async fn test_next_option_commits_value() {
        let page = page();
        for value in ["front", "back"] {
            page.append_option(
                ElementId::CameraSelector,
                SelectOption {
                    value: value.to_string(),
                    text: value.to_string(),
                },
            );
        }

        perform(
            &*page,
            KeyAction::NextOption(ElementId::CameraSelector),
            &[],
        )
        .await;
        assert_eq!(page.value(ElementId::CameraSelector).as_deref(), Some("back"));
    }

    #[tokio::test]
    async fn test_next_frame_rate_cycles_configured_rates() {
        let page = page();
        page.set_value(ElementId::FrameRateInput, "30");

        perform(&*page, KeyAction::NextFrameRate, &[30.0, 2.0]).await;
        assert_eq!(page.value(ElementId::FrameRateInput).as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let handler = KeyboardInputHandler::new(page(), vec![30.0], CancellationToken::new());
        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}
