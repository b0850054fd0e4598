use super::{
    ControlEvent, ControlSurface, ElementId, ErrorSink, EventKind, Handler, SelectOption,
};
use crate::platform::ObjectUrl;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::task::Poll;
use tracing::{debug, trace};

#[derive(Default)]
struct PageState {
    hidden: HashMap<ElementId, bool>,
    values: HashMap<ElementId, String>,
    texts: HashMap<ElementId, String>,
    text_updates: HashMap<ElementId, u64>,
    options: HashMap<ElementId, Vec<SelectOption>>,
    streams: HashMap<ElementId, String>,
    canvases: HashMap<ElementId, RgbaImage>,
    media_sources: HashMap<ElementId, ObjectUrl>,
    media_loads: HashMap<ElementId, u64>,
}

/// In-memory page implementing [`ControlSurface`].
///
/// Elements start displayed except the recording preview, which stays
/// hidden until a recording is available.
pub struct HeadlessPage {
    state: Mutex<PageState>,
    listeners: Mutex<HashMap<(ElementId, EventKind), Vec<Handler>>>,
    canvas_size: (u32, u32),
    errors: Arc<ErrorSink>,
}

impl HeadlessPage {
    pub fn new(canvas_size: (u32, u32), errors: Arc<ErrorSink>) -> Self {
        let mut state = PageState::default();
        state.hidden.insert(ElementId::VideoOutput, true);
        state
            .canvases
            .insert(ElementId::PhotoOutput, blank_canvas(canvas_size));

        Self {
            state: Mutex::new(state),
            listeners: Mutex::new(HashMap::new()),
            canvas_size,
            errors,
        }
    }

    pub fn errors(&self) -> &Arc<ErrorSink> {
        &self.errors
    }

    /// How many times an element's text has been written
    pub fn text_updates(&self, id: ElementId) -> u64 {
        self.state.lock().text_updates.get(&id).copied().unwrap_or(0)
    }

    /// How many times a media element has been reloaded
    pub fn media_loads(&self, id: ElementId) -> u64 {
        self.state.lock().media_loads.get(&id).copied().unwrap_or(0)
    }

    pub fn listener_count(&self, id: ElementId, kind: EventKind) -> usize {
        self.listeners
            .lock()
            .get(&(id, kind))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ControlSurface for HeadlessPage {
    fn is_displayed(&self, id: ElementId) -> bool {
        !self.state.lock().hidden.get(&id).copied().unwrap_or(false)
    }

    fn set_displayed(&self, id: ElementId, displayed: bool) {
        trace!("{} display: {}", id, displayed);
        self.state.lock().hidden.insert(id, !displayed);
    }

    fn value(&self, id: ElementId) -> Option<String> {
        self.state.lock().values.get(&id).cloned()
    }

    fn set_value(&self, id: ElementId, value: &str) {
        self.state.lock().values.insert(id, value.to_string());
    }

    fn text(&self, id: ElementId) -> Option<String> {
        self.state.lock().texts.get(&id).cloned()
    }

    fn set_text(&self, id: ElementId, text: &str) {
        let mut state = self.state.lock();
        state.texts.insert(id, text.to_string());
        *state.text_updates.entry(id).or_insert(0) += 1;
    }

    fn options(&self, id: ElementId) -> Vec<SelectOption> {
        self.state.lock().options.get(&id).cloned().unwrap_or_default()
    }

    fn clear_options(&self, id: ElementId) {
        let mut state = self.state.lock();
        state.options.remove(&id);
        state.values.remove(&id);
    }

    fn append_option(&self, id: ElementId, option: SelectOption) {
        let mut state = self.state.lock();
        // A select with no value adopts its first option
        if !state.values.contains_key(&id) {
            state.values.insert(id, option.value.clone());
        }
        state.options.entry(id).or_default().push(option);
    }

    fn set_source_stream(&self, id: ElementId, stream_id: Option<String>) {
        let mut state = self.state.lock();
        match stream_id {
            Some(stream_id) => {
                state.streams.insert(id, stream_id);
            }
            None => {
                state.streams.remove(&id);
            }
        }
    }

    fn source_stream(&self, id: ElementId) -> Option<String> {
        self.state.lock().streams.get(&id).cloned()
    }

    fn canvas_size(&self, _id: ElementId) -> (u32, u32) {
        self.canvas_size
    }

    fn put_canvas(&self, id: ElementId, image: RgbaImage) {
        self.state.lock().canvases.insert(id, image);
    }

    fn canvas(&self, id: ElementId) -> Option<RgbaImage> {
        self.state.lock().canvases.get(&id).cloned()
    }

    fn media_source(&self, id: ElementId) -> Option<ObjectUrl> {
        self.state.lock().media_sources.get(&id).cloned()
    }

    fn set_media_source(&self, id: ElementId, url: Option<ObjectUrl>) {
        let mut state = self.state.lock();
        match url {
            Some(url) => {
                state.media_sources.insert(id, url);
            }
            None => {
                state.media_sources.remove(&id);
            }
        }
    }

    fn load_media(&self, id: ElementId) {
        *self.state.lock().media_loads.entry(id).or_insert(0) += 1;
    }

    fn add_event_listener(&self, id: ElementId, kind: EventKind, handler: Handler) {
        debug!("Registered {:?} listener on {}", kind, id);
        self.listeners
            .lock()
            .entry((id, kind))
            .or_default()
            .push(handler);
    }

    async fn dispatch(&self, event: ControlEvent) {
        let handlers = self
            .listeners
            .lock()
            .get(&(event.target, event.kind))
            .cloned()
            .unwrap_or_default();

        trace!(
            "Dispatching {:?} on {} to {} listener(s)",
            event.kind,
            event.target,
            handlers.len()
        );

        for handler in handlers {
            let mut task = handler(event);

            // Run up to the first suspension point before returning, the
            // way a browser runs listeners synchronously.
            match futures::poll!(task.as_mut()) {
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(e)) => {
                    self.errors.report_error(event.target.dom_id(), &e);
                }
                Poll::Pending => {
                    let errors = Arc::clone(&self.errors);
                    tokio::spawn(async move {
                        if let Err(e) = task.await {
                            errors.report_rejection(event.target.dom_id(), &e);
                        }
                    });
                }
            }
        }
    }
}

fn blank_canvas((width, height): (u32, u32)) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]))
}
