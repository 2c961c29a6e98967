use parking_lot::RwLock;
use std::sync::Arc;

// -- Inner state (the actual data) --

struct Inner {
    /// Text of the last presented message
    full_text: String,
    /// "Show full text" button, visible once a message finished revealing
    expand_visible: bool,
}

// -- PetState (thread-safe shared handle) --

/// State shared between the app context, completion callbacks and the window.
#[derive(Clone)]
pub struct PetState(Arc<RwLock<Inner>>);

impl PetState {
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(Inner {
            full_text: String::new(),
            expand_visible: false,
        })))
    }

    /// A new message started: remember its text and hide the expand button.
    pub fn begin_message(&self, text: &str) {
        let mut inner = self.0.write();
        inner.full_text = text.to_string();
        inner.expand_visible = false;
    }

    /// The current message is fully shown.
    pub fn finish_message(&self) {
        let mut inner = self.0.write();
        inner.expand_visible = true;
    }

    pub fn full_text(&self) -> String {
        self.0.read().full_text.clone()
    }

    pub fn expand_visible(&self) -> bool {
        self.0.read().expand_visible
    }
}

impl Default for PetState {
    fn default() -> Self {
        Self::new()
    }
}
