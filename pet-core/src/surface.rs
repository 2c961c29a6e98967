//! Display surfaces written by the drivers and read by the window

use crate::expression::{Expression, ExpressionImage};

/// Surface that shows one avatar expression at a time.
pub trait AvatarSurface {
    /// Replace the displayed image.
    fn display(&mut self, expression: Expression, image: &ExpressionImage);
}

/// Surface that receives dialog text.
pub trait TextSurface {
    /// Remove all text.
    fn clear(&mut self);
    /// Append a single character, optionally tagged for styling.
    fn append(&mut self, ch: char, tag: Option<&str>);
    /// Replace the whole content in one go.
    fn set_text(&mut self, text: &str, tag: Option<&str>);
    /// Keep the last character in view.
    fn scroll_to_end(&mut self);
    /// Lock or unlock the surface for user edits.
    fn set_read_only(&mut self, read_only: bool);
}

/// Avatar state as seen by the renderer.
///
/// The window keeps one texture per expression and draws the one named here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvatarFrame {
    current: Option<Expression>,
    /// Incremented on every display call
    revision: u64,
}

impl AvatarFrame {
    /// Currently displayed expression, if any has been shown yet.
    pub fn current(&self) -> Option<Expression> {
        self.current
    }

    /// Number of display updates so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl AvatarSurface for AvatarFrame {
    fn display(&mut self, expression: Expression, _image: &ExpressionImage) {
        self.current = Some(expression);
        self.revision += 1;
    }
}

/// A run of dialog text sharing one style tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSpan {
    pub text: String,
    pub tag: Option<String>,
}

/// In-memory text surface backing the dialog box.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogBuffer {
    spans: Vec<DialogSpan>,
    read_only: bool,
    /// Set when new text arrived; cleared by the renderer after scrolling
    scroll_pending: bool,
}

impl Default for DialogBuffer {
    fn default() -> Self {
        Self {
            spans: Vec::new(),
            read_only: true,
            scroll_pending: false,
        }
    }
}

impl DialogBuffer {
    /// Full plain text.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Styled runs in display order.
    pub fn spans(&self) -> &[DialogSpan] {
        &self.spans
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns true once after each scroll request.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.text.is_empty())
    }
}

impl TextSurface for DialogBuffer {
    fn clear(&mut self) {
        self.spans.clear();
    }

    fn append(&mut self, ch: char, tag: Option<&str>) {
        if self.read_only {
            log::warn!("Dialog append while read-only, unlocking");
            self.read_only = false;
        }
        match self.spans.last_mut() {
            Some(span) if span.tag.as_deref() == tag => span.text.push(ch),
            _ => self.spans.push(DialogSpan {
                text: ch.to_string(),
                tag: tag.map(str::to_string),
            }),
        }
    }

    fn set_text(&mut self, text: &str, tag: Option<&str>) {
        self.spans.clear();
        if !text.is_empty() {
            self.spans.push(DialogSpan {
                text: text.to_string(),
                tag: tag.map(str::to_string),
            });
        }
    }

    fn scroll_to_end(&mut self) {
        self.scroll_pending = true;
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_buffer_merges_spans_by_tag() {
        let mut buf = DialogBuffer::default();
        buf.set_read_only(false);
        buf.append('a', None);
        buf.append('b', None);
        buf.append('c', Some("reminder"));
        assert_eq!(buf.text(), "abc");
        assert_eq!(buf.spans().len(), 2);
        assert_eq!(buf.spans()[1].tag.as_deref(), Some("reminder"));
    }

    #[test]
    fn test_dialog_buffer_scroll_request_is_taken_once() {
        let mut buf = DialogBuffer::default();
        buf.scroll_to_end();
        assert!(buf.take_scroll_request());
        assert!(!buf.take_scroll_request());
    }

    #[test]
    fn test_set_text_replaces_content() {
        let mut buf = DialogBuffer::default();
        buf.set_read_only(false);
        buf.append('x', None);
        buf.set_text("hello", None);
        assert_eq!(buf.text(), "hello");
        buf.set_text("", None);
        assert!(buf.is_empty());
    }
}
