//! Starts a text reveal and an expression pattern together

use std::time::Duration;

use crate::expression::ExpressionDriver;
use crate::pattern::Pattern;
use crate::reveal::{OnComplete, TextRevealer};
use crate::surface::{AvatarSurface, TextSurface};

/// Narrow interface for anything that wants the pet to say something.
pub trait MessageSink {
    fn show_message(&mut self, text: &str, pattern: Pattern);
}

/// Couples the text revealer and the expression driver.
///
/// The two only share the duration computed at the start; there is no
/// correction if they drift apart afterwards.
pub struct Synchronizer<A: AvatarSurface, T: TextSurface> {
    driver: ExpressionDriver<A>,
    revealer: TextRevealer<T>,
}

impl<A: AvatarSurface, T: TextSurface> Synchronizer<A, T> {
    pub fn new(driver: ExpressionDriver<A>, revealer: TextRevealer<T>) -> Self {
        Self { driver, revealer }
    }

    /// Reveal `message` while playing `pattern` for the same span.
    pub fn present(
        &mut self,
        message: &str,
        pattern: Pattern,
        on_complete: Option<OnComplete>,
    ) -> Duration {
        self.present_tagged(message, None, pattern, on_complete)
    }

    /// Same as [`present`](Self::present) with a style tag on the text.
    pub fn present_tagged(
        &mut self,
        message: &str,
        tag: Option<&str>,
        pattern: Pattern,
        on_complete: Option<OnComplete>,
    ) -> Duration {
        let duration = self.revealer.reveal(message, tag, on_complete);
        self.driver.start_pattern(pattern, duration);
        log::debug!(
            "Presenting {} chars with {} for {:.2}s",
            message.chars().count(),
            pattern,
            duration.as_secs_f32()
        );
        duration
    }

    /// Advance both by `delta` seconds.
    pub fn update(&mut self, delta: f32) {
        self.revealer.update(delta);
        self.driver.update(delta);
    }

    /// Show the whole message now and stop talking.
    pub fn skip(&mut self) {
        self.revealer.skip();
        self.driver.stop();
    }

    /// True while either side is still running.
    pub fn is_busy(&self) -> bool {
        self.revealer.is_active() || self.driver.is_playing()
    }

    pub fn driver(&self) -> &ExpressionDriver<A> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut ExpressionDriver<A> {
        &mut self.driver
    }

    pub fn revealer(&self) -> &TextRevealer<T> {
        &self.revealer
    }

    pub fn revealer_mut(&mut self) -> &mut TextRevealer<T> {
        &mut self.revealer
    }
}

impl<A: AvatarSurface, T: TextSurface> MessageSink for Synchronizer<A, T> {
    fn show_message(&mut self, text: &str, pattern: Pattern) {
        self.present(text, pattern, None);
    }
}
