//! Typewriter text reveal

use std::time::Duration;

use thiserror::Error;

use crate::surface::TextSurface;

/// Called once when a reveal session finishes.
pub type OnComplete = Box<dyn FnOnce()>;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Sound pulse failed: {0}")]
    Playback(String),
}

/// Short sound played for each revealed character.
pub trait Pulse {
    fn pulse(&mut self) -> Result<(), PulseError>;
}

/// Time needed to reveal `text` when the first character shows immediately.
///
/// `(chars - 1) * per_char_delay`, or zero for fewer than two characters.
pub fn compute_duration(text: &str, per_char_delay: Duration) -> Duration {
    let count = text.chars().count();
    if count <= 1 {
        return Duration::ZERO;
    }
    per_char_delay * (count as u32 - 1)
}

/// One typewriter pass over a string
struct RevealSession {
    chars: Vec<char>,
    full_text: String,
    index: usize,
    tag: Option<String>,
    on_complete: Option<OnComplete>,
    /// Precomputed total time
    duration: Duration,
    /// Time since the last revealed character
    since_step: f32,
    active: bool,
}

/// Reveals text one character at a time into a text surface.
///
/// Owns its surface: nothing else writes the dialog text.
pub struct TextRevealer<S: TextSurface> {
    surface: S,
    per_char_delay: Duration,
    pulse: Option<Box<dyn Pulse>>,
    session: Option<RevealSession>,
}

impl<S: TextSurface> TextRevealer<S> {
    pub fn new(surface: S, per_char_delay: Duration) -> Self {
        Self {
            surface,
            per_char_delay,
            pulse: None,
            session: None,
        }
    }

    /// Play `pulse` for every revealed character.
    pub fn with_pulse(mut self, pulse: Box<dyn Pulse>) -> Self {
        self.pulse = Some(pulse);
        self
    }

    pub fn set_pulse(&mut self, pulse: Option<Box<dyn Pulse>>) {
        self.pulse = pulse;
    }

    pub fn per_char_delay(&self) -> Duration {
        self.per_char_delay
    }

    /// Start revealing `text`. Returns the total reveal time.
    ///
    /// A running session is cancelled first; its partial text is cleared by
    /// the new session and its callback never runs.
    pub fn reveal(
        &mut self,
        text: &str,
        tag: Option<&str>,
        on_complete: Option<OnComplete>,
    ) -> Duration {
        if self.is_active() {
            self.cancel();
        }

        self.surface.set_read_only(false);
        self.surface.clear();

        let duration = compute_duration(text, self.per_char_delay);
        self.session = Some(RevealSession {
            chars: text.chars().collect(),
            full_text: text.to_string(),
            index: 0,
            tag: tag.map(str::to_string),
            on_complete,
            duration,
            since_step: 0.0,
            active: true,
        });

        // First character shows right away
        self.step();
        duration
    }

    /// Reveal the next character, finishing the session when none remain.
    fn step(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.active {
            return;
        }

        if session.index < session.chars.len() {
            if let Some(pulse) = self.pulse.as_mut() {
                if let Err(e) = pulse.pulse() {
                    log::warn!("{}", e);
                }
            }

            let ch = session.chars[session.index];
            self.surface.append(ch, session.tag.as_deref());
            self.surface.scroll_to_end();
            session.index += 1;
        }

        if session.index >= session.chars.len() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        let callback = match self.session.as_mut() {
            Some(session) => {
                session.active = false;
                session.on_complete.take()
            }
            None => None,
        };
        self.surface.set_read_only(true);
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Advance the running session by `delta` seconds.
    pub fn update(&mut self, delta: f32) {
        let delay = self.per_char_delay.as_secs_f32();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.active {
            return;
        }

        if delay <= 0.0 {
            while self.is_active() {
                self.step();
            }
            return;
        }

        session.since_step += delta;
        while let Some(session) = self.session.as_mut().filter(|s| s.active) {
            if session.since_step < delay {
                break;
            }
            session.since_step -= delay;
            self.step();
        }
    }

    /// Stop the running session, leaving its partial text in place.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.active {
                session.active = false;
                log::debug!(
                    "Reveal cancelled at {}/{}",
                    session.index,
                    session.chars.len()
                );
            }
        }
        self.surface.set_read_only(true);
    }

    /// Cancel and show the whole text at once.
    pub fn skip(&mut self) {
        self.cancel();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.surface.set_read_only(false);
        self.surface
            .set_text(&session.full_text, session.tag.as_deref());
        self.surface.scroll_to_end();
        session.index = session.chars.len();
        let callback = session.on_complete.take();
        self.surface.set_read_only(true);

        if let Some(callback) = callback {
            callback();
        }
    }

    /// True while a session is revealing text.
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.active)
    }

    /// Characters revealed so far in the current session.
    pub fn index(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.index)
    }

    /// Text of the current or last session.
    pub fn full_text(&self) -> &str {
        self.session.as_ref().map_or("", |s| s.full_text.as_str())
    }

    /// Total time computed for the current or last session.
    pub fn duration(&self) -> Duration {
        self.session.as_ref().map_or(Duration::ZERO, |s| s.duration)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::DialogBuffer;
    use std::cell::Cell;
    use std::rc::Rc;

    const DELAY: Duration = Duration::from_millis(50);

    fn revealer() -> TextRevealer<DialogBuffer> {
        TextRevealer::new(DialogBuffer::default(), DELAY)
    }

    fn counter() -> (Rc<Cell<u32>>, OnComplete) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, Box::new(move || c.set(c.get() + 1)))
    }

    struct CountingPulse(Rc<Cell<u32>>);

    impl Pulse for CountingPulse {
        fn pulse(&mut self) -> Result<(), PulseError> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    struct BrokenPulse;

    impl Pulse for BrokenPulse {
        fn pulse(&mut self) -> Result<(), PulseError> {
            Err(PulseError::Playback("no device".to_string()))
        }
    }

    #[test]
    fn test_compute_duration() {
        assert_eq!(compute_duration("", DELAY), Duration::ZERO);
        assert_eq!(compute_duration("a", DELAY), Duration::ZERO);
        assert_eq!(compute_duration("ab", DELAY), Duration::from_millis(50));
        assert_eq!(compute_duration("你好世界", DELAY), Duration::from_millis(150));
    }

    #[test]
    fn test_reveal_steps_and_completes_once() {
        let mut r = revealer();
        let (count, on_complete) = counter();

        let duration = r.reveal("Hey", None, Some(on_complete));
        assert_eq!(duration, Duration::from_millis(100));
        assert_eq!(r.surface().text(), "H");
        assert!(r.is_active());
        assert!(!r.surface().is_read_only());

        r.update(0.05);
        assert_eq!(r.surface().text(), "He");
        r.update(0.06);
        assert_eq!(r.surface().text(), "Hey");
        assert!(!r.is_active());
        assert!(r.surface().is_read_only());
        assert_eq!(count.get(), 1);

        r.update(1.0);
        assert_eq!(count.get(), 1);
        assert_eq!(r.index(), 3);
    }

    #[test]
    fn test_large_delta_reveals_several_characters() {
        let mut r = revealer();
        r.reveal("abcdef", None, None);
        r.update(0.16);
        assert_eq!(r.surface().text(), "abcd");
    }

    #[test]
    fn test_skip_shows_full_text_and_calls_back_once() {
        let mut r = revealer();
        let (count, on_complete) = counter();
        r.reveal("Hello there", Some("reminder"), Some(on_complete));
        r.skip();

        assert_eq!(r.surface().text(), "Hello there");
        assert_eq!(r.surface().spans()[0].tag.as_deref(), Some("reminder"));
        assert!(!r.is_active());
        assert_eq!(count.get(), 1);

        r.skip();
        r.update(1.0);
        assert_eq!(count.get(), 1);
        assert_eq!(r.surface().text(), "Hello there");
    }

    #[test]
    fn test_second_reveal_cancels_first() {
        let mut r = revealer();
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();

        r.reveal("first message", None, Some(first_cb));
        r.update(0.05);
        r.reveal("xy", None, Some(second_cb));
        assert_eq!(r.surface().text(), "x");

        r.update(0.05);
        assert_eq!(r.surface().text(), "xy");
        r.update(2.0);
        assert_eq!(r.surface().text(), "xy");
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn test_empty_text_completes_immediately() {
        let mut r = revealer();
        let (count, on_complete) = counter();
        let duration = r.reveal("", None, Some(on_complete));
        assert_eq!(duration, Duration::ZERO);
        assert_eq!(count.get(), 1);
        assert!(r.surface().is_empty());
        assert!(!r.is_active());
    }

    #[test]
    fn test_single_character_reveals_one_step() {
        let mut r = revealer();
        let (count, on_complete) = counter();
        let duration = r.reveal("!", None, Some(on_complete));
        assert_eq!(duration, Duration::ZERO);
        assert_eq!(r.surface().text(), "!");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_cancel_keeps_partial_text_and_is_idempotent() {
        let mut r = revealer();
        let (count, on_complete) = counter();
        r.reveal("abc", None, Some(on_complete));
        r.cancel();
        r.cancel();
        r.update(1.0);
        assert_eq!(r.surface().text(), "a");
        assert!(!r.is_active());
        assert!(r.surface().is_read_only());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_pulse_per_character() {
        let pulses = Rc::new(Cell::new(0));
        let mut r = revealer().with_pulse(Box::new(CountingPulse(pulses.clone())));
        r.reveal("abcd", None, None);
        r.update(1.0);
        assert_eq!(pulses.get(), 4);
    }

    #[test]
    fn test_pulse_failure_does_not_interrupt() {
        let mut r = revealer().with_pulse(Box::new(BrokenPulse));
        r.reveal("abcd", None, None);
        r.update(1.0);
        assert_eq!(r.surface().text(), "abcd");
    }

    #[test]
    fn test_multibyte_text_is_revealed_per_char() {
        let mut r = revealer();
        r.reveal("你好", None, None);
        assert_eq!(r.surface().text(), "你");
        r.update(0.05);
        assert_eq!(r.surface().text(), "你好");
    }
}
