//! Avatar expressions and the driver that cycles them

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use image::{imageops::FilterType, Rgba, RgbaImage};
use thiserror::Error;

use crate::pattern::Pattern;
use crate::surface::AvatarSurface;

/// Default edge length of an expression image in pixels
pub const DEFAULT_EXPRESSION_SIZE: u32 = 80;

const LIGHT_BLUE: [u8; 4] = [173, 216, 230, 255];
const LIGHT_CORAL: [u8; 4] = [240, 128, 128, 255];

/// A pattern or expression name that is not known
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown name '{0}'")]
pub struct UnknownName(pub String);

/// One of the avatar's fixed faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Mouth closed, also the idle face
    Close,
    OpenA,
    OpenB,
    Denying,
}

impl Expression {
    pub const ALL: [Expression; 4] = [Self::Close, Self::OpenA, Self::OpenB, Self::Denying];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::OpenA => "open-a",
            Self::OpenB => "open-b",
            Self::Denying => "denying",
        }
    }

    /// Fill color of the synthesized placeholder
    pub fn placeholder_color(&self) -> [u8; 4] {
        match self {
            Self::Denying => LIGHT_CORAL,
            _ => LIGHT_BLUE,
        }
    }
}

impl FromStr for Expression {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "close" | "idle" => Ok(Self::Close),
            "open-a" | "opena" | "open1" => Ok(Self::OpenA),
            "open-b" | "openb" | "open2" => Ok(Self::OpenB),
            "denying" | "deny" => Ok(Self::Denying),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

/// File names of each expression, relative to the avatar directory
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionFiles {
    pub close: String,
    pub open_a: String,
    pub open_b: String,
    pub denying: String,
}

impl Default for ExpressionFiles {
    fn default() -> Self {
        Self {
            close: "face1.2.1.png".to_string(),
            open_a: "face1.1.1.png".to_string(),
            open_b: "face1.3.png".to_string(),
            denying: "face1.4.png".to_string(),
        }
    }
}

impl ExpressionFiles {
    pub fn file_for(&self, expression: Expression) -> &str {
        match expression {
            Expression::Close => &self.close,
            Expression::OpenA => &self.open_a,
            Expression::OpenB => &self.open_b,
            Expression::Denying => &self.denying,
        }
    }
}

/// Decoded RGBA pixels of one expression
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionImage {
    rgba: RgbaImage,
}

impl ExpressionImage {
    /// Solid square of the given color.
    pub fn solid(size: u32, color: [u8; 4]) -> Self {
        Self {
            rgba: RgbaImage::from_pixel(size, size, Rgba(color)),
        }
    }

    /// Load an image file and resize it to a `size`×`size` square.
    pub fn from_path(path: impl AsRef<Path>, size: u32) -> Result<Self, image::ImageError> {
        let img = image::open(path)?;
        Ok(Self {
            rgba: img.resize_exact(size, size, FilterType::Lanczos3).to_rgba8(),
        })
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.rgba.as_raw()
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }
}

/// The complete, immutable set of expressions
#[derive(Debug, Clone)]
pub struct ExpressionSet {
    images: HashMap<Expression, ExpressionImage>,
    size: u32,
}

impl ExpressionSet {
    /// Solid-color placeholders for every expression.
    pub fn placeholders(size: u32) -> Self {
        let images = Expression::ALL
            .iter()
            .map(|e| (*e, ExpressionImage::solid(size, e.placeholder_color())))
            .collect();
        Self { images, size }
    }

    /// Load every expression from `dir`. Never fails: missing or broken files
    /// are replaced by placeholders.
    pub fn load(dir: impl AsRef<Path>, files: &ExpressionFiles, size: u32) -> Self {
        let dir = dir.as_ref();
        let mut images = HashMap::new();

        for expression in Expression::ALL {
            let path: PathBuf = dir.join(files.file_for(expression));
            let image = if path.exists() {
                match ExpressionImage::from_path(&path, size) {
                    Ok(image) => {
                        log::info!("Loaded expression '{}' from {}", expression.as_str(), path.display());
                        image
                    }
                    Err(e) => {
                        log::error!("Failed to load expression image {}: {}", path.display(), e);
                        ExpressionImage::solid(size, expression.placeholder_color())
                    }
                }
            } else {
                log::info!("Creating placeholder expression: {}", expression.as_str());
                ExpressionImage::solid(size, expression.placeholder_color())
            };
            images.insert(expression, image);
        }

        Self { images, size }
    }

    /// Image for an expression.
    pub fn image(&self, expression: Expression) -> &ExpressionImage {
        // Every constructor fills all of Expression::ALL
        &self.images[&expression]
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn available(&self) -> Vec<Expression> {
        Expression::ALL.to_vec()
    }
}

/// Identifies one started pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternHandle(u64);

/// Running pattern bookkeeping
#[derive(Debug, Clone)]
struct ActivePattern {
    handle: PatternHandle,
    pattern: Pattern,
    /// Total run time in seconds
    duration: f32,
    elapsed: f32,
    /// Time since the last frame change
    tick_accumulator: f32,
    step: u64,
}

/// Drives the avatar surface through expression patterns.
///
/// Owns its surface: nothing else writes the avatar image.
pub struct ExpressionDriver<S: AvatarSurface> {
    expressions: ExpressionSet,
    surface: S,
    current: Option<Expression>,
    active: Option<ActivePattern>,
    next_handle: u64,
}

impl<S: AvatarSurface> ExpressionDriver<S> {
    /// Create a driver showing the closed face.
    pub fn new(expressions: ExpressionSet, surface: S) -> Self {
        let mut driver = Self {
            expressions,
            surface,
            current: None,
            active: None,
            next_handle: 1,
        };
        driver.set_expression(Expression::Close);
        driver
    }

    /// Show an expression. Returns false when it was already displayed.
    pub fn set_expression(&mut self, expression: Expression) -> bool {
        if self.current == Some(expression) {
            return false;
        }
        self.current = Some(expression);
        self.surface
            .display(expression, self.expressions.image(expression));
        true
    }

    /// Start a pattern for `duration`, replacing whatever was running.
    pub fn start_pattern(&mut self, pattern: Pattern, duration: Duration) -> PatternHandle {
        self.cancel();

        let handle = PatternHandle(self.next_handle);
        self.next_handle += 1;

        if duration.is_zero() {
            log::debug!("Pattern {} has zero duration, staying closed", pattern);
            self.set_expression(Expression::Close);
            return handle;
        }

        log::debug!("Starting pattern {} for {:.2}s", pattern, duration.as_secs_f32());
        self.set_expression(pattern.frame(0));
        self.active = Some(ActivePattern {
            handle,
            pattern,
            duration: duration.as_secs_f32(),
            elapsed: 0.0,
            tick_accumulator: 0.0,
            step: 0,
        });
        handle
    }

    /// Stop the running pattern and return to the closed face.
    pub fn stop(&mut self) {
        self.cancel();
        self.set_expression(Expression::Close);
    }

    fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            log::debug!("Cancelled pattern {}", active.pattern);
        }
    }

    /// Advance the running pattern by `delta` seconds.
    pub fn update(&mut self, delta: f32) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        active.elapsed += delta;
        if active.elapsed >= active.duration {
            let pattern = active.pattern;
            self.active = None;
            self.set_expression(Expression::Close);
            log::debug!("Pattern {} finished", pattern);
            return;
        }

        active.tick_accumulator += delta;
        let tick = active.pattern.tick().as_secs_f32();
        let mut next = None;
        while active.tick_accumulator >= tick {
            active.tick_accumulator -= tick;
            active.step += 1;
            next = Some(active.pattern.frame(active.step));
        }
        if let Some(expression) = next {
            self.set_expression(expression);
        }
    }

    /// True while a pattern is running.
    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// True if `handle` is the pattern currently running.
    pub fn is_running(&self, handle: PatternHandle) -> bool {
        self.active.as_ref().is_some_and(|a| a.handle == handle)
    }

    /// The running pattern, if any.
    pub fn active_pattern(&self) -> Option<Pattern> {
        self.active.as_ref().map(|a| a.pattern)
    }

    pub fn current_expression(&self) -> Option<Expression> {
        self.current
    }

    pub fn expressions(&self) -> &ExpressionSet {
        &self.expressions
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::AvatarFrame;

    fn driver() -> ExpressionDriver<AvatarFrame> {
        ExpressionDriver::new(ExpressionSet::placeholders(8), AvatarFrame::default())
    }

    #[test]
    fn test_starts_closed() {
        let d = driver();
        assert_eq!(d.current_expression(), Some(Expression::Close));
        assert_eq!(d.surface().revision(), 1);
        assert!(!d.is_playing());
    }

    #[test]
    fn test_set_expression_repeat_is_noop() {
        let mut d = driver();
        assert!(d.set_expression(Expression::Denying));
        assert!(!d.set_expression(Expression::Denying));
        assert_eq!(d.surface().revision(), 2);
        assert_eq!(d.surface().current(), Some(Expression::Denying));
    }

    #[test]
    fn test_talking_alternates_then_reverts() {
        let mut d = driver();
        d.start_pattern(Pattern::TalkingA, Duration::from_secs(1));
        assert!(d.is_playing());
        assert_eq!(d.current_expression(), Some(Expression::OpenB));

        d.update(0.31);
        assert_eq!(d.current_expression(), Some(Expression::OpenA));
        d.update(0.31);
        assert_eq!(d.current_expression(), Some(Expression::OpenB));

        d.update(0.5);
        assert!(!d.is_playing());
        assert_eq!(d.current_expression(), Some(Expression::Close));
    }

    #[test]
    fn test_new_pattern_replaces_old() {
        let mut d = driver();
        let first = d.start_pattern(Pattern::TalkingB, Duration::from_secs(5));
        let second = d.start_pattern(Pattern::Denying, Duration::from_secs(1));
        assert!(!d.is_running(first));
        assert!(d.is_running(second));
        assert_eq!(d.active_pattern(), Some(Pattern::Denying));
        assert_eq!(d.current_expression(), Some(Expression::Denying));

        d.update(0.5);
        assert_eq!(d.current_expression(), Some(Expression::Denying));
        d.update(0.6);
        assert_eq!(d.current_expression(), Some(Expression::Close));
    }

    #[test]
    fn test_zero_duration_stays_closed() {
        let mut d = driver();
        let handle = d.start_pattern(Pattern::TalkingA, Duration::ZERO);
        assert!(!d.is_running(handle));
        assert_eq!(d.current_expression(), Some(Expression::Close));
    }

    #[test]
    fn test_single_holds_expression() {
        let mut d = driver();
        d.start_pattern(Pattern::Single(Expression::OpenA), Duration::from_millis(400));
        d.update(0.3);
        assert_eq!(d.current_expression(), Some(Expression::OpenA));
        d.update(0.2);
        assert_eq!(d.current_expression(), Some(Expression::Close));
    }

    #[test]
    fn test_stop_reverts_to_close() {
        let mut d = driver();
        d.start_pattern(Pattern::Denying, Duration::from_secs(3));
        d.stop();
        assert!(!d.is_playing());
        assert_eq!(d.current_expression(), Some(Expression::Close));
    }

    #[test]
    fn test_load_falls_back_to_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let files = ExpressionFiles::default();
        RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]))
            .save(dir.path().join(&files.open_a))
            .unwrap();
        std::fs::write(dir.path().join(&files.open_b), b"not a png").unwrap();

        let set = ExpressionSet::load(dir.path(), &files, 16);

        let open_a = set.image(Expression::OpenA);
        assert_eq!((open_a.width(), open_a.height()), (16, 16));
        assert_eq!(open_a.rgba().get_pixel(8, 8).0, [1, 2, 3, 255]);
        assert_eq!(set.image(Expression::OpenB), &ExpressionImage::solid(16, LIGHT_BLUE));
        assert_eq!(set.image(Expression::Denying), &ExpressionImage::solid(16, LIGHT_CORAL));
    }
}
