//! # pet-core
//!
//! The animation core of deskpet: an avatar that changes expression while a
//! dialog line is typed out character by character.
//!
//! ## Features
//! - Fixed expression set loaded from disk, with solid-color placeholders
//! - Timed expression patterns (idle, talking, denying, single-shot)
//! - Typewriter text reveal with per-character sound pulse, cancel and skip
//! - A synchronizer that starts both with one shared duration
//!
//! Everything here is stepped from the host's frame loop through
//! `update(delta)`, so all surface writes happen on the UI thread.
//!
//! ## Example
//!
//! ```no_run
//! use pet_core::{
//!     AvatarFrame, DialogBuffer, ExpressionDriver, ExpressionSet, Pattern, Synchronizer,
//!     TextRevealer,
//! };
//! use std::time::Duration;
//!
//! let expressions = ExpressionSet::placeholders(80);
//! let driver = ExpressionDriver::new(expressions, AvatarFrame::default());
//! let revealer = TextRevealer::new(DialogBuffer::default(), Duration::from_millis(50));
//! let mut sync = Synchronizer::new(driver, revealer);
//!
//! let duration = sync.present("Hello!", Pattern::TalkingA, None);
//! assert_eq!(duration, Duration::from_millis(250));
//!
//! // Each frame:
//! sync.update(1.0 / 30.0);
//! ```

pub mod expression;
pub mod pattern;
pub mod reveal;
pub mod surface;
pub mod sync;

pub use expression::{Expression, ExpressionDriver, ExpressionFiles, ExpressionImage, ExpressionSet, PatternHandle, UnknownName};
pub use pattern::Pattern;
pub use reveal::{compute_duration, OnComplete, Pulse, PulseError, TextRevealer};
pub use surface::{AvatarFrame, AvatarSurface, DialogBuffer, DialogSpan, TextSurface};
pub use sync::{MessageSink, Synchronizer};
