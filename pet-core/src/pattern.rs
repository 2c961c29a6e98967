//! Expression patterns: which face to show at each step, and for how long

use std::str::FromStr;
use std::time::Duration;

use crate::expression::{Expression, UnknownName};

/// A named, time-bounded expression behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Hold the closed face
    Idle,
    /// Alternate open-B, open-A, ...
    TalkingA,
    /// Alternate open-A, open-B, ...
    TalkingB,
    /// Hold the denying face
    Denying,
    /// Hold a single expression
    Single(Expression),
}

impl Pattern {
    /// How long each step holds before the next frame
    pub fn tick(&self) -> Duration {
        match self {
            Self::Idle => Duration::from_millis(500),
            Self::TalkingA | Self::TalkingB => Duration::from_millis(300),
            Self::Denying | Self::Single(_) => Duration::from_millis(100),
        }
    }

    /// Expression shown at the given step (0 is the first frame)
    pub fn frame(&self, step: u64) -> Expression {
        match self {
            Self::Idle => Expression::Close,
            Self::TalkingA => {
                if step % 2 == 0 {
                    Expression::OpenB
                } else {
                    Expression::OpenA
                }
            }
            Self::TalkingB => {
                if step % 2 == 0 {
                    Expression::OpenA
                } else {
                    Expression::OpenB
                }
            }
            Self::Denying => Expression::Denying,
            Self::Single(expression) => *expression,
        }
    }
}

/// Pattern names; any expression name holds that single face.
impl FromStr for Pattern {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" | "close" => Ok(Self::Idle),
            "talking-a" | "talkinga" | "talking1" | "talk" | "talking" => Ok(Self::TalkingA),
            "talking-b" | "talkingb" | "talking2" => Ok(Self::TalkingB),
            "denying" | "deny" => Ok(Self::Denying),
            other => other
                .parse::<Expression>()
                .map(Self::Single)
                .map_err(|_| UnknownName(s.to_string())),
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::TalkingA => write!(f, "talking-a"),
            Self::TalkingB => write!(f, "talking-b"),
            Self::Denying => write!(f, "denying"),
            Self::Single(expression) => write!(f, "single({})", expression.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_talking_patterns_alternate_in_opposite_phase() {
        let a: Vec<_> = (0..4).map(|s| Pattern::TalkingA.frame(s)).collect();
        let b: Vec<_> = (0..4).map(|s| Pattern::TalkingB.frame(s)).collect();
        assert_eq!(
            a,
            [Expression::OpenB, Expression::OpenA, Expression::OpenB, Expression::OpenA]
        );
        assert_eq!(
            b,
            [Expression::OpenA, Expression::OpenB, Expression::OpenA, Expression::OpenB]
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("talking1".parse(), Ok(Pattern::TalkingA));
        assert_eq!("Talking-B".parse(), Ok(Pattern::TalkingB));
        assert_eq!("deny".parse(), Ok(Pattern::Denying));
        assert_eq!("idle".parse(), Ok(Pattern::Idle));
        assert_eq!("open-a".parse(), Ok(Pattern::Single(Expression::OpenA)));
        assert_eq!("???".parse::<Pattern>(), Err(UnknownName("???".to_string())));
        assert_eq!("OPEN2".parse(), Ok(Expression::OpenB));
    }

    #[test]
    fn test_display_parses_back() {
        for pattern in [Pattern::Idle, Pattern::TalkingA, Pattern::TalkingB, Pattern::Denying] {
            assert_eq!(pattern.to_string().parse(), Ok(pattern));
        }
    }
}
