use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Practice flavour chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Untimed, answers can be revealed per question.
    Study,
    /// Timed, graded only at the end.
    Exam,
}

/// When the answer key becomes visible during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevealPolicy {
    Never,
    OnDemand,
    AtEnd,
}

/// Behavioural switches that distinguish one session flavour from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCapabilities {
    pub has_timer: bool,
    pub reveal: RevealPolicy,
}

impl SessionMode {
    #[must_use]
    pub fn capabilities(self) -> SessionCapabilities {
        match self {
            SessionMode::Study => SessionCapabilities {
                has_timer: false,
                reveal: RevealPolicy::OnDemand,
            },
            SessionMode::Exam => SessionCapabilities {
                has_timer: true,
                reveal: RevealPolicy::AtEnd,
            },
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Study => "study",
            SessionMode::Exam => "exam",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a mode from storage or input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError {
    raw: String,
}

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown session mode: {}", self.raw)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for SessionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "study" => Ok(SessionMode::Study),
            "exam" => Ok(SessionMode::Exam),
            _ => Err(ParseModeError { raw: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_is_timed_and_revealed_at_end() {
        let caps = SessionMode::Exam.capabilities();
        assert!(caps.has_timer);
        assert_eq!(caps.reveal, RevealPolicy::AtEnd);
    }

    #[test]
    fn study_is_untimed_and_revealed_on_demand() {
        let caps = SessionMode::Study.capabilities();
        assert!(!caps.has_timer);
        assert_eq!(caps.reveal, RevealPolicy::OnDemand);
    }

    #[test]
    fn mode_round_trips_through_str() {
        assert_eq!("Exam".parse::<SessionMode>().unwrap(), SessionMode::Exam);
        assert_eq!(SessionMode::Study.to_string(), "study");
        assert!("quiz".parse::<SessionMode>().is_err());
    }
}
