/// Remaining seconds at or below which the countdown is critical.
pub const CRITICAL_SECS: u32 = 60;

/// Remaining seconds at or below which the countdown is a warning.
pub const WARNING_SECS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Running,
    /// Reached zero; the single expiry signal has been emitted.
    Expired,
    /// Halted by a manual finish before reaching zero.
    Stopped,
}

/// Result of a one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(u32),
    Expired,
    Halted,
}

/// One-second countdown that expires exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    limit_secs: u32,
    remaining_secs: u32,
    state: CountdownState,
}

impl Countdown {
    #[must_use]
    pub fn new(limit_secs: u32) -> Self {
        Self {
            limit_secs,
            remaining_secs: limit_secs,
            state: CountdownState::Running,
        }
    }

    #[must_use]
    pub fn limit_secs(&self) -> u32 {
        self.limit_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn state(&self) -> CountdownState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    /// Advance by one second. `Tick::Expired` is returned on the tick that reaches
    /// zero and never again.
    pub fn tick(&mut self) -> Tick {
        if !self.is_running() {
            return Tick::Halted;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.state = CountdownState::Expired;
            return Tick::Expired;
        }
        Tick::Running(self.remaining_secs)
    }

    /// Halt without emitting an expiry. Returns whether it was running.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = CountdownState::Stopped;
        true
    }

    #[must_use]
    pub fn urgency(&self) -> Urgency {
        urgency_for(self.remaining_secs)
    }

    #[must_use]
    pub fn display(&self) -> String {
        format_clock(self.remaining_secs)
    }
}

#[must_use]
pub fn urgency_for(remaining_secs: u32) -> Urgency {
    if remaining_secs <= CRITICAL_SECS {
        Urgency::Critical
    } else if remaining_secs <= WARNING_SECS {
        Urgency::Warning
    } else {
        Urgency::Normal
    }
}

/// `m:ss`, minutes unbounded.
#[must_use]
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_exactly_once() {
        let mut countdown = Countdown::new(3);
        assert_eq!(countdown.tick(), Tick::Running(2));
        assert_eq!(countdown.tick(), Tick::Running(1));
        assert_eq!(countdown.tick(), Tick::Expired);
        assert_eq!(countdown.tick(), Tick::Halted);
        assert_eq!(countdown.state(), CountdownState::Expired);
        assert_eq!(countdown.remaining_secs(), 0);
    }

    #[test]
    fn stop_halts_without_expiry() {
        let mut countdown = Countdown::new(60);
        countdown.tick();
        assert!(countdown.stop());
        assert!(!countdown.stop());
        assert_eq!(countdown.tick(), Tick::Halted);
        assert_eq!(countdown.state(), CountdownState::Stopped);
        assert_eq!(countdown.remaining_secs(), 59);
    }

    #[test]
    fn urgency_thresholds() {
        assert_eq!(urgency_for(301), Urgency::Normal);
        assert_eq!(urgency_for(300), Urgency::Warning);
        assert_eq!(urgency_for(61), Urgency::Warning);
        assert_eq!(urgency_for(60), Urgency::Critical);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(3_600), "60:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(0), "0:00");
    }
}
