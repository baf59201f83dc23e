use chrono::{DateTime, Duration, Utc};

/// Time source for sessions, reports and tests.
///
/// Sessions never read the system time directly; the services layer passes
/// `Clock::now()` into every transition so fixed clocks make runs reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Move a fixed clock forward. The system clock ignores this.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Move a fixed clock forward by whole seconds.
    pub fn advance_secs(&mut self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Whole seconds between two instants, rounded half up from milliseconds.
///
/// Returns `None` when `finished_at` precedes `started_at`.
#[must_use]
pub fn elapsed_secs_rounded(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Option<u64> {
    let millis = (finished_at - started_at).num_milliseconds();
    let millis = u64::try_from(millis).ok()?;
    Some(millis.saturating_add(500) / 1000)
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance_secs(90);
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(90));
    }

    #[test]
    fn system_clock_ignores_advance() {
        let mut clock = Clock::system();
        clock.advance_secs(3600);
        assert!(!clock.is_fixed());
        assert!(clock.now() < Utc::now() + Duration::seconds(60));
    }

    #[test]
    fn elapsed_rounds_half_up() {
        let start = fixed_now();
        assert_eq!(elapsed_secs_rounded(start, start), Some(0));
        assert_eq!(
            elapsed_secs_rounded(start, start + Duration::milliseconds(1_499)),
            Some(1)
        );
        assert_eq!(
            elapsed_secs_rounded(start, start + Duration::milliseconds(1_500)),
            Some(2)
        );
        assert_eq!(elapsed_secs_rounded(start + Duration::seconds(1), start), None);
    }
}
