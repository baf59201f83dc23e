use serde::{Deserialize, Serialize};

/// Default exam time limit offered for a freshly loaded bank.
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 60;

/// Largest range preselected when a subset is first enabled.
pub const DEFAULT_SUBSET_SIZE: u32 = 50;

/// User-chosen options for building a session from a bank.
///
/// The engine assumes an already clamped configuration; use [`SessionConfig::clamped`]
/// (or the `with_*` helpers) at the input boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub question_count: u32,
    #[serde(alias = "timeLimit")]
    pub time_limit_minutes: u32,
    pub random_order: bool,
    pub use_subset: bool,
    pub start_from_question: u32,
    pub end_at_question: u32,
}

fn bank_len_u32(bank_len: usize) -> u32 {
    u32::try_from(bank_len).unwrap_or(u32::MAX)
}

fn clamp_u32(value: u32, lo: u32, hi: u32) -> u32 {
    value.max(lo).min(hi.max(lo))
}

impl SessionConfig {
    /// Defaults for a bank: every question, in order, one hour.
    #[must_use]
    pub fn for_bank(bank_len: usize) -> Self {
        let len = bank_len_u32(bank_len);
        Self {
            question_count: len.max(1),
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
            random_order: false,
            use_subset: false,
            start_from_question: 1,
            end_at_question: len.max(1),
        }
    }

    /// Toggle subset mode.
    ///
    /// Enabling preselects the first `min(50, len)` questions; disabling restores the
    /// whole bank.
    #[must_use]
    pub fn with_subset(mut self, enabled: bool, bank_len: usize) -> Self {
        let len = bank_len_u32(bank_len);
        self.use_subset = enabled;
        self.start_from_question = 1;
        if enabled {
            let size = DEFAULT_SUBSET_SIZE.min(len).max(1);
            self.end_at_question = size;
            self.question_count = size;
        } else {
            self.end_at_question = len.max(1);
            self.question_count = len.max(1);
        }
        self
    }

    /// Set the 1-based inclusive range, clamped into the bank.
    #[must_use]
    pub fn with_range(mut self, start: u32, end: u32, bank_len: usize) -> Self {
        let len = bank_len_u32(bank_len);
        let start = clamp_u32(start, 1, len);
        let end = clamp_u32(end, start, len);
        self.start_from_question = start;
        self.end_at_question = end;
        let available = end - start + 1;
        self.question_count = self.question_count.min(available).max(1);
        self
    }

    #[must_use]
    pub fn with_question_count(mut self, count: u32) -> Self {
        self.question_count = count.max(1);
        self
    }

    #[must_use]
    pub fn with_time_limit_minutes(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = minutes.max(1);
        self
    }

    #[must_use]
    pub fn with_random_order(mut self, random: bool) -> Self {
        self.random_order = random;
        self
    }

    /// Number of questions the current range makes available.
    #[must_use]
    pub fn available_questions(&self, bank_len: usize) -> u32 {
        if self.use_subset {
            (self.end_at_question + 1).saturating_sub(self.start_from_question)
        } else {
            bank_len_u32(bank_len)
        }
    }

    /// Normalize every field against a bank of `bank_len` questions.
    #[must_use]
    pub fn clamped(self, bank_len: usize) -> Self {
        let len = bank_len_u32(bank_len);
        let start = clamp_u32(self.start_from_question, 1, len);
        let end = clamp_u32(self.end_at_question, start, len);
        let mut out = Self {
            question_count: self.question_count,
            time_limit_minutes: self.time_limit_minutes.max(1),
            random_order: self.random_order,
            use_subset: self.use_subset,
            start_from_question: start,
            end_at_question: end,
        };
        let available = out.available_questions(bank_len).max(1);
        out.question_count = clamp_u32(out.question_count, 1, available);
        out
    }

    /// Half-open 0-based slice bounds of the subset, when enabled.
    #[must_use]
    pub fn subset_bounds(&self) -> Option<(usize, usize)> {
        if !self.use_subset {
            return None;
        }
        let start = usize::try_from(self.start_from_question.saturating_sub(1)).ok()?;
        let end = usize::try_from(self.end_at_question).ok()?;
        Some((start, end))
    }

    #[must_use]
    pub fn question_limit(&self) -> usize {
        usize::try_from(self.question_count).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_whole_bank() {
        let cfg = SessionConfig::for_bank(120);
        assert_eq!(cfg.question_count, 120);
        assert_eq!(cfg.time_limit_minutes, 60);
        assert_eq!(cfg.end_at_question, 120);
        assert!(!cfg.use_subset);
        assert!(!cfg.random_order);
    }

    #[test]
    fn enabling_subset_preselects_first_fifty() {
        let cfg = SessionConfig::for_bank(120).with_subset(true, 120);
        assert_eq!((cfg.start_from_question, cfg.end_at_question), (1, 50));
        assert_eq!(cfg.question_count, 50);

        let small = SessionConfig::for_bank(12).with_subset(true, 12);
        assert_eq!(small.end_at_question, 12);

        let off = cfg.with_subset(false, 120);
        assert_eq!(off.question_count, 120);
        assert_eq!(off.end_at_question, 120);
    }

    #[test]
    fn range_is_clamped_into_bank() {
        let cfg = SessionConfig::for_bank(30)
            .with_subset(true, 30)
            .with_range(0, 99, 30);
        assert_eq!((cfg.start_from_question, cfg.end_at_question), (1, 30));

        let inverted = SessionConfig::for_bank(30)
            .with_subset(true, 30)
            .with_range(20, 5, 30);
        assert_eq!((inverted.start_from_question, inverted.end_at_question), (20, 20));
        assert_eq!(inverted.question_count, 1);
    }

    #[test]
    fn clamped_bounds_count_by_available_range() {
        let cfg = SessionConfig {
            question_count: 0,
            time_limit_minutes: 0,
            random_order: true,
            use_subset: true,
            start_from_question: 3,
            end_at_question: 8,
        }
        .clamped(10);
        assert_eq!(cfg.question_count, 1);
        assert_eq!(cfg.time_limit_minutes, 1);

        let big = SessionConfig {
            question_count: 500,
            ..cfg
        }
        .clamped(10);
        assert_eq!(big.question_count, 6);
        assert_eq!(big.available_questions(10), 6);
    }

    #[test]
    fn subset_bounds_are_half_open() {
        let cfg = SessionConfig::for_bank(10)
            .with_subset(true, 10)
            .with_range(3, 8, 10);
        assert_eq!(cfg.subset_bounds(), Some((2, 8)));
        assert_eq!(SessionConfig::for_bank(10).subset_bounds(), None);
    }

    #[test]
    fn reads_camel_case_json() {
        let cfg: SessionConfig = serde_json::from_str(
            r#"{"questionCount": 5, "timeLimit": 90, "randomOrder": true,
                "useSubset": false, "startFromQuestion": 1, "endAtQuestion": 40}"#,
        )
        .unwrap();
        assert_eq!(cfg.time_limit_minutes, 90);
        assert_eq!(cfg.time_limit_secs(), 5_400);
    }
}
