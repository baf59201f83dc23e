/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    /// 1-based position of the current question.
    pub position: usize,
    pub remaining_secs: Option<u32>,
    pub is_complete: bool,
    /// Answered flag per working-set position, for a jump grid.
    pub answered_flags: Vec<bool>,
}

impl SessionProgress {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}
