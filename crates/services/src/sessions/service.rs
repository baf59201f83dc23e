use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

use exam_core::model::{
    AnswerTracker, QuestionRecord, Report, RevealPolicy, SessionCapabilities, SessionMode,
    exam_name_of,
};
use exam_core::scoring::{ScoreInput, score};

use super::countdown::{Countdown, Tick, Urgency};
use super::navigator::Navigator;
use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Manual,
    TimeExpired,
}

/// Result of a finish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    /// This call performed the transition; the report was computed now.
    Finished(Report),
    /// A previous call or the timer already finished the session.
    AlreadyFinished,
}

/// Result of feeding one timer tick into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining_secs: u32 },
    Expired(Report),
    /// No running timer: untimed mode, or already finished.
    Idle,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Practice session over a fixed working set.
///
/// Study and exam mode share this state machine and differ only in their
/// `SessionCapabilities`. Every transition takes the current time from the caller.
pub struct SessionService {
    mode: SessionMode,
    exam_name: String,
    capabilities: SessionCapabilities,
    questions: Vec<QuestionRecord>,
    answers: AnswerTracker,
    navigator: Navigator,
    countdown: Option<Countdown>,
    revealed: bool,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    finish_reason: Option<FinishReason>,
    report: Option<Report>,
}

impl SessionService {
    /// Start a session with the capabilities of `mode`.
    ///
    /// `time_limit_secs` is only used when the mode has a timer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the working set is empty.
    pub fn new(
        mode: SessionMode,
        questions: Vec<QuestionRecord>,
        time_limit_secs: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        Self::with_capabilities(
            mode,
            mode.capabilities(),
            questions,
            time_limit_secs,
            started_at,
        )
    }

    /// Start a session with explicit capabilities.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the working set is empty.
    pub fn with_capabilities(
        mode: SessionMode,
        capabilities: SessionCapabilities,
        questions: Vec<QuestionRecord>,
        time_limit_secs: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        let countdown = capabilities
            .has_timer
            .then(|| Countdown::new(time_limit_secs));
        log::info!(
            "{mode} session started with {} questions{}",
            questions.len(),
            countdown
                .map(|c| format!(", {}s limit", c.limit_secs()))
                .unwrap_or_default()
        );

        Ok(Self {
            mode,
            exam_name: exam_name_of(&questions).to_owned(),
            capabilities,
            navigator: Navigator::new(questions.len()),
            questions,
            answers: AnswerTracker::new(),
            countdown,
            revealed: false,
            started_at,
            finished_at: None,
            finish_reason: None,
            report: None,
        })
    }

    /// Name the report is filed under. Defaults to the first question's
    /// `exam_name`; pass the bank's name when the working set is a slice of it.
    #[must_use]
    pub fn with_exam_name(mut self, exam_name: impl Into<String>) -> Self {
        self.exam_name = exam_name.into();
        self
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn exam_name(&self) -> &str {
        &self.exam_name
    }

    #[must_use]
    pub fn capabilities(&self) -> SessionCapabilities {
        self.capabilities
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        if self.report.is_some() {
            Lifecycle::Finished
        } else {
            Lifecycle::Active
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.lifecycle() == Lifecycle::Finished
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.navigator.current()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionRecord> {
        self.questions.get(self.navigator.current())
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerTracker {
        &self.answers
    }

    /// Selected options at `position`, empty when untouched.
    #[must_use]
    pub fn selected(&self, position: usize) -> Vec<usize> {
        self.answers
            .answer(position)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.countdown.map(|c| c.remaining_secs())
    }

    #[must_use]
    pub fn urgency(&self) -> Option<Urgency> {
        self.countdown.map(|c| c.urgency())
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Click option `option` of the current question.
    ///
    /// Ignored when finished, while the answer is revealed, or for an index the
    /// question does not have. Returns whether the selection changed.
    pub fn toggle_option(&mut self, option: usize) -> bool {
        if self.is_finished() || self.revealed {
            return false;
        }
        let position = self.navigator.current();
        let Some(question) = self.questions.get(position) else {
            return false;
        };
        if option >= question.option_count() {
            log::debug!("ignoring option {option} at position {position}: out of range");
            return false;
        }
        self.answers
            .toggle(position, option, question.is_multiple_choice());
        true
    }

    /// Replace the selection at `position`. Indices beyond the question's options
    /// are dropped.
    pub fn select_options(&mut self, position: usize, options: BTreeSet<usize>) -> bool {
        if self.is_finished() {
            return false;
        }
        let Some(question) = self.questions.get(position) else {
            return false;
        };
        let count = question.option_count();
        let options = options.into_iter().filter(|o| *o < count).collect();
        self.answers.set_answer(position, options);
        true
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    pub fn next(&mut self) -> bool {
        let moved = self.navigator.next();
        self.after_move(moved)
    }

    pub fn previous(&mut self) -> bool {
        let moved = self.navigator.previous();
        self.after_move(moved)
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        let moved = self.navigator.jump_to(index);
        self.after_move(moved)
    }

    fn after_move(&mut self, moved: bool) -> bool {
        if moved {
            self.revealed = false;
        }
        moved
    }

    //
    // ─── REVEAL ────────────────────────────────────────────────────────────────
    //

    /// Flip the answer reveal for the current question. Only on-demand policies
    /// react; returns the resulting visibility.
    pub fn toggle_reveal(&mut self) -> bool {
        if self.capabilities.reveal == RevealPolicy::OnDemand && !self.is_finished() {
            self.revealed = !self.revealed;
        }
        self.is_revealed()
    }

    /// Whether the correct options of the current question may be shown.
    #[must_use]
    pub fn is_revealed(&self) -> bool {
        match self.capabilities.reveal {
            RevealPolicy::Never => false,
            RevealPolicy::OnDemand => self.revealed || self.is_finished(),
            RevealPolicy::AtEnd => self.is_finished(),
        }
    }

    //
    // ─── LIFECYCLE ─────────────────────────────────────────────────────────────
    //

    /// Feed one elapsed second into the timer. Expiry finishes the session.
    ///
    /// # Errors
    ///
    /// Propagates scoring failures from the forced finish.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, SessionError> {
        if self.is_finished() {
            return Ok(TickOutcome::Idle);
        }
        let Some(countdown) = self.countdown.as_mut() else {
            return Ok(TickOutcome::Idle);
        };
        match countdown.tick() {
            Tick::Running(remaining_secs) => Ok(TickOutcome::Running { remaining_secs }),
            Tick::Halted => Ok(TickOutcome::Idle),
            Tick::Expired => {
                log::info!("{} session time expired", self.mode);
                match self.finish_with(FinishReason::TimeExpired, now)? {
                    FinishOutcome::Finished(report) => Ok(TickOutcome::Expired(report)),
                    FinishOutcome::AlreadyFinished => Ok(TickOutcome::Idle),
                }
            }
        }
    }

    /// Manually finish the session. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Propagates scoring failures.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<FinishOutcome, SessionError> {
        self.finish_with(FinishReason::Manual, now)
    }

    fn finish_with(
        &mut self,
        reason: FinishReason,
        now: DateTime<Utc>,
    ) -> Result<FinishOutcome, SessionError> {
        if self.is_finished() {
            return Ok(FinishOutcome::AlreadyFinished);
        }

        let finished_at = now.max(self.started_at);
        let report = score(ScoreInput {
            mode: self.mode,
            exam_name: &self.exam_name,
            questions: &self.questions,
            answers: &self.answers,
            started_at: self.started_at,
            finished_at,
            time_limit_secs: self.countdown.map(|c| c.limit_secs()),
        })?;

        if let Some(countdown) = self.countdown.as_mut() {
            countdown.stop();
        }
        self.revealed = false;
        self.finished_at = Some(finished_at);
        self.finish_reason = Some(reason);
        self.report = Some(report.clone());

        log::info!(
            "{} session finished ({reason:?}): {}/{} correct, {}%",
            self.mode,
            report.correct_answers(),
            report.total_questions(),
            report.percentage()
        );
        Ok(FinishOutcome::Finished(report))
    }

    /// The report computed at the finish transition.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` while the session is active.
    pub fn score(&self) -> Result<&Report, SessionError> {
        self.report.as_ref().ok_or(SessionError::NotFinished)
    }

    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered_flags: Vec<bool> = (0..self.questions.len())
            .map(|p| self.answers.is_answered(p))
            .collect();
        SessionProgress {
            total: self.questions.len(),
            answered: answered_flags.iter().filter(|a| **a).count(),
            position: self.navigator.current() + 1,
            remaining_secs: self.remaining_secs(),
            is_complete: self.is_finished(),
            answered_flags,
        }
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionService")
            .field("mode", &self.mode)
            .field("exam_name", &self.exam_name)
            .field("questions_len", &self.questions.len())
            .field("current", &self.navigator.current())
            .field("answered", &self.answers.answered_count())
            .field("remaining_secs", &self.remaining_secs())
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
