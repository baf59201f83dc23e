use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{QuestionRecord, SessionMode};
use crate::scoring;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportError {
    #[error("finished_at is before started_at")]
    InvalidTimeRange,

    #[error("too many questions for a single report: {len}")]
    TooManyQuestions { len: usize },

    #[error("report counts are inconsistent: {0}")]
    CountMismatch(&'static str),

    #[error("report payload is malformed: {0}")]
    Malformed(String),
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

/// Immutable scored summary of one finished session.
///
/// Carries the working set and the final answers so the session can be reviewed
/// question by question long after it was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    mode: SessionMode,
    exam_name: String,
    total_questions: u32,
    total_answered: u32,
    correct_answers: u32,
    incorrect_answers: u32,
    unanswered: u32,
    percentage: u8,
    #[serde(rename = "timeSpent")]
    time_spent_secs: u64,
    #[serde(rename = "timeLimit", default, skip_serializing_if = "Option::is_none")]
    time_limit_secs: Option<u32>,
    started_at: DateTime<Utc>,
    timestamp: DateTime<Utc>,
    questions: Vec<QuestionRecord>,
    user_answers: BTreeMap<usize, Vec<usize>>,
}

/// Aggregate numbers computed by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub total_questions: u32,
    pub total_answered: u32,
    pub correct_answers: u32,
    pub percentage: u8,
    pub time_spent_secs: u64,
}

impl Report {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        mode: SessionMode,
        exam_name: String,
        tally: Tally,
        time_limit_secs: Option<u32>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        questions: Vec<QuestionRecord>,
        user_answers: BTreeMap<usize, Vec<usize>>,
    ) -> Self {
        Self {
            mode,
            exam_name,
            total_questions: tally.total_questions,
            total_answered: tally.total_answered,
            correct_answers: tally.correct_answers,
            incorrect_answers: tally.total_answered - tally.correct_answers,
            unanswered: tally.total_questions - tally.total_answered,
            percentage: tally.percentage,
            time_spent_secs: tally.time_spent_secs,
            time_limit_secs,
            started_at,
            timestamp: finished_at,
            questions,
            user_answers,
        }
    }

    /// Parse a persisted report and re-check its aggregate counts.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Malformed` for undecodable payloads and
    /// `ReportError::CountMismatch` / `InvalidTimeRange` for inconsistent ones.
    pub fn from_json(raw: &str) -> Result<Self, ReportError> {
        let report: Report =
            serde_json::from_str(raw).map_err(|e| ReportError::Malformed(e.to_string()))?;
        report.check_consistency()?;
        Ok(report)
    }

    /// Serialize to the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Malformed` if serialization fails.
    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string(self).map_err(|e| ReportError::Malformed(e.to_string()))
    }

    /// Pretty JSON for exports.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Malformed` if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::Malformed(e.to_string()))
    }

    fn check_consistency(&self) -> Result<(), ReportError> {
        if self.timestamp < self.started_at {
            return Err(ReportError::InvalidTimeRange);
        }
        if usize::try_from(self.total_questions).ok() != Some(self.questions.len()) {
            return Err(ReportError::CountMismatch("totalQuestions"));
        }
        if self.total_answered > self.total_questions {
            return Err(ReportError::CountMismatch("totalAnswered"));
        }
        if self.correct_answers.checked_add(self.incorrect_answers) != Some(self.total_answered) {
            return Err(ReportError::CountMismatch("incorrectAnswers"));
        }
        if self.unanswered.checked_add(self.total_answered) != Some(self.total_questions) {
            return Err(ReportError::CountMismatch("unanswered"));
        }
        if self.percentage > 100 {
            return Err(ReportError::CountMismatch("percentage"));
        }
        Ok(())
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
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn total_answered(&self) -> u32 {
        self.total_answered
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> u32 {
        self.incorrect_answers
    }

    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.unanswered
    }

    /// Score over answered questions only, 0–100.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Moment the session finished.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn user_answers(&self) -> &BTreeMap<usize, Vec<usize>> {
        &self.user_answers
    }

    /// Per-question review in working-set order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<QuestionOutcome> {
        self.questions
            .iter()
            .enumerate()
            .map(|(position, question)| {
                let selected: BTreeSet<usize> = self
                    .user_answers
                    .get(&position)
                    .map(|s| s.iter().copied().collect())
                    .unwrap_or_default();
                QuestionOutcome {
                    position,
                    status: scoring::classify(question, &selected),
                    selected: selected.into_iter().collect(),
                    correct: question.correct_indices().into_iter().collect(),
                }
            })
            .collect()
    }

    /// Outcomes matching `filter`, keeping their original positions.
    #[must_use]
    pub fn filtered_outcomes(&self, filter: OutcomeFilter) -> Vec<QuestionOutcome> {
        self.outcomes()
            .into_iter()
            .filter(|o| filter.matches(o.status))
            .collect()
    }

    #[must_use]
    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts {
            all: self.total_questions,
            correct: self.correct_answers,
            incorrect: self.incorrect_answers,
            unanswered: self.unanswered,
        }
    }

    /// File name used when exporting, e.g. `az-900_exam_2023-11-14_22-13-20.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.exam_name,
            self.mode,
            self.timestamp.format("%Y-%m-%d_%H-%M-%S")
        )
    }
}

//
// ─── REVIEW ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Correct,
    Incorrect,
    Unanswered,
}

/// Review of one question inside a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub position: usize,
    pub status: OutcomeStatus,
    pub selected: Vec<usize>,
    pub correct: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutcomeFilter {
    #[default]
    All,
    Correct,
    Incorrect,
    Unanswered,
}

impl OutcomeFilter {
    #[must_use]
    pub fn matches(self, status: OutcomeStatus) -> bool {
        match self {
            OutcomeFilter::All => true,
            OutcomeFilter::Correct => status == OutcomeStatus::Correct,
            OutcomeFilter::Incorrect => status == OutcomeStatus::Incorrect,
            OutcomeFilter::Unanswered => status == OutcomeStatus::Unanswered,
        }
    }
}

impl fmt::Display for OutcomeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeFilter::All => "all",
            OutcomeFilter::Correct => "correct",
            OutcomeFilter::Incorrect => "incorrect",
            OutcomeFilter::Unanswered => "unanswered",
        };
        f.write_str(s)
    }
}

impl FromStr for OutcomeFilter {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(OutcomeFilter::All),
            "correct" => Ok(OutcomeFilter::Correct),
            "incorrect" => Ok(OutcomeFilter::Incorrect),
            "unanswered" => Ok(OutcomeFilter::Unanswered),
            other => Err(ReportError::Malformed(format!("unknown filter: {other}"))),
        }
    }
}

/// Question counts per review filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub all: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerTracker;
    use crate::scoring::{ScoreInput, score};
    use crate::time::fixed_now;

    fn question(checks: &[bool]) -> QuestionRecord {
        QuestionRecord {
            topic_number: 1,
            question_number: 1,
            text: "Q".into(),
            options: checks.iter().map(|_| "opt".to_string()).collect(),
            labels: ["A", "B", "C"][..checks.len()]
                .iter()
                .map(|l| (*l).to_string())
                .collect(),
            checks: checks.to_vec(),
            images: Vec::new(),
            community_answers: None,
            exam_name: Some("az-900".into()),
            correct_answers: None,
        }
    }

    fn sample_report() -> Report {
        let questions = vec![
            question(&[true, false, false]),
            question(&[false, true, false]),
            question(&[true, true, false]),
        ];
        let mut answers = AnswerTracker::new();
        answers.set_answer(0, BTreeSet::from([0]));
        answers.set_answer(1, BTreeSet::from([2]));
        score(ScoreInput {
            mode: SessionMode::Exam,
            exam_name: "az-900",
            questions: &questions,
            answers: &answers,
            started_at: fixed_now(),
            finished_at: fixed_now() + chrono::Duration::seconds(75),
            time_limit_secs: Some(600),
        })
        .unwrap()
    }

    #[test]
    fn outcomes_classify_every_question() {
        let report = sample_report();
        let statuses: Vec<_> = report.outcomes().iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                OutcomeStatus::Correct,
                OutcomeStatus::Incorrect,
                OutcomeStatus::Unanswered
            ]
        );
    }

    #[test]
    fn filter_keeps_original_positions() {
        let report = sample_report();
        let unanswered = report.filtered_outcomes(OutcomeFilter::Unanswered);
        assert_eq!(unanswered.len(), 1);
        assert_eq!(unanswered[0].position, 2);
        assert_eq!(unanswered[0].correct, vec![0, 1]);
        assert_eq!(report.filtered_outcomes(OutcomeFilter::All).len(), 3);
    }

    #[test]
    fn counts_mirror_aggregates() {
        let counts = sample_report().counts();
        assert_eq!(
            counts,
            OutcomeCounts {
                all: 3,
                correct: 1,
                incorrect: 1,
                unanswered: 1
            }
        );
    }

    #[test]
    fn file_name_uses_exam_mode_and_finish_time() {
        let report = sample_report();
        assert_eq!(report.file_name(), "az-900_exam_2023-11-14_22-14-35.json");
    }

    #[test]
    fn json_keeps_original_field_names() {
        let report = sample_report();
        let raw = report.to_json().unwrap();
        assert!(raw.contains("\"timeSpent\":75"));
        assert!(raw.contains("\"timeLimit\":600"));
        assert!(raw.contains("\"userAnswers\""));
        assert_eq!(Report::from_json(&raw).unwrap(), report);
    }

    #[test]
    fn from_json_rejects_inconsistent_counts() {
        let raw = sample_report()
            .to_json()
            .unwrap()
            .replace("\"unanswered\":1", "\"unanswered\":2");
        assert_eq!(
            Report::from_json(&raw).unwrap_err(),
            ReportError::CountMismatch("unanswered")
        );
    }

    #[test]
    fn from_json_rejects_overflowing_counts() {
        let raw = sample_report()
            .to_json()
            .unwrap()
            .replace("\"correctAnswers\":1", "\"correctAnswers\":4294967295");
        assert_eq!(
            Report::from_json(&raw).unwrap_err(),
            ReportError::CountMismatch("incorrectAnswers")
        );
    }

    #[test]
    fn filter_parses_from_str() {
        assert_eq!(
            "Incorrect".parse::<OutcomeFilter>().unwrap(),
            OutcomeFilter::Incorrect
        );
        assert!("wrong".parse::<OutcomeFilter>().is_err());
    }
}
