//! Exact-match grading of a finished session.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::model::{
    AnswerTracker, OutcomeStatus, QuestionRecord, Report, ReportError, SessionMode,
};
use crate::model::report::Tally;
use crate::time::elapsed_secs_rounded;

/// Everything the scorer needs from a session at the moment it ends.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub mode: SessionMode,
    /// Name of the bank the working set was drawn from.
    pub exam_name: &'a str,
    pub questions: &'a [QuestionRecord],
    pub answers: &'a AnswerTracker,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub time_limit_secs: Option<u32>,
}

/// A selection is correct only when it equals the answer key exactly.
#[must_use]
pub fn is_exact_match(question: &QuestionRecord, selected: &BTreeSet<usize>) -> bool {
    !selected.is_empty() && *selected == question.correct_indices()
}

#[must_use]
pub fn classify(question: &QuestionRecord, selected: &BTreeSet<usize>) -> OutcomeStatus {
    if selected.is_empty() {
        OutcomeStatus::Unanswered
    } else if is_exact_match(question, selected) {
        OutcomeStatus::Correct
    } else {
        OutcomeStatus::Incorrect
    }
}

/// Rounded `correct / answered` as a whole percent; 0 when nothing was answered.
#[must_use]
pub fn percentage(correct: u32, answered: u32) -> u8 {
    if answered == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(answered));
    let answered = u64::from(answered);
    let pct = (correct * 200 + answered) / (2 * answered);
    u8::try_from(pct).unwrap_or(100)
}

/// Grade the working set against the collected answers.
///
/// Selections recorded for positions outside the working set are ignored.
///
/// # Errors
///
/// Returns `ReportError::InvalidTimeRange` if `finished_at` precedes `started_at`,
/// and `ReportError::TooManyQuestions` if the working set does not fit a `u32`.
pub fn score(input: ScoreInput<'_>) -> Result<Report, ReportError> {
    let time_spent_secs = elapsed_secs_rounded(input.started_at, input.finished_at)
        .ok_or(ReportError::InvalidTimeRange)?;
    let total_questions = u32::try_from(input.questions.len()).map_err(|_| {
        ReportError::TooManyQuestions {
            len: input.questions.len(),
        }
    })?;

    let mut total_answered = 0u32;
    let mut correct_answers = 0u32;
    for (position, question) in input.questions.iter().enumerate() {
        let Some(selected) = input.answers.answer(position) else {
            continue;
        };
        match classify(question, selected) {
            OutcomeStatus::Correct => {
                total_answered += 1;
                correct_answers += 1;
            }
            OutcomeStatus::Incorrect => total_answered += 1,
            OutcomeStatus::Unanswered => {}
        }
    }

    let user_answers = input
        .answers
        .snapshot()
        .into_iter()
        .filter(|(position, _)| *position < input.questions.len())
        .collect();

    let tally = Tally {
        total_questions,
        total_answered,
        correct_answers,
        percentage: percentage(correct_answers, total_answered),
        time_spent_secs,
    };

    log::debug!(
        "scored {} session: {}/{} correct, {} answered",
        input.mode,
        correct_answers,
        total_questions,
        total_answered
    );

    Ok(Report::assemble(
        input.mode,
        input.exam_name.to_owned(),
        tally,
        input.time_limit_secs,
        input.started_at,
        input.finished_at,
        input.questions.to_vec(),
        user_answers,
    ))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn question(checks: &[bool]) -> QuestionRecord {
        let labels = ["A", "B", "C", "D", "E"];
        QuestionRecord {
            topic_number: 1,
            question_number: 1,
            text: "Which one?".into(),
            options: checks.iter().map(|_| "option".to_string()).collect(),
            labels: labels[..checks.len()].iter().map(|l| (*l).to_string()).collect(),
            checks: checks.to_vec(),
            images: Vec::new(),
            community_answers: None,
            exam_name: None,
            correct_answers: None,
        }
    }

    fn run(questions: &[QuestionRecord], answers: &AnswerTracker) -> Report {
        score(ScoreInput {
            mode: SessionMode::Exam,
            exam_name: "aws-saa",
            questions,
            answers,
            started_at: fixed_now(),
            finished_at: fixed_now() + Duration::milliseconds(12_499),
            time_limit_secs: Some(3_600),
        })
        .unwrap()
    }

    #[test]
    fn multi_answer_requires_exact_set() {
        let q = question(&[true, false, true, false]);
        assert!(is_exact_match(&q, &BTreeSet::from([0, 2])));
        assert!(!is_exact_match(&q, &BTreeSet::from([0])));
        assert!(!is_exact_match(&q, &BTreeSet::from([0, 1, 2])));
        assert!(!is_exact_match(&q, &BTreeSet::new()));
    }

    #[test]
    fn single_answer_matches_only_the_key() {
        let q = question(&[false, true, false]);
        assert_eq!(classify(&q, &BTreeSet::from([1])), OutcomeStatus::Correct);
        assert_eq!(classify(&q, &BTreeSet::from([0])), OutcomeStatus::Incorrect);
        assert_eq!(classify(&q, &BTreeSet::new()), OutcomeStatus::Unanswered);
    }

    #[test]
    fn percentage_is_over_answered_only() {
        let questions: Vec<_> = (0..50).map(|_| question(&[true, false])).collect();
        let mut answers = AnswerTracker::new();
        answers.set_answer(7, BTreeSet::from([0]));

        let report = run(&questions, &answers);
        assert_eq!(report.total_questions(), 50);
        assert_eq!(report.total_answered(), 1);
        assert_eq!(report.correct_answers(), 1);
        assert_eq!(report.unanswered(), 49);
        assert_eq!(report.percentage(), 100);
    }

    #[test]
    fn nothing_answered_scores_zero() {
        let questions = vec![question(&[true, false]), question(&[false, true])];
        let report = run(&questions, &AnswerTracker::new());
        assert_eq!(report.percentage(), 0);
        assert_eq!(report.total_answered(), 0);
        assert_eq!(report.unanswered(), 2);
    }

    #[test]
    fn counts_partition_the_working_set() {
        let questions = vec![
            question(&[true, false]),
            question(&[false, true]),
            question(&[true, true, false]),
        ];
        let mut answers = AnswerTracker::new();
        answers.set_answer(0, BTreeSet::from([0]));
        answers.set_answer(1, BTreeSet::from([0]));
        answers.set_answer(2, BTreeSet::new());
        answers.set_answer(9, BTreeSet::from([0]));

        let report = run(&questions, &answers);
        assert_eq!(report.correct_answers(), 1);
        assert_eq!(report.incorrect_answers(), 1);
        assert_eq!(report.unanswered(), 1);
        assert_eq!(report.percentage(), 50);
        assert!(!report.user_answers().contains_key(&9));
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 4), 0);
    }

    #[test]
    fn time_spent_is_rounded_seconds() {
        let questions = vec![question(&[true, false])];
        let report = run(&questions, &AnswerTracker::new());
        assert_eq!(report.time_spent_secs(), 12);
        assert_eq!(report.time_limit_secs(), Some(3_600));
    }

    #[test]
    fn exam_name_is_taken_from_the_input() {
        let mut named = question(&[true, false]);
        named.exam_name = Some("other".into());
        let report = run(&[question(&[true, false]), named], &AnswerTracker::new());
        assert_eq!(report.exam_name(), "aws-saa");
    }

    #[test]
    fn rejects_reversed_time_range() {
        let questions = vec![question(&[true, false])];
        let answers = AnswerTracker::new();
        let err = score(ScoreInput {
            mode: SessionMode::Study,
            exam_name: "aws-saa",
            questions: &questions,
            answers: &answers,
            started_at: fixed_now(),
            finished_at: fixed_now() - Duration::seconds(1),
            time_limit_secs: None,
        })
        .unwrap_err();
        assert_eq!(err, ReportError::InvalidTimeRange);
    }
}
