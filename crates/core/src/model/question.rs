use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("a question needs at least two answer options, found {found}")]
    TooFewOptions { found: usize },

    #[error("expected {expected} answer labels, found {found}")]
    LabelCountMismatch { expected: usize, found: usize },

    #[error("expected {expected} answer checks, found {found}")]
    CheckCountMismatch { expected: usize, found: usize },

    #[error("a question needs at least one correct option")]
    NoCorrectOption,
}

//
// ─── QUESTION RECORD ───────────────────────────────────────────────────────────
//

/// Advisory answer submitted by the community, shown next to the official key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityAnswer {
    pub text: String,
    #[serde(default)]
    pub votes: u32,
}

/// One multiple-choice question as it appears in an uploaded bank.
///
/// Options, labels and checks are positional: `answer_checks[i]` tells whether
/// `answers[i]` (labelled `answer_labels[i]`) is part of the answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(default)]
    pub topic_number: u32,
    #[serde(default)]
    pub question_number: u32,
    #[serde(rename = "question")]
    pub text: String,
    #[serde(rename = "answers")]
    pub options: Vec<String>,
    #[serde(rename = "answer_labels")]
    pub labels: Vec<String>,
    #[serde(rename = "answer_checks")]
    pub checks: Vec<bool>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_answers: Option<Vec<CommunityAnswer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<Vec<String>>,
}

impl QuestionRecord {
    /// Check the positional invariants between options, labels and checks.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first violated invariant.
    pub fn validate(&self) -> Result<(), QuestionError> {
        let expected = self.options.len();
        if expected < 2 {
            return Err(QuestionError::TooFewOptions { found: expected });
        }
        if self.labels.len() != expected {
            return Err(QuestionError::LabelCountMismatch {
                expected,
                found: self.labels.len(),
            });
        }
        if self.checks.len() != expected {
            return Err(QuestionError::CheckCountMismatch {
                expected,
                found: self.checks.len(),
            });
        }
        if !self.checks.iter().any(|c| *c) {
            return Err(QuestionError::NoCorrectOption);
        }
        Ok(())
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// True when more than one option belongs to the answer key.
    #[must_use]
    pub fn is_multiple_choice(&self) -> bool {
        self.checks.iter().filter(|c| **c).count() > 1
    }

    /// Indices of the options marked correct.
    #[must_use]
    pub fn correct_indices(&self) -> BTreeSet<usize> {
        self.checks
            .iter()
            .enumerate()
            .filter_map(|(i, correct)| correct.then_some(i))
            .collect()
    }

    /// Option index for a label such as `"B"`, compared case-insensitively.
    #[must_use]
    pub fn option_for_label(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.labels
            .iter()
            .position(|l| l.trim().eq_ignore_ascii_case(label))
    }

    #[must_use]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Display strings for the answer key, preferring the bank-provided list.
    #[must_use]
    pub fn correct_answer_texts(&self) -> Vec<String> {
        if let Some(texts) = &self.correct_answers {
            return texts.clone();
        }
        self.correct_indices()
            .into_iter()
            .filter_map(|i| {
                let label = self.labels.get(i)?;
                let option = self.options.get(i)?;
                Some(format!("{label}: {option}"))
            })
            .collect()
    }

    #[must_use]
    pub fn community_answers(&self) -> &[CommunityAnswer] {
        self.community_answers.as_deref().unwrap_or(&[])
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn question(checks: &[bool]) -> QuestionRecord {
        let labels = ["A", "B", "C", "D"];
        QuestionRecord {
            topic_number: 1,
            question_number: 1,
            text: "Which?".into(),
            options: (0..checks.len()).map(|i| format!("option {i}")).collect(),
            labels: labels[..checks.len()].iter().map(|l| (*l).to_string()).collect(),
            checks: checks.to_vec(),
            images: Vec::new(),
            community_answers: None,
            exam_name: None,
            correct_answers: None,
        }
    }

    #[test]
    fn multiple_choice_is_derived_from_checks() {
        assert!(!question(&[true, false, false]).is_multiple_choice());
        assert!(question(&[true, true, false]).is_multiple_choice());
    }

    #[test]
    fn correct_indices_follow_checks() {
        let q = question(&[false, true, false, true]);
        assert_eq!(q.correct_indices(), BTreeSet::from([1, 3]));
    }

    #[test]
    fn validate_rejects_mismatched_lengths() {
        let mut q = question(&[true, false]);
        q.labels.pop();
        assert_eq!(
            q.validate(),
            Err(QuestionError::LabelCountMismatch {
                expected: 2,
                found: 1
            })
        );

        let mut q = question(&[true, false]);
        q.checks.push(false);
        assert!(matches!(
            q.validate(),
            Err(QuestionError::CheckCountMismatch { .. })
        ));
    }

    #[test]
    fn validate_requires_a_correct_option() {
        assert_eq!(
            question(&[false, false]).validate(),
            Err(QuestionError::NoCorrectOption)
        );
        assert_eq!(
            question(&[true]).validate(),
            Err(QuestionError::TooFewOptions { found: 1 })
        );
    }

    #[test]
    fn label_lookup_is_case_insensitive() {
        let q = question(&[true, false, false]);
        assert_eq!(q.option_for_label("b"), Some(1));
        assert_eq!(q.option_for_label(" C "), Some(2));
        assert_eq!(q.option_for_label("Z"), None);
    }

    #[test]
    fn correct_texts_fall_back_to_labelled_options() {
        let q = question(&[false, true, false]);
        assert_eq!(q.correct_answer_texts(), vec!["B: option 1".to_string()]);
    }

    #[test]
    fn deserializes_bank_field_names() {
        let json = r#"{
            "topic_number": 2,
            "question_number": 14,
            "question": "Pick one",
            "answers": ["yes", "no"],
            "answer_labels": ["A", "B"],
            "answer_checks": [false, true],
            "images": ["q14.png"],
            "community_answers": [{"text": "B", "votes": 12}],
            "exam_name": "net-101"
        }"#;
        let q: QuestionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(q.question_number, 14);
        assert_eq!(q.correct_indices(), BTreeSet::from([1]));
        assert_eq!(q.community_answers()[0].votes, 12);
        assert_eq!(q.exam_name.as_deref(), Some("net-101"));
    }
}
