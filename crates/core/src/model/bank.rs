use thiserror::Error;

use crate::model::question::{QuestionError, QuestionRecord};

/// Exam name used when no question in the bank carries one.
pub const UNKNOWN_EXAM_NAME: &str = "Unknown";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("bank is not a JSON array of questions: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("question {index} is invalid: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },
}

/// Ordered, validated sequence of questions supplied by a bank source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<QuestionRecord>,
}

impl QuestionBank {
    /// Build a bank, validating every record.
    ///
    /// # Errors
    ///
    /// Returns `BankError::InvalidQuestion` with the 0-based index of the first bad record.
    pub fn new(questions: Vec<QuestionRecord>) -> Result<Self, BankError> {
        for (index, question) in questions.iter().enumerate() {
            question
                .validate()
                .map_err(|source| BankError::InvalidQuestion { index, source })?;
        }
        Ok(Self { questions })
    }

    /// Parse and validate a bank from its JSON array form.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Parse` for malformed JSON or
    /// `BankError::InvalidQuestion` for records that break positional invariants.
    pub fn from_json(raw: &str) -> Result<Self, BankError> {
        let questions: Vec<QuestionRecord> = serde_json::from_str(raw)?;
        Self::new(questions)
    }

    /// Serialize back to the JSON array form.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Parse` if serialization fails.
    pub fn to_json(&self) -> Result<String, BankError> {
        Ok(serde_json::to_string(&self.questions)?)
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<QuestionRecord> {
        self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Exam name embedded in the first question, or `"Unknown"`.
    #[must_use]
    pub fn exam_name(&self) -> &str {
        exam_name_of(&self.questions)
    }
}

/// Exam name embedded in the first question of a sequence, or `"Unknown"`.
#[must_use]
pub fn exam_name_of(questions: &[QuestionRecord]) -> &str {
    questions
        .first()
        .and_then(|q| q.exam_name.as_deref())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(UNKNOWN_EXAM_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"[
        {"topic_number": 1, "question_number": 1, "question": "Q1",
         "answers": ["a", "b"], "answer_labels": ["A", "B"], "answer_checks": [true, false],
         "images": [], "exam_name": "az-900"},
        {"topic_number": 1, "question_number": 2, "question": "Q2",
         "answers": ["a", "b", "c"], "answer_labels": ["A", "B", "C"],
         "answer_checks": [true, true, false], "images": []}
    ]"#;

    #[test]
    fn parses_and_names_bank() {
        let bank = QuestionBank::from_json(BANK).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.exam_name(), "az-900");
        assert!(bank.questions()[1].is_multiple_choice());
    }

    #[test]
    fn reports_index_of_invalid_record() {
        let raw = BANK.replace("[true, true, false]", "[false, false, false]");
        let err = QuestionBank::from_json(&raw).unwrap_err();
        assert!(matches!(
            err,
            BankError::InvalidQuestion {
                index: 1,
                source: QuestionError::NoCorrectOption
            }
        ));
    }

    #[test]
    fn rejects_non_array_payloads() {
        let err = QuestionBank::from_json(r#"{"question": "not a list"}"#).unwrap_err();
        assert!(matches!(err, BankError::Parse(_)));
    }

    #[test]
    fn missing_exam_name_falls_back() {
        assert_eq!(QuestionBank::default().exam_name(), UNKNOWN_EXAM_NAME);
    }

    #[test]
    fn json_round_trip_keeps_records() {
        let bank = QuestionBank::from_json(BANK).unwrap();
        let again = QuestionBank::from_json(&bank.to_json().unwrap()).unwrap();
        assert_eq!(bank, again);
    }
}
