mod answers;
mod bank;
mod config;
mod ids;
mod mode;
mod question;
pub mod report;

pub use answers::AnswerTracker;
pub use bank::{BankError, QuestionBank, UNKNOWN_EXAM_NAME, exam_name_of};
pub use config::{DEFAULT_SUBSET_SIZE, DEFAULT_TIME_LIMIT_MINUTES, SessionConfig};
pub use ids::{ParseIdError, ReportId};
pub use mode::{ParseModeError, RevealPolicy, SessionCapabilities, SessionMode};
pub use question::{CommunityAnswer, QuestionError, QuestionRecord};
pub use report::{
    OutcomeCounts, OutcomeFilter, OutcomeStatus, QuestionOutcome, Report, ReportError,
};
