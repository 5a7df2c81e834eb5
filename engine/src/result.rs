//! Graded test results and the documents stored for them.

use crate::{error::Result, Error, ExamId, ExamInfo, QuestionId, TestId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Answer text recorded for a question the user skipped.
pub const UNANSWERED: &str = "(unanswered)";

/// One incorrectly answered or unanswered question within a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerError {
    pub question_id: QuestionId,
    pub question_text: String,
    pub correct_answer_text: String,
    /// [`UNANSWERED`] when no option was selected
    #[serde(default = "unanswered")]
    pub user_answer_text: String,
}

fn unanswered() -> String {
    UNANSWERED.to_string()
}

impl AnswerError {
    /// Error for a question answered with the wrong option.
    pub fn wrong(
        question_id: impl Into<QuestionId>,
        question_text: impl Into<String>,
        correct_answer_text: impl Into<String>,
        user_answer_text: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_text: question_text.into(),
            correct_answer_text: correct_answer_text.into(),
            user_answer_text: user_answer_text.into(),
        }
    }

    /// Error for a question left unanswered.
    pub fn unanswered(
        question_id: impl Into<QuestionId>,
        question_text: impl Into<String>,
        correct_answer_text: impl Into<String>,
    ) -> Self {
        Self::wrong(question_id, question_text, correct_answer_text, UNANSWERED)
    }

    /// Whether the user skipped this question.
    pub fn is_unanswered(&self) -> bool {
        self.user_answer_text == UNANSWERED
    }
}

/// Rounded percentage of correct answers, halves rounded up.
///
/// Returns 0 when `total` is 0.
pub fn percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let (correct, total) = (u64::from(correct.min(total)), u64::from(total));
    ((200 * correct + total) / (2 * total)) as u8
}

/// Immutable record of one completed test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Completion time (milliseconds since epoch)
    pub timestamp: Timestamp,
    pub questions_total: u32,
    pub correct_answers: u32,
    pub passed: bool,
    pub percentage: u8,
    #[serde(default)]
    pub errors: Vec<AnswerError>,
}

impl TestResult {
    /// Grade a completed test against the exam's passing score.
    ///
    /// `passed` and `percentage` are derived here and nowhere else.
    pub fn grade(
        exam: &ExamInfo,
        timestamp: Timestamp,
        questions_total: u32,
        correct_answers: u32,
        errors: Vec<AnswerError>,
    ) -> Result<Self> {
        if questions_total == 0 {
            return Err(Error::InvalidResult(
                "questionsTotal must be positive".into(),
            ));
        }
        if correct_answers > questions_total {
            return Err(Error::InvalidResult(format!(
                "correctAnswers ({}) exceeds questionsTotal ({})",
                correct_answers, questions_total
            )));
        }
        if errors.len() as u64 + u64::from(correct_answers) > u64::from(questions_total) {
            return Err(Error::InvalidResult(format!(
                "{} errors and {} correct answers exceed {} questions",
                errors.len(),
                correct_answers,
                questions_total
            )));
        }

        Ok(Self {
            timestamp,
            questions_total,
            correct_answers,
            passed: correct_answers >= exam.passing_score,
            percentage: percentage(correct_answers, questions_total),
            errors,
        })
    }

    /// Number of questions not answered correctly.
    pub fn wrong_answers(&self) -> u32 {
        self.questions_total - self.correct_answers.min(self.questions_total)
    }

    /// Check the structural invariants of a result read back from storage.
    ///
    /// `passed` depends on the exam's passing score, which is not stored with
    /// the result, so only the percentage and bounds are checked.
    pub fn validate(&self) -> Result<()> {
        if self.questions_total == 0 {
            return Err(Error::InvalidResult(
                "questionsTotal must be positive".into(),
            ));
        }
        if self.correct_answers > self.questions_total {
            return Err(Error::InvalidResult(format!(
                "correctAnswers ({}) exceeds questionsTotal ({})",
                self.correct_answers, self.questions_total
            )));
        }
        let expected = percentage(self.correct_answers, self.questions_total);
        if self.percentage != expected {
            return Err(Error::InvalidResult(format!(
                "percentage is {}, expected {}",
                self.percentage, expected
            )));
        }
        Ok(())
    }

    /// Check `passed` against a known passing score.
    pub fn validate_for(&self, exam: &ExamInfo) -> Result<()> {
        self.validate()?;
        if self.passed != (self.correct_answers >= exam.passing_score) {
            return Err(Error::InvalidResult(format!(
                "passed={} inconsistent with {} correct and passing score {}",
                self.passed, self.correct_answers, exam.passing_score
            )));
        }
        Ok(())
    }
}

/// Identifier of the remote document holding a test taken at `timestamp`.
pub fn test_id(timestamp: Timestamp) -> TestId {
    format!("test_{}", timestamp)
}

/// A test result together with the user and exam it belongs to.
///
/// This is the shape of both the local history entries and the remote test
/// documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    #[serde(flatten)]
    pub result: TestResult,
    #[serde(default)]
    pub user_id: UserId,
    pub exam_id: ExamId,
    #[serde(default)]
    pub exam_name: String,
}

impl TestRecord {
    pub fn new(result: TestResult, user_id: impl Into<UserId>, exam: &ExamInfo) -> Self {
        Self {
            result,
            user_id: user_id.into(),
            exam_id: exam.id.clone(),
            exam_name: exam.name.clone(),
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.result.timestamp
    }
}
