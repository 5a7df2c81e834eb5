//! Exam metadata supplied by the question bank loader.

use crate::{error::Result, Error, ExamId};
use serde::{Deserialize, Serialize};

/// Identifier used when a question bank ships without metadata.
pub const DEFAULT_EXAM_ID: &str = "default_exam";

/// Scoring configuration of one exam (a named question bank).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamInfo {
    /// Exam identifier, also the scope of the local store
    pub id: ExamId,
    /// Display name
    pub name: String,
    /// Version of the question bank
    #[serde(default = "default_version")]
    pub version: String,
    /// Number of questions drawn per test
    pub questions_per_test: u32,
    /// Minimum number of correct answers needed to pass
    pub passing_score: u32,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ExamInfo {
    fn default() -> Self {
        Self {
            id: DEFAULT_EXAM_ID.to_string(),
            name: "Quiz Exam".to_string(),
            version: default_version(),
            questions_per_test: 24,
            passing_score: 18,
        }
    }
}

impl ExamInfo {
    /// Create exam metadata with the default version.
    pub fn new(
        id: impl Into<ExamId>,
        name: impl Into<String>,
        questions_per_test: u32,
        passing_score: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            questions_per_test,
            passing_score,
        }
    }

    /// Check that the metadata can be used to grade tests.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidExam("exam id is empty".into()));
        }
        if self.id.contains('/') {
            return Err(Error::InvalidExam(format!(
                "exam id '{}' contains '/'",
                self.id
            )));
        }
        if self.questions_per_test == 0 {
            return Err(Error::InvalidExam(
                "questionsPerTest must be positive".into(),
            ));
        }
        Ok(())
    }
}
