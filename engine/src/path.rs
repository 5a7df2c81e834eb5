//! Addresses of documents in the remote store.
//!
//! Documents are partitioned by user, then exam:
//!
//! ```text
//! users/{userId}/exams/{examId}/tests/{testId}
//! users/{userId}/exams/{examId}/stats/aggregate
//! ```

use crate::{error::Result, Error, ExamId, TestId, UserId};
use std::fmt;
use std::str::FromStr;

/// Name of the single aggregate document per exam.
pub const AGGREGATE_DOC: &str = "aggregate";

/// A document or collection address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentPath {
    /// One test document
    Test {
        user_id: UserId,
        exam_id: ExamId,
        test_id: TestId,
    },
    /// The collection of a user's tests for an exam
    Tests { user_id: UserId, exam_id: ExamId },
    /// The aggregate stats document
    Stats { user_id: UserId, exam_id: ExamId },
}

fn check_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('/') {
        return Err(Error::InvalidPath(format!("invalid {}: '{}'", kind, value)));
    }
    Ok(())
}

impl DocumentPath {
    pub fn test(
        user_id: impl Into<UserId>,
        exam_id: impl Into<ExamId>,
        test_id: impl Into<TestId>,
    ) -> Result<Self> {
        let path = DocumentPath::Test {
            user_id: user_id.into(),
            exam_id: exam_id.into(),
            test_id: test_id.into(),
        };
        path.validate()?;
        Ok(path)
    }

    pub fn tests(user_id: impl Into<UserId>, exam_id: impl Into<ExamId>) -> Result<Self> {
        let path = DocumentPath::Tests {
            user_id: user_id.into(),
            exam_id: exam_id.into(),
        };
        path.validate()?;
        Ok(path)
    }

    pub fn stats(user_id: impl Into<UserId>, exam_id: impl Into<ExamId>) -> Result<Self> {
        let path = DocumentPath::Stats {
            user_id: user_id.into(),
            exam_id: exam_id.into(),
        };
        path.validate()?;
        Ok(path)
    }

    fn validate(&self) -> Result<()> {
        check_segment("user id", self.user_id())?;
        check_segment("exam id", self.exam_id())?;
        if let DocumentPath::Test { test_id, .. } = self {
            check_segment("test id", test_id)?;
        }
        Ok(())
    }

    pub fn user_id(&self) -> &UserId {
        match self {
            DocumentPath::Test { user_id, .. }
            | DocumentPath::Tests { user_id, .. }
            | DocumentPath::Stats { user_id, .. } => user_id,
        }
    }

    pub fn exam_id(&self) -> &ExamId {
        match self {
            DocumentPath::Test { exam_id, .. }
            | DocumentPath::Tests { exam_id, .. }
            | DocumentPath::Stats { exam_id, .. } => exam_id,
        }
    }

    /// The collection containing this path (itself for collections).
    pub fn collection(&self) -> DocumentPath {
        DocumentPath::Tests {
            user_id: self.user_id().clone(),
            exam_id: self.exam_id().clone(),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentPath::Test {
                user_id,
                exam_id,
                test_id,
            } => write!(f, "users/{}/exams/{}/tests/{}", user_id, exam_id, test_id),
            DocumentPath::Tests { user_id, exam_id } => {
                write!(f, "users/{}/exams/{}/tests", user_id, exam_id)
            }
            DocumentPath::Stats { user_id, exam_id } => write!(
                f,
                "users/{}/exams/{}/stats/{}",
                user_id, exam_id, AGGREGATE_DOC
            ),
        }
    }
}

impl FromStr for DocumentPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            ["users", user, "exams", exam, "tests", test] => {
                DocumentPath::test(*user, *exam, *test)
            }
            ["users", user, "exams", exam, "tests"] => DocumentPath::tests(*user, *exam),
            ["users", user, "exams", exam, "stats", doc] if *doc == AGGREGATE_DOC => {
                DocumentPath::stats(*user, *exam)
            }
            _ => Err(Error::InvalidPath(s.to_string())),
        }
    }
}
