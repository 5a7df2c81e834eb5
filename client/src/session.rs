//! The signed-in user and selected exam, passed explicitly to every operation.

use quizsync_engine::{error::Result, DocumentPath, Error, ExamInfo, TestId, UserId};

/// Who is taking which exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Partition key supplied by the identity provider
    pub user_id: UserId,
    pub exam: ExamInfo,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>, exam: ExamInfo) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.is_empty() || user_id.contains('/') {
            return Err(Error::InvalidPath(format!("invalid user id: '{}'", user_id)));
        }
        exam.validate()?;
        Ok(Self { user_id, exam })
    }

    pub fn test_path(&self, test_id: impl Into<TestId>) -> Result<DocumentPath> {
        DocumentPath::test(self.user_id.clone(), self.exam.id.clone(), test_id)
    }

    pub fn tests_path(&self) -> Result<DocumentPath> {
        DocumentPath::tests(self.user_id.clone(), self.exam.id.clone())
    }

    pub fn stats_path(&self) -> Result<DocumentPath> {
        DocumentPath::stats(self.user_id.clone(), self.exam.id.clone())
    }
}
