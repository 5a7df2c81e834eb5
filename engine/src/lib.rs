//! # Quizsync Engine
//!
//! The deterministic core of an offline-first quiz results engine.
//!
//! This crate holds everything about test results and statistics that does
//! not touch the network: the data model, the grading invariants, the
//! aggregate fold, and the exam-scoped local store with its pending-write
//! queue. The async recorder and reconciler live in `quizsync-client`; the
//! remote document store in `quizsync-server`.
//!
//! ## Design Principles
//!
//! - **No network IO**: local persistence goes through the [`KvBackend`] trait
//! - **Deterministic**: every operation takes the current time as an argument
//! - **Never lose a result**: local reads degrade to defaults, and pending
//!   writes the backend refuses are held in memory
//!
//! ## Core Concepts
//!
//! ### Results
//!
//! A [`TestResult`] is graded once against an [`ExamInfo`]; `passed` and
//! `percentage` are derived at that point. A [`TestRecord`] adds the user and
//! exam context and is the shape stored both locally and remotely.
//!
//! ### Aggregates
//!
//! [`AggregateStats`] is folded incrementally with [`AggregateStats::apply`]
//! and queried with [`AggregateStats::top_errors`]. Folding is not
//! idempotent.
//!
//! ### Local store
//!
//! [`LocalStore`] keeps `tests`, `stats` and `pending_sync` namespaces under
//! `{examId}_{namespace}` keys.
//!
//! ## Quick Start
//!
//! ```rust
//! use quizsync_engine::{
//!     AggregateStats, AnswerError, ExamInfo, LocalStore, MemoryBackend, PendingSyncItem,
//!     TestRecord, TestResult,
//! };
//!
//! let exam = ExamInfo::new("civil", "Civil Law", 24, 18);
//! let errors = vec![AnswerError::unanswered("q7", "Who signs a decree?", "The president")];
//!
//! // 1. Grade a completed test
//! let result = TestResult::grade(&exam, 1706745600000, 24, 18, errors).unwrap();
//! assert!(result.passed);
//! assert_eq!(result.percentage, 75);
//!
//! // 2. Fold it into an aggregate
//! let mut stats = AggregateStats::new();
//! stats.apply(&result, 1706745600000);
//! assert_eq!(stats.top_errors(5)[0].question_id, "q7");
//!
//! // 3. Keep it locally and queue it for sync
//! let mut store = LocalStore::new(MemoryBackend::new(), &exam.id);
//! let record = TestRecord::new(result, "user-1", &exam);
//! store.save_test(&record).unwrap();
//! store.enqueue(PendingSyncItem::test_result(record, 1706745600000));
//! assert_eq!(store.pending_count(), 1);
//! ```

pub mod document;
pub mod error;
pub mod exam;
pub mod local;
pub mod path;
pub mod pending;
pub mod result;
pub mod stats;

// Re-export main types at crate root
pub use document::{next_version, Versioned, INITIAL_VERSION};
pub use error::Error;
pub use exam::{ExamInfo, DEFAULT_EXAM_ID};
pub use local::{KvBackend, LocalStore, MemoryBackend, Namespace, QueueDurability, HISTORY_LIMIT};
pub use path::{DocumentPath, AGGREGATE_DOC};
pub use pending::{PendingKind, PendingSyncItem};
pub use result::{percentage, test_id, AnswerError, TestRecord, TestResult, UNANSWERED};
pub use stats::{resolve, AggregateStats, ErrorEntry, StatsSource, StatsView, TopError};

/// Type aliases for clarity
pub type UserId = String;
pub type ExamId = String;
pub type TestId = String;
pub type QuestionId = String;
pub type Timestamp = u64;
