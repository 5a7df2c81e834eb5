//! Running aggregate statistics.
//!
//! An [`AggregateStats`] summarizes every test a user completed for one exam
//! without keeping the tests themselves. Results are folded in one at a time
//! with [`AggregateStats::apply`].
//!
//! Folding is deliberately not idempotent: applying the same result twice
//! counts it twice. De-duplication happens upstream, by keying remote test
//! documents on their timestamp.

use crate::{error::Result, Error, QuestionId, TestResult, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error counter for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub count: u64,
    pub question_text: String,
    pub correct_answer_text: String,
    /// Insertion sequence, used to break ties in [`AggregateStats::top_errors`]
    #[serde(default)]
    pub first_seen: u64,
}

/// A question ranked by how often it was missed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopError {
    pub question_id: QuestionId,
    pub count: u64,
    pub question_text: String,
    pub correct_answer_text: String,
}

/// Per-user, per-exam running summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregateStats {
    pub total_tests: u64,
    pub passed_tests: u64,
    pub total_questions: u64,
    pub total_correct: u64,
    pub errors_by_question: BTreeMap<QuestionId, ErrorEntry>,
    /// Time of the last fold (milliseconds since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl AggregateStats {
    /// An all-zero aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one test result into the aggregate.
    pub fn apply(&mut self, result: &TestResult, now: Timestamp) {
        self.total_tests = self.total_tests.saturating_add(1);
        if result.passed {
            self.passed_tests = self.passed_tests.saturating_add(1);
        }
        self.total_questions = self
            .total_questions
            .saturating_add(u64::from(result.questions_total));
        self.total_correct = self
            .total_correct
            .saturating_add(u64::from(result.correct_answers));

        let mut next_seq = self.next_sequence();
        for error in &result.errors {
            let entry = self
                .errors_by_question
                .entry(error.question_id.clone())
                .or_insert_with(|| {
                    let entry = ErrorEntry {
                        count: 0,
                        question_text: error.question_text.clone(),
                        correct_answer_text: error.correct_answer_text.clone(),
                        first_seen: next_seq,
                    };
                    next_seq += 1;
                    entry
                });
            entry.count = entry.count.saturating_add(1);
        }

        self.last_updated = Some(now);
    }

    fn next_sequence(&self) -> u64 {
        self.errors_by_question
            .values()
            .map(|e| e.first_seen + 1)
            .max()
            .unwrap_or(0)
    }

    /// The `n` most missed questions, highest count first.
    ///
    /// Ties go to the question that was first missed earliest.
    pub fn top_errors(&self, n: usize) -> Vec<TopError> {
        let mut entries: Vec<(&QuestionId, &ErrorEntry)> = self.errors_by_question.iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| {
            b.count
                .cmp(&a.count)
                .then(a.first_seen.cmp(&b.first_seen))
                .then(a_id.cmp(b_id))
        });

        entries
            .into_iter()
            .take(n)
            .map(|(id, entry)| TopError {
                question_id: id.clone(),
                count: entry.count,
                question_text: entry.question_text.clone(),
                correct_answer_text: entry.correct_answer_text.clone(),
            })
            .collect()
    }

    pub fn failed_tests(&self) -> u64 {
        self.total_tests.saturating_sub(self.passed_tests)
    }

    /// Rounded percentage of passed tests, 0 with no tests.
    pub fn success_rate(&self) -> u8 {
        if self.total_tests == 0 {
            return 0;
        }
        let passed = self.passed_tests.min(self.total_tests);
        ((200 * passed + self.total_tests) / (2 * self.total_tests)) as u8
    }

    /// Mean wrong answers per test, rounded to one decimal.
    pub fn average_errors(&self) -> f64 {
        if self.total_tests == 0 {
            return 0.0;
        }
        let wrong = self.total_questions.saturating_sub(self.total_correct) as f64;
        (wrong / self.total_tests as f64 * 10.0).round() / 10.0
    }

    /// Whether nothing has been folded in yet.
    pub fn is_empty(&self) -> bool {
        self.total_tests == 0
    }

    /// Check the aggregate invariants.
    pub fn validate(&self) -> Result<()> {
        if self.passed_tests > self.total_tests {
            return Err(Error::InvalidStats(format!(
                "passedTests ({}) exceeds totalTests ({})",
                self.passed_tests, self.total_tests
            )));
        }
        if self.total_correct > self.total_questions {
            return Err(Error::InvalidStats(format!(
                "totalCorrect ({}) exceeds totalQuestions ({})",
                self.total_correct, self.total_questions
            )));
        }
        if let Some((id, _)) = self.errors_by_question.iter().find(|(_, e)| e.count == 0) {
            return Err(Error::InvalidStats(format!(
                "error entry '{}' has a zero count",
                id
            )));
        }
        Ok(())
    }

    /// Repair an aggregate read from storage so it satisfies the invariants.
    ///
    /// Zero-count error entries are dropped and inconsistent counters are
    /// clamped. Returns whether anything had to change.
    pub fn sanitize(&mut self) -> bool {
        let before = self.errors_by_question.len();
        self.errors_by_question.retain(|_, e| e.count > 0);
        let mut changed = before != self.errors_by_question.len();

        if self.passed_tests > self.total_tests {
            self.passed_tests = self.total_tests;
            changed = true;
        }
        if self.total_correct > self.total_questions {
            self.total_correct = self.total_questions;
            changed = true;
        }
        changed
    }
}

/// Where a displayed aggregate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatsSource {
    /// The canonical remote aggregate
    Remote,
    /// The locally cached copy
    LocalCache,
    /// Neither store had data
    Empty,
}

/// Choose between the canonical and the cached aggregate.
///
/// The canonical copy wins unless it is missing or empty while the cache
/// holds data, which happens when results were recorded before the remote
/// document existed.
pub fn resolve(
    canonical: Option<AggregateStats>,
    cached: Option<AggregateStats>,
) -> (AggregateStats, StatsSource) {
    match (canonical, cached) {
        (Some(remote), Some(local)) if remote.is_empty() && !local.is_empty() => {
            (local, StatsSource::LocalCache)
        }
        (Some(remote), _) => (remote, StatsSource::Remote),
        (None, Some(local)) => (local, StatsSource::LocalCache),
        (None, None) => (AggregateStats::new(), StatsSource::Empty),
    }
}

/// Aggregate plus the derived figures the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub stats: AggregateStats,
    pub source: StatsSource,
    pub success_rate: u8,
    pub failed_tests: u64,
    pub average_errors: f64,
}

impl StatsView {
    pub fn new(stats: AggregateStats, source: StatsSource) -> Self {
        Self {
            success_rate: stats.success_rate(),
            failed_tests: stats.failed_tests(),
            average_errors: stats.average_errors(),
            stats,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnswerError, ExamInfo};

    fn exam() -> ExamInfo {
        ExamInfo::new("civil", "Civil Law", 24, 18)
    }

    fn err(id: &str) -> AnswerError {
        AnswerError::wrong(id, format!("Question {}", id), "Right", "Wrong")
    }

    fn result(correct: u32, errors: Vec<AnswerError>) -> TestResult {
        TestResult::grade(&exam(), 1000, 24, correct, errors).unwrap()
    }

    #[test]
    fn apply_updates_counters() {
        let mut stats = AggregateStats::new();
        stats.apply(&result(18, vec![err("q1"), err("q2")]), 5000);

        assert_eq!(stats.total_tests, 1);
        assert_eq!(stats.passed_tests, 1);
        assert_eq!(stats.total_questions, 24);
        assert_eq!(stats.total_correct, 18);
        assert_eq!(stats.errors_by_question["q1"].count, 1);
        assert_eq!(stats.last_updated, Some(5000));
        assert!(stats.validate().is_ok());
    }

    #[test]
    fn apply_is_not_idempotent() {
        let r = result(17, vec![err("q1")]);
        let mut stats = AggregateStats::new();
        stats.apply(&r, 1);
        let once = stats.clone();
        stats.apply(&r, 2);

        assert_eq!(stats.total_tests, once.total_tests * 2);
        assert_eq!(stats.passed_tests, 0);
        assert_eq!(stats.total_questions, once.total_questions * 2);
        assert_eq!(stats.total_correct, once.total_correct * 2);
        assert_eq!(stats.errors_by_question["q1"].count, 2);
    }

    #[test]
    fn entry_keeps_first_seen_text() {
        let mut stats = AggregateStats::new();
        stats.apply(&result(20, vec![err("q1")]), 1);

        let mut renamed = err("q1");
        renamed.question_text = "Edited text".into();
        stats.apply(&result(20, vec![renamed]), 2);

        let entry = &stats.errors_by_question["q1"];
        assert_eq!(entry.count, 2);
        assert_eq!(entry.question_text, "Question q1");
    }

    #[test]
    fn top_errors_orders_by_count_then_first_seen() {
        let mut stats = AggregateStats::new();
        // "zeta" is missed before "alpha", so it wins the tie
        stats.apply(&result(20, vec![err("zeta"), err("alpha")]), 1);
        stats.apply(&result(20, vec![err("mid"), err("mid2")]), 2);
        stats.apply(&result(20, vec![err("mid")]), 3);

        let top = stats.top_errors(3);
        let ids: Vec<&str> = top.iter().map(|e| e.question_id.as_str()).collect();
        assert_eq!(ids, vec!["mid", "zeta", "alpha"]);
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn top_errors_returns_all_when_n_is_large() {
        let mut stats = AggregateStats::new();
        stats.apply(&result(22, vec![err("a"), err("b")]), 1);

        assert_eq!(stats.top_errors(10).len(), 2);
        assert!(stats.top_errors(0).is_empty());
        assert!(AggregateStats::new().top_errors(5).is_empty());
    }

    #[test]
    fn top_errors_is_restartable() {
        let mut stats = AggregateStats::new();
        stats.apply(&result(22, vec![err("a"), err("b")]), 1);
        assert_eq!(stats.top_errors(2), stats.top_errors(2));
    }

    #[test]
    fn derived_figures() {
        let mut stats = AggregateStats::new();
        assert_eq!(stats.success_rate(), 0);
        assert_eq!(stats.average_errors(), 0.0);

        stats.apply(&result(18, vec![]), 1);
        stats.apply(&result(17, vec![]), 2);
        stats.apply(&result(23, vec![]), 3);

        assert_eq!(stats.failed_tests(), 1);
        assert_eq!(stats.success_rate(), 67);
        // (6 + 7 + 1) / 3 = 4.666..
        assert_eq!(stats.average_errors(), 4.7);
    }

    #[test]
    fn sanitize_repairs_corrupt_aggregate() {
        let mut stats = AggregateStats {
            total_tests: 1,
            passed_tests: 3,
            total_questions: 10,
            total_correct: 12,
            ..Default::default()
        };
        stats.errors_by_question.insert(
            "q1".into(),
            ErrorEntry {
                count: 0,
                question_text: "?".into(),
                correct_answer_text: "!".into(),
                first_seen: 0,
            },
        );
        assert!(stats.validate().is_err());

        assert!(stats.sanitize());
        assert!(stats.validate().is_ok());
        assert_eq!(stats.passed_tests, 1);
        assert_eq!(stats.total_correct, 10);
        assert!(stats.errors_by_question.is_empty());
        assert!(!stats.sanitize());
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let stats: AggregateStats = serde_json::from_str(r#"{"totalTests": 2}"#).unwrap();
        assert_eq!(stats.total_tests, 2);
        assert_eq!(stats.passed_tests, 0);
        assert!(stats.errors_by_question.is_empty());
        assert_eq!(stats.last_updated, None);
    }

    #[test]
    fn resolve_prefers_canonical() {
        let mut remote = AggregateStats::new();
        remote.apply(&result(18, vec![]), 1);
        let mut local = AggregateStats::new();
        local.apply(&result(10, vec![]), 1);
        local.apply(&result(10, vec![]), 2);

        let (stats, source) = resolve(Some(remote.clone()), Some(local.clone()));
        assert_eq!(source, StatsSource::Remote);
        assert_eq!(stats, remote);

        let (stats, source) = resolve(Some(AggregateStats::new()), Some(local.clone()));
        assert_eq!(source, StatsSource::LocalCache);
        assert_eq!(stats, local);

        let (_, source) = resolve(None, Some(local));
        assert_eq!(source, StatsSource::LocalCache);

        let (stats, source) = resolve(None, None);
        assert_eq!(source, StatsSource::Empty);
        assert!(stats.is_empty());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_result() -> impl Strategy<Value = TestResult> {
            (1u32..60, 0u32..60, proptest::collection::vec(0u8..8, 0..6)).prop_map(
                |(total, correct, ids)| {
                    let correct = correct.min(total);
                    let wrong = (total - correct) as usize;
                    let errors = ids
                        .into_iter()
                        .take(wrong)
                        .map(|i| err(&format!("q{}", i)))
                        .collect();
                    TestResult::grade(&exam(), 1, total, correct, errors).unwrap()
                },
            )
        }

        proptest! {
            #[test]
            fn prop_fold_preserves_invariants(results in proptest::collection::vec(arb_result(), 0..20)) {
                let mut stats = AggregateStats::new();
                for (i, r) in results.iter().enumerate() {
                    let before = stats.clone();
                    stats.apply(r, i as u64);
                    prop_assert!(stats.total_tests > before.total_tests);
                    prop_assert!(stats.total_questions >= before.total_questions);
                    prop_assert!(stats.total_correct >= before.total_correct);
                }
                prop_assert!(stats.validate().is_ok());
                prop_assert_eq!(stats.total_tests, results.len() as u64);
                prop_assert_eq!(
                    stats.passed_tests,
                    results.iter().filter(|r| r.passed).count() as u64
                );
            }

            #[test]
            fn prop_top_errors_sorted(results in proptest::collection::vec(arb_result(), 0..20), n in 0usize..12) {
                let mut stats = AggregateStats::new();
                for r in &results {
                    stats.apply(r, 1);
                }
                let top = stats.top_errors(n);
                prop_assert_eq!(top.len(), n.min(stats.errors_by_question.len()));
                for pair in top.windows(2) {
                    prop_assert!(pair[0].count >= pair[1].count);
                }
            }
        }
    }
}
