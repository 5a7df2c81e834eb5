//! Edge case tests for quizsync-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use quizsync_engine::{
    AggregateStats, AnswerError, ExamInfo, LocalStore, MemoryBackend, PendingSyncItem,
    QueueDurability, TestRecord, TestResult, HISTORY_LIMIT,
};

fn exam() -> ExamInfo {
    ExamInfo::new("civil", "Civil Law", 24, 18)
}

fn graded(timestamp: u64, correct: u32, errors: Vec<AnswerError>) -> TestResult {
    TestResult::grade(&exam(), timestamp, 24, correct, errors).unwrap()
}

fn record(timestamp: u64) -> TestRecord {
    TestRecord::new(graded(timestamp, 20, vec![]), "user-1", &exam())
}

// ============================================================================
// Grading Edge Cases
// ============================================================================

#[test]
fn every_score_respects_invariants() {
    for correct in 0..=24 {
        let result = graded(1, correct, vec![]);
        assert_eq!(result.passed, correct >= 18, "passed for {}", correct);
        let expected = (100.0 * correct as f64 / 24.0).round() as u8;
        assert_eq!(result.percentage, expected, "percentage for {}", correct);
        assert!(result.validate_for(&exam()).is_ok());
    }
}

#[test]
fn passing_score_above_test_size_never_passes() {
    let exam = ExamInfo::new("hard", "Hard", 10, 11);
    let result = TestResult::grade(&exam, 1, 10, 10, vec![]).unwrap();
    assert!(!result.passed);
    assert_eq!(result.percentage, 100);
}

#[test]
fn zero_passing_score_always_passes() {
    let exam = ExamInfo::new("easy", "Easy", 10, 0);
    let result = TestResult::grade(&exam, 1, 10, 0, vec![]).unwrap();
    assert!(result.passed);
    assert_eq!(result.percentage, 0);
}

#[test]
fn single_question_test() {
    let exam = ExamInfo::new("one", "One", 1, 1);
    let result = TestResult::grade(&exam, 1, 1, 1, vec![]).unwrap();
    assert!(result.passed);
    assert_eq!(result.percentage, 100);
}

// ============================================================================
// String Edge Cases
// ============================================================================

#[test]
fn unicode_question_text_survives_storage() {
    let texts = [
        "日本語テスト",
        "Привет мир",
        "🎉🚀💯",
        "Hello\nWorld\tTab",
        "Quote \" and backslash \\",
    ];

    let mut store = LocalStore::new(MemoryBackend::new(), "civil");
    let mut stats = AggregateStats::new();
    for (i, text) in texts.iter().enumerate() {
        let error = AnswerError::wrong(format!("q{}", i), *text, *text, "x");
        stats.apply(&graded(i as u64, 20, vec![error]), i as u64);
    }
    store.save_stats(&stats).unwrap();

    let cached = store.stats().unwrap();
    for (i, text) in texts.iter().enumerate() {
        assert_eq!(cached.errors_by_question[&format!("q{}", i)].question_text, *text);
    }
}

// ============================================================================
// History Bounds
// ============================================================================

#[test]
fn history_never_exceeds_limit() {
    let mut store = LocalStore::new(MemoryBackend::new(), "civil");
    for ts in 0..100u64 {
        store.save_test(&record(ts)).unwrap();
        assert!(store.tests().len() <= HISTORY_LIMIT);
    }
    let tests = store.tests();
    assert_eq!(tests.first().unwrap().timestamp(), 80);
    assert_eq!(tests.last().unwrap().timestamp(), 99);
}

#[test]
fn custom_history_limit() {
    let mut store = LocalStore::new(MemoryBackend::new(), "civil").with_history_limit(3);
    for ts in 0..5u64 {
        store.save_test(&record(ts)).unwrap();
    }
    let ts: Vec<u64> = store.tests().iter().map(|r| r.timestamp()).collect();
    assert_eq!(ts, vec![2, 3, 4]);
}

#[test]
fn recent_tests_with_fewer_records() {
    let mut store = LocalStore::new(MemoryBackend::new(), "civil");
    assert!(store.recent_tests(5).is_empty());
    store.save_test(&record(1)).unwrap();
    assert_eq!(store.recent_tests(5).len(), 1);
}

// ============================================================================
// Pending Queue
// ============================================================================

#[test]
fn large_pending_queue_is_unbounded() {
    let mut store = LocalStore::new(MemoryBackend::new(), "civil");
    for ts in 0..250u64 {
        store.enqueue(PendingSyncItem::test_result(record(ts), ts));
    }
    assert_eq!(store.pending_count(), 250);
    assert_eq!(store.pending()[249].queued_at, 249);
}

#[test]
fn quota_exhaustion_mid_queue_keeps_everything() {
    let item_size = serde_json::to_string(&vec![PendingSyncItem::test_result(record(1), 1)])
        .unwrap()
        .len();
    // Room for roughly two items
    let mut store = LocalStore::new(MemoryBackend::with_quota(item_size * 2 + 8), "civil");

    let mut durability = Vec::new();
    for ts in 1..=4u64 {
        durability.push(store.enqueue(PendingSyncItem::test_result(record(ts), ts)));
    }

    assert_eq!(durability[0], QueueDurability::Persisted);
    assert_eq!(durability[3], QueueDurability::MemoryOnly);
    let order: Vec<u64> = store.pending().iter().map(|i| i.queued_at).collect();
    assert_eq!(order, vec![1, 2, 3, 4]);
}

#[test]
fn settle_with_nothing_processed_keeps_queue() {
    let mut store = LocalStore::new(MemoryBackend::new(), "civil");
    store.enqueue(PendingSyncItem::test_result(record(1), 1));
    store.settle_pending(&[], Vec::new()).unwrap();
    assert_eq!(store.pending_count(), 1);
}

// ============================================================================
// Aggregate Edge Cases
// ============================================================================

#[test]
fn many_distinct_errors() {
    let mut stats = AggregateStats::new();
    for batch in 0..50u64 {
        let errors = (0..6)
            .map(|i| AnswerError::unanswered(format!("q{}", batch * 6 + i), "?", "!"))
            .collect();
        stats.apply(&graded(batch, 18, errors), batch);
    }
    assert_eq!(stats.errors_by_question.len(), 300);

    // All tied at one: first-seen order decides
    let top = stats.top_errors(3);
    let ids: Vec<&str> = top.iter().map(|e| e.question_id.as_str()).collect();
    assert_eq!(ids, vec!["q0", "q1", "q2"]);
}

#[test]
fn tie_order_survives_serialization() {
    let mut stats = AggregateStats::new();
    stats.apply(
        &graded(1, 21, vec![
            AnswerError::unanswered("z", "?", "!"),
            AnswerError::unanswered("a", "?", "!"),
            AnswerError::unanswered("m", "?", "!"),
        ]),
        1,
    );

    let json = serde_json::to_string(&stats).unwrap();
    let restored: AggregateStats = serde_json::from_str(&json).unwrap();
    let ids: Vec<String> = restored
        .top_errors(3)
        .into_iter()
        .map(|e| e.question_id)
        .collect();
    assert_eq!(ids, vec!["z", "a", "m"]);
}

#[test]
fn counters_saturate_instead_of_overflowing() {
    let mut stats = AggregateStats {
        total_tests: u64::MAX,
        passed_tests: u64::MAX,
        total_questions: u64::MAX,
        total_correct: u64::MAX,
        ..Default::default()
    };
    stats.apply(&graded(1, 24, vec![]), 1);
    assert_eq!(stats.total_tests, u64::MAX);
    assert!(stats.validate().is_ok());
}
