//! Fetch Strategy Tests
//!
//! Tests for the direct and queue-backed strategies: cumulative set
//! streams, cache short-circuiting, per-word failure isolation, and
//! durable job lifecycle.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiError, MockDictionaryApi};
use crate::database::{SetStore, WordStore};
use crate::fetch::{DirectWordFetchStrategy, FetchQueue, QueueWordFetchStrategy, WordFetchStrategy};
use crate::tests::common::{
    create_test_db, next_within, sample_entry, sample_record, TEST_AUDIO_BASE,
};

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Drive a cumulative set stream until it reports `expected` words.
async fn wait_for_len(
    stream: &mut futures::stream::BoxStream<'static, Vec<crate::models::Word>>,
    expected: usize,
) -> Vec<crate::models::Word> {
    loop {
        let snapshot = next_within(stream, 5).await.expect("Stream ended early");
        if snapshot.len() == expected {
            return snapshot;
        }
    }
}

// =============================================================================
// Direct Strategy Tests
// =============================================================================

#[tokio::test]
async fn test_direct_fetch_populates_set() {
    let (db, _temp) = create_test_db().await;
    let mut api = MockDictionaryApi::new();
    api.expect_get_word()
        .returning(|word| Ok(vec![sample_entry(word, None)]));

    let strategy =
        DirectWordFetchStrategy::new(db.clone(), Arc::new(api), TEST_AUDIO_BASE.to_string());
    let mut stream = strategy
        .fetch_words("Animals", &words(&["fox", "cat"]))
        .await
        .expect("Failed to start fetch");

    let snapshot = wait_for_len(&mut stream, 2).await;
    let mut texts: Vec<_> = snapshot.iter().map(|w| w.word.as_str()).collect();
    texts.sort_unstable();
    assert_eq!(texts, vec!["cat", "fox"]);

    let set = db
        .get_set_by_name("Animals")
        .await
        .expect("Failed to get set")
        .expect("Set not created");
    assert_eq!(set.number_of_words, 2);
}

#[tokio::test]
async fn test_direct_fetch_counts_duplicate_words_once() {
    let (db, _temp) = create_test_db().await;
    let mut api = MockDictionaryApi::new();
    api.expect_get_word()
        .returning(|word| Ok(vec![sample_entry(word, None)]));

    let strategy =
        DirectWordFetchStrategy::new(db.clone(), Arc::new(api), TEST_AUDIO_BASE.to_string());
    let mut stream = strategy
        .fetch_words("Animals", &words(&["fox", "cat", "fox"]))
        .await
        .expect("Failed to start fetch");

    // The repeated word upserts onto the same entry, so the set settles
    // at two members.
    wait_for_len(&mut stream, 2).await;

    let set = db
        .get_set_by_name("Animals")
        .await
        .expect("Failed to get set")
        .expect("Set not created");
    assert_eq!(set.number_of_words, 2);
}

#[tokio::test]
async fn test_direct_fetch_skips_cached_words() {
    let (db, _temp) = create_test_db().await;
    db.insert_word(&sample_record("fox", "fox", "Animals", 1000))
        .await
        .expect("Failed to insert word");

    // Only the uncached word may reach the service.
    let mut api = MockDictionaryApi::new();
    api.expect_get_word()
        .withf(|word| word == "cat")
        .times(1)
        .returning(|word| Ok(vec![sample_entry(word, None)]));

    let strategy =
        DirectWordFetchStrategy::new(db.clone(), Arc::new(api), TEST_AUDIO_BASE.to_string());
    let mut stream = strategy
        .fetch_words("Animals", &words(&["fox", "cat"]))
        .await
        .expect("Failed to start fetch");

    wait_for_len(&mut stream, 2).await;
}

#[tokio::test]
async fn test_direct_fetch_isolates_per_word_failures() {
    let (db, _temp) = create_test_db().await;
    let mut api = MockDictionaryApi::new();
    api.expect_get_word()
        .withf(|word| word == "bad")
        .returning(|_| Err(ApiError::InvalidResponse("boom".to_string())));
    api.expect_get_word()
        .withf(|word| word != "bad")
        .returning(|word| Ok(vec![sample_entry(word, None)]));

    let strategy =
        DirectWordFetchStrategy::new(db.clone(), Arc::new(api), TEST_AUDIO_BASE.to_string());
    let mut stream = strategy
        .fetch_words("Animals", &words(&["fox", "bad", "cat"]))
        .await
        .expect("Failed to start fetch");

    // The failing word is dropped; the other two land.
    let snapshot = wait_for_len(&mut stream, 2).await;
    assert!(snapshot.iter().all(|w| w.word != "bad"));
}

#[tokio::test]
async fn test_fetch_words_by_set_name_unknown_set_is_empty() {
    let (db, _temp) = create_test_db().await;
    let strategy = DirectWordFetchStrategy::new(
        db.clone(),
        Arc::new(MockDictionaryApi::new()),
        TEST_AUDIO_BASE.to_string(),
    );

    let mut stream = strategy
        .fetch_words_by_set_name("ghosts")
        .await
        .expect("Failed to open stream");
    assert!(next_within(&mut stream, 5).await.is_none());
}

#[tokio::test]
async fn test_fetch_words_by_set_name_streams_members() {
    let (db, _temp) = create_test_db().await;
    db.create_set_if_missing("Animals")
        .await
        .expect("Failed to create set");
    db.insert_word(&sample_record("fox", "fox", "Animals", 1000))
        .await
        .expect("Failed to insert word");

    let strategy = DirectWordFetchStrategy::new(
        db.clone(),
        Arc::new(MockDictionaryApi::new()),
        TEST_AUDIO_BASE.to_string(),
    );
    let mut stream = strategy
        .fetch_words_by_set_name("Animals")
        .await
        .expect("Failed to open stream");

    let snapshot = next_within(&mut stream, 5).await.expect("Stream ended early");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].word, "fox");
}

#[tokio::test]
async fn test_fetch_word_is_unsupported() {
    let (db, _temp) = create_test_db().await;
    let strategy = DirectWordFetchStrategy::new(
        db.clone(),
        Arc::new(MockDictionaryApi::new()),
        TEST_AUDIO_BASE.to_string(),
    );

    let mut stream = strategy
        .fetch_word("fox")
        .await
        .expect("Failed to open stream");
    assert!(next_within(&mut stream, 5).await.is_none());
}

// =============================================================================
// Durable Queue Tests
// =============================================================================

async fn wait_for_job_status(queue: &FetchQueue, job_id: &str, status: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let current = queue
            .job_status(job_id)
            .await
            .expect("Failed to read job status");
        if current.as_deref() == Some(status) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting for job {job_id} to reach {status}, last seen {current:?}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn test_queue_job_runs_to_completion() {
    let (db, _temp) = create_test_db().await;
    let mut api = MockDictionaryApi::new();
    api.expect_get_word()
        .returning(|word| Ok(vec![sample_entry(word, None)]));

    let queue = FetchQueue::start(db.clone(), Arc::new(api), TEST_AUDIO_BASE.to_string());
    let job_id = queue
        .enqueue("Colors", &words(&["red", "blue"]))
        .await
        .expect("Failed to enqueue");

    wait_for_job_status(&queue, &job_id, "completed").await;

    assert!(db
        .get_word("red")
        .await
        .expect("Failed to get word")
        .is_some());
    assert!(db
        .get_word("blue")
        .await
        .expect("Failed to get word")
        .is_some());
}

#[tokio::test]
async fn test_queue_resumes_pending_jobs() {
    let (db, _temp) = create_test_db().await;

    // A job persisted by a previous run that never completed.
    sqlx::query(
        "INSERT INTO fetch_jobs (id, set_name, words, status, created_at) VALUES (?, ?, ?, 'pending', ?)",
    )
    .bind("job-1")
    .bind("Colors")
    .bind(r#"["red"]"#)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(db.pool())
    .await
    .expect("Failed to seed job");

    let mut api = MockDictionaryApi::new();
    api.expect_get_word()
        .returning(|word| Ok(vec![sample_entry(word, None)]));
    let queue = FetchQueue::start(db.clone(), Arc::new(api), TEST_AUDIO_BASE.to_string());

    let resumed = queue.resume_pending().await.expect("Failed to resume");
    assert_eq!(resumed, 1);

    wait_for_job_status(&queue, "job-1", "completed").await;
    assert!(db
        .get_word("red")
        .await
        .expect("Failed to get word")
        .is_some());
}

#[tokio::test]
async fn test_queue_strategy_streams_cumulative_set() {
    let (db, _temp) = create_test_db().await;
    let mut api = MockDictionaryApi::new();
    api.expect_get_word()
        .returning(|word| Ok(vec![sample_entry(word, None)]));

    let queue = FetchQueue::start(db.clone(), Arc::new(api), TEST_AUDIO_BASE.to_string());
    let strategy = QueueWordFetchStrategy::new(db.clone(), queue);

    let mut stream = strategy
        .fetch_words("Colors", &words(&["red", "blue"]))
        .await
        .expect("Failed to start fetch");
    wait_for_len(&mut stream, 2).await;

    let set = db
        .get_set_by_name("Colors")
        .await
        .expect("Failed to get set")
        .expect("Set not created");
    assert_eq!(set.number_of_words, 2);
}
