//! End-to-end behavior of the meeting vector store.

use super::providers::{
    FailingProvider, GatedProvider, LineProvider, ResizableProvider, SlowProvider,
};
use crate::embeddings::EmbeddingProvider;
use crate::persistence::StoreFiles;
use crate::{
    MeetingContent, MeetingVectorStore, SearchFilters, SearchRequest, SegmentType, StoreConfig,
    TopicInput, Transcript,
};
use minutes_core::AppError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn test_config(temp: &TempDir) -> StoreConfig {
    StoreConfig {
        embed_timeout_secs: 1,
        ..StoreConfig::for_workspace(temp.path())
    }
}

fn open_with(temp: &TempDir, provider: Arc<dyn EmbeddingProvider>) -> MeetingVectorStore {
    MeetingVectorStore::with_provider(test_config(temp), provider).unwrap()
}

/// Topics titled "item {n}" land at x = n for the line provider.
fn numbered_topics(meeting_id: &str, range: std::ops::Range<usize>) -> MeetingContent {
    MeetingContent::new(meeting_id).with_topics(
        range
            .map(|n| TopicInput {
                topic: format!("item {}", n),
                ..Default::default()
            })
            .collect(),
    )
}

#[tokio::test]
async fn test_budget_query_finds_approval_until_meeting_deleted() {
    let temp = TempDir::new().unwrap();
    let store = MeetingVectorStore::open(test_config(&temp)).await.unwrap();

    for text in [
        "the budget was approved",
        "we will ship next week",
        "timeline slipped by two days",
    ] {
        let added = store
            .add_meeting_embeddings(&MeetingContent::new("m1").with_summary(text))
            .await
            .unwrap();
        assert_eq!(added, 1);
    }

    let hits = store
        .search("budget approval", 1, &SearchFilters::new())
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "the budget was approved");
    assert_eq!(hits[0].meeting_id, "m1");

    assert!(store.delete_meeting_vectors("m1").await.unwrap());

    let hits = store
        .search("budget approval", 1, &SearchFilters::new())
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_delete_removes_exactly_the_meeting() {
    let temp = TempDir::new().unwrap();
    let store = open_with(&temp, Arc::new(LineProvider::default()));

    store.add_meeting_embeddings(&numbered_topics("m1", 0..3)).await.unwrap();
    store.add_meeting_embeddings(&numbered_topics("m2", 3..5)).await.unwrap();
    assert_eq!(store.get_stats().await.total_vectors, 5);

    assert!(store.delete_meeting_vectors("m1").await.unwrap());

    let stats = store.get_stats().await;
    assert_eq!(stats.total_vectors, 2);
    assert!(!stats.meetings.contains_key("m1"));
    assert_eq!(stats.embedding_dimension, Some(2));

    let hits = store
        .search("item 0", 10, &SearchFilters::new())
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.meeting_id == "m2"));

    // Nothing left to delete
    assert!(!store.delete_meeting_vectors("m1").await.unwrap());
    assert!(!store.delete_meeting_vectors("unknown").await.unwrap());
}

#[tokio::test]
async fn test_deleting_last_meeting_removes_snapshot() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let files = StoreFiles::new(&config.store_path);
    let store = MeetingVectorStore::with_provider(config, Arc::new(LineProvider::default())).unwrap();

    store.add_meeting_embeddings(&numbered_topics("m1", 0..2)).await.unwrap();
    assert!(files.exists());

    assert!(store.delete_meeting_vectors("m1").await.unwrap());
    assert!(!files.exists());

    let stats = store.get_stats().await;
    assert_eq!(stats.total_vectors, 0);
    assert_eq!(stats.embedding_dimension, None);
}

#[tokio::test]
async fn test_store_and_snapshot_stay_paired_across_mutations() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let files = StoreFiles::new(&config.store_path);
    let store = MeetingVectorStore::with_provider(config, Arc::new(LineProvider::default())).unwrap();

    for (i, meeting) in ["m1", "m2", "m3", "m4"].iter().enumerate() {
        store
            .add_meeting_embeddings(&numbered_topics(meeting, i * 3..i * 3 + 3))
            .await
            .unwrap();
    }
    store.delete_meeting_vectors("m2").await.unwrap();
    store.add_meeting_embeddings(&numbered_topics("m5", 20..22)).await.unwrap();
    store.delete_meeting_vectors("m4").await.unwrap();

    let stats = store.get_stats().await;
    assert_eq!(stats.total_vectors, 8);
    assert_eq!(stats.meetings.values().sum::<usize>(), stats.total_vectors);

    let snapshot = files.load(Some(2)).unwrap().unwrap();
    assert_eq!(snapshot.len(), stats.total_vectors);
    assert_eq!(snapshot.stats(), stats);
}

#[tokio::test]
async fn test_pages_concatenate_to_unpaginated_results() {
    let temp = TempDir::new().unwrap();
    let store = open_with(&temp, Arc::new(LineProvider::default()));
    store.add_meeting_embeddings(&numbered_topics("m1", 0..12)).await.unwrap();

    let base = SearchRequest::new("item 0").with_top_k(3);
    let unpaginated = store
        .search("item 0", base.clone().with_page(1, 5).fetch_limit(), &SearchFilters::new())
        .await
        .unwrap();
    assert_eq!(unpaginated.len(), 12);

    let mut concatenated = Vec::new();
    for page in 1..=3 {
        let result = store
            .search_page(&base.clone().with_page(page, 5))
            .await
            .unwrap();
        assert_eq!(result.total_results, 12);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.page, page);
        concatenated.extend(result.results);
    }

    assert_eq!(concatenated, unpaginated);
    assert!(concatenated
        .windows(2)
        .all(|w| w[0].similarity_score >= w[1].similarity_score));
}

#[tokio::test]
async fn test_search_page_echoes_query_and_filters() {
    let temp = TempDir::new().unwrap();
    let store = open_with(&temp, Arc::new(LineProvider::default()));
    store
        .add_meeting_embeddings(&numbered_topics("m1", 0..4).with_project("p1"))
        .await
        .unwrap();

    let request = SearchRequest::new("   item 1  ").with_filters(
        SearchFilters::new()
            .with_project_id("p1")
            .with_segment_types(vec![SegmentType::Topic]),
    );
    let page = store.search_page(&request).await.unwrap();

    assert_eq!(page.query, "item 1");
    assert_eq!(page.project_id_filter.as_deref(), Some("p1"));
    assert_eq!(page.segment_types_filter, Some(vec![SegmentType::Topic]));
    assert_eq!(page.meeting_ids_filter, None);
    assert_eq!(page.results[0].text, "item 1.");
}

#[tokio::test]
async fn test_project_scoped_search_and_counts() {
    let temp = TempDir::new().unwrap();
    let store = open_with(&temp, Arc::new(LineProvider::default()));

    store
        .add_meeting_embeddings(&numbered_topics("m1", 0..3).with_project("p1"))
        .await
        .unwrap();
    store
        .add_meeting_embeddings(&numbered_topics("m2", 0..3).with_project("p2"))
        .await
        .unwrap();
    store.add_meeting_embeddings(&numbered_topics("m3", 0..2)).await.unwrap();

    let filters = SearchFilters::new().with_project_id("p1");
    let hits = store.search("item 0", 10, &filters).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.project_id.as_deref() == Some("p1")));

    assert_eq!(store.project_vector_count("p1").await, 3);
    assert_eq!(store.project_vector_count("p9").await, 0);
    assert_eq!(store.meeting_vector_count("m3").await, 2);

    let stats = store.get_stats().await;
    assert_eq!(stats.projects["p1"], 3);
    assert_eq!(stats.projects["p2"], 3);
    assert_eq!(stats.projects["none"], 2);
    assert_eq!(stats.segment_types[&SegmentType::Topic], 8);
}

#[tokio::test]
async fn test_transcript_ingestion_uses_configured_chunking() {
    let temp = TempDir::new().unwrap();
    let config = StoreConfig {
        chunk_size: 100,
        chunk_overlap: 10,
        ..test_config(&temp)
    };
    let store =
        MeetingVectorStore::with_provider(config, Arc::new(LineProvider::default())).unwrap();

    let content = MeetingContent::new("m1").with_transcript(Transcript {
        text: "word ".repeat(60),
        segments: Vec::new(),
    });

    // 300 chars, windows start at 0, 90, 180, 270
    assert_eq!(store.add_meeting_embeddings(&content).await.unwrap(), 4);
    assert_eq!(
        store.get_stats().await.segment_types[&SegmentType::Transcript],
        4
    );
}

#[tokio::test]
async fn test_reopen_restores_contents_and_order() {
    let temp = TempDir::new().unwrap();

    let store = open_with(&temp, Arc::new(LineProvider::default()));
    store.add_meeting_embeddings(&numbered_topics("m1", 0..5)).await.unwrap();
    store
        .add_meeting_embeddings(&numbered_topics("m2", 5..8).with_project("p1"))
        .await
        .unwrap();
    let stats = store.get_stats().await;
    let hits = store
        .search("item 4", 6, &SearchFilters::new())
        .await
        .unwrap();
    store.close().await.unwrap();

    let reopened = open_with(&temp, Arc::new(LineProvider::default()));
    assert_eq!(reopened.get_stats().await, stats);
    assert_eq!(
        reopened
            .search("item 4", 6, &SearchFilters::new())
            .await
            .unwrap(),
        hits
    );
}

#[tokio::test]
async fn test_reopen_with_other_dimension_starts_empty() {
    let temp = TempDir::new().unwrap();

    let store = open_with(&temp, Arc::new(ResizableProvider::new(2)));
    store.add_meeting_embeddings(&numbered_topics("m1", 0..3)).await.unwrap();
    store.close().await.unwrap();

    let reopened = open_with(&temp, Arc::new(ResizableProvider::new(3)));
    assert_eq!(reopened.get_stats().await.total_vectors, 0);

    // The rebuilt store takes the new dimension
    reopened
        .add_meeting_embeddings(&numbered_topics("m1", 0..2))
        .await
        .unwrap();
    assert_eq!(reopened.get_stats().await.embedding_dimension, Some(3));
}

#[tokio::test]
async fn test_corrupt_snapshot_recovered_as_empty_store() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let files = StoreFiles::new(&config.store_path);

    let store = open_with(&temp, Arc::new(LineProvider::default()));
    store.add_meeting_embeddings(&numbered_topics("m1", 0..3)).await.unwrap();
    store.close().await.unwrap();

    std::fs::write(files.metadata_path(), b"{ not json").unwrap();

    let reopened = open_with(&temp, Arc::new(LineProvider::default()));
    assert_eq!(reopened.get_stats().await.total_vectors, 0);
    assert!(reopened
        .search("item 1", 3, &SearchFilters::new())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_reopen_after_interrupted_save_keeps_last_commit() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let files = StoreFiles::new(&config.store_path);

    let store = open_with(&temp, Arc::new(LineProvider::default()));
    store.add_meeting_embeddings(&numbered_topics("m1", 0..3)).await.unwrap();
    store.close().await.unwrap();

    // A later save that wrote its vector file but died before committing
    let other = TempDir::new().unwrap();
    let other_store = open_with(&other, Arc::new(LineProvider::default()));
    other_store
        .add_meeting_embeddings(&numbered_topics("m2", 0..5))
        .await
        .unwrap();
    other_store.close().await.unwrap();
    let other_files = StoreFiles::new(&test_config(&other).store_path);
    for path in other_files.vector_files().unwrap() {
        std::fs::copy(&path, files.dir().join(path.file_name().unwrap())).unwrap();
    }
    assert_eq!(files.vector_files().unwrap().len(), 2);

    let reopened = open_with(&temp, Arc::new(LineProvider::default()));
    let stats = reopened.get_stats().await;
    assert_eq!(stats.total_vectors, 3);
    assert_eq!(reopened.meeting_vector_count("m1").await, 3);
    assert_eq!(reopened.meeting_vector_count("m2").await, 0);

    reopened
        .add_meeting_embeddings(&numbered_topics("m3", 3..4))
        .await
        .unwrap();
    assert_eq!(files.vector_files().unwrap().len(), 1);
}

#[tokio::test]
async fn test_embedding_dimension_change_rejected_without_side_effects() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(ResizableProvider::new(2));
    let store = open_with(&temp, provider.clone());

    store.add_meeting_embeddings(&numbered_topics("m1", 0..3)).await.unwrap();

    provider.resize(3);
    let err = store
        .add_meeting_embeddings(&numbered_topics("m2", 0..2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));

    assert_eq!(store.get_stats().await.total_vectors, 3);
    assert_eq!(store.meeting_vector_count("m2").await, 0);

    let snapshot = StoreFiles::new(&store.config().store_path)
        .load(None)
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.len(), 3);
}

#[tokio::test]
async fn test_failed_embedding_leaves_store_untouched() {
    let temp = TempDir::new().unwrap();
    let store = open_with(&temp, Arc::new(FailingProvider));

    let err = store
        .add_meeting_embeddings(&numbered_topics("m1", 0..3))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmbeddingUnavailable(_)));

    let stats = store.get_stats().await;
    assert_eq!(stats.total_vectors, 0);
    assert!(!StoreFiles::new(&store.config().store_path).exists());
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let temp = TempDir::new().unwrap();
    let store = open_with(
        &temp,
        Arc::new(SlowProvider {
            delay: Duration::from_secs(10),
        }),
    );

    let err = store
        .add_meeting_embeddings(&numbered_topics("m1", 0..1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmbeddingUnavailable(_)));
    assert_eq!(store.get_stats().await.total_vectors, 0);
}

#[tokio::test]
async fn test_empty_store_search_skips_embedding() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(LineProvider::default());
    let store = open_with(&temp, provider.clone());

    let hits = store
        .search("anything", 5, &SearchFilters::new())
        .await
        .unwrap();
    assert!(hits.is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    let page = store
        .search_page(&SearchRequest::new("anything"))
        .await
        .unwrap();
    assert_eq!(page.total_results, 0);
    assert_eq!(page.total_pages, 0);
}

#[tokio::test]
async fn test_invalid_requests() {
    let temp = TempDir::new().unwrap();
    let store = open_with(&temp, Arc::new(LineProvider::default()));

    assert!(matches!(
        store.search("   ", 5, &SearchFilters::new()).await,
        Err(AppError::InvalidRequest(_))
    ));
    assert!(matches!(
        store
            .search_page(&SearchRequest::new("budget").with_page(0, 5))
            .await,
        Err(AppError::InvalidRequest(_))
    ));
    assert!(matches!(
        store
            .add_meeting_embeddings(&numbered_topics("", 0..1))
            .await,
        Err(AppError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_reset_discards_everything() {
    let temp = TempDir::new().unwrap();
    let store = open_with(&temp, Arc::new(LineProvider::default()));
    store.add_meeting_embeddings(&numbered_topics("m1", 0..3)).await.unwrap();

    store.reset().await.unwrap();

    assert_eq!(store.get_stats().await.total_vectors, 0);
    assert!(!StoreFiles::new(&store.config().store_path).exists());

    let reopened = open_with(&temp, Arc::new(LineProvider::default()));
    assert_eq!(reopened.get_stats().await.total_vectors, 0);
}

#[test]
fn test_invalid_chunking_rejected_at_open() {
    let temp = TempDir::new().unwrap();
    let config = StoreConfig {
        chunk_size: 50,
        chunk_overlap: 50,
        ..test_config(&temp)
    };

    let result = MeetingVectorStore::with_provider(config, Arc::new(LineProvider::default()));
    assert!(matches!(result, Err(AppError::InvalidConfiguration(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_and_readers_see_consistent_state() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(open_with(&temp, Arc::new(LineProvider::default())));

    let writers: Vec<_> = (0..8usize)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let meeting_id = format!("w{}", i);
                let added = store
                    .add_meeting_embeddings(&numbered_topics(&meeting_id, i * 3..i * 3 + 3))
                    .await
                    .unwrap();
                assert_eq!(added, 3);
                if i % 2 == 0 {
                    assert!(store.delete_meeting_vectors(&meeting_id).await.unwrap());
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..50 {
                    let stats = store.get_stats().await;
                    assert_eq!(stats.total_vectors, stats.meetings.values().sum::<usize>());
                    // Meetings appear and disappear whole
                    assert!(stats.meetings.values().all(|&count| count == 3));

                    let hits = store
                        .search("item 12", 5, &SearchFilters::new())
                        .await
                        .unwrap();
                    assert!(hits.len() <= 5);
                    assert!(hits
                        .windows(2)
                        .all(|w| w[0].similarity_score >= w[1].similarity_score));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.await.unwrap();
    }

    let stats = store.get_stats().await;
    assert_eq!(stats.total_vectors, 12);
    assert_eq!(
        stats.meetings.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["w1", "w3", "w5", "w7"]
    );

    let reopened = open_with(&temp, Arc::new(LineProvider::default()));
    assert_eq!(reopened.get_stats().await, stats);
}

#[tokio::test]
async fn test_search_spanning_reset_and_dimension_change_finds_nothing() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(GatedProvider::new(2, "held query"));
    let store = Arc::new(open_with(&temp, provider.clone()));
    store.add_meeting_embeddings(&numbered_topics("m1", 0..3)).await.unwrap();

    let searcher = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .search("held query", 3, &SearchFilters::new())
                .await
        })
    };
    provider.reached.notified().await;

    // The query vector is already two-dimensional; the store moves to three
    store.reset().await.unwrap();
    provider.inner.resize(3);
    store.add_meeting_embeddings(&numbered_topics("m2", 0..2)).await.unwrap();
    provider.release.notify_one();

    let hits = searcher.await.unwrap().unwrap();
    assert!(hits.is_empty());
    assert_eq!(store.get_stats().await.embedding_dimension, Some(3));

    // With the gate out of the way, searches see the new vectors
    let hits = store
        .search("item 1", 3, &SearchFilters::new())
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
}
