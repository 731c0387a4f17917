use std::sync::atomic::Ordering;

use sift_service::{BatchQueryRequest, BatchSearchRequest, Error, Stage};
use sift_storage::models::TaggedHit;

use super::{
	BatchCall, FakeEmbedding, FakeIndex, FakeKeyphrase, FakeRerank, harness, hit, test_config,
};

fn tagged(query_index: usize, id: &str, score: f32) -> TaggedHit {
	TaggedHit { query_index, hit: hit(id, &format!("passage {id}"), score) }
}

fn seven_rows() -> Vec<TaggedHit> {
	vec![
		tagged(0, "a", 0.94),
		tagged(0, "b", 0.90),
		tagged(0, "c", 0.71),
		tagged(0, "d", 0.60),
		tagged(1, "e", 0.88),
		tagged(1, "f", 0.52),
		tagged(1, "g", 0.33),
	]
}

fn batch_harness(index: FakeIndex) -> super::Harness {
	harness(
		test_config(),
		FakeEmbedding::default(),
		FakeKeyphrase::default(),
		FakeRerank::default(),
		index,
	)
}

fn ids(list: &[sift_service::Candidate]) -> Vec<&str> {
	list.iter().map(|candidate| candidate.id()).collect()
}

#[tokio::test]
async fn two_queries_regroup_into_per_query_top_two() {
	let h = batch_harness(FakeIndex { batch_rows: seven_rows(), ..FakeIndex::default() });
	let response = h
		.service
		.search_batch(BatchSearchRequest {
			vectors: vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
			top_k_per_query: Some(2),
			candidate_limit_per_query: Some(5),
			probe: None,
		})
		.await
		.expect("Batch search failed.");

	assert_eq!(response.results.len(), 2);
	assert_eq!(ids(&response.results[0]), ["a", "b"]);
	assert_eq!(ids(&response.results[1]), ["e", "f"]);
	assert_eq!(
		h.index.batch_calls(),
		[BatchCall { queries: 2, candidate_limit: 5, probe: None }]
	);
}

#[tokio::test]
async fn queries_without_matches_keep_their_slot() {
	let rows = vec![tagged(2, "z", 0.4)];
	let h = batch_harness(FakeIndex { batch_rows: rows, ..FakeIndex::default() });
	let response = h
		.service
		.search_batch(BatchSearchRequest {
			vectors: vec![vec![1.0; 3]; 3],
			top_k_per_query: Some(2),
			..BatchSearchRequest::default()
		})
		.await
		.expect("Batch search failed.");

	assert_eq!(response.results.len(), 3);
	assert!(response.results[0].is_empty());
	assert!(response.results[1].is_empty());
	assert_eq!(ids(&response.results[2]), ["z"]);
}

#[tokio::test]
async fn empty_batch_skips_the_engine() {
	let h = batch_harness(FakeIndex::default());
	let response =
		h.service.search_batch(BatchSearchRequest::default()).await.expect("Batch search failed.");

	assert!(response.results.is_empty());
	assert!(h.index.batch_calls().is_empty());
}

#[tokio::test]
async fn candidate_limit_is_raised_to_top_k_and_defaults_come_from_config() {
	let h = batch_harness(FakeIndex { partitions: Some(100), ..FakeIndex::default() });

	h.service
		.search_batch(BatchSearchRequest {
			vectors: vec![vec![1.0; 3]],
			top_k_per_query: Some(20),
			candidate_limit_per_query: Some(5),
			probe: None,
		})
		.await
		.expect("Batch search failed.");
	h.service
		.search_batch(BatchSearchRequest { vectors: vec![vec![1.0; 3]], ..Default::default() })
		.await
		.expect("Batch search failed.");

	assert_eq!(
		h.index.batch_calls(),
		[
			BatchCall { queries: 1, candidate_limit: 20, probe: Some(7) },
			BatchCall { queries: 1, candidate_limit: 100, probe: Some(7) },
		]
	);
}

#[tokio::test]
async fn caller_probe_is_clamped_and_zero_is_rejected() {
	let h = batch_harness(FakeIndex { partitions: Some(64), ..FakeIndex::default() });
	let response = h
		.service
		.search_batch(BatchSearchRequest {
			vectors: vec![vec![1.0; 3]],
			probe: Some(500),
			..Default::default()
		})
		.await
		.expect("Batch search failed.");

	assert_eq!(response.probe, Some(64));

	let err = h
		.service
		.search_batch(BatchSearchRequest {
			vectors: vec![vec![1.0; 3]],
			probe: Some(0),
			..Default::default()
		})
		.await
		.expect_err("Expected probe 0 to fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(h.index.batch_calls().len(), 1);
}

#[tokio::test]
async fn engine_failure_fails_the_whole_batch() {
	let h = batch_harness(FakeIndex {
		batch_rows: seven_rows(),
		fail_batch: true,
		..FakeIndex::default()
	});
	let err = h
		.service
		.search_batch(BatchSearchRequest {
			vectors: vec![vec![1.0; 3], vec![2.0; 3]],
			..Default::default()
		})
		.await
		.expect_err("Expected batch failure.");

	assert!(matches!(err, Error::Storage { stage: Stage::BatchVectorSearch, .. }));
}

#[tokio::test]
async fn row_for_an_unknown_query_fails_the_batch() {
	let h = batch_harness(FakeIndex { batch_rows: seven_rows(), ..FakeIndex::default() });
	let err = h
		.service
		.search_batch(BatchSearchRequest { vectors: vec![vec![1.0; 3]], ..Default::default() })
		.await
		.expect_err("Expected batch failure.");

	assert_eq!(err.stage(), Some(Stage::BatchVectorSearch));
}

#[tokio::test]
async fn wrong_vector_dimension_is_rejected() {
	let h = batch_harness(FakeIndex::default());
	let err = h
		.service
		.search_batch(BatchSearchRequest {
			vectors: vec![vec![1.0; 3], vec![1.0; 4]],
			..Default::default()
		})
		.await
		.expect_err("Expected dimension mismatch.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert!(h.index.batch_calls().is_empty());
}

#[tokio::test]
async fn query_texts_are_embedded_in_one_call() {
	let h = batch_harness(FakeIndex { batch_rows: seven_rows(), ..FakeIndex::default() });
	let response = h
		.service
		.search_batch_queries(BatchQueryRequest {
			queries: vec!["first question".to_string(), "second question".to_string()],
			top_k_per_query: Some(3),
			..Default::default()
		})
		.await
		.expect("Batch search failed.");

	assert_eq!(h.embedding.calls.load(Ordering::SeqCst), 1);
	assert_eq!(h.embedding.texts_seen.load(Ordering::SeqCst), 2);
	assert_eq!(ids(&response.results[0]), ["a", "b", "c"]);
	assert_eq!(ids(&response.results[1]), ["e", "f", "g"]);
}
