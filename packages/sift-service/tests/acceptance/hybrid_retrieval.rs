use std::sync::atomic::Ordering;

use sift_service::{RetrieveRequest, SourcePath};

use super::{FakeEmbedding, FakeIndex, FakeKeyphrase, FakeRerank, harness, hit, test_config};

const A: &str = "Type 1 diabetes is an autoimmune condition.";
const B: &str = "Diabetes is caused by insufficient insulin or insulin resistance.";
const C: &str = "Regular exercise improves cardiovascular health.";
const D: &str = "Insulin is a hormone produced by the pancreas.";

fn diabetes_index() -> FakeIndex {
	FakeIndex {
		vector_hits: vec![hit("a", A, 0.91), hit("b", B, 0.85), hit("c", C, 0.80)],
		lexical_hits: vec![hit("b", B, 0.6), hit("d", D, 0.3)],
		..FakeIndex::default()
	}
}

fn diabetes_rerank() -> FakeRerank {
	FakeRerank::with_scores(&[(B, 0.97), (A, 0.88), (D, 0.52), (C, 0.04)])
}

fn diabetes_keyphrases() -> FakeKeyphrase {
	FakeKeyphrase { terms: vec!["diabetes", "insulin"], ..FakeKeyphrase::default() }
}

#[tokio::test]
async fn diabetes_query_merges_both_paths_and_reranks() {
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		diabetes_keyphrases(),
		diabetes_rerank(),
		diabetes_index(),
	);
	let result = h.service.retrieve("What causes diabetes?", 5).await.expect("Retrieval failed.");

	assert_eq!(h.index.lexical_calls(), [r#""diabetes" or "insulin""#]);
	assert_eq!(result.query.keywords.as_str(), r#""diabetes" or "insulin""#);
	assert_eq!(result.query.embedding.len(), super::DIM as usize);
	assert_eq!(
		result.items.iter().map(|item| item.candidate.id()).collect::<Vec<_>>(),
		["b", "a", "d", "c"]
	);
	assert_eq!(result.items.iter().map(|item| item.rank).collect::<Vec<_>>(), [1, 2, 3, 4]);
	// B was found by both paths; the vector hit represents it.
	assert_eq!(result.items[0].candidate.source_path(), SourcePath::Vector);
	assert_eq!(result.items[2].candidate.source_path(), SourcePath::Lexical);
	assert_eq!(h.rerank.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_retrieval_is_idempotent() {
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		diabetes_keyphrases(),
		diabetes_rerank(),
		diabetes_index(),
	);
	let first = h.service.retrieve("What causes diabetes?", 5).await.expect("Retrieval failed.");
	let second = h.service.retrieve("What causes diabetes?", 5).await.expect("Retrieval failed.");

	assert_eq!(first.items, second.items);
	assert_eq!(first.query, second.query);
	assert_ne!(first.request_id, second.request_id);
}

#[tokio::test]
async fn zero_keyphrases_skip_lexical_search() {
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		FakeKeyphrase::default(),
		diabetes_rerank(),
		diabetes_index(),
	);
	let result = h.service.retrieve("diabetes causes", 5).await.expect("Retrieval failed.");

	assert_eq!(h.keyphrase.calls.load(Ordering::SeqCst), 1);
	assert!(h.index.lexical_calls().is_empty());
	assert!(result.query.keywords.is_empty());

	let mut ids = result.items.iter().map(|item| item.candidate.id()).collect::<Vec<_>>();

	ids.sort_unstable();

	assert_eq!(ids, ["a", "b", "c"]);
	assert!(result.items.iter().all(|item| item.candidate.source_path() == SourcePath::Vector));
}

#[tokio::test]
async fn no_matches_is_an_empty_success() {
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		diabetes_keyphrases(),
		FakeRerank::default(),
		FakeIndex::default(),
	);
	let result = h.service.retrieve("What causes diabetes?", 5).await.expect("Retrieval failed.");

	assert!(result.items.is_empty());
	assert_eq!(h.rerank.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn top_k_bounds_each_branch_and_max_results_bounds_the_output() {
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		diabetes_keyphrases(),
		diabetes_rerank(),
		diabetes_index(),
	);
	let result = h
		.service
		.retrieve_request(RetrieveRequest {
			query: "What causes diabetes?".to_string(),
			top_k: Some(1),
			max_results: Some(1),
		})
		.await
		.expect("Retrieval failed.");

	// Vector returns A, lexical returns B; B wins the rerank.
	assert_eq!(result.items.len(), 1);
	assert_eq!(result.items[0].candidate.id(), "b");
	assert_eq!(result.items[0].candidate.source_path(), SourcePath::Lexical);
}

#[tokio::test]
async fn returned_content_is_nfc_normalized() {
	let decomposed = "Cafe\u{301} au lait";
	let index = FakeIndex { vector_hits: vec![hit("1", decomposed, 0.9)], ..FakeIndex::default() };
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		FakeKeyphrase::default(),
		FakeRerank::default(),
		index,
	);
	let result = h.service.retrieve("coffee", 5).await.expect("Retrieval failed.");

	assert_eq!(result.items[0].candidate.content(), "Caf\u{e9} au lait");

	let mut cfg = test_config();

	cfg.retrieval.normalize_output = false;

	let index = FakeIndex { vector_hits: vec![hit("1", decomposed, 0.9)], ..FakeIndex::default() };
	let h = harness(
		cfg,
		FakeEmbedding::default(),
		FakeKeyphrase::default(),
		FakeRerank::default(),
		index,
	);
	let result = h.service.retrieve("coffee", 5).await.expect("Retrieval failed.");

	assert_eq!(result.items[0].candidate.content(), decomposed);
}

#[tokio::test]
async fn default_probe_follows_partition_count() {
	let index = FakeIndex { partitions: Some(1000), ..diabetes_index() };
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		diabetes_keyphrases(),
		diabetes_rerank(),
		index,
	);

	h.service.retrieve("What causes diabetes?", 5).await.expect("Retrieval failed.");

	assert_eq!(h.index.vector_probes(), [Some(63)]);
}

#[tokio::test]
async fn result_serializes_with_flattened_candidates() {
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		diabetes_keyphrases(),
		diabetes_rerank(),
		diabetes_index(),
	);
	let result = h.service.retrieve("What causes diabetes?", 5).await.expect("Retrieval failed.");
	let json = serde_json::to_value(&result).expect("Failed to serialize result.");
	let first = &json["items"][0];

	assert_eq!(first["rank"], 1);
	assert_eq!(first["id"], "b");
	assert_eq!(first["source_path"], "vector");
	assert!(first["source_score"].is_number());
	assert!(json["query"].get("embedding").is_none());
	assert_eq!(json["query"]["keywords"]["terms"], serde_json::json!(["diabetes", "insulin"]));
}
