use std::{
	sync::atomic::Ordering,
	time::{Duration, Instant},
};

use sift_service::{Error, Stage};

use super::{
	FakeEmbedding, FakeIndex, FakeKeyphrase, FakeRerank, capture_logs, harness, hit, test_config,
};

fn populated_index() -> FakeIndex {
	FakeIndex {
		vector_hits: vec![hit("a", "alpha", 0.9)],
		lexical_hits: vec![hit("c", "gamma", 1.2)],
		..FakeIndex::default()
	}
}

fn keyphrases() -> FakeKeyphrase {
	FakeKeyphrase { terms: vec!["gamma"], ..FakeKeyphrase::default() }
}

#[tokio::test]
async fn embedding_and_keyphrase_extraction_overlap() {
	let mut cfg = test_config();

	cfg.retrieval.stage_timeout_ms = 400;

	let h = harness(
		cfg,
		FakeEmbedding { delay: Some(Duration::from_millis(300)), ..FakeEmbedding::default() },
		FakeKeyphrase { delay: Some(Duration::from_millis(300)), ..keyphrases() },
		FakeRerank::default(),
		populated_index(),
	);
	let started = Instant::now();
	let result = h.service.retrieve("gamma rays", 5).await.expect("Retrieval failed.");
	let elapsed = started.elapsed();

	assert_eq!(result.items.len(), 2);
	assert!(elapsed < Duration::from_millis(600), "branches ran sequentially: {elapsed:?}");
}

#[tokio::test]
async fn failing_branch_cancels_its_sibling() {
	let h = harness(
		test_config(),
		FakeEmbedding { delay: Some(Duration::from_millis(500)), ..FakeEmbedding::default() },
		FakeKeyphrase { fail: true, ..keyphrases() },
		FakeRerank::default(),
		populated_index(),
	);
	let started = Instant::now();
	let err = h.service.retrieve("gamma rays", 5).await.expect_err("Expected failure.");

	assert_eq!(err.stage(), Some(Stage::KeyphraseExtraction));
	assert!(started.elapsed() < Duration::from_millis(400));

	// Long enough for the embedding to finish had it kept running.
	tokio::time::sleep(Duration::from_millis(600)).await;

	assert_eq!(h.embedding.calls.load(Ordering::SeqCst), 1);
	assert!(h.index.vector_probes().is_empty());
}

#[tokio::test]
async fn dropping_the_retrieval_cancels_in_flight_searches() {
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		keyphrases(),
		FakeRerank::default(),
		FakeIndex { lexical_delay: Some(Duration::from_millis(200)), ..populated_index() },
	);
	let outcome =
		tokio::time::timeout(Duration::from_millis(50), h.service.retrieve("gamma rays", 5)).await;

	assert!(outcome.is_err());

	tokio::time::sleep(Duration::from_millis(300)).await;

	assert_eq!(h.index.lexical_calls().len(), 1);
	assert_eq!(h.index.lexical_completed.load(Ordering::SeqCst), 0);
	assert_eq!(h.rerank.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_lexical_search_times_out_as_its_own_stage() {
	let mut cfg = test_config();

	cfg.retrieval.stage_timeout_ms = 30;

	let h = harness(
		cfg,
		FakeEmbedding::default(),
		keyphrases(),
		FakeRerank::default(),
		FakeIndex { lexical_delay: Some(Duration::from_millis(500)), ..populated_index() },
	);
	let err = h.service.retrieve("gamma rays", 5).await.expect_err("Expected a timeout.");

	assert!(matches!(err, Error::Timeout { stage: Stage::LexicalSearch, timeout_ms: 30 }));
	assert_eq!(h.rerank.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_scorer_times_out_as_the_rerank_stage() {
	let mut cfg = test_config();

	cfg.retrieval.stage_timeout_ms = 30;

	let h = harness(
		cfg,
		FakeEmbedding::default(),
		keyphrases(),
		FakeRerank { delay: Some(Duration::from_millis(500)), ..FakeRerank::default() },
		populated_index(),
	);
	let err = h.service.retrieve("gamma rays", 5).await.expect_err("Expected a timeout.");

	assert!(matches!(err, Error::Timeout { stage: Stage::Rerank, .. }));
}

#[tokio::test]
async fn a_failed_retrieval_is_logged_once() {
	let (logs, _guard) = capture_logs();
	let h = harness(
		test_config(),
		FakeEmbedding::default(),
		keyphrases(),
		FakeRerank::default(),
		FakeIndex { fail_lexical: true, ..populated_index() },
	);

	h.service.retrieve("gamma rays", 5).await.expect_err("Expected failure.");

	let output = logs.contents();

	assert_eq!(output.matches("Retrieval failed.").count(), 1, "{output}");
	assert_eq!(output.matches("ERROR").count(), 1, "{output}");
	assert!(!output.contains("WARN"), "{output}");
}
