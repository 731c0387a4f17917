use std::sync::Arc;

use sift_config::Postgres;
use sift_service::{BatchSearchRequest, Indexes, Providers, SiftService, SourcePath};
use sift_storage::{db::Db, pg::PgIndex};
use sift_testkit::{SeedDocument, TestDatabase};

use super::{FakeEmbedding, FakeKeyphrase, FakeRerank, test_config};

const INSULIN: &str = "Insulin resistance is a leading cause of type 2 diabetes.";
const PANCREAS: &str = "The pancreas produces insulin.";
const RUST: &str = "Rust guarantees memory safety without a garbage collector.";

fn postgres_cfg(dsn: &str) -> Postgres {
	Postgres {
		dsn: dsn.to_string(),
		pool_max_conns: 2,
		table: "documents".to_string(),
		id_column: "id".to_string(),
		content_column: "content".to_string(),
		embedding_column: "embedding".to_string(),
		language: "english".to_string(),
		partitions: None,
		probe_setting: "ivfflat.probes".to_string(),
	}
}

async fn pg_service(test_db: &TestDatabase) -> SiftService {
	let mut cfg = test_config();
	let postgres = postgres_cfg(test_db.dsn());
	let db = Db::connect(&postgres).await.expect("Failed to connect to Postgres.");

	sift_testkit::seed_pg_documents(
		&db.pool,
		"documents",
		super::DIM as usize,
		&[
			SeedDocument::new(1, RUST, vec![1.0, 1.0, 1.0]),
			SeedDocument::new(2, INSULIN, vec![0.0, 1.0, 0.0]),
			SeedDocument::new(3, PANCREAS, vec![0.0, 0.0, 1.0]),
		],
	)
	.await
	.expect("Failed to seed documents.");

	let index =
		PgIndex::new(db.pool, &postgres, cfg.storage.metric).expect("Failed to build index.");

	cfg.storage.postgres = Some(postgres);

	let providers = Providers::new(
		Arc::new(FakeEmbedding::default()),
		Arc::new(FakeKeyphrase { terms: vec!["pancreas"], ..FakeKeyphrase::default() }),
		Arc::new(FakeRerank::with_scores(&[(PANCREAS, 0.9), (RUST, 0.1)])),
	);

	SiftService::new(cfg, providers, Indexes::shared(Arc::new(index)))
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set SIFT_PG_DSN to run."]
async fn retrieval_runs_against_postgres() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping retrieval_runs_against_postgres; set SIFT_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = pg_service(&test_db).await;
	let result =
		service.retrieve("What does the pancreas do?", 1).await.expect("Retrieval failed.");

	// The fake embedding points at document 1; the keyphrase finds document 3.
	assert_eq!(result.items.len(), 2);
	assert_eq!(result.items[0].candidate.content(), PANCREAS);
	assert_eq!(result.items[0].candidate.source_path(), SourcePath::Lexical);
	assert_eq!(result.items[1].candidate.id(), "1");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set SIFT_PG_DSN to run."]
async fn batch_search_runs_against_postgres() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping batch_search_runs_against_postgres; set SIFT_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = pg_service(&test_db).await;
	let response = service
		.search_batch(BatchSearchRequest {
			vectors: vec![vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0], vec![1.0, 1.0, 1.0]],
			top_k_per_query: Some(1),
			candidate_limit_per_query: Some(3),
			probe: None,
		})
		.await
		.expect("Batch search failed.");
	let top = response
		.results
		.iter()
		.map(|list| list.first().map(|candidate| candidate.id().to_string()))
		.collect::<Vec<_>>();

	assert_eq!(top, [Some("2".to_string()), Some("3".to_string()), Some("1".to_string())]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
