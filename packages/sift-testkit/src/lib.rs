mod error;

pub use error::{Error, Result};

use std::{
	collections::{HashMap, HashSet},
	env,
	str::FromStr,
	sync::Mutex,
	thread,
	time::Duration,
};

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Distance, Document, Modifier, PointStruct,
		SparseVectorParamsBuilder, SparseVectorsConfigBuilder, UpsertPointsBuilder, Vector,
		VectorParamsBuilder, VectorsConfigBuilder,
	},
};
use sqlx::{
	ConnectOptions, Connection, Executor, PgPool,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::{runtime::Builder, time};
use uuid::Uuid;

pub const PG_DSN_ENV: &str = "SIFT_PG_DSN";
pub const QDRANT_URL_ENV: &str = "SIFT_QDRANT_URL";

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

/// A document row shared by the Postgres and Qdrant fixtures.
#[derive(Debug, Clone)]
pub struct SeedDocument {
	pub id: i64,
	pub content: String,
	pub embedding: Vec<f32>,
}
impl SeedDocument {
	pub fn new(id: i64, content: &str, embedding: Vec<f32>) -> Self {
		Self { id, content: content.to_string(), embedding }
	}
}

/// A throwaway Postgres database, plus any Qdrant collections named through it. Everything is
/// dropped on `cleanup` or, as a fallback, on drop.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
	collections: Mutex<HashSet<String>>,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::setup(format!("Failed to parse {PG_DSN_ENV}: {err}.")))?;
		let (admin_options, mut admin_conn) = connect_admin(&base_options).await?;
		let name = format!("sift_test_{}", Uuid::new_v4().simple());

		admin_conn
			.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error::setup(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.clone().database(&name).to_url_lossy().to_string();

		Ok(Self {
			name,
			dsn,
			admin_options,
			cleaned: false,
			collections: Mutex::new(HashSet::new()),
		})
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Derives a collection name unique to this database and tracks it for cleanup.
	pub fn collection_name(&self, prefix: &str) -> String {
		let collection = format!("{prefix}_{}", self.name);

		self.collections.lock().unwrap_or_else(|err| err.into_inner()).insert(collection.clone());

		collection
	}

	pub async fn cleanup(mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		let collections = self.tracked_collections();
		let db_result = drop_database(&self.name, &self.admin_options).await;
		let qdrant_result = drop_qdrant_collections(&collections).await;

		db_result?;
		qdrant_result?;

		self.cleaned = true;

		Ok(())
	}

	fn tracked_collections(&self) -> Vec<String> {
		self.collections.lock().unwrap_or_else(|err| err.into_inner()).iter().cloned().collect()
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		let collections = self.tracked_collections();
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test database cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(drop_qdrant_collections(&collections)) {
				eprintln!("Test Qdrant cleanup failed: {err}.");
			}
			if let Err(err) = runtime.block_on(drop_database(&name, &admin_options)) {
				eprintln!("Test database cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var(PG_DSN_ENV).ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var(QDRANT_URL_ENV).ok()
}

/// Creates `table` with a `vector(dim)` column and a GIN full-text index, then inserts `docs`.
pub async fn seed_pg_documents(
	pool: &PgPool,
	table: &str,
	dim: usize,
	docs: &[SeedDocument],
) -> Result<()> {
	sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(pool).await?;
	sqlx::query(&format!(
		"\
CREATE TABLE {table} (
	id bigint PRIMARY KEY,
	content text NOT NULL,
	embedding vector({dim}) NOT NULL
)"
	))
	.execute(pool)
	.await?;
	sqlx::query(&format!(
		"CREATE INDEX {table}_content_fts ON {table} USING gin (to_tsvector('english', content))"
	))
	.execute(pool)
	.await?;

	for doc in docs {
		if doc.embedding.len() != dim {
			return Err(Error::setup(format!("Seed document {} has the wrong dimension.", doc.id)));
		}

		let literal = format!(
			"[{}]",
			doc.embedding.iter().map(|value| value.to_string()).collect::<Vec<_>>().join(",")
		);

		sqlx::query(&format!(
			"INSERT INTO {table} (id, content, embedding) VALUES ($1, $2, $3::text::vector)"
		))
		.bind(doc.id)
		.bind(doc.content.as_str())
		.bind(literal)
		.execute(pool)
		.await?;
	}

	Ok(())
}

/// Creates a collection with a named dense vector and an IDF-weighted BM25 sparse vector, then
/// upserts `docs` with their text stored under `content_field`.
pub async fn seed_qdrant_documents(
	client: &Qdrant,
	collection: &str,
	dense_vector: &str,
	bm25_vector: &str,
	content_field: &str,
	docs: &[SeedDocument],
) -> Result<()> {
	let dim = docs.first().map(|doc| doc.embedding.len()).unwrap_or(1);
	let mut vectors_config = VectorsConfigBuilder::default();

	vectors_config.add_named_vector_params(
		dense_vector,
		VectorParamsBuilder::new(dim as u64, Distance::Cosine),
	);

	let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();

	sparse_vectors_config.add_named_vector_params(
		bm25_vector,
		SparseVectorParamsBuilder::default().modifier(Modifier::Idf as i32),
	);

	let _ = client.delete_collection(collection.to_string()).await;

	client
		.create_collection(
			CreateCollectionBuilder::new(collection.to_string())
				.vectors_config(vectors_config)
				.sparse_vectors_config(sparse_vectors_config),
		)
		.await?;

	let mut points = Vec::with_capacity(docs.len());

	for doc in docs {
		let mut payload = Payload::new();

		payload.insert(content_field, doc.content.clone());

		let mut vectors = HashMap::new();

		vectors.insert(dense_vector.to_string(), Vector::from(doc.embedding.clone()));
		vectors.insert(
			bm25_vector.to_string(),
			Vector::from(Document::new(doc.content.clone(), "qdrant/bm25")),
		);

		points.push(PointStruct::new(doc.id as u64, vectors, payload));
	}

	client.upsert_points(UpsertPointsBuilder::new(collection.to_string(), points).wait(true)).await?;

	Ok(())
}

async fn connect_admin(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last_err = Some(err),
		}
	}

	Err(Error::setup(format!("Failed to connect to an admin database: {last_err:?}.")))
}

async fn drop_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options).await.map_err(|err| {
		Error::setup(format!("Failed to connect to admin database for cleanup: {err}."))
	})?;
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	sqlx::query(&format!(r#"DROP DATABASE IF EXISTS "{name}""#))
		.execute(&mut conn)
		.await
		.map_err(|err| Error::setup(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}

async fn drop_qdrant_collections(collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let Some(qdrant_url) = env_qdrant_url() else {
		eprintln!("Skipping Qdrant cleanup; set {QDRANT_URL_ENV} to delete test collections.");

		return Ok(());
	};
	let client = Qdrant::from_url(&qdrant_url).build()?;

	for collection in collections {
		match time::timeout(Duration::from_secs(10), client.delete_collection(collection.clone()))
			.await
		{
			Ok(Ok(_)) => {},
			Ok(Err(err)) => return Err(err.into()),
			Err(_) =>
				return Err(Error::setup(format!(
					"Timed out deleting Qdrant collection {collection:?}."
				))),
		}
	}

	Ok(())
}
