use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub batch: Batch,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub backend: Backend,
	#[serde(default)]
	pub metric: Metric,
	/// Dimension of every stored and query vector.
	pub vector_dim: u32,
	pub postgres: Option<Postgres>,
	pub qdrant: Option<Qdrant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
	Postgres,
	Qdrant,
}

/// Similarity metric of the vector index. Fixed per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
	#[default]
	Cosine,
	L2,
	Ip,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	#[serde(default = "default_table")]
	pub table: String,
	#[serde(default = "default_id_column")]
	pub id_column: String,
	#[serde(default = "default_content_column")]
	pub content_column: String,
	#[serde(default = "default_embedding_column")]
	pub embedding_column: String,
	/// Text search configuration passed to `to_tsvector` and `websearch_to_tsquery`.
	#[serde(default = "default_language")]
	pub language: String,
	/// Partition count of the approximate vector index, e.g. the `lists` option of an IVF index.
	pub partitions: Option<u32>,
	#[serde(default = "default_probe_setting")]
	pub probe_setting: String,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	#[serde(default = "default_dense_vector")]
	pub dense_vector: String,
	#[serde(default = "default_bm25_vector")]
	pub bm25_vector: String,
	#[serde(default = "default_content_field")]
	pub content_field: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub keyphrase: ProviderConfig,
	pub rerank: ProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// Candidates requested from each search branch.
	pub top_k: u32,
	pub keyphrase_top_n: u32,
	/// NFC-normalize returned passage text.
	pub normalize_output: bool,
	/// Upper bound for every external call made while serving one query.
	pub stage_timeout_ms: u64,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { top_k: 5, keyphrase_top_n: 3, normalize_output: true, stage_timeout_ms: 10_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Batch {
	pub top_k_per_query: u32,
	pub candidate_limit_per_query: u32,
	pub probe: Option<u32>,
}
impl Default for Batch {
	fn default() -> Self {
		Self { top_k_per_query: 10, candidate_limit_per_query: 100, probe: None }
	}
}

fn default_table() -> String {
	"documents".to_string()
}

fn default_id_column() -> String {
	"id".to_string()
}

fn default_content_column() -> String {
	"content".to_string()
}

fn default_embedding_column() -> String {
	"embedding".to_string()
}

fn default_language() -> String {
	"english".to_string()
}

fn default_probe_setting() -> String {
	"vchordrq.probes".to_string()
}

fn default_dense_vector() -> String {
	"dense".to_string()
}

fn default_bm25_vector() -> String {
	"bm25".to_string()
}

fn default_content_field() -> String {
	"content".to_string()
}
