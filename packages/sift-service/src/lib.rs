pub mod batch;
pub mod candidate;
pub mod embed;
pub mod index;
pub mod keywords;
pub mod lexical;
pub mod merge;
pub mod regroup;
pub mod rerank;
pub mod retrieve;
pub mod vector;

mod error;

pub use batch::{BatchQueryRequest, BatchSearchRequest, BatchSearchResponse};
pub use candidate::{
	Candidate, LexicalCandidate, Query, RankedCandidate, RankedResult, SourcePath, VectorCandidate,
};
pub use error::{Error, Result, Stage};
pub use index::{Indexes, LexicalIndex, VectorIndex};
pub use keywords::KeywordExpression;
pub use retrieve::RetrieveRequest;
pub use sift_providers::keyphrase::Keyphrase;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use sift_config::{Config, EmbeddingProviderConfig, ProviderConfig};
use sift_providers::{embedding, keyphrase, rerank as rerank_provider};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait KeyphraseProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		text: &'a str,
		top_n: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Keyphrase>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	/// Returns one score per document, index-aligned with `docs`.
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub keyphrase: Arc<dyn KeyphraseProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		keyphrase: Arc<dyn KeyphraseProvider>,
		rerank: Arc<dyn RerankProvider>,
	) -> Self {
		Self { embedding, keyphrase, rerank }
	}

	/// HTTP adapters sharing one connection pool.
	pub fn http(client: reqwest::Client) -> Self {
		let provider = Arc::new(DefaultProviders { client });

		Self { embedding: provider.clone(), keyphrase: provider.clone(), rerank: provider }
	}
}

/// The retrieval engine. Every handle is immutable after construction, so one instance serves
/// any number of concurrent calls.
pub struct SiftService {
	pub cfg: Config,
	pub providers: Providers,
	pub indexes: Indexes,
}
impl SiftService {
	pub fn new(cfg: Config, providers: Providers, indexes: Indexes) -> Self {
		Self { cfg, providers, indexes }
	}

	/// Bounds `fut` by `retrieval.stage_timeout_ms`. Elapsing is a failure of `stage`, never an
	/// empty result. Callers log the failure once, at the entry point.
	pub(crate) async fn staged<T, F>(&self, stage: Stage, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let timeout_ms = self.cfg.retrieval.stage_timeout_ms;

		match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
			Ok(result) => result,
			Err(_) => Err(Error::Timeout { stage, timeout_ms }),
		}
	}
}

struct DefaultProviders {
	client: reqwest::Client,
}
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(&self.client, cfg, texts))
	}
}
impl KeyphraseProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		text: &'a str,
		top_n: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Keyphrase>>> {
		Box::pin(keyphrase::extract(&self.client, cfg, text, top_n))
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(rerank_provider::rerank(&self.client, cfg, query, docs))
	}
}
