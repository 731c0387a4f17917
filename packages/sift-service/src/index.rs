use std::sync::Arc;

use sift_storage::{
	Result,
	models::{BatchVectorQuery, IndexHit, TaggedHit, VectorQuery},
	pg::PgIndex,
	qdrant::QdrantStore,
};

use crate::{BoxFuture, keywords::KeywordExpression};

pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Partition count of the approximate index, used to derive the default probe.
	fn partitions(&self) -> Option<u32>;

	fn search_vector<'a>(&'a self, query: VectorQuery<'a>) -> BoxFuture<'a, Result<Vec<IndexHit>>>;

	/// One round trip for every vector. Rows are tagged with their query index and must arrive
	/// ordered by index, then by descending similarity.
	fn search_vector_batch<'a>(
		&'a self,
		query: BatchVectorQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<TaggedHit>>>;
}

pub trait LexicalIndex
where
	Self: Send + Sync,
{
	fn search_lexical<'a>(
		&'a self,
		expression: &'a KeywordExpression,
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>>;
}

#[derive(Clone)]
pub struct Indexes {
	pub vector: Arc<dyn VectorIndex>,
	pub lexical: Arc<dyn LexicalIndex>,
}
impl Indexes {
	pub fn new(vector: Arc<dyn VectorIndex>, lexical: Arc<dyn LexicalIndex>) -> Self {
		Self { vector, lexical }
	}

	/// Serves both paths from one backend.
	pub fn shared<T>(index: Arc<T>) -> Self
	where
		T: VectorIndex + LexicalIndex + 'static,
	{
		Self { vector: index.clone(), lexical: index }
	}
}

impl VectorIndex for PgIndex {
	fn partitions(&self) -> Option<u32> {
		PgIndex::partitions(self)
	}

	fn search_vector<'a>(&'a self, query: VectorQuery<'a>) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(PgIndex::search_vector(self, query))
	}

	fn search_vector_batch<'a>(
		&'a self,
		query: BatchVectorQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<TaggedHit>>> {
		Box::pin(PgIndex::search_vector_batch(self, query))
	}
}
impl LexicalIndex for PgIndex {
	fn search_lexical<'a>(
		&'a self,
		expression: &'a KeywordExpression,
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(PgIndex::search_lexical(self, expression.as_str(), top_k))
	}
}

impl VectorIndex for QdrantStore {
	fn partitions(&self) -> Option<u32> {
		None
	}

	fn search_vector<'a>(&'a self, query: VectorQuery<'a>) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(QdrantStore::search_vector(self, query))
	}

	fn search_vector_batch<'a>(
		&'a self,
		query: BatchVectorQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<TaggedHit>>> {
		Box::pin(QdrantStore::search_vector_batch(self, query))
	}
}
impl LexicalIndex for QdrantStore {
	fn search_lexical<'a>(
		&'a self,
		expression: &'a KeywordExpression,
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(QdrantStore::search_lexical(self, expression.terms(), top_k))
	}
}
