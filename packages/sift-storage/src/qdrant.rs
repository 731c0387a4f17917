pub const BM25_MODEL: &str = "qdrant/bm25";

use std::collections::HashMap;

use qdrant_client::qdrant::{
	BatchResult, Document, PointId, Query, QueryBatchPointsBuilder, QueryPointsBuilder,
	ScoredPoint, SearchParamsBuilder, Value, point_id::PointIdOptions, value::Kind,
};

use sift_config::Metric;

use crate::{
	Error, Result,
	models::{BatchVectorQuery, IndexHit, TaggedHit, VectorQuery},
};

/// Dense and BM25 search over one Qdrant collection with named vectors.
pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub dense_vector: String,
	pub bm25_vector: String,
	pub content_field: String,
	pub metric: Metric,
}
impl QdrantStore {
	pub fn new(cfg: &sift_config::Qdrant, metric: Metric) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			dense_vector: cfg.dense_vector.clone(),
			bm25_vector: cfg.bm25_vector.clone(),
			content_field: cfg.content_field.clone(),
			metric,
		})
	}

	pub async fn search_vector(&self, query: VectorQuery<'_>) -> Result<Vec<IndexHit>> {
		let request = self.dense_request(query.vector, query.top_k, query.probe);
		let response = self.client.query(request).await?;

		collect_hits(&response.result, &self.content_field, self.metric)
	}

	/// Sends every vector in one `query_batch` call and flattens the per-query results into one
	/// stream tagged by query index.
	pub async fn search_vector_batch(&self, query: BatchVectorQuery<'_>) -> Result<Vec<TaggedHit>> {
		if query.vectors.is_empty() {
			return Ok(Vec::new());
		}

		let requests = query
			.vectors
			.iter()
			.map(|vector| self.dense_request(vector, query.candidate_limit, query.probe).build())
			.collect::<Vec<_>>();
		let response = self
			.client
			.query_batch(QueryBatchPointsBuilder::new(self.collection.clone(), requests))
			.await?;

		tag_batch_results(&response.result, query.vectors.len(), &self.content_field, self.metric)
	}

	/// BM25 over the sparse vector. Qdrant infers the sparse query from the joined terms, so any
	/// single matching term qualifies a point.
	pub async fn search_lexical(&self, terms: &[String], top_k: u32) -> Result<Vec<IndexHit>> {
		if terms.is_empty() {
			return Ok(Vec::new());
		}

		let request = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(Document::new(terms.join(" "), BM25_MODEL)))
			.using(self.bm25_vector.clone())
			.with_payload(true)
			.limit(u64::from(top_k));
		let response = self.client.query(request).await?;

		response
			.result
			.iter()
			.map(|point| point_to_hit(point, &self.content_field, point.score))
			.collect()
	}

	fn dense_request(&self, vector: &[f32], limit: u32, probe: Option<u32>) -> QueryPointsBuilder {
		let request = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.using(self.dense_vector.clone())
			.with_payload(true)
			.limit(u64::from(limit));

		// HNSW has no partitions; the probe widens the candidate beam instead.
		match probe {
			Some(probe) => request.params(SearchParamsBuilder::default().hnsw_ef(u64::from(probe))),
			None => request,
		}
	}
}

/// Flattens one result list per query into a stream tagged by query index. A response with a
/// different number of lists than queries sent fails instead of leaving slots empty.
pub fn tag_batch_results(
	results: &[BatchResult],
	expected: usize,
	content_field: &str,
	metric: Metric,
) -> Result<Vec<TaggedHit>> {
	if results.len() != expected {
		return Err(Error::MalformedResponse(format!(
			"Qdrant returned {} result lists for {expected} queries.",
			results.len()
		)));
	}

	let mut out = Vec::new();

	for (query_index, batch) in results.iter().enumerate() {
		for hit in collect_hits(&batch.result, content_field, metric)? {
			out.push(TaggedHit { query_index, hit });
		}
	}

	Ok(out)
}

fn collect_hits(
	points: &[ScoredPoint],
	content_field: &str,
	metric: Metric,
) -> Result<Vec<IndexHit>> {
	points
		.iter()
		.map(|point| point_to_hit(point, content_field, similarity_from_score(metric, point.score)))
		.collect()
}

fn point_to_hit(point: &ScoredPoint, content_field: &str, score: f32) -> Result<IndexHit> {
	let id = point
		.id
		.as_ref()
		.and_then(point_id_to_string)
		.ok_or_else(|| Error::MalformedResponse("Qdrant point is missing an id.".to_string()))?;
	let content = payload_string(&point.payload, content_field).ok_or_else(|| {
		Error::MalformedResponse(format!("Qdrant point {id} lacks a string {content_field:?}."))
	})?;

	Ok(IndexHit { id, content, score })
}

/// Qdrant reports Euclidean distance for L2 collections and a similarity otherwise.
pub fn similarity_from_score(metric: Metric, score: f32) -> f32 {
	match metric {
		Metric::L2 => -score,
		Metric::Cosine | Metric::Ip => score,
	}
}

pub fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

pub fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}
