use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sift_storage::models::BatchVectorQuery;

use crate::{
	Error, Result, SiftService, Stage,
	candidate::Candidate,
	regroup::regroup,
	vector::{check_dimension, resolve_probe},
};

/// Unset fields fall back to the `[batch]` configuration section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSearchRequest {
	pub vectors: Vec<Vec<f32>>,
	pub top_k_per_query: Option<u32>,
	pub candidate_limit_per_query: Option<u32>,
	pub probe: Option<u32>,
}

/// Like [`BatchSearchRequest`], with texts that are embedded in a single provider call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchQueryRequest {
	pub queries: Vec<String>,
	pub top_k_per_query: Option<u32>,
	pub candidate_limit_per_query: Option<u32>,
	pub probe: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSearchResponse {
	pub request_id: Uuid,
	/// The probe actually sent to the engine.
	pub probe: Option<u32>,
	/// One list per input vector, in input order.
	pub results: Vec<Vec<Candidate>>,
}

impl SiftService {
	/// Searches every vector in one engine round trip and regroups the tagged stream into one
	/// top-k list per vector. Any failure fails the whole batch.
	pub async fn search_batch(&self, req: BatchSearchRequest) -> Result<BatchSearchResponse> {
		let request_id = Uuid::new_v4();
		let top_k = req.top_k_per_query.unwrap_or(self.cfg.batch.top_k_per_query);
		let candidate_limit = req
			.candidate_limit_per_query
			.unwrap_or(self.cfg.batch.candidate_limit_per_query)
			.max(top_k);
		let probe =
			resolve_probe(req.probe.or(self.cfg.batch.probe), self.indexes.vector.partitions())?;

		if top_k == 0 {
			return Err(Error::invalid("top_k_per_query must be greater than zero."));
		}
		if req.vectors.is_empty() {
			return Ok(BatchSearchResponse { request_id, probe, results: Vec::new() });
		}

		for vector in &req.vectors {
			check_dimension(vector, self.cfg.storage.vector_dim)?;
		}

		let n = req.vectors.len();
		let log_failure = |err: Error| {
			tracing::error!(%request_id, stage = ?err.stage(), error = %err, "Batch failed.");

			err
		};
		let rows = self
			.staged(Stage::BatchVectorSearch, async {
				self.indexes
					.vector
					.search_vector_batch(BatchVectorQuery {
						vectors: &req.vectors,
						candidate_limit,
						probe,
					})
					.await
					.map_err(|err| Error::storage(Stage::BatchVectorSearch, err))
			})
			.await
			.map_err(log_failure)?;
		let row_count = rows.len();
		let groups = regroup(rows, n, top_k as usize).map_err(log_failure)?;

		tracing::info!(
			%request_id,
			queries = n,
			top_k,
			candidate_limit,
			?probe,
			rows = row_count,
			"Batch vector search finished."
		);

		Ok(BatchSearchResponse {
			request_id,
			probe,
			results: groups
				.into_iter()
				.map(|group| group.into_iter().map(Candidate::vector).collect())
				.collect(),
		})
	}

	pub async fn search_batch_queries(&self, req: BatchQueryRequest) -> Result<BatchSearchResponse> {
		if req.queries.iter().any(|query| query.trim().is_empty()) {
			return Err(Error::invalid("Batch queries must be non-empty."));
		}

		let vectors = self.embed_queries(&req.queries).await.map_err(|err| {
			tracing::error!(stage = ?err.stage(), error = %err, "Batch query embedding failed.");

			err
		})?;

		self.search_batch(BatchSearchRequest {
			vectors,
			top_k_per_query: req.top_k_per_query,
			candidate_limit_per_query: req.candidate_limit_per_query,
			probe: req.probe,
		})
		.await
	}
}
