use serde::Deserialize;
use unicode_normalization::{UnicodeNormalization, is_nfc};
use uuid::Uuid;

use crate::{
	Error, Result, SiftService,
	candidate::{Query, RankedResult},
	merge::merge,
};

#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveRequest {
	pub query: String,
	/// Candidates requested from each search branch. Defaults to `retrieval.top_k`.
	pub top_k: Option<u32>,
	/// Truncates the reranked list. Unset returns every unique candidate.
	pub max_results: Option<u32>,
}
impl RetrieveRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), top_k: None, max_results: None }
	}
}

impl SiftService {
	pub async fn retrieve(&self, query: &str, top_k: u32) -> Result<RankedResult> {
		self.retrieve_request(RetrieveRequest {
			query: query.to_string(),
			top_k: Some(top_k),
			max_results: None,
		})
		.await
	}

	/// Embeds and extracts keyphrases concurrently, runs each search as soon as its input is ready,
	/// then merges and reranks.
	///
	/// Dropping the returned future cancels every in-flight sub-request, and the first failing
	/// branch cancels its sibling.
	pub async fn retrieve_request(&self, req: RetrieveRequest) -> Result<RankedResult> {
		let text = req.query.trim();

		if text.is_empty() {
			return Err(Error::invalid("query must be non-empty."));
		}

		let top_k = req.top_k.unwrap_or(self.cfg.retrieval.top_k);

		if top_k == 0 {
			return Err(Error::invalid("top_k must be greater than zero."));
		}

		let request_id = Uuid::new_v4();

		tracing::info!(%request_id, top_k, max_results = ?req.max_results, "Retrieval started.");

		let vector_branch = async {
			let embedding = self.embed_query(text).await?;
			let hits = self.search_vector(&embedding, top_k, None).await?;

			Ok::<_, Error>((embedding, hits))
		};
		let lexical_branch = async {
			let keywords = self.extract_keywords(text).await?;

			if keywords.is_empty() {
				tracing::info!(%request_id, "No keyphrases extracted; skipping lexical search.");

				return Ok::<_, Error>((keywords, Vec::new()));
			}

			let hits = self.search_lexical(&keywords, top_k).await?;

			Ok((keywords, hits))
		};
		let log_failure = |err: Error| {
			tracing::error!(%request_id, stage = ?err.stage(), error = %err, "Retrieval failed.");

			err
		};
		let ((embedding, vector_hits), (keywords, lexical_hits)) =
			tokio::try_join!(vector_branch, lexical_branch).map_err(log_failure)?;
		let vector_count = vector_hits.len();
		let lexical_count = lexical_hits.len();
		let merged = merge(vector_hits, lexical_hits);
		let merged_count = merged.len();
		let mut items = self.rerank(text, merged).await.map_err(log_failure)?;

		if let Some(max_results) = req.max_results {
			items.truncate(max_results as usize);
		}
		if self.cfg.retrieval.normalize_output {
			for item in &mut items {
				let content = item.candidate.content_mut();

				if !is_nfc(content) {
					*content = content.nfc().collect();
				}
			}
		}

		tracing::info!(
			%request_id,
			vector_hits = vector_count,
			lexical_hits = lexical_count,
			merged = merged_count,
			returned = items.len(),
			"Retrieval finished."
		);

		Ok(RankedResult {
			request_id,
			query: Query { text: text.to_string(), keywords, embedding },
			items,
		})
	}
}
