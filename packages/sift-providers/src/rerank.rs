use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use crate::Endpoint;

/// Scores every document against `query`. The output is index-aligned with `docs`.
pub async fn rerank(
	client: &Client,
	cfg: &sift_config::ProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	if docs.is_empty() {
		return Ok(Vec::new());
	}

	let body = serde_json::json!({ "model": cfg.model, "query": query, "documents": docs });
	let res = Endpoint::from(cfg).post(client, &body)?.send().await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_rerank_response(json, docs.len())
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let mut scores: Vec<Option<f32>> = vec![None; doc_count];
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Rerank response is missing results array."))?;

	for item in results {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| eyre::eyre!("Rerank result missing index."))? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| eyre::eyre!("Rerank result missing score."))? as f32;
		let Some(slot) = scores.get_mut(index) else {
			return Err(eyre::eyre!("Rerank result index {index} is out of range."));
		};

		if slot.is_some() {
			return Err(eyre::eyre!("Rerank result index {index} is duplicated."));
		}
		if !score.is_finite() {
			return Err(eyre::eyre!("Rerank score for index {index} is not finite."));
		}

		*slot = Some(score);
	}

	scores
		.into_iter()
		.enumerate()
		.map(|(index, score)| {
			score.ok_or_else(|| eyre::eyre!("Rerank response is missing a score for index {index}."))
		})
		.collect()
}
