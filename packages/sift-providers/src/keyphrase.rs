use std::cmp::Ordering;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use crate::Endpoint;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyphrase {
	pub term: String,
	pub score: f32,
}

/// Returns at most `top_n` keyphrases in descending score order.
pub async fn extract(
	client: &Client,
	cfg: &sift_config::ProviderConfig,
	text: &str,
	top_n: u32,
) -> Result<Vec<Keyphrase>> {
	let body = serde_json::json!({ "model": cfg.model, "text": text, "top_n": top_n });
	let res = Endpoint::from(cfg).post(client, &body)?.send().await?;
	let json: Value = res.error_for_status()?.json().await?;
	let mut phrases = parse_keyphrase_response(json)?;

	phrases.truncate(top_n as usize);

	Ok(phrases)
}

fn parse_keyphrase_response(json: Value) -> Result<Vec<Keyphrase>> {
	let items = json
		.get("keyphrases")
		.or_else(|| json.get("results"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Keyphrase response is missing keyphrases array."))?;
	let mut out = Vec::with_capacity(items.len());

	for item in items {
		// Some extractors answer with `[term, score]` tuples.
		let (term, score) = match item {
			Value::Array(pair) => (pair.first(), pair.get(1)),
			_ => (item.get("term").or_else(|| item.get("text")), item.get("score")),
		};
		let term = term
			.and_then(|v| v.as_str())
			.ok_or_else(|| eyre::eyre!("Keyphrase item missing term."))?;
		let score = score
			.and_then(|v| v.as_f64())
			.ok_or_else(|| eyre::eyre!("Keyphrase item missing score."))? as f32;

		if !score.is_finite() {
			return Err(eyre::eyre!("Keyphrase score must be finite."));
		}

		out.push(Keyphrase { term: term.to_string(), score });
	}

	out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

	Ok(out)
}
