use std::cmp::Ordering;

use crate::{
	Error, Result, SiftService, Stage,
	candidate::{Candidate, RankedCandidate},
};

impl SiftService {
	/// Scores every candidate against `query` in one scorer call and orders them by descending
	/// score. Any scoring failure fails the whole step.
	pub async fn rerank(
		&self,
		query: &str,
		candidates: Vec<Candidate>,
	) -> Result<Vec<RankedCandidate>> {
		if candidates.is_empty() {
			return Ok(Vec::new());
		}

		let docs =
			candidates.iter().map(|candidate| candidate.content().to_string()).collect::<Vec<_>>();
		let scores = self
			.staged(Stage::Rerank, async {
				self.providers
					.rerank
					.rerank(&self.cfg.providers.rerank, query, &docs)
					.await
					.map_err(|err| Error::provider(Stage::Rerank, err))
			})
			.await?;

		rank_by_scores(candidates, scores)
	}
}

/// Pairs candidates with index-aligned scores and stable-sorts them by descending score, so equal
/// scores keep their pre-rerank order.
pub fn rank_by_scores(
	candidates: Vec<Candidate>,
	scores: Vec<f32>,
) -> Result<Vec<RankedCandidate>> {
	if scores.len() != candidates.len() {
		return Err(Error::provider(
			Stage::Rerank,
			format!("Scorer returned {} scores for {} candidates.", scores.len(), candidates.len()),
		));
	}
	if let Some(position) = scores.iter().position(|score| !score.is_finite()) {
		return Err(Error::provider(
			Stage::Rerank,
			format!("Scorer returned a non-finite score for candidate {position}."),
		));
	}

	let mut scored = candidates.into_iter().zip(scores).collect::<Vec<_>>();

	scored.sort_by(|a, b| cmp_f32_desc(a.1, b.1));

	Ok(scored
		.into_iter()
		.enumerate()
		.map(|(idx, (candidate, relevance_score))| RankedCandidate {
			rank: idx + 1,
			relevance_score,
			candidate,
		})
		.collect())
}

/// Descending order with NaN last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
