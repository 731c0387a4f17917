use crate::{Error, Result, SiftService, Stage, candidate::Candidate, keywords::KeywordExpression};

impl SiftService {
	/// Ranked full-text search for any of the expression's terms. An empty expression, or one that
	/// matches nothing, yields an empty list.
	pub async fn search_lexical(
		&self,
		expression: &KeywordExpression,
		top_k: u32,
	) -> Result<Vec<Candidate>> {
		if expression.is_empty() || top_k == 0 {
			return Ok(Vec::new());
		}

		let hits = self
			.staged(Stage::LexicalSearch, async {
				self.indexes
					.lexical
					.search_lexical(expression, top_k)
					.await
					.map_err(|err| Error::storage(Stage::LexicalSearch, err))
			})
			.await?;

		tracing::debug!(top_k, hits = hits.len(), "Lexical search finished.");

		Ok(hits.into_iter().map(Candidate::lexical).collect())
	}
}
