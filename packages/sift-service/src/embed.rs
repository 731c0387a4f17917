use crate::{Error, Result, SiftService, Stage};

impl SiftService {
	pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
		let mut vectors = self.embed_queries(&[text.to_string()]).await?;

		vectors.pop().ok_or_else(|| {
			Error::provider(Stage::Embedding, "Embedding provider returned no vectors.")
		})
	}

	/// Embeds all texts in one provider call. The output is index-aligned with `texts`.
	pub async fn embed_queries(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let vectors = self
			.staged(Stage::Embedding, async {
				self.providers
					.embedding
					.embed(&self.cfg.providers.embedding, texts)
					.await
					.map_err(|err| Error::provider(Stage::Embedding, err))
			})
			.await?;

		if vectors.len() != texts.len() {
			return Err(Error::provider(
				Stage::Embedding,
				format!(
					"Embedding provider returned {} vectors for {} texts.",
					vectors.len(),
					texts.len()
				),
			));
		}

		let dim = self.cfg.storage.vector_dim as usize;

		if vectors.iter().any(|vector| vector.len() != dim) {
			return Err(Error::provider(Stage::Embedding, "Embedding vector dimension mismatch."));
		}

		Ok(vectors)
	}
}
