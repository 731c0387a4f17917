use std::{
	collections::HashSet,
	fmt::{self, Display},
};

use serde::Serialize;

use sift_config::MAX_KEYPHRASE_TOP_N;

use crate::{Error, Result, SiftService, Stage};

pub const DEFAULT_TOP_N: u32 = 3;

/// Salient query terms combined with OR semantics, rendered as `"t1" or "t2"` for
/// `websearch_to_tsquery`. An empty expression means the lexical branch is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordExpression {
	terms: Vec<String>,
	expression: String,
}
impl KeywordExpression {
	/// Keeps at most `top_n` (bounded by [`MAX_KEYPHRASE_TOP_N`]) cleaned terms in input order.
	pub fn from_terms<I, S>(terms: I, top_n: u32) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let limit = top_n.min(MAX_KEYPHRASE_TOP_N) as usize;
		let mut seen = HashSet::new();
		let mut kept = Vec::new();

		for term in terms {
			if kept.len() == limit {
				break;
			}

			// Quotes would break the phrase syntax of the rendered expression.
			let cleaned = term.as_ref().replace('"', " ");
			let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

			if cleaned.is_empty() || !seen.insert(cleaned.to_lowercase()) {
				continue;
			}

			kept.push(cleaned);
		}

		let expression =
			kept.iter().map(|term| format!("\"{term}\"")).collect::<Vec<_>>().join(" or ");

		Self { terms: kept, expression }
	}

	pub fn empty() -> Self {
		Self::default()
	}

	pub fn terms(&self) -> &[String] {
		&self.terms
	}

	pub fn as_str(&self) -> &str {
		&self.expression
	}

	pub fn len(&self) -> usize {
		self.terms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}
}
impl Display for KeywordExpression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.expression)
	}
}

impl SiftService {
	/// Extracts the keyword expression for `text` with `retrieval.keyphrase_top_n` terms.
	pub async fn extract_keywords(&self, text: &str) -> Result<KeywordExpression> {
		self.extract_keywords_with(text, self.cfg.retrieval.keyphrase_top_n).await
	}

	pub async fn extract_keywords_with(&self, text: &str, top_n: u32) -> Result<KeywordExpression> {
		if text.trim().is_empty() || top_n == 0 {
			return Ok(KeywordExpression::empty());
		}

		let top_n = top_n.min(MAX_KEYPHRASE_TOP_N);
		let phrases = self
			.staged(Stage::KeyphraseExtraction, async {
				self.providers
					.keyphrase
					.extract(&self.cfg.providers.keyphrase, text, top_n)
					.await
					.map_err(|err| Error::provider(Stage::KeyphraseExtraction, err))
			})
			.await?;
		let expression =
			KeywordExpression::from_terms(phrases.iter().map(|phrase| phrase.term.as_str()), top_n);

		tracing::debug!(
			returned = phrases.len(),
			kept = expression.len(),
			expression = %expression,
			"Keyphrases extracted."
		);

		Ok(expression)
	}
}
