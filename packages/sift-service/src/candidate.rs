use serde::Serialize;
use uuid::Uuid;

use sift_storage::models::IndexHit;

use crate::keywords::KeywordExpression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePath {
	Vector,
	Lexical,
}
impl SourcePath {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Vector => "vector",
			Self::Lexical => "lexical",
		}
	}
}

/// A nearest-neighbor hit. `similarity` is higher-is-better and already converted from the
/// engine's distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorCandidate {
	pub id: String,
	pub content: String,
	#[serde(rename = "source_score")]
	pub similarity: f32,
}

/// A full-text hit carrying the engine's own rank score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexicalCandidate {
	pub id: String,
	pub content: String,
	#[serde(rename = "source_score")]
	pub rank_score: f32,
}

/// One retrieved passage, tagged by the search path that produced it. Source scores from the two
/// paths live on different scales and must not be compared with each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source_path", rename_all = "snake_case")]
pub enum Candidate {
	Vector(VectorCandidate),
	Lexical(LexicalCandidate),
}
impl Candidate {
	pub fn vector(hit: IndexHit) -> Self {
		Self::Vector(VectorCandidate { id: hit.id, content: hit.content, similarity: hit.score })
	}

	pub fn lexical(hit: IndexHit) -> Self {
		Self::Lexical(LexicalCandidate { id: hit.id, content: hit.content, rank_score: hit.score })
	}

	pub fn id(&self) -> &str {
		match self {
			Self::Vector(candidate) => &candidate.id,
			Self::Lexical(candidate) => &candidate.id,
		}
	}

	pub fn content(&self) -> &str {
		match self {
			Self::Vector(candidate) => &candidate.content,
			Self::Lexical(candidate) => &candidate.content,
		}
	}

	pub fn source_score(&self) -> f32 {
		match self {
			Self::Vector(candidate) => candidate.similarity,
			Self::Lexical(candidate) => candidate.rank_score,
		}
	}

	pub fn source_path(&self) -> SourcePath {
		match self {
			Self::Vector(_) => SourcePath::Vector,
			Self::Lexical(_) => SourcePath::Lexical,
		}
	}

	pub(crate) fn content_mut(&mut self) -> &mut String {
		match self {
			Self::Vector(candidate) => &mut candidate.content,
			Self::Lexical(candidate) => &mut candidate.content,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
	/// 1-based position in the final ordering.
	pub rank: usize,
	pub relevance_score: f32,
	#[serde(flatten)]
	pub candidate: Candidate,
}

/// The query and the artifacts derived from it during one retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
	pub text: String,
	pub keywords: KeywordExpression,
	#[serde(skip)]
	pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
	pub request_id: Uuid,
	pub query: Query,
	pub items: Vec<RankedCandidate>,
}
