use std::fmt::{self, Display};

use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The step of a retrieval or batch search that talks to an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Embedding,
	KeyphraseExtraction,
	VectorSearch,
	LexicalSearch,
	BatchVectorSearch,
	Rerank,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Embedding => "embedding",
			Self::KeyphraseExtraction => "keyphrase_extraction",
			Self::VectorSearch => "vector_search",
			Self::LexicalSearch => "lexical_search",
			Self::BatchVectorSearch => "batch_vector_search",
			Self::Rerank => "rerank",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Stage {stage} timed out after {timeout_ms} ms.")]
	Timeout { stage: Stage, timeout_ms: u64 },
	#[error("Provider error during {stage}: {message}")]
	Provider { stage: Stage, message: String },
	#[error("Storage error during {stage}: {message}")]
	Storage { stage: Stage, message: String },
	#[error("Qdrant error during {stage}: {message}")]
	Qdrant { stage: Stage, message: String },
}
impl Error {
	/// The failed stage, or `None` when the request was rejected before any stage ran.
	pub fn stage(&self) -> Option<Stage> {
		match self {
			Self::InvalidRequest { .. } => None,
			Self::Timeout { stage, .. }
			| Self::Provider { stage, .. }
			| Self::Storage { stage, .. }
			| Self::Qdrant { stage, .. } => Some(*stage),
		}
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}

	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn provider(stage: Stage, err: impl Display) -> Self {
		Self::Provider { stage, message: err.to_string() }
	}

	pub(crate) fn storage(stage: Stage, err: sift_storage::Error) -> Self {
		match err {
			sift_storage::Error::Sqlx(inner) => Self::Storage { stage, message: inner.to_string() },
			sift_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			sift_storage::Error::MalformedResponse(message) => Self::Storage { stage, message },
			sift_storage::Error::Qdrant(inner) => Self::Qdrant { stage, message: inner.to_string() },
		}
	}
}
