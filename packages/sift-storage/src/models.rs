use sift_config::Metric;

/// One row returned by a vector or lexical index. `score` is higher-is-better on the index's own
/// scale and is only comparable with scores from the same search.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
	pub id: String,
	pub content: String,
	pub score: f32,
}

/// A hit from a multi-vector request, tagged with the 0-based position of the query vector that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedHit {
	pub query_index: usize,
	pub hit: IndexHit,
}

#[derive(Debug, Clone, Copy)]
pub struct VectorQuery<'a> {
	pub vector: &'a [f32],
	pub top_k: u32,
	pub probe: Option<u32>,
}

/// All vectors travel in one request. The index returns at most `candidate_limit` rows per vector,
/// ordered by query index and then by descending similarity.
#[derive(Debug, Clone, Copy)]
pub struct BatchVectorQuery<'a> {
	pub vectors: &'a [Vec<f32>],
	pub candidate_limit: u32,
	pub probe: Option<u32>,
}

/// Converts a pgvector distance into a similarity where larger means closer.
pub fn similarity_from_distance(metric: Metric, distance: f32) -> f32 {
	match metric {
		Metric::Cosine => 1.0 - distance,
		// `<#>` yields the negated inner product.
		Metric::L2 | Metric::Ip => -distance,
	}
}
