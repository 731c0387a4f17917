use sift_storage::models::VectorQuery;

use crate::{Error, Result, SiftService, Stage, candidate::Candidate};

/// Partitions covered by one probe in the default heuristic.
pub const PARTITIONS_PER_PROBE: u32 = 16;

/// `ceil(partitions / 16)` for a partitioned index; `None` leaves the engine default in place.
pub fn default_probe(partitions: Option<u32>) -> Option<u32> {
	partitions
		.filter(|partitions| *partitions > 1)
		.map(|partitions| partitions.div_ceil(PARTITIONS_PER_PROBE))
}

/// Applies the caller's probe, clamped to the partition count, or falls back to
/// [`default_probe`].
pub fn resolve_probe(requested: Option<u32>, partitions: Option<u32>) -> Result<Option<u32>> {
	match requested {
		Some(0) => Err(Error::invalid("probe must be greater than zero.")),
		Some(probe) => Ok(Some(partitions.map_or(probe, |partitions| probe.min(partitions)))),
		None => Ok(default_probe(partitions)),
	}
}

pub(crate) fn check_dimension(vector: &[f32], expected: u32) -> Result<()> {
	if vector.len() != expected as usize {
		return Err(Error::invalid(format!(
			"Query vector has {} dimensions; the index expects {expected}.",
			vector.len()
		)));
	}

	Ok(())
}

impl SiftService {
	/// Nearest-neighbor search for one vector, ordered by descending similarity.
	pub async fn search_vector(
		&self,
		vector: &[f32],
		top_k: u32,
		probe: Option<u32>,
	) -> Result<Vec<Candidate>> {
		check_dimension(vector, self.cfg.storage.vector_dim)?;

		if top_k == 0 {
			return Ok(Vec::new());
		}

		let probe = resolve_probe(probe, self.indexes.vector.partitions())?;
		let hits = self
			.staged(Stage::VectorSearch, async {
				self.indexes
					.vector
					.search_vector(VectorQuery { vector, top_k, probe })
					.await
					.map_err(|err| Error::storage(Stage::VectorSearch, err))
			})
			.await?;

		tracing::debug!(top_k, ?probe, hits = hits.len(), "Vector search finished.");

		Ok(hits.into_iter().map(Candidate::vector).collect())
	}
}
