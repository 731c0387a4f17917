use std::cmp::Ordering;

use sift_storage::models::{IndexHit, TaggedHit};

use crate::{Error, Result, Stage, rerank::cmp_f32_desc};

/// Splits a flat, index-tagged stream into exactly `n` lists of at most `top_k` hits.
///
/// The engine is expected to order rows by query index, then by descending similarity, which
/// makes this one linear pass. A stream that breaks that order is normalized with a stable sort
/// first. A row tagged with an index outside `0..n` fails the whole batch.
pub fn regroup(mut rows: Vec<TaggedHit>, n: usize, top_k: usize) -> Result<Vec<Vec<IndexHit>>> {
	if let Some(row) = rows.iter().find(|row| row.query_index >= n) {
		return Err(Error::Storage {
			stage: Stage::BatchVectorSearch,
			message: format!(
				"Engine returned a row for query index {} but only {n} queries were sent.",
				row.query_index
			),
		});
	}

	if !is_engine_ordered(&rows) {
		tracing::warn!(rows = rows.len(), "Batch rows arrived out of order; sorting before regroup.");

		rows.sort_by(|a, b| {
			a.query_index.cmp(&b.query_index).then_with(|| cmp_f32_desc(a.hit.score, b.hit.score))
		});
	}

	let mut groups: Vec<Vec<IndexHit>> = (0..n).map(|_| Vec::new()).collect();

	for row in rows {
		if let Some(group) = groups.get_mut(row.query_index)
			&& group.len() < top_k
		{
			group.push(row.hit);
		}
	}

	Ok(groups)
}

fn is_engine_ordered(rows: &[TaggedHit]) -> bool {
	rows.windows(2).all(|pair| match pair[0].query_index.cmp(&pair[1].query_index) {
		Ordering::Less => true,
		Ordering::Equal => cmp_f32_desc(pair[0].hit.score, pair[1].hit.score) != Ordering::Greater,
		Ordering::Greater => false,
	})
}
