use std::collections::HashSet;

use crate::candidate::Candidate;

/// Concatenates vector then lexical candidates and keeps the first occurrence of each exact
/// content value, so a passage found by both paths is represented by its vector hit. The result
/// is not re-sorted.
pub fn merge(vector: Vec<Candidate>, lexical: Vec<Candidate>) -> Vec<Candidate> {
	let mut seen = HashSet::with_capacity(vector.len() + lexical.len());
	let mut out = Vec::with_capacity(vector.len() + lexical.len());

	for candidate in vector.into_iter().chain(lexical) {
		if seen.insert(candidate.content().to_string()) {
			out.push(candidate);
		}
	}

	out
}
