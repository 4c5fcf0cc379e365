pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0))
}

/// `1 - cosine_similarity`. Degenerate inputs (empty, mismatched, zero norm) are treated as
/// maximally distant.
pub fn cosine_distance(lhs: &[f32], rhs: &[f32]) -> f32 {
	match cosine_similarity(lhs, rhs) {
		Some(similarity) => 1.0 - similarity,
		None => 2.0,
	}
}

/// Arithmetic mean of equally sized vectors. The result is not renormalized.
pub fn mean_vector<V>(vectors: &[V]) -> Option<Vec<f32>>
where
	V: AsRef<[f32]>,
{
	let first = vectors.first()?;
	let dim = first.as_ref().len();
	let mut out = vec![0.0_f64; dim];

	for vec in vectors {
		let vec = vec.as_ref();

		if vec.len() != dim {
			return None;
		}

		for (idx, value) in vec.iter().enumerate() {
			out[idx] += f64::from(*value);
		}
	}

	let count = vectors.len() as f64;

	Some(out.into_iter().map(|sum| (sum / count) as f32).collect())
}

pub fn normalize(vec: &[f32]) -> Option<Vec<f32>> {
	let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm <= f32::EPSILON {
		return None;
	}

	Some(vec.iter().map(|value| value / norm).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mean_is_not_renormalized() {
		let vectors = vec![vec![1.0_f32, 0.0], vec![0.0_f32, 1.0]];
		let mean = mean_vector(&vectors).expect("Expected mean vector.");

		assert_eq!(mean, vec![0.5, 0.5]);
	}

	#[test]
	fn mean_rejects_mismatched_dimensions() {
		let vectors = vec![vec![1.0_f32, 0.0], vec![0.0_f32]];

		assert!(mean_vector(&vectors).is_none());
	}

	#[test]
	fn orthogonal_vectors_have_unit_distance() {
		let distance = cosine_distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);

		assert!((distance - 1.0).abs() < 1e-6);
	}

	#[test]
	fn zero_vector_has_no_similarity() {
		assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_none());
		assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 2.0);
	}
}
