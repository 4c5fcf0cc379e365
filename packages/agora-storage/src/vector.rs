//! pgvector text encoding. Vectors are bound as `$n::text::vector` and read back as `vec::text`.

use crate::{Error, Result};

pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

pub fn parse_pg_vector(text: &str) -> Result<Vec<f32>> {
	let trimmed = text.trim();
	let inner = trimmed
		.strip_prefix('[')
		.and_then(|s| s.strip_suffix(']'))
		.ok_or_else(|| Error::InvalidArgument("Vector text is not bracketed.".to_string()))?;

	if inner.trim().is_empty() {
		return Ok(Vec::new());
	}

	inner
		.split(',')
		.map(|part| {
			part.trim().parse::<f32>().map_err(|_| {
				Error::InvalidArgument(format!("Vector component {part:?} is not a number."))
			})
		})
		.collect()
}

/// Rejects vectors whose length differs from the configured column dimension before they reach
/// Postgres.
pub fn ensure_dim(vec: &[f32], expected: u32) -> Result<()> {
	if vec.len() != expected as usize {
		return Err(Error::InvalidArgument(format!(
			"Vector has {} dimensions, expected {expected}.",
			vec.len()
		)));
	}
	if vec.iter().any(|value| !value.is_finite()) {
		return Err(Error::InvalidArgument("Vector contains non-finite values.".to_string()));
	}

	Ok(())
}
