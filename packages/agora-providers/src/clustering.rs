use serde_json::Value;

use crate::{Error, Result};

/// Sends every vector to the clustering service and returns one label per input, in input order.
/// Label contiguity is checked by the caller.
pub async fn cluster(cfg: &agora_config::ProviderConfig, vectors: &[Vec<f32>]) -> Result<Vec<i32>> {
	let body = serde_json::json!({ "vectors": vectors });
	let json = crate::post_json(
		&cfg.api_base,
		&cfg.path,
		cfg.timeout_ms,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await?;
	let labels = parse_cluster_response(json)?;

	crate::ensure_len("Clustering provider", vectors.len(), labels.len())?;

	Ok(labels)
}

fn parse_cluster_response(json: Value) -> Result<Vec<i32>> {
	let labels = json
		.get("labels")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::invalid_response("Clustering response is missing labels array."))?;

	labels
		.iter()
		.map(|label| {
			label
				.as_i64()
				.and_then(|value| i32::try_from(value).ok())
				.ok_or_else(|| Error::invalid_response("Cluster labels must be 32-bit integers."))
		})
		.collect()
}
