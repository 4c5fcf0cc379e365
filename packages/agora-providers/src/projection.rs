use serde_json::Value;

use crate::{Error, Result};

pub async fn project_2d(
	cfg: &agora_config::ProviderConfig,
	vectors: &[Vec<f32>],
) -> Result<Vec<(f32, f32)>> {
	let body = serde_json::json!({ "vectors": vectors });
	let json = crate::post_json(
		&cfg.api_base,
		&cfg.path,
		cfg.timeout_ms,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await?;
	let points = parse_projection_response(json)?;

	crate::ensure_len("Projection provider", vectors.len(), points.len())?;

	Ok(points)
}

fn parse_projection_response(json: Value) -> Result<Vec<(f32, f32)>> {
	let points = json
		.get("points")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::invalid_response("Projection response is missing points array."))?;
	let mut out = Vec::with_capacity(points.len());

	for point in points {
		let coords = crate::parse_f32_array(point, "Projection point")?;
		let [x, y] = coords.as_slice() else {
			return Err(Error::invalid_response("Projection points must have two coordinates."));
		};

		if !x.is_finite() || !y.is_finite() {
			return Err(Error::invalid_response("Projection coordinates must be finite."));
		}

		out.push((*x, *y));
	}

	Ok(out)
}
