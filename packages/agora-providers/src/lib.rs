pub mod clustering;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod projection;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

/// Builds request headers. An empty key sends no `Authorization` header, which private clustering
/// and projection services rely on.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	let api_key = api_key.trim();

	if !api_key.is_empty() {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) async fn post_json(
	api_base: &str,
	path: &str,
	timeout_ms: u64,
	headers: HeaderMap,
	body: &Value,
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;
	let url = format!("{api_base}{path}");
	let res = client.post(url).headers(headers).json(body).send().await?;

	Ok(res.error_for_status()?.json().await?)
}

pub(crate) fn parse_f32_array(value: &Value, what: &str) -> Result<Vec<f32>> {
	let items = value
		.as_array()
		.ok_or_else(|| Error::invalid_response(format!("{what} must be an array.")))?;
	let mut out = Vec::with_capacity(items.len());

	for item in items {
		let number = item
			.as_f64()
			.ok_or_else(|| Error::invalid_response(format!("{what} values must be numeric.")))?;

		out.push(number as f32);
	}

	Ok(out)
}

pub(crate) fn ensure_len(kind: &str, expected: usize, actual: usize) -> Result<()> {
	if expected != actual {
		return Err(Error::invalid_response(format!(
			"{kind} returned {actual} items for {expected} inputs."
		)));
	}

	Ok(())
}
