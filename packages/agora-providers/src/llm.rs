//! Chat-completions client used for theme naming and statement synthesis.

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

pub const CONSOLIDATE_PROMPT_VERSION: &str = "consolidate.v1";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ThemeName {
	pub name: String,
	#[serde(default)]
	pub description: String,
}

pub async fn name_theme(
	cfg: &agora_config::LlmProviderConfig,
	cluster_index: i32,
	samples: &[String],
) -> Result<ThemeName> {
	let messages = theme_messages(cluster_index, samples);
	let json = complete(cfg, &messages).await?;

	parse_theme_name(&message_content(&json)?)
}

pub async fn synthesize(
	cfg: &agora_config::LlmProviderConfig,
	cluster_index: i32,
	texts: &[String],
) -> Result<String> {
	let messages = synthesis_messages(cluster_index, texts);
	let json = complete(cfg, &messages).await?;
	let content = message_content(&json)?;
	let statement = content.trim();

	if statement.is_empty() {
		return Err(Error::MalformedContent {
			message: "Synthesis returned an empty statement.".to_string(),
		});
	}

	Ok(statement.to_string())
}

async fn complete(cfg: &agora_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});

	crate::post_json(
		&cfg.api_base,
		&cfg.path,
		cfg.timeout_ms,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await
}

fn theme_messages(cluster_index: i32, samples: &[String]) -> Vec<Value> {
	let listing = numbered(samples);

	vec![
		serde_json::json!({
			"role": "system",
			"content": "You name groups of discussion responses. Reply with a JSON object \
				{\"name\": string, \"description\": string}. The name has at most six words; \
				the description is one sentence.",
		}),
		serde_json::json!({
			"role": "user",
			"content": format!("Cluster {cluster_index} responses:\n{listing}"),
		}),
	]
}

fn synthesis_messages(cluster_index: i32, texts: &[String]) -> Vec<Value> {
	let listing = numbered(texts);

	vec![
		serde_json::json!({
			"role": "system",
			"content": "You merge near-duplicate discussion responses into one statement that \
				keeps every point they share. Reply with the statement text only.",
		}),
		serde_json::json!({
			"role": "user",
			"content": format!("Cluster {cluster_index} responses:\n{listing}"),
		}),
	]
}

fn numbered(texts: &[String]) -> String {
	texts
		.iter()
		.enumerate()
		.map(|(idx, text)| format!("{}. {}", idx + 1, text.trim()))
		.collect::<Vec<_>>()
		.join("\n")
}

fn message_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::invalid_response("Chat completion is missing message content."))
}

/// Accepts bare JSON or JSON wrapped in a fenced code block.
fn parse_theme_name(content: &str) -> Result<ThemeName> {
	let trimmed = content.trim();
	let unfenced = trimmed
		.strip_prefix("```json")
		.or_else(|| trimmed.strip_prefix("```"))
		.and_then(|rest| rest.trim_end().strip_suffix("```"))
		.unwrap_or(trimmed);
	let theme: ThemeName = serde_json::from_str(unfenced.trim()).map_err(|_| {
		Error::MalformedContent { message: "Theme name content is not valid JSON.".to_string() }
	})?;

	if theme.name.trim().is_empty() {
		return Err(Error::MalformedContent { message: "Theme name is empty.".to_string() });
	}

	Ok(ThemeName {
		name: theme.name.trim().to_string(),
		description: theme.description.trim().to_string(),
	})
}
