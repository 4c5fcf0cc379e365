use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub analysis: Analysis,
	#[serde(default)]
	pub consensus: Consensus,
	#[serde(default)]
	pub worker: Worker,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub clustering: ProviderConfig,
	pub projection: ProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

/// Clustering and 2D projection services. `api_key` may be empty for services on a private network.
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Analysis {
	/// Conversation types that may be analyzed. Everything else is answered with `wrong_type`.
	pub analyzable_types: Vec<String>,
	pub min_responses: u32,
	/// Runs with fewer new responses than this reuse stored centroids.
	pub incremental_threshold: u32,
	pub queued_job_ttl_seconds: i64,
	pub running_job_ttl_seconds: i64,
	pub embedding_batch_size: u32,
	pub theme_sample_size: u32,
	pub similarity_threshold: f32,
	pub min_group_size: u32,
	pub large_cluster_threshold: u32,
}
impl Default for Analysis {
	fn default() -> Self {
		Self {
			analyzable_types: vec!["discussion".to_string()],
			min_responses: 20,
			incremental_threshold: 10,
			queued_job_ttl_seconds: 3_600,
			running_job_ttl_seconds: 1_800,
			embedding_batch_size: 64,
			theme_sample_size: 8,
			similarity_threshold: 0.8,
			min_group_size: 2,
			large_cluster_threshold: 300,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Consensus {
	pub min_votes: u32,
	pub max_per_type: u32,
}
impl Default for Consensus {
	fn default() -> Self {
		Self { min_votes: 5, max_per_type: 5 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub retry: Retry,
}
impl Default for Worker {
	fn default() -> Self {
		Self { poll_interval_ms: 1_000, retry: Retry::default() }
	}
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_attempts: u32,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_attempts: 3, base_backoff_ms: 500, max_backoff_ms: 30_000 }
	}
}
