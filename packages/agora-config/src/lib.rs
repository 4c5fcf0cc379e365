mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Analysis, Config, Consensus, EmbeddingProviderConfig, LlmProviderConfig, Postgres,
	ProviderConfig, Providers, Retry, Service, Storage, Worker,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("llm", &cfg.providers.llm.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	validate_analysis(cfg)?;

	if cfg.consensus.min_votes == 0 {
		return Err(Error::Validation {
			message: "consensus.min_votes must be greater than zero.".to_string(),
		});
	}
	if cfg.consensus.max_per_type == 0 {
		return Err(Error::Validation {
			message: "consensus.max_per_type must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.retry.max_attempts == 0 {
		return Err(Error::Validation {
			message: "worker.retry.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.retry.base_backoff_ms > cfg.worker.retry.max_backoff_ms {
		return Err(Error::Validation {
			message: "worker.retry.base_backoff_ms must not exceed worker.retry.max_backoff_ms."
				.to_string(),
		});
	}

	Ok(())
}

fn validate_analysis(cfg: &Config) -> Result<()> {
	let analysis = &cfg.analysis;

	if analysis.analyzable_types.is_empty() {
		return Err(Error::Validation {
			message: "analysis.analyzable_types must be non-empty.".to_string(),
		});
	}
	if analysis.min_responses == 0 {
		return Err(Error::Validation {
			message: "analysis.min_responses must be greater than zero.".to_string(),
		});
	}
	if analysis.queued_job_ttl_seconds <= 0 || analysis.running_job_ttl_seconds <= 0 {
		return Err(Error::Validation {
			message: "analysis job TTLs must be greater than zero.".to_string(),
		});
	}
	if analysis.embedding_batch_size == 0 {
		return Err(Error::Validation {
			message: "analysis.embedding_batch_size must be greater than zero.".to_string(),
		});
	}
	if analysis.theme_sample_size == 0 {
		return Err(Error::Validation {
			message: "analysis.theme_sample_size must be greater than zero.".to_string(),
		});
	}
	if !analysis.similarity_threshold.is_finite() {
		return Err(Error::Validation {
			message: "analysis.similarity_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&analysis.similarity_threshold) {
		return Err(Error::Validation {
			message: "analysis.similarity_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if analysis.min_group_size < 2 {
		return Err(Error::Validation {
			message: "analysis.min_group_size must be at least 2.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.analysis.analyzable_types = cfg
		.analysis
		.analyzable_types
		.iter()
		.map(|kind| kind.trim().to_ascii_lowercase())
		.filter(|kind| !kind.is_empty())
		.collect();

	for provider in [&mut cfg.providers.clustering, &mut cfg.providers.projection] {
		provider.api_key = provider.api_key.trim().to_string();
	}
}
