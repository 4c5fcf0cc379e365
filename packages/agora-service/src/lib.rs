pub mod consensus;
pub mod consolidation;
pub mod full_analysis;
pub mod incremental;
pub mod progress;
pub mod retry;
pub mod runner;
pub mod scheduler;

mod embedding;
mod error;

pub use agora_providers::llm::ThemeName;
pub use error::{Error, Result};
pub use progress::{BroadcastProgress, ProgressEvent, ProgressPublisher, PublishError};
pub use runner::{AnalysisSummary, RunReport};
pub use scheduler::{ClaimOutcome, TriggerRequest, TriggerResponse};

use std::{future::Future, pin::Pin, sync::Arc};

use uuid::Uuid;

use agora_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use agora_providers::{clustering, embedding as embedding_client, llm, projection};
use agora_storage::{conversations, db::Db, members, models::Conversation};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ProviderResult<T> = agora_providers::Result<T>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	/// One vector per text, in input order.
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ProviderResult<Vec<Vec<f32>>>>;
}

pub trait ClusteringProvider
where
	Self: Send + Sync,
{
	fn cluster<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		vectors: &'a [Vec<f32>],
	) -> BoxFuture<'a, ProviderResult<Vec<i32>>>;
}

pub trait ProjectionProvider
where
	Self: Send + Sync,
{
	fn project_2d<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		vectors: &'a [Vec<f32>],
	) -> BoxFuture<'a, ProviderResult<Vec<(f32, f32)>>>;
}

pub trait ThemeNamingProvider
where
	Self: Send + Sync,
{
	fn name_theme<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		cluster_index: i32,
		samples: &'a [String],
	) -> BoxFuture<'a, ProviderResult<ThemeName>>;
}

pub trait SynthesisProvider
where
	Self: Send + Sync,
{
	fn synthesize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		cluster_index: i32,
		texts: &'a [String],
	) -> BoxFuture<'a, ProviderResult<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub clustering: Arc<dyn ClusteringProvider>,
	pub projection: Arc<dyn ProjectionProvider>,
	pub theme_naming: Arc<dyn ThemeNamingProvider>,
	pub synthesis: Arc<dyn SynthesisProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		clustering: Arc<dyn ClusteringProvider>,
		projection: Arc<dyn ProjectionProvider>,
		theme_naming: Arc<dyn ThemeNamingProvider>,
		synthesis: Arc<dyn SynthesisProvider>,
	) -> Self {
		Self { embedding, clustering, projection, theme_naming, synthesis }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			embedding: provider.clone(),
			clustering: provider.clone(),
			projection: provider.clone(),
			theme_naming: provider.clone(),
			synthesis: provider,
		}
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ProviderResult<Vec<Vec<f32>>>> {
		Box::pin(embedding_client::embed(cfg, texts))
	}
}
impl ClusteringProvider for DefaultProviders {
	fn cluster<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		vectors: &'a [Vec<f32>],
	) -> BoxFuture<'a, ProviderResult<Vec<i32>>> {
		Box::pin(clustering::cluster(cfg, vectors))
	}
}
impl ProjectionProvider for DefaultProviders {
	fn project_2d<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		vectors: &'a [Vec<f32>],
	) -> BoxFuture<'a, ProviderResult<Vec<(f32, f32)>>> {
		Box::pin(projection::project_2d(cfg, vectors))
	}
}
impl ThemeNamingProvider for DefaultProviders {
	fn name_theme<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		cluster_index: i32,
		samples: &'a [String],
	) -> BoxFuture<'a, ProviderResult<ThemeName>> {
		Box::pin(llm::name_theme(cfg, cluster_index, samples))
	}
}
impl SynthesisProvider for DefaultProviders {
	fn synthesize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		cluster_index: i32,
		texts: &'a [String],
	) -> BoxFuture<'a, ProviderResult<String>> {
		Box::pin(llm::synthesize(cfg, cluster_index, texts))
	}
}

/// Everything a job or request needs, passed explicitly to each stage.
pub struct AgoraService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
	pub progress: Arc<dyn ProgressPublisher>,
}
impl AgoraService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_providers(cfg, db, Providers::default(), Arc::new(BroadcastProgress::default()))
	}

	pub fn with_providers(
		cfg: Config,
		db: Db,
		providers: Providers,
		progress: Arc<dyn ProgressPublisher>,
	) -> Self {
		Self { cfg, db, providers, progress }
	}

	/// Loads the conversation and checks that `user_id` belongs to it.
	pub(crate) async fn authorize(
		&self,
		conversation_id: Uuid,
		user_id: &str,
	) -> Result<Conversation> {
		let conversation = conversations::get_conversation(&self.db.pool, conversation_id)
			.await?
			.ok_or_else(|| Error::NotFound {
				message: format!("Conversation {conversation_id} does not exist."),
			})?;

		if !members::is_member(&self.db.pool, conversation_id, user_id).await? {
			return Err(Error::Unauthorized {
				message: format!("User is not a member of conversation {conversation_id}."),
			});
		}

		Ok(conversation)
	}

	/// API keys a provider error may echo back.
	pub(crate) fn provider_keys(&self) -> [&str; 4] {
		let providers = &self.cfg.providers;

		[
			providers.embedding.api_key.as_str(),
			providers.clustering.api_key.as_str(),
			providers.projection.api_key.as_str(),
			providers.llm.api_key.as_str(),
		]
	}
}

pub(crate) fn embedding_version(cfg: &Config) -> String {
	format!(
		"{}:{}:{}",
		cfg.providers.embedding.provider_id,
		cfg.providers.embedding.model,
		cfg.providers.embedding.dimensions
	)
}

pub(crate) fn to_i32(value: usize, label: &str) -> Result<i32> {
	i32::try_from(value)
		.map_err(|_| Error::InvalidRequest { message: format!("{label} does not fit in i32.") })
}
