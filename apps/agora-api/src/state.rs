use std::sync::Arc;

use agora_service::AgoraService;
use agora_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<AgoraService>,
}
impl AppState {
	pub async fn new(config: agora_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.providers.embedding.dimensions).await?;

		Ok(Self::from_service(AgoraService::new(config, db)))
	}

	pub fn from_service(service: AgoraService) -> Self {
		Self { service: Arc::new(service) }
	}
}
