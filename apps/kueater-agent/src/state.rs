use std::sync::Arc;

use kueater_service::{AgentService, KeywordTable};
use kueater_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<AgentService>,
}
impl AppState {
	pub async fn new(config: kueater_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.storage.embeddings.vector_dim).await?;

		let keywords = KeywordTable::load(&config.keywords.vectors_path)?;

		tracing::info!(keywords = keywords.len(), "Loaded keyword table.");

		let service = AgentService::new(config, db, keywords);

		Ok(Self { service: Arc::new(service) })
	}
}
