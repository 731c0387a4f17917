use std::sync::Arc;

use color_eyre::eyre;

use sift_config::{Backend, Config};
use sift_service::{Indexes, Providers, SiftService};
use sift_storage::{db::Db, pg::PgIndex, qdrant::QdrantStore};

pub struct AppState {
	pub service: Arc<SiftService>,
}
impl AppState {
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let metric = config.storage.metric;
		let indexes = match config.storage.backend {
			Backend::Postgres => {
				let postgres = config
					.storage
					.postgres
					.as_ref()
					.ok_or_else(|| eyre::eyre!("storage.postgres is required."))?;
				let db = Db::connect(postgres).await?;

				Indexes::shared(Arc::new(PgIndex::new(db.pool, postgres, metric)?))
			},
			Backend::Qdrant => {
				let qdrant = config
					.storage
					.qdrant
					.as_ref()
					.ok_or_else(|| eyre::eyre!("storage.qdrant is required."))?;

				Indexes::shared(Arc::new(QdrantStore::new(qdrant, metric)?))
			},
		};
		let providers = Providers::http(sift_providers::http_client()?);

		tracing::info!(backend = ?config.storage.backend, ?metric, "Retrieval service ready.");

		Ok(Self { service: Arc::new(SiftService::new(config, providers, indexes)) })
	}
}
