mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Backend, Batch, Config, EmbeddingProviderConfig, Metric, Postgres, ProviderConfig, Providers,
	Qdrant, Retrieval, Service, Storage,
};

use std::{fs, path::Path};

/// Hard ceiling for `retrieval.keyphrase_top_n`. Keeps lexical queries cheap.
pub const MAX_KEYPHRASE_TOP_N: u32 = 10;
/// Session settings that control how many partitions an approximate vector scan visits.
pub const PROBE_SETTINGS: [&str; 2] = ["vchordrq.probes", "ivfflat.probes"];

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
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.vector_dim.".to_string(),
		});
	}

	match cfg.storage.backend {
		Backend::Postgres => {
			let Some(postgres) = cfg.storage.postgres.as_ref() else {
				return Err(Error::Validation {
					message: "storage.postgres is required when storage.backend is postgres."
						.to_string(),
				});
			};

			validate_postgres(postgres)?;
		},
		Backend::Qdrant => {
			let Some(qdrant) = cfg.storage.qdrant.as_ref() else {
				return Err(Error::Validation {
					message: "storage.qdrant is required when storage.backend is qdrant."
						.to_string(),
				});
			};

			validate_qdrant(qdrant)?;
		},
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("keyphrase", &cfg.providers.keyphrase.api_key),
		("rerank", &cfg.providers.rerank.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, timeout_ms) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("keyphrase", cfg.providers.keyphrase.timeout_ms),
		("rerank", cfg.providers.rerank.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if !(1..=MAX_KEYPHRASE_TOP_N).contains(&cfg.retrieval.keyphrase_top_n) {
		return Err(Error::Validation {
			message: format!(
				"retrieval.keyphrase_top_n must be in the range 1-{MAX_KEYPHRASE_TOP_N}."
			),
		});
	}
	if cfg.retrieval.stage_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.stage_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.batch.top_k_per_query == 0 {
		return Err(Error::Validation {
			message: "batch.top_k_per_query must be greater than zero.".to_string(),
		});
	}
	if cfg.batch.candidate_limit_per_query < cfg.batch.top_k_per_query {
		return Err(Error::Validation {
			message: "batch.candidate_limit_per_query must be at least batch.top_k_per_query."
				.to_string(),
		});
	}
	if cfg.batch.probe == Some(0) {
		return Err(Error::Validation {
			message: "batch.probe must be greater than zero when set.".to_string(),
		});
	}

	Ok(())
}

/// Accepts `name` or `schema.name` where each part is a plain, unquoted SQL identifier.
pub fn is_sql_identifier(value: &str) -> bool {
	let parts: Vec<&str> = value.split('.').collect();

	if parts.len() > 2 {
		return false;
	}

	parts.iter().all(|part| {
		let mut chars = part.chars();

		match chars.next() {
			Some(first) if first.is_ascii_alphabetic() || first == '_' =>
				chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
			_ => false,
		}
	})
}

fn validate_postgres(postgres: &Postgres) -> Result<()> {
	if postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("storage.postgres.table", &postgres.table),
		("storage.postgres.id_column", &postgres.id_column),
		("storage.postgres.content_column", &postgres.content_column),
		("storage.postgres.embedding_column", &postgres.embedding_column),
	] {
		if !is_sql_identifier(value) {
			return Err(Error::Validation {
				message: format!("{label} must be a plain SQL identifier."),
			});
		}
	}

	if postgres.language.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.language must be non-empty.".to_string(),
		});
	}
	if postgres.partitions == Some(0) {
		return Err(Error::Validation {
			message: "storage.postgres.partitions must be greater than zero when set.".to_string(),
		});
	}
	if !PROBE_SETTINGS.contains(&postgres.probe_setting.as_str()) {
		return Err(Error::Validation {
			message: format!(
				"storage.postgres.probe_setting must be one of {}.",
				PROBE_SETTINGS.join(", ")
			),
		});
	}

	Ok(())
}

fn validate_qdrant(qdrant: &Qdrant) -> Result<()> {
	for (label, value) in [
		("storage.qdrant.url", &qdrant.url),
		("storage.qdrant.collection", &qdrant.collection),
		("storage.qdrant.dense_vector", &qdrant.dense_vector),
		("storage.qdrant.bm25_vector", &qdrant.bm25_vector),
		("storage.qdrant.content_field", &qdrant.content_field),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	// Endpoints are joined as `{api_base}{path}`.
	for api_base in [
		&mut cfg.providers.embedding.api_base,
		&mut cfg.providers.keyphrase.api_base,
		&mut cfg.providers.rerank.api_base,
	] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	if let Some(postgres) = cfg.storage.postgres.as_mut() {
		postgres.probe_setting = postgres.probe_setting.trim().to_ascii_lowercase();
	}
}
