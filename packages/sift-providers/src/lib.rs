pub mod embedding;
pub mod keyphrase;
pub mod rerank;

use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::{
	Client, RequestBuilder,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header {key} must be a string."));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Builds the shared HTTP client. Timeouts are applied per request from each provider's config.
pub fn http_client() -> Result<Client> {
	Ok(Client::builder().pool_idle_timeout(Duration::from_secs(90)).build()?)
}

pub(crate) struct Endpoint<'a> {
	pub(crate) api_base: &'a str,
	pub(crate) path: &'a str,
	pub(crate) api_key: &'a str,
	pub(crate) timeout_ms: u64,
	pub(crate) default_headers: &'a Map<String, Value>,
}
impl Endpoint<'_> {
	pub(crate) fn post(&self, client: &Client, body: &Value) -> Result<RequestBuilder> {
		Ok(client
			.post(format!("{}{}", self.api_base, self.path))
			.timeout(Duration::from_millis(self.timeout_ms))
			.headers(auth_headers(self.api_key, self.default_headers)?)
			.json(body))
	}
}
impl<'a> From<&'a sift_config::ProviderConfig> for Endpoint<'a> {
	fn from(cfg: &'a sift_config::ProviderConfig) -> Self {
		Self {
			api_base: &cfg.api_base,
			path: &cfg.path,
			api_key: &cfg.api_key,
			timeout_ms: cfg.timeout_ms,
			default_headers: &cfg.default_headers,
		}
	}
}
impl<'a> From<&'a sift_config::EmbeddingProviderConfig> for Endpoint<'a> {
	fn from(cfg: &'a sift_config::EmbeddingProviderConfig) -> Self {
		Self {
			api_base: &cfg.api_base,
			path: &cfg.path,
			api_key: &cfg.api_key,
			timeout_ms: cfg.timeout_ms,
			default_headers: &cfg.default_headers,
		}
	}
}
