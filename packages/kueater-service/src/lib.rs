pub mod keywords;

mod embed;
mod error;
mod recommend;

pub use error::{Error, Result};
pub use keywords::KeywordTable;

use std::{future::Future, pin::Pin, sync::Arc};

use rand::Rng;

use kueater_config::{Config, EmbeddingProviderConfig};
use kueater_domain::ReasonPicker;
use kueater_providers::embedding;
use kueater_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(embedding::embed(cfg, text))
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}

impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

/// Uniform random pick among qualifying keywords, for display variety.
pub struct RandomPicker;
impl ReasonPicker for RandomPicker {
	fn pick(&mut self, keywords: &[&str]) -> usize {
		if keywords.len() <= 1 {
			return 0;
		}

		rand::rng().random_range(0..keywords.len())
	}
}

pub struct AgentService {
	pub cfg: Config,
	pub db: Db,
	pub keywords: KeywordTable,
	pub providers: Providers,
}
impl AgentService {
	pub fn new(cfg: Config, db: Db, keywords: KeywordTable) -> Self {
		Self { cfg, db, keywords, providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		db: Db,
		keywords: KeywordTable,
		providers: Providers,
	) -> Self {
		Self { cfg, db, keywords, providers }
	}
}

pub(crate) fn parse_pg_vector(text: &str) -> Result<Vec<f32>> {
	let trimmed = text.trim();
	let without_brackets =
		trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')).ok_or_else(|| {
			Error::DataIntegrity { message: "Stored vector text is not bracketed.".to_string() }
		})?;

	if without_brackets.trim().is_empty() {
		return Ok(Vec::new());
	}

	let mut vec = Vec::new();

	for part in without_brackets.split(',') {
		let value: f32 = part.trim().parse().map_err(|_| Error::DataIntegrity {
			message: "Stored vector text contains a non-numeric value.".to_string(),
		})?;
		vec.push(value);
	}

	Ok(vec)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_pg_vector_text() {
		let vec = parse_pg_vector("[0.5, -1.25, 3]").expect("parse failed");

		assert_eq!(vec, vec![0.5, -1.25, 3.0]);
	}

	#[test]
	fn rejects_unbracketed_vector_text() {
		assert!(parse_pg_vector("0.5, 1.0").is_err());
	}

	#[test]
	fn rejects_non_numeric_vector_text() {
		assert!(parse_pg_vector("[0.5, oops]").is_err());
	}

	#[test]
	fn empty_brackets_parse_to_empty_vector() {
		assert!(parse_pg_vector("[]").expect("parse failed").is_empty());
	}
}
