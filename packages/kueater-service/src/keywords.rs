use std::{collections::HashMap, fs, path::Path};

use crate::{Error, Result};

/// The offline-generated keyword affinity table: one embedding vector per
/// keyword in the fixed vocabulary. Loaded once at startup and shared
/// read-only across scoring runs.
#[derive(Debug, Default)]
pub struct KeywordTable {
	vectors: HashMap<String, Vec<f32>>,
}
impl KeywordTable {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path).map_err(|err| Error::KeywordTable {
			message: format!("Failed to read keyword table at {path:?}: {err}."),
		})?;

		Self::from_json_str(&raw)
	}

	pub fn from_json_str(raw: &str) -> Result<Self> {
		let vectors: HashMap<String, Vec<f32>> =
			serde_json::from_str(raw).map_err(|err| Error::KeywordTable {
				message: format!("Keyword table is not a map of keyword to vector: {err}."),
			})?;

		Ok(Self { vectors })
	}

	pub fn from_vectors(vectors: HashMap<String, Vec<f32>>) -> Self {
		Self { vectors }
	}

	pub fn get(&self, keyword: &str) -> Option<&[f32]> {
		self.vectors.get(keyword).map(Vec::as_slice)
	}

	pub fn len(&self) -> usize {
		self.vectors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vectors.is_empty()
	}
}
