use crate::{AgentService, Error, Result};

impl AgentService {
	/// Encodes arbitrary text through the embedding provider. The model is an
	/// opaque collaborator; only the vector dimension is checked here.
	pub async fn embedding(&self, text: &str) -> Result<Vec<f32>> {
		let text = text.trim();

		if text.is_empty() {
			return Err(Error::InvalidRequest {
				message: "Text is empty, nothing to encode.".to_string(),
			});
		}

		let vector = self.providers.embedding.embed(&self.cfg.providers.embedding, text).await?;

		if vector.len() != self.cfg.storage.embeddings.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}
}
