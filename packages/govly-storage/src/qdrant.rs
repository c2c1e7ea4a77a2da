use std::time::Duration;

use qdrant_client::qdrant::{CreateCollectionBuilder, Distance, VectorParamsBuilder, VectorsConfigBuilder};
use tokio::time;
use uuid::Uuid;

use crate::Result;

pub const DENSE_VECTOR_NAME: &str = "dense";

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &govly_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection if it does not exist yet.
	///
	/// Retries with backoff since the vector store may still be starting up
	/// when the service boots alongside it.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		let max_attempts = 5;
		let mut backoff = Duration::from_millis(100);
		let mut last_err = None;

		for attempt in 1..=max_attempts {
			let mut vectors_config = VectorsConfigBuilder::default();

			vectors_config.add_named_vector_params(
				DENSE_VECTOR_NAME,
				VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
			);

			let builder = CreateCollectionBuilder::new(self.collection.clone())
				.vectors_config(vectors_config);

			match self.client.create_collection(builder).await {
				Ok(_) => return Ok(()),
				Err(err) => {
					last_err = Some(err);

					if attempt == max_attempts {
						break;
					}

					time::sleep(backoff).await;

					backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
				},
			}
		}

		// `last_err` is always set when the loop falls through.
		match last_err {
			Some(err) => Err(err.into()),
			None => Ok(()),
		}
	}
}

/// Deterministic point id for a chunk, stable across re-indexing runs.
pub fn chunk_point_id(source_id: &str, chunk_index: usize) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{source_id}:{chunk_index}").as_bytes())
}
