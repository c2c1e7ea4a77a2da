//! Source indexing.
//!
//! Chunks a document, embeds only the chunks whose content hash changed since
//! the last run, and upserts them into the vector store under deterministic
//! point ids. Re-running the indexer over an unchanged corpus embeds nothing.

use std::collections::HashMap;

use qdrant_client::{
	Payload,
	qdrant::{DeletePointsBuilder, PointStruct, PointsIdsList, UpsertPointsBuilder, Value, Vector},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use govly_chunking::Chunk;
use govly_domain::{Confidence, FormSchema, fields, query::normalize_country};
use govly_storage::{
	chunks, forms,
	models::FormRecord,
	qdrant::{DENSE_VECTOR_NAME, chunk_point_id},
};

use crate::{GovlyService, ServiceError, ServiceResult};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
	/// A guidance page or legal document.
	Link,
	/// A fillable government form.
	Form,
}
impl SourceKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Link => "link",
			Self::Form => "form",
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct IndexRequest {
	/// Stable identifier of the document, e.g. `vn/decree-01-2021`.
	pub source_id: String,
	pub kind: SourceKind,
	pub country: String,
	#[serde(default)]
	pub agency: String,
	pub title: String,
	pub url: String,
	/// Full extracted text of the document.
	pub text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct IndexSummary {
	pub source_id: String,
	pub total_chunks: usize,
	pub embedded: usize,
	pub skipped: usize,
	pub deleted: usize,
}

impl GovlyService {
	/// Indexes one source document, returning what was actually written.
	pub async fn index_source(&self, request: IndexRequest) -> ServiceResult<IndexSummary> {
		let source_id = request.source_id.trim();

		if source_id.is_empty() {
			return Err(ServiceError::InvalidQuery {
				message: "source_id must not be empty.".to_string(),
			});
		}

		let chunking = &self.cfg.chunking;
		let chunks =
			govly_chunking::chunk(&request.text, chunking.chunk_words, chunking.overlap_words);
		let stored = chunks::fetch_chunk_hashes(&self.db.pool, source_id).await?;
		let stored: HashMap<i32, String> =
			stored.into_iter().map(|row| (row.chunk_index, row.content_hash)).collect();
		let changed: Vec<&Chunk> = chunks
			.iter()
			.filter(|c| stored.get(&(c.index as i32)).is_none_or(|hash| *hash != c.content_hash))
			.collect();
		let skipped = chunks.len() - changed.len();

		self.embed_and_upsert(&request, &changed).await?;

		for chunk in &changed {
			chunks::upsert_chunk_hash(
				&self.db.pool,
				source_id,
				chunk.index as i32,
				&chunk.content_hash,
			)
			.await?;
		}

		let deleted = self.drop_stale_tail(source_id, chunks.len(), &stored).await?;

		if request.kind == SourceKind::Form {
			self.register_form(&request).await?;
		}

		tracing::info!(
			source_id,
			total_chunks = chunks.len(),
			embedded = changed.len(),
			skipped,
			deleted,
			"Source indexed."
		);

		Ok(IndexSummary {
			source_id: source_id.to_string(),
			total_chunks: chunks.len(),
			embedded: changed.len(),
			skipped,
			deleted,
		})
	}

	async fn embed_and_upsert(&self, request: &IndexRequest, changed: &[&Chunk]) -> ServiceResult<()> {
		if changed.is_empty() {
			return Ok(());
		}

		let country = normalize_country(&request.country);
		let agency = if request.agency.trim().is_empty() {
			"none".to_string()
		} else {
			request.agency.trim().to_string()
		};

		// Every batch must embed before anything is written, so a failed
		// embedding call leaves the index exactly as it was instead of half
		// new and half stale.
		let mut points = Vec::with_capacity(changed.len());

		for batch in changed.chunks(self.cfg.chunking.embed_batch) {
			let texts = batch.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
			let vectors = self
				.providers
				.embedding
				.embed(&self.cfg.providers.embedding, &texts)
				.await
				.map_err(|err| ServiceError::Provider {
					stage: "embedding",
					message: err.to_string(),
				})?;

			if vectors.len() != batch.len() {
				return Err(ServiceError::Provider {
					stage: "embedding",
					message: "Embedding provider returned mismatched vector count.".to_string(),
				});
			}

			for (chunk, vector) in batch.iter().zip(vectors) {
				if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
					return Err(ServiceError::Provider {
						stage: "embedding",
						message: "Embedding vector dimension mismatch.".to_string(),
					});
				}

				let mut payload = Payload::new();

				payload.insert("source_id", request.source_id.clone());
				payload.insert("chunk_index", Value::from(chunk.index as i64));
				payload.insert("doc_kind", request.kind.as_str());
				payload.insert("title", request.title.clone());
				payload.insert("url", request.url.clone());
				payload.insert("country", country.clone());
				payload.insert("agency", agency.clone());
				payload.insert("content", chunk.text.clone());
				payload.insert("content_hash", chunk.content_hash.clone());

				let vectors =
					HashMap::from([(DENSE_VECTOR_NAME.to_string(), Vector::from(vector))]);
				let point_id = chunk_point_id(&request.source_id, chunk.index);

				points.push(PointStruct::new(point_id.to_string(), vectors, payload));
			}
		}

		self.qdrant
			.client
			.upsert_points(
				UpsertPointsBuilder::new(self.qdrant.collection.clone(), points).wait(true),
			)
			.await
			.map_err(|err| ServiceError::RetrievalUnavailable { message: err.to_string() })?;

		Ok(())
	}

	/// Removes chunks past the new end of a document that shrank.
	async fn drop_stale_tail(
		&self,
		source_id: &str,
		new_len: usize,
		stored: &HashMap<i32, String>,
	) -> ServiceResult<usize> {
		let stale: Vec<Uuid> = stored
			.keys()
			.filter(|index| **index >= new_len as i32)
			.map(|index| chunk_point_id(source_id, *index as usize))
			.collect();

		if stale.is_empty() {
			return Ok(0);
		}

		let ids = stale.iter().map(|id| id.to_string().into()).collect::<Vec<_>>();

		self.qdrant
			.client
			.delete_points(
				DeletePointsBuilder::new(self.qdrant.collection.clone())
					.points(PointsIdsList { ids })
					.wait(true),
			)
			.await
			.map_err(|err| ServiceError::RetrievalUnavailable { message: err.to_string() })?;
		chunks::delete_chunks_from(&self.db.pool, source_id, new_len as i32).await?;

		Ok(stale.len())
	}

	/// Keeps the relational form record in step with the indexed text and
	/// runs the batch schema pass over it.
	///
	/// Schemas extracted here are the trusted ones: stored at high
	/// confidence so request-time extraction serves them straight from the
	/// cache without touching the OCR service.
	async fn register_form(&self, request: &IndexRequest) -> ServiceResult<()> {
		let form = FormRecord {
			form_id: Uuid::new_v5(&Uuid::NAMESPACE_OID, request.source_id.as_bytes()),
			country: normalize_country(&request.country),
			agency: if request.agency.trim().is_empty() {
				"none".to_string()
			} else {
				request.agency.trim().to_string()
			},
			title: request.title.clone(),
			file_name: file_name_from_url(&request.url),
			url: request.url.clone(),
			raw_text: Some(request.text.clone()),
			schema: None,
			schema_confidence: None,
			schema_stage: None,
			updated_at: time::OffsetDateTime::now_utc(),
		};

		forms::upsert_form(&self.db.pool, &form).await?;

		if let Some(schema) = preprocessed_schema(&request.text) {
			let value = serde_json::to_value(&schema)
				.map_err(|err| ServiceError::Storage { message: err.to_string() })?;
			let written = forms::save_schema(
				&self.db.pool,
				form.form_id,
				&value,
				crate::extract::confidence_str(schema.confidence),
				"preprocessed",
			)
			.await?;

			if written {
				tracing::info!(
					form_id = %form.form_id,
					field_count = schema.fields.len(),
					"Stored preprocessed form schema."
				);
			}
		}

		Ok(())
	}
}

/// Field schema recovered by the batch pass, promoted to high confidence.
fn preprocessed_schema(text: &str) -> Option<FormSchema> {
	let mut schema = fields::infer_fields(text);

	if schema.is_empty() {
		return None;
	}

	schema.confidence = Confidence::High;

	for field in &mut schema.fields {
		field.confidence = Confidence::High;
	}

	Some(schema)
}

fn file_name_from_url(url: &str) -> String {
	url.trim_end_matches('/').rsplit('/').next().unwrap_or(url).split('?').next().unwrap_or(url).to_string()
}
