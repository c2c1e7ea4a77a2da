//! Service orchestration.
//!
//! Ties retrieval, response composition, schema extraction, autofill, and
//! indexing together on top of the storage and provider layers. Providers are
//! trait objects so tests can swap in deterministic fakes.

pub mod autofill;
pub mod extract;
pub mod ingest;
pub mod respond;
pub mod retrieve;
#[cfg(test)]
mod testkit;

use std::{future::Future, pin::Pin, sync::Arc};

pub use autofill::AutofillBlock;
pub use extract::{ExtractionOutcome, SchemaRequest};
pub use ingest::{IndexRequest, IndexSummary, SourceKind};
pub use retrieve::{QueryRequest, QueryResponse};

use govly_config::{Config, EmbeddingProviderConfig, GenerationProviderConfig, OcrProviderConfig};
use govly_providers::{embedding, generation, generation::GenerationParams, ocr};
use govly_storage::{db::Db, qdrant::QdrantStore};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		system: &'a str,
		user: &'a str,
		params: GenerationParams,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait OcrProvider
where
	Self: Send + Sync,
{
	fn recognize<'a>(
		&'a self,
		cfg: &'a OcrProviderConfig,
		document_url: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidQuery { message: String },
	NotFound { message: String },
	Provider { stage: &'static str, message: String },
	GenerationFailed { message: String },
	Storage { message: String },
	/// The vector store is unreachable; never degraded to empty results.
	RetrievalUnavailable { message: String },
	Cancelled,
}
impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidQuery { message } => write!(f, "Invalid query: {message}"),
			Self::NotFound { message } => write!(f, "Not found: {message}"),
			Self::Provider { stage, message } => write!(f, "Provider error at {stage}: {message}"),
			Self::GenerationFailed { message } => write!(f, "Generation failed: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
			Self::RetrievalUnavailable { message } => write!(f, "Retrieval unavailable: {message}"),
			Self::Cancelled => write!(f, "Request was cancelled."),
		}
	}
}
impl std::error::Error for ServiceError {}

impl From<sqlx::Error> for ServiceError {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<govly_storage::Error> for ServiceError {
	fn from(err: govly_storage::Error) -> Self {
		match err {
			govly_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			govly_storage::Error::SerdeJson(inner) => Self::Storage { message: inner.to_string() },
			govly_storage::Error::InvalidArgument(message) => Self::InvalidQuery { message },
			govly_storage::Error::NotFound(message) => Self::NotFound { message },
			govly_storage::Error::Qdrant(inner) =>
				Self::RetrievalUnavailable { message: inner.to_string() },
		}
	}
}
impl From<govly_domain::Rejection> for ServiceError {
	fn from(rejection: govly_domain::Rejection) -> Self {
		Self::InvalidQuery { message: rejection.to_string() }
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
	pub ocr: Arc<dyn OcrProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		generation: Arc<dyn GenerationProvider>,
		ocr: Arc<dyn OcrProvider>,
	) -> Self {
		Self { embedding, generation, ocr }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generation: provider.clone(), ocr: provider }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		system: &'a str,
		user: &'a str,
		params: GenerationParams,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(generation::generate(cfg, system, user, params))
	}
}
impl OcrProvider for DefaultProviders {
	fn recognize<'a>(
		&'a self,
		cfg: &'a OcrProviderConfig,
		document_url: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(ocr::recognize(cfg, document_url))
	}
}

pub struct GovlyService {
	pub cfg: Config,
	pub db: Db,
	pub qdrant: QdrantStore,
	pub providers: Providers,
}
impl GovlyService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self { cfg, db, qdrant, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, qdrant: QdrantStore, providers: Providers) -> Self {
		Self { cfg, db, qdrant, providers }
	}

	pub(crate) async fn embed_single_query(&self, query: &str) -> ServiceResult<Vec<f32>> {
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, std::slice::from_ref(&query.to_string()))
			.await
			.map_err(|err| ServiceError::Provider { stage: "embedding", message: err.to_string() })?;
		let query_vec =
			embeddings.into_iter().next().ok_or_else(|| ServiceError::Provider {
				stage: "embedding",
				message: "Embedding provider returned no vectors.".to_string(),
			})?;

		if query_vec.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(ServiceError::Provider {
				stage: "embedding",
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(query_vec)
	}
}
