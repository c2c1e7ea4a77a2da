use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub chunking: Chunking,
	pub retrieval: Retrieval,
	pub composer: Composer,
	pub extraction: Extraction,
	pub indexer: Indexer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub generation: GenerationProviderConfig,
	pub ocr: OcrProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chunking {
	pub chunk_words: usize,
	pub overlap_words: usize,
	pub embed_batch: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Retrieval {
	pub candidate_k: u32,
	pub duplicate_epsilon: f32,
	pub max_options: usize,
	pub min_query_chars: usize,
	#[serde(default)]
	pub categories: Vec<CategoryRule>,
}

/// A query-aware restriction rule. When the lowercased query contains one of
/// `query_keywords`, candidates are narrowed to those whose title or content
/// contains one of `candidate_keywords`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
	pub name: String,
	pub query_keywords: Vec<String>,
	pub candidate_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Composer {
	pub temperature: f32,
	pub max_tokens: u32,
	pub single_max_sentences: usize,
	pub multi_max_sentences: usize,
	pub explain_max_sentences: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Extraction {
	pub lookup_timeout_ms: u64,
	pub ocr_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indexer {
	pub concurrency: usize,
}
