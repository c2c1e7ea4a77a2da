mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	CategoryRule, Chunking, Composer, Config, EmbeddingProviderConfig, Extraction,
	GenerationProviderConfig, Indexer, OcrProviderConfig, Postgres, Providers, Qdrant, Retrieval,
	Service, Storage,
};

use std::{fs, path::Path};

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
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.chunking.chunk_words == 0 {
		return Err(Error::Validation {
			message: "chunking.chunk_words must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.overlap_words >= cfg.chunking.chunk_words {
		return Err(Error::Validation {
			message: "chunking.overlap_words must be less than chunking.chunk_words.".to_string(),
		});
	}
	if cfg.chunking.embed_batch == 0 {
		return Err(Error::Validation {
			message: "chunking.embed_batch must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.candidate_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.candidate_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.max_options == 0 {
		return Err(Error::Validation {
			message: "retrieval.max_options must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.candidate_k < cfg.retrieval.max_options as u32 {
		return Err(Error::Validation {
			message: "retrieval.candidate_k must be at least retrieval.max_options.".to_string(),
		});
	}
	if !cfg.retrieval.duplicate_epsilon.is_finite() || cfg.retrieval.duplicate_epsilon <= 0.0 {
		return Err(Error::Validation {
			message: "retrieval.duplicate_epsilon must be a finite number greater than zero."
				.to_string(),
		});
	}
	if cfg.retrieval.min_query_chars == 0 {
		return Err(Error::Validation {
			message: "retrieval.min_query_chars must be greater than zero.".to_string(),
		});
	}

	for rule in &cfg.retrieval.categories {
		if rule.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "retrieval.categories entries must have a non-empty name.".to_string(),
			});
		}
		if rule.query_keywords.is_empty() || rule.candidate_keywords.is_empty() {
			return Err(Error::Validation {
				message: format!(
					"Category rule {} must have query_keywords and candidate_keywords.",
					rule.name
				),
			});
		}
	}

	if !cfg.composer.temperature.is_finite() || cfg.composer.temperature < 0.0 {
		return Err(Error::Validation {
			message: "composer.temperature must be zero or greater.".to_string(),
		});
	}
	if cfg.composer.max_tokens == 0 {
		return Err(Error::Validation {
			message: "composer.max_tokens must be greater than zero.".to_string(),
		});
	}

	for (label, sentences) in [
		("composer.single_max_sentences", cfg.composer.single_max_sentences),
		("composer.multi_max_sentences", cfg.composer.multi_max_sentences),
		("composer.explain_max_sentences", cfg.composer.explain_max_sentences),
	] {
		if sentences == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	for (label, timeout) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.generation.timeout_ms", cfg.providers.generation.timeout_ms),
		("providers.ocr.timeout_ms", cfg.providers.ocr.timeout_ms),
		("extraction.lookup_timeout_ms", cfg.extraction.lookup_timeout_ms),
		("extraction.ocr_timeout_ms", cfg.extraction.ocr_timeout_ms),
	] {
		if timeout == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("generation", &cfg.providers.generation.api_key),
		("ocr", &cfg.providers.ocr.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.indexer.concurrency == 0 {
		return Err(Error::Validation {
			message: "indexer.concurrency must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for rule in &mut cfg.retrieval.categories {
		rule.name = rule.name.trim().to_lowercase();

		for keyword in rule.query_keywords.iter_mut().chain(rule.candidate_keywords.iter_mut()) {
			*keyword = keyword.trim().to_lowercase();
		}

		rule.query_keywords.retain(|keyword| !keyword.is_empty());
		rule.candidate_keywords.retain(|keyword| !keyword.is_empty());
	}
}
