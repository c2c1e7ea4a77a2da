//! Seed manifest handling.
//!
//! The manifest is a TOML file listing the documents to index. Each source
//! carries its text inline or points at a file resolved relative to the
//! manifest's own directory.

use std::path::{Path, PathBuf};

use color_eyre::{Result, eyre};
use serde::Deserialize;

use govly_service::{IndexRequest, SourceKind};

#[derive(Debug, Deserialize)]
pub struct Manifest {
	#[serde(default)]
	pub sources: Vec<Source>,
}

#[derive(Debug, Deserialize)]
pub struct Source {
	pub source_id: String,
	pub kind: SourceKind,
	pub country: String,
	#[serde(default)]
	pub agency: String,
	pub title: String,
	pub url: String,
	pub text: Option<String>,
	pub path: Option<PathBuf>,
}

pub fn load(path: &Path) -> Result<Manifest> {
	let raw = std::fs::read_to_string(path)
		.map_err(|err| eyre::eyre!("Failed to read manifest {}: {err}", path.display()))?;
	let manifest: Manifest = toml::from_str(&raw)
		.map_err(|err| eyre::eyre!("Failed to parse manifest {}: {err}", path.display()))?;

	if manifest.sources.is_empty() {
		return Err(eyre::eyre!("Manifest {} lists no sources.", path.display()));
	}

	Ok(manifest)
}

/// Resolves one manifest source into an index request.
///
/// Inline text wins, then a file relative to the manifest, then the OCR
/// service is asked to read the document behind the source URL.
pub async fn resolve(
	source: Source,
	manifest_dir: &Path,
	ocr: &govly_config::OcrProviderConfig,
) -> Result<IndexRequest> {
	let text = match (source.text, source.path) {
		(Some(text), _) => text,
		(None, Some(path)) => {
			let full = if path.is_absolute() { path } else { manifest_dir.join(path) };

			tokio::fs::read_to_string(&full)
				.await
				.map_err(|err| eyre::eyre!("Failed to read {}: {err}", full.display()))?
		},
		(None, None) if source.url.trim().is_empty() =>
			return Err(eyre::eyre!(
				"Source {} has neither text, path, nor url.",
				source.source_id
			)),
		(None, None) => govly_providers::ocr::recognize(ocr, &source.url)
			.await
			.map_err(|err| eyre::eyre!("OCR for {} failed: {err}", source.source_id))?,
	};

	Ok(IndexRequest {
		source_id: source.source_id,
		kind: source.kind,
		country: source.country,
		agency: source.agency,
		title: source.title,
		url: source.url,
		text,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_minimal_manifest() {
		let manifest: Manifest = toml::from_str(
			r#"
[[sources]]
source_id = "vn/decree-01"
kind      = "link"
country   = "vietnam"
title     = "Decree 01"
url       = "https://example.gov/decree-01"
text      = "inline text"
"#,
		)
		.unwrap();

		assert_eq!(manifest.sources.len(), 1);
		assert_eq!(manifest.sources[0].kind, SourceKind::Link);
		assert!(manifest.sources[0].path.is_none());
	}

	fn ocr_config() -> govly_config::OcrProviderConfig {
		govly_config::OcrProviderConfig {
			provider_id: "ocr-http".into(),
			api_base: "http://127.0.0.1:1".into(),
			api_key: "test-key".into(),
			path: "/v1/extract_text".into(),
			timeout_ms: 100,
			default_headers: Default::default(),
		}
	}

	#[tokio::test]
	async fn resolve_requires_text_path_or_url() {
		let source = Source {
			source_id: "vn/x".into(),
			kind: SourceKind::Form,
			country: "vn".into(),
			agency: String::new(),
			title: "X".into(),
			url: String::new(),
			text: None,
			path: None,
		};

		assert!(resolve(source, Path::new("."), &ocr_config()).await.is_err());
	}

	#[tokio::test]
	async fn inline_text_skips_the_ocr_service() {
		let source = Source {
			source_id: "vn/x".into(),
			kind: SourceKind::Form,
			country: "vn".into(),
			agency: String::new(),
			title: "X".into(),
			url: "https://example.gov/x.pdf".into(),
			text: Some("inline text".into()),
			path: None,
		};
		let request = resolve(source, Path::new("."), &ocr_config()).await.unwrap();

		assert_eq!(request.text, "inline text");
	}
}
