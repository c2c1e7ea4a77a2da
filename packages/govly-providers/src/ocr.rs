use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Asks the OCR sidecar to fetch a document and return its recognized text.
pub async fn recognize(cfg: &govly_config::OcrProviderConfig, document_url: &str) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "document_url": document_url });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_ocr_response(json)
}

fn parse_ocr_response(json: Value) -> Result<String> {
	let text = json
		.get("text")
		.or_else(|| json.get("content"))
		.and_then(|v| v.as_str())
		.ok_or_else(|| eyre::eyre!("OCR response is missing text."))?;

	Ok(text.to_owned())
}
