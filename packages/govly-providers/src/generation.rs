use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Sampling knobs for one generation call.
#[derive(Clone, Copy, Debug)]
pub struct GenerationParams {
	pub temperature: f32,
	pub max_tokens: u32,
}

/// Runs one chat completion and returns the assistant text.
pub async fn generate(
	cfg: &govly_config::GenerationProviderConfig,
	system: &str,
	user: &str,
	params: GenerationParams,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"messages": [
			{ "role": "system", "content": system },
			{ "role": "user", "content": user },
		],
		"temperature": params.temperature,
		"max_tokens": params.max_tokens,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_generation_response(json)
}

fn parse_generation_response(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(|v| v.as_str())
		.ok_or_else(|| eyre::eyre!("Generation response is missing message content."))?;
	let content = content.trim();

	if content.is_empty() {
		return Err(eyre::eyre!("Generation response content is empty."));
	}

	Ok(content.to_owned())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_first_choice_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "role": "assistant", "content": "  Use form TK01.  " } }]
		});

		assert_eq!(parse_generation_response(json).unwrap(), "Use form TK01.");
	}

	#[test]
	fn rejects_empty_content() {
		let json = serde_json::json!({ "choices": [{ "message": { "content": "   " } }] });

		assert!(parse_generation_response(json).is_err());
	}

	#[test]
	fn rejects_missing_choices() {
		assert!(parse_generation_response(serde_json::json!({})).is_err());
	}
}
