//! Form schema extraction chain.
//!
//! Stages run in fixed order: the cached schema, then OCR text recovery, then
//! a diagnostic placeholder. A stage failure moves to the next stage instead
//! of failing the request, so the outcome is always a schema plus the stage
//! that produced it. Recovered schemas are cached subject to the confidence
//! no-downgrade rule in storage.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use uuid::Uuid;

use govly_domain::{ExtractionStage, FormSchema, fields};
use govly_storage::{forms, models::FormRecord};

use crate::{AutofillBlock, GovlyService, ServiceError, ServiceResult};

/// Probe checked between stages so a caller can abandon a slow extraction.
pub type CancelProbe<'a> = &'a (dyn Fn() -> bool + Send + Sync);

#[derive(Clone, Debug, Deserialize)]
pub struct SchemaRequest {
	/// Form id or a file name tail, e.g. `don-dang-ky.pdf`.
	pub form_ref: String,
	/// Profile to draw autofill suggestions from.
	#[serde(default)]
	pub user_id: Option<String>,
	/// Drops the cached schema and re-extracts from scratch.
	#[serde(default)]
	pub refresh: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExtractionOutcome {
	pub form_id: Uuid,
	pub title: String,
	pub schema: FormSchema,
	pub confidence: govly_domain::Confidence,
	pub extraction_stage: ExtractionStage,
	pub autofill: Option<AutofillBlock>,
}

impl GovlyService {
	/// Resolves a form and extracts its field schema.
	pub async fn extract_schema(
		&self,
		request: SchemaRequest,
		cancelled: CancelProbe<'_>,
	) -> ServiceResult<ExtractionOutcome> {
		let reference = request.form_ref.trim();

		if reference.is_empty() {
			return Err(ServiceError::InvalidQuery {
				message: "Form reference must not be empty.".to_string(),
			});
		}

		let lookup = Duration::from_millis(self.cfg.extraction.lookup_timeout_ms);
		let form = timeout(lookup, forms::find_form(&self.db.pool, reference))
			.await
			.map_err(|_| ServiceError::Storage {
				message: "Form lookup timed out.".to_string(),
			})??
			.ok_or_else(|| ServiceError::NotFound {
				message: format!("No form matches \"{reference}\"."),
			})?;

		if request.refresh {
			forms::invalidate_schema(&self.db.pool, form.form_id).await?;
		}

		let (schema, extraction_stage) = self.run_stages(&form, request.refresh, cancelled).await?;
		let autofill = match &request.user_id {
			Some(user_id) => self.autofill_for(user_id, &schema).await?,
			None => None,
		};

		Ok(ExtractionOutcome {
			form_id: form.form_id,
			title: form.title.clone(),
			confidence: schema.confidence,
			schema,
			extraction_stage,
			autofill,
		})
	}

	async fn run_stages(
		&self,
		form: &FormRecord,
		skip_cache: bool,
		cancelled: CancelProbe<'_>,
	) -> ServiceResult<(FormSchema, ExtractionStage)> {
		if !skip_cache && let Some(schema) = cached_schema(form) {
			return Ok((schema, ExtractionStage::Cached));
		}
		if cancelled() {
			return Err(ServiceError::Cancelled);
		}
		match self.ocr_schema(form).await {
			Ok(Some(schema)) => {
				self.cache_schema(form.form_id, &schema).await;

				return Ok((schema, ExtractionStage::Ocr));
			},
			Ok(None) => {
				tracing::info!(form_id = %form.form_id, "OCR text yielded no fields.");
			},
			Err(err) => {
				tracing::warn!(form_id = %form.form_id, error = %err, "OCR stage failed.");
			},
		}
		if cancelled() {
			return Err(ServiceError::Cancelled);
		}

		let schema = fields::diagnostic_schema(
			"No fields could be recovered from this document. It may be scanned at too low a \
			 quality or not be a fillable form.",
		);

		Ok((schema, ExtractionStage::Diagnostic))
	}

	async fn ocr_schema(&self, form: &FormRecord) -> color_eyre::Result<Option<FormSchema>> {
		let text = match &form.raw_text {
			Some(text) if !text.trim().is_empty() => text.clone(),
			_ => {
				let ocr = Duration::from_millis(self.cfg.extraction.ocr_timeout_ms);

				timeout(ocr, self.providers.ocr.recognize(&self.cfg.providers.ocr, &form.url))
					.await
					.map_err(|_| color_eyre::eyre::eyre!("OCR timed out."))??
			},
		};
		let schema = fields::infer_fields(&text);

		if schema.is_empty() { Ok(None) } else { Ok(Some(schema)) }
	}

	/// Best effort: a cache write failure is logged, not surfaced.
	async fn cache_schema(&self, form_id: Uuid, schema: &FormSchema) {
		let value = match serde_json::to_value(schema) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(form_id = %form_id, error = %err, "Schema serialization failed.");

				return;
			},
		};
		let result = forms::save_schema(
			&self.db.pool,
			form_id,
			&value,
			confidence_str(schema.confidence),
			"ocr",
		)
		.await;

		match result {
			Ok(true) => {},
			Ok(false) => {
				tracing::info!(form_id = %form_id, "Kept existing higher-confidence schema.");
			},
			Err(err) => {
				tracing::warn!(form_id = %form_id, error = %err, "Schema cache write failed.");
			},
		}
	}
}

fn cached_schema(form: &FormRecord) -> Option<FormSchema> {
	let value = form.schema.clone()?;

	match serde_json::from_value::<FormSchema>(value) {
		Ok(schema) if !schema.is_empty() => Some(schema),
		Ok(_) => None,
		Err(err) => {
			tracing::warn!(form_id = %form.form_id, error = %err, "Cached schema is unreadable.");

			None
		},
	}
}

pub(crate) fn confidence_str(confidence: govly_domain::Confidence) -> &'static str {
	match confidence {
		govly_domain::Confidence::High => "high",
		govly_domain::Confidence::Medium => "medium",
		govly_domain::Confidence::Low => "low",
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	};

	use time::OffsetDateTime;

	use crate::{BoxFuture, OcrProvider, Providers, testkit};

	use super::*;

	struct TrackingOcr {
		calls: Arc<AtomicUsize>,
		text: Option<&'static str>,
	}
	impl OcrProvider for TrackingOcr {
		fn recognize<'a>(
			&'a self,
			_cfg: &'a govly_config::OcrProviderConfig,
			_document_url: &'a str,
		) -> BoxFuture<'a, color_eyre::Result<String>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let text = self.text;

			Box::pin(async move {
				match text {
					Some(text) => Ok(text.to_string()),
					None => Err(color_eyre::eyre::eyre!("OCR endpoint went away.")),
				}
			})
		}
	}

	fn service_with_ocr(ocr: TrackingOcr) -> (GovlyService, Arc<AtomicUsize>) {
		let calls = ocr.calls.clone();
		let service = testkit::service(Providers::new(
			Arc::new(testkit::StubEmbedding),
			Arc::new(testkit::StubGeneration),
			Arc::new(ocr),
		));

		(service, calls)
	}

	fn form(schema: Option<serde_json::Value>) -> FormRecord {
		FormRecord {
			form_id: Uuid::new_v4(),
			country: "VN".into(),
			agency: "none".into(),
			title: "Đơn đăng ký".into(),
			file_name: "don-dang-ky.pdf".into(),
			url: "https://example.gov/don-dang-ky.pdf".into(),
			raw_text: None,
			schema,
			schema_confidence: None,
			schema_stage: None,
			updated_at: OffsetDateTime::UNIX_EPOCH,
		}
	}

	#[test]
	fn cached_schema_requires_fields() {
		let empty = serde_json::json!({ "fields": [], "confidence": "high" });

		assert!(cached_schema(&form(Some(empty))).is_none());
		assert!(cached_schema(&form(None)).is_none());
	}

	#[test]
	fn cached_schema_parses_stored_json() {
		let stored = serde_json::json!({
			"fields": [
				{
					"name": "ho_va_ten",
					"label": "Họ và tên",
					"field_type": "text",
					"required": false,
					"confidence": "high"
				}
			],
			"confidence": "high"
		});
		let schema = cached_schema(&form(Some(stored))).unwrap();

		assert_eq!(schema.fields[0].name, "ho_va_ten");
		assert_eq!(schema.confidence, govly_domain::Confidence::High);
	}

	#[test]
	fn unreadable_cached_schema_is_skipped() {
		let broken = serde_json::json!({ "fields": "nope" });

		assert!(cached_schema(&form(Some(broken))).is_none());
	}

	#[tokio::test]
	async fn cached_schema_short_circuits_the_chain() {
		let (service, ocr_calls) =
			service_with_ocr(TrackingOcr { calls: Arc::new(AtomicUsize::new(0)), text: None });
		let stored = serde_json::json!({
			"fields": [
				{
					"name": "ho_va_ten",
					"label": "Họ và tên",
					"field_type": "text",
					"required": false,
					"confidence": "high"
				}
			],
			"confidence": "high"
		});
		let (schema, stage) = service
			.run_stages(&form(Some(stored)), false, &|| false)
			.await
			.expect("Expected the cached stage to satisfy the request.");

		assert_eq!(stage, ExtractionStage::Cached);
		assert_eq!(schema.fields[0].name, "ho_va_ten");
		assert_eq!(ocr_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn failed_ocr_falls_through_to_the_diagnostic_schema() {
		let (service, ocr_calls) =
			service_with_ocr(TrackingOcr { calls: Arc::new(AtomicUsize::new(0)), text: None });
		let (schema, stage) = service
			.run_stages(&form(None), false, &|| false)
			.await
			.expect("Expected the diagnostic stage to satisfy the request.");

		assert_eq!(stage, ExtractionStage::Diagnostic);
		assert_eq!(schema.confidence, govly_domain::Confidence::Low);
		assert_eq!(ocr_calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn fieldless_ocr_text_falls_through_to_the_diagnostic_schema() {
		let (service, ocr_calls) = service_with_ocr(TrackingOcr {
			calls: Arc::new(AtomicUsize::new(0)),
			text: Some("Trang bìa không có trường nào."),
		});
		let (_, stage) = service
			.run_stages(&form(None), false, &|| false)
			.await
			.expect("Expected the diagnostic stage to satisfy the request.");

		assert_eq!(stage, ExtractionStage::Diagnostic);
		assert_eq!(ocr_calls.load(Ordering::SeqCst), 1);
	}
}
