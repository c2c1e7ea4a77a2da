use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Result, models::FormRecord};

const FORM_COLUMNS: &str = "\
form_id,
country,
agency,
title,
file_name,
url,
raw_text,
schema,
schema_confidence,
schema_stage,
updated_at";

/// Looks a form up by id or by file name.
///
/// A reference that parses as a UUID is an id lookup; anything else matches
/// the tail of the stored file name, case insensitively, so both
/// `don-dang-ky.pdf` and `forms/vn/don-dang-ky.pdf` resolve the same record.
pub async fn find_form<'e, E>(executor: E, reference: &str) -> Result<Option<FormRecord>>
where
	E: PgExecutor<'e>,
{
	if let Ok(form_id) = reference.parse::<Uuid>() {
		let row = sqlx::query_as::<_, FormRecord>(&format!(
			"SELECT {FORM_COLUMNS} FROM forms WHERE form_id = $1 LIMIT 1"
		))
		.bind(form_id)
		.fetch_optional(executor)
		.await?;

		return Ok(row);
	}

	let row = sqlx::query_as::<_, FormRecord>(&format!(
		"\
SELECT {FORM_COLUMNS}
FROM forms
WHERE lower(file_name) LIKE '%' || lower($1)
ORDER BY updated_at DESC
LIMIT 1"
	))
	.bind(reference.trim())
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn upsert_form<'e, E>(executor: E, form: &FormRecord) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO forms (form_id, country, agency, title, file_name, url, raw_text, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, now())
ON CONFLICT (form_id)
DO UPDATE SET
	country = EXCLUDED.country,
	agency = EXCLUDED.agency,
	title = EXCLUDED.title,
	file_name = EXCLUDED.file_name,
	url = EXCLUDED.url,
	raw_text = EXCLUDED.raw_text,
	updated_at = now()",
	)
	.bind(form.form_id)
	.bind(form.country.as_str())
	.bind(form.agency.as_str())
	.bind(form.title.as_str())
	.bind(form.file_name.as_str())
	.bind(form.url.as_str())
	.bind(form.raw_text.as_deref())
	.execute(executor)
	.await?;

	Ok(())
}

/// Stores an extracted schema unless a higher-confidence one is already cached.
///
/// Returns whether the row was written. The rank comparison keeps a cached
/// high-confidence schema from being clobbered by a later OCR or diagnostic
/// pass against the same form.
pub async fn save_schema<'e, E>(
	executor: E,
	form_id: Uuid,
	schema: &serde_json::Value,
	confidence: &str,
	stage: &str,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE forms
SET schema = $2, schema_confidence = $3, schema_stage = $4, updated_at = now()
WHERE form_id = $1
	AND (
		schema IS NULL
		OR CASE $3 WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END
			>= CASE schema_confidence WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END
	)",
	)
	.bind(form_id)
	.bind(schema)
	.bind(confidence)
	.bind(stage)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Clears a cached schema so the next extraction starts from scratch.
pub async fn invalidate_schema<'e, E>(executor: E, form_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE forms
SET schema = NULL, schema_confidence = NULL, schema_stage = NULL, updated_at = now()
WHERE form_id = $1",
	)
	.bind(form_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}
