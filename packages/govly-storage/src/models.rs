use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct FormRecord {
	pub form_id: Uuid,
	pub country: String,
	pub agency: String,
	pub title: String,
	pub file_name: String,
	pub url: String,
	pub raw_text: Option<String>,
	pub schema: Option<Value>,
	pub schema_confidence: Option<String>,
	pub schema_stage: Option<String>,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ChunkHash {
	pub chunk_index: i32,
	pub content_hash: String,
}
