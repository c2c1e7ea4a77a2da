use sqlx::PgExecutor;

use crate::{Result, models::ChunkHash};

/// Stored chunk hashes for one source, in chunk order.
pub async fn fetch_chunk_hashes<'e, E>(executor: E, source_id: &str) -> Result<Vec<ChunkHash>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ChunkHash>(
		"\
SELECT chunk_index, content_hash
FROM source_chunks
WHERE source_id = $1
ORDER BY chunk_index",
	)
	.bind(source_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn upsert_chunk_hash<'e, E>(
	executor: E,
	source_id: &str,
	chunk_index: i32,
	content_hash: &str,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO source_chunks (source_id, chunk_index, content_hash, updated_at)
VALUES ($1, $2, $3, now())
ON CONFLICT (source_id, chunk_index)
DO UPDATE SET content_hash = EXCLUDED.content_hash, updated_at = now()",
	)
	.bind(source_id)
	.bind(chunk_index)
	.bind(content_hash)
	.execute(executor)
	.await?;

	Ok(())
}

/// Drops stale tail chunks after a document shrank.
pub async fn delete_chunks_from<'e, E>(executor: E, source_id: &str, first_stale: i32) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM source_chunks WHERE source_id = $1 AND chunk_index >= $2")
		.bind(source_id)
		.bind(first_stale)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}
