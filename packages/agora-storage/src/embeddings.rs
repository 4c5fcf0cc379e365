use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, vector};

/// Idempotent on `response_id`; a re-embedded response replaces its previous vector. The vector
/// must match the column dimension and hold only finite values.
pub async fn upsert_embedding<'e, E>(
	executor: E,
	response_id: Uuid,
	embedding_version: &str,
	vec: &[f32],
	dimensions: u32,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	vector::ensure_dim(vec, dimensions)?;

	let dim = i32::try_from(dimensions).map_err(|_| {
		crate::Error::InvalidArgument("Embedding dimension does not fit in i32.".to_string())
	})?;

	sqlx::query(
		"\
INSERT INTO response_embeddings (
	response_id,
	embedding_version,
	embedding_dim,
	vec,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4::text::vector, $5, $5)
ON CONFLICT (response_id) DO UPDATE
SET embedding_version = EXCLUDED.embedding_version,
	embedding_dim = EXCLUDED.embedding_dim,
	vec = EXCLUDED.vec,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(response_id)
	.bind(embedding_version)
	.bind(dim)
	.bind(vector::vector_to_pg(vec))
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}
