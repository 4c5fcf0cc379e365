use sqlx::{PgConnection, PgExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::Theme};

#[derive(Clone, Debug)]
pub struct NewTheme {
	pub cluster_index: i32,
	pub name: String,
	pub description: String,
	pub size: i32,
}

pub async fn replace_themes(
	conn: &mut PgConnection,
	conversation_id: Uuid,
	themes: &[NewTheme],
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query("DELETE FROM themes WHERE conversation_id = $1")
		.bind(conversation_id)
		.execute(&mut *conn)
		.await?;

	for theme in themes {
		sqlx::query(
			"\
INSERT INTO themes (conversation_id, cluster_index, name, description, size, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $6)",
		)
		.bind(conversation_id)
		.bind(theme.cluster_index)
		.bind(theme.name.as_str())
		.bind(theme.description.as_str())
		.bind(theme.size)
		.bind(now)
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}

/// Returns false when no theme exists for the cluster.
pub async fn increment_theme_size<'e, E>(
	executor: E,
	conversation_id: Uuid,
	cluster_index: i32,
	by: i32,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE themes
SET size = size + $3,
	updated_at = $4
WHERE conversation_id = $1 AND cluster_index = $2",
	)
	.bind(conversation_id)
	.bind(cluster_index)
	.bind(by)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn list_themes<'e, E>(executor: E, conversation_id: Uuid) -> Result<Vec<Theme>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, Theme>(
		"\
SELECT conversation_id, cluster_index, name, description, size, created_at, updated_at
FROM themes
WHERE conversation_id = $1
ORDER BY cluster_index ASC",
	)
	.bind(conversation_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
