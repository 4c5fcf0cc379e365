use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::Response};

const RESPONSE_SELECT: &str = "\
SELECT
	response_id,
	conversation_id,
	user_id,
	text,
	created_at,
	cluster_index,
	position_x,
	position_y
FROM responses";

pub async fn insert_response<'e, E>(
	executor: E,
	response_id: Uuid,
	conversation_id: Uuid,
	user_id: &str,
	text: &str,
	created_at: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO responses (response_id, conversation_id, user_id, text, created_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(response_id)
	.bind(conversation_id)
	.bind(user_id)
	.bind(text)
	.bind(created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn count_responses<'e, E>(executor: E, conversation_id: Uuid) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 =
		sqlx::query_scalar("SELECT COUNT(*) FROM responses WHERE conversation_id = $1")
			.bind(conversation_id)
			.fetch_one(executor)
			.await?;

	Ok(count)
}

/// Responses that carry a cluster assignment. This is the count a finished run records.
pub async fn count_assigned_responses<'e, E>(executor: E, conversation_id: Uuid) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM responses WHERE conversation_id = $1 AND cluster_index IS NOT NULL",
	)
	.bind(conversation_id)
	.fetch_one(executor)
	.await?;

	Ok(count)
}

/// All responses in creation order, ties broken by id.
pub async fn list_responses<'e, E>(executor: E, conversation_id: Uuid) -> Result<Vec<Response>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"{RESPONSE_SELECT} WHERE conversation_id = $1 ORDER BY created_at ASC, response_id ASC"
	);
	let rows =
		sqlx::query_as::<_, Response>(&sql).bind(conversation_id).fetch_all(executor).await?;

	Ok(rows)
}

pub async fn list_unassigned_responses<'e, E>(
	executor: E,
	conversation_id: Uuid,
) -> Result<Vec<Response>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"{RESPONSE_SELECT} WHERE conversation_id = $1 AND cluster_index IS NULL \
		ORDER BY created_at ASC, response_id ASC"
	);
	let rows =
		sqlx::query_as::<_, Response>(&sql).bind(conversation_id).fetch_all(executor).await?;

	Ok(rows)
}

pub async fn assign_response<'e, E>(
	executor: E,
	response_id: Uuid,
	cluster_index: i32,
	position_x: f32,
	position_y: f32,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE responses
SET cluster_index = $2,
	position_x = $3,
	position_y = $4
WHERE response_id = $1",
	)
	.bind(response_id)
	.bind(cluster_index)
	.bind(position_x)
	.bind(position_y)
	.execute(executor)
	.await?;

	Ok(())
}
