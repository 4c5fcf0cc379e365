use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::FeedbackVote};

/// One vote per user and target; voting again overwrites the value.
pub async fn upsert_vote<'e, E>(
	executor: E,
	conversation_id: Uuid,
	target_id: Uuid,
	user_id: &str,
	value: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO feedback_votes (target_id, user_id, conversation_id, value, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $5)
ON CONFLICT (target_id, user_id) DO UPDATE
SET value = EXCLUDED.value,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(target_id)
	.bind(user_id)
	.bind(conversation_id)
	.bind(value)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn list_votes<'e, E>(executor: E, conversation_id: Uuid) -> Result<Vec<FeedbackVote>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, FeedbackVote>(
		"\
SELECT target_id, user_id, conversation_id, value, created_at, updated_at
FROM feedback_votes
WHERE conversation_id = $1
ORDER BY created_at ASC, target_id ASC, user_id ASC",
	)
	.bind(conversation_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
