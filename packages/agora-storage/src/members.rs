use sqlx::PgExecutor;
use uuid::Uuid;

use crate::Result;

pub async fn add_member<'e, E>(executor: E, conversation_id: Uuid, user_id: &str) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO conversation_members (conversation_id, user_id)
VALUES ($1, $2)
ON CONFLICT (conversation_id, user_id) DO NOTHING",
	)
	.bind(conversation_id)
	.bind(user_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn is_member<'e, E>(executor: E, conversation_id: Uuid, user_id: &str) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let exists: bool = sqlx::query_scalar(
		"\
SELECT EXISTS (
	SELECT 1 FROM conversation_members WHERE conversation_id = $1 AND user_id = $2
)",
	)
	.bind(conversation_id)
	.bind(user_id)
	.fetch_one(executor)
	.await?;

	Ok(exists)
}
