use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use agora_domain::status::AnalysisStatus;

use crate::{Result, models::Conversation};

const CONVERSATION_COLUMNS: &str = "\
conversation_id,
	conversation_type,
	title,
	analysis_status,
	analysis_response_count,
	analysis_error,
	created_at,
	updated_at";

pub async fn insert_conversation<'e, E>(
	executor: E,
	conversation_id: Uuid,
	conversation_type: &str,
	title: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO conversations (conversation_id, conversation_type, title, created_at, updated_at)
VALUES ($1, $2, $3, $4, $4)",
	)
	.bind(conversation_id)
	.bind(conversation_type)
	.bind(title)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_conversation<'e, E>(
	executor: E,
	conversation_id: Uuid,
) -> Result<Option<Conversation>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE conversation_id = $1");
	let row = sqlx::query_as::<_, Conversation>(&sql)
		.bind(conversation_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Writes a non-ready status. `error` is stored as given, so passing `None` clears a prior error.
pub async fn set_analysis_status<'e, E>(
	executor: E,
	conversation_id: Uuid,
	status: AnalysisStatus,
	error: Option<&str>,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE conversations
SET analysis_status = $2,
	analysis_error = $3,
	updated_at = $4
WHERE conversation_id = $1",
	)
	.bind(conversation_id)
	.bind(status.as_str())
	.bind(error)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

/// Flips the conversation to `ready` together with the analyzed count. Callers run this as the last
/// write of the transaction that persists cluster models, themes and assignments.
pub async fn mark_ready<'e, E>(
	executor: E,
	conversation_id: Uuid,
	analysis_response_count: i32,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE conversations
SET analysis_status = 'ready',
	analysis_response_count = $2,
	analysis_error = NULL,
	updated_at = $3
WHERE conversation_id = $1",
	)
	.bind(conversation_id)
	.bind(analysis_response_count)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}
