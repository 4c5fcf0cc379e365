use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::{Result, models::ConsolidatedStatement};

/// Replaces every statement of the conversation. Run inside a transaction: an insert failure then
/// rolls back the delete as well, leaving the previous set intact. Slice order is stored as
/// `ordinal` and is the order [`list_statements`] returns.
pub async fn replace_statements(
	conn: &mut PgConnection,
	conversation_id: Uuid,
	statements: &[ConsolidatedStatement],
) -> Result<()> {
	sqlx::query("DELETE FROM consolidated_statements WHERE conversation_id = $1")
		.bind(conversation_id)
		.execute(&mut *conn)
		.await?;

	for (ordinal, statement) in statements.iter().enumerate() {
		let ordinal = i32::try_from(ordinal).map_err(|_| {
			crate::Error::InvalidArgument("Statement ordinal does not fit in i32.".to_string())
		})?;

		if statement.combined_response_ids.len() < 2 {
			return Err(crate::Error::InvalidArgument(
				"Consolidated statements need at least two responses.".to_string(),
			));
		}

		sqlx::query(
			"\
INSERT INTO consolidated_statements (
	statement_id,
	conversation_id,
	group_id,
	cluster_index,
	statement,
	combined_response_ids,
	provenance,
	model,
	prompt_version,
	ordinal,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
		)
		.bind(statement.statement_id)
		.bind(conversation_id)
		.bind(statement.group_id)
		.bind(statement.cluster_index)
		.bind(statement.statement.as_str())
		.bind(statement.combined_response_ids.as_slice())
		.bind(statement.provenance.as_str())
		.bind(statement.model.as_str())
		.bind(statement.prompt_version.as_str())
		.bind(ordinal)
		.bind(statement.created_at)
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}

pub async fn list_statements<'e, E>(
	executor: E,
	conversation_id: Uuid,
) -> Result<Vec<ConsolidatedStatement>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ConsolidatedStatement>(
		"\
SELECT
	statement_id,
	conversation_id,
	group_id,
	cluster_index,
	statement,
	combined_response_ids,
	provenance,
	model,
	prompt_version,
	created_at
FROM consolidated_statements
WHERE conversation_id = $1
ORDER BY ordinal ASC",
	)
	.bind(conversation_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
