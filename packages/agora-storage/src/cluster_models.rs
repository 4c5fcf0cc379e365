use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::{Result, models::ClusterModel, vector};

#[derive(sqlx::FromRow)]
struct ClusterModelRow {
	conversation_id: Uuid,
	cluster_index: i32,
	centroid_text: String,
	centroid_x: f32,
	centroid_y: f32,
	spread_radius: f32,
	member_count: i32,
}

pub async fn count_cluster_models<'e, E>(executor: E, conversation_id: Uuid) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 =
		sqlx::query_scalar("SELECT COUNT(*) FROM cluster_models WHERE conversation_id = $1")
			.bind(conversation_id)
			.fetch_one(executor)
			.await?;

	Ok(count)
}

/// Stored models ordered by cluster index.
pub async fn list_cluster_models<'e, E>(
	executor: E,
	conversation_id: Uuid,
) -> Result<Vec<ClusterModel>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ClusterModelRow>(
		"\
SELECT
	conversation_id,
	cluster_index,
	centroid_embedding::text AS centroid_text,
	centroid_x,
	centroid_y,
	spread_radius,
	member_count
FROM cluster_models
WHERE conversation_id = $1
ORDER BY cluster_index ASC",
	)
	.bind(conversation_id)
	.fetch_all(executor)
	.await?;

	rows.into_iter()
		.map(|row| {
			Ok(ClusterModel {
				conversation_id: row.conversation_id,
				cluster_index: row.cluster_index,
				centroid_embedding: vector::parse_pg_vector(&row.centroid_text)?,
				centroid_x: row.centroid_x,
				centroid_y: row.centroid_y,
				spread_radius: row.spread_radius,
				member_count: row.member_count,
			})
		})
		.collect()
}

/// Delete-then-insert for one conversation. Run inside a transaction so readers never observe a
/// partial model set. Centroids are checked against `dimensions` before anything is deleted.
pub async fn replace_cluster_models(
	conn: &mut PgConnection,
	conversation_id: Uuid,
	models: &[ClusterModel],
	dimensions: u32,
) -> Result<()> {
	for model in models {
		if model.conversation_id != conversation_id {
			return Err(crate::Error::InvalidArgument(
				"Cluster model belongs to a different conversation.".to_string(),
			));
		}

		vector::ensure_dim(&model.centroid_embedding, dimensions)?;
	}

	sqlx::query("DELETE FROM cluster_models WHERE conversation_id = $1")
		.bind(conversation_id)
		.execute(&mut *conn)
		.await?;

	for model in models {
		sqlx::query(
			"\
INSERT INTO cluster_models (
	conversation_id,
	cluster_index,
	centroid_embedding,
	centroid_x,
	centroid_y,
	spread_radius,
	member_count
)
VALUES ($1, $2, $3::text::vector, $4, $5, $6, $7)",
		)
		.bind(conversation_id)
		.bind(model.cluster_index)
		.bind(vector::vector_to_pg(&model.centroid_embedding))
		.bind(model.centroid_x)
		.bind(model.centroid_y)
		.bind(model.spread_radius)
		.bind(model.member_count)
		.execute(&mut *conn)
		.await?;
	}

	Ok(())
}
