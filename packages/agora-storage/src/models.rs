use time::OffsetDateTime;
use uuid::Uuid;

use agora_domain::status::{AnalysisStatus, AnalysisStrategy, JobStatus};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Conversation {
	pub conversation_id: Uuid,
	pub conversation_type: String,
	pub title: String,
	#[sqlx(try_from = "String")]
	pub analysis_status: AnalysisStatus,
	pub analysis_response_count: i32,
	pub analysis_error: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Response {
	pub response_id: Uuid,
	pub conversation_id: Uuid,
	pub user_id: String,
	pub text: String,
	pub created_at: OffsetDateTime,
	pub cluster_index: Option<i32>,
	pub position_x: Option<f32>,
	pub position_y: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClusterModel {
	pub conversation_id: Uuid,
	pub cluster_index: i32,
	/// Raw mean of member embeddings.
	pub centroid_embedding: Vec<f32>,
	pub centroid_x: f32,
	pub centroid_y: f32,
	pub spread_radius: f32,
	pub member_count: i32,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Theme {
	pub conversation_id: Uuid,
	pub cluster_index: i32,
	pub name: String,
	pub description: String,
	pub size: i32,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ConsolidatedStatement {
	pub statement_id: Uuid,
	pub conversation_id: Uuid,
	pub group_id: Uuid,
	pub cluster_index: i32,
	pub statement: String,
	/// Representative first.
	pub combined_response_ids: Vec<Uuid>,
	pub provenance: String,
	pub model: String,
	pub prompt_version: String,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct FeedbackVote {
	pub target_id: Uuid,
	pub user_id: String,
	pub conversation_id: Uuid,
	pub value: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct AnalysisJob {
	pub job_id: Uuid,
	pub conversation_id: Uuid,
	#[sqlx(try_from = "String")]
	pub status: JobStatus,
	#[sqlx(try_from = "String")]
	pub strategy: AnalysisStrategy,
	pub created_by: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub locked_at: Option<OffsetDateTime>,
	pub attempts: i32,
	pub last_error: Option<String>,
}
