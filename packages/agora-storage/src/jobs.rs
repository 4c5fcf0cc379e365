//! Analysis job records and the locking protocol around them.
//!
//! A partial unique index admits one `queued` or `running` job per conversation. Every transition
//! out of those states is a conditional update, so a retire and a finishing executor cannot both
//! win. A claim stamps `locked_at`; that value is the executor's lease, and finishing or failing
//! requires it to be unchanged.

use sqlx::{PgConnection, PgExecutor};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use agora_domain::status::AnalysisStrategy;

use crate::{Error, Result, models::AnalysisJob};

pub const SUPERSEDED: &str = "superseded";

const JOB_COLUMNS: &str = "\
job_id,
	conversation_id,
	status,
	strategy,
	created_by,
	created_at,
	updated_at,
	locked_at,
	attempts,
	last_error";

/// Inserts a queued job. A concurrent active job surfaces as [`Error::Conflict`].
pub async fn insert_job<'e, E>(
	executor: E,
	job_id: Uuid,
	conversation_id: Uuid,
	strategy: AnalysisStrategy,
	created_by: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO analysis_jobs (
	job_id,
	conversation_id,
	status,
	strategy,
	created_by,
	created_at,
	updated_at
)
VALUES ($1, $2, 'queued', $3, $4, $5, $5)",
	)
	.bind(job_id)
	.bind(conversation_id)
	.bind(strategy.as_str())
	.bind(created_by)
	.bind(now)
	.execute(executor)
	.await;

	match result {
		Ok(_) => Ok(()),
		Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(Error::Conflict(
			format!("Conversation {conversation_id} already has an active analysis job."),
		)),
		Err(err) => Err(err.into()),
	}
}

pub async fn get_job<'e, E>(executor: E, job_id: Uuid) -> Result<Option<AnalysisJob>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {JOB_COLUMNS} FROM analysis_jobs WHERE job_id = $1");
	let row = sqlx::query_as::<_, AnalysisJob>(&sql).bind(job_id).fetch_optional(executor).await?;

	Ok(row)
}

pub async fn find_active_job<'e, E>(
	executor: E,
	conversation_id: Uuid,
) -> Result<Option<AnalysisJob>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT {JOB_COLUMNS} FROM analysis_jobs \
		WHERE conversation_id = $1 AND status IN ('queued', 'running') \
		LIMIT 1"
	);
	let row = sqlx::query_as::<_, AnalysisJob>(&sql)
		.bind(conversation_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Marks an active job failed with `last_error = 'superseded'`. Returns false when the job had
/// already left the active states.
pub async fn retire_if_active<'e, E>(executor: E, job_id: Uuid, now: OffsetDateTime) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE analysis_jobs
SET status = 'failed',
	last_error = $2,
	updated_at = $3
WHERE job_id = $1 AND status IN ('queued', 'running')",
	)
	.bind(job_id)
	.bind(SUPERSEDED)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// The sole admission gate. Moves a queued, unlocked job, or a running job whose lock is older
/// than `lock_ttl`, to running with a fresh lock. `None` means another executor holds the job or
/// it is finished.
pub async fn claim_job<'e, E>(
	executor: E,
	job_id: Uuid,
	now: OffsetDateTime,
	lock_ttl: Duration,
) -> Result<Option<AnalysisJob>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE analysis_jobs
SET status = 'running',
	locked_at = $2,
	attempts = attempts + 1,
	updated_at = $2
WHERE job_id = $1
	AND (
		(status = 'queued' AND locked_at IS NULL)
		OR (status = 'running' AND locked_at < $3)
	)
RETURNING {JOB_COLUMNS}"
	);
	let row = sqlx::query_as::<_, AnalysisJob>(&sql)
		.bind(job_id)
		.bind(now)
		.bind(now - lock_ttl)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Oldest job a worker could claim right now.
pub async fn next_claimable_job<'e, E>(
	executor: E,
	now: OffsetDateTime,
	lock_ttl: Duration,
) -> Result<Option<Uuid>>
where
	E: PgExecutor<'e>,
{
	let job_id: Option<Uuid> = sqlx::query_scalar(
		"\
SELECT job_id
FROM analysis_jobs
WHERE (status = 'queued' AND locked_at IS NULL)
	OR (status = 'running' AND locked_at < $1)
ORDER BY created_at ASC, job_id ASC
LIMIT 1",
	)
	.bind(now - lock_ttl)
	.fetch_optional(executor)
	.await?;

	Ok(job_id)
}

/// Locks the job row for the rest of `conn`'s transaction when `locked_at` is still the caller's
/// lease. False means the job was retired, finished, or reclaimed by another executor.
pub async fn hold_lease(
	conn: &mut PgConnection,
	job_id: Uuid,
	locked_at: Option<OffsetDateTime>,
) -> Result<bool> {
	let held: Option<i32> = sqlx::query_scalar(
		"\
SELECT 1
FROM analysis_jobs
WHERE job_id = $1 AND status = 'running' AND locked_at = $2
FOR UPDATE",
	)
	.bind(job_id)
	.bind(locked_at)
	.fetch_optional(&mut *conn)
	.await?;

	Ok(held.is_some())
}

pub async fn mark_job_succeeded<'e, E>(
	executor: E,
	job_id: Uuid,
	locked_at: Option<OffsetDateTime>,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE analysis_jobs
SET status = 'succeeded',
	last_error = NULL,
	updated_at = $3
WHERE job_id = $1 AND status = 'running' AND locked_at = $2",
	)
	.bind(job_id)
	.bind(locked_at)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Fails the job only while `locked_at` is still the caller's lease.
pub async fn mark_job_failed<'e, E>(
	executor: E,
	job_id: Uuid,
	locked_at: Option<OffsetDateTime>,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE analysis_jobs
SET status = 'failed',
	last_error = $3,
	updated_at = $4
WHERE job_id = $1 AND status = 'running' AND locked_at = $2",
	)
	.bind(job_id)
	.bind(locked_at)
	.bind(error_text)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}
