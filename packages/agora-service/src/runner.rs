//! Executes one claimed job end to end and records how it ended.

use serde::Serialize;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use agora_domain::{
	progress::ProgressStage,
	status::{AnalysisStatus, AnalysisStrategy},
};
use agora_storage::{conversations, jobs, models::AnalysisJob, responses};

use crate::{AgoraService, Error, Result, progress::RunProgress, scheduler};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
	pub strategy: AnalysisStrategy,
	/// Responses embedded and assigned by this run.
	pub analyzed_responses: usize,
	pub clusters: usize,
	/// Responses with a cluster after the run. Matches `analysis_response_count`.
	pub assigned_responses: i64,
	pub statements: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunReport {
	/// Another executor holds the job, or it already finished.
	NotClaimed,
	Succeeded(AnalysisSummary),
	Failed { message: String },
}

impl AgoraService {
	/// Claims `job_id` and runs it with its recorded strategy. Pipeline failures are recorded on
	/// the job and the conversation and returned as [`RunReport::Failed`]; only bookkeeping
	/// failures surface as `Err`.
	pub async fn run_job(&self, job_id: Uuid) -> Result<RunReport> {
		let Some(job) = self.claim(job_id).await?.job else {
			tracing::debug!(job_id = %job_id, "Analysis job not claimable.");

			return Ok(RunReport::NotClaimed);
		};
		let mut progress = RunProgress::new(job.conversation_id, self.progress.as_ref());

		tracing::info!(
			job_id = %job.job_id,
			conversation_id = %job.conversation_id,
			strategy = job.strategy.as_str(),
			attempts = job.attempts,
			"Running analysis job."
		);
		progress.stage(AnalysisStatus::NotStarted, ProgressStage::Starting, "Starting analysis.");

		let result = match job.strategy {
			AnalysisStrategy::Full => self.run_full(&job, &mut progress).await,
			AnalysisStrategy::Incremental => self.run_incremental(&job, &mut progress).await,
		};

		match result {
			Ok(summary) => {
				progress.stage(AnalysisStatus::Ready, ProgressStage::Complete, "Complete.");
				tracing::info!(
					job_id = %job.job_id,
					conversation_id = %job.conversation_id,
					assigned = summary.assigned_responses,
					"Analysis job succeeded."
				);

				Ok(RunReport::Succeeded(summary))
			},
			Err(err) => {
				let keys = self.provider_keys();
				let message = scheduler::sanitize_error(&err.to_string(), &keys);
				let now = OffsetDateTime::now_utc();
				let mut tx = self.db.pool.begin().await?;
				let owned =
					jobs::mark_job_failed(&mut *tx, job.job_id, job.locked_at, &message, now)
						.await?;

				// A retired or reclaimed job must not overwrite the status of its successor.
				if owned {
					conversations::set_analysis_status(
						&mut *tx,
						job.conversation_id,
						AnalysisStatus::Error,
						Some(&message),
						now,
					)
					.await?;
				}

				tx.commit().await?;

				if owned {
					progress.failed(&message);
				}

				tracing::error!(
					job_id = %job.job_id,
					conversation_id = %job.conversation_id,
					error = %message,
					"Analysis job failed."
				);

				Ok(RunReport::Failed { message })
			},
		}
	}

	/// Sets an intermediate status while the job still holds its lease.
	pub(crate) async fn set_status(&self, job: &AnalysisJob, status: AnalysisStatus) -> Result<()> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		ensure_lease(&mut tx, job).await?;
		conversations::set_analysis_status(&mut *tx, job.conversation_id, status, None, now)
			.await?;
		tx.commit().await?;

		Ok(())
	}
}

/// Row-locks the job for the caller's transaction, or fails when the lease was lost to a retire
/// or a reclaim. Every write to a conversation's analysis state runs behind this check.
pub(crate) async fn ensure_lease(conn: &mut PgConnection, job: &AnalysisJob) -> Result<()> {
	if jobs::hold_lease(conn, job.job_id, job.locked_at).await? {
		return Ok(());
	}

	Err(Error::Conflict {
		message: format!("Analysis job {} no longer holds its lease.", job.job_id),
	})
}

/// Marks the conversation ready and the job succeeded inside the caller's persist transaction.
/// Returns the assigned response count recorded as `analysis_response_count`.
pub(crate) async fn finish_run(
	conn: &mut PgConnection,
	job: &AnalysisJob,
	now: OffsetDateTime,
) -> Result<i64> {
	let assigned = responses::count_assigned_responses(&mut *conn, job.conversation_id).await?;
	let assigned_i32 = i32::try_from(assigned).map_err(|_| Error::Storage {
		message: "Assigned response count does not fit in i32.".to_string(),
	})?;

	conversations::mark_ready(&mut *conn, job.conversation_id, assigned_i32, now).await?;

	if !jobs::mark_job_succeeded(&mut *conn, job.job_id, job.locked_at, now).await? {
		return Err(Error::Conflict {
			message: format!("Analysis job {} no longer holds its lease.", job.job_id),
		});
	}

	Ok(assigned)
}
