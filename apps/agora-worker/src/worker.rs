use std::time::Duration;

use tokio::time as tokio_time;

use agora_service::{AgoraService, RunReport};

/// Claims and runs jobs until the process stops. Idle polls sleep for `poll_interval_ms`.
pub async fn run_worker(service: &AgoraService, poll_interval_ms: u64) -> color_eyre::Result<()> {
	tracing::info!(poll_interval_ms, "Analysis worker started.");

	loop {
		match process_once(service).await {
			Ok(true) => continue,
			Ok(false) => {},
			Err(err) => {
				tracing::error!(error = %err, "Analysis job processing failed.");
			},
		}

		tokio_time::sleep(Duration::from_millis(poll_interval_ms)).await;
	}
}

/// Runs at most one claimable job. Returns false when there was nothing to do.
pub async fn process_once(service: &AgoraService) -> agora_service::Result<bool> {
	let Some(job_id) = service.next_claimable_job().await? else {
		return Ok(false);
	};

	match service.run_job(job_id).await? {
		RunReport::NotClaimed => {
			tracing::debug!(job_id = %job_id, "Another worker claimed the job first.");
		},
		RunReport::Succeeded(summary) => {
			tracing::info!(
				job_id = %job_id,
				strategy = summary.strategy.as_str(),
				analyzed = summary.analyzed_responses,
				clusters = summary.clusters,
				"Analysis job finished."
			);
		},
		RunReport::Failed { message } => {
			tracing::warn!(job_id = %job_id, error = %message, "Analysis job failed.");
		},
	}

	Ok(true)
}
