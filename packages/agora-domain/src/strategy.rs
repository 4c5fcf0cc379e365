//! Freshness, strategy selection and job staleness.

use time::{Duration, OffsetDateTime};

use crate::status::{AnalysisStatus, AnalysisStrategy, JobStatus, StrategyRequest, TriggerMode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResponseCounts {
	/// Responses currently stored for the conversation.
	pub current: i64,
	/// Responses covered by the last completed analysis.
	pub analyzed: i64,
}
impl ResponseCounts {
	pub fn new_since_analysis(&self) -> i64 {
		(self.current - self.analyzed).max(0)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobTtls {
	pub queued: Duration,
	pub running: Duration,
}
impl JobTtls {
	pub fn from_seconds(queued: i64, running: i64) -> Self {
		Self { queued: Duration::seconds(queued), running: Duration::seconds(running) }
	}
}
impl Default for JobTtls {
	fn default() -> Self {
		Self::from_seconds(3_600, 1_800)
	}
}

pub fn is_fresh(status: AnalysisStatus, counts: &ResponseCounts) -> bool {
	status == AnalysisStatus::Ready && counts.analyzed >= counts.current
}

/// An explicit strategy always wins. `auto` picks incremental only when few responses arrived and
/// stored centroids exist to classify them against.
pub fn decide_strategy(
	requested: StrategyRequest,
	mode: TriggerMode,
	new_responses: i64,
	incremental_threshold: i64,
	cluster_model_count: i64,
) -> AnalysisStrategy {
	match requested {
		StrategyRequest::Incremental => AnalysisStrategy::Incremental,
		StrategyRequest::Full => AnalysisStrategy::Full,
		StrategyRequest::Auto if mode == TriggerMode::Regenerate => AnalysisStrategy::Full,
		StrategyRequest::Auto
			if new_responses < incremental_threshold && cluster_model_count > 0 =>
			AnalysisStrategy::Incremental,
		StrategyRequest::Auto => AnalysisStrategy::Full,
	}
}

/// Queued jobs age from creation, running jobs from their lock. A running job without a lock
/// timestamp cannot be owned by anyone and counts as stale. Terminal jobs are never stale.
pub fn job_is_stale(
	status: JobStatus,
	created_at: OffsetDateTime,
	locked_at: Option<OffsetDateTime>,
	now: OffsetDateTime,
	ttls: &JobTtls,
) -> bool {
	match status {
		JobStatus::Queued => now - created_at > ttls.queued,
		JobStatus::Running => match locked_at {
			Some(locked_at) => now - locked_at > ttls.running,
			None => true,
		},
		JobStatus::Failed | JobStatus::Succeeded => false,
	}
}
