//! Best-effort status publication. Publishing never fails or retries the stage that reports.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use agora_domain::{
	progress::{ProgressStage, ProgressTracker, StatusPayload},
	status::AnalysisStatus,
};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
	pub conversation_id: Uuid,
	#[serde(flatten)]
	pub payload: StatusPayload,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{0}")]
pub struct PublishError(pub String);

pub trait ProgressPublisher
where
	Self: Send + Sync,
{
	fn publish(&self, event: ProgressEvent) -> Result<(), PublishError>;
}

/// Fans events out over a broadcast channel. Subscribers filter by conversation id, which stands
/// in for a per-conversation topic.
#[derive(Clone)]
pub struct BroadcastProgress {
	tx: broadcast::Sender<ProgressEvent>,
}
impl BroadcastProgress {
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity.max(1));

		Self { tx }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
		self.tx.subscribe()
	}

	pub fn subscriber_count(&self) -> usize {
		self.tx.receiver_count()
	}
}
impl Default for BroadcastProgress {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
impl ProgressPublisher for BroadcastProgress {
	fn publish(&self, event: ProgressEvent) -> Result<(), PublishError> {
		// Nobody listening is not a failure.
		if self.tx.receiver_count() == 0 {
			return Ok(());
		}

		self.tx
			.send(event)
			.map(|_| ())
			.map_err(|err| PublishError(format!("Progress channel closed: {err}.")))
	}
}

/// Per-run reporter. Keeps stages monotonic and turns publish failures into warnings.
pub struct RunProgress<'a> {
	conversation_id: Uuid,
	publisher: &'a dyn ProgressPublisher,
	tracker: ProgressTracker,
}
impl<'a> RunProgress<'a> {
	pub fn new(conversation_id: Uuid, publisher: &'a dyn ProgressPublisher) -> Self {
		Self { conversation_id, publisher, tracker: ProgressTracker::new() }
	}

	pub fn last_stage(&self) -> Option<ProgressStage> {
		self.tracker.last()
	}

	pub fn stage(
		&mut self,
		status: AnalysisStatus,
		stage: ProgressStage,
		message: impl Into<String>,
	) {
		let Some(update) = self.tracker.advance(stage, message) else {
			tracing::debug!(
				conversation_id = %self.conversation_id,
				stage = stage.as_str(),
				"Skipped out-of-order progress stage."
			);

			return;
		};

		self.send(StatusPayload {
			analysis_status: status,
			analysis_error: None,
			progress: Some(update),
		});
	}

	pub fn failed(&mut self, error: &str) {
		self.send(StatusPayload {
			analysis_status: AnalysisStatus::Error,
			analysis_error: Some(error.to_string()),
			progress: None,
		});
	}

	fn send(&self, payload: StatusPayload) {
		let event = ProgressEvent { conversation_id: self.conversation_id, payload };

		if let Err(err) = self.publisher.publish(event) {
			tracing::warn!(
				conversation_id = %self.conversation_id,
				error = %err,
				"Progress publish failed."
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FailingPublisher;
	impl ProgressPublisher for FailingPublisher {
		fn publish(&self, _event: ProgressEvent) -> Result<(), PublishError> {
			Err(PublishError("down".to_string()))
		}
	}

	#[test]
	fn publish_without_subscribers_succeeds() {
		let progress = BroadcastProgress::new(4);
		let event = ProgressEvent {
			conversation_id: Uuid::new_v4(),
			payload: StatusPayload {
				analysis_status: AnalysisStatus::Ready,
				analysis_error: None,
				progress: None,
			},
		};

		assert_eq!(progress.subscriber_count(), 0);
		assert!(progress.publish(event).is_ok());
	}

	#[test]
	fn subscribers_receive_monotonic_stages() {
		let progress = BroadcastProgress::new(8);
		let mut rx = progress.subscribe();
		let conversation_id = Uuid::new_v4();
		let mut run = RunProgress::new(conversation_id, &progress);

		run.stage(AnalysisStatus::Embedding, ProgressStage::Embedding, "Embedding");
		run.stage(AnalysisStatus::Embedding, ProgressStage::Fetching, "Late fetch");
		run.stage(AnalysisStatus::Analyzing, ProgressStage::Clustering, "Clustering");

		let first = rx.try_recv().expect("Expected first event.");
		let second = rx.try_recv().expect("Expected second event.");

		assert_eq!(first.conversation_id, conversation_id);
		assert_eq!(first.payload.progress.map(|p| p.progress_percent), Some(15));
		assert_eq!(second.payload.progress.map(|p| p.progress_percent), Some(45));
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn publisher_failures_are_swallowed() {
		let publisher = FailingPublisher;
		let mut run = RunProgress::new(Uuid::new_v4(), &publisher);

		run.stage(AnalysisStatus::Embedding, ProgressStage::Starting, "Starting");
		run.failed("boom");

		assert_eq!(run.last_stage(), Some(ProgressStage::Starting));
		assert_eq!(PublishError("down".to_string()).to_string(), "down");
	}
}
