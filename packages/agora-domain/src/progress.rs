//! Stage vocabulary and payloads for the best-effort status channel.

use serde::{Deserialize, Serialize};

use crate::status::AnalysisStatus;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
	Starting,
	Fetching,
	Fetched,
	Embedding,
	EmbeddingProgress,
	EmbeddingDone,
	Clustering,
	Themes,
	Subthemes,
	Consolidating,
	Saving,
	Umap,
	Finalizing,
	Complete,
}
impl ProgressStage {
	pub const ALL: [Self; 14] = [
		Self::Starting,
		Self::Fetching,
		Self::Fetched,
		Self::Embedding,
		Self::EmbeddingProgress,
		Self::EmbeddingDone,
		Self::Clustering,
		Self::Themes,
		Self::Subthemes,
		Self::Consolidating,
		Self::Saving,
		Self::Umap,
		Self::Finalizing,
		Self::Complete,
	];

	pub fn percent(self) -> u8 {
		match self {
			Self::Starting => 0,
			Self::Fetching => 5,
			Self::Fetched => 10,
			Self::Embedding => 15,
			Self::EmbeddingProgress => 25,
			Self::EmbeddingDone => 40,
			Self::Clustering => 45,
			Self::Themes => 55,
			Self::Subthemes => 70,
			Self::Consolidating => 80,
			Self::Saving => 90,
			Self::Umap => 95,
			Self::Finalizing => 98,
			Self::Complete => 100,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Starting => "starting",
			Self::Fetching => "fetching",
			Self::Fetched => "fetched",
			Self::Embedding => "embedding",
			Self::EmbeddingProgress => "embedding_progress",
			Self::EmbeddingDone => "embedding_done",
			Self::Clustering => "clustering",
			Self::Themes => "themes",
			Self::Subthemes => "subthemes",
			Self::Consolidating => "consolidating",
			Self::Saving => "saving",
			Self::Umap => "umap",
			Self::Finalizing => "finalizing",
			Self::Complete => "complete",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
	pub progress_percent: u8,
	pub progress_message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub progress_stage: Option<ProgressStage>,
}
impl ProgressUpdate {
	pub fn at(stage: ProgressStage, message: impl Into<String>) -> Self {
		Self {
			progress_percent: stage.percent(),
			progress_message: message.into(),
			progress_stage: Some(stage),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
	pub analysis_status: AnalysisStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub analysis_error: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub progress: Option<ProgressUpdate>,
}

/// Keeps one run's emitted stages monotonic. A stage may repeat (per-batch embedding progress)
/// but never move backwards.
#[derive(Clone, Debug, Default)]
pub struct ProgressTracker {
	last: Option<ProgressStage>,
}
impl ProgressTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn last(&self) -> Option<ProgressStage> {
		self.last
	}

	pub fn advance(
		&mut self,
		stage: ProgressStage,
		message: impl Into<String>,
	) -> Option<ProgressUpdate> {
		if let Some(last) = self.last
			&& stage.percent() < last.percent()
		{
			return None;
		}

		self.last = Some(stage);

		Some(ProgressUpdate::at(stage, message))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stage_percents_strictly_increase() {
		for pair in ProgressStage::ALL.windows(2) {
			assert!(pair[0].percent() < pair[1].percent(), "{:?} !< {:?}", pair[0], pair[1]);
		}
	}

	#[test]
	fn tracker_rejects_backwards_stages() {
		let mut tracker = ProgressTracker::new();

		assert!(tracker.advance(ProgressStage::Embedding, "Embedding").is_some());
		assert!(tracker.advance(ProgressStage::EmbeddingProgress, "1/2").is_some());
		assert!(tracker.advance(ProgressStage::EmbeddingProgress, "2/2").is_some());
		assert!(tracker.advance(ProgressStage::Fetching, "Fetching").is_none());
		assert_eq!(tracker.last(), Some(ProgressStage::EmbeddingProgress));
	}

	#[test]
	fn payload_uses_camel_case_fields() {
		let payload = StatusPayload {
			analysis_status: AnalysisStatus::Analyzing,
			analysis_error: None,
			progress: Some(ProgressUpdate::at(ProgressStage::Themes, "Naming themes")),
		};
		let value = serde_json::to_value(&payload).expect("Failed to encode payload.");

		assert_eq!(value["analysisStatus"], "analyzing");
		assert_eq!(value["progress"]["progressPercent"], 55);
		assert_eq!(value["progress"]["progressStage"], "themes");
		assert!(value.get("analysisError").is_none());
	}
}
