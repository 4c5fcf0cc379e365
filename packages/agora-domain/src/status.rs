use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownVariant {
	pub kind: &'static str,
	pub value: String,
}
impl fmt::Display for UnknownVariant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown {} value {:?}.", self.kind, self.value)
	}
}
impl std::error::Error for UnknownVariant {}

macro_rules! labeled_enum {
	(
		$(#[$meta:meta])*
		$name:ident, $kind:literal { $($variant:ident => $label:literal),+ $(,)? }
	) => {
		$(#[$meta])*
		#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
		#[serde(rename_all = "snake_case")]
		pub enum $name {
			$($variant),+
		}
		impl $name {
			pub fn as_str(self) -> &'static str {
				match self {
					$(Self::$variant => $label),+
				}
			}
		}
		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(self.as_str())
			}
		}
		impl FromStr for $name {
			type Err = UnknownVariant;

			fn from_str(raw: &str) -> Result<Self, Self::Err> {
				match raw {
					$($label => Ok(Self::$variant),)+
					_ => Err(UnknownVariant { kind: $kind, value: raw.to_string() }),
				}
			}
		}
		impl TryFrom<String> for $name {
			type Error = UnknownVariant;

			fn try_from(raw: String) -> Result<Self, UnknownVariant> {
				raw.parse()
			}
		}
	};
}

labeled_enum! {
	/// Lifecycle of a conversation's analysis as seen by users.
	AnalysisStatus, "analysis status" {
		NotStarted => "not_started",
		Embedding => "embedding",
		Analyzing => "analyzing",
		Ready => "ready",
		Error => "error",
	}
}

labeled_enum! {
	JobStatus, "job status" {
		Queued => "queued",
		Running => "running",
		Failed => "failed",
		Succeeded => "succeeded",
	}
}

labeled_enum! {
	/// The strategy a job runs with. `auto` only exists on requests.
	AnalysisStrategy, "analysis strategy" {
		Incremental => "incremental",
		Full => "full",
	}
}

labeled_enum! {
	TriggerMode, "trigger mode" {
		Manual => "manual",
		Regenerate => "regenerate",
	}
}

labeled_enum! {
	StrategyRequest, "strategy request" {
		Auto => "auto",
		Incremental => "incremental",
		Full => "full",
	}
}

labeled_enum! {
	TriggerStatus, "trigger status" {
		Queued => "queued",
		AlreadyRunning => "already_running",
		AlreadyComplete => "already_complete",
	}
}

labeled_enum! {
	TriggerReason, "trigger reason" {
		Fresh => "fresh",
		WrongType => "wrong_type",
		BelowThreshold => "below_threshold",
		InProgress => "in_progress",
		Stale => "stale",
	}
}

impl JobStatus {
	pub fn is_active(self) -> bool {
		matches!(self, Self::Queued | Self::Running)
	}
}

impl Default for TriggerMode {
	fn default() -> Self {
		Self::Manual
	}
}

impl Default for StrategyRequest {
	fn default() -> Self {
		Self::Auto
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn labels_match_serde_names() {
		let encoded = serde_json::to_string(&AnalysisStatus::NotStarted)
			.expect("Failed to encode analysis status.");

		assert_eq!(encoded, "\"not_started\"");
		assert_eq!(
			"already_running".parse::<TriggerStatus>().expect("Failed to parse trigger status."),
			TriggerStatus::AlreadyRunning
		);
	}

	#[test]
	fn unknown_labels_are_rejected() {
		let err = "paused".parse::<JobStatus>().expect_err("Expected unknown job status.");

		assert_eq!(err.kind, "job status");
		assert_eq!(err.value, "paused");
	}

	#[test]
	fn only_queued_and_running_are_active() {
		assert!(JobStatus::Queued.is_active());
		assert!(JobStatus::Running.is_active());
		assert!(!JobStatus::Failed.is_active());
		assert!(!JobStatus::Succeeded.is_active());
	}
}
