//! Classifies new responses against stored centroids without re-clustering.

use std::collections::{BTreeMap, HashMap};

use rand::{SeedableRng, rngs::StdRng};
use time::OffsetDateTime;

use agora_domain::{
	cluster_model::{self, CentroidRef, Point2},
	progress::ProgressStage,
	status::{AnalysisStatus, AnalysisStrategy},
};
use agora_storage::{
	cluster_models,
	models::{AnalysisJob, ClusterModel},
	responses, themes,
};

use crate::{AgoraService, Error, Result, progress::RunProgress, runner::{self, AnalysisSummary}};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
	pub cluster_index: i32,
	pub position: Point2,
}

impl AgoraService {
	pub(crate) async fn run_incremental(
		&self,
		job: &AnalysisJob,
		progress: &mut RunProgress<'_>,
	) -> Result<AnalysisSummary> {
		let conversation_id = job.conversation_id;
		let models = cluster_models::list_cluster_models(&self.db.pool, conversation_id).await?;

		if models.is_empty() {
			return Err(Error::InvalidRequest {
				message: format!(
					"Conversation {conversation_id} has no cluster models for incremental analysis."
				),
			});
		}

		self.set_status(job, AnalysisStatus::Embedding).await?;
		progress.stage(AnalysisStatus::Embedding, ProgressStage::Fetching, "Loading responses.");

		let pending = responses::list_unassigned_responses(&self.db.pool, conversation_id).await?;

		progress.stage(
			AnalysisStatus::Embedding,
			ProgressStage::Fetched,
			format!("Found {} new responses.", pending.len()),
		);
		progress.stage(AnalysisStatus::Embedding, ProgressStage::Embedding, "Embedding responses.");

		let vectors = self.embed_and_store(&pending, progress).await?;

		progress.stage(AnalysisStatus::Embedding, ProgressStage::EmbeddingDone, "Embedded.");
		self.set_status(job, AnalysisStatus::Analyzing).await?;
		progress.stage(
			AnalysisStatus::Analyzing,
			ProgressStage::Clustering,
			"Assigning responses to existing themes.",
		);

		let placements = {
			let mut rng = StdRng::from_entropy();

			place_responses(&models, &vectors, &mut rng)?
		};
		let mut added: BTreeMap<i32, i32> = BTreeMap::new();

		for placement in &placements {
			*added.entry(placement.cluster_index).or_default() += 1;
		}

		progress.stage(AnalysisStatus::Analyzing, ProgressStage::Saving, "Saving assignments.");

		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		runner::ensure_lease(&mut tx, job).await?;

		for (response, placement) in pending.iter().zip(placements.iter()) {
			responses::assign_response(
				&mut *tx,
				response.response_id,
				placement.cluster_index,
				placement.position.x,
				placement.position.y,
			)
			.await?;
		}
		for (cluster_index, count) in &added {
			let updated =
				themes::increment_theme_size(&mut *tx, conversation_id, *cluster_index, *count, now)
					.await?;

			if !updated {
				tracing::warn!(
					conversation_id = %conversation_id,
					cluster_index,
					"No theme row for assigned cluster."
				);
			}
		}

		progress.stage(AnalysisStatus::Analyzing, ProgressStage::Finalizing, "Finalizing.");

		let assigned = runner::finish_run(&mut tx, job, now).await?;

		tx.commit().await?;

		Ok(AnalysisSummary {
			strategy: AnalysisStrategy::Incremental,
			analyzed_responses: pending.len(),
			clusters: added.len(),
			assigned_responses: assigned,
			statements: 0,
		})
	}
}

/// Nearest stored centroid for each embedding, then a random point inside that cluster's spread.
pub fn place_responses<R>(
	models: &[ClusterModel],
	embeddings: &[Vec<f32>],
	rng: &mut R,
) -> Result<Vec<Placement>>
where
	R: rand::Rng,
{
	let centroids: Vec<CentroidRef<'_>> = models
		.iter()
		.map(|model| CentroidRef {
			cluster_index: model.cluster_index,
			centroid_embedding: &model.centroid_embedding,
		})
		.collect();
	let by_index: HashMap<i32, &ClusterModel> =
		models.iter().map(|model| (model.cluster_index, model)).collect();
	let mut out = Vec::with_capacity(embeddings.len());

	for embedding in embeddings {
		let assignment = cluster_model::nearest_cluster(embedding, &centroids).ok_or_else(|| {
			Error::InvalidRequest { message: "No cluster models to assign against.".to_string() }
		})?;
		let model = by_index.get(&assignment.cluster_index).ok_or_else(|| Error::Storage {
			message: format!("Cluster model {} vanished.", assignment.cluster_index),
		})?;
		let centroid = Point2::new(model.centroid_x, model.centroid_y);
		let position = cluster_model::place_within_spread(centroid, model.spread_radius, rng);

		out.push(Placement { cluster_index: assignment.cluster_index, position });
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use uuid::Uuid;

	use super::*;

	fn model(cluster_index: i32, centroid: Vec<f32>, x: f32, spread_radius: f32) -> ClusterModel {
		ClusterModel {
			conversation_id: Uuid::nil(),
			cluster_index,
			centroid_embedding: centroid,
			centroid_x: x,
			centroid_y: 0.0,
			spread_radius,
			member_count: 3,
		}
	}

	#[test]
	fn places_near_closest_centroid_within_spread() {
		let models = vec![model(0, vec![1.0, 0.0], 0.0, 1.0), model(1, vec![0.0, 1.0], 10.0, 2.0)];
		let mut rng = StdRng::seed_from_u64(11);
		let placements = place_responses(&models, &[vec![0.1, 0.9], vec![0.9, 0.2]], &mut rng)
			.expect("Failed to place responses.");

		assert_eq!(placements[0].cluster_index, 1);
		assert_eq!(placements[1].cluster_index, 0);
		assert!(placements[0].position.distance(&Point2::new(10.0, 0.0)) <= 2.0 + 1e-4);
		assert!(placements[1].position.distance(&Point2::new(0.0, 0.0)) <= 1.0 + 1e-4);
	}

	#[test]
	fn ties_go_to_lowest_cluster_index() {
		let models = vec![model(3, vec![1.0, 0.0], 0.0, 0.0), model(1, vec![1.0, 0.0], 5.0, 0.0)];
		let mut rng = StdRng::seed_from_u64(1);
		let placements =
			place_responses(&models, &[vec![1.0, 0.0]], &mut rng).expect("Failed to place.");

		assert_eq!(placements[0], Placement { cluster_index: 1, position: Point2::new(5.0, 0.0) });
	}

	#[test]
	fn empty_models_fail() {
		let mut rng = StdRng::seed_from_u64(1);

		assert!(place_responses(&[], &[vec![1.0]], &mut rng).is_err());
	}
}
