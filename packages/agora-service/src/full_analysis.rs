//! Full re-analysis: embed everything, cluster, name, consolidate, then replace stored results.

use time::OffsetDateTime;

use agora_domain::{
	cluster_model::{self, ClusterGeometry, Point2},
	progress::ProgressStage,
	status::{AnalysisStatus, AnalysisStrategy},
};
use agora_storage::{
	cluster_models,
	models::{AnalysisJob, ClusterModel, Response},
	responses, statements,
	themes::{self, NewTheme},
};

use crate::{
	AgoraService, Error, Result,
	consolidation::{ClusterInput, MemberInput},
	progress::RunProgress,
	retry::{self, RetryPolicy},
	runner::{self, AnalysisSummary},
};

impl AgoraService {
	pub(crate) async fn run_full(
		&self,
		job: &AnalysisJob,
		progress: &mut RunProgress<'_>,
	) -> Result<AnalysisSummary> {
		let conversation_id = job.conversation_id;
		let policy = RetryPolicy::from(&self.cfg.worker.retry);

		self.set_status(job, AnalysisStatus::Embedding).await?;
		progress.stage(AnalysisStatus::Embedding, ProgressStage::Fetching, "Loading responses.");

		let responses = responses::list_responses(&self.db.pool, conversation_id).await?;

		if responses.is_empty() {
			return Err(Error::InvalidRequest {
				message: format!("Conversation {conversation_id} has no responses to analyze."),
			});
		}

		progress.stage(
			AnalysisStatus::Embedding,
			ProgressStage::Fetched,
			format!("Loaded {} responses.", responses.len()),
		);
		progress.stage(AnalysisStatus::Embedding, ProgressStage::Embedding, "Embedding responses.");

		let vectors = self.embed_and_store(&responses, progress).await?;

		progress.stage(AnalysisStatus::Embedding, ProgressStage::EmbeddingDone, "Embedded.");
		self.set_status(job, AnalysisStatus::Analyzing).await?;
		progress.stage(AnalysisStatus::Analyzing, ProgressStage::Clustering, "Clustering.");

		let labels = retry::with_retry(&policy, "cluster", || {
			self.providers.clustering.cluster(&self.cfg.providers.clustering, &vectors)
		})
		.await?;
		let points = retry::with_retry(&policy, "project_2d", || {
			self.providers.projection.project_2d(&self.cfg.providers.projection, &vectors)
		})
		.await?;
		let points: Vec<Point2> = points.into_iter().map(|(x, y)| Point2::new(x, y)).collect();
		let geometries = cluster_model::build_cluster_models(&labels, &vectors, &points)?;

		tracing::info!(
			conversation_id = %conversation_id,
			clusters = geometries.len(),
			responses = responses.len(),
			"Clustered responses."
		);
		progress.stage(
			AnalysisStatus::Analyzing,
			ProgressStage::Themes,
			format!("Naming {} themes.", geometries.len()),
		);

		let new_themes = self.name_themes(&geometries, &responses, &vectors, &policy).await?;

		progress.stage(
			AnalysisStatus::Analyzing,
			ProgressStage::Consolidating,
			"Consolidating similar responses.",
		);

		let clusters: Vec<ClusterInput<'_>> = geometries
			.iter()
			.map(|geometry| ClusterInput {
				cluster_index: geometry.cluster_index,
				members: geometry
					.members
					.iter()
					.map(|position| MemberInput {
						response_id: responses[*position].response_id,
						text: responses[*position].text.as_str(),
						embedding: vectors[*position].as_slice(),
					})
					.collect(),
			})
			.collect();
		let consolidation = self.consolidate(conversation_id, &clusters).await?;
		let models = geometries
			.iter()
			.map(|geometry| {
				Ok(ClusterModel {
					conversation_id,
					cluster_index: geometry.cluster_index,
					centroid_embedding: geometry.centroid_embedding.clone(),
					centroid_x: geometry.centroid_2d.x,
					centroid_y: geometry.centroid_2d.y,
					spread_radius: geometry.spread_radius,
					member_count: crate::to_i32(geometry.members.len(), "Cluster member count")?,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		progress.stage(AnalysisStatus::Analyzing, ProgressStage::Saving, "Saving analysis.");

		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		runner::ensure_lease(&mut tx, job).await?;
		cluster_models::replace_cluster_models(
			&mut tx,
			conversation_id,
			&models,
			self.cfg.providers.embedding.dimensions,
		)
		.await?;
		themes::replace_themes(&mut tx, conversation_id, &new_themes, now).await?;
		statements::replace_statements(&mut tx, conversation_id, &consolidation.statements)
			.await?;

		progress.stage(AnalysisStatus::Analyzing, ProgressStage::Umap, "Saving positions.");

		for (position, response) in responses.iter().enumerate() {
			let point = points[position];

			responses::assign_response(
				&mut *tx,
				response.response_id,
				labels[position],
				point.x,
				point.y,
			)
			.await?;
		}

		progress.stage(AnalysisStatus::Analyzing, ProgressStage::Finalizing, "Finalizing.");

		let assigned = runner::finish_run(&mut tx, job, now).await?;

		tx.commit().await?;

		Ok(AnalysisSummary {
			strategy: AnalysisStrategy::Full,
			analyzed_responses: responses.len(),
			clusters: geometries.len(),
			assigned_responses: assigned,
			statements: consolidation.statements.len(),
		})
	}

	async fn name_themes(
		&self,
		geometries: &[ClusterGeometry],
		responses: &[Response],
		vectors: &[Vec<f32>],
		policy: &RetryPolicy,
	) -> Result<Vec<NewTheme>> {
		let llm = &self.cfg.providers.llm;
		let sample_size = self.cfg.analysis.theme_sample_size as usize;
		let mut out = Vec::with_capacity(geometries.len());

		for geometry in geometries {
			let samples: Vec<String> = cluster_model::representative_members(
				&geometry.members,
				vectors,
				&geometry.centroid_embedding,
				sample_size,
			)
			.into_iter()
			.map(|position| responses[position].text.clone())
			.collect();
			let theme = retry::with_retry(policy, "name_theme", || {
				self.providers.theme_naming.name_theme(llm, geometry.cluster_index, &samples)
			})
			.await?;

			out.push(NewTheme {
				cluster_index: geometry.cluster_index,
				name: theme.name,
				description: theme.description,
				size: crate::to_i32(geometry.members.len(), "Theme size")?,
			});
		}

		Ok(out)
	}
}
