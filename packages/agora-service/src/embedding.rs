use time::OffsetDateTime;

use agora_domain::{progress::ProgressStage, status::AnalysisStatus};
use agora_storage::{embeddings, models::Response};

use crate::{AgoraService, Error, Result, progress::RunProgress, retry};

impl AgoraService {
	/// Embeds `responses` in configured batches, stores each vector, and returns them in input
	/// order.
	pub(crate) async fn embed_and_store(
		&self,
		responses: &[Response],
		progress: &mut RunProgress<'_>,
	) -> Result<Vec<Vec<f32>>> {
		let cfg = &self.cfg.providers.embedding;
		let policy = retry::RetryPolicy::from(&self.cfg.worker.retry);
		let version = crate::embedding_version(&self.cfg);
		let batch_size = self.cfg.analysis.embedding_batch_size.max(1) as usize;
		let total = responses.len();
		let mut vectors = Vec::with_capacity(total);

		for batch in responses.chunks(batch_size) {
			let texts: Vec<String> = batch.iter().map(|response| response.text.clone()).collect();
			let embedded = retry::with_retry(&policy, "embed", || {
				self.providers.embedding.embed(cfg, &texts)
			})
			.await?;

			if embedded.len() != batch.len() {
				return Err(Error::Provider {
					message: format!(
						"Embedding provider returned {} vectors for {} texts.",
						embedded.len(),
						batch.len()
					),
				});
			}

			let now = OffsetDateTime::now_utc();

			for (response, vec) in batch.iter().zip(embedded.iter()) {
				if vec.len() != cfg.dimensions as usize {
					return Err(Error::Provider {
						message: format!(
							"Embedding for response {} has dimension {}, expected {}.",
							response.response_id,
							vec.len(),
							cfg.dimensions
						),
					});
				}

				embeddings::upsert_embedding(
					&self.db.pool,
					response.response_id,
					&version,
					vec,
					cfg.dimensions,
					now,
				)
				.await?;
			}

			vectors.extend(embedded);

			progress.stage(
				AnalysisStatus::Embedding,
				ProgressStage::EmbeddingProgress,
				format!("Embedded {} of {total} responses.", vectors.len()),
			);
		}

		Ok(vectors)
	}
}
