use uuid::Uuid;

use agora_domain::consensus::{
	self, AgreementSummaries, Bucket, BucketConsensus, ConsensusTarget, ResponseConsensus,
	SummaryOptions, Vote,
};
use agora_storage::{responses, statements, votes};

use crate::{AgoraService, Result};

impl AgoraService {
	pub async fn response_consensus(
		&self,
		conversation_id: Uuid,
		user_id: &str,
	) -> Result<Vec<ResponseConsensus>> {
		self.authorize(conversation_id, user_id).await?;

		let votes = self.load_votes(conversation_id).await?;
		let responses = responses::list_responses(&self.db.pool, conversation_id).await?;
		let targets: Vec<ConsensusTarget<'_>> = responses
			.iter()
			.map(|response| ConsensusTarget { id: response.response_id, text: &response.text })
			.collect();

		Ok(consensus::compute_response_consensus(&targets, &votes))
	}

	/// One entry per consolidated statement, counted against its representative response.
	pub async fn statement_consensus(
		&self,
		conversation_id: Uuid,
		user_id: &str,
	) -> Result<Vec<BucketConsensus>> {
		self.authorize(conversation_id, user_id).await?;

		let votes = self.load_votes(conversation_id).await?;
		let statements = statements::list_statements(&self.db.pool, conversation_id).await?;
		let buckets: Vec<Bucket<'_>> = statements
			.iter()
			.map(|statement| Bucket {
				id: statement.statement_id,
				text: &statement.statement,
				member_ids: &statement.combined_response_ids,
			})
			.collect();

		Ok(consensus::compute_consolidated_consensus(&buckets, &votes))
	}

	pub async fn agreement_summaries(
		&self,
		conversation_id: Uuid,
		user_id: &str,
	) -> Result<AgreementSummaries> {
		let per_response = self.response_consensus(conversation_id, user_id).await?;
		let options = SummaryOptions {
			min_votes: self.cfg.consensus.min_votes,
			max_per_type: self.cfg.consensus.max_per_type as usize,
		};

		Ok(consensus::compute_agreement_summaries(&per_response, &options))
	}

	async fn load_votes(&self, conversation_id: Uuid) -> Result<Vec<Vote>> {
		let rows = votes::list_votes(&self.db.pool, conversation_id).await?;

		Ok(rows
			.into_iter()
			.map(|row| Vote { target_id: row.target_id, user_id: row.user_id, value: row.value })
			.collect())
	}
}
